//! Range table for the five ABG parameters.
//!
//! Each parameter carries two bands:
//! - **validation bounds**: a panel with any value outside these is rejected outright
//! - **normal band**: the reference interval the classifier compares against
//!
//! Only pH, pCO2 and HCO3 take part in acid-base classification. PaO2 and base excess are
//! validated and recorded but have no effect on the verdict.

use serde::Serialize;

/// Inclusive numeric interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// True when `value` lies within `[min, max]`. NaN is never contained.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// The five values of an arterial blood gas panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AbgParameter {
    Ph,
    PCo2,
    Hco3,
    PaO2,
    BaseExcess,
}

impl AbgParameter {
    pub const ALL: [AbgParameter; 5] = [
        AbgParameter::Ph,
        AbgParameter::PCo2,
        AbgParameter::Hco3,
        AbgParameter::PaO2,
        AbgParameter::BaseExcess,
    ];

    /// Field name used on the wire and in stored records.
    pub fn label(self) -> &'static str {
        match self {
            AbgParameter::Ph => "pH",
            AbgParameter::PCo2 => "pCO2",
            AbgParameter::Hco3 => "HCO3",
            AbgParameter::PaO2 => "PaO2",
            AbgParameter::BaseExcess => "BE",
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            AbgParameter::Ph => None,
            AbgParameter::PCo2 | AbgParameter::PaO2 => Some("mmHg"),
            AbgParameter::Hco3 | AbgParameter::BaseExcess => Some("mEq/L"),
        }
    }

    pub fn range(self) -> &'static ParameterRange {
        match self {
            AbgParameter::Ph => &PH,
            AbgParameter::PCo2 => &PCO2,
            AbgParameter::Hco3 => &HCO3,
            AbgParameter::PaO2 => &PAO2,
            AbgParameter::BaseExcess => &BASE_EXCESS,
        }
    }
}

impl std::fmt::Display for AbgParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Normal band (where the classifier uses one) and validation bounds for a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterRange {
    pub normal: Option<Bounds>,
    pub valid: Bounds,
}

pub const PH: ParameterRange = ParameterRange {
    normal: Some(Bounds::new(7.35, 7.45)),
    valid: Bounds::new(6.8, 7.8),
};

pub const PCO2: ParameterRange = ParameterRange {
    normal: Some(Bounds::new(35.0, 45.0)),
    valid: Bounds::new(10.0, 150.0),
};

pub const HCO3: ParameterRange = ParameterRange {
    normal: Some(Bounds::new(22.0, 26.0)),
    valid: Bounds::new(5.0, 60.0),
};

pub const PAO2: ParameterRange = ParameterRange {
    normal: None,
    valid: Bounds::new(20.0, 500.0),
};

pub const BASE_EXCESS: ParameterRange = ParameterRange {
    normal: None,
    valid: Bounds::new(-30.0, 30.0),
};

/// Midpoint of the normal pH band; decides which way a normal-band reading leans.
pub const PH_NEUTRAL: f64 = 7.40;
