//! Input validation for submitted ABG panels.
//!
//! A [`RawAbgInput`] is whatever the caller typed or posted. It only becomes an [`AbgReading`]
//! after every field has been checked against its validation bounds in the range table. All
//! fields are checked, so a rejected panel reports every problem at once.

use crate::error::{BoundViolation, ValidationError};
use crate::ranges::AbgParameter;
use serde::{Deserialize, Serialize};

/// Unvalidated panel values as submitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawAbgInput {
    #[serde(rename = "pH")]
    pub ph: f64,
    #[serde(rename = "pCO2")]
    pub pco2: f64,
    #[serde(rename = "HCO3")]
    pub hco3: f64,
    #[serde(rename = "PaO2")]
    pub pao2: f64,
    #[serde(rename = "BE")]
    pub base_excess: f64,
}

impl Default for RawAbgInput {
    /// A textbook normal panel, used to prefill input forms.
    fn default() -> Self {
        Self {
            ph: 7.4,
            pco2: 40.0,
            hco3: 24.0,
            pao2: 95.0,
            base_excess: 0.0,
        }
    }
}

impl RawAbgInput {
    fn value(&self, parameter: AbgParameter) -> f64 {
        match parameter {
            AbgParameter::Ph => self.ph,
            AbgParameter::PCo2 => self.pco2,
            AbgParameter::Hco3 => self.hco3,
            AbgParameter::PaO2 => self.pao2,
            AbgParameter::BaseExcess => self.base_excess,
        }
    }
}

/// A validated ABG panel.
///
/// Fields are private so the only ways to obtain one are [`validate`] and deserialization,
/// which re-runs validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawAbgInput", into = "RawAbgInput")]
pub struct AbgReading {
    ph: f64,
    pco2: f64,
    hco3: f64,
    pao2: f64,
    base_excess: f64,
}

impl AbgReading {
    pub fn ph(&self) -> f64 {
        self.ph
    }

    /// mmHg
    pub fn pco2(&self) -> f64 {
        self.pco2
    }

    /// mEq/L
    pub fn hco3(&self) -> f64 {
        self.hco3
    }

    /// mmHg
    pub fn pao2(&self) -> f64 {
        self.pao2
    }

    /// mEq/L
    pub fn base_excess(&self) -> f64 {
        self.base_excess
    }
}

impl TryFrom<RawAbgInput> for AbgReading {
    type Error = ValidationError;

    fn try_from(raw: RawAbgInput) -> Result<Self, Self::Error> {
        validate(&raw)
    }
}

impl From<AbgReading> for RawAbgInput {
    fn from(reading: AbgReading) -> Self {
        Self {
            ph: reading.ph,
            pco2: reading.pco2,
            hco3: reading.hco3,
            pao2: reading.pao2,
            base_excess: reading.base_excess,
        }
    }
}

/// Checks every field of `raw` against its validation bounds.
///
/// # Errors
///
/// Returns a `ValidationError` listing every out-of-bounds or non-finite field, in
/// parameter order (pH, pCO2, HCO3, PaO2, BE).
pub fn validate(raw: &RawAbgInput) -> Result<AbgReading, ValidationError> {
    let violations: Vec<BoundViolation> = AbgParameter::ALL
        .into_iter()
        .filter_map(|parameter| {
            let value = raw.value(parameter);
            let bounds = parameter.range().valid;
            (!bounds.contains(value)).then_some(BoundViolation {
                parameter,
                value,
                bounds,
            })
        })
        .collect();

    if !violations.is_empty() {
        return Err(ValidationError { violations });
    }

    Ok(AbgReading {
        ph: raw.ph,
        pco2: raw.pco2,
        hco3: raw.hco3,
        pao2: raw.pao2,
        base_excess: raw.base_excess,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_default_panel() {
        let reading = validate(&RawAbgInput::default()).expect("default panel should be valid");
        assert_eq!(reading.ph(), 7.4);
        assert_eq!(reading.pao2(), 95.0);
    }

    #[test]
    fn test_validate_rejects_ph_above_bound() {
        let raw = RawAbgInput {
            ph: 8.0,
            ..RawAbgInput::default()
        };
        let err = validate(&raw).expect_err("pH 8.0 should be rejected");

        assert_eq!(err.violations.len(), 1);
        let violation = err.violation_for(AbgParameter::Ph).unwrap();
        assert_eq!(violation.value, 8.0);
        assert_eq!(violation.bounds.max, 7.8);
        assert_eq!(violation.to_string(), "pH must be ≤ 7.8 (got 8)");
    }

    #[test]
    fn test_validate_reports_every_violation() {
        let raw = RawAbgInput {
            ph: 6.5,
            pco2: 200.0,
            hco3: 24.0,
            pao2: 10.0,
            base_excess: -31.0,
        };
        let err = validate(&raw).unwrap_err();

        let params: Vec<_> = err.violations.iter().map(|v| v.parameter).collect();
        assert_eq!(
            params,
            vec![
                AbgParameter::Ph,
                AbgParameter::PCo2,
                AbgParameter::PaO2,
                AbgParameter::BaseExcess
            ]
        );
    }

    #[test]
    fn test_validate_rejects_non_finite_values() {
        let raw = RawAbgInput {
            hco3: f64::NAN,
            ..RawAbgInput::default()
        };
        let err = validate(&raw).unwrap_err();
        let violation = err.violation_for(AbgParameter::Hco3).unwrap();
        assert_eq!(violation.to_string(), "HCO3 must be a finite number");
    }

    #[test]
    fn test_validate_accepts_exact_bounds() {
        let raw = RawAbgInput {
            ph: 6.8,
            pco2: 150.0,
            hco3: 5.0,
            pao2: 500.0,
            base_excess: -30.0,
        };
        assert!(validate(&raw).is_ok());
    }

    #[test]
    fn test_reading_deserialize_revalidates() {
        let ok: AbgReading =
            serde_json::from_str(r#"{"pH":7.3,"pCO2":50,"HCO3":24,"PaO2":80,"BE":-2}"#).unwrap();
        assert_eq!(ok.pco2(), 50.0);

        let bad = serde_json::from_str::<AbgReading>(
            r#"{"pH":9.1,"pCO2":50,"HCO3":24,"PaO2":80,"BE":-2}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_reading_serializes_with_wire_names() {
        let reading = validate(&RawAbgInput::default()).unwrap();
        let json = serde_json::to_value(reading).unwrap();
        assert_eq!(json["pH"], 7.4);
        assert_eq!(json["BE"], 0.0);
    }
}
