//! Deterministic acid-base classification.
//!
//! A flat rule table over pH, pCO2 and HCO3. Classification is pure and total over every
//! [`AbgReading`]: no I/O, no state, and the same reading always yields the same verdict.
//!
//! ## Rules
//!
//! 1. pH below the normal band is Acidosis, above it Alkalosis.
//! 2. pCO2 and HCO3 are each flagged high or low against their normal bands.
//! 3. If both systems push pH the same way the disorder is Mixed; compensation is not assessed.
//! 4. Otherwise the system whose flag explains the pH shift is the cause, or the cause is
//!    Unclear if neither does.
//! 5. The other system moving in the corrective direction is Partial compensation, escalated to
//!    Full when pH is back inside the normal band.
//!
//! A pH inside the normal band leans towards Acidosis below 7.40 and Alkalosis above it. Such a
//! reading is only reported as a disorder when the lean is explained by one system and fully
//! compensated by the other; anything else in the band is Normal.

use crate::ranges::{self, PH_NEUTRAL};
use crate::validation::AbgReading;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AcidBaseStatus {
    Normal,
    Acidosis,
    Alkalosis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cause {
    None,
    Respiratory,
    Metabolic,
    Mixed,
    Unclear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compensation {
    None,
    Partial,
    Full,
}

/// Result of classifying one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AcidBaseVerdict {
    pub status: AcidBaseStatus,
    pub cause: Cause,
    pub compensation: Compensation,
}

impl AcidBaseVerdict {
    pub const NORMAL: AcidBaseVerdict = AcidBaseVerdict {
        status: AcidBaseStatus::Normal,
        cause: Cause::None,
        compensation: Compensation::None,
    };

    fn new(status: AcidBaseStatus, cause: Cause, compensation: Compensation) -> Self {
        Self {
            status,
            cause,
            compensation,
        }
    }

    pub fn is_normal(&self) -> bool {
        self.status == AcidBaseStatus::Normal
    }
}

impl std::fmt::Display for AcidBaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            AcidBaseStatus::Normal => "Normal",
            AcidBaseStatus::Acidosis => "Acidosis",
            AcidBaseStatus::Alkalosis => "Alkalosis",
        })
    }
}

impl std::fmt::Display for AcidBaseVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status;
        match (status, self.cause) {
            (AcidBaseStatus::Normal, _) | (_, Cause::None) => {
                f.write_str("Normal acid-base balance.")
            }
            (_, Cause::Mixed) => write!(f, "Mixed {status} (Respiratory and Metabolic)."),
            (_, Cause::Unclear) => write!(
                f,
                "Primary {status} of unclear origin based on provided values."
            ),
            (_, cause @ (Cause::Respiratory | Cause::Metabolic)) => {
                let (primary, other) = match cause {
                    Cause::Respiratory => ("Respiratory", "metabolic"),
                    _ => ("Metabolic", "respiratory"),
                };
                write!(f, "{primary} {status}")?;
                match self.compensation {
                    Compensation::None => {}
                    Compensation::Partial => write!(f, " with partial {other} compensation")?,
                    Compensation::Full => write!(f, " with full {other} compensation")?,
                }
                f.write_str(".")
            }
        }
    }
}

/// Renders a verdict as the sentence shown to clinicians.
pub fn render(verdict: &AcidBaseVerdict) -> String {
    verdict.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhBand {
    Below,
    Within,
    Above,
}

/// High/low flags for the two buffering systems.
#[derive(Debug, Clone, Copy)]
struct Flags {
    pco2_high: bool,
    pco2_low: bool,
    hco3_high: bool,
    hco3_low: bool,
}

impl Flags {
    fn of(reading: &AbgReading) -> Self {
        let pco2 = ranges::PCO2.normal.unwrap_or(ranges::PCO2.valid);
        let hco3 = ranges::HCO3.normal.unwrap_or(ranges::HCO3.valid);
        Self {
            pco2_high: reading.pco2() > pco2.max,
            pco2_low: reading.pco2() < pco2.min,
            hco3_high: reading.hco3() > hco3.max,
            hco3_low: reading.hco3() < hco3.min,
        }
    }

    /// pCO2 moved in the direction that produces `status`.
    fn respiratory_drives(&self, status: AcidBaseStatus) -> bool {
        match status {
            AcidBaseStatus::Acidosis => self.pco2_high,
            AcidBaseStatus::Alkalosis => self.pco2_low,
            AcidBaseStatus::Normal => false,
        }
    }

    /// HCO3 moved in the direction that produces `status`.
    fn metabolic_drives(&self, status: AcidBaseStatus) -> bool {
        match status {
            AcidBaseStatus::Acidosis => self.hco3_low,
            AcidBaseStatus::Alkalosis => self.hco3_high,
            AcidBaseStatus::Normal => false,
        }
    }

    /// The system other than `cause` moved against `status`.
    fn compensates(&self, status: AcidBaseStatus, cause: Cause) -> bool {
        match cause {
            Cause::Respiratory => self.metabolic_drives(opposite(status)),
            Cause::Metabolic => self.respiratory_drives(opposite(status)),
            _ => false,
        }
    }
}

fn opposite(status: AcidBaseStatus) -> AcidBaseStatus {
    match status {
        AcidBaseStatus::Acidosis => AcidBaseStatus::Alkalosis,
        AcidBaseStatus::Alkalosis => AcidBaseStatus::Acidosis,
        AcidBaseStatus::Normal => AcidBaseStatus::Normal,
    }
}

fn ph_band(ph: f64) -> PhBand {
    let normal = ranges::PH.normal.unwrap_or(ranges::PH.valid);
    if ph < normal.min {
        PhBand::Below
    } else if ph > normal.max {
        PhBand::Above
    } else {
        PhBand::Within
    }
}

/// Classifies a validated reading.
pub fn classify(reading: &AbgReading) -> AcidBaseVerdict {
    let band = ph_band(reading.ph());
    let flags = Flags::of(reading);

    let status = match band {
        PhBand::Below => AcidBaseStatus::Acidosis,
        PhBand::Above => AcidBaseStatus::Alkalosis,
        PhBand::Within if reading.ph() < PH_NEUTRAL => AcidBaseStatus::Acidosis,
        PhBand::Within if reading.ph() > PH_NEUTRAL => AcidBaseStatus::Alkalosis,
        PhBand::Within => return AcidBaseVerdict::NORMAL,
    };
    let within = band == PhBand::Within;

    let respiratory = flags.respiratory_drives(status);
    let metabolic = flags.metabolic_drives(status);

    if respiratory && metabolic && !within {
        return AcidBaseVerdict::new(status, Cause::Mixed, Compensation::None);
    }

    let cause = if respiratory {
        Cause::Respiratory
    } else if metabolic {
        Cause::Metabolic
    } else if within {
        return AcidBaseVerdict::NORMAL;
    } else {
        return AcidBaseVerdict::new(status, Cause::Unclear, Compensation::None);
    };

    let compensation = match (flags.compensates(status, cause), within) {
        (true, true) => Compensation::Full,
        (true, false) => Compensation::Partial,
        (false, false) => Compensation::None,
        // Uncompensated deviation with a normal pH is not reported.
        (false, true) => return AcidBaseVerdict::NORMAL,
    };

    AcidBaseVerdict::new(status, cause, compensation)
}
