//! Request and response bodies for the ABG APIs.
//!
//! Field names follow the stored record format (`pH`, `pCO2`, `possibleConditions`, ...) so a
//! history entry looks the same on the wire and on disk.

use abg_core::{
    AbgParameter, AnalysisOutcome, AnalysisResult, BoundViolation, Connectivity, RawAbgInput,
    ValidationError,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// The five panel values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AbgValues {
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

impl From<AbgValues> for RawAbgInput {
    fn from(v: AbgValues) -> Self {
        RawAbgInput {
            ph: v.ph,
            pco2: v.pco2,
            hco3: v.hco3,
            pao2: v.pao2,
            base_excess: v.base_excess,
        }
    }
}

impl From<RawAbgInput> for AbgValues {
    fn from(v: RawAbgInput) -> Self {
        AbgValues {
            ph: v.ph,
            pco2: v.pco2,
            hco3: v.hco3,
            pao2: v.pao2,
            base_excess: v.base_excess,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityDto {
    #[default]
    Online,
    Offline,
}

impl From<ConnectivityDto> for Connectivity {
    fn from(c: ConnectivityDto) -> Self {
        match c {
            ConnectivityDto::Online => Connectivity::Online,
            ConnectivityDto::Offline => Connectivity::Offline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalyseReq {
    pub values: AbgValues,
    /// Caller-probed connectivity; defaults to online.
    #[serde(default)]
    pub connectivity: ConnectivityDto,
}

/// One analysis as shown to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisEntry {
    pub id: Uuid,
    pub interpretation: String,
    pub possible_conditions: String,
    pub treatment_recommendations: String,
    /// Bullet items of `treatmentRecommendations`, empty when it is prose.
    pub treatment_items: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub inputs: AbgValues,
}

impl From<&AnalysisResult> for AnalysisEntry {
    fn from(r: &AnalysisResult) -> Self {
        AnalysisEntry {
            id: r.id,
            interpretation: r.interpretation.clone(),
            possible_conditions: r.possible_conditions.clone(),
            treatment_recommendations: r.treatment_recommendations.clone(),
            treatment_items: r.treatment_items().into_iter().map(String::from).collect(),
            timestamp: r.timestamp,
            inputs: RawAbgInput::from(r.inputs).into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalyseRes {
    pub result: AnalysisEntry,
    /// `offline`, `gateway_failed` or `unauthenticated` when the result is degraded.
    pub notice: Option<String>,
    pub warning: Option<String>,
    pub recorded: bool,
}

impl From<&AnalysisOutcome> for AnalyseRes {
    fn from(outcome: &AnalysisOutcome) -> Self {
        use abg_core::Notice;

        AnalyseRes {
            result: AnalysisEntry::from(&outcome.result),
            notice: outcome.notice.as_ref().map(|n| {
                match n {
                    Notice::Offline => "offline",
                    Notice::GatewayFailed(_) => "gateway_failed",
                    Notice::Unauthenticated => "unauthenticated",
                }
                .to_string()
            }),
            warning: outcome.warning(),
            recorded: outcome.recorded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoryRes {
    pub entries: Vec<AnalysisEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ViolationDto {
    pub parameter: String,
    pub value: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub message: String,
}

impl From<&BoundViolation> for ViolationDto {
    fn from(v: &BoundViolation) -> Self {
        ViolationDto {
            parameter: v.parameter.label().to_string(),
            // JSON has no NaN or infinity.
            value: v.value.is_finite().then_some(v.value),
            min: v.bounds.min,
            max: v.bounds.max,
            message: v.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<ViolationDto>,
}

impl ErrorRes {
    pub fn message(error: impl Into<String>) -> Self {
        ErrorRes {
            error: error.into(),
            violations: Vec::new(),
        }
    }
}

impl From<&ValidationError> for ErrorRes {
    fn from(e: &ValidationError) -> Self {
        ErrorRes {
            error: "Invalid input. Please check the values and try again.".into(),
            violations: e.violations.iter().map(ViolationDto::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RangeEntry {
    pub parameter: String,
    pub unit: Option<String>,
    pub normal_min: Option<f64>,
    pub normal_max: Option<f64>,
    pub valid_min: f64,
    pub valid_max: f64,
}

impl From<AbgParameter> for RangeEntry {
    fn from(p: AbgParameter) -> Self {
        let range = p.range();
        RangeEntry {
            parameter: p.label().to_string(),
            unit: p.unit().map(String::from),
            normal_min: range.normal.map(|b| b.min),
            normal_max: range.normal.map(|b| b.max),
            valid_min: range.valid.min,
            valid_max: range.valid.max,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RangesRes {
    pub ranges: Vec<RangeEntry>,
}

impl RangesRes {
    pub fn table() -> Self {
        RangesRes {
            ranges: AbgParameter::ALL.into_iter().map(RangeEntry::from).collect(),
        }
    }
}
