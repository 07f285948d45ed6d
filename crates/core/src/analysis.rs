//! Analysis results and the notices that accompany degraded results.

use crate::validation::AbgReading;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One completed analysis of a panel.
///
/// Immutable once built. A correction is a new analysis, never an edit of an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: Uuid,
    pub interpretation: String,
    pub possible_conditions: String,
    pub treatment_recommendations: String,
    pub timestamp: DateTime<Utc>,
    pub inputs: AbgReading,
}

impl AnalysisResult {
    pub(crate) fn new(
        inputs: AbgReading,
        interpretation: String,
        possible_conditions: String,
        treatment_recommendations: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            interpretation,
            possible_conditions,
            treatment_recommendations,
            timestamp: Utc::now(),
            inputs,
        }
    }

    /// Treatment recommendations as individual bullet items.
    ///
    /// Returns the `- ` prefixed lines with the marker stripped, or an empty vector when the
    /// recommendations are not formatted as a Markdown bullet list.
    pub fn treatment_items(&self) -> Vec<&str> {
        self.treatment_recommendations
            .lines()
            .map(str::trim)
            .filter_map(|line| line.strip_prefix("- "))
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .collect()
    }
}

/// Why a result is less than a full local + remote analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Notice {
    /// The caller reported no connectivity; only the local verdict is present.
    Offline,
    /// The inference service failed; carries the failure reason.
    GatewayFailed(String),
    /// Online but no identity, and policy allows a local-only result.
    Unauthenticated,
}

impl Notice {
    /// Message suitable for showing next to the result.
    pub fn warning(&self) -> String {
        match self {
            Notice::Offline => "You are offline. Showing local analysis only.".into(),
            Notice::GatewayFailed(reason) => {
                format!("Sorry, we couldn't complete the analysis. {reason}")
            }
            Notice::Unauthenticated => {
                "You are not signed in. Showing local analysis only.".into()
            }
        }
    }
}

/// What `analyze` hands back: the result plus an optional notice.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub notice: Option<Notice>,
    /// Whether the result was appended to the caller's history.
    pub recorded: bool,
}

impl AnalysisOutcome {
    pub fn warning(&self) -> Option<String> {
        self.notice.as_ref().map(Notice::warning)
    }
}
