//! Remote inference service contract.
//!
//! The orchestrator only sees [`InferenceGateway`]: one fallible call that yields the three
//! natural-language fields of an analysis. The service itself comes in two shapes, and each
//! shape has an adapter implementing the gateway:
//!
//! - [`Staged`] drives a [`StagedInference`] through three dependent calls
//!   (interpret, then suggest conditions, then recommend treatment)
//! - [`Combined`] drives a [`CombinedInference`] through a single call returning all three
//!
//! Both adapters reject blank fields as a malformed response, so the orchestrator never has to
//! check completeness itself.

pub mod http;

use crate::config::{CoreConfig, GatewayMode};
use crate::error::{AbgResult, GatewayError};
use crate::validation::AbgReading;
use abg_types::NonEmptyText;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

pub use http::HttpInferenceClient;

/// The three remote fields of a successful analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAnalysis {
    pub interpretation: NonEmptyText,
    pub possible_conditions: NonEmptyText,
    pub treatment_recommendations: NonEmptyText,
}

#[async_trait]
pub trait InferenceGateway: Send + Sync {
    async fn analyse(&self, reading: &AbgReading) -> Result<RemoteAnalysis, GatewayError>;
}

/// A service exposing interpretation, condition suggestion and treatment as separate calls.
#[async_trait]
pub trait StagedInference: Send + Sync {
    async fn interpret(&self, reading: &AbgReading) -> Result<String, GatewayError>;

    async fn suggest_conditions(&self, interpretation: &str) -> Result<String, GatewayError>;

    async fn recommend_treatment(
        &self,
        diagnosis: &str,
        possible_conditions: &str,
    ) -> Result<String, GatewayError>;
}

/// Fields as returned by a combined call. Any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedResponse {
    #[serde(default)]
    pub interpretation: Option<String>,
    #[serde(default)]
    pub possible_conditions: Option<String>,
    #[serde(default)]
    pub treatment_recommendations: Option<String>,
}

/// A service producing the whole analysis in one call.
#[async_trait]
pub trait CombinedInference: Send + Sync {
    async fn full_analysis(&self, reading: &AbgReading) -> Result<CombinedResponse, GatewayError>;
}

fn required(field: &str, value: Option<String>) -> Result<NonEmptyText, GatewayError> {
    value
        .and_then(|v| NonEmptyText::new(v).ok())
        .ok_or_else(|| {
            GatewayError::MalformedResponse(format!("incomplete analysis: missing {field}"))
        })
}

/// Adapter running the three-call shape. Each call needs the previous call's output, so the
/// calls are strictly sequential.
pub struct Staged<T>(pub T);

#[async_trait]
impl<T: StagedInference> InferenceGateway for Staged<T> {
    async fn analyse(&self, reading: &AbgReading) -> Result<RemoteAnalysis, GatewayError> {
        tracing::debug!("inference stage 1/3: interpret");
        let interpretation = required("interpretation", Some(self.0.interpret(reading).await?))?;

        tracing::debug!("inference stage 2/3: suggest conditions");
        let possible_conditions = required(
            "possibleConditions",
            Some(self.0.suggest_conditions(interpretation.as_str()).await?),
        )?;

        tracing::debug!("inference stage 3/3: recommend treatment");
        let treatment_recommendations = required(
            "treatmentRecommendations",
            Some(
                self.0
                    .recommend_treatment(interpretation.as_str(), possible_conditions.as_str())
                    .await?,
            ),
        )?;

        Ok(RemoteAnalysis {
            interpretation,
            possible_conditions,
            treatment_recommendations,
        })
    }
}

/// Adapter running the single-call shape.
pub struct Combined<T>(pub T);

#[async_trait]
impl<T: CombinedInference> InferenceGateway for Combined<T> {
    async fn analyse(&self, reading: &AbgReading) -> Result<RemoteAnalysis, GatewayError> {
        tracing::debug!("inference: full analysis");
        let response = self.0.full_analysis(reading).await?;
        Ok(RemoteAnalysis {
            interpretation: required("interpretation", response.interpretation)?,
            possible_conditions: required("possibleConditions", response.possible_conditions)?,
            treatment_recommendations: required(
                "treatmentRecommendations",
                response.treatment_recommendations,
            )?,
        })
    }
}

/// Gateway used when no inference service is configured. Every call fails, so online
/// analyses fall back to the local verdict.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGateway;

#[async_trait]
impl InferenceGateway for DisabledGateway {
    async fn analyse(&self, _reading: &AbgReading) -> Result<RemoteAnalysis, GatewayError> {
        Err(GatewayError::Service(
            "inference service is not configured".into(),
        ))
    }
}

/// Builds the gateway described by `cfg`.
///
/// # Errors
///
/// Returns `AbgError::InvalidConfig` if the HTTP client cannot be constructed.
pub fn from_config(cfg: &CoreConfig) -> AbgResult<Arc<dyn InferenceGateway>> {
    let Some(base_url) = cfg.gateway_url() else {
        tracing::warn!("no inference service configured; online analyses will use local results");
        return Ok(Arc::new(DisabledGateway));
    };

    let client = HttpInferenceClient::new(base_url, cfg.gateway_timeout())?;
    Ok(match cfg.gateway_mode() {
        GatewayMode::Staged => Arc::new(Staged(client)),
        GatewayMode::Combined => Arc::new(Combined(client)),
    })
}
