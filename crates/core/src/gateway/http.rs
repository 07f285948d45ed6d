//! HTTP client for a JSON inference service.
//!
//! Endpoints, relative to the configured base URL:
//!
//! | Path | Request | Response |
//! |---|---|---|
//! | `POST /interpret` | `{pH, pCO2, HCO3, PaO2, BE}` | `{interpretation}` |
//! | `POST /suggest-conditions` | `{abgInterpretation}` | `{possibleConditions}` |
//! | `POST /recommend-treatment` | `{diagnosis, possibleConditions}` | `{treatmentRecommendations}` |
//! | `POST /analyse` | `{pH, pCO2, HCO3, PaO2, BE}` | all three fields |

use super::{CombinedInference, CombinedResponse, StagedInference};
use crate::error::{AbgError, AbgResult, GatewayError};
use crate::validation::{AbgReading, RawAbgInput};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuggestConditionsReq<'a> {
    abg_interpretation: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendTreatmentReq<'a> {
    diagnosis: &'a str,
    possible_conditions: &'a str,
}

#[derive(Deserialize)]
struct InterpretRes {
    #[serde(default)]
    interpretation: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestConditionsRes {
    #[serde(default)]
    possible_conditions: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendTreatmentRes {
    #[serde(default)]
    treatment_recommendations: Option<String>,
}

/// Talks to the inference service over HTTP. Implements both service shapes.
#[derive(Clone, Debug)]
pub struct HttpInferenceClient {
    client: Client,
    base_url: String,
}

impl HttpInferenceClient {
    /// Creates a client for the service at `base_url`.
    ///
    /// `timeout` bounds each individual HTTP request.
    ///
    /// # Errors
    ///
    /// Returns `AbgError::InvalidConfig` if the URL is blank or the TLS backend cannot be
    /// initialised.
    pub fn new(base_url: &str, timeout: Duration) -> AbgResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(AbgError::InvalidConfig(
                "inference service URL cannot be empty".into(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AbgError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned + Send,
    {
        let response = self
            .client
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Service(format!(
                "{path} returned HTTP {status}"
            )));
        }

        response.json::<R>().await.map_err(map_reqwest_error)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_decode() {
        GatewayError::MalformedResponse(e.to_string())
    } else {
        GatewayError::Service(e.to_string())
    }
}

fn field(value: Option<String>, name: &str) -> Result<String, GatewayError> {
    value.ok_or_else(|| {
        GatewayError::MalformedResponse(format!("incomplete analysis: missing {name}"))
    })
}

#[async_trait]
impl StagedInference for HttpInferenceClient {
    async fn interpret(&self, reading: &AbgReading) -> Result<String, GatewayError> {
        let res: InterpretRes = self.post("interpret", &RawAbgInput::from(*reading)).await?;
        field(res.interpretation, "interpretation")
    }

    async fn suggest_conditions(&self, interpretation: &str) -> Result<String, GatewayError> {
        let req = SuggestConditionsReq {
            abg_interpretation: interpretation,
        };
        let res: SuggestConditionsRes = self.post("suggest-conditions", &req).await?;
        field(res.possible_conditions, "possibleConditions")
    }

    async fn recommend_treatment(
        &self,
        diagnosis: &str,
        possible_conditions: &str,
    ) -> Result<String, GatewayError> {
        let req = RecommendTreatmentReq {
            diagnosis,
            possible_conditions,
        };
        let res: RecommendTreatmentRes = self.post("recommend-treatment", &req).await?;
        field(res.treatment_recommendations, "treatmentRecommendations")
    }
}

#[async_trait]
impl CombinedInference for HttpInferenceClient {
    async fn full_analysis(&self, reading: &AbgReading) -> Result<CombinedResponse, GatewayError> {
        self.post("analyse", &RawAbgInput::from(*reading)).await
    }
}
