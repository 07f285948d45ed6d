//! Analysis orchestration.
//!
//! Combines the deterministic classifier with the remote inference gateway and records the
//! outcome in the caller's history.
//!
//! ## Policy, in order
//!
//! 1. The local verdict is always computed first.
//! 2. Offline: local verdict plus "unavailable offline" placeholders. The gateway is not called.
//! 3. Online with no identity: `AbgError::AuthRequired`, or a local-only result when
//!    [`AuthPolicy::LocalFallback`] is configured.
//! 4. Online with an identity: the gateway runs under the configured deadline. On failure the
//!    result is the local verdict plus "AI analysis failed" placeholders and a
//!    [`Notice::GatewayFailed`] carrying the reason.
//! 5. On success the interpretation is the local text followed by the remote text.
//! 6. The result is appended to the history of a persistent identity. Transient identities
//!    and anonymous callers are never recorded.
//!
//! The history append is the last step of the pipeline. If the caller drops the future while a
//! gateway call is in flight, nothing is recorded.

use crate::analysis::{AnalysisOutcome, AnalysisResult, Notice};
use crate::classifier::{classify, render};
use crate::config::{AuthPolicy, CoreConfig};
use crate::constants::{
    GATEWAY_FAILED_PLACEHOLDER, OFFLINE_CONDITIONS_PLACEHOLDER, OFFLINE_TREATMENT_PLACEHOLDER,
    UNAUTHENTICATED_PLACEHOLDER,
};
use crate::error::{AbgError, AbgResult, GatewayError};
use crate::gateway::{self, InferenceGateway, RemoteAnalysis};
use crate::history::{FileHistoryStore, HistoryLedger};
use crate::identity::IdentityProvider;
use crate::validation::{validate, AbgReading, RawAbgInput};
use abg_types::{Connectivity, Identity};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct AnalysisOrchestrator {
    cfg: Arc<CoreConfig>,
    gateway: Arc<dyn InferenceGateway>,
    ledger: HistoryLedger,
}

impl AnalysisOrchestrator {
    pub fn new(
        cfg: Arc<CoreConfig>,
        gateway: Arc<dyn InferenceGateway>,
        ledger: HistoryLedger,
    ) -> Self {
        Self {
            cfg,
            gateway,
            ledger,
        }
    }

    /// Wires the gateway and a file-backed ledger described by `cfg`.
    ///
    /// # Errors
    ///
    /// Returns `AbgError::InvalidConfig` if the gateway client cannot be built.
    pub fn from_config(cfg: Arc<CoreConfig>) -> AbgResult<Self> {
        let gateway = gateway::from_config(&cfg)?;
        let ledger = HistoryLedger::new(Arc::new(FileHistoryStore::new(cfg.history_dir())));
        Ok(Self::new(cfg, gateway, ledger))
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    pub fn config(&self) -> &CoreConfig {
        &self.cfg
    }

    /// Validates `raw` and then runs [`analyze`](Self::analyze).
    ///
    /// # Errors
    ///
    /// Returns `AbgError::Validation` without classifying anything if any value is out of
    /// bounds, otherwise whatever `analyze` returns.
    pub async fn analyze_raw(
        &self,
        raw: &RawAbgInput,
        identity: Option<&Identity>,
        connectivity: Connectivity,
    ) -> AbgResult<AnalysisOutcome> {
        let reading = validate(raw)?;
        self.analyze(reading, identity, connectivity).await
    }

    /// Validates `raw`, asks `provider` for the current identity, and analyses.
    pub async fn analyze_current(
        &self,
        raw: &RawAbgInput,
        provider: &dyn IdentityProvider,
        connectivity: Connectivity,
    ) -> AbgResult<AnalysisOutcome> {
        let reading = validate(raw)?;
        let identity = provider.current_identity().await;
        self.analyze(reading, identity.as_ref(), connectivity).await
    }

    /// Runs the full pipeline for one validated reading.
    ///
    /// # Errors
    ///
    /// - `AbgError::AuthRequired` if online, without identity, under
    ///   [`AuthPolicy::RequireIdentity`]
    /// - `AbgError::Store` if the result cannot be appended to the history
    ///
    /// Gateway failures are never returned as errors; they produce a fallback result with a
    /// [`Notice::GatewayFailed`].
    pub async fn analyze(
        &self,
        reading: AbgReading,
        identity: Option<&Identity>,
        connectivity: Connectivity,
    ) -> AbgResult<AnalysisOutcome> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "analyze",
            %request_id,
            online = !connectivity.is_offline(),
            authenticated = identity.is_some(),
        );
        self.run_pipeline(reading, identity, connectivity)
            .instrument(span)
            .await
    }

    async fn run_pipeline(
        &self,
        reading: AbgReading,
        identity: Option<&Identity>,
        connectivity: Connectivity,
    ) -> AbgResult<AnalysisOutcome> {
        let verdict = classify(&reading);
        let local = render(&verdict);
        tracing::debug!(?verdict, "local verdict");

        let (result, notice) = if connectivity.is_offline() {
            (
                AnalysisResult::new(
                    reading,
                    local,
                    OFFLINE_CONDITIONS_PLACEHOLDER.into(),
                    OFFLINE_TREATMENT_PLACEHOLDER.into(),
                ),
                Some(Notice::Offline),
            )
        } else if identity.is_none() {
            match self.cfg.auth_policy() {
                AuthPolicy::RequireIdentity => {
                    tracing::info!("online analysis rejected: no identity");
                    return Err(AbgError::AuthRequired);
                }
                AuthPolicy::LocalFallback => (
                    AnalysisResult::new(
                        reading,
                        local,
                        UNAUTHENTICATED_PLACEHOLDER.into(),
                        UNAUTHENTICATED_PLACEHOLDER.into(),
                    ),
                    Some(Notice::Unauthenticated),
                ),
            }
        } else {
            match self.remote(&reading).await {
                Ok(remote) => (
                    AnalysisResult::new(
                        reading,
                        format!("{local} {}", remote.interpretation),
                        remote.possible_conditions.into_string(),
                        remote.treatment_recommendations.into_string(),
                    ),
                    None,
                ),
                Err(e) => {
                    tracing::warn!(error = %e, "inference failed; falling back to local verdict");
                    (
                        AnalysisResult::new(
                            reading,
                            local,
                            GATEWAY_FAILED_PLACEHOLDER.into(),
                            GATEWAY_FAILED_PLACEHOLDER.into(),
                        ),
                        Some(Notice::GatewayFailed(e.to_string())),
                    )
                }
            }
        };

        let recorded = match identity {
            Some(identity) if !identity.is_transient() => {
                self.ledger.append(identity, result.clone()).await?;
                true
            }
            _ => false,
        };

        tracing::info!(
            entry = %result.id,
            recorded,
            degraded = notice.is_some(),
            "analysis complete"
        );

        Ok(AnalysisOutcome {
            result,
            notice,
            recorded,
        })
    }

    async fn remote(&self, reading: &AbgReading) -> Result<RemoteAnalysis, GatewayError> {
        match tokio::time::timeout(self.cfg.gateway_timeout(), self.gateway.analyse(reading)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(GatewayError::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayMode;
    use crate::gateway::{Staged, StagedInference};
    use crate::identity::FixedIdentity;
    use crate::ranges::AbgParameter;
    use abg_types::NonEmptyText;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Stages that count calls and can fail or stall at a chosen stage (1-based).
    #[derive(Default)]
    struct FakeStages {
        calls: AtomicUsize,
        fail_at: Option<usize>,
        stall_at: Option<usize>,
    }

    impl FakeStages {
        async fn step(&self, output: &str) -> Result<String, GatewayError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.stall_at == Some(n) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if self.fail_at == Some(n) {
                return Err(GatewayError::Service(format!("stage {n} unavailable")));
            }
            Ok(output.to_string())
        }
    }

    #[async_trait]
    impl StagedInference for FakeStages {
        async fn interpret(&self, _reading: &AbgReading) -> Result<String, GatewayError> {
            self.step("Remote interpretation.").await
        }

        async fn suggest_conditions(&self, _interpretation: &str) -> Result<String, GatewayError> {
            self.step("COPD; opioid toxicity").await
        }

        async fn recommend_treatment(
            &self,
            _diagnosis: &str,
            _possible_conditions: &str,
        ) -> Result<String, GatewayError> {
            self.step("- Controlled oxygen\n- Consider NIV").await
        }
    }

    struct Harness {
        orchestrator: AnalysisOrchestrator,
        stages: Arc<Staged<FakeStages>>,
    }

    fn harness_with(stages: FakeStages, auth_policy: AuthPolicy, timeout: Duration) -> Harness {
        let cfg = Arc::new(
            CoreConfig::new(
                PathBuf::from("unused"),
                None,
                GatewayMode::Staged,
                timeout,
                auth_policy,
            )
            .expect("CoreConfig::new should succeed"),
        );
        let stages = Arc::new(Staged(stages));
        let orchestrator =
            AnalysisOrchestrator::new(cfg, stages.clone(), HistoryLedger::in_memory());
        Harness {
            orchestrator,
            stages,
        }
    }

    fn harness(stages: FakeStages) -> Harness {
        harness_with(stages, AuthPolicy::RequireIdentity, Duration::from_secs(5))
    }

    impl Harness {
        fn gateway_calls(&self) -> usize {
            self.stages.0.calls.load(Ordering::SeqCst)
        }
    }

    fn persistent(id: &str) -> Identity {
        Identity::persistent(NonEmptyText::new(id).unwrap())
    }

    fn respiratory_acidosis() -> AbgReading {
        validate(&RawAbgInput {
            ph: 7.25,
            pco2: 60.0,
            hco3: 24.0,
            pao2: 70.0,
            base_excess: -1.0,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_online_success_concatenates_local_and_remote() {
        let h = harness(FakeStages::default());
        let alice = persistent("alice");

        let outcome = h
            .orchestrator
            .analyze(respiratory_acidosis(), Some(&alice), Connectivity::Online)
            .await
            .expect("analysis should succeed");

        assert_eq!(
            outcome.result.interpretation,
            "Respiratory Acidosis. Remote interpretation."
        );
        assert_eq!(outcome.result.possible_conditions, "COPD; opioid toxicity");
        assert_eq!(
            outcome.result.treatment_items(),
            vec!["Controlled oxygen", "Consider NIV"]
        );
        assert_eq!(outcome.notice, None);
        assert!(outcome.recorded);
        assert_eq!(h.gateway_calls(), 3);
    }

    #[tokio::test]
    async fn test_offline_never_calls_gateway() {
        let h = harness(FakeStages::default());
        let alice = persistent("alice");

        for identity in [None, Some(&alice)] {
            let outcome = h
                .orchestrator
                .analyze(respiratory_acidosis(), identity, Connectivity::Offline)
                .await
                .expect("offline analysis should succeed");

            assert_eq!(outcome.notice, Some(Notice::Offline));
            assert_eq!(outcome.result.interpretation, "Respiratory Acidosis.");
            assert_eq!(
                outcome.result.possible_conditions,
                OFFLINE_CONDITIONS_PLACEHOLDER
            );
            assert_eq!(
                outcome.result.treatment_recommendations,
                OFFLINE_TREATMENT_PLACEHOLDER
            );
        }

        assert_eq!(h.gateway_calls(), 0);
        assert_eq!(h.orchestrator.ledger().list(&alice).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_online_without_identity_requires_auth() {
        let h = harness(FakeStages::default());

        let err = h
            .orchestrator
            .analyze(respiratory_acidosis(), None, Connectivity::Online)
            .await
            .unwrap_err();

        assert!(matches!(err, AbgError::AuthRequired));
        assert_eq!(h.gateway_calls(), 0);
    }

    #[tokio::test]
    async fn test_online_without_identity_local_fallback_policy() {
        let h = harness_with(
            FakeStages::default(),
            AuthPolicy::LocalFallback,
            Duration::from_secs(5),
        );

        let outcome = h
            .orchestrator
            .analyze(respiratory_acidosis(), None, Connectivity::Online)
            .await
            .unwrap();

        assert_eq!(outcome.notice, Some(Notice::Unauthenticated));
        assert_eq!(outcome.result.interpretation, "Respiratory Acidosis.");
        assert!(!outcome.recorded);
        assert_eq!(h.gateway_calls(), 0);
    }

    #[tokio::test]
    async fn test_gateway_failure_falls_back_to_local_text() {
        for stage in 1..=3 {
            let h = harness(FakeStages {
                fail_at: Some(stage),
                ..Default::default()
            });
            let alice = persistent("alice");

            let outcome = h
                .orchestrator
                .analyze(respiratory_acidosis(), Some(&alice), Connectivity::Online)
                .await
                .expect("gateway failure must not be an error");

            assert_eq!(outcome.result.interpretation, "Respiratory Acidosis.");
            assert_eq!(outcome.result.possible_conditions, GATEWAY_FAILED_PLACEHOLDER);
            assert_eq!(
                outcome.result.treatment_recommendations,
                GATEWAY_FAILED_PLACEHOLDER
            );
            let warning = outcome.warning().expect("a warning should be reported");
            assert!(warning.contains(&format!("stage {stage} unavailable")));
            assert!(outcome.recorded, "fallback results are still recorded");
            assert_eq!(h.gateway_calls(), stage, "pipeline stops at the failing stage");
        }
    }

    #[tokio::test]
    async fn test_gateway_deadline_is_timeout_warning() {
        let h = harness_with(
            FakeStages {
                stall_at: Some(2),
                ..Default::default()
            },
            AuthPolicy::RequireIdentity,
            Duration::from_millis(50),
        );
        let alice = persistent("alice");

        let outcome = h
            .orchestrator
            .analyze(respiratory_acidosis(), Some(&alice), Connectivity::Online)
            .await
            .unwrap();

        assert_eq!(
            outcome.notice,
            Some(Notice::GatewayFailed(GatewayError::Timeout.to_string()))
        );
        assert_eq!(outcome.result.interpretation, "Respiratory Acidosis.");
    }

    #[tokio::test]
    async fn test_transient_identity_is_not_recorded() {
        let h = harness(FakeStages::default());
        let guest = Identity::transient(NonEmptyText::new("guest-1").unwrap());

        let outcome = h
            .orchestrator
            .analyze(respiratory_acidosis(), Some(&guest), Connectivity::Online)
            .await
            .unwrap();

        assert!(!outcome.recorded);
        assert_eq!(h.gateway_calls(), 3);
        assert!(h.orchestrator.ledger().list(&guest).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_has_one_entry_per_call_newest_first() {
        let h = harness(FakeStages::default());
        let alice = persistent("alice");

        let mut produced = Vec::new();
        for (i, connectivity) in [
            Connectivity::Online,
            Connectivity::Offline,
            Connectivity::Online,
            Connectivity::Online,
        ]
        .into_iter()
        .enumerate()
        {
            let raw = RawAbgInput {
                ph: 7.30 + i as f64 * 0.01,
                ..RawAbgInput::default()
            };
            let outcome = h
                .orchestrator
                .analyze_raw(&raw, Some(&alice), connectivity)
                .await
                .unwrap();
            produced.push(outcome.result);
        }

        let listed = h.orchestrator.ledger().list(&alice).await.unwrap();
        produced.reverse();
        assert_eq!(listed, produced);
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected_before_classification() {
        let h = harness(FakeStages::default());
        let alice = persistent("alice");
        let raw = RawAbgInput {
            ph: 8.0,
            ..RawAbgInput::default()
        };

        let err = h
            .orchestrator
            .analyze_raw(&raw, Some(&alice), Connectivity::Online)
            .await
            .unwrap_err();

        match err {
            AbgError::Validation(e) => assert!(e.violation_for(AbgParameter::Ph).is_some()),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(h.gateway_calls(), 0);
        assert!(h.orchestrator.ledger().list(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_request_records_nothing() {
        let h = harness(FakeStages {
            stall_at: Some(1),
            ..Default::default()
        });
        let alice = persistent("alice");

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            h.orchestrator
                .analyze(respiratory_acidosis(), Some(&alice), Connectivity::Online),
        )
        .await;

        assert!(abandoned.is_err(), "caller gave up before completion");
        assert!(h.orchestrator.ledger().list(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_analyze_current_uses_provider_identity() {
        let h = harness(FakeStages::default());
        let provider = FixedIdentity(Some(persistent("carol")));

        let outcome = h
            .orchestrator
            .analyze_current(&RawAbgInput::default(), &provider, Connectivity::Online)
            .await
            .unwrap();

        assert!(outcome.recorded);
        assert_eq!(
            outcome.result.interpretation,
            "Normal acid-base balance. Remote interpretation."
        );
        let listed = h
            .orchestrator
            .ledger()
            .list(&persistent("carol"))
            .await
            .unwrap();
        assert_eq!(listed, vec![outcome.result]);
    }

    #[tokio::test]
    async fn test_from_config_without_gateway_falls_back_and_persists() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let cfg = Arc::new(
            CoreConfig::new(
                temp_dir.path().to_path_buf(),
                None,
                GatewayMode::Staged,
                Duration::from_secs(5),
                AuthPolicy::RequireIdentity,
            )
            .unwrap(),
        );
        let orchestrator = AnalysisOrchestrator::from_config(cfg.clone()).unwrap();
        let alice = persistent("alice");

        let outcome = orchestrator
            .analyze(respiratory_acidosis(), Some(&alice), Connectivity::Online)
            .await
            .unwrap();
        assert!(matches!(outcome.notice, Some(Notice::GatewayFailed(_))));
        assert!(outcome.recorded);

        // A second orchestrator over the same directory sees the entry.
        let reopened = AnalysisOrchestrator::from_config(cfg).unwrap();
        let listed = reopened.ledger().list(&alice).await.unwrap();
        assert_eq!(listed, vec![outcome.result]);
    }
}
