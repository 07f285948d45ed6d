use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use abg_core::{
    config::{
        auth_policy_from_env_value, gateway_mode_from_env_value, gateway_timeout_from_env_value,
        history_dir_from_env_value,
    },
    AnalysisOrchestrator, CoreConfig,
};
use api_rest::AppState;

/// Main entry point for the ABG interpreter service.
///
/// Resolves configuration from the environment (a `.env` file is honoured), wires the
/// orchestrator and serves the REST API.
///
/// # Environment Variables
/// - `ABG_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `ABG_HISTORY_DIR`: directory for per-user history (default: "abg_history")
/// - `ABG_GATEWAY_URL`: inference service base URL; unset disables remote analysis
/// - `ABG_GATEWAY_MODE`: `staged` (default) or `combined`
/// - `ABG_GATEWAY_TIMEOUT_SECS`: deadline for one remote analysis (default: 30)
/// - `ABG_AUTH_POLICY`: `require-identity` (default) or `local-fallback`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("abg=info".parse()?)
                .add_directive("abg_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("ABG_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(CoreConfig::new(
        history_dir_from_env_value(std::env::var("ABG_HISTORY_DIR").ok()),
        std::env::var("ABG_GATEWAY_URL").ok(),
        gateway_mode_from_env_value(std::env::var("ABG_GATEWAY_MODE").ok())?,
        gateway_timeout_from_env_value(std::env::var("ABG_GATEWAY_TIMEOUT_SECS").ok())?,
        auth_policy_from_env_value(std::env::var("ABG_AUTH_POLICY").ok())?,
    )?);

    tracing::info!(
        history_dir = %cfg.history_dir().display(),
        gateway = cfg.gateway_url().unwrap_or("<none>"),
        mode = ?cfg.gateway_mode(),
        auth_policy = ?cfg.auth_policy(),
        "++ Starting ABG REST on {}",
        rest_addr
    );

    let orchestrator = AnalysisOrchestrator::from_config(cfg)?;
    api_rest::serve(&rest_addr, AppState { orchestrator }).await?;
    Ok(())
}
