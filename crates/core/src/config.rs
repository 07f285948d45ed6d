//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as
//! `Arc<CoreConfig>`. Core code never reads environment variables; binaries read them and hand
//! the raw values to the parsing helpers below.

use crate::constants::{DEFAULT_GATEWAY_TIMEOUT_SECS, DEFAULT_HISTORY_DIR};
use crate::error::{AbgError, AbgResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Which shape of inference service sits behind the configured URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatewayMode {
    /// Three dependent calls: interpret, suggest conditions, recommend treatment.
    #[default]
    Staged,
    /// One call returning all three fields.
    Combined,
}

impl FromStr for GatewayMode {
    type Err = AbgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staged" => Ok(GatewayMode::Staged),
            "combined" => Ok(GatewayMode::Combined),
            other => Err(AbgError::InvalidConfig(format!(
                "unknown gateway mode '{other}' (expected 'staged' or 'combined')"
            ))),
        }
    }
}

/// What an online analysis does when the caller has no identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthPolicy {
    /// Reject with `AbgError::AuthRequired`.
    #[default]
    RequireIdentity,
    /// Return the local verdict only, with an `Unauthenticated` notice.
    LocalFallback,
}

impl FromStr for AuthPolicy {
    type Err = AbgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "require-identity" => Ok(AuthPolicy::RequireIdentity),
            "local-fallback" => Ok(AuthPolicy::LocalFallback),
            other => Err(AbgError::InvalidConfig(format!(
                "unknown auth policy '{other}' (expected 'require-identity' or 'local-fallback')"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    history_dir: PathBuf,
    gateway_url: Option<String>,
    gateway_mode: GatewayMode,
    gateway_timeout: Duration,
    auth_policy: AuthPolicy,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// A blank `gateway_url` is treated as no gateway.
    ///
    /// # Errors
    ///
    /// Returns `AbgError::InvalidConfig` if `gateway_timeout` is zero.
    pub fn new(
        history_dir: PathBuf,
        gateway_url: Option<String>,
        gateway_mode: GatewayMode,
        gateway_timeout: Duration,
        auth_policy: AuthPolicy,
    ) -> AbgResult<Self> {
        if gateway_timeout.is_zero() {
            return Err(AbgError::InvalidConfig(
                "gateway timeout must be greater than zero".into(),
            ));
        }

        Ok(Self {
            history_dir,
            gateway_url: gateway_url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            gateway_mode,
            gateway_timeout,
            auth_policy,
        })
    }

    pub fn history_dir(&self) -> &Path {
        &self.history_dir
    }

    pub fn gateway_url(&self) -> Option<&str> {
        self.gateway_url.as_deref()
    }

    pub fn gateway_mode(&self) -> GatewayMode {
        self.gateway_mode
    }

    /// Deadline for the whole remote part of one analysis.
    pub fn gateway_timeout(&self) -> Duration {
        self.gateway_timeout
    }

    pub fn auth_policy(&self) -> AuthPolicy {
        self.auth_policy
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            history_dir: PathBuf::from(DEFAULT_HISTORY_DIR),
            gateway_url: None,
            gateway_mode: GatewayMode::default(),
            gateway_timeout: Duration::from_secs(DEFAULT_GATEWAY_TIMEOUT_SECS),
            auth_policy: AuthPolicy::default(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the gateway mode from an optional string value, defaulting to staged.
pub fn gateway_mode_from_env_value(value: Option<String>) -> AbgResult<GatewayMode> {
    Ok(non_blank(value)
        .map(|v| v.parse::<GatewayMode>())
        .transpose()?
        .unwrap_or_default())
}

/// Parse the auth policy from an optional string value, defaulting to `require-identity`.
pub fn auth_policy_from_env_value(value: Option<String>) -> AbgResult<AuthPolicy> {
    Ok(non_blank(value)
        .map(|v| v.parse::<AuthPolicy>())
        .transpose()?
        .unwrap_or_default())
}

/// Parse a timeout in whole seconds, defaulting to [`DEFAULT_GATEWAY_TIMEOUT_SECS`].
pub fn gateway_timeout_from_env_value(value: Option<String>) -> AbgResult<Duration> {
    let secs = match non_blank(value) {
        Some(v) => v.parse::<u64>().map_err(|_| {
            AbgError::InvalidConfig(format!("gateway timeout '{v}' is not a whole number of seconds"))
        })?,
        None => DEFAULT_GATEWAY_TIMEOUT_SECS,
    };
    Ok(Duration::from_secs(secs))
}

/// Resolve the history directory, defaulting to [`DEFAULT_HISTORY_DIR`].
pub fn history_dir_from_env_value(value: Option<String>) -> PathBuf {
    non_blank(value)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_DIR))
}
