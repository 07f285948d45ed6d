//! Constants used throughout the ABG core crate.

/// Default directory for the file-backed history store.
pub const DEFAULT_HISTORY_DIR: &str = "abg_history";

/// Filename of a single identity's history within its sharded directory.
pub const HISTORY_FILENAME: &str = "history.json";

/// Lock file held exclusively across each history rewrite, next to [`HISTORY_FILENAME`].
pub const HISTORY_LOCK_FILENAME: &str = "history.lock";

/// Default deadline for the remote part of one analysis, in seconds.
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;

pub const OFFLINE_CONDITIONS_PLACEHOLDER: &str = "Offline: AI-powered suggestions unavailable.";

pub const OFFLINE_TREATMENT_PLACEHOLDER: &str = "Offline: AI-powered recommendations unavailable.";

pub const GATEWAY_FAILED_PLACEHOLDER: &str = "AI analysis failed.";

pub const UNAUTHENTICATED_PLACEHOLDER: &str = "Sign in to receive AI-powered suggestions.";
