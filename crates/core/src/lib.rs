//! # ABG Core
//!
//! Core decision logic for arterial blood gas interpretation:
//! - Range table and input validation
//! - Deterministic acid-base classification
//! - Inference gateway contract, with staged and combined adapters and an HTTP client
//! - The analysis orchestrator and its online/offline/failure fallback policy
//! - Per-user history ledger with in-memory and file-backed stores
//!
//! **No API concerns**: HTTP servers, header parsing and CLI argument handling belong in
//! `api-rest`, `api-shared` or `abg-cli`.

pub mod analysis;
pub mod classifier;
pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod history;
pub mod identity;
pub mod orchestrator;
pub mod ranges;
pub mod validation;

pub use abg_types::{Connectivity, Identity, NonEmptyText, TextError};
pub use analysis::{AnalysisOutcome, AnalysisResult, Notice};
pub use classifier::{classify, render, AcidBaseStatus, AcidBaseVerdict, Cause, Compensation};
pub use config::{AuthPolicy, CoreConfig, GatewayMode};
pub use error::{AbgError, AbgResult, BoundViolation, GatewayError, StoreError, ValidationError};
pub use gateway::{InferenceGateway, RemoteAnalysis};
pub use history::{FileHistoryStore, HistoryLedger, HistoryStore, InMemoryHistoryStore};
pub use identity::{FixedIdentity, IdentityProvider};
pub use orchestrator::AnalysisOrchestrator;
pub use ranges::{AbgParameter, Bounds, ParameterRange};
pub use validation::{validate, AbgReading, RawAbgInput};
