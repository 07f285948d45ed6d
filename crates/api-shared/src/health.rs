use crate::dto::HealthRes;

/// Simple health service shared by every API surface.
pub struct HealthService;

impl HealthService {
    /// Reports the service as alive. The core has no external dependency that must be up for
    /// a local analysis, so this never reports unhealthy.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "ABG interpreter is alive".into(),
        }
    }
}
