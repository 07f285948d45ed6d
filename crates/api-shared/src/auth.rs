//! Identity extraction from request metadata.
//!
//! Authentication itself happens upstream (a gateway or identity provider in front of this
//! service). The API receives the resulting identity as two headers:
//!
//! - `x-user-id`: opaque user id
//! - `x-user-transient`: `true` for guest sessions, anything else or absent for accounts

use abg_types::{Identity, NonEmptyText};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_TRANSIENT_HEADER: &str = "x-user-transient";

/// Builds the caller's identity from raw header values.
///
/// Returns `None` when the user id is missing or blank.
pub fn identity_from_headers(user_id: Option<&str>, transient: Option<&str>) -> Option<Identity> {
    let id = NonEmptyText::new(user_id?).ok()?;
    let transient = transient
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    Some(Identity { id, transient })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_or_blank_user_is_anonymous() {
        assert_eq!(identity_from_headers(None, Some("true")), None);
        assert_eq!(identity_from_headers(Some("  "), None), None);
    }

    #[test]
    fn test_transient_flag() {
        let guest = identity_from_headers(Some("guest-42"), Some(" TRUE ")).unwrap();
        assert!(guest.is_transient());

        let account = identity_from_headers(Some("user-7"), Some("no")).unwrap();
        assert!(!account.is_transient());
        assert_eq!(account.id.as_str(), "user-7");
    }
}
