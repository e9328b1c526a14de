//! Canonical security name resolution.

use login_commit_sdk::{LoginError, UserRegistry};
use tracing::debug;

/// Determine the security name to put into the primary principal.
///
/// Precedence:
/// 1. a non-custom registry's name for `registry_confirmed_id`
/// 2. `raw_identifier` verbatim
/// 3. the registry's name for `registry_confirmed_id`, without further normalization
///
/// The registry is asked at most once.
///
/// # Errors
///
/// - `IdentityUnavailable` if there is neither a registry nor a raw identifier,
///   if the fallback mapping is empty, or if the registry lookup fails
#[tracing::instrument(skip_all, fields(has_registry = registry.is_some(), has_raw = raw_identifier.is_some()))]
pub fn resolve_security_name(
    registry: Option<&dyn UserRegistry>,
    raw_identifier: Option<&str>,
    registry_confirmed_id: &str,
) -> Result<String, LoginError> {
    let mut asked = false;
    if let Some(ur) = registry
        && !ur.kind().is_custom()
    {
        asked = true;
        if let Some(name) = ur.user_security_name(registry_confirmed_id)? {
            debug!(registry_kind = %ur.kind(), "Using registry security name");
            return Ok(name);
        }
    }

    if let Some(raw) = raw_identifier {
        debug!("Using login identifier as security name");
        return Ok(raw.to_owned());
    }

    let Some(ur) = registry else {
        return Err(LoginError::identity_unavailable(
            "no user registry and no login identifier",
        ));
    };

    let name = if asked {
        None
    } else {
        ur.user_security_name(registry_confirmed_id)?
    };
    name.ok_or_else(|| {
        LoginError::identity_unavailable(format!(
            "registry has no security name for '{registry_confirmed_id}'"
        ))
    })
}
