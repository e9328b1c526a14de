//! Well-known keys and identifier formats shared by login modules.

/// Private attribute-map key under which the registry-confirmed user id is kept
/// when it differs from the display security name.
pub const REGISTRY_CONFIRMED_ID_KEY: &str = "registry.confirmed_user_id";

/// Prefix of user access ids (`user:<realm>/<unique id>`).
pub const USER_ACCESS_ID_PREFIX: &str = "user:";

/// Build a user access id from the registry realm and the unique user id.
#[must_use]
pub fn user_access_id(realm: &str, unique_id: &str) -> String {
    format!("{USER_ACCESS_ID_PREFIX}{realm}/{unique_id}")
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn user_access_id_format() {
        assert_eq!(user_access_id("basic", "u-1"), "user:basic/u-1");
    }
}
