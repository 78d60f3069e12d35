/// Get environment variable with VITRINE_ prefix, falling back to unprefixed version
///
/// Checks `VITRINE_{key}` first, then `{key}`.
///
/// # Examples
///
/// ```rust,ignore
/// // Checks VITRINE_UPGRADE_URL first, then UPGRADE_URL
/// let url = get_env_with_prefix("UPGRADE_URL");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("VITRINE_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_with_prefix() {
        unsafe {
            std::env::set_var("VITRINE_ENV_TEST_VAR", "prefixed_value");
        }
        assert_eq!(get_env_with_prefix("ENV_TEST_VAR"), Some("prefixed_value".to_string()));
        unsafe {
            std::env::remove_var("VITRINE_ENV_TEST_VAR");
        }

        unsafe {
            std::env::set_var("FALLBACK_ONLY_VAR", "unprefixed_value");
        }
        assert_eq!(get_env_with_prefix("FALLBACK_ONLY_VAR"), Some("unprefixed_value".to_string()));
        unsafe {
            std::env::remove_var("FALLBACK_ONLY_VAR");
        }

        assert_eq!(get_env_with_prefix("VITRINE_NON_EXISTENT_VAR"), None);
    }
}
