use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use cdc_config::SessionConfig;

/// Resolve `${VAR_NAME}` references in a string against the process
/// environment, leaving unresolvable references as an empty string.
pub fn resolve_env(s: &str) -> String {
    let mut result = s.to_string();

    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
        } else {
            break;
        }
    }

    result
}

/// Load a session config file, resolving `${VAR}` references against the
/// environment before parsing.
pub fn load_session_config(path: &Path) -> Result<SessionConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    SessionConfig::parse(&resolve_env(&raw))
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_env() {
        std::env::set_var("TEST_VAR", "hello");

        assert_eq!(resolve_env("${TEST_VAR}"), "hello");
        assert_eq!(resolve_env("prefix_${TEST_VAR}_suffix"), "prefix_hello_suffix");
        assert_eq!(resolve_env("no_vars"), "no_vars");
    }
}
