//! Environment handed to children

use std::ffi::OsString;

/// The supervisor's environment minus the `strip` keys
pub fn child_env(strip: &[String]) -> Vec<(OsString, OsString)> {
    std::env::vars_os()
        .filter(|(key, _)| {
            key.to_str()
                .map_or(true, |key| !strip.iter().any(|s| s == key))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_requested_keys() {
        let env = child_env(&["PATH".to_string()]);
        assert!(env.iter().all(|(k, _)| k != "PATH"));
    }

    #[test]
    fn test_keeps_everything_else() {
        let all = std::env::vars_os().count();
        assert_eq!(child_env(&[]).len(), all);
    }
}
