//! Read-only environment sources consulted by the precedence chain.

use std::collections::{BTreeMap, HashMap};

/// Source of environment variables
///
/// The registry never reads `std::env` directly so that embedders and tests
/// can supply a fixed environment.
pub trait EnvSource: Send + Sync {
    /// Look up a variable, `None` when unset
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_sources() {
        let mut hash = HashMap::new();
        hash.insert("A".to_string(), "1".to_string());
        assert_eq!(hash.var("A"), Some("1".to_string()));
        assert_eq!(hash.var("B"), None);

        let tree: BTreeMap<String, String> = hash.into_iter().collect();
        assert_eq!(tree.var("A"), Some("1".to_string()));
    }

    #[test]
    fn test_process_env_missing_var() {
        assert_eq!(ProcessEnv.var("EVTRAIL_SURELY_UNSET_VARIABLE_0xC0FFEE"), None);
    }
}
