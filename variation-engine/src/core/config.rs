//! Engine configuration

/// Default separator between attribute path segments ("Paper Type > Weight")
pub const DEFAULT_PATH_SEPARATOR: &str = " > ";
/// Default separator between "{path} - {option}" groups in generated names
pub const DEFAULT_GROUP_SEPARATOR: &str = " / ";
/// Default upper bound on generated combinations (0 = unlimited)
pub const DEFAULT_MAX_COMBINATIONS: usize = 10_000;

/// Variation engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub path_separator: String,
    pub group_separator: String,
    /// Generation is refused above this count (0 disables the check)
    pub max_combinations: usize,
    /// redb file backing the draft cache
    pub draft_path: Option<String>,
    pub log_level: String,
    pub log_json: bool,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            path_separator: std::env::var("VARIATION_PATH_SEPARATOR")
                .unwrap_or_else(|_| DEFAULT_PATH_SEPARATOR.into()),
            group_separator: std::env::var("VARIATION_GROUP_SEPARATOR")
                .unwrap_or_else(|_| DEFAULT_GROUP_SEPARATOR.into()),
            max_combinations: std::env::var("VARIATION_MAX_COMBINATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_COMBINATIONS),
            draft_path: std::env::var("VARIATION_DRAFT_PATH").ok(),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        }
    }

    pub fn with_max_combinations(mut self, max_combinations: usize) -> Self {
        self.max_combinations = max_combinations;
        self
    }

    pub fn with_separators(
        mut self,
        path_separator: impl Into<String>,
        group_separator: impl Into<String>,
    ) -> Self {
        self.path_separator = path_separator.into();
        self.group_separator = group_separator.into();
        self
    }

    pub fn with_draft_path(mut self, draft_path: impl Into<String>) -> Self {
        self.draft_path = Some(draft_path.into());
        self
    }
}

/// Built-in defaults, independent of the environment
impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path_separator: DEFAULT_PATH_SEPARATOR.into(),
            group_separator: DEFAULT_GROUP_SEPARATOR.into(),
            max_combinations: DEFAULT_MAX_COMBINATIONS,
            draft_path: None,
            log_level: "info".into(),
            log_json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.path_separator, " > ");
        assert_eq!(config.group_separator, " / ");
        assert_eq!(config.max_combinations, 10_000);
        assert!(config.draft_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::default()
            .with_max_combinations(0)
            .with_separators("/", ", ")
            .with_draft_path("/tmp/drafts.redb");
        assert_eq!(config.max_combinations, 0);
        assert_eq!(config.path_separator, "/");
        assert_eq!(config.group_separator, ", ");
        assert_eq!(config.draft_path.as_deref(), Some("/tmp/drafts.redb"));
    }
}
