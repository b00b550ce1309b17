use std::path::Path;

use serde::Deserialize;

use crate::refactor::MoveStrategy;

/// Configuration loaded from `code-graph.toml` at the project root.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CodeGraphConfig {
    /// Additional path patterns to exclude from indexing (beyond .gitignore and node_modules).
    pub exclude: Option<Vec<String>>,
    pub resolve: ResolveConfig,
    pub refactor: RefactorConfig,
}

/// `[resolve]` section.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ResolveConfig {
    /// Resolve bare specifiers such as `src/utils` against the project root
    /// (TypeScript `baseUrl: "."` style) before treating them as packages.
    pub bare_specifiers_from_root: bool,
}

/// `[refactor]` section.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RefactorConfig {
    /// Strategy used by `move` when none is given on the command line.
    pub default_strategy: MoveStrategy,
}

impl CodeGraphConfig {
    /// Load configuration from `code-graph.toml` in the given root directory.
    ///
    /// Returns a default (empty) configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join("code-graph.toml");

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|err| {
                log::warn!("failed to parse code-graph.toml: {err}. Using defaults.");
                Self::default()
            }),
            Err(err) => {
                log::warn!("failed to read code-graph.toml: {err}. Using defaults.");
                Self::default()
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = CodeGraphConfig::parse(
            r#"
exclude = ["dist", "*.generated.ts"]

[resolve]
bare_specifiers_from_root = true

[refactor]
default_strategy = "add_back_edge"
"#,
        )
        .unwrap();
        assert_eq!(config.exclude.as_deref().map(<[String]>::len), Some(2));
        assert!(config.resolve.bare_specifiers_from_root);
        assert_eq!(config.refactor.default_strategy, MoveStrategy::AddBackEdge);
    }

    #[test]
    fn test_missing_sections_default() {
        let config = CodeGraphConfig::parse("exclude = []\n").unwrap();
        assert!(!config.resolve.bare_specifiers_from_root);
        assert_eq!(config.refactor.default_strategy, MoveStrategy::UpdateAllImports);
    }

    #[test]
    fn test_invalid_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("code-graph.toml"), "exclude = 3\n").unwrap();
        let config = CodeGraphConfig::load(dir.path());
        assert!(config.exclude.is_none());
    }
}
