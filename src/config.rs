use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{MintResult, MintRiskError};
use crate::patterns::Patterns;

#[derive(Debug, Default, Deserialize)]
pub struct MintRiskConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub patterns: PatternsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Lines of context on each side of an evidence snippet.
    pub snippet_radius: usize,
    /// How far back a supply variable is traced.
    pub lookback_lines: usize,
    /// Inputs longer than this are rejected by the CLI.
    pub max_source_lines: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            snippet_radius: DEFAULT_SNIPPET_RADIUS,
            lookback_lines: DEFAULT_LOOKBACK_LINES,
            max_source_lines: DEFAULT_MAX_SOURCE_LINES,
        }
    }
}

/// Extra entries appended to the built-in pattern tables.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PatternsConfig {
    pub access_modifiers: Vec<String>,
    pub inappropriate_modifiers: Vec<String>,
    pub access_control_bases: Vec<String>,
    pub token_bases: Vec<String>,
    pub capability_suffixes: Vec<String>,
}

pub const DEFAULT_CONFIG_FILE_NAME: &str = "mint-risk.toml";
pub const DEFAULT_SNIPPET_RADIUS: usize = 5;
pub const DEFAULT_LOOKBACK_LINES: usize = 200;
pub const DEFAULT_MAX_SOURCE_LINES: usize = 50_000;

/// Knobs consumed by `MintAnalyzer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerSettings {
    pub snippet_radius: usize,
    pub lookback_lines: usize,
    pub patterns: Patterns,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            snippet_radius: DEFAULT_SNIPPET_RADIUS,
            lookback_lines: DEFAULT_LOOKBACK_LINES,
            patterns: Patterns::builtin(),
        }
    }
}

impl AnalyzerSettings {
    pub fn with_snippet_radius(mut self, radius: usize) -> Self {
        self.snippet_radius = radius;
        self
    }

    pub fn with_lookback_lines(mut self, lines: usize) -> Self {
        self.lookback_lines = lines;
        self
    }

    pub fn with_patterns(mut self, patterns: Patterns) -> Self {
        self.patterns = patterns;
        self
    }
}

impl MintRiskConfig {
    pub fn validate(&self) -> MintResult<()> {
        if self.analysis.max_source_lines == 0 {
            return Err(MintRiskError::config("analysis.max_source_lines must be positive"));
        }
        let p = &self.patterns;
        for (table, entries) in [
            ("access_modifiers", &p.access_modifiers),
            ("inappropriate_modifiers", &p.inappropriate_modifiers),
            ("access_control_bases", &p.access_control_bases),
            ("token_bases", &p.token_bases),
            ("capability_suffixes", &p.capability_suffixes),
        ] {
            if let Some(bad) = entries.iter().find(|e| !is_pattern_word(e)) {
                return Err(MintRiskError::config(format!(
                    "patterns.{table}: `{bad}` is not an identifier"
                )));
            }
        }
        Ok(())
    }

    pub fn analyzer_settings(&self) -> AnalyzerSettings {
        let p = &self.patterns;
        AnalyzerSettings::default()
            .with_snippet_radius(self.analysis.snippet_radius)
            .with_lookback_lines(self.analysis.lookback_lines)
            .with_patterns(
                Patterns::builtin()
                    .with_access_modifiers(&p.access_modifiers)
                    .with_inappropriate_modifiers(&p.inappropriate_modifiers)
                    .with_access_control_bases(&p.access_control_bases)
                    .with_token_bases(&p.token_bases)
                    .with_capability_suffixes(&p.capability_suffixes),
            )
    }
}

fn is_pattern_word(entry: &str) -> bool {
    let entry = entry.trim();
    !entry.is_empty() && entry.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut cur = Some(start_dir);
    while let Some(dir) = cur {
        let candidate = dir.join(DEFAULT_CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = dir.parent();
    }
    None
}

pub fn load_config_file(path: &Path) -> Result<MintRiskConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let cfg: MintRiskConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    cfg.validate()
        .map_err(MintRiskError::into_anyhow)
        .with_context(|| format!("invalid config file: {}", path.display()))?;
    Ok(cfg)
}

pub fn load_config(
    explicit_path: Option<&Path>,
    start_dir: &Path,
) -> Result<Option<(PathBuf, MintRiskConfig)>> {
    if let Some(p) = explicit_path {
        let cfg = load_config_file(p)?;
        return Ok(Some((p.to_path_buf(), cfg)));
    }

    let Some(p) = find_config_file(start_dir) else {
        return Ok(None);
    };
    let cfg = load_config_file(&p)?;
    Ok(Some((p, cfg)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_is_found_in_a_parent_directory() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("contracts").join("token");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            tmp.path().join(DEFAULT_CONFIG_FILE_NAME),
            "[analysis]\nsnippet_radius = 2\n\n[patterns]\naccess_modifiers = [\"treasuryGate\"]\n",
        )
        .unwrap();

        let (path, cfg) = load_config(None, &nested).unwrap().unwrap();
        assert_eq!(path, tmp.path().join(DEFAULT_CONFIG_FILE_NAME));
        assert_eq!(cfg.analysis.snippet_radius, 2);
        assert_eq!(cfg.analysis.lookback_lines, DEFAULT_LOOKBACK_LINES);

        let settings = cfg.analyzer_settings();
        assert_eq!(settings.snippet_radius, 2);
        assert!(settings.patterns.is_access_modifier("treasuryGate"));
        assert!(settings.patterns.is_access_modifier("onlyOwner"));
    }

    #[test]
    fn missing_config_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(load_config(None, tmp.path()).unwrap().is_none());
    }

    #[test]
    fn invalid_values_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        std::fs::write(&path, "[analysis]\nmax_source_lines = 0\n").unwrap();
        let err = load_config(Some(&path), tmp.path()).unwrap_err();
        assert!(format!("{err:#}").contains("max_source_lines must be positive"));

        std::fs::write(&path, "[patterns]\ntoken_bases = [\"ERC 20\"]\n").unwrap();
        let err = load_config(Some(&path), tmp.path()).unwrap_err();
        assert!(format!("{err:#}").contains("patterns.token_bases"));
    }
}
