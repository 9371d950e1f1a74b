//! Analyzer input.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::MintResult;
use crate::finding::Language;
use crate::{mint_bail, mint_ensure};

/// Source text handed to the analyzer. Immutable for the duration of a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceUnit {
    /// One (already merged) Solidity-like source string.
    Evm {
        source: String,
        decimals: Option<u8>,
    },
    /// Move modules keyed by module name.
    Move {
        modules: BTreeMap<String, String>,
        decimals: Option<u8>,
    },
}

impl SourceUnit {
    pub fn evm(source: impl Into<String>) -> Self {
        SourceUnit::Evm {
            source: source.into(),
            decimals: None,
        }
    }

    pub fn move_modules<I, K, V>(modules: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        SourceUnit::Move {
            modules: modules
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            decimals: None,
        }
    }

    /// Pick the primary file of a multi-file EVM contract.
    ///
    /// The first file whose name contains `contract_hint` (case-insensitive)
    /// wins, otherwise the first file. Returns `None` for an empty list.
    pub fn evm_from_files(files: &[(String, String)], contract_hint: Option<&str>) -> Option<Self> {
        let hinted = contract_hint
            .map(str::to_lowercase)
            .filter(|h| !h.is_empty())
            .and_then(|hint| {
                files
                    .iter()
                    .find(|(name, _)| name.to_lowercase().contains(&hint))
            });
        let (name, source) = hinted.or_else(|| files.first())?;
        tracing::debug!(primary = %name, candidates = files.len(), "selected primary EVM source");
        Some(SourceUnit::evm(source.clone()))
    }

    /// Read `paths` from disk into a unit of `language`.
    ///
    /// EVM files go through [`SourceUnit::evm_from_files`]; Move files become
    /// modules keyed by file stem (the full path when two stems collide).
    pub fn from_paths(
        paths: &[PathBuf],
        language: Language,
        contract_hint: Option<&str>,
    ) -> MintResult<Self> {
        mint_ensure!(!paths.is_empty(), "no {language} source files given");

        match language {
            Language::Evm => {
                let mut files = Vec::with_capacity(paths.len());
                for path in paths {
                    files.push((path.display().to_string(), std::fs::read_to_string(path)?));
                }
                let Some(unit) = Self::evm_from_files(&files, contract_hint) else {
                    mint_bail!("no EVM source files given");
                };
                Ok(unit)
            }
            Language::Move => {
                let mut modules = BTreeMap::new();
                for path in paths {
                    let key = module_key(path, &modules);
                    modules.insert(key, std::fs::read_to_string(path)?);
                }
                Ok(SourceUnit::Move {
                    modules,
                    decimals: None,
                })
            }
        }
    }

    pub fn with_decimals(mut self, value: Option<u8>) -> Self {
        match &mut self {
            SourceUnit::Evm { decimals, .. } | SourceUnit::Move { decimals, .. } => *decimals = value,
        }
        self
    }

    pub fn decimals(&self) -> Option<u8> {
        match self {
            SourceUnit::Evm { decimals, .. } | SourceUnit::Move { decimals, .. } => *decimals,
        }
    }

    pub fn language(&self) -> Language {
        match self {
            SourceUnit::Evm { .. } => Language::Evm,
            SourceUnit::Move { .. } => Language::Move,
        }
    }

    /// Empty string, empty map, or only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            SourceUnit::Evm { source, .. } => source.trim().is_empty(),
            SourceUnit::Move { modules, .. } => modules.values().all(|s| s.trim().is_empty()),
        }
    }

    /// `(module, text)` pairs in deterministic order.
    pub fn texts(&self) -> Vec<(Option<&str>, &str)> {
        match self {
            SourceUnit::Evm { source, .. } => vec![(None, source.as_str())],
            SourceUnit::Move { modules, .. } => modules
                .iter()
                .map(|(name, text)| (Some(name.as_str()), text.as_str()))
                .collect(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.texts().iter().map(|(_, t)| t.lines().count()).sum()
    }

    /// sha256 hex digest over the language, module names and text.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.language().as_str().as_bytes());
        for (module, text) in self.texts() {
            hasher.update(module.unwrap_or_default().as_bytes());
            hasher.update([0u8]);
            hasher.update(text.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}

fn module_key(path: &Path, taken: &BTreeMap<String, String>) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string());
    if taken.contains_key(&stem) {
        path.display().to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> Vec<(String, String)> {
        vec![
            ("contracts/utils/Context.sol".to_string(), "contract Context {}".to_string()),
            ("contracts/MyToken.sol".to_string(), "contract MyToken {}".to_string()),
        ]
    }

    #[test]
    fn primary_file_follows_hint() {
        let unit = SourceUnit::evm_from_files(&files(), Some("mytoken")).unwrap();
        assert_eq!(unit, SourceUnit::evm("contract MyToken {}"));
        let unit = SourceUnit::evm_from_files(&files(), Some("Missing")).unwrap();
        assert_eq!(unit, SourceUnit::evm("contract Context {}"));
        assert!(SourceUnit::evm_from_files(&[], None).is_none());
    }

    #[test]
    fn move_paths_become_modules_by_stem() {
        let tmp = tempfile::TempDir::new().unwrap();
        let a = tmp.path().join("coin_a.move");
        let nested = tmp.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        let b = nested.join("coin_a.move");
        std::fs::write(&a, "module x::coin_a {}").unwrap();
        std::fs::write(&b, "module y::coin_a {}").unwrap();

        let unit = SourceUnit::from_paths(&[a, b.clone()], Language::Move, None).unwrap();
        let SourceUnit::Move { modules, .. } = unit else {
            panic!("expected move unit");
        };
        assert_eq!(modules["coin_a"], "module x::coin_a {}");
        assert_eq!(modules[&b.display().to_string()], "module y::coin_a {}");
    }

    #[test]
    fn from_paths_errors() {
        let err = SourceUnit::from_paths(&[], Language::Evm, None).unwrap_err();
        assert_eq!(err.to_string(), "source error: no evm source files given");

        let missing = PathBuf::from("/definitely/not/here.sol");
        let err = SourceUnit::from_paths(&[missing], Language::Evm, None).unwrap_err();
        assert!(matches!(err, crate::error::MintRiskError::Io(_)));
    }

    #[test]
    fn blank_detection() {
        assert!(SourceUnit::evm("  \n\t").is_blank());
        assert!(SourceUnit::move_modules(Vec::<(String, String)>::new()).is_blank());
        assert!(!SourceUnit::move_modules([("m", "module a::m {}")]).is_blank());
    }

    #[test]
    fn digest_changes_with_content_and_decimals_do_not_matter() {
        let a = SourceUnit::evm("contract A {}");
        let b = SourceUnit::evm("contract B {}");
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest(), a.clone().with_decimals(Some(18)).digest());
        assert_eq!(a.digest().len(), 64);
    }
}
