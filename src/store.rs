//! JSON-backed cache of findings keyed by token address.
//!
//! An entry is only reused while the digest of the analyzed source matches,
//! so a re-verified contract is analyzed again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::chain::ChainKind;
use crate::error::{MintResult, MintRiskError};
use crate::finding::MintFinding;

pub const STORE_VERSION: &str = "1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub address: String,
    pub chain: ChainKind,
    /// `SourceUnit::digest` of the analyzed source.
    pub source_digest: String,
    pub analyzed_at: DateTime<Utc>,
    pub findings: Vec<MintFinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingStore {
    /// Schema version
    pub version: String,

    pub updated_at: DateTime<Utc>,

    /// Entries indexed by normalized address
    pub entries: BTreeMap<String, StoredEntry>,
}

impl Default for FindingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FindingStore {
    pub fn new() -> Self {
        Self {
            version: STORE_VERSION.to_string(),
            updated_at: Utc::now(),
            entries: BTreeMap::new(),
        }
    }

    /// Load the store, or start an empty one when the file does not exist.
    pub fn load(path: &Path) -> MintResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let contents = fs::read_to_string(path)?;
        let store: Self = serde_json::from_str(&contents)?;
        if store.version != STORE_VERSION {
            return Err(MintRiskError::store(format!(
                "unsupported store version {} in {}",
                store.version,
                path.display()
            )));
        }
        tracing::debug!(path = %path.display(), entries = store.entries.len(), "loaded finding store");
        Ok(store)
    }

    pub fn save(&mut self, path: &Path) -> MintResult<()> {
        self.updated_at = Utc::now();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Insert or replace the entry for `address`.
    pub fn record(&mut self, address: &str, source_digest: &str, findings: Vec<MintFinding>) {
        let key = normalize_address(address);
        let entry = StoredEntry {
            address: key.clone(),
            chain: ChainKind::detect(address),
            source_digest: source_digest.to_string(),
            analyzed_at: Utc::now(),
            findings,
        };
        self.entries.insert(key, entry);
    }

    /// Cached findings for `address`, if they were produced from the same source.
    pub fn lookup(&self, address: &str, source_digest: &str) -> Option<&StoredEntry> {
        self.entries
            .get(&normalize_address(address))
            .filter(|e| e.source_digest == source_digest)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// EVM addresses are case-insensitive; everything else is kept as written.
fn normalize_address(address: &str) -> String {
    let address = address.trim();
    match ChainKind::detect(address) {
        ChainKind::Evm => address.to_lowercase(),
        _ => address.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SourceUnit, analyze};
    use tempfile::TempDir;

    const ADDR: &str = "0xDAC17F958D2ee523a2206206994597C13D831ec7";

    #[test]
    fn missing_file_is_an_empty_store() {
        let tmp = TempDir::new().unwrap();
        let store = FindingStore::load(&tmp.path().join("nope.json")).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.version, STORE_VERSION);
    }

    #[test]
    fn save_then_load_keeps_findings() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("store.json");
        let unit = SourceUnit::evm("contract T { function mint(address a) public { _mint(a, 1); } }");
        let findings = analyze(&unit, None);
        assert_eq!(findings.len(), 1);

        let mut store = FindingStore::new();
        store.record(ADDR, &unit.digest(), findings.clone());
        store.save(&path).unwrap();

        let loaded = FindingStore::load(&path).unwrap();
        let entry = loaded.lookup(&ADDR.to_lowercase(), &unit.digest()).unwrap();
        assert_eq!(entry.chain, ChainKind::Evm);
        assert_eq!(entry.findings, findings);
    }

    #[test]
    fn stale_digest_misses() {
        let mut store = FindingStore::new();
        store.record(ADDR, "aaaa", Vec::new());
        assert!(store.lookup(ADDR, "aaaa").is_some());
        assert!(store.lookup(ADDR, "bbbb").is_none());
        assert!(store.lookup("0x2::sui::SUI", "aaaa").is_none());
    }

    #[test]
    fn unknown_version_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        let mut store = FindingStore::new();
        store.version = "99".to_string();
        store.save(&path).unwrap();
        let err = FindingStore::load(&path).unwrap_err();
        assert!(matches!(err, MintRiskError::Store(_)));
    }
}
