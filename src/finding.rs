//! The finding record produced by one scan.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::access::AccessEvidence;
use crate::sites::MintSite;
use crate::snippet::CodeSnippet;
use crate::supply::SupplyBound;

// ============================================================================
// Severity
// ============================================================================

/// Severity of a mint finding, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "info" => Some(Severity::Info),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Mint type
// ============================================================================

/// When new units can be created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MintType {
    /// Only during construction / `init`.
    DeployOnce,
    DeployPlusRuntime,
    RuntimeOnly,
    /// No mint site of its own, but the contract extends a token base.
    PossiblyInherited,
}

impl MintType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MintType::DeployOnce => "deploy_once",
            MintType::DeployPlusRuntime => "deploy_plus_runtime",
            MintType::RuntimeOnly => "runtime_only",
            MintType::PossiblyInherited => "possibly_inherited",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MintType::DeployOnce => "minted once at deployment",
            MintType::DeployPlusRuntime => "minted at deployment and mintable at runtime",
            MintType::RuntimeOnly => "mintable at runtime",
            MintType::PossiblyInherited => "mint capability possibly inherited from a base contract",
        }
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, MintType::DeployPlusRuntime | MintType::RuntimeOnly)
    }

    /// Derive the mint type from which kinds of site were seen.
    pub fn from_sites(has_deploy: bool, has_runtime: bool) -> Option<Self> {
        match (has_deploy, has_runtime) {
            (true, false) => Some(MintType::DeployOnce),
            (true, true) => Some(MintType::DeployPlusRuntime),
            (false, true) => Some(MintType::RuntimeOnly),
            (false, false) => None,
        }
    }
}

impl std::fmt::Display for MintType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Language
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Evm,
    Move,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Evm => "evm",
            Language::Move => "move",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "evm" | "solidity" | "sol" => Some(Language::Evm),
            "move" | "sui" => Some(Language::Move),
            _ => None,
        }
    }

    /// Fence tag used when rendering snippets.
    pub fn code_fence(&self) -> &'static str {
        match self {
            Language::Evm => "solidity",
            Language::Move => "move",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Finding
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintFinding {
    pub severity: Severity,
    pub mint_type: MintType,
    pub language: Language,
    pub sites: Vec<MintSite>,
    pub access: AccessEvidence,
    pub supply: SupplyBound,
    pub evidence: Vec<CodeSnippet>,
    pub recommendation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Parents of the contract for [`MintType::PossiblyInherited`] findings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inherited_from: Vec<String>,
}

impl MintFinding {
    /// Stable identifier: first 8 bytes of a sha256 over the finding's shape.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.language.as_str().as_bytes());
        hasher.update(self.mint_type.as_str().as_bytes());
        hasher.update(self.severity.as_str().as_bytes());
        for site in &self.sites {
            hasher.update(site.module.as_deref().unwrap_or_default().as_bytes());
            hasher.update(site.line.to_string().as_bytes());
        }
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }
}
