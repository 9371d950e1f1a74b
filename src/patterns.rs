//! Built-in pattern tables and the configurable extension of them.

use serde::Serialize;

/// Modifiers and guard helpers that gate a function behind an owner or role.
pub const ACCESS_MODIFIERS: &[&str] = &[
    "onlyOwner",
    "onlyRole",
    "onlyMinter",
    "onlyMinterRole",
    "onlyAdmin",
    "onlyOperator",
    "onlyController",
    "onlyManager",
    "onlyGovernor",
    "onlyGovernance",
    "onlyAuthorized",
    "onlyAuthorizedRole",
    "onlyFactory",
    "onlyBridge",
    "onlyTreasury",
    "onlyMultisig",
    "onlyTimelock",
    "onlyProxyAdmin",
    "hasRole",
    "hasAccess",
    "checkRole",
    "requireRole",
    "auth",
    "requiresAuth",
];

/// Modifiers that restrict *something* but are the wrong gate for minting.
pub const INAPPROPRIATE_MODIFIERS: &[&str] = &[
    "onlyPauser",
    "onlyUnpauser",
    "whenPaused",
    "whenNotPaused",
    "onlyWhitelist",
    "onlyWhitelisted",
    "onlyBurner",
    "onlyUpgrader",
];

/// Base contracts that provide owner/role checks. Matched as prefixes so
/// `AccessControlEnumerableUpgradeable` and `OwnableUpgradeable` count.
pub const ACCESS_CONTROL_BASES: &[&str] = &[
    "Ownable",
    "AccessControl",
    "MinterRole",
    "Roles",
    "Owned",
    "Auth",
    "AccessManaged",
];

/// Bases that look like an access-control prefix but are not one.
pub const NON_ACCESS_BASES: &[&str] = &["Pausable", "ReentrancyGuard", "Initializable", "Context"];

/// Substrings of a parent name that mark it as a token implementation.
pub const TOKEN_BASES: &[&str] = &[
    "ERC20",
    "ERC721",
    "ERC1155",
    "ERC777",
    "OFT",
    "Token",
    "Coin",
    "StandardToken",
];

/// Type-name suffixes of Move capability objects.
pub const CAPABILITY_SUFFIXES: &[&str] = &["Cap", "Capability"];

/// Identifier fragments that mark a guard condition as permission related.
pub const GUARD_KEYWORDS: &[&str] = &["owner", "minter", "admin", "role", "authorized"];

/// Pattern tables used by one analyzer instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Patterns {
    pub access_modifiers: Vec<String>,
    pub inappropriate_modifiers: Vec<String>,
    pub access_control_bases: Vec<String>,
    pub token_bases: Vec<String>,
    pub capability_suffixes: Vec<String>,
}

impl Default for Patterns {
    fn default() -> Self {
        Self::builtin()
    }
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn extend_unique(target: &mut Vec<String>, extra: &[String]) {
    for item in extra {
        let item = item.trim();
        if !item.is_empty() && !target.iter().any(|t| t == item) {
            target.push(item.to_string());
        }
    }
}

impl Patterns {
    pub fn builtin() -> Self {
        Self {
            access_modifiers: owned(ACCESS_MODIFIERS),
            inappropriate_modifiers: owned(INAPPROPRIATE_MODIFIERS),
            access_control_bases: owned(ACCESS_CONTROL_BASES),
            token_bases: owned(TOKEN_BASES),
            capability_suffixes: owned(CAPABILITY_SUFFIXES),
        }
    }

    pub fn with_access_modifiers(mut self, extra: &[String]) -> Self {
        extend_unique(&mut self.access_modifiers, extra);
        self
    }

    pub fn with_inappropriate_modifiers(mut self, extra: &[String]) -> Self {
        extend_unique(&mut self.inappropriate_modifiers, extra);
        self
    }

    pub fn with_access_control_bases(mut self, extra: &[String]) -> Self {
        extend_unique(&mut self.access_control_bases, extra);
        self
    }

    pub fn with_token_bases(mut self, extra: &[String]) -> Self {
        extend_unique(&mut self.token_bases, extra);
        self
    }

    pub fn with_capability_suffixes(mut self, extra: &[String]) -> Self {
        extend_unique(&mut self.capability_suffixes, extra);
        self
    }

    pub fn is_inappropriate_modifier(&self, token: &str) -> bool {
        self.inappropriate_modifiers.iter().any(|m| m == token)
    }

    /// Allow-listed modifier, or a custom `onlyXxx` that is not a known bad fit.
    pub fn is_access_modifier(&self, token: &str) -> bool {
        if self.is_inappropriate_modifier(token) {
            return false;
        }
        if self.access_modifiers.iter().any(|m| m == token) {
            return true;
        }
        token
            .strip_prefix("only")
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_ascii_uppercase())
    }

    pub fn is_access_control_base(&self, parent: &str) -> bool {
        if NON_ACCESS_BASES.iter().any(|b| parent.starts_with(b)) {
            return false;
        }
        self.access_control_bases
            .iter()
            .any(|base| parent.starts_with(base.as_str()))
    }

    pub fn is_token_base(&self, parent: &str) -> bool {
        self.token_bases.iter().any(|base| parent.contains(base.as_str()))
    }

    /// `TreasuryCap`, `coin::TreasuryCap`, `MintCapability`, but not `Cap` alone.
    pub fn is_capability_type(&self, ty: &str) -> bool {
        let last = ty.rsplit("::").next().unwrap_or(ty);
        if !last.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
            return false;
        }
        self.capability_suffixes
            .iter()
            .any(|suffix| last.len() > suffix.len() && last.ends_with(suffix.as_str()))
    }
}
