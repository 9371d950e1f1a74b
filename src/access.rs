//! Access-control classification for mint sites.
//!
//! Evidence is collected in priority order: signature modifiers and
//! capability parameters, guard statements in the body, then inheritance.
//! Keyword matches inside string literals never count.

use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::finding::Language;
use crate::patterns::{GUARD_KEYWORDS, Patterns};
use crate::scanner::{Region, ScannedFile};
use crate::text::{
    call_arguments, find_matching_paren, identifier_words, in_string_literal, join_statement,
};

pub const DEPLOY_ONLY_NOTE: &str = "constructor/init only - can execute at most once";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    #[default]
    None,
    Weak,
    Strong,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::None => "none",
            Confidence::Weak => "weak",
            Confidence::Strong => "strong",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessEvidence {
    /// Access modifiers or capability parameter types on the signature.
    pub modifiers: Vec<String>,
    /// Guard statements found in the body.
    pub semantic_checks: Vec<String>,
    /// Access-control bases the check is assumed to come from.
    pub inherited_hint: Option<Vec<String>>,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    /// Modifiers that gate the function but are the wrong kind for minting.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inappropriate: Vec<String>,
}

impl AccessEvidence {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn deploy_only(inherited: Option<Vec<String>>) -> Self {
        Self {
            inherited_hint: inherited,
            confidence: Confidence::Strong,
            notes: vec![DEPLOY_ONLY_NOTE.to_string()],
            ..Self::default()
        }
    }

    /// Combine the evidence of several runtime sites: the weakest site decides.
    pub fn merge_weakest(items: Vec<AccessEvidence>) -> AccessEvidence {
        let Some(confidence) = items.iter().map(|e| e.confidence).min() else {
            return AccessEvidence::none();
        };

        let inherited: Vec<String> = items
            .iter()
            .filter_map(|e| e.inherited_hint.as_ref())
            .flatten()
            .cloned()
            .unique()
            .collect();

        AccessEvidence {
            modifiers: items.iter().flat_map(|e| e.modifiers.clone()).unique().collect(),
            semantic_checks: items
                .iter()
                .flat_map(|e| e.semantic_checks.clone())
                .unique()
                .collect(),
            inherited_hint: (!inherited.is_empty()).then_some(inherited),
            confidence,
            notes: items.iter().flat_map(|e| e.notes.clone()).unique().collect(),
            inappropriate: items
                .iter()
                .flat_map(|e| e.inappropriate.clone())
                .unique()
                .collect(),
        }
    }

    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.modifiers.is_empty() {
            parts.push(format!("modifiers: {}", self.modifiers.join(", ")));
        }
        if !self.semantic_checks.is_empty() {
            parts.push(format!("checks: {}", self.semantic_checks.join("; ")));
        }
        if let Some(bases) = &self.inherited_hint {
            parts.push(format!("inherited from: {}", bases.join(", ")));
        }
        if !self.inappropriate.is_empty() {
            parts.push(format!("inappropriate: {}", self.inappropriate.join(", ")));
        }
        if parts.is_empty() {
            format!("{} (no access control found)", self.confidence)
        } else {
            format!("{} ({})", self.confidence, parts.join(" | "))
        }
    }
}

// ============================================================================
// Signature evidence
// ============================================================================

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_$][\w$]*(?:::[A-Za-z_$][\w$]*)*").expect("ident regex"));

/// Split a signature into its parameter list and the text after it.
fn split_signature(signature: &str) -> (&str, &str) {
    let Some(open) = signature.find('(') else {
        return ("", signature);
    };
    match find_matching_paren(signature, open) {
        Some(close) => (&signature[open + 1..close], &signature[close + 1..]),
        None => (&signature[open + 1..], ""),
    }
}

struct SignatureEvidence {
    modifiers: Vec<String>,
    inappropriate: Vec<String>,
    overrides: bool,
}

fn signature_evidence(signature: &str, language: Language, patterns: &Patterns) -> SignatureEvidence {
    let (params, tail) = split_signature(signature);
    let mut modifiers = Vec::new();
    let mut inappropriate = Vec::new();

    match language {
        Language::Evm => {
            for m in IDENT_RE.find_iter(tail) {
                if in_string_literal(tail, m.start()) {
                    continue;
                }
                let token = m.as_str();
                if patterns.is_access_modifier(token) {
                    modifiers.push(token.to_string());
                } else if patterns.is_inappropriate_modifier(token) {
                    inappropriate.push(token.to_string());
                }
            }
        }
        Language::Move => {
            for m in IDENT_RE.find_iter(params) {
                let ty = m.as_str();
                if patterns.is_capability_type(ty) {
                    let short = ty.rsplit("::").next().unwrap_or(ty);
                    modifiers.push(short.to_string());
                }
            }
        }
    }

    SignatureEvidence {
        modifiers: modifiers.into_iter().unique().collect(),
        inappropriate: inappropriate.into_iter().unique().collect(),
        overrides: IDENT_RE.find_iter(tail).any(|m| m.as_str() == "override"),
    }
}

// ============================================================================
// Body guards
// ============================================================================

static GUARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(require|assert!?|if)\s*\(").expect("guard regex"));

static SENDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"msg\.sender|_msgSender\s*\(\s*\)|tx_context::sender\s*\([^)]*\)|\bctx\.sender\s*\(\s*\)")
        .expect("sender regex")
});

static SENDER_COMPARE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:msg\.sender|_msgSender\s*\(\s*\)|tx_context::sender\s*\([^)]*\)|ctx\.sender\s*\(\s*\))\s*[!=]=
        | [!=]=\s*(?:msg\.sender|_msgSender\s*\(\s*\)|tx_context::sender\s*\([^)]*\)|ctx\.sender\s*\(\s*\))
        ",
    )
    .expect("sender comparison regex")
});

static PERMISSION_MAP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\s*(?:msg\.sender|_msgSender\s*\(\s*\))\s*\]").expect("permission map regex")
});

static CHECK_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b_check(?:Owner|Role)\s*\(").expect("check call regex"));

fn is_permission_condition(condition: &str) -> bool {
    if SENDER_COMPARE_RE.is_match(condition) || PERMISSION_MAP_RE.is_match(condition) {
        return true;
    }
    if condition.contains("hasRole") && SENDER_RE.is_match(condition) {
        return true;
    }
    GUARD_IDENT_RE
        .find_iter(condition)
        .filter(|m| !in_string_literal(condition, m.start()))
        .any(|m| is_guard_identifier(m.as_str()))
}

static GUARD_IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_$][\w$]*").expect("ident regex"));

/// `isOwner`, `admins` or `onlyRole`, but not the ERC721 ownership lookups
/// `ownerOf` / `_owners`.
fn is_guard_identifier(ident: &str) -> bool {
    let words = identifier_words(ident);
    if ident.trim_start_matches('_') == "owners"
        || words.windows(2).any(|pair| pair[0] == "owner" && pair[1] == "of")
    {
        return false;
    }
    words.iter().any(|word| {
        let singular = word.strip_suffix('s').unwrap_or(word);
        GUARD_KEYWORDS.iter().any(|kw| word == kw || singular == *kw)
    })
}

/// Guard statements in `body` that check the caller's permission.
pub fn semantic_guards(body: &[String]) -> Vec<String> {
    let mut checks = Vec::new();

    for (idx, line) in body.iter().enumerate() {
        for m in CHECK_CALL_RE.find_iter(line) {
            if !in_string_literal(line, m.start()) {
                checks.push(compact(&join_statement(body, idx, 4)));
            }
        }

        for caps in GUARD_RE.captures_iter(line) {
            let Some(whole) = caps.get(0) else { continue };
            if in_string_literal(line, whole.start()) {
                continue;
            }
            // Conditions often wrap; pull in following lines until the paren closes.
            let open = whole.end() - 1 - whole.start();
            let mut statement = line[whole.start()..].to_string();
            for next in body.iter().skip(idx + 1).take(6) {
                if find_matching_paren(&statement, open).is_some() {
                    break;
                }
                statement.push(' ');
                statement.push_str(next.trim());
            }
            let Some(args) = call_arguments(&statement, open) else {
                continue;
            };
            let condition = match &caps[1] {
                "if" => args.join(", "),
                _ => args.first().map(|a| a.to_string()).unwrap_or_default(),
            };
            if is_permission_condition(&condition) {
                let keyword = &caps[1];
                checks.push(format!("{keyword}({})", compact(&condition)));
            }
        }
    }

    checks.into_iter().unique().collect()
}

fn compact(text: &str) -> String {
    text.split_whitespace().join(" ")
}

// ============================================================================
// Classification
// ============================================================================

/// Classify the access control of one runtime mint function.
pub fn classify_runtime(
    file: &ScannedFile,
    region: &Region,
    language: Language,
    patterns: &Patterns,
) -> AccessEvidence {
    let sig = signature_evidence(&region.signature, language, patterns);
    let semantic_checks = semantic_guards(region.body_lines(&file.lines));

    let inherited = match language {
        Language::Evm if sig.overrides => inherited_access_bases(file, region.start, patterns),
        _ => None,
    };

    let mut notes = Vec::new();
    let confidence = if !sig.modifiers.is_empty() || !semantic_checks.is_empty() {
        Confidence::Strong
    } else if let Some(bases) = &inherited {
        notes.push(format!(
            "override of a function inherited with {}; access check assumed in the base",
            bases.join(", ")
        ));
        Confidence::Strong
    } else if !sig.inappropriate.is_empty() {
        Confidence::Weak
    } else {
        Confidence::None
    };

    let evidence = AccessEvidence {
        inappropriate: if confidence == Confidence::Weak {
            sig.inappropriate
        } else {
            Vec::new()
        },
        modifiers: sig.modifiers,
        semantic_checks,
        inherited_hint: inherited.filter(|_| confidence == Confidence::Strong),
        confidence,
        notes,
    };
    tracing::trace!(
        region = ?region.kind,
        confidence = %evidence.confidence,
        "classified runtime mint access"
    );
    evidence
}

/// Access-control parents of the contract enclosing `line`.
pub fn inherited_access_bases(
    file: &ScannedFile,
    line: usize,
    patterns: &Patterns,
) -> Option<Vec<String>> {
    let decl = file.enclosing_contract(line)?;
    let bases: Vec<String> = decl
        .parents
        .iter()
        .filter(|p| patterns.is_access_control_base(p))
        .cloned()
        .collect();
    (!bases.is_empty()).then_some(bases)
}

/// Deploy-only evidence: Strong when an access-control base or a fixed-supply
/// call backs the one-time mint, otherwise no evidence.
pub fn classify_deploy_only(
    files: &[ScannedFile],
    deploy_lines: &[(usize, usize)],
    patterns: &Patterns,
) -> AccessEvidence {
    let inherited: Vec<String> = deploy_lines
        .iter()
        .filter_map(|(file, line)| inherited_access_bases(files.get(*file)?, *line, patterns))
        .flatten()
        .unique()
        .collect();
    let fixed = files.iter().any(has_fixed_supply_call);

    if inherited.is_empty() && !fixed {
        return AccessEvidence::none();
    }
    AccessEvidence::deploy_only((!inherited.is_empty()).then_some(inherited))
}

static FIXED_SUPPLY_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmake_supply_fixed\w*\s*(?:<[^>()]*>)?\s*\(").expect("fixed regex"));

pub fn has_fixed_supply_call(file: &ScannedFile) -> bool {
    file.lines.iter().any(|line| {
        FIXED_SUPPLY_CALL_RE
            .find_iter(line)
            .any(|m| !in_string_literal(line, m.start()))
    })
}
