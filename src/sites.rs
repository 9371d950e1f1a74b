//! Mint-site detection.
//!
//! A site is either a callable mint function (public/external/entry with a
//! body) or a mint call executed while the contract is being constructed.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::finding::Language;
use crate::scanner::{Region, RegionKind, ScannedFile};
use crate::text::{contains_code_word, identifier_words, in_string_literal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    RuntimeFunction,
    ConstructorCall,
}

impl SiteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteKind::RuntimeFunction => "runtime_function",
            SiteKind::ConstructorCall => "constructor_call",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintSite {
    pub kind: SiteKind,
    /// 1-based line of the declaration or call.
    pub line: usize,
    pub region: RegionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Function name for runtime sites, called path for constructor calls.
    pub name: String,
}

/// A site plus the location of its region inside the scanned files.
#[derive(Debug, Clone)]
pub struct DetectedSite {
    pub site: MintSite,
    pub file: usize,
    pub region: usize,
}

impl DetectedSite {
    pub fn region<'a>(&self, files: &'a [ScannedFile]) -> Option<(&'a ScannedFile, &'a Region)> {
        let file = files.get(self.file)?;
        let region = file.regions.regions().get(self.region)?;
        Some((file, region))
    }

    pub fn is_runtime(&self) -> bool {
        self.site.kind == SiteKind::RuntimeFunction
    }
}

static MINT_CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        \bcoin::mint_and_transfer\b
        | \bcoin::mint\b
        | \bcoin_registry::\w*mint\w*
        | \.mint\s*(?:<[^>()]*>)?\s*\(
        | \b_?mint\s*(?:<[^>()]*>)?\s*\(
        ",
    )
    .expect("mint call regex")
});

/// True for `mint`, `mintTo`, `safeMint`, `mint_and_transfer`; false for `minter`.
pub fn is_mint_name(name: &str) -> bool {
    identifier_words(name).iter().any(|w| w == "mint")
}

/// Whether a function with this signature can be called by an outside account.
pub fn is_externally_callable(signature: &str, language: Language) -> bool {
    match language {
        Language::Evm => {
            if contains_code_word(signature, "internal") || contains_code_word(signature, "private")
            {
                return false;
            }
            // Pre-0.5 compilers default to public when no visibility is written.
            true
        }
        Language::Move => {
            let compact: String = signature.chars().filter(|c| !c.is_whitespace()).collect();
            if compact.contains("public(package)") || compact.contains("public(friend)") {
                return false;
            }
            contains_code_word(signature, "public") || contains_code_word(signature, "entry")
        }
    }
}

/// Detect every mint site in `files`, ordered by file then line.
pub fn detect_sites(files: &[ScannedFile], language: Language) -> Vec<DetectedSite> {
    let mut out = Vec::new();

    for (file_idx, file) in files.iter().enumerate() {
        for (region_idx, region) in file.regions.regions().iter().enumerate() {
            match &region.kind {
                RegionKind::Function(name) => {
                    if !region.has_body() || !is_mint_name(name) {
                        continue;
                    }
                    if !is_externally_callable(&region.signature, language) {
                        tracing::trace!(name = %name, "skipping non-callable mint function");
                        continue;
                    }
                    out.push(DetectedSite {
                        site: MintSite {
                            kind: SiteKind::RuntimeFunction,
                            line: region.start + 1,
                            region: region.kind.clone(),
                            module: file.module.clone(),
                            name: name.clone(),
                        },
                        file: file_idx,
                        region: region_idx,
                    });
                }
                RegionKind::Constructor | RegionKind::Init => {
                    for (line_idx, call) in deploy_mint_calls(file, region) {
                        out.push(DetectedSite {
                            site: MintSite {
                                kind: SiteKind::ConstructorCall,
                                line: line_idx + 1,
                                region: region.kind.clone(),
                                module: file.module.clone(),
                                name: call,
                            },
                            file: file_idx,
                            region: region_idx,
                        });
                    }
                }
                RegionKind::TopLevel => {}
            }
        }
    }

    out.sort_by_key(|s| (s.file, s.site.line));
    tracing::debug!(sites = out.len(), "mint sites detected");
    out
}

fn deploy_mint_calls(file: &ScannedFile, region: &Region) -> Vec<(usize, String)> {
    let Some(body_start) = region.body_start else {
        return Vec::new();
    };

    let mut calls = Vec::new();
    for idx in body_start..=region.end {
        let Some(line) = file.lines.get(idx) else {
            break;
        };
        let hit = MINT_CALL_RE
            .find_iter(line)
            .find(|m| !in_string_literal(line, m.start()));
        if let Some(m) = hit {
            calls.push((idx, call_name(m.as_str())));
        }
    }
    calls
}

fn call_name(matched: &str) -> String {
    matched
        .split(['(', '<'])
        .next()
        .unwrap_or(matched)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(src: &str, language: Language) -> Vec<MintSite> {
        let file = ScannedFile::scan(None, src);
        detect_sites(&[file], language)
            .into_iter()
            .map(|d| d.site)
            .collect()
    }

    #[test]
    fn mint_name_matching_uses_words() {
        for name in ["mint", "mintTo", "safeMint", "mint_and_transfer", "batchMint", "MINT"] {
            assert!(is_mint_name(name), "{name}");
        }
        for name in ["minter", "mintable", "isMinter", "setMinter", "mintingFinished"] {
            assert!(!is_mint_name(name), "{name}");
        }
    }

    #[test]
    fn internal_and_private_mints_are_not_sites() {
        let src = "contract T {\n    function mint(address to, uint256 amount) internal {\n        _mint(to, amount);\n    }\n    function _mintTo(address to) private {\n    }\n}";
        assert!(detect(src, Language::Evm).is_empty());
    }

    #[test]
    fn external_mint_is_a_runtime_site() {
        let src = "contract T {\n    function mint(address to, uint256 amount) external {\n        _mint(to, amount);\n    }\n}";
        let sites = detect(src, Language::Evm);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].kind, SiteKind::RuntimeFunction);
        assert_eq!(sites[0].line, 2);
        assert_eq!(sites[0].name, "mint");
    }

    #[test]
    fn constructor_calls_are_deploy_sites() {
        let src = "contract T {\n    constructor() {\n        // _mint(a, 1);\n        _mint(msg.sender, 1000);\n        emit Note(\"mint(\");\n    }\n}";
        let sites = detect(src, Language::Evm);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].kind, SiteKind::ConstructorCall);
        assert_eq!(sites[0].line, 4);
        assert_eq!(sites[0].name, "_mint");
        assert_eq!(sites[0].region, RegionKind::Constructor);
    }

    #[test]
    fn move_visibility_rules() {
        let src = "module a::b {\n    public(package) fun mint(cap: &mut TreasuryCap<B>) {\n    }\n    fun mint_internal() {\n    }\n    public entry fun mint_to(cap: &mut TreasuryCap<B>) {\n    }\n    fun init(w: B, ctx: &mut TxContext) {\n        coin::mint_and_transfer(&mut cap, 100, @0x1, ctx);\n    }\n}";
        let sites = detect(src, Language::Move);
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].name, "mint_to");
        assert_eq!(sites[1].name, "coin::mint_and_transfer");
        assert_eq!(sites[1].region, RegionKind::Init);
    }

    #[test]
    fn method_and_registry_calls_in_init() {
        let src = "module a::b {\n    fun init(ctx: &mut TxContext) {\n        let c = treasury.mint<B>(10, ctx);\n        coin_registry::finalize_and_mint(x);\n    }\n}";
        let names: Vec<_> = detect(src, Language::Move).into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec![".mint", "coin_registry::finalize_and_mint"]);
    }
}
