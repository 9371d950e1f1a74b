//! Line scanner and region tracker.
//!
//! Regions are delimited by counting braces. There is no parser: a header such
//! as `function mint(` or `fun init(` opens a region and the region closes when
//! its local brace depth drops back to zero.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text::{brace_counts, in_string_literal, split_args, strip_comments};

// ============================================================================
// Regions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum RegionKind {
    TopLevel,
    Constructor,
    Init,
    Function(String),
}

impl RegionKind {
    pub fn is_deploy_time(&self) -> bool {
        matches!(self, RegionKind::Constructor | RegionKind::Init)
    }

    pub fn function_name(&self) -> Option<&str> {
        match self {
            RegionKind::Function(name) => Some(name),
            RegionKind::Init => Some("init"),
            RegionKind::Constructor => Some("constructor"),
            RegionKind::TopLevel => None,
        }
    }
}

static TOP_LEVEL: RegionKind = RegionKind::TopLevel;

/// A contiguous line range. Line indices are 0-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub kind: RegionKind,
    pub start: usize,
    /// Line holding the opening `{`. `None` for declarations without a body.
    pub body_start: Option<usize>,
    pub end: usize,
    /// Header lines joined, up to (not including) the body brace.
    pub signature: String,
}

impl Region {
    pub fn has_body(&self) -> bool {
        self.body_start.is_some()
    }

    pub fn contains(&self, line: usize) -> bool {
        (self.start..=self.end).contains(&line)
    }

    pub fn body_lines<'a>(&self, lines: &'a [String]) -> &'a [String] {
        match self.body_start {
            Some(body) => &lines[body..=self.end.min(lines.len().saturating_sub(1))],
            None => &[],
        }
    }
}

/// Regions of one source file plus a per-line index into them.
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    regions: Vec<Region>,
    line_regions: Vec<Option<usize>>,
}

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:function\s+([A-Za-z_$][\w$]*)|fun\s+([A-Za-z_]\w*)|(constructor))\s*[<(]")
        .expect("header regex")
});

struct OpenRegion {
    kind: RegionKind,
    start: usize,
    body_start: Option<usize>,
    depth: isize,
}

impl RegionMap {
    /// Build the region map for comment-stripped `lines`.
    pub fn build(lines: &[String]) -> Self {
        let mut map = RegionMap {
            regions: Vec::new(),
            line_regions: vec![None; lines.len()],
        };
        let mut open: Option<OpenRegion> = None;

        for (idx, line) in lines.iter().enumerate() {
            if let Some(kind) = header_kind(line) {
                if let Some(prev) = open.take() {
                    map.close(prev, idx.saturating_sub(1), lines);
                }
                open = Some(OpenRegion {
                    kind,
                    start: idx,
                    body_start: None,
                    depth: 0,
                });
            }

            let Some(region) = open.as_mut() else {
                continue;
            };

            let (opens, closes) = brace_counts(line);
            let delta = opens as isize - closes as isize;

            let closed = match region.body_start {
                None if opens > 0 => {
                    region.body_start = Some(idx);
                    region.depth = delta;
                    region.depth <= 0 && closes > 0
                }
                None => line.contains(';'),
                Some(_) => {
                    region.depth += delta;
                    region.depth <= 0 && closes > 0
                }
            };

            if closed && let Some(region) = open.take() {
                map.close(region, idx, lines);
            }
        }

        if let Some(region) = open.take() {
            map.close(region, lines.len().saturating_sub(1), lines);
        }

        map
    }

    fn close(&mut self, open: OpenRegion, end: usize, lines: &[String]) {
        let end = end.max(open.start);
        let sig_end = open.body_start.unwrap_or(end);
        let mut signature = lines[open.start..=sig_end]
            .iter()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(brace) = signature.find('{') {
            signature.truncate(brace);
        }

        let region_idx = self.regions.len();
        for slot in &mut self.line_regions[open.start..=end] {
            *slot = Some(region_idx);
        }
        self.regions.push(Region {
            kind: open.kind,
            start: open.start,
            body_start: open.body_start,
            end,
            signature: signature.trim().to_string(),
        });
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region_for_line(&self, line: usize) -> Option<&Region> {
        let idx = (*self.line_regions.get(line)?)?;
        self.regions.get(idx)
    }

    pub fn kind_for_line(&self, line: usize) -> &RegionKind {
        self.region_for_line(line)
            .map(|r| &r.kind)
            .unwrap_or(&TOP_LEVEL)
    }

    pub fn len(&self) -> usize {
        self.line_regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line_regions.is_empty()
    }
}

fn header_kind(line: &str) -> Option<RegionKind> {
    let caps = HEADER_RE.captures(line)?;
    let whole = caps.get(0)?;
    if in_string_literal(line, whole.start()) {
        return None;
    }
    if caps.get(3).is_some() {
        return Some(RegionKind::Constructor);
    }
    if let Some(name) = caps.get(1) {
        return Some(RegionKind::Function(name.as_str().to_string()));
    }
    let name = caps.get(2)?.as_str();
    if name == "init" {
        Some(RegionKind::Init)
    } else {
        Some(RegionKind::Function(name.to_string()))
    }
}

// ============================================================================
// Contract declarations (EVM)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Contract,
    Interface,
    Library,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDecl {
    pub name: String,
    pub kind: DeclKind,
    pub is_abstract: bool,
    pub line: usize,
    pub parents: Vec<String>,
}

impl ContractDecl {
    pub fn is_concrete_contract(&self) -> bool {
        self.kind == DeclKind::Contract && !self.is_abstract
    }
}

static CONTRACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(abstract\s+)?(contract|interface|library)\s+([A-Za-z_$][\w$]*)")
        .expect("contract regex")
});

/// Find `contract X is A, B` style declarations.
pub fn contract_declarations(lines: &[String]) -> Vec<ContractDecl> {
    let mut decls = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = CONTRACT_RE.captures(line) else {
            continue;
        };
        let kind = match &caps[2] {
            "interface" => DeclKind::Interface,
            "library" => DeclKind::Library,
            _ => DeclKind::Contract,
        };

        // The inheritance list can wrap before the opening brace.
        let mut header = String::new();
        for l in lines.iter().skip(idx).take(8) {
            header.push(' ');
            header.push_str(l.trim());
            if l.contains('{') {
                break;
            }
        }
        let header = header.split('{').next().unwrap_or_default();

        decls.push(ContractDecl {
            name: caps[3].to_string(),
            kind,
            is_abstract: caps.get(1).is_some(),
            line: idx,
            parents: parse_parents(header),
        });
    }

    decls
}

fn parse_parents(header: &str) -> Vec<String> {
    let Some((_, list)) = header.split_once(" is ") else {
        return Vec::new();
    };
    split_args(list)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|parent| {
            let name: String = parent
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '$')
                .collect();
            (!name.is_empty()).then_some(name)
        })
        .collect()
}

/// The declaration enclosing `line`: the nearest one at or before it.
pub fn enclosing_contract(decls: &[ContractDecl], line: usize) -> Option<&ContractDecl> {
    decls.iter().rev().find(|d| d.line <= line)
}

// ============================================================================
// Scanned file
// ============================================================================

/// One source file after line normalization and region tracking.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// Module name for Move sources, `None` for a single EVM string.
    pub module: Option<String>,
    /// Original lines, used for evidence snippets.
    pub raw: Vec<String>,
    /// Comment-stripped lines, used for matching.
    pub lines: Vec<String>,
    pub regions: RegionMap,
    pub contracts: Vec<ContractDecl>,
}

impl ScannedFile {
    pub fn scan(module: Option<&str>, source: &str) -> Self {
        let raw: Vec<String> = source.lines().map(str::to_string).collect();
        let lines = strip_comments(&raw);
        let regions = RegionMap::build(&lines);
        let contracts = contract_declarations(&lines);
        tracing::trace!(
            module = module.unwrap_or("<evm>"),
            lines = lines.len(),
            regions = regions.regions().len(),
            contracts = contracts.len(),
            "scanned source"
        );
        Self {
            module: module.map(str::to_string),
            raw,
            lines,
            regions,
            contracts,
        }
    }

    pub fn enclosing_contract(&self, line: usize) -> Option<&ContractDecl> {
        enclosing_contract(&self.contracts, line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &str) -> Vec<String> {
        strip_comments(&src.lines().collect::<Vec<_>>())
    }

    #[test]
    fn tracks_constructor_and_functions() {
        let src = r#"contract T is ERC20 {
    constructor() ERC20("T", "T") {
        _mint(msg.sender, 100);
    }

    function mint(address to, uint256 amount) external onlyOwner {
        if (amount > 0) {
            _mint(to, amount);
        }
    }
}"#;
        let l = lines(src);
        let map = RegionMap::build(&l);
        assert_eq!(map.regions().len(), 2);
        assert_eq!(map.kind_for_line(2), &RegionKind::Constructor);
        assert_eq!(map.kind_for_line(4), &RegionKind::TopLevel);
        assert_eq!(map.kind_for_line(7), &RegionKind::Function("mint".into()));
        let mint = &map.regions()[1];
        assert_eq!((mint.start, mint.body_start, mint.end), (5, Some(5), 9));
        assert_eq!(
            mint.signature,
            "function mint(address to, uint256 amount) external onlyOwner"
        );
    }

    #[test]
    fn single_line_body_opens_and_closes() {
        let l = lines("function cap() public view returns (uint256) { return _cap; }\nuint x;");
        let map = RegionMap::build(&l);
        let region = &map.regions()[0];
        assert_eq!((region.start, region.end), (0, 0));
        assert_eq!(map.kind_for_line(1), &RegionKind::TopLevel);
    }

    #[test]
    fn bodiless_declaration_closes_on_semicolon() {
        let l = lines("interface I {\n    function mint(address to, uint256 amount) external;\n    function burn(uint256) external;\n}");
        let map = RegionMap::build(&l);
        assert_eq!(map.regions().len(), 2);
        assert!(!map.regions()[0].has_body());
        assert_eq!(map.regions()[0].end, 1);
    }

    #[test]
    fn multi_line_header_and_move_init() {
        let src = "module x::coin {\n    fun init(\n        witness: COIN,\n        ctx: &mut TxContext,\n    ) {\n        let x = 1;\n    }\n\n    public entry fun mint<T>(cap: &mut TreasuryCap<T>) {\n    }\n}";
        let l = lines(src);
        let map = RegionMap::build(&l);
        let init = &map.regions()[0];
        assert_eq!(init.kind, RegionKind::Init);
        assert_eq!((init.start, init.body_start, init.end), (1, Some(4), 6));
        assert_eq!(map.regions()[1].kind, RegionKind::Function("mint".into()));
        assert!(map.regions()[1].signature.starts_with("public entry fun mint<T>"));
    }

    #[test]
    fn unbalanced_braces_close_early_without_panicking() {
        let src = "function a() {\n    if (x) {\nfunction b() {\n}\n";
        let l = lines(src);
        let map = RegionMap::build(&l);
        assert_eq!(map.regions().len(), 2);
        assert_eq!(map.regions()[0].end, 1);
        assert_eq!(map.regions()[1].start, 2);

        let map = RegionMap::build(&lines("function open() {\n    x = 1;"));
        assert_eq!(map.regions()[0].end, 1);
        assert!(RegionMap::build(&[]).is_empty());
    }

    #[test]
    fn headers_inside_strings_and_comments_are_ignored() {
        let l = lines("string s = \"function mint(\";\n// function mint(address) external {");
        let map = RegionMap::build(&l);
        assert!(map.regions().is_empty());
    }

    #[test]
    fn contract_declarations_capture_parents() {
        let src = "abstract contract Base is Context {}\ncontract Token is\n    ERC20(\"A\", \"B\"),\n    Ownable\n{\n}";
        let decls = contract_declarations(&lines(src));
        assert_eq!(decls.len(), 2);
        assert!(decls[0].is_abstract);
        assert_eq!(decls[1].name, "Token");
        assert_eq!(decls[1].parents, vec!["ERC20", "Ownable"]);
        assert_eq!(enclosing_contract(&decls, 4).map(|d| d.name.as_str()), Some("Token"));
    }
}
