//! Supply-bound extraction.
//!
//! Finds maximum-supply constants, assignments and `totalSupply` comparisons,
//! then resolves the bounding value through assignment chains, getters and
//! constructor/initializer parameters. A bound fed by a parameter is reported
//! as `parameterized`; no number is made up for it.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use num_bigint::BigUint;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::finding::Language;
use crate::scanner::{Region, RegionKind, ScannedFile};
use crate::text::{
    call_arguments, identifier_words, in_string_literal, is_simple_ident, is_zero, join_statement,
    parse_amount,
};

/// Assignment chains deeper than this are left unresolved.
const MAX_CHAIN_DEPTH: usize = 4;

// ============================================================================
// Data
// ============================================================================

/// A raw integer amount scaled down by token decimals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayAmount {
    #[serde(with = "biguint_string")]
    pub raw: BigUint,
    pub decimals: u8,
    /// `raw / 10^decimals` when the division is exact.
    #[serde(with = "biguint_string::option")]
    pub whole: Option<BigUint>,
    pub label: String,
}

impl DisplayAmount {
    pub fn new(raw: BigUint, decimals: u8) -> Self {
        let divisor = BigUint::from(10u32).pow(u32::from(decimals));
        let whole = is_zero(&(&raw % &divisor)).then(|| &raw / &divisor);
        let label = match &whole {
            Some(whole) => match unit_suffix(whole) {
                Some(suffix) => format!("{whole} tokens ({suffix})"),
                None => format!("{whole} tokens"),
            },
            None => raw.to_string(),
        };
        Self {
            raw,
            decimals,
            whole,
            label,
        }
    }

    pub fn is_exact(&self) -> bool {
        self.whole.is_some()
    }
}

impl fmt::Display for DisplayAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// `亿` for multiples of 1e8, `万` for multiples of 1e4.
fn unit_suffix(whole: &BigUint) -> Option<String> {
    if is_zero(whole) {
        return None;
    }
    for (exp, unit) in [(8u32, "亿"), (4u32, "万")] {
        let scale = BigUint::from(10u32).pow(exp);
        if whole >= &scale && is_zero(&(whole % &scale)) {
            return Some(format!("{}{unit}", whole / &scale));
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SupplyBound {
    pub present: bool,
    #[serde(with = "biguint_string::option")]
    pub literal_value: Option<BigUint>,
    /// The bound comes from a constructor/initializer argument.
    pub parameterized: bool,
    pub decimals_normalized: Option<DisplayAmount>,
    /// Move supply frozen with `make_supply_fixed` / `FixedSupply`.
    #[serde(default)]
    pub fixed: bool,
    /// Literal amount passed to a mint call, deploy-time calls first.
    #[serde(default, with = "biguint_string::option")]
    pub minted_amount: Option<BigUint>,
    /// `minted_amount` comes from a constructor or `init` call.
    #[serde(default)]
    pub minted_at_deploy: bool,
    /// Name of the bounding variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    /// 1-based line of the bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

impl SupplyBound {
    pub fn describe(&self) -> String {
        if let Some(value) = &self.literal_value {
            let mut text = format!("max supply {value}");
            if let Some(var) = &self.variable {
                text.push_str(&format!(" ({var})"));
            }
            if let Some(display) = &self.decimals_normalized {
                text.push_str(&format!(" = {display}"));
            }
            return text;
        }
        if self.parameterized {
            return match &self.variable {
                Some(var) => format!("max supply set by constructor/initializer parameter `{var}`"),
                None => "max supply set by constructor/initializer parameter".to_string(),
            };
        }
        if self.fixed {
            return "supply fixed after deployment".to_string();
        }
        if self.present {
            return "max supply bound present, value not resolved".to_string();
        }
        "no max supply bound".to_string()
    }
}

mod biguint_string {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let raw = String::deserialize(deserializer)?;
        BigUint::parse_bytes(raw.as_bytes(), 10)
            .ok_or_else(|| D::Error::custom(format!("invalid integer: {raw}")))
    }

    pub mod option {
        use num_bigint::BigUint;
        use serde::{Deserialize, Deserializer, Serializer, de::Error};

        pub fn serialize<S: Serializer>(
            value: &Option<BigUint>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.serialize_some(&v.to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<BigUint>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            raw.map(|raw| {
                BigUint::parse_bytes(raw.as_bytes(), 10)
                    .ok_or_else(|| D::Error::custom(format!("invalid integer: {raw}")))
            })
            .transpose()
        }
    }
}

// ============================================================================
// Resolution
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolution {
    Literal {
        value: BigUint,
        variable: Option<String>,
        /// 0-based line holding the literal.
        line: usize,
    },
    Parameterized {
        variable: String,
    },
    Unresolved,
}

static IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z_$][\w$]*").expect("ident regex"));

static ASSIGN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z_$][\w$]*)\s*(?::\s*[\w:<>]+\s*)?=\s*([^=;>][^;]*)").expect("assign regex")
});

static TOTAL_SUPPLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b_?(?:totalSupply|total_supply)\b").expect("total supply regex"));

static OPERAND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:<=|>=|<|>)\s*([\w$.]+(?:\s*\(\s*\))?(?:\s*\*\*?\s*[\w.]+)*)").expect("operand regex")
});

static RETURN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\breturn\s*\(?\s*([^;()]+?)\s*\)?\s*;").expect("return regex"));

static FIXED_SUPPLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bFixedSupply\b|\bmake_supply_fixed\w*").expect("fixed supply regex"));

static CURRENCY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:new_currency\w*|create_currency\w*|create_regulated_currency\w*)\s*(?:<[^>()]*>)?\s*\(")
        .expect("currency regex")
});

static MINT_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\bcoin::mint_and_transfer|\bcoin::mint|\.mint|\b_?mint)\s*(?:<[^>()]*>)?\s*\(")
        .expect("mint amount regex")
});

/// Words that scope a limit to one holder or one call rather than the token.
const PER_HOLDER_QUALIFIERS: &[&str] = &["per", "wallet", "tx", "address", "account", "user"];

/// True when `ident` names a maximum-supply bound. Per-wallet and
/// per-transaction limits such as `MAX_SUPPLY_PER_WALLET` are not.
pub fn is_supply_identifier(ident: &str, language: Language) -> bool {
    if identifier_words(ident)
        .iter()
        .any(|w| PER_HOLDER_QUALIFIERS.contains(&w.as_str()))
    {
        return false;
    }
    let folded: String = ident
        .chars()
        .filter(|c| *c != '_' && *c != '$')
        .collect::<String>()
        .to_lowercase();
    if folded.contains("maxsupply") || folded.contains("maxtotalsupply") || folded.contains("supplycap")
    {
        return true;
    }
    language == Language::Evm && matches!(folded.as_str(), "cap" | "maxcap" | "hardcap")
}

fn is_amount_like(ident: &str) -> bool {
    let lower = ident.to_lowercase();
    ["amount", "value", "balance", "totalsupply", "total_supply", "supply()"]
        .iter()
        .any(|w| lower.contains(w))
        && !lower.contains("max")
}

/// Key of one name resolution: module, name and 0-based line.
type NameKey = (Option<String>, String, usize);

/// Walks the scanned files to find and resolve the supply bound.
///
/// Name resolutions are memoized per `(module, name, line, depth)` and a name
/// already being resolved at a line resolves to nothing, so self- and cyclic
/// assignments cost one backward scan each.
pub struct SupplyExtractor<'a> {
    files: &'a [ScannedFile],
    language: Language,
    lookback: usize,
    resolved: RefCell<HashMap<(NameKey, usize), Resolution>>,
    in_progress: RefCell<HashSet<NameKey>>,
    assign_patterns: RefCell<HashMap<String, Option<Regex>>>,
    parameters: RefCell<HashMap<(Option<String>, String), bool>>,
}

/// Literal value, its variable, 1-based line and module.
type LiteralHit = (BigUint, Option<String>, usize, Option<String>);
/// Parameter name, 1-based line and module.
type ParameterHit = (String, usize, Option<String>);

/// First candidate of each kind seen while scanning.
#[derive(Default)]
struct Candidates {
    compared_literal: Option<LiteralHit>,
    compared_parameter: Option<ParameterHit>,
    declared_literal: Option<LiteralHit>,
    declared_parameter: Option<ParameterHit>,
}

impl Candidates {
    fn record(&mut self, resolution: Resolution, compared: bool, at: usize, module: &Option<String>) {
        let (literal, parameter) = if compared {
            (&mut self.compared_literal, &mut self.compared_parameter)
        } else {
            (&mut self.declared_literal, &mut self.declared_parameter)
        };
        match resolution {
            Resolution::Literal {
                value,
                variable,
                line,
            } => {
                literal.get_or_insert((value, variable, line + 1, module.clone()));
            }
            Resolution::Parameterized { variable } => {
                parameter.get_or_insert((variable, at + 1, module.clone()));
            }
            Resolution::Unresolved => {}
        }
    }
}

impl<'a> SupplyExtractor<'a> {
    pub fn new(files: &'a [ScannedFile], language: Language, lookback: usize) -> Self {
        Self {
            files,
            language,
            lookback,
            resolved: RefCell::default(),
            in_progress: RefCell::default(),
            assign_patterns: RefCell::default(),
            parameters: RefCell::default(),
        }
    }

    /// Extract the bound. `decimals` is the caller-supplied value, which wins
    /// over a decimals literal found in the code.
    ///
    /// The value `totalSupply` is compared against beats unrelated supply
    /// declarations. Within each group a literal beats a parameter.
    pub fn extract(&self, decimals: Option<u8>) -> SupplyBound {
        let mut bound = SupplyBound::default();
        let mut candidates = Candidates::default();

        for file in self.files {
            for (idx, line) in file.lines.iter().enumerate() {
                if FIXED_SUPPLY_RE
                    .find_iter(line)
                    .any(|m| !in_string_literal(line, m.start()))
                {
                    bound.fixed = true;
                    bound.present = true;
                    if bound.line.is_none() {
                        bound.line = Some(idx + 1);
                        bound.module = file.module.clone();
                    }
                }

                let (present, resolutions) = self.candidate(file, idx, line);
                if !present {
                    continue;
                }
                bound.present = true;

                for (resolution, compared) in resolutions {
                    candidates.record(resolution, compared, idx, &file.module);
                }
            }
        }

        let Candidates {
            compared_literal,
            compared_parameter,
            declared_literal,
            declared_parameter,
        } = candidates;
        let literal = if compared_literal.is_some() {
            compared_literal
        } else if compared_parameter.is_some() {
            None
        } else {
            declared_literal
        };

        if let Some((value, variable, line, module)) = literal {
            tracing::debug!(line, value = %value, "supply bound resolved to literal");
            bound.literal_value = Some(value);
            bound.variable = variable;
            bound.line = Some(line);
            bound.module = module;
        } else if let Some((variable, line, module)) = compared_parameter.or(declared_parameter) {
            tracing::debug!(%variable, line, "supply bound is parameterized");
            bound.parameterized = true;
            bound.variable = Some(variable);
            bound.line = Some(line);
            bound.module = module;
        }

        if let Some((amount, at_deploy)) = self.minted_amount() {
            bound.minted_amount = Some(amount);
            bound.minted_at_deploy = at_deploy;
        }

        let decimals = decimals.or_else(|| match self.language {
            Language::Move => self.currency_decimals(),
            Language::Evm => None,
        });
        let raw = bound.literal_value.clone().or_else(|| bound.minted_amount.clone());
        if let (Some(raw), Some(decimals)) = (raw, decimals) {
            bound.decimals_normalized = Some(DisplayAmount::new(raw, decimals));
        }

        bound
    }

    /// Whether `line` mentions a bound, and the candidate values it yields in
    /// resolution order, each flagged when it is a `totalSupply` comparison
    /// operand.
    fn candidate(&self, file: &ScannedFile, idx: usize, line: &str) -> (bool, Vec<(Resolution, bool)>) {
        let idents: Vec<&str> = IDENT_RE
            .find_iter(line)
            .filter(|m| !in_string_literal(line, m.start()))
            .map(|m| m.as_str())
            .filter(|ident| is_supply_identifier(ident, self.language))
            .collect();
        let compares_total = TOTAL_SUPPLY_RE
            .find_iter(line)
            .any(|m| !in_string_literal(line, m.start()))
            && OPERAND_RE.is_match(line);

        if idents.is_empty() && !compares_total {
            return (false, Vec::new());
        }

        let mut out = Vec::new();
        let mut present = !idents.is_empty();

        // Direct assignment, including constant/immutable/const declarations.
        for caps in ASSIGN_RE.captures_iter(line) {
            let name = &caps[1];
            if is_supply_identifier(name, self.language) {
                out.push((self.resolve_expr(file, &caps[2], idx, 0, Some(name)), false));
            }
        }

        if compares_total {
            for caps in OPERAND_RE.captures_iter(line) {
                let operand = caps[1].trim();
                if TOTAL_SUPPLY_RE.is_match(operand) || is_amount_like(operand) {
                    continue;
                }
                let resolved = self.resolve_expr(file, operand, idx, 0, None);
                let named = is_supply_identifier(operand.trim_end_matches("()").trim(), self.language);
                if named || !matches!(resolved, Resolution::Unresolved) {
                    present = true;
                }
                out.push((resolved, true));
            }
        }

        for ident in idents {
            out.push((self.resolve_name(file, ident, idx, 0), false));
        }

        (present, out)
    }

    fn resolve_expr(
        &self,
        file: &ScannedFile,
        expr: &str,
        line: usize,
        depth: usize,
        variable: Option<&str>,
    ) -> Resolution {
        let expr = expr.trim();
        if let Some(value) = parse_amount(expr) {
            if is_zero(&value) {
                return Resolution::Unresolved;
            }
            return Resolution::Literal {
                value,
                variable: variable.map(str::to_string),
                line,
            };
        }

        let name = expr.trim_end_matches(';').trim();
        let bare = name
            .strip_suffix("()")
            .map(str::trim_end)
            .unwrap_or(name);
        if is_simple_ident(bare) {
            return match self.resolve_name(file, name, line, depth + 1) {
                Resolution::Literal {
                    value,
                    variable: inner,
                    line,
                } => Resolution::Literal {
                    value,
                    variable: variable.map(str::to_string).or(inner),
                    line,
                },
                other => other,
            };
        }
        Resolution::Unresolved
    }

    /// Resolve a variable (or `getter()`) referenced at `line`.
    fn resolve_name(&self, file: &ScannedFile, name: &str, line: usize, depth: usize) -> Resolution {
        if depth > MAX_CHAIN_DEPTH {
            return Resolution::Unresolved;
        }

        let key: NameKey = (file.module.clone(), name.to_string(), line);
        if let Some(done) = self.resolved.borrow().get(&(key.clone(), depth)) {
            return done.clone();
        }
        if !self.in_progress.borrow_mut().insert(key.clone()) {
            return Resolution::Unresolved;
        }

        let resolution = self.resolve_name_uncached(file, name, line, depth);

        self.in_progress.borrow_mut().remove(&key);
        self.resolved
            .borrow_mut()
            .insert((key, depth), resolution.clone());
        resolution
    }

    fn resolve_name_uncached(
        &self,
        file: &ScannedFile,
        name: &str,
        line: usize,
        depth: usize,
    ) -> Resolution {
        if let Some(getter) = name.strip_suffix("()").map(str::trim_end) {
            return self.resolve_getter(file, getter, depth);
        }

        if self.is_deploy_parameter(file, name) {
            return Resolution::Parameterized {
                variable: name.to_string(),
            };
        }

        let Some(assign) = self.assignment_pattern(name) else {
            return Resolution::Unresolved;
        };

        // The nearest earlier assignment shadows older ones.
        let start = line.saturating_sub(self.lookback);
        if let Some((j, caps)) = (start..line)
            .rev()
            .find_map(|j| assign.captures(&file.lines[j]).map(|caps| (j, caps)))
        {
            let resolved = self.resolve_expr(file, &caps[1], j, depth, Some(name));
            if resolved != Resolution::Unresolved {
                return resolved;
            }
        }

        // Constructor and initializer bodies may sit after the reference.
        let first_initializer_assignment = self.initializer_regions(file).find_map(|region| {
            (region.body_start.unwrap_or(region.end)..=region.end).find_map(|j| {
                let caps = file.lines.get(j).and_then(|l| assign.captures(l))?;
                Some((j, caps))
            })
        });
        match first_initializer_assignment {
            Some((j, caps)) => self.resolve_expr(file, &caps[1], j, depth, Some(name)),
            None => Resolution::Unresolved,
        }
    }

    /// `name = <expr>` matcher, built once per name.
    fn assignment_pattern(&self, name: &str) -> Option<Regex> {
        self.assign_patterns
            .borrow_mut()
            .entry(name.to_string())
            .or_insert_with(|| {
                Regex::new(&format!(
                    r"(?:^|[^\w$]){}\s*(?::\s*[\w:<>]+\s*)?=\s*([^=;>][^;]*)",
                    regex::escape(name)
                ))
                .ok()
            })
            .clone()
    }

    fn resolve_getter(&self, file: &ScannedFile, getter: &str, depth: usize) -> Resolution {
        let Some(region) = file
            .regions
            .regions()
            .iter()
            .find(|r| r.has_body() && matches!(&r.kind, RegionKind::Function(n) if n == getter))
        else {
            return Resolution::Unresolved;
        };
        region
            .body_lines(&file.lines)
            .iter()
            .enumerate()
            .find_map(|(offset, l)| {
                let caps = RETURN_RE.captures(l)?;
                let line = region.body_start.unwrap_or(region.start) + offset;
                Some(self.resolve_expr(file, &caps[1], line, depth, None))
            })
            .unwrap_or(Resolution::Unresolved)
    }

    fn initializer_regions<'f>(&self, file: &'f ScannedFile) -> impl Iterator<Item = &'f Region> {
        file.regions.regions().iter().filter(|r| match &r.kind {
            RegionKind::Constructor | RegionKind::Init => true,
            RegionKind::Function(name) => {
                let lower = name.to_lowercase();
                lower.starts_with("initialize") || lower.starts_with("__init") || lower == "init"
            }
            RegionKind::TopLevel => false,
        })
    }

    /// `name` is a parameter of a constructor or initializer.
    fn is_deploy_parameter(&self, file: &ScannedFile, name: &str) -> bool {
        let key = (file.module.clone(), name.to_string());
        if let Some(known) = self.parameters.borrow().get(&key) {
            return *known;
        }

        let pattern = match self.language {
            Language::Evm => format!(
                r"[\w\]]\s+(?:(?:memory|calldata|storage)\s+)?{}\s*[,)]",
                regex::escape(name)
            ),
            Language::Move => format!(r"(?:^|[(,\s]){}\s*:", regex::escape(name)),
        };
        let found = Regex::new(&pattern).is_ok_and(|re| {
            self.initializer_regions(file).any(|r| {
                let params = r
                    .signature
                    .find('(')
                    .map(|open| &r.signature[open..])
                    .unwrap_or_default();
                re.is_match(params)
            })
        });
        self.parameters.borrow_mut().insert(key, found);
        found
    }

    /// Second argument of a Move `new_currency*` / `create_currency*` call.
    fn currency_decimals(&self) -> Option<u8> {
        for file in self.files {
            for (idx, line) in file.lines.iter().enumerate() {
                let Some(m) = CURRENCY_RE.find(line) else {
                    continue;
                };
                if in_string_literal(line, m.start()) {
                    continue;
                }
                let statement = join_statement(&file.lines[idx..], 0, 12);
                let Some(open) = statement.find(m.as_str()).map(|p| p + m.as_str().len() - 1) else {
                    continue;
                };
                let decimals = call_arguments(&statement, open)
                    .and_then(|args| args.get(1).and_then(|a| parse_amount(a)))
                    .and_then(|d| u8::try_from(d).ok());
                if decimals.is_some() {
                    return decimals;
                }
            }
        }
        None
    }

    /// Literal amount passed to a mint call, preferring deploy-time calls,
    /// and whether it was minted at deploy time.
    fn minted_amount(&self) -> Option<(BigUint, bool)> {
        let mut fallback = None;
        for file in self.files {
            for (idx, line) in file.lines.iter().enumerate() {
                for m in MINT_AMOUNT_RE.find_iter(line) {
                    if in_string_literal(line, m.start()) {
                        continue;
                    }
                    let Some(amount) = self.mint_call_amount(file, idx, m.as_str()) else {
                        continue;
                    };
                    if file.regions.kind_for_line(idx).is_deploy_time() {
                        return Some((amount, true));
                    }
                    fallback.get_or_insert((amount, false));
                }
            }
        }
        fallback
    }

    fn mint_call_amount(&self, file: &ScannedFile, idx: usize, call: &str) -> Option<BigUint> {
        let statement = join_statement(&file.lines[idx..], 0, 8);
        let open = statement.find(call)? + call.len() - 1;
        let args = call_arguments(&statement, open)?;
        let arg = if call.starts_with('.') {
            args.first()?
        } else {
            args.get(1)?
        };
        match self.resolve_expr(file, arg, idx, 0, None) {
            Resolution::Literal { value, .. } => Some(value),
            _ => self.resolve_constant(file, arg.trim()),
        }
    }

    /// Look up a module-level `const` / `constant` anywhere in the file.
    fn resolve_constant(&self, file: &ScannedFile, name: &str) -> Option<BigUint> {
        if !is_simple_ident(name) {
            return None;
        }
        let re = Regex::new(&format!(
            r"\b(?:const|constant)\b.*\b{}\s*(?::\s*[\w:<>]+\s*)?=\s*([^;]+)",
            regex::escape(name)
        ))
        .ok()?;
        file.lines
            .iter()
            .find_map(|l| re.captures(l).and_then(|c| parse_amount(&c[1])))
            .filter(|v| !is_zero(v))
    }
}
