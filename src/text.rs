//! Lexical helpers shared by the scanners.
//!
//! Nothing in here tokenizes properly. String detection is quote parity on a
//! single line, so multi-line strings are not understood.

use num_bigint::BigUint;

/// Strip comments from every line while preserving line numbering.
///
/// `//` comments are cut, `/* ... */` blocks are blanked even when they span
/// lines. Quotes are respected so `"http://x"` survives.
pub fn strip_comments<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len());
    let mut in_block = false;

    for line in lines {
        let line = line.as_ref();
        let mut kept = String::with_capacity(line.len());
        let mut quote: Option<char> = None;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            if in_block {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    in_block = false;
                    kept.push(' ');
                }
                continue;
            }

            if let Some(q) = quote {
                kept.push(c);
                if c == q {
                    quote = None;
                }
                continue;
            }

            match c {
                '"' | '\'' => {
                    quote = Some(c);
                    kept.push(c);
                }
                '/' if chars.peek() == Some(&'/') => break,
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    in_block = true;
                }
                _ => kept.push(c),
            }
        }

        out.push(kept.trim_end().to_string());
    }

    out
}

/// Returns true when `byte_idx` falls inside a string literal on `line`.
///
/// An odd number of quote characters to the left of the match means we are
/// inside a literal.
pub fn in_string_literal(line: &str, byte_idx: usize) -> bool {
    let Some(before) = line.get(..byte_idx) else {
        return false;
    };
    let quotes = before.chars().filter(|c| *c == '"' || *c == '\'').count();
    quotes % 2 == 1
}

/// Count `{` and `}` outside of string literals.
pub fn brace_counts(line: &str) -> (usize, usize) {
    let mut opens = 0usize;
    let mut closes = 0usize;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '{' => opens += 1,
            '}' => closes += 1,
            _ => {}
        }
    }

    (opens, closes)
}

/// Find every occurrence of `word` in `haystack` that sits on identifier boundaries.
pub fn find_word(haystack: &str, word: &str) -> Vec<usize> {
    if word.is_empty() {
        return Vec::new();
    }
    haystack
        .match_indices(word)
        .filter(|(idx, _)| {
            let before = haystack[..*idx].chars().next_back();
            let after = haystack[idx + word.len()..].chars().next();
            !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
        })
        .map(|(idx, _)| idx)
        .collect()
}

/// True when `word` occurs on identifier boundaries and outside string literals.
pub fn contains_code_word(line: &str, word: &str) -> bool {
    find_word(line, word)
        .into_iter()
        .any(|idx| !in_string_literal(line, idx))
}

pub fn is_ident_char(c: char) -> bool {
    c == '_' || c == '$' || c.is_ascii_alphanumeric()
}

pub fn is_simple_ident(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first == '_' || first == '$' || first.is_ascii_alphabetic()) {
        return false;
    }
    chars.all(is_ident_char)
}

/// Split a camelCase / snake_case identifier into lowercase words.
///
/// `safeMint` -> `["safe", "mint"]`, `mint_and_transfer` -> `["mint", "and", "transfer"]`.
pub fn identifier_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if c == '_' || c == '$' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_ascii_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        current.push(c.to_ascii_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
}

pub(crate) fn find_matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a call argument list on top-level commas.
pub fn split_args(args: &str) -> Option<Vec<&str>> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;

    let mut start = 0usize;
    let bytes = args.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'"' => {
                let escaped = i > 0 && bytes[i - 1] == b'\\';
                if !escaped {
                    in_string = !in_string;
                }
            }
            b'(' | b'{' | b'[' if !in_string => depth += 1,
            b')' | b'}' | b']' if !in_string => depth = depth.checked_sub(1)?,
            b',' if !in_string && depth == 0 => {
                out.push(args.get(start..i)?.trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    let tail = args.get(start..)?.trim();
    if !tail.is_empty() {
        out.push(tail);
    }

    Some(out)
}

/// Arguments of the call whose `(` sits at `open` in `text`.
pub fn call_arguments(text: &str, open: usize) -> Option<Vec<&str>> {
    let close = find_matching_paren(text, open)?;
    split_args(text.get(open + 1..close)?)
}

/// Join `lines[start..]` until parentheses opened on the first line balance.
///
/// Calls in real contracts often wrap over several lines; `limit` bounds the
/// look-ahead.
pub fn join_statement(lines: &[String], start: usize, limit: usize) -> String {
    let mut joined = String::new();
    let mut depth: isize = 0;
    let mut seen_open = false;
    for line in lines.iter().skip(start).take(limit) {
        if !joined.is_empty() {
            joined.push(' ');
        }
        joined.push_str(line.trim());
        for c in line.chars() {
            match c {
                '(' => {
                    depth += 1;
                    seen_open = true;
                }
                ')' => depth -= 1,
                _ => {}
            }
        }
        if (seen_open && depth <= 0) || line.contains(';') {
            break;
        }
    }
    joined
}

pub fn is_zero(value: &BigUint) -> bool {
    value.bits() == 0
}

const MAX_EXPONENT: u32 = 96;

/// Evaluate a literal-only integer expression.
///
/// Understands `1_000_000`, `1e18`, `2.5e6`, `0xff`, Move suffixes (`100u64`),
/// Solidity units (`5 ether`) and products/powers of those
/// (`1_000_000 * 10**18`). Anything mentioning an identifier yields `None`.
pub fn parse_amount(expr: &str) -> Option<BigUint> {
    let expr = strip_wrapping_parens(expr.trim().trim_end_matches(';').trim());
    if expr.is_empty() {
        return None;
    }

    let normalized = expr.replace("**", "^");
    let mut product = BigUint::from(1u32);
    for factor in normalized.split('*') {
        let mut parts = factor.split('^');
        let base = parse_atom(parts.next()?)?;
        let value = match parts.next() {
            Some(exp) => {
                let exp = parse_atom(exp)?;
                let exp = u32::try_from(exp).ok().filter(|e| *e <= MAX_EXPONENT)?;
                base.pow(exp)
            }
            None => base,
        };
        if parts.next().is_some() {
            return None;
        }
        product *= value;
    }

    Some(product)
}

fn strip_wrapping_parens(mut expr: &str) -> &str {
    while expr.starts_with('(')
        && find_matching_paren(expr, 0) == Some(expr.len().saturating_sub(1))
    {
        expr = expr[1..expr.len() - 1].trim();
    }
    expr
}

fn parse_atom(atom: &str) -> Option<BigUint> {
    let atom = strip_wrapping_parens(atom.trim());
    let (number, unit) = match atom.split_once(char::is_whitespace) {
        Some((n, u)) => (n.trim(), Some(u.trim())),
        None => (atom, None),
    };

    let multiplier = match unit {
        None | Some("wei") => 0,
        Some("gwei") => 9,
        Some("ether") => 18,
        Some(_) => return None,
    };

    let number = strip_int_suffix(number);
    let value = if let Some(hex) = number
        .strip_prefix("0x")
        .or_else(|| number.strip_prefix("0X"))
    {
        let digits: String = hex.chars().filter(|c| *c != '_').collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        BigUint::parse_bytes(digits.as_bytes(), 16)?
    } else {
        parse_decimal(number)?
    };

    Some(value * BigUint::from(10u32).pow(multiplier))
}

fn strip_int_suffix(number: &str) -> &str {
    for suffix in ["u256", "u128", "u64", "u32", "u16", "u8"] {
        if let Some(stripped) = number.strip_suffix(suffix)
            && stripped.chars().next_back().is_some_and(|c| c.is_ascii_digit())
        {
            return stripped;
        }
    }
    number
}

fn parse_decimal(number: &str) -> Option<BigUint> {
    let cleaned: String = number.chars().filter(|c| *c != '_').collect();
    let (mantissa, exponent) = match cleaned.split_once(['e', 'E']) {
        Some((m, e)) => (m.to_string(), e.parse::<u32>().ok()?),
        None => (cleaned, 0),
    };
    if exponent > MAX_EXPONENT {
        return None;
    }

    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i.to_string(), f.trim_end_matches('0').to_string()),
        None => (mantissa, String::new()),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let frac_len = u32::try_from(frac_part.len()).ok()?;
    if frac_len > exponent {
        return None;
    }
    let digits = format!("{int_part}{frac_part}");
    let digits = if digits.is_empty() { "0".to_string() } else { digits };
    let base = BigUint::parse_bytes(digits.as_bytes(), 10)?;
    Some(base * BigUint::from(10u32).pow(exponent - frac_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(expr: &str) -> Option<String> {
        parse_amount(expr).map(|v| v.to_string())
    }

    #[test]
    fn strip_comments_handles_line_and_block_forms() {
        let lines = [
            "uint256 cap = 10; // cap comment",
            "/* onlyOwner",
            " * still comment */ uint x;",
            "string s = \"http://example.com\";",
        ];
        let stripped = strip_comments(&lines);
        assert_eq!(stripped[0], "uint256 cap = 10;");
        assert_eq!(stripped[1], "");
        assert_eq!(stripped[2], "  uint x;");
        assert_eq!(stripped[3], "string s = \"http://example.com\";");
    }

    #[test]
    fn quote_parity_detects_string_context() {
        let line = r#"require(amount > 0, "only owner may call");"#;
        let idx = line.find("owner").unwrap();
        assert!(in_string_literal(line, idx));
        let line = r#"require(msg.sender == owner, "nope");"#;
        let idx = line.find("owner").unwrap();
        assert!(!in_string_literal(line, idx));
    }

    #[test]
    fn brace_counts_ignore_strings() {
        assert_eq!(brace_counts("function f() { emit X(\"{\"); }"), (1, 1));
        assert_eq!(brace_counts("}"), (0, 1));
    }

    #[test]
    fn word_search_respects_boundaries() {
        assert_eq!(find_word("minter mint _mint", "mint"), vec![7]);
        assert!(contains_code_word("onlyOwner {", "onlyOwner"));
        assert!(!contains_code_word("\"onlyOwner\"", "onlyOwner"));
    }

    #[test]
    fn identifier_words_split_camel_and_snake() {
        assert_eq!(identifier_words("safeMint"), vec!["safe", "mint"]);
        assert_eq!(identifier_words("mint_and_transfer"), vec!["mint", "and", "transfer"]);
        assert_eq!(identifier_words("_mint"), vec!["mint"]);
        assert_eq!(identifier_words("minter"), vec!["minter"]);
    }

    #[test]
    fn call_arguments_split_nested_calls() {
        let text = "coin::mint<T>(&mut cap, amount(1, 2), ctx)";
        let open = text.find('(').unwrap();
        let args = call_arguments(text, open).unwrap();
        assert_eq!(args, vec!["&mut cap", "amount(1, 2)", "ctx"]);
    }

    #[test]
    fn parse_amount_literal_forms() {
        assert_eq!(amount("1_000_000"), Some("1000000".into()));
        assert_eq!(amount("1e18"), Some("1000000000000000000".into()));
        assert_eq!(amount("2.5e3"), Some("2500".into()));
        assert_eq!(amount("0xff"), Some("255".into()));
        assert_eq!(amount("100u64"), Some("100".into()));
        assert_eq!(amount("5 ether"), Some("5000000000000000000".into()));
        assert_eq!(amount("1_000_000 * 10**18"), Some("1000000000000000000000000".into()));
        assert_eq!(amount("(21000000 * 1e8);"), Some("2100000000000000".into()));
    }

    #[test]
    fn parse_amount_rejects_identifiers() {
        assert_eq!(amount("maxSupply_"), None);
        assert_eq!(amount("1000 * 10 ** decimals()"), None);
        assert_eq!(amount("1.5"), None);
        assert_eq!(amount(""), None);
    }
}
