//! Human-readable rendering of findings.

use crate::finding::MintFinding;
use crate::sites::MintSite;

fn site_location(site: &MintSite) -> String {
    match &site.module {
        Some(module) => format!("{module}:{}", site.line),
        None => format!("line {}", site.line),
    }
}

fn site_line(site: &MintSite) -> String {
    format!("{} `{}` ({})", site_location(site), site.name, site.kind.as_str())
}

/// Plain text report for one finding.
pub fn render_text(finding: &MintFinding) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "[{}] {} ({}): {}\n",
        finding.severity.label(),
        finding.mint_type,
        finding.language.as_str(),
        finding.mint_type.description()
    ));
    for site in &finding.sites {
        out.push_str(&format!("  site: {}\n", site_line(site)));
    }
    if !finding.inherited_from.is_empty() {
        out.push_str(&format!("  inherits: {}\n", finding.inherited_from.join(", ")));
    }
    out.push_str(&format!("  access: {}\n", finding.access.summary()));
    out.push_str(&format!("  supply: {}\n", finding.supply.describe()));
    for warning in &finding.warnings {
        out.push_str(&format!("  warning: {warning}\n"));
    }
    out.push_str("  recommendation:\n");
    for line in finding.recommendation.lines() {
        out.push_str(&format!("    {line}\n"));
    }
    out
}

/// Markdown report: the text summary plus evidence snippets.
pub fn render_markdown(finding: &MintFinding) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "## {} - {}\n\n",
        finding.severity.label(),
        finding.mint_type.description()
    ));
    out.push_str(&format!("- **Mint type:** `{}`\n", finding.mint_type));
    out.push_str(&format!("- **Language:** {}\n", finding.language));
    for site in &finding.sites {
        out.push_str(&format!("- **Site:** {}\n", site_line(site)));
    }
    if !finding.inherited_from.is_empty() {
        out.push_str(&format!(
            "- **Inherits:** {}\n",
            finding.inherited_from.join(", ")
        ));
    }
    out.push_str(&format!("- **Access:** {}\n", finding.access.summary()));
    out.push_str(&format!("- **Supply:** {}\n", finding.supply.describe()));
    for warning in &finding.warnings {
        out.push_str(&format!("- **Warning:** {warning}\n"));
    }
    out.push_str("\n### Recommendation\n\n");
    out.push_str(&finding.recommendation);
    out.push('\n');

    if !finding.evidence.is_empty() {
        out.push_str("\n### Evidence\n\n");
        for snippet in &finding.evidence {
            out.push_str(&snippet.to_markdown());
            out.push('\n');
        }
    }
    out
}

/// Text for a whole run. An empty run renders a single "no mint" line.
pub fn render_all_text(findings: &[MintFinding]) -> String {
    if findings.is_empty() {
        return "no mint capability found\n".to_string();
    }
    findings.iter().map(render_text).collect::<Vec<_>>().join("\n")
}

pub fn render_all_markdown(findings: &[MintFinding]) -> String {
    let mut out = String::from("# Mint risk report\n\n");
    if findings.is_empty() {
        out.push_str("No mint capability found.\n");
        return out;
    }
    for finding in findings {
        out.push_str(&render_markdown(finding));
    }
    out
}

pub fn render_json(findings: &[MintFinding]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SourceUnit, analyze};

    const OPEN_MINT: &str = "contract T {\n    function mint(address to, uint256 a) public {\n        _mint(to, a);\n    }\n}\n";

    #[test]
    fn text_report_lists_site_access_and_warning() {
        let findings = analyze(&SourceUnit::evm(OPEN_MINT), None);
        let text = render_all_text(&findings);
        assert!(text.starts_with("[CRITICAL] runtime_only (evm)"));
        assert!(text.contains("  site: line 2 `mint` (runtime_function)"));
        assert!(text.contains("  access: none (no access control found)"));
        assert!(text.contains("  warning: unbounded inflation risk"));
    }

    #[test]
    fn markdown_report_embeds_fenced_evidence() {
        let findings = analyze(&SourceUnit::evm(OPEN_MINT), None);
        let md = render_all_markdown(&findings);
        assert!(md.starts_with("# Mint risk report"));
        assert!(md.contains("## CRITICAL - mintable at runtime"));
        assert!(md.contains("```solidity\n"));
        assert!(md.contains("### Recommendation"));
    }

    #[test]
    fn empty_run_says_so() {
        assert_eq!(render_all_text(&[]), "no mint capability found\n");
        assert!(render_all_markdown(&[]).contains("No mint capability found."));
        assert_eq!(render_json(&[]).unwrap(), "[]");
    }
}
