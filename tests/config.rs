use mint_risk::config;
use mint_risk::{Confidence, MintAnalyzer, Severity, SourceUnit};
use std::path::Path;

fn fixture_config() -> config::MintRiskConfig {
    let cfg_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/config/mint-risk.toml");
    config::load_config_file(&cfg_path).expect("config should load")
}

#[test]
fn config_extends_pattern_tables() {
    let cfg = fixture_config();
    assert_eq!(cfg.analysis.snippet_radius, 2);
    assert_eq!(cfg.analysis.lookback_lines, 120);
    assert_eq!(cfg.analysis.max_source_lines, config::DEFAULT_MAX_SOURCE_LINES);

    let settings = cfg.analyzer_settings();
    assert!(settings.patterns.is_access_modifier("guarded"));
    assert!(settings.patterns.is_inappropriate_modifier("onlyKeeper"));
    assert!(!settings.patterns.is_access_modifier("onlyKeeper"));
    assert!(settings.patterns.is_token_base("JettonMaster"));
}

#[test]
fn configured_modifiers_change_classification() {
    let unit = SourceUnit::evm(include_str!("fixtures/evm/custom_guard.sol"));

    let builtin = MintAnalyzer::new().analyze(&unit, None);
    assert_eq!(builtin[0].access.confidence, Confidence::None);
    assert_eq!(builtin[0].severity, Severity::Critical);

    let analyzer = MintAnalyzer::new_with_settings(fixture_config().analyzer_settings());
    let findings = analyzer.analyze(&unit, None);
    let f = &findings[0];
    assert_eq!(f.access.confidence, Confidence::Weak);
    assert_eq!(f.severity, Severity::High);
    assert_eq!(f.access.modifiers, vec!["guarded"]);
    assert_eq!(f.access.inappropriate, vec!["onlyKeeper"]);

    let mint_snippet = &f.evidence[0];
    assert_eq!(mint_snippet.end_line - mint_snippet.start_line, 4);
}

#[test]
fn configured_token_base_enables_inherited_finding() {
    let src = "contract Wrapped is JettonMaster {\n    constructor() JettonMaster(\"W\") {}\n}\n";
    let unit = SourceUnit::evm(src);
    assert!(MintAnalyzer::new().analyze(&unit, None).is_empty());

    let analyzer = MintAnalyzer::new_with_settings(fixture_config().analyzer_settings());
    let findings = analyzer.analyze(&unit, None);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].inherited_from, vec!["JettonMaster"]);
}
