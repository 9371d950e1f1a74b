//! Every fixture must analyze without panicking and produce identical output
//! on repeated runs.

use mint_risk::report::{render_all_markdown, render_json};
use mint_risk::{MintAnalyzer, SourceUnit};
use std::path::Path;
use walkdir::WalkDir;

fn source_unit(path: &Path, text: String) -> Option<SourceUnit> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("sol") => Some(SourceUnit::evm(text)),
        Some("move") => {
            let stem = path.file_stem()?.to_str()?.to_string();
            Some(SourceUnit::move_modules([(stem, text)]))
        }
        _ => None,
    }
}

#[test]
fn fixtures_are_deterministic() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let analyzer = MintAnalyzer::new();
    let mut seen = 0;

    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry.expect("walk fixtures");
        if !entry.file_type().is_file() {
            continue;
        }
        let text = std::fs::read_to_string(entry.path()).expect("read fixture");
        let Some(unit) = source_unit(entry.path(), text) else {
            continue;
        };
        seen += 1;

        let first = analyzer.analyze(&unit, None);
        let second = analyzer.analyze(&unit, None);
        assert_eq!(first, second, "{}", entry.path().display());
        assert!(first.len() <= 1, "{}", entry.path().display());
        assert_eq!(
            render_json(&first).unwrap(),
            render_json(&second).unwrap(),
            "{}",
            entry.path().display()
        );
        assert_eq!(render_all_markdown(&first), render_all_markdown(&second));

        for finding in &first {
            for snippet in &finding.evidence {
                assert!(snippet.start_line >= 1);
                assert!(snippet.start_line <= snippet.end_line);
            }
            for site in &finding.sites {
                assert!(site.line >= 1);
            }
        }
    }

    assert!(seen >= 10, "expected the fixture corpus, saw {seen} files");
}

#[test]
fn truncated_fixtures_do_not_panic() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures");
    let analyzer = MintAnalyzer::new();

    for entry in WalkDir::new(&root).sort_by_file_name() {
        let entry = entry.expect("walk fixtures");
        if !entry.file_type().is_file() {
            continue;
        }
        let text = std::fs::read_to_string(entry.path()).expect("read fixture");
        let lines: Vec<&str> = text.lines().collect();
        for cut in 0..lines.len() {
            let partial = lines[..cut].join("\n");
            if let Some(unit) = source_unit(entry.path(), partial) {
                let _ = analyzer.analyze(&unit, Some(6));
            }
        }
    }
}
