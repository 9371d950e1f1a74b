use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture(rel: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(rel)
}

fn mint_risk(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mint-risk"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("binary should run")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

#[test]
fn pretty_output_and_fail_on_threshold() {
    let path = fixture("evm/open_mint.sol");
    let path = path.to_str().unwrap();

    let out = mint_risk(&[path]);
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).starts_with("[CRITICAL] runtime_only (evm)"));

    let out = mint_risk(&["analyze", path, "--fail-on", "high"]);
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn fail_on_is_not_triggered_below_threshold() {
    let path = fixture("evm/owner_mint.sol");
    let out = mint_risk(&[path.to_str().unwrap(), "--fail-on", "medium"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).starts_with("[INFO]"));
}

#[test]
fn json_output_parses() {
    let path = fixture("move/gold.move");
    let out = mint_risk(&[path.to_str().unwrap(), "--format", "json"]);
    assert_eq!(out.status.code(), Some(0));

    let value: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    let findings = value.as_array().unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0]["mint_type"], "deploy_once");
    assert_eq!(findings[0]["language"], "move");
    assert_eq!(findings[0]["sites"][0]["module"], "gold");
    assert_eq!(
        findings[0]["supply"]["decimals_normalized"]["label"],
        "1000000000 tokens (10亿)"
    );
}

#[test]
fn directory_input_uses_primary_hint() {
    let dir = fixture("evm_multi");
    let dir = dir.to_str().unwrap();

    let out = mint_risk(&[dir]);
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(stdout(&out), "no mint capability found\n");

    let out = mint_risk(&[dir, "--primary", "multitoken", "--fail-on", "critical"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stdout(&out).contains("`mint` (runtime_function)"));
}

#[test]
fn markdown_output_has_fenced_evidence() {
    let path = fixture("evm/paused_mint.sol");
    let out = mint_risk(&[path.to_str().unwrap(), "--format", "markdown"]);
    let md = stdout(&out);
    assert!(md.starts_with("# Mint risk report"));
    assert!(md.contains("```solidity"));
    assert!(md.contains("- **Warning:** inappropriate modifier for mint: whenNotPaused"));
}

#[test]
fn mixed_languages_need_explicit_lang() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::copy(fixture("evm/open_mint.sol"), tmp.path().join("a.sol")).unwrap();
    std::fs::copy(fixture("move/gold.move"), tmp.path().join("gold.move")).unwrap();
    let dir = tmp.path().to_str().unwrap();

    let out = mint_risk(&[dir]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("pass --lang"));

    let out = mint_risk(&[dir, "--lang", "move"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(stdout(&out).contains("gold:17"));
}

#[test]
fn skipped_directories_are_not_scanned() {
    let tmp = tempfile::tempdir().unwrap();
    for skipped in ["node_modules", "build", ".git"] {
        let dir = tmp.path().join(skipped);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::copy(fixture("evm/open_mint.sol"), dir.join("Open.sol")).unwrap();
    }
    std::fs::copy(fixture("evm/no_mint.sol"), tmp.path().join("Vault.sol")).unwrap();

    let out = mint_risk(&[tmp.path().to_str().unwrap(), "--fail-on", "info"]);
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(stdout(&out), "no mint capability found\n");
}

#[test]
fn store_caches_findings_by_address() {
    let tmp = tempfile::tempdir().unwrap();
    let store = tmp.path().join("store.json");
    let store = store.to_str().unwrap();
    let path = fixture("evm/open_mint.sol");
    let path = path.to_str().unwrap();
    let address = "0xdac17f958d2ee523a2206206994597c13d831ec7";

    let first = mint_risk(&[path, "--address", address, "--store", store, "--format", "json"]);
    assert_eq!(first.status.code(), Some(0));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store).unwrap()).unwrap();
    assert_eq!(saved["entries"][address]["chain"], "evm");

    let second = mint_risk(&[path, "--address", address, "--store", store, "--format", "json"]);
    assert_eq!(stdout(&first), stdout(&second));
}

#[test]
fn store_requires_address() {
    let path = fixture("evm/open_mint.sol");
    let out = mint_risk(&[path.to_str().unwrap(), "--store", "store.json"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn patterns_subcommand_lists_tables() {
    let out = mint_risk(&["patterns"]);
    assert_eq!(out.status.code(), Some(0));
    let text = stdout(&out);
    assert!(text.contains("access modifiers:\n  onlyOwner\n"));
    assert!(text.contains("capability suffixes:"));
}

#[test]
fn missing_path_is_an_error() {
    let out = mint_risk(&["/no/such/contract.sol"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("failed to access"));
}
