use anyhow::{Context, bail};
use clap::Parser;
use mint_risk::chain::ChainKind;
use mint_risk::cli::{AnalyzeArgs, Args, Command, OutputFormat};
use mint_risk::config::{self, AnalyzerSettings, DEFAULT_MAX_SOURCE_LINES};
use mint_risk::report;
use mint_risk::store::FindingStore;
use mint_risk::{Language, MintAnalyzer, MintFinding, SourceUnit};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    mint_risk::telemetry::init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        Some(Command::Patterns) => {
            print_patterns()?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Command::Analyze(analyze)) => analyze_command(analyze),
        None => analyze_command(args.analyze),
    }
}

fn print_patterns() -> anyhow::Result<()> {
    let start_dir = std::env::current_dir()?;
    let settings = match config::load_config(None, &start_dir)? {
        Some((_, cfg)) => cfg.analyzer_settings(),
        None => AnalyzerSettings::default(),
    };
    let p = &settings.patterns;

    for (title, list) in [
        ("access modifiers", &p.access_modifiers),
        ("inappropriate modifiers", &p.inappropriate_modifiers),
        ("access-control bases", &p.access_control_bases),
        ("token bases", &p.token_bases),
        ("capability suffixes", &p.capability_suffixes),
    ] {
        println!("{title}:");
        for item in list {
            println!("  {item}");
        }
    }
    Ok(())
}

fn analyze_command(args: AnalyzeArgs) -> anyhow::Result<ExitCode> {
    let start_dir = infer_start_dir(&args)?;
    let loaded = config::load_config(args.config.as_deref(), &start_dir)?;
    let (settings, max_lines) = match &loaded {
        Some((path, cfg)) => {
            tracing::debug!(config = %path.display(), "loaded config");
            (cfg.analyzer_settings(), cfg.analysis.max_source_lines)
        }
        None => (AnalyzerSettings::default(), DEFAULT_MAX_SOURCE_LINES),
    };

    let unit = load_source(&args)?;
    let lines = unit.line_count();
    if lines > max_lines {
        bail!("source has {lines} lines, above the limit of {max_lines} (analysis.max_source_lines)");
    }

    let analyzer = MintAnalyzer::new_with_settings(settings);
    let findings = match (&args.store, &args.address) {
        (Some(store_path), Some(address)) => {
            analyze_with_store(&analyzer, &unit, args.decimals, store_path, address)?
        }
        _ => analyzer.analyze(&unit, args.decimals),
    };

    let rendered = match args.format {
        OutputFormat::Pretty => report::render_all_text(&findings),
        OutputFormat::Markdown => report::render_all_markdown(&findings),
        OutputFormat::Json => report::render_json(&findings)?,
    };
    print!("{rendered}");
    if !rendered.ends_with('\n') {
        println!();
    }

    if let Some(threshold) = args.fail_on {
        let threshold = threshold.severity();
        if findings.iter().any(|f| f.severity >= threshold) {
            return Ok(ExitCode::from(1));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn analyze_with_store(
    analyzer: &MintAnalyzer,
    unit: &SourceUnit,
    decimals: Option<u8>,
    store_path: &Path,
    address: &str,
) -> anyhow::Result<Vec<MintFinding>> {
    let mut store = FindingStore::load(store_path)
        .map_err(|e| e.into_anyhow())
        .with_context(|| format!("failed to load finding store: {}", store_path.display()))?;

    let digest = unit.digest();
    if let Some(entry) = store.lookup(address, &digest) {
        tracing::info!(address, analyzed_at = %entry.analyzed_at, "using stored findings");
        return Ok(entry.findings.clone());
    }

    let findings = analyzer.analyze(unit, decimals);
    store.record(address, &digest, findings.clone());
    store
        .save(store_path)
        .map_err(|e| e.into_anyhow())
        .with_context(|| format!("failed to save finding store: {}", store_path.display()))?;
    Ok(findings)
}

// ============================================================================
// Source loading
// ============================================================================

fn load_source(args: &AnalyzeArgs) -> anyhow::Result<SourceUnit> {
    let address_language = args
        .address
        .as_deref()
        .and_then(|a| ChainKind::detect(a).language());

    if args.paths.is_empty() {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        let Some(language) = args.lang.language().or(address_language) else {
            bail!("cannot infer the language of stdin input; pass --lang evm|move");
        };
        let unit = match language {
            Language::Evm => SourceUnit::evm(source),
            Language::Move => SourceUnit::move_modules([("stdin", source)]),
        };
        return Ok(unit.with_decimals(args.decimals));
    }

    let files = collect_source_files(&args.paths)?;
    let language = match args.lang.language() {
        Some(language) => language,
        None => match language_from_extensions(&files)? {
            Some(language) => language,
            None => match address_language {
                Some(language) => language,
                None => bail!("cannot infer the source language; pass --lang evm|move"),
            },
        },
    };

    let files: Vec<PathBuf> = files
        .into_iter()
        .filter(|p| match extension_language(p) {
            Some(l) => l == language,
            None => true,
        })
        .collect();
    if files.is_empty() {
        bail!("no {language} sources found");
    }

    let unit = SourceUnit::from_paths(&files, language, args.primary.as_deref())
        .map_err(|e| e.into_anyhow())
        .context("failed to load sources")?;
    Ok(unit.with_decimals(args.decimals))
}

fn extension_language(path: &Path) -> Option<Language> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("sol") => Some(Language::Evm),
        Some("move") => Some(Language::Move),
        _ => None,
    }
}

fn language_from_extensions(files: &[PathBuf]) -> anyhow::Result<Option<Language>> {
    let has_sol = files
        .iter()
        .any(|p| extension_language(p) == Some(Language::Evm));
    let has_move = files
        .iter()
        .any(|p| extension_language(p) == Some(Language::Move));
    match (has_sol, has_move) {
        (true, true) => bail!("both .sol and .move sources given; pass --lang to pick one"),
        (true, false) => Ok(Some(Language::Evm)),
        (false, true) => Ok(Some(Language::Move)),
        (false, false) => Ok(None),
    }
}

fn collect_source_files(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for path in paths {
        collect_from_path(path, &mut out)?;
    }

    out.sort();
    out.dedup();
    Ok(out)
}

fn collect_from_path(path: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let meta = std::fs::metadata(path)
        .with_context(|| format!("failed to access {}", path.display()))?;
    if meta.is_dir() {
        collect_from_dir(path, out)
    } else {
        out.push(path.to_path_buf());
        Ok(())
    }
}

fn collect_from_dir(dir: &Path, out: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            if should_skip_dir(&path) {
                continue;
            }
            collect_from_dir(&path, out)?;
            continue;
        }

        if extension_language(&path).is_some() {
            out.push(path);
        }
    }

    Ok(())
}

fn should_skip_dir(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
        return false;
    };

    name.starts_with('.') || matches!(name, "target" | "build" | "node_modules")
}

fn infer_start_dir(args: &AnalyzeArgs) -> anyhow::Result<PathBuf> {
    let base = match args.paths.first() {
        Some(p) => p.clone(),
        None => std::env::current_dir()?,
    };

    let base = if base.is_file() {
        base.parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        base
    };

    Ok(base)
}
