//! Heuristic mint-risk analysis for token contracts.
//!
//! The crate exposes a line/brace based `MintAnalyzer` that reads Solidity-like
//! EVM sources or Move modules and reports whether new tokens can be minted
//! after deployment, who may mint them, and whether supply is capped.

#![allow(clippy::should_implement_trait)] // from_str methods intentionally return Option, not Result

pub mod access;
pub mod chain;
pub mod classify;
pub mod cli;
pub mod config;
pub mod error;
pub mod finding;
pub mod patterns;
pub mod report;
pub mod scanner;
pub mod sites;
pub mod snippet;
pub mod source;
pub mod store;
pub mod supply;
pub mod telemetry;
pub mod text;

pub use access::{AccessEvidence, Confidence};
pub use config::AnalyzerSettings;
pub use finding::{Language, MintFinding, MintType, Severity};
pub use sites::{MintSite, SiteKind};
pub use snippet::{CodeSnippet, SnippetKind};
pub use source::SourceUnit;
pub use supply::{DisplayAmount, SupplyBound};

use itertools::Itertools;

use crate::access::{classify_deploy_only, classify_runtime};
use crate::classify::{recommend, severity_for};
use crate::scanner::{ContractDecl, ScannedFile};
use crate::sites::{DetectedSite, detect_sites};
use crate::supply::SupplyExtractor;

/// Radius of the contract-declaration snippet on inherited findings.
const DECLARATION_SNIPPET_RADIUS: usize = 3;

/// Analyzer orchestrating scanning, site detection and classification.
///
/// Holds only immutable settings, so one instance can serve concurrent scans.
#[derive(Debug, Clone, Default)]
pub struct MintAnalyzer {
    settings: AnalyzerSettings,
}

impl MintAnalyzer {
    /// Create an analyzer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer with explicit settings (e.g. from config).
    pub fn new_with_settings(settings: AnalyzerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    /// Analyze one source unit. `decimals` overrides the unit's own decimals.
    ///
    /// Returns zero findings when nothing can mint, otherwise exactly one.
    pub fn analyze(&self, source: &SourceUnit, decimals: Option<u8>) -> Vec<MintFinding> {
        if source.is_blank() {
            return Vec::new();
        }
        let language = source.language();
        let decimals = decimals.or(source.decimals());

        let files: Vec<ScannedFile> = instrument_block!("scan", {
            source
                .texts()
                .into_iter()
                .map(|(module, text)| ScannedFile::scan(module, text))
                .collect::<Vec<_>>()
        });

        let sites = instrument_block!("sites", { detect_sites(&files, language) });
        let supply = instrument_block!("supply", {
            SupplyExtractor::new(&files, language, self.settings.lookback_lines).extract(decimals)
        });

        let finding = if sites.is_empty() {
            self.inherited_finding(&files, language, supply)
        } else {
            Some(self.site_finding(&files, language, &sites, supply))
        };

        if let Some(f) = &finding {
            tracing::debug!(
                severity = %f.severity,
                mint_type = %f.mint_type,
                confidence = %f.access.confidence,
                "mint finding"
            );
        }
        finding.into_iter().collect()
    }

    fn site_finding(
        &self,
        files: &[ScannedFile],
        language: Language,
        sites: &[DetectedSite],
        supply: SupplyBound,
    ) -> MintFinding {
        let has_runtime = sites.iter().any(DetectedSite::is_runtime);
        let has_deploy = sites.iter().any(|s| !s.is_runtime());
        let mint_type =
            MintType::from_sites(has_deploy, has_runtime).unwrap_or(MintType::DeployOnce);

        let patterns = &self.settings.patterns;
        let access = instrument_block!("access", {
            if has_runtime {
                AccessEvidence::merge_weakest(
                    sites
                        .iter()
                        .filter(|s| s.is_runtime())
                        .filter_map(|s| s.region(files))
                        .map(|(file, region)| classify_runtime(file, region, language, patterns))
                        .collect(),
                )
            } else {
                let deploy_lines: Vec<(usize, usize)> =
                    sites.iter().map(|s| (s.file, s.site.line - 1)).collect();
                classify_deploy_only(files, &deploy_lines, patterns)
            }
        });

        let severity = severity_for(mint_type, access.confidence);
        let (recommendation, warnings) = recommend(mint_type, &access, &supply, &[]);

        let mut evidence: Vec<CodeSnippet> = sites
            .iter()
            .filter_map(|s| {
                CodeSnippet::extract(
                    files.get(s.file)?,
                    SnippetKind::MintSite,
                    s.site.line,
                    self.settings.snippet_radius,
                    language,
                )
            })
            .collect();
        if let Some(snippet) = self.supply_snippet(files, language, &supply) {
            evidence.push(snippet);
        }
        let evidence = evidence
            .into_iter()
            .unique_by(|s| (s.module.clone(), s.start_line, s.end_line))
            .collect();

        MintFinding {
            severity,
            mint_type,
            language,
            sites: sites.iter().map(|s| s.site.clone()).collect(),
            access,
            supply,
            evidence,
            recommendation,
            warnings,
            inherited_from: Vec::new(),
        }
    }

    fn supply_snippet(
        &self,
        files: &[ScannedFile],
        language: Language,
        supply: &SupplyBound,
    ) -> Option<CodeSnippet> {
        let line = supply.line?;
        let file = files.iter().find(|f| f.module == supply.module)?;
        CodeSnippet::extract(
            file,
            SnippetKind::SupplyBound,
            line,
            self.settings.snippet_radius,
            language,
        )
    }

    /// No site of its own: report the main contract if it extends a token base.
    fn inherited_finding(
        &self,
        files: &[ScannedFile],
        language: Language,
        supply: SupplyBound,
    ) -> Option<MintFinding> {
        if language != Language::Evm {
            return None;
        }
        let patterns = &self.settings.patterns;
        let (file, decl): (&ScannedFile, &ContractDecl) = files.iter().find_map(|f| {
            f.contracts
                .iter()
                .rev()
                .find(|d| d.is_concrete_contract())
                .map(|d| (f, d))
        })?;
        if !decl.parents.iter().any(|p| patterns.is_token_base(p)) {
            return None;
        }

        let mint_type = MintType::PossiblyInherited;
        let access = AccessEvidence::none();
        let (recommendation, warnings) = recommend(mint_type, &access, &supply, &decl.parents);
        let mut evidence: Vec<CodeSnippet> = CodeSnippet::extract(
            file,
            SnippetKind::ContractDeclaration,
            decl.line + 1,
            DECLARATION_SNIPPET_RADIUS,
            language,
        )
        .into_iter()
        .collect();
        evidence.extend(self.supply_snippet(files, language, &supply));

        Some(MintFinding {
            severity: severity_for(mint_type, access.confidence),
            mint_type,
            language,
            sites: Vec::new(),
            access,
            supply,
            evidence,
            recommendation,
            warnings,
            inherited_from: decl.parents.clone(),
        })
    }
}

/// Analyze with default settings.
pub fn analyze(source: &SourceUnit, decimals: Option<u8>) -> Vec<MintFinding> {
    MintAnalyzer::new().analyze(source, decimals)
}
