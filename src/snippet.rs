//! Evidence snippets: plain line slices around a location.

use serde::{Deserialize, Serialize};

use crate::finding::Language;
use crate::scanner::ScannedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnippetKind {
    MintSite,
    SupplyBound,
    ContractDeclaration,
}

impl SnippetKind {
    pub fn title(&self) -> &'static str {
        match self {
            SnippetKind::MintSite => "mint site",
            SnippetKind::SupplyBound => "supply bound",
            SnippetKind::ContractDeclaration => "contract declaration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSnippet {
    pub kind: SnippetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// 1-based, inclusive.
    pub start_line: usize,
    pub end_line: usize,
    pub language: Language,
    pub code: String,
}

impl CodeSnippet {
    /// Slice `[line - radius, line + radius]` of the original text, clamped.
    /// `line` is 1-based.
    pub fn extract(
        file: &ScannedFile,
        kind: SnippetKind,
        line: usize,
        radius: usize,
        language: Language,
    ) -> Option<Self> {
        if file.raw.is_empty() || line == 0 {
            return None;
        }
        let center = (line - 1).min(file.raw.len() - 1);
        let start = center.saturating_sub(radius);
        let end = (center + radius).min(file.raw.len() - 1);

        Some(Self {
            kind,
            module: file.module.clone(),
            start_line: start + 1,
            end_line: end + 1,
            language,
            code: file.raw[start..=end].join("\n"),
        })
    }

    pub fn to_markdown(&self) -> String {
        let location = match &self.module {
            Some(module) => format!("{module}:{}-{}", self.start_line, self.end_line),
            None => format!("lines {}-{}", self.start_line, self.end_line),
        };
        format!(
            "**{}** ({location})\n\n```{}\n{}\n```\n",
            self.kind.title(),
            self.language.code_fence(),
            self.code
        )
    }
}
