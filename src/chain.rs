//! Chain detection from a token address.

use serde::{Deserialize, Serialize};

use crate::finding::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainKind {
    Evm,
    Sui,
    Solana,
    Unknown,
}

impl ChainKind {
    /// Guess the chain from the address shape.
    ///
    /// `0x...::module::Type` and 66-char `0x` object ids are Sui, 42-char `0x`
    /// addresses are EVM, 32 to 44 char base58-looking strings are Solana.
    pub fn detect(address: &str) -> Self {
        let address = address.trim();
        let hex_prefixed = address.starts_with("0x");

        if address.contains("::") || (hex_prefixed && address.len() == 66) {
            return ChainKind::Sui;
        }
        if !hex_prefixed && (32..=44).contains(&address.len()) && is_base58(address) {
            return ChainKind::Solana;
        }
        if hex_prefixed && address.len() == 42 {
            return ChainKind::Evm;
        }
        ChainKind::Unknown
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChainKind::Evm => "evm",
            ChainKind::Sui => "sui",
            ChainKind::Solana => "solana",
            ChainKind::Unknown => "unknown",
        }
    }

    /// Source language the analyzer uses for this chain, if it has one.
    pub fn language(&self) -> Option<Language> {
        match self {
            ChainKind::Evm => Some(Language::Evm),
            ChainKind::Sui => Some(Language::Move),
            ChainKind::Solana | ChainKind::Unknown => None,
        }
    }
}

impl std::fmt::Display for ChainKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn is_base58(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l'))
}
