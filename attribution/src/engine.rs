//! Symbol-based attribution of free-text titles.
//!
//! Analytics page titles and commerce product titles carry a short literal
//! symbol tag identifying the marketer who owns the page. This module turns
//! a raw title into its normalized join identity (core title + symbol) and
//! resolves titles back to marketer names.

use crate::config::{MappingConfig, ValidationError};
use indexmap::IndexMap;

/// Normalized join identity of a page or product title.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttributedEntity {
    /// Title with separators, symbols and punctuation stripped, lowercased.
    pub core_title: String,
    /// Empty when no known symbol is present in the title.
    pub symbol: String,
}

/// Immutable symbol vocabulary plus the marketer and product lookups
/// derived from a validated [`MappingConfig`].
pub struct SymbolTable {
    /// Vocabulary sorted longest-first, so a symbol that is a substring of
    /// a longer symbol never wins the match.
    symbols: Vec<String>,
    marketer_by_symbol: IndexMap<String, String>,
    symbol_by_product: IndexMap<String, String>,
    default_product_symbol: String,
}

impl SymbolTable {
    pub fn new(config: MappingConfig) -> Result<Self, ValidationError> {
        config.validate()?;

        let mut symbols: Vec<String> = config.page_title_map.keys().cloned().collect();
        symbols.sort_by(|a, b| b.len().cmp(&a.len()));

        Ok(SymbolTable {
            symbols,
            marketer_by_symbol: config.page_title_map,
            symbol_by_product: config.product_to_symbol_map,
            default_product_symbol: config.default_product_symbol,
        })
    }

    /// Extracts the normalized core title and the first matching symbol
    /// from a raw title. Titles with no known symbol attribute to the
    /// empty symbol.
    pub fn attribute(&self, title: &str) -> AttributedEntity {
        let symbol = self
            .symbols
            .iter()
            .find(|s| title.contains(s.as_str()))
            .cloned()
            .unwrap_or_default();

        AttributedEntity {
            core_title: self.core_title(title),
            symbol,
        }
    }

    /// Marketer owning the first known symbol found in the raw title, or
    /// `""` when none matches. Scans the original title, not the
    /// normalized core.
    pub fn marketer_for(&self, title: &str) -> &str {
        self.symbols
            .iter()
            .find(|s| title.contains(s.as_str()))
            .and_then(|s| self.marketer_by_symbol.get(s))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Display symbol for a purchased product, matched case-insensitively
    /// against the product map. Unknown products get the placeholder.
    pub fn product_symbol_for(&self, product_title: &str) -> &str {
        let haystack = product_title.to_lowercase();
        self.symbol_by_product
            .iter()
            .find(|(name, _)| haystack.contains(&name.to_lowercase()))
            .map(|(_, symbol)| symbol.as_str())
            .unwrap_or(&self.default_product_symbol)
    }

    fn core_title(&self, title: &str) -> String {
        // Truncate at whichever separator appears first: an en-dash or a
        // hyphen surrounded by spaces.
        let cut = match (title.find('–'), title.find(" - ")) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        let truncated = match cut {
            Some(index) => &title[..index],
            None => title,
        };

        let mut cleaned = truncated.to_lowercase();
        for symbol in &self.symbols {
            cleaned = cleaned.replace(symbol.as_str(), "");
        }
        cleaned.retain(|c| c.is_alphanumeric() || c.is_whitespace() || c == '_');
        cleaned.trim().to_string()
    }
}
