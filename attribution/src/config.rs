use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Empty symbol in page title mapping")]
    EmptySymbol,

    #[error("Symbol '{0}' maps to an empty marketer name")]
    EmptyMarketer(String),

    #[error("Empty product name in product mapping")]
    EmptyProductName,

    #[error("Product '{0}' maps to an empty symbol")]
    EmptyProductSymbol(String),

    #[error("Empty default product symbol")]
    EmptyDefaultProductSymbol,
}

fn default_product_symbol() -> String {
    "🛒".to_string()
}

/// Marketer attribution mappings, deserialized from the dashboard config.
///
/// Page titles and product names come from two systems with no shared
/// foreign key, so a small curated symbol vocabulary embedded in free text
/// is the only attribution mechanism available. Both maps preserve their
/// declaration order; the lookup order used for matching is derived from
/// `page_title_map` keys sorted longest-first.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct MappingConfig {
    /// Maps a literal symbol tag to the marketer it belongs to.
    pub page_title_map: IndexMap<String, String>,

    /// Maps a product name to the symbol shown next to its purchases.
    #[serde(default)]
    pub product_to_symbol_map: IndexMap<String, String>,

    /// Placeholder symbol for products without a mapping entry.
    #[serde(default = "default_product_symbol")]
    pub default_product_symbol: String,
}

impl MappingConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (symbol, marketer) in &self.page_title_map {
            if symbol.is_empty() {
                return Err(ValidationError::EmptySymbol);
            }
            if marketer.is_empty() {
                return Err(ValidationError::EmptyMarketer(symbol.clone()));
            }
        }

        for (product, symbol) in &self.product_to_symbol_map {
            if product.is_empty() {
                return Err(ValidationError::EmptyProductName);
            }
            if symbol.is_empty() {
                return Err(ValidationError::EmptyProductSymbol(product.clone()));
            }
        }

        if self.default_product_symbol.is_empty() {
            return Err(ValidationError::EmptyDefaultProductSymbol);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(entries: &[(&str, &str)]) -> MappingConfig {
        MappingConfig {
            page_title_map: entries
                .iter()
                .map(|(s, m)| (s.to_string(), m.to_string()))
                .collect(),
            product_to_symbol_map: IndexMap::new(),
            default_product_symbol: default_product_symbol(),
        }
    }

    #[test]
    fn valid_mapping_passes() {
        let config = mapping(&[("🔥", "An"), ("⭐", "Binh")]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_symbol_rejected() {
        let config = mapping(&[("", "An")]);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::EmptySymbol)
        ));
    }

    #[test]
    fn empty_marketer_rejected() {
        let config = mapping(&[("🔥", "")]);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::EmptyMarketer(_))
        ));
    }

    #[test]
    fn empty_product_symbol_rejected() {
        let mut config = mapping(&[("🔥", "An")]);
        config
            .product_to_symbol_map
            .insert("Night Cream".to_string(), String::new());
        assert!(matches!(
            config.validate(),
            Err(ValidationError::EmptyProductSymbol(_))
        ));
    }
}
