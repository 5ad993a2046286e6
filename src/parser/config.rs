use serde::{Deserialize, Serialize};

/// Phrase lists and markers for the heuristic markup parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Phrases that mark a page as unavailable; they win over `in_stock_phrases`
    pub out_of_stock_phrases: Vec<String>,

    /// Phrases that suggest the item can be bought online
    pub in_stock_phrases: Vec<String>,

    /// Boilerplate stripped from the end of page titles, first match wins
    pub title_suffixes: Vec<String>,

    /// `data-button-state` value of the purchase button
    pub purchase_control_state: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            out_of_stock_phrases: vec![
                "sold out".to_string(),
                "coming soon".to_string(),
                "not available online".to_string(),
                "check stores".to_string(),
            ],
            in_stock_phrases: vec!["add to cart".to_string(), "ship it".to_string()],
            title_suffixes: vec![
                " | Best Buy Canada".to_string(),
                " | Best Buy".to_string(),
            ],
            purchase_control_state: "ADD_TO_CART".to_string(),
        }
    }
}
