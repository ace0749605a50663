//! Editor settings

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Indentation unit used when saving markup
    pub indent: String,

    /// Prepend `<?xml version="1.0" encoding="UTF-8"?>` when saving
    pub xml_declaration: bool,

    /// Maximum number of undo entries (0 = unlimited)
    pub undo_limit: usize,

    /// Re-point references when an identifier is renamed
    pub reference_following: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            xml_declaration: true,
            undo_limit: 0,
            reference_following: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EditorConfig = serde_json::from_str(r#"{"undoLimit": 50}"#).unwrap();
        assert_eq!(config.undo_limit, 50);
        assert_eq!(config.indent, "  ");
        assert!(config.reference_following);
    }
}
