use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use trellis_editor::{EditorConfig, TypeRegistry};

pub const DEFAULT_CONFIG_NAME: &str = "trellis.config.json";

/// Trellis configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Source directory containing markup files
    #[serde(default = "default_src_dir")]
    pub src_dir: String,

    /// Markup file extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    #[serde(default = "default_indent")]
    pub indent: String,

    #[serde(default = "default_xml_declaration")]
    pub xml_declaration: bool,

    #[serde(default)]
    pub undo_limit: usize,

    /// JSON type catalogue merged over the standard types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
}

fn default_src_dir() -> String {
    "src".to_string()
}

fn default_extension() -> String {
    "tml".to_string()
}

fn default_indent() -> String {
    "  ".to_string()
}

fn default_xml_declaration() -> bool {
    true
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get absolute path to source directory
    pub fn get_src_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.src_dir)
    }

    pub fn editor_config(&self) -> EditorConfig {
        EditorConfig {
            indent: self.indent.clone(),
            xml_declaration: self.xml_declaration,
            undo_limit: self.undo_limit,
            ..EditorConfig::default()
        }
    }

    /// Standard types, extended by the configured catalogue if any
    pub fn type_registry(&self, cwd: &str) -> anyhow::Result<TypeRegistry> {
        let mut registry = TypeRegistry::standard();
        if let Some(path) = &self.registry {
            let content = std::fs::read_to_string(PathBuf::from(cwd).join(path))?;
            registry.extend(TypeRegistry::from_json(&content)?);
        }
        Ok(registry)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src_dir: default_src_dir(),
            extension: default_extension(),
            indent: default_indent(),
            xml_declaration: default_xml_declaration(),
            undo_limit: 0,
            registry: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "srcDir": "layouts",
            "extension": "fxml",
            "indent": "    ",
            "xmlDeclaration": false,
            "undoLimit": 100,
            "registry": "types.json"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.src_dir, "layouts");
        assert_eq!(config.extension, "fxml");
        assert_eq!(config.registry.as_deref(), Some("types.json"));

        let editor = config.editor_config();
        assert_eq!(editor.indent, "    ");
        assert!(!editor.xml_declaration);
        assert_eq!(editor.undo_limit, 100);
        assert!(editor.reference_following);
    }

    #[test]
    fn test_default_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.src_dir, "src");
        assert_eq!(config.extension, "tml");
        assert!(config.xml_declaration);
        assert!(config.registry.is_none());
        assert!(config.type_registry(".").unwrap().contains("VBox"));
    }
}
