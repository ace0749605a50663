//! # Type Registry
//!
//! Explicit catalogue of component types, built once and shared by the
//! loader, the hierarchy mask and the clipboard decoder.
//!
//! Catalogues are plain data and can be loaded from JSON:
//!
//! ```json
//! { "types": [
//!     { "name": "VBox", "layout": "ordered", "defaultProperty": "children",
//!       "accessories": [{ "name": "children" }] }
//! ] }
//! ```

use crate::node::ScenePeer;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How a container arranges its sub-components
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerLayout {
    /// No children
    #[default]
    Leaf,
    /// Children kept in one ordered collection (the default property)
    Ordered,
    /// Named single-valued accessories (`top`, `center`, `graphic`, ...)
    Slots,
    /// Ordered children positioned by row/column coordinates
    Grid,
}

/// A property able to hold child nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessoryDescriptor {
    pub name: String,

    /// Holds at most one child
    #[serde(default)]
    pub single: bool,

    /// Accepted child type names; empty accepts anything
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accepts: Vec<String>,
}

impl AccessoryDescriptor {
    pub fn many(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            single: false,
            accepts: Vec::new(),
        }
    }

    pub fn single(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            single: true,
            accepts: Vec::new(),
        }
    }

    pub fn accepting(mut self, types: &[&str]) -> Self {
        self.accepts = types.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Whether a child of the given type may be placed here (`None` for non-instances)
    pub fn accepts_type(&self, type_name: Option<&str>) -> bool {
        if self.accepts.is_empty() {
            return true;
        }
        match type_name {
            Some(name) => {
                let local = local_name(name);
                self.accepts.iter().any(|accepted| accepted == local)
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDescriptor {
    pub name: String,

    #[serde(default)]
    pub layout: ContainerLayout,

    /// Collection receiving children written directly inside the element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_property: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessories: Vec<AccessoryDescriptor>,
}

impl TypeDescriptor {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layout: ContainerLayout::Leaf,
            default_property: None,
            accessories: Vec::new(),
        }
    }

    /// Container keeping its children in an ordered `default` collection
    pub fn ordered(name: impl Into<String>, default: &str) -> Self {
        Self {
            name: name.into(),
            layout: ContainerLayout::Ordered,
            default_property: Some(default.to_string()),
            accessories: vec![AccessoryDescriptor::many(default)],
        }
    }

    pub fn grid(name: impl Into<String>) -> Self {
        Self {
            layout: ContainerLayout::Grid,
            ..Self::ordered(name, "children")
        }
    }

    /// Container with named single-valued slots
    pub fn slots(name: impl Into<String>, slots: &[&str], default: Option<&str>) -> Self {
        Self {
            name: name.into(),
            layout: ContainerLayout::Slots,
            default_property: default.map(str::to_string),
            accessories: slots.iter().map(|s| AccessoryDescriptor::single(*s)).collect(),
        }
    }

    pub fn with_accessory(mut self, accessory: AccessoryDescriptor) -> Self {
        self.accessories.retain(|a| a.name != accessory.name);
        self.accessories.push(accessory);
        self
    }

    pub fn accessory(&self, name: &str) -> Option<&AccessoryDescriptor> {
        self.accessories.iter().find(|a| a.name == name)
    }

    /// The accessory behind the default property
    pub fn main_accessory(&self) -> Option<&AccessoryDescriptor> {
        self.default_property
            .as_deref()
            .and_then(|name| self.accessory(name))
    }

    pub fn is_single(&self, property: &str) -> bool {
        self.accessory(property).is_some_and(|a| a.single)
    }

    /// Create the live peer of a new instance
    pub fn instantiate(&self, serial: u64) -> ScenePeer {
        ScenePeer {
            type_name: self.name.clone(),
            serial,
        }
    }
}

/// Mapping from type names to descriptors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeRegistry {
    #[serde(with = "types_as_list")]
    types: IndexMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    /// Empty registry: every type is unresolved
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in catalogue of layout containers and controls
    pub fn standard() -> Self {
        let mut registry = Self::new();

        for name in ["Pane", "VBox", "HBox", "StackPane", "FlowPane", "AnchorPane", "Group"] {
            registry.register(TypeDescriptor::ordered(name, "children"));
        }
        registry.register(TypeDescriptor::grid("GridPane"));
        registry.register(TypeDescriptor::ordered("SplitPane", "items"));
        registry.register(
            TypeDescriptor::ordered("TabPane", "tabs")
                .with_accessory(AccessoryDescriptor::many("tabs").accepting(&["Tab"])),
        );
        registry.register(TypeDescriptor::slots(
            "BorderPane",
            &["top", "left", "center", "right", "bottom"],
            None,
        ));
        registry.register(TypeDescriptor::slots("ScrollPane", &["content"], Some("content")));
        registry.register(TypeDescriptor::slots("Tab", &["content", "graphic"], Some("content")));
        registry.register(TypeDescriptor::slots(
            "TitledPane",
            &["content", "graphic"],
            Some("content"),
        ));

        for name in ["Button", "Label", "ToggleButton", "CheckBox", "RadioButton", "Hyperlink"] {
            registry.register(TypeDescriptor::slots(name, &["graphic"], None));
        }
        for name in ["TextField", "TextArea", "ImageView", "Separator", "Region", "Slider"] {
            registry.register(TypeDescriptor::leaf(name));
        }

        registry
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Add or replace a descriptor
    pub fn register(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.name.clone(), descriptor);
    }

    /// Add every descriptor of `other`, replacing same-named ones
    pub fn extend(&mut self, other: TypeRegistry) {
        for (_, descriptor) in other.types {
            self.register(descriptor);
        }
    }

    /// Resolve a tag (`VBox` or qualified `layout.VBox`) to its descriptor
    pub fn resolve(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(local_name(type_name))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.resolve(type_name).is_some()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }
}

/// Last dot-separated segment of a qualified type name
pub fn local_name(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}

mod types_as_list {
    use super::TypeDescriptor;
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        types: &IndexMap<String, TypeDescriptor>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let list: Vec<&TypeDescriptor> = types.values().collect();
        list.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<IndexMap<String, TypeDescriptor>, D::Error> {
        let list = Vec::<TypeDescriptor>::deserialize(deserializer)?;
        Ok(list.into_iter().map(|d| (d.name.clone(), d)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_resolves_qualified_names() {
        let registry = TypeRegistry::standard();
        let vbox = registry.resolve("layout.VBox").unwrap();
        assert_eq!(vbox.layout, ContainerLayout::Ordered);
        assert_eq!(vbox.default_property.as_deref(), Some("children"));
        assert!(registry.resolve("Spaceship").is_none());
    }

    #[test]
    fn test_slots_are_single_valued() {
        let registry = TypeRegistry::standard();
        let border = registry.resolve("BorderPane").unwrap();
        assert!(border.is_single("center"));
        assert!(border.main_accessory().is_none());

        let scroll = registry.resolve("ScrollPane").unwrap();
        assert_eq!(scroll.main_accessory().map(|a| a.single), Some(true));
    }

    #[test]
    fn test_accepts_restricts_child_types() {
        let registry = TypeRegistry::standard();
        let tabs = registry.resolve("TabPane").unwrap().main_accessory().unwrap();
        assert!(tabs.accepts_type(Some("Tab")));
        assert!(tabs.accepts_type(Some("controls.Tab")));
        assert!(!tabs.accepts_type(Some("Button")));
        assert!(!tabs.accepts_type(None));
    }

    #[test]
    fn test_registry_json_roundtrip() {
        let json = r#"{
            "types": [
                { "name": "Card", "layout": "ordered", "defaultProperty": "body",
                  "accessories": [{ "name": "body" }, { "name": "header", "single": true }] },
                { "name": "Badge" }
            ]
        }"#;

        let registry = TypeRegistry::from_json(json).unwrap();
        assert_eq!(registry.len(), 2);
        let card = registry.resolve("Card").unwrap();
        assert!(card.is_single("header"));
        assert_eq!(registry.resolve("Badge").unwrap().layout, ContainerLayout::Leaf);

        let reparsed = TypeRegistry::from_json(&registry.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, registry);
    }

    #[test]
    fn test_extend_replaces_descriptors() {
        let mut registry = TypeRegistry::standard();
        let before = registry.len();
        registry.extend({
            let mut custom = TypeRegistry::new();
            custom.register(TypeDescriptor::leaf("VBox"));
            custom.register(TypeDescriptor::leaf("Gauge"));
            custom
        });
        assert_eq!(registry.len(), before + 1);
        assert_eq!(registry.resolve("VBox").unwrap().layout, ContainerLayout::Leaf);
    }
}
