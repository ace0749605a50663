//! # Loader
//!
//! Builds a [`Document`] from markup and writes it back.
//!
//! The raw element tree produced by the parser is interpreted here:
//!
//! - upper-case tags become instances, their attributes text properties
//! - lower-case children of an instance are collection property elements
//! - instance children written directly go to the type's default property
//! - `x:include`, `x:reference`, `x:copy` become intrinsics
//! - `x:define` becomes a virtual node holding definitions

use crate::config::EditorConfig;
use crate::document::Document;
use crate::errors::EditorError;
use crate::node::{IntrinsicKind, NodeId, NodeKind, Placement, PropertyValue};
use crate::registry::TypeRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use trellis_parser::ast::{self, Element, Instruction};
use trellis_parser::Serializer;

const ID_ATTRIBUTE: &str = "x:id";
const SOURCE_ATTRIBUTE: &str = "source";
const DEFINE_TAG: &str = "x:define";
/// Holds `x:define` blocks of types without a default property
const DEFINITIONS_PROPERTY: &str = "children";

/// Parse `source` and build a document resolving types against `registry`
#[instrument(skip(source, registry), fields(len = source.len()))]
pub fn load(
    source: &str,
    location: Option<PathBuf>,
    registry: Arc<TypeRegistry>,
) -> Result<Document, EditorError> {
    let parsed = trellis_parser::parse(source)?;
    let mut doc = Document::new(registry);
    doc.set_location(location);
    doc.set_instructions(parsed.instructions);

    if let Some(element) = &parsed.root {
        let root = build_object(&mut doc, element)?;
        doc.update(|d| d.attach(root, &Placement::Root))?;
    }

    doc.mark_saved();
    info!(
        location = ?doc.location(),
        nodes = doc.node_count(),
        revision = doc.revision(),
        "Loaded document"
    );
    Ok(doc)
}

pub fn load_file(path: &Path, registry: Arc<TypeRegistry>) -> Result<Document, EditorError> {
    let source = std::fs::read_to_string(path)?;
    load(&source, Some(path.to_path_buf()), registry)
}

fn build_object(doc: &mut Document, element: &Element) -> Result<NodeId, EditorError> {
    if element.name == DEFINE_TAG {
        if let Some(attribute) = element.attributes.first() {
            return Err(EditorError::load(
                attribute.span,
                format!("unexpected attribute '{}' on {}", attribute.name, DEFINE_TAG),
            ));
        }
        let host = doc.create_virtual();
        for child in &element.children {
            let definition = build_object(doc, child)?;
            doc.attach(definition, &Placement::Definition { host, index: None })
                .map_err(|e| EditorError::load(child.span, e.to_string()))?;
        }
        return Ok(host);
    }

    if let Some(kind) = IntrinsicKind::from_tag(&element.name) {
        return build_intrinsic(doc, kind, element);
    }

    if element.name.starts_with("x:") {
        return Err(EditorError::load(
            element.span,
            format!("unknown directive <{}>", element.name),
        ));
    }

    if !element.is_instance() {
        return Err(EditorError::load(
            element.span,
            format!("property element <{}> outside of an instance", element.name),
        ));
    }

    build_instance(doc, element)
}

fn build_intrinsic(
    doc: &mut Document,
    kind: IntrinsicKind,
    element: &Element,
) -> Result<NodeId, EditorError> {
    let source = element.attribute(SOURCE_ATTRIBUTE).ok_or_else(|| {
        EditorError::load(element.span, format!("<{}> requires a source", kind))
    })?;
    if let Some(child) = element.children.first() {
        return Err(EditorError::load(
            child.span,
            format!("<{}> cannot have children", kind),
        ));
    }

    let node = doc.create_intrinsic(kind, source);
    for attribute in &element.attributes {
        match attribute.name.as_str() {
            SOURCE_ATTRIBUTE => {}
            ID_ATTRIBUTE => {
                doc.set_identifier(node, Some(attribute.value.clone()))?;
            }
            other => {
                return Err(EditorError::load(
                    attribute.span,
                    format!("unexpected attribute '{}' on <{}>", other, kind),
                ))
            }
        }
    }
    Ok(node)
}

fn build_instance(doc: &mut Document, element: &Element) -> Result<NodeId, EditorError> {
    let instance = doc.create_instance(&element.name);
    if doc.instance(instance).is_some_and(|i| i.peer.is_none()) {
        debug!(type_name = %element.name, "Unresolved type");
    }

    for attribute in &element.attributes {
        if attribute.name == ID_ATTRIBUTE {
            doc.set_identifier(instance, Some(attribute.value.clone()))?;
        } else {
            doc.set_text(instance, &attribute.name, Some(&attribute.value))
                .map_err(|e| EditorError::load(attribute.span, e.to_string()))?;
        }
    }

    for child in &element.children {
        let is_property_element = !child.is_instance() && !child.name.starts_with("x:");
        if is_property_element {
            if let Some(attribute) = child.attributes.first() {
                return Err(EditorError::load(
                    attribute.span,
                    format!("property element <{}> cannot have attributes", child.name),
                ));
            }
            doc.ensure_collection(instance, &child.name)
                .map_err(|e| EditorError::load(child.span, e.to_string()))?;
            for item in &child.children {
                let node = build_object(doc, item)?;
                doc.attach(node, &Placement::property(instance, child.name.as_str(), None))
                    .map_err(|e| EditorError::load(item.span, e.to_string()))?;
            }
        } else {
            let property = match doc.default_property(instance) {
                Some(property) => property,
                None if child.name == DEFINE_TAG => DEFINITIONS_PROPERTY.to_string(),
                None => {
                    return Err(EditorError::load(
                        child.span,
                        format!("<{}> does not accept children", element.name),
                    ))
                }
            };
            let node = build_object(doc, child)?;
            doc.attach(node, &Placement::property(instance, property, None))
                .map_err(|e| EditorError::load(child.span, e.to_string()))?;
        }
    }

    Ok(instance)
}

/// Save with default settings
pub fn save(doc: &Document) -> String {
    save_with(doc, &EditorConfig::default())
}

pub fn save_with(doc: &Document, config: &EditorConfig) -> String {
    let mut markup = to_markup(doc);
    let declared = markup.instructions.iter().any(|pi| pi.target == "xml");
    if config.xml_declaration && !declared {
        markup.instructions.insert(
            0,
            Instruction::new("xml", r#"version="1.0" encoding="UTF-8""#),
        );
    }
    Serializer::with_indent(&config.indent).serialize(&markup)
}

/// Write the document back to its location and mark it saved
pub fn save_file(doc: &mut Document, config: &EditorConfig) -> Result<(), EditorError> {
    let location = doc
        .location()
        .map(Path::to_path_buf)
        .ok_or(EditorError::NotFileBacked)?;
    std::fs::write(&location, save_with(doc, config))?;
    doc.mark_saved();
    info!(location = %location.display(), "Saved document");
    Ok(())
}

/// Element tree of the whole document
pub fn to_markup(doc: &Document) -> ast::Document {
    ast::Document {
        instructions: doc.instructions().to_vec(),
        root: doc.root().map(|root| element_of(doc, root)),
    }
}

/// Element of one object node and its subtree
pub fn element_of(doc: &Document, id: NodeId) -> Element {
    match doc.node(id).kind() {
        NodeKind::Instance(instance) => {
            let mut element = Element::new(instance.type_name.as_str());
            if let Some(identifier) = &instance.id {
                element = element.with_attribute(ID_ATTRIBUTE, identifier.as_str());
            }

            let default = doc.default_property(id);
            let mut children = Vec::new();
            for (name, property) in &instance.properties {
                match doc.node(*property).as_property().map(|p| &p.value) {
                    Some(PropertyValue::Text(value)) => {
                        element = element.with_attribute(name.as_str(), value.as_str());
                    }
                    Some(PropertyValue::Collection { items: ids, .. }) => {
                        let items: Vec<Element> =
                            ids.iter().map(|item| element_of(doc, *item)).collect();
                        let implicit = match default.as_deref() {
                            Some(default) => default == name.as_str(),
                            None => {
                                name.as_str() == DEFINITIONS_PROPERTY
                                    && ids.iter().all(|item| doc.node(*item).is_virtual())
                            }
                        };
                        if implicit && !items.is_empty() {
                            children.extend(items);
                        } else {
                            let mut holder = Element::new(name.as_str());
                            holder.children.extend(items);
                            children.push(holder);
                        }
                    }
                    None => {}
                }
            }
            element.children = children;
            element
        }
        NodeKind::Intrinsic(intrinsic) => {
            let mut element = Element::new(intrinsic.kind.tag())
                .with_attribute(SOURCE_ATTRIBUTE, intrinsic.source.as_str());
            if let Some(identifier) = &intrinsic.id {
                element = element.with_attribute(ID_ATTRIBUTE, identifier.as_str());
            }
            element
        }
        NodeKind::Virtual(virt) => {
            let mut element = Element::new(DEFINE_TAG);
            element.children = virt.children.iter().map(|c| element_of(doc, *c)).collect();
            element
        }
        NodeKind::Property(property) => Element::new(property.name.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<TypeRegistry> {
        Arc::new(TypeRegistry::standard())
    }

    const FORM: &str = r#"<?import layout.VBox?>
<VBox x:id="root" spacing="8">
  <Label x:id="title" text="Name"/>
  <TextField x:id="name"/>
  <x:reference source="title"/>
  <x:define>
    <Label x:id="spare" text="hidden"/>
  </x:define>
</VBox>
"#;

    #[test]
    fn test_load_builds_tree() {
        let doc = load(FORM, None, registry()).unwrap();
        let root = doc.root().unwrap();

        assert_eq!(doc.type_name(root), Some("VBox"));
        assert_eq!(doc.identifier(root), Some("root"));
        assert_eq!(doc.text_property(root, "spacing"), Some("8"));
        assert_eq!(doc.collection(root, "children").len(), 4);
        assert_eq!(doc.imports().collect::<Vec<_>>(), vec!["layout.VBox"]);
        assert!(!doc.is_dirty());

        let reference = doc.collection(root, "children")[2];
        let title = doc.lookup("title").unwrap();
        assert_eq!(doc.node(reference).as_intrinsic().unwrap().resolved, Some(title));
        assert!(doc.lookup("spare").is_some());
    }

    #[test]
    fn test_property_elements_and_slots() {
        let source = r#"<BorderPane>
  <top><Label text="Header"/></top>
  <center><VBox><children/></VBox></center>
</BorderPane>"#;
        let doc = load(source, None, registry()).unwrap();
        let root = doc.root().unwrap();
        let top = doc.collection(root, "top");
        assert_eq!(top.len(), 1);
        assert_eq!(doc.parent(top[0]).unwrap().index, None);

        let vbox = doc.collection(root, "center")[0];
        assert!(doc.property(vbox, "children").is_some());
        assert!(doc.collection(vbox, "children").is_empty());
    }

    #[test]
    fn test_save_writes_default_property_implicitly() {
        let doc = load(FORM, None, registry()).unwrap();
        let text = save(&doc);
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<?import layout.VBox?>"));
        assert!(!text.contains("<children>"));
        assert!(text.contains("<x:reference source=\"title\"/>"));
    }

    #[test]
    fn test_roundtrip_is_structurally_equal() {
        let source = r#"<BorderPane x:id="main">
  <center>
    <GridPane>
      <Button text="A &amp; B" GridPane.columnIndex="0"/>
      <Spaceship fuel="full"/>
    </GridPane>
  </center>
  <bottom/>
</BorderPane>"#;
        let first = load(source, None, registry()).unwrap();
        let second = load(&save(&first), None, registry()).unwrap();
        assert_eq!(first.snapshot(), second.snapshot());
    }

    #[test]
    fn test_define_inside_type_without_default_property() {
        let source = r#"<VBox>
  <Label x:id="title" text="Name">
    <x:define>
      <Label x:id="spare"/>
    </x:define>
  </Label>
</VBox>"#;
        let doc = load(source, None, registry()).unwrap();
        let title = doc.lookup("title").unwrap();
        let spare = doc.lookup("spare").unwrap();
        assert_eq!(doc.parent_object(spare), doc.collection(title, "children").first().copied());
        assert!(doc.node(doc.collection(title, "children")[0]).is_virtual());

        let text = save(&doc);
        assert!(!text.contains("<children>"));
        let reloaded = load(&text, None, registry()).unwrap();
        assert_eq!(doc.snapshot(), reloaded.snapshot());
    }

    #[test]
    fn test_unresolved_type_is_peerless() {
        let doc = load("<Spaceship/>", None, registry()).unwrap();
        let root = doc.root().unwrap();
        assert!(doc.instance(root).unwrap().peer.is_none());
    }

    #[test]
    fn test_load_errors() {
        let cases = [
            "<x:reference/>",
            "<VBox><children spacing=\"1\"/></VBox>",
            "<children/>",
            "<Label><Button/></Label>",
            "<BorderPane><top><Label/><Label/></top></BorderPane>",
            "<x:unknown/>",
        ];
        for source in cases {
            let result = load(source, None, registry());
            assert!(
                matches!(result, Err(EditorError::Load { .. })),
                "expected load error for {source}"
            );
        }
    }

    #[test]
    fn test_malformed_markup_is_parse_error() {
        let result = load("<VBox>", None, registry());
        assert!(matches!(result, Err(EditorError::Parse(_))));
    }

    #[test]
    fn test_empty_source_gives_empty_document() {
        let doc = load("<?import layout.VBox?>", None, registry()).unwrap();
        assert!(doc.root().is_none());
        assert!(doc.snapshot().is_none());
    }
}
