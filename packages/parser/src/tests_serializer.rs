/// Tests verifying the serializer round-trips parsed markup
use crate::ast::{Document, Element, Instruction};
use crate::*;

/// Drop spans so structures parsed from differently formatted text compare equal
fn strip_spans(doc: &Document) -> Document {
    fn strip(element: &Element) -> Element {
        let mut out = Element::new(element.name.clone());
        for attribute in &element.attributes {
            out = out.with_attribute(attribute.name.clone(), attribute.value.clone());
        }
        for child in &element.children {
            out = out.with_child(strip(child));
        }
        out
    }

    Document {
        instructions: doc
            .instructions
            .iter()
            .map(|pi| Instruction::new(pi.target.clone(), pi.data.clone()))
            .collect(),
        root: doc.root.as_ref().map(strip),
    }
}

#[test]
fn test_roundtrip_preserves_structure() {
    let source = r#"<?xml version="1.0" encoding="UTF-8"?>
<?import layout.*?>
<BorderPane x:id="frame">
    <top><Label text="Title" styleClass="header"/></top>
    <center>
        <GridPane>
            <children>
                <Button text="A" GridPane.columnIndex="0"/>
                <Button text="B" GridPane.columnIndex="1"/>
            </children>
        </GridPane>
    </center>
</BorderPane>"#;

    let doc = parse(source).unwrap();
    let serialized = serialize(&doc);
    let reparsed = parse(&serialized).unwrap();

    assert_eq!(strip_spans(&doc), strip_spans(&reparsed));
}

#[test]
fn test_serialized_output_is_stable() {
    let source = r#"<?import layout.VBox?><VBox spacing="4"><children><Label text="x"/></children></VBox>"#;
    let first = serialize(&parse(source).unwrap());
    let second = serialize(&parse(&first).unwrap());

    assert_eq!(first, second);
    assert_eq!(
        first,
        "<?import layout.VBox?>\n\n<VBox spacing=\"4\">\n  <children>\n    <Label text=\"x\"/>\n  </children>\n</VBox>\n"
    );
}

#[test]
fn test_roundtrip_escapes_attribute_values() {
    let element = Element::new("Label").with_attribute("text", r#"Say "hi" & <wave>"#);
    let doc = Document {
        instructions: vec![],
        root: Some(element),
    };

    let reparsed = parse(&serialize(&doc)).unwrap();
    assert_eq!(
        reparsed.root.unwrap().attribute("text"),
        Some(r#"Say "hi" & <wave>"#)
    );
}

#[test]
fn test_custom_indent() {
    let doc = parse("<Pane><children><Pane/></children></Pane>").unwrap();
    let output = Serializer::with_indent("\t").serialize(&doc);
    assert!(output.contains("\n\t<children>\n\t\t<Pane/>\n"));
}

#[test]
fn test_empty_document_serializes_instructions_only() {
    let doc = parse("<?import layout.Pane?>").unwrap();
    assert_eq!(serialize(&doc), "<?import layout.Pane?>\n");
}
