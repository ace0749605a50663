use crate::ast::*;
use crate::tokenizer::escape;

/// Serializer converts a markup AST back to source text
///
/// Output is normalized: one element per line, attributes kept on the
/// element line in their original order, childless elements self-closed.
/// Comments and original whitespace are not preserved.
pub struct Serializer {
    indent_level: usize,
    indent_string: String,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            indent_level: 0,
            indent_string: "  ".to_string(), // 2 spaces
        }
    }

    pub fn with_indent(indent: &str) -> Self {
        Self {
            indent_level: 0,
            indent_string: indent.to_string(),
        }
    }

    /// Serialize a Document to source text
    pub fn serialize(&mut self, doc: &Document) -> String {
        let mut output = String::new();

        for instruction in &doc.instructions {
            self.serialize_instruction(instruction, &mut output);
            output.push('\n');
        }

        if let Some(root) = &doc.root {
            if !doc.instructions.is_empty() {
                output.push('\n');
            }
            self.serialize_element(root, &mut output);
        }

        output
    }

    fn serialize_instruction(&self, instruction: &Instruction, output: &mut String) {
        output.push_str("<?");
        output.push_str(&instruction.target);
        if !instruction.data.is_empty() {
            output.push(' ');
            output.push_str(&instruction.data);
        }
        output.push_str("?>");
    }

    fn serialize_element(&mut self, element: &Element, output: &mut String) {
        self.write_indent(output);
        output.push('<');
        output.push_str(&element.name);

        for attribute in &element.attributes {
            output.push(' ');
            output.push_str(&attribute.name);
            output.push_str("=\"");
            output.push_str(&escape(&attribute.value));
            output.push('"');
        }

        if element.children.is_empty() {
            output.push_str("/>\n");
            return;
        }

        output.push_str(">\n");
        self.indent_level += 1;
        for child in &element.children {
            self.serialize_element(child, output);
        }
        self.indent_level -= 1;

        self.write_indent(output);
        output.push_str("</");
        output.push_str(&element.name);
        output.push_str(">\n");
    }

    fn write_indent(&self, output: &mut String) {
        for _ in 0..self.indent_level {
            output.push_str(&self.indent_string);
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize a document with the default two-space indent
pub fn serialize(doc: &Document) -> String {
    Serializer::new().serialize(doc)
}
