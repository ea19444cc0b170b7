//! XML rendering of assembled documents.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::catalog::{ElementDef, GroupDef};
use crate::error::{NestqlError, Result};
use crate::types::{Row, Value};

use super::{DocumentNode, DocumentVisitor};

/// Renders documents as indented XML.
///
/// Each node becomes an element named after its group's short name, with
/// one child element per non-null value followed by its nested groups.
pub struct XmlWriter {
    writer: Writer<Vec<u8>>,
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlWriter {
    /// Creates a writer with two-space indentation.
    #[must_use]
    pub fn new() -> Self {
        XmlWriter {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    /// Renders `node` inside a `root_tag` element, with an XML declaration.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if writing fails.
    pub fn render(node: &DocumentNode, root_tag: &str) -> Result<String> {
        let mut xml = XmlWriter::new();
        xml.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        xml.write(Event::Start(BytesStart::new(root_tag)))?;
        node.walk(&mut xml)?;
        xml.write(Event::End(BytesEnd::new(root_tag)))?;
        xml.finish()
    }

    /// Consumes the writer and returns the XML text.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if the output is not valid UTF-8.
    pub fn finish(self) -> Result<String> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|e| NestqlError::SerializationError(e.to_string()))
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| NestqlError::SerializationError(e.to_string()))
    }
}

impl DocumentVisitor for XmlWriter {
    fn enter_node(&mut self, group: &GroupDef, _row: &Row) -> Result<()> {
        self.write(Event::Start(BytesStart::new(group.short_name())))
    }

    fn value(&mut self, element: &ElementDef, value: &Value) -> Result<()> {
        if value.is_null() {
            return Ok(());
        }
        let text = value.to_string();
        self.write(Event::Start(BytesStart::new(element.name.as_str())))?;
        self.write(Event::Text(BytesText::new(&text)))?;
        self.write(Event::End(BytesEnd::new(element.name.as_str())))
    }

    fn leave_node(&mut self, group: &GroupDef) -> Result<()> {
        self.write(Event::End(BytesEnd::new(group.short_name())))
    }
}
