//! Markup field extractor
//!
//! Parses the `<message>` document embedded in a log block with `quick-xml`.
//! Malformed documents and blank input produce `None`; callers count the
//! drop and move on.
//!
//! # Accepted shape
//! ```text
//! <message id="ItemSold" name="Item" version="1">
//!   <fields>
//!     <field name="Description" ftype="string">LEITE UHT M/G 1L</field>
//!     <field name="Price" ftype="int">89</field>
//!   </fields>
//! </message>
//! ```
//! Field text is kept verbatim, including surrounding whitespace.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use scowatch_core::types::FieldType;

use super::{ExtractedMessage, MessageDescriptor, RawField};

const FIELD_TAG: &[u8] = b"field";

/// Field element being read: name, declared type, depth, accumulated text
struct OpenField {
    name: Option<String>,
    declared_type: Option<FieldType>,
    depth: usize,
    text: Option<String>,
}

/// Extracts the root descriptor and raw fields from a message document.
pub struct FieldExtractor;

impl FieldExtractor {
    /// Parses `text` as one markup document.
    ///
    /// Returns `None` for blank text, malformed markup, a missing root
    /// element, or content after the root element closes.
    pub fn extract(text: &str) -> Option<ExtractedMessage> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        match Self::parse(text) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(error = %e, len = text.len(), "malformed message markup");
                None
            }
        }
    }

    fn parse(text: &str) -> Result<Option<ExtractedMessage>, quick_xml::Error> {
        let mut reader = Reader::from_str(text);
        let mut msg = ExtractedMessage::default();
        let mut depth = 0usize;
        let mut root_seen = false;
        let mut root_closed = false;
        let mut open_field: Option<OpenField> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    if root_closed {
                        return Ok(None);
                    }
                    depth += 1;
                    Self::open_element(&e, depth, &mut root_seen, &mut msg, &mut open_field)?;
                }
                Event::Empty(e) => {
                    if root_closed {
                        return Ok(None);
                    }
                    Self::open_element(&e, depth + 1, &mut root_seen, &mut msg, &mut open_field)?;
                    if depth == 0 {
                        root_closed = true;
                    }
                    if let Some(field) = open_field.take_if(|f| f.depth == depth + 1) {
                        Self::close_field(field, &mut msg);
                    }
                }
                Event::End(_) => {
                    if depth == 0 {
                        return Ok(None);
                    }
                    if let Some(field) = open_field.take_if(|f| f.depth == depth) {
                        Self::close_field(field, &mut msg);
                    }
                    depth -= 1;
                    if depth == 0 {
                        root_closed = true;
                    }
                }
                Event::Text(t) => {
                    let value = t.unescape()?;
                    if depth == 0 {
                        if !value.trim().is_empty() {
                            return Ok(None);
                        }
                        continue;
                    }
                    if let Some(field) = open_field.as_mut().filter(|f| f.depth == depth) {
                        field.text.get_or_insert_with(String::new).push_str(&value);
                    }
                }
                Event::CData(c) => {
                    if depth == 0 {
                        return Ok(None);
                    }
                    if let Some(field) = open_field.as_mut().filter(|f| f.depth == depth) {
                        field
                            .text
                            .get_or_insert_with(String::new)
                            .push_str(&String::from_utf8_lossy(&c));
                    }
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctype
                _ => {}
            }
        }

        if !root_seen || depth != 0 {
            return Ok(None);
        }
        Ok(Some(msg))
    }

    fn open_element(
        element: &BytesStart<'_>,
        depth: usize,
        root_seen: &mut bool,
        msg: &mut ExtractedMessage,
        open_field: &mut Option<OpenField>,
    ) -> Result<(), quick_xml::Error> {
        let mut id = None;
        let mut name = None;
        let mut ftype = None;
        for attr in element.attributes() {
            let attr = attr?;
            let value = attr.unescape_value()?.into_owned();
            match attr.key.as_ref() {
                b"id" => id = Some(value),
                b"name" => name = Some(value),
                b"ftype" => ftype = Some(value),
                _ => {}
            }
        }

        if depth == 1 {
            *root_seen = true;
            msg.descriptor = MessageDescriptor { id, name };
        } else if element.name().as_ref() == FIELD_TAG && open_field.is_none() {
            *open_field = Some(OpenField {
                name,
                declared_type: ftype.as_deref().and_then(FieldType::from_attr),
                depth,
                text: None,
            });
        }
        Ok(())
    }

    fn close_field(field: OpenField, msg: &mut ExtractedMessage) {
        // Unnamed fields cannot be addressed by rules
        if let Some(name) = field.name {
            msg.fields.insert(
                name,
                RawField {
                    value: field.text,
                    declared_type: field.declared_type,
                },
            );
        }
    }
}
