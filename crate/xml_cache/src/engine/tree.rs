//! Minimal XML element tree with source positions.
//!
//! Built on `quick_xml::NsReader` so that every element and attribute carries
//! its resolved namespace. Namespace declarations are not kept as attributes:
//! they are regenerated by [`XmlElement::to_xml`].

use std::fmt;

use quick_xml::{
    NsReader, Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    name::{Namespace, QName, ResolveResult},
};

use crate::{XmlCacheError, XmlResult, config::XmlWriterSettings};

/// Namespace of the `xsi:nil` / `xsi:type` attributes.
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// 1-based line and column (in bytes) of a node in its source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct XmlPosition {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for XmlPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Byte offsets of the line starts of a source text.
struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    fn position(&self, offset: u64) -> XmlPosition {
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        let line = self.line_starts.partition_point(|start| *start <= offset);
        let line_start = line
            .checked_sub(1)
            .and_then(|i| self.line_starts.get(i))
            .copied()
            .unwrap_or(0);
        XmlPosition {
            line,
            column: offset.saturating_sub(line_start) + 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct XmlAttribute {
    /// Local name.
    pub name: String,
    pub namespace: Option<String>,
    /// Prefix used in the source, needed to write namespaced attributes back.
    pub prefix: Option<String>,
    pub value: String,
}

impl XmlAttribute {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// The `xsi:nil="true"` marker of a nil element.
    #[must_use]
    pub fn nil() -> Self {
        Self {
            name: "nil".to_owned(),
            namespace: Some(XSI_NAMESPACE.to_owned()),
            prefix: Some("xsi".to_owned()),
            value: "true".to_owned(),
        }
    }
}

impl PartialEq for XmlAttribute {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.namespace == other.namespace && self.value == other.value
    }
}

impl Eq for XmlAttribute {}

/// A processing instruction found inside an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlInstruction {
    pub content: String,
    pub position: XmlPosition,
}

/// An XML element. Equality ignores source positions and instructions.
#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    /// Local name.
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlElement>,
    /// Concatenated character data. Whitespace-only text between child
    /// elements is dropped.
    pub text: String,
    pub position: XmlPosition,
    pub instructions: Vec<XmlInstruction>,
}

impl PartialEq for XmlElement {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.namespace == other.namespace
            && self.attributes == other.attributes
            && self.text == other.text
            && self.children == other.children
    }
}

impl Eq for XmlElement {}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn malformed(message: impl fmt::Display, position: XmlPosition) -> XmlCacheError {
    XmlCacheError::MalformedInput(format!("{message} ({position})"))
}

fn resolved_namespace(resolved: ResolveResult<'_>, position: XmlPosition) -> XmlResult<Option<String>> {
    match resolved {
        ResolveResult::Bound(Namespace(ns)) => Ok(Some(lossy(ns))),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(malformed(
            format!("undeclared namespace prefix '{}'", lossy(&prefix)),
            position,
        )),
    }
}

fn write(w: &mut Writer<Vec<u8>>, event: Event<'_>) -> XmlResult<()> {
    w.write_event(event)
        .map_err(|e| XmlCacheError::Serialization(format!("xml write: {e}")))
}

fn is_namespace_declaration(key: QName<'_>) -> bool {
    let key = key.as_ref();
    key == b"xmlns" || key.starts_with(b"xmlns:")
}

impl XmlElement {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Parse a well-formed XML document into its root element.
    ///
    /// # Errors
    ///
    /// `MalformedInput` when the text is not well-formed: syntax errors,
    /// unclosed or mismatched tags, several roots, text outside the root,
    /// undeclared prefixes.
    pub fn parse(xml: &str) -> XmlResult<Self> {
        let lines = LineIndex::new(xml);
        let mut reader = NsReader::from_str(xml);
        let mut stack: Vec<Self> = Vec::new();
        let mut root: Option<Self> = None;

        loop {
            let position = lines.position(reader.buffer_position() as u64);
            let (resolved, event) = match reader.read_resolved_event() {
                Ok(read) => read,
                Err(e) => {
                    return Err(malformed(e, lines.position(reader.error_position() as u64)));
                }
            };
            match event {
                Event::Start(start) | Event::Empty(start)
                    if root.is_some() && stack.is_empty() =>
                {
                    return Err(malformed(
                        format!(
                            "unexpected second root element <{}>",
                            lossy(start.local_name().as_ref())
                        ),
                        position,
                    ));
                }
                Event::Start(start) => {
                    let namespace = resolved_namespace(resolved, position)?;
                    let element = Self::open(&reader, &start, namespace, position)?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let namespace = resolved_namespace(resolved, position)?;
                    let element = Self::open(&reader, &start, namespace, position)?;
                    Self::close(element, &mut stack, &mut root);
                }
                Event::End(_) => {
                    let Some(element) = stack.pop() else {
                        return Err(malformed("unexpected closing tag", position));
                    };
                    Self::close(element, &mut stack, &mut root);
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| malformed(e, position))?;
                    match stack.last_mut() {
                        Some(current) => current.text.push_str(&text),
                        None if text.trim().is_empty() => {}
                        None => {
                            return Err(malformed("text outside of the root element", position));
                        }
                    }
                }
                Event::CData(data) => match stack.last_mut() {
                    Some(current) => current.text.push_str(&String::from_utf8_lossy(&data)),
                    None => return Err(malformed("CDATA outside of the root element", position)),
                },
                Event::PI(instruction) => {
                    if let Some(current) = stack.last_mut() {
                        current.instructions.push(XmlInstruction {
                            content: lossy(&instruction),
                            position,
                        });
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(malformed(
                format!("unexpected end of document, <{}> is not closed", open.name),
                open.position,
            ));
        }
        root.ok_or_else(|| XmlCacheError::MalformedInput("no root element".to_owned()))
    }

    fn open(
        reader: &NsReader<&[u8]>,
        start: &BytesStart<'_>,
        namespace: Option<String>,
        position: XmlPosition,
    ) -> XmlResult<Self> {
        let mut element = Self {
            name: lossy(start.local_name().as_ref()),
            namespace,
            position,
            ..Self::default()
        };
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| malformed(e, position))?;
            if is_namespace_declaration(attribute.key) {
                continue;
            }
            let (resolved, local_name) = reader.resolve_attribute(attribute.key);
            let namespace = resolved_namespace(resolved, position)?;
            let value = attribute
                .unescape_value()
                .map_err(|e| malformed(e, position))?;
            element.attributes.push(XmlAttribute {
                name: lossy(local_name.as_ref()),
                namespace,
                prefix: attribute.key.prefix().map(|p| lossy(p.as_ref())),
                value: value.into_owned(),
            });
        }
        Ok(element)
    }

    fn close(mut element: Self, stack: &mut [Self], root: &mut Option<Self>) {
        if !element.children.is_empty() && element.text.trim().is_empty() {
            element.text.clear();
        }
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None => *root = Some(element),
        }
    }

    /// Write the element as an XML document.
    ///
    /// Default namespace declarations are emitted wherever an element's
    /// namespace differs from its parent's; prefixed declarations are emitted
    /// for namespaced attributes.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a non-ASCII indent character, `Serialization` if
    /// the writer fails.
    pub fn to_xml(&self, settings: &XmlWriterSettings) -> XmlResult<String> {
        let mut writer = if settings.indent {
            let indent_char = u8::try_from(settings.indent_char)
                .ok()
                .filter(u8::is_ascii)
                .ok_or_else(|| {
                    crate::xml_error!(
                        "the indent character {:?} is not an ASCII character",
                        settings.indent_char
                    )
                })?;
            Writer::new_with_indent(Vec::new(), indent_char, settings.indent_size)
        } else {
            Writer::new(Vec::new())
        };

        if !settings.omit_xml_declaration {
            write(
                &mut writer,
                Event::Decl(BytesDecl::new("1.0", Some(settings.encoding.as_str()), None)),
            )?;
        }
        let mut prefixes = Vec::new();
        self.write_into(&mut writer, None, &mut prefixes)?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| XmlCacheError::Serialization(format!("utf8: {e}")))
    }

    fn write_into(
        &self,
        w: &mut Writer<Vec<u8>>,
        inherited_namespace: Option<&str>,
        prefixes: &mut Vec<(String, String)>,
    ) -> XmlResult<()> {
        let mut start = BytesStart::new(self.name.as_str());
        let namespace = self.namespace.as_deref();
        if namespace != inherited_namespace {
            start.push_attribute(("xmlns", namespace.unwrap_or_default()));
        }

        let scope = prefixes.len();
        for attribute in &self.attributes {
            match (&attribute.prefix, &attribute.namespace) {
                (Some(prefix), Some(ns)) => {
                    let bound = prefixes
                        .iter()
                        .rev()
                        .find(|(p, _)| p == prefix)
                        .map(|(_, n)| n);
                    if bound != Some(ns) {
                        start.push_attribute((format!("xmlns:{prefix}").as_str(), ns.as_str()));
                        prefixes.push((prefix.clone(), ns.clone()));
                    }
                    start.push_attribute((
                        format!("{prefix}:{}", attribute.name).as_str(),
                        attribute.value.as_str(),
                    ));
                }
                _ => start.push_attribute((attribute.name.as_str(), attribute.value.as_str())),
            }
        }

        if self.children.is_empty() && self.text.is_empty() {
            write(w, Event::Empty(start))?;
        } else {
            write(w, Event::Start(start))?;
            if !self.text.is_empty() {
                write(w, Event::Text(BytesText::new(&self.text)))?;
            }
            for child in &self.children {
                child.write_into(w, namespace, prefixes)?;
            }
            write(w, Event::End(BytesEnd::new(self.name.as_str())))?;
        }
        prefixes.truncate(scope);
        Ok(())
    }
}
