//! XML (de)serialization engine: serde through quick-xml, with configurable
//! root element and member overrides, and diagnostics for input the target
//! type does not consume.

use std::{collections::HashSet, fmt, marker::PhantomData};

use serde::{
    Deserialize, Serialize,
    de::{DeserializeOwned, IntoDeserializer, value::UnitDeserializer},
};
use tracing::{debug, trace};

pub use self::{
    diagnostics::{DiagnosticKind, DiagnosticSink, LogDiagnostics, SinkFn, XmlDiagnostic},
    mapping::XmlMapping,
    tree::{XSI_NAMESPACE, XmlAttribute, XmlElement, XmlInstruction, XmlPosition},
};
use self::{
    mapping::{WireMember, child_path},
    shape::Shape,
};
use crate::{
    XmlCacheError, XmlResult,
    config::XmlWriterSettings,
    overrides::{AttributeOverrides, RootOverride},
    xml_ensure,
};

pub(crate) mod diagnostics;
mod mapping;
mod shape;
mod tree;

/// A serializer bound to a target type and a compiled configuration.
///
/// Construction compiles the configuration, which is the costly part; the
/// instance is then immutable and shared between threads.
pub struct XmlSerializer<T> {
    mapping: XmlMapping,
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for XmlSerializer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlSerializer")
            .field("type", &std::any::type_name::<T>())
            .field("mapping", &self.mapping)
            .finish()
    }
}

impl<T> XmlSerializer<T> {
    #[must_use]
    pub fn new(mapping: XmlMapping) -> Self {
        debug!(
            "new XML serializer for {} (root: {:?})",
            std::any::type_name::<T>(),
            mapping.root_name()
        );
        Self {
            mapping,
            _marker: PhantomData,
        }
    }

    /// # Errors
    ///
    /// `InvalidArgument` if the root element name is empty.
    pub fn with_root(root: &RootOverride) -> XmlResult<Self> {
        Ok(Self::new(XmlMapping::compile(Some(root), None)?))
    }

    /// # Errors
    ///
    /// `InvalidArgument` if the overrides do not compile.
    pub fn with_overrides(overrides: &AttributeOverrides) -> XmlResult<Self> {
        Ok(Self::new(XmlMapping::compile(None, Some(overrides))?))
    }

    #[must_use]
    pub const fn mapping(&self) -> &XmlMapping {
        &self.mapping
    }
}

impl<T: Serialize> XmlSerializer<T> {
    /// serde output, before any override is applied.
    fn to_raw_xml(&self, value: &T) -> XmlResult<String> {
        Ok(match self.mapping.root_name() {
            Some(root) => quick_xml::se::to_string_with_root(root, value)?,
            None => quick_xml::se::to_string(value)?,
        })
    }

    /// Convert a value to its wire-form element tree.
    ///
    /// # Errors
    ///
    /// `Serialization` when serde or quick-xml cannot represent the value, or
    /// when two members would be written under the same name.
    pub fn to_element(&self, value: &T) -> XmlResult<XmlElement> {
        let raw = self.to_raw_xml(value)?;
        if raw.trim().is_empty() {
            let root = self.mapping.root_name().ok_or_else(|| {
                XmlCacheError::Serialization(format!(
                    "a value of type {} produced no XML and has no root element name",
                    std::any::type_name::<T>()
                ))
            })?;
            let mut element = XmlElement::new(root);
            element.namespace = self.mapping.root_namespace().map(ToOwned::to_owned);
            if self.mapping.is_nullable() {
                element.attributes.push(XmlAttribute::nil());
            }
            return Ok(element);
        }

        let mut element = XmlElement::parse(&raw)
            .map_err(|e| XmlCacheError::Serialization(format!("unexpected serde output: {e}")))?;
        self.mapping.apply_outbound(&mut element)?;
        Ok(element)
    }

    /// # Errors
    ///
    /// `Serialization` when the value cannot be written, `InvalidArgument`
    /// for unusable writer settings.
    pub fn serialize(&self, value: &T, settings: &XmlWriterSettings) -> XmlResult<String> {
        self.to_element(value)?.to_xml(settings)
    }
}

impl<T: Serialize + DeserializeOwned> XmlSerializer<T> {
    /// Read a value, reporting what the type did not consume to `sink`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty input. `MalformedInput` when the text is
    /// not well-formed, its root element does not match the configuration, or
    /// its content cannot be mapped to `T`.
    pub fn deserialize(&self, xml: &str, sink: &mut dyn DiagnosticSink) -> XmlResult<T> {
        xml_ensure!(!xml.trim().is_empty(), "the XML input is empty");
        let document = XmlElement::parse(xml)?;
        self.check_root(&document, self.mapping.root_name())?;
        if self.mapping.is_nullable() && is_nil(&document) {
            trace!("nil root element <{}>", document.name);
            let nil: UnitDeserializer<serde::de::value::Error> = ().into_deserializer();
            return T::deserialize(nil).map_err(|e| {
                XmlCacheError::MalformedInput(format!("nil root element: {e}"))
            });
        }

        let normalized = self
            .mapping
            .normalize(&document)
            .to_xml(&XmlWriterSettings::compact())?;
        trace!("normalized input: {normalized}");
        let value: T = quick_xml::de::from_str(&normalized)?;

        match self.to_raw_xml(&value).and_then(|raw| XmlElement::parse(&raw)) {
            Ok(observed) => {
                if self.mapping.root_name().is_none() {
                    self.check_root(&document, Some(&observed.name))?;
                }
                let referenced = referenced_ids(&document);
                self.inspect(
                    &document,
                    &Shape::of(&observed),
                    "",
                    self.mapping.root_namespace(),
                    &referenced,
                    sink,
                );
            }
            Err(e) => debug!("no diagnostics, the value cannot be written back: {e}"),
        }
        Ok(value)
    }

    fn check_root(&self, document: &XmlElement, expected: Option<&str>) -> XmlResult<()> {
        let name_matches = expected.is_none_or(|name| name == document.name);
        if name_matches && document.namespace.as_deref() == self.mapping.root_namespace() {
            return Ok(());
        }
        Err(XmlCacheError::MalformedInput(format!(
            "<{} xmlns='{}'> was not expected ({})",
            document.name,
            document.namespace.as_deref().unwrap_or_default(),
            document.position
        )))
    }

    fn inspect(
        &self,
        element: &XmlElement,
        shape: &Shape,
        path: &str,
        namespace: Option<&str>,
        referenced: &HashSet<String>,
        sink: &mut dyn DiagnosticSink,
    ) {
        for attribute in &element.attributes {
            if attribute.namespace.as_deref() == Some(XSI_NAMESPACE) {
                continue;
            }
            if attribute.namespace.is_none() {
                if let WireMember::Member(member) =
                    self.mapping.member(path, &format!("@{}", attribute.name))
                {
                    if shape.attributes.contains(member.trim_start_matches('@')) {
                        continue;
                    }
                }
                match attribute.name.as_str() {
                    "href" => continue,
                    "id" if referenced.contains(&attribute.value) => continue,
                    "id" => {
                        sink.report(XmlDiagnostic {
                            kind: DiagnosticKind::UnreferencedObject,
                            position: element.position,
                            namespace: element.namespace.clone().unwrap_or_default(),
                            name: element.name.clone(),
                            context: attribute.value.clone(),
                        });
                        continue;
                    }
                    _ => {}
                }
            }
            let expected: Vec<String> = shape
                .attributes
                .iter()
                .map(|a| {
                    let member = format!("@{a}");
                    self.mapping
                        .wire_name(path, &member)
                        .trim_start_matches('@')
                        .to_owned()
                })
                .collect();
            sink.report(XmlDiagnostic {
                kind: DiagnosticKind::UnknownAttribute,
                position: element.position,
                namespace: attribute.namespace.clone().unwrap_or_default(),
                name: attribute.name.clone(),
                context: expected.join(", "),
            });
        }

        let text = element.text.trim();
        if !text.is_empty() && !shape.accepts_text() {
            sink.report(XmlDiagnostic {
                kind: DiagnosticKind::UnknownNode,
                position: element.position,
                namespace: String::new(),
                name: "#text".to_owned(),
                context: text.to_owned(),
            });
        }
        for instruction in &element.instructions {
            sink.report(XmlDiagnostic {
                kind: DiagnosticKind::UnknownNode,
                position: instruction.position,
                namespace: String::new(),
                name: "#processing-instruction".to_owned(),
                context: instruction.content.clone(),
            });
        }

        for child in &element.children {
            if let WireMember::Member(member) = self.mapping.member(path, &child.name) {
                let member_path = child_path(path, &member);
                let expected_namespace = self.mapping.namespace_of(&member_path, namespace);
                if child.namespace.as_deref() == expected_namespace {
                    if let Some(child_shape) = shape.children.get(&member) {
                        self.inspect(
                            child,
                            child_shape,
                            &member_path,
                            expected_namespace,
                            referenced,
                            sink,
                        );
                        continue;
                    }
                }
            }
            let expected: Vec<&str> = shape
                .children
                .keys()
                .map(|c| self.mapping.wire_name(path, c))
                .collect();
            sink.report(XmlDiagnostic {
                kind: DiagnosticKind::UnknownElement,
                position: child.position,
                namespace: child.namespace.clone().unwrap_or_default(),
                name: child.name.clone(),
                context: expected.join(", "),
            });
        }
    }
}

/// Whether an element carries `xsi:nil="true"`.
fn is_nil(element: &XmlElement) -> bool {
    element.attributes.iter().any(|a| {
        a.name == "nil"
            && a.namespace.as_deref() == Some(XSI_NAMESPACE)
            && matches!(a.value.trim(), "true" | "1")
    })
}

/// Identifiers targeted by `href="#id"` anywhere in the document.
fn referenced_ids(document: &XmlElement) -> HashSet<String> {
    fn collect(element: &XmlElement, ids: &mut HashSet<String>) {
        ids.extend(
            element
                .attributes
                .iter()
                .filter(|a| a.name == "href" && a.namespace.is_none())
                .filter_map(|a| a.value.strip_prefix('#'))
                .map(ToOwned::to_owned),
        );
        for child in &element.children {
            collect(child, ids);
        }
    }
    let mut ids = HashSet::new();
    collect(document, &mut ids);
    ids
}
