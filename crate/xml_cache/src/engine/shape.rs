//! Members a type actually produces, observed from one of its values.

use std::collections::{BTreeMap, BTreeSet};

use crate::engine::tree::XmlElement;

/// Attribute and element member names found in a serde-produced tree,
/// merged over repeated elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Shape {
    pub(crate) attributes: BTreeSet<String>,
    pub(crate) children: BTreeMap<String, Shape>,
    pub(crate) has_text: bool,
}

impl Shape {
    pub(crate) fn of(element: &XmlElement) -> Self {
        let mut shape = Self::default();
        shape.merge(element);
        shape
    }

    fn merge(&mut self, element: &XmlElement) {
        self.attributes
            .extend(element.attributes.iter().map(|a| a.name.clone()));
        self.has_text |= !element.text.trim().is_empty();
        for child in &element.children {
            self.children
                .entry(child.name.clone())
                .or_default()
                .merge(child);
        }
    }

    /// Whether character data is accepted at this level.
    ///
    /// A leaf that was written empty may still hold text in another value.
    pub(crate) fn accepts_text(&self) -> bool {
        self.has_text || self.children.is_empty()
    }
}
