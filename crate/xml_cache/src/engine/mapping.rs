//! Compiled form of a serializer configuration.
//!
//! Member paths use serde member names; `XmlMapping` translates between those
//! and the names and namespaces written on the wire.

use std::collections::HashMap;

use tracing::trace;

use crate::{
    XmlCacheError, XmlResult,
    engine::tree::{XmlAttribute, XmlElement},
    overrides::{AttributeOverrides, MemberOverride, RootOverride},
    xml_bail, xml_ensure,
};

/// Join a member path and a member name.
pub(crate) fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        format!("{parent}/{name}")
    }
}

fn attribute_member(name: &str) -> String {
    format!("@{name}")
}

/// Record that `member` is written as `wire` under `parent`; repeated
/// elements of one member are fine, two members sharing a wire name are not.
fn ensure_unique_wire_name(
    written: &mut HashMap<String, String>,
    wire: &str,
    member: &str,
    parent: &str,
) -> XmlResult<()> {
    match written.get(wire) {
        Some(other) if other != member => Err(XmlCacheError::Serialization(format!(
            "members '{other}' and '{member}' under '{parent}' are both written as '{wire}'"
        ))),
        Some(_) => Ok(()),
        None => {
            written.insert(wire.to_owned(), member.to_owned());
            Ok(())
        }
    }
}

#[derive(Debug, Clone)]
struct MemberRule {
    name: Option<String>,
    namespace: Option<String>,
    ignore: bool,
}

impl From<&MemberOverride> for MemberRule {
    fn from(member: &MemberOverride) -> Self {
        Self {
            name: member.name.clone(),
            namespace: member.namespace.clone(),
            ignore: member.ignore,
        }
    }
}

/// What a name read on the wire designates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WireMember {
    /// The serde member name.
    Member(String),
    /// Ignored, or renamed away by an override.
    Unmapped,
}

#[derive(Debug, Clone, Default)]
pub struct XmlMapping {
    root: Option<RootOverride>,
    /// member path -> rule
    rules: HashMap<String, MemberRule>,
    /// (parent member path, wire name) -> member name; attributes are `@`-prefixed
    inbound: HashMap<(String, String), String>,
}

impl XmlMapping {
    /// Validate a configuration and build its lookup tables.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when a name is empty, a path is malformed, a namespace
    /// targets an attribute, or two members end up with the same wire name.
    pub fn compile(
        root: Option<&RootOverride>,
        overrides: Option<&AttributeOverrides>,
    ) -> XmlResult<Self> {
        let root = overrides.and_then(|o| o.root.as_ref()).or(root).cloned();
        if let Some(root) = &root {
            xml_ensure!(
                !root.element_name.trim().is_empty(),
                "the root element name cannot be empty"
            );
        }

        let mut mapping = Self {
            root,
            ..Self::default()
        };
        let Some(overrides) = overrides else {
            return Ok(mapping);
        };

        for (path, member) in &overrides.members {
            let segments: Vec<&str> = path.split('/').collect();
            xml_ensure!(
                segments.iter().all(|s| !s.is_empty() && *s != "@"),
                "invalid member path '{path}'"
            );
            let (last, parents) = segments
                .split_last()
                .ok_or_else(|| crate::xml_error!("invalid member path '{path}'"))?;
            xml_ensure!(
                parents.iter().all(|s| !s.starts_with('@')),
                "attribute '{path}' cannot have members"
            );
            let is_attribute = last.starts_with('@');
            if is_attribute {
                xml_ensure!(
                    member.namespace.is_none(),
                    "namespace overrides apply to elements only, not to '{path}'"
                );
            }
            if let Some(name) = &member.name {
                xml_ensure!(
                    !name.trim().is_empty() && !name.starts_with('@'),
                    "invalid override name '{name}' for '{path}'"
                );
                if !member.ignore {
                    let wire = if is_attribute {
                        attribute_member(name)
                    } else {
                        name.clone()
                    };
                    let parent = parents.join("/");
                    if let Some(other) = mapping
                        .inbound
                        .insert((parent.clone(), wire.clone()), (*last).to_owned())
                    {
                        xml_bail!(
                            "members '{other}' and '{last}' under '{parent}' are both written as '{wire}'"
                        );
                    }
                }
            }
            mapping.rules.insert(path.clone(), member.into());
        }
        trace!("compiled {} member overrides", mapping.rules.len());
        Ok(mapping)
    }

    #[must_use]
    pub fn root_name(&self) -> Option<&str> {
        self.root.as_ref().map(|r| r.element_name.as_str())
    }

    #[must_use]
    pub fn root_namespace(&self) -> Option<&str> {
        self.root.as_ref().and_then(|r| r.namespace.as_deref())
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.root.as_ref().is_some_and(|r| r.is_nullable)
    }

    /// Wire name of the member `name` found under `parent`.
    pub(crate) fn wire_name<'a>(&'a self, parent: &str, name: &'a str) -> &'a str {
        self.rules
            .get(&child_path(parent, name))
            .and_then(|r| r.name.as_deref())
            .unwrap_or(name)
    }

    /// Member designated by `wire_name` under `parent`.
    pub(crate) fn member(&self, parent: &str, wire_name: &str) -> WireMember {
        if let Some(member) = self
            .inbound
            .get(&(parent.to_owned(), wire_name.to_owned()))
        {
            return WireMember::Member(member.clone());
        }
        match self.rules.get(&child_path(parent, wire_name)) {
            Some(rule) if rule.ignore || rule.name.is_some() => WireMember::Unmapped,
            _ => WireMember::Member(wire_name.to_owned()),
        }
    }

    /// Namespace expected for the element member at `path`.
    pub(crate) fn namespace_of<'a>(
        &'a self,
        path: &str,
        parent_namespace: Option<&'a str>,
    ) -> Option<&'a str> {
        self.rules
            .get(path)
            .and_then(|r| r.namespace.as_deref())
            .or(parent_namespace)
    }

    /// Rewrite a tree produced by serde into its wire form, in place.
    ///
    /// # Errors
    ///
    /// `Serialization` when a renamed member ends up with the wire name of
    /// another member of the same element.
    pub(crate) fn apply_outbound(&self, root: &mut XmlElement) -> XmlResult<()> {
        root.namespace = self.root_namespace().map(ToOwned::to_owned);
        self.outbound(root, "")
    }

    fn outbound(&self, element: &mut XmlElement, path: &str) -> XmlResult<()> {
        element.attributes.retain(|a| {
            !self
                .rules
                .get(&child_path(path, &attribute_member(&a.name)))
                .is_some_and(|r| r.ignore)
        });
        let mut written: HashMap<String, String> = HashMap::new();
        for attribute in &mut element.attributes {
            let member = attribute_member(&attribute.name);
            if let Some(name) = self
                .rules
                .get(&child_path(path, &member))
                .and_then(|r| r.name.clone())
            {
                attribute.name = name;
            }
            ensure_unique_wire_name(&mut written, &attribute.name, &member, path)?;
        }

        element.children.retain(|c| {
            !self
                .rules
                .get(&child_path(path, &c.name))
                .is_some_and(|r| r.ignore)
        });
        let namespace = element.namespace.clone();
        let mut written: HashMap<String, String> = HashMap::new();
        for child in &mut element.children {
            let member = child.name.clone();
            let member_path = child_path(path, &member);
            child.namespace = self
                .namespace_of(&member_path, namespace.as_deref())
                .map(ToOwned::to_owned);
            if let Some(name) = self.rules.get(&member_path).and_then(|r| r.name.clone()) {
                child.name = name;
            }
            ensure_unique_wire_name(&mut written, &child.name, &member, path)?;
            self.outbound(child, &member_path)?;
        }
        Ok(())
    }

    /// Rewrite a tree read from the wire into the form serde expects.
    ///
    /// Names are mapped back to member names; namespaces are removed; members
    /// that are unmapped, in an unexpected namespace, or namespaced attributes
    /// are dropped.
    pub(crate) fn normalize(&self, root: &XmlElement) -> XmlElement {
        self.inbound(root, "", self.root_namespace())
    }

    fn inbound(&self, element: &XmlElement, path: &str, namespace: Option<&str>) -> XmlElement {
        let mut normalized = XmlElement {
            name: element.name.clone(),
            text: element.text.clone(),
            position: element.position,
            ..XmlElement::default()
        };

        for attribute in element.attributes.iter().filter(|a| a.namespace.is_none()) {
            if let WireMember::Member(member) =
                self.member(path, &attribute_member(&attribute.name))
            {
                normalized.attributes.push(XmlAttribute::new(
                    member.trim_start_matches('@'),
                    attribute.value.as_str(),
                ));
            }
        }

        for child in &element.children {
            let WireMember::Member(member) = self.member(path, &child.name) else {
                continue;
            };
            let member_path = child_path(path, &member);
            let expected = self.namespace_of(&member_path, namespace);
            if child.namespace.as_deref() != expected {
                continue;
            }
            let mut normalized_child = self.inbound(child, &member_path, expected);
            normalized_child.name = member;
            normalized.children.push(normalized_child);
        }
        normalized
    }
}
