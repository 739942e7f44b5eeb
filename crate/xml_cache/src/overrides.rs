//! Serializer configuration overrides and their equality keys.

use std::{borrow::Cow, collections::BTreeMap, fmt::Write as _};

use serde::{Deserialize, Serialize};

/// Escape the key delimiters `|`, `=` and `,` (and `\` itself) in a key part.
fn key_part(part: &str) -> Cow<'_, str> {
    if !part.contains(['\\', '|', '=', ',']) {
        return Cow::Borrowed(part);
    }
    let mut escaped = String::with_capacity(part.len() + 4);
    for c in part.chars() {
        if matches!(c, '\\' | '|' | '=' | ',') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Cow::Owned(escaped)
}

/// Replacement for the root element a type serializes to by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RootOverride {
    pub element_name: String,
    pub namespace: Option<String>,
    /// XML Schema data type name. Part of the configuration identity only.
    pub data_type: Option<String>,
    /// When set, a value that serializes to nothing is written as an
    /// `xsi:nil="true"` root.
    pub is_nullable: bool,
}

impl RootOverride {
    #[must_use]
    pub fn new(element_name: impl Into<String>) -> Self {
        Self {
            element_name: element_name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    #[must_use]
    pub fn nullable(mut self, is_nullable: bool) -> Self {
        self.is_nullable = is_nullable;
        self
    }

    /// Deterministic cache key derived from every field of the override.
    ///
    /// Format: `ROOT|{data_type}|{element_name}|{is_nullable}|{namespace}`,
    /// absent optional parts rendering as empty strings. Delimiters inside a
    /// part are escaped with `\`.
    #[must_use]
    pub fn equality_key(&self) -> String {
        format!(
            "ROOT|{}|{}|{}|{}",
            key_part(self.data_type.as_deref().unwrap_or_default()),
            key_part(&self.element_name),
            self.is_nullable,
            key_part(self.namespace.as_deref().unwrap_or_default())
        )
    }
}

/// Per-member replacement of the serialized name, namespace or presence.
///
/// Namespaces apply to element members only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberOverride {
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub ignore: bool,
}

impl MemberOverride {
    #[must_use]
    pub fn renamed(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ignored() -> Self {
        Self {
            ignore: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// A set of overrides for one target type.
///
/// Members are addressed by their path of serde member names relative to the
/// root element, `/`-separated, attributes prefixed by `@`:
/// `"Address/Street"`, `"Address/@kind"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeOverrides {
    pub root: Option<RootOverride>,
    pub members: BTreeMap<String, MemberOverride>,
}

impl AttributeOverrides {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_root(mut self, root: RootOverride) -> Self {
        self.root = Some(root);
        self
    }

    #[must_use]
    pub fn with_member(mut self, path: impl Into<String>, member: MemberOverride) -> Self {
        self.members.insert(path.into(), member);
        self
    }

    pub fn add_member(&mut self, path: impl Into<String>, member: MemberOverride) {
        self.members.insert(path.into(), member);
    }

    /// Deterministic key computed from the override content.
    ///
    /// Two override sets with the same content always produce the same key,
    /// whatever the order in which members were added.
    #[must_use]
    pub fn content_key(&self) -> String {
        let mut key = String::from("OVERRIDES|");
        if let Some(root) = &self.root {
            key.push_str(&root.equality_key());
        }
        for (path, member) in &self.members {
            let _ = write!(
                key,
                "|{}={},{},{}",
                key_part(path),
                key_part(member.name.as_deref().unwrap_or_default()),
                key_part(member.namespace.as_deref().unwrap_or_default()),
                member.ignore
            );
        }
        key
    }
}
