use serde::{Deserialize, Serialize};

/// How serialized XML text is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlWriterSettings {
    /// Put every element on its own, indented, line.
    pub indent: bool,
    /// Must be an ASCII character.
    pub indent_char: char,
    pub indent_size: usize,
    pub omit_xml_declaration: bool,
    /// Encoding label written in the XML declaration. The text itself is always UTF-8.
    pub encoding: String,
}

impl Default for XmlWriterSettings {
    fn default() -> Self {
        Self {
            indent: true,
            indent_char: ' ',
            indent_size: 2,
            omit_xml_declaration: false,
            encoding: "utf-8".to_owned(),
        }
    }
}

impl XmlWriterSettings {
    /// Single line output without an XML declaration.
    #[must_use]
    pub fn compact() -> Self {
        Self {
            indent: false,
            omit_xml_declaration: true,
            ..Self::default()
        }
    }
}

/// Settings of an [`crate::XmlSerialisation`] façade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlSerialisationConfig {
    /// Used by `serialize` when no explicit settings are given.
    pub writer_settings: XmlWriterSettings,
    /// Log deserialization diagnostics with `tracing::warn!`.
    pub log_diagnostics: bool,
}

impl Default for XmlSerialisationConfig {
    fn default() -> Self {
        Self {
            writer_settings: XmlWriterSettings::default(),
            log_diagnostics: true,
        }
    }
}
