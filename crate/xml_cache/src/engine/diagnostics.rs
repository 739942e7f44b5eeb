//! Non-fatal findings reported while deserializing.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::engine::tree::XmlPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    UnknownAttribute,
    UnknownElement,
    /// Character data or a processing instruction the target type has no place for.
    UnknownNode,
    /// An `id`-anchored element that no `href="#id"` refers to.
    UnreferencedObject,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::UnknownAttribute => "Unknown Attribute",
            Self::UnknownElement => "Unknown Element",
            Self::UnknownNode => "Unknown Node",
            Self::UnreferencedObject => "Unreferenced Object",
        };
        f.write_str(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XmlDiagnostic {
    pub kind: DiagnosticKind,
    #[serde(skip)]
    pub position: XmlPosition,
    /// Empty when the node has no namespace.
    pub namespace: String,
    pub name: String,
    /// Expected names for unknown elements and attributes, the text for
    /// unknown nodes, the identifier for unreferenced objects.
    pub context: String,
}

impl fmt::Display for XmlDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            DiagnosticKind::UnknownAttribute | DiagnosticKind::UnknownElement => "expected",
            DiagnosticKind::UnknownNode => "text",
            DiagnosticKind::UnreferencedObject => "id",
        };
        write!(
            f,
            "{} at {}: namespace '{}', name '{}', {label} '{}'",
            self.kind, self.position, self.namespace, self.name, self.context
        )
    }
}

/// Receives the diagnostics of a single deserialization call.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: XmlDiagnostic);
}

impl DiagnosticSink for Vec<XmlDiagnostic> {
    fn report(&mut self, diagnostic: XmlDiagnostic) {
        self.push(diagnostic);
    }
}

/// Adapts a closure into a sink.
pub struct SinkFn<F>(pub F);

impl<F: FnMut(XmlDiagnostic)> DiagnosticSink for SinkFn<F> {
    fn report(&mut self, diagnostic: XmlDiagnostic) {
        (self.0)(diagnostic);
    }
}

/// Logs every diagnostic as a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl DiagnosticSink for LogDiagnostics {
    fn report(&mut self, diagnostic: XmlDiagnostic) {
        warn!("XML deserialization: {diagnostic}");
    }
}

/// Forwards to a caller sink and optionally logs as well.
pub(crate) struct Reporter<'a> {
    pub(crate) sink: &'a mut dyn DiagnosticSink,
    pub(crate) log: bool,
}

impl DiagnosticSink for Reporter<'_> {
    fn report(&mut self, diagnostic: XmlDiagnostic) {
        if self.log {
            LogDiagnostics.report(diagnostic.clone());
        }
        self.sink.report(diagnostic);
    }
}
