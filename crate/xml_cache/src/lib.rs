//! Concurrency-safe cache of XML serializers.
//!
//! Building a serializer for a custom root element or member overrides is
//! costly, and building one per call leaks: every distinct serializer stays
//! alive for the life of the process. [`SerializerCache`] builds each
//! (target type, equality key) configuration once and shares the instance.
//! [`XmlSerialisation`] is the façade most callers use; [`NamedLocker`] makes
//! its construct-or-fetch sections exclusive per configuration.
//!
//! Serialization goes through `serde` and `quick-xml`.

pub use config::{XmlSerialisationConfig, XmlWriterSettings};
pub use conversion::read_xml_resource;
pub use engine::{
    DiagnosticKind, DiagnosticSink, LogDiagnostics, SinkFn, XSI_NAMESPACE, XmlAttribute,
    XmlDiagnostic, XmlElement, XmlInstruction, XmlMapping, XmlPosition, XmlSerializer,
};
pub use error::{
    XmlCacheError,
    result::{XmlResult, XmlResultHelper},
};
pub use named_locker::{LockHandle, NamedLocker};
pub use overrides::{AttributeOverrides, MemberOverride, RootOverride};
pub use serialisation::{XmlConfiguration, XmlSerialisation};
pub use serializer_cache::{SerializerCache, SerializerKey};

mod config;
mod conversion;
pub mod engine;
mod error;
mod named_locker;
mod overrides;
mod serialisation;
mod serializer_cache;

#[cfg(test)]
mod tests;
