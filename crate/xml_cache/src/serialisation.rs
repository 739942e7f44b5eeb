use std::{io::Read, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use tracing::trace;

use crate::{
    XmlResult,
    config::{XmlSerialisationConfig, XmlWriterSettings},
    engine::{
        DiagnosticSink, LogDiagnostics, XmlDiagnostic, XmlElement, XmlMapping, XmlSerializer,
        diagnostics::Reporter,
    },
    named_locker::NamedLocker,
    overrides::{AttributeOverrides, RootOverride},
    serializer_cache::{SerializerCache, SerializerKey},
    xml_ensure,
};

/// Which serializer configuration a call uses.
#[derive(Debug, Clone, Copy, Default)]
pub enum XmlConfiguration<'a> {
    /// The type's own root element, no overrides. Not cached.
    #[default]
    Default,
    Root(&'a RootOverride),
    /// Member overrides, cached under a caller-supplied key which must
    /// identify the override content. See [`AttributeOverrides::content_key`].
    Overrides {
        equality_key: &'a str,
        overrides: &'a AttributeOverrides,
    },
}

/// Serialize and deserialize values through cached serializers.
///
/// Configurations other than [`XmlConfiguration::Default`] are compiled once
/// per target type and equality key, then shared.
#[derive(Debug, Default)]
pub struct XmlSerialisation {
    config: XmlSerialisationConfig,
    cache: Arc<SerializerCache>,
    locker: NamedLocker,
}

impl XmlSerialisation {
    #[must_use]
    pub fn new(config: XmlSerialisationConfig) -> Self {
        Self::with_cache(config, Arc::new(SerializerCache::new()))
    }

    /// A façade sharing its serializers with others built on the same cache.
    #[must_use]
    pub fn with_cache(config: XmlSerialisationConfig, cache: Arc<SerializerCache>) -> Self {
        Self {
            config,
            cache,
            locker: NamedLocker::default(),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &XmlSerialisationConfig {
        &self.config
    }

    #[must_use]
    pub const fn cache(&self) -> &Arc<SerializerCache> {
        &self.cache
    }

    #[must_use]
    pub const fn locker(&self) -> &NamedLocker {
        &self.locker
    }

    fn resolve<T>(&self, configuration: XmlConfiguration<'_>) -> XmlResult<Arc<XmlSerializer<T>>>
    where
        T: Send + Sync + 'static,
    {
        match configuration {
            XmlConfiguration::Default => Ok(Arc::new(XmlSerializer::new(XmlMapping::default()))),
            XmlConfiguration::Root(root) => {
                let equality_key = root.equality_key();
                if let Some(serializer) = self.cache.get::<T>(&equality_key)? {
                    return Ok(serializer);
                }
                self.locker
                    .run_exclusive(&SerializerKey::of::<T>(equality_key).to_string(), || {
                        self.cache
                            .get_or_create_by_root_override(root)
                            .map(|(serializer, _)| serializer)
                    })
            }
            XmlConfiguration::Overrides {
                equality_key,
                overrides,
            } => {
                xml_ensure!(
                    !equality_key.trim().is_empty(),
                    "an equality key is required to cache a serializer with overrides"
                );
                if let Some(serializer) = self.cache.get::<T>(equality_key)? {
                    return Ok(serializer);
                }
                self.locker
                    .run_exclusive(&SerializerKey::of::<T>(equality_key).to_string(), || {
                        self.cache.get_or_create(equality_key, || {
                            XmlSerializer::with_overrides(overrides)
                        })
                    })
            }
        }
    }

    /// Serialize with the configured writer settings.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an unusable configuration, `Serialization` when
    /// the value cannot be written.
    pub fn serialize<T>(&self, value: &T, configuration: XmlConfiguration<'_>) -> XmlResult<String>
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.serialize_with_settings(value, configuration, &self.config.writer_settings)
    }

    /// # Errors
    ///
    /// See [`Self::serialize`].
    pub fn serialize_with_settings<T>(
        &self,
        value: &T,
        configuration: XmlConfiguration<'_>,
        settings: &XmlWriterSettings,
    ) -> XmlResult<String>
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.resolve::<T>(configuration)?.serialize(value, settings)
    }

    /// The wire-form element tree of a value.
    ///
    /// # Errors
    ///
    /// See [`Self::serialize`].
    pub fn to_element<T>(
        &self,
        value: &T,
        configuration: XmlConfiguration<'_>,
    ) -> XmlResult<XmlElement>
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.resolve::<T>(configuration)?.to_element(value)
    }

    /// Deserialize, logging diagnostics when the configuration asks for it.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty input or an unusable configuration,
    /// `MalformedInput` when the input does not describe a `T`.
    pub fn deserialize<T>(&self, xml: &str, configuration: XmlConfiguration<'_>) -> XmlResult<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let serializer = self.resolve::<T>(configuration)?;
        if self.config.log_diagnostics {
            serializer.deserialize(xml, &mut LogDiagnostics)
        } else {
            serializer.deserialize(xml, &mut Vec::<XmlDiagnostic>::new())
        }
    }

    /// Deserialize, reporting diagnostics of this call only to `sink`.
    ///
    /// # Errors
    ///
    /// See [`Self::deserialize`].
    pub fn deserialize_with_diagnostics<T>(
        &self,
        xml: &str,
        configuration: XmlConfiguration<'_>,
        sink: &mut dyn DiagnosticSink,
    ) -> XmlResult<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let serializer = self.resolve::<T>(configuration)?;
        let mut reporter = Reporter {
            sink,
            log: self.config.log_diagnostics,
        };
        serializer.deserialize(xml, &mut reporter)
    }

    /// # Errors
    ///
    /// `Io` when the reader fails or does not yield UTF-8, otherwise see
    /// [`Self::deserialize`].
    pub fn deserialize_from_reader<T, R>(
        &self,
        mut reader: R,
        configuration: XmlConfiguration<'_>,
    ) -> XmlResult<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        R: Read,
    {
        let mut xml = String::new();
        let read = reader.read_to_string(&mut xml)?;
        trace!("read {read} bytes of XML");
        self.deserialize(&xml, configuration)
    }
}
