use std::{
    any::{Any, TypeId, type_name},
    collections::HashMap,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use tracing::{debug, trace};

use crate::{XmlResult, XmlResultHelper, engine::XmlSerializer, overrides::RootOverride};

type CachedSerializer = Arc<dyn Any + Send + Sync>;

/// Identity of a cached serializer: the target type and an equality key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SerializerKey {
    type_id: TypeId,
    type_name: &'static str,
    equality_key: String,
}

impl SerializerKey {
    #[must_use]
    pub fn of<T: 'static>(equality_key: impl Into<String>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            equality_key: equality_key.into(),
        }
    }

    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn equality_key(&self) -> &str {
        &self.equality_key
    }
}

impl fmt::Display for SerializerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.type_name, self.equality_key)
    }
}

/// Process-wide store of serializers, keyed by target type and equality key.
///
/// Entries are never removed: the number of distinct configurations is bounded
/// by the callers.
#[derive(Default)]
pub struct SerializerCache {
    serializers: RwLock<HashMap<SerializerKey, CachedSerializer>>,
}

impl fmt::Debug for SerializerCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializerCache")
            .field("len", &self.len())
            .finish()
    }
}

fn downcast<T: 'static>(
    key: &SerializerKey,
    cached: CachedSerializer,
) -> XmlResult<Arc<XmlSerializer<T>>> {
    cached
        .downcast::<XmlSerializer<T>>()
        .ok()
        .with_context(|| format!("the serializer cached for {key} has another type"))
}

impl SerializerCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The serializer stored for `T` and `equality_key`, if any.
    ///
    /// # Errors
    ///
    /// `Default` if the stored entry is not a serializer for `T`.
    pub fn get<T: 'static>(
        &self,
        equality_key: &str,
    ) -> XmlResult<Option<Arc<XmlSerializer<T>>>> {
        let key = SerializerKey::of::<T>(equality_key);
        let cached = self
            .serializers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        cached.map(|c| downcast(&key, c)).transpose()
    }

    /// Return the serializer stored for `T` and `equality_key`, building it
    /// with `factory` when absent.
    ///
    /// `factory` runs outside of any lock and may run more than once when
    /// callers race on the same key; the first stored instance wins and every
    /// caller gets that one.
    ///
    /// # Errors
    ///
    /// Errors of `factory` are returned unchanged and nothing is stored.
    pub fn get_or_create<T, F>(
        &self,
        equality_key: &str,
        factory: F,
    ) -> XmlResult<Arc<XmlSerializer<T>>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> XmlResult<XmlSerializer<T>>,
    {
        if let Some(serializer) = self.get::<T>(equality_key)? {
            trace!("serializer cache hit: {}|{equality_key}", type_name::<T>());
            return Ok(serializer);
        }

        let key = SerializerKey::of::<T>(equality_key);
        let created: CachedSerializer = Arc::new(factory()?);
        let stored = self
            .serializers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_insert_with(|| {
                debug!("caching a new serializer for {key}");
                created
            })
            .clone();
        downcast(&key, stored)
    }

    /// Like [`Self::get_or_create`], with the equality key derived from the
    /// root override. The key is returned for reuse, typically for locking.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the override has an empty element name.
    pub fn get_or_create_by_root_override<T>(
        &self,
        root: &RootOverride,
    ) -> XmlResult<(Arc<XmlSerializer<T>>, String)>
    where
        T: Send + Sync + 'static,
    {
        let equality_key = root.equality_key();
        let serializer = self.get_or_create(&equality_key, || XmlSerializer::with_root(root))?;
        Ok((serializer, equality_key))
    }

    #[must_use]
    pub fn contains<T: 'static>(&self, equality_key: &str) -> bool {
        self.serializers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&SerializerKey::of::<T>(equality_key))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.serializers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
