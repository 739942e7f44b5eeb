use std::{
    sync::{
        Arc, Barrier,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};

use xml_cache_logger::log_init;

use super::{TestObjectForXmlStuff, new_root};
use crate::{
    RootOverride, SerializerCache, SerializerKey, XmlCacheError, XmlMapping, XmlSerializer,
};

#[test]
fn test_get_or_create_builds_once() {
    log_init(option_env!("RUST_LOG"));
    let cache = SerializerCache::new();
    let built = AtomicUsize::new(0);
    let factory = || {
        built.fetch_add(1, Ordering::SeqCst);
        XmlSerializer::<TestObjectForXmlStuff>::with_root(&new_root())
    };

    let first = cache.get_or_create("key", factory).unwrap();
    let second = cache.get_or_create("key", factory).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(built.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
    assert!(cache.contains::<TestObjectForXmlStuff>("key"));
}

#[test]
fn test_racing_callers_share_one_instance() {
    const THREADS: usize = 16;
    let cache = SerializerCache::new();
    let barrier = Barrier::new(THREADS);

    let serializers: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    cache
                        .get_or_create_by_root_override::<TestObjectForXmlStuff>(&new_root())
                        .unwrap()
                        .0
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(cache.len(), 1);
    let stored = cache
        .get::<TestObjectForXmlStuff>(&new_root().equality_key())
        .unwrap()
        .unwrap();
    assert!(serializers.iter().all(|s| Arc::ptr_eq(s, &stored)));
}

#[test]
fn test_factory_error_is_returned_and_not_stored() {
    let cache = SerializerCache::new();
    let failed = cache.get_or_create::<TestObjectForXmlStuff, _>("bad", || {
        XmlSerializer::with_root(&RootOverride::new(""))
    });
    assert!(matches!(failed, Err(XmlCacheError::InvalidArgument(_))));
    assert!(cache.is_empty());

    let built = cache
        .get_or_create::<TestObjectForXmlStuff, _>("bad", || {
            Ok(XmlSerializer::new(XmlMapping::default()))
        })
        .unwrap();
    assert!(built.mapping().root_name().is_none());
}

#[test]
fn test_root_override_keys_do_not_collide() {
    let cache = SerializerCache::new();
    let overrides = [
        new_root(),
        new_root().nullable(true),
        new_root().with_data_type("TestType"),
        RootOverride::new("NewRoot"),
        RootOverride::new("OtherRoot").with_namespace("uri:new:namespace"),
    ];
    for root in &overrides {
        let (serializer, key) = cache
            .get_or_create_by_root_override::<TestObjectForXmlStuff>(root)
            .unwrap();
        assert_eq!(key, root.equality_key());
        assert_eq!(serializer.mapping().root_name(), Some(root.element_name.as_str()));
    }
    assert_eq!(cache.len(), overrides.len());
}

#[test]
fn test_same_key_for_different_types_is_two_entries() {
    let cache = SerializerCache::new();
    let root = RootOverride::new("Shared");
    cache
        .get_or_create_by_root_override::<TestObjectForXmlStuff>(&root)
        .unwrap();
    cache.get_or_create_by_root_override::<String>(&root).unwrap();
    assert_eq!(cache.len(), 2);
    assert!(cache.contains::<String>(&root.equality_key()));

    let key = SerializerKey::of::<String>(root.equality_key());
    assert_eq!(key.equality_key(), "ROOT||Shared|false|");
    assert_eq!(
        key.to_string(),
        format!("{}|ROOT||Shared|false|", std::any::type_name::<String>())
    );
}
