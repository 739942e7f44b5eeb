use std::sync::Arc;

use xml_cache_logger::log_init;

use super::{TestObjectForXmlStuff, fixture, new_root, test_data_dir, test_object};
use crate::{
    AttributeOverrides, MemberOverride, RootOverride, SerializerCache, XmlCacheError,
    XmlConfiguration, XmlDiagnostic, XmlElement, XmlResultHelper, XmlSerialisation,
    XmlSerialisationConfig, XmlWriterSettings, read_xml_resource,
};

fn same_document(actual: &str, expected: &str) {
    let actual = XmlElement::parse(actual).unwrap();
    let expected = XmlElement::parse(expected).unwrap();
    assert_eq!(actual, expected);
}

fn new_root_overrides() -> (String, AttributeOverrides) {
    let root = new_root();
    let key = format!("XmlAttributes|{}", root.equality_key());
    (key, AttributeOverrides::new().with_root(root))
}

#[test]
fn test_serialize_with_default_root() {
    log_init(option_env!("RUST_LOG"));
    let serialisation = XmlSerialisation::default();
    let xml = serialisation
        .serialize(&test_object(), XmlConfiguration::Default)
        .unwrap();
    assert!(xml.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
    assert!(xml.contains("<TestObjectForXmlStuff>"));
    same_document(&xml, &fixture("ExpectedXmlWithDefaultRoot.xml").unwrap());
    // the default configuration is never cached
    assert!(serialisation.cache().is_empty());
}

#[test]
fn test_serialize_with_root_override() {
    log_init(option_env!("RUST_LOG"));
    let serialisation = XmlSerialisation::default();
    let root = new_root();
    let xml = serialisation
        .serialize(&test_object(), XmlConfiguration::Root(&root))
        .unwrap();
    assert!(xml.contains(r#"<NewRoot xmlns="uri:new:namespace">"#));
    same_document(&xml, &fixture("ExpectedXmlWithNewRoot.xml").unwrap());

    serialisation
        .serialize(&test_object(), XmlConfiguration::Root(&root))
        .unwrap();
    assert_eq!(serialisation.cache().len(), 1);
}

#[test]
fn test_serialize_with_attribute_overrides() {
    let serialisation = XmlSerialisation::default();
    let (equality_key, overrides) = new_root_overrides();
    let configuration = XmlConfiguration::Overrides {
        equality_key: &equality_key,
        overrides: &overrides,
    };
    let xml = serialisation
        .serialize(&test_object(), configuration)
        .unwrap();
    same_document(&xml, &fixture("ExpectedXmlWithNewRoot.xml").unwrap());

    let root_xml = serialisation
        .serialize(&test_object(), XmlConfiguration::Root(&new_root()))
        .unwrap();
    assert_eq!(xml, root_xml);
    assert_eq!(serialisation.cache().len(), 2);
}

#[test]
fn test_explicit_default_root_is_byte_identical() {
    let serialisation = XmlSerialisation::default();
    let default_xml = serialisation
        .serialize(&test_object(), XmlConfiguration::Default)
        .unwrap();
    let explicit = RootOverride::new("TestObjectForXmlStuff");
    let explicit_xml = serialisation
        .serialize(&test_object(), XmlConfiguration::Root(&explicit))
        .unwrap();
    assert_eq!(default_xml, explicit_xml);
}

#[test]
fn test_deserialize_fixtures() {
    log_init(option_env!("RUST_LOG"));
    let serialisation = XmlSerialisation::default();

    let default_xml = fixture("ExpectedXmlWithDefaultRoot.xml").unwrap();
    let value: TestObjectForXmlStuff = serialisation
        .deserialize(&default_xml, XmlConfiguration::Default)
        .unwrap();
    assert_eq!(value, test_object());

    let root = new_root();
    let new_root_xml = fixture("ExpectedXmlWithNewRoot.xml").unwrap();
    let mut diagnostics: Vec<XmlDiagnostic> = Vec::new();
    let value: TestObjectForXmlStuff = serialisation
        .deserialize_with_diagnostics(
            &new_root_xml,
            XmlConfiguration::Root(&root),
            &mut diagnostics,
        )
        .unwrap();
    assert_eq!(value, test_object());
    assert!(diagnostics.is_empty(), "{diagnostics:?}");

    let reserialized = serialisation
        .serialize(&value, XmlConfiguration::Root(&root))
        .unwrap();
    same_document(&reserialized, &new_root_xml);
}

#[test]
fn test_round_trips() {
    let serialisation = XmlSerialisation::default();
    let (equality_key, overrides) = new_root_overrides();
    let member_overrides = AttributeOverrides::new()
        .with_member("MyIntProperty", MemberOverride::renamed("Number"))
        .with_member(
            "MyStringProperty",
            MemberOverride::default().with_namespace("uri:other:namespace"),
        );
    let member_key = member_overrides.content_key();
    let root = new_root();

    let configurations = [
        XmlConfiguration::Default,
        XmlConfiguration::Root(&root),
        XmlConfiguration::Overrides {
            equality_key: &equality_key,
            overrides: &overrides,
        },
        XmlConfiguration::Overrides {
            equality_key: &member_key,
            overrides: &member_overrides,
        },
    ];
    for configuration in configurations {
        let xml = serialisation
            .serialize(&test_object(), configuration)
            .unwrap();
        let mut diagnostics: Vec<XmlDiagnostic> = Vec::new();
        let value: TestObjectForXmlStuff = serialisation
            .deserialize_with_diagnostics(&xml, configuration, &mut diagnostics)
            .unwrap();
        assert_eq!(value, test_object(), "{configuration:?}");
        assert!(diagnostics.is_empty(), "{configuration:?}: {diagnostics:?}");
    }

    let xml = serialisation
        .serialize_with_settings(
            &test_object(),
            XmlConfiguration::Overrides {
                equality_key: &member_key,
                overrides: &member_overrides,
            },
            &XmlWriterSettings::compact(),
        )
        .unwrap();
    assert_eq!(
        xml,
        r#"<TestObjectForXmlStuff><Number>12</Number><MyStringProperty xmlns="uri:other:namespace">Dummy data</MyStringProperty></TestObjectForXmlStuff>"#
    );
}

#[test]
fn test_deserialize_from_reader() {
    let serialisation = XmlSerialisation::default();
    let xml = fixture("ExpectedXmlWithDefaultRoot.xml").unwrap();
    let value: TestObjectForXmlStuff = serialisation
        .deserialize_from_reader(xml.as_bytes(), XmlConfiguration::Default)
        .unwrap();
    assert_eq!(value, test_object());

    let invalid_utf8: &[u8] = &[0x3c, 0xff, 0xfe];
    assert!(matches!(
        serialisation.deserialize_from_reader::<TestObjectForXmlStuff, _>(
            invalid_utf8,
            XmlConfiguration::Default
        ),
        Err(XmlCacheError::Io(_))
    ));
}

#[test]
fn test_failures() {
    let serialisation = XmlSerialisation::new(XmlSerialisationConfig {
        log_diagnostics: false,
        ..XmlSerialisationConfig::default()
    });
    let root = new_root();

    for malformed in [
        "<TestObjectForXmlStuff><MyIntProperty>12</TestObjectForXmlStuff>",
        "<TestObjectForXmlStuff>",
        "not xml at all",
        "<TestObjectForXmlStuff/><TestObjectForXmlStuff/>",
    ] {
        assert!(
            matches!(
                serialisation
                    .deserialize::<TestObjectForXmlStuff>(malformed, XmlConfiguration::Default),
                Err(XmlCacheError::MalformedInput(_))
            ),
            "{malformed}"
        );
    }

    // root element of another configuration
    let new_root_xml = fixture("ExpectedXmlWithNewRoot.xml").unwrap();
    assert!(matches!(
        serialisation.deserialize::<TestObjectForXmlStuff>(&new_root_xml, XmlConfiguration::Default),
        Err(XmlCacheError::MalformedInput(_))
    ));
    let default_xml = fixture("ExpectedXmlWithDefaultRoot.xml").unwrap();
    assert!(matches!(
        serialisation.deserialize::<TestObjectForXmlStuff>(&default_xml, XmlConfiguration::Root(&root)),
        Err(XmlCacheError::MalformedInput(_))
    ));
    // content that is not a TestObjectForXmlStuff
    assert!(matches!(
        serialisation.deserialize::<TestObjectForXmlStuff>(
            "<TestObjectForXmlStuff><MyIntProperty>twelve</MyIntProperty></TestObjectForXmlStuff>",
            XmlConfiguration::Default
        ),
        Err(XmlCacheError::MalformedInput(_))
    ));

    assert!(matches!(
        serialisation.deserialize::<TestObjectForXmlStuff>("", XmlConfiguration::Default),
        Err(XmlCacheError::InvalidArgument(_))
    ));
    let overrides = AttributeOverrides::new().with_root(new_root());
    assert!(matches!(
        serialisation.serialize(
            &test_object(),
            XmlConfiguration::Overrides {
                equality_key: " ",
                overrides: &overrides,
            }
        ),
        Err(XmlCacheError::InvalidArgument(_))
    ));
    // only the root override resolved above was cached
    assert_eq!(serialisation.cache().len(), 1);
}

#[test]
fn test_missing_resource() {
    assert!(matches!(
        read_xml_resource(&test_data_dir(), "NoSuchFixture.xml"),
        Err(XmlCacheError::ResourceNotFound(_))
    ));
    let context = read_xml_resource(&test_data_dir(), "NoSuchFixture.xml")
        .ok()
        .context("fixture is required");
    assert!(matches!(context, Err(XmlCacheError::Default(m)) if m == "fixture is required"));
}

#[test]
fn test_to_element_and_shared_cache() {
    let cache = Arc::new(SerializerCache::new());
    let first = XmlSerialisation::with_cache(XmlSerialisationConfig::default(), Arc::clone(&cache));
    let second = XmlSerialisation::with_cache(XmlSerialisationConfig::default(), Arc::clone(&cache));
    let root = new_root();

    let element = first
        .to_element(&test_object(), XmlConfiguration::Root(&root))
        .unwrap();
    assert_eq!(element.name, "NewRoot");
    assert_eq!(element.namespace.as_deref(), Some("uri:new:namespace"));
    assert_eq!(
        element.child("MyIntProperty").map(|c| c.text.as_str()),
        Some("12")
    );

    second
        .serialize(&test_object(), XmlConfiguration::Root(&root))
        .unwrap();
    assert_eq!(cache.len(), 1);
    assert!(Arc::ptr_eq(first.cache(), second.cache()));
}
