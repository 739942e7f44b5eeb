#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::unwrap_in_result
)]
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{RootOverride, XmlResult, read_xml_resource};

mod cache_tests;
mod serialisation_tests;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct TestObjectForXmlStuff {
    pub(crate) my_int_property: i32,
    pub(crate) my_string_property: String,
}

pub(crate) fn test_object() -> TestObjectForXmlStuff {
    TestObjectForXmlStuff {
        my_int_property: 12,
        my_string_property: "Dummy data".to_owned(),
    }
}

pub(crate) fn new_root() -> RootOverride {
    RootOverride::new("NewRoot").with_namespace("uri:new:namespace")
}

pub(crate) fn test_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("test_data")
}

pub(crate) fn fixture(name: &str) -> XmlResult<String> {
    read_xml_resource(&test_data_dir(), name)
}
