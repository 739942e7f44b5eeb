use std::{io::ErrorKind, path::Path, str::FromStr};

use tracing::debug;

use crate::{XmlCacheError, XmlResult, engine::XmlElement};

impl FromStr for XmlElement {
    type Err = XmlCacheError;

    fn from_str(xml: &str) -> Result<Self, Self::Err> {
        Self::parse(xml)
    }
}

/// Read the XML resource `name` from `directory`.
///
/// # Errors
///
/// `ResourceNotFound` when the file does not exist, `Io` for other read
/// failures.
pub fn read_xml_resource(directory: &Path, name: &str) -> XmlResult<String> {
    let path = directory.join(name);
    debug!("reading XML resource {}", path.display());
    std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => XmlCacheError::ResourceNotFound(format!(
            "{name} in {}",
            directory.display()
        )),
        _ => XmlCacheError::Io(e),
    })
}
