use thiserror::Error;

pub(crate) mod result;

#[derive(Error, Debug)]
pub enum XmlCacheError {
    #[error("{0}")]
    Default(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Malformed XML input: {0}")]
    MalformedInput(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<quick_xml::DeError> for XmlCacheError {
    fn from(e: quick_xml::DeError) -> Self {
        Self::MalformedInput(e.to_string())
    }
}

impl From<quick_xml::SeError> for XmlCacheError {
    fn from(e: quick_xml::SeError) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<quick_xml::Error> for XmlCacheError {
    fn from(e: quick_xml::Error) -> Self {
        Self::MalformedInput(e.to_string())
    }
}

/// Return early with an error if a condition is not satisfied.
///
/// This macro is equivalent to `if !$cond { return Err(From::from($err)); }`.
#[macro_export]
macro_rules! xml_ensure {
    ($cond:expr, $msg:literal $(,)?) => {
        if !$cond {
            return ::core::result::Result::Err($crate::xml_error!($msg));
        }
    };
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return ::core::result::Result::Err($err);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            return ::core::result::Result::Err($crate::xml_error!($fmt, $($arg)*));
        }
    };
}

/// Construct an invalid argument error from a string.
#[macro_export]
macro_rules! xml_error {
    ($msg:literal) => {
        $crate::XmlCacheError::InvalidArgument(::core::format_args!($msg).to_string())
    };
    ($err:expr $(,)?) => ({
        $crate::XmlCacheError::InvalidArgument($err.to_string())
    });
    ($fmt:expr, $($arg:tt)*) => {
        $crate::XmlCacheError::InvalidArgument(::core::format_args!($fmt, $($arg)*).to_string())
    };
}

/// Return early with an invalid argument error.
#[macro_export]
macro_rules! xml_bail {
    ($msg:literal) => {
        return ::core::result::Result::Err($crate::xml_error!($msg))
    };
    ($err:expr $(,)?) => {
        return ::core::result::Result::Err($err)
    };
    ($fmt:expr, $($arg:tt)*) => {
        return ::core::result::Result::Err($crate::xml_error!($fmt, $($arg)*))
    };
}
