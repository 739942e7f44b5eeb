use std::fmt::Display;

use super::XmlCacheError;

pub type XmlResult<R> = Result<R, XmlCacheError>;

/// A helper trait for `XmlResult` that adds context to foreign errors.
pub trait XmlResultHelper<T> {
    /// Sets the context for the error.
    ///
    /// # Errors
    ///
    /// Returns an `XmlResult` with the specified context if the original result is an error.
    fn context(self, context: &str) -> XmlResult<T>;

    /// Sets the context for the error using a closure.
    ///
    /// # Errors
    ///
    /// Returns an `XmlResult` with the context returned by the closure if the original result is an error.
    fn with_context<D, O>(self, op: O) -> XmlResult<T>
    where
        D: Display + Send + Sync + 'static,
        O: FnOnce() -> D;
}

impl<T, E> XmlResultHelper<T> for Result<T, E>
where
    E: std::error::Error,
{
    fn context(self, context: &str) -> XmlResult<T> {
        self.map_err(|e| XmlCacheError::Default(format!("{context}: {e}")))
    }

    fn with_context<D, O>(self, op: O) -> XmlResult<T>
    where
        D: Display + Send + Sync + 'static,
        O: FnOnce() -> D,
    {
        self.map_err(|e| XmlCacheError::Default(format!("{}: {e}", op())))
    }
}

impl<T> XmlResultHelper<T> for Option<T> {
    fn context(self, context: &str) -> XmlResult<T> {
        self.ok_or_else(|| XmlCacheError::Default(context.to_owned()))
    }

    fn with_context<D, O>(self, op: O) -> XmlResult<T>
    where
        D: Display + Send + Sync + 'static,
        O: FnOnce() -> D,
    {
        self.ok_or_else(|| XmlCacheError::Default(op().to_string()))
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::XmlResultHelper;
    use crate::XmlCacheError;

    #[test]
    fn test_context_wraps_foreign_errors_and_missing_values() {
        let parsed = "twelve".parse::<i32>().context("MyIntProperty");
        assert!(matches!(
            parsed,
            Err(XmlCacheError::Default(m)) if m.starts_with("MyIntProperty: ")
        ));

        let missing: Option<u8> = None;
        let root = "NewRoot";
        let err = missing
            .with_context(|| format!("no serializer for {root}"))
            .unwrap_err();
        assert_eq!(err.to_string(), "no serializer for NewRoot");
        assert_eq!(Some(1_u8).context("unused").unwrap(), 1);
    }
}
