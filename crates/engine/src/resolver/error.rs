use std::{fmt, sync::Arc};

/// Error returned by a resolver.
///
/// Any [`std::error::Error`] converts into it, so resolvers can use `?`. The original error is kept
/// as the cause of the [`GraphqlError`](crate::GraphqlError) reported for the field.
#[derive(Clone)]
pub struct Error {
    pub message: String,
    pub source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    pub extensions: Vec<(String, serde_json::Value)>,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Error {
            message: message.into(),
            source: None,
            extensions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extensions.push((key.into(), value.into()));
        self
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(error: E) -> Self {
        Error {
            message: error.to_string(),
            source: Some(Arc::new(error)),
            extensions: Vec::new(),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("message", &self.message)
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
