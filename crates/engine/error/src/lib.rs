mod code;
mod path;

pub use code::*;
pub use path::*;
use std::{borrow::Cow, sync::Arc};

use serde::ser::SerializeMap;

pub type GraphqlResult<T> = Result<T, GraphqlError>;

/// Line and column in the operation document, both starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Location { line, column }
    }
}

#[derive(Debug, Clone)]
pub struct GraphqlError {
    pub message: Cow<'static, str>,
    pub code: ErrorCode,
    pub locations: Vec<Location>,
    pub path: Option<ErrorPath>,
    // Serialized as a map, but kept as a Vec for efficiency.
    pub extensions: Vec<(Cow<'static, str>, serde_json::Value)>,
    /// Underlying error, never sent to clients unless explicitly exposed.
    pub cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl GraphqlError {
    pub fn new(message: impl Into<Cow<'static, str>>, code: ErrorCode) -> Self {
        GraphqlError {
            message: message.into(),
            code,
            locations: Vec::new(),
            path: None,
            extensions: Vec::new(),
            cause: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    #[must_use]
    pub fn with_locations(mut self, locations: impl IntoIterator<Item = Location>) -> Self {
        self.locations.extend(locations);
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<ErrorPath>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<Cow<'static, str>>, value: impl Into<serde_json::Value>) -> Self {
        let key = key.into();
        self.extensions.push((key, value.into()));
        self
    }

    #[must_use]
    pub fn with_extensions(
        mut self,
        extensions: impl IntoIterator<Item = (impl Into<Cow<'static, str>>, impl Into<serde_json::Value>)>,
    ) -> Self {
        for (key, value) in extensions {
            self.extensions.push((key.into(), value.into()));
        }
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: Arc<dyn std::error::Error + Send + Sync>) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Copies the underlying cause, if any, into the `cause` extension so that it reaches the client.
    #[must_use]
    pub fn expose_cause(mut self) -> Self {
        if let Some(cause) = self.cause.clone() {
            if !self.extensions.iter().any(|(key, _)| key == "cause") {
                self.extensions.push(("cause".into(), cause.to_string().into()));
            }
        }
        self
    }

    pub fn is_request_fatal(&self) -> bool {
        self.code.is_request_fatal()
    }

    // ------------- //
    // Common errors //
    // ------------- //

    pub fn internal_server_error() -> Self {
        GraphqlError::new("Internal server error", ErrorCode::InternalServerError)
    }
}

impl std::fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.message.fmt(f)
    }
}

impl PartialEq for GraphqlError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
            && self.code == other.code
            && self.locations == other.locations
            && self.path == other.path
            && self.extensions == other.extensions
    }
}

impl serde::Serialize for GraphqlError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("message", &self.message)?;
        if !self.locations.is_empty() {
            map.serialize_entry("locations", &self.locations)?;
        }
        if let Some(path) = &self.path {
            map.serialize_entry("path", path)?;
        }
        map.serialize_entry("extensions", &SerializableExtensions(self))?;
        map.end()
    }
}

struct SerializableExtensions<'a>(&'a GraphqlError);

impl serde::Serialize for SerializableExtensions<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.0.extensions {
            if key != "code" {
                map.serialize_entry(key, value)?;
            }
        }
        map.serialize_entry("code", &self.0.code)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("database exploded")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn serialization() {
        let error = GraphqlError::new("Something went wrong", ErrorCode::ResolverError)
            .with_location(Location::new(2, 5))
            .with_path(["user", "name"])
            .with_extension("retry", false);

        insta::assert_json_snapshot!(error, @r#"
        {
          "message": "Something went wrong",
          "locations": [
            {
              "line": 2,
              "column": 5
            }
          ],
          "path": [
            "user",
            "name"
          ],
          "extensions": {
            "retry": false,
            "code": "RESOLVER_ERROR"
          }
        }
        "#);
    }

    #[test]
    fn cause_is_hidden_unless_exposed() {
        let error = GraphqlError::new("Resolver failed", ErrorCode::ResolverError).with_cause(Arc::new(Boom));

        insta::assert_json_snapshot!(error, @r#"
        {
          "message": "Resolver failed",
          "extensions": {
            "code": "RESOLVER_ERROR"
          }
        }
        "#);

        insta::assert_json_snapshot!(error.expose_cause(), @r#"
        {
          "message": "Resolver failed",
          "extensions": {
            "cause": "database exploded",
            "code": "RESOLVER_ERROR"
          }
        }
        "#);
    }
}
