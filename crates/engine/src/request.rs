use std::{any::Any, fmt, sync::Arc};

use async_graphql_parser::types::ExecutableDocument;
use error::{ErrorCode, GraphqlError};

use crate::{execution::location, Response, Variables};

/// A GraphQL request as sent by clients over any transport.
#[derive(Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default)]
    pub variables: Variables,
    /// Handed to resolvers, see [`ResolverContext::data`](crate::ResolverContext::data).
    #[serde(skip)]
    pub(crate) context: Option<Arc<dyn Any + Send + Sync>>,
}

impl Request {
    pub fn new(query: impl Into<String>) -> Self {
        Request {
            query: query.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    #[must_use]
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    #[must_use]
    pub fn data(mut self, context: impl Any + Send + Sync) -> Self {
        self.context = Some(Arc::new(context));
        self
    }

    /// Parses the query, failing with a ready request error response.
    pub(crate) fn parse(&self) -> Result<ExecutableDocument, Response> {
        async_graphql_parser::parse_query(&self.query).map_err(|err| {
            tracing::debug!("Failed to parse the operation: {err}");
            let error = GraphqlError::new(err.to_string(), ErrorCode::OperationParsingError)
                .with_locations(err.positions().map(location));
            Response::request_error([error])
        })
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("query", &self.query)
            .field("operation_name", &self.operation_name)
            .field("variables", &self.variables)
            .finish_non_exhaustive()
    }
}

impl From<&str> for Request {
    fn from(query: &str) -> Self {
        Request::new(query)
    }
}

impl From<String> for Request {
    fn from(query: String) -> Self {
        Request::new(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_camel_case() {
        let request: Request = serde_json::from_value(serde_json::json!({
            "query": "query A($id: ID) { user(id: $id) { name } }",
            "operationName": "A",
            "variables": {"id": "1"},
        }))
        .unwrap();
        assert_eq!(request.operation_name.as_deref(), Some("A"));
        assert_eq!(request.variables.to_string(), r#"{id: "1"}"#);
    }

    #[test]
    fn parse_error() {
        let response = Request::new("{ user(").parse().unwrap_err();
        assert_eq!(response.status_code(), http::StatusCode::BAD_REQUEST);
        assert_eq!(response.errors[0].code, ErrorCode::OperationParsingError);
        assert!(!response.errors[0].locations.is_empty());
    }
}
