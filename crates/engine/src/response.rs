use async_graphql_value::ConstValue;
use error::GraphqlError;
use serde::ser::SerializeMap;

/// The result of executing an operation.
///
/// Serialized as `{"data": ..., "errors": [...]}` with `errors` left out when there are none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub data: ConstValue,
    pub errors: Vec<GraphqlError>,
}

impl Response {
    pub fn new(data: ConstValue, errors: Vec<GraphqlError>) -> Self {
        Response { data, errors }
    }

    /// A response for a request that could not be executed at all.
    pub fn request_error(errors: impl IntoIterator<Item = GraphqlError>) -> Self {
        Response {
            data: ConstValue::Null,
            errors: errors.into_iter().collect(),
        }
    }

    /// Copies error causes into the `cause` extension when `expose` is set.
    #[must_use]
    pub fn with_exposed_causes(mut self, expose: bool) -> Self {
        if expose {
            self.errors = self.errors.into_iter().map(GraphqlError::expose_cause).collect();
        }
        self
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether an error prevented the operation from being executed.
    pub fn is_request_error(&self) -> bool {
        self.errors.iter().any(GraphqlError::is_request_fatal)
    }

    /// 400 if the operation could not be executed, 200 otherwise. Field errors are part of a
    /// successful response.
    pub fn status_code(&self) -> http::StatusCode {
        if self.is_request_error() {
            http::StatusCode::BAD_REQUEST
        } else {
            http::StatusCode::OK
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

impl serde::Serialize for Response {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(if self.errors.is_empty() { 1 } else { 2 }))?;
        map.serialize_entry("data", &self.data)?;
        if !self.errors.is_empty() {
            map.serialize_entry("errors", &self.errors)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use error::ErrorCode;

    use super::*;

    #[test]
    fn errors_are_omitted_when_empty() {
        let response = Response::new(ConstValue::from_json(serde_json::json!({"a": 1})).unwrap(), Vec::new());
        insta::assert_json_snapshot!(response, @r#"
        {
          "data": {
            "a": 1
          }
        }
        "#);
        assert_eq!(response.status_code(), http::StatusCode::OK);
    }

    #[test]
    fn request_errors_are_bad_requests() {
        let response = Response::request_error([GraphqlError::new(
            "Must provide an operation.",
            ErrorCode::OperationSelectionError,
        )]);
        insta::assert_json_snapshot!(response, @r#"
        {
          "data": null,
          "errors": [
            {
              "message": "Must provide an operation.",
              "extensions": {
                "code": "OPERATION_SELECTION_ERROR"
              }
            }
          ]
        }
        "#);
        assert_eq!(response.status_code(), http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn field_errors_keep_status_ok() {
        let response = Response::new(
            ConstValue::Null,
            vec![GraphqlError::new("boom", ErrorCode::ResolverError)],
        );
        assert!(!response.is_ok());
        assert_eq!(response.status_code(), http::StatusCode::OK);
    }
}
