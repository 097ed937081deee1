#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::AsRefStr,
    strum::IntoStaticStr,
    strum::FromRepr,
    strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    BadRequest,
    InternalServerError,
    // Operation preparation phases
    OperationParsingError,
    OperationSelectionError,
    VariableError,
    // Field level
    ArgumentError,
    ResolverError,
    ValueCompletionError,
    TypeResolutionError,
}

impl From<ErrorCode> for http::StatusCode {
    fn from(code: ErrorCode) -> http::StatusCode {
        code.into_http_status_code_with_priority().0
    }
}

impl ErrorCode {
    /// Errors raised before any resolver runs. Their presence means the operation was never executed.
    pub fn is_request_fatal(self) -> bool {
        matches!(
            self,
            ErrorCode::BadRequest
                | ErrorCode::OperationParsingError
                | ErrorCode::OperationSelectionError
                | ErrorCode::VariableError
        )
    }

    pub fn into_http_status_code_with_priority(self) -> (http::StatusCode, usize) {
        match self {
            ErrorCode::OperationParsingError
            | ErrorCode::OperationSelectionError
            | ErrorCode::VariableError
            | ErrorCode::BadRequest => (http::StatusCode::BAD_REQUEST, 1000),
            // Field errors are part of a successful GraphQL response.
            ErrorCode::ArgumentError
            | ErrorCode::ResolverError
            | ErrorCode::ValueCompletionError
            | ErrorCode::TypeResolutionError => (http::StatusCode::OK, 100),
            ErrorCode::InternalServerError => (http::StatusCode::INTERNAL_SERVER_ERROR, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::ErrorCode;

    #[test]
    fn santity_check_discriminant() {
        for value in ErrorCode::iter() {
            assert_eq!(value, ErrorCode::from_repr(value as usize).unwrap());
        }
    }

    #[test]
    fn request_fatal_errors_are_bad_requests() {
        for value in ErrorCode::iter() {
            let status = http::StatusCode::from(value);
            assert_eq!(value.is_request_fatal(), status == http::StatusCode::BAD_REQUEST, "{value}");
        }
    }

    #[test]
    fn display_matches_serialization() {
        assert_eq!(ErrorCode::VariableError.to_string(), "VARIABLE_ERROR");
        assert_eq!(
            serde_json::to_value(ErrorCode::TypeResolutionError).unwrap(),
            serde_json::json!("TYPE_RESOLUTION_ERROR")
        );
    }
}
