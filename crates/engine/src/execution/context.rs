use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use async_graphql_parser::{
    types::{DocumentOperations, ExecutableDocument, FragmentDefinition, OperationDefinition, OperationType},
    Positioned,
};
use async_graphql_value::Name;
use error::{ErrorCode, GraphqlError};

use super::{coercion::coerce_variable_values, ExecutionParams};
use crate::{
    middleware::ComposedChains,
    resolver::{FieldResolver, TypeResolver},
    schema::{ObjectType, Schema},
    value::FieldValue,
    Response, Variables,
};

/// Failures preventing an operation from being executed at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error("Unknown operation named '{0}'.")]
    UnknownOperation(String),
    #[error("Must provide operation name if query contains multiple operations.")]
    MissingOperationName,
    #[error("Must provide an operation.")]
    NoOperation,
    #[error("Schema is not configured to execute {0} operation.")]
    UnsupportedOperation(OperationType),
    #[error("Too many errors processing variables, error limit reached. Execution aborted.")]
    TooManyVariableErrors,
}

impl ExecutionError {
    fn into_graphql_error(self) -> GraphqlError {
        let code = match self {
            ExecutionError::UnsupportedOperation(_) => ErrorCode::BadRequest,
            ExecutionError::TooManyVariableErrors => ErrorCode::VariableError,
            _ => ErrorCode::OperationSelectionError,
        };
        GraphqlError::new(self.to_string(), code)
    }
}

/// State of a single execution, shared by every field of the operation.
///
/// Only the error list is written to while fields are resolved.
pub(crate) struct ExecutionContext<'a> {
    pub(crate) schema: &'a Schema,
    pub(crate) fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    pub(crate) operation: &'a Positioned<OperationDefinition>,
    pub(crate) operation_name: Option<&'a str>,
    pub(crate) root_value: FieldValue,
    pub(crate) context: Arc<dyn Any + Send + Sync>,
    pub(crate) variables: Variables,
    pub(crate) field_resolver: FieldResolver,
    pub(crate) type_resolver: TypeResolver,
    pub(crate) middleware: Option<Arc<ComposedChains>>,
    /// Set while executing the operation for one subscription event.
    pub(crate) is_event: bool,
    errors: Mutex<Vec<GraphqlError>>,
}

impl<'a> ExecutionContext<'a> {
    pub(crate) fn build(
        schema: &'a Schema,
        document: &'a ExecutableDocument,
        params: ExecutionParams,
    ) -> Result<Self, Vec<GraphqlError>> {
        let (operation_name, operation) = select_operation(document, params.operation_name.as_deref())
            .map_err(|err| vec![err.into_graphql_error()])?;

        let supported = match operation.node.ty {
            OperationType::Query => true,
            OperationType::Mutation => schema.mutation_type().is_some(),
            OperationType::Subscription => schema.subscription_type().is_some(),
        };
        if !supported {
            return Err(vec![ExecutionError::UnsupportedOperation(operation.node.ty).into_graphql_error()]);
        }

        let variables = coerce_variable_values(schema, &operation.node.variable_definitions, params.variables)?;

        if let Some(middleware) = &params.middleware {
            middleware.warn_unknown_keys(schema);
        }

        Ok(ExecutionContext {
            schema,
            fragments: &document.fragments,
            operation,
            operation_name,
            root_value: params.root_value,
            context: params.context.unwrap_or_else(|| Arc::new(())),
            variables,
            field_resolver: params.field_resolver.unwrap_or_else(FieldResolver::default_resolver),
            type_resolver: params.type_resolver.unwrap_or_else(TypeResolver::default_resolver),
            middleware: params.middleware.map(|manager| Arc::new(ComposedChains::new(manager))),
            is_event: false,
            errors: Mutex::default(),
        })
    }

    /// A fresh context to execute the operation for one subscription event.
    pub(crate) fn for_event(&self, payload: FieldValue) -> Self {
        ExecutionContext {
            schema: self.schema,
            fragments: self.fragments,
            operation: self.operation,
            operation_name: self.operation_name,
            root_value: payload,
            context: self.context.clone(),
            variables: self.variables.clone(),
            field_resolver: self.field_resolver.clone(),
            type_resolver: self.type_resolver.clone(),
            middleware: self.middleware.clone(),
            is_event: true,
            errors: Mutex::default(),
        }
    }

    pub(crate) fn root_type(&self) -> &'a ObjectType {
        let schema = self.schema;
        let root = match self.operation.node.ty {
            OperationType::Query => Some(schema.query_type()),
            OperationType::Mutation => schema.mutation_type(),
            OperationType::Subscription => schema.subscription_type(),
        };
        // Checked when the context was built.
        root.unwrap_or_else(|| schema.query_type())
    }

    pub(crate) fn add_error(&self, error: GraphqlError) {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner).push(error);
    }

    pub(crate) fn into_response(self, data: async_graphql_value::ConstValue) -> Response {
        let errors = self.errors.into_inner().unwrap_or_else(PoisonError::into_inner);
        Response::new(data, errors).with_exposed_causes(self.schema.config().expose_error_causes)
    }
}

fn select_operation<'a>(
    document: &'a ExecutableDocument,
    operation_name: Option<&str>,
) -> Result<(Option<&'a str>, &'a Positioned<OperationDefinition>), ExecutionError> {
    match (&document.operations, operation_name) {
        (DocumentOperations::Single(operation), None) => Ok((None, operation)),
        (DocumentOperations::Single(_), Some(name)) => Err(ExecutionError::UnknownOperation(name.to_string())),
        (DocumentOperations::Multiple(operations), Some(name)) => operations
            .get_key_value(name)
            .map(|(name, operation)| (Some(name.as_str()), operation))
            .ok_or_else(|| ExecutionError::UnknownOperation(name.to_string())),
        (DocumentOperations::Multiple(operations), None) => {
            let mut operations = operations.iter();
            match (operations.next(), operations.next()) {
                (Some((name, operation)), None) => Ok((Some(name.as_str()), operation)),
                (Some(_), Some(_)) => Err(ExecutionError::MissingOperationName),
                (None, _) => Err(ExecutionError::NoOperation),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_graphql_parser::parse_query;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::anonymous("{ a }", None, Ok(None))]
    #[case::single_named("query A { a }", None, Ok(Some("A")))]
    #[case::named("query A { a } query B { a }", Some("B"), Ok(Some("B")))]
    #[case::unknown_name("query A { a } query B { a }", Some("C"), Err(ExecutionError::UnknownOperation("C".into())))]
    #[case::name_for_anonymous("{ a }", Some("A"), Err(ExecutionError::UnknownOperation("A".into())))]
    #[case::ambiguous("query A { a } query B { a }", None, Err(ExecutionError::MissingOperationName))]
    fn operation_selection(
        #[case] query: &str,
        #[case] operation_name: Option<&str>,
        #[case] expected: Result<Option<&str>, ExecutionError>,
    ) {
        let document = parse_query(query).unwrap();
        let selected = select_operation(&document, operation_name).map(|(name, _)| name);
        assert_eq!(selected, expected);
    }

    #[test]
    fn no_operation() {
        let document = ExecutableDocument {
            operations: DocumentOperations::Multiple(HashMap::new()),
            fragments: HashMap::new(),
        };
        let error = select_operation(&document, None).map(|(name, _)| name).unwrap_err();
        assert_eq!(error.to_string(), "Must provide an operation.");
        assert_eq!(
            ExecutionError::UnknownOperation("Foo".into()).to_string(),
            "Unknown operation named 'Foo'."
        );
    }
}
