use std::{
    panic::AssertUnwindSafe,
    sync::OnceLock,
};

use async_graphql_parser::{
    types::{Field, OperationType},
    Positioned,
};
use async_graphql_value::{ConstValue, Name};
use error::{ErrorCode, GraphqlError};
use futures::{
    future::{self, BoxFuture},
    FutureExt,
};
use indexmap::IndexMap;

use super::{coercion::coerce_arguments, collect::GroupedFields, location, ExecutionContext, QueryPath};
use crate::{
    resolver::{Error, FieldResolver, Resolution, ResolveInfo, ResolverContext, ResolverResult},
    schema::{ObjectType, TypeRef},
    value::FieldValue,
};

pub(super) type CompletionResult = Result<ConstValue, GraphqlError>;

impl<'a> ExecutionContext<'a> {
    /// Resolves the root fields of the operation.
    ///
    /// A failure bubbling up to the root nulls the whole response data.
    pub(crate) async fn execute_operation(&self) -> ConstValue {
        let root_type = self.root_type();
        let fields = self.collect_fields(root_type, [&self.operation.node.selection_set]);
        let serial = self.operation.node.ty == OperationType::Mutation && self.schema.config().serial_mutations;

        match self
            .execute_fields(root_type, &self.root_value, QueryPath::empty(), fields, serial)
            .await
        {
            Ok(data) => data,
            Err(error) => {
                self.add_error(error);
                ConstValue::Null
            }
        }
    }

    /// Resolves grouped fields against their parent value.
    ///
    /// Fields run concurrently unless `serial` is set, and the result keeps the document order
    /// either way. An error is returned only when a non-null field failed, with the error left for
    /// the nearest nullable ancestor to record. Other non-null failures among concurrent siblings
    /// are recorded here.
    pub(super) fn execute_fields<'f>(
        &'f self,
        object_type: &'f ObjectType,
        parent: &'f FieldValue,
        path: QueryPath,
        fields: GroupedFields<'f>,
        serial: bool,
    ) -> BoxFuture<'f, CompletionResult>
    where
        'a: 'f,
    {
        async move {
            let mut results = Vec::with_capacity(fields.len());
            if serial {
                for (response_key, field_nodes) in fields {
                    let value = self
                        .execute_field(object_type, parent, &path, response_key, field_nodes)
                        .await?;
                    results.push((response_key, value));
                }
            } else {
                let futures = fields.into_iter().map(|(response_key, field_nodes)| {
                    self.execute_field(object_type, parent, &path, response_key, field_nodes)
                        .map(move |value| value.map(|value| (response_key, value)))
                });
                let mut bubbled = None;
                for result in future::join_all(futures).await {
                    match result {
                        Ok(entry) => results.push(entry),
                        Err(error) if bubbled.is_none() => bubbled = Some(error),
                        Err(error) => self.add_error(error),
                    }
                }
                if let Some(error) = bubbled {
                    return Err(error);
                }
            }

            let object = results
                .into_iter()
                .map(|(response_key, value)| (response_key.clone(), value))
                .collect::<IndexMap<Name, ConstValue>>();
            Ok(ConstValue::Object(object))
        }
        .boxed()
    }

    async fn execute_field<'f>(
        &'f self,
        object_type: &'f ObjectType,
        parent: &'f FieldValue,
        parent_path: &'f QueryPath,
        response_key: &'f Name,
        field_nodes: Vec<&'f Positioned<Field>>,
    ) -> CompletionResult
    where
        'a: 'f,
    {
        let field_node = field_nodes[0];
        let field_name = &field_node.node.name.node;
        let path = parent_path.field(response_key, &object_type.name);
        let located = |error: GraphqlError| {
            error
                .with_locations(field_nodes.iter().map(|node| location(node.pos)))
                .with_path(path.to_error_path())
        };

        if field_name == "__typename" {
            return Ok(ConstValue::String(object_type.name.to_string()));
        }

        let Some(definition) = object_type.get_field(field_name) else {
            self.add_error(located(GraphqlError::new(
                format!("Field '{field_name}' is not defined on type '{}'.", object_type.name),
                ErrorCode::InternalServerError,
            )));
            return Ok(ConstValue::Null);
        };

        let resolver = match &definition.resolver {
            Some(resolver) => resolver,
            None if self.is_event && parent_path.is_empty() => event_payload_resolver(),
            None => &self.field_resolver,
        };
        let resolver = match &self.middleware {
            Some(middleware) => middleware.wrap(&object_type.name, field_name, resolver),
            None => resolver.clone(),
        };

        let arguments = match coerce_arguments(self.schema, definition, field_node, &self.variables) {
            Ok(arguments) => arguments,
            Err(error) => return self.handle_field_error(error.with_path(path.to_error_path()), &definition.ty),
        };

        let info = ResolveInfo {
            field_name,
            field_nodes: &field_nodes,
            return_type: &definition.ty,
            parent_type: object_type,
            path: &path,
            schema: self.schema,
            fragments: self.fragments,
            root_value: &self.root_value,
            operation: self.operation,
            variables: &self.variables,
        };
        let ctx = ResolverContext {
            parent,
            args: &arguments,
            info: &info,
            context: &*self.context,
        };

        tracing::trace!("Resolving {path}");
        let value = match self.invoke(&resolver, ctx).await {
            Ok(value) => value,
            Err(error) => return self.handle_field_error(located(resolver_error(error)), &definition.ty),
        };

        match self.complete_value(&definition.ty, &info, value).await {
            Ok(value) => Ok(value),
            Err(error) => self.handle_field_error(error, &definition.ty),
        }
    }

    /// Calls a resolver, turning panics into errors unless configured otherwise.
    async fn invoke(&self, resolver: &FieldResolver, ctx: ResolverContext<'_>) -> ResolverResult {
        if !self.schema.config().catch_resolver_panics {
            return resolver.call(ctx).await;
        }

        let resolution = match std::panic::catch_unwind(AssertUnwindSafe(|| resolver.call(ctx))) {
            Ok(resolution) => resolution,
            Err(_) => return Err(panicked(ctx.info.path)),
        };
        match resolution {
            Resolution::Ready(result) => result,
            Resolution::Pending(future) => AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(panicked(ctx.info.path))),
        }
    }

    /// Records the error and substitutes null if the type allows it, or leaves both to the parent.
    pub(super) fn handle_field_error(&self, error: GraphqlError, ty: &TypeRef) -> CompletionResult {
        if ty.is_non_null() {
            return Err(error);
        }
        self.add_error(error);
        Ok(ConstValue::Null)
    }
}

pub(crate) fn resolver_error(error: Error) -> GraphqlError {
    let mut graphql_error = GraphqlError::new(error.message, ErrorCode::ResolverError).with_extensions(error.extensions);
    if let Some(source) = error.source {
        graphql_error = graphql_error.with_cause(source);
    }
    graphql_error
}

fn panicked(path: &QueryPath) -> Error {
    tracing::error!("Resolver of {path} panicked");
    Error::new("Resolver panicked")
}

/// The root field of a subscription event resolves to the event payload itself.
fn event_payload_resolver() -> &'static FieldResolver {
    static RESOLVER: OnceLock<FieldResolver> = OnceLock::new();
    RESOLVER.get_or_init(|| FieldResolver::new(|ctx| Resolution::ok(ctx.parent.clone())))
}
