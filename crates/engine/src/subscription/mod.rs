mod pubsub;

use std::sync::Arc;

use async_graphql_parser::types::{ExecutableDocument, OperationType};
use async_graphql_value::ConstValue;
use error::{ErrorCode, GraphqlError};
use futures::{future, stream::BoxStream, StreamExt};

pub use pubsub::{EventSubscription, PubSub};

use crate::{
    execution::{coercion::coerce_arguments, field::resolver_error, location, ExecutionContext, QueryPath},
    resolver::{Arguments, EventStream, ResolveInfo, ResolverContext, Subscriber},
    value::FieldValue,
    ExecutionParams, Response, Schema,
};

/// Subscribes to the event source of a subscription operation.
///
/// Each event runs the selection set of the operation with the event payload as root value, one
/// event at a time, in the order they were emitted. Request errors and failures to create the event
/// source produce a single response, after which the stream ends. Dropping the stream drops the
/// event source.
///
/// Queries and mutations are executed once and produce a single response.
pub fn subscribe<'a>(
    schema: &'a Schema,
    document: &'a ExecutableDocument,
    params: ExecutionParams,
) -> BoxStream<'a, Response> {
    async_stream::stream! {
        let ctx = match ExecutionContext::build(schema, document, params) {
            Ok(ctx) => ctx,
            Err(errors) => {
                tracing::debug!("Subscription request failed before execution");
                yield Response::request_error(errors);
                return;
            }
        };

        if ctx.operation.node.ty != OperationType::Subscription {
            let data = ctx.execute_operation().await;
            yield ctx.into_response(data);
            return;
        }

        let (path, mut events) = match ctx.create_event_stream() {
            Ok(events) => events,
            Err(error) => {
                tracing::debug!("Failed to create the subscription event stream: {error}");
                yield Response::new(ConstValue::Null, vec![error])
                    .with_exposed_causes(schema.config().expose_error_causes);
                return;
            }
        };

        while let Some(event) = events.next().await {
            match event {
                Ok(payload) => {
                    let event_ctx = ctx.for_event(payload);
                    let data = event_ctx.execute_operation().await;
                    yield event_ctx.into_response(data);
                }
                Err(error) => {
                    let error = resolver_error(error).with_path(path.to_error_path());
                    yield Response::new(ConstValue::Null, vec![error])
                        .with_exposed_causes(schema.config().expose_error_causes);
                }
            }
        }
        tracing::debug!("Subscription stream ended");
    }
    .boxed()
}

impl ExecutionContext<'_> {
    /// Calls the subscriber of the single root field of the operation.
    fn create_event_stream(&self) -> Result<(QueryPath, EventStream), GraphqlError> {
        let root_type = self.root_type();
        let fields = self.collect_fields(root_type, [&self.operation.node.selection_set]);
        let field_count = fields.len();
        let Some((response_key, field_nodes)) = fields.into_iter().next() else {
            return Err(GraphqlError::new(
                "Subscription must select one top level field.",
                ErrorCode::BadRequest,
            ));
        };
        if field_count > 1 {
            // Documents are expected to be validated, which rejects this.
            tracing::debug!("Subscription selects {field_count} root fields, only '{response_key}' is subscribed to");
        }

        let field_node = field_nodes[0];
        let field_name = &field_node.node.name.node;
        let path = QueryPath::empty().field(response_key, &root_type.name);
        let located = |error: GraphqlError| {
            error
                .with_locations(field_nodes.iter().map(|node| location(node.pos)))
                .with_path(path.to_error_path())
        };

        let Some(definition) = root_type.get_field(field_name) else {
            return Err(located(GraphqlError::new(
                format!("The subscription field '{field_name}' is not defined."),
                ErrorCode::BadRequest,
            )));
        };
        let Some(subscriber) = &definition.subscriber else {
            return Err(located(GraphqlError::new(
                format!("Subscription field '{field_name}' has no subscriber."),
                ErrorCode::InternalServerError,
            )));
        };

        let arguments = coerce_arguments(self.schema, definition, field_node, &self.variables)
            .map_err(|error| error.with_path(path.to_error_path()))?;
        let info = ResolveInfo {
            field_name,
            field_nodes: &field_nodes,
            return_type: &definition.ty,
            parent_type: root_type,
            path: &path,
            schema: self.schema,
            fragments: self.fragments,
            root_value: &self.root_value,
            operation: self.operation,
            variables: &self.variables,
        };
        let ctx = ResolverContext {
            parent: &self.root_value,
            args: &arguments,
            info: &info,
            context: &*self.context,
        };

        match subscriber.call(ctx) {
            Ok(events) => Ok((path.clone(), events)),
            Err(error) => Err(located(resolver_error(error))),
        }
    }
}

/// Only lets through the events of `subscriber` for which `predicate(payload, arguments)` holds.
///
/// Errors of the event source are always delivered.
pub fn with_filter<P>(subscriber: Subscriber, predicate: P) -> Subscriber
where
    P: Fn(&FieldValue, &Arguments) -> bool + Send + Sync + 'static,
{
    let predicate = Arc::new(predicate);
    Subscriber::new(move |ctx| {
        let events = subscriber.call(ctx)?;
        let arguments = ctx.args.clone();
        let predicate = predicate.clone();
        Ok(events
            .filter(move |event| {
                future::ready(match event {
                    Ok(payload) => predicate(payload, &arguments),
                    Err(_) => true,
                })
            })
            .boxed())
    })
}
