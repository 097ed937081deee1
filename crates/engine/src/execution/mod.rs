pub(crate) mod coercion;
mod collect;
mod complete;
pub(crate) mod context;
pub(crate) mod field;
mod path;

use std::{
    any::Any,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use async_graphql_parser::{types::ExecutableDocument, Pos};
use error::Location;
use futures::{future::BoxFuture, task::noop_waker_ref, FutureExt};
use itertools::Itertools;
use tracing::Instrument;

pub use coercion::{InputValueError, ValueKind};
pub(crate) use context::ExecutionContext;
pub use context::ExecutionError;
pub use path::{PathSegment, QueryPath};

use crate::{
    middleware::{Interceptor, MiddlewareManager},
    resolver::{FieldResolver, TypeResolver},
    value::FieldValue,
    Request, Response, Schema, Variables,
};

/// Everything an execution needs besides the schema and the document.
#[derive(Default)]
pub struct ExecutionParams {
    pub(crate) root_value: FieldValue,
    pub(crate) context: Option<Arc<dyn Any + Send + Sync>>,
    pub(crate) variables: Variables,
    pub(crate) operation_name: Option<String>,
    pub(crate) field_resolver: Option<FieldResolver>,
    pub(crate) type_resolver: Option<TypeResolver>,
    pub(crate) middleware: Option<Arc<MiddlewareManager>>,
}

impl ExecutionParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn root_value(mut self, root_value: impl Into<FieldValue>) -> Self {
        self.root_value = root_value.into();
        self
    }

    /// Value handed to every resolver, see [`ResolverContext::data`](crate::ResolverContext::data).
    #[must_use]
    pub fn context(mut self, context: impl Any + Send + Sync) -> Self {
        self.context = Some(Arc::new(context));
        self
    }

    #[must_use]
    pub fn variables(mut self, variables: Variables) -> Self {
        self.variables = variables;
        self
    }

    #[must_use]
    pub fn operation_name(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    /// Resolver used for fields without one of their own.
    #[must_use]
    pub fn field_resolver(mut self, resolver: FieldResolver) -> Self {
        self.field_resolver = Some(resolver);
        self
    }

    /// Type resolver used for abstract types without one of their own.
    #[must_use]
    pub fn type_resolver(mut self, resolver: TypeResolver) -> Self {
        self.type_resolver = Some(resolver);
        self
    }

    /// The manager can be shared between requests. Chains are composed once per execution.
    #[must_use]
    pub fn middleware(mut self, middleware: impl Into<Arc<MiddlewareManager>>) -> Self {
        self.middleware = Some(middleware.into());
        self
    }

    /// Interceptors applied to every field.
    #[must_use]
    pub fn interceptors(self, interceptors: Vec<Interceptor>) -> Self {
        self.middleware(MiddlewareManager::from(interceptors))
    }
}

impl From<Request> for ExecutionParams {
    fn from(request: Request) -> Self {
        ExecutionParams {
            context: request.context,
            variables: request.variables,
            operation_name: request.operation_name,
            ..Default::default()
        }
    }
}

/// The result of [`execute`]: available right away when every resolver was synchronous.
pub enum Execution<'a> {
    Ready(Response),
    Pending(BoxFuture<'a, Response>),
}

impl<'a> Execution<'a> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Execution::Ready(_))
    }

    /// The response if no resolver had to wait.
    pub fn into_ready(self) -> Result<Response, Self> {
        match self {
            Execution::Ready(response) => Ok(response),
            pending => Err(pending),
        }
    }
}

impl Future for Execution<'_> {
    type Output = Response;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Response> {
        match self.get_mut() {
            Execution::Ready(response) => Poll::Ready(std::mem::take(response)),
            Execution::Pending(future) => future.poll_unpin(cx),
        }
    }
}

/// Executes an operation of a document.
///
/// The operation starts running immediately: resolvers returning ready values are all invoked
/// before this function returns, and the execution is [`Execution::Ready`] if none of them was
/// pending. Request errors, such as an unknown operation or invalid variables, always give a
/// ready response without invoking any resolver.
pub fn execute<'a>(schema: &'a Schema, document: &'a ExecutableDocument, params: ExecutionParams) -> Execution<'a> {
    let ctx = match ExecutionContext::build(schema, document, params) {
        Ok(ctx) => ctx,
        Err(errors) => {
            tracing::debug!(
                "Request failed before execution: {}",
                errors.iter().map(|error| &error.message).join(", ")
            );
            return Execution::Ready(Response::request_error(errors));
        }
    };

    let span = tracing::debug_span!(
        "execute",
        "operation.name" = ctx.operation_name,
        "operation.type" = %ctx.operation.node.ty,
    );
    let mut future = async move {
        let data = ctx.execute_operation().await;
        ctx.into_response(data)
    }
    .instrument(span)
    .boxed();

    match future.poll_unpin(&mut Context::from_waker(noop_waker_ref())) {
        Poll::Ready(response) => Execution::Ready(response),
        Poll::Pending => Execution::Pending(future),
    }
}

pub(crate) fn location(pos: Pos) -> Location {
    Location::new(
        u32::try_from(pos.line).unwrap_or(u32::MAX),
        u32::try_from(pos.column).unwrap_or(u32::MAX),
    )
}
