mod error;

use std::{
    any::Any,
    collections::HashMap,
    future::{Future, IntoFuture},
    sync::{Arc, OnceLock},
};

use async_graphql_parser::{
    types::{Field, FragmentDefinition, OperationDefinition},
    Positioned,
};
use async_graphql_value::{ConstValue, Name};
use futures::{
    future::{self, BoxFuture, Either},
    stream::BoxStream,
    FutureExt,
};
use indexmap::IndexMap;

pub use error::Error;

use crate::{
    execution::QueryPath,
    schema::{ObjectType, Schema, TypeRef},
    value::FieldValue,
    Variables,
};

pub type ResolverResult = Result<FieldValue, Error>;

/// Coerced argument values of a field.
pub type Arguments = IndexMap<Name, ConstValue>;

/// Lazily produced payloads of a subscription. Dropping it must release the underlying source.
pub type EventStream = BoxStream<'static, Result<FieldValue, Error>>;

/// Outcome of a resolver: either already available or still pending.
pub enum Resolution<'a> {
    Ready(ResolverResult),
    Pending(BoxFuture<'a, ResolverResult>),
}

pub type ResolutionFuture<'a> = Either<future::Ready<ResolverResult>, BoxFuture<'a, ResolverResult>>;

impl<'a> Resolution<'a> {
    pub fn ok(value: impl Into<FieldValue>) -> Self {
        Resolution::Ready(Ok(value.into()))
    }

    pub fn null() -> Self {
        Resolution::Ready(Ok(FieldValue::NULL))
    }

    pub fn err(error: impl Into<Error>) -> Self {
        Resolution::Ready(Err(error.into()))
    }

    /// An asynchronous resolution.
    pub fn from_future<F, T, E>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'a,
        T: Into<FieldValue>,
        E: Into<Error>,
    {
        Resolution::Pending(future.map(|result| result.map(Into::into).map_err(Into::into)).boxed())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Resolution::Ready(_))
    }

    /// Transforms the eventual result without forcing a pending resolution.
    pub fn map<F>(self, f: F) -> Self
    where
        F: FnOnce(ResolverResult) -> ResolverResult + Send + 'a,
    {
        match self {
            Resolution::Ready(result) => Resolution::Ready(f(result)),
            Resolution::Pending(future) => Resolution::Pending(future.map(f).boxed()),
        }
    }
}

impl<'a> IntoFuture for Resolution<'a> {
    type Output = ResolverResult;
    type IntoFuture = ResolutionFuture<'a>;

    fn into_future(self) -> Self::IntoFuture {
        match self {
            Resolution::Ready(result) => Either::Left(future::ready(result)),
            Resolution::Pending(future) => Either::Right(future),
        }
    }
}

impl<T: Into<FieldValue>, E: Into<Error>> From<Result<T, E>> for Resolution<'_> {
    fn from(result: Result<T, E>) -> Self {
        Resolution::Ready(result.map(Into::into).map_err(Into::into))
    }
}

/// Per field information handed to resolvers.
pub struct ResolveInfo<'a> {
    pub field_name: &'a str,
    pub field_nodes: &'a [&'a Positioned<Field>],
    pub return_type: &'a TypeRef,
    pub parent_type: &'a ObjectType,
    pub path: &'a QueryPath,
    pub schema: &'a Schema,
    pub fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    pub root_value: &'a FieldValue,
    pub operation: &'a Positioned<OperationDefinition>,
    pub variables: &'a Variables,
}

/// Everything a resolver receives: the parent value, its arguments, the field information and the
/// request context.
#[derive(Clone, Copy)]
pub struct ResolverContext<'a> {
    pub parent: &'a FieldValue,
    pub args: &'a Arguments,
    pub info: &'a ResolveInfo<'a>,
    pub context: &'a (dyn Any + Send + Sync),
}

impl<'a> ResolverContext<'a> {
    pub fn arg(&self, name: &str) -> Option<&'a ConstValue> {
        self.args.get(name)
    }

    /// The request context downcast to its concrete type.
    pub fn data<T: Any + Send + Sync>(&self) -> Option<&'a T> {
        self.context.downcast_ref()
    }

    pub fn parent_source<T: crate::DataSource + 'static>(&self) -> Option<&'a T> {
        self.parent.downcast_ref()
    }
}

type ResolverFn = dyn for<'r> Fn(ResolverContext<'r>) -> Resolution<'r> + Send + Sync;

/// Produces the raw value of a field from its parent value, arguments and context.
#[derive(Clone)]
pub struct FieldResolver(Arc<ResolverFn>);

impl FieldResolver {
    pub fn new<F>(resolver: F) -> Self
    where
        F: for<'r> Fn(ResolverContext<'r>) -> Resolution<'r> + Send + Sync + 'static,
    {
        FieldResolver(Arc::new(resolver))
    }

    pub fn call<'r>(&self, ctx: ResolverContext<'r>) -> Resolution<'r> {
        (self.0)(ctx)
    }

    /// Identity of the underlying function, shared by clones.
    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    /// Reads the field from the parent value: a key of an object value, a field of a
    /// [`DataSource`](crate::DataSource) or null.
    pub fn default_resolver() -> FieldResolver {
        static DEFAULT: OnceLock<FieldResolver> = OnceLock::new();
        DEFAULT
            .get_or_init(|| {
                FieldResolver::new(|ctx| {
                    Resolution::Ready(Ok(ctx.parent.field(ctx.info.field_name).unwrap_or_default()))
                })
            })
            .clone()
    }
}

impl std::fmt::Debug for FieldResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FieldResolver").field(&self.id()).finish()
    }
}

type SubscriberFn = dyn for<'r> Fn(ResolverContext<'r>) -> Result<EventStream, Error> + Send + Sync;

/// Creates the event source of a subscription field.
#[derive(Clone)]
pub struct Subscriber(Arc<SubscriberFn>);

impl Subscriber {
    pub fn new<F>(subscriber: F) -> Self
    where
        F: for<'r> Fn(ResolverContext<'r>) -> Result<EventStream, Error> + Send + Sync + 'static,
    {
        Subscriber(Arc::new(subscriber))
    }

    pub fn call(&self, ctx: ResolverContext<'_>) -> Result<EventStream, Error> {
        (self.0)(ctx)
    }
}

type TypeResolverFn = dyn Fn(&FieldValue, &ResolveInfo<'_>, &str) -> Option<String> + Send + Sync;

/// Picks the concrete object type of a value returned for an interface or union.
///
/// Receives the value, the field information and the name of the abstract type.
#[derive(Clone)]
pub struct TypeResolver(Arc<TypeResolverFn>);

impl TypeResolver {
    pub fn new(resolver: impl Fn(&FieldValue, &ResolveInfo<'_>, &str) -> Option<String> + Send + Sync + 'static) -> Self {
        TypeResolver(Arc::new(resolver))
    }

    pub fn resolve(&self, value: &FieldValue, info: &ResolveInfo<'_>, abstract_type: &str) -> Option<String> {
        (self.0)(value, info, abstract_type)
    }

    /// Uses, in order: an explicit type marker, [`DataSource::type_name`](crate::DataSource::type_name),
    /// a `__typename` key and finally the first possible type whose `is_type_of` accepts the value.
    pub fn default_resolver() -> TypeResolver {
        TypeResolver::new(default_resolve_type)
    }
}

fn default_resolve_type(value: &FieldValue, info: &ResolveInfo<'_>, abstract_type: &str) -> Option<String> {
    if let Some(name) = value.type_marker() {
        return Some(name.to_string());
    }
    match value.untyped() {
        FieldValue::Object(source) => {
            if let Some(name) = source.type_name() {
                return Some(name.to_string());
            }
        }
        FieldValue::Value(ConstValue::Object(map)) => {
            if let Some(ConstValue::String(name)) = map.get("__typename") {
                return Some(name.clone());
            }
        }
        _ => {}
    }
    info.schema
        .possible_types(abstract_type)
        .find(|object| object.is_type_of.as_ref().is_some_and(|is_type_of| is_type_of(value)))
        .map(|object| object.name.to_string())
}
