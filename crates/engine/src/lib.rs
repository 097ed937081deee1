//! A GraphQL query execution engine.
//!
//! A [`Schema`] is assembled once with a [`SchemaBuilder`] and then shared by every request.
//! [`execute`] evaluates a parsed operation against it, invoking field resolvers, completing their
//! values against the declared types and propagating nulls on errors. [`subscribe`] does the same
//! once per event of a subscription's event source.
#![deny(unused_crate_dependencies)]

mod execution;
mod middleware;
mod request;
mod resolver;
mod response;
mod schema;
mod subscription;
mod value;
mod variables;
pub mod websocket;

pub use async_graphql_parser::{parse_query, types::ExecutableDocument, Pos, Positioned};
pub use async_graphql_value::{ConstValue, Name, Number};
pub use config::Config;
pub use error::{ErrorCode, ErrorPath, ErrorPathSegment, GraphqlError, Location};

pub use execution::{
    execute, Execution, ExecutionError, ExecutionParams, InputValueError, PathSegment, QueryPath, ValueKind,
};
pub use middleware::{FieldMiddleware, Interceptor, MiddlewareManager, MiddlewareManagerBuilder, Next};
pub use request::Request;
pub use resolver::{
    Arguments, Error, EventStream, FieldResolver, ResolveInfo, Resolution, ResolutionFuture, ResolverContext,
    ResolverResult, Subscriber, TypeResolver,
};
pub use response::Response;
pub use schema::{
    EnumType, EnumValue, FieldDefinition, InputObjectType, InputValueDefinition, InterfaceType, IsTypeOf, MetaType,
    ObjectType, ScalarParseError, ScalarType, Schema, SchemaBuilder, SchemaError, TypeKind, TypeRef, UnionType,
};
pub use subscription::{subscribe, with_filter, EventSubscription, PubSub};
pub use value::{DataSource, FieldValue};
pub use variables::Variables;

#[cfg(test)]
use {indoc as _, insta as _, pretty_assertions as _, rstest as _, tokio as _};
