mod builder;
mod meta;
pub(crate) mod scalars;
mod type_ref;

use std::{collections::HashMap, ops::Deref, sync::Arc};

use async_graphql_value::Name;
use futures::{future::BoxFuture, stream::BoxStream, FutureExt, StreamExt};
use indexmap::{IndexMap, IndexSet};

pub use builder::{SchemaBuilder, SchemaError};
pub use meta::*;
pub use scalars::ScalarParseError;
pub use type_ref::TypeRef;

use crate::{ExecutionParams, Request, Response};

/// An immutable GraphQL schema: named types, root operation types and resolvers.
///
/// Cheap to clone and safe to share between concurrent requests.
#[derive(Clone)]
pub struct Schema(Arc<SchemaInner>);

pub struct SchemaInner {
    pub(crate) types: IndexMap<Name, MetaType>,
    pub(crate) query_type: Name,
    pub(crate) mutation_type: Option<Name>,
    pub(crate) subscription_type: Option<Name>,
    pub(crate) possible_types: HashMap<Name, IndexSet<Name>>,
    pub(crate) config: config::Config,
}

impl Deref for Schema {
    type Target = SchemaInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Schema {
    /// Create a schema builder with the given root operation types.
    pub fn build(query: impl AsRef<str>, mutation: Option<&str>, subscription: Option<&str>) -> SchemaBuilder {
        SchemaBuilder::new(query, mutation, subscription)
    }

    /// Parses and executes a request.
    pub fn execute(&self, request: impl Into<Request>) -> BoxFuture<'static, Response> {
        let schema = self.clone();
        let request = request.into();
        async move {
            let document = match request.parse() {
                Ok(document) => document,
                Err(response) => return response,
            };
            crate::execute(&schema, &document, ExecutionParams::from(request)).await
        }
        .boxed()
    }

    /// Parses and executes a subscription request, producing one response per event.
    pub fn execute_stream(&self, request: impl Into<Request>) -> BoxStream<'static, Response> {
        let schema = self.clone();
        let request = request.into();
        async_stream::stream! {
            let document = match request.parse() {
                Ok(document) => document,
                Err(response) => {
                    yield response;
                    return;
                }
            };
            let mut responses = crate::subscribe(&schema, &document, ExecutionParams::from(request));
            while let Some(response) = responses.next().await {
                yield response;
            }
        }
        .boxed()
    }
}

impl SchemaInner {
    pub fn config(&self) -> &config::Config {
        &self.config
    }

    pub fn types(&self) -> impl Iterator<Item = &MetaType> {
        self.types.values()
    }

    pub fn get_type(&self, name: &str) -> Option<&MetaType> {
        self.types.get(name)
    }

    /// The type left once all list and non-null wrappers are stripped.
    pub fn named_type(&self, ty: &TypeRef) -> Option<&MetaType> {
        self.get_type(ty.named_type())
    }

    pub fn get_object(&self, name: &str) -> Option<&ObjectType> {
        self.get_type(name)?.as_object()
    }

    pub fn get_field(&self, parent_type: &str, field_name: &str) -> Option<&FieldDefinition> {
        self.get_type(parent_type)?.field(field_name)
    }

    pub fn query_type(&self) -> &ObjectType {
        // Checked when the schema was built.
        self.get_object(&self.query_type).unwrap_or_else(|| unreachable!())
    }

    pub fn mutation_type(&self) -> Option<&ObjectType> {
        self.get_object(self.mutation_type.as_deref()?)
    }

    pub fn subscription_type(&self) -> Option<&ObjectType> {
        self.get_object(self.subscription_type.as_deref()?)
    }

    /// Object types an interface or union may resolve to.
    pub fn possible_types(&self, abstract_type: &str) -> impl Iterator<Item = &ObjectType> {
        self.possible_types
            .get(abstract_type)
            .into_iter()
            .flatten()
            .filter_map(|name| self.get_object(name))
    }

    pub fn is_possible_type(&self, abstract_type: &str, object_type: &str) -> bool {
        self.possible_types
            .get(abstract_type)
            .is_some_and(|types| types.contains(object_type))
    }

    pub fn is_leaf_type(&self, ty: &TypeRef) -> bool {
        self.named_type(ty).is_some_and(MetaType::is_leaf)
    }

    pub fn is_abstract_type(&self, ty: &TypeRef) -> bool {
        self.named_type(ty).is_some_and(MetaType::is_abstract)
    }

    pub fn is_object_type(&self, ty: &TypeRef) -> bool {
        !ty.is_wrapping() && self.named_type(ty).is_some_and(MetaType::is_object)
    }
}
