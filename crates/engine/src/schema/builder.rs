use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_graphql_value::Name;
use indexmap::{IndexMap, IndexSet};

use super::{scalars, FieldDefinition, MetaType, Schema, SchemaInner, TypeRef};
use crate::resolver::{FieldResolver, Subscriber};

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("Type '{0}' is defined more than once")]
    DuplicateType(String),
    #[error("Unknown type '{name}' referenced by {location}")]
    UnknownType { name: String, location: String },
    #[error("Type '{name}' used by {location} is an input object and cannot be used as an output type")]
    NotAnOutputType { name: String, location: String },
    #[error("Type '{name}' used by {location} is not a scalar, enum or input object and cannot be used as an input type")]
    NotAnInputType { name: String, location: String },
    #[error("Root type '{0}' must be an object type")]
    InvalidRootType(String),
    #[error("Union '{union}' has a member '{member}' which is not an object type")]
    InvalidUnionMember { union: String, member: String },
    #[error("Type '{object}' implements '{interface}' which is not an interface")]
    InvalidInterface { object: String, interface: String },
    #[error("Type '{object}' does not define the field '{field}' of its interface '{interface}'")]
    MissingInterfaceField {
        object: String,
        interface: String,
        field: String,
    },
    #[error("Field '{type_name}.{field}' does not exist")]
    UnknownField { type_name: String, field: String },
}

type ResolverTransform = Box<dyn FnOnce(FieldResolver) -> FieldResolver + Send>;

/// Collects types and resolvers, validated and frozen by [`SchemaBuilder::finish`].
pub struct SchemaBuilder {
    types: IndexMap<Name, MetaType>,
    user_defined: HashSet<Name>,
    query_type: Name,
    mutation_type: Option<Name>,
    subscription_type: Option<Name>,
    resolvers: Vec<(Name, Name, FieldResolver)>,
    subscribers: Vec<(Name, Name, Subscriber)>,
    transforms: Vec<(Name, Name, ResolverTransform)>,
    duplicates: Vec<Name>,
    config: config::Config,
}

impl SchemaBuilder {
    pub(super) fn new(query: impl AsRef<str>, mutation: Option<&str>, subscription: Option<&str>) -> Self {
        let types = scalars::builtins()
            .into_iter()
            .map(|scalar| (scalar.name.clone(), MetaType::Scalar(scalar)))
            .collect();
        SchemaBuilder {
            types,
            user_defined: HashSet::new(),
            query_type: Name::new(query),
            mutation_type: mutation.map(Name::new),
            subscription_type: subscription.map(Name::new),
            resolvers: Vec::new(),
            subscribers: Vec::new(),
            transforms: Vec::new(),
            duplicates: Vec::new(),
            config: config::Config::default(),
        }
    }

    /// Register a type. Built-in scalars may be replaced, any other name can only be registered once.
    #[must_use]
    pub fn register(mut self, ty: impl Into<MetaType>) -> Self {
        let ty = ty.into();
        let name = ty.name().clone();
        if !self.user_defined.insert(name.clone()) {
            self.duplicates.push(name.clone());
        }
        self.types.insert(name, ty);
        self
    }

    /// Adds the `Timestamp` and `JSON` scalars.
    #[must_use]
    pub fn with_extra_scalars(mut self) -> Self {
        for scalar in scalars::extras() {
            self.types.insert(scalar.name.clone(), MetaType::Scalar(scalar));
        }
        self
    }

    #[must_use]
    pub fn config(mut self, config: config::Config) -> Self {
        self.config = config;
        self
    }

    /// Set the resolver of a field, replacing the one declared with the field if any.
    #[must_use]
    pub fn resolver<F>(mut self, type_name: &str, field_name: &str, resolver: F) -> Self
    where
        F: for<'r> Fn(crate::ResolverContext<'r>) -> crate::Resolution<'r> + Send + Sync + 'static,
    {
        self.resolvers
            .push((Name::new(type_name), Name::new(field_name), FieldResolver::new(resolver)));
        self
    }

    #[must_use]
    pub fn subscriber<F>(mut self, type_name: &str, field_name: &str, subscriber: F) -> Self
    where
        F: for<'r> Fn(crate::ResolverContext<'r>) -> Result<crate::EventStream, crate::Error> + Send + Sync + 'static,
    {
        self.subscribers
            .push((Name::new(type_name), Name::new(field_name), Subscriber::new(subscriber)));
        self
    }

    /// Replace the resolver of a field by a wrapper around it, for directive-like transformations.
    ///
    /// Transformations are applied in registration order once all resolvers are set. A field without
    /// resolver gets the default one wrapped.
    #[must_use]
    pub fn wrap_resolver(
        mut self,
        type_name: &str,
        field_name: &str,
        transform: impl FnOnce(FieldResolver) -> FieldResolver + Send + 'static,
    ) -> Self {
        self.transforms
            .push((Name::new(type_name), Name::new(field_name), Box::new(transform)));
        self
    }

    pub fn finish(mut self) -> Result<Schema, SchemaError> {
        if let Some(name) = self.duplicates.first() {
            return Err(SchemaError::DuplicateType(name.to_string()));
        }

        for root in [Some(&self.query_type), self.mutation_type.as_ref(), self.subscription_type.as_ref()]
            .into_iter()
            .flatten()
        {
            if !self.types.get(root).is_some_and(MetaType::is_object) {
                return Err(SchemaError::InvalidRootType(root.to_string()));
            }
        }

        for (type_name, field_name, resolver) in std::mem::take(&mut self.resolvers) {
            self.field_mut(&type_name, &field_name)?.resolver = Some(resolver);
        }
        for (type_name, field_name, subscriber) in std::mem::take(&mut self.subscribers) {
            self.field_mut(&type_name, &field_name)?.subscriber = Some(subscriber);
        }
        for (type_name, field_name, transform) in std::mem::take(&mut self.transforms) {
            let field = self.field_mut(&type_name, &field_name)?;
            let resolver = field.resolver.take().unwrap_or_else(FieldResolver::default_resolver);
            field.resolver = Some(transform(resolver));
        }

        self.check_references()?;
        let possible_types = self.possible_types()?;

        tracing::debug!(types = self.types.len(), "schema built");

        Ok(Schema(Arc::new(SchemaInner {
            types: self.types,
            query_type: self.query_type,
            mutation_type: self.mutation_type,
            subscription_type: self.subscription_type,
            possible_types,
            config: self.config,
        })))
    }

    fn field_mut(&mut self, type_name: &str, field_name: &str) -> Result<&mut FieldDefinition, SchemaError> {
        self.types
            .get_mut(type_name)
            .and_then(MetaType::fields_mut)
            .and_then(|fields| fields.get_mut(field_name))
            .ok_or_else(|| SchemaError::UnknownField {
                type_name: type_name.to_string(),
                field: field_name.to_string(),
            })
    }

    fn check_references(&self) -> Result<(), SchemaError> {
        let output = |ty: &TypeRef, location: String| match self.types.get(ty.named_type()) {
            None => Err(SchemaError::UnknownType {
                name: ty.name.to_string(),
                location,
            }),
            Some(meta) if !meta.is_output() => Err(SchemaError::NotAnOutputType {
                name: ty.name.to_string(),
                location,
            }),
            Some(_) => Ok(()),
        };
        let input = |ty: &TypeRef, location: String| match self.types.get(ty.named_type()) {
            None => Err(SchemaError::UnknownType {
                name: ty.name.to_string(),
                location,
            }),
            Some(meta) if !meta.is_input() => Err(SchemaError::NotAnInputType {
                name: ty.name.to_string(),
                location,
            }),
            Some(_) => Ok(()),
        };

        for meta in self.types.values() {
            if let Some(fields) = meta.fields() {
                for field in fields.values() {
                    output(&field.ty, format!("{}.{}", meta.name(), field.name))?;
                    for argument in field.arguments.values() {
                        input(
                            &argument.ty,
                            format!("{}.{}({}:)", meta.name(), field.name, argument.name),
                        )?;
                    }
                }
            }
            if let MetaType::InputObject(object) = meta {
                for field in object.fields.values() {
                    input(&field.ty, format!("{}.{}", object.name, field.name))?;
                }
            }
        }
        Ok(())
    }

    fn possible_types(&self) -> Result<HashMap<Name, IndexSet<Name>>, SchemaError> {
        let mut possible_types: HashMap<Name, IndexSet<Name>> = HashMap::new();

        for meta in self.types.values() {
            match meta {
                MetaType::Object(object) => {
                    for interface_name in &object.interfaces {
                        let Some(MetaType::Interface(interface)) = self.types.get(interface_name) else {
                            return Err(SchemaError::InvalidInterface {
                                object: object.name.to_string(),
                                interface: interface_name.to_string(),
                            });
                        };
                        if let Some(field) = interface.fields.keys().find(|name| !object.fields.contains_key(*name)) {
                            return Err(SchemaError::MissingInterfaceField {
                                object: object.name.to_string(),
                                interface: interface_name.to_string(),
                                field: field.to_string(),
                            });
                        }
                        possible_types
                            .entry(interface_name.clone())
                            .or_default()
                            .insert(object.name.clone());
                    }
                }
                MetaType::Union(union) => {
                    let members = possible_types.entry(union.name.clone()).or_default();
                    for member in &union.members {
                        if !self.types.get(member).is_some_and(MetaType::is_object) {
                            return Err(SchemaError::InvalidUnionMember {
                                union: union.name.to_string(),
                                member: member.to_string(),
                            });
                        }
                        members.insert(member.clone());
                    }
                }
                MetaType::Interface(interface) => {
                    possible_types.entry(interface.name.clone()).or_default();
                }
                _ => {}
            }
        }

        Ok(possible_types)
    }
}
