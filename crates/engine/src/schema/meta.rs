use std::sync::Arc;

use async_graphql_value::{ConstValue, Name};
use indexmap::IndexMap;

use super::{scalars, ScalarParseError, TypeRef};
use crate::{
    resolver::{FieldResolver, ResolverContext, Resolution, Subscriber, TypeResolver},
    value::FieldValue,
    EventStream, ResolveInfo,
};

pub type IsTypeOf = Arc<dyn Fn(&FieldValue) -> bool + Send + Sync>;
pub(crate) type ScalarSerializer = Arc<dyn Fn(&ConstValue) -> Result<ConstValue, String> + Send + Sync>;
pub(crate) type ScalarParser = Arc<dyn Fn(&ConstValue) -> Result<ConstValue, ScalarParseError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum TypeKind {
    Scalar,
    Object,
    Interface,
    Union,
    Enum,
    InputObject,
}

pub enum MetaType {
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType),
}

impl MetaType {
    pub fn name(&self) -> &Name {
        match self {
            MetaType::Scalar(ty) => &ty.name,
            MetaType::Object(ty) => &ty.name,
            MetaType::Interface(ty) => &ty.name,
            MetaType::Union(ty) => &ty.name,
            MetaType::Enum(ty) => &ty.name,
            MetaType::InputObject(ty) => &ty.name,
        }
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            MetaType::Scalar(_) => TypeKind::Scalar,
            MetaType::Object(_) => TypeKind::Object,
            MetaType::Interface(_) => TypeKind::Interface,
            MetaType::Union(_) => TypeKind::Union,
            MetaType::Enum(_) => TypeKind::Enum,
            MetaType::InputObject(_) => TypeKind::InputObject,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            MetaType::Scalar(ty) => ty.description.as_deref(),
            MetaType::Object(ty) => ty.description.as_deref(),
            MetaType::Interface(ty) => ty.description.as_deref(),
            MetaType::Union(ty) => ty.description.as_deref(),
            MetaType::Enum(ty) => ty.description.as_deref(),
            MetaType::InputObject(ty) => ty.description.as_deref(),
        }
    }

    /// Scalars and enums.
    pub fn is_leaf(&self) -> bool {
        matches!(self, MetaType::Scalar(_) | MetaType::Enum(_))
    }

    /// Interfaces and unions.
    pub fn is_abstract(&self) -> bool {
        matches!(self, MetaType::Interface(_) | MetaType::Union(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, MetaType::Object(_))
    }

    pub fn is_input(&self) -> bool {
        matches!(self, MetaType::Scalar(_) | MetaType::Enum(_) | MetaType::InputObject(_))
    }

    pub fn is_output(&self) -> bool {
        !matches!(self, MetaType::InputObject(_))
    }

    pub fn as_object(&self) -> Option<&ObjectType> {
        match self {
            MetaType::Object(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&IndexMap<Name, FieldDefinition>> {
        match self {
            MetaType::Object(ty) => Some(&ty.fields),
            MetaType::Interface(ty) => Some(&ty.fields),
            _ => None,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields()?.get(name)
    }

    pub(crate) fn fields_mut(&mut self) -> Option<&mut IndexMap<Name, FieldDefinition>> {
        match self {
            MetaType::Object(ty) => Some(&mut ty.fields),
            MetaType::Interface(ty) => Some(&mut ty.fields),
            _ => None,
        }
    }
}

pub struct FieldDefinition {
    pub name: Name,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub arguments: IndexMap<Name, InputValueDefinition>,
    pub resolver: Option<FieldResolver>,
    pub subscriber: Option<Subscriber>,
}

impl FieldDefinition {
    pub fn new(name: impl AsRef<str>, ty: impl Into<TypeRef>) -> Self {
        FieldDefinition {
            name: Name::new(name),
            description: None,
            ty: ty.into(),
            arguments: IndexMap::new(),
            resolver: None,
            subscriber: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn argument(mut self, argument: InputValueDefinition) -> Self {
        self.arguments.insert(argument.name.clone(), argument);
        self
    }

    #[must_use]
    pub fn resolver<F>(mut self, resolver: F) -> Self
    where
        F: for<'r> Fn(ResolverContext<'r>) -> Resolution<'r> + Send + Sync + 'static,
    {
        self.resolver = Some(FieldResolver::new(resolver));
        self
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: FieldResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn subscriber<F>(mut self, subscriber: F) -> Self
    where
        F: for<'r> Fn(ResolverContext<'r>) -> Result<EventStream, crate::Error> + Send + Sync + 'static,
    {
        self.subscriber = Some(Subscriber::new(subscriber));
        self
    }

    #[must_use]
    pub fn with_subscriber(mut self, subscriber: Subscriber) -> Self {
        self.subscriber = Some(subscriber);
        self
    }
}

/// Argument of a field or field of an input object.
pub struct InputValueDefinition {
    pub name: Name,
    pub description: Option<String>,
    pub ty: TypeRef,
    pub default_value: Option<ConstValue>,
}

impl InputValueDefinition {
    pub fn new(name: impl AsRef<str>, ty: impl Into<TypeRef>) -> Self {
        InputValueDefinition {
            name: Name::new(name),
            description: None,
            ty: ty.into(),
            default_value: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<ConstValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

pub struct ObjectType {
    pub name: Name,
    pub description: Option<String>,
    pub fields: IndexMap<Name, FieldDefinition>,
    pub interfaces: Vec<Name>,
    pub is_type_of: Option<IsTypeOf>,
}

impl ObjectType {
    pub fn new(name: impl AsRef<str>) -> Self {
        ObjectType {
            name: Name::new(name),
            description: None,
            fields: IndexMap::new(),
            interfaces: Vec::new(),
            is_type_of: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    #[must_use]
    pub fn implements(mut self, interface: impl AsRef<str>) -> Self {
        self.interfaces.push(Name::new(interface));
        self
    }

    #[must_use]
    pub fn is_type_of(mut self, predicate: impl Fn(&FieldValue) -> bool + Send + Sync + 'static) -> Self {
        self.is_type_of = Some(Arc::new(predicate));
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name)
    }
}

pub struct InterfaceType {
    pub name: Name,
    pub description: Option<String>,
    pub fields: IndexMap<Name, FieldDefinition>,
    pub resolve_type: Option<TypeResolver>,
}

impl InterfaceType {
    pub fn new(name: impl AsRef<str>) -> Self {
        InterfaceType {
            name: Name::new(name),
            description: None,
            fields: IndexMap::new(),
            resolve_type: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    #[must_use]
    pub fn resolve_type(
        mut self,
        resolver: impl Fn(&FieldValue, &ResolveInfo<'_>, &str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_type = Some(TypeResolver::new(resolver));
        self
    }
}

pub struct UnionType {
    pub name: Name,
    pub description: Option<String>,
    pub members: Vec<Name>,
    pub resolve_type: Option<TypeResolver>,
}

impl UnionType {
    pub fn new(name: impl AsRef<str>) -> Self {
        UnionType {
            name: Name::new(name),
            description: None,
            members: Vec::new(),
            resolve_type: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn member(mut self, member: impl AsRef<str>) -> Self {
        self.members.push(Name::new(member));
        self
    }

    #[must_use]
    pub fn resolve_type(
        mut self,
        resolver: impl Fn(&FieldValue, &ResolveInfo<'_>, &str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.resolve_type = Some(TypeResolver::new(resolver));
        self
    }
}

pub struct EnumValue {
    pub name: Name,
    pub description: Option<String>,
    /// Value handed to resolvers for this enum value, its name as a string by default.
    pub value: ConstValue,
}

impl EnumValue {
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = Name::new(name);
        EnumValue {
            value: ConstValue::String(name.to_string()),
            name,
            description: None,
        }
    }

    #[must_use]
    pub fn internal_value(mut self, value: impl Into<ConstValue>) -> Self {
        self.value = value.into();
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

pub struct EnumType {
    pub name: Name,
    pub description: Option<String>,
    pub values: IndexMap<Name, EnumValue>,
}

impl EnumType {
    pub fn new(name: impl AsRef<str>) -> Self {
        EnumType {
            name: Name::new(name),
            description: None,
            values: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn value(mut self, value: impl Into<EnumValue>) -> Self {
        let value = value.into();
        self.values.insert(value.name.clone(), value);
        self
    }

    #[must_use]
    pub fn values<T: Into<EnumValue>>(self, values: impl IntoIterator<Item = T>) -> Self {
        values.into_iter().fold(self, Self::value)
    }

    /// Internal value of the enum value with the given name.
    pub fn parse(&self, name: &str) -> Option<&ConstValue> {
        self.values.get(name).map(|value| &value.value)
    }

    /// Name of the enum value matching the internal value produced by a resolver.
    pub fn serialize(&self, value: &ConstValue) -> Option<&Name> {
        if let Some(value) = self.values.values().find(|candidate| &candidate.value == value) {
            return Some(&value.name);
        }
        // Resolvers may also return the GraphQL name directly.
        match value {
            ConstValue::Enum(name) => self.values.get_key_value(name.as_str()).map(|(name, _)| name),
            ConstValue::String(name) => self.values.get_key_value(name.as_str()).map(|(name, _)| name),
            _ => None,
        }
    }
}

impl From<&str> for EnumValue {
    fn from(name: &str) -> Self {
        EnumValue::new(name)
    }
}

pub struct InputObjectType {
    pub name: Name,
    pub description: Option<String>,
    pub fields: IndexMap<Name, InputValueDefinition>,
}

impl InputObjectType {
    pub fn new(name: impl AsRef<str>) -> Self {
        InputObjectType {
            name: Name::new(name),
            description: None,
            fields: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn field(mut self, field: InputValueDefinition) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }
}

/// A scalar with its three conversion functions.
///
/// `serialize` converts a resolver value into the response value, `parse_value` converts a
/// variable value and `parse_literal` a literal written in the operation. All three default to
/// accepting any value as is.
pub struct ScalarType {
    pub name: Name,
    pub description: Option<String>,
    pub(crate) serialize: ScalarSerializer,
    pub(crate) parse_value: ScalarParser,
    pub(crate) parse_literal: ScalarParser,
}

impl ScalarType {
    pub fn new(name: impl AsRef<str>) -> Self {
        ScalarType {
            name: Name::new(name),
            description: None,
            serialize: Arc::new(|value| Ok(value.clone())),
            parse_value: Arc::new(|value| Ok(value.clone())),
            parse_literal: Arc::new(|value| Ok(value.clone())),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn serialize(mut self, f: impl Fn(&ConstValue) -> Result<ConstValue, String> + Send + Sync + 'static) -> Self {
        self.serialize = Arc::new(f);
        self
    }

    #[must_use]
    pub fn parse_value(
        mut self,
        f: impl Fn(&ConstValue) -> Result<ConstValue, ScalarParseError> + Send + Sync + 'static,
    ) -> Self {
        self.parse_value = Arc::new(f);
        self
    }

    #[must_use]
    pub fn parse_literal(
        mut self,
        f: impl Fn(&ConstValue) -> Result<ConstValue, ScalarParseError> + Send + Sync + 'static,
    ) -> Self {
        self.parse_literal = Arc::new(f);
        self
    }

    pub fn serialize_value(&self, value: &ConstValue) -> Result<ConstValue, String> {
        (self.serialize)(value)
    }

    pub fn parse_variable_value(&self, value: &ConstValue) -> Result<ConstValue, ScalarParseError> {
        (self.parse_value)(value)
    }

    pub fn parse_literal_value(&self, value: &ConstValue) -> Result<ConstValue, ScalarParseError> {
        (self.parse_literal)(value)
    }

    pub fn is_builtin(&self) -> bool {
        scalars::BUILTIN_SCALARS.contains(&self.name.as_str())
    }
}

macro_rules! impl_from_for_meta_type {
    ($($variant:ident($ty:ident)),*) => {
        $(
            impl From<$ty> for MetaType {
                fn from(ty: $ty) -> Self {
                    MetaType::$variant(ty)
                }
            }
        )*
    };
}

impl_from_for_meta_type!(
    Scalar(ScalarType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    Enum(EnumType),
    InputObject(InputObjectType)
);
