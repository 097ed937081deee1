use std::fmt;

use async_graphql_parser::types::{BaseType, Type};
use async_graphql_value::Name;
use wrapping::Wrapping;

/// Reference to a named type with its list and non-null wrappers, e.g. `[Int!]!`.
///
/// The name is only resolved against the schema's types when the schema is built, so types can
/// reference each other in any order.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub name: Name,
    pub wrapping: Wrapping,
}

impl TypeRef {
    pub fn named(name: impl AsRef<str>) -> Self {
        TypeRef {
            name: Name::new(name),
            wrapping: Wrapping::nullable(),
        }
    }

    pub fn named_non_null(name: impl AsRef<str>) -> Self {
        TypeRef {
            name: Name::new(name),
            wrapping: Wrapping::required(),
        }
    }

    /// Parses a type written in GraphQL syntax.
    pub fn parse(ty: &str) -> Option<Self> {
        let ty = ty.trim();
        let (ty, required) = match ty.strip_suffix('!') {
            Some(rest) => (rest.trim_end(), true),
            None => (ty, false),
        };
        if let Some(inner) = ty.strip_prefix('[') {
            let TypeRef { name, wrapping } = Self::parse(inner.strip_suffix(']')?)?;
            let wrapping = if required {
                wrapping.wrap_list_non_null()
            } else {
                wrapping.wrap_list()
            };
            return Some(TypeRef { name, wrapping });
        }
        let is_name = ty
            .chars()
            .enumerate()
            .all(|(i, c)| c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()));
        if ty.is_empty() || !is_name {
            return None;
        }
        Some(TypeRef {
            name: Name::new(ty),
            wrapping: Wrapping::new(required),
        })
    }

    pub fn from_ast(ty: &Type) -> Self {
        match &ty.base {
            BaseType::Named(name) => TypeRef {
                name: name.clone(),
                wrapping: Wrapping::new(!ty.nullable),
            },
            BaseType::List(inner) => {
                let TypeRef { name, wrapping } = Self::from_ast(inner);
                let wrapping = if ty.nullable {
                    wrapping.wrap_list()
                } else {
                    wrapping.wrap_list_non_null()
                };
                TypeRef { name, wrapping }
            }
        }
    }

    pub fn is_non_null(&self) -> bool {
        self.wrapping.is_required()
    }

    pub fn is_list(&self) -> bool {
        self.wrapping.is_list()
    }

    pub fn is_wrapping(&self) -> bool {
        self.wrapping.is_wrapped()
    }

    /// Name of the type once all wrappers are stripped.
    pub fn named_type(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn without_non_null(&self) -> Self {
        TypeRef {
            name: self.name.clone(),
            wrapping: self.wrapping.without_non_null(),
        }
    }

    /// Type of the items if this is a list.
    pub fn item_type(&self) -> Option<Self> {
        Some(TypeRef {
            name: self.name.clone(),
            wrapping: self.wrapping.without_list()?,
        })
    }
}

impl From<&str> for TypeRef {
    /// Malformed types are kept verbatim as a type name, reported as unknown when the schema is built.
    fn from(ty: &str) -> Self {
        TypeRef::parse(ty).unwrap_or_else(|| TypeRef::named(ty))
    }
}

impl From<String> for TypeRef {
    fn from(ty: String) -> Self {
        TypeRef::from(ty.as_str())
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.wrapping.write_type_string(&self.name, f)
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeRef({self})")
    }
}
