use std::{any::Any, fmt, sync::Arc};

use async_graphql_value::{ConstValue, Name, Number};

/// Application object exposing its fields to the default resolver.
///
/// Implemented by the concrete root and entity types of an application in place of runtime
/// attribute lookup. A field without an explicit resolver is read with [`DataSource::field`].
pub trait DataSource: AsAny + Send + Sync {
    /// Concrete object type of this value, used when it is returned by an interface or union field.
    fn type_name(&self) -> Option<&str> {
        None
    }

    fn field(&self, name: &str) -> Option<FieldValue>;
}

pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn DataSource {
    pub fn downcast_ref<T: DataSource + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }
}

/// Raw value produced by a resolver, before completion against the field type.
#[derive(Clone)]
pub enum FieldValue {
    Value(ConstValue),
    List(Vec<FieldValue>),
    Object(Arc<dyn DataSource>),
    /// A value tagged with its concrete object type.
    WithType { value: Box<FieldValue>, type_name: Name },
}

impl FieldValue {
    pub const NULL: FieldValue = FieldValue::Value(ConstValue::Null);

    pub fn null() -> Self {
        Self::NULL
    }

    pub fn value(value: impl Into<ConstValue>) -> Self {
        FieldValue::Value(value.into())
    }

    pub fn list<T: Into<FieldValue>>(items: impl IntoIterator<Item = T>) -> Self {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }

    pub fn object(source: impl DataSource + 'static) -> Self {
        FieldValue::Object(Arc::new(source))
    }

    pub fn from_json(value: serde_json::Value) -> Self {
        ConstValue::from_json(value).map(FieldValue::Value).unwrap_or(FieldValue::NULL)
    }

    #[must_use]
    pub fn with_type(self, type_name: impl AsRef<str>) -> Self {
        FieldValue::WithType {
            value: Box::new(self.into_untyped()),
            type_name: Name::new(type_name),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            FieldValue::Value(ConstValue::Null) => true,
            FieldValue::WithType { value, .. } => value.is_null(),
            _ => false,
        }
    }

    pub fn as_value(&self) -> Option<&ConstValue> {
        match self {
            FieldValue::Value(value) => Some(value),
            FieldValue::WithType { value, .. } => value.as_value(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.as_value()? {
            ConstValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_marker(&self) -> Option<&str> {
        match self {
            FieldValue::WithType { type_name, .. } => Some(type_name),
            _ => None,
        }
    }

    /// Strips the concrete type marker, if any.
    pub fn into_untyped(self) -> FieldValue {
        match self {
            FieldValue::WithType { value, .. } => value.into_untyped(),
            other => other,
        }
    }

    pub fn untyped(&self) -> &FieldValue {
        match self {
            FieldValue::WithType { value, .. } => value.untyped(),
            other => other,
        }
    }

    /// Reads a field of this value: a key of an object value or a field of a [`DataSource`].
    pub fn field(&self, name: &str) -> Option<FieldValue> {
        match self.untyped() {
            FieldValue::Value(ConstValue::Object(map)) => map.get(name).cloned().map(FieldValue::Value),
            FieldValue::Object(source) => source.field(name),
            _ => None,
        }
    }

    pub fn downcast_ref<T: DataSource + 'static>(&self) -> Option<&T> {
        match self.untyped() {
            FieldValue::Object(source) => (**source).downcast_ref(),
            _ => None,
        }
    }

    /// Converts this value to a plain GraphQL value, unless it holds a [`DataSource`].
    pub fn to_const(&self) -> Option<ConstValue> {
        match self {
            FieldValue::Value(value) => Some(value.clone()),
            FieldValue::List(items) => items
                .iter()
                .map(FieldValue::to_const)
                .collect::<Option<Vec<_>>>()
                .map(ConstValue::List),
            FieldValue::Object(_) => None,
            FieldValue::WithType { value, .. } => value.to_const(),
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::NULL
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Value(value) => write!(f, "{value}"),
            FieldValue::List(items) => f.debug_list().entries(items).finish(),
            FieldValue::Object(source) => match source.type_name() {
                Some(name) => write!(f, "{name} {{ .. }}"),
                None => f.write_str("{ .. }"),
            },
            FieldValue::WithType { value, type_name } => write!(f, "{type_name}({value:?})"),
        }
    }
}

impl From<ConstValue> for FieldValue {
    fn from(value: ConstValue) -> Self {
        FieldValue::Value(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Value(ConstValue::String(value.to_string()))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Value(ConstValue::String(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Value(ConstValue::Boolean(value))
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Value(ConstValue::Number(value.into()))
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Value(ConstValue::Number(value.into()))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Number::from_f64(value)
            .map(|n| FieldValue::Value(ConstValue::Number(n)))
            .unwrap_or(FieldValue::NULL)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::NULL)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(items: Vec<T>) -> Self {
        FieldValue::list(items)
    }
}

impl<T: DataSource + 'static> From<Arc<T>> for FieldValue {
    fn from(source: Arc<T>) -> Self {
        FieldValue::Object(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct User {
        name: &'static str,
    }

    impl DataSource for User {
        fn type_name(&self) -> Option<&str> {
            Some("User")
        }

        fn field(&self, name: &str) -> Option<FieldValue> {
            match name {
                "name" => Some(self.name.into()),
                _ => None,
            }
        }
    }

    #[test]
    fn field_lookup() {
        let map = FieldValue::from_json(serde_json::json!({"id": 1, "name": "Alice"}));
        assert_eq!(map.field("name").and_then(|v| v.as_str().map(String::from)).as_deref(), Some("Alice"));
        assert!(map.field("missing").is_none());

        let user = FieldValue::object(User { name: "Bob" });
        assert_eq!(user.field("name").unwrap().as_str(), Some("Bob"));
        assert_eq!(user.downcast_ref::<User>().map(|u| u.name), Some("Bob"));
    }

    #[test]
    fn type_marker_is_transparent() {
        let value = FieldValue::from("x").with_type("Text").with_type("Other");
        assert_eq!(value.type_marker(), Some("Other"));
        assert_eq!(value.as_str(), Some("x"));
        assert!(!value.is_null());
        assert!(FieldValue::NULL.with_type("Text").is_null());
    }

    #[test]
    fn to_const() {
        let value = FieldValue::list([FieldValue::from(1), FieldValue::null()]);
        assert_eq!(
            value.to_const(),
            Some(ConstValue::List(vec![ConstValue::Number(1.into()), ConstValue::Null]))
        );
        assert_eq!(FieldValue::object(User { name: "Bob" }).to_const(), None);
    }
}
