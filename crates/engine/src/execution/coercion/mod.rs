mod arguments;
mod variables;

pub(crate) use arguments::coerce_arguments;
pub(crate) use variables::coerce_variable_values;

use std::fmt::Write;

use async_graphql_value::{ConstValue, Name, Value};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputValueError {
    #[error("Found a null where we expected a {expected}{path}")]
    UnexpectedNull { expected: String, path: String },
    #[error("Found a {actual} value where we expected a {expected}{path}")]
    MissingList {
        actual: ValueKind,
        expected: String,
        path: String,
    },
    #[error("Found a {actual} value where we expected a '{name}' input object{path}")]
    MissingObject {
        name: String,
        actual: ValueKind,
        path: String,
    },
    #[error("Found a {actual} value where we expected a {expected} scalar{path}")]
    IncorrectScalarType {
        actual: ValueKind,
        expected: String,
        path: String,
    },
    #[error("Found value {actual} which cannot be coerced into a {expected} scalar{path}")]
    IncorrectScalarValue {
        actual: String,
        expected: String,
        path: String,
    },
    #[error("Found value {actual} which cannot be coerced into a {expected} scalar: {message}{path}")]
    InvalidScalarValue {
        actual: String,
        expected: String,
        message: String,
        path: String,
    },
    #[error("Found a {actual} value where we expected a {enum_name} enum value{path}")]
    IncorrectEnumValueType {
        enum_name: String,
        actual: ValueKind,
        path: String,
    },
    #[error("Found an unknown enum value '{value}' for the enum {enum_name}{path}")]
    UnknownEnumValue {
        enum_name: String,
        value: String,
        path: String,
    },
    #[error("Input object {input_object} does not have a field named '{name}'{path}")]
    UnknownInputField {
        input_object: String,
        name: String,
        path: String,
    },
    #[error("Missing required field '{name}' of type {expected} for the input object {input_object}{path}")]
    MissingRequiredField {
        input_object: String,
        name: String,
        expected: String,
        path: String,
    },
    #[error("Type {0} cannot be used as an input type")]
    NotAnInputType(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ValueKind {
    String,
    Integer,
    Enum,
    Float,
    Object,
    Boolean,
    List,
    Null,
    Binary,
}

impl From<&ConstValue> for ValueKind {
    fn from(value: &ConstValue) -> Self {
        match value {
            ConstValue::Null => ValueKind::Null,
            ConstValue::Number(n) if n.is_f64() => ValueKind::Float,
            ConstValue::Number(_) => ValueKind::Integer,
            ConstValue::String(_) => ValueKind::String,
            ConstValue::Boolean(_) => ValueKind::Boolean,
            ConstValue::Binary(_) => ValueKind::Binary,
            ConstValue::Enum(_) => ValueKind::Enum,
            ConstValue::List(_) => ValueKind::List,
            ConstValue::Object(_) => ValueKind::Object,
        }
    }
}

impl From<&Value> for ValueKind {
    fn from(value: &Value) -> Self {
        match value {
            Value::Variable(_) => ValueKind::Null,
            Value::Null => ValueKind::Null,
            Value::Number(n) if n.is_f64() => ValueKind::Float,
            Value::Number(_) => ValueKind::Integer,
            Value::String(_) => ValueKind::String,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Binary(_) => ValueKind::Binary,
            Value::Enum(_) => ValueKind::Enum,
            Value::List(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Object,
        }
    }
}

/// Position inside an input value, used to locate coercion errors.
#[derive(Default)]
pub(crate) struct ValuePath(Vec<ValuePathSegment>);

pub(crate) enum ValuePathSegment {
    Field(Name),
    Index(usize),
}

impl ValuePath {
    pub(crate) fn push(&mut self, segment: ValuePathSegment) {
        self.0.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }

    /// ` at path '.a.0'`, or nothing at the root of the value.
    pub(crate) fn render(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let mut out = String::from(" at path '");
        for segment in &self.0 {
            // Writing into a String cannot fail.
            let _ = match segment {
                ValuePathSegment::Field(name) => write!(out, ".{name}"),
                ValuePathSegment::Index(index) => write!(out, ".{index}"),
            };
        }
        out.push('\'');
        out
    }
}

impl From<usize> for ValuePathSegment {
    fn from(index: usize) -> Self {
        ValuePathSegment::Index(index)
    }
}

impl From<&Name> for ValuePathSegment {
    fn from(name: &Name) -> Self {
        ValuePathSegment::Field(name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_the_path() {
        let mut path = ValuePath::default();
        assert_eq!(path.render(), "");
        path.push((&Name::new("filter")).into());
        path.push(2.into());

        let error = InputValueError::MissingList {
            actual: ValueKind::Integer,
            expected: "[String]".into(),
            path: path.render(),
        };
        assert_eq!(
            error.to_string(),
            "Found a Integer value where we expected a [String] at path '.filter.2'"
        );

        path.pop();
        let error = InputValueError::UnknownEnumValue {
            enum_name: "Color".into(),
            value: "PURPLE".into(),
            path: path.render(),
        };
        assert_eq!(
            error.to_string(),
            "Found an unknown enum value 'PURPLE' for the enum Color at path '.filter'"
        );
    }
}
