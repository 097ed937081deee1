use async_graphql_value::{ConstValue, Number};
use chrono::{DateTime, Utc};

use super::ScalarType;

pub(crate) const BUILTIN_SCALARS: &[&str] = &["Int", "Float", "String", "Boolean", "ID"];

/// Why a value could not be parsed by a scalar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScalarParseError {
    /// The value has the wrong kind altogether, e.g. a string for an `Int`.
    #[error("incorrect value type")]
    IncorrectType,
    /// The value has the right kind but is not acceptable, e.g. `2^40` for an `Int`.
    #[error("incorrect value")]
    IncorrectValue,
    #[error("{0}")]
    Custom(String),
}

pub(crate) fn builtins() -> Vec<ScalarType> {
    vec![int(), float(), string(), boolean(), id()]
}

/// Scalars shipped with the engine but only added to a schema on request.
pub(crate) fn extras() -> Vec<ScalarType> {
    vec![timestamp(), json()]
}

fn as_i32(number: &Number) -> Option<i32> {
    if let Some(n) = number.as_i64() {
        return i32::try_from(n).ok();
    }
    let f = number.as_f64()?;
    if f.fract() == 0.0 && f >= f64::from(i32::MIN) && f <= f64::from(i32::MAX) {
        Some(f as i32)
    } else {
        None
    }
}

fn is_integer_literal(number: &Number) -> bool {
    number.is_i64() || number.is_u64()
}

fn int() -> ScalarType {
    ScalarType::new("Int")
        .description("The `Int` scalar type represents non-fractional signed whole numeric values between -(2^31) and 2^31 - 1.")
        .serialize(|value| match value {
            ConstValue::Number(n) => as_i32(n)
                .map(|n| ConstValue::Number(n.into()))
                .ok_or_else(|| format!("Int cannot represent non 32-bit signed integer value: {n}")),
            ConstValue::Boolean(b) => Ok(ConstValue::Number(i32::from(*b).into())),
            ConstValue::String(s) => s
                .parse::<i32>()
                .map(|n| ConstValue::Number(n.into()))
                .map_err(|_| format!("Int cannot represent non-integer value: \"{s}\"")),
            other => Err(format!("Int cannot represent non-integer value: {other}")),
        })
        .parse_value(|value| match value {
            ConstValue::Number(n) => as_i32(n)
                .map(|n| ConstValue::Number(n.into()))
                .ok_or(ScalarParseError::IncorrectValue),
            _ => Err(ScalarParseError::IncorrectType),
        })
        .parse_literal(|value| match value {
            ConstValue::Number(n) if is_integer_literal(n) => as_i32(n)
                .map(|n| ConstValue::Number(n.into()))
                .ok_or(ScalarParseError::IncorrectValue),
            _ => Err(ScalarParseError::IncorrectType),
        })
}

fn float() -> ScalarType {
    fn coerce(value: &ConstValue) -> Result<ConstValue, ScalarParseError> {
        match value {
            ConstValue::Number(n) => n
                .as_f64()
                .and_then(Number::from_f64)
                .map(ConstValue::Number)
                .ok_or(ScalarParseError::IncorrectValue),
            _ => Err(ScalarParseError::IncorrectType),
        }
    }

    ScalarType::new("Float")
        .description("The `Float` scalar type represents signed double-precision fractional values as specified by IEEE 754.")
        .serialize(|value| match value {
            ConstValue::Number(n) => n
                .as_f64()
                .and_then(Number::from_f64)
                .map(ConstValue::Number)
                .ok_or_else(|| format!("Float cannot represent non numeric value: {n}")),
            ConstValue::Boolean(b) => Ok(ConstValue::Number(Number::from(i32::from(*b)))),
            ConstValue::String(s) => s
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(ConstValue::Number)
                .ok_or_else(|| format!("Float cannot represent non numeric value: \"{s}\"")),
            other => Err(format!("Float cannot represent non numeric value: {other}")),
        })
        .parse_value(coerce)
        .parse_literal(coerce)
}

fn string() -> ScalarType {
    fn coerce(value: &ConstValue) -> Result<ConstValue, ScalarParseError> {
        match value {
            ConstValue::String(_) => Ok(value.clone()),
            _ => Err(ScalarParseError::IncorrectType),
        }
    }

    ScalarType::new("String")
        .description("The `String` scalar type represents textual data, represented as UTF-8 character sequences.")
        .serialize(|value| match value {
            ConstValue::String(_) => Ok(value.clone()),
            ConstValue::Enum(name) => Ok(ConstValue::String(name.to_string())),
            ConstValue::Number(n) => Ok(ConstValue::String(n.to_string())),
            ConstValue::Boolean(b) => Ok(ConstValue::String(b.to_string())),
            other => Err(format!("String cannot represent value: {other}")),
        })
        .parse_value(coerce)
        .parse_literal(coerce)
}

fn boolean() -> ScalarType {
    fn coerce(value: &ConstValue) -> Result<ConstValue, ScalarParseError> {
        match value {
            ConstValue::Boolean(_) => Ok(value.clone()),
            _ => Err(ScalarParseError::IncorrectType),
        }
    }

    ScalarType::new("Boolean")
        .description("The `Boolean` scalar type represents `true` or `false`.")
        .serialize(|value| match value {
            ConstValue::Boolean(_) => Ok(value.clone()),
            ConstValue::Number(n) => n
                .as_f64()
                .map(|n| ConstValue::Boolean(n != 0.0))
                .ok_or_else(|| format!("Boolean cannot represent a non boolean value: {n}")),
            other => Err(format!("Boolean cannot represent a non boolean value: {other}")),
        })
        .parse_value(coerce)
        .parse_literal(coerce)
}

fn id() -> ScalarType {
    fn coerce(value: &ConstValue) -> Result<ConstValue, ScalarParseError> {
        match value {
            ConstValue::String(_) => Ok(value.clone()),
            ConstValue::Number(n) if is_integer_literal(n) => Ok(ConstValue::String(n.to_string())),
            ConstValue::Number(_) => Err(ScalarParseError::IncorrectValue),
            _ => Err(ScalarParseError::IncorrectType),
        }
    }

    ScalarType::new("ID")
        .description("The `ID` scalar type represents a unique identifier, serialized as a string.")
        .serialize(|value| match value {
            ConstValue::String(_) => Ok(value.clone()),
            ConstValue::Number(n) if is_integer_literal(n) => Ok(ConstValue::String(n.to_string())),
            other => Err(format!("ID cannot represent value: {other}")),
        })
        .parse_value(coerce)
        .parse_literal(coerce)
}

/// Milliseconds since the unix epoch on the wire. RFC 3339 strings are accepted as input.
fn timestamp() -> ScalarType {
    fn coerce(value: &ConstValue) -> Result<ConstValue, ScalarParseError> {
        match value {
            ConstValue::Number(n) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|dt| ConstValue::Number(dt.timestamp_millis().into()))
                .ok_or(ScalarParseError::IncorrectValue),
            ConstValue::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| ConstValue::Number(dt.timestamp_millis().into()))
                .map_err(|err| ScalarParseError::Custom(err.to_string())),
            _ => Err(ScalarParseError::IncorrectType),
        }
    }

    ScalarType::new("Timestamp")
        .description("A point in time, as the number of milliseconds since the unix epoch.")
        .serialize(|value| coerce(value).map_err(|_| format!("Timestamp cannot represent value: {value}")))
        .parse_value(coerce)
        .parse_literal(coerce)
}

fn json() -> ScalarType {
    ScalarType::new("JSON").description("Arbitrary JSON value.")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(n: i64) -> ConstValue {
        ConstValue::Number(n.into())
    }

    #[test]
    fn int_range() {
        let int = int();
        assert_eq!(int.parse_variable_value(&number(3)), Ok(number(3)));
        assert_eq!(
            int.parse_variable_value(&number(1 << 40)),
            Err(ScalarParseError::IncorrectValue)
        );
        assert_eq!(
            int.parse_variable_value(&ConstValue::String("3".into())),
            Err(ScalarParseError::IncorrectType)
        );
        let float = ConstValue::Number(Number::from_f64(2.0).unwrap());
        assert_eq!(int.parse_variable_value(&float), Ok(number(2)));
        assert_eq!(int.parse_literal_value(&float), Err(ScalarParseError::IncorrectType));
        assert_eq!(
            int.serialize_value(&ConstValue::Number(Number::from_f64(1.5).unwrap())),
            Err("Int cannot represent non 32-bit signed integer value: 1.5".to_string())
        );
    }

    #[test]
    fn id_accepts_integers() {
        assert_eq!(id().parse_literal_value(&number(7)), Ok(ConstValue::String("7".into())));
        assert_eq!(id().serialize_value(&number(7)), Ok(ConstValue::String("7".into())));
    }

    #[test]
    fn timestamp() {
        let timestamp = super::timestamp();
        assert_eq!(
            timestamp.parse_variable_value(&ConstValue::String("1970-01-01T00:00:01Z".into())),
            Ok(number(1000))
        );
        assert_eq!(timestamp.serialize_value(&number(1_700_000_000_000)), Ok(number(1_700_000_000_000)));
        assert!(matches!(
            timestamp.parse_variable_value(&ConstValue::String("yesterday".into())),
            Err(ScalarParseError::Custom(_))
        ));
    }
}
