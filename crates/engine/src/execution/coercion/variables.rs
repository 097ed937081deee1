use async_graphql_parser::{types::VariableDefinition, Positioned};
use async_graphql_value::{ConstValue, Name};
use error::{ErrorCode, GraphqlError};
use indexmap::IndexMap;

use super::{InputValueError, ValuePath};
use crate::{
    execution::{context::ExecutionError, location},
    schema::{EnumType, InputObjectType, MetaType, ScalarParseError, ScalarType, Schema, TypeRef},
    Variables,
};

/// Coerces the raw variables of a request against the variables declared by the operation.
///
/// Collects at most `max_variable_errors` errors before giving up.
pub(crate) fn coerce_variable_values(
    schema: &Schema,
    definitions: &[Positioned<VariableDefinition>],
    mut raw: Variables,
) -> Result<Variables, Vec<GraphqlError>> {
    let max_errors = schema.config().max_variable_errors;
    let mut coerced = Variables::default();
    let mut errors = Vec::new();

    for definition in definitions {
        if errors.len() >= max_errors {
            errors.push(GraphqlError::new(
                ExecutionError::TooManyVariableErrors.to_string(),
                ErrorCode::VariableError,
            ));
            break;
        }

        let name = &definition.node.name.node;
        let ty = TypeRef::from_ast(&definition.node.var_type.node);
        let error = |message: String| {
            GraphqlError::new(message, ErrorCode::VariableError).with_location(location(definition.pos))
        };

        if !schema.named_type(&ty).is_some_and(MetaType::is_input) {
            errors.push(error(format!(
                "Variable ${name} expected value of type {ty} which cannot be used as an input type."
            )));
            continue;
        }

        let value = match raw.remove(name) {
            Some(value) => value,
            None => match &definition.node.default_value {
                Some(default_value) => default_value.node.clone(),
                None if ty.is_non_null() => {
                    errors.push(error(format!(
                        "Variable ${name} of required type {ty} was not provided."
                    )));
                    continue;
                }
                None => continue,
            },
        };

        match ValueCoercion::new(schema).coerce_input_value(&ty, value) {
            Ok(value) => {
                coerced.insert(name.clone(), value);
            }
            Err(err) => errors.push(error(format!("Variable ${name} got an invalid value: {err}"))),
        }
    }

    if errors.is_empty() {
        Ok(coerced)
    } else {
        Err(errors)
    }
}

/// Coercion of already decoded values, as sent in variables or declared as defaults.
pub(crate) struct ValueCoercion<'a> {
    schema: &'a Schema,
    pub(super) path: ValuePath,
}

impl<'a> ValueCoercion<'a> {
    pub(crate) fn new(schema: &'a Schema) -> Self {
        ValueCoercion {
            schema,
            path: ValuePath::default(),
        }
    }

    pub(crate) fn coerce_input_value(&mut self, ty: &TypeRef, value: ConstValue) -> Result<ConstValue, InputValueError> {
        if ty.is_list() && !matches!(value, ConstValue::List(_) | ConstValue::Null) {
            // A single value is accepted where a list is expected.
            let mut value = self.coerce_named_type(ty, value)?;
            for _ in ty.wrapping.list_wrappings() {
                value = ConstValue::List(vec![value]);
            }
            return Ok(value);
        }
        self.coerce_list(ty, value)
    }

    fn coerce_list(&mut self, ty: &TypeRef, value: ConstValue) -> Result<ConstValue, InputValueError> {
        let Some(item_type) = ty.item_type() else {
            return self.coerce_named_type(ty, value);
        };

        match value {
            ConstValue::Null if ty.is_non_null() => Err(InputValueError::UnexpectedNull {
                expected: ty.to_string(),
                path: self.path.render(),
            }),
            ConstValue::Null => Ok(ConstValue::Null),
            ConstValue::List(items) => {
                let mut coerced = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    self.path.push(index.into());
                    coerced.push(self.coerce_list(&item_type, item)?);
                    self.path.pop();
                }
                Ok(ConstValue::List(coerced))
            }
            value => Err(InputValueError::MissingList {
                actual: (&value).into(),
                expected: ty.to_string(),
                path: self.path.render(),
            }),
        }
    }

    fn coerce_named_type(&mut self, ty: &TypeRef, value: ConstValue) -> Result<ConstValue, InputValueError> {
        if matches!(value, ConstValue::Null) {
            if ty.wrapping.inner_is_required() {
                return Err(InputValueError::UnexpectedNull {
                    expected: named(ty).to_string(),
                    path: self.path.render(),
                });
            }
            return Ok(ConstValue::Null);
        }

        let schema = self.schema;
        match schema.named_type(ty) {
            Some(MetaType::Scalar(scalar)) => self.coerce_scalar(scalar, value),
            Some(MetaType::Enum(r#enum)) => self.coerce_enum(r#enum, value),
            Some(MetaType::InputObject(input_object)) => self.coerce_input_object(input_object, value),
            _ => Err(InputValueError::NotAnInputType(ty.named_type().to_string())),
        }
    }

    fn coerce_scalar(&mut self, scalar: &ScalarType, value: ConstValue) -> Result<ConstValue, InputValueError> {
        scalar
            .parse_variable_value(&value)
            .map_err(|err| scalar_error(scalar, &value, err, &self.path))
    }

    fn coerce_enum(&mut self, r#enum: &EnumType, value: ConstValue) -> Result<ConstValue, InputValueError> {
        let name = match &value {
            ConstValue::Enum(name) => name.as_str(),
            ConstValue::String(name) => name.as_str(),
            value => {
                return Err(InputValueError::IncorrectEnumValueType {
                    enum_name: r#enum.name.to_string(),
                    actual: value.into(),
                    path: self.path.render(),
                })
            }
        };
        r#enum
            .parse(name)
            .cloned()
            .ok_or_else(|| InputValueError::UnknownEnumValue {
                enum_name: r#enum.name.to_string(),
                value: name.to_string(),
                path: self.path.render(),
            })
    }

    fn coerce_input_object(
        &mut self,
        input_object: &InputObjectType,
        value: ConstValue,
    ) -> Result<ConstValue, InputValueError> {
        let ConstValue::Object(mut fields) = value else {
            return Err(InputValueError::MissingObject {
                name: input_object.name.to_string(),
                actual: (&value).into(),
                path: self.path.render(),
            });
        };

        let mut coerced = IndexMap::with_capacity(input_object.fields.len());
        for input_field in input_object.fields.values() {
            let value = match fields.swap_remove(&input_field.name) {
                Some(value) => value,
                None => match &input_field.default_value {
                    Some(default_value) => default_value.clone(),
                    None if input_field.ty.is_non_null() => {
                        return Err(missing_required_field(input_object, &input_field.name, &input_field.ty, &self.path))
                    }
                    None => continue,
                },
            };
            self.path.push((&input_field.name).into());
            let value = self.coerce_input_value(&input_field.ty, value)?;
            self.path.pop();
            coerced.insert(input_field.name.clone(), value);
        }

        if let Some(name) = fields.keys().next() {
            return Err(InputValueError::UnknownInputField {
                input_object: input_object.name.to_string(),
                name: name.to_string(),
                path: self.path.render(),
            });
        }

        Ok(ConstValue::Object(coerced))
    }
}

/// The named type with only its own non-null wrapper.
pub(super) fn named(ty: &TypeRef) -> TypeRef {
    if ty.wrapping.inner_is_required() {
        TypeRef::named_non_null(ty.named_type())
    } else {
        TypeRef::named(ty.named_type())
    }
}

pub(super) fn scalar_error(
    scalar: &ScalarType,
    value: &ConstValue,
    err: ScalarParseError,
    path: &ValuePath,
) -> InputValueError {
    match err {
        ScalarParseError::IncorrectType => InputValueError::IncorrectScalarType {
            actual: value.into(),
            expected: scalar.name.to_string(),
            path: path.render(),
        },
        ScalarParseError::IncorrectValue => InputValueError::IncorrectScalarValue {
            actual: value.to_string(),
            expected: scalar.name.to_string(),
            path: path.render(),
        },
        ScalarParseError::Custom(message) => InputValueError::InvalidScalarValue {
            actual: value.to_string(),
            expected: scalar.name.to_string(),
            message,
            path: path.render(),
        },
    }
}

pub(super) fn missing_required_field(
    input_object: &InputObjectType,
    name: &Name,
    ty: &TypeRef,
    path: &ValuePath,
) -> InputValueError {
    InputValueError::MissingRequiredField {
        input_object: input_object.name.to_string(),
        name: name.to_string(),
        expected: ty.to_string(),
        path: path.render(),
    }
}
