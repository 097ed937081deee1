use async_graphql_parser::{types::Field, Positioned};
use async_graphql_value::{ConstValue, Value};
use error::{ErrorCode, GraphqlError};
use indexmap::IndexMap;

use super::{
    variables::{missing_required_field, named, scalar_error, ValueCoercion},
    InputValueError, ValueKind,
};
use crate::{
    execution::location,
    resolver::Arguments,
    schema::{EnumType, FieldDefinition, InputObjectType, MetaType, ScalarType, Schema, TypeRef},
    Variables,
};

/// Coerces the arguments written on a field against its definition.
///
/// Variables are substituted with their already coerced values. An argument bound to a variable
/// that was not provided is treated as absent.
pub(crate) fn coerce_arguments(
    schema: &Schema,
    definition: &FieldDefinition,
    field: &Positioned<Field>,
    variables: &Variables,
) -> Result<Arguments, GraphqlError> {
    let mut arguments = IndexMap::with_capacity(definition.arguments.len());

    if let Some((name, _)) = field
        .node
        .arguments
        .iter()
        .find(|(name, _)| !definition.arguments.contains_key(&name.node))
    {
        return Err(GraphqlError::new(
            format!("Unknown argument named '{}' for the field '{}'", name.node, definition.name),
            ErrorCode::ArgumentError,
        )
        .with_location(location(name.pos)));
    }

    for argument in definition.arguments.values() {
        let node = field.node.get_argument(&argument.name);
        let error_location = location(node.map_or(field.pos, |node| node.pos));
        let invalid = |err: InputValueError| {
            GraphqlError::new(
                format!("Argument '{}' got an invalid value: {err}", argument.name),
                ErrorCode::ArgumentError,
            )
            .with_location(error_location)
        };

        let mut coercion = LiteralCoercion {
            schema,
            variables,
            values: ValueCoercion::new(schema),
        };
        let value = match node {
            Some(node) => coercion.coerce_input_value(&argument.ty, &node.node).map_err(invalid)?,
            None => None,
        };

        let value = match (value, &argument.default_value) {
            (Some(value), _) => value,
            (None, Some(default_value)) => coercion
                .values
                .coerce_input_value(&argument.ty, default_value.clone())
                .map_err(invalid)?,
            (None, None) if argument.ty.is_non_null() => {
                return Err(GraphqlError::new(
                    format!(
                        "Argument '{}' of required type {} was not provided.",
                        argument.name, argument.ty
                    ),
                    ErrorCode::ArgumentError,
                )
                .with_location(error_location));
            }
            (None, None) => continue,
        };
        arguments.insert(argument.name.clone(), value);
    }

    Ok(arguments)
}

/// Coercion of values written in the operation document.
struct LiteralCoercion<'a> {
    schema: &'a Schema,
    variables: &'a Variables,
    /// Defaults are already decoded values.
    values: ValueCoercion<'a>,
}

impl LiteralCoercion<'_> {
    /// `None` when the value is a variable that was not provided.
    fn coerce_input_value(&mut self, ty: &TypeRef, value: &Value) -> Result<Option<ConstValue>, InputValueError> {
        if let Value::Variable(name) = value {
            return match self.variables.get(name) {
                Some(ConstValue::Null) if ty.is_non_null() => Err(InputValueError::UnexpectedNull {
                    expected: ty.to_string(),
                    path: self.values.path.render(),
                }),
                Some(value) => Ok(Some(value.clone())),
                None => Ok(None),
            };
        }

        if ty.is_list() && !matches!(value, Value::List(_) | Value::Null) {
            let Some(mut value) = self.coerce_named_type(ty, value)? else {
                return Ok(None);
            };
            for _ in ty.wrapping.list_wrappings() {
                value = ConstValue::List(vec![value]);
            }
            return Ok(Some(value));
        }

        self.coerce_list(ty, value)
    }

    fn coerce_list(&mut self, ty: &TypeRef, value: &Value) -> Result<Option<ConstValue>, InputValueError> {
        let Some(item_type) = ty.item_type() else {
            return self.coerce_named_type(ty, value);
        };

        match value {
            Value::Variable(_) => self.coerce_input_value(ty, value),
            Value::Null if ty.is_non_null() => Err(InputValueError::UnexpectedNull {
                expected: ty.to_string(),
                path: self.values.path.render(),
            }),
            Value::Null => Ok(Some(ConstValue::Null)),
            Value::List(items) => {
                let mut coerced = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    self.values.path.push(index.into());
                    // A missing variable inside a list is a null item.
                    let item = match self.coerce_list(&item_type, item)? {
                        Some(item) => item,
                        None if item_type.is_non_null() => {
                            return Err(InputValueError::UnexpectedNull {
                                expected: item_type.to_string(),
                                path: self.values.path.render(),
                            })
                        }
                        None => ConstValue::Null,
                    };
                    self.values.path.pop();
                    coerced.push(item);
                }
                Ok(Some(ConstValue::List(coerced)))
            }
            value => Err(InputValueError::MissingList {
                actual: value.into(),
                expected: ty.to_string(),
                path: self.values.path.render(),
            }),
        }
    }

    fn coerce_named_type(&mut self, ty: &TypeRef, value: &Value) -> Result<Option<ConstValue>, InputValueError> {
        if let Value::Variable(_) = value {
            return self.coerce_input_value(&named(ty), value);
        }
        if matches!(value, Value::Null) {
            if ty.wrapping.inner_is_required() {
                return Err(InputValueError::UnexpectedNull {
                    expected: named(ty).to_string(),
                    path: self.values.path.render(),
                });
            }
            return Ok(Some(ConstValue::Null));
        }

        let schema = self.schema;
        match schema.named_type(ty) {
            Some(MetaType::Scalar(scalar)) => self.coerce_scalar(scalar, value).map(Some),
            Some(MetaType::Enum(r#enum)) => self.coerce_enum(r#enum, value).map(Some),
            Some(MetaType::InputObject(input_object)) => self.coerce_input_object(input_object, value).map(Some),
            _ => Err(InputValueError::NotAnInputType(ty.named_type().to_string())),
        }
    }

    fn coerce_scalar(&mut self, scalar: &ScalarType, value: &Value) -> Result<ConstValue, InputValueError> {
        // Variables nested in a custom scalar literal are replaced by their values.
        let variables = self.variables;
        let value = value
            .clone()
            .into_const_with(|name| Ok::<_, std::convert::Infallible>(variables.get(&name).cloned().unwrap_or_default()))
            .unwrap_or_else(|never| match never {});
        scalar
            .parse_literal_value(&value)
            .map_err(|err| scalar_error(scalar, &value, err, &self.values.path))
    }

    fn coerce_enum(&mut self, r#enum: &EnumType, value: &Value) -> Result<ConstValue, InputValueError> {
        let Value::Enum(name) = value else {
            return Err(InputValueError::IncorrectEnumValueType {
                enum_name: r#enum.name.to_string(),
                actual: ValueKind::from(value),
                path: self.values.path.render(),
            });
        };
        r#enum
            .parse(name)
            .cloned()
            .ok_or_else(|| InputValueError::UnknownEnumValue {
                enum_name: r#enum.name.to_string(),
                value: name.to_string(),
                path: self.values.path.render(),
            })
    }

    fn coerce_input_object(
        &mut self,
        input_object: &InputObjectType,
        value: &Value,
    ) -> Result<ConstValue, InputValueError> {
        let Value::Object(fields) = value else {
            return Err(InputValueError::MissingObject {
                name: input_object.name.to_string(),
                actual: value.into(),
                path: self.values.path.render(),
            });
        };

        if let Some(name) = fields.keys().find(|name| !input_object.fields.contains_key(*name)) {
            return Err(InputValueError::UnknownInputField {
                input_object: input_object.name.to_string(),
                name: name.to_string(),
                path: self.values.path.render(),
            });
        }

        let mut coerced = IndexMap::with_capacity(input_object.fields.len());
        for input_field in input_object.fields.values() {
            self.values.path.push((&input_field.name).into());
            let value = match fields.get(&input_field.name) {
                Some(value) => self.coerce_input_value(&input_field.ty, value)?,
                None => None,
            };
            let value = match (value, &input_field.default_value) {
                (Some(value), _) => Some(value),
                (None, Some(default_value)) => Some(
                    self.values
                        .coerce_input_value(&input_field.ty, default_value.clone())?,
                ),
                (None, None) if input_field.ty.is_non_null() => {
                    self.values.path.pop();
                    return Err(missing_required_field(
                        input_object,
                        &input_field.name,
                        &input_field.ty,
                        &self.values.path,
                    ));
                }
                (None, None) => None,
            };
            self.values.path.pop();
            if let Some(value) = value {
                coerced.insert(input_field.name.clone(), value);
            }
        }

        Ok(ConstValue::Object(coerced))
    }
}
