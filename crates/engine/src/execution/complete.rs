use async_graphql_value::ConstValue;
use error::{ErrorCode, GraphqlError};
use futures::{
    future::{self, BoxFuture},
    FutureExt,
};

use super::{field::CompletionResult, location, ExecutionContext, QueryPath};
use crate::{
    resolver::ResolveInfo,
    schema::{EnumType, MetaType, ObjectType, ScalarType, TypeRef},
    value::FieldValue,
};

impl<'a> ExecutionContext<'a> {
    /// Completes the raw value of a field against its declared type.
    pub(super) fn complete_value<'f>(
        &'f self,
        ty: &'f TypeRef,
        info: &'f ResolveInfo<'f>,
        value: FieldValue,
    ) -> BoxFuture<'f, CompletionResult>
    where
        'a: 'f,
    {
        self.complete_value_at(ty.clone(), info, info.path.clone(), value)
    }

    fn complete_value_at<'f>(
        &'f self,
        ty: TypeRef,
        info: &'f ResolveInfo<'f>,
        path: QueryPath,
        value: FieldValue,
    ) -> BoxFuture<'f, CompletionResult>
    where
        'a: 'f,
    {
        async move {
            if ty.is_non_null() {
                let completed = self
                    .complete_value_at(ty.without_non_null(), info, path.clone(), value)
                    .await?;
                if completed == ConstValue::Null {
                    return Err(self.located(
                        GraphqlError::new(
                            format!(
                                "Cannot return null for non-nullable field {}.{}.",
                                info.parent_type.name, info.field_name
                            ),
                            ErrorCode::ValueCompletionError,
                        ),
                        info,
                        &path,
                    ));
                }
                return Ok(completed);
            }

            if value.is_null() {
                return Ok(ConstValue::Null);
            }

            if let Some(item_type) = ty.item_type() {
                return self.complete_list_value(item_type, info, path, value).await;
            }

            let schema = self.schema;
            match schema.named_type(&ty) {
                Some(MetaType::Scalar(scalar)) => self.complete_scalar_value(scalar, info, &path, &value),
                Some(MetaType::Enum(r#enum)) => self.complete_enum_value(r#enum, info, &path, &value),
                Some(MetaType::Object(object)) => self.complete_object_value(object, info, path, value).await,
                Some(MetaType::Interface(_) | MetaType::Union(_)) => {
                    let object = self.resolve_abstract_type(ty.named_type(), info, &path, &value)?;
                    self.complete_object_value(object, info, path, value).await
                }
                Some(MetaType::InputObject(_)) | None => Err(self.located(
                    GraphqlError::new(
                        format!(
                            "Field {}.{} has a type {ty} which cannot be used as an output type.",
                            info.parent_type.name, info.field_name
                        ),
                        ErrorCode::InternalServerError,
                    ),
                    info,
                    &path,
                )),
            }
        }
        .boxed()
    }

    /// Items are completed concurrently. A failed non-null item nulls the whole list.
    async fn complete_list_value<'f>(
        &'f self,
        item_type: TypeRef,
        info: &'f ResolveInfo<'f>,
        path: QueryPath,
        value: FieldValue,
    ) -> CompletionResult
    where
        'a: 'f,
    {
        let items = match value.into_untyped() {
            FieldValue::List(items) => items,
            FieldValue::Value(ConstValue::List(items)) => items.into_iter().map(FieldValue::Value).collect(),
            _ => {
                return Err(self.located(
                    GraphqlError::new(
                        format!(
                            "Expected Iterable, but did not find one for field \"{}.{}\".",
                            info.parent_type.name, info.field_name
                        ),
                        ErrorCode::ValueCompletionError,
                    ),
                    info,
                    &path,
                ))
            }
        };

        let completions = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| self.complete_value_at(item_type.clone(), info, path.index(index), item));

        let mut completed = Vec::new();
        let mut bubbled = None;
        for result in future::join_all(completions).await {
            match result.or_else(|error| self.handle_field_error(error, &item_type)) {
                Ok(item) => completed.push(item),
                Err(error) if bubbled.is_none() => bubbled = Some(error),
                Err(error) => self.add_error(error),
            }
        }
        match bubbled {
            Some(error) => Err(error),
            None => Ok(ConstValue::List(completed)),
        }
    }

    fn complete_scalar_value(
        &self,
        scalar: &ScalarType,
        info: &ResolveInfo<'_>,
        path: &QueryPath,
        value: &FieldValue,
    ) -> CompletionResult {
        let serialized = match value.to_const() {
            Some(value) => scalar.serialize_value(&value),
            None => Err(format!("{} cannot represent an object value: {value:?}", scalar.name)),
        };
        serialized.map_err(|message| {
            self.located(
                GraphqlError::new(message, ErrorCode::ValueCompletionError),
                info,
                path,
            )
        })
    }

    fn complete_enum_value(
        &self,
        r#enum: &EnumType,
        info: &ResolveInfo<'_>,
        path: &QueryPath,
        value: &FieldValue,
    ) -> CompletionResult {
        value
            .to_const()
            .and_then(|value| r#enum.serialize(&value).cloned())
            .map(ConstValue::Enum)
            .ok_or_else(|| {
                self.located(
                    GraphqlError::new(
                        format!("Enum \"{}\" cannot represent value: {value:?}", r#enum.name),
                        ErrorCode::ValueCompletionError,
                    ),
                    info,
                    path,
                )
            })
    }

    async fn complete_object_value<'f>(
        &'f self,
        object: &'f ObjectType,
        info: &'f ResolveInfo<'f>,
        path: QueryPath,
        value: FieldValue,
    ) -> CompletionResult
    where
        'a: 'f,
    {
        if let Some(is_type_of) = &object.is_type_of {
            if !is_type_of(&value) {
                return Err(self.located(
                    GraphqlError::new(
                        format!("Expected value of type \"{}\" but got: {value:?}.", object.name),
                        ErrorCode::ValueCompletionError,
                    ),
                    info,
                    &path,
                ));
            }
        }

        let fields = self.collect_fields(object, info.field_nodes.iter().map(|node| &node.node.selection_set));
        self.execute_fields(object, &value, path, fields, false).await
    }

    fn resolve_abstract_type(
        &self,
        abstract_type: &str,
        info: &ResolveInfo<'_>,
        path: &QueryPath,
        value: &FieldValue,
    ) -> Result<&'a ObjectType, GraphqlError> {
        let schema = self.schema;
        let type_resolver = match schema.get_type(abstract_type) {
            Some(MetaType::Interface(interface)) => interface.resolve_type.as_ref(),
            Some(MetaType::Union(union)) => union.resolve_type.as_ref(),
            _ => None,
        }
        .unwrap_or(&self.type_resolver);

        let error = |message: String| {
            self.located(GraphqlError::new(message, ErrorCode::TypeResolutionError), info, path)
        };

        let Some(type_name) = type_resolver.resolve(value, info, abstract_type) else {
            return Err(error(format!(
                "Abstract type \"{abstract_type}\" must resolve to an Object type at runtime for field \"{}.{}\". \
                 Either the \"{abstract_type}\" type should provide a \"resolveType\" function or each possible \
                 type should provide an \"isTypeOf\" function.",
                info.parent_type.name, info.field_name
            )));
        };

        let Some(object) = schema.get_type(&type_name).and_then(MetaType::as_object) else {
            return Err(error(format!(
                "Abstract type \"{abstract_type}\" was resolved to a type \"{type_name}\" that does not exist inside the schema."
            )));
        };

        if !schema.is_possible_type(abstract_type, &object.name) {
            return Err(error(format!(
                "Runtime Object type \"{type_name}\" is not a possible type for \"{abstract_type}\"."
            )));
        }

        Ok(object)
    }

    fn located(&self, error: GraphqlError, info: &ResolveInfo<'_>, path: &QueryPath) -> GraphqlError {
        error
            .with_locations(info.field_nodes.iter().map(|node| location(node.pos)))
            .with_path(path.to_error_path())
    }
}
