use std::collections::HashSet;

use async_graphql_parser::{
    types::{Directive, Field, Selection, SelectionSet, TypeCondition},
    Positioned,
};
use async_graphql_value::{ConstValue, Name, Value};
use indexmap::IndexMap;

use super::ExecutionContext;
use crate::schema::ObjectType;

/// Field nodes of a selection set grouped by response key, in document order.
pub(crate) type GroupedFields<'a> = IndexMap<&'a Name, Vec<&'a Positioned<Field>>>;

impl<'a> ExecutionContext<'a> {
    /// Merges the selection sets applying to an object of the given runtime type.
    ///
    /// Fields from fragments whose type condition does not match the object are left out, as are
    /// selections excluded by `@skip` or `@include`. Each named fragment is visited once.
    pub(crate) fn collect_fields<'f>(
        &'f self,
        object_type: &ObjectType,
        selection_sets: impl IntoIterator<Item = &'f Positioned<SelectionSet>>,
    ) -> GroupedFields<'f>
    where
        'a: 'f,
    {
        let mut fields = GroupedFields::new();
        let mut visited_fragments = HashSet::new();
        for selection_set in selection_sets {
            self.collect_fields_into(object_type, selection_set, &mut fields, &mut visited_fragments);
        }
        fields
    }

    fn collect_fields_into<'f>(
        &'f self,
        object_type: &ObjectType,
        selection_set: &'f Positioned<SelectionSet>,
        fields: &mut GroupedFields<'f>,
        visited_fragments: &mut HashSet<&'f str>,
    ) where
        'a: 'f,
    {
        for selection in &selection_set.node.items {
            match &selection.node {
                Selection::Field(field) => {
                    if !self.should_include(&field.node.directives) {
                        continue;
                    }
                    fields.entry(&field.node.response_key().node).or_default().push(field);
                }
                Selection::FragmentSpread(spread) => {
                    let name = spread.node.fragment_name.node.as_str();
                    if !self.should_include(&spread.node.directives) || !visited_fragments.insert(name) {
                        continue;
                    }
                    let Some(fragment) = self.fragments.get(name) else {
                        continue;
                    };
                    if !self.does_fragment_condition_match(Some(&fragment.node.type_condition), object_type) {
                        continue;
                    }
                    self.collect_fields_into(object_type, &fragment.node.selection_set, fields, visited_fragments);
                }
                Selection::InlineFragment(fragment) => {
                    if !self.should_include(&fragment.node.directives)
                        || !self.does_fragment_condition_match(fragment.node.type_condition.as_ref(), object_type)
                    {
                        continue;
                    }
                    self.collect_fields_into(object_type, &fragment.node.selection_set, fields, visited_fragments);
                }
            }
        }
    }

    fn does_fragment_condition_match(
        &self,
        type_condition: Option<&Positioned<TypeCondition>>,
        object_type: &ObjectType,
    ) -> bool {
        let Some(type_condition) = type_condition else {
            return true;
        };
        let on = type_condition.node.on.node.as_str();
        on == object_type.name.as_str() || self.schema.is_possible_type(on, &object_type.name)
    }

    fn should_include(&self, directives: &[Positioned<Directive>]) -> bool {
        for directive in directives {
            let skip = match directive.node.name.node.as_str() {
                "skip" => true,
                "include" => false,
                _ => continue,
            };
            let condition = directive.node.get_argument("if").and_then(|value| match &value.node {
                Value::Boolean(condition) => Some(*condition),
                Value::Variable(name) => match self.variables.get(name) {
                    Some(ConstValue::Boolean(condition)) => Some(*condition),
                    _ => None,
                },
                _ => None,
            });
            match (skip, condition) {
                (true, Some(true)) | (false, Some(false)) => return false,
                _ => {}
            }
        }
        true
    }
}
