use std::{fmt, sync::Arc};

use async_graphql_value::Name;
use error::{ErrorPath, ErrorPathSegment};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(Name),
    Index(usize),
}

struct PathNode {
    parent: QueryPath,
    segment: PathSegment,
    type_name: Option<Name>,
}

/// Position in the response being built.
///
/// Extending a path allocates a single node pointing at its parent, so sibling fields share every
/// segment up to their common ancestor and a path is never mutated once created.
#[derive(Clone, Default)]
pub struct QueryPath(Option<Arc<PathNode>>);

impl QueryPath {
    pub fn empty() -> Self {
        QueryPath(None)
    }

    /// Path of a field (with the name of its parent type) or of a list item.
    #[must_use]
    pub fn child(&self, segment: PathSegment, type_name: Option<&Name>) -> Self {
        QueryPath(Some(Arc::new(PathNode {
            parent: self.clone(),
            segment,
            type_name: type_name.cloned(),
        })))
    }

    #[must_use]
    pub fn field(&self, response_key: &Name, parent_type: &Name) -> Self {
        self.child(PathSegment::Field(response_key.clone()), Some(parent_type))
    }

    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.child(PathSegment::Index(index), None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn last(&self) -> Option<&PathSegment> {
        self.0.as_deref().map(|node| &node.segment)
    }

    /// Name of the parent type of the innermost field.
    pub fn type_name(&self) -> Option<&Name> {
        self.0.as_deref().and_then(|node| node.type_name.as_ref())
    }

    /// Segments from the root down to this position.
    pub fn segments(&self) -> Vec<&PathSegment> {
        let mut segments = Vec::new();
        let mut current = self.0.as_deref();
        while let Some(node) = current {
            segments.push(&node.segment);
            current = node.parent.0.as_deref();
        }
        segments.reverse();
        segments
    }

    pub fn to_error_path(&self) -> ErrorPath {
        self.segments()
            .into_iter()
            .map(|segment| match segment {
                PathSegment::Field(name) => ErrorPathSegment::Field(name.as_str().into()),
                PathSegment::Index(index) => ErrorPathSegment::Index(*index),
            })
            .collect()
    }
}

impl fmt::Display for QueryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments().into_iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Field(name) => f.write_str(name)?,
                PathSegment::Index(index) => write!(f, "{index}")?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for QueryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueryPath({self})")
    }
}
