//! Write decomposition: one nested document in, many flat rows out.
//!
//! Scalar fields of a document level stay together in that level's row.
//! Every nested object, and every element of a nested sequence, becomes an
//! independent document written beneath `<level path>/<field name>`, or at
//! the literal `path` it carries when that path lies inside the field's
//! scope. Levels without scalar fields are pure containers and get no row.
//!
//! The level's own row is resolved first, so a document posted to a
//! collection places its children under the newly allocated item path.
//!
//! Every input error (depth, field names, `path` fields, segment limits) is
//! found by a validation pass before the first row is written, so a rejected
//! document leaves the table untouched. Table failures during the write
//! itself are not atomic: the first one is returned and rows already written
//! stay in place.

use tracing::debug;

use rapid_types::{
    is_numeric_segment, Document, DocumentError, PathError, Scalar, StorePath, Value,
    MAX_PATH_SEGMENTS, PATH_FIELD, SEPARATOR,
};

use crate::error::{EngineError, EngineResult};
use crate::rows::{Fields, RowStore};

pub struct Decomposer<'a> {
    rows: &'a RowStore,
    max_depth: usize,
    allocation_attempts: u32,
}

impl<'a> Decomposer<'a> {
    pub fn new(rows: &'a RowStore, max_depth: usize, allocation_attempts: u32) -> Self {
        Self {
            rows,
            max_depth,
            allocation_attempts,
        }
    }

    /// Persist `document` at `path`.
    ///
    /// Returns the stored view: the scalar fields and resolved `path` of the
    /// row written for this level (if any), plus the stored view of every
    /// nested document under its original field name.
    pub fn decompose(&self, path: &StorePath, document: Document) -> EngineResult<Document> {
        self.validate(path.as_str(), &[Shape::of(path)], &document, 0)?;
        self.decompose_at(path, document, 0)
    }

    /// Reject `document` if any level of it would fail to decompose.
    ///
    /// Item ids are only known once rows are claimed, so a level is checked
    /// against every path it may land on: the field scope, and the literal
    /// `path` it carries when that one could be honoured.
    fn validate(
        &self,
        label: &str,
        shapes: &[Shape],
        document: &Document,
        depth: usize,
    ) -> EngineResult<()> {
        if depth > self.max_depth {
            return Err(EngineError::DepthExceeded {
                max: self.max_depth,
                path: label.to_string(),
            });
        }

        let mut has_residual = false;
        for (field, value) in document.iter() {
            match value {
                Value::Scalar(_) if field == PATH_FIELD => {}
                Value::Scalar(_) => has_residual = true,
                Value::Object(_) if field == PATH_FIELD => {
                    return Err(reserved_path(label, "object"));
                }
                Value::Sequence(_) if field == PATH_FIELD => {
                    return Err(reserved_path(label, "array"));
                }
                _ if field.is_empty() || field.contains(SEPARATOR) => {
                    return Err(DocumentError::InvalidFieldName(field.clone()).into());
                }
                _ => {}
            }
        }

        let base = shapes
            .iter()
            .map(|shape| shape.written(has_residual))
            .max()
            .unwrap_or(0);
        within_limit(base)?;

        for (field, value) in document.iter() {
            let children: &[Document] = match value {
                Value::Object(child) => std::slice::from_ref(child),
                Value::Sequence(children) => children,
                Value::Scalar(_) => continue,
            };
            let scope = Shape {
                segments: base + 1,
                is_collection: !is_numeric_segment(field),
            };
            within_limit(scope.segments)?;
            let label = format!("{label}{SEPARATOR}{field}");
            for child in children {
                match path_literal(field, child)? {
                    Some(literal) => {
                        let shapes = [scope, Shape::of(&literal)];
                        self.validate(&label, &shapes, child, depth + 1)?;
                    }
                    None => self.validate(&label, &[scope], child, depth + 1)?,
                }
            }
        }
        Ok(())
    }

    fn decompose_at(
        &self,
        path: &StorePath,
        document: Document,
        depth: usize,
    ) -> EngineResult<Document> {
        let mut residual = Fields::new();
        let mut nested = Vec::new();
        for (field, value) in document {
            match value {
                Value::Scalar(_) if field == PATH_FIELD => {}
                Value::Scalar(scalar) => {
                    residual.insert(field, scalar);
                }
                other => nested.push((field, other)),
            }
        }

        let (base, mut stored) = if residual.is_empty() {
            (path.clone(), Document::new())
        } else {
            self.rows.put(path, residual, self.allocation_attempts)?
        };

        for (field, value) in nested {
            let scope = base.child(&field)?;
            match value {
                Value::Object(child) => {
                    let target = resolve_target(&scope, &field, &child)?;
                    let child_stored = self.decompose_at(&target, child, depth + 1)?;
                    if !child_stored.is_empty() {
                        stored.insert(field, Value::Object(child_stored));
                    }
                }
                Value::Sequence(children) => {
                    let mut items = Vec::with_capacity(children.len());
                    for child in children {
                        let target = resolve_target(&scope, &field, &child)?;
                        items.push(self.decompose_at(&target, child, depth + 1)?);
                    }
                    stored.insert(field, Value::Sequence(items));
                }
                Value::Scalar(_) => {}
            }
        }

        debug!(path = %base, depth, fields = stored.len(), "level decomposed");
        Ok(stored)
    }
}

/// Segment count and kind of a path a level may be written at.
#[derive(Clone, Copy)]
struct Shape {
    segments: usize,
    is_collection: bool,
}

impl Shape {
    fn of(path: &StorePath) -> Self {
        Self {
            segments: path.segment_count(),
            is_collection: path.is_collection(),
        }
    }

    /// Segments of the row path, counting the id allocated for a collection.
    fn written(self, has_residual: bool) -> usize {
        self.segments + usize::from(self.is_collection && has_residual)
    }
}

fn within_limit(segments: usize) -> EngineResult<()> {
    if segments > MAX_PATH_SEGMENTS {
        return Err(PathError::TooManySegments {
            max: MAX_PATH_SEGMENTS,
            actual: segments,
        }
        .into());
    }
    Ok(())
}

fn reserved_path(at: &str, found: &'static str) -> EngineError {
    DocumentError::InvalidPathField {
        field: at.to_string(),
        found,
    }
    .into()
}

/// The `path` a nested document carries, if any.
///
/// `null` counts as absent. Anything other than a well-formed path string is
/// rejected.
fn path_literal(field: &str, child: &Document) -> EngineResult<Option<StorePath>> {
    match child.get(PATH_FIELD) {
        None | Some(Value::Scalar(Scalar::Null)) => Ok(None),
        Some(Value::Scalar(Scalar::String(literal))) => Ok(Some(StorePath::parse(literal)?)),
        Some(Value::Scalar(other)) => Err(DocumentError::InvalidPathField {
            field: field.to_string(),
            found: other.type_name(),
        }
        .into()),
        Some(Value::Sequence(_)) => Err(DocumentError::InvalidPathField {
            field: field.to_string(),
            found: "array",
        }
        .into()),
        Some(Value::Object(_)) => Err(DocumentError::InvalidPathField {
            field: field.to_string(),
            found: "object",
        }
        .into()),
    }
}

/// Where a nested document is written.
///
/// A document read back from the store carries its own `path`. When that
/// path is the field scope or lies beneath it, writing the document again
/// targets the same row instead of allocating a new one.
fn resolve_target(scope: &StorePath, field: &str, child: &Document) -> EngineResult<StorePath> {
    match path_literal(field, child)? {
        Some(literal) if scope.contains(literal.as_str()) => Ok(literal),
        _ => Ok(scope.clone()),
    }
}
