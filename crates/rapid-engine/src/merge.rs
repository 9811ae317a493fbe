//! Read reconstruction: many flat rows in, nested documents out.
//!
//! Rows are ordered with [`compare_paths`], so every ancestor precedes its
//! descendants and numeric ids sort by value. Each row is attached to its
//! nearest ancestor row, found through a path index rather than by scanning
//! earlier rows. The remaining segments between the two decide where the
//! child lands: a trailing numeric id is dropped and the rest becomes a
//! chain of field names, the last of which holds a sequence.
//!
//! Attachment never discards a row. Children sharing an intermediate field
//! are merged into one container, and a sequence meeting a container keeps
//! both.

use std::collections::HashMap;

use tracing::debug;

use rapid_table::Row;
use rapid_types::{compare_paths, is_numeric_segment, Document, Value, SEPARATOR};

use crate::rows::row_to_document;

/// Rebuild nested documents from the rows of one scope.
///
/// Returns one document per root row (a row with no ancestor among
/// `rows`), in ascending path order. Input order does not matter.
pub fn reconstruct(rows: Vec<Row>) -> Vec<Document> {
    let mut rows = rows;
    rows.sort_by(|a, b| compare_paths(a.sort_key(), b.sort_key()));
    rows.dedup_by(|a, b| a.sort_key() == b.sort_key());

    let paths: Vec<String> = rows.iter().map(|r| r.sort_key().to_string()).collect();
    let mut docs: Vec<Option<Document>> =
        rows.into_iter().map(|r| Some(row_to_document(r))).collect();

    let index: HashMap<&str, usize> = paths
        .iter()
        .enumerate()
        .map(|(i, p)| (p.as_str(), i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); paths.len()];
    let mut roots = Vec::new();
    for (i, path) in paths.iter().enumerate() {
        match nearest_ancestor(path, &index) {
            Some(parent) => children[parent].push(i),
            None => roots.push(i),
        }
    }

    // Descendants sort after their ancestors, so walking backwards finishes
    // every child before its parent takes it.
    for i in (0..paths.len()).rev() {
        if children[i].is_empty() {
            continue;
        }
        let Some(mut parent) = docs[i].take() else {
            continue;
        };
        let mut groups: Vec<(Vec<&str>, Vec<Document>)> = Vec::new();
        for &c in &children[i] {
            let Some(child) = docs[c].take() else {
                continue;
            };
            let chain = field_chain(&paths[i], &paths[c]);
            match groups.iter_mut().find(|(g, _)| *g == chain) {
                Some((_, members)) => members.push(child),
                None => groups.push((chain, vec![child])),
            }
        }
        for (chain, members) in groups {
            let Some((head, rest)) = chain.split_first() else {
                continue;
            };
            let incoming = nest(rest, members);
            let existing = parent.remove(head);
            parent.insert(*head, merge_value(existing, incoming));
        }
        docs[i] = Some(parent);
    }

    debug!(rows = paths.len(), roots = roots.len(), "documents reconstructed");
    roots.into_iter().filter_map(|i| docs[i].take()).collect()
}

fn nearest_ancestor(path: &str, index: &HashMap<&str, usize>) -> Option<usize> {
    let mut current = path;
    while let Some(idx) = current.rfind(SEPARATOR) {
        if idx == 0 {
            return None;
        }
        current = &current[..idx];
        if let Some(&i) = index.get(current) {
            return Some(i);
        }
    }
    None
}

/// Field names leading from `parent` to `child`.
///
/// A trailing numeric id is an element of the sequence held by the field
/// before it. A lone numeric segment has no such field and is used as the
/// field name itself.
fn field_chain<'a>(parent: &str, child: &'a str) -> Vec<&'a str> {
    let mut segments: Vec<&str> = child[parent.len() + 1..].split(SEPARATOR).collect();
    let ends_in_id = segments.last().is_some_and(|s| is_numeric_segment(s));
    if ends_in_id && segments.len() > 1 {
        segments.pop();
    }
    segments
}

fn nest(rest: &[&str], members: Vec<Document>) -> Value {
    match rest.split_first() {
        None => Value::Sequence(members),
        Some((field, rest)) => {
            let mut container = Document::new();
            container.insert(*field, nest(rest, members));
            Value::Object(container)
        }
    }
}

fn merge_value(existing: Option<Value>, incoming: Value) -> Value {
    match (existing, incoming) {
        (None, incoming) | (Some(Value::Scalar(_)), incoming) => incoming,
        (Some(_), Value::Scalar(scalar)) => Value::Scalar(scalar),
        (Some(Value::Object(mut into)), Value::Object(from)) => {
            merge_documents(&mut into, from);
            Value::Object(into)
        }
        (Some(Value::Sequence(mut items)), Value::Sequence(more)) => {
            items.extend(more);
            Value::Sequence(items)
        }
        (Some(Value::Sequence(mut items)), Value::Object(container)) => {
            match items.iter_mut().rev().find(|d| d.path().is_none()) {
                Some(open) => merge_documents(open, container),
                None => items.push(container),
            }
            Value::Sequence(items)
        }
        (Some(Value::Object(container)), Value::Sequence(more)) => {
            let mut items = Vec::with_capacity(more.len() + 1);
            items.push(container);
            items.extend(more);
            Value::Sequence(items)
        }
    }
}

fn merge_documents(into: &mut Document, from: Document) {
    for (field, value) in from {
        let existing = into.remove(&field);
        into.insert(field, merge_value(existing, value));
    }
}
