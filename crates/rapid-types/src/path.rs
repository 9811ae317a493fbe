//! Store paths and the path classifier.
//!
//! A path is a `/`-separated list of non-empty segments with a leading
//! separator: `/users/1/orders`. Its kind is derived from the final segment:
//! all decimal digits means the path addresses a single item, anything else
//! addresses a collection.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PathError;

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// Upper bound on the number of segments in a single path.
pub const MAX_PATH_SEGMENTS: usize = 128;

/// Returns `true` if `segment` matches `^\d+$`.
pub fn is_numeric_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Parse an item identifier out of a single path segment.
///
/// Returns `None` for non-numeric segments and for numeric segments that do
/// not fit in a `u64`.
pub fn parse_item_id(segment: &str) -> Option<u64> {
    if !is_numeric_segment(segment) {
        return None;
    }
    segment.parse().ok()
}

/// Classify a raw path string.
///
/// Splits on `/`, drops the empty leading segment and inspects the last one:
/// the path is a collection unless that segment is numeric. Total over any
/// input; callers wanting validation should go through [`StorePath::parse`].
pub fn is_collection_path(path: &str) -> bool {
    let last = path.rsplit(SEPARATOR).next().unwrap_or("");
    !is_numeric_segment(last)
}

/// Order two paths segment by segment.
///
/// Numeric segments compare by value, so `/c/2` sorts before `/c/10`; other
/// segments compare bytewise. A path always sorts before its descendants.
pub fn compare_paths(a: &str, b: &str) -> Ordering {
    let mut left = a.split(SEPARATOR);
    let mut right = b.split(SEPARATOR);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = compare_segments(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_segments(l: &str, r: &str) -> Ordering {
    if is_numeric_segment(l) && is_numeric_segment(r) {
        let lt = l.trim_start_matches('0');
        let rt = r.trim_start_matches('0');
        lt.len()
            .cmp(&rt.len())
            .then_with(|| lt.cmp(rt))
            .then_with(|| l.cmp(r))
    } else {
        l.cmp(r)
    }
}

/// What a path addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathKind {
    /// The final segment is numeric: exactly one document.
    Item,
    /// Every item stored beneath the path.
    Collection,
}

/// A validated store path.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorePath(String);

impl StorePath {
    /// Parse and validate a path.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        let Some(rest) = raw.strip_prefix(SEPARATOR) else {
            return Err(PathError::MissingLeadingSlash(raw.to_string()));
        };
        if rest.is_empty() {
            return Err(PathError::Root(raw.to_string()));
        }
        let mut count = 0;
        for segment in rest.split(SEPARATOR) {
            if segment.is_empty() {
                return Err(PathError::EmptySegment(raw.to_string()));
            }
            count += 1;
        }
        if count > MAX_PATH_SEGMENTS {
            return Err(PathError::TooManySegments {
                max: MAX_PATH_SEGMENTS,
                actual: count,
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Segments after the leading separator.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0[1..].split(SEPARATOR)
    }

    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }

    pub fn last_segment(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or("")
    }

    pub fn kind(&self) -> PathKind {
        if is_numeric_segment(self.last_segment()) {
            PathKind::Item
        } else {
            PathKind::Collection
        }
    }

    pub fn is_collection(&self) -> bool {
        self.kind() == PathKind::Collection
    }

    /// Numeric id of an item path, if it fits in a `u64`.
    pub fn item_id(&self) -> Option<u64> {
        parse_item_id(self.last_segment())
    }

    /// Append a single segment.
    pub fn child(&self, name: &str) -> Result<Self, PathError> {
        if name.is_empty() || name.contains(SEPARATOR) {
            return Err(PathError::EmptySegment(format!("{}/{}", self.0, name)));
        }
        self.push(name)
    }

    /// The item path `<self>/<id>`.
    pub fn item(&self, id: u64) -> Result<Self, PathError> {
        self.push(&id.to_string())
    }

    fn push(&self, segment: &str) -> Result<Self, PathError> {
        if self.segment_count() >= MAX_PATH_SEGMENTS {
            return Err(PathError::TooManySegments {
                max: MAX_PATH_SEGMENTS,
                actual: self.segment_count() + 1,
            });
        }
        Ok(Self(format!("{}{SEPARATOR}{segment}", self.0)))
    }

    /// The enclosing path, or `None` for a single-segment path.
    pub fn parent(&self) -> Option<Self> {
        let idx = self.0.rfind(SEPARATOR)?;
        if idx == 0 {
            None
        } else {
            Some(Self(self.0[..idx].to_string()))
        }
    }

    /// Prefix shared by every strict descendant: the path plus a trailing `/`.
    pub fn scope_prefix(&self) -> String {
        format!("{}{SEPARATOR}", self.0)
    }

    /// Returns `true` if `other` lies strictly beneath this path.
    ///
    /// The match is bounded by a separator, so `/users` is not an ancestor
    /// of `/users2/1`.
    pub fn is_ancestor_of(&self, other: &str) -> bool {
        other.len() > self.0.len() + 1
            && other.starts_with(self.0.as_str())
            && other[self.0.len()..].starts_with(SEPARATOR)
    }

    /// Returns `true` if `other` is this path or lies beneath it.
    pub fn contains(&self, other: &str) -> bool {
        other == self.0 || self.is_ancestor_of(other)
    }

    /// Segments of `descendant` below this path, or `None` if it is not a
    /// strict descendant.
    pub fn relative_segments<'a>(&self, descendant: &'a str) -> Option<Vec<&'a str>> {
        if !self.is_ancestor_of(descendant) {
            return None;
        }
        Some(descendant[self.0.len() + 1..].split(SEPARATOR).collect())
    }

    /// First segment of `descendant` below this path.
    pub fn immediate_child_segment<'a>(&self, descendant: &'a str) -> Option<&'a str> {
        if !self.is_ancestor_of(descendant) {
            return None;
        }
        descendant[self.0.len() + 1..].split(SEPARATOR).next()
    }
}

impl fmt::Debug for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StorePath({})", self.0)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for StorePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for StorePath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StorePath> for String {
    fn from(path: StorePath) -> Self {
        path.0
    }
}

impl AsRef<str> for StorePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialOrd for StorePath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StorePath {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_paths(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn p(s: &str) -> StorePath {
        StorePath::parse(s).unwrap()
    }

    #[test]
    fn numeric_segments() {
        assert!(is_numeric_segment("1"));
        assert!(is_numeric_segment("007"));
        assert!(!is_numeric_segment(""));
        assert!(!is_numeric_segment("1a"));
        assert!(!is_numeric_segment("-1"));
        assert!(!is_numeric_segment("+1"));
    }

    #[test]
    fn parse_item_id_handles_overflow() {
        assert_eq!(parse_item_id("42"), Some(42));
        assert_eq!(parse_item_id("orders"), None);
        assert_eq!(parse_item_id("99999999999999999999999"), None);
    }

    #[test]
    fn classify_raw_paths() {
        assert!(!is_collection_path("/users/1"));
        assert!(is_collection_path("/users"));
        assert!(is_collection_path("/users/1/orders"));
        assert!(!is_collection_path("/users/1/orders/17"));
    }

    #[test]
    fn kind_and_item_id() {
        let item = p("/users/12");
        assert_eq!(item.kind(), PathKind::Item);
        assert_eq!(item.item_id(), Some(12));
        let coll = p("/users");
        assert_eq!(coll.kind(), PathKind::Collection);
        assert_eq!(coll.item_id(), None);
    }

    #[test]
    fn reject_malformed() {
        assert_eq!(StorePath::parse(""), Err(PathError::Empty));
        assert!(matches!(StorePath::parse("users"), Err(PathError::MissingLeadingSlash(_))));
        assert!(matches!(StorePath::parse("/"), Err(PathError::Root(_))));
        assert!(matches!(StorePath::parse("/a//b"), Err(PathError::EmptySegment(_))));
        assert!(matches!(StorePath::parse("/a/"), Err(PathError::EmptySegment(_))));
    }

    #[test]
    fn reject_too_deep() {
        let raw = "/a".repeat(MAX_PATH_SEGMENTS + 1);
        assert!(matches!(
            StorePath::parse(&raw),
            Err(PathError::TooManySegments { .. })
        ));
        assert!(StorePath::parse(&"/a".repeat(MAX_PATH_SEGMENTS)).is_ok());
    }

    #[test]
    fn segments_skip_leading_separator() {
        let path = p("/users/1/orders");
        assert_eq!(path.segments().collect::<Vec<_>>(), vec!["users", "1", "orders"]);
        assert_eq!(path.last_segment(), "orders");
        assert_eq!(path.segment_count(), 3);
    }

    #[test]
    fn child_item_parent() {
        let users = p("/users");
        let item = users.item(3).unwrap();
        assert_eq!(item.as_str(), "/users/3");
        let orders = item.child("orders").unwrap();
        assert_eq!(orders.as_str(), "/users/3/orders");
        assert_eq!(orders.parent().unwrap(), item);
        assert_eq!(users.parent(), None);
        assert!(users.child("a/b").is_err());
        assert!(users.child("").is_err());
    }

    #[test]
    fn appending_respects_segment_limit() {
        let full = p(&"/a".repeat(MAX_PATH_SEGMENTS));
        assert!(matches!(
            full.item(1),
            Err(PathError::TooManySegments { actual, .. }) if actual == MAX_PATH_SEGMENTS + 1
        ));
        assert!(matches!(
            full.child("b"),
            Err(PathError::TooManySegments { .. })
        ));
        let item = p(&"/a".repeat(MAX_PATH_SEGMENTS - 1)).item(7).unwrap();
        assert_eq!(item.segment_count(), MAX_PATH_SEGMENTS);
        assert_eq!(StorePath::parse(item.as_str()).unwrap(), item);
    }

    #[test]
    fn ancestry_is_separator_bounded() {
        let users = p("/users");
        assert!(users.is_ancestor_of("/users/1"));
        assert!(users.is_ancestor_of("/users/1/orders/2"));
        assert!(!users.is_ancestor_of("/users"));
        assert!(!users.is_ancestor_of("/users2/1"));
        assert!(!users.is_ancestor_of("/users/"));
        assert!(users.contains("/users"));
        assert!(!users.contains("/user"));
    }

    #[test]
    fn relative_segments_and_immediate_child() {
        let parent = p("/users/1");
        assert_eq!(
            parent.relative_segments("/users/1/orders/4"),
            Some(vec!["orders", "4"])
        );
        assert_eq!(parent.relative_segments("/users/10"), None);
        let users = p("/users");
        assert_eq!(users.immediate_child_segment("/users/7/orders/1"), Some("7"));
        assert_eq!(users.immediate_child_segment("/users"), None);
    }

    #[test]
    fn numeric_aware_ordering() {
        let mut paths = vec!["/c/10", "/c/9", "/c/1/x/1", "/c/1", "/c/2", "/b"];
        paths.sort_by(|a, b| compare_paths(a, b));
        assert_eq!(paths, vec!["/b", "/c/1", "/c/1/x/1", "/c/2", "/c/9", "/c/10"]);
    }

    #[test]
    fn leading_zeros_order_deterministically() {
        assert_eq!(compare_paths("/c/01", "/c/1"), Ordering::Less);
        assert_eq!(compare_paths("/c/002", "/c/10"), Ordering::Less);
    }

    #[test]
    fn serde_roundtrip_and_validation() {
        let path = p("/a/1");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/a/1\"");
        let back: StorePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
        assert!(serde_json::from_str::<StorePath>("\"no-slash\"").is_err());
    }

    proptest! {
        #[test]
        fn item_paths_are_never_collections(
            segs in proptest::collection::vec("[a-z]{1,8}", 1..6),
            id in any::<u64>(),
        ) {
            let raw = format!("/{}/{}", segs.join("/"), id);
            prop_assert!(!is_collection_path(&raw));
            let path = StorePath::parse(&raw).unwrap();
            prop_assert_eq!(path.kind(), PathKind::Item);
            prop_assert_eq!(path.item_id(), Some(id));
        }

        #[test]
        fn non_numeric_tails_are_collections(
            segs in proptest::collection::vec("[a-z0-9]{1,8}", 0..6),
            tail in "[a-z][a-z0-9]{0,7}",
        ) {
            let mut all = segs;
            all.push(tail);
            let raw = format!("/{}", all.join("/"));
            prop_assert!(is_collection_path(&raw));
            prop_assert!(StorePath::parse(&raw).unwrap().is_collection());
        }
    }
}
