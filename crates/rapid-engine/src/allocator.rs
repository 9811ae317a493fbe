//! Identifier allocation within a collection.
//!
//! The table has no auto-increment primitive, and a plain "last key under
//! the prefix" lookup is wrong twice over: sort keys compare as strings
//! (`/c/9` sorts after `/c/10`) and the prefix scan spans every depth, so the
//! last key may belong to a nested row. The allocator therefore walks the
//! whole collection scope and takes the largest numeric *immediate child*.
//!
//! A proposed id is only a proposal: [`crate::rows::RowStore::put`] claims it
//! with a conditional put and asks again when a concurrent writer won.

use tracing::debug;

use rapid_types::{parse_item_id, StorePath};

use crate::error::{EngineError, EngineResult};
use crate::rows::RowStore;

pub struct IdAllocator<'a> {
    rows: &'a RowStore,
}

impl<'a> IdAllocator<'a> {
    pub fn new(rows: &'a RowStore) -> Self {
        Self { rows }
    }

    /// Largest numeric id directly beneath `collection`, if any.
    pub fn max_id(&self, collection: &StorePath) -> EngineResult<Option<u64>> {
        let mut max: Option<u64> = None;
        self.rows
            .for_each_with_prefix(&collection.scope_prefix(), |row| {
                let id = collection
                    .immediate_child_segment(row.sort_key())
                    .and_then(parse_item_id);
                if id > max {
                    max = id;
                }
                Ok(())
            })?;
        Ok(max)
    }

    /// Path for the next item in `collection`: `<collection>/1` when the
    /// collection is empty, otherwise one past the largest existing id.
    pub fn next_item_path(&self, collection: &StorePath) -> EngineResult<StorePath> {
        let next = match self.max_id(collection)? {
            None => 1,
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| EngineError::IdExhausted(collection.to_string()))?,
        };
        debug!(collection = %collection, next, "allocated item id");
        Ok(collection.item(next)?)
    }
}
