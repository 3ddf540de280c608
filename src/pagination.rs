//! Limit/offset clamping for list queries.

use crate::store::DocumentQuery;

pub const DEFAULT_MAX_LIMIT: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("Invalid limit")]
    InvalidLimit,
    #[error("Invalid offset")]
    InvalidOffset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub max_limit: i64,
}

impl Default for Pagination {
    fn default() -> Self { Self { max_limit: DEFAULT_MAX_LIMIT } }
}

impl Pagination {
    /// Apply `limit` and `offset` to `query`. Zero or absent values are ignored;
    /// both are checked before either is applied.
    pub fn apply<Q: DocumentQuery>(
        &self,
        query: &mut Q,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<(), PaginationError> {
        let limit = limit.filter(|&l| l != 0);
        let offset = offset.filter(|&o| o != 0);
        if let Some(l) = limit {
            if l < 0 || l > self.max_limit {
                return Err(PaginationError::InvalidLimit);
            }
        }
        if offset.is_some_and(|o| o < 0) {
            return Err(PaginationError::InvalidOffset);
        }
        if let Some(l) = limit {
            query.limit(l as u64);
        }
        if let Some(o) = offset {
            query.skip(o as u64);
        }
        Ok(())
    }
}

pub fn paginate<Q: DocumentQuery>(query: &mut Q, limit: Option<i64>, offset: Option<i64>) -> Result<(), PaginationError> {
    Pagination::default().apply(query, limit, offset)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use async_trait::async_trait;
    use serde_json::Value;

    #[derive(Debug, Default)]
    struct Recorder {
        limit: Option<u64>,
        skip: Option<u64>,
    }

    #[async_trait]
    impl DocumentQuery for Recorder {
        fn limit(&mut self, limit: u64) { self.limit = Some(limit); }
        fn skip(&mut self, offset: u64) { self.skip = Some(offset); }
        async fn materialize(self, _: &[String]) -> Result<Value, StoreError> { Ok(Value::Null) }
    }

    #[test]
    fn limit_above_max_is_rejected() {
        let mut q = Recorder::default();
        assert_eq!(paginate(&mut q, Some(25), None), Err(PaginationError::InvalidLimit));
        assert_eq!(paginate(&mut q, Some(-1), None), Err(PaginationError::InvalidLimit));
        assert!(q.limit.is_none());
    }

    #[test]
    fn negative_offset_is_rejected() {
        let mut q = Recorder::default();
        assert_eq!(paginate(&mut q, Some(10), Some(-1)), Err(PaginationError::InvalidOffset));
        assert!(q.limit.is_none());
    }

    #[test]
    fn valid_values_are_applied() {
        let mut q = Recorder::default();
        paginate(&mut q, Some(10), Some(5)).unwrap();
        assert_eq!((q.limit, q.skip), (Some(10), Some(5)));
    }

    #[test]
    fn zero_and_absent_are_ignored() {
        let mut q = Recorder::default();
        paginate(&mut q, Some(0), None).unwrap();
        assert_eq!((q.limit, q.skip), (None, None));
        Pagination { max_limit: 50 }.apply(&mut q, Some(50), Some(0)).unwrap();
        assert_eq!((q.limit, q.skip), (Some(50), None));
    }
}
