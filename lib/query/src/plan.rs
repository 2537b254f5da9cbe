use crate::{PreparedQuery, QueryKind};

/// Ceilings applied to every query before it reaches the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    /// The largest number of rows a SELECT query may return.
    pub max_limit: usize,
    /// The largest number of rows requested from the backend in a single chunk.
    pub max_chunk_limit: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_limit: 10_000,
            max_chunk_limit: 1_000,
        }
    }
}

/// How a prepared query is sent to the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionPlan {
    /// One request. `limit` is the row limit forced onto the query, `None` for query forms
    /// that are forwarded without a limit override.
    Single { limit: Option<usize> },
    /// Sequential chunk requests, see [`SplitPlan`].
    Split(SplitPlan),
}

/// Pagination of a SELECT query into sequential chunk requests.
///
/// The window is relative to the declared `OFFSET`: rows `[start_offset, start_offset + limit)`
/// are fetched in chunks of at most `chunk_size` rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitPlan {
    pub limit: usize,
    pub chunk_size: usize,
    pub start_offset: usize,
}

impl SplitPlan {
    /// The `(offset, length)` of the first chunk.
    pub fn first_chunk(&self) -> (usize, usize) {
        (self.start_offset, self.chunk_length(self.start_offset))
    }

    /// The chunk that follows the chunk at `offset`, given that it returned `returned` rows.
    ///
    /// Returns `None` once the limit is reached, once the backend returned fewer rows than
    /// requested, or when the next offset is not representable.
    pub fn next_chunk(&self, offset: usize, returned: usize) -> Option<(usize, usize)> {
        let requested = self.chunk_length(offset);
        let fetched = offset - self.start_offset + requested;
        if fetched >= self.limit || returned < requested {
            return None;
        }
        let next = offset.checked_add(requested)?;
        Some((next, self.chunk_length(next)))
    }

    fn chunk_length(&self, offset: usize) -> usize {
        let remaining = self.limit - (offset - self.start_offset);
        self.chunk_size.min(remaining)
    }
}

impl PreparedQuery {
    /// Decides how this query is executed under `limits`.
    ///
    /// Only SELECT queries are ever split; the other forms are always single-shot and are not
    /// given a limit override.
    pub fn plan(&self, limits: Limits, splitting: bool) -> ExecutionPlan {
        if self.kind() != QueryKind::Select {
            return ExecutionPlan::Single { limit: None };
        }
        let limit = self
            .limit()
            .unwrap_or(limits.max_limit)
            .min(limits.max_limit);
        let chunk_size = limit.min(limits.max_chunk_limit);
        if !splitting || chunk_size == 0 {
            return ExecutionPlan::Single { limit: Some(limit) };
        }
        ExecutionPlan::Split(SplitPlan {
            limit,
            chunk_size,
            start_offset: self.offset(),
        })
    }
}
