//! Keyset (cursor) pagination shared by every list endpoint.
//!
//! A list request is turned into [`QueryBounds`] that the store executes
//! (strict inequality on the order key, sort direction, over-fetch limit),
//! and the fetched rows are turned back into a [`KeysetPage`] carrying the
//! trimmed rows and the `nextCursor`/`prevCursor` pair.

mod cursor;
mod keyset;

pub use cursor::{Cursor, CursorKey, KeyComponent};
pub use keyset::{
    Boundary, Comparison, KeysetPage, KeysetPaginator, PaginatedResponse, PaginationInfo,
    QueryBounds, SortDirection,
};

/// Contract violations raised by the paginator. All of them are client errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("\"take\" must be a non-zero integer.")]
    ZeroTake,
    #[error("\"take\" must be an integer.")]
    InvalidTake,
    #[error("Cannot fetch more than {max} items at a time. Requested: {requested}")]
    TakeTooLarge { requested: i64, max: i64 },
    #[error("Cannot paginate backward without a cursor.")]
    BackwardWithoutCursor,
    #[error("Invalid cursor {cursor:?}: {reason}")]
    MalformedCursor { cursor: String, reason: String },
}

/// Order key of transaction lists: `(blockNumber, transactionIndex)`.
pub type TxKey = (i64, i64);

/// Order key of token balance lists: `(counterparty address, blockNumber)`.
pub type HoldingKey = (String, i64);
