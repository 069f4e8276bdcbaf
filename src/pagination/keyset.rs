use std::cmp::Ordering;

use serde::Serialize;

use super::{Cursor, CursorKey, PaginationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Descending,
    Ascending,
}

impl SortDirection {
    pub fn reverse(self) -> Self {
        match self {
            SortDirection::Descending => SortDirection::Ascending,
            SortDirection::Ascending => SortDirection::Descending,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Descending => "DESC",
            SortDirection::Ascending => "ASC",
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Descending => ordering.reverse(),
            SortDirection::Ascending => ordering,
        }
    }
}

/// Strict inequality between a row's key and the boundary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    LessThan,
    GreaterThan,
}

impl Comparison {
    pub fn as_sql(self) -> &'static str {
        match self {
            Comparison::LessThan => "<",
            Comparison::GreaterThan => ">",
        }
    }

    fn holds(self, row_vs_boundary: Ordering) -> bool {
        match self {
            Comparison::LessThan => row_vs_boundary == Ordering::Less,
            Comparison::GreaterThan => row_vs_boundary == Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary<K> {
    pub comparison: Comparison,
    pub key: K,
}

/// What the store has to execute for one page: an optional exclusive
/// boundary on the order key, the physical sort direction and the row limit
/// (page size plus the sentinel row).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBounds<K> {
    pub boundary: Option<Boundary<K>>,
    pub direction: SortDirection,
    pub limit: usize,
}

impl<K> QueryBounds<K> {
    pub fn sql_limit(&self) -> i64 {
        i64::try_from(self.limit).unwrap_or(i64::MAX)
    }
}

impl<K: Ord> QueryBounds<K> {
    pub fn admits(&self, key: &K) -> bool {
        match &self.boundary {
            None => true,
            Some(boundary) => boundary.comparison.holds(key.cmp(&boundary.key)),
        }
    }

    pub fn compare(&self, a: &K, b: &K) -> Ordering {
        self.direction.apply(a.cmp(b))
    }

    /// Runs the bounds against rows held in memory.
    pub fn select_from<R>(&self, rows: impl IntoIterator<Item = R>, key: impl Fn(&R) -> K) -> Vec<R> {
        let mut selected: Vec<R> = rows.into_iter().filter(|r| self.admits(&key(r))).collect();
        selected.sort_by(|a, b| self.compare(&key(a), &key(b)));
        selected.truncate(self.limit);
        selected
    }
}

/// Translates `(take, cursor)` into store bounds and raw rows into a page.
///
/// `take > 0` pages forward (towards the end of the canonical order, i.e.
/// older rows for the usual newest-first lists), `take < 0` pages backward.
/// Whatever the direction, returned pages are in canonical order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeysetPaginator<K> {
    take: i64,
    cursor: Option<K>,
    order: SortDirection,
}

impl<K: CursorKey> KeysetPaginator<K> {
    /// Paginator over a newest-first (descending) list.
    pub fn new(take: i64, cursor: Option<K>) -> Result<Self, PaginationError> {
        Self::with_order(take, cursor, SortDirection::Descending)
    }

    pub fn with_order(
        take: i64,
        cursor: Option<K>,
        order: SortDirection,
    ) -> Result<Self, PaginationError> {
        if take == 0 {
            return Err(PaginationError::ZeroTake);
        }
        if take < 0 && cursor.is_none() {
            return Err(PaginationError::BackwardWithoutCursor);
        }
        Ok(Self {
            take,
            cursor,
            order,
        })
    }

    /// Same as [`KeysetPaginator::new`] with the cursor still encoded.
    pub fn from_raw(take: i64, cursor: Option<&str>) -> Result<Self, PaginationError> {
        Self::from_raw_with_order(take, cursor, SortDirection::Descending)
    }

    pub fn from_raw_with_order(
        take: i64,
        cursor: Option<&str>,
        order: SortDirection,
    ) -> Result<Self, PaginationError> {
        let cursor = cursor.map(K::decode).transpose()?;
        Self::with_order(take, cursor, order)
    }

    pub fn take(&self) -> i64 {
        self.take
    }

    pub fn cursor(&self) -> Option<&K> {
        self.cursor.as_ref()
    }

    pub fn is_backward(&self) -> bool {
        self.take < 0
    }

    pub fn page_size(&self) -> usize {
        usize::try_from(self.take.unsigned_abs()).unwrap_or(usize::MAX)
    }

    pub fn plan_query(&self) -> QueryBounds<K> {
        let (comparison, direction) = match (self.order, self.is_backward()) {
            (SortDirection::Descending, false) => (Comparison::LessThan, self.order),
            (SortDirection::Ascending, false) => (Comparison::GreaterThan, self.order),
            (SortDirection::Descending, true) => (Comparison::GreaterThan, self.order.reverse()),
            (SortDirection::Ascending, true) => (Comparison::LessThan, self.order.reverse()),
        };
        QueryBounds {
            boundary: self.cursor.clone().map(|key| Boundary { comparison, key }),
            direction,
            limit: self.page_size().saturating_add(1),
        }
    }

    /// `rows` must be the result of executing [`KeysetPaginator::plan_query`],
    /// in the physical order the store returned them.
    pub fn build_page<R>(&self, mut rows: Vec<R>, key: impl Fn(&R) -> K) -> KeysetPage<R, K> {
        if rows.is_empty() {
            return KeysetPage {
                data: rows,
                next_cursor: None,
                prev_cursor: self.cursor.clone(),
                has_more_data: false,
                take: self.take,
            };
        }

        let page_size = self.page_size();
        let backward = self.is_backward();
        let has_more_data = rows.len() > page_size;

        // Backward fetches come in inverse order: flip first so the extra
        // rows sit at the front, away from the cursor.
        if backward {
            rows.reverse();
        }
        if has_more_data {
            if backward {
                rows.drain(..rows.len() - page_size);
            } else {
                rows.truncate(page_size);
            }
        }

        let next_cursor = if !backward && !has_more_data {
            None
        } else {
            rows.last().map(&key)
        };
        let prev_cursor = if self.cursor.is_none() || (backward && !has_more_data) {
            None
        } else {
            rows.first().map(&key)
        };

        KeysetPage {
            data: rows,
            next_cursor,
            prev_cursor,
            has_more_data,
            take: self.take,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeysetPage<R, K> {
    pub data: Vec<R>,
    pub next_cursor: Option<K>,
    pub prev_cursor: Option<K>,
    pub has_more_data: bool,
    pub take: i64,
}

impl<R, K: CursorKey> KeysetPage<R, K> {
    pub fn map<T>(self, f: impl FnMut(R) -> T) -> KeysetPage<T, K> {
        KeysetPage {
            data: self.data.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            prev_cursor: self.prev_cursor,
            has_more_data: self.has_more_data,
            take: self.take,
        }
    }

    /// Swaps the rows for their formatted counterparts, keeping the cursors.
    pub fn with_data<T>(self, data: Vec<T>) -> KeysetPage<T, K> {
        KeysetPage {
            data,
            next_cursor: self.next_cursor,
            prev_cursor: self.prev_cursor,
            has_more_data: self.has_more_data,
            take: self.take,
        }
    }

    pub fn into_response(self) -> PaginatedResponse<R> {
        PaginatedResponse {
            pagination: PaginationInfo {
                next_cursor: self.next_cursor.as_ref().map(CursorKey::to_cursor),
                prev_cursor: self.prev_cursor.as_ref().map(CursorKey::to_cursor),
                take: self.take,
                has_more_data: self.has_more_data,
            },
            data: self.data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub next_cursor: Option<Cursor>,
    pub prev_cursor: Option<Cursor>,
    pub take: i64,
    pub has_more_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginatedResponse<T> {
    pub pagination: PaginationInfo,
    pub data: Vec<T>,
}
