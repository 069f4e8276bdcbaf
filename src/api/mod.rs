//! Explorer REST endpoints.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    pagination::{CursorKey, KeysetPaginator, PaginationError, SortDirection},
    rest::BadRequest,
    store::{BlockRef, ExplorerStore},
    utils::conf::{PaginationConf, SharedConf},
    verifier::VerifierClient,
};

pub mod addresses;
pub mod balances;
pub mod blocks;
pub mod events;
pub mod internal_transactions;
pub mod stats;
pub mod tokens;
pub mod transactions;
pub mod verifications;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn ExplorerStore>,
    pub conf: SharedConf,
    pub verifier: VerifierClient,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/blocks", get(blocks::get_blocks))
        .route("/blocks/:block", get(blocks::get_block))
        .route("/transactions", get(transactions::get_transactions))
        .route(
            "/transactions/daily",
            get(transactions::get_daily_transaction_count),
        )
        .route("/transactions/pending", get(transactions::get_pending_transactions))
        .route(
            "/transactions/pending/:hash",
            get(transactions::get_pending_transaction),
        )
        .route(
            "/transactions/block/:block",
            get(transactions::get_transactions_by_block),
        )
        .route(
            "/transactions/address/:address",
            get(transactions::get_transactions_by_address),
        )
        .route("/transactions/:hash", get(transactions::get_transaction))
        .route(
            "/itxs/block/:block",
            get(internal_transactions::get_itxs_by_block),
        )
        .route("/itxs/tx/:hash", get(internal_transactions::get_itxs_by_tx))
        .route(
            "/itxs/address/:address",
            get(internal_transactions::get_itxs_by_address),
        )
        .route("/itxs/:id", get(internal_transactions::get_itx))
        .route("/addresses", get(addresses::get_addresses))
        .route("/addresses/:address", get(addresses::get_address))
        .route(
            "/addresses/:address/verification",
            get(addresses::get_contract_verification),
        )
        .route(
            "/balances/address/:address",
            get(balances::get_balances_by_address),
        )
        .route("/events/address/:address", get(events::get_events_by_address))
        .route("/events/tx/:hash", get(events::get_transfers_by_tx))
        .route(
            "/events/transfer/:address",
            get(events::get_transfers_by_address),
        )
        .route("/events/:id", get(events::get_event))
        .route("/tokens", get(tokens::get_tokens))
        .route("/tokens/search/:value", get(tokens::search_tokens))
        .route("/tokens/address/:address", get(tokens::get_tokens_by_address))
        .route("/accounts/:token", get(tokens::get_accounts_by_token))
        .route("/stats", get(stats::get_stats))
        .route(
            "/verifications/evm-versions",
            get(verifications::get_evm_versions),
        )
        .route("/verifications/verify", post(verifications::verify))
        .with_state(state)
}

/// `take`/`cursor` query parameters of every list endpoint.
///
/// `take` is kept raw so that a non-integer value is reported as a
/// pagination error rather than a generic query rejection.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PageParams {
    pub take: Option<String>,
    pub cursor: Option<String>,
}

impl PageParams {
    pub fn paginator<K: CursorKey>(
        &self,
        conf: &PaginationConf,
    ) -> Result<KeysetPaginator<K>, PaginationError> {
        self.paginator_with_order(conf, SortDirection::Descending)
    }

    pub fn paginator_with_order<K: CursorKey>(
        &self,
        conf: &PaginationConf,
        order: SortDirection,
    ) -> Result<KeysetPaginator<K>, PaginationError> {
        let take = match self.take.as_deref().map(str::trim) {
            None | Some("") => 0,
            Some(raw) => raw.parse::<i64>().map_err(|_| PaginationError::InvalidTake)?,
        };
        // 0 means "not provided"
        let take = if take == 0 { conf.default_take } else { take };
        if take.unsigned_abs() > conf.max_take.unsigned_abs() {
            return Err(PaginationError::TakeTooLarge {
                requested: take,
                max: conf.max_take,
            });
        }
        let cursor = self
            .cursor
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());
        KeysetPaginator::from_raw_with_order(take, cursor, order)
    }
}

/// Envelope of single-item lookups. Absent items are `{"data": null}`.
#[derive(Debug, Serialize, PartialEq)]
pub struct DataResponse<T> {
    pub data: Option<T>,
}

impl<T> DataResponse<T> {
    pub fn new(data: Option<T>) -> Self {
        DataResponse { data }
    }
}

fn is_hex_of_len(raw: &str, nibbles: usize) -> bool {
    raw.strip_prefix("0x")
        .is_some_and(|digits| digits.len() == nibbles && hex::decode(digits).is_ok())
}

/// `0x` followed by 40 hex digits, normalised to lower case.
pub fn parse_address(raw: &str) -> Result<String, BadRequest> {
    let address = raw.trim().to_lowercase();
    if !is_hex_of_len(&address, 40) {
        return Err(BadRequest::new(format!("Invalid address: {raw}")));
    }
    Ok(address)
}

/// `0x` followed by 64 hex digits, normalised to lower case.
pub fn parse_hash(raw: &str) -> Result<String, BadRequest> {
    let hash = raw.trim().to_lowercase();
    if !is_hex_of_len(&hash, 64) {
        return Err(BadRequest::new(format!("Invalid hash: {raw}")));
    }
    Ok(hash)
}

const MAX_BLOCK_NUMBER: i64 = i32::MAX as i64;

/// A block number (at most 2147483647) or a block hash.
pub fn parse_block_ref(raw: &str) -> Result<BlockRef, BadRequest> {
    let raw = raw.trim();
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        return match raw.parse::<i64>() {
            Ok(number) if number <= MAX_BLOCK_NUMBER => Ok(BlockRef::Number(number)),
            _ => Err(BadRequest::new(format!(
                "Block number must be at most {MAX_BLOCK_NUMBER}: {raw}"
            ))),
        };
    }
    parse_hash(raw)
        .map(BlockRef::Hash)
        .map_err(|_| BadRequest::new(format!("Invalid block number or hash: {raw}")))
}
