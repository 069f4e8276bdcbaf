use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use sqlx::types::chrono::NaiveDate;

use super::{parse_address, parse_block_ref, parse_hash, ApiState, DataResponse, PageParams};
use crate::{
    model::{DailyTransactionCountDb, PendingTransactionDb, TransactionDb},
    pagination::{PaginatedResponse, TxKey},
    rest::AppError,
    store::TransactionFilter,
    utils::{
        logger::LogMe,
        units::{hex_to_ether, parse_quantity, wei_to_ether},
    },
};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Success,
    Fail,
}

impl TransactionStatus {
    /// Receipts report status as `"0x1"`, `1` or `true` depending on the
    /// node that produced them.
    pub fn from_receipt(receipt: &Value) -> Self {
        let succeeded = match receipt.get("status") {
            Some(Value::Bool(ok)) => *ok,
            Some(Value::Number(n)) => n.as_u64().is_some_and(|n| n != 0),
            Some(Value::String(s)) => {
                parse_quantity(s).is_some_and(|n| n != num_bigint::BigUint::default())
            }
            _ => false,
        };
        if succeeded {
            TransactionStatus::Success
        } else {
            TransactionStatus::Fail
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct APITransaction {
    pub hash: String,
    pub block_number: i64,
    pub block_hash: String,
    pub transaction_index: i64,
    pub from: String,
    pub to: Option<String>,
    /// In ether.
    pub value: String,
    pub gas: i64,
    pub gas_price: String,
    pub gas_used: i64,
    pub nonce: i64,
    pub input: String,
    pub timestamp: String,
    pub tx_type: String,
    pub receipt: Value,
    pub status: TransactionStatus,
}

impl From<TransactionDb> for APITransaction {
    fn from(tx: TransactionDb) -> Self {
        APITransaction {
            status: TransactionStatus::from_receipt(&tx.receipt),
            value: hex_to_ether(&tx.value).unwrap_or_else(|| tx.value.clone()),
            hash: tx.hash,
            block_number: tx.block_number,
            block_hash: tx.block_hash,
            transaction_index: tx.transaction_index,
            from: tx.from_address,
            to: tx.to_address,
            gas: tx.gas,
            gas_price: tx.gas_price,
            gas_used: tx.gas_used,
            nonce: tx.nonce,
            input: tx.input,
            timestamp: tx.timestamp.to_string(),
            tx_type: tx.tx_type,
            receipt: tx.receipt,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct APIPendingTransaction {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    /// In ether.
    pub value: String,
    pub gas: i64,
    pub gas_price: String,
    pub nonce: i64,
    pub input: String,
    pub status: String,
    pub timestamp: String,
}

impl From<PendingTransactionDb> for APIPendingTransaction {
    fn from(tx: PendingTransactionDb) -> Self {
        APIPendingTransaction {
            value: wei_to_ether(&tx.value).unwrap_or_else(|| tx.value.clone()),
            hash: tx.hash,
            from: tx.from_address,
            to: tx.to_address,
            gas: tx.gas,
            gas_price: tx.gas_price,
            nonce: tx.nonce,
            input: tx.input,
            status: tx.status,
            // Pending rows store seconds; clients expect milliseconds.
            timestamp: tx.timestamp.saturating_mul(1000).to_string(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct APIDailyTransactionCount {
    pub date: NaiveDate,
    pub count: i64,
}

impl From<DailyTransactionCountDb> for APIDailyTransactionCount {
    fn from(day: DailyTransactionCountDb) -> Self {
        APIDailyTransactionCount {
            date: day.date,
            count: day.transaction_count,
        }
    }
}

/// A hash lookup finds a mined transaction or, failing that, a pending one.
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum TransactionLookup {
    Mined(APITransaction),
    Pending(APIPendingTransaction),
}

async fn list(
    state: &ApiState,
    page: &PageParams,
    filter: TransactionFilter,
) -> Result<PaginatedResponse<APITransaction>, AppError> {
    let paginator = page.paginator::<TxKey>(&state.conf.pagination)?;
    let rows = state
        .store
        .transactions(&filter, &paginator.plan_query())
        .await
        .log_error("Failed to fetch transactions")?;
    Ok(paginator
        .build_page(rows, TransactionDb::key)
        .map(APITransaction::from)
        .into_response())
}

pub async fn get_transactions(
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APITransaction>>, AppError> {
    Ok(Json(list(&state, &page, TransactionFilter::All).await?))
}

pub async fn get_transactions_by_block(
    Path(block): Path<String>,
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APITransaction>>, AppError> {
    let filter = TransactionFilter::Block(parse_block_ref(&block)?);
    Ok(Json(list(&state, &page, filter).await?))
}

pub async fn get_transactions_by_address(
    Path(address): Path<String>,
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APITransaction>>, AppError> {
    let filter = TransactionFilter::Address(parse_address(&address)?);
    Ok(Json(list(&state, &page, filter).await?))
}

pub async fn get_transaction(
    Path(hash): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<DataResponse<TransactionLookup>>, AppError> {
    let hash = parse_hash(&hash)?;
    let mined = state
        .store
        .transaction_by_hash(&hash)
        .await
        .log_error("Failed to fetch transaction")?;
    if let Some(tx) = mined {
        let gas_price = wei_to_ether(&tx.gas_price).unwrap_or_else(|| tx.gas_price.clone());
        let mut api = APITransaction::from(tx);
        api.gas_price = gas_price;
        return Ok(Json(DataResponse::new(Some(TransactionLookup::Mined(api)))));
    }

    let pending = state
        .store
        .pending_transaction_by_hash(&hash)
        .await
        .log_error("Failed to fetch pending transaction")?;
    Ok(Json(DataResponse::new(
        pending.map(|tx| TransactionLookup::Pending(tx.into())),
    )))
}

/// Transaction count of the latest aggregated day up to today.
pub async fn get_daily_transaction_count(
    State(state): State<ApiState>,
) -> Result<Json<DataResponse<APIDailyTransactionCount>>, AppError> {
    let today = chrono::Utc::now().date_naive();
    let day = state
        .store
        .daily_transaction_count(today)
        .await
        .log_error("Failed to fetch daily transaction count")?;
    Ok(Json(DataResponse::new(day.map(Into::into))))
}

pub async fn get_pending_transactions(
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APIPendingTransaction>>, AppError> {
    let paginator = page.paginator::<String>(&state.conf.pagination)?;
    let since = chrono::Utc::now().timestamp() - state.conf.pending_tx_window_secs;
    let rows = state
        .store
        .pending_transactions(since, &paginator.plan_query())
        .await
        .log_error("Failed to fetch pending transactions")?;
    Ok(Json(
        paginator
            .build_page(rows, |tx| tx.hash.clone())
            .map(APIPendingTransaction::from)
            .into_response(),
    ))
}

pub async fn get_pending_transaction(
    Path(hash): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<DataResponse<APIPendingTransaction>>, AppError> {
    let hash = parse_hash(&hash)?;
    let pending = state
        .store
        .pending_transaction_by_hash(&hash)
        .await
        .log_error("Failed to fetch pending transaction")?;
    Ok(Json(DataResponse::new(pending.map(Into::into))))
}
