use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use super::{parse_address, parse_block_ref, parse_hash, ApiState, DataResponse, PageParams};
use crate::{
    model::InternalTransactionDb,
    pagination::PaginatedResponse,
    rest::{AppError, BadRequest},
    store::InternalTxFilter,
    utils::{
        logger::LogMe,
        units::{hex_to_decimal, hex_to_ether},
    },
};

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct APIInternalTransaction {
    pub internal_tx_id: String,
    pub transaction_hash: String,
    pub block_number: i64,
    pub block_hash: String,
    #[serde(rename = "type")]
    pub itx_type: String,
    pub action: Value,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

/// Rewrites the hex field `key` of a JSON object in place.
fn convert_field(object: &mut Value, key: &str, convert: fn(&str) -> Option<String>) {
    if let Some(field) = object.get_mut(key) {
        if let Some(converted) = field.as_str().and_then(convert) {
            *field = Value::String(converted);
        }
    }
}

impl From<InternalTransactionDb> for APIInternalTransaction {
    fn from(itx: InternalTransactionDb) -> Self {
        let mut action = itx.action;
        convert_field(&mut action, "value", hex_to_ether);
        convert_field(&mut action, "gas", hex_to_decimal);
        let result = itx.result.map(|mut result| {
            convert_field(&mut result, "gasUsed", hex_to_decimal);
            result
        });
        APIInternalTransaction {
            internal_tx_id: itx.internal_tx_id,
            transaction_hash: itx.transaction_hash,
            block_number: itx.block_number,
            block_hash: itx.block_hash,
            itx_type: itx.itx_type,
            action,
            result,
            error: itx.error,
            timestamp: itx.timestamp.to_string(),
        }
    }
}

async fn list(
    state: &ApiState,
    page: &PageParams,
    filter: InternalTxFilter,
) -> Result<PaginatedResponse<APIInternalTransaction>, AppError> {
    let paginator = page.paginator::<String>(&state.conf.pagination)?;
    let rows = state
        .store
        .internal_transactions(&filter, &paginator.plan_query())
        .await
        .log_error("Failed to fetch internal transactions")?;
    Ok(paginator
        .build_page(rows, |itx| itx.internal_tx_id.clone())
        .map(APIInternalTransaction::from)
        .into_response())
}

pub async fn get_itx(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<DataResponse<APIInternalTransaction>>, AppError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(BadRequest::new("Internal transaction id is required").into());
    }
    let itx = state
        .store
        .internal_transaction_by_id(id)
        .await
        .log_error("Failed to fetch internal transaction")?;
    Ok(Json(DataResponse::new(itx.map(Into::into))))
}

pub async fn get_itxs_by_block(
    Path(block): Path<String>,
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APIInternalTransaction>>, AppError> {
    let filter = InternalTxFilter::Block(parse_block_ref(&block)?);
    Ok(Json(list(&state, &page, filter).await?))
}

pub async fn get_itxs_by_tx(
    Path(hash): Path<String>,
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APIInternalTransaction>>, AppError> {
    let filter = InternalTxFilter::Transaction(parse_hash(&hash)?);
    Ok(Json(list(&state, &page, filter).await?))
}

pub async fn get_itxs_by_address(
    Path(address): Path<String>,
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APIInternalTransaction>>, AppError> {
    let filter = InternalTxFilter::Address(parse_address(&address)?);
    Ok(Json(list(&state, &page, filter).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_and_result_quantities_are_decoded() {
        let itx = InternalTransactionDb {
            internal_tx_id: "0x0e2a3b0000100".to_string(),
            transaction_hash: format!("0x{}", "11".repeat(32)),
            block_number: 7,
            block_hash: format!("0x{}", "22".repeat(32)),
            itx_type: "call".to_string(),
            action: json!({ "value": "0xde0b6b3a7640000", "gas": "0x5208", "callType": "call" }),
            result: Some(json!({ "gasUsed": "0x10", "output": "0x" })),
            error: None,
            timestamp: 1700000000,
        };
        let api = APIInternalTransaction::from(itx);
        assert_eq!(api.action["value"], "1");
        assert_eq!(api.action["gas"], "21000");
        assert_eq!(api.action["callType"], "call");
        assert_eq!(api.result.as_ref().map(|r| r["gasUsed"].clone()), Some(json!("16")));
        assert_eq!(api.timestamp, "1700000000");
    }
}
