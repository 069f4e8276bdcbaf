use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use super::{
    parse_address, parse_hash, transactions::APITransaction, ApiState, DataResponse, PageParams,
};
use crate::{
    model::EventDb,
    pagination::{KeysetPage, PaginatedResponse},
    rest::{AppError, BadRequest},
    store::EventFilter,
    utils::{
        logger::LogMe,
        units::{format_units, parse_quantity, ETHER_DECIMALS},
    },
};

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct APIEvent {
    pub event_id: String,
    pub address: String,
    pub transaction_hash: String,
    pub block_number: i64,
    pub log_index: i64,
    pub event: Option<String>,
    pub timestamp: String,
    pub abi: Value,
    pub args: Value,
}

impl From<&EventDb> for APIEvent {
    fn from(event: &EventDb) -> Self {
        APIEvent {
            event_id: event.event_id.clone(),
            address: event.address.clone(),
            transaction_hash: event.transaction_hash.clone(),
            block_number: event.block_number,
            log_index: event.log_index,
            event: event.event.clone(),
            timestamp: event.timestamp.to_string(),
            abi: event.abi.clone(),
            args: event.args.clone(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct ContractDetail {
    pub name: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct APITransferEvent {
    #[serde(flatten)]
    pub event: APIEvent,
    /// Transferred amount in ether, read from the third argument.
    pub total_supply: String,
    pub contract_detail: ContractDetail,
    pub contract_interface: Vec<String>,
}

fn transferred_amount(args: &Value) -> String {
    match args.as_array().map(Vec::as_slice) {
        Some([_, _, amount]) => {
            let raw = match amount {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            parse_quantity(&raw)
                .map(|v| format_units(&v, ETHER_DECIMALS))
                .unwrap_or_else(|| "0".to_string())
        }
        _ => "0".to_string(),
    }
}

impl From<EventDb> for APITransferEvent {
    fn from(event: EventDb) -> Self {
        APITransferEvent {
            total_supply: transferred_amount(&event.args),
            event: APIEvent::from(&event),
            contract_detail: ContractDetail {
                name: event.contract_name,
                symbol: event.contract_symbol,
            },
            contract_interface: event.contract_interfaces,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct APIEventDetails {
    #[serde(flatten)]
    pub event: APIEvent,
    /// The emitting transaction, its receipt trimmed to this event's log.
    pub transaction: Option<APITransaction>,
    pub contract_detail: ContractDetail,
}

fn keep_log(receipt: &mut Value, event_id: &str) {
    if let Some(logs) = receipt.get_mut("logs").and_then(Value::as_array_mut) {
        logs.retain(|log| log.get("eventId").and_then(Value::as_str) == Some(event_id));
    }
}

pub async fn get_event(
    Path(id): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<DataResponse<APIEventDetails>>, AppError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(BadRequest::new("Event id is required").into());
    }
    let Some(event) = state
        .store
        .event_by_id(id)
        .await
        .log_error("Failed to fetch event")?
    else {
        return Ok(Json(DataResponse::new(None)));
    };

    let transaction = state
        .store
        .transaction_by_hash(&event.transaction_hash)
        .await
        .log_error("Failed to fetch event transaction")?
        .map(|tx| {
            let mut api = APITransaction::from(tx);
            keep_log(&mut api.receipt, &event.event_id);
            api
        });

    Ok(Json(DataResponse::new(Some(APIEventDetails {
        event: APIEvent::from(&event),
        transaction,
        contract_detail: ContractDetail {
            name: event.contract_name,
            symbol: event.contract_symbol,
        },
    }))))
}

async fn list(
    state: &ApiState,
    page: &PageParams,
    filter: EventFilter,
) -> Result<KeysetPage<EventDb, String>, AppError> {
    let paginator = page.paginator::<String>(&state.conf.pagination)?;
    let rows = state
        .store
        .events(&filter, &paginator.plan_query())
        .await
        .log_error("Failed to fetch events")?;
    Ok(paginator.build_page(rows, |e| e.event_id.clone()))
}

pub async fn get_events_by_address(
    Path(address): Path<String>,
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APIEvent>>, AppError> {
    let filter = EventFilter::Address(parse_address(&address)?);
    let page = list(&state, &page, filter).await?;
    Ok(Json(page.map(|e| APIEvent::from(&e)).into_response()))
}

pub async fn get_transfers_by_tx(
    Path(hash): Path<String>,
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APITransferEvent>>, AppError> {
    let filter = EventFilter::TransfersOfTransaction(parse_hash(&hash)?);
    let page = list(&state, &page, filter).await?;
    Ok(Json(page.map(APITransferEvent::from).into_response()))
}

pub async fn get_transfers_by_address(
    Path(address): Path<String>,
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APITransferEvent>>, AppError> {
    let filter = EventFilter::TransfersOfAddress(parse_address(&address)?);
    let page = list(&state, &page, filter).await?;
    Ok(Json(page.map(APITransferEvent::from).into_response()))
}
