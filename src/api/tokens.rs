use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use super::{parse_address, ApiState, PageParams};
use crate::{
    model::{TokenDb, TokenHoldingDb},
    pagination::{HoldingKey, PaginatedResponse, SortDirection},
    rest::{AppError, BadRequest},
    store::HoldingFilter,
    utils::{
        logger::LogMe,
        units::{format_units, hex_to_ether, parse_quantity, ETHER_DECIMALS},
    },
};

const NOT_PROVIDED: &str = "(Not provided)";

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct APIToken {
    pub id: i64,
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    /// Native balance of the token contract, in ether.
    pub balance: Option<String>,
    pub block_number: Option<i64>,
}

impl From<TokenDb> for APIToken {
    fn from(token: TokenDb) -> Self {
        APIToken {
            balance: token.balance.as_deref().and_then(hex_to_ether),
            id: token.id,
            address: token.address,
            name: token.name,
            symbol: token.symbol,
            block_number: token.block_number,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct APITokenHolding {
    pub address: String,
    pub contract: String,
    pub block_number: i64,
    pub block_hash: String,
    /// Scaled by the token's decimals.
    pub balance: String,
    pub name: String,
    pub symbol: String,
    pub decimals: i32,
}

impl From<TokenHoldingDb> for APITokenHolding {
    fn from(holding: TokenHoldingDb) -> Self {
        let decimals = holding.decimals.unwrap_or(ETHER_DECIMALS as i32);
        let scale = u32::try_from(decimals).unwrap_or(ETHER_DECIMALS);
        APITokenHolding {
            balance: holding
                .balance
                .as_deref()
                .and_then(parse_quantity)
                .map_or_else(|| "0".to_string(), |b| format_units(&b, scale)),
            address: holding.address,
            contract: holding.contract,
            block_number: holding.block_number,
            block_hash: holding.block_hash,
            name: holding.name.unwrap_or_else(|| NOT_PROVIDED.to_string()),
            symbol: holding.symbol.unwrap_or_else(|| NOT_PROVIDED.to_string()),
            decimals,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct TokenSearchResponse {
    pub data: Vec<APIToken>,
}

pub async fn get_tokens(
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APIToken>>, AppError> {
    let paginator = page.paginator::<i64>(&state.conf.pagination)?;
    let rows = state
        .store
        .tokens(&paginator.plan_query())
        .await
        .log_error("Failed to fetch tokens")?;
    Ok(Json(
        paginator
            .build_page(rows, |t| t.id)
            .map(APIToken::from)
            .into_response(),
    ))
}

pub async fn search_tokens(
    Path(value): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<TokenSearchResponse>, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(BadRequest::new("Search value is required").into());
    }
    let tokens = state
        .store
        .search_tokens(value, state.conf.search_limit)
        .await
        .log_error("Failed to search tokens")?;
    Ok(Json(TokenSearchResponse {
        data: tokens.into_iter().map(Into::into).collect(),
    }))
}

/// Holdings are listed by counterparty address, ascending.
async fn holdings(
    state: &ApiState,
    page: &PageParams,
    filter: HoldingFilter,
) -> Result<PaginatedResponse<APITokenHolding>, AppError> {
    let paginator =
        page.paginator_with_order::<HoldingKey>(&state.conf.pagination, SortDirection::Ascending)?;
    let rows = state
        .store
        .token_holdings(&filter, &paginator.plan_query())
        .await
        .log_error("Failed to fetch token balances")?;
    Ok(paginator
        .build_page(rows, |h| filter.key(h))
        .map(APITokenHolding::from)
        .into_response())
}

pub async fn get_tokens_by_address(
    Path(address): Path<String>,
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APITokenHolding>>, AppError> {
    let filter = HoldingFilter::Holder(parse_address(&address)?);
    Ok(Json(holdings(&state, &page, filter).await?))
}

pub async fn get_accounts_by_token(
    Path(token): Path<String>,
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APITokenHolding>>, AppError> {
    let filter = HoldingFilter::Token(parse_address(&token)?);
    Ok(Json(holdings(&state, &page, filter).await?))
}
