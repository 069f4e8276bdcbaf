use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use super::{parse_address, ApiState, PageParams};
use crate::{
    model::BalanceDb,
    pagination::PaginatedResponse,
    rest::AppError,
    utils::{logger::LogMe, units::wei_to_ether},
};

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct APIBalance {
    pub id: i64,
    pub address: String,
    pub block_number: i64,
    pub timestamp: String,
    /// In ether.
    pub balance: String,
}

impl From<BalanceDb> for APIBalance {
    fn from(balance: BalanceDb) -> Self {
        APIBalance {
            balance: wei_to_ether(&balance.balance).unwrap_or_else(|| "0".to_string()),
            id: balance.id,
            address: balance.address,
            block_number: balance.block_number,
            timestamp: balance.timestamp.to_string(),
        }
    }
}

pub async fn get_balances_by_address(
    Path(address): Path<String>,
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APIBalance>>, AppError> {
    let address = parse_address(&address)?;
    let paginator = page.paginator::<i64>(&state.conf.pagination)?;
    let rows = state
        .store
        .balances(&address, &paginator.plan_query())
        .await
        .log_error("Failed to fetch balances")?;
    Ok(Json(
        paginator
            .build_page(rows, |b| b.id)
            .map(APIBalance::from)
            .into_response(),
    ))
}
