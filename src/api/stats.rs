use axum::{extract::State, Json};
use serde::Serialize;

use super::{ApiState, DataResponse};
use crate::{
    model::StatsDb,
    rest::AppError,
    utils::{
        logger::LogMe,
        units::{parse_quantity, to_unit_f64},
    },
};

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct APIStats {
    pub block_number: i64,
    pub active_accounts: i64,
    /// In MH/s.
    pub hashrate: f64,
    pub circulating_supply: String,
    pub total_supply: String,
}

impl From<StatsDb> for APIStats {
    fn from(stats: StatsDb) -> Self {
        APIStats {
            hashrate: parse_quantity(&stats.hashrate).map_or(0.0, |h| to_unit_f64(&h, 6)),
            block_number: stats.block_number,
            active_accounts: stats.active_accounts,
            circulating_supply: stats.circulating_supply,
            total_supply: stats.total_supply,
        }
    }
}

pub async fn get_stats(
    State(state): State<ApiState>,
) -> Result<Json<DataResponse<APIStats>>, AppError> {
    let stats = state
        .store
        .latest_stats()
        .await
        .log_error("Failed to fetch stats")?;
    Ok(Json(DataResponse::new(stats.map(Into::into))))
}
