use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use super::{parse_block_ref, ApiState, PageParams};
use crate::{
    model::BlockDb,
    pagination::PaginatedResponse,
    rest::AppError,
    store::BlockRef,
    utils::{
        logger::LogMe,
        units::{parse_hex, parse_quantity, to_unit_f64, GWEI_DECIMALS},
    },
};

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct APIBlock {
    pub number: i64,
    pub hash: String,
    pub parent_hash: String,
    pub miner: String,
    pub size: i64,
    pub timestamp: String,
    pub difficulty: String,
    pub total_difficulty: String,
    pub gas_used: i64,
    pub gas_limit: i64,
    /// Number of transactions in the block.
    pub transactions: usize,
    pub uncles: Value,
    /// In gwei.
    pub minimum_gas_price: f64,
    #[serde(rename = "difficultyInGH")]
    pub difficulty_in_gh: f64,
    #[serde(rename = "totalDifficultyInEH")]
    pub total_difficulty_in_eh: f64,
    #[serde(rename = "blockHashrateInMHs")]
    pub block_hashrate_in_mhs: Option<f64>,
    pub tx_density: Option<f64>,
    pub time: Option<String>,
}

fn readable_time(seconds: i64) -> String {
    format!("{}m {}s", seconds / 60, seconds % 60)
}

/// Formats a block. Timing figures need the parent block and are left
/// empty without it.
pub fn format_block(block: &BlockDb, parent: Option<&BlockDb>) -> APIBlock {
    let difficulty = parse_hex(&block.difficulty).unwrap_or_default();
    let total_difficulty = parse_hex(&block.total_difficulty).unwrap_or_default();
    let tx_count = block.transactions.as_array().map_or(0, Vec::len);
    let minimum_gas_price = parse_quantity(&block.minimum_gas_price)
        .map_or(0.0, |price| to_unit_f64(&price, GWEI_DECIMALS));

    let elapsed = parent
        .filter(|p| p.number + 1 == block.number)
        .map(|p| block.timestamp - p.timestamp)
        .filter(|secs| *secs >= 0);
    let rate_window = elapsed.filter(|secs| *secs > 0).map(|secs| secs as f64);

    APIBlock {
        number: block.number,
        hash: block.hash.clone(),
        parent_hash: block.parent_hash.clone(),
        miner: block.miner.clone(),
        size: block.size,
        timestamp: block.timestamp.to_string(),
        difficulty: block.difficulty.clone(),
        total_difficulty: block.total_difficulty.clone(),
        gas_used: block.gas_used,
        gas_limit: block.gas_limit,
        transactions: tx_count,
        uncles: block.uncles.clone(),
        minimum_gas_price,
        difficulty_in_gh: to_unit_f64(&difficulty, 9),
        total_difficulty_in_eh: to_unit_f64(&total_difficulty, 18),
        block_hashrate_in_mhs: rate_window.map(|secs| to_unit_f64(&difficulty, 6) / secs),
        tx_density: rate_window.map(|secs| tx_count as f64 / secs),
        time: elapsed.map(readable_time),
    }
}

pub async fn get_blocks(
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APIBlock>>, AppError> {
    let paginator = page.paginator::<i64>(&state.conf.pagination)?;
    let rows = state
        .store
        .blocks(&paginator.plan_query())
        .await
        .log_error("Failed to fetch blocks")?;
    let page = paginator.build_page(rows, |b| b.number);

    // Each block's parent is the next row; the oldest one needs a lookup.
    let mut parent = match page.data.last() {
        Some(oldest) if oldest.number > 0 => state
            .store
            .block_by_number(oldest.number - 1)
            .await
            .log_error("Failed to fetch parent block")?,
        _ => None,
    };
    let mut formatted = Vec::with_capacity(page.data.len());
    for block in page.data.iter().rev() {
        formatted.push(format_block(block, parent.as_ref()));
        parent = Some(block.clone());
    }
    formatted.reverse();

    Ok(Json(page.with_data(formatted).into_response()))
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Navigation {
    pub prev: Option<i64>,
    pub next: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BlockResponse {
    pub data: Option<APIBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation: Option<Navigation>,
}

pub async fn get_block(
    Path(block): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<BlockResponse>, AppError> {
    let block = match parse_block_ref(&block)? {
        BlockRef::Number(number) => state.store.block_by_number(number).await,
        BlockRef::Hash(hash) => state.store.block_by_hash(&hash).await,
    }
    .log_error("Failed to fetch block")?;

    let Some(block) = block else {
        return Ok(Json(BlockResponse {
            data: None,
            navigation: None,
        }));
    };

    let parent = if block.number > 0 {
        state
            .store
            .block_by_number(block.number - 1)
            .await
            .log_error("Failed to fetch parent block")?
    } else {
        None
    };

    Ok(Json(BlockResponse {
        data: Some(format_block(&block, parent.as_ref())),
        navigation: Some(Navigation {
            prev: parent.as_ref().map(|p| p.number),
            next: block.number + 1,
        }),
    }))
}
