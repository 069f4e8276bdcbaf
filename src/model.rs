//! Rows read from the explorer database.
//!
//! Quantities stay in their stored form (hex or decimal wei strings); the
//! formatters in [`crate::api`] turn them into display units.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::chrono::NaiveDate;

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDb {
    pub number: i64,
    pub hash: String,
    pub parent_hash: String,
    pub miner: String,
    pub size: i64,
    pub timestamp: i64, // UNIX seconds
    pub difficulty: String,       // hex
    pub total_difficulty: String, // hex
    pub minimum_gas_price: String, // decimal wei
    pub gas_used: i64,
    pub gas_limit: i64,
    pub transactions: Value, // array of tx hashes
    pub uncles: Value,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDb {
    pub hash: String,
    pub block_number: i64,
    pub block_hash: String,
    pub transaction_index: i64,
    pub from_address: String,
    pub to_address: Option<String>,
    pub value: String,     // hex wei
    pub gas: i64,
    pub gas_price: String, // decimal wei
    pub gas_used: i64,
    pub nonce: i64,
    pub input: String,
    pub timestamp: i64,
    pub tx_type: String,
    pub receipt: Value,
}

impl TransactionDb {
    pub fn key(&self) -> (i64, i64) {
        (self.block_number, self.transaction_index)
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTransactionDb {
    pub hash: String,
    pub from_address: String,
    pub to_address: Option<String>,
    pub value: String, // decimal wei
    pub gas: i64,
    pub gas_price: String,
    pub nonce: i64,
    pub input: String,
    pub status: String,
    pub timestamp: i64, // UNIX seconds
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalTransactionDb {
    pub internal_tx_id: String,
    pub transaction_hash: String,
    pub block_number: i64,
    pub block_hash: String,
    #[sqlx(rename = "type")]
    pub itx_type: String,
    pub action: Value,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub timestamp: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressDb {
    pub id: i64,
    pub address: String,
    pub name: Option<String>,
    pub is_native: bool,
    #[sqlx(rename = "type")]
    pub address_type: String, // "account" | "contract"
    pub balance: Option<String>, // hex wei, latest known
    pub balance_block_number: Option<i64>,
}

impl AddressDb {
    pub fn is_contract(&self) -> bool {
        self.address_type == "contract"
    }
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDb {
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<i32>,
    pub code: Option<String>,
    pub deployed_code: Option<String>,
    pub code_stored_at_block: Option<i64>,
    pub creation_tx: Option<Value>,
    pub total_supply: Option<String>, // decimal wei, latest known
    pub methods: Vec<String>,
    pub interfaces: Vec<String>,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceDb {
    pub id: i64,
    pub address: String,
    pub block_number: i64,
    pub timestamp: i64,
    pub balance: String, // decimal wei
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDb {
    pub event_id: String,
    pub address: String, // emitter
    pub transaction_hash: String,
    pub block_number: i64,
    pub log_index: i64,
    pub event: Option<String>,
    pub timestamp: i64,
    pub abi: Value,
    pub args: Value,
    pub contract_name: Option<String>,
    pub contract_symbol: Option<String>,
    pub contract_interfaces: Vec<String>,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenDb {
    pub id: i64,
    pub address: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub balance: Option<String>, // hex wei
    pub block_number: Option<i64>,
}

/// Latest balance of one (holder, token) pair.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenHoldingDb {
    pub address: String,
    pub contract: String,
    pub block_number: i64,
    pub block_hash: String,
    pub balance: Option<String>, // decimal, token base units
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<i32>,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsDb {
    pub block_number: i64,
    pub active_accounts: i64,
    pub hashrate: String,
    pub circulating_supply: String,
    pub total_supply: String,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResultDb {
    pub id: String,
    pub address: String,
    pub matched: bool,
    pub request: Value,
    pub result: Value,
    pub abi: Value,
    pub sources: Value,
    pub timestamp: i64,
}

#[derive(sqlx::FromRow, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTransactionCountDb {
    pub date: NaiveDate,
    pub transaction_count: i64,
}
