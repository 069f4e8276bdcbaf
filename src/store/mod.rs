//! Read access to the explorer database.
//!
//! Every list method executes a [`QueryBounds`] produced by the paginator and
//! returns the rows in the physical order the bounds ask for.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::types::chrono::NaiveDate;

use crate::{
    model::*,
    pagination::{HoldingKey, QueryBounds, TxKey},
};

mod memory;
mod postgres;

pub use memory::{MemoryStore, MemoryTables};
pub use postgres::{PgStore, MIGRATOR};

/// A block designated by number or by hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockRef {
    Number(i64),
    Hash(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionFilter {
    All,
    Block(BlockRef),
    /// Sent or received by the address.
    Address(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalTxFilter {
    Block(BlockRef),
    Transaction(String),
    Address(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    /// Any event the address takes part in.
    Address(String),
    /// `Transfer` events emitted by the address.
    TransfersOfAddress(String),
    /// `Transfer` events of one transaction.
    TransfersOfTransaction(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldingFilter {
    /// Tokens held by an address, keyed by `(contract, blockNumber)`.
    Holder(String),
    /// Holders of a token, keyed by `(address, blockNumber)`.
    Token(String),
}

impl HoldingFilter {
    pub fn key(&self, holding: &TokenHoldingDb) -> HoldingKey {
        match self {
            HoldingFilter::Holder(_) => (holding.contract.clone(), holding.block_number),
            HoldingFilter::Token(_) => (holding.address.clone(), holding.block_number),
        }
    }
}

/// Interfaces a contract must implement to be listed as a token.
pub const TOKEN_INTERFACES: [&str; 3] = ["ERC20", "ERC677", "ERC721"];

#[async_trait]
pub trait ExplorerStore: Send + Sync {
    async fn blocks(&self, bounds: &QueryBounds<i64>) -> Result<Vec<BlockDb>>;
    async fn block_by_number(&self, number: i64) -> Result<Option<BlockDb>>;
    async fn block_by_hash(&self, hash: &str) -> Result<Option<BlockDb>>;

    async fn transactions(
        &self,
        filter: &TransactionFilter,
        bounds: &QueryBounds<TxKey>,
    ) -> Result<Vec<TransactionDb>>;
    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<TransactionDb>>;

    /// Most recent daily aggregate dated no later than `day`.
    async fn daily_transaction_count(&self, day: NaiveDate)
        -> Result<Option<DailyTransactionCountDb>>;

    /// Pending transactions seen at or after `since` (UNIX seconds).
    async fn pending_transactions(
        &self,
        since: i64,
        bounds: &QueryBounds<String>,
    ) -> Result<Vec<PendingTransactionDb>>;
    async fn pending_transaction_by_hash(&self, hash: &str)
        -> Result<Option<PendingTransactionDb>>;

    async fn internal_transactions(
        &self,
        filter: &InternalTxFilter,
        bounds: &QueryBounds<String>,
    ) -> Result<Vec<InternalTransactionDb>>;
    async fn internal_transaction_by_id(&self, id: &str) -> Result<Option<InternalTransactionDb>>;

    async fn addresses(&self, bounds: &QueryBounds<i64>) -> Result<Vec<AddressDb>>;
    async fn address(&self, address: &str) -> Result<Option<AddressDb>>;
    async fn contract(&self, address: &str) -> Result<Option<ContractDb>>;
    /// Latest verification result that matched the deployed bytecode.
    async fn verification(&self, address: &str) -> Result<Option<VerificationResultDb>>;

    async fn balances(&self, address: &str, bounds: &QueryBounds<i64>) -> Result<Vec<BalanceDb>>;

    async fn events(&self, filter: &EventFilter, bounds: &QueryBounds<String>)
        -> Result<Vec<EventDb>>;
    async fn event_by_id(&self, event_id: &str) -> Result<Option<EventDb>>;

    async fn tokens(&self, bounds: &QueryBounds<i64>) -> Result<Vec<TokenDb>>;
    /// Exact symbol match for one-character input, name/symbol substring
    /// match otherwise. Case insensitive.
    async fn search_tokens(&self, value: &str, limit: i64) -> Result<Vec<TokenDb>>;
    async fn token_holdings(
        &self,
        filter: &HoldingFilter,
        bounds: &QueryBounds<HoldingKey>,
    ) -> Result<Vec<TokenHoldingDb>>;

    async fn latest_stats(&self) -> Result<Option<StatsDb>>;
}
