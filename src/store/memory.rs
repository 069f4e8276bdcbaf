use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::types::chrono::NaiveDate;

use super::{
    BlockRef, EventFilter, ExplorerStore, HoldingFilter, InternalTxFilter, TransactionFilter,
    TOKEN_INTERFACES,
};
use crate::{
    model::*,
    pagination::{HoldingKey, QueryBounds, TxKey},
};

/// Everything the explorer reads, held in plain vectors.
#[derive(Debug, Default, Clone)]
pub struct MemoryTables {
    pub blocks: Vec<BlockDb>,
    pub transactions: Vec<TransactionDb>,
    pub pending: Vec<PendingTransactionDb>,
    pub internal_transactions: Vec<InternalTransactionDb>,
    /// `(internal_tx_id, address)` participation pairs.
    pub address_in_itx: Vec<(String, String)>,
    pub addresses: Vec<AddressDb>,
    pub contracts: Vec<ContractDb>,
    pub verifications: Vec<VerificationResultDb>,
    pub balances: Vec<BalanceDb>,
    pub events: Vec<EventDb>,
    /// `(event_id, address)` participation pairs.
    pub address_in_event: Vec<(String, String)>,
    /// Every balance observation, not only the latest.
    pub token_holdings: Vec<TokenHoldingDb>,
    pub stats: Vec<StatsDb>,
    pub daily_transaction_counts: Vec<DailyTransactionCountDb>,
}

/// Store backed by process memory, used by tests and local demos.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<MemoryTables>,
}

impl MemoryStore {
    pub fn new(tables: MemoryTables) -> Self {
        MemoryStore {
            tables: RwLock::new(tables),
        }
    }

    pub fn update(&self, f: impl FnOnce(&mut MemoryTables)) -> Result<()> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        f(&mut tables);
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryTables) -> T) -> Result<T> {
        let tables = self
            .tables
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(f(&tables))
    }
}

fn matches_block(block_ref: &BlockRef, number: i64, hash: &str) -> bool {
    match block_ref {
        BlockRef::Number(n) => *n == number,
        BlockRef::Hash(h) => h == hash,
    }
}

fn is_token(tables: &MemoryTables, address: &str) -> bool {
    tables.contracts.iter().any(|c| {
        c.address == address
            && c.interfaces
                .iter()
                .any(|i| TOKEN_INTERFACES.contains(&i.as_str()))
    })
}

fn token_row(tables: &MemoryTables, address: &AddressDb) -> TokenDb {
    TokenDb {
        id: address.id,
        address: address.address.clone(),
        name: address.name.clone(),
        symbol: tables
            .contracts
            .iter()
            .find(|c| c.address == address.address)
            .and_then(|c| c.symbol.clone()),
        balance: address.balance.clone(),
        block_number: address.balance_block_number,
    }
}

fn with_emitter(tables: &MemoryTables, event: &EventDb) -> EventDb {
    let mut event = event.clone();
    event.contract_name = tables
        .addresses
        .iter()
        .find(|a| a.address == event.address)
        .and_then(|a| a.name.clone());
    if let Some(contract) = tables.contracts.iter().find(|c| c.address == event.address) {
        event.contract_symbol = contract.symbol.clone();
        event.contract_interfaces = contract.interfaces.clone();
    }
    event
}

#[async_trait]
impl ExplorerStore for MemoryStore {
    async fn blocks(&self, bounds: &QueryBounds<i64>) -> Result<Vec<BlockDb>> {
        self.read(|t| bounds.select_from(t.blocks.iter().cloned(), |b| b.number))
    }

    async fn block_by_number(&self, number: i64) -> Result<Option<BlockDb>> {
        self.read(|t| t.blocks.iter().find(|b| b.number == number).cloned())
    }

    async fn block_by_hash(&self, hash: &str) -> Result<Option<BlockDb>> {
        self.read(|t| t.blocks.iter().find(|b| b.hash == hash).cloned())
    }

    async fn transactions(
        &self,
        filter: &TransactionFilter,
        bounds: &QueryBounds<TxKey>,
    ) -> Result<Vec<TransactionDb>> {
        self.read(|t| {
            let rows = t.transactions.iter().filter(|tx| match filter {
                TransactionFilter::All => true,
                TransactionFilter::Block(block) => {
                    matches_block(block, tx.block_number, &tx.block_hash)
                }
                TransactionFilter::Address(address) => {
                    &tx.from_address == address || tx.to_address.as_ref() == Some(address)
                }
            });
            bounds.select_from(rows.cloned(), TransactionDb::key)
        })
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<TransactionDb>> {
        self.read(|t| t.transactions.iter().find(|tx| tx.hash == hash).cloned())
    }

    async fn daily_transaction_count(
        &self,
        day: NaiveDate,
    ) -> Result<Option<DailyTransactionCountDb>> {
        self.read(|t| {
            t.daily_transaction_counts
                .iter()
                .filter(|d| d.date <= day)
                .max_by_key(|d| d.date)
                .cloned()
        })
    }

    async fn pending_transactions(
        &self,
        since: i64,
        bounds: &QueryBounds<String>,
    ) -> Result<Vec<PendingTransactionDb>> {
        self.read(|t| {
            let rows = t
                .pending
                .iter()
                .filter(|tx| tx.status == "PENDING" && tx.timestamp >= since);
            bounds.select_from(rows.cloned(), |tx| tx.hash.clone())
        })
    }

    async fn pending_transaction_by_hash(
        &self,
        hash: &str,
    ) -> Result<Option<PendingTransactionDb>> {
        self.read(|t| t.pending.iter().find(|tx| tx.hash == hash).cloned())
    }

    async fn internal_transactions(
        &self,
        filter: &InternalTxFilter,
        bounds: &QueryBounds<String>,
    ) -> Result<Vec<InternalTransactionDb>> {
        self.read(|t| {
            let rows = t.internal_transactions.iter().filter(|itx| match filter {
                InternalTxFilter::Block(block) => {
                    matches_block(block, itx.block_number, &itx.block_hash)
                }
                InternalTxFilter::Transaction(hash) => &itx.transaction_hash == hash,
                InternalTxFilter::Address(address) => t
                    .address_in_itx
                    .iter()
                    .any(|(id, a)| id == &itx.internal_tx_id && a == address),
            });
            bounds.select_from(rows.cloned(), |itx| itx.internal_tx_id.clone())
        })
    }

    async fn internal_transaction_by_id(&self, id: &str) -> Result<Option<InternalTransactionDb>> {
        self.read(|t| {
            t.internal_transactions
                .iter()
                .find(|itx| itx.internal_tx_id == id)
                .cloned()
        })
    }

    async fn addresses(&self, bounds: &QueryBounds<i64>) -> Result<Vec<AddressDb>> {
        self.read(|t| bounds.select_from(t.addresses.iter().cloned(), |a| a.id))
    }

    async fn address(&self, address: &str) -> Result<Option<AddressDb>> {
        self.read(|t| t.addresses.iter().find(|a| a.address == address).cloned())
    }

    async fn contract(&self, address: &str) -> Result<Option<ContractDb>> {
        self.read(|t| t.contracts.iter().find(|c| c.address == address).cloned())
    }

    async fn verification(&self, address: &str) -> Result<Option<VerificationResultDb>> {
        self.read(|t| {
            t.verifications
                .iter()
                .filter(|v| v.address == address && v.matched)
                .max_by_key(|v| v.timestamp)
                .cloned()
        })
    }

    async fn balances(&self, address: &str, bounds: &QueryBounds<i64>) -> Result<Vec<BalanceDb>> {
        self.read(|t| {
            let rows = t.balances.iter().filter(|b| b.address == address);
            bounds.select_from(rows.cloned(), |b| b.id)
        })
    }

    async fn events(
        &self,
        filter: &EventFilter,
        bounds: &QueryBounds<String>,
    ) -> Result<Vec<EventDb>> {
        self.read(|t| {
            let rows = t.events.iter().filter(|e| match filter {
                EventFilter::Address(address) => t
                    .address_in_event
                    .iter()
                    .any(|(id, a)| id == &e.event_id && a == address),
                EventFilter::TransfersOfAddress(address) => {
                    e.event.as_deref() == Some("Transfer") && &e.address == address
                }
                EventFilter::TransfersOfTransaction(hash) => {
                    e.event.as_deref() == Some("Transfer") && &e.transaction_hash == hash
                }
            });
            bounds
                .select_from(rows.cloned(), |e| e.event_id.clone())
                .iter()
                .map(|e| with_emitter(t, e))
                .collect()
        })
    }

    async fn event_by_id(&self, event_id: &str) -> Result<Option<EventDb>> {
        self.read(|t| {
            t.events
                .iter()
                .find(|e| e.event_id == event_id)
                .map(|e| with_emitter(t, e))
        })
    }

    async fn tokens(&self, bounds: &QueryBounds<i64>) -> Result<Vec<TokenDb>> {
        self.read(|t| {
            let rows = t
                .addresses
                .iter()
                .filter(|a| a.is_contract() && is_token(t, &a.address))
                .map(|a| token_row(t, a));
            bounds.select_from(rows, |token| token.id)
        })
    }

    async fn search_tokens(&self, value: &str, limit: i64) -> Result<Vec<TokenDb>> {
        let needle = value.to_lowercase();
        let exact = value.chars().count() <= 1;
        let limit = usize::try_from(limit).unwrap_or(0);
        self.read(|t| {
            let mut found: Vec<TokenDb> = t
                .addresses
                .iter()
                .map(|a| token_row(t, a))
                .filter(|token| {
                    let symbol = token.symbol.as_deref().map(str::to_lowercase);
                    if exact {
                        return symbol.as_deref() == Some(needle.as_str());
                    }
                    let name = token.name.as_deref().map(str::to_lowercase);
                    [name, symbol]
                        .iter()
                        .flatten()
                        .any(|field| field.contains(&needle))
                })
                .collect();
            found.sort_by(|a, b| b.id.cmp(&a.id));
            found.truncate(limit);
            found
        })
    }

    async fn token_holdings(
        &self,
        filter: &HoldingFilter,
        bounds: &QueryBounds<HoldingKey>,
    ) -> Result<Vec<TokenHoldingDb>> {
        self.read(|t| {
            let mut latest: Vec<TokenHoldingDb> = Vec::new();
            for holding in t.token_holdings.iter().filter(|h| match filter {
                HoldingFilter::Holder(address) => &h.address == address,
                HoldingFilter::Token(contract) => &h.contract == contract,
            }) {
                let counterparty = filter.key(holding).0;
                match latest.iter_mut().find(|h| filter.key(h).0 == counterparty) {
                    Some(seen) if seen.block_number >= holding.block_number => {}
                    Some(seen) => *seen = holding.clone(),
                    None => latest.push(holding.clone()),
                }
            }
            for holding in latest.iter_mut() {
                holding.name = t
                    .addresses
                    .iter()
                    .find(|a| a.address == holding.contract)
                    .and_then(|a| a.name.clone());
                let contract = t.contracts.iter().find(|c| c.address == holding.contract);
                holding.symbol = contract.and_then(|c| c.symbol.clone());
                holding.decimals = contract.and_then(|c| c.decimals);
            }
            bounds.select_from(latest, |h| filter.key(h))
        })
    }

    async fn latest_stats(&self) -> Result<Option<StatsDb>> {
        self.read(|t| t.stats.iter().max_by_key(|s| s.block_number).cloned())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::pagination::{KeysetPaginator, SortDirection};

    fn holding(address: &str, contract: &str, block_number: i64, balance: &str) -> TokenHoldingDb {
        TokenHoldingDb {
            address: address.to_string(),
            contract: contract.to_string(),
            block_number,
            block_hash: format!("0x{block_number:064x}"),
            balance: Some(balance.to_string()),
            name: None,
            symbol: None,
            decimals: None,
        }
    }

    #[tokio::test]
    async fn token_holdings_keep_only_the_latest_observation() {
        let store = MemoryStore::new(MemoryTables {
            token_holdings: vec![
                holding("0xholder", "0xaaa", 5, "1"),
                holding("0xholder", "0xaaa", 9, "2"),
                holding("0xholder", "0xbbb", 7, "3"),
                holding("0xother", "0xaaa", 8, "4"),
            ],
            ..Default::default()
        });

        let filter = HoldingFilter::Holder("0xholder".to_string());
        let bounds =
            KeysetPaginator::<HoldingKey>::with_order(10, None, SortDirection::Ascending)
                .unwrap()
                .plan_query();
        let rows = store.token_holdings(&filter, &bounds).await.unwrap();

        let got: Vec<_> = rows
            .iter()
            .map(|h| (h.contract.as_str(), h.block_number, h.balance.as_deref()))
            .collect();
        assert_eq!(
            got,
            vec![("0xaaa", 9, Some("2")), ("0xbbb", 7, Some("3"))]
        );
    }

    #[tokio::test]
    async fn token_holdings_take_symbol_and_decimals_from_the_contract() {
        let mut stale = holding("0xholder", "0xtok", 3, "10");
        stale.symbol = Some("OLD".to_string());
        let store = MemoryStore::new(MemoryTables {
            contracts: vec![ContractDb {
                address: "0xtok".to_string(),
                name: None,
                symbol: Some("TKN".to_string()),
                decimals: Some(6),
                code: None,
                deployed_code: None,
                code_stored_at_block: None,
                creation_tx: None,
                total_supply: None,
                methods: vec![],
                interfaces: vec!["ERC20".to_string()],
            }],
            token_holdings: vec![stale, holding("0xholder", "0xnone", 4, "1")],
            ..Default::default()
        });

        let filter = HoldingFilter::Holder("0xholder".to_string());
        let bounds =
            KeysetPaginator::<HoldingKey>::with_order(10, None, SortDirection::Ascending)
                .unwrap()
                .plan_query();
        let rows = store.token_holdings(&filter, &bounds).await.unwrap();

        let got: Vec<_> = rows
            .iter()
            .map(|h| (h.contract.as_str(), h.symbol.as_deref(), h.decimals))
            .collect();
        assert_eq!(got, vec![("0xnone", None, None), ("0xtok", Some("TKN"), Some(6))]);
    }

    #[tokio::test]
    async fn search_matches_symbol_exactly_for_single_characters() {
        let address = |id: i64, addr: &str, name: &str| AddressDb {
            id,
            address: addr.to_string(),
            name: Some(name.to_string()),
            is_native: false,
            address_type: "contract".to_string(),
            balance: None,
            balance_block_number: None,
        };
        let contract = |addr: &str, symbol: &str| ContractDb {
            address: addr.to_string(),
            name: None,
            symbol: Some(symbol.to_string()),
            decimals: None,
            code: None,
            deployed_code: None,
            code_stored_at_block: None,
            creation_tx: None,
            total_supply: None,
            methods: vec![],
            interfaces: vec!["ERC20".to_string()],
        };
        let store = MemoryStore::new(MemoryTables {
            addresses: vec![
                address(1, "0x01", "Rif Token"),
                address(2, "0x02", "Rifus"),
                address(3, "0x03", "Other"),
            ],
            contracts: vec![
                contract("0x01", "RIF"),
                contract("0x02", "R"),
                contract("0x03", "OTH"),
            ],
            ..Default::default()
        });

        let exact = store.search_tokens("r", 10).await.unwrap();
        assert_eq!(
            exact.iter().map(|t| t.address.as_str()).collect::<Vec<_>>(),
            vec!["0x02"]
        );

        let fuzzy = store.search_tokens("rif", 10).await.unwrap();
        assert_eq!(
            fuzzy.iter().map(|t| t.address.as_str()).collect::<Vec<_>>(),
            vec!["0x02", "0x01"]
        );

        let limited = store.search_tokens("rif", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}
