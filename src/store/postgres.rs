use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::chrono::NaiveDate, PgPool, Postgres, QueryBuilder};
use tracing::info;

use super::{
    BlockRef, EventFilter, ExplorerStore, HoldingFilter, InternalTxFilter, TransactionFilter,
    TOKEN_INTERFACES,
};
use crate::{
    model::*,
    pagination::{HoldingKey, QueryBounds, TxKey},
    utils::conf::Conf,
};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./src/store/migrations");

type Query = QueryBuilder<'static, Postgres>;

/// Binds the components of an order key, in column order.
trait PgKey {
    fn push_values(&self, qb: &mut Query);
}

impl PgKey for i64 {
    fn push_values(&self, qb: &mut Query) {
        qb.push_bind(*self);
    }
}

impl PgKey for String {
    fn push_values(&self, qb: &mut Query) {
        qb.push_bind(self.clone());
    }
}

impl<A: PgKey, B: PgKey> PgKey for (A, B) {
    fn push_values(&self, qb: &mut Query) {
        self.0.push_values(qb);
        qb.push(", ");
        self.1.push_values(qb);
    }
}

/// Appends `AND (cols) <op> (key) ORDER BY cols LIMIT n` to a query whose
/// WHERE clause is already open.
fn push_keyset<K: PgKey>(qb: &mut Query, columns: &[&str], bounds: &QueryBounds<K>) {
    if let Some(boundary) = &bounds.boundary {
        qb.push(" AND (")
            .push(columns.join(", "))
            .push(") ")
            .push(boundary.comparison.as_sql())
            .push(" (");
        boundary.key.push_values(qb);
        qb.push(")");
    }
    let order = columns
        .iter()
        .map(|column| format!("{column} {}", bounds.direction.as_sql()))
        .collect::<Vec<_>>()
        .join(", ");
    qb.push(" ORDER BY ")
        .push(order)
        .push(" LIMIT ")
        .push_bind(bounds.sql_limit());
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

const ADDRESS_SELECT: &str = r#"
    SELECT a.id, a.address, a.name, a.is_native, a.type,
           b.balance, b.block_number AS balance_block_number
    FROM addresses a
    LEFT JOIN address_latest_balance b ON b.address = a.address
"#;

const EVENT_SELECT: &str = r#"
    SELECT e.*, a.name AS contract_name, c.symbol AS contract_symbol,
           ARRAY(
               SELECT i.interface FROM contract_interfaces i
               WHERE i.contract = e.address ORDER BY i.interface
           ) AS contract_interfaces
    FROM events e
    LEFT JOIN addresses a ON a.address = e.address
    LEFT JOIN contracts c ON c.address = e.address
"#;

const TOKEN_SELECT: &str = r#"
    SELECT a.id, a.address, a.name, c.symbol, b.balance, b.block_number
    FROM addresses a
    LEFT JOIN contracts c ON c.address = a.address
    LEFT JOIN address_latest_balance b ON b.address = a.address
"#;

#[derive(Debug, Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        PgStore { db }
    }

    pub async fn connect(conf: &Conf) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(conf.db_max_connections)
            .acquire_timeout(Duration::from_secs(conf.db_acquire_timeout_secs))
            .connect(&conf.database_url)
            .await
            .context("Failed to connect to the database")?;

        if conf.run_migrations {
            info!("Checking for new DB migration...");
            tokio::time::timeout(Duration::from_secs(60), MIGRATOR.run(&pool))
                .await
                .context("Timed out running DB migrations")?
                .context("Running DB migrations")?;
        }

        Ok(PgStore::new(pool))
    }
}

#[async_trait]
impl ExplorerStore for PgStore {
    async fn blocks(&self, bounds: &QueryBounds<i64>) -> Result<Vec<BlockDb>> {
        let mut qb = Query::new("SELECT * FROM blocks bl WHERE TRUE");
        push_keyset(&mut qb, &["bl.number"], bounds);
        qb.build_query_as::<BlockDb>()
            .fetch_all(&self.db)
            .await
            .context("fetching blocks")
    }

    async fn block_by_number(&self, number: i64) -> Result<Option<BlockDb>> {
        sqlx::query_as::<_, BlockDb>("SELECT * FROM blocks WHERE number = $1")
            .bind(number)
            .fetch_optional(&self.db)
            .await
            .context("fetching block by number")
    }

    async fn block_by_hash(&self, hash: &str) -> Result<Option<BlockDb>> {
        sqlx::query_as::<_, BlockDb>("SELECT * FROM blocks WHERE hash = $1")
            .bind(hash)
            .fetch_optional(&self.db)
            .await
            .context("fetching block by hash")
    }

    async fn transactions(
        &self,
        filter: &TransactionFilter,
        bounds: &QueryBounds<TxKey>,
    ) -> Result<Vec<TransactionDb>> {
        let mut qb = Query::new("SELECT * FROM transactions t WHERE TRUE");
        match filter {
            TransactionFilter::All => {}
            TransactionFilter::Block(BlockRef::Number(number)) => {
                qb.push(" AND t.block_number = ").push_bind(*number);
            }
            TransactionFilter::Block(BlockRef::Hash(hash)) => {
                qb.push(" AND t.block_hash = ").push_bind(hash.clone());
            }
            TransactionFilter::Address(address) => {
                qb.push(" AND (t.from_address = ")
                    .push_bind(address.clone())
                    .push(" OR t.to_address = ")
                    .push_bind(address.clone())
                    .push(")");
            }
        }
        push_keyset(&mut qb, &["t.block_number", "t.transaction_index"], bounds);
        qb.build_query_as::<TransactionDb>()
            .fetch_all(&self.db)
            .await
            .context("fetching transactions")
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<TransactionDb>> {
        sqlx::query_as::<_, TransactionDb>("SELECT * FROM transactions WHERE hash = $1")
            .bind(hash)
            .fetch_optional(&self.db)
            .await
            .context("fetching transaction by hash")
    }

    async fn daily_transaction_count(
        &self,
        day: NaiveDate,
    ) -> Result<Option<DailyTransactionCountDb>> {
        sqlx::query_as::<_, DailyTransactionCountDb>(
            "SELECT date, transaction_count FROM daily_transaction_counts
             WHERE date <= $1 ORDER BY date DESC LIMIT 1",
        )
        .bind(day)
        .fetch_optional(&self.db)
        .await
        .context("fetching daily transaction count")
    }

    async fn pending_transactions(
        &self,
        since: i64,
        bounds: &QueryBounds<String>,
    ) -> Result<Vec<PendingTransactionDb>> {
        let mut qb = Query::new(
            "SELECT * FROM transactions_pending p WHERE p.status = 'PENDING' AND p.timestamp >= ",
        );
        qb.push_bind(since);
        push_keyset(&mut qb, &["p.hash"], bounds);
        qb.build_query_as::<PendingTransactionDb>()
            .fetch_all(&self.db)
            .await
            .context("fetching pending transactions")
    }

    async fn pending_transaction_by_hash(
        &self,
        hash: &str,
    ) -> Result<Option<PendingTransactionDb>> {
        sqlx::query_as::<_, PendingTransactionDb>(
            "SELECT * FROM transactions_pending WHERE hash = $1",
        )
        .bind(hash)
        .fetch_optional(&self.db)
        .await
        .context("fetching pending transaction by hash")
    }

    async fn internal_transactions(
        &self,
        filter: &InternalTxFilter,
        bounds: &QueryBounds<String>,
    ) -> Result<Vec<InternalTransactionDb>> {
        let mut qb = Query::new("SELECT itx.* FROM internal_transactions itx");
        match filter {
            InternalTxFilter::Block(BlockRef::Number(number)) => {
                qb.push(" WHERE itx.block_number = ").push_bind(*number);
            }
            InternalTxFilter::Block(BlockRef::Hash(hash)) => {
                qb.push(" WHERE itx.block_hash = ").push_bind(hash.clone());
            }
            InternalTxFilter::Transaction(hash) => {
                qb.push(" WHERE itx.transaction_hash = ")
                    .push_bind(hash.clone());
            }
            InternalTxFilter::Address(address) => {
                qb.push(
                    " JOIN address_in_itx ai ON ai.internal_tx_id = itx.internal_tx_id \
                     WHERE ai.address = ",
                )
                .push_bind(address.clone());
            }
        }
        push_keyset(&mut qb, &["itx.internal_tx_id"], bounds);
        qb.build_query_as::<InternalTransactionDb>()
            .fetch_all(&self.db)
            .await
            .context("fetching internal transactions")
    }

    async fn internal_transaction_by_id(&self, id: &str) -> Result<Option<InternalTransactionDb>> {
        sqlx::query_as::<_, InternalTransactionDb>(
            "SELECT * FROM internal_transactions WHERE internal_tx_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("fetching internal transaction by id")
    }

    async fn addresses(&self, bounds: &QueryBounds<i64>) -> Result<Vec<AddressDb>> {
        let mut qb = Query::new(ADDRESS_SELECT);
        qb.push(" WHERE TRUE");
        push_keyset(&mut qb, &["a.id"], bounds);
        qb.build_query_as::<AddressDb>()
            .fetch_all(&self.db)
            .await
            .context("fetching addresses")
    }

    async fn address(&self, address: &str) -> Result<Option<AddressDb>> {
        let mut qb = Query::new(ADDRESS_SELECT);
        qb.push(" WHERE a.address = ").push_bind(address.to_string());
        qb.build_query_as::<AddressDb>()
            .fetch_optional(&self.db)
            .await
            .context("fetching address")
    }

    async fn contract(&self, address: &str) -> Result<Option<ContractDb>> {
        sqlx::query_as::<_, ContractDb>(
            r#"
            SELECT c.address, a.name, c.symbol, c.decimals, c.code, c.deployed_code,
                   c.code_stored_at_block, c.creation_tx,
                   (
                       SELECT ts.total_supply FROM total_supply ts
                       WHERE ts.contract = c.address
                       ORDER BY ts.block_number DESC LIMIT 1
                   ) AS total_supply,
                   ARRAY(
                       SELECT m.method FROM contract_methods m
                       WHERE m.contract = c.address ORDER BY m.method
                   ) AS methods,
                   ARRAY(
                       SELECT i.interface FROM contract_interfaces i
                       WHERE i.contract = c.address ORDER BY i.interface
                   ) AS interfaces
            FROM contracts c
            LEFT JOIN addresses a ON a.address = c.address
            WHERE c.address = $1
            "#,
        )
        .bind(address)
        .fetch_optional(&self.db)
        .await
        .context("fetching contract")
    }

    async fn verification(&self, address: &str) -> Result<Option<VerificationResultDb>> {
        sqlx::query_as::<_, VerificationResultDb>(
            r#"
            SELECT * FROM verification_results
            WHERE address = $1 AND matched
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .bind(address)
        .fetch_optional(&self.db)
        .await
        .context("fetching contract verification")
    }

    async fn balances(&self, address: &str, bounds: &QueryBounds<i64>) -> Result<Vec<BalanceDb>> {
        let mut qb = Query::new("SELECT * FROM balances b WHERE b.address = ");
        qb.push_bind(address.to_string());
        push_keyset(&mut qb, &["b.id"], bounds);
        qb.build_query_as::<BalanceDb>()
            .fetch_all(&self.db)
            .await
            .context("fetching balances")
    }

    async fn events(
        &self,
        filter: &EventFilter,
        bounds: &QueryBounds<String>,
    ) -> Result<Vec<EventDb>> {
        let mut qb = Query::new(EVENT_SELECT);
        match filter {
            EventFilter::Address(address) => {
                qb.push(
                    " WHERE EXISTS (SELECT 1 FROM address_in_event ae \
                     WHERE ae.event_id = e.event_id AND ae.address = ",
                )
                .push_bind(address.clone())
                .push(")");
            }
            EventFilter::TransfersOfAddress(address) => {
                qb.push(" WHERE e.event = 'Transfer' AND e.address = ")
                    .push_bind(address.clone());
            }
            EventFilter::TransfersOfTransaction(hash) => {
                qb.push(" WHERE e.event = 'Transfer' AND e.transaction_hash = ")
                    .push_bind(hash.clone());
            }
        }
        push_keyset(&mut qb, &["e.event_id"], bounds);
        qb.build_query_as::<EventDb>()
            .fetch_all(&self.db)
            .await
            .context("fetching events")
    }

    async fn event_by_id(&self, event_id: &str) -> Result<Option<EventDb>> {
        let mut qb = Query::new(EVENT_SELECT);
        qb.push(" WHERE e.event_id = ").push_bind(event_id.to_string());
        qb.build_query_as::<EventDb>()
            .fetch_optional(&self.db)
            .await
            .context("fetching event by id")
    }

    async fn tokens(&self, bounds: &QueryBounds<i64>) -> Result<Vec<TokenDb>> {
        let mut qb = Query::new(TOKEN_SELECT);
        qb.push(
            " WHERE a.type = 'contract' AND EXISTS (SELECT 1 FROM contract_interfaces i \
             WHERE i.contract = a.address AND i.interface = ANY(",
        )
        .push_bind(TOKEN_INTERFACES.map(String::from).to_vec())
        .push("))");
        push_keyset(&mut qb, &["a.id"], bounds);
        qb.build_query_as::<TokenDb>()
            .fetch_all(&self.db)
            .await
            .context("fetching tokens")
    }

    async fn search_tokens(&self, value: &str, limit: i64) -> Result<Vec<TokenDb>> {
        let mut qb = Query::new(TOKEN_SELECT);
        if value.chars().count() <= 1 {
            qb.push(" WHERE lower(c.symbol) = lower(")
                .push_bind(value.to_string())
                .push(")");
        } else {
            let pattern = format!("%{}%", escape_like(value));
            qb.push(" WHERE a.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.symbol ILIKE ")
                .push_bind(pattern);
        }
        qb.push(" ORDER BY a.id DESC LIMIT ").push_bind(limit);
        qb.build_query_as::<TokenDb>()
            .fetch_all(&self.db)
            .await
            .context("searching tokens")
    }

    async fn token_holdings(
        &self,
        filter: &HoldingFilter,
        bounds: &QueryBounds<HoldingKey>,
    ) -> Result<Vec<TokenHoldingDb>> {
        // Latest row per counterparty, then keyset over (counterparty, block).
        let (partition, matched, value) = match filter {
            HoldingFilter::Holder(address) => ("contract", "address", address),
            HoldingFilter::Token(contract) => ("address", "contract", contract),
        };
        let mut qb = Query::new(format!(
            r#"
            SELECT * FROM (
                SELECT DISTINCT ON (t.{partition})
                       t.address, t.contract, t.block_number, t.block_hash, t.balance,
                       a.name, c.symbol, c.decimals
                FROM token_addresses t
                LEFT JOIN addresses a ON a.address = t.contract
                LEFT JOIN contracts c ON c.address = t.contract
                WHERE t.{matched} = "#
        ));
        qb.push_bind(value.clone()).push(format!(
            " ORDER BY t.{partition}, t.block_number DESC) h WHERE TRUE"
        ));
        let key_column = format!("h.{partition}");
        push_keyset(&mut qb, &[key_column.as_str(), "h.block_number"], bounds);
        qb.build_query_as::<TokenHoldingDb>()
            .fetch_all(&self.db)
            .await
            .context("fetching token balances")
    }

    async fn latest_stats(&self) -> Result<Option<StatsDb>> {
        sqlx::query_as::<_, StatsDb>("SELECT * FROM stats ORDER BY block_number DESC LIMIT 1")
            .fetch_optional(&self.db)
            .await
            .context("fetching stats")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::KeysetPaginator;
    use sqlx::Execute;

    #[test]
    fn keyset_clause_for_composite_key() {
        let bounds = KeysetPaginator::new(-2, Some((12_i64, 3_i64)))
            .unwrap()
            .plan_query();
        let mut qb = Query::new("SELECT * FROM transactions t WHERE TRUE");
        push_keyset(&mut qb, &["t.block_number", "t.transaction_index"], &bounds);
        assert_eq!(
            qb.build().sql(),
            "SELECT * FROM transactions t WHERE TRUE \
             AND (t.block_number, t.transaction_index) > ($1, $2) \
             ORDER BY t.block_number ASC, t.transaction_index ASC LIMIT $3"
        );
    }

    #[test]
    fn keyset_clause_without_cursor() {
        let bounds = KeysetPaginator::<i64>::new(5, None).unwrap().plan_query();
        let mut qb = Query::new("SELECT * FROM blocks bl WHERE TRUE");
        push_keyset(&mut qb, &["bl.number"], &bounds);
        assert_eq!(
            qb.build().sql(),
            "SELECT * FROM blocks bl WHERE TRUE ORDER BY bl.number DESC LIMIT $1"
        );
    }

    #[test]
    fn like_patterns_are_escaped() {
        assert_eq!(escape_like("a_b%c\\"), "a\\_b\\%c\\\\");
    }
}
