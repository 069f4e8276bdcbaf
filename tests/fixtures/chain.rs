#![allow(dead_code)]

//! A small indexed chain: blocks 95 to 100, two accounts, one ERC20 token
//! and one plain contract.

use explorer_api::{
    model::*,
    store::{MemoryStore, MemoryTables},
};
use serde_json::json;

pub const ALICE: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub const BOB: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub const TOKEN: &str = "0xcccccccccccccccccccccccccccccccccccccccc";
pub const REGISTRY: &str = "0xdddddddddddddddddddddddddddddddddddddddd";
pub const MINER: &str = "0x0000000000000000000000000000000000000007";

pub const FIRST_BLOCK: i64 = 95;
pub const LAST_BLOCK: i64 = 100;
pub const BLOCK_TIME: i64 = 30;
const GENESIS_TIME: i64 = 1_700_000_000;

/// Transactions per block; blocks not listed are empty.
pub const TX_COUNTS: [(i64, i64); 4] = [(97, 1), (98, 3), (99, 2), (100, 1)];

/// Holds 1000 TKN.
pub const TOKEN_TOTAL_SUPPLY: &str = "1000000000000000000000";
pub const DEPLOYED_CODE: &str = "0x6080604052348015600f57600080fd5b50";

pub fn block_hash(number: i64) -> String {
    format!("0x{number:064x}")
}

pub fn tx_hash(block: i64, index: i64) -> String {
    format!("0x{block:060x}{index:04x}")
}

pub fn pending_hash(n: u64) -> String {
    format!("0x{:064x}", 0xf000 + n)
}

pub fn itx_id(block: i64, index: i64, n: i64) -> String {
    format!("{block:08x}{index:04x}{n:04x}")
}

pub fn event_id(block: i64, index: i64, log: i64) -> String {
    format!("ev-{block}-{index}-{log}")
}

fn timestamp(block: i64) -> i64 {
    GENESIS_TIME + block * BLOCK_TIME
}

fn tx_count(block: i64) -> i64 {
    TX_COUNTS
        .iter()
        .find(|(b, _)| *b == block)
        .map_or(0, |(_, count)| *count)
}

/// Every `(block, index)` pair, in chain order.
pub fn tx_keys() -> Vec<(i64, i64)> {
    TX_COUNTS
        .iter()
        .flat_map(|(block, count)| (0..*count).map(move |index| (*block, index)))
        .collect()
}

pub fn block(number: i64) -> BlockDb {
    BlockDb {
        number,
        hash: block_hash(number),
        parent_hash: block_hash(number - 1),
        miner: MINER.to_string(),
        size: 1000 + number,
        timestamp: timestamp(number),
        difficulty: "0x3b9aca00".to_string(),
        total_difficulty: "0xde0b6b3a7640000".to_string(),
        minimum_gas_price: "60000000".to_string(),
        gas_used: 21000 * tx_count(number),
        gas_limit: 6_800_000,
        transactions: json!((0..tx_count(number))
            .map(|index| tx_hash(number, index))
            .collect::<Vec<_>>()),
        uncles: json!([]),
    }
}

pub fn transaction(block: i64, index: i64) -> TransactionDb {
    let (from, to) = match (block, index % 2) {
        (100, _) => (ALICE, TOKEN),
        (_, 0) => (ALICE, BOB),
        _ => (BOB, ALICE),
    };
    let status = if (block, index) == (99, 1) { "0x0" } else { "0x1" };
    let logs: Vec<_> = (0..2)
        .map(|log| json!({ "eventId": event_id(block, index, log), "logIndex": log }))
        .collect();
    TransactionDb {
        hash: tx_hash(block, index),
        block_number: block,
        block_hash: block_hash(block),
        transaction_index: index,
        from_address: from.to_string(),
        to_address: Some(to.to_string()),
        value: "0xde0b6b3a7640000".to_string(),
        gas: 21000,
        gas_price: "60000000".to_string(),
        gas_used: 21000,
        nonce: index,
        input: "0x".to_string(),
        timestamp: timestamp(block),
        tx_type: "normal".to_string(),
        receipt: json!({ "status": status, "logs": logs }),
    }
}

pub fn pending(n: u64, status: &str, timestamp: i64) -> PendingTransactionDb {
    PendingTransactionDb {
        hash: pending_hash(n),
        from_address: ALICE.to_string(),
        to_address: Some(BOB.to_string()),
        value: "2000000000000000000".to_string(),
        gas: 21000,
        gas_price: "60000000".to_string(),
        nonce: n as i64,
        input: "0x".to_string(),
        status: status.to_string(),
        timestamp,
    }
}

pub fn internal_transaction(block: i64, index: i64, n: i64) -> InternalTransactionDb {
    InternalTransactionDb {
        internal_tx_id: itx_id(block, index, n),
        transaction_hash: tx_hash(block, index),
        block_number: block,
        block_hash: block_hash(block),
        itx_type: "call".to_string(),
        action: json!({
            "callType": "call",
            "from": ALICE,
            "to": TOKEN,
            "value": "0xde0b6b3a7640000",
            "gas": "0x5208",
        }),
        result: Some(json!({ "gasUsed": "0x5208", "output": "0x" })),
        error: None,
        timestamp: timestamp(block),
    }
}

fn address(id: i64, address: &str, kind: &str, name: Option<&str>) -> AddressDb {
    AddressDb {
        id,
        address: address.to_string(),
        name: name.map(str::to_string),
        is_native: false,
        address_type: kind.to_string(),
        balance: Some("0xde0b6b3a7640000".to_string()),
        balance_block_number: Some(LAST_BLOCK),
    }
}

pub fn event(block: i64, index: i64, log: i64, name: &str, args: serde_json::Value) -> EventDb {
    EventDb {
        event_id: event_id(block, index, log),
        address: TOKEN.to_string(),
        transaction_hash: tx_hash(block, index),
        block_number: block,
        log_index: log,
        event: Some(name.to_string()),
        timestamp: timestamp(block),
        abi: json!({ "name": name, "type": "event" }),
        args,
        contract_name: None,
        contract_symbol: None,
        contract_interfaces: vec![],
    }
}

/// Token metadata is joined from `contracts` when read back.
pub fn holding(holder: &str, block: i64, balance: &str) -> TokenHoldingDb {
    TokenHoldingDb {
        address: holder.to_string(),
        contract: TOKEN.to_string(),
        block_number: block,
        block_hash: block_hash(block),
        balance: Some(balance.to_string()),
        name: None,
        symbol: None,
        decimals: None,
    }
}

pub fn tables(now: i64) -> MemoryTables {
    let events = vec![
        event(97, 0, 0, "Transfer", json!([ALICE, BOB, "500000000000000000"])),
        event(98, 0, 0, "Transfer", json!([BOB, ALICE, "1500000000000000000"])),
        event(98, 0, 1, "Approval", json!([ALICE, BOB, "1"])),
        event(99, 0, 0, "Transfer", json!([ALICE, BOB, "2000000000000000000"])),
    ];
    let address_in_event = events
        .iter()
        .flat_map(|e| {
            [ALICE, BOB, TOKEN].map(|a| (e.event_id.clone(), a.to_string()))
        })
        .collect();

    let internal_transactions: Vec<_> = (0..3)
        .map(|n| internal_transaction(98, 0, n))
        .chain([internal_transaction(99, 0, 0)])
        .collect();
    let address_in_itx = internal_transactions
        .iter()
        .flat_map(|itx| [ALICE, TOKEN].map(|a| (itx.internal_tx_id.clone(), a.to_string())))
        .collect();

    MemoryTables {
        blocks: (FIRST_BLOCK..=LAST_BLOCK).map(block).collect(),
        transactions: tx_keys()
            .into_iter()
            .map(|(block, index)| transaction(block, index))
            .collect(),
        pending: vec![
            pending(1, "PENDING", now - 60),
            pending(2, "PENDING", now - 60),
            pending(3, "PENDING", now - 60),
            pending(4, "PENDING", now - 7200),
            pending(5, "DISCARDED", now),
        ],
        internal_transactions,
        address_in_itx,
        addresses: vec![
            address(1, ALICE, "account", None),
            address(2, BOB, "account", None),
            address(3, TOKEN, "contract", Some("Test Token")),
            address(4, REGISTRY, "contract", Some("Registry")),
        ],
        contracts: vec![
            ContractDb {
                address: TOKEN.to_string(),
                name: Some("Test Token".to_string()),
                symbol: Some("TKN".to_string()),
                decimals: Some(18),
                code: Some("0x6080".to_string()),
                deployed_code: Some(DEPLOYED_CODE.to_string()),
                code_stored_at_block: Some(FIRST_BLOCK),
                creation_tx: Some(json!({ "hash": tx_hash(97, 0) })),
                total_supply: Some(TOKEN_TOTAL_SUPPLY.to_string()),
                methods: vec!["transfer(address,uint256)".to_string()],
                interfaces: vec!["ERC20".to_string()],
            },
            ContractDb {
                address: REGISTRY.to_string(),
                name: Some("Registry".to_string()),
                symbol: None,
                decimals: None,
                code: None,
                deployed_code: None,
                code_stored_at_block: None,
                creation_tx: None,
                total_supply: None,
                methods: vec![],
                interfaces: vec![],
            },
        ],
        verifications: vec![VerificationResultDb {
            id: "verification-1".to_string(),
            address: TOKEN.to_string(),
            matched: true,
            request: json!({ "name": "Token", "version": "0.8.19" }),
            result: json!({}),
            abi: json!([]),
            sources: json!([{ "name": "Token.sol", "contents": "contract Token {}" }]),
            timestamp: now,
        }],
        balances: (1..=5)
            .map(|id| BalanceDb {
                id,
                address: ALICE.to_string(),
                block_number: FIRST_BLOCK + id,
                timestamp: timestamp(FIRST_BLOCK + id),
                balance: format!("{id}000000000000000000"),
            })
            .collect(),
        events,
        address_in_event,
        token_holdings: vec![
            holding(ALICE, 97, "1000000000000000000"),
            holding(ALICE, 99, "3000000000000000000"),
            holding(BOB, 98, "250000000000000000"),
        ],
        stats: vec![StatsDb {
            block_number: LAST_BLOCK,
            active_accounts: 2,
            hashrate: "2500000000".to_string(),
            circulating_supply: "1000".to_string(),
            total_supply: "1000".to_string(),
        }],
        daily_transaction_counts: vec![
            daily_count(-2, 40),
            daily_count(-1, 57),
            daily_count(1, 99),
        ],
    }
}

/// Aggregate for the day `offset` days from today; future days exist when
/// the aggregation job runs ahead of the UTC date.
pub fn daily_count(offset: i64, count: i64) -> DailyTransactionCountDb {
    DailyTransactionCountDb {
        date: chrono::Utc::now().date_naive() + chrono::Duration::days(offset),
        transaction_count: count,
    }
}

pub fn store() -> MemoryStore {
    MemoryStore::new(tables(chrono::Utc::now().timestamp()))
}
