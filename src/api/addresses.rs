use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use super::{parse_address, ApiState, DataResponse, PageParams};
use crate::{
    model::{AddressDb, ContractDb, VerificationResultDb},
    pagination::PaginatedResponse,
    rest::AppError,
    utils::{
        logger::LogMe,
        units::{hex_to_ether, wei_to_ether},
    },
};

fn balance_in_ether(balance: Option<&str>) -> String {
    balance
        .and_then(hex_to_ether)
        .unwrap_or_else(|| "0".to_string())
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct APIAddress {
    pub id: i64,
    pub address: String,
    pub name: Option<String>,
    pub is_native: bool,
    #[serde(rename = "type")]
    pub address_type: String,
    /// Latest known balance, in ether.
    pub balance: String,
    pub block_number: Option<i64>,
}

impl From<AddressDb> for APIAddress {
    fn from(address: AddressDb) -> Self {
        APIAddress {
            balance: balance_in_ether(address.balance.as_deref()),
            id: address.id,
            address: address.address,
            name: address.name,
            is_native: address.is_native,
            address_type: address.address_type,
            block_number: address.balance_block_number,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct APIContractDetails {
    pub created_by_tx: Option<Value>,
    /// In ether.
    pub total_supply: String,
    pub code: Option<String>,
    pub deployed_code: Option<String>,
    pub code_stored_at_block: Option<i64>,
    pub symbol: Option<String>,
    pub contract_method: Vec<String>,
    pub contract_interface: Vec<String>,
}

impl From<ContractDb> for APIContractDetails {
    fn from(contract: ContractDb) -> Self {
        APIContractDetails {
            created_by_tx: contract.creation_tx,
            total_supply: contract
                .total_supply
                .as_deref()
                .and_then(wei_to_ether)
                .unwrap_or_else(|| "0".to_string()),
            code: contract.code,
            deployed_code: contract.deployed_code,
            code_stored_at_block: contract.code_stored_at_block,
            symbol: contract.symbol,
            contract_method: contract.methods,
            contract_interface: contract.interfaces,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct APIAddressDetails {
    /// Only set for contracts.
    pub is_verified: Option<bool>,
    #[serde(flatten)]
    pub address: APIAddress,
    #[serde(flatten)]
    pub contract: Option<APIContractDetails>,
}

pub async fn get_addresses(
    Query(page): Query<PageParams>,
    State(state): State<ApiState>,
) -> Result<Json<PaginatedResponse<APIAddress>>, AppError> {
    let paginator = page.paginator::<i64>(&state.conf.pagination)?;
    let rows = state
        .store
        .addresses(&paginator.plan_query())
        .await
        .log_error("Failed to fetch addresses")?;
    Ok(Json(
        paginator
            .build_page(rows, |a| a.id)
            .map(APIAddress::from)
            .into_response(),
    ))
}

pub async fn get_address(
    Path(address): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<DataResponse<APIAddressDetails>>, AppError> {
    let address = parse_address(&address)?;
    let Some(row) = state
        .store
        .address(&address)
        .await
        .log_error("Failed to fetch address")?
    else {
        return Ok(Json(DataResponse::new(None)));
    };

    let (is_verified, contract) = if row.is_contract() {
        let contract = state
            .store
            .contract(&address)
            .await
            .log_error("Failed to fetch contract")?;
        let verified = state
            .store
            .verification(&address)
            .await
            .log_error("Failed to fetch contract verification")?
            .is_some();
        (Some(verified), contract.map(APIContractDetails::from))
    } else {
        (None, None)
    };

    Ok(Json(DataResponse::new(Some(APIAddressDetails {
        is_verified,
        address: row.into(),
        contract,
    }))))
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceFile {
    pub file: String,
    pub content: String,
}

/// Stored sources are `[{name, contents}]`. Flattened sources are split back
/// into files on their `// File <path>` markers.
pub fn source_files(sources: &Value) -> Vec<SourceFile> {
    let entries: Vec<&Value> = match sources {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    };
    let named = |entry: &Value| -> Option<SourceFile> {
        Some(SourceFile {
            file: entry.get("name")?.as_str()?.to_string(),
            content: entry.get("contents")?.as_str()?.trim().to_string(),
        })
    };

    let flattened = entries
        .iter()
        .find_map(|entry| entry.get("contents").and_then(Value::as_str));
    let mut files: Vec<SourceFile> = Vec::new();
    if let Some(contents) = flattened {
        for chunk in contents.split("// File").skip(1) {
            let Some((path, body)) = chunk.split_once('\n') else {
                continue;
            };
            let Some(file) = path
                .trim()
                .split('/')
                .find_map(|segment| segment.rfind(".sol").map(|end| &segment[..end + 4]))
            else {
                continue;
            };
            if !files.iter().any(|f| f.file == file) {
                files.push(SourceFile {
                    file: file.to_string(),
                    content: body.trim().to_string(),
                });
            }
        }
    }
    if files.is_empty() {
        files = entries.into_iter().filter_map(named).collect();
    }
    files
}

#[derive(Debug, Serialize, PartialEq)]
pub struct APIContractVerification {
    pub id: String,
    #[serde(rename = "match")]
    pub matched: bool,
    pub result: Value,
    pub abi: Value,
    pub sources: Vec<SourceFile>,
    pub request: Value,
    pub timestamp: String,
}

impl From<VerificationResultDb> for APIContractVerification {
    fn from(verification: VerificationResultDb) -> Self {
        APIContractVerification {
            sources: source_files(&verification.sources),
            id: verification.id,
            matched: verification.matched,
            result: verification.result,
            abi: verification.abi,
            request: verification.request,
            timestamp: verification.timestamp.to_string(),
        }
    }
}

pub async fn get_contract_verification(
    Path(address): Path<String>,
    State(state): State<ApiState>,
) -> Result<Json<DataResponse<APIContractVerification>>, AppError> {
    let address = parse_address(&address)?;
    let verification = state
        .store
        .verification(&address)
        .await
        .log_error("Failed to fetch contract verification")?;
    Ok(Json(DataResponse::new(verification.map(Into::into))))
}
