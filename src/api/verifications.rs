use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use super::{parse_address, ApiState};
use crate::{
    rest::{AppError, BadRequest},
    utils::logger::LogMe,
    verifier::{bytecode_matches, UploadedFile},
};

pub const EVM_VERSIONS: [&str; 12] = [
    "homestead",
    "tangerineWhistle",
    "spuriousDragon",
    "byzantium",
    "constantinople",
    "petersburg",
    "istanbul",
    "berlin",
    "london",
    "paris",
    "shanghai",
    "cancun",
];

pub async fn get_evm_versions() -> Json<Vec<&'static str>> {
    Json(EVM_VERSIONS.to_vec())
}

/// The `data` field of a verification request. Fields this service does
/// not look at are forwarded untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Standard-JSON sources, stringified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytecode: Option<String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

fn is_compiler_version(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

impl VerifyRequest {
    /// Checks the request and, for standard-JSON uploads, copies the file's
    /// sources into the request. Returns the normalised contract address.
    pub fn validate(&mut self, file: Option<&UploadedFile>) -> Result<String, BadRequest> {
        let address = match self.address.as_deref() {
            None | Some("") => return Err(BadRequest::new("Address is required")),
            Some(raw) => parse_address(raw)?,
        };
        match self.version.as_deref() {
            None | Some("") => return Err(BadRequest::new("Compiler version is required")),
            Some(v) if !is_compiler_version(v) => {
                return Err(BadRequest::new("Invalid compiler version provided"))
            }
            Some(_) => {}
        }
        if self.name.as_deref().unwrap_or_default().is_empty() {
            return Err(BadRequest::new("Contract name is required"));
        }

        if let Some(file) = file {
            let input: Value = serde_json::from_slice(&file.bytes)
                .map_err(|e| BadRequest::new(format!("Invalid standard JSON file: {e}")))?;
            match (input.get("sources"), input.get("settings")) {
                (Some(sources), Some(settings)) if !sources.is_null() && !settings.is_null() => {
                    self.sources = Some(sources.to_string());
                }
                _ => {
                    return Err(BadRequest::new(
                        "Error, missing sources or settings in file",
                    ))
                }
            }
        } else if self.source.as_deref().unwrap_or_default().is_empty() {
            return Err(BadRequest::new("Either source or sources must be provided"));
        }

        self.address = Some(address.clone());
        Ok(address)
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponseData {
    pub address: Value,
    pub version: Value,
    pub name: Value,
    pub data_response: Value,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct VerifyResponse {
    pub success: bool,
    pub message: String,
    pub data: VerifyResponseData,
}

impl VerifyResponse {
    pub fn from_verifier(result: Value) -> Self {
        let success = bytecode_matches(&result);
        let field = |key: &str| result.get(key).cloned().unwrap_or(Value::Null);
        VerifyResponse {
            success,
            message: if success {
                "Contract verified successfully".to_string()
            } else {
                "Contract verification failed".to_string()
            },
            data: VerifyResponseData {
                address: field("address"),
                version: field("version"),
                name: field("name"),
                data_response: result,
            },
        }
    }
}

fn multipart_error(e: impl std::fmt::Display) -> BadRequest {
    BadRequest::new(format!("Invalid multipart payload: {e}"))
}

pub async fn verify(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<Json<VerifyResponse>, AppError> {
    let mut data = None;
    let mut file = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("data") => data = Some(field.text().await.map_err(multipart_error)?),
            Some("file") => {
                let name = field.file_name().unwrap_or("input.json").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
                file = Some(UploadedFile {
                    name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    let data = data.ok_or_else(|| BadRequest::new("Missing \"data\" field"))?;
    let mut request: VerifyRequest = serde_json::from_str(&data)
        .map_err(|e| BadRequest::new(format!("Invalid verification data: {e}")))?;
    let address = request.validate(file.as_ref())?;

    let contract = state
        .store
        .contract(&address)
        .await
        .log_error("Failed to fetch contract")?
        .ok_or_else(|| BadRequest::new("Contract not found in the database"))?;
    request.bytecode = contract.deployed_code;

    let result = state
        .verifier
        .verify(&serde_json::to_value(&request)?, file)
        .await
        .log_error("Failed to verify contract")?;
    let response = VerifyResponse::from_verifier(result);
    info!(%address, success = response.success, "contract verification finished");

    Ok(Json(response))
}
