//! Client for the external contract source verifier.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::warn;

/// A file uploaded along with a verification request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct VerifierClient {
    url: String,
    client: reqwest::Client,
}

impl VerifierClient {
    pub fn new(url: &str) -> Result<Self> {
        let url = url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&url).context(format!("parsing verifier url {url}"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("building verifier http client")?;
        Ok(VerifierClient { url, client })
    }

    /// Forwards the request as multipart (`data` plus the optional `file`)
    /// and returns the verifier's JSON answer, whatever its status.
    pub async fn verify(&self, data: &Value, file: Option<UploadedFile>) -> Result<Value> {
        let mut form = Form::new().text("data", serde_json::to_string(data)?);
        if let Some(file) = file {
            let mut part = Part::bytes(file.bytes).file_name(file.name);
            if let Some(content_type) = file.content_type {
                part = part
                    .mime_str(&content_type)
                    .context("invalid uploaded file content type")?;
            }
            form = form.part("file", part);
        }

        let response = self
            .client
            .post(format!("{}/api/verifier/verify", self.url))
            .multipart(form)
            .send()
            .await
            .context("sending verification request")?;
        if !response.status().is_success() {
            warn!("verifier answered {}", response.status());
        }
        response
            .json::<Value>()
            .await
            .context("decoding verifier response")
    }
}

/// The verifier's compiled bytecode hash must be a full 32-byte hex hash
/// equal to the hash of the deployed bytecode.
pub fn bytecode_matches(result: &Value) -> bool {
    let expected = result.get("bytecodeHash").and_then(Value::as_str);
    let actual = result.get("resultBytecodeHash").and_then(Value::as_str);
    matches!((expected, actual), (Some(e), Some(a)) if e.len() == 66 && e == a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn match_rule() {
        let hash = format!("0x{}", "ab".repeat(32));
        assert!(bytecode_matches(
            &json!({ "bytecodeHash": hash, "resultBytecodeHash": hash })
        ));
        assert!(!bytecode_matches(
            &json!({ "bytecodeHash": hash, "resultBytecodeHash": "0x00" })
        ));
        assert!(!bytecode_matches(
            &json!({ "bytecodeHash": "0xab", "resultBytecodeHash": "0xab" })
        ));
        assert!(!bytecode_matches(&json!({ "bytecodeHash": hash })));
        assert!(!bytecode_matches(&json!({ "error": "compilation failed" })));
    }

    #[test]
    fn rejects_unparseable_url() {
        assert!(VerifierClient::new("not a url").is_err());
        assert!(VerifierClient::new("http://localhost:3003/").is_ok());
    }
}
