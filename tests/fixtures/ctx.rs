#![allow(unused)]

use std::sync::Arc;

use anyhow::Result;
use axum::{extract::Multipart, routing::post, Json, Router};
use axum_test::TestServer;
use explorer_api::{
    api::{self, ApiState},
    store::ExplorerStore,
    utils::conf::Conf,
    verifier::VerifierClient,
};
use serde_json::{json, Value};

use super::chain;

/// Nothing listens there: requests to it fail fast.
const UNREACHABLE_VERIFIER: &str = "http://127.0.0.1:9";

pub struct ApiCtx {
    pub server: TestServer,
}

impl ApiCtx {
    pub fn new<S: ExplorerStore + 'static>(store: Arc<S>) -> Result<Self> {
        Self::with_verifier(store, UNREACHABLE_VERIFIER)
    }

    pub fn with_verifier<S: ExplorerStore + 'static>(
        store: Arc<S>,
        verifier_url: &str,
    ) -> Result<Self> {
        let conf = Conf {
            verifier_url: verifier_url.to_string(),
            ..Conf::default()
        };
        let router = api::router(ApiState {
            store,
            verifier: VerifierClient::new(&conf.verifier_url)?,
            conf: Arc::new(conf),
        });
        Ok(ApiCtx {
            server: TestServer::new(router)?,
        })
    }

    /// A server over the fixture chain.
    pub fn chain() -> Result<Self> {
        Self::new(Arc::new(chain::store()))
    }

    pub async fn get_json(&self, path: &str) -> Value {
        let response = self.server.get(path).await;
        response.assert_status_ok();
        response.json::<Value>()
    }
}

/// Answers like the real verifier: the bytecode hash matches when the request
/// carries the fixture token's deployed code.
async fn fake_verify(mut multipart: Multipart) -> Json<Value> {
    let mut data = Value::Null;
    let mut file_name = Value::Null;
    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name() {
            Some("data") => {
                let text = field.text().await.unwrap_or_default();
                data = serde_json::from_str(&text).unwrap_or(Value::Null);
            }
            Some("file") => {
                file_name = json!(field.file_name());
            }
            _ => {}
        }
    }

    let hash = format!("0x{}", "42".repeat(32));
    let compiled = if data["bytecode"] == chain::DEPLOYED_CODE {
        hash.clone()
    } else {
        format!("0x{}", "00".repeat(32))
    };
    Json(json!({
        "address": data["address"],
        "version": data["version"],
        "name": data["name"],
        "bytecodeHash": hash,
        "resultBytecodeHash": compiled,
        "receivedBytecode": data["bytecode"],
        "receivedSources": data["sources"],
        "receivedFile": file_name,
    }))
}

/// Starts the fake verifier on a free port and returns its base URL.
pub async fn fake_verifier() -> Result<String> {
    let app = Router::new().route("/api/verifier/verify", post(fake_verify));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move { axum::serve(listener, app).await });
    Ok(format!("http://{addr}"))
}
