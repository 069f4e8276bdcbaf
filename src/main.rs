use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use explorer_api::{
    api::{self, ApiState},
    rest::{RestApi, RestApiRunContext},
    store::PgStore,
    utils::{
        conf::Conf,
        logger::{setup_tracing, TracingMode},
    },
    verifier::VerifierClient,
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, default_value = "config.ron")]
    pub config_file: Option<String>,

    #[arg(long)]
    pub database_url: Option<String>,

    #[arg(long)]
    pub rest_addr: Option<String>,

    #[arg(long)]
    pub run_migrations: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Conf::new_shared(
        args.config_file,
        args.rest_addr,
        args.database_url,
        args.run_migrations,
    )
    .context("reading config file")?;

    setup_tracing(TracingMode::from(&config.log_format)).context("setting up tracing")?;

    info!(
        rest_addr = %config.rest_addr,
        verifier_url = %config.verifier_url,
        "Starting explorer API"
    );

    let store = PgStore::connect(&config).await?;
    let verifier = VerifierClient::new(&config.verifier_url)?;

    let router = api::router(ApiState {
        store: Arc::new(store),
        conf: config.clone(),
        verifier,
    });

    let mut rest = RestApi::build(RestApiRunContext {
        rest_addr: config.rest_addr.clone(),
        router,
    });
    rest.serve().await
}
