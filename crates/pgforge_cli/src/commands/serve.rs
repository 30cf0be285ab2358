//! Serve command - HTTP front end.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;

use pgforge_core::Generator;

use super::load_config;
use crate::api;
use crate::handler::GenerationHandler;
use crate::store::FsArtifactStore;

#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "PGFORGE_HOST")]
    pub host: String,

    /// Port to bind
    #[arg(short, long, default_value_t = 8001, env = "PGFORGE_PORT")]
    pub port: u16,

    /// Directory the artifacts are written to
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

pub async fn execute(args: ServeArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let generator = Arc::new(Generator::new(&config)?);
    let handler = GenerationHandler::new(generator, Arc::new(FsArtifactStore::new(&args.output)));

    info!("Writing artifacts to {:?}", args.output);
    api::start_server(&args.host, args.port, handler).await
}
