//! Generate command - Render and write both artifacts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;

use pgforge_core::Generator;

use super::{load_config, RequestArgs};
use crate::handler::{artifact_paths, GenerationHandler};
use crate::store::FsArtifactStore;

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Directory the artifacts are written to
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: GenerateArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let generator = Arc::new(Generator::new(&config)?);
    let raw = args.request.to_raw()?;

    info!("Generating artifacts into {:?}", args.output);

    let handler = GenerationHandler::new(generator, Arc::new(FsArtifactStore::new(&args.output)));
    let summary = handler.handle(&raw).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let (infra, playbook) = artifact_paths(&args.output, &summary);
    println!("✅ {}", summary.message);
    println!("   Terraform: {}", infra.display());
    println!("   Ansible:   {}", playbook.display());
    for warning in &summary.warnings {
        println!("⚠️  {}", warning);
    }

    Ok(())
}
