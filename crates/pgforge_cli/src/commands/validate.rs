//! Validate command - Check a request without rendering.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use pgforge_core::Generator;

use super::{load_config, RequestArgs};

#[derive(Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Print the normalized request as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: ValidateArgs, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let generator = Generator::new(&config)?;
    let raw = args.request.to_raw()?;

    let request = generator.validate(&raw)?;
    let advisories = generator.validator().advisories(&request);

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "request": request,
                "advisories": advisories,
            }))?
        );
        return Ok(());
    }

    println!("✅ Request is valid");
    println!("   PostgreSQL:      {}", request.postgres_version());
    println!(
        "   Nodes:           {} x {} ({} replica(s))",
        request.node_count(),
        request.instance_type(),
        request.num_replicas()
    );
    println!("   max_connections: {}", request.max_connections());
    println!("   shared_buffers:  {}", request.shared_buffers());

    for note in &advisories {
        println!("   ⚠️  {}", note);
    }

    Ok(())
}
