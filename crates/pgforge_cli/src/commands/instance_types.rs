//! Instance-types command - List the supported EC2 sizes.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use pgforge_spec::InstanceType;

#[derive(Args)]
pub struct InstanceTypesArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct InstanceTypeRow {
    name: &'static str,
    vcpus: u32,
    memory_mib: u64,
}

pub async fn execute(args: InstanceTypesArgs) -> Result<()> {
    let rows: Vec<InstanceTypeRow> = InstanceType::all()
        .into_iter()
        .map(|t| InstanceTypeRow {
            name: t.as_str(),
            vcpus: t.vcpus(),
            memory_mib: t.memory_mib(),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{:<12} {:>5} {:>10}", "TYPE", "VCPUS", "MEMORY");
    for row in rows {
        println!("{:<12} {:>5} {:>7} MiB", row.name, row.vcpus, row.memory_mib);
    }

    Ok(())
}
