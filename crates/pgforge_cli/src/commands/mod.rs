//! CLI command definitions.
//!
//! Every subcommand that takes a request accepts the five fields as flags,
//! from a request file, or both (flags win).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;

use pgforge_core::GeneratorConfig;
use pgforge_spec::{RawGenerationRequest, RequestReader};

pub mod generate;
pub mod instance_types;
pub mod serve;
pub mod validate;

/// pgforge - PostgreSQL deployment generator
#[derive(Parser)]
#[command(name = "pgforge")]
#[command(version, about = "pgforge - Terraform and Ansible generator for PostgreSQL clusters")]
#[command(long_about = r#"
pgforge validates a small set of PostgreSQL deployment parameters and renders
a Terraform descriptor (main_<timestamp>.tf) and an Ansible playbook
(playbook_<timestamp>.yml) for a primary and its replicas.

COMMANDS:
  generate        → Validate a request and write both artifacts
  validate        → Validate a request without rendering
  instance-types  → List the supported EC2 instance types
  serve           → Run the HTTP front end (POST /generate)

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or configuration
  3 - Validation failure
  4 - Render error
  5 - I/O error or artifact collision
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Path to pgforge.toml
    #[arg(short, long, global = true, env = "PGFORGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a request and write the Terraform and Ansible files
    Generate(generate::GenerateArgs),

    /// Validate a request without rendering anything
    Validate(validate::ValidateArgs),

    /// List the supported instance types
    #[command(name = "instance-types")]
    InstanceTypes(instance_types::InstanceTypesArgs),

    /// Serve the generator over HTTP
    Serve(serve::ServeArgs),
}

/// The five request fields, shared by `generate` and `validate`.
#[derive(Args, Debug, Default)]
pub struct RequestArgs {
    /// YAML or JSON file holding the request
    #[arg(short, long)]
    pub request: Option<PathBuf>,

    /// PostgreSQL version, e.g. 14.10
    #[arg(long)]
    pub postgres_version: Option<String>,

    /// EC2 instance type, e.g. t2.micro
    #[arg(long)]
    pub instance_type: Option<String>,

    /// Number of read replicas
    #[arg(long, allow_negative_numbers = true)]
    pub num_replicas: Option<i64>,

    /// PostgreSQL max_connections
    #[arg(long, allow_negative_numbers = true)]
    pub max_connections: Option<i64>,

    /// PostgreSQL shared_buffers, e.g. 256MB
    #[arg(long)]
    pub shared_buffers: Option<String>,
}

impl RequestArgs {
    /// Merge the request file (if any) with the flags.
    pub fn to_raw(&self) -> Result<RawGenerationRequest> {
        let base = match &self.request {
            Some(path) => {
                debug!("Reading request from {:?}", path);
                RequestReader::read_file(path)?
            }
            None => RawGenerationRequest::default(),
        };

        let flags = RawGenerationRequest {
            postgres_version: self.postgres_version.clone(),
            instance_type: self.instance_type.clone(),
            num_replicas: self.num_replicas,
            max_connections: self.max_connections,
            shared_buffers: self.shared_buffers.clone(),
        };

        Ok(base.overlay(flags))
    }
}

/// Load `pgforge.toml` if one was given, defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<GeneratorConfig> {
    match path {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(GeneratorConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_negative_replicas_parse_as_a_value() {
        let cli = Cli::try_parse_from(["pgforge", "validate", "--num-replicas", "-1"]).unwrap();
        match cli.command {
            Commands::Validate(args) => assert_eq!(args.request.num_replicas, Some(-1)),
            _ => panic!("expected validate"),
        }
    }

    #[test]
    fn test_flags_override_request_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "postgres_version: \"13.4\"\ninstance_type: t3.small\nnum_replicas: 1\nmax_connections: 50\nshared_buffers: 128MB"
        )
        .unwrap();

        let args = RequestArgs {
            request: Some(file.path().to_path_buf()),
            num_replicas: Some(3),
            ..Default::default()
        };
        let raw = args.to_raw().unwrap();

        assert_eq!(raw.postgres_version.as_deref(), Some("13.4"));
        assert_eq!(raw.num_replicas, Some(3));
        assert_eq!(raw.shared_buffers.as_deref(), Some("128MB"));
    }

    #[test]
    fn test_default_config_without_path() {
        assert_eq!(load_config(None).unwrap(), GeneratorConfig::default());
    }
}
