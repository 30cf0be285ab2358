//! # pgforge_core
//!
//! Generation engine for pgforge.
//!
//! Ties the request validator, the Terraform renderer and the playbook
//! renderer together, then names the two artifacts from a single reading of
//! the clock.
//!
//! # Architecture
//!
//! - **Config**: `pgforge.toml` sections for limits, infra, playbook and naming
//! - **Generator**: validate, render, name; holds no mutable state
//! - **Clock**: injectable time source so names are reproducible in tests
//!
//! # Example
//!
//! ```rust,ignore
//! use pgforge_core::{Generator, GeneratorConfig};
//! use pgforge_spec::RawGenerationRequest;
//!
//! let generator = Generator::new(&GeneratorConfig::default())?;
//! let raw = RawGenerationRequest::new()
//!     .with_postgres_version("14.10")
//!     .with_instance_type("t2.micro")
//!     .with_num_replicas(2)
//!     .with_max_connections(100)
//!     .with_shared_buffers("256MB");
//!
//! let set = generator.generate(&raw)?;
//! println!("{} / {}", set.infra_filename, set.config_filename);
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod generator;
pub mod naming;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::GeneratorConfig;
pub use error::{CoreError, CoreResult};
pub use generator::{GeneratedArtifactSet, Generator, RenderedArtifacts};
pub use naming::{ArtifactKind, ArtifactNamer, ArtifactNames, NamingSettings, TIMESTAMP_FORMAT};
