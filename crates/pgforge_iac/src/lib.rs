//! # pgforge_iac
//!
//! Terraform rendering for pgforge PostgreSQL clusters.
//!
//! [`TerraformRenderer`] turns a validated request into a self-contained
//! `main.tf`: provider pinning, a `deployment_name` variable so several
//! generations can be applied side by side, one `aws_instance` for the
//! primary and one per replica, and outputs for the node addresses.
//!
//! Every interpolated value is quoted with [`hcl::quote`], and the rendered
//! text is checked with [`hcl::check_structure`] before it is returned.
//!
//! ## Example
//!
//! ```rust
//! use pgforge_iac::{InfraSettings, TerraformRenderer};
//! use pgforge_spec::{RawGenerationRequest, RequestValidator};
//!
//! let raw = RawGenerationRequest::new()
//!     .with_postgres_version("14.10")
//!     .with_instance_type("t3.small")
//!     .with_num_replicas(1)
//!     .with_max_connections(200)
//!     .with_shared_buffers("512MB");
//! let request = RequestValidator::default().validate(&raw).unwrap();
//!
//! let renderer = TerraformRenderer::new(InfraSettings::default().with_region("eu-west-1")).unwrap();
//! let main_tf = renderer.render(&request).unwrap();
//! assert!(main_tf.contains("resource \"aws_instance\" \"replica_1\""));
//! ```

pub mod error;
pub mod hcl;
pub mod provider;
pub mod terraform;

pub use error::{IacError, IacResult};
pub use provider::InfraSettings;
pub use terraform::TerraformRenderer;
