//! # pgforge_spec
//!
//! Generation request model and validation for pgforge.
//!
//! A caller hands in a [`RawGenerationRequest`] (every field optional, as
//! decoded from a payload). [`RequestValidator`] checks each field against its
//! format or bounds and either returns a typed [`GenerationRequest`] or a
//! [`SpecError::Validation`] listing one reason per offending field.
//!
//! ## Example
//!
//! ```rust
//! use pgforge_spec::{RawGenerationRequest, RequestValidator};
//!
//! let raw = RawGenerationRequest::new()
//!     .with_postgres_version("14.10")
//!     .with_instance_type("t2.micro")
//!     .with_num_replicas(2)
//!     .with_max_connections(100)
//!     .with_shared_buffers("256MB");
//!
//! let request = RequestValidator::default().validate(&raw).unwrap();
//! assert_eq!(request.node_count(), 3);
//! ```

pub mod error;
pub mod limits;
pub mod models;
pub mod network;
pub mod reader;
pub mod validator;

pub use error::{FieldError, SpecError, SpecResult, ValidationErrors, ValidationReason};
pub use limits::{ValidationLimits, REPLICA_CEILING};
pub use models::*;
pub use network::{Cidr, DEFAULT_CLUSTER_CIDR};
pub use reader::RequestReader;
pub use validator::RequestValidator;
