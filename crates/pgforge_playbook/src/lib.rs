//! # pgforge_playbook
//!
//! Ansible playbook rendering for pgforge PostgreSQL clusters.
//!
//! [`PlaybookRenderer`] turns a validated request into a playbook with one
//! play for the primary (`postgres_primary`) and one identically structured
//! play per replica (`postgres_replica_<i>`). Each play installs the requested
//! PostgreSQL release from the PGDG apt repository, writes `max_connections`
//! and `shared_buffers` into postgresql.conf and starts the service. With
//! [`ReplicationMode::Streaming`] the replicas are cloned from the primary with
//! `pg_basebackup -R` and follow it as hot standbys.
//!
//! Plays are built as typed values and emitted with `serde_yaml`, so no
//! request value is ever spliced into YAML text.
//!
//! ## Example
//!
//! ```rust
//! use pgforge_playbook::{PlaybookRenderer, PlaybookSettings, ReplicationMode};
//! use pgforge_spec::{RawGenerationRequest, RequestValidator};
//!
//! let raw = RawGenerationRequest::new()
//!     .with_postgres_version("16.2")
//!     .with_instance_type("m5.large")
//!     .with_num_replicas(2)
//!     .with_max_connections(300)
//!     .with_shared_buffers("2GB");
//! let request = RequestValidator::default().validate(&raw).unwrap();
//!
//! let settings = PlaybookSettings::default().with_replication(ReplicationMode::Standalone);
//! let playbook = PlaybookRenderer::new(settings).unwrap().render(&request).unwrap();
//! assert!(playbook.contains("postgres_replica_2"));
//! ```

pub mod error;
pub mod renderer;
pub mod settings;
pub mod task;

pub use error::{PlaybookError, PlaybookResult};
pub use renderer::{PlaybookRenderer, PRIMARY_GROUP, REPLICA_GROUP_PREFIX};
pub use settings::{PlaybookSettings, ReplicationMode};
pub use task::{Play, Task};
