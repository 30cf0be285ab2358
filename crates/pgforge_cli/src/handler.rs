//! Request handling: generate, persist, summarize.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use pgforge_core::Generator;
use pgforge_spec::RawGenerationRequest;

use crate::error::HandlerResult;
use crate::store::ArtifactStore;

pub const SUCCESS_MESSAGE: &str = "Terraform and Ansible files generated successfully.";

/// What a caller gets back after a successful generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationSummary {
    pub message: String,
    pub infra_filename: String,
    pub config_filename: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Shared by the CLI and the HTTP server.
#[derive(Clone)]
pub struct GenerationHandler {
    generator: Arc<Generator>,
    store: Arc<dyn ArtifactStore>,
}

impl GenerationHandler {
    pub fn new(generator: Arc<Generator>, store: Arc<dyn ArtifactStore>) -> Self {
        Self { generator, store }
    }

    /// Generate both artifacts and write them to the store.
    ///
    /// Either both files are written or neither is: if the playbook cannot
    /// be written the Terraform file is removed again.
    pub async fn handle(&self, raw: &RawGenerationRequest) -> HandlerResult<GenerationSummary> {
        let set = self.generator.generate(raw)?;

        let infra_path = self.store.write_new(&set.infra_filename, &set.infra_text).await?;
        let config_path = match self
            .store
            .write_new(&set.config_filename, &set.config_text)
            .await
        {
            Ok(path) => path,
            Err(e) => {
                if let Err(cleanup) = self.store.remove(&set.infra_filename).await {
                    warn!("Could not remove {:?}: {}", infra_path, cleanup);
                }
                return Err(e);
            }
        };

        info!("Generated {:?} and {:?}", infra_path, config_path);
        Ok(GenerationSummary {
            message: SUCCESS_MESSAGE.to_string(),
            infra_filename: set.infra_filename,
            config_filename: set.config_filename,
            warnings: set.advisories,
        })
    }
}

/// Paths of both artifacts under an output directory.
pub fn artifact_paths(root: &std::path::Path, summary: &GenerationSummary) -> (PathBuf, PathBuf) {
    (
        root.join(&summary.infra_filename),
        root.join(&summary.config_filename),
    )
}
