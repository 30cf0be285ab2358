//! The generation engine: validate, render, name.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use pgforge_iac::TerraformRenderer;
use pgforge_playbook::PlaybookRenderer;
use pgforge_spec::{GenerationRequest, RawGenerationRequest, RequestValidator};

use crate::clock::{Clock, SystemClock};
use crate::config::GeneratorConfig;
use crate::error::CoreResult;
use crate::naming::ArtifactNamer;

/// Rendered artifact contents, before naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifacts {
    pub infra_text: String,
    pub config_text: String,
}

/// Output of one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifactSet {
    pub infra_text: String,
    pub config_text: String,
    pub infra_filename: String,
    pub config_filename: String,
    pub generated_at: DateTime<Utc>,
    /// Non-fatal notes about the request, such as a `shared_buffers` value
    /// PostgreSQL will refuse to start with.
    pub advisories: Vec<String>,
}

/// Stateless generation engine.
///
/// Holds only immutable configuration, so one instance can serve any number
/// of concurrent calls.
#[derive(Clone)]
pub struct Generator {
    validator: RequestValidator,
    terraform: TerraformRenderer,
    playbook: PlaybookRenderer,
    namer: ArtifactNamer,
    clock: Arc<dyn Clock>,
}

impl Default for Generator {
    fn default() -> Self {
        Self {
            validator: RequestValidator::default(),
            terraform: TerraformRenderer::default(),
            playbook: PlaybookRenderer::default(),
            namer: ArtifactNamer::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("validator", &self.validator)
            .field("terraform", &self.terraform)
            .field("playbook", &self.playbook)
            .field("namer", &self.namer)
            .finish_non_exhaustive()
    }
}

impl Generator {
    /// Build a generator from configuration, checking every section.
    pub fn new(config: &GeneratorConfig) -> CoreResult<Self> {
        let generator = Self {
            validator: RequestValidator::new(config.limits)?,
            terraform: TerraformRenderer::new(config.infra.clone())?,
            playbook: PlaybookRenderer::new(config.playbook.clone())?,
            namer: ArtifactNamer::new(config.naming),
            clock: Arc::new(SystemClock),
        };
        config.check()?;
        Ok(generator)
    }

    /// Replace the clock used for artifact names.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn validator(&self) -> &RequestValidator {
        &self.validator
    }

    /// Validate a raw request without rendering anything.
    pub fn validate(&self, raw: &RawGenerationRequest) -> CoreResult<GenerationRequest> {
        Ok(self.validator.validate(raw)?)
    }

    /// Render both artifacts for a validated request.
    pub fn render(&self, request: &GenerationRequest) -> CoreResult<RenderedArtifacts> {
        let infra_text = self.terraform.render(request)?;
        let config_text = self.playbook.render(request)?;
        Ok(RenderedArtifacts {
            infra_text,
            config_text,
        })
    }

    /// Validate, render and name the artifacts for one request.
    pub fn generate(&self, raw: &RawGenerationRequest) -> CoreResult<GeneratedArtifactSet> {
        let request = self.validate(raw)?;

        info!(
            "Generating PostgreSQL {} cluster: {} x {} ({} replica(s))",
            request.postgres_version(),
            request.node_count(),
            request.instance_type(),
            request.num_replicas()
        );
        let advisories = self.validator.advisories(&request);
        for note in &advisories {
            warn!("{}", note);
        }

        let rendered = self.render(&request)?;

        let generated_at = self.clock.now();
        let names = self.namer.name_pair(generated_at);
        debug!("Artifact names: {} / {}", names.infra, names.config);

        Ok(GeneratedArtifactSet {
            infra_text: rendered.infra_text,
            config_text: rendered.config_text,
            infra_filename: names.infra,
            config_filename: names.config,
            generated_at,
            advisories,
        })
    }
}
