use crate::classifier::{ClassificationService, ClassifyError, LlmClassifier};
use crate::config::AppConfig;
use crate::extractor::{self, ExtractionError};
use crate::models::{FurnitureRecord, Upload};
use crate::search::{self, SearchError};
use crate::uploads::{self, ImageStore, UploadError};
use anyhow::Context;
use providers::noop::NoopProvider;
use providers::openai::{OpenAiConfig, OpenAiProvider};
use providers::ProviderRegistry;
use serde::Serialize;
use std::sync::Arc;
use storage::Catalog;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error("could not parse classification: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("catalog write failed: {0}")]
    Store(#[from] sqlx::Error),
}

impl IngestError {
    /// Store failures end the whole batch; everything else only fails its item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IngestError::Store(_))
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            IngestError::Upload(_) => FailureKind::Upload,
            IngestError::Classify(_) => FailureKind::Service,
            IngestError::Extraction(_) => FailureKind::Extraction,
            IngestError::Store(_) => FailureKind::Store,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Upload,
    Service,
    Extraction,
    Store,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    Stored { record: FurnitureRecord },
    Failed { kind: FailureKind, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestItem {
    pub filename: String,
    #[serde(flatten)]
    pub outcome: IngestOutcome,
}

/// Per-file results of one upload batch, in upload order. Files rejected by
/// the extension allow-list do not appear.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub items: Vec<IngestItem>,
}

impl BatchReport {
    pub fn stored(&self) -> impl Iterator<Item = &FurnitureRecord> {
        self.items.iter().filter_map(|item| match &item.outcome {
            IngestOutcome::Stored { record } => Some(record),
            IngestOutcome::Failed { .. } => None,
        })
    }

    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|item| matches!(item.outcome, IngestOutcome::Failed { .. }))
            .count()
    }
}

/// Coordinates image storage, classification, extraction and the catalog
/// for the upload and search flows.
pub struct Album {
    catalog: Catalog,
    images: ImageStore,
    classifier: Arc<dyn ClassificationService>,
    allowed_extensions: Vec<String>,
}

impl Album {
    pub fn new(
        catalog: Catalog,
        images: ImageStore,
        classifier: Arc<dyn ClassificationService>,
        allowed_extensions: Vec<String>,
    ) -> Self {
        Self {
            catalog,
            images,
            classifier,
            allowed_extensions,
        }
    }

    pub async fn open(config: &AppConfig) -> anyhow::Result<Self> {
        let catalog = Catalog::open(&config.database.path)
            .await
            .context("db open")?;
        let registry = build_registry(config);
        let classifier = match LlmClassifier::from_config(&registry, &config.classification) {
            Ok(classifier) => classifier,
            Err(e) => {
                warn!(
                    provider = %config.classification.provider,
                    error = %e,
                    "classification provider unavailable; uploads and searches will fail"
                );
                LlmClassifier::new(Arc::new(NoopProvider))
            }
        };
        Ok(Self::new(
            catalog,
            ImageStore::new(&config.uploads.dir),
            Arc::new(classifier),
            config.uploads.allowed_extensions.clone(),
        ))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    /// Stores one image, classifies it and records the result.
    ///
    /// Nothing is kept when any step fails: the saved image is removed again
    /// so no file is left without a record.
    pub async fn ingest(&self, bytes: &[u8], filename: &str) -> Result<FurnitureRecord, IngestError> {
        let stored = self.images.save(filename, bytes).await?;
        match self.classify_and_insert(bytes, &stored).await {
            Ok(record) => Ok(record),
            Err(e) => {
                self.images.discard(&stored).await;
                Err(e)
            }
        }
    }

    async fn classify_and_insert(
        &self,
        bytes: &[u8],
        stored: &str,
    ) -> Result<FurnitureRecord, IngestError> {
        let mime = uploads::guess_mime(bytes, stored);
        let raw = self.classifier.classify_image(bytes, &mime).await?;
        let triple = extractor::extract_for_ingestion(&raw).map_err(|e| {
            warn!(image = stored, response = %raw, "failed to parse model response");
            e
        })?;
        Ok(self.catalog.insert(&triple, stored).await?)
    }

    /// Processes a batch strictly in order. Disallowed files are skipped
    /// silently; a failing file does not stop the rest, except for catalog
    /// write failures which abort the batch.
    pub async fn ingest_batch(&self, files: Vec<Upload>) -> Result<BatchReport, IngestError> {
        let mut report = BatchReport::default();
        for upload in files {
            if !uploads::allowed_file(&upload.filename, &self.allowed_extensions) {
                debug!(filename = %upload.filename, "skipping file with disallowed extension");
                continue;
            }
            if uploads::secure_filename(&upload.filename).is_none() {
                debug!(filename = %upload.filename, "skipping file with unusable name");
                continue;
            }
            let outcome = match self.ingest(&upload.bytes, &upload.filename).await {
                Ok(record) => IngestOutcome::Stored { record },
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(filename = %upload.filename, error = %e, "ingestion failed");
                    IngestOutcome::Failed {
                        kind: e.kind(),
                        error: e.to_string(),
                    }
                }
            };
            report.items.push(IngestItem {
                filename: upload.filename,
                outcome,
            });
        }
        info!(
            stored = report.stored().count(),
            failed = report.failed(),
            "upload batch processed"
        );
        Ok(report)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<FurnitureRecord>, SearchError> {
        let query = search::normalize_query(query)?;
        let raw = self.classifier.classify_query(query).await?;
        let filter = search::filter_from_reply(raw.trim());
        info!(?filter, "search parameters");
        Ok(self.catalog.query(&filter).await?)
    }

    pub async fn list(&self) -> Result<Vec<FurnitureRecord>, sqlx::Error> {
        self.catalog.list_all().await
    }

    pub async fn clear(&self) -> Result<u64, sqlx::Error> {
        self.catalog.clear_all().await
    }
}

pub fn build_registry(config: &AppConfig) -> ProviderRegistry {
    let mut reg = ProviderRegistry::new().with_llm("noop", Arc::new(NoopProvider));

    if let Some(key) = std::env::var_os("OPENAI_API_KEY") {
        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| config.classification.base_url.clone());
        let provider = OpenAiProvider::new(OpenAiConfig {
            api_key: key.to_string_lossy().into_owned(),
            base_url,
            chat_model: config.classification.model.clone(),
        });
        reg = reg.with_llm("openai", Arc::new(provider));
    }

    reg.set_preferred_llm(&config.classification.provider)
}
