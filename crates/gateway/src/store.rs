//! Gateway traits consumed by the editors, and their remote implementation.
//!
//! [`ContentStore`] covers collection records and flat section rows;
//! [`ImageHost`] covers binary uploads. [`RemoteGateway`] implements both on
//! top of [`RestApi`] and [`MediaApi`]. Every method is exactly one network
//! round-trip; nothing is cached.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use wasura_core::config::SiteConfig;
use wasura_core::error::CoreError;
use wasura_core::pagination::page_bounds;
use wasura_core::record::{Collection, Fields, Record};
use wasura_core::section::{SectionKey, SectionRow};
use wasura_core::types::RecordId;
use wasura_core::upload::ImageFile;

use crate::media::{MediaApi, ProgressFn, UploadedImage};
use crate::query::{id_filter, ListQuery};
use crate::rest::RestApi;

/// Backend table holding flat section content.
pub const SECTION_TABLE: &str = "site_contents";

/// Conflict target for section upserts.
const SECTION_CONFLICT: &str = "section_key,field_key";

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

/// Records returned by [`ContentStore::list`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPage {
    pub records: Vec<Record>,
    /// Backend total, present when a page was requested.
    pub total: Option<u64>,
}

/// Record and section persistence.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// List a collection in its default order, optionally one page of it.
    async fn list(
        &self,
        collection: Collection,
        page: Option<PageRequest>,
    ) -> Result<RecordPage, CoreError>;

    async fn get_by_id(&self, collection: Collection, id: &RecordId) -> Result<Record, CoreError>;

    /// Insert a record. The caller assigns `sort_order` beforehand.
    async fn create(&self, collection: Collection, fields: Fields) -> Result<Record, CoreError>;

    /// Patch a record. `NotFound` when the id no longer exists.
    async fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        fields: Fields,
    ) -> Result<Record, CoreError>;

    /// Delete a record. Deleting an absent id is `NotFound`.
    async fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), CoreError>;

    async fn list_section(&self, section: SectionKey) -> Result<Vec<SectionRow>, CoreError>;

    /// Write every given field of `section`, merging on
    /// `(section_key, field_key)`.
    async fn upsert_section(
        &self,
        section: SectionKey,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), CoreError>;
}

/// Binary image uploads.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Validate locally, then upload, reporting progress as the body streams.
    async fn upload_image(
        &self,
        file: ImageFile,
        on_progress: Option<ProgressFn>,
    ) -> Result<UploadedImage, CoreError>;
}

// ---------------------------------------------------------------------------
// Remote implementation
// ---------------------------------------------------------------------------

/// [`ContentStore`] + [`ImageHost`] backed by the hosted services.
pub struct RemoteGateway {
    rest: RestApi,
    media: MediaApi,
}

impl RemoteGateway {
    pub fn new(rest: RestApi, media: MediaApi) -> Self {
        Self { rest, media }
    }

    /// Build both clients from configuration, sharing one connection pool
    /// with the configured per-request timeout.
    pub fn from_config(config: &SiteConfig) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| CoreError::Config(format!("Failed to build HTTP client: {e}")))?;

        let rest = RestApi::with_client(client.clone(), &config.rest_url, config.anon_key.clone());
        let media = MediaApi::with_client(
            client,
            &config.media_base_url,
            &config.cloud_name,
            config.upload_preset.clone(),
            config.upload_folder.clone(),
            config.image_rules(),
        );
        Ok(Self::new(rest, media))
    }
}

fn logged(operation: &'static str, table: &str, err: impl Into<CoreError>) -> CoreError {
    let err = err.into();
    tracing::error!(operation, table, error = %err, "Remote call failed");
    err
}

fn single_row(
    rows: Vec<Record>,
    entity: &'static str,
    id: &RecordId,
) -> Result<Record, CoreError> {
    rows.into_iter().next().ok_or_else(|| CoreError::NotFound {
        entity,
        id: id.clone(),
    })
}

#[async_trait]
impl ContentStore for RemoteGateway {
    async fn list(
        &self,
        collection: Collection,
        page: Option<PageRequest>,
    ) -> Result<RecordPage, CoreError> {
        let table = collection.table();
        let mut query = ListQuery::for_collection(collection);
        if let Some(PageRequest { page, page_size }) = page {
            let (offset, limit) = page_bounds(page, page_size);
            query = query.window(offset, limit);
        }

        let rows = self
            .rest
            .select::<Record>(table, &query)
            .await
            .map_err(|e| logged("list", table, e))?;
        Ok(RecordPage {
            records: rows.rows,
            total: rows.total,
        })
    }

    async fn get_by_id(&self, collection: Collection, id: &RecordId) -> Result<Record, CoreError> {
        let table = collection.table();
        let query = ListQuery::new().eq("id", id);
        let rows = self
            .rest
            .select::<Record>(table, &query)
            .await
            .map_err(|e| logged("get_by_id", table, e))?;
        single_row(rows.rows, table, id)
    }

    async fn create(&self, collection: Collection, fields: Fields) -> Result<Record, CoreError> {
        let table = collection.table();
        let rows = self
            .rest
            .insert::<Record>(table, &Value::Object(fields))
            .await
            .map_err(|e| logged("create", table, e))?;

        let record = rows.into_iter().next().ok_or_else(|| CoreError::Transport {
            status: None,
            message: format!("Insert into {table} returned no row"),
            detail: None,
        })?;
        tracing::info!(collection = table, id = %record.id, "Record created");
        Ok(record)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        fields: Fields,
    ) -> Result<Record, CoreError> {
        let table = collection.table();
        let rows = self
            .rest
            .update::<Record>(table, &id_filter(id.as_str()), &Value::Object(fields))
            .await
            .map_err(|e| logged("update", table, e))?;

        let record = single_row(rows, table, id)?;
        tracing::info!(collection = table, id = %id, "Record updated");
        Ok(record)
    }

    async fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), CoreError> {
        let table = collection.table();
        let rows = self
            .rest
            .delete::<Value>(table, &id_filter(id.as_str()))
            .await
            .map_err(|e| logged("delete", table, e))?;

        if rows.is_empty() {
            return Err(CoreError::NotFound {
                entity: table,
                id: id.clone(),
            });
        }
        tracing::info!(collection = table, id = %id, "Record deleted");
        Ok(())
    }

    async fn list_section(&self, section: SectionKey) -> Result<Vec<SectionRow>, CoreError> {
        let query = ListQuery::new().eq("section_key", section.name());
        let rows = self
            .rest
            .select::<SectionRow>(SECTION_TABLE, &query)
            .await
            .map_err(|e| logged("list_section", SECTION_TABLE, e))?;
        Ok(rows.rows)
    }

    async fn upsert_section(
        &self,
        section: SectionKey,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), CoreError> {
        let body = section_rows(section, fields);
        self.rest
            .upsert::<Value>(SECTION_TABLE, SECTION_CONFLICT, &body)
            .await
            .map_err(|e| logged("upsert_section", SECTION_TABLE, e))?;

        tracing::info!(section = section.name(), fields = fields.len(), "Section saved");
        Ok(())
    }
}

/// One `site_contents` row per field.
fn section_rows(section: SectionKey, fields: &BTreeMap<String, String>) -> Value {
    Value::Array(
        fields
            .iter()
            .map(|(key, value)| {
                json!({
                    "section_key": section.name(),
                    "field_key": key,
                    "field_value": value,
                })
            })
            .collect(),
    )
}

#[async_trait]
impl ImageHost for RemoteGateway {
    async fn upload_image(
        &self,
        file: ImageFile,
        on_progress: Option<ProgressFn>,
    ) -> Result<UploadedImage, CoreError> {
        self.media
            .upload(file, on_progress)
            .await
            .map_err(CoreError::from)
    }
}
