//! In-memory gateway fakes shared by the editor integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use wasura_core::error::CoreError;
use wasura_core::record::{Collection, Fields, Record};
use wasura_core::section::{SectionKey, SectionRow};
use wasura_core::session::{AdminContext, AdminSession};
use wasura_core::types::RecordId;
use wasura_core::upload::{ImageFile, ImageRules};
use wasura_editor::collection::CollectionEditor;
use wasura_editor::notice::{Notice, NoticeBus};
use wasura_gateway::{ContentStore, ImageHost, PageRequest, ProgressFn, RecordPage, UploadedImage};

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn admin() -> AdminContext {
    let mut session = AdminSession::default();
    session.sign_in(chrono::Utc::now());
    session.require().unwrap()
}

pub fn png(name: &str) -> ImageFile {
    ImageFile::new(name, "image/png", PNG_BYTES.to_vec())
}

pub fn fields(pairs: &[(&str, Value)]) -> Fields {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

pub fn card(id: i64, sort_order: i64) -> Record {
    Record::new(id)
        .with_sort_order(sort_order)
        .with_field("title", format!("card {id}"))
}

pub fn ids(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.id.to_string()).collect()
}

pub fn editor(collection: Collection, store: &Arc<FakeStore>) -> (CollectionEditor, Arc<NoticeBus>) {
    let notices = Arc::new(NoticeBus::default());
    let editor = CollectionEditor::new(
        collection,
        Arc::clone(store) as Arc<dyn ContentStore>,
        Arc::clone(&notices),
        admin(),
    );
    (editor, notices)
}

/// Drain every notice published so far.
pub fn drain(rx: &mut tokio::sync::broadcast::Receiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        out.push(notice);
    }
    out
}

fn server_error(what: &str) -> CoreError {
    CoreError::Transport {
        status: Some(500),
        message: format!("{what} failed"),
        detail: None,
    }
}

// ---------------------------------------------------------------------------
// FakeStore
// ---------------------------------------------------------------------------

/// A call observed by [`FakeStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(Collection),
    Get(Collection, RecordId),
    Create(Collection, Fields),
    Update(Collection, RecordId, Fields),
    Delete(Collection, RecordId),
    ListSection(SectionKey),
    UpsertSection(SectionKey, BTreeMap<String, String>),
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Call::Create(..) | Call::Update(..) | Call::Delete(..) | Call::UpsertSection(..)
        )
    }
}

#[derive(Default)]
pub struct FakeStore {
    records: Mutex<HashMap<Collection, Vec<Record>>>,
    sections: Mutex<Vec<SectionRow>>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI64,
    failing_updates: Mutex<HashSet<RecordId>>,
    failing_lists: Mutex<HashSet<Collection>>,
    failing_sections: Mutex<HashSet<SectionKey>>,
    /// Scripted `list` responses: delay, then these rows.
    scripted_lists: Mutex<VecDeque<(Duration, Vec<Record>)>>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicI64::new(100),
            ..Self::default()
        })
    }

    pub fn seed(&self, collection: Collection, records: Vec<Record>) {
        self.records.lock().unwrap().insert(collection, records);
    }

    pub fn seed_section(&self, section: SectionKey, pairs: &[(&str, &str)]) {
        let mut rows = self.sections.lock().unwrap();
        for (key, value) in pairs {
            rows.push(SectionRow {
                section_key: section.name().to_string(),
                field_key: key.to_string(),
                field_value: Some(value.to_string()),
            });
        }
    }

    pub fn fail_update_of(&self, id: impl Into<RecordId>) {
        self.failing_updates.lock().unwrap().insert(id.into());
    }

    pub fn fail_list_of(&self, collection: Collection) {
        self.failing_lists.lock().unwrap().insert(collection);
    }

    pub fn fail_section(&self, section: SectionKey) {
        self.failing_sections.lock().unwrap().insert(section);
    }

    pub fn script_list(&self, delay: Duration, records: Vec<Record>) {
        self.scripted_lists
            .lock()
            .unwrap()
            .push_back((delay, records));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn stored(&self, collection: Collection) -> Vec<Record> {
        self.records
            .lock()
            .unwrap()
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn section_value(&self, section: SectionKey, key: &str) -> Option<String> {
        self.sections
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.section_key == section.name() && r.field_key == key)
            .and_then(|r| r.field_value.clone())
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn ordered(&self, collection: Collection) -> Vec<Record> {
        let mut records = self.stored(collection);
        if collection.is_manually_ordered() {
            records.sort_by_key(|r| {
                (
                    r.sort_order.unwrap_or(i64::MAX),
                    r.id.as_str().parse::<i64>().unwrap_or(i64::MAX),
                )
            });
        } else {
            records.sort_by(|a, b| b.text("date").cmp(a.text("date")));
        }
        records
    }
}

fn merged(record: &Record, patch: Fields) -> Record {
    let mut value = serde_json::to_value(record).unwrap();
    let map = value.as_object_mut().unwrap();
    map.extend(patch);
    serde_json::from_value(value).unwrap()
}

#[async_trait]
impl ContentStore for FakeStore {
    async fn list(
        &self,
        collection: Collection,
        page: Option<PageRequest>,
    ) -> Result<RecordPage, CoreError> {
        self.record(Call::List(collection));

        let scripted = self.scripted_lists.lock().unwrap().pop_front();
        if let Some((delay, records)) = scripted {
            tokio::time::sleep(delay).await;
            return Ok(RecordPage {
                records,
                total: None,
            });
        }

        if self.failing_lists.lock().unwrap().contains(&collection) {
            return Err(server_error("list"));
        }

        let all = self.ordered(collection);
        match page {
            None => Ok(RecordPage {
                records: all,
                total: None,
            }),
            Some(PageRequest { page, page_size }) => {
                let total = all.len() as u64;
                let offset = ((page.max(1) - 1) * page_size) as usize;
                let records = all
                    .into_iter()
                    .skip(offset)
                    .take(page_size as usize)
                    .collect();
                Ok(RecordPage {
                    records,
                    total: Some(total),
                })
            }
        }
    }

    async fn get_by_id(&self, collection: Collection, id: &RecordId) -> Result<Record, CoreError> {
        self.record(Call::Get(collection, id.clone()));
        self.stored(collection)
            .into_iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| CoreError::NotFound {
                entity: collection.table(),
                id: id.clone(),
            })
    }

    async fn create(&self, collection: Collection, fields: Fields) -> Result<Record, CoreError> {
        self.record(Call::Create(collection, fields.clone()));
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = merged(&Record::new(id), fields);
        self.records
            .lock()
            .unwrap()
            .entry(collection)
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        collection: Collection,
        id: &RecordId,
        fields: Fields,
    ) -> Result<Record, CoreError> {
        self.record(Call::Update(collection, id.clone(), fields.clone()));
        tokio::task::yield_now().await;

        if self.failing_updates.lock().unwrap().contains(id) {
            return Err(server_error("update"));
        }

        let mut all = self.records.lock().unwrap();
        let records = all.entry(collection).or_default();
        let Some(slot) = records.iter_mut().find(|r| &r.id == id) else {
            return Err(CoreError::NotFound {
                entity: collection.table(),
                id: id.clone(),
            });
        };
        *slot = merged(slot, fields);
        Ok(slot.clone())
    }

    async fn delete(&self, collection: Collection, id: &RecordId) -> Result<(), CoreError> {
        self.record(Call::Delete(collection, id.clone()));
        let mut all = self.records.lock().unwrap();
        let records = all.entry(collection).or_default();
        let before = records.len();
        records.retain(|r| &r.id != id);
        if records.len() == before {
            return Err(CoreError::NotFound {
                entity: collection.table(),
                id: id.clone(),
            });
        }
        Ok(())
    }

    async fn list_section(&self, section: SectionKey) -> Result<Vec<SectionRow>, CoreError> {
        self.record(Call::ListSection(section));
        if self.failing_sections.lock().unwrap().contains(&section) {
            return Err(server_error("list_section"));
        }
        Ok(self
            .sections
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.section_key == section.name())
            .cloned()
            .collect())
    }

    async fn upsert_section(
        &self,
        section: SectionKey,
        fields: &BTreeMap<String, String>,
    ) -> Result<(), CoreError> {
        self.record(Call::UpsertSection(section, fields.clone()));
        let mut rows = self.sections.lock().unwrap();
        for (key, value) in fields {
            rows.retain(|r| !(r.section_key == section.name() && &r.field_key == key));
            rows.push(SectionRow {
                section_key: section.name().to_string(),
                field_key: key.clone(),
                field_value: Some(value.clone()),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeHost
// ---------------------------------------------------------------------------

/// Scripted image host. Each file name may be given a delay and a failure;
/// otherwise uploads succeed immediately.
#[derive(Default)]
pub struct FakeHost {
    delays: Mutex<HashMap<String, Duration>>,
    failures: Mutex<HashSet<String>>,
    uploaded: Mutex<Vec<String>>,
    progress: Mutex<Vec<(String, u8)>>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn delay(&self, name: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(name.to_string(), delay);
    }

    pub fn fail(&self, name: &str) {
        self.failures.lock().unwrap().insert(name.to_string());
    }

    /// Names of every file handed to `upload_image`, in call order.
    pub fn uploads(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn progress_for(&self, name: &str) -> Vec<u8> {
        self.progress
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, p)| *p)
            .collect()
    }

    pub fn url_for(name: &str) -> String {
        format!("https://res.cloudinary.com/club/image/upload/v1/reports/{name}")
    }

    pub fn rules() -> ImageRules {
        ImageRules::default()
    }
}

#[async_trait]
impl ImageHost for FakeHost {
    async fn upload_image(
        &self,
        file: ImageFile,
        on_progress: Option<ProgressFn>,
    ) -> Result<UploadedImage, CoreError> {
        self.uploaded.lock().unwrap().push(file.name.clone());
        let delay = self.delays.lock().unwrap().get(&file.name).copied();

        let report = |pct: u8| {
            self.progress.lock().unwrap().push((file.name.clone(), pct));
            if let Some(cb) = &on_progress {
                cb(pct);
            }
        };

        report(50);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failures.lock().unwrap().contains(&file.name) {
            return Err(CoreError::Transport {
                status: Some(400),
                message: "Upload failed: Invalid image file".into(),
                detail: Some(serde_json::json!({"error": {"message": "Invalid image file"}})),
            });
        }

        report(100);
        Ok(UploadedImage {
            url: Self::url_for(&file.name),
            public_id: format!("reports/{}", file.name),
        })
    }
}
