//! Create/edit form for one collection record.
//!
//! Holds a draft field map plus, for collections that store images, an
//! upload session. Saving validates the draft, refuses while an image is
//! still uploading, folds the uploaded URLs into the collection's image
//! column and hands off to the [`CollectionEditor`].

use std::sync::Arc;

use serde_json::Value;
use wasura_core::error::CoreError;
use wasura_core::record::{Fields, ImageField, Record, SORT_ORDER_FIELD};
use wasura_core::types::RecordId;
use wasura_core::upload::ImageRules;
use wasura_gateway::ImageHost;

use crate::collection::CollectionEditor;
use crate::notice::{Notice, NoticeBus};
use crate::section_form::UPLOAD_PENDING_MESSAGE;
use crate::upload::UploadSession;

/// Columns the backend maintains itself.
const SERVER_MANAGED: &[&str] = &["created_at", "updated_at"];

pub struct RecordForm {
    editor: Arc<CollectionEditor>,
    notices: Arc<NoticeBus>,
    target: Option<RecordId>,
    fields: Fields,
    images: Option<UploadSession>,
}

impl RecordForm {
    /// Empty form for a new record.
    pub fn create(
        editor: Arc<CollectionEditor>,
        host: Arc<dyn ImageHost>,
        rules: ImageRules,
        notices: Arc<NoticeBus>,
    ) -> Self {
        let images = image_session(&editor, host, rules, &notices);
        Self {
            editor,
            notices,
            target: None,
            fields: Fields::new(),
            images,
        }
    }

    /// Form pre-filled from an existing record.
    pub fn edit(
        editor: Arc<CollectionEditor>,
        record: &Record,
        host: Arc<dyn ImageHost>,
        rules: ImageRules,
        notices: Arc<NoticeBus>,
    ) -> Self {
        let images = image_session(&editor, host, rules, &notices);
        if let Some(session) = &images {
            match editor.collection().image_field() {
                ImageField::Many(_) => session.seed(record.images.iter().cloned()),
                ImageField::Single(key) => session.seed([record.text(key)]),
                ImageField::None => {}
            }
        }

        let fields = record
            .fields
            .iter()
            .filter(|(key, _)| !SERVER_MANAGED.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            editor,
            notices,
            target: Some(record.id.clone()),
            fields,
            images,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.target.is_some()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn set_field(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn images(&self) -> Option<&UploadSession> {
        self.images.as_ref()
    }

    /// Persist the draft. Nothing is written while validation fails or an
    /// upload is pending.
    pub async fn save(&self) -> Result<Record, CoreError> {
        let collection = self.editor.collection();

        if let Some(session) = &self.images {
            if !session.is_ready_to_submit() {
                self.notices.publish(Notice::info(UPLOAD_PENDING_MESSAGE));
                return Err(CoreError::Validation(UPLOAD_PENDING_MESSAGE.into()));
            }
        }

        let mut fields = self.fields.clone();
        fields.remove(SORT_ORDER_FIELD);
        collection
            .validate_required(&fields)
            .map_err(|e| self.notices.fail("Cannot save", e))?;

        if let Some(session) = &self.images {
            let urls = session.to_persistable_list();
            match collection.image_field() {
                ImageField::Many(key) => {
                    fields.insert(
                        key.to_string(),
                        Value::Array(urls.into_iter().map(Value::String).collect()),
                    );
                }
                ImageField::Single(key) => {
                    let url = urls.into_iter().next().map_or(Value::Null, Value::String);
                    fields.insert(key.to_string(), url);
                }
                ImageField::None => {}
            }
        }

        match &self.target {
            Some(id) => self.editor.update(id, fields).await,
            None => self.editor.create(fields).await,
        }
    }
}

fn image_session(
    editor: &CollectionEditor,
    host: Arc<dyn ImageHost>,
    rules: ImageRules,
    notices: &Arc<NoticeBus>,
) -> Option<UploadSession> {
    match editor.collection().image_field() {
        ImageField::Many(_) => Some(UploadSession::new(host, rules, Arc::clone(notices))),
        ImageField::Single(_) => Some(UploadSession::single(host, rules, Arc::clone(notices))),
        ImageField::None => None,
    }
}
