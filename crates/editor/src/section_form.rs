//! Section Form Controller.
//!
//! Loads one flat section (hero, about, contact) into a complete field map
//! and saves it back as a full upsert. Sections with an image field get a
//! single-slot [`UploadSession`]; saving is refused while it is uploading.

use std::collections::BTreeMap;
use std::sync::Arc;

use wasura_core::error::CoreError;
use wasura_core::section::{validate_submission, SectionContent, SectionKey};
use wasura_core::session::AdminContext;
use wasura_core::upload::ImageRules;
use wasura_gateway::{ContentStore, ImageHost};

use crate::notice::{Notice, NoticeBus};
use crate::upload::UploadSession;

pub const UPLOAD_PENDING_MESSAGE: &str = "Please wait for the image upload to finish";

pub struct SectionForm {
    section: SectionKey,
    store: Arc<dyn ContentStore>,
    notices: Arc<NoticeBus>,
    context: AdminContext,
    image: Option<UploadSession>,
}

impl std::fmt::Debug for SectionForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionForm")
            .field("section", &self.section)
            .field("context", &self.context)
            .field("has_image", &self.image.is_some())
            .finish_non_exhaustive()
    }
}

impl SectionForm {
    /// Build a form for a flat section. Collection-backed sections are
    /// rejected.
    pub fn new(
        section: SectionKey,
        store: Arc<dyn ContentStore>,
        host: Arc<dyn ImageHost>,
        rules: ImageRules,
        notices: Arc<NoticeBus>,
        context: AdminContext,
    ) -> Result<Self, CoreError> {
        if !section.is_flat() {
            return Err(CoreError::Validation(format!(
                "Section '{}' has no form fields",
                section.name()
            )));
        }

        let image = section
            .image_field()
            .map(|_| UploadSession::single(host, rules, Arc::clone(&notices)));

        Ok(Self {
            section,
            store,
            notices,
            context,
            image,
        })
    }

    pub fn section(&self) -> SectionKey {
        self.section
    }

    pub fn context(&self) -> &AdminContext {
        &self.context
    }

    /// Upload slot for the section image, if the section has one.
    pub fn image_upload(&self) -> Option<&UploadSession> {
        self.image.as_ref()
    }

    /// Fetch the stored values. Every declared field is present in the
    /// result; the image slot is seeded with the stored URL.
    pub async fn load(&self) -> Result<SectionContent, CoreError> {
        let rows = self
            .store
            .list_section(self.section)
            .await
            .map_err(|e| self.notices.fail("Failed to load", e))?;

        let content = SectionContent::from_rows(self.section, &rows);
        if let (Some(session), Some(field)) = (&self.image, self.section.image_field()) {
            session.seed([content.get(field)]);
        }

        tracing::debug!(section = self.section.name(), rows = rows.len(), "Section loaded");
        Ok(content)
    }

    /// Upsert the complete field set.
    ///
    /// The image field, when present, is taken from the upload slot.
    pub async fn save(
        &self,
        mut fields: BTreeMap<String, String>,
    ) -> Result<SectionContent, CoreError> {
        if let (Some(session), Some(field)) = (&self.image, self.section.image_field()) {
            if !session.is_ready_to_submit() {
                self.notices.publish(Notice::info(UPLOAD_PENDING_MESSAGE));
                return Err(CoreError::Validation(UPLOAD_PENDING_MESSAGE.into()));
            }
            let url = session
                .to_persistable_list()
                .into_iter()
                .next()
                .unwrap_or_default();
            fields.insert(field.to_string(), url);
        }

        validate_submission(self.section, &fields)
            .map_err(|e| self.notices.fail("Cannot save", e))?;

        self.store
            .upsert_section(self.section, &fields)
            .await
            .map_err(|e| self.notices.fail("Failed to save", e))?;

        self.notices.publish(Notice::success("Saved"));
        Ok(SectionContent {
            section: Some(self.section),
            fields,
        })
    }
}
