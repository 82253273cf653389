//! Multi-Image Upload Session.
//!
//! An ordered list of image slots for one form. Picked files are validated,
//! get an `Uploading` slot immediately and upload in their own spawned task.
//! Every slot carries a token; completions and progress are applied by
//! token, so removing or reordering slots while uploads run is safe and a
//! late result for a removed slot is ignored.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use uuid::Uuid;
use wasura_core::error::CoreError;
use wasura_core::upload::{ImageFile, ImageRules};
use wasura_gateway::{ImageHost, ProgressFn};

use crate::notice::{Notice, NoticeBus};

/// What occupies one position of the session.
///
/// There is no validating state: [`ImageRules::validate`] runs synchronously
/// in `add_files` before a slot exists, and a rejected file never gets one.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryState {
    Uploading {
        file_name: String,
        mime_type: String,
        /// Local bytes for the preview thumbnail.
        preview: Arc<[u8]>,
        progress: u8,
    },
    Uploaded {
        url: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadEntry {
    pub token: Uuid,
    pub state: EntryState,
}

impl UploadEntry {
    fn uploaded(url: String) -> Self {
        Self {
            token: Uuid::new_v4(),
            state: EntryState::Uploaded { url },
        }
    }

    pub fn url(&self) -> Option<&str> {
        match &self.state {
            EntryState::Uploaded { url } => Some(url),
            EntryState::Uploading { .. } => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, EntryState::Uploading { .. })
    }
}

/// Files turned away by [`UploadSession::add_files`].
#[derive(Debug, Default)]
pub struct AddReport {
    /// Tokens of the slots that started uploading, in input order.
    pub accepted: Vec<Uuid>,
    /// File name and reason for each rejected file.
    pub rejected: Vec<(String, CoreError)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Multi,
    Single,
}

type Slots = Arc<Mutex<Vec<UploadEntry>>>;

fn lock(slots: &Slots) -> MutexGuard<'_, Vec<UploadEntry>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct UploadSession {
    host: Arc<dyn ImageHost>,
    rules: ImageRules,
    notices: Arc<NoticeBus>,
    mode: Mode,
    slots: Slots,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl UploadSession {
    /// Session holding any number of images (report galleries).
    pub fn new(host: Arc<dyn ImageHost>, rules: ImageRules, notices: Arc<NoticeBus>) -> Self {
        Self::with_mode(host, rules, notices, Mode::Multi)
    }

    /// Session holding at most one image; a new file replaces the current
    /// entry.
    pub fn single(host: Arc<dyn ImageHost>, rules: ImageRules, notices: Arc<NoticeBus>) -> Self {
        Self::with_mode(host, rules, notices, Mode::Single)
    }

    fn with_mode(
        host: Arc<dyn ImageHost>,
        rules: ImageRules,
        notices: Arc<NoticeBus>,
        mode: Mode,
    ) -> Self {
        Self {
            host,
            rules,
            notices,
            mode,
            slots: Arc::new(Mutex::new(Vec::new())),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn is_single(&self) -> bool {
        self.mode == Mode::Single
    }

    /// Replace the contents with already-stored URLs.
    pub fn seed<I, S>(&self, urls: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let limit = match self.mode {
            Mode::Multi => usize::MAX,
            Mode::Single => 1,
        };
        let entries: Vec<UploadEntry> = urls
            .into_iter()
            .map(Into::<String>::into)
            .filter(|url| !url.is_empty())
            .take(limit)
            .map(UploadEntry::uploaded)
            .collect();
        *lock(&self.slots) = entries;
    }

    /// Validate each file in order and start uploading the valid ones.
    ///
    /// Must be called from within a tokio runtime. In single mode only the
    /// first file is considered.
    pub fn add_files(&self, files: Vec<ImageFile>) -> AddReport {
        let mut report = AddReport::default();
        let take = match self.mode {
            Mode::Multi => files.len(),
            Mode::Single => 1,
        };

        for file in files.into_iter().take(take) {
            if let Err(err) = self.rules.validate(&file) {
                tracing::info!(file = %file.name, error = %err, "Image rejected");
                self.notices.publish(Notice::error(err.to_string()));
                report.rejected.push((file.name, err));
                continue;
            }

            let token = Uuid::new_v4();
            let entry = UploadEntry {
                token,
                state: EntryState::Uploading {
                    file_name: file.name.clone(),
                    mime_type: file.mime_type.clone(),
                    preview: Arc::clone(&file.data),
                    progress: 0,
                },
            };
            {
                let mut slots = lock(&self.slots);
                if self.mode == Mode::Single {
                    slots.clear();
                }
                slots.push(entry);
            }

            let handle = self.spawn_upload(token, file);
            self.tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(handle);
            report.accepted.push(token);
        }

        report
    }

    fn spawn_upload(&self, token: Uuid, file: ImageFile) -> JoinHandle<()> {
        let host = Arc::clone(&self.host);
        let slots = Arc::clone(&self.slots);
        let notices = Arc::clone(&self.notices);

        let progress_slots = Arc::clone(&self.slots);
        let on_progress: ProgressFn = Arc::new(move |percent| {
            let mut slots = lock(&progress_slots);
            if let Some(EntryState::Uploading { progress, .. }) = slots
                .iter_mut()
                .find(|e| e.token == token)
                .map(|e| &mut e.state)
            {
                *progress = percent;
            }
        });

        tokio::spawn(async move {
            let name = file.name.clone();
            let result = host.upload_image(file, Some(on_progress)).await;

            let mut slots = lock(&slots);
            let Some(pos) = slots.iter().position(|e| e.token == token) else {
                tracing::debug!(%token, file = %name, "Upload finished for a removed slot");
                return;
            };

            match result {
                Ok(uploaded) => {
                    slots[pos].state = EntryState::Uploaded { url: uploaded.url };
                }
                Err(err) => {
                    slots.remove(pos);
                    drop(slots);
                    tracing::warn!(%token, file = %name, error = %err, "Image upload failed");
                    notices.publish(Notice::error(format!("{name}: {err}")));
                }
            }
        })
    }

    /// Remove whatever occupies `index`. Out-of-range indices are ignored.
    pub fn remove_at(&self, index: usize) -> Option<UploadEntry> {
        let mut slots = lock(&self.slots);
        (index < slots.len()).then(|| slots.remove(index))
    }

    /// Snapshot for rendering.
    pub fn entries(&self) -> Vec<UploadEntry> {
        lock(&self.slots).clone()
    }

    /// True only when no slot is still uploading.
    pub fn is_ready_to_submit(&self) -> bool {
        !lock(&self.slots).iter().any(UploadEntry::is_pending)
    }

    /// Uploaded URLs in slot order.
    pub fn to_persistable_list(&self) -> Vec<String> {
        lock(&self.slots)
            .iter()
            .filter_map(|e| e.url().map(str::to_string))
            .collect()
    }

    /// Wait for every upload spawned so far.
    pub async fn settle(&self) {
        loop {
            let handles = std::mem::take(
                &mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner),
            );
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::error!(error = %e, "Upload task panicked");
                }
            }
        }
    }
}

impl Drop for UploadSession {
    fn drop(&mut self) {
        for handle in self
            .tasks
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            handle.abort();
        }
    }
}
