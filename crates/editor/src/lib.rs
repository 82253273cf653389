//! Admin editing workflow and public content loading for the club site.
//!
//! - [`collection`]: ordered collection editor (load, create, update,
//!   confirmed delete, move up/down).
//! - [`upload`]: multi-image upload session with per-slot progress.
//! - [`section_form`] / [`record_form`]: form controllers over the above.
//! - [`site`]: public snapshot and report pagination.
//! - [`notice`]: transient messages for the admin UI.

pub mod collection;
pub mod notice;
pub mod record_form;
pub mod section_form;
pub mod site;
pub mod upload;
