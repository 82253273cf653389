//! Remote data gateway for the club site CMS.
//!
//! Provides the REST client for record and section rows, the media upload
//! client, and the [`ContentStore`] / [`ImageHost`] traits the editors
//! depend on, with [`RemoteGateway`] implementing both against the hosted
//! services.

pub mod media;
pub mod query;
pub mod rest;
pub mod store;

pub use media::{optimized_url, thumbnail_url, ProgressFn, UploadedImage};
pub use store::{ContentStore, ImageHost, PageRequest, RecordPage, RemoteGateway};
