//! Domain types and rules for the club site CMS.
//!
//! Everything here is pure: records and collections, section content,
//! ordering math, image validation, pagination, the session flag and
//! configuration. Network I/O lives in `wasura-gateway`; the editing
//! workflow in `wasura-editor`.

pub mod config;
pub mod error;
pub mod ordering;
pub mod pagination;
pub mod record;
pub mod section;
pub mod session;
pub mod types;
pub mod upload;
