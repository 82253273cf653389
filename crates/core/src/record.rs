//! Editable records and the closed set of content collections.
//!
//! A [`Record`] is one backend row. Everything except the identifier, the
//! manual sort position and the image list is kept as a loose JSON field map
//! so the same editor can drive reports, cards and FAQ entries.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::types::RecordId;

/// Loose field map carried by a record (title, description, dates, URLs).
pub type Fields = serde_json::Map<String, Value>;

/// Column holding the manual display position.
pub const SORT_ORDER_FIELD: &str = "sort_order";

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A generic editable backend row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<String>,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            sort_order: None,
            images: Vec::new(),
            fields: Fields::new(),
        }
    }

    pub fn with_sort_order(mut self, sort_order: i64) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Text value of a field, or `""` when absent or not a string.
    pub fn text(&self, key: &str) -> &str {
        self.fields.get(key).and_then(Value::as_str).unwrap_or("")
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// Sort direction of an ordering column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Where a collection stores uploaded image URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageField {
    None,
    /// One URL in a text column.
    Single(&'static str),
    /// Ordered URL list in an array column.
    Many(&'static str),
}

/// The content collections the site edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Reports,
    KarutaCards,
    ActivityCards,
    FaqItems,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Self::Reports,
        Self::KarutaCards,
        Self::ActivityCards,
        Self::FaqItems,
    ];

    /// Backend table name.
    pub fn table(self) -> &'static str {
        match self {
            Self::Reports => "reports",
            Self::KarutaCards => "karuta_cards",
            Self::ActivityCards => "activity_cards",
            Self::FaqItems => "faq_items",
        }
    }

    /// Default list ordering, primary column first.
    pub fn default_order(self) -> &'static [(&'static str, SortDirection)] {
        match self {
            Self::Reports => &[
                ("date", SortDirection::Desc),
                ("created_at", SortDirection::Desc),
            ],
            Self::KarutaCards | Self::ActivityCards | Self::FaqItems => &[
                (SORT_ORDER_FIELD, SortDirection::Asc),
                ("id", SortDirection::Asc),
            ],
        }
    }

    /// Whether the user arranges this collection by hand via `sort_order`.
    pub fn is_manually_ordered(self) -> bool {
        !matches!(self, Self::Reports)
    }

    pub fn image_field(self) -> ImageField {
        match self {
            Self::Reports => ImageField::Many("images"),
            Self::KarutaCards => ImageField::Single("image"),
            Self::ActivityCards | Self::FaqItems => ImageField::None,
        }
    }

    /// Fields that must be non-blank before a record may be saved.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::Reports => &["date", "title"],
            Self::KarutaCards | Self::ActivityCards => &["title"],
            Self::FaqItems => &["question", "answer"],
        }
    }

    /// Check `fields` against [`required_fields`](Self::required_fields).
    pub fn validate_required(self, fields: &Fields) -> Result<(), CoreError> {
        let missing: Vec<&str> = self
            .required_fields()
            .iter()
            .copied()
            .filter(|key| {
                !matches!(fields.get(*key).and_then(Value::as_str), Some(v) if !v.trim().is_empty())
            })
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "Required field(s) missing for {}: {}",
                self.table(),
                missing.join(", ")
            )))
        }
    }
}
