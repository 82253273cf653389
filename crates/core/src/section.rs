//! Named site sections and their flat key/value content.
//!
//! `hero`, `about` and `contact` are edited as flat forms. `karuta`,
//! `activities` and `faq` are section identifiers too, but their content is
//! a record collection and they declare no flat fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{ValidateEmail, ValidateUrl};

use crate::error::CoreError;
use crate::record::Collection;

/// Closed set of section identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKey {
    Hero,
    About,
    Karuta,
    Activities,
    Faq,
    Contact,
}

impl SectionKey {
    pub const ALL: [SectionKey; 6] = [
        Self::Hero,
        Self::About,
        Self::Karuta,
        Self::Activities,
        Self::Faq,
        Self::Contact,
    ];

    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == name)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown section '{name}'. Must be one of: hero, about, karuta, activities, faq, contact"
                ))
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Hero => "hero",
            Self::About => "about",
            Self::Karuta => "karuta",
            Self::Activities => "activities",
            Self::Faq => "faq",
            Self::Contact => "contact",
        }
    }

    /// Flat fields owned by this section's form.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Hero => &[
                "subtitle",
                "cta_primary_text",
                "cta_primary_link",
                "cta_secondary_text",
                "cta_secondary_link",
            ],
            Self::About => &["intro", "description", "image"],
            Self::Contact => &["line_url", "instagram_url", "twitter_url", "email"],
            Self::Karuta | Self::Activities | Self::Faq => &[],
        }
    }

    /// Field holding an uploaded image URL, if the section has one.
    pub fn image_field(self) -> Option<&'static str> {
        match self {
            Self::About => Some("image"),
            _ => None,
        }
    }

    /// The record collection backing a list-style section.
    pub fn collection(self) -> Option<Collection> {
        match self {
            Self::Karuta => Some(Collection::KarutaCards),
            Self::Activities => Some(Collection::ActivityCards),
            Self::Faq => Some(Collection::FaqItems),
            Self::Hero | Self::About | Self::Contact => None,
        }
    }

    pub fn is_flat(self) -> bool {
        !self.fields().is_empty()
    }

    /// Older field names still found in stored rows, as `(legacy, declared)`.
    pub fn legacy_aliases(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::About => &[("intro_text", "intro")],
            _ => &[],
        }
    }
}

/// One backend row of the `site_contents` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRow {
    pub section_key: String,
    pub field_key: String,
    #[serde(default)]
    pub field_value: Option<String>,
}

/// Flat field map of one section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionContent {
    pub section: Option<SectionKey>,
    pub fields: BTreeMap<String, String>,
}

impl SectionContent {
    /// Fold backend rows into a flat map. Exactly the declared fields of
    /// `section` are present afterwards; missing or null values become `""`.
    /// A legacy row only fills its declared field when that one is empty.
    pub fn from_rows(section: SectionKey, rows: &[SectionRow]) -> Self {
        let mut fields: BTreeMap<String, String> = section
            .fields()
            .iter()
            .map(|k| (k.to_string(), String::new()))
            .collect();

        let rows: Vec<&SectionRow> = rows
            .iter()
            .filter(|r| r.section_key == section.name())
            .collect();

        for row in &rows {
            if let Some(slot) = fields.get_mut(&row.field_key) {
                *slot = row.field_value.clone().unwrap_or_default();
            }
        }

        for (legacy, declared) in section.legacy_aliases() {
            let Some(value) = rows
                .iter()
                .find(|r| r.field_key == *legacy)
                .and_then(|r| r.field_value.as_deref())
            else {
                continue;
            };
            if let Some(slot) = fields.get_mut(*declared) {
                if slot.is_empty() {
                    *slot = value.to_string();
                }
            }
        }

        Self {
            section: Some(section),
            fields,
        }
    }

    pub fn get(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    /// True when no stored field carries a value.
    pub fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.is_empty())
    }
}

/// Check a form submission for `section`: exactly the declared field set,
/// and well-formed contact links.
pub fn validate_submission(
    section: SectionKey,
    fields: &BTreeMap<String, String>,
) -> Result<(), CoreError> {
    if !section.is_flat() {
        return Err(CoreError::Validation(format!(
            "Section '{}' is edited as a collection, not a form",
            section.name()
        )));
    }

    let declared = section.fields();
    if let Some(unknown) = fields.keys().find(|k| !declared.contains(&k.as_str())) {
        return Err(CoreError::Validation(format!(
            "Unknown field '{unknown}' for section '{}'",
            section.name()
        )));
    }

    let missing: Vec<&str> = declared
        .iter()
        .copied()
        .filter(|k| !fields.contains_key(*k))
        .collect();
    if !missing.is_empty() {
        return Err(CoreError::Validation(format!(
            "Section '{}' must be saved with every field; missing: {}",
            section.name(),
            missing.join(", ")
        )));
    }

    if section == SectionKey::Contact {
        validate_contact(fields)?;
    }

    Ok(())
}

fn validate_contact(fields: &BTreeMap<String, String>) -> Result<(), CoreError> {
    for key in ["line_url", "instagram_url", "twitter_url"] {
        let value = fields.get(key).map(|v| v.trim()).unwrap_or("");
        if !value.is_empty() && !value.validate_url() {
            return Err(CoreError::Validation(format!(
                "Field '{key}' must be a valid URL, got '{value}'"
            )));
        }
    }

    let email = fields.get("email").map(|v| v.trim()).unwrap_or("");
    if !email.is_empty() && !email.validate_email() {
        return Err(CoreError::Validation(format!(
            "Field 'email' must be a valid address, got '{email}'"
        )));
    }

    Ok(())
}
