use validator::Validate;

use crate::error::CoreError;
use crate::pagination::{DEFAULT_PAGE_SIZE, DEFAULT_TOP_PAGE_COUNT};
use crate::upload::{ImageRules, DEFAULT_MAX_IMAGE_BYTES};

/// Remote service configuration loaded from environment variables.
///
/// Credentials have no defaults; everything else falls back to the values
/// the club site has always used.
#[derive(Debug, Clone, Validate)]
pub struct SiteConfig {
    /// Base URL of the REST backend (e.g. `https://xyz.supabase.co`).
    #[validate(url)]
    pub rest_url: String,
    /// Public anon key sent as `apikey` and bearer token.
    #[validate(length(min = 1))]
    pub anon_key: String,
    /// Media host cloud name.
    #[validate(length(min = 1))]
    pub cloud_name: String,
    /// Unsigned upload preset.
    #[validate(length(min = 1))]
    pub upload_preset: String,
    /// Folder uploaded images are filed under.
    pub upload_folder: String,
    /// Media API base URL.
    #[validate(url)]
    pub media_base_url: String,
    /// Largest accepted image, in bytes.
    #[validate(range(min = 1))]
    pub max_image_bytes: u64,
    /// Reports per page on the public list.
    #[validate(range(min = 1, max = 100))]
    pub reports_per_page: u32,
    /// Reports shown on the top page.
    #[validate(range(min = 1, max = 100))]
    pub top_page_reports: u32,
    /// Per-request timeout for both remote services.
    #[validate(range(min = 1))]
    pub http_timeout_secs: u64,
}

impl SiteConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                      |
    /// |----------------------------|------------------------------|
    /// | `SUPABASE_URL`             | required                     |
    /// | `SUPABASE_ANON_KEY`        | required                     |
    /// | `CLOUDINARY_CLOUD_NAME`    | required                     |
    /// | `CLOUDINARY_UPLOAD_PRESET` | `wasuramochi-unsigned`       |
    /// | `CLOUDINARY_FOLDER`        | `wasuramochi-reports`        |
    /// | `CLOUDINARY_BASE_URL`      | `https://api.cloudinary.com` |
    /// | `MAX_IMAGE_BYTES`          | `10485760`                   |
    /// | `REPORTS_PER_PAGE`         | `6`                          |
    /// | `TOP_PAGE_REPORTS`         | `3`                          |
    /// | `HTTP_TIMEOUT_SECS`        | `30`                         |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let required = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| CoreError::Config(format!("{key} must be set")))
        };
        let or_default = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let config = Self {
            rest_url: required("SUPABASE_URL")?.trim_end_matches('/').to_string(),
            anon_key: required("SUPABASE_ANON_KEY")?,
            cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            upload_preset: or_default("CLOUDINARY_UPLOAD_PRESET", "wasuramochi-unsigned"),
            upload_folder: or_default("CLOUDINARY_FOLDER", "wasuramochi-reports"),
            media_base_url: or_default("CLOUDINARY_BASE_URL", "https://api.cloudinary.com")
                .trim_end_matches('/')
                .to_string(),
            max_image_bytes: parse_number(
                "MAX_IMAGE_BYTES",
                &or_default("MAX_IMAGE_BYTES", &DEFAULT_MAX_IMAGE_BYTES.to_string()),
            )?,
            reports_per_page: parse_number(
                "REPORTS_PER_PAGE",
                &or_default("REPORTS_PER_PAGE", &DEFAULT_PAGE_SIZE.to_string()),
            )?,
            top_page_reports: parse_number(
                "TOP_PAGE_REPORTS",
                &or_default("TOP_PAGE_REPORTS", &DEFAULT_TOP_PAGE_COUNT.to_string()),
            )?,
            http_timeout_secs: parse_number(
                "HTTP_TIMEOUT_SECS",
                &or_default("HTTP_TIMEOUT_SECS", "30"),
            )?,
        };

        config
            .validate()
            .map_err(|e| CoreError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Image limits for upload sessions.
    pub fn image_rules(&self) -> ImageRules {
        ImageRules::with_max_bytes(self.max_image_bytes)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, CoreError> {
    raw.parse()
        .map_err(|_| CoreError::Config(format!("{key} must be a valid number, got '{raw}'")))
}
