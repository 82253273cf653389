//! Public site content loading.
//!
//! [`SiteLoader`] fetches everything the public pages render. Sections and
//! card lists load concurrently and independently: a part that fails is
//! logged and left empty rather than failing the whole page.

use std::sync::Arc;

use serde::Serialize;
use wasura_core::config::SiteConfig;
use wasura_core::error::CoreError;
use wasura_core::ordering::sort_for_display;
use wasura_core::pagination::{page_links, total_pages, PageLink};
use wasura_core::record::{Collection, Record};
use wasura_core::section::{SectionContent, SectionKey};
use wasura_gateway::{ContentStore, PageRequest};

/// Everything the top page renders.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteSnapshot {
    pub hero: Option<SectionContent>,
    pub about: Option<SectionContent>,
    pub contact: Option<SectionContent>,
    pub karuta: Option<Vec<Record>>,
    pub activities: Option<Vec<Record>>,
    pub faq: Option<Vec<Record>>,
}

/// One page of the public report list.
#[derive(Debug, Clone, Serialize)]
pub struct ReportsPage {
    pub reports: Vec<Record>,
    pub page: u32,
    pub total: u64,
    pub total_pages: u32,
    pub links: Vec<PageLink>,
}

/// Outcome of a report page lookup.
#[derive(Debug, Clone)]
pub enum PageLookup {
    Found(ReportsPage),
    /// The requested page lies past the end; callers redirect to page 1.
    PageOutOfRange { requested: u32, total_pages: u32 },
}

pub struct SiteLoader {
    store: Arc<dyn ContentStore>,
    page_size: u32,
    top_count: u32,
}

impl SiteLoader {
    pub fn new(store: Arc<dyn ContentStore>, page_size: u32, top_count: u32) -> Self {
        Self {
            store,
            page_size,
            top_count,
        }
    }

    pub fn from_config(store: Arc<dyn ContentStore>, config: &SiteConfig) -> Self {
        Self::new(store, config.reports_per_page, config.top_page_reports)
    }

    /// Load every section and card list concurrently.
    pub async fn load_all(&self) -> SiteSnapshot {
        let (hero, about, contact, karuta, activities, faq) = futures::join!(
            self.section(SectionKey::Hero),
            self.section(SectionKey::About),
            self.section(SectionKey::Contact),
            self.cards(Collection::KarutaCards),
            self.cards(Collection::ActivityCards),
            self.cards(Collection::FaqItems),
        );

        SiteSnapshot {
            hero,
            about,
            contact,
            karuta,
            activities,
            faq,
        }
    }

    async fn section(&self, section: SectionKey) -> Option<SectionContent> {
        match self.store.list_section(section).await {
            Ok(rows) => Some(SectionContent::from_rows(section, &rows)),
            Err(e) => {
                tracing::warn!(section = section.name(), error = %e, "Skipping section");
                None
            }
        }
    }

    async fn cards(&self, collection: Collection) -> Option<Vec<Record>> {
        match self.store.list(collection, None).await {
            Ok(page) => {
                let mut records = page.records;
                sort_for_display(&mut records);
                Some(records)
            }
            Err(e) => {
                tracing::warn!(collection = collection.table(), error = %e, "Skipping collection");
                None
            }
        }
    }

    /// Newest `count` reports.
    pub async fn latest_reports(&self, count: u32) -> Result<Vec<Record>, CoreError> {
        let page = self
            .store
            .list(
                Collection::Reports,
                Some(PageRequest {
                    page: 1,
                    page_size: count,
                }),
            )
            .await?;
        Ok(page.records)
    }

    /// Reports for the top page.
    pub async fn top_reports(&self) -> Result<Vec<Record>, CoreError> {
        self.latest_reports(self.top_count).await
    }

    /// One page of the report list. Page 0 is read as page 1.
    pub async fn reports_page(&self, page: u32) -> Result<PageLookup, CoreError> {
        let page = page.max(1);
        let result = self
            .store
            .list(
                Collection::Reports,
                Some(PageRequest {
                    page,
                    page_size: self.page_size,
                }),
            )
            .await?;

        let total = result.total.unwrap_or(result.records.len() as u64);
        let pages = total_pages(total, self.page_size);

        if page > 1 && result.records.is_empty() {
            tracing::debug!(page, total_pages = pages, "Report page out of range");
            return Ok(PageLookup::PageOutOfRange {
                requested: page,
                total_pages: pages,
            });
        }

        Ok(PageLookup::Found(ReportsPage {
            reports: result.records,
            page,
            total,
            total_pages: pages,
            links: page_links(page, pages),
        }))
    }
}
