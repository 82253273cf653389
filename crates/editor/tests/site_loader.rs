//! Integration tests for the public site loader and report pagination.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::{card, ids, FakeStore};
use wasura_core::pagination::PageLink;
use wasura_core::record::{Collection, Record};
use wasura_core::section::SectionKey;
use wasura_editor::site::{PageLookup, SiteLoader};
use wasura_gateway::ContentStore;

fn reports(count: i64) -> Vec<Record> {
    (1..=count)
        .map(|n| {
            Record::new(n)
                .with_field("title", format!("Report {n}"))
                .with_field("date", format!("2024-01-{n:02}"))
        })
        .collect()
}

fn loader(store: &Arc<FakeStore>) -> SiteLoader {
    SiteLoader::new(Arc::clone(store) as Arc<dyn ContentStore>, 6, 3)
}

// ---------------------------------------------------------------------------
// Test: load_all
// ---------------------------------------------------------------------------

#[tokio::test]
async fn load_all_returns_every_part() {
    let store = FakeStore::new();
    store.seed_section(SectionKey::Hero, &[("subtitle", "Welcome")]);
    store.seed(Collection::KarutaCards, vec![card(2, 2), card(1, 1)]);

    let snapshot = loader(&store).load_all().await;

    assert_eq!(snapshot.hero.unwrap().get("subtitle"), "Welcome");
    assert!(snapshot.about.unwrap().is_blank());
    assert!(snapshot.contact.is_some());
    assert_eq!(ids(&snapshot.karuta.unwrap()), vec!["1", "2"]);
    assert!(snapshot.activities.unwrap().is_empty());
    assert!(snapshot.faq.is_some());
}

#[tokio::test]
async fn load_all_skips_failed_parts() {
    let store = FakeStore::new();
    store.fail_section(SectionKey::About);
    store.fail_list_of(Collection::FaqItems);
    store.seed(Collection::ActivityCards, vec![card(1, 1)]);

    let snapshot = loader(&store).load_all().await;

    assert!(snapshot.about.is_none());
    assert!(snapshot.faq.is_none());
    assert!(snapshot.hero.is_some());
    assert_eq!(snapshot.activities.unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Test: reports
// ---------------------------------------------------------------------------

#[tokio::test]
async fn top_page_shows_newest_reports() {
    let store = FakeStore::new();
    store.seed(Collection::Reports, reports(5));

    let top = loader(&store).top_reports().await.unwrap();

    assert_eq!(ids(&top), vec!["5", "4", "3"]);
}

#[tokio::test]
async fn reports_page_carries_totals_and_links() {
    let store = FakeStore::new();
    store.seed(Collection::Reports, reports(14));

    let lookup = loader(&store).reports_page(2).await.unwrap();

    let PageLookup::Found(page) = lookup else {
        panic!("page 2 should exist");
    };
    assert_eq!(page.page, 2);
    assert_eq!(page.total, 14);
    assert_eq!(page.total_pages, 3);
    assert_eq!(ids(&page.reports), vec!["8", "7", "6", "5", "4", "3"]);
    assert_eq!(page.links.first(), Some(&PageLink::Prev { page: Some(1) }));
    assert_eq!(page.links.last(), Some(&PageLink::Next { page: Some(3) }));
    assert!(page.links.contains(&PageLink::Number {
        page: 2,
        current: true
    }));
}

#[tokio::test]
async fn single_page_has_no_links() {
    let store = FakeStore::new();
    store.seed(Collection::Reports, reports(4));

    let lookup = loader(&store).reports_page(1).await.unwrap();

    assert_matches!(lookup, PageLookup::Found(ref p) if p.links.is_empty() && p.total_pages == 1);
}

#[tokio::test]
async fn page_past_the_end_is_out_of_range() {
    let store = FakeStore::new();
    store.seed(Collection::Reports, reports(7));

    let lookup = loader(&store).reports_page(5).await.unwrap();

    assert_matches!(
        lookup,
        PageLookup::PageOutOfRange {
            requested: 5,
            total_pages: 2
        }
    );
}

#[tokio::test]
async fn empty_first_page_is_not_out_of_range() {
    let store = FakeStore::new();

    let lookup = loader(&store).reports_page(1).await.unwrap();

    assert_matches!(lookup, PageLookup::Found(ref p) if p.reports.is_empty() && p.total == 0);
}
