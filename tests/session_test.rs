mod common;

use bigdecimal::BigDecimal;
use common::{codes, MemoryCatalog};
use procure_core::error::{SelectionError, SessionError, ValidationError};
use procure_core::models::{
    CategoryNode, FetchErrorPolicy, HierarchyLevel, ItemMaster, LineInputs, LineItem,
};
use procure_core::service::{
    backfill, calculate_lines, summarize, Completion, DocumentSession, HierarchySource,
    SpecificationSource,
};
use std::str::FromStr;

use HierarchyLevel::*;

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn tee() -> LineItem {
    LineItem::new("Round neck tee", dec("10"), dec("100")).with_discount(dec("10"))
}

#[tokio::test]
async fn new_line_starts_with_category_candidates() {
    let catalog = MemoryCatalog::apparel();
    let mut session = DocumentSession::load(&catalog).await;
    let id = session.add_line(tee());

    let entry = session.line(id).unwrap();
    assert_eq!(codes(entry.cascade.candidates(Category)), vec!["APRL", "FABR"]);
    assert!(entry.cascade.selection().is_empty());
    assert_eq!(entry.cascade.effective_code(), "");
}

#[tokio::test]
async fn reselecting_category_clears_lower_levels() {
    let catalog = MemoryCatalog::apparel();
    let mut session = DocumentSession::load(&catalog).await;
    let id = session.add_line(tee());

    for (level, code) in [(Category, "APRL"), (SubCategory, "MENS"), (Division, "TOPW")] {
        let completion = session
            .select_level(&catalog, id, catalog.node(level, code))
            .await
            .unwrap();
        assert_eq!(completion, Completion::Applied);
    }
    let cascade = &session.line(id).unwrap().cascade;
    assert_eq!(codes(cascade.candidates(Class)), vec!["TSHT", "SHRT"]);
    assert_eq!(cascade.resolve().path, "Apparel > Men > Topwear");

    session
        .select_level(&catalog, id, catalog.node(Category, "FABR"))
        .await
        .unwrap();

    let cascade = &session.line(id).unwrap().cascade;
    assert_eq!(cascade.effective_code(), "FABR");
    for level in Category.descendants() {
        assert!(cascade.selected(level).is_none(), "{level} still selected");
    }
    assert_eq!(codes(cascade.candidates(SubCategory)), vec!["COTN"]);
    assert!(cascade.candidates(Division).is_empty());
    assert!(cascade.candidates(Class).is_empty());
}

#[tokio::test]
async fn selecting_out_of_order_is_rejected() {
    let catalog = MemoryCatalog::apparel();
    let mut session = DocumentSession::load(&catalog).await;
    let id = session.add_line(tee());

    let err = session
        .select_level(&catalog, id, catalog.node(Division, "TOPW"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Selection(_)));

    session
        .select_level(&catalog, id, catalog.node(Category, "FABR"))
        .await
        .unwrap();
    let err = session
        .select_level(&catalog, id, catalog.node(SubCategory, "MENS"))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Selection(_)));
    assert_eq!(session.line(id).unwrap().cascade.effective_code(), "FABR");
}

#[tokio::test]
async fn search_match_backfills_ancestors_and_loads_subtree() {
    let catalog = MemoryCatalog::apparel();
    let mut session = DocumentSession::load(&catalog).await;
    let id = session.add_line(tee());

    let completion = session
        .select_search_match(&catalog, id, catalog.node(Division, "TOPW"))
        .await
        .unwrap();
    assert_eq!(completion, Completion::Applied);

    let cascade = &session.line(id).unwrap().cascade;
    assert_eq!(cascade.selected(Category).unwrap().code, "APRL");
    assert_eq!(cascade.selected(SubCategory).unwrap().code, "MENS");
    assert_eq!(cascade.selected(Division).unwrap().code, "TOPW");
    assert!(cascade.selected(Class).is_none());

    assert_eq!(codes(cascade.candidates(SubCategory)), vec!["MENS", "WMNS"]);
    assert_eq!(codes(cascade.candidates(Division)), vec!["TOPW", "BTMW"]);
    assert_eq!(codes(cascade.candidates(Class)), vec!["TSHT", "SHRT"]);
    assert_eq!(codes(cascade.candidates(SubClass)), vec!["RNCK", "VNCK", "FORM"]);

    let resolved = cascade.resolve();
    assert_eq!(resolved.effective_code, "TOPW");
    assert_eq!(resolved.path, "Apparel > Men > Topwear");
}

#[tokio::test]
async fn backfill_stops_when_ancestor_list_is_unavailable() {
    let catalog = MemoryCatalog::apparel();
    catalog.fail_level(SubCategory);

    let result = backfill(&catalog, &catalog.node(Division, "TOPW")).await.unwrap();

    assert!(!result.is_complete());
    assert_eq!(result.reached, Some(Category));
    assert_eq!(result.cascade.effective_code(), "APRL");
    assert!(result.cascade.selected(SubCategory).is_none());
}

#[tokio::test]
async fn stale_candidate_response_is_discarded() {
    let catalog = MemoryCatalog::apparel();
    let mut session = DocumentSession::load(&catalog).await;
    let id = session.add_line(tee());

    let first = session
        .begin_select(id, catalog.node(Category, "APRL"))
        .unwrap()
        .unwrap();
    let second = session
        .begin_select(id, catalog.node(Category, "FABR"))
        .unwrap()
        .unwrap();
    assert!(second.token > first.token);

    let fabric = catalog
        .list_nodes(second.request.level, Some(&second.request.scope))
        .await;
    assert_eq!(session.complete_candidates(&second, fabric), Completion::Applied);

    // 先发出的请求后返回
    let apparel = catalog
        .list_nodes(first.request.level, Some(&first.request.scope))
        .await;
    assert_eq!(session.complete_candidates(&first, apparel), Completion::Stale);

    let cascade = &session.line(id).unwrap().cascade;
    assert_eq!(cascade.effective_code(), "FABR");
    assert_eq!(codes(cascade.candidates(SubCategory)), vec!["COTN"]);
}

#[tokio::test]
async fn manual_selection_supersedes_pending_backfill() {
    let catalog = MemoryCatalog::apparel();
    let mut session = DocumentSession::load(&catalog).await;
    let id = session.add_line(tee());

    let pending = session.begin_backfill(id, catalog.node(Class, "JEAN")).unwrap();
    session
        .select_level(&catalog, id, catalog.node(Category, "FABR"))
        .await
        .unwrap();

    let result = backfill(&catalog, &pending.target).await.unwrap();
    assert!(result.is_complete());
    assert_eq!(session.complete_backfill(&pending, result), Completion::Stale);
    assert_eq!(session.line(id).unwrap().cascade.effective_code(), "FABR");
}

#[tokio::test]
async fn response_for_removed_line_is_discarded() {
    let catalog = MemoryCatalog::apparel();
    let mut session = DocumentSession::load(&catalog).await;
    let id = session.add_line(tee());

    let pending = session
        .begin_select(id, catalog.node(Category, "APRL"))
        .unwrap()
        .unwrap();
    session.remove_line(id).unwrap();

    let nodes = catalog
        .list_nodes(pending.request.level, Some(&pending.request.scope))
        .await;
    assert_eq!(session.complete_candidates(&pending, nodes), Completion::Stale);
    assert!(matches!(session.remove_line(id), Err(SessionError::UnknownLine(_))));
}

#[tokio::test]
async fn failed_candidate_fetch_leaves_empty_list() {
    let catalog = MemoryCatalog::apparel();
    catalog.fail_level(Division);
    let mut session = DocumentSession::load(&catalog).await;
    let id = session.add_line(tee());

    session
        .select_level(&catalog, id, catalog.node(Category, "APRL"))
        .await
        .unwrap();
    let completion = session
        .select_level(&catalog, id, catalog.node(SubCategory, "MENS"))
        .await
        .unwrap();
    assert_eq!(completion, Completion::Applied);

    let cascade = &session.line(id).unwrap().cascade;
    assert!(cascade.candidates(Division).is_empty());
    assert_eq!(cascade.selected(Category).unwrap().code, "APRL");
    assert_eq!(cascade.selected(SubCategory).unwrap().code, "MENS");
}

#[tokio::test]
async fn clearing_a_level_keeps_its_candidates() {
    let catalog = MemoryCatalog::apparel();
    let mut session = DocumentSession::load(&catalog).await;
    let id = session.add_line(tee());
    session
        .select_search_match(&catalog, id, catalog.node(Class, "TSHT"))
        .await
        .unwrap();

    session.clear_level(id, Division).unwrap();

    let cascade = &session.line(id).unwrap().cascade;
    assert_eq!(cascade.effective_code(), "MENS");
    assert_eq!(codes(cascade.candidates(Division)), vec!["TOPW", "BTMW"]);
    assert!(cascade.candidates(Class).is_empty());
    assert!(cascade.candidates(SubClass).is_empty());
}

#[tokio::test]
async fn specification_filters_follow_effective_code() {
    let catalog = MemoryCatalog::apparel();
    let mut session = DocumentSession::load(&catalog).await;
    let id = session.add_line(tee());
    session
        .select_search_match(&catalog, id, catalog.node(Division, "TOPW"))
        .await
        .unwrap();
    assert!(session.line(id).unwrap().needs_specification_refresh());

    let completion = session
        .refresh_specification(&catalog, id, FetchErrorPolicy::Unfiltered)
        .await
        .unwrap();
    assert_eq!(completion, Completion::Applied);

    let entry = session.line(id).unwrap();
    let candidates = entry.candidates.as_ref().unwrap();
    assert!(candidates.has_filters);
    let suppliers: Vec<&str> = candidates.suppliers.iter().map(|s| s.code.as_str()).collect();
    assert_eq!(suppliers, vec!["S-KNIT", "S-BOTH"]);
    let brands: Vec<&str> = candidates.brands.iter().map(|b| b.code.as_str()).collect();
    assert_eq!(brands, vec!["B-PREM"]);
    assert!(!entry.needs_specification_refresh());

    // 选到更深层级后有效编码变为 TSHT, 该分类未配置规格
    session
        .select_level(&catalog, id, catalog.node(Class, "TSHT"))
        .await
        .unwrap();
    let refreshed = session
        .refresh_stale_specifications(&catalog, FetchErrorPolicy::Unfiltered)
        .await
        .unwrap();
    assert_eq!(refreshed, 1);

    let candidates = session.line(id).unwrap().candidates.clone().unwrap();
    assert!(!candidates.has_filters);
    assert_eq!(candidates.suppliers.len(), 4);
    assert_eq!(candidates.brands.len(), 2);
}

#[tokio::test]
async fn stale_specification_response_is_discarded() {
    let catalog = MemoryCatalog::apparel();
    let mut session = DocumentSession::load(&catalog).await;
    let id = session.add_line(tee());
    session
        .select_search_match(&catalog, id, catalog.node(Division, "TOPW"))
        .await
        .unwrap();

    let pending = session.begin_specification(id).unwrap();
    assert_eq!(pending.category_code, "TOPW");
    session
        .select_level(&catalog, id, catalog.node(Class, "TSHT"))
        .await
        .unwrap();

    let outcome = catalog.fetch_specification(&pending.category_code).await;
    let completion = session
        .complete_specification(&pending, outcome, &[], &[], FetchErrorPolicy::Unfiltered)
        .unwrap();
    assert_eq!(completion, Completion::Stale);
    assert!(session.line(id).unwrap().candidates.is_none());
}

#[tokio::test]
async fn specification_fetch_error_respects_policy() {
    let catalog = MemoryCatalog::apparel();
    catalog.fail_specifications();
    let mut session = DocumentSession::load(&catalog).await;
    let id = session.add_line(tee());
    session
        .select_search_match(&catalog, id, catalog.node(Division, "TOPW"))
        .await
        .unwrap();

    let err = session
        .refresh_specification(&catalog, id, FetchErrorPolicy::Strict)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::SpecificationUnavailable { ref category_code, .. } if category_code == "TOPW"
    ));
    assert!(session.line(id).unwrap().candidates.is_none());

    session
        .refresh_specification(&catalog, id, FetchErrorPolicy::Unfiltered)
        .await
        .unwrap();
    let candidates = session.line(id).unwrap().candidates.clone().unwrap();
    assert!(!candidates.has_filters);
    assert_eq!(candidates.suppliers.len(), 4);
}

#[tokio::test]
async fn summary_recomputes_after_every_change() {
    let catalog = MemoryCatalog::apparel();
    let mut session = DocumentSession::load(&catalog).await;
    assert!(matches!(session.validate(), Err(ValidationError::EmptyDocument)));
    assert_eq!(session.summary().grand_total, BigDecimal::from(0));

    let first = session.add_line(tee());
    let second = session.add_line(
        LineItem::new("Denim roll", dec("2"), dec("250")).with_gst(dec("5")),
    );

    let summary = session.summary();
    assert_eq!(summary.subtotal, dec("1500"));
    assert_eq!(summary.total_discount, dec("100"));
    assert_eq!(summary.total_taxable, dec("1400"));
    assert_eq!(summary.total_gst, dec("187"));
    assert_eq!(summary.grand_total, dec("1587"));
    session.validate().unwrap();

    let line = session
        .update_inputs(
            second,
            LineInputs {
                quantity: Some(dec("3")),
                gst_percent: Some(dec("12")),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(line.taxable_amount, dec("750"));
    assert_eq!(line.gst_amount, dec("90"));

    session.remove_line(first).unwrap();
    let summary = session.summary();
    assert_eq!(summary.grand_total, dec("840"));

    let items: Vec<LineItem> = session
        .line_ids()
        .map(|id| session.line(id).unwrap().item.clone())
        .collect();
    assert_eq!(summary, summarize(&calculate_lines(&items)));
}

#[tokio::test]
async fn line_ids_keep_insertion_order() {
    let mut session = DocumentSession::new(Vec::new());
    let a = session.add_line(tee());
    let b = session.add_line(tee());
    let c = session.add_line(tee());
    session.remove_line(b).unwrap();
    let d = session.add_line(tee());

    assert_eq!(session.line_ids().collect::<Vec<_>>(), vec![a, c, d]);
    assert_eq!(session.len(), 3);
    assert!(d > c);
}

#[tokio::test]
async fn item_master_defaults_flow_into_totals() {
    let mut session = DocumentSession::new(Vec::new());
    let id = session.add_line(LineItem::new("", dec("4"), dec("25")).with_gst(dec("5")));

    let line = session
        .apply_item_master(
            id,
            &ItemMaster {
                item_code: "FAB-COT-40".into(),
                item_name: "Cotton 40s".into(),
                hsn_code: Some("5208".into()),
                gst_rate: None,
                uom: Some("MTR".into()),
            },
        )
        .unwrap();
    assert_eq!(line.item.unit, "MTR");
    assert_eq!(line.item.hsn_code, "5208");
    assert_eq!(line.gst_amount, dec("18"));
    assert_eq!(session.summary().grand_total, dec("118"));

    session.set_specification_value(id, "colour", "Indigo").unwrap();
    let item = &session.line(id).unwrap().item;
    assert_eq!(item.specifications.get("colour").map(String::as_str), Some("Indigo"));
    session.validate().unwrap();

    assert!(matches!(
        session.set_specification_value(99, "size", "M"),
        Err(SessionError::UnknownLine(99))
    ));
}

#[tokio::test]
async fn changing_category_drops_previous_filter() {
    let catalog = MemoryCatalog::apparel();
    let mut session = DocumentSession::load(&catalog).await;
    let id = session.add_line(tee());
    session
        .select_search_match(&catalog, id, catalog.node(Class, "JEAN"))
        .await
        .unwrap();
    session
        .refresh_specification(&catalog, id, FetchErrorPolicy::Unfiltered)
        .await
        .unwrap();
    let jeans = session.line(id).unwrap().candidates.clone().unwrap();
    assert!(jeans.has_filters);
    assert_eq!(jeans.suppliers.len(), 2);

    session
        .select_level(&catalog, id, catalog.node(Category, "FABR"))
        .await
        .unwrap();

    let entry = session.line(id).unwrap();
    assert_eq!(entry.cascade.effective_code(), "FABR");
    assert!(entry.candidates.is_none(), "JEAN filter kept after switching to FABR");
    assert!(entry.needs_specification_refresh());

    session
        .refresh_stale_specifications(&catalog, FetchErrorPolicy::Unfiltered)
        .await
        .unwrap();
    let fabric = session.line(id).unwrap().candidates.clone().unwrap();
    assert!(!fabric.has_filters);
    assert_eq!(fabric.suppliers.len(), 4);
}

#[tokio::test]
async fn clearing_or_backfilling_drops_previous_filter() {
    let catalog = MemoryCatalog::apparel();
    let mut session = DocumentSession::load(&catalog).await;
    let id = session.add_line(tee());
    session
        .select_search_match(&catalog, id, catalog.node(Division, "TOPW"))
        .await
        .unwrap();
    session
        .refresh_specification(&catalog, id, FetchErrorPolicy::Unfiltered)
        .await
        .unwrap();

    session.clear_level(id, Division).unwrap();
    assert!(session.line(id).unwrap().candidates.is_none());

    session
        .refresh_specification(&catalog, id, FetchErrorPolicy::Unfiltered)
        .await
        .unwrap();
    assert!(session.line(id).unwrap().candidates.is_some());

    session
        .select_search_match(&catalog, id, catalog.node(Class, "JEAN"))
        .await
        .unwrap();
    let entry = session.line(id).unwrap();
    assert_eq!(entry.cascade.effective_code(), "JEAN");
    assert!(entry.candidates.is_none());
}

async fn line_under_apparel(catalog: &MemoryCatalog) -> (DocumentSession, u64) {
    let mut session = DocumentSession::load(catalog).await;
    let id = session.add_line(tee());
    session
        .select_level(catalog, id, catalog.node(Category, "APRL"))
        .await
        .unwrap();
    (session, id)
}

fn assert_untouched(session: &DocumentSession, id: u64) {
    let cascade = &session.line(id).unwrap().cascade;
    assert_eq!(cascade.effective_code(), "APRL");
    assert_eq!(codes(cascade.candidates(SubCategory)), vec!["MENS", "WMNS"]);
}

#[tokio::test]
async fn search_match_with_missing_ancestor_is_rejected() {
    let catalog = MemoryCatalog::apparel().with_node(CategoryNode::new(
        Division,
        "ORPH",
        "Orphaned",
        Some("GONE"),
    ));
    let (mut session, id) = line_under_apparel(&catalog).await;

    let err = session
        .select_search_match(&catalog, id, catalog.node(Division, "ORPH"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Selection(SelectionError::AncestorNotFound { level: SubCategory, ref code })
            if code == "GONE"
    ));
    assert_untouched(&session, id);
}

#[tokio::test]
async fn search_match_without_parent_code_is_rejected() {
    let catalog = MemoryCatalog::apparel()
        .with_node(CategoryNode::new(Class, "LOST", "Unlinked", None));
    let (mut session, id) = line_under_apparel(&catalog).await;

    let err = session
        .select_search_match(&catalog, id, catalog.node(Class, "LOST"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Selection(SelectionError::AncestorNotFound { level: Division, .. })
    ));
    assert_untouched(&session, id);
}

#[tokio::test]
async fn search_match_fails_when_ancestor_lookup_fails() {
    let catalog = MemoryCatalog::apparel();
    let (mut session, id) = line_under_apparel(&catalog).await;
    catalog.fail_lookups();

    let err = session
        .select_search_match(&catalog, id, catalog.node(Class, "TSHT"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Selection(SelectionError::AncestorNotFound { level: Division, ref code })
            if code == "TOPW"
    ));
    assert_untouched(&session, id);
}
