//! Classification engine tests over parsed feeds

use sift_engine::{
    Catalog, ChangeBatch, ChangeFeed, Engine, EngineConfig, Mode, RuleStatus, StoredOptions, AI_CLEAN, AI_FLAGGED,
};
use sift_html::{parse, Document, HtmlParser, NodeId};

const CATALOG: &str = r##"[{"group": "Test", "settings": [
    {"id": "promoted", "selector": "${POST_SELECTOR}:has(span[aria-hidden=\"true\"]:contains(/^Promoted/))", "status": true},
    {"id": "likes", "selector": "${POST_SELECTOR}:has(span.update-components-header__text-view:contains(/likes* this/))", "status": true},
    {"id": "hiring", "selector": "${POST_SELECTOR}:contains('hiring')", "class": "sift-highlight", "color": "#0078D4", "status": true},
    {"id": "ai", "status": false}
]}]"##;

const FEED: &str = r#"<main id="feed">
  <div data-id="urn:li:activity:1"><div class="feed-shared-update-v2">
    <span class="update-components-header__text-view">Jane likes this</span>
    <div class="update-components-update-v2__commentary"><span class="tvm-parent-container">Plain words from a person. Nothing else to say here today, really.</span></div>
  </div></div>
  <div data-id="urn:li:activity:2"><div class="feed-shared-update-v2">
    <span aria-hidden="true">Promoted</span>
    <div class="update-components-update-v2__commentary"><span class="tvm-parent-container">Here are 5 tips to improve your impact—follow me!</span></div>
  </div></div>
  <div data-id="urn:li:activity:3"><div class="feed-shared-update-v2" style="margin: 0">
    <p>We are hiring engineers</p>
  </div></div>
</main>"#;

fn engine() -> Engine {
    let config = EngineConfig::default();
    let catalog = Catalog::from_json(CATALOG, &config).unwrap();
    Engine::new(config, catalog).unwrap()
}

fn posts(doc: &Document) -> Vec<NodeId> {
    let tree = doc.tree();
    tree.elements().filter(|&e| tree.has_class(e, "feed-shared-update-v2")).collect()
}

fn snapshot(doc: &Document, node: NodeId) -> (Option<String>, Option<String>, Option<String>) {
    let tree = doc.tree();
    (
        tree.get_attribute(node, "class").map(String::from),
        tree.get_attribute(node, "style").map(String::from),
        tree.get_attribute(node, "data-sift").map(String::from),
    )
}

#[test]
fn test_full_pass_classifies_posts() {
    let mut doc = parse(FEED);
    let mut engine = engine();
    let options = StoredOptions::defaults(engine.catalog());

    let report = engine.apply_options(doc.tree_mut(), &options);
    assert!(report.purged.is_empty());
    assert_eq!(report.batch.classified, 3);
    assert_eq!(report.batch.errors, 0);

    let posts = posts(&doc);
    let tree = doc.tree();
    assert!(tree.has_class(posts[0], "sift-dim"));
    assert_eq!(tree.get_attribute(posts[0], "data-sift"), Some("likes"));
    assert!(tree.has_class(posts[1], "sift-dim"));
    assert_eq!(tree.get_attribute(posts[1], "data-sift"), Some("promoted"));
    assert!(tree.has_class(posts[2], "sift-highlight"));
    assert!(!tree.has_class(posts[2], "sift-dim"));
    assert_eq!(tree.style_property(posts[2], "color"), Some("#0078D4"));
    assert_eq!(tree.get_attribute(posts[2], "data-sift"), Some("hiring"));
}

#[test]
fn test_second_pass_writes_nothing() {
    let mut doc = parse(FEED);
    let mut engine = engine();
    let options = StoredOptions::defaults(engine.catalog());
    engine.apply_options(doc.tree_mut(), &options);

    let generation = doc.tree().generation();
    let report = engine.process_batch(doc.tree_mut(), &ChangeBatch::navigation());
    assert_eq!(report.classified, 0);
    assert_eq!(report.reverted, 0);
    assert_eq!(doc.tree().generation(), generation);
}

#[test]
fn test_disable_restores_node_exactly() {
    let mut doc = parse(FEED);
    let mut engine = engine();
    let post = posts(&doc)[2];
    let before = snapshot(&doc, post);

    let mut options = StoredOptions::defaults(engine.catalog());
    engine.apply_options(doc.tree_mut(), &options);
    assert_ne!(snapshot(&doc, post), before);

    options.disable_rule("hiring").unwrap();
    let report = engine.apply_options(doc.tree_mut(), &options);
    assert_eq!(report.reverted, 1);
    assert_eq!(snapshot(&doc, post), before);
    assert!(engine.record().get(post).is_none());
}

#[test]
fn test_last_rule_names_node_after_reenable() {
    let config = EngineConfig::default();
    let catalog = Catalog::from_json(
        r#"[{"group": "g", "settings": [
            {"id": "first", "selector": "${POST_SELECTOR}:contains('hiring')", "status": true},
            {"id": "second", "selector": "${POST_SELECTOR}:has(p)", "status": true}
        ]}]"#,
        &config,
    )
    .unwrap();
    let mut engine = Engine::new(config, catalog).unwrap();
    let mut doc = parse(FEED);
    let post = posts(&doc)[2];
    let mut options = StoredOptions::defaults(engine.catalog());

    engine.apply_options(doc.tree_mut(), &options);
    assert_eq!(doc.tree().get_attribute(post, "data-sift"), Some("second"));

    options.disable_rule("first").unwrap();
    engine.apply_options(doc.tree_mut(), &options);
    assert_eq!(doc.tree().get_attribute(post, "data-sift"), Some("second"));

    options.set_status("first", RuleStatus::Enabled).unwrap();
    let report = engine.apply_options(doc.tree_mut(), &options);
    assert_eq!(report.errors, 0);
    assert_eq!(doc.tree().get_attribute(post, "data-sift"), Some("second"));
    let order: Vec<&str> = engine.record().get(post).unwrap().entries.iter().map(|e| e.rule_id.as_str()).collect();
    assert_eq!(order, vec!["first", "second"]);
}

#[test]
fn test_mode_swap_keeps_attribute() {
    let mut doc = parse(FEED);
    let mut engine = engine();
    let options = StoredOptions::defaults(engine.catalog());
    engine.apply_options(doc.tree_mut(), &options);
    let posts = posts(&doc);

    let report = engine.set_mode(doc.tree_mut(), Mode::Extreme);
    assert_eq!(report.candidates, 0, "swapping classes does not re-match");
    let tree = doc.tree();
    for &post in &posts[..2] {
        assert!(tree.has_class(post, "sift-remove"));
        assert!(!tree.has_class(post, "sift-dim"));
    }
    assert_eq!(tree.get_attribute(posts[0], "data-sift"), Some("likes"));
    assert!(tree.has_class(posts[2], "sift-highlight"));

    engine.set_mode(doc.tree_mut(), Mode::Off);
    let tree = doc.tree();
    assert!(engine.record().is_empty());
    assert!(posts.iter().all(|&p| tree.get_attribute(p, "data-sift").is_none()));
    assert!(!tree.has_class(posts[0], "sift-remove"));

    let report = engine.set_mode(doc.tree_mut(), Mode::Normal);
    assert_eq!(report.classified, 3);
    assert!(doc.tree().has_class(posts[0], "sift-dim"));
}

#[test]
fn test_off_mode_in_options_reverts() {
    let mut doc = parse(FEED);
    let mut engine = engine();
    let mut options = StoredOptions::defaults(engine.catalog());
    engine.apply_options(doc.tree_mut(), &options);

    options.mode = Mode::Off;
    let report = engine.apply_options(doc.tree_mut(), &options);
    assert_eq!(report.reverted, 3);
    assert_eq!(report.batch.candidates, 0);
    assert_eq!(engine.mode(), Mode::Off);
}

#[test]
fn test_delete_reports_purge() {
    let mut doc = parse(FEED);
    let mut engine = engine();
    let mut options = StoredOptions::defaults(engine.catalog());
    engine.apply_options(doc.tree_mut(), &options);

    options.mark_for_deletion("hiring").unwrap();
    let report = engine.apply_options(doc.tree_mut(), &options);
    assert_eq!(report.purged, vec!["hiring".to_string()]);
    assert!(engine.rule("hiring").is_none());
    assert!(!doc.tree().has_class(posts(&doc)[2], "sift-highlight"));

    options.purge(&report.purged);
    assert!(options.get("hiring").is_none());
}

#[test]
fn test_scorer_runs_once_per_post() {
    let mut doc = parse(FEED);
    let mut engine = engine();
    let mut options = StoredOptions::defaults(engine.catalog());
    options.set_status("ai", RuleStatus::Enabled).unwrap();

    let report = engine.apply_options(doc.tree_mut(), &options);
    assert_eq!(report.batch.scored, 2);

    let posts = posts(&doc);
    let tree = doc.tree();
    assert_eq!(tree.get_attribute(posts[0], "data-sift-ai-check"), Some(AI_CLEAN));
    assert_eq!(tree.get_attribute(posts[1], "data-sift-ai-check"), Some(AI_FLAGGED));
    assert_eq!(tree.get_attribute(posts[2], "data-sift-ai-check"), None, "no post text, no marker");
    assert!(tree.has_class(posts[1], "sift-ai"));
    assert!(!tree.has_class(posts[0], "sift-ai"));
    assert_eq!(tree.get_attribute(posts[1], "data-sift"), Some("ai"));

    let again = engine.process_batch(doc.tree_mut(), &ChangeBatch::navigation());
    assert_eq!(again.scored, 0);

    // Disabling keeps the marker; re-enabling trusts it
    options.disable_rule("ai").unwrap();
    engine.apply_options(doc.tree_mut(), &options);
    assert!(!doc.tree().has_class(posts[1], "sift-ai"));
    assert_eq!(doc.tree().get_attribute(posts[1], "data-sift"), Some("promoted"));
    assert_eq!(doc.tree().get_attribute(posts[1], "data-sift-ai-check"), Some(AI_FLAGGED));

    options.set_status("ai", RuleStatus::Enabled).unwrap();
    let report = engine.apply_options(doc.tree_mut(), &options);
    assert_eq!(report.batch.scored, 0);
    assert!(doc.tree().has_class(posts[1], "sift-ai"));
}

#[test]
fn test_broken_rules_do_not_stop_others() {
    let config = EngineConfig::default();
    let catalog = Catalog::from_json(
        r#"[{"group": "g", "settings": [
            {"id": "unterminated", "selector": "${POST_SELECTOR}:contains('x)", "status": true},
            {"id": "unsupported", "selector": "div::before", "status": true},
            {"id": "blank", "selector": "", "status": true},
            {"id": "likes", "selector": "${POST_SELECTOR}:has(span:contains(/likes this/))", "status": true}
        ]}]"#,
        &config,
    )
    .unwrap();
    let mut engine = Engine::new(config, catalog).unwrap();
    let mut doc = parse(FEED);
    let options = StoredOptions::defaults(engine.catalog());

    let report = engine.apply_options(doc.tree_mut(), &options);
    assert_eq!(report.invalid, vec!["unterminated".to_string()]);
    assert_eq!(report.batch.errors, 1);
    assert_eq!(report.batch.classified, 1);
    assert!(engine.rule("blank").is_none());
    assert!(doc.tree().has_class(posts(&doc)[0], "sift-dim"));
}

#[test]
fn test_incremental_batch() {
    let mut doc = parse(FEED);
    let mut engine = engine();
    let options = StoredOptions::defaults(engine.catalog());
    engine.apply_options(doc.tree_mut(), &options);

    let feed_root = doc.get_element_by_id("feed").unwrap();
    let mut changes = ChangeFeed::new();
    doc.tree_mut().observe(true);
    assert!(changes.poll(doc.tree_mut(), "https://www.linkedin.com/feed/").navigation_changed);

    let roots = HtmlParser::new()
        .parse_fragment_into(
            doc.tree_mut(),
            feed_root,
            r#"<div data-id="urn:li:activity:4"><div class="feed-shared-update-v2"><span aria-hidden="true">Promoted by a brand</span></div></div>"#,
        )
        .unwrap();
    let batch = changes.poll(doc.tree_mut(), "https://www.linkedin.com/feed/");
    assert!(batch.added.contains(&roots[0]));

    let total = doc.tree().elements().count();
    let report = engine.process_batch(doc.tree_mut(), &batch);
    assert_eq!(report.candidates, 3);
    assert!(report.candidates < total);
    assert_eq!(report.classified, 1);

    let new_post = posts(&doc)[3];
    assert_eq!(doc.tree().get_attribute(new_post, "data-sift"), Some("promoted"));
}

#[test]
fn test_reevaluated_node_that_stops_matching_is_reverted() {
    let mut doc = parse(FEED);
    let mut engine = engine();
    let options = StoredOptions::defaults(engine.catalog());
    engine.apply_options(doc.tree_mut(), &options);

    let post = posts(&doc)[2];
    let before_text = doc.tree().element_children(post).next().unwrap();
    let tree = doc.tree_mut();
    tree.detach(before_text).unwrap();
    let p = tree.create_element("p");
    let text = tree.create_text("We are not looking for anyone");
    tree.append_child(p, text).unwrap();
    tree.append_child(post, p).unwrap();

    let report = engine.process_batch(doc.tree_mut(), &ChangeBatch::added([post]));
    assert_eq!(report.reverted, 1);
    let tree = doc.tree();
    assert!(!tree.has_class(post, "sift-highlight"));
    assert_eq!(tree.get_attribute(post, "style"), Some("margin: 0"));
    assert_eq!(tree.get_attribute(post, "data-sift"), None);
}

#[test]
fn test_noise_ratio() {
    let mut html = String::from("<main>");
    for i in 0..10 {
        let header = if i < 3 { "Promoted" } else { "Posted" };
        html.push_str(&format!(
            r#"<div data-id="urn:li:activity:{i}"><div class="feed-shared-update-v2"><span aria-hidden="true">{header}</span></div></div>"#
        ));
    }
    html.push_str("</main>");

    let mut doc = parse(&html);
    let mut engine = engine();
    assert_eq!(engine.noise_ratio(doc.tree()), 0);

    let options = StoredOptions::defaults(engine.catalog());
    engine.apply_options(doc.tree_mut(), &options);
    assert_eq!(engine.noise_ratio(doc.tree()), 30);
}

#[test]
fn test_bundled_catalog_runs() {
    let mut doc = parse(FEED);
    let mut engine = Engine::with_defaults().unwrap();
    let options = StoredOptions::defaults(engine.catalog());
    let report = engine.apply_options(doc.tree_mut(), &options);
    assert_eq!(report.batch.errors, 0);
    assert!(report.invalid.is_empty());
    assert_eq!(doc.tree().get_attribute(posts(&doc)[1], "data-sift"), Some("promoted"));
}
