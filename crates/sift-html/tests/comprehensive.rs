//! Parsing tests for sift-html

use sift_html::{HtmlParser, parse};

#[test]
fn test_parse_minimal_html() {
    let doc = parse("");
    assert!(doc.body().is_valid(), "html5ever always synthesizes a body");
}

#[test]
fn test_attributes_and_classes_survive() {
    let html = r#"<div data-id="urn:li:activity:1" class="feed-shared-update-v2 artdeco-card">
        <span aria-hidden="true">Promoted</span>
    </div>"#;
    let doc = parse(html);
    let tree = doc.tree();
    let div = tree
        .elements()
        .find(|&e| tree.tag_name(e) == Some("div"))
        .unwrap();

    assert_eq!(tree.get_attribute(div, "data-id"), Some("urn:li:activity:1"));
    assert!(tree.has_class(div, "feed-shared-update-v2"));
    assert!(tree.has_class(div, "artdeco-card"));
    assert_eq!(tree.rendered_text(div), "Promoted");
}

#[test]
fn test_inline_whitespace_separates_words() {
    let doc = parse("<p><b>Hello</b> <i>world</i></p>");
    assert_eq!(doc.tree().rendered_text(doc.body()), "Hello world");
}

#[test]
fn test_parse_malformed_html() {
    let html = "<div><p>Unclosed paragraph<span>Unclosed span</div><p>after";
    let doc = parse(html);
    let text = doc.tree().rendered_text(doc.body());
    assert!(text.contains("Unclosed paragraph"));
    assert!(text.ends_with("after"));
}

#[test]
fn test_fragment_appended_under_parent() {
    let mut doc = parse(r#"<main id="feed"></main>"#);
    let feed = doc.get_element_by_id("feed").unwrap();
    let tree = doc.tree_mut();
    tree.observe(true);

    let roots = HtmlParser::new()
        .parse_fragment_into(tree, feed, "<div>one</div> <div>two</div>")
        .unwrap();

    // Two elements plus the separating whitespace text node.
    assert_eq!(roots.len(), 3);
    let elements: Vec<_> = tree.element_children(feed).collect();
    assert_eq!(elements, vec![roots[0], roots[2]]);
    assert_eq!(tree.rendered_text(feed), "one\ntwo");

    let records = tree.take_records();
    let top_level: Vec<_> = records
        .iter()
        .filter(|r| r.target == feed)
        .flat_map(|r| r.added_nodes.iter().copied())
        .collect();
    assert_eq!(top_level, roots);
}
