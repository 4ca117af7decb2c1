mod support;

use support::page;
use tandem_dom::parse::parse_document;
use tandem_dom::{DiffOp, Node, Patch};
use tandem_mirror::browser::FRAME_PATH_SEPARATOR;
use tandem_mirror::protocol::ServerEvent;
use tandem_mirror::DiffEngine;

fn replay(base: &str, patch: &Patch) -> String {
    let mut tree: Node = parse_document(base).body_node();
    patch.apply(&mut tree).expect("patch applies");
    tree.to_markup()
}

#[test]
fn identical_captures_produce_no_batch() {
    let mut engine = DiffEngine::new();
    let capture = page("<html><head><title>t</title></head><body><p>a</p></body></html>", &[]);
    assert!(engine.cycle(&capture).is_some());
    assert!(engine.cycle(&capture).is_none());
    assert!(engine.cycle(&capture.clone()).is_none());
}

#[test]
fn first_capture_inserts_every_body_child() {
    let mut engine = DiffEngine::new();
    let batch = engine
        .cycle(&page("<body><h1>Hi</h1><p>there</p><!--c--></body>", &[]))
        .unwrap();
    let body = batch.main.unwrap().bodydiv.unwrap();
    assert_eq!(body.len(), 3);
    assert!(body
        .ops()
        .iter()
        .all(|op| matches!(op, DiffOp::AddElement { .. })));
}

#[test]
fn head_only_changes_leave_bodydiv_absent() {
    let mut engine = DiffEngine::new();
    engine.cycle(&page("<head><title>a</title></head><body>x</body>", &[]));
    let batch = engine
        .cycle(&page("<head><title>b</title></head><body>x</body>", &[]))
        .unwrap();
    let main = batch.main.unwrap();
    assert!(main.head.is_some());
    assert!(main.bodydiv.is_none());
    assert!(batch.iframes.is_empty());
}

#[test]
fn script_content_never_reaches_the_client() {
    let mut engine = DiffEngine::new();
    let batch = engine
        .cycle(&page(
            "<head><script>steal()</script></head><body><script src=\"a.js\"></script><p>ok</p></body>",
            &[],
        ))
        .unwrap();
    let json = ServerEvent::DomChanges(batch).to_json().unwrap();
    assert!(!json.contains("steal"));
    assert!(!json.contains("script"));
    assert!(json.contains("ok"));
}

#[test]
fn invalid_attribute_names_are_filtered() {
    let mut engine = DiffEngine::new();
    let batch = engine
        .cycle(&page(
            "<body><div :class=\"x\" @click=\"y\" data-id=\"1\">z</div></body>",
            &[],
        ))
        .unwrap();
    let json = ServerEvent::DomChanges(batch).to_json().unwrap();
    assert!(json.contains("data-id"));
    assert!(!json.contains(":class"));
    assert!(!json.contains("@click"));
}

#[test]
fn new_frame_gets_a_full_entry_and_old_frames_track_independently() {
    let mut engine = DiffEngine::new();
    let main = "<body><iframe id=\"a\"></iframe><iframe id=\"b\"></iframe></body>";

    let first = engine
        .cycle(&page(main, &[("#a", "<head><title>A</title></head><body>one</body>")]))
        .unwrap();
    assert!(first.main.is_some());
    assert_eq!(first.iframes.len(), 1);
    assert_eq!(first.iframes[0].selector, "#a");

    let second = engine
        .cycle(&page(
            main,
            &[
                ("#a", "<head><title>A</title></head><body>one</body>"),
                ("#b", "<head><title>B</title></head><body>two</body>"),
            ],
        ))
        .unwrap();
    assert!(second.main.is_none());
    assert_eq!(second.iframes.len(), 1);
    let frame = &second.iframes[0];
    assert_eq!(frame.selector, "#b");
    assert!(frame.changes.head.is_some());
    assert!(frame.changes.bodydiv.is_some());
    assert_eq!(
        replay("<body></body>", frame.changes.bodydiv.as_ref().unwrap()),
        "<body>two</body>"
    );

    let third = engine
        .cycle(&page(
            main,
            &[
                ("#a", "<head><title>A</title></head><body>one!</body>"),
                ("#b", "<head><title>B</title></head><body>two</body>"),
            ],
        ))
        .unwrap();
    assert_eq!(third.iframes.len(), 1);
    assert_eq!(third.iframes[0].selector, "#a");
    assert!(third.iframes[0].changes.head.is_none());
    assert_eq!(engine.frame_count(), 2);
}

#[test]
fn absent_frames_keep_their_baseline() {
    let mut engine = DiffEngine::new();
    engine.cycle(&page("<body></body>", &[("#f", "<body>kept</body>")]));
    assert!(engine.cycle(&page("<body></body>", &[])).is_none());
    assert_eq!(engine.frame("#f").unwrap().body.markup(), "<body>kept</body>");
    assert!(engine
        .cycle(&page("<body></body>", &[("#f", "<body>kept</body>")]))
        .is_none());
}

#[test]
fn frames_within_frames_are_tracked_under_their_full_path() {
    let mut engine = DiffEngine::new();
    let nested = format!("#outer{FRAME_PATH_SEPARATOR}iframe:nth-of-type(1)");
    let outer = "<body><iframe></iframe></body>";

    let first = engine
        .cycle(&page(
            "<body><iframe id=\"outer\"></iframe></body>",
            &[("#outer", outer), (nested.as_str(), "<body>deep</body>")],
        ))
        .unwrap();
    let order: Vec<_> = first.iframes.iter().map(|f| f.selector.as_str()).collect();
    assert_eq!(order, ["#outer", nested.as_str()]);
    assert_eq!(
        replay("<body></body>", first.iframes[1].changes.bodydiv.as_ref().unwrap()),
        "<body>deep</body>"
    );

    let second = engine
        .cycle(&page(
            "<body><iframe id=\"outer\"></iframe></body>",
            &[("#outer", outer), (nested.as_str(), "<body>deeper</body>")],
        ))
        .unwrap();
    assert!(second.main.is_none());
    assert_eq!(second.iframes.len(), 1);
    assert_eq!(second.iframes[0].selector, nested);
    assert_eq!(engine.frame_count(), 2);
}

#[test]
fn frames_follow_discovery_order() {
    let mut engine = DiffEngine::new();
    let batch = engine
        .cycle(&page(
            "<body></body>",
            &[("#z", "<body>z</body>"), ("#a", "<body>a</body>"), ("#m", "<body>m</body>")],
        ))
        .unwrap();
    let order: Vec<_> = batch.iframes.iter().map(|f| f.selector.as_str()).collect();
    assert_eq!(order, ["#z", "#a", "#m"]);
}

#[test]
fn successive_batches_replay_on_the_client_copy() {
    let mut engine = DiffEngine::new();
    let mut client = parse_document("<body></body>").body_node();
    let pages = [
        "<body><ul><li>1</li></ul></body>",
        "<body class=\"x\"><ul><li>0</li><li>1</li></ul><p>n</p></body>",
        "<body><p>n</p></body>",
    ];
    for markup in pages {
        if let Some(body) = engine.cycle(&page(markup, &[])).and_then(|b| b.main?.bodydiv) {
            body.apply(&mut client).unwrap();
        }
        assert_eq!(client.to_markup(), parse_document(markup).body_node().to_markup());
    }
}
