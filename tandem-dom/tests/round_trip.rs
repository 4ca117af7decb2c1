use proptest::prelude::*;
use tandem_dom::diff::diff;
use tandem_dom::parse::parse_document;
use tandem_dom::{DiffOp, Element, Node};

fn replay(old: &Node, new: &Node) -> Node {
    let mut tree = old.clone();
    diff(old, new).apply(&mut tree).expect("patch applies");
    tree
}

#[test]
fn empty_baseline_diff_inserts_every_child() {
    let empty = parse_document("<head></head><body></body>");
    let page = parse_document(
        "<html><head><title>Inbox</title><meta charset=\"utf-8\"></head>\
         <body><header>top</header><main><p>hello</p></main><!--end--></body></html>",
    );

    let head = diff(&empty.head_node(), &page.head_node());
    assert_eq!(head.len(), page.head.children.len());
    assert!(head
        .ops()
        .iter()
        .all(|op| matches!(op, DiffOp::AddElement { .. })));

    let body = diff(&empty.body_node(), &page.body_node());
    assert_eq!(body.len(), page.body.children.len());
    for (i, op) in body.ops().iter().enumerate() {
        match op {
            DiffOp::AddElement { route, element } => {
                assert_eq!(route, &vec![i]);
                assert_eq!(element, &page.body.children[i]);
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    assert_eq!(
        replay(&empty.body_node(), &page.body_node()).to_markup(),
        page.body.to_markup()
    );
}

#[test]
fn realistic_page_transitions_round_trip() {
    let steps = [
        "<body><div id=\"app\"><form><input name=\"q\"><button>Go</button></form></div></body>",
        "<body><div id=\"app\" class=\"busy\"><form><input name=\"q\" value=\"rust\"><button disabled=\"\">Go</button></form><ul><li>1</li></ul></div></body>",
        "<body><div id=\"app\"><ul><li>0</li><li>1</li><li>2</li></ul><p>3 results</p></div></body>",
        "<body><section><ul><li>2</li></ul></section><!--x--></body>",
    ];
    for pair in steps.windows(2) {
        let old = parse_document(pair[0]).body_node();
        let new = parse_document(pair[1]).body_node();
        assert_eq!(replay(&old, &new).to_markup(), new.to_markup());
    }
}

fn arb_node() -> impl Strategy<Value = Node> {
    let leaf = prop_oneof![
        "[a-c ]{0,4}".prop_map(Node::text),
        "[a-c]{0,3}".prop_map(Node::comment),
    ];
    leaf.prop_recursive(4, 32, 5, |inner| {
        (
            prop_oneof![Just("div"), Just("span"), Just("p")],
            prop::collection::vec(("[a-d]", "[0-2]"), 0..3),
            prop::collection::vec(inner, 0..5),
        )
            .prop_map(|(tag, attrs, children)| {
                let mut el = Element::new(tag);
                for (k, v) in attrs {
                    el.attributes.set(k, v);
                }
                el.children = children;
                Node::Element(el)
            })
    })
}

fn arb_root() -> impl Strategy<Value = Node> {
    prop::collection::vec(arb_node(), 0..6).prop_map(|children| {
        let mut body = Element::new("body");
        body.children = children;
        Node::Element(body)
    })
}

proptest! {
    #[test]
    fn applying_the_diff_reproduces_the_new_tree(old in arb_root(), new in arb_root()) {
        let out = replay(&old, &new);
        prop_assert_eq!(out.to_markup(), new.to_markup());
        prop_assert_eq!(out, new);
    }

    #[test]
    fn a_tree_diffed_against_itself_is_empty(tree in arb_root()) {
        prop_assert!(diff(&tree, &tree.clone()).is_empty());
    }
}
