//! Tree construction, mutation and traversal through the handle API.

use pagedom::{Document, Node, NodeKind, ParseOptions, TreeWalker};

#[test]
fn building_a_tree_by_hand() {
    let doc = Document::new();
    let root = doc.root();
    assert_eq!(root.kind(), Some(NodeKind::Document));

    let a = root.append_element("a");
    assert!(!a.is_empty());
    assert_eq!(a.name(), "a");
    assert_eq!(a.parent(), root);

    let b = a.append_element("b");
    let id = b.append_attribute("id");
    assert!(id.set_value("1"));
    assert_eq!(b.attribute("id").value(), "1");

    let text = b.append_child(NodeKind::Pcdata);
    assert!(text.set_value("hello"));
    assert_eq!(b.child_value(), "hello");

    assert_eq!(a.first_child(), b);
    assert_eq!(a.last_child(), b);
    assert_eq!(b.path('/'), "/a/b");
}

#[test]
fn structural_rules_are_enforced() {
    let doc = Document::new();
    let root = doc.root();
    let elem = root.append_element("elem");
    let text = elem.append_child(NodeKind::Pcdata);

    // Text cannot have children, nothing can hold another document root,
    // and doctype/declaration only live at document level.
    assert!(text.append_child(NodeKind::Element).is_empty());
    assert!(elem.append_child(NodeKind::Document).is_empty());
    assert!(elem.append_child(NodeKind::Doctype).is_empty());
    assert!(elem.append_child(NodeKind::Declaration).is_empty());
    assert!(!root.append_child(NodeKind::Doctype).is_empty());

    // Name/value rules per kind.
    assert!(!text.set_name("nope"));
    assert!(!elem.set_value("nope"));
    assert!(elem.set_name("renamed"));
    assert_eq!(elem.name(), "renamed");
}

#[test]
fn sibling_insertion_and_ordering() {
    let doc = Document::new();
    let root = doc.root().append_element("root");
    let b = root.append_element("b");
    let d = root.append_element("d");
    let a = root.insert_element_before("a", b);
    let c = root.insert_element_after("c", b);

    let names: Vec<&str> = root.children().map(|n| n.name()).collect();
    assert_eq!(names, ["a", "b", "c", "d"]);

    assert_eq!(a.next_sibling(), b);
    assert_eq!(b.previous_sibling(), a);
    assert_eq!(d.previous_sibling(), c);
    assert!(a.previous_sibling().is_empty());
    assert!(d.next_sibling().is_empty());
}

#[test]
fn insertion_with_foreign_anchor_is_rejected() {
    let doc = Document::new();
    let root = doc.root();
    let one = root.append_element("one");
    let two = root.append_element("two");
    let inner = one.append_element("inner");

    // `inner` is not a child of `two`: nothing is inserted.
    assert!(two.insert_element_before("x", inner).is_empty());
    assert!(two.insert_child_after(NodeKind::Element, inner).is_empty());
    assert_eq!(two.children().count(), 0);

    // An attribute anchor from another node is rejected the same way.
    let attr = one.append_attribute("key");
    assert!(two.insert_attribute_before("x", attr).is_empty());
    assert!(two.first_attribute().is_empty());
}

#[test]
fn removal_drops_the_subtree() {
    let doc = Document::new();
    let root = doc.root().append_element("root");
    let a = root.append_element("a");
    let b = a.append_element("b");
    b.append_element("c");

    assert!(root.remove_child(a));
    assert!(root.first_child().is_empty());

    // Removing something that is not a child fails.
    let other = root.append_element("other");
    let grandchild = other.append_element("inner");
    assert!(!root.remove_child(grandchild));
    assert!(root.remove_child_by_name("other"));
}

#[test]
fn attribute_list_manipulation() {
    let doc = Document::new();
    let node = doc.root().append_element("node");
    let b = node.append_attribute("b");
    let a = node.prepend_attribute("a");
    let c = node.insert_attribute_after("c", b);

    let names: Vec<&str> = node.attributes().map(|a| a.name()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    assert_eq!(a.next_attribute(), b);
    assert_eq!(c.previous_attribute(), b);

    assert!(node.remove_attribute_by_name("b"));
    let names: Vec<&str> = node.attributes().map(|a| a.name()).collect();
    assert_eq!(names, ["a", "c"]);
    assert!(!node.remove_attribute_by_name("b"));
}

#[test]
fn typed_attribute_values() {
    let doc = Document::new();
    let node = doc.root().append_element("node");

    let attr = node.append_attribute("n");
    assert!(attr.set_value(42i64));
    assert_eq!(attr.value(), "42");
    assert_eq!(attr.as_int(), 42);
    assert_eq!(attr.as_uint(), 42);

    assert!(attr.set_value(1.5f64));
    assert_eq!(attr.as_double(), 1.5);

    assert!(attr.set_value(true));
    assert_eq!(attr.value(), "true");
    assert!(attr.as_bool());
    assert!(attr.set_value("Yes"));
    assert!(attr.as_bool());
    assert!(attr.set_value("no"));
    assert!(!attr.as_bool());

    // Garbage parses to zero, not a panic.
    assert!(attr.set_value("not a number"));
    assert_eq!(attr.as_int(), 0);
    assert_eq!(attr.as_double(), 0.0);
}

#[test]
fn deep_copy_is_independent() {
    let mut doc = Document::new();
    doc.load_str(
        "<src base='1'><inner>text</inner></src>",
        ParseOptions::default(),
    );
    let src = doc.document_element();

    let dest = doc.root().append_element("dest");
    let copy = dest.append_copy(src);
    assert!(!copy.is_empty());
    assert_eq!(copy.name(), "src");
    assert_eq!(copy.attribute("base").value(), "1");
    assert_eq!(copy.child("inner").child_value(), "text");

    // Mutating the copy leaves the source untouched.
    assert!(copy.child("inner").first_child().set_value("changed"));
    copy.attribute("base").set_value("2");
    assert_eq!(src.child("inner").child_value(), "text");
    assert_eq!(src.attribute("base").value(), "1");
}

#[test]
fn copying_across_documents() {
    let mut source = Document::new();
    source.load_str("<data key='v'><row/><row/></data>", ParseOptions::default());

    let dest = Document::new();
    let copied = dest.root().append_copy(source.document_element());
    assert_eq!(copied.name(), "data");
    assert_eq!(copied.children().count(), 2);

    // The copy owns its strings: it survives the source being dropped.
    drop(source);
    assert_eq!(copied.attribute("key").value(), "v");
}

#[test]
fn copying_a_node_into_its_own_subtree_terminates() {
    let doc = Document::new();
    let outer = doc.root().append_element("outer");
    outer.append_element("inner");

    // The fresh copy lives inside `outer` but must not be copied into
    // itself.
    let copy = outer.append_copy(outer);
    assert!(!copy.is_empty());
    assert_eq!(copy.name(), "outer");
    assert_eq!(copy.children().count(), 1);
    assert_eq!(outer.children().count(), 2);
}

#[test]
fn navigation_helpers() {
    let mut doc = Document::new();
    doc.load_str(
        "<root><item k='1'/><gap/><item k='2'/></root>",
        ParseOptions::default(),
    );
    let root = doc.document_element();

    let first = root.child("item");
    assert_eq!(first.attribute("k").value(), "1");
    let second = first.next_sibling_named("item");
    assert_eq!(second.attribute("k").value(), "2");
    assert_eq!(second.previous_sibling_named("item"), first);
    assert!(second.next_sibling_named("item").is_empty());

    assert_eq!(root.find_child_by_attribute("k", "2"), second);
    assert_eq!(root.find_child_by_name_and_attribute("item", "k", "1"), first);
    assert!(root.find_child_by_name_and_attribute("gap", "k", "1").is_empty());

    let deep = root.find_node(|n| n.attribute("k").value() == "2");
    assert_eq!(deep, second);
    assert_eq!(first.root(), doc.root());
}

#[test]
fn paths_resolve_and_roundtrip() {
    let mut doc = Document::new();
    doc.load_str(
        "<a><b><c/></b><b><d/></b></a>",
        ParseOptions::default(),
    );
    let root = doc.root();

    let d = root.first_element_by_path("/a/b/d", '/');
    assert!(!d.is_empty());
    assert_eq!(d.name(), "d");
    // The first `b` has no `d`; path search backtracks to the second.
    assert_eq!(d.parent(), root.child("a").child("b").next_sibling());

    assert_eq!(d.path('/'), "/a/b/d");
    assert_eq!(root.first_element_by_path(&d.path('/'), '/'), d);

    let c = d.first_element_by_path("../../b/c", '/');
    assert_eq!(c.name(), "c");
    assert_eq!(d.first_element_by_path(".", '/'), d);
    assert!(root.first_element_by_path("/a/nope", '/').is_empty());
}

#[test]
fn empty_handle_chains_are_safe() {
    let doc = Document::new();
    let missing = doc.root().child("missing");
    assert!(missing.is_empty());
    assert_eq!(missing.kind(), None);
    assert_eq!(missing.name(), "");
    assert_eq!(missing.value(), "");
    assert!(missing.child("deeper").first_child().parent().is_empty());
    assert!(missing.attribute("x").is_empty());
    assert_eq!(missing.children().count(), 0);

    // Mutations on the empty handle fail quietly.
    assert!(missing.append_element("x").is_empty());
    assert!(!missing.set_name("x"));
    assert!(!missing.remove_child_by_name("x"));

    let def = Node::default();
    assert!(def.is_empty());
    assert_eq!(def, missing);
}

#[test]
fn child_iterator_is_double_ended() {
    let doc = Document::new();
    let root = doc.root().append_element("root");
    for name in ["a", "b", "c", "d"] {
        root.append_element(name);
    }

    let forward: Vec<&str> = root.children().map(|n| n.name()).collect();
    assert_eq!(forward, ["a", "b", "c", "d"]);

    let backward: Vec<&str> = root.children().rev().map(|n| n.name()).collect();
    assert_eq!(backward, ["d", "c", "b", "a"]);

    // Meeting in the middle never yields a node twice.
    let mut iter = root.children();
    assert_eq!(iter.next().unwrap().name(), "a");
    assert_eq!(iter.next_back().unwrap().name(), "d");
    assert_eq!(iter.next().unwrap().name(), "b");
    assert_eq!(iter.next_back().unwrap().name(), "c");
    assert!(iter.next().is_none());
    assert!(iter.next_back().is_none());
}

struct Recorder {
    visits: Vec<(String, usize)>,
    begun: bool,
    ended: bool,
    stop_after: Option<usize>,
}

impl Recorder {
    fn new(stop_after: Option<usize>) -> Recorder {
        Recorder {
            visits: Vec::new(),
            begun: false,
            ended: false,
            stop_after,
        }
    }
}

impl TreeWalker for Recorder {
    fn begin(&mut self, _node: Node<'_>) -> bool {
        self.begun = true;
        true
    }

    fn for_each(&mut self, node: Node<'_>, depth: usize) -> bool {
        self.visits.push((node.name().to_string(), depth));
        self.stop_after.is_none_or(|n| self.visits.len() < n)
    }

    fn end(&mut self, _node: Node<'_>) -> bool {
        self.ended = true;
        true
    }
}

#[test]
fn traverse_visits_depth_first_with_depths() {
    let mut doc = Document::new();
    doc.load_str(
        "<a><b><c/><d/></b><e/></a>",
        ParseOptions::default(),
    );

    let mut walker = Recorder::new(None);
    assert!(doc.root().traverse(&mut walker));
    assert!(walker.begun && walker.ended);
    assert_eq!(
        walker.visits,
        [
            ("a".to_string(), 0),
            ("b".to_string(), 1),
            ("c".to_string(), 2),
            ("d".to_string(), 2),
            ("e".to_string(), 1),
        ]
    );
}

#[test]
fn traverse_stops_early_but_still_ends() {
    let mut doc = Document::new();
    doc.load_str(
        "<r><a/><b/><c/><d/><e/><f/><g/><h/><i/></r>",
        ParseOptions::default(),
    );

    let mut walker = Recorder::new(Some(3));
    // A false from the callback makes the whole traversal report false.
    assert!(!doc.root().traverse(&mut walker));
    assert_eq!(walker.visits.len(), 3);
    assert!(walker.ended);
}

#[test]
fn traverse_aborts_when_begin_refuses() {
    struct Refuser {
        called: bool,
    }
    impl TreeWalker for Refuser {
        fn begin(&mut self, _node: Node<'_>) -> bool {
            false
        }
        fn for_each(&mut self, _node: Node<'_>, _depth: usize) -> bool {
            self.called = true;
            true
        }
    }

    let mut doc = Document::new();
    doc.load_str("<a><b/></a>", ParseOptions::default());
    let mut walker = Refuser { called: false };
    assert!(!doc.root().traverse(&mut walker));
    assert!(!walker.called);
}

#[test]
fn child_value_skips_non_text() {
    let mut doc = Document::new();
    doc.load_str(
        "<node><!--c--><child/>payload</node>",
        ParseOptions::default() | ParseOptions::COMMENTS,
    );
    let node = doc.document_element();
    assert_eq!(node.child_value(), "payload");
    assert_eq!(node.child_value_of("child"), "");
}
