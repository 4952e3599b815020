//! Serialization: formatting flags, escaping, round trips.

use indoc::indoc;
use pagedom::{Document, FormatFlags, ParseOptions};

fn load(text: &str, options: ParseOptions) -> Document {
    let mut doc = Document::new();
    let result = doc.load_str(text, options);
    assert!(result.ok(), "parse failed: {result}");
    doc
}

#[test]
fn indented_output() {
    let doc = load("<a><b>text</b><c/></a>", ParseOptions::default());
    let out = doc.save_string("  ", FormatFlags::default());
    assert_eq!(
        out,
        indoc! {"
            <a>
              <b>text</b>
              <c />
            </a>
        "}
    );
}

#[test]
fn raw_output() {
    let doc = load("<a><b>text</b><c/></a>", ParseOptions::default());
    let out = doc.save_string("  ", FormatFlags::RAW);
    assert_eq!(out, "<a><b>text</b><c /></a>");
}

#[test]
fn custom_indent_string() {
    let doc = load("<a><b/></a>", ParseOptions::default());
    let out = doc.save_string("\t", FormatFlags::default());
    assert_eq!(out, "<a>\n\t<b />\n</a>\n");
}

#[test]
fn special_characters_are_escaped() {
    let doc = Document::new();
    let node = doc.root().append_element("m");
    node.append_attribute("a").set_value("x < \"y\" & z");
    let text = node.append_child(pagedom::NodeKind::Pcdata);
    text.set_value("1 < 2 & 3 > 0");

    let out = doc.save_string("  ", FormatFlags::RAW);
    assert_eq!(
        out,
        r#"<m a="x &lt; &quot;y&quot; &amp; z">1 &lt; 2 &amp; 3 &gt; 0</m>"#
    );
}

#[test]
fn escaped_roundtrip() {
    let original = r#"<m a="&lt;&amp;&quot;">body &amp; &lt;tag&gt;</m>"#;
    let doc = load(original, ParseOptions::default());
    let out = doc.save_string("  ", FormatFlags::RAW);
    assert_eq!(out, original);
}

#[test]
fn comment_pi_cdata_doctype_output() {
    let text = "<?xml version=\"1.0\"?><!DOCTYPE r><r><!--note--><![CDATA[a<b]]><?go now?></r>";
    let doc = load(text, ParseOptions::FULL);
    let out = doc.save_string("  ", FormatFlags::RAW);
    assert_eq!(out, text);
}

#[test]
fn declaration_can_be_suppressed() {
    let doc = load("<?xml version=\"1.0\"?><r/>", ParseOptions::FULL);
    let with = doc.save_string("  ", FormatFlags::RAW);
    assert_eq!(with, "<?xml version=\"1.0\"?><r />");

    let without = doc.save_string("  ", FormatFlags::RAW | FormatFlags::NO_DECLARATION);
    assert_eq!(without, "<r />");
}

#[test]
fn printing_a_subtree() {
    let doc = load("<a><b><c>x</c></b></a>", ParseOptions::default());
    let b = doc.document_element().child("b");

    let mut out = String::new();
    b.print(&mut out, "  ", FormatFlags::RAW);
    assert_eq!(out, "<b><c>x</c></b>");
}

#[test]
fn roundtrip_preserves_structure() {
    let source = indoc! {r#"
        <config version="2">
          <servers>
            <server host="alpha" port="80"/>
            <server host="beta" port="8080"/>
          </servers>
          <motd>welcome</motd>
        </config>
    "#};
    let doc = load(source, ParseOptions::default());
    let printed = doc.save_string("  ", FormatFlags::default());

    // Reparsing the output yields an equivalent tree.
    let doc2 = load(&printed, ParseOptions::default());
    let config = doc2.document_element();
    assert_eq!(config.attribute("version").value(), "2");
    assert_eq!(config.child("servers").children().count(), 2);
    assert_eq!(
        config
            .child("servers")
            .find_child_by_attribute("host", "beta")
            .attribute("port")
            .as_int(),
        8080
    );
    assert_eq!(config.child_value_of("motd"), "welcome");
}

#[test]
fn vec_sink_collects_bytes() {
    let doc = load("<a/>", ParseOptions::default());
    let mut out: Vec<u8> = Vec::new();
    doc.save(&mut out, "  ", FormatFlags::RAW);
    assert_eq!(out, b"<a />");
}
