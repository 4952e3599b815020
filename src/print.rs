//! Tree serialization.
//!
//! Output goes through the [`DocumentWriter`] sink trait so the same printer
//! serves in-memory buffers and files. Layout is controlled by
//! [`FormatFlags`]; the default pretty-prints with one indent string per
//! depth level, keeping elements whose children are all text on a single
//! line.

use std::io;

use bitflags::bitflags;

use crate::node::Node;
use crate::tree::NodeKind;

bitflags! {
    /// Output formatting options, combinable with `|`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct FormatFlags: u32 {
        /// Indent nodes, one indent string per depth level.
        const INDENT = 0x01;
        /// Write the tree exactly as stored: no indentation, no newlines.
        const RAW = 0x04;
        /// Omit declaration nodes from the output.
        const NO_DECLARATION = 0x08;
    }
}

impl FormatFlags {
    /// Default formatting: indented output.
    pub const DEFAULT: FormatFlags = FormatFlags::INDENT;
}

impl Default for FormatFlags {
    fn default() -> Self {
        FormatFlags::DEFAULT
    }
}

/// Byte sink for serialization.
///
/// The sink is infallible from the printer's point of view; fallible backends
/// record their first error and swallow the rest, as [`IoWriter`] does.
pub trait DocumentWriter {
    /// Consumes one chunk of output.
    fn write(&mut self, data: &[u8]);
}

impl DocumentWriter for Vec<u8> {
    fn write(&mut self, data: &[u8]) {
        self.extend_from_slice(data);
    }
}

impl DocumentWriter for String {
    fn write(&mut self, data: &[u8]) {
        // The printer only emits UTF-8.
        self.push_str(std::str::from_utf8(data).unwrap_or_default());
    }
}

/// Adapter from [`std::io::Write`] to [`DocumentWriter`].
///
/// The first I/O error is remembered and later writes are dropped; inspect it
/// with [`IoWriter::error`] after printing.
pub struct IoWriter<W: io::Write> {
    inner: W,
    error: Option<io::Error>,
}

impl<W: io::Write> IoWriter<W> {
    /// Wraps an I/O writer.
    pub fn new(inner: W) -> IoWriter<W> {
        IoWriter { inner, error: None }
    }

    /// The first error encountered, if any.
    pub fn error(&self) -> Option<&io::Error> {
        self.error.as_ref()
    }

    /// Unwraps, surfacing the recorded error.
    pub fn into_result(self) -> io::Result<W> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.inner),
        }
    }
}

impl<W: io::Write> DocumentWriter for IoWriter<W> {
    fn write(&mut self, data: &[u8]) {
        if self.error.is_none() {
            if let Err(err) = self.inner.write_all(data) {
                self.error = Some(err);
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Printer
// ----------------------------------------------------------------------------

pub(crate) fn print_subtree<W: DocumentWriter + ?Sized>(
    writer: &mut W,
    node: Node<'_>,
    indent: &str,
    flags: FormatFlags,
) {
    match node.kind() {
        None => {}
        Some(NodeKind::Document) => {
            for child in node.children() {
                if flags.contains(FormatFlags::NO_DECLARATION)
                    && child.kind() == Some(NodeKind::Declaration)
                {
                    continue;
                }
                print_node(writer, child, indent, flags, 0);
            }
        }
        Some(_) => print_node(writer, node, indent, flags, 0),
    }
}

fn pretty(flags: FormatFlags) -> bool {
    flags.contains(FormatFlags::INDENT) && !flags.contains(FormatFlags::RAW)
}

fn write_indent<W: DocumentWriter + ?Sized>(writer: &mut W, indent: &str, depth: usize) {
    for _ in 0..depth {
        writer.write(indent.as_bytes());
    }
}

fn print_node<W: DocumentWriter + ?Sized>(
    writer: &mut W,
    node: Node<'_>,
    indent: &str,
    flags: FormatFlags,
    depth: usize,
) {
    let pretty = pretty(flags);
    if pretty {
        write_indent(writer, indent, depth);
    }

    match node.kind() {
        None | Some(NodeKind::Document) => return,
        Some(NodeKind::Element) => print_element(writer, node, indent, flags, depth),
        Some(NodeKind::Pcdata) => write_escaped(writer, node.value(), false),
        Some(NodeKind::Cdata) => {
            writer.write(b"<![CDATA[");
            writer.write(node.value().as_bytes());
            writer.write(b"]]>");
        }
        Some(NodeKind::Comment) => {
            writer.write(b"<!--");
            writer.write(node.value().as_bytes());
            writer.write(b"-->");
        }
        Some(NodeKind::Pi) => {
            writer.write(b"<?");
            writer.write(node.name().as_bytes());
            if !node.value().is_empty() {
                writer.write(b" ");
                writer.write(node.value().as_bytes());
            }
            writer.write(b"?>");
        }
        Some(NodeKind::Declaration) => {
            writer.write(b"<?");
            writer.write(node.name().as_bytes());
            print_attributes(writer, node);
            writer.write(b"?>");
        }
        Some(NodeKind::Doctype) => {
            writer.write(b"<!DOCTYPE");
            if !node.value().is_empty() {
                writer.write(b" ");
                writer.write(node.value().as_bytes());
            }
            writer.write(b">");
        }
    }

    if pretty {
        writer.write(b"\n");
    }
}

fn print_attributes<W: DocumentWriter + ?Sized>(writer: &mut W, node: Node<'_>) {
    for attr in node.attributes() {
        writer.write(b" ");
        writer.write(attr.name().as_bytes());
        writer.write(b"=\"");
        write_escaped(writer, attr.value(), true);
        writer.write(b"\"");
    }
}

fn print_element<W: DocumentWriter + ?Sized>(
    writer: &mut W,
    node: Node<'_>,
    indent: &str,
    flags: FormatFlags,
    depth: usize,
) {
    writer.write(b"<");
    writer.write(node.name().as_bytes());
    print_attributes(writer, node);

    if node.first_child().is_empty() {
        writer.write(b" />");
        return;
    }

    let text_only = node
        .children()
        .all(|c| matches!(c.kind(), Some(NodeKind::Pcdata | NodeKind::Cdata)));

    if text_only || !pretty(flags) {
        writer.write(b">");
        for child in node.children() {
            print_inline(writer, child, indent, flags);
        }
    } else {
        writer.write(b">\n");
        for child in node.children() {
            print_node(writer, child, indent, flags, depth + 1);
        }
        write_indent(writer, indent, depth);
    }

    writer.write(b"</");
    writer.write(node.name().as_bytes());
    writer.write(b">");
}

/// Prints a child without indentation or trailing newline; used both for
/// text-only content and for everything in raw mode.
fn print_inline<W: DocumentWriter + ?Sized>(
    writer: &mut W,
    node: Node<'_>,
    indent: &str,
    flags: FormatFlags,
) {
    match node.kind() {
        Some(NodeKind::Element) => print_element(writer, node, indent, flags, 0),
        Some(NodeKind::Pcdata) => write_escaped(writer, node.value(), false),
        Some(NodeKind::Cdata) => {
            writer.write(b"<![CDATA[");
            writer.write(node.value().as_bytes());
            writer.write(b"]]>");
        }
        Some(NodeKind::Comment) => {
            writer.write(b"<!--");
            writer.write(node.value().as_bytes());
            writer.write(b"-->");
        }
        Some(NodeKind::Pi) => {
            writer.write(b"<?");
            writer.write(node.name().as_bytes());
            if !node.value().is_empty() {
                writer.write(b" ");
                writer.write(node.value().as_bytes());
            }
            writer.write(b"?>");
        }
        Some(NodeKind::Declaration) => {
            if !flags.contains(FormatFlags::NO_DECLARATION) {
                writer.write(b"<?");
                writer.write(node.name().as_bytes());
                print_attributes(writer, node);
                writer.write(b"?>");
            }
        }
        Some(NodeKind::Doctype) => {
            writer.write(b"<!DOCTYPE");
            if !node.value().is_empty() {
                writer.write(b" ");
                writer.write(node.value().as_bytes());
            }
            writer.write(b">");
        }
        None | Some(NodeKind::Document) => {}
    }
}

/// Writes `text` with markup-significant characters replaced by entity
/// references. Attribute values additionally escape double quotes.
fn write_escaped<W: DocumentWriter + ?Sized>(writer: &mut W, text: &str, attribute: bool) {
    let bytes = text.as_bytes();
    let mut flushed = 0;
    for (i, &b) in bytes.iter().enumerate() {
        let replacement: &[u8] = match b {
            b'&' => b"&amp;",
            b'<' => b"&lt;",
            b'>' => b"&gt;",
            b'"' if attribute => b"&quot;",
            _ => continue,
        };
        if flushed < i {
            writer.write(&bytes[flushed..i]);
        }
        writer.write(replacement);
        flushed = i + 1;
    }
    if flushed < bytes.len() {
        writer.write(&bytes[flushed..]);
    }
}
