//! Document lifecycle: arena ownership, loading and saving.

use std::cell::UnsafeCell;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::ptr;

use crate::mem::{Allocator, MemoryPage, MemoryPolicy, PAGE_SIZE, page_data};
use crate::node::Node;
use crate::parse::{self, ParseOptions};
use crate::print::{DocumentWriter, FormatFlags, IoWriter};
use crate::tracing_macros::{trace, trace_span};
use crate::tree::{self, NodeData, NodeKind};

/// Character encoding of a parsed buffer.
///
/// Input is required to be UTF-8; the variant is carried in [`ParseResult`]
/// so callers can tell what the tree's strings are encoded as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// UTF-8, the only supported encoding.
    Utf8,
}

/// Parsing status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseStatus {
    /// The buffer was parsed completely.
    Ok,
    /// The file to load could not be found.
    FileNotFound,
    /// The input could not be read, or was not valid UTF-8.
    IoError,
    /// The arena could not grow.
    OutOfMemory,
    /// The parser could not classify a `<...` construct.
    UnrecognizedTag,
    /// Malformed processing instruction or declaration.
    BadPi,
    /// Comment without a closing `-->`.
    BadComment,
    /// CDATA section without a closing `]]>`.
    BadCdata,
    /// Malformed document type declaration.
    BadDoctype,
    /// Malformed character data.
    BadPcdata,
    /// Malformed start tag.
    BadStartElement,
    /// Malformed attribute.
    BadAttribute,
    /// Malformed closing tag.
    BadEndElement,
    /// Closing tag does not match the open element, or elements were left
    /// open at the end of input.
    EndElementMismatch,
    /// The parser reached a state it should not be able to reach.
    InternalError,
}

impl ParseStatus {
    /// Human-readable description of the status.
    pub fn description(&self) -> &'static str {
        match self {
            ParseStatus::Ok => "no error",
            ParseStatus::FileNotFound => "file was not found",
            ParseStatus::IoError => "error reading from file or stream",
            ParseStatus::OutOfMemory => "could not allocate memory",
            ParseStatus::UnrecognizedTag => "could not determine tag type",
            ParseStatus::BadPi => "error parsing document declaration or processing instruction",
            ParseStatus::BadComment => "error parsing comment",
            ParseStatus::BadCdata => "error parsing CDATA section",
            ParseStatus::BadDoctype => "error parsing document type declaration",
            ParseStatus::BadPcdata => "error parsing character data",
            ParseStatus::BadStartElement => "error parsing start tag",
            ParseStatus::BadAttribute => "error parsing attribute",
            ParseStatus::BadEndElement => "error parsing end tag",
            ParseStatus::EndElementMismatch => "start and end tags do not match",
            ParseStatus::InternalError => "internal parser error",
        }
    }
}

impl fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl std::error::Error for ParseStatus {}

/// Outcome of a load operation.
///
/// On failure the tree holds everything parsed before the error; on success
/// `offset` is the number of bytes consumed.
#[derive(Clone, Copy, Debug)]
pub struct ParseResult {
    /// Status code.
    pub status: ParseStatus,
    /// Byte offset of the error in the source buffer, or the total number of
    /// bytes consumed on success.
    pub offset: usize,
    /// Encoding the buffer was interpreted as.
    pub encoding: Encoding,
}

impl ParseResult {
    /// True on successful parse.
    pub fn ok(&self) -> bool {
        self.status == ParseStatus::Ok
    }
}

impl fmt::Display for ParseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ok() {
            f.write_str("no error")
        } else {
            write!(f, "{} at offset {}", self.status, self.offset)
        }
    }
}

// The seed page lives inside this buffer: one page header followed by the
// root node record. It is marked full at construction so the first real
// allocation opens a policy-backed page.
const SEED_SIZE: usize = 256;
const _: () = assert!(SEED_SIZE >= size_of::<MemoryPage>() + size_of::<NodeData>());

#[repr(C, align(32))]
struct SeedBuffer {
    bytes: [u8; SEED_SIZE],
}

/// An in-memory markup document: the owner of the tree and every byte in it.
///
/// All [`Node`] and [`Attribute`](crate::Attribute) handles borrow from the
/// document and cannot outlive it. Loading or resetting the document drops
/// the whole previous tree; handles into it must not be reused across those
/// calls (the borrow checker enforces this, since both take `&mut self`).
///
/// ```
/// use pagedom::{Document, ParseOptions};
///
/// let mut doc = Document::new();
/// let result = doc.load_str("<list><item id='1'/></list>", ParseOptions::default());
/// assert!(result.ok());
/// assert_eq!(doc.document_element().name(), "list");
/// ```
pub struct Document {
    // Boxed for address stability: pages point back at the allocator, and
    // the seed page header lives inside `seed`, so neither may move when the
    // Document itself does.
    alloc: Box<UnsafeCell<Allocator>>,
    seed: Box<UnsafeCell<SeedBuffer>>,
    // The input buffer of the last load; unconverted names and values borrow
    // from it.
    buffer: Option<Box<[u8]>>,
    root: *mut NodeData,
}

impl Document {
    /// Creates an empty document using the system allocator.
    pub fn new() -> Document {
        Document::with_policy(MemoryPolicy::default())
    }

    /// Creates an empty document whose arena draws from `policy`.
    pub fn with_policy(policy: MemoryPolicy) -> Document {
        let mut doc = Document {
            alloc: Box::new(UnsafeCell::new(Allocator::uninit(policy))),
            seed: Box::new(UnsafeCell::new(SeedBuffer {
                bytes: [0; SEED_SIZE],
            })),
            buffer: None,
            root: ptr::null_mut(),
        };
        unsafe {
            doc.create();
        }
        doc
    }

    /// Installs the seed page and the root node record. The arena must be
    /// empty (freshly constructed or just destroyed).
    unsafe fn create(&mut self) {
        unsafe {
            let alloc = self.alloc.get();

            // SeedBuffer is repr(C); its byte array starts at offset 0 and
            // carries the page alignment.
            let page = MemoryPage::construct(self.seed.get() as *mut u8);
            (*page).allocator = alloc;
            (*page).busy_size = PAGE_SIZE;

            (*alloc).root = page;
            (*alloc).busy_size = PAGE_SIZE;

            let root = page_data(page) as *mut NodeData;
            ptr::write(root, NodeData::new(page, NodeKind::Document));
            self.root = root;

            trace!("document created");
        }
    }

    /// Releases every policy-backed page at once. Nodes are not visited;
    /// teardown cost is proportional to the number of pages.
    unsafe fn destroy(&mut self) {
        unsafe {
            (*self.alloc.get()).release_pages();
        }
        self.root = ptr::null_mut();
        self.buffer = None;
        trace!("document destroyed");
    }

    /// Drops the whole tree, leaving an empty document.
    pub fn reset(&mut self) {
        unsafe {
            self.destroy();
            self.create();
        }
    }

    /// Drops the whole tree and replaces it with a deep copy of `proto`'s
    /// tree. Nothing is shared with `proto` afterwards.
    pub fn reset_from(&mut self, proto: &Document) {
        self.reset();
        unsafe {
            let alloc = &mut *self.alloc.get();
            let mut child = (*proto.root).first_child;
            while !child.is_null() {
                let copy = tree::allocate_node(alloc, (*child).kind);
                if copy.is_null() {
                    return;
                }
                tree::append_node(copy, self.root);
                if !tree::copy_tree(alloc, copy, child, ptr::null_mut()) {
                    tree::unlink_node(copy);
                    tree::destroy_node(alloc, copy);
                    return;
                }
                child = (*child).next_sibling;
            }
        }
    }

    /// The tree's absolute root. Its kind is [`NodeKind::Document`] and it
    /// can never be removed or renamed.
    pub fn root(&self) -> Node<'_> {
        Node::from_raw(self.root)
    }

    /// The first element child of the root, or an empty handle for a
    /// document with no elements.
    pub fn document_element(&self) -> Node<'_> {
        self.root()
            .find_child(|child| child.kind() == Some(NodeKind::Element))
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Parses `contents`, replacing the current tree.
    pub fn load_str(&mut self, contents: &str, options: ParseOptions) -> ParseResult {
        // Already valid UTF-8; skip re-validation.
        self.reset();
        self.buffer = Some(contents.as_bytes().to_vec().into_boxed_slice());
        self.parse_stored_buffer(options)
    }

    /// Parses `contents`, which must be UTF-8 encoded.
    pub fn load_bytes(&mut self, contents: &[u8], options: ParseOptions) -> ParseResult {
        self.load_buffer(contents.to_vec(), options)
    }

    /// Parses `buffer`, taking ownership so unconverted names and values can
    /// borrow from it instead of being copied into the arena.
    pub fn load_buffer(&mut self, buffer: Vec<u8>, options: ParseOptions) -> ParseResult {
        self.reset();
        if let Err(err) = std::str::from_utf8(&buffer) {
            return ParseResult {
                status: ParseStatus::IoError,
                offset: err.valid_up_to(),
                encoding: Encoding::Utf8,
            };
        }
        self.buffer = Some(buffer.into_boxed_slice());
        self.parse_stored_buffer(options)
    }

    /// Reads and parses the file at `path`.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P, options: ParseOptions) -> ParseResult {
        match fs::read(path) {
            Ok(bytes) => self.load_buffer(bytes, options),
            Err(err) => {
                self.reset();
                let status = if err.kind() == io::ErrorKind::NotFound {
                    ParseStatus::FileNotFound
                } else {
                    ParseStatus::IoError
                };
                ParseResult {
                    status,
                    offset: 0,
                    encoding: Encoding::Utf8,
                }
            }
        }
    }

    fn parse_stored_buffer(&mut self, options: ParseOptions) -> ParseResult {
        // The buffer is boxed and owned by self, so pointers into it stay
        // valid until the next load or reset.
        let buf: &[u8] = self.buffer.as_deref().unwrap_or(&[]);
        trace_span!("parse", bytes = buf.len());
        parse::parse_document(self.root, buf, options, self.alloc.get())
    }

    // ------------------------------------------------------------------
    // Saving
    // ------------------------------------------------------------------

    /// Serializes the document into `writer`.
    pub fn save<W: DocumentWriter + ?Sized>(
        &self,
        writer: &mut W,
        indent: &str,
        flags: FormatFlags,
    ) {
        crate::print::print_subtree(writer, self.root(), indent, flags);
    }

    /// Serializes the document into a `String`.
    pub fn save_string(&self, indent: &str, flags: FormatFlags) -> String {
        let mut out = String::new();
        self.save(&mut out, indent, flags);
        out
    }

    /// Serializes the document into the file at `path`, creating or
    /// truncating it.
    pub fn save_file<P: AsRef<Path>>(
        &self,
        path: P,
        indent: &str,
        flags: FormatFlags,
    ) -> io::Result<()> {
        let file = fs::File::create(path)?;
        let mut writer = IoWriter::new(io::BufWriter::new(file));
        self.save(&mut writer, indent, flags);
        let inner = writer.into_result()?;
        inner.into_inner().map_err(|err| err.into_error())?;
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        unsafe {
            self.destroy();
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root())
            .finish_non_exhaustive()
    }
}
