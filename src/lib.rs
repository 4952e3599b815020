//! Arena-backed DOM for HTML/XML-shaped markup.
//!
//! A [`Document`] owns the whole tree: every node, attribute and string
//! lives in a page-based arena inside the document, so dropping the document
//! releases everything at once in time proportional to the number of arena
//! pages, not the number of nodes.
//!
//! The tree is worked with through [`Node`] and [`Attribute`] handles:
//! cheap `Copy` values that borrow from the document. Accessors on an empty
//! handle return empty strings or further empty handles, which makes
//! navigation chains safe without intermediate checks:
//!
//! ```
//! use pagedom::{Document, ParseOptions};
//!
//! let mut doc = Document::new();
//! let result = doc.load_str(
//!     "<library><shelf kind='fiction'><book>Dune</book></shelf></library>",
//!     ParseOptions::default(),
//! );
//! assert!(result.ok());
//!
//! let shelf = doc.document_element().child("shelf");
//! assert_eq!(shelf.attribute("kind").value(), "fiction");
//! assert_eq!(shelf.child("book").child_value(), "Dune");
//!
//! // Chains through nonexistent nodes stay safe.
//! assert!(shelf.child("missing").child("deeper").is_empty());
//! ```
//!
//! Parsing is in-place: the document keeps the input buffer, and names and
//! values that need no decoding borrow from it instead of being copied.

#![deny(missing_docs, rustdoc::broken_intra_doc_links)]

mod attribute;
mod document;
mod iter;
mod mem;
mod node;
mod parse;
mod print;
mod tracing_macros;
mod tree;
mod walk;

pub use attribute::{Attribute, AttributeValue};
pub use document::{Document, Encoding, ParseResult, ParseStatus};
pub use iter::{Attributes, Children};
pub use mem::{AllocateFn, DeallocateFn, MemoryPolicy, PAGE_SIZE, system_allocate, system_deallocate};
pub use node::Node;
pub use parse::ParseOptions;
pub use print::{DocumentWriter, FormatFlags, IoWriter};
pub use tree::NodeKind;
pub use walk::TreeWalker;
