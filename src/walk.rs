//! Visitor-style tree traversal with early termination.

use crate::node::Node;

/// Callback interface for [`Node::traverse`].
///
/// All three methods return a continue/stop flag. `begin` and `end` default
/// to continuing; only `for_each` must be provided.
///
/// ```
/// use pagedom::{Document, Node, ParseOptions, TreeWalker};
///
/// struct Counter(usize);
///
/// impl TreeWalker for Counter {
///     fn for_each(&mut self, _node: Node<'_>, _depth: usize) -> bool {
///         self.0 += 1;
///         true
///     }
/// }
///
/// let mut doc = Document::new();
/// doc.load_str("<a><b/><c/></a>", ParseOptions::default());
/// let mut counter = Counter(0);
/// assert!(doc.root().traverse(&mut counter));
/// assert_eq!(counter.0, 3);
/// ```
pub trait TreeWalker {
    /// Called once before traversal; returning false aborts it entirely.
    fn begin(&mut self, node: Node<'_>) -> bool {
        let _ = node;
        true
    }

    /// Called for every node in pre-order with its depth below the traversal
    /// root; returning false stops visiting further nodes.
    fn for_each(&mut self, node: Node<'_>, depth: usize) -> bool;

    /// Called once after traversal, even when `for_each` stopped it early.
    fn end(&mut self, node: Node<'_>) -> bool {
        let _ = node;
        true
    }
}
