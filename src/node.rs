//! Node handles: the mutation and traversal API of the tree.

use std::fmt;
use std::marker::PhantomData;

use crate::Document;
use crate::attribute::Attribute;
use crate::iter::{Attributes, Children};
use crate::print::{DocumentWriter, FormatFlags};
use crate::tree::{self, NodeData, NodeKind};
use crate::walk::TreeWalker;

/// A lightweight handle to a node in a document tree.
///
/// Handles carry no ownership; copying one never copies the node. Equality,
/// ordering and hashing compare the underlying storage address, not
/// structural content. The lifetime ties every handle to a borrow of its
/// [`Document`], so a handle cannot outlive the tree it points into.
///
/// An *empty* handle is a safe sentinel: accessors on it return empty
/// strings or further empty handles, and mutations fail by returning an
/// empty handle or `false`.
///
/// Every mutation is fallible (the arena may run out of memory), and
/// removing a node frees its subtree immediately: handles into a removed
/// subtree must not be used afterwards.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Node<'doc> {
    pub(crate) ptr: *mut NodeData,
    pub(crate) marker: PhantomData<&'doc Document>,
}

/// Which kinds may appear as a child of `parent`.
fn allow_insert_child(parent: NodeKind, child: NodeKind) -> bool {
    if parent != NodeKind::Document && parent != NodeKind::Element {
        return false;
    }
    if child == NodeKind::Document {
        return false;
    }
    if parent != NodeKind::Document
        && (child == NodeKind::Declaration || child == NodeKind::Doctype)
    {
        return false;
    }
    true
}

fn allow_set_name(kind: NodeKind) -> bool {
    matches!(kind, NodeKind::Element | NodeKind::Pi | NodeKind::Declaration)
}

fn allow_set_value(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Pcdata | NodeKind::Cdata | NodeKind::Comment | NodeKind::Pi | NodeKind::Doctype
    )
}

impl<'doc> Node<'doc> {
    pub(crate) fn from_raw(ptr: *mut NodeData) -> Node<'doc> {
        Node {
            ptr,
            marker: PhantomData,
        }
    }

    pub(crate) fn empty_handle() -> Node<'doc> {
        Node::from_raw(std::ptr::null_mut())
    }

    /// True if this is the empty sentinel handle.
    pub fn is_empty(&self) -> bool {
        self.ptr.is_null()
    }

    /// The node's kind, or `None` for an empty handle.
    pub fn kind(&self) -> Option<NodeKind> {
        if self.is_empty() {
            None
        } else {
            Some(unsafe { (*self.ptr).kind })
        }
    }

    // ------------------------------------------------------------------
    // Read accessors
    // ------------------------------------------------------------------

    /// The node's name, or `""` if it has none (or the handle is empty).
    pub fn name(&self) -> &'doc str {
        if self.is_empty() {
            ""
        } else {
            unsafe { (*self.ptr).name.as_str() }
        }
    }

    /// The node's value, or `""`.
    pub fn value(&self) -> &'doc str {
        if self.is_empty() {
            ""
        } else {
            unsafe { (*self.ptr).value.as_str() }
        }
    }

    /// Parent node; empty for the document root (and for empty handles).
    pub fn parent(&self) -> Node<'doc> {
        if self.is_empty() {
            Node::empty_handle()
        } else {
            Node::from_raw(unsafe { (*self.ptr).parent })
        }
    }

    /// First child, or empty.
    pub fn first_child(&self) -> Node<'doc> {
        if self.is_empty() {
            Node::empty_handle()
        } else {
            Node::from_raw(unsafe { (*self.ptr).first_child })
        }
    }

    /// Last child, or empty.
    pub fn last_child(&self) -> Node<'doc> {
        if self.is_empty() {
            Node::empty_handle()
        } else {
            Node::from_raw(unsafe { (*self.ptr).last_child })
        }
    }

    /// Next sibling in the parent's child list, or empty.
    pub fn next_sibling(&self) -> Node<'doc> {
        if self.is_empty() {
            Node::empty_handle()
        } else {
            Node::from_raw(unsafe { (*self.ptr).next_sibling })
        }
    }

    /// Previous sibling, or empty.
    pub fn previous_sibling(&self) -> Node<'doc> {
        if self.is_empty() {
            Node::empty_handle()
        } else {
            Node::from_raw(unsafe { (*self.ptr).prev_sibling })
        }
    }

    /// First attribute, or empty.
    pub fn first_attribute(&self) -> Attribute<'doc> {
        if self.is_empty() {
            Attribute::empty_handle()
        } else {
            Attribute::from_raw(unsafe { (*self.ptr).first_attribute }, self.ptr)
        }
    }

    /// Last attribute, or empty.
    pub fn last_attribute(&self) -> Attribute<'doc> {
        if self.is_empty() {
            Attribute::empty_handle()
        } else {
            Attribute::from_raw(unsafe { (*self.ptr).last_attribute }, self.ptr)
        }
    }

    /// Root of the tree this node belongs to (the document node).
    pub fn root(&self) -> Node<'doc> {
        let mut cur = *self;
        while !cur.parent().is_empty() {
            cur = cur.parent();
        }
        cur
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Node<'doc> {
        let mut cur = self.first_child();
        while !cur.is_empty() {
            if cur.name() == name {
                return cur;
            }
            cur = cur.next_sibling();
        }
        Node::empty_handle()
    }

    /// First attribute with the given name.
    pub fn attribute(&self, name: &str) -> Attribute<'doc> {
        let mut cur = self.first_attribute();
        while !cur.is_empty() {
            if cur.name() == name {
                return cur;
            }
            cur = cur.next_attribute();
        }
        Attribute::empty_handle()
    }

    /// Next sibling with the given name.
    pub fn next_sibling_named(&self, name: &str) -> Node<'doc> {
        let mut cur = self.next_sibling();
        while !cur.is_empty() {
            if cur.name() == name {
                return cur;
            }
            cur = cur.next_sibling();
        }
        Node::empty_handle()
    }

    /// Previous sibling with the given name.
    pub fn previous_sibling_named(&self, name: &str) -> Node<'doc> {
        let mut cur = self.previous_sibling();
        while !cur.is_empty() {
            if cur.name() == name {
                return cur;
            }
            cur = cur.previous_sibling();
        }
        Node::empty_handle()
    }

    /// Value of the first text (pcdata/cdata) child, or `""`.
    pub fn child_value(&self) -> &'doc str {
        let mut cur = self.first_child();
        while !cur.is_empty() {
            if matches!(cur.kind(), Some(NodeKind::Pcdata | NodeKind::Cdata)) {
                return cur.value();
            }
            cur = cur.next_sibling();
        }
        ""
    }

    /// Equivalent to `child(name).child_value()`.
    pub fn child_value_of(&self, name: &str) -> &'doc str {
        self.child(name).child_value()
    }

    // ------------------------------------------------------------------
    // Name/value mutation
    // ------------------------------------------------------------------

    /// Sets the node's name. Returns false if the handle is empty, the node
    /// kind carries no name, or allocation fails (the old name is kept).
    pub fn set_name(&self, name: &str) -> bool {
        let Some(kind) = self.kind() else { return false };
        if !allow_set_name(kind) {
            return false;
        }
        unsafe {
            let alloc = &mut *tree::node_allocator(self.ptr);
            let data = &mut *self.ptr;
            tree::set_entity_str(alloc, &mut data.name, &mut data.header.name_allocated, name)
        }
    }

    /// Sets the node's value. Returns false if the handle is empty, the node
    /// kind carries no value, or allocation fails (the old value is kept).
    pub fn set_value(&self, value: &str) -> bool {
        let Some(kind) = self.kind() else { return false };
        if !allow_set_value(kind) {
            return false;
        }
        unsafe {
            let alloc = &mut *tree::node_allocator(self.ptr);
            let data = &mut *self.ptr;
            tree::set_entity_str(
                alloc,
                &mut data.value,
                &mut data.header.value_allocated,
                value,
            )
        }
    }

    // ------------------------------------------------------------------
    // Child insertion
    // ------------------------------------------------------------------

    fn new_child(&self, kind: NodeKind) -> *mut NodeData {
        let Some(parent_kind) = self.kind() else {
            return std::ptr::null_mut();
        };
        if !allow_insert_child(parent_kind, kind) {
            return std::ptr::null_mut();
        }
        unsafe {
            let alloc = &mut *tree::node_allocator(self.ptr);
            tree::allocate_node(alloc, kind)
        }
    }

    /// Appends a child of the given kind. Returns an empty handle if this
    /// handle is empty, the kind is not allowed here, or allocation fails.
    pub fn append_child(&self, kind: NodeKind) -> Node<'doc> {
        let child = self.new_child(kind);
        if child.is_null() {
            return Node::empty_handle();
        }
        unsafe { tree::append_node(child, self.ptr) };
        Node::from_raw(child)
    }

    /// Prepends a child of the given kind.
    pub fn prepend_child(&self, kind: NodeKind) -> Node<'doc> {
        let child = self.new_child(kind);
        if child.is_null() {
            return Node::empty_handle();
        }
        unsafe { tree::prepend_node(child, self.ptr) };
        Node::from_raw(child)
    }

    /// Inserts a child of the given kind before `anchor`, which must be a
    /// child of this node; otherwise nothing happens and an empty handle is
    /// returned.
    pub fn insert_child_before(&self, kind: NodeKind, anchor: Node<'doc>) -> Node<'doc> {
        if anchor.parent() != *self {
            return Node::empty_handle();
        }
        let child = self.new_child(kind);
        if child.is_null() {
            return Node::empty_handle();
        }
        unsafe { tree::insert_node_before(child, anchor.ptr) };
        Node::from_raw(child)
    }

    /// Inserts a child of the given kind after `anchor`, which must be a
    /// child of this node.
    pub fn insert_child_after(&self, kind: NodeKind, anchor: Node<'doc>) -> Node<'doc> {
        if anchor.parent() != *self {
            return Node::empty_handle();
        }
        let child = self.new_child(kind);
        if child.is_null() {
            return Node::empty_handle();
        }
        unsafe { tree::insert_node_after(child, anchor.ptr) };
        Node::from_raw(child)
    }

    /// Appends an element child with the given name.
    pub fn append_element(&self, name: &str) -> Node<'doc> {
        let child = self.append_child(NodeKind::Element);
        if !child.is_empty() && !child.set_name(name) {
            self.remove_child(child);
            return Node::empty_handle();
        }
        child
    }

    /// Prepends an element child with the given name.
    pub fn prepend_element(&self, name: &str) -> Node<'doc> {
        let child = self.prepend_child(NodeKind::Element);
        if !child.is_empty() && !child.set_name(name) {
            self.remove_child(child);
            return Node::empty_handle();
        }
        child
    }

    /// Inserts an element child with the given name before `anchor`.
    pub fn insert_element_before(&self, name: &str, anchor: Node<'doc>) -> Node<'doc> {
        let child = self.insert_child_before(NodeKind::Element, anchor);
        if !child.is_empty() && !child.set_name(name) {
            self.remove_child(child);
            return Node::empty_handle();
        }
        child
    }

    /// Inserts an element child with the given name after `anchor`.
    pub fn insert_element_after(&self, name: &str, anchor: Node<'doc>) -> Node<'doc> {
        let child = self.insert_child_after(NodeKind::Element, anchor);
        if !child.is_empty() && !child.set_name(name) {
            self.remove_child(child);
            return Node::empty_handle();
        }
        child
    }

    // ------------------------------------------------------------------
    // Deep copies
    // ------------------------------------------------------------------

    fn finish_copy(&self, copy: *mut NodeData, proto: Node<'_>) -> Node<'doc> {
        unsafe {
            let alloc = &mut *tree::node_allocator(self.ptr);
            if !tree::copy_tree(alloc, copy, proto.ptr, copy) {
                tree::unlink_node(copy);
                tree::destroy_node(alloc, copy);
                return Node::empty_handle();
            }
        }
        Node::from_raw(copy)
    }

    /// Appends a deep copy of `proto` (possibly from another document) as a
    /// child. The copy never shares storage with the prototype.
    pub fn append_copy(&self, proto: Node<'_>) -> Node<'doc> {
        let Some(kind) = proto.kind() else {
            return Node::empty_handle();
        };
        let copy = self.new_child(kind);
        if copy.is_null() {
            return Node::empty_handle();
        }
        unsafe { tree::append_node(copy, self.ptr) };
        self.finish_copy(copy, proto)
    }

    /// Prepends a deep copy of `proto` as a child.
    pub fn prepend_copy(&self, proto: Node<'_>) -> Node<'doc> {
        let Some(kind) = proto.kind() else {
            return Node::empty_handle();
        };
        let copy = self.new_child(kind);
        if copy.is_null() {
            return Node::empty_handle();
        }
        unsafe { tree::prepend_node(copy, self.ptr) };
        self.finish_copy(copy, proto)
    }

    /// Inserts a deep copy of `proto` before `anchor`, which must be a child
    /// of this node.
    pub fn insert_copy_before(&self, proto: Node<'_>, anchor: Node<'doc>) -> Node<'doc> {
        if anchor.parent() != *self {
            return Node::empty_handle();
        }
        let Some(kind) = proto.kind() else {
            return Node::empty_handle();
        };
        let copy = self.new_child(kind);
        if copy.is_null() {
            return Node::empty_handle();
        }
        unsafe { tree::insert_node_before(copy, anchor.ptr) };
        self.finish_copy(copy, proto)
    }

    /// Inserts a deep copy of `proto` after `anchor`, which must be a child
    /// of this node.
    pub fn insert_copy_after(&self, proto: Node<'_>, anchor: Node<'doc>) -> Node<'doc> {
        if anchor.parent() != *self {
            return Node::empty_handle();
        }
        let Some(kind) = proto.kind() else {
            return Node::empty_handle();
        };
        let copy = self.new_child(kind);
        if copy.is_null() {
            return Node::empty_handle();
        }
        unsafe { tree::insert_node_after(copy, anchor.ptr) };
        self.finish_copy(copy, proto)
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    fn allow_attributes(&self) -> bool {
        matches!(
            self.kind(),
            Some(NodeKind::Element) | Some(NodeKind::Declaration)
        )
    }

    fn new_attribute(&self, name: &str) -> *mut tree::AttrData {
        if !self.allow_attributes() {
            return std::ptr::null_mut();
        }
        unsafe {
            let alloc = &mut *tree::node_allocator(self.ptr);
            let attr = tree::allocate_attribute(alloc);
            if attr.is_null() {
                return std::ptr::null_mut();
            }
            let data = &mut *attr;
            if !tree::set_entity_str(alloc, &mut data.name, &mut data.header.name_allocated, name)
            {
                tree::destroy_attribute(alloc, attr);
                return std::ptr::null_mut();
            }
            attr
        }
    }

    /// Appends an attribute with the given name (and empty value).
    pub fn append_attribute(&self, name: &str) -> Attribute<'doc> {
        let attr = self.new_attribute(name);
        if attr.is_null() {
            return Attribute::empty_handle();
        }
        unsafe { tree::append_attribute(attr, self.ptr) };
        Attribute::from_raw(attr, self.ptr)
    }

    /// Prepends an attribute with the given name.
    pub fn prepend_attribute(&self, name: &str) -> Attribute<'doc> {
        let attr = self.new_attribute(name);
        if attr.is_null() {
            return Attribute::empty_handle();
        }
        unsafe { tree::prepend_attribute(attr, self.ptr) };
        Attribute::from_raw(attr, self.ptr)
    }

    /// Inserts an attribute before `anchor`, which must belong to this node.
    pub fn insert_attribute_before(&self, name: &str, anchor: Attribute<'doc>) -> Attribute<'doc> {
        if anchor.is_empty() || !self.owns_attribute(anchor) {
            return Attribute::empty_handle();
        }
        let attr = self.new_attribute(name);
        if attr.is_null() {
            return Attribute::empty_handle();
        }
        unsafe { tree::insert_attribute_before(attr, anchor.ptr, self.ptr) };
        Attribute::from_raw(attr, self.ptr)
    }

    /// Inserts an attribute after `anchor`, which must belong to this node.
    pub fn insert_attribute_after(&self, name: &str, anchor: Attribute<'doc>) -> Attribute<'doc> {
        if anchor.is_empty() || !self.owns_attribute(anchor) {
            return Attribute::empty_handle();
        }
        let attr = self.new_attribute(name);
        if attr.is_null() {
            return Attribute::empty_handle();
        }
        unsafe { tree::insert_attribute_after(attr, anchor.ptr, self.ptr) };
        Attribute::from_raw(attr, self.ptr)
    }

    /// Appends a deep copy of `proto` (possibly from another document's
    /// node) as an attribute.
    pub fn append_attribute_copy(&self, proto: Attribute<'_>) -> Attribute<'doc> {
        if proto.is_empty() || !self.allow_attributes() {
            return Attribute::empty_handle();
        }
        unsafe {
            let alloc = &mut *tree::node_allocator(self.ptr);
            let attr = tree::allocate_attribute(alloc);
            if attr.is_null() {
                return Attribute::empty_handle();
            }
            if !tree::copy_attribute(alloc, attr, proto.ptr) {
                tree::destroy_attribute(alloc, attr);
                return Attribute::empty_handle();
            }
            tree::append_attribute(attr, self.ptr);
            Attribute::from_raw(attr, self.ptr)
        }
    }

    /// True if `attr` is linked into this node's attribute list.
    fn owns_attribute(&self, attr: Attribute<'doc>) -> bool {
        let mut cur = self.first_attribute();
        while !cur.is_empty() {
            if cur == attr {
                return true;
            }
            cur = cur.next_attribute();
        }
        false
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Removes and destroys the child `node`, releasing its entire subtree
    /// back to the arena. Returns false if `node` is not a child of this
    /// node. Handles into the removed subtree become dangling.
    pub fn remove_child(&self, node: Node<'doc>) -> bool {
        if self.is_empty() || node.is_empty() || node.parent() != *self {
            return false;
        }
        unsafe {
            let alloc = &mut *tree::node_allocator(self.ptr);
            tree::unlink_node(node.ptr);
            tree::destroy_node(alloc, node.ptr);
        }
        true
    }

    /// Removes the first child with the given name.
    pub fn remove_child_by_name(&self, name: &str) -> bool {
        self.remove_child(self.child(name))
    }

    /// Removes and destroys the attribute `attr`. Returns false if it does
    /// not belong to this node.
    pub fn remove_attribute(&self, attr: Attribute<'doc>) -> bool {
        if self.is_empty() || attr.is_empty() || !self.owns_attribute(attr) {
            return false;
        }
        unsafe {
            let alloc = &mut *tree::node_allocator(self.ptr);
            tree::unlink_attribute(attr.ptr, self.ptr);
            tree::destroy_attribute(alloc, attr.ptr);
        }
        true
    }

    /// Removes the first attribute with the given name.
    pub fn remove_attribute_by_name(&self, name: &str) -> bool {
        self.remove_attribute(self.attribute(name))
    }

    // ------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------

    /// First attribute for which the predicate returns true.
    pub fn find_attribute(&self, mut pred: impl FnMut(Attribute<'doc>) -> bool) -> Attribute<'doc> {
        let mut cur = self.first_attribute();
        while !cur.is_empty() {
            if pred(cur) {
                return cur;
            }
            cur = cur.next_attribute();
        }
        Attribute::empty_handle()
    }

    /// First direct child for which the predicate returns true.
    pub fn find_child(&self, mut pred: impl FnMut(Node<'doc>) -> bool) -> Node<'doc> {
        let mut cur = self.first_child();
        while !cur.is_empty() {
            if pred(cur) {
                return cur;
            }
            cur = cur.next_sibling();
        }
        Node::empty_handle()
    }

    /// First node in the subtree (pre-order, this node excluded) for which
    /// the predicate returns true.
    pub fn find_node(&self, mut pred: impl FnMut(Node<'doc>) -> bool) -> Node<'doc> {
        if self.is_empty() {
            return Node::empty_handle();
        }
        let root = *self;
        let mut cur = self.first_child();
        'walk: while !cur.is_empty() {
            if pred(cur) {
                return cur;
            }
            let child = cur.first_child();
            if !child.is_empty() {
                cur = child;
                continue 'walk;
            }
            loop {
                let sib = cur.next_sibling();
                if !sib.is_empty() {
                    cur = sib;
                    continue 'walk;
                }
                cur = cur.parent();
                if cur.is_empty() || cur == root {
                    break 'walk;
                }
            }
        }
        Node::empty_handle()
    }

    /// First child element with the given name that carries an attribute
    /// with the given name and value.
    pub fn find_child_by_name_and_attribute(
        &self,
        name: &str,
        attr_name: &str,
        attr_value: &str,
    ) -> Node<'doc> {
        self.find_child(|child| {
            child.name() == name
                && !child
                    .find_attribute(|a| a.name() == attr_name && a.value() == attr_value)
                    .is_empty()
        })
    }

    /// First child element carrying an attribute with the given name and
    /// value.
    pub fn find_child_by_attribute(&self, attr_name: &str, attr_value: &str) -> Node<'doc> {
        self.find_child(|child| {
            !child
                .find_attribute(|a| a.name() == attr_name && a.value() == attr_value)
                .is_empty()
        })
    }

    // ------------------------------------------------------------------
    // Paths
    // ------------------------------------------------------------------

    /// Absolute node path from the document root, delimiter-separated.
    pub fn path(&self, delimiter: char) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut parts = Vec::new();
        let mut cur = *self;
        while !cur.is_empty() && cur.kind() != Some(NodeKind::Document) {
            parts.push(cur.name());
            cur = cur.parent();
        }
        let mut out = String::new();
        for name in parts.iter().rev() {
            out.push(delimiter);
            out.push_str(name);
        }
        out
    }

    /// Finds a node by a path of names with `.` and `..` components. A
    /// leading delimiter anchors the search at the document root. Among
    /// several children with a matching name, the first one from which the
    /// rest of the path resolves wins.
    pub fn first_element_by_path(&self, path: &str, delimiter: char) -> Node<'doc> {
        if self.is_empty() {
            return Node::empty_handle();
        }
        match path.strip_prefix(delimiter) {
            Some(rest) => self.root().element_by_path(rest, delimiter),
            None => self.element_by_path(path, delimiter),
        }
    }

    fn element_by_path(&self, path: &str, delimiter: char) -> Node<'doc> {
        if path.is_empty() {
            return *self;
        }
        let (segment, rest) = match path.split_once(delimiter) {
            Some((seg, rest)) => (seg, rest),
            None => (path, ""),
        };
        match segment {
            "" | "." => self.element_by_path(rest, delimiter),
            ".." => {
                let parent = self.parent();
                if parent.is_empty() {
                    Node::empty_handle()
                } else {
                    parent.element_by_path(rest, delimiter)
                }
            }
            name => {
                let mut child = self.first_child();
                while !child.is_empty() {
                    if child.name() == name {
                        let found = child.element_by_path(rest, delimiter);
                        if !found.is_empty() {
                            return found;
                        }
                    }
                    child = child.next_sibling();
                }
                Node::empty_handle()
            }
        }
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Child node iterator.
    pub fn children(&self) -> Children<'doc> {
        Children::new(*self)
    }

    /// Attribute iterator.
    pub fn attributes(&self) -> Attributes<'doc> {
        Attributes::new(*self)
    }

    /// Depth-first traversal with a [`TreeWalker`].
    ///
    /// `begin` returning false aborts before any node is visited. A false
    /// from `for_each` stops visiting, but `end` still runs. The result is
    /// false if `begin` or any `for_each` returned false, otherwise the
    /// result of `end`.
    pub fn traverse<W: TreeWalker>(&self, walker: &mut W) -> bool {
        if self.is_empty() {
            return false;
        }
        let root = *self;

        if !walker.begin(root) {
            return false;
        }

        let mut ok = true;
        let mut cur = root.first_child();
        let mut depth = 0usize;
        'walk: while !cur.is_empty() {
            if !walker.for_each(cur, depth) {
                ok = false;
                break 'walk;
            }
            let child = cur.first_child();
            if !child.is_empty() {
                depth += 1;
                cur = child;
                continue 'walk;
            }
            loop {
                let sib = cur.next_sibling();
                if !sib.is_empty() {
                    cur = sib;
                    continue 'walk;
                }
                cur = cur.parent();
                if cur.is_empty() || cur == root {
                    break 'walk;
                }
                depth -= 1;
            }
        }

        let finished = walker.end(root);
        ok && finished
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Serializes this subtree into `writer`. A document-kind node prints
    /// its children; an empty handle prints nothing.
    pub fn print<W: DocumentWriter + ?Sized>(
        &self,
        writer: &mut W,
        indent: &str,
        flags: FormatFlags,
    ) {
        crate::print::print_subtree(writer, *self, indent, flags);
    }
}

impl Default for Node<'_> {
    fn default() -> Self {
        Node::empty_handle()
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            None => write!(f, "Node(empty)"),
            Some(kind) => write!(f, "Node({kind:?}, name={:?})", self.name()),
        }
    }
}
