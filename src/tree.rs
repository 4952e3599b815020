//! Raw node and attribute records, carved from the arena.
//!
//! Nothing here is exposed directly; the [`Node`](crate::Node) and
//! [`Attribute`](crate::Attribute) handles wrap these records. Parent,
//! previous-sibling and previous-attribute links are non-owning
//! back-references; ownership flows strictly downward (a node owns its
//! children and attributes, and owns its name/value strings only when the
//! corresponding `*_allocated` flag is set; otherwise they borrow from the
//! document's input buffer).

use std::ptr;
use std::slice;
use std::str;

use crate::mem::{Allocator, MemoryPage};

/// Kind of a tree node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A document tree's absolute root.
    Document,
    /// Element tag, e.g. `<node/>`.
    Element,
    /// Plain character data.
    Pcdata,
    /// Character data section, e.g. `<![CDATA[text]]>`.
    Cdata,
    /// Comment, e.g. `<!-- text -->`.
    Comment,
    /// Processing instruction, e.g. `<?name?>`.
    Pi,
    /// Document declaration, e.g. `<?xml version="1.0"?>`.
    Declaration,
    /// Document type declaration, e.g. `<!DOCTYPE doc>`.
    Doctype,
}

/// A raw string reference: either null (absent), borrowed from the document's
/// input buffer, or owned by the arena's string store. Which of the latter
/// two applies is recorded in the entity's header, not here.
#[derive(Clone, Copy)]
#[repr(C)]
pub(crate) struct RawStr {
    pub(crate) ptr: *mut u8,
    pub(crate) len: usize,
}

impl RawStr {
    pub(crate) const EMPTY: RawStr = RawStr {
        ptr: ptr::null_mut(),
        len: 0,
    };

    pub(crate) fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Reads the string. The caller guarantees the backing storage (arena or
    /// input buffer) is still alive and holds valid UTF-8.
    pub(crate) unsafe fn as_str<'a>(&self) -> &'a str {
        if self.ptr.is_null() {
            ""
        } else {
            unsafe { str::from_utf8_unchecked(slice::from_raw_parts(self.ptr, self.len)) }
        }
    }
}

/// Shared prefix of node and attribute records: the owning page plus string
/// ownership flags (false = borrowed from the input buffer).
#[repr(C)]
pub(crate) struct EntityHeader {
    pub(crate) page: *mut MemoryPage,
    pub(crate) name_allocated: bool,
    pub(crate) value_allocated: bool,
}

#[repr(C)]
pub(crate) struct NodeData {
    pub(crate) header: EntityHeader,
    pub(crate) kind: NodeKind,

    pub(crate) name: RawStr,
    pub(crate) value: RawStr,

    pub(crate) parent: *mut NodeData,

    pub(crate) first_child: *mut NodeData,
    pub(crate) last_child: *mut NodeData,

    pub(crate) prev_sibling: *mut NodeData,
    pub(crate) next_sibling: *mut NodeData,

    pub(crate) first_attribute: *mut AttrData,
    pub(crate) last_attribute: *mut AttrData,
}

#[repr(C)]
pub(crate) struct AttrData {
    pub(crate) header: EntityHeader,

    pub(crate) name: RawStr,
    pub(crate) value: RawStr,

    pub(crate) prev_attribute: *mut AttrData,
    pub(crate) next_attribute: *mut AttrData,
}

impl NodeData {
    pub(crate) fn new(page: *mut MemoryPage, kind: NodeKind) -> NodeData {
        NodeData {
            header: EntityHeader {
                page,
                name_allocated: false,
                value_allocated: false,
            },
            kind,
            name: RawStr::EMPTY,
            value: RawStr::EMPTY,
            parent: ptr::null_mut(),
            first_child: ptr::null_mut(),
            last_child: ptr::null_mut(),
            prev_sibling: ptr::null_mut(),
            next_sibling: ptr::null_mut(),
            first_attribute: ptr::null_mut(),
            last_attribute: ptr::null_mut(),
        }
    }
}

/// The arena that owns an entity, recovered through its page back-pointer.
pub(crate) unsafe fn node_allocator(node: *mut NodeData) -> *mut Allocator {
    unsafe { (*(*node).header.page).allocator }
}

pub(crate) unsafe fn attr_allocator(attr: *mut AttrData) -> *mut Allocator {
    unsafe { (*(*attr).header.page).allocator }
}

// ----------------------------------------------------------------------------
// Allocation and destruction
// ----------------------------------------------------------------------------

pub(crate) unsafe fn allocate_node(alloc: &mut Allocator, kind: NodeKind) -> *mut NodeData {
    unsafe {
        match alloc.allocate_memory(size_of::<NodeData>()) {
            Some((mem, page)) => {
                let node = mem as *mut NodeData;
                ptr::write(node, NodeData::new(page, kind));
                node
            }
            None => ptr::null_mut(),
        }
    }
}

pub(crate) unsafe fn allocate_attribute(alloc: &mut Allocator) -> *mut AttrData {
    unsafe {
        match alloc.allocate_memory(size_of::<AttrData>()) {
            Some((mem, page)) => {
                let attr = mem as *mut AttrData;
                ptr::write(
                    attr,
                    AttrData {
                        header: EntityHeader {
                            page,
                            name_allocated: false,
                            value_allocated: false,
                        },
                        name: RawStr::EMPTY,
                        value: RawStr::EMPTY,
                        prev_attribute: ptr::null_mut(),
                        next_attribute: ptr::null_mut(),
                    },
                );
                attr
            }
            None => ptr::null_mut(),
        }
    }
}

/// Releases an attribute's owned strings and its record. The attribute must
/// already be unlinked.
pub(crate) unsafe fn destroy_attribute(alloc: &mut Allocator, attr: *mut AttrData) {
    unsafe {
        if (*attr).header.name_allocated && !(*attr).name.is_null() {
            alloc.deallocate_string((*attr).name.ptr);
        }
        if (*attr).header.value_allocated && !(*attr).value.is_null() {
            alloc.deallocate_string((*attr).value.ptr);
        }
        let page = (*attr).header.page;
        alloc.deallocate_memory(attr as *mut u8, size_of::<AttrData>(), page);
    }
}

/// Releases a whole subtree: owned strings, attributes, descendants, then the
/// record itself. The node must already be unlinked from its parent.
pub(crate) unsafe fn destroy_node(alloc: &mut Allocator, node: *mut NodeData) {
    unsafe {
        if (*node).header.name_allocated && !(*node).name.is_null() {
            alloc.deallocate_string((*node).name.ptr);
        }
        if (*node).header.value_allocated && !(*node).value.is_null() {
            alloc.deallocate_string((*node).value.ptr);
        }

        let mut attr = (*node).first_attribute;
        while !attr.is_null() {
            let next = (*attr).next_attribute;
            destroy_attribute(alloc, attr);
            attr = next;
        }

        let mut child = (*node).first_child;
        while !child.is_null() {
            let next = (*child).next_sibling;
            destroy_node(alloc, child);
            child = next;
        }

        let page = (*node).header.page;
        alloc.deallocate_memory(node as *mut u8, size_of::<NodeData>(), page);
    }
}

// ----------------------------------------------------------------------------
// List linkage
// ----------------------------------------------------------------------------

pub(crate) unsafe fn append_node(child: *mut NodeData, parent: *mut NodeData) {
    unsafe {
        (*child).parent = parent;

        let tail = (*parent).last_child;
        if tail.is_null() {
            (*parent).first_child = child;
            (*parent).last_child = child;
        } else {
            (*tail).next_sibling = child;
            (*child).prev_sibling = tail;
            (*parent).last_child = child;
        }
    }
}

pub(crate) unsafe fn prepend_node(child: *mut NodeData, parent: *mut NodeData) {
    unsafe {
        (*child).parent = parent;

        let head = (*parent).first_child;
        if head.is_null() {
            (*parent).first_child = child;
            (*parent).last_child = child;
        } else {
            (*head).prev_sibling = child;
            (*child).next_sibling = head;
            (*parent).first_child = child;
        }
    }
}

/// Splices `child` immediately before `anchor`, which must be a child of
/// `parent`.
pub(crate) unsafe fn insert_node_before(child: *mut NodeData, anchor: *mut NodeData) {
    unsafe {
        let parent = (*anchor).parent;
        (*child).parent = parent;

        let prev = (*anchor).prev_sibling;
        if prev.is_null() {
            (*parent).first_child = child;
        } else {
            (*prev).next_sibling = child;
        }
        (*child).prev_sibling = prev;
        (*child).next_sibling = anchor;
        (*anchor).prev_sibling = child;
    }
}

pub(crate) unsafe fn insert_node_after(child: *mut NodeData, anchor: *mut NodeData) {
    unsafe {
        let parent = (*anchor).parent;
        (*child).parent = parent;

        let next = (*anchor).next_sibling;
        if next.is_null() {
            (*parent).last_child = child;
        } else {
            (*next).prev_sibling = child;
        }
        (*child).next_sibling = next;
        (*child).prev_sibling = anchor;
        (*anchor).next_sibling = child;
    }
}

/// Unlinks `child` from its parent's child list, fixing neighbors and cached
/// head/tail. Does not release storage.
pub(crate) unsafe fn unlink_node(child: *mut NodeData) {
    unsafe {
        let parent = (*child).parent;

        if (*child).prev_sibling.is_null() {
            (*parent).first_child = (*child).next_sibling;
        } else {
            (*(*child).prev_sibling).next_sibling = (*child).next_sibling;
        }
        if (*child).next_sibling.is_null() {
            (*parent).last_child = (*child).prev_sibling;
        } else {
            (*(*child).next_sibling).prev_sibling = (*child).prev_sibling;
        }

        (*child).parent = ptr::null_mut();
        (*child).prev_sibling = ptr::null_mut();
        (*child).next_sibling = ptr::null_mut();
    }
}

pub(crate) unsafe fn append_attribute(attr: *mut AttrData, node: *mut NodeData) {
    unsafe {
        let tail = (*node).last_attribute;
        if tail.is_null() {
            (*node).first_attribute = attr;
            (*node).last_attribute = attr;
        } else {
            (*tail).next_attribute = attr;
            (*attr).prev_attribute = tail;
            (*node).last_attribute = attr;
        }
    }
}

pub(crate) unsafe fn prepend_attribute(attr: *mut AttrData, node: *mut NodeData) {
    unsafe {
        let head = (*node).first_attribute;
        if head.is_null() {
            (*node).first_attribute = attr;
            (*node).last_attribute = attr;
        } else {
            (*head).prev_attribute = attr;
            (*attr).next_attribute = head;
            (*node).first_attribute = attr;
        }
    }
}

pub(crate) unsafe fn insert_attribute_before(
    attr: *mut AttrData,
    anchor: *mut AttrData,
    node: *mut NodeData,
) {
    unsafe {
        let prev = (*anchor).prev_attribute;
        if prev.is_null() {
            (*node).first_attribute = attr;
        } else {
            (*prev).next_attribute = attr;
        }
        (*attr).prev_attribute = prev;
        (*attr).next_attribute = anchor;
        (*anchor).prev_attribute = attr;
    }
}

pub(crate) unsafe fn insert_attribute_after(
    attr: *mut AttrData,
    anchor: *mut AttrData,
    node: *mut NodeData,
) {
    unsafe {
        let next = (*anchor).next_attribute;
        if next.is_null() {
            (*node).last_attribute = attr;
        } else {
            (*next).prev_attribute = attr;
        }
        (*attr).next_attribute = next;
        (*attr).prev_attribute = anchor;
        (*anchor).next_attribute = attr;
    }
}

pub(crate) unsafe fn unlink_attribute(attr: *mut AttrData, node: *mut NodeData) {
    unsafe {
        if (*attr).prev_attribute.is_null() {
            (*node).first_attribute = (*attr).next_attribute;
        } else {
            (*(*attr).prev_attribute).next_attribute = (*attr).next_attribute;
        }
        if (*attr).next_attribute.is_null() {
            (*node).last_attribute = (*attr).prev_attribute;
        } else {
            (*(*attr).next_attribute).prev_attribute = (*attr).prev_attribute;
        }

        (*attr).prev_attribute = ptr::null_mut();
        (*attr).next_attribute = ptr::null_mut();
    }
}

// ----------------------------------------------------------------------------
// Strings
// ----------------------------------------------------------------------------

/// Replaces an entity string with a fresh copy of `source`.
///
/// Allocates first so that the previous value survives a failed allocation.
/// Returns false on out-of-memory.
pub(crate) unsafe fn set_entity_str(
    alloc: &mut Allocator,
    dest: &mut RawStr,
    allocated: &mut bool,
    source: &str,
) -> bool {
    unsafe {
        let buf = match alloc.allocate_string(source.len()) {
            Some(buf) => buf,
            None => return false,
        };
        if !source.is_empty() {
            ptr::copy_nonoverlapping(source.as_ptr(), buf, source.len());
        }

        if *allocated && !dest.is_null() {
            alloc.deallocate_string(dest.ptr);
        }

        *dest = RawStr {
            ptr: buf,
            len: source.len(),
        };
        *allocated = true;
        true
    }
}

/// Copies `source` into a fresh arena string owned by `dest`. A null source
/// stays null.
unsafe fn copy_entity_str(
    alloc: &mut Allocator,
    dest: &mut RawStr,
    allocated: &mut bool,
    source: RawStr,
) -> bool {
    unsafe {
        if source.is_null() {
            *dest = RawStr::EMPTY;
            *allocated = false;
            return true;
        }
        set_entity_str(alloc, dest, allocated, source.as_str())
    }
}

// ----------------------------------------------------------------------------
// Deep copy
// ----------------------------------------------------------------------------

/// Deep-copies `source`'s attributes onto `dest`, allocating from `dest`'s
/// own arena. Returns false on out-of-memory (partial copies are left linked
/// for the caller to destroy).
unsafe fn copy_attributes(alloc: &mut Allocator, dest: *mut NodeData, source: *mut NodeData) -> bool {
    unsafe {
        let mut attr = (*source).first_attribute;
        while !attr.is_null() {
            let copy = allocate_attribute(alloc);
            if copy.is_null() {
                return false;
            }
            append_attribute(copy, dest);

            if !copy_entity_str(
                alloc,
                &mut (*copy).name,
                &mut (*copy).header.name_allocated,
                (*attr).name,
            ) {
                return false;
            }
            if !copy_entity_str(
                alloc,
                &mut (*copy).value,
                &mut (*copy).header.value_allocated,
                (*attr).value,
            ) {
                return false;
            }

            attr = (*attr).next_attribute;
        }
        true
    }
}

/// Deep-copies `source`'s name, value, attributes and descendants onto the
/// freshly allocated `dest`. Never shares storage with the source tree, so
/// the copy is valid across documents. `skip` is the copy's own root; when
/// the destination lives inside the source subtree the copy must not descend
/// into itself.
pub(crate) unsafe fn copy_tree(
    alloc: &mut Allocator,
    dest: *mut NodeData,
    source: *mut NodeData,
    skip: *mut NodeData,
) -> bool {
    unsafe {
        if !copy_entity_str(
            alloc,
            &mut (*dest).name,
            &mut (*dest).header.name_allocated,
            (*source).name,
        ) {
            return false;
        }
        if !copy_entity_str(
            alloc,
            &mut (*dest).value,
            &mut (*dest).header.value_allocated,
            (*source).value,
        ) {
            return false;
        }

        if !copy_attributes(alloc, dest, source) {
            return false;
        }

        let mut child = (*source).first_child;
        while !child.is_null() {
            if child != skip {
                let copy = allocate_node(alloc, (*child).kind);
                if copy.is_null() {
                    return false;
                }
                append_node(copy, dest);

                if !copy_tree(alloc, copy, child, skip) {
                    return false;
                }
            }

            child = (*child).next_sibling;
        }

        true
    }
}

/// Deep-copies a single attribute's strings onto `dest`.
pub(crate) unsafe fn copy_attribute(alloc: &mut Allocator, dest: *mut AttrData, source: *mut AttrData) -> bool {
    unsafe {
        copy_entity_str(
            alloc,
            &mut (*dest).name,
            &mut (*dest).header.name_allocated,
            (*source).name,
        ) && copy_entity_str(
            alloc,
            &mut (*dest).value,
            &mut (*dest).header.value_allocated,
            (*source).value,
        )
    }
}

// Seed sizing depends on these layouts; keep them honest.
const _: () = assert!(size_of::<NodeData>() % size_of::<usize>() == 0);
const _: () = assert!(size_of::<AttrData>() % size_of::<usize>() == 0);
