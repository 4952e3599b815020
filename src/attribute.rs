//! Attribute handles.

use std::fmt;
use std::marker::PhantomData;

use crate::Document;
use crate::tree::{self, AttrData, NodeData};

/// A lightweight handle to an attribute of a node.
///
/// Same contract as [`Node`](crate::Node): no ownership, address-based
/// equality/ordering/hashing, empty sentinel handles, and a lifetime tied to
/// the owning [`Document`] borrow.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attribute<'doc> {
    pub(crate) ptr: *mut AttrData,
    pub(crate) parent: *mut NodeData,
    pub(crate) marker: PhantomData<&'doc Document>,
}

impl<'doc> Attribute<'doc> {
    pub(crate) fn from_raw(ptr: *mut AttrData, parent: *mut NodeData) -> Attribute<'doc> {
        // Normalize so all empty handles compare equal.
        if ptr.is_null() {
            return Attribute::empty_handle();
        }
        Attribute {
            ptr,
            parent,
            marker: PhantomData,
        }
    }

    pub(crate) fn empty_handle() -> Attribute<'doc> {
        Attribute {
            ptr: std::ptr::null_mut(),
            parent: std::ptr::null_mut(),
            marker: PhantomData,
        }
    }

    /// True if this is the empty sentinel handle.
    pub fn is_empty(&self) -> bool {
        self.ptr.is_null()
    }

    /// The attribute's name, or `""` for an empty handle.
    pub fn name(&self) -> &'doc str {
        if self.is_empty() {
            ""
        } else {
            unsafe { (*self.ptr).name.as_str() }
        }
    }

    /// The attribute's value, or `""`.
    pub fn value(&self) -> &'doc str {
        if self.is_empty() {
            ""
        } else {
            unsafe { (*self.ptr).value.as_str() }
        }
    }

    /// Next attribute in the owning node's list, or empty.
    pub fn next_attribute(&self) -> Attribute<'doc> {
        if self.is_empty() {
            Attribute::empty_handle()
        } else {
            Attribute::from_raw(unsafe { (*self.ptr).next_attribute }, self.parent)
        }
    }

    /// Previous attribute, or empty.
    pub fn previous_attribute(&self) -> Attribute<'doc> {
        if self.is_empty() {
            Attribute::empty_handle()
        } else {
            Attribute::from_raw(unsafe { (*self.ptr).prev_attribute }, self.parent)
        }
    }

    // ------------------------------------------------------------------
    // Typed value reads
    // ------------------------------------------------------------------

    /// The value parsed as `i64`, or 0 when the attribute is empty or the
    /// value does not parse.
    pub fn as_int(&self) -> i64 {
        self.value().trim().parse().unwrap_or(0)
    }

    /// The value parsed as `u64`, or 0.
    pub fn as_uint(&self) -> u64 {
        self.value().trim().parse().unwrap_or(0)
    }

    /// The value parsed as `f64`, or 0.0.
    pub fn as_double(&self) -> f64 {
        self.value().trim().parse().unwrap_or(0.0)
    }

    /// The value parsed as `f32`, or 0.0.
    pub fn as_float(&self) -> f32 {
        self.value().trim().parse().unwrap_or(0.0)
    }

    /// True if the value starts with one of `1`, `t`, `T`, `y`, `Y`.
    pub fn as_bool(&self) -> bool {
        matches!(
            self.value().as_bytes().first(),
            Some(b'1' | b't' | b'T' | b'y' | b'Y')
        )
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Sets the attribute's name. Returns false if the handle is empty or
    /// allocation fails (the old name is kept).
    pub fn set_name(&self, name: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        unsafe {
            let alloc = &mut *tree::attr_allocator(self.ptr);
            let data = &mut *self.ptr;
            tree::set_entity_str(alloc, &mut data.name, &mut data.header.name_allocated, name)
        }
    }

    /// Sets the attribute's value. Accepts anything convertible to an
    /// attribute value: `&str`, integers, floats, or `bool` (written as
    /// `"true"`/`"false"`).
    pub fn set_value<V: AttributeValue>(&self, value: V) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut buf = String::new();
        let text = value.format_into(&mut buf);
        unsafe {
            let alloc = &mut *tree::attr_allocator(self.ptr);
            let data = &mut *self.ptr;
            tree::set_entity_str(
                alloc,
                &mut data.value,
                &mut data.header.value_allocated,
                text,
            )
        }
    }
}

impl Default for Attribute<'_> {
    fn default() -> Self {
        Attribute::empty_handle()
    }
}

impl fmt::Debug for Attribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "Attribute(empty)")
        } else {
            write!(f, "Attribute({:?}={:?})", self.name(), self.value())
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Types accepted by [`Attribute::set_value`].
pub trait AttributeValue: sealed::Sealed {
    /// Renders the value, borrowing `buf` as scratch space when needed.
    #[doc(hidden)]
    fn format_into<'a>(&'a self, buf: &'a mut String) -> &'a str;
}

impl sealed::Sealed for &str {}
impl AttributeValue for &str {
    fn format_into<'a>(&'a self, _buf: &'a mut String) -> &'a str {
        self
    }
}

impl sealed::Sealed for bool {}
impl AttributeValue for bool {
    fn format_into<'a>(&'a self, _buf: &'a mut String) -> &'a str {
        if *self { "true" } else { "false" }
    }
}

macro_rules! display_attribute_value {
    ($($ty:ty),*) => {
        $(
            impl sealed::Sealed for $ty {}
            impl AttributeValue for $ty {
                fn format_into<'a>(&'a self, buf: &'a mut String) -> &'a str {
                    use std::fmt::Write;
                    let _ = write!(buf, "{self}");
                    buf
                }
            }
        )*
    };
}

display_attribute_value!(i32, i64, u32, u64, f32, f64);
