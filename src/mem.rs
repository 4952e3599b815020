//! Page-based memory arena.
//!
//! Every byte a [`Document`](crate::Document) occupies comes from here: node
//! and attribute records, heap-allocated strings, everything. Storage is
//! carved out of fixed-size pages by bumping a cursor; individual frees only
//! update per-page counters, and a page is returned to the backing allocator
//! once every byte allocated from it has been freed. Destroying a document
//! therefore releases the whole tree in O(pages), never O(nodes).
//!
//! Strings get a two-`u16` header directly in front of the character data,
//! which is enough to map a bare string pointer back to its owning page and
//! allocation size. This is why pages (and offsets within them) must stay
//! below 65536 bytes.

use std::alloc::Layout;
use std::ptr;

use crate::tracing_macros::trace;

/// Size of a standard arena page, in bytes.
pub const PAGE_SIZE: usize = 32 * 1024;

/// Pages are aligned up to this boundary within their backing block.
const PAGE_ALIGNMENT: usize = 32;

/// Requests above this go into their own exactly-sized page.
const LARGE_ALLOCATION_THRESHOLD: usize = PAGE_SIZE / 4;

/// Raw allocation entry point: returns a pointer to `size` bytes (alignment 1)
/// or null on failure.
pub type AllocateFn = fn(size: usize) -> *mut u8;

/// Raw deallocation entry point; `size` is the exact value that was passed to
/// the matching [`AllocateFn`] call.
pub type DeallocateFn = fn(ptr: *mut u8, size: usize);

/// Allocation policy injected at document construction time.
///
/// Defaults to the system allocator. A custom policy redirects every
/// system-level allocation the document's arena performs, which is handy for
/// pooled or instrumented allocators. The policy is captured when the
/// document is created; swapping it later has no effect on that document.
#[derive(Clone, Copy, Debug)]
pub struct MemoryPolicy {
    /// Allocates a raw block.
    pub allocate: AllocateFn,
    /// Releases a block previously returned by `allocate`.
    pub deallocate: DeallocateFn,
}

impl MemoryPolicy {
    /// The default policy backed by `std::alloc`.
    pub fn system() -> Self {
        MemoryPolicy {
            allocate: system_allocate,
            deallocate: system_deallocate,
        }
    }
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        MemoryPolicy::system()
    }
}

/// System allocator shim usable as a building block for custom policies.
pub fn system_allocate(size: usize) -> *mut u8 {
    debug_assert!(size > 0);
    // Alignment is handled by the arena itself (pages are over-allocated and
    // aligned upward), so byte alignment is sufficient here.
    unsafe { std::alloc::alloc(Layout::from_size_align_unchecked(size, 1)) }
}

/// Deallocation counterpart of [`system_allocate`].
pub fn system_deallocate(ptr: *mut u8, size: usize) {
    unsafe { std::alloc::dealloc(ptr, Layout::from_size_align_unchecked(size, 1)) }
}

/// Header of an arena page, written at the aligned start of its block.
///
/// Invariant: `freed_size <= busy_size` at all times. A page whose counters
/// meet is either reset in place (if it is the terminal page) or unlinked and
/// released.
#[repr(C)]
pub(crate) struct MemoryPage {
    /// Arena this page belongs to.
    pub(crate) allocator: *mut Allocator,
    /// Address actually returned by the policy; null for a document's boxed
    /// seed page, which is never released through the policy.
    block: *mut u8,
    /// Size requested from the policy, needed to release the block.
    block_size: usize,
    pub(crate) prev: *mut MemoryPage,
    pub(crate) next: *mut MemoryPage,
    pub(crate) busy_size: usize,
    pub(crate) freed_size: usize,
}

impl MemoryPage {
    /// Writes an empty page header at `memory`, which must be suitably
    /// aligned and large enough for the header plus the page's data area.
    pub(crate) unsafe fn construct(memory: *mut u8) -> *mut MemoryPage {
        let page = memory as *mut MemoryPage;
        unsafe {
            ptr::write(
                page,
                MemoryPage {
                    allocator: ptr::null_mut(),
                    block: ptr::null_mut(),
                    block_size: 0,
                    prev: ptr::null_mut(),
                    next: ptr::null_mut(),
                    busy_size: 0,
                    freed_size: 0,
                },
            );
        }
        page
    }
}

/// First byte of the page's data area.
pub(crate) unsafe fn page_data(page: *mut MemoryPage) -> *mut u8 {
    unsafe { (page as *mut u8).add(size_of::<MemoryPage>()) }
}

/// Header preceding every string allocated from the arena.
///
/// `page_offset` is the offset of this header from the page's data area.
/// `full_size` is the rounded allocation size; 0 is a sentinel meaning "this
/// string occupies the entire page", used when the true size does not fit in
/// sixteen bits.
#[repr(C)]
struct StringHeader {
    page_offset: u16,
    full_size: u16,
}

/// The arena proper: a doubly-linked list of pages, with `root` (the list
/// tail) receiving bump allocations.
///
/// `busy_size` mirrors `root.busy_size` so the fast path touches one struct.
pub(crate) struct Allocator {
    policy: MemoryPolicy,
    pub(crate) root: *mut MemoryPage,
    pub(crate) busy_size: usize,
}

impl Allocator {
    /// Creates an arena with no pages yet. The caller must install a root
    /// page (typically a document's seed page, marked full) and point its
    /// `allocator` field back at this struct's final resting address.
    pub(crate) fn uninit(policy: MemoryPolicy) -> Allocator {
        Allocator {
            policy,
            root: ptr::null_mut(),
            busy_size: 0,
        }
    }

    /// Requests a fresh page with room for `data_size` bytes of data.
    /// Returns null on allocation failure.
    pub(crate) unsafe fn allocate_page(&mut self, data_size: usize) -> *mut MemoryPage {
        let size = size_of::<MemoryPage>() + data_size;

        // Over-allocate so the page header can be aligned upward.
        let block = (self.policy.allocate)(size + PAGE_ALIGNMENT);
        if block.is_null() {
            return ptr::null_mut();
        }

        let aligned = (block as usize + (PAGE_ALIGNMENT - 1)) & !(PAGE_ALIGNMENT - 1);

        unsafe {
            let page = MemoryPage::construct(aligned as *mut u8);
            (*page).block = block;
            (*page).block_size = size + PAGE_ALIGNMENT;
            (*page).allocator = self as *mut Allocator;

            trace!(data_size, "allocated arena page");
            page
        }
    }

    /// Releases a page's backing block. Seed pages (null block) are skipped;
    /// their storage belongs to the document itself.
    pub(crate) unsafe fn deallocate_page(&mut self, page: *mut MemoryPage) {
        unsafe {
            let block = (*page).block;
            if !block.is_null() {
                (self.policy.deallocate)(block, (*page).block_size);
            }
        }
    }

    /// Allocates `size` bytes, returning the slice and its owning page.
    ///
    /// `size` must be a multiple of the pointer size so that bump offsets
    /// stay aligned for entity records.
    pub(crate) unsafe fn allocate_memory(&mut self, size: usize) -> Option<(*mut u8, *mut MemoryPage)> {
        if self.busy_size + size > PAGE_SIZE {
            return unsafe { self.allocate_memory_oob(size) };
        }

        unsafe {
            let buf = page_data(self.root).add(self.busy_size);
            self.busy_size += size;
            Some((buf, self.root))
        }
    }

    /// Out-of-band path: the request does not fit in the current root page.
    #[cold]
    unsafe fn allocate_memory_oob(&mut self, size: usize) -> Option<(*mut u8, *mut MemoryPage)> {
        unsafe {
            let page = self.allocate_page(if size <= LARGE_ALLOCATION_THRESHOLD {
                PAGE_SIZE
            } else {
                size
            });
            if page.is_null() {
                return None;
            }

            if size <= LARGE_ALLOCATION_THRESHOLD {
                (*self.root).busy_size = self.busy_size;

                // Append at the tail of the page list; this page becomes the
                // new bump target.
                (*page).prev = self.root;
                (*self.root).next = page;
                self.root = page;

                self.busy_size = size;
            } else {
                // Oversized page: splice it before the root so it does not
                // block the bump page, and becomes releasable as soon as its
                // single occupant is freed.
                (*page).prev = (*self.root).prev;
                (*page).next = self.root;

                if !(*self.root).prev.is_null() {
                    (*(*self.root).prev).next = page;
                }
                (*self.root).prev = page;
            }

            (*page).busy_size = size;

            Some((page_data(page), page))
        }
    }

    /// Returns `size` bytes at `ptr` to `page`.
    ///
    /// When the page's counters meet it is reset in place (terminal page) or
    /// unlinked and released. The terminal page is never released this way,
    /// which avoids thrashing on repeated allocate/free at the tip.
    pub(crate) unsafe fn deallocate_memory(&mut self, ptr: *mut u8, size: usize, page: *mut MemoryPage) {
        unsafe {
            if page == self.root {
                (*page).busy_size = self.busy_size;
            }

            debug_assert!(
                ptr >= page_data(page) && ptr < page_data(page).add((*page).busy_size)
            );
            let _ = ptr;

            (*page).freed_size += size;
            debug_assert!((*page).freed_size <= (*page).busy_size);

            if (*page).freed_size == (*page).busy_size {
                if (*page).next.is_null() {
                    debug_assert!(self.root == page);

                    // Terminal page fully freed: reset in place, keep it.
                    (*page).busy_size = 0;
                    (*page).freed_size = 0;
                    self.busy_size = 0;
                } else {
                    debug_assert!(self.root != page);

                    // An oversized page spliced in front of the whole list
                    // has no predecessor.
                    if !(*page).prev.is_null() {
                        (*(*page).prev).next = (*page).next;
                    }
                    (*(*page).next).prev = (*page).prev;

                    self.deallocate_page(page);
                }
            }
        }
    }

    /// Allocates a character buffer of `length` bytes, prefixed with a
    /// [`StringHeader`]. Returns a pointer just past the header.
    pub(crate) unsafe fn allocate_string(&mut self, length: usize) -> Option<*mut u8> {
        let size = size_of::<StringHeader>() + length;

        // Round up to pointer alignment so subsequent bump allocations stay
        // aligned for entity records.
        let full_size = (size + (size_of::<usize>() - 1)) & !(size_of::<usize>() - 1);

        unsafe {
            let (mem, page) = self.allocate_memory(full_size)?;

            let header = mem as *mut StringHeader;
            let page_offset = mem as usize - page_data(page) as usize;

            debug_assert!(page_offset < (1 << 16));
            (*header).page_offset = page_offset as u16;

            // full_size == 0 marks strings that occupy the whole page.
            debug_assert!(
                full_size < (1 << 16) || ((*page).busy_size == full_size && page_offset == 0)
            );
            (*header).full_size = if full_size < (1 << 16) {
                full_size as u16
            } else {
                0
            };

            Some(mem.add(size_of::<StringHeader>()))
        }
    }

    /// Frees a string previously returned by [`Allocator::allocate_string`]
    /// on this arena. Double frees are not detected.
    pub(crate) unsafe fn deallocate_string(&mut self, string: *mut u8) {
        unsafe {
            let header = string.sub(size_of::<StringHeader>()) as *mut StringHeader;

            // Recover the owning page from the header's page-relative offset.
            let page_offset = size_of::<MemoryPage>() + (*header).page_offset as usize;
            let page = (header as *mut u8).sub(page_offset) as *mut MemoryPage;

            // A zero full_size means the string is the page's sole occupant.
            let full_size = if (*header).full_size == 0 {
                (*page).busy_size
            } else {
                (*header).full_size as usize
            };

            self.deallocate_memory(header as *mut u8, full_size, page);
        }
    }

    /// Releases every policy-owned page. The arena is unusable afterwards
    /// until re-seeded.
    pub(crate) unsafe fn release_pages(&mut self) {
        unsafe {
            // The root page is the tail of the list, so walking `prev` from
            // it visits every page exactly once.
            let mut page = self.root;
            while !page.is_null() {
                let prev = (*page).prev;
                self.deallocate_page(page);
                page = prev;
            }
            self.root = ptr::null_mut();
            self.busy_size = 0;
        }
    }

    /// Live bytes across all pages; test instrumentation.
    #[cfg(test)]
    pub(crate) unsafe fn total_live(&self) -> usize {
        unsafe {
            let mut total = 0usize;
            let mut page = self.root;
            while !page.is_null() {
                let busy = if page == self.root {
                    self.busy_size
                } else {
                    (*page).busy_size
                };
                total += busy - (*page).freed_size;
                page = (*page).prev;
            }
            total
        }
    }

    /// Number of pages currently linked into the arena; test instrumentation.
    #[cfg(test)]
    pub(crate) unsafe fn page_count(&self) -> usize {
        unsafe {
            let mut count = 0usize;
            let mut page = self.root;
            while !page.is_null() {
                count += 1;
                page = (*page).prev;
            }
            count
        }
    }
}
