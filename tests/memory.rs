//! Arena behavior observed through custom memory policies.
//!
//! Policies are plain function pointers, so each test gets its own statics
//! for bookkeeping (tests run concurrently and must not share counters).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use pagedom::{Document, MemoryPolicy, ParseOptions, system_allocate, system_deallocate};

mod teardown {
    use super::*;

    static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
    static FREED: AtomicUsize = AtomicUsize::new(0);

    fn allocate(size: usize) -> *mut u8 {
        ALLOCATED.fetch_add(size, Ordering::Relaxed);
        system_allocate(size)
    }

    fn deallocate(ptr: *mut u8, size: usize) {
        FREED.fetch_add(size, Ordering::Relaxed);
        system_deallocate(ptr, size)
    }

    #[test]
    fn dropping_a_document_returns_every_byte() {
        let policy = MemoryPolicy {
            allocate,
            deallocate,
        };

        {
            let mut doc = Document::with_policy(policy);
            let mut markup = String::from("<list>");
            for i in 0..5000 {
                markup.push_str(&format!("<item id='{i}'>value {i}</item>"));
            }
            markup.push_str("</list>");

            let result = doc.load_str(&markup, ParseOptions::default());
            assert!(result.ok());
            assert_eq!(doc.document_element().children().count(), 5000);
            assert!(ALLOCATED.load(Ordering::Relaxed) > 0);
        }

        assert_eq!(
            ALLOCATED.load(Ordering::Relaxed),
            FREED.load(Ordering::Relaxed),
            "arena leaked policy-allocated bytes"
        );
    }
}

mod reset {
    use super::*;

    static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
    static FREED: AtomicUsize = AtomicUsize::new(0);

    fn allocate(size: usize) -> *mut u8 {
        ALLOCATED.fetch_add(size, Ordering::Relaxed);
        system_allocate(size)
    }

    fn deallocate(ptr: *mut u8, size: usize) {
        FREED.fetch_add(size, Ordering::Relaxed);
        system_deallocate(ptr, size)
    }

    #[test]
    fn reset_releases_all_pages() {
        let policy = MemoryPolicy {
            allocate,
            deallocate,
        };

        let mut doc = Document::with_policy(policy);
        let root = doc.root().append_element("root");
        for _ in 0..2000 {
            root.append_element("node").append_attribute("a");
        }
        assert!(ALLOCATED.load(Ordering::Relaxed) > 0);

        doc.reset();
        assert_eq!(
            ALLOCATED.load(Ordering::Relaxed),
            FREED.load(Ordering::Relaxed)
        );

        // The document keeps working from its seed page onward.
        let again = doc.root().append_element("again");
        assert_eq!(again.name(), "again");
    }
}

mod exhaustion {
    use super::*;

    static REFUSE: AtomicBool = AtomicBool::new(false);

    fn allocate(size: usize) -> *mut u8 {
        if REFUSE.load(Ordering::Relaxed) {
            std::ptr::null_mut()
        } else {
            system_allocate(size)
        }
    }

    #[test]
    fn allocation_failure_is_not_fatal() {
        let policy = MemoryPolicy {
            allocate,
            deallocate: system_deallocate,
        };

        let mut doc = Document::with_policy(policy);
        doc.load_str("<root><kept/></root>", ParseOptions::default());
        let root = doc.document_element();

        REFUSE.store(true, Ordering::Relaxed);
        // Fill whatever headroom the current page has; eventually the arena
        // needs a new page and the mutation fails with an empty handle.
        let mut failed = false;
        for i in 0..100_000 {
            let child = root.append_element("filler");
            if child.is_empty() {
                failed = true;
                break;
            }
            assert!(i < 99_999, "allocator never ran out");
        }
        assert!(failed);
        REFUSE.store(false, Ordering::Relaxed);

        // The pre-existing tree is intact and growth resumes.
        assert_eq!(root.child("kept").name(), "kept");
        assert!(!root.append_element("recovered").is_empty());
    }
}

mod string_failure {
    use super::*;

    static REFUSE: AtomicBool = AtomicBool::new(false);

    fn allocate(size: usize) -> *mut u8 {
        if REFUSE.load(Ordering::Relaxed) {
            std::ptr::null_mut()
        } else {
            system_allocate(size)
        }
    }

    #[test]
    fn failed_set_value_keeps_the_old_string() {
        let policy = MemoryPolicy {
            allocate,
            deallocate: system_deallocate,
        };

        let mut doc = Document::with_policy(policy);
        doc.load_str("<m/>", ParseOptions::default());
        let attr = doc.document_element().append_attribute("k");
        assert!(attr.set_value("original"));

        REFUSE.store(true, Ordering::Relaxed);
        // A huge value forces a fresh page, which the policy refuses.
        let huge = "x".repeat(pagedom::PAGE_SIZE * 2);
        let ok = attr.set_value(huge.as_str());
        REFUSE.store(false, Ordering::Relaxed);

        assert!(!ok);
        assert_eq!(attr.value(), "original");
    }
}

#[test]
fn interleaved_growth_and_removal_stays_consistent() {
    let mut doc = Document::new();
    doc.load_str("<arena/>", ParseOptions::default());
    let root = doc.document_element();

    for round in 0..50 {
        let batch = root.append_element("batch");
        for i in 0..100 {
            let item = batch.append_element("item");
            item.append_attribute("n").set_value(i as i64);
            item.append_child(pagedom::NodeKind::Pcdata)
                .set_value("some payload text for the arena");
        }
        assert_eq!(batch.children().count(), 100);

        if round % 2 == 0 {
            assert!(root.remove_child(batch));
        }
    }

    // Odd rounds survive.
    assert_eq!(root.children().count(), 25);
    for batch in root.children() {
        assert_eq!(batch.children().count(), 100);
        assert_eq!(batch.last_child().attribute("n").as_int(), 99);
    }
}
