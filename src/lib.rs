//! RustyDTM - lazily built XML document tables with XPath location paths
//!
//! Layers:
//! - sax / core: construction events, and a pull reader turning XML text into them
//! - dom: externally owned trees a DTM can be built from
//! - dtm: the Document Table Model (identity-indexed node columns, built on demand)
//! - xpath: axis iterators and document-order evaluation of location paths
//! - strategy: parallel work over independent documents
//!
//! ```
//! use rustydtm::xpath::{Axis, LocationPath, NodeTest, Predicate};
//! use rustydtm::{Dtm, DtmConfig, Navigator};
//!
//! let mut dtm = Dtm::parse("<a><b/><b/><b/></a>", DtmConfig::default()).unwrap();
//! let path = LocationPath::builder()
//!     .step(Axis::Child, NodeTest::name("a"))
//!     .step(Axis::Child, NodeTest::name("b"))
//!     .predicate(Predicate::Position(2))
//!     .build()
//!     .unwrap();
//! let root = dtm.document_node();
//! let nodes = path.select(&mut dtm, root).unwrap();
//! assert_eq!(nodes.len(), 1);
//! assert_eq!(dtm.node_name(nodes[0]), "b");
//! ```

pub mod config;
pub mod core;
pub mod dom;
pub mod dtm;
pub mod error;
pub mod sax;
pub mod strategy;
pub mod xpath;

pub use config::DtmConfig;
pub use dtm::{Dtm, DtmManager, Navigator, NodeHandle, NodeType};
pub use error::{DtmError, PathError};
pub use xpath::{Axis, AxisIterator, LocationPath, NodeFilter, PathEvaluation};

// ============================================================================
// Allocator Configuration
// ============================================================================

// Both features install a `#[global_allocator]`; they are off by default and
// only belong in a binary that declares no allocator of its own.

#[cfg(feature = "memory_tracking")]
mod tracking {
    use std::alloc::{GlobalAlloc, Layout};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub static ALLOCATED: AtomicUsize = AtomicUsize::new(0);
    pub static PEAK_ALLOCATED: AtomicUsize = AtomicUsize::new(0);

    pub struct TrackingAllocator;

    #[cfg(feature = "mimalloc")]
    static UNDERLYING: mimalloc::MiMalloc = mimalloc::MiMalloc;

    #[cfg(not(feature = "mimalloc"))]
    static UNDERLYING: std::alloc::System = std::alloc::System;

    fn record_peak(current: usize) {
        let mut peak = PEAK_ALLOCATED.load(Ordering::Relaxed);
        while current > peak {
            match PEAK_ALLOCATED.compare_exchange_weak(peak, current, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(p) => peak = p,
            }
        }
    }

    unsafe impl GlobalAlloc for TrackingAllocator {
        unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
            let ptr = UNDERLYING.alloc(layout);
            if !ptr.is_null() {
                record_peak(ALLOCATED.fetch_add(layout.size(), Ordering::Relaxed) + layout.size());
            }
            ptr
        }

        unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
            ALLOCATED.fetch_sub(layout.size(), Ordering::Relaxed);
            UNDERLYING.dealloc(ptr, layout)
        }
    }
}

#[cfg(feature = "memory_tracking")]
#[global_allocator]
static GLOBAL: tracking::TrackingAllocator = tracking::TrackingAllocator;

#[cfg(all(feature = "mimalloc", not(feature = "memory_tracking")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Heap usage as seen by the tracking allocator; all zero without the
/// `memory_tracking` feature
pub mod memory {
    #[cfg(feature = "memory_tracking")]
    use std::sync::atomic::Ordering;

    #[cfg(feature = "memory_tracking")]
    use super::tracking::{ALLOCATED, PEAK_ALLOCATED};

    /// Bytes currently allocated
    #[cfg(feature = "memory_tracking")]
    pub fn current() -> usize {
        ALLOCATED.load(Ordering::SeqCst)
    }

    /// High-water mark since start or the last [`reset`]
    #[cfg(feature = "memory_tracking")]
    pub fn peak() -> usize {
        PEAK_ALLOCATED.load(Ordering::SeqCst)
    }

    /// Restart peak tracking from the current usage; returns `(current, old_peak)`
    #[cfg(feature = "memory_tracking")]
    pub fn reset() -> (usize, usize) {
        let current = ALLOCATED.load(Ordering::SeqCst);
        let peak = PEAK_ALLOCATED.swap(current, Ordering::SeqCst);
        (current, peak)
    }

    #[cfg(not(feature = "memory_tracking"))]
    pub fn current() -> usize {
        0
    }

    #[cfg(not(feature = "memory_tracking"))]
    pub fn peak() -> usize {
        0
    }

    #[cfg(not(feature = "memory_tracking"))]
    pub fn reset() -> (usize, usize) {
        (0, 0)
    }
}

// ============================================================================
// Convenience entry points
// ============================================================================

/// Lenient, lazily built DTM over `xml`
pub fn parse(xml: impl Into<String>) -> Result<Dtm, DtmError> {
    Dtm::parse(xml, DtmConfig::default())
}

/// Every node `path` selects from the document node, in document order
pub fn select(dtm: &mut Dtm, path: &LocationPath) -> Result<Vec<NodeHandle>, PathError> {
    let root = dtm.document_node();
    path.select(dtm, root)
}
