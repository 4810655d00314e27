//! Deferred deallocation for track buffers
//!
//! Track buffers are wrapped in `basedrop::Shared<T>`. When the last reference
//! is dropped on the render thread (a crossfade completing, `stop()`), the
//! pointer is only enqueued; the memory is freed on a background collector
//! thread.
//!
//! ```ignore
//! use basedrop::Shared;
//! use crate::engine::gc::gc_handle;
//!
//! let audio = Shared::new(&gc_handle(), StereoBuffer::silence(44100));
//! drop(audio); // queued for the collector, not freed here
//! ```

use basedrop::{Collector, Handle};
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// How often the collector thread reclaims retired buffers
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

fn init_gc() -> Handle {
    let mut collector = Collector::new();
    let handle = collector.handle();

    let spawned = thread::Builder::new()
        .name("segue-gc".to_string())
        .spawn(move || {
            log::info!("Buffer GC thread started");
            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        });

    if let Err(e) = spawned {
        // Retired buffers are leaked rather than freed on the render thread
        log::error!("Failed to spawn buffer GC thread: {}", e);
    }

    handle
}

/// Handle for creating `Shared<T>` allocations
///
/// The collector thread is started on first use.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use basedrop::Shared;

    #[test]
    fn test_shared_drop_is_deferred() {
        let a = Shared::new(&gc_handle(), vec![0.0f32; 1024]);
        let b = a.clone();
        drop(a);
        assert_eq!(b.len(), 1024);
        drop(b);
    }
}
