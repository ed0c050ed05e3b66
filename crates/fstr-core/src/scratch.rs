#![forbid(unsafe_code)]

//! Thread-local pool of scratch `String` buffers.
//!
//! Rendering checks a buffer out only when the output needs more than one
//! piece of text. The [`ScratchBuffer`] guard clears the buffer and returns
//! it to the owning thread's pool when dropped, so every exit path (success,
//! error, unwind) gives the buffer back exactly once.
//!
//! # Invariants
//!
//! 1. Pooled buffers are empty and have at least [`DEFAULT_CAPACITY`] bytes.
//! 2. At most [`MAX_POOLED`] buffers are retained per thread.
//! 3. Buffers that grew beyond [`MAX_RETAINED_CAPACITY`] are dropped instead
//!    of pooled.

use std::cell::RefCell;
use std::ops::{Deref, DerefMut};

/// Capacity of freshly allocated scratch buffers. Large enough that typical
/// renders never reallocate.
pub const DEFAULT_CAPACITY: usize = 8 * 1024;

/// Buffers kept per thread. Nested template renders check out one each.
pub const MAX_POOLED: usize = 4;

/// Larger buffers are released to the allocator rather than kept.
pub const MAX_RETAINED_CAPACITY: usize = 256 * 1024;

thread_local! {
    static POOL: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// A scratch buffer checked out of the current thread's pool.
#[derive(Debug)]
pub struct ScratchBuffer {
    buf: Option<String>,
}

impl ScratchBuffer {
    /// Take a pooled buffer, or allocate one with [`DEFAULT_CAPACITY`].
    #[must_use]
    pub fn checkout() -> Self {
        let pooled = POOL.try_with(|pool| pool.borrow_mut().pop()).ok().flatten();
        let buf = pooled.unwrap_or_else(|| String::with_capacity(DEFAULT_CAPACITY));
        Self { buf: Some(buf) }
    }

    fn inner(&self) -> &String {
        match &self.buf {
            Some(buf) => buf,
            None => panic!("scratch buffer used after release"),
        }
    }

    fn inner_mut(&mut self) -> &mut String {
        match &mut self.buf {
            Some(buf) => buf,
            None => panic!("scratch buffer used after release"),
        }
    }

    fn release(&mut self) {
        let Some(mut buf) = self.buf.take() else {
            panic!("scratch buffer released twice");
        };
        if buf.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        buf.clear();
        // The pool is gone during thread teardown; the buffer is simply freed.
        let _ = POOL.try_with(|pool| {
            let mut pool = pool.borrow_mut();
            if pool.len() < MAX_POOLED {
                pool.push(buf);
            }
        });
    }
}

impl Deref for ScratchBuffer {
    type Target = String;

    fn deref(&self) -> &String {
        self.inner()
    }
}

impl DerefMut for ScratchBuffer {
    fn deref_mut(&mut self) -> &mut String {
        self.inner_mut()
    }
}

impl Drop for ScratchBuffer {
    fn drop(&mut self) {
        if self.buf.is_some() {
            self.release();
        }
    }
}

/// Number of buffers currently pooled on this thread.
#[must_use]
pub fn pooled_buffers() -> usize {
    POOL.try_with(|pool| pool.borrow().len()).unwrap_or(0)
}

/// Drop every pooled buffer on this thread.
pub fn clear_pool() {
    let _ = POOL.try_with(|pool| pool.borrow_mut().clear());
}
