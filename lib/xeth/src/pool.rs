// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Size-classed buffer pools for the sideband.
//!
//! There are three classes: command buffers sized for the largest outbound
//! command, page buffers used for every receive, and jumbo buffers large
//! enough for an exception frame. A [`Buf`] remembers nothing about where
//! it came from; its capacity alone selects the free list it returns to.

use core::fmt;
use core::fmt::Display;
use core::ops::Deref;
use core::ops::DerefMut;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use thiserror::Error;
use xeth_api::SIZEOF_CMD;
use xeth_api::SIZEOF_JUMBO_FRAME;

/// Used when the host will not tell us its page size.
const FALLBACK_PAGE_SIZE: usize = 4096;

#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum PoolError {
    #[error("requested {requested} bytes exceeds pool maximum of {max}")]
    CapacityExceeded { requested: usize, max: usize },

    #[error("buffer capacity {0} matches no pool")]
    UnknownBufferClass(usize),
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SizeClass {
    Command,
    Page,
    Jumbo,
}

impl Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Command => "command",
            Self::Page => "page",
            Self::Jumbo => "jumbo",
        };

        write!(f, "{}", s)
    }
}

/// A pooled byte buffer.
///
/// The backing allocation never changes size. The visible length starts
/// at the full capacity and may only be truncated.
pub struct Buf {
    data: Box<[u8]>,
    len: usize,
}

impl Buf {
    fn new(size: usize) -> Self {
        Self { data: vec![0; size].into_boxed_slice(), len: size }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shorten the visible length. A `len` at or beyond the current length
    /// has no effect.
    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    fn restore(&mut self) {
        self.len = self.data.len();
    }
}

impl Deref for Buf {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.data[..self.len]
    }
}

impl DerefMut for Buf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data[..self.len]
    }
}

impl From<Vec<u8>> for Buf {
    fn from(v: Vec<u8>) -> Self {
        let data = v.into_boxed_slice();
        let len = data.len();
        Self { data, len }
    }
}

impl fmt::Debug for Buf {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Buf")
            .field("len", &self.len)
            .field("capacity", &self.data.len())
            .finish()
    }
}

/// Counters for one size class.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PoolStats {
    pub class: SizeClass,
    pub size: usize,
    /// Buffers created because the free list was empty.
    pub allocated: u64,
    pub acquired: u64,
    pub released: u64,
    /// Buffers currently sitting in the free list.
    pub free: usize,
}

struct FreeList {
    class: SizeClass,
    size: usize,
    free: Mutex<Vec<Box<[u8]>>>,
    allocated: AtomicU64,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl FreeList {
    fn new(class: SizeClass, size: usize) -> Self {
        Self {
            class,
            size,
            free: Mutex::new(Vec::new()),
            allocated: AtomicU64::new(0),
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    fn get(&self) -> Buf {
        self.acquired.fetch_add(1, Ordering::Relaxed);
        let data =
            self.free.lock().unwrap_or_else(PoisonError::into_inner).pop();
        match data {
            Some(data) => Buf { len: data.len(), data },
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                Buf::new(self.size)
            }
        }
    }

    fn put(&self, buf: Buf) {
        self.released.fetch_add(1, Ordering::Relaxed);
        self.free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(buf.data);
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            class: self.class,
            size: self.size,
            allocated: self.allocated.load(Ordering::Relaxed),
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            free: self
                .free
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
        }
    }
}

/// The three sideband buffer pools.
pub struct Pools {
    cmd: FreeList,
    page: FreeList,
    jumbo: FreeList,
}

impl Default for Pools {
    fn default() -> Self {
        Self::new()
    }
}

impl Pools {
    /// Create pools whose page class matches the host page size.
    pub fn new() -> Self {
        Self::with_page_size(host_page_size())
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            cmd: FreeList::new(SizeClass::Command, SIZEOF_CMD),
            page: FreeList::new(SizeClass::Page, page_size),
            jumbo: FreeList::new(SizeClass::Jumbo, SIZEOF_JUMBO_FRAME),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page.size
    }

    /// Acquire a buffer with a visible length of `n`.
    ///
    /// Anything smaller than a page comes from the page pool; the rest
    /// comes from the jumbo pool.
    pub fn acquire(&self, n: usize) -> Result<Buf, PoolError> {
        if n > SIZEOF_JUMBO_FRAME {
            return Err(PoolError::CapacityExceeded {
                requested: n,
                max: SIZEOF_JUMBO_FRAME,
            });
        }

        let mut buf =
            if n < self.page.size { self.page.get() } else { self.jumbo.get() };
        buf.truncate(n);
        Ok(buf)
    }

    /// Acquire a full-length buffer of the given class. Command buffers
    /// are zero filled.
    pub fn acquire_class(&self, class: SizeClass) -> Buf {
        match class {
            SizeClass::Command => {
                let mut buf = self.cmd.get();
                buf.fill(0);
                buf
            }
            SizeClass::Page => self.page.get(),
            SizeClass::Jumbo => self.jumbo.get(),
        }
    }

    /// Return a buffer to the pool matching its capacity.
    pub fn release(&self, mut buf: Buf) -> Result<(), PoolError> {
        buf.restore();
        let cap = buf.capacity();
        let list = [&self.cmd, &self.page, &self.jumbo]
            .into_iter()
            .find(|l| l.size == cap)
            .ok_or(PoolError::UnknownBufferClass(cap))?;
        list.put(buf);
        Ok(())
    }

    pub fn stats(&self) -> [PoolStats; 3] {
        [self.cmd.stats(), self.page.stats(), self.jumbo.stats()]
    }

    pub fn class_stats(&self, class: SizeClass) -> PoolStats {
        match class {
            SizeClass::Command => self.cmd.stats(),
            SizeClass::Page => self.page.stats(),
            SizeClass::Jumbo => self.jumbo.stats(),
        }
    }
}

fn host_page_size() -> usize {
    // Safety: sysconf(3) has no preconditions.
    let n = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    usize::try_from(n).ok().filter(|n| *n > 0).unwrap_or(FALLBACK_PAGE_SIZE)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn reuse_allocates_once() {
        let pools = Pools::with_page_size(4096);
        let buf = pools.acquire(100).unwrap();
        assert_eq!(buf.len(), 100);
        assert_eq!(buf.capacity(), 4096);
        pools.release(buf).unwrap();

        let buf = pools.acquire(100).unwrap();
        assert_eq!(buf.len(), 100);
        pools.release(buf).unwrap();

        let st = pools.class_stats(SizeClass::Page);
        assert_eq!(st.allocated, 1);
        assert_eq!(st.acquired, 2);
        assert_eq!(st.released, 2);
        assert_eq!(st.free, 1);
    }

    #[test]
    fn acquire_boundaries() {
        let pools = Pools::with_page_size(4096);

        let b = pools.acquire(0).unwrap();
        assert!(b.is_empty());
        assert_eq!(b.capacity(), 4096);

        let b = pools.acquire(4095).unwrap();
        assert_eq!(b.capacity(), 4096);

        let b = pools.acquire(4096).unwrap();
        assert_eq!(b.capacity(), SIZEOF_JUMBO_FRAME);

        let b = pools.acquire(SIZEOF_JUMBO_FRAME).unwrap();
        assert_eq!(b.len(), SIZEOF_JUMBO_FRAME);

        assert_eq!(
            pools.acquire(SIZEOF_JUMBO_FRAME + 1).unwrap_err(),
            PoolError::CapacityExceeded {
                requested: SIZEOF_JUMBO_FRAME + 1,
                max: SIZEOF_JUMBO_FRAME,
            }
        );
    }

    #[test]
    fn release_restores_length() {
        let pools = Pools::with_page_size(4096);
        let mut b = pools.acquire_class(SizeClass::Jumbo);
        b.truncate(12);
        pools.release(b).unwrap();
        let b = pools.acquire_class(SizeClass::Jumbo);
        assert_eq!(b.len(), SIZEOF_JUMBO_FRAME);
        assert_eq!(pools.class_stats(SizeClass::Jumbo).allocated, 1);
    }

    #[test]
    fn command_buffers_are_zeroed() {
        let pools = Pools::with_page_size(4096);
        let mut b = pools.acquire_class(SizeClass::Command);
        assert_eq!(b.len(), SIZEOF_CMD);
        b.fill(0xa5);
        pools.release(b).unwrap();

        let b = pools.acquire_class(SizeClass::Command);
        assert!(b.iter().all(|&x| x == 0));
    }

    #[test]
    fn truncate_never_grows() {
        let pools = Pools::with_page_size(4096);
        let mut b = pools.acquire(10).unwrap();
        b.truncate(20);
        assert_eq!(b.len(), 10);
    }

    #[test]
    fn foreign_buffer_rejected() {
        let pools = Pools::with_page_size(4096);
        let err = pools.release(Buf::from(vec![0u8; 100])).unwrap_err();
        assert_eq!(err, PoolError::UnknownBufferClass(100));
    }

    #[test]
    fn concurrent_acquire_release() {
        let pools = Arc::new(Pools::with_page_size(4096));
        let threads: Vec<_> = (0..4)
            .map(|_| {
                let pools = Arc::clone(&pools);
                thread::spawn(move || {
                    for i in 0..100 {
                        let b = pools.acquire(i * 50).unwrap();
                        pools.release(b).unwrap();
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }

        let [cmd, page, jumbo] = pools.stats();
        assert_eq!(cmd.acquired, 0);
        assert_eq!(page.acquired + jumbo.acquired, 400);
        assert_eq!(page.released + jumbo.released, 400);
        assert!(page.allocated <= 4);
        assert!(jumbo.allocated <= 4);
    }
}
