//! The virtual-memory primitive layer.
//!
//! A narrow contract over the host OS's notion of reserving address
//! space, committing physical backing to part of it, and probing or
//! toggling page protection. The allocators in this crate are the only
//! callers; nothing here knows about extents, granularities, or
//! bitmaps.
//!
//! [`SystemVirtualMemory`] is the default, real-syscall-backed
//! implementation (`mmap`/`mprotect` on unix, `VirtualAlloc` family on
//! windows). Tests substitute [`vm::mock`] so the allocators can be
//! exercised without touching the host address space.

use thiserror::Error;

/// Failure modes from the underlying host-OS virtual-memory calls.
///
/// The allocators themselves only ever see the release-tier sentinels
/// (a zero address, a `(null, 0)` cursor) described in the
/// specification's error-handling design; this type exists so the
/// [`VirtualMemory`] implementations have something richer to log
/// before collapsing the failure to a sentinel.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("failed to reserve {size} bytes of address space")]
    Reserve { size: usize },
    #[error("failed to commit {size} bytes at {address:#x}")]
    Commit { address: usize, size: usize },
    #[error("failed to decommit {size} bytes at {address:#x}")]
    Decommit { address: usize, size: usize },
    #[error("failed to change protection of {size} bytes at {address:#x}")]
    Protect { address: usize, size: usize },
    #[error("failed to release {size} bytes at {address:#x}")]
    Release { address: usize, size: usize },
}

/// The nine operations the core allocators consume. See §4.1: query
/// page granularity; reserve/release a range; commit/decommit a
/// page-aligned subrange; validate/invalidate (toggle access) a
/// subrange; query whether a subrange is committed; and touch (force
/// page-in without altering bytes).
///
/// Callers are expected to pre-align `address`/`size` to
/// [`VirtualMemory::page_granularity`] themselves; implementations do
/// not silently round.
pub trait VirtualMemory {
    /// The minimum unit of commit/decommit. Always a power of two.
    fn page_granularity(&self) -> usize;

    /// Claims `size` bytes of address space with no physical backing.
    /// Returns 0 on failure.
    fn reserve(&self, size: usize) -> usize;

    /// Returns a reservation (and everything committed within it) to
    /// the OS.
    fn release(&self, address: usize, size: usize);

    /// Adds physical backing to `[address, address+size)`. Committed
    /// memory is readable and writable, and zeroed.
    fn commit(&self, address: usize, size: usize) -> bool;

    /// Removes physical backing from `[address, address+size)`.
    /// Idempotent.
    fn decommit(&self, address: usize, size: usize);

    /// Marks `[address, address+size)` read/write.
    fn validate(&self, address: usize, size: usize);

    /// Marks `[address, address+size)` no-access, so stray reads and
    /// writes trap at the OS level.
    fn invalidate(&self, address: usize, size: usize);

    /// Reports whether `[address, address+size)` currently has
    /// physical backing.
    fn committed(&self, address: usize, size: usize) -> bool;

    /// Forces every page in `[address, address+size)` to be paged in,
    /// without altering its bytes.
    fn touch(&self, address: usize, size: usize) {
        let granularity = self.page_granularity();
        let mut offset = 0;
        while offset < size {
            unsafe {
                let byte = (address + offset) as *mut u8;
                byte.write_volatile(byte.read_volatile());
            }
            offset += granularity;
        }
    }
}

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub use unix::SystemVirtualMemory;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::SystemVirtualMemory;

#[cfg(test)]
pub(crate) mod mock;
