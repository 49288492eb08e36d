//! `mmap`/`mprotect`-backed [`VirtualMemory`](super::VirtualMemory).
//!
//! POSIX has no native reserve/commit split: a single `mmap` either
//! backs memory immediately or doesn't exist at all. We emulate the
//! split the way the original Win32-targeted source relied on
//! `MEM_RESERVE`/`MEM_COMMIT` for: reserve maps `PROT_NONE` pages (no
//! backing, but the address range is spoken for), and commit flips the
//! range to `PROT_READ | PROT_WRITE` and immediately touches it so the
//! pages are resident and [`committed`](super::VirtualMemory::committed)
//! can answer reliably via `mincore` without waiting for a first fault.

use super::{VirtualMemory, VmError};
use core::sync::atomic::{AtomicUsize, Ordering};
use log::warn;

/// The real virtual-memory backend: reserves via an anonymous
/// `PROT_NONE` mapping and commits via `mprotect` + eager touch.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemVirtualMemory;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

fn page_size() -> usize {
    let cached = PAGE_SIZE.load(Ordering::Relaxed);
    if cached != 0 {
        return cached;
    }
    // SAFETY: sysconf with a well-known, argument-free query.
    let queried = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    let size = if queried > 0 { queried as usize } else { 4096 };
    PAGE_SIZE.store(size, Ordering::Relaxed);
    size
}

impl VirtualMemory for SystemVirtualMemory {
    fn page_granularity(&self) -> usize {
        page_size()
    }

    fn reserve(&self, size: usize) -> usize {
        // SAFETY: MAP_ANON|MAP_PRIVATE with a null hint and fd never
        // touches caller-owned memory; PROT_NONE means nothing is
        // readable or writable until `commit`.
        let result = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                size,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANON | libc::MAP_NORESERVE,
                -1,
                0,
            )
        };
        if result == libc::MAP_FAILED {
            warn!("{}", VmError::Reserve { size });
            return 0;
        }
        result as usize
    }

    fn release(&self, address: usize, size: usize) {
        // SAFETY: caller owns `[address, address+size)` exclusively.
        let result = unsafe { libc::munmap(address as *mut core::ffi::c_void, size) };
        if result != 0 {
            warn!("{}", VmError::Release { address, size });
        }
    }

    fn commit(&self, address: usize, size: usize) -> bool {
        // SAFETY: address/size describe a subrange of a live reservation.
        let result = unsafe {
            libc::mprotect(
                address as *mut core::ffi::c_void,
                size,
                libc::PROT_READ | libc::PROT_WRITE,
            )
        };
        if result != 0 {
            warn!("{}", VmError::Commit { address, size });
            return false;
        }
        self.touch(address, size);
        true
    }

    fn decommit(&self, address: usize, size: usize) {
        if size == 0 {
            return;
        }
        // SAFETY: same subrange contract as `commit`. MADV_DONTNEED
        // drops physical backing without unmapping the address range.
        unsafe {
            libc::mprotect(address as *mut core::ffi::c_void, size, libc::PROT_NONE);
            libc::madvise(address as *mut core::ffi::c_void, size, libc::MADV_DONTNEED);
        }
    }

    fn validate(&self, address: usize, size: usize) {
        // SAFETY: same subrange contract as `commit`.
        let result = unsafe {
            libc::mprotect(
                address as *mut core::ffi::c_void,
                size,
                libc::PROT_READ | libc::PROT_WRITE,
            )
        };
        if result != 0 {
            warn!("{}", VmError::Protect { address, size });
        }
    }

    fn invalidate(&self, address: usize, size: usize) {
        // SAFETY: same subrange contract as `commit`.
        let result =
            unsafe { libc::mprotect(address as *mut core::ffi::c_void, size, libc::PROT_NONE) };
        if result != 0 {
            warn!("{}", VmError::Protect { address, size });
        }
    }

    fn committed(&self, address: usize, size: usize) -> bool {
        if size == 0 {
            return true;
        }
        let granularity = page_size();
        let pages = size.div_ceil(granularity);
        let mut residency = vec![0u8; pages];
        // SAFETY: `residency` has one byte per page covering `size`.
        let result = unsafe {
            libc::mincore(
                address as *mut core::ffi::c_void,
                size,
                residency.as_mut_ptr(),
            )
        };
        if result != 0 {
            return false;
        }
        residency.iter().all(|&page| page & 1 != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_commit_decommit_round_trip() {
        let vm = SystemVirtualMemory;
        let granularity = vm.page_granularity();
        assert!(granularity.is_power_of_two());

        let size = granularity * 4;
        let address = vm.reserve(size);
        assert_ne!(address, 0);

        assert!(vm.commit(address, granularity));
        assert!(vm.committed(address, granularity));

        vm.decommit(address, granularity);
        assert!(!vm.committed(address, granularity));

        vm.release(address, size);
    }

    #[test]
    fn touch_does_not_alter_bytes() {
        let vm = SystemVirtualMemory;
        let granularity = vm.page_granularity();
        let address = vm.reserve(granularity);
        assert!(vm.commit(address, granularity));

        unsafe {
            (address as *mut u8).write(0x42);
        }
        vm.touch(address, granularity);
        let value = unsafe { (address as *const u8).read() };
        assert_eq!(value, 0x42);

        vm.release(address, granularity);
    }
}
