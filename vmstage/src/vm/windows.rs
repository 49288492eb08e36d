//! `VirtualAlloc`/`VirtualProtect`-backed [`VirtualMemory`](super::VirtualMemory).
//!
//! This mirrors the Win64 syscall layer in the system this crate was
//! modeled on almost directly: `MEM_RESERVE` to claim address space,
//! `MEM_COMMIT` to back a subrange, `VirtualProtect` for
//! validate/invalidate, and `VirtualQuery` to answer `committed`.

use super::{VirtualMemory, VmError};
use core::sync::atomic::{AtomicUsize, Ordering};
use log::warn;
use windows_sys::Win32::System::Memory::{
    MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE, MEM_RESERVE, MEMORY_BASIC_INFORMATION, PAGE_NOACCESS,
    PAGE_READWRITE, VirtualAlloc, VirtualFree, VirtualProtect, VirtualQuery,
};
use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

/// The real virtual-memory backend on Windows.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemVirtualMemory;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

fn page_size() -> usize {
    let cached = PAGE_SIZE.load(Ordering::Relaxed);
    if cached != 0 {
        return cached;
    }
    let mut info = core::mem::MaybeUninit::<SYSTEM_INFO>::uninit();
    // SAFETY: GetSystemInfo always fully initializes its out-parameter.
    let info = unsafe {
        GetSystemInfo(info.as_mut_ptr());
        info.assume_init()
    };
    let size = info.dwPageSize as usize;
    PAGE_SIZE.store(size, Ordering::Relaxed);
    size
}

impl VirtualMemory for SystemVirtualMemory {
    fn page_granularity(&self) -> usize {
        page_size()
    }

    fn reserve(&self, size: usize) -> usize {
        // SAFETY: a fresh reservation with no base address hint.
        let result = unsafe {
            VirtualAlloc(core::ptr::null_mut(), size, MEM_RESERVE, PAGE_READWRITE)
        };
        if result.is_null() {
            warn!("{}", VmError::Reserve { size });
            return 0;
        }
        result as usize
    }

    fn release(&self, address: usize, size: usize) {
        // SAFETY: MEM_RELEASE requires size=0 and releases the whole
        // reservation `address` was returned from.
        let result = unsafe { VirtualFree(address as *mut core::ffi::c_void, 0, MEM_RELEASE) };
        if result == 0 {
            warn!("{}", VmError::Release { address, size });
        }
    }

    fn commit(&self, address: usize, size: usize) -> bool {
        // SAFETY: address/size describe a subrange of a live reservation.
        let result = unsafe {
            VirtualAlloc(address as *mut core::ffi::c_void, size, MEM_COMMIT, PAGE_READWRITE)
        };
        if result.is_null() {
            warn!("{}", VmError::Commit { address, size });
            return false;
        }
        true
    }

    fn decommit(&self, address: usize, size: usize) {
        if size == 0 {
            return;
        }
        // SAFETY: same subrange contract as `commit`.
        unsafe {
            VirtualFree(address as *mut core::ffi::c_void, size, MEM_DECOMMIT);
        }
    }

    fn validate(&self, address: usize, size: usize) {
        let mut old = 0u32;
        // SAFETY: same subrange contract as `commit`.
        let result = unsafe {
            VirtualProtect(address as *mut core::ffi::c_void, size, PAGE_READWRITE, &mut old)
        };
        if result == 0 {
            warn!("{}", VmError::Protect { address, size });
        }
    }

    fn invalidate(&self, address: usize, size: usize) {
        let mut old = 0u32;
        // SAFETY: same subrange contract as `commit`.
        let result = unsafe {
            VirtualProtect(address as *mut core::ffi::c_void, size, PAGE_NOACCESS, &mut old)
        };
        if result == 0 {
            warn!("{}", VmError::Protect { address, size });
        }
    }

    fn committed(&self, address: usize, size: usize) -> bool {
        let mut info = core::mem::MaybeUninit::<MEMORY_BASIC_INFORMATION>::uninit();
        // SAFETY: VirtualQuery fills `info` on success; we check the
        // return value before reading it.
        let written = unsafe {
            VirtualQuery(
                address as *const core::ffi::c_void,
                info.as_mut_ptr(),
                core::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };
        if written == 0 {
            return false;
        }
        let info = unsafe { info.assume_init() };
        info.State & MEM_COMMIT != 0 && info.RegionSize >= size
    }
}
