//! The granular (fixed-block pool) allocator.
//!
//! A single reservation is split into two regions that grow toward
//! each other: fixed-size blocks from the low address upward, and a
//! free-slot bitmap from the high address downward. The bitmap is
//! stored as 64-bit words anchored at `base + reservation - 8`; word 0
//! covers the lowest-indexed slots and each following word sits 8
//! bytes below the last. A set bit marks its slot **free**.
//!
//! Unlike [`crate::linear`], there is no incremental growth here: the
//! whole pool (blocks and bitmap) is committed once, at
//! [`initialize`]/[`create`] time, since `quantity` is fixed for the
//! life of the allocator.

use crate::align::{align_down, align_up};
use crate::bits::{BitLocation, find_bits, set_bits};
use crate::config;
use crate::vm::VirtualMemory;

/// A fixed-block pool over a single virtual-memory reservation.
///
/// Zero-is-initialization, same as [`crate::linear::LinearAllocator`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GranularAllocator {
    pub reservation: usize,
    pub address: usize,
    pub granularity: usize,
    pub quantity: usize,
}

/// A [`GranularAllocator`] used as a fixed-size object pool; the alias
/// only documents intent at call sites.
pub type Pool = GranularAllocator;

fn words_count(quantity: usize) -> usize {
    quantity.div_ceil(64)
}

fn anchor_word(ctx: &GranularAllocator) -> *mut u64 {
    (ctx.address + ctx.reservation - 8) as *mut u64
}

fn end_word(ctx: &GranularAllocator) -> *mut u64 {
    // SAFETY: both endpoints lie within the same reservation; pointer
    // arithmetic never leaves it as long as `words_count` fits the
    // reservation, which `initialize` enforces.
    unsafe { anchor_word(ctx).sub(words_count(ctx.quantity)) }
}

fn slot_location(ctx: &GranularAllocator, slot_index: usize) -> BitLocation {
    let word_index = slot_index / 64;
    let bit = (slot_index % 64) as u32 + 1;
    // SAFETY: `word_index < words_count(quantity)`, checked by callers.
    let word = unsafe { anchor_word(ctx).sub(word_index) };
    BitLocation { word, bit }
}

fn slot_index_of(ctx: &GranularAllocator, location: BitLocation) -> usize {
    let word_index = (anchor_word(ctx) as usize - location.word as usize) / 8;
    word_index * 64 + (location.bit as usize - 1)
}

fn ensure_initialized<V: VirtualMemory>(ctx: &mut GranularAllocator, vm: &V) {
    if ctx.address != 0 {
        return;
    }
    release_initialize(ctx, vm);
}

/// Fills zero fields with their defaults, commits the entire block and
/// bitmap regions, and marks every slot free. Dispatches to
/// [`debug::initialize`] when the `debugging-aliases` feature is
/// enabled.
pub fn initialize<V: VirtualMemory>(ctx: &mut GranularAllocator, vm: &V) {
    if cfg!(feature = "debugging-aliases") {
        debug::initialize(ctx, vm);
    } else {
        release_initialize(ctx, vm);
    }
}

fn release_initialize<V: VirtualMemory>(ctx: &mut GranularAllocator, vm: &V) {
    if ctx.reservation == 0 {
        ctx.reservation = config::DEFAULT_RESERVATION;
    }
    if ctx.granularity == 0 {
        ctx.granularity = config::DEFAULT_GRANULARITY;
    }
    if ctx.quantity == 0 {
        ctx.quantity = config::DEFAULT_QUANTITY;
    }
    if ctx.address == 0 {
        ctx.address = vm.reserve(ctx.reservation);
    }

    let page = vm.page_granularity();
    let block_bytes = ctx.quantity * ctx.granularity;
    vm.commit(ctx.address, align_up(block_bytes, page));

    let bitmap_bytes = words_count(ctx.quantity) * 8;
    let top = ctx.address + ctx.reservation;
    let bitmap_start = align_down(top - bitmap_bytes, page);
    vm.commit(bitmap_start, top - bitmap_start);

    let anchor = anchor_word(ctx);
    // SAFETY: the bitmap region for `quantity` bits was just committed.
    unsafe {
        set_bits(ctx.quantity, BitLocation { word: anchor, bit: 1 }, false, true);
    }
}

fn release_create<V: VirtualMemory>(reservation: usize, granularity: usize, quantity: usize, vm: &V) -> GranularAllocator {
    let mut result = GranularAllocator {
        reservation,
        granularity,
        quantity,
        ..Default::default()
    };
    release_initialize(&mut result, vm);
    result
}

/// Constructs and initializes a [`GranularAllocator`] in one step.
pub fn create<V: VirtualMemory>(reservation: usize, granularity: usize, quantity: usize, vm: &V) -> GranularAllocator {
    if cfg!(feature = "debugging-aliases") {
        debug::create(reservation, granularity, quantity, vm)
    } else {
        release_create(reservation, granularity, quantity, vm)
    }
}

fn do_put<V: VirtualMemory>(size: usize, ctx: &mut GranularAllocator, vm: &V) -> usize {
    if cfg!(feature = "automatic-initialization") {
        ensure_initialized(ctx, vm);
    }
    let count = size.div_ceil(ctx.granularity);
    if count == 0 || count > ctx.quantity {
        return 0;
    }

    // SAFETY: `anchor_word`/`end_word` bound the live bitmap region.
    let location = unsafe { find_bits(count, anchor_word(ctx), end_word(ctx), false) };
    if location.is_none() {
        return 0;
    }

    // SAFETY: `location` was just found inside the live bitmap region.
    unsafe {
        set_bits(count, location, true, true);
    }
    let slot_index = slot_index_of(ctx, location);
    ctx.address + slot_index * ctx.granularity
}

/// Finds a run of `size.div_ceil(granularity)` free slots, marks them
/// occupied, and returns the address of the first one. Returns 0 if no
/// run of that length is free.
pub fn put<V: VirtualMemory>(size: usize, ctx: &mut GranularAllocator, vm: &V) -> usize {
    if cfg!(feature = "debugging-aliases") {
        debug::put(size, ctx, vm)
    } else {
        do_put(size, ctx, vm)
    }
}

fn release_put_zeroed<V: VirtualMemory>(size: usize, ctx: &mut GranularAllocator, vm: &V) -> usize {
    let result = do_put(size, ctx, vm);
    if result != 0 {
        unsafe {
            core::ptr::write_bytes(result as *mut u8, 0, size);
        }
    }
    result
}

/// [`put`], then zeroes the returned range (blocks may carry stale
/// bytes from a prior tenant; the pool is never decommitted between
/// uses).
pub fn put_zeroed<V: VirtualMemory>(size: usize, ctx: &mut GranularAllocator, vm: &V) -> usize {
    if cfg!(feature = "debugging-aliases") {
        debug::put(size, ctx, vm)
    } else {
        release_put_zeroed(size, ctx, vm)
    }
}

fn release_pop(address: usize, size: usize, ctx: &mut GranularAllocator) {
    let count = size.div_ceil(ctx.granularity);
    let slot_index = (address - ctx.address) / ctx.granularity;
    let location = slot_location(ctx, slot_index);
    // SAFETY: `location` addresses a slot within the live bitmap region.
    unsafe {
        set_bits(count, location, false, true);
    }
}

/// Marks the `size.div_ceil(granularity)` slots starting at `address`
/// free again.
pub fn pop(address: usize, size: usize, ctx: &mut GranularAllocator) {
    if cfg!(feature = "debugging-aliases") {
        debug::pop_no_vm(address, size, ctx);
    } else {
        release_pop(address, size, ctx);
    }
}

/// Debug-checked variants.
pub mod debug {
    use super::{GranularAllocator, do_put, release_create, release_initialize, release_pop};
    use crate::vm::VirtualMemory;

    fn validate_context(ctx: &GranularAllocator) {
        assert_ne!(ctx.address, 0, "allocator is uninitialized");
        assert_ne!(ctx.granularity, 0, "granularity must be nonzero");
        assert_ne!(ctx.quantity, 0, "quantity must be nonzero");
        assert!(
            ctx.quantity * ctx.granularity <= ctx.reservation,
            "block region must fit the reservation"
        );
    }

    pub fn initialize<V: VirtualMemory>(ctx: &mut GranularAllocator, vm: &V) {
        release_initialize(ctx, vm);
        validate_context(ctx);
    }

    pub fn create<V: VirtualMemory>(
        reservation: usize,
        granularity: usize,
        quantity: usize,
        vm: &V,
    ) -> GranularAllocator {
        assert!(
            quantity * granularity <= reservation,
            "requested quantity * granularity must fit in the reservation"
        );
        release_create(reservation, granularity, quantity, vm)
    }

    pub fn put<V: VirtualMemory>(size: usize, ctx: &mut GranularAllocator, vm: &V) -> usize {
        assert!(size > 0, "size must be nonzero");
        validate_context(ctx);
        let result = do_put(size, ctx, vm);
        assert_ne!(result, 0, "pool exhausted: no free run of that length");
        unsafe {
            core::ptr::write_bytes(result as *mut u8, 0, size);
        }
        vm.validate(result, size);
        result
    }

    /// Split out so [`super::pop`] can alias here without a
    /// `VirtualMemory` reference to supply for the `invalidate` step.
    pub fn pop_no_vm(address: usize, size: usize, ctx: &mut GranularAllocator) {
        assert!(size > 0, "size must be nonzero");
        validate_context(ctx);
        let within = address >= ctx.address && address < ctx.address + ctx.quantity * ctx.granularity;
        assert!(within, "address does not fall within the pool's block region");
        assert_eq!(
            (address - ctx.address) % ctx.granularity,
            0,
            "address is not aligned to a slot boundary"
        );
        release_pop(address, size, ctx);
    }

    pub fn pop<V: VirtualMemory>(address: usize, size: usize, ctx: &mut GranularAllocator, vm: &V) {
        pop_no_vm(address, size, ctx);
        vm.invalidate(address, size);
    }
}
