//! The linear (bump) allocator: a single reservation handed out
//! monotonically increasing, with lazy commission growth, optional
//! LIFO "frame" markers, and "waned" variants that decommit vacated
//! pages.
//!
//! Every operation here is a free function over a `&mut LinearAllocator`
//! plus the [`VirtualMemory`] backend to use, mirroring the shape of
//! the system this crate is modeled on: the allocator struct is pure
//! data (zeroed-is-valid), and the behavior lives in functions that
//! take it by reference.
//!
//! Each public entry point (`push`, `pull`, ...) dispatches to either
//! the release-tier implementation below or its `debug` counterpart,
//! based on the `debugging-aliases` feature. The `debug` module's
//! functions remain directly callable regardless of that feature.

use crate::align::{align_down, align_up, forward_pad};
use crate::config;
use crate::vm::VirtualMemory;

/// A bump allocator over a single virtual-memory reservation.
///
/// Zero-is-initialization: a `LinearAllocator::default()` is valid and
/// lazily fills in defaults for any zero field the first time it is
/// used, as long as the `automatic-initialization` feature is enabled
/// (the default). Non-zero fields supplied by the caller are preserved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinearAllocator {
    pub reservation: usize,
    pub address: usize,
    pub factor: usize,
    pub commission: usize,
    pub extent: usize,
}

/// An [`Arena`] is a [`LinearAllocator`] used for scratch allocations
/// whose frame is torn down as a whole; a [`Stack`] is one used with
/// LIFO push/pull discipline. Both are the same type; the aliases only
/// document intent at call sites, matching the source this crate
/// generalizes.
pub type Arena = LinearAllocator;
pub type Stack = LinearAllocator;

#[repr(C)]
struct FrameHeader {
    extent: usize,
}

const FRAME_HEADER_SIZE: usize = core::mem::size_of::<FrameHeader>();
const FRAME_HEADER_ALIGN: usize = core::mem::align_of::<FrameHeader>();

/// The header always sits exactly `FRAME_HEADER_SIZE` bytes below
/// `address`: [`release_push_frame`] picks the data alignment pad so
/// that this is always a multiple of `FRAME_HEADER_ALIGN` too, for any
/// power-of-two user alignment (powers of two are always divisors or
/// multiples of one another).
fn frame_header_at(address: usize) -> *mut FrameHeader {
    (address - FRAME_HEADER_SIZE) as *mut FrameHeader
}

fn ensure_initialized<V: VirtualMemory>(ctx: &mut LinearAllocator, vm: &V) {
    if ctx.address != 0 {
        return;
    }
    release_initialize(ctx, vm);
}

/// Fills zero fields with their defaults and commits the initial
/// commission. Non-zero fields are preserved (zero-is-initialization).
fn release_initialize<V: VirtualMemory>(ctx: &mut LinearAllocator, vm: &V) {
    if ctx.reservation == 0 {
        ctx.reservation = config::DEFAULT_RESERVATION;
    }
    if ctx.address == 0 {
        ctx.address = vm.reserve(ctx.reservation);
    }
    if ctx.commission == 0 {
        ctx.commission = config::DEFAULT_COMMISSION;
    }
    if ctx.factor == 0 {
        ctx.factor = config::DEFAULT_FACTOR;
    }
    vm.commit(ctx.address, ctx.commission);
}

/// Fills zero fields with their defaults and commits the initial
/// commission. Dispatches to [`debug::initialize`] when the
/// `debugging-aliases` feature is enabled.
pub fn initialize<V: VirtualMemory>(ctx: &mut LinearAllocator, vm: &V) {
    if cfg!(feature = "debugging-aliases") {
        debug::initialize(ctx, vm);
    } else {
        release_initialize(ctx, vm);
    }
}

fn release_make<V: VirtualMemory>(reservation: usize, commission: usize, factor: usize, vm: &V) -> LinearAllocator {
    let mut result = LinearAllocator {
        reservation,
        commission,
        factor,
        ..Default::default()
    };
    release_initialize(&mut result, vm);
    result
}

/// Constructs and initializes a [`LinearAllocator`] in one step.
pub fn make<V: VirtualMemory>(reservation: usize, commission: usize, factor: usize, vm: &V) -> LinearAllocator {
    if cfg!(feature = "debugging-aliases") {
        debug::make(reservation, commission, factor, vm)
    } else {
        release_make(reservation, commission, factor, vm)
    }
}

fn release_clear(ctx: &mut LinearAllocator) {
    ctx.extent = 0;
}

/// Resets `extent` to 0. Commission is left intact, so subsequent
/// pushes can reuse it without re-committing.
pub fn clear(ctx: &mut LinearAllocator) {
    if cfg!(feature = "debugging-aliases") {
        debug::clear(ctx);
    } else {
        release_clear(ctx);
    }
}

fn do_clear_waned<V: VirtualMemory>(ctx: &mut LinearAllocator, vm: &V) {
    if ctx.commission != 0 {
        vm.decommit(ctx.address, ctx.commission);
        ctx.commission = 0;
    }
}

fn release_clear_waned<V: VirtualMemory>(ctx: &mut LinearAllocator, vm: &V) {
    release_clear(ctx);
    do_clear_waned(ctx, vm);
}

/// [`clear`], then decommits every committed page and resets
/// `commission` to 0.
pub fn clear_waned<V: VirtualMemory>(ctx: &mut LinearAllocator, vm: &V) {
    if cfg!(feature = "debugging-aliases") {
        debug::clear_waned(ctx, vm);
    } else {
        release_clear_waned(ctx, vm);
    }
}

/// Returns the user-visible address, plus (if this call committed a
/// fresh step) the absolute address where that freshly committed span
/// begins. Bytes at or above that address are zero by OS contract;
/// bytes below it were already committed by an earlier call and may
/// carry stale data.
fn do_push<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) -> (usize, Option<usize>) {
    if cfg!(feature = "automatic-initialization") {
        ensure_initialized(ctx, vm);
    }

    let pad = forward_pad(ctx.address + ctx.extent, alignment);
    let needed = ctx.extent + pad + size;
    let mut fresh_commit_start = None;

    if needed > ctx.commission {
        let page = vm.page_granularity();
        let mut step = align_up(pad + size, page);
        if size > page / ctx.factor {
            step *= ctx.factor;
        }
        if ctx.commission + step <= ctx.reservation {
            let old_commission_end = ctx.address + ctx.commission;
            if !vm.commit(old_commission_end, step) {
                return (0, None);
            }
            ctx.commission += step;
            fresh_commit_start = Some(old_commission_end);
        } else {
            return (0, None);
        }
    }

    ctx.extent += pad;
    let result = ctx.address + ctx.extent;
    ctx.extent += size;
    (result, fresh_commit_start)
}

fn release_push<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) -> usize {
    do_push(size, alignment, ctx, vm).0
}

/// Zeroes the portion of `[result, result+size)` that is *not* covered
/// by a freshly committed step, i.e. the part that may have been
/// committed by an earlier call and can carry stale bytes. If nothing
/// was freshly committed this call (`fresh_commit_start` is `None`),
/// the whole range is zeroed.
fn zero_unfreshened(result: usize, size: usize, fresh_commit_start: Option<usize>) {
    let end = result + size;
    let zero_end = match fresh_commit_start {
        Some(start) if start > result => start.min(end),
        _ => end,
    };
    if zero_end > result {
        unsafe {
            core::ptr::write_bytes(result as *mut u8, zero_end - result, 0);
        }
    }
}

/// Returns an aligned interior address and advances `extent` by `pad +
/// size`. Returns 0 on failure (over-commit beyond `reservation`).
pub fn push<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) -> usize {
    if cfg!(feature = "debugging-aliases") {
        debug::push(size, alignment, ctx, vm)
    } else {
        release_push(size, alignment, ctx, vm)
    }
}

fn release_push_zeroed<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) -> usize {
    let (result, fresh_commit_start) = do_push(size, alignment, ctx, vm);
    if result != 0 {
        zero_unfreshened(result, size, fresh_commit_start);
    }
    result
}

/// [`push`], then zero the returned range, unless it lies entirely
/// inside pages freshly committed by this call (already zero by OS
/// contract).
pub fn push_zeroed<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) -> usize {
    if cfg!(feature = "debugging-aliases") {
        debug::push_zeroed(size, alignment, ctx, vm)
    } else {
        release_push_zeroed(size, alignment, ctx, vm)
    }
}

fn release_push_frame<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) -> usize {
    if cfg!(feature = "automatic-initialization") {
        ensure_initialized(ctx, vm);
    }

    let header_aligner = forward_pad(ctx.address + ctx.extent, FRAME_HEADER_ALIGN);
    let header_size = header_aligner + FRAME_HEADER_SIZE;
    let aligner = forward_pad(ctx.address + ctx.extent + header_size, alignment.max(1));
    let prior_extent = ctx.extent;
    let offset = header_size + aligner;

    let base = release_push(offset + size, 1, ctx, vm);
    if base == 0 {
        return 0;
    }
    let result = base + offset;
    unsafe {
        (*frame_header_at(result)).extent = prior_extent;
    }
    result
}

/// Like [`push`], but first reserves space for an aligned frame header
/// immediately before the user allocation and stores the pre-push
/// `extent` in it, so a matching [`pull_frame`] can rewind.
pub fn push_frame<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) -> usize {
    if cfg!(feature = "debugging-aliases") {
        debug::push_frame(size, alignment, ctx, vm)
    } else {
        release_push_frame(size, alignment, ctx, vm)
    }
}

fn release_push_frame_zeroed<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) -> usize {
    let result = release_push_frame(size, alignment, ctx, vm);
    if result != 0 {
        unsafe {
            core::ptr::write_bytes(result as *mut u8, 0, size);
        }
    }
    result
}

/// [`push_frame`], then zero the user-visible range.
pub fn push_frame_zeroed<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) -> usize {
    if cfg!(feature = "debugging-aliases") {
        debug::push_frame_zeroed(size, alignment, ctx, vm)
    } else {
        release_push_frame_zeroed(size, alignment, ctx, vm)
    }
}

fn get_pull_extent(size: usize, alignment: usize, ctx: &LinearAllocator) -> Option<usize> {
    let address = ctx.address + ctx.extent;
    let target = address.checked_sub(size)?;
    let new_address = align_down(target, alignment.max(1));
    if new_address < ctx.address {
        None
    } else {
        Some(new_address - ctx.address)
    }
}

fn release_pull(size: usize, alignment: usize, ctx: &mut LinearAllocator) {
    ctx.extent = get_pull_extent(size, alignment, ctx).unwrap_or(0);
}

/// Moves `extent` backward to `align_down(extent - size, alignment)`.
/// On underflow, `extent` silently clamps to 0 (release tier).
pub fn pull(size: usize, alignment: usize, ctx: &mut LinearAllocator) {
    if cfg!(feature = "debugging-aliases") {
        debug::pull(size, alignment, ctx);
    } else {
        release_pull(size, alignment, ctx);
    }
}

fn decommit_next_pages<V: VirtualMemory>(ctx: &LinearAllocator, vm: &V, all: bool) {
    let address = ctx.address + ctx.extent;
    let ending = ctx.address + ctx.reservation;
    let page = vm.page_granularity();
    let next_page = align_up(address, page);
    if next_page >= ending {
        return;
    }
    let size = if all {
        page * ((ending - next_page) / page)
    } else {
        page
    };
    vm.decommit(next_page, size);
}

fn release_pull_waned<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) {
    release_pull(size, alignment, ctx);
    decommit_next_pages(ctx, vm, true);
}

/// [`pull`], then decommits the full pages strictly above the new
/// extent, up to `commission`.
pub fn pull_waned<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) {
    if cfg!(feature = "debugging-aliases") {
        debug::pull_waned(size, alignment, ctx, vm);
    } else {
        release_pull_waned(size, alignment, ctx, vm);
    }
}

fn release_pull_frame(address: usize, ctx: &mut LinearAllocator) {
    let header = unsafe { &*frame_header_at(address) };
    ctx.extent = header.extent;
}

/// Restores `extent` from the frame header immediately below `address`.
pub fn pull_frame(address: usize, ctx: &mut LinearAllocator) {
    if cfg!(feature = "debugging-aliases") {
        debug::pull_frame_no_vm(address, ctx);
    } else {
        release_pull_frame(address, ctx);
    }
}

fn release_pull_frame_waned<V: VirtualMemory>(address: usize, ctx: &mut LinearAllocator, vm: &V) {
    release_pull_frame(address, ctx);
    decommit_next_pages(ctx, vm, true);
}

/// [`pull_frame`], then decommits the vacated pages.
pub fn pull_frame_waned<V: VirtualMemory>(address: usize, ctx: &mut LinearAllocator, vm: &V) {
    if cfg!(feature = "debugging-aliases") {
        debug::pull_frame_waned(address, ctx, vm);
    } else {
        release_pull_frame_waned(address, ctx, vm);
    }
}

/// Debug-checked variants.
///
/// Each wraps the release-tier operation with precondition assertions,
/// a postcondition assertion on the result, and page-protection
/// toggles (`validate` the live range, `invalidate` pages beyond it) so
/// stray accesses trap at the OS level. Assertions abort the process;
/// see the crate-level error-handling section of the design document.
pub mod debug {
    use super::{
        LinearAllocator, decommit_next_pages, do_push, get_pull_extent, release_clear,
        release_initialize, release_make, release_push_frame, release_pull_frame,
        zero_unfreshened,
    };
    use crate::align::is_power_of_two;
    use crate::vm::VirtualMemory;

    fn validate_context1(ctx: &LinearAllocator) {
        assert!(
            ctx.reservation >= ctx.commission,
            "reservation must be >= commission"
        );
        assert!(ctx.commission >= ctx.extent, "commission must be >= extent");
    }

    fn validate_context2(ctx: &LinearAllocator) {
        validate_context1(ctx);
        assert_ne!(ctx.address, 0, "allocator is uninitialized");
        assert_ne!(ctx.factor, 0, "growth factor must be nonzero");
    }

    fn validate_context3(ctx: &LinearAllocator) {
        validate_context2(ctx);
        assert!(
            ctx.reservation != 0 && ctx.address != 0 && ctx.commission != 0 && ctx.extent != 0,
            "attempted to deallocate from an uninitialized allocator"
        );
    }

    fn validate_input(size: usize, alignment: usize) {
        assert!(size > 0, "size must be nonzero");
        assert!(is_power_of_two(alignment), "alignment must be a power of two");
    }

    pub fn initialize<V: VirtualMemory>(ctx: &mut LinearAllocator, vm: &V) {
        validate_context1(ctx);
        release_initialize(ctx, vm);
        validate_context2(ctx);
    }

    pub fn make<V: VirtualMemory>(
        reservation: usize,
        commission: usize,
        factor: usize,
        vm: &V,
    ) -> LinearAllocator {
        assert!(
            reservation >= commission,
            "reservation must always be >= commission"
        );
        release_make(reservation, commission, factor, vm)
    }

    pub fn clear(ctx: &mut LinearAllocator) {
        assert!(
            ctx.address != 0 && ctx.extent != 0,
            "nothing to deallocate; allocator is uninitialized or unused"
        );
        assert!(ctx.commission >= ctx.extent, "commission must be >= extent");
        release_clear(ctx);
    }

    pub fn clear_waned<V: VirtualMemory>(ctx: &mut LinearAllocator, vm: &V) {
        clear(ctx);
        super::do_clear_waned(ctx, vm);
    }

    pub fn push_zeroed<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) -> usize {
        validate_input(size, alignment);
        validate_context1(ctx);
        let (result, fresh_commit_start) = do_push(size, alignment, ctx, vm);
        if result != 0 {
            zero_unfreshened(result, size, fresh_commit_start);
        }
        validate_context2(ctx);
        assert_ne!(result, 0, "overflowed: allocator misused or reservation too small");

        vm.validate(result, size);
        let invalidate_from = result + size;
        let invalidate_end = ctx.address + ctx.commission;
        if invalidate_from < invalidate_end {
            vm.invalidate(invalidate_from, invalidate_end - invalidate_from);
        }
        result
    }

    pub fn push<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) -> usize {
        push_zeroed(size, alignment, ctx, vm)
    }

    pub fn push_frame_zeroed<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) -> usize {
        validate_input(size, alignment);
        validate_context1(ctx);
        let result = release_push_frame(size, alignment, ctx, vm);
        if result != 0 {
            unsafe {
                core::ptr::write_bytes(result as *mut u8, 0, size);
            }
        }
        validate_context2(ctx);
        assert_ne!(result, 0, "overflowed: allocator misused or reservation too small");

        vm.validate(result, size);
        let invalidate_end = ctx.address + ctx.extent;
        if result < invalidate_end {
            vm.invalidate(result, invalidate_end - result);
        }
        result
    }

    pub fn push_frame<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) -> usize {
        push_frame_zeroed(size, alignment, ctx, vm)
    }

    fn do_debug_pull(size: usize, alignment: usize, ctx: &mut LinearAllocator) {
        validate_input(size, alignment);
        validate_context3(ctx);
        let extent = get_pull_extent(size, alignment, ctx);
        let extent = extent.expect("underflow: use `clear` to reset to zero instead");
        ctx.extent = extent;
    }

    pub fn pull(size: usize, alignment: usize, ctx: &mut LinearAllocator) {
        do_debug_pull(size, alignment, ctx);
    }

    pub fn pull_waned<V: VirtualMemory>(size: usize, alignment: usize, ctx: &mut LinearAllocator, vm: &V) {
        do_debug_pull(size, alignment, ctx);
        decommit_next_pages(ctx, vm, true);
    }

    /// `pull_frame` needs no `VirtualMemory` handle unless it also
    /// decommits; this split lets [`super::pull_frame`] alias here
    /// without requiring a backend reference it can't supply.
    pub fn pull_frame_no_vm(address: usize, ctx: &mut LinearAllocator) {
        assert_ne!(address, 0, "address must be nonzero");
        assert!(
            address >= ctx.address && address < ctx.address + ctx.extent,
            "address does not fall within the live extent"
        );
        validate_context3(ctx);
        release_pull_frame(address, ctx);
    }

    pub fn pull_frame<V: VirtualMemory>(address: usize, ctx: &mut LinearAllocator, vm: &V) {
        pull_frame_no_vm(address, ctx);
        let invalidate_from = ctx.address + ctx.extent;
        let invalidate_end = ctx.address + ctx.commission;
        if invalidate_from < invalidate_end {
            vm.invalidate(invalidate_from, invalidate_end - invalidate_from);
        }
    }

    pub fn pull_frame_waned<V: VirtualMemory>(address: usize, ctx: &mut LinearAllocator, vm: &V) {
        pull_frame(address, ctx, vm);
        decommit_next_pages(ctx, vm, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::mock::MockVirtualMemory;

    #[test]
    fn push_returns_aligned_address_inside_extent() {
        let vm = MockVirtualMemory::new();
        let mut ctx = LinearAllocator {
            reservation: 4096,
            commission: 64,
            factor: 1,
            ..Default::default()
        };
        let r = push(48, 8, &mut ctx, &vm);
        assert_eq!(r, ctx.address);
        assert_eq!(r % 8, 0);
        assert_eq!(ctx.extent, 48);
        assert!(ctx.extent <= ctx.commission);
        assert!(ctx.commission <= ctx.reservation);
    }

    #[test]
    fn push_zeroed_range_reads_back_zero() {
        let vm = MockVirtualMemory::new();
        let mut ctx = LinearAllocator {
            reservation: 4096,
            commission: 64,
            factor: 1,
            ..Default::default()
        };
        vm.write(ctx_address_after_init(&mut ctx, &vm), &[0xFFu8; 8]);
        let r = push_zeroed(8, 8, &mut ctx, &vm);
        assert_eq!(vm.read(r, 8), vec![0u8; 8]);
    }

    fn ctx_address_after_init(ctx: &mut LinearAllocator, vm: &MockVirtualMemory) -> usize {
        initialize(ctx, vm);
        ctx.address
    }

    #[test]
    fn push_zeroed_zeroes_the_stale_part_of_a_growth_straddling_push() {
        let vm = MockVirtualMemory::new();
        let mut ctx = LinearAllocator {
            reservation: 4096,
            commission: 128,
            factor: 1,
            ..Default::default()
        };
        // Fill the whole initial commission, then write a stale marker
        // into the bytes that pull() is about to vacate.
        push(128, 1, &mut ctx, &vm);
        vm.write(ctx.address + 100, &[0xFFu8; 28]);
        pull(28, 1, &mut ctx);
        assert_eq!(ctx.extent, 100);

        // This push's range [100, 160) straddles the old commission
        // boundary at 128: [100, 128) was already committed (and
        // still holds the stale 0xFF bytes) while [128, 160) is part
        // of the step freshly committed by this call.
        let r = push_zeroed(60, 1, &mut ctx, &vm);
        assert_eq!(r, ctx.address + 100);
        assert_eq!(vm.read(r, 60), vec![0u8; 60]);
    }

    #[test]
    fn push_then_pull_restores_extent() {
        let vm = MockVirtualMemory::new();
        let mut ctx = LinearAllocator {
            reservation: 4096,
            commission: 64,
            factor: 1,
            ..Default::default()
        };
        push(48, 8, &mut ctx, &vm);
        let before = ctx.extent;
        push(16, 8, &mut ctx, &vm);
        pull(16, 8, &mut ctx);
        assert_eq!(ctx.extent, before);
    }

    #[test]
    fn nested_frames_rewind_lifo() {
        let vm = MockVirtualMemory::new();
        let mut ctx = LinearAllocator {
            reservation: 4096,
            commission: 256,
            factor: 1,
            ..Default::default()
        };
        let extent0 = ctx.extent;
        let frame_a = push_frame(16, 8, &mut ctx, &vm);
        let extent_a = ctx.extent;
        let frame_b = push_frame(32, 8, &mut ctx, &vm);
        assert_ne!(frame_a, frame_b);

        pull_frame(frame_b, &mut ctx);
        assert_eq!(ctx.extent, extent_a);

        pull_frame(frame_a, &mut ctx);
        assert_eq!(ctx.extent, extent0);
    }

    #[test]
    fn grow_over_reservation_fails_without_mutating_extent() {
        let vm = MockVirtualMemory::new();
        let mut ctx = LinearAllocator {
            reservation: 4096,
            commission: 64,
            factor: 1,
            ..Default::default()
        };
        push(48, 8, &mut ctx, &vm);
        let extent_before = ctx.extent;
        let commission_before = ctx.commission;
        let r = push(4000, 1, &mut ctx, &vm);
        assert_eq!(r, 0);
        assert_eq!(ctx.extent, extent_before);
        assert_eq!(ctx.commission, commission_before);
    }

    #[test]
    fn waned_shrink_decommits_vacated_page() {
        let vm = MockVirtualMemory::new();
        let mut ctx = LinearAllocator {
            reservation: 4096,
            commission: 0,
            factor: 1,
            ..Default::default()
        };
        // Fill two pages worth (mock page = 64 bytes).
        push(128, 1, &mut ctx, &vm);
        assert!(vm.committed(ctx.address, 128));

        pull_waned(64, 1, &mut ctx, &vm);
        assert!(!vm.committed(ctx.address + 64, 64));
    }

    #[test]
    fn zero_init_allocator_works_without_explicit_initialize() {
        let vm = MockVirtualMemory::new();
        let mut ctx = LinearAllocator::default();
        let r = push(16, 8, &mut ctx, &vm);
        assert_ne!(r, 0);
        assert!(ctx.extent <= ctx.commission);
        assert!(ctx.commission <= ctx.reservation);
    }
}
