//! The bit-scan core: locating and writing runs of same-polarity bits
//! across a contiguous array of 64-bit words, in either scan direction.
//!
//! This is the kernel of the granular allocator's occupancy bitmap. It
//! knows nothing about allocators, addresses, or granularity; it only
//! ever sees a half-open range of word pointers `[p, q)` and a polarity.

use core::ptr;

/// A cursor into a bit array: a word pointer plus a 1-based bit index
/// within that word. `bit == 0` (with a null word pointer) means "no
/// bit found".
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct BitLocation {
    pub word: *mut u64,
    pub bit: u32,
}

impl BitLocation {
    pub(crate) const NONE: Self = Self {
        word: ptr::null_mut(),
        bit: 0,
    };

    pub(crate) fn is_none(self) -> bool {
        self.word.is_null()
    }
}

const WORD_BITS: u32 = u64::BITS;

/// Locates the first bit of the requested polarity in `[p, q)`.
///
/// Direction is inferred from the relative order of `p` and `q`: if `q
/// < p` the scan walks backward (decrementing the word pointer),
/// otherwise forward. `clear` selects the polarity: `true` looks for a
/// 0 bit, `false` for a 1 bit.
///
/// # Safety
///
/// `p` and `q` must be valid word pointers into the same array, with
/// every word in the scanned range (on the side walked toward `q`)
/// dereferenceable.
pub(crate) unsafe fn find_bit(p0: *mut u64, q: *mut u64, clear: bool) -> BitLocation {
    let reverse = (q as usize) < (p0 as usize);
    let background: u64 = if clear { u64::MAX } else { 0 };

    let mut p = p0;
    loop {
        if p == q {
            return BitLocation::NONE;
        }
        if unsafe { *p } != background {
            break;
        }
        p = if reverse { unsafe { p.sub(1) } } else { unsafe { p.add(1) } };
    }

    let mut word = unsafe { *p };
    if clear {
        word = !word;
    }
    BitLocation {
        word: p,
        bit: word.trailing_zeros() + 1,
    }
}

/// Locates the first run of at least `n` consecutive bits of the
/// requested polarity in `[p, q)`, scanning in the direction implied by
/// `p` and `q` (see [`find_bit`]).
///
/// Returns the cursor of the *start* of the run (in scan order) or
/// [`BitLocation::NONE`] if no such run fits in the range.
///
/// # Safety
///
/// Same requirements as [`find_bit`].
pub(crate) unsafe fn find_bits(n: usize, p0: *mut u64, q: *mut u64, clear: bool) -> BitLocation {
    debug_assert!(n >= 1, "a run must be at least one bit long");
    if n == 1 {
        return unsafe { find_bit(p0, q, clear) };
    }

    let reverse = (q as usize) < (p0 as usize);
    let step = |ptr: *mut u64| -> *mut u64 {
        if reverse { unsafe { ptr.sub(1) } } else { unsafe { ptr.add(1) } }
    };
    let polarity = |word: u64| -> u64 { if clear { !word } else { word } };

    let mut p = p0;
    // 0 is a sentinel meaning "find a fresh run start in this word";
    // any carried-over value is the offset at which to resume scanning
    // a run within the current word (always >= 1 in that case).
    let mut i: usize = 0;

    loop {
        if p == q {
            return BitLocation::NONE;
        }
        let w = polarity(unsafe { *p });
        if w == 0 {
            p = step(p);
            i = 0;
            continue;
        }
        if i == 0 {
            i = w.trailing_zeros() as usize;
        }

        let shifted = w >> i;
        let run_len = shifted.trailing_ones() as usize;

        if run_len >= n {
            return BitLocation {
                word: p,
                bit: (i + 1) as u32,
            };
        }

        if i + run_len == WORD_BITS as usize {
            // The run reaches the end of this word. Keep extending
            // into subsequent words while remembering where the run
            // actually started.
            let start = BitLocation {
                word: p,
                bit: (i + 1) as u32,
            };
            let mut total = run_len;
            let mut cur = p;
            loop {
                cur = step(cur);
                if cur == q {
                    return BitLocation::NONE;
                }
                let w2 = polarity(unsafe { *cur });
                let extend = w2.trailing_ones() as usize;
                total += extend;
                if total >= n {
                    return start;
                }
                if extend == WORD_BITS as usize {
                    continue;
                }
                if extend + 1 >= WORD_BITS as usize {
                    p = step(cur);
                    i = 0;
                } else {
                    p = cur;
                    i = extend + 1;
                }
                break;
            }
            continue;
        }

        // The run ended inside this word, short of `n`. Skip the
        // non-matching bit at `i + run_len` and retry from there.
        i += run_len + 1;
        if i >= WORD_BITS as usize {
            p = step(p);
            i = 0;
        }
    }
}

/// Writes exactly `n` consecutive bits of the requested polarity
/// starting at `location`, marching forward (`reverse = false`) or
/// backward (`reverse = true`) through words between segments.
///
/// Handles a leading partial word, zero or more whole words, and a
/// trailing partial word; any of the latter two may be empty.
///
/// # Safety
///
/// `location` must be a valid, non-[`BitLocation::NONE`] cursor, and
/// every word touched while writing the `n` bits must be
/// dereferenceable and writable.
pub(crate) unsafe fn set_bits(n: usize, location: BitLocation, clear: bool, reverse: bool) {
    debug_assert!(n >= 1, "a run must be at least one bit long");
    debug_assert!(!location.is_none(), "cannot write through a null cursor");

    let step = |ptr: *mut u64| -> *mut u64 {
        if reverse { unsafe { ptr.sub(1) } } else { unsafe { ptr.add(1) } }
    };

    let mut p = location.word;
    let start_bit = (location.bit - 1) as usize;
    let mut remaining = n;

    // Leading partial word.
    let in_word = WORD_BITS as usize - start_bit;
    let take = remaining.min(in_word);
    let mask: u64 = if take == WORD_BITS as usize {
        u64::MAX
    } else {
        ((1u64 << take) - 1) << start_bit
    };
    unsafe {
        if clear {
            *p &= !mask;
        } else {
            *p |= mask;
        }
    }
    remaining -= take;
    if remaining == 0 {
        return;
    }
    p = step(p);

    // Whole words.
    let whole = remaining / WORD_BITS as usize;
    let fill: u64 = if clear { 0 } else { u64::MAX };
    for _ in 0..whole {
        unsafe {
            *p = fill;
        }
        p = step(p);
    }
    remaining -= whole * WORD_BITS as usize;
    if remaining == 0 {
        return;
    }

    // Trailing partial word.
    let mask = (1u64 << remaining) - 1;
    unsafe {
        if clear {
            *p &= !mask;
        } else {
            *p |= mask;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(words: &mut [u64]) -> (*mut u64, *mut u64) {
        let p = words.as_mut_ptr();
        let q = unsafe { p.add(words.len()) };
        (p, q)
    }

    /// `words[0]` is a leading pad slot so the reverse endpoint `q` (one
    /// before the first real word) still points inside the allocation.
    /// Returns `(p, q)` with `p` at the last element and `q` at the pad.
    fn reverse_range(words: &mut [u64]) -> (*mut u64, *mut u64) {
        let q = words.as_mut_ptr();
        let p = unsafe { q.add(words.len() - 1) };
        (p, q)
    }

    #[test]
    fn find_bit_locates_first_set_bit() {
        let mut words = [0u64, 0b0000_1000];
        let (p, q) = range(&mut words);
        let loc = unsafe { find_bit(p, q, false) };
        assert_eq!(loc.word, unsafe { p.add(1) });
        assert_eq!(loc.bit, 4);
    }

    #[test]
    fn find_bit_exhausted_range_returns_none() {
        let mut words = [0u64, 0u64];
        let (p, q) = range(&mut words);
        assert!(unsafe { find_bit(p, q, false) }.is_none());
    }

    #[test]
    fn find_bit_reverse_direction() {
        // pad, 0010, 0, 0 -- scanning from the tail down to (excluding) the pad.
        let mut words = [0u64, 0b0010u64, 0u64, 0u64];
        let (p, q) = reverse_range(&mut words);
        let loc = unsafe { find_bit(p, q, false) };
        assert_eq!(loc.word, unsafe { words.as_mut_ptr().add(1) });
        assert_eq!(loc.bit, 2);
    }

    #[test]
    fn find_bits_single_word_run() {
        let mut words = [0b0111_1000u64];
        let (p, q) = range(&mut words);
        let loc = unsafe { find_bits(4, p, q, false) };
        assert_eq!(loc.word, p);
        assert_eq!(loc.bit, 4);
    }

    #[test]
    fn find_bits_run_too_short_fails() {
        let mut words = [0b0111_1000u64];
        let (p, q) = range(&mut words);
        assert!(unsafe { find_bits(5, p, q, false) }.is_none());
    }

    #[test]
    fn find_bits_crosses_word_boundary() {
        // 70 set bits: the low 64 of word 0 entirely set, plus 6 set
        // bits at the bottom of word 1.
        let mut words = [u64::MAX, 0b0011_1111u64];
        let (p, q) = range(&mut words);
        let loc = unsafe { find_bits(70, p, q, false) };
        assert_eq!(loc.word, p);
        assert_eq!(loc.bit, 1);
    }

    #[test]
    fn find_bits_extension_broken_by_last_bit_of_word_does_not_shift_by_64() {
        // Word 0 is entirely set (64 ones) and word 1 has its low 63
        // bits set with only its top bit (the word's *last* bit)
        // clear, so the cross-word run breaks with `extend == 63` --
        // the exact edge the faulty reset (`i = extend + 1 == 64`)
        // mishandled. The only run of 128 consecutive set bits is
        // words 2 and 3, entirely set.
        let mut words = [u64::MAX, 0x7FFF_FFFF_FFFF_FFFFu64, u64::MAX, u64::MAX];
        let (p, q) = range(&mut words);
        let loc = unsafe { find_bits(128, p, q, false) };
        assert_eq!(loc.word, unsafe { p.add(2) });
        assert_eq!(loc.bit, 1);
    }

    #[test]
    fn find_bits_exact_word_boundary_exhausted() {
        let mut words = [u64::MAX, 0u64];
        let (p, q) = range(&mut words);
        assert!(unsafe { find_bits(65, p, q, false) }.is_none());
    }

    #[test]
    fn find_bits_retries_past_a_gap() {
        // bits 0..2 set (run of 3, too short), bit 3 clear, bits 4..7
        // set (run of 4) -> a search for 4 must skip the first group.
        let mut words = [0b1111_0111u64];
        let (p, q) = range(&mut words);
        let loc = unsafe { find_bits(4, p, q, false) };
        assert_eq!(loc.bit, 5);
    }

    #[test]
    fn find_bits_clear_polarity() {
        let mut words = [!0b0111_1000u64];
        let (p, q) = range(&mut words);
        let loc = unsafe { find_bits(4, p, q, true) };
        assert_eq!(loc.bit, 4);
    }

    #[test]
    fn find_bits_reverse_scan() {
        let mut words = [0u64, 0b0011_1100u64, 0u64, 0u64];
        let (p, q) = reverse_range(&mut words);
        let loc = unsafe { find_bits(4, p, q, false) };
        assert_eq!(loc.word, unsafe { words.as_mut_ptr().add(1) });
        assert_eq!(loc.bit, 3);
    }

    #[test]
    fn set_bits_within_single_word() {
        let mut words = [0u64];
        let p = words.as_mut_ptr();
        unsafe { set_bits(4, BitLocation { word: p, bit: 2 }, false, false) };
        assert_eq!(words[0], 0b0001_1110);
    }

    #[test]
    fn set_bits_clears_within_single_word() {
        let mut words = [u64::MAX];
        let p = words.as_mut_ptr();
        unsafe { set_bits(4, BitLocation { word: p, bit: 2 }, true, false) };
        assert_eq!(words[0], !0b0001_1110u64);
    }

    #[test]
    fn set_bits_spans_whole_words_forward() {
        let mut words = [0u64; 4];
        let p = words.as_mut_ptr();
        unsafe { set_bits(64 * 2 + 3, BitLocation { word: p, bit: 64 }, false, false) };
        assert_eq!(words[0], 1u64 << 63);
        assert_eq!(words[1], u64::MAX);
        assert_eq!(words[2], u64::MAX);
        assert_eq!(words[3], 0b0000_0011);
    }

    #[test]
    fn set_bits_reverse_direction() {
        let mut words = [0u64; 3];
        let p = unsafe { words.as_mut_ptr().add(2) };
        unsafe { set_bits(134, BitLocation { word: p, bit: 1 }, false, true) };
        assert_eq!(words[2], u64::MAX);
        assert_eq!(words[1], u64::MAX);
        assert_eq!(words[0], 0b0011_1111);
    }

    #[test]
    fn set_bits_single_bit_no_overflow() {
        let mut words = [0u64];
        let p = words.as_mut_ptr();
        unsafe { set_bits(1, BitLocation { word: p, bit: 64 }, false, false) };
        assert_eq!(words[0], 1u64 << 63);
    }
}
