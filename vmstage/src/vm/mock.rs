//! An in-process [`VirtualMemory`] stand-in for unit tests.
//!
//! Backs "reservations" with ordinary heap buffers and tracks
//! commit/decommit state per page in a side table, so the linear and
//! granular allocator tests can run without touching the host address
//! space (and without needing root/elevated mmap rights in CI).

use super::VirtualMemory;
use std::cell::RefCell;
use std::collections::HashMap;

const MOCK_PAGE: usize = 64;

struct Reservation {
    buffer: Vec<u8>,
    committed_pages: Vec<bool>,
}

#[derive(Default)]
pub(crate) struct MockVirtualMemory {
    reservations: RefCell<HashMap<usize, Reservation>>,
}

impl MockVirtualMemory {
    pub(crate) fn new() -> Self {
        Self {
            reservations: RefCell::new(HashMap::new()),
        }
    }

    fn with_reservation<R>(&self, address: usize, f: impl FnOnce(&mut Reservation, usize) -> R) -> R {
        let mut reservations = self.reservations.borrow_mut();
        let (&base, reservation) = reservations
            .iter_mut()
            .find(|(&base, r)| address >= base && address < base + r.buffer.len())
            .expect("address must fall inside a live mock reservation");
        f(reservation, address - base)
    }
}

impl VirtualMemory for MockVirtualMemory {
    fn page_granularity(&self) -> usize {
        MOCK_PAGE
    }

    fn reserve(&self, size: usize) -> usize {
        // A real heap buffer, so the allocator core's direct pointer
        // reads/writes (zeroing, frame headers) land on addressable
        // memory. The Vec is never resized after this point, so its
        // data pointer stays stable for the reservation's lifetime.
        let mut buffer = vec![0u8; size];
        let address = buffer.as_mut_ptr() as usize;
        let pages = size.div_ceil(MOCK_PAGE);
        self.reservations.borrow_mut().insert(
            address,
            Reservation {
                buffer,
                committed_pages: vec![false; pages],
            },
        );
        address
    }

    fn release(&self, address: usize, _size: usize) {
        self.reservations.borrow_mut().remove(&address);
    }

    fn commit(&self, address: usize, size: usize) -> bool {
        self.with_reservation(address, |reservation, offset| {
            for page in (offset / MOCK_PAGE)..(offset + size).div_ceil(MOCK_PAGE) {
                reservation.committed_pages[page] = true;
            }
            true
        })
    }

    fn decommit(&self, address: usize, size: usize) {
        if size == 0 {
            return;
        }
        self.with_reservation(address, |reservation, offset| {
            for page in (offset / MOCK_PAGE)..(offset + size).div_ceil(MOCK_PAGE) {
                reservation.committed_pages[page] = false;
                let start = page * MOCK_PAGE;
                let end = (start + MOCK_PAGE).min(reservation.buffer.len());
                reservation.buffer[start..end].fill(0);
            }
        });
    }

    fn validate(&self, _address: usize, _size: usize) {}

    fn invalidate(&self, _address: usize, _size: usize) {}

    fn committed(&self, address: usize, size: usize) -> bool {
        self.with_reservation(address, |reservation, offset| {
            (offset / MOCK_PAGE..(offset + size).div_ceil(MOCK_PAGE))
                .all(|page| reservation.committed_pages[page])
        })
    }

    fn touch(&self, _address: usize, _size: usize) {}
}

/// Exposes raw byte access to a mock reservation for assertions in
/// allocator tests (e.g. checking that a pushed range reads back zero).
impl MockVirtualMemory {
    pub(crate) fn read(&self, address: usize, len: usize) -> Vec<u8> {
        self.with_reservation(address, |reservation, offset| {
            reservation.buffer[offset..offset + len].to_vec()
        })
    }

    pub(crate) fn write(&self, address: usize, bytes: &[u8]) {
        self.with_reservation(address, |reservation, offset| {
            reservation.buffer[offset..offset + bytes.len()].copy_from_slice(bytes);
        });
    }
}
