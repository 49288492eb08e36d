//! Compile-time defaults, mirroring the settings block of the system
//! this crate generalizes. These are the values [`crate::linear`] and
//! [`crate::granular`] fall back to under zero-is-initialization when a
//! caller leaves a field at 0.

/// Linear allocator growth factor applied to oversized pushes.
pub const DEFAULT_FACTOR: usize = 1;

/// Initial linear allocator commission, in bytes.
pub const DEFAULT_COMMISSION: usize = 0x1000;

/// Default address-space reservation, in bytes, for both allocators.
pub const DEFAULT_RESERVATION: usize = 0x4000_0000;

/// Default granular allocator slot size, in bytes.
pub const DEFAULT_GRANULARITY: usize = 64;

/// Default granular allocator slot count.
pub const DEFAULT_QUANTITY: usize = 32768;
