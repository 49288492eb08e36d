//! Virtual-memory-aware allocators with an explicit reserve/commit/extent
//! discipline.
//!
//! ```text
//!            align          bits              vm
//!              \              |               /
//!               \             |              /
//!                +---------- linear --- granular
//! ```
//!
//! [`align`] and [`vm`] are the leaves: pure integer math and a thin
//! contract over the host OS's virtual-memory calls, respectively.
//! [`bits`] is the occupancy-bitmap core that [`granular`] builds on.
//! [`linear`] and [`granular`] are the two allocators this crate
//! exists to provide:
//!
//! - [`linear::LinearAllocator`] grows a single extent forward,
//!   committing pages lazily as it does, with LIFO "frame" checkpoints.
//! - [`granular::GranularAllocator`] hands out fixed-size blocks from a
//!   pool, tracked by a bitmap, with no coalescing or size classes.
//!
//! Every allocator field is zero-is-initialization: a default-valued
//! struct is a valid, lazily-initialized allocator, as long as the
//! `automatic-initialization` feature (on by default) is enabled.
//!
//! This crate targets hosted userspace, not bare metal: it links
//! against `std` so [`vm::SystemVirtualMemory`] can use `libc`/`windows-sys`
//! and so tests can use a heap-backed mock. See `DESIGN.md` for the
//! reasoning.

pub mod align;
mod bits;
pub mod config;
pub mod granular;
pub mod linear;
pub mod vm;

pub use granular::{GranularAllocator, Pool};
pub use linear::{Arena, LinearAllocator, Stack};
pub use vm::{VirtualMemory, VmError};
