// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// This Source Code Form is "Incompatible With Secondary Licenses", as
// defined by the Mozilla Public License, v. 2.0.
//
// Copyright © 2022 mumblingdrunkard

//! Sparse byte memory: a 64-bit address-addressable byte space where only
//! written regions consume storage, and unwritten addresses read as empty
//! rather than zero.
//!
//! Layering, leaves first:
//!
//! - [`block`] — one contiguous run of bytes with an address tag, stored in
//!   a split-margin buffer for cheap growth at both ends.
//! - [`rack`] — an ordered, non-overlapping, non-touching collection of
//!   blocks with binary-search indexing.
//! - [`memory`] — the sparse byte API: editing, searching, slicing,
//!   filling, iteration, and bulk I/O against non-contiguous regions.
//! - [`rover`] — a directional cursor producing one `Option<u8>` per
//!   address, with an optional repeating fill pattern.

pub mod block;
pub mod error;
pub mod memory;
pub mod rack;
pub mod rover;

mod util;

pub use block::{Block, BlockHandle, BlockView};
pub use error::{MemoryError, MemoryResult};
pub use memory::Memory;
pub use rack::{Rack, RackHandle};
pub use rover::Rover;
