// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// This Source Code Form is "Incompatible With Secondary Licenses", as
// defined by the Mozilla Public License, v. 2.0.
//
// Copyright © 2022 mumblingdrunkard

use thiserror::Error;

/// Errors shared by every layer of the crate.
///
/// Failed operations leave the container untouched: checks run before any
/// mutation, and replacement buffers are built aside and swapped in last.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// Address arithmetic would exceed the 64-bit address space.
    #[error("address overflow")]
    AddressOverflow,

    /// A capacity or length computation would exceed the implementation
    /// ceiling (half the machine address space).
    #[error("size overflow")]
    SizeOverflow,

    /// The allocator refused a buffer request.
    #[error("allocation failure")]
    AllocationFailure,

    /// An offset or index addresses outside a container's live range.
    #[error("index {index} out of range for length {length}")]
    IndexOutOfRange { index: usize, length: usize },

    /// Structural or elementwise mutation attempted on an entity that is
    /// shared (more than one handle alive).
    #[error("shared, cannot resize")]
    Shared,

    /// A view or bytes export was requested over a range containing a gap.
    #[error("range is not contiguous")]
    NotContiguous,

    /// A fill, flood, or repeat-to-size was requested with nothing to
    /// repeat.
    #[error("empty pattern")]
    EmptyPattern,

    /// Validation detected overlap, wrong ordering, an empty block, or a
    /// bound violation.
    #[error("invalid layout: {reason}")]
    InvalidLayout { reason: &'static str },

    /// An `index`/`rindex` style search found no occurrence.
    #[error("subsection not found")]
    NotFound,

    /// Pop from an empty container.
    #[error("container is empty")]
    EmptyContainer,
}

pub type MemoryResult<T> = std::result::Result<T, MemoryError>;
