// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// This Source Code Form is "Incompatible With Secondary Licenses", as
// defined by the Mozilla Public License, v. 2.0.
//
// Copyright © 2022 mumblingdrunkard

use crate::error::{MemoryError, MemoryResult};

/// Margin kept at the head and tail of every growable buffer, in elements.
/// Half the machine word; must be positive.
pub(crate) const MARGIN: usize = std::mem::size_of::<usize>() / 2;

/// Hard ceiling on any single allocation, in elements.
pub(crate) const SIZE_CEIL: usize = usize::MAX / 2;

/// Round `size` up to the next multiple of [`MARGIN`].
fn round_to_margin(size: usize) -> MemoryResult<usize> {
    let rem = size % MARGIN;
    if rem == 0 {
        Ok(size)
    } else {
        size.checked_add(MARGIN - rem)
            .ok_or(MemoryError::SizeOverflow)
    }
}

/// Capacity to allocate when a buffer of capacity `allocated` must grow to
/// hold `requested` elements.
///
/// Small growth (within an eighth of the current capacity) is padded by an
/// eighth of the request to amortize repeated growth; larger jumps get
/// exactly the request. Either way the result is rounded up to the margin
/// granule with one extra margin on top.
pub(crate) fn upsize(allocated: usize, requested: usize) -> MemoryResult<usize> {
    if requested > SIZE_CEIL {
        return Err(MemoryError::SizeOverflow);
    }
    let capacity = if requested <= allocated + allocated / 8 {
        requested + requested / 8
    } else {
        requested
    };
    let capacity = round_to_margin(capacity)?
        .checked_add(MARGIN)
        .ok_or(MemoryError::SizeOverflow)?;
    if capacity > SIZE_CEIL {
        Err(MemoryError::SizeOverflow)
    } else {
        Ok(capacity)
    }
}

/// Capacity to keep when a buffer of capacity `allocated` shrinks to
/// `requested` elements. Shrinks only once the payload drops below half the
/// capacity, and never below two margins.
pub(crate) fn downsize(allocated: usize, requested: usize) -> usize {
    if requested < allocated / 2 {
        let capacity = requested + (MARGIN - requested % MARGIN) % MARGIN + MARGIN;
        capacity.max(2 * MARGIN)
    } else {
        allocated
    }
}

/// Allocate a fully-initialized vector of `capacity` default elements,
/// surfacing allocator refusal instead of aborting.
pub(crate) fn try_vec<T: Default + Clone>(capacity: usize) -> MemoryResult<Vec<T>> {
    if capacity > SIZE_CEIL {
        return Err(MemoryError::SizeOverflow);
    }
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(capacity)
        .map_err(|_| MemoryError::AllocationFailure)?;
    buffer.resize(capacity, T::default());
    Ok(buffer)
}

/// Resolve a signed index against a container of `length` elements the way
/// slicing does: negative values count back from the end, and the result is
/// clamped into `[0, length]`.
pub(crate) fn wrap_index(index: isize, length: usize) -> usize {
    if index < 0 {
        length.saturating_sub(index.unsigned_abs())
    } else {
        (index as usize).min(length)
    }
}

/// Resolve a signed `[start, endex)` pair against `length`, collapsing
/// inverted pairs to an empty range at `start`.
pub(crate) fn wrap_range(start: isize, endex: isize, length: usize) -> (usize, usize) {
    let start = wrap_index(start, length);
    let endex = wrap_index(endex, length).max(start);
    (start, endex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsize_pads_small_growth() -> MemoryResult<()> {
        // within an eighth of the current capacity: request padded by 1/8
        let capacity = upsize(16, 17)?;
        assert_eq!(capacity % MARGIN, 0);
        assert!(capacity >= 17 + 17 / 8 + MARGIN);
        // far beyond: exactly the request, rounded, plus one margin
        let capacity = upsize(16, 1000)?;
        assert!(capacity >= 1000 + MARGIN);
        assert!(capacity < 1000 + 3 * MARGIN);
        Ok(())
    }

    #[test]
    fn upsize_rejects_huge_requests() {
        assert_eq!(upsize(0, SIZE_CEIL + 1), Err(MemoryError::SizeOverflow));
    }

    #[test]
    fn downsize_keeps_capacity_until_half_empty() {
        assert_eq!(downsize(64, 33), 64);
        assert_eq!(downsize(64, 32), 64);
        let shrunk = downsize(64, 10);
        assert!(shrunk < 64);
        assert_eq!(shrunk % MARGIN, 0);
        assert!(shrunk >= 10 + MARGIN);
    }

    #[test]
    fn downsize_floors_at_two_margins() {
        assert_eq!(downsize(64, 0), 2 * MARGIN);
    }

    #[test]
    fn wrap_index_counts_back_from_the_end() {
        assert_eq!(wrap_index(-1, 10), 9);
        assert_eq!(wrap_index(-20, 10), 0);
        assert_eq!(wrap_index(3, 10), 3);
        assert_eq!(wrap_index(15, 10), 10);
    }

    #[test]
    fn wrap_range_collapses_inverted_pairs() {
        assert_eq!(wrap_range(5, 2, 10), (5, 5));
        assert_eq!(wrap_range(-3, -1, 10), (7, 9));
        assert_eq!(wrap_range(0, isize::MAX, 10), (0, 10));
    }
}
