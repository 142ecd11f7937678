// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// This Source Code Form is "Incompatible With Secondary Licenses", as
// defined by the Mozilla Public License, v. 2.0.
//
// Copyright © 2022 mumblingdrunkard

//! Searching and span queries. A needle never matches across a gap: every
//! hit lies inside a single block.

use crate::error::{MemoryError, MemoryResult};

use super::Memory;

impl Memory {
    /// Smallest address `a >= start` where `needle` occurs entirely inside
    /// one block with `a + needle.len() <= endex`.
    pub fn find(&self, needle: &[u8], start: Option<u64>, endex: Option<u64>) -> Option<u64> {
        if needle.is_empty() {
            return None;
        }
        let (start, endex) = self.bound(start, endex);
        let rack = self.rack();
        let first = rack.index_start(start);
        let last = rack.index_endex(endex);
        for index in first..last {
            let block = rack.slot(index);
            let window_start = start.max(block.address());
            let window_endex = endex.min(block.endex());
            if window_endex - window_start < needle.len() as u64 {
                continue;
            }
            let lo = (window_start - block.address()) as usize;
            let hi = (window_endex - block.address()) as usize;
            if let Some(offset) = block.find(needle, lo, hi) {
                return Some(block.address() + offset as u64);
            }
        }
        None
    }

    /// Largest matching address, searching backwards.
    pub fn rfind(&self, needle: &[u8], start: Option<u64>, endex: Option<u64>) -> Option<u64> {
        if needle.is_empty() {
            return None;
        }
        let (start, endex) = self.bound(start, endex);
        let rack = self.rack();
        let first = rack.index_start(start);
        let last = rack.index_endex(endex);
        for index in (first..last).rev() {
            let block = rack.slot(index);
            let window_start = start.max(block.address());
            let window_endex = endex.min(block.endex());
            if window_endex - window_start < needle.len() as u64 {
                continue;
            }
            let lo = (window_start - block.address()) as usize;
            let hi = (window_endex - block.address()) as usize;
            if let Some(offset) = block.rfind(needle, lo, hi) {
                return Some(block.address() + offset as u64);
            }
        }
        None
    }

    /// Like [`find`](Self::find), but missing needles are an error.
    pub fn index(&self, needle: &[u8], start: Option<u64>, endex: Option<u64>) -> MemoryResult<u64> {
        self.find(needle, start, endex).ok_or(MemoryError::NotFound)
    }

    /// Like [`rfind`](Self::rfind), but missing needles are an error.
    pub fn rindex(
        &self,
        needle: &[u8],
        start: Option<u64>,
        endex: Option<u64>,
    ) -> MemoryResult<u64> {
        self.rfind(needle, start, endex)
            .ok_or(MemoryError::NotFound)
    }

    /// Non-overlapping occurrences of `needle` within `[start, endex)`.
    pub fn count(&self, needle: &[u8], start: Option<u64>, endex: Option<u64>) -> usize {
        if needle.is_empty() {
            return 0;
        }
        let (start, endex) = self.bound(start, endex);
        let rack = self.rack();
        let first = rack.index_start(start);
        let last = rack.index_endex(endex);
        let mut total = 0;
        for index in first..last {
            let block = rack.slot(index);
            let window_start = start.max(block.address());
            let window_endex = endex.min(block.endex());
            let lo = (window_start - block.address()) as usize;
            let hi = (window_endex - block.address()) as usize;
            total += block.count(needle, lo, hi);
        }
        total
    }

    /// True when the logical span holds no gap: either nothing at all, or a
    /// single block covering `[start(), endex())` exactly.
    pub fn contiguous(&self) -> bool {
        let rack = self.rack();
        match rack.len() {
            0 => self.start() >= self.endex(),
            1 => {
                let block = rack.slot(0);
                block.address() <= self.start() && self.endex() <= block.endex()
            }
            _ => false,
        }
    }

    /// Maximal run of one repeated byte value around `address`, confined to
    /// the containing block. In a gap, the gap's bounds and `None`; open
    /// ends are `None`.
    pub fn equal_span(&self, address: u64) -> (Option<u64>, Option<u64>, Option<u8>) {
        let rack = self.rack();
        match rack.index_at(address) {
            Some(index) => {
                let block = rack.slot(index);
                let bytes = block.as_slice();
                let offset = (address - block.address()) as usize;
                let value = bytes[offset];
                let mut lo = offset;
                while lo > 0 && bytes[lo - 1] == value {
                    lo -= 1;
                }
                let mut hi = offset + 1;
                while hi < bytes.len() && bytes[hi] == value {
                    hi += 1;
                }
                (
                    Some(block.address() + lo as u64),
                    Some(block.address() + hi as u64),
                    Some(value),
                )
            }
            None => self.gap_span(address),
        }
    }

    /// Bounds of the whole block containing `address` with the byte at
    /// `address`; in a gap, the gap's bounds and `None`.
    pub fn block_span(&self, address: u64) -> (Option<u64>, Option<u64>, Option<u8>) {
        let rack = self.rack();
        match rack.index_at(address) {
            Some(index) => {
                let block = rack.slot(index);
                let value = block.as_slice()[(address - block.address()) as usize];
                (Some(block.address()), Some(block.endex()), Some(value))
            }
            None => self.gap_span(address),
        }
    }

    /// Bounds of the gap containing `address`; `None` on an open side.
    fn gap_span(&self, address: u64) -> (Option<u64>, Option<u64>, Option<u8>) {
        let rack = self.rack();
        let index = rack.index_start(address);
        let lower = if index > 0 {
            Some(rack.slot(index - 1).endex())
        } else {
            None
        };
        let upper = if index < rack.len() {
            Some(rack.slot(index).address())
        } else {
            None
        };
        (lower, upper, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_does_not_cross_gaps() -> MemoryResult<()> {
        let memory = Memory::from_blocks([(0u64, &b"ab"[..]), (3, &b"cd"[..])])?;
        assert_eq!(memory.find(b"ab", None, None), Some(0));
        assert_eq!(memory.find(b"cd", None, None), Some(3));
        // "bc" spans the gap at address 2, so it is never found
        assert_eq!(memory.find(b"bc", None, None), None);
        assert_eq!(memory.find(b"", None, None), None);
        Ok(())
    }

    #[test]
    fn find_respects_the_range() -> MemoryResult<()> {
        let memory = Memory::from_bytes(10, &b"abcabc"[..])?;
        assert_eq!(memory.find(b"abc", None, None), Some(10));
        assert_eq!(memory.find(b"abc", Some(11), None), Some(13));
        // the match must fit before the range end
        assert_eq!(memory.find(b"abc", Some(11), Some(15)), None);
        assert_eq!(memory.rfind(b"abc", None, None), Some(13));
        assert_eq!(memory.rfind(b"abc", None, Some(15)), Some(10));
        Ok(())
    }

    #[test]
    fn index_errors_when_missing() -> MemoryResult<()> {
        let memory = Memory::from_bytes(0, &b"abc"[..])?;
        assert_eq!(memory.index(b"bc", None, None)?, 1);
        assert_eq!(memory.index(b"zz", None, None), Err(MemoryError::NotFound));
        assert_eq!(memory.rindex(b"zz", None, None), Err(MemoryError::NotFound));
        Ok(())
    }

    #[test]
    fn count_sums_per_block() -> MemoryResult<()> {
        let memory = Memory::from_blocks([(0u64, &b"aaaa"[..]), (10, &b"aa"[..])])?;
        assert_eq!(memory.count(b"a", None, None), 6);
        assert_eq!(memory.count(b"aa", None, None), 3);
        assert_eq!(memory.count(b"aa", Some(1), Some(4)), 1);
        Ok(())
    }

    #[test]
    fn contiguous_memories() -> MemoryResult<()> {
        assert!(Memory::new().contiguous());
        assert!(Memory::from_bytes(5, &b"abc"[..])?.contiguous());
        assert!(!Memory::from_blocks([(0u64, &b"ab"[..]), (5, &b"cd"[..])])?.contiguous());
        // trim span wider than the single block leaves uncovered addresses
        let trimmed = Memory::from_bytes(5, &b"abc"[..])?.with_bounds(Some(0), Some(10))?;
        assert!(!trimmed.contiguous());
        // an empty trim span holds no gap
        let empty = Memory::new().with_bounds(Some(3), Some(3))?;
        assert!(empty.contiguous());
        let hollow = Memory::new().with_bounds(Some(3), Some(9))?;
        assert!(!hollow.contiguous());
        Ok(())
    }

    #[test]
    fn equal_span_expands_runs() -> MemoryResult<()> {
        let memory = Memory::from_bytes(10, &b"abbba"[..])?;
        assert_eq!(memory.equal_span(12), (Some(11), Some(14), Some(b'b')));
        assert_eq!(memory.equal_span(10), (Some(10), Some(11), Some(b'a')));
        Ok(())
    }

    #[test]
    fn equal_span_stops_at_block_edges() -> MemoryResult<()> {
        // equal bytes on both sides of a gap stay separate runs
        let memory = Memory::from_blocks([(0u64, &b"aa"[..]), (3, &b"aa"[..])])?;
        assert_eq!(memory.equal_span(0), (Some(0), Some(2), Some(b'a')));
        assert_eq!(memory.equal_span(2), (Some(2), Some(3), None));
        Ok(())
    }

    #[test]
    fn spans_in_gaps_have_open_ends() -> MemoryResult<()> {
        let memory = Memory::from_blocks([(5u64, &b"ab"[..]), (10, &b"cd"[..])])?;
        assert_eq!(memory.equal_span(8), (Some(7), Some(10), None));
        assert_eq!(memory.block_span(0), (None, Some(5), None));
        assert_eq!(memory.block_span(100), (Some(12), None, None));
        assert_eq!(memory.block_span(6), (Some(5), Some(7), Some(b'b')));
        Ok(())
    }
}
