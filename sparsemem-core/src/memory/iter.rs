// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// This Source Code Form is "Incompatible With Secondary Licenses", as
// defined by the Mozilla Public License, v. 2.0.
//
// Copyright © 2022 mumblingdrunkard

//! Lazy iteration over blocks, gaps, intervals, values, and items.

use crate::block::BlockView;
use crate::error::MemoryResult;
use crate::rover::Rover;

use super::Memory;

impl Memory {
    /// Iterate `(address, bytes)` per content block.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            memory: self,
            index: 0,
        }
    }

    /// Like [`blocks`](Self::blocks), but yielding acquired views: each
    /// block counts as shared while its view is alive.
    pub fn views(&self) -> Views<'_> {
        Views {
            memory: self,
            index: 0,
        }
    }

    /// Iterate the gaps overlapping `[start, endex)`. A `None` bound leaves
    /// that side open, and gaps reaching an open side report `None` for it.
    pub fn gaps(&self, start: Option<u64>, endex: Option<u64>) -> Gaps<'_> {
        let lower = start.unwrap_or(0);
        let rack = self.rack();
        Gaps {
            memory: self,
            index: rack.index_start(lower),
            last: endex.map_or(rack.len(), |e| rack.index_endex(e)),
            lower,
            open_left: start.is_none(),
            endex,
            done: false,
        }
    }

    /// Iterate the populated `(start, endex)` ranges overlapping
    /// `[start, endex)`; missing bounds default to the content span.
    pub fn intervals(&self, start: Option<u64>, endex: Option<u64>) -> Intervals<'_> {
        let start = start.unwrap_or_else(|| self.content_start());
        let endex = endex.unwrap_or_else(|| self.content_endex()).max(start);
        let rack = self.rack();
        Intervals {
            memory: self,
            index: rack.index_start(start),
            last: rack.index_endex(endex),
            start,
            endex,
        }
    }

    /// Iterate `Option<u8>` per address over `[start, endex)`, with gap
    /// addresses yielding `pattern` bytes (aligned at the range start) when
    /// one is given.
    pub fn values(
        &self,
        start: Option<u64>,
        endex: Option<u64>,
        pattern: Option<&[u8]>,
    ) -> MemoryResult<Rover<'_>> {
        let (start, endex) = self.bound(start, endex);
        Rover::new(self, true, start, endex, pattern, false)
    }

    /// Like [`values`](Self::values), but never ends: past the span the
    /// pattern (or `None`) repeats forever.
    pub fn values_infinite(
        &self,
        start: Option<u64>,
        pattern: Option<&[u8]>,
    ) -> MemoryResult<Rover<'_>> {
        let start = start.unwrap_or_else(|| self.start());
        let endex = self.endex().max(start);
        Rover::new(self, true, start, endex, pattern, true)
    }

    /// Reverse of [`values`](Self::values): from `endex` down to `start`.
    pub fn rvalues(
        &self,
        start: Option<u64>,
        endex: Option<u64>,
        pattern: Option<&[u8]>,
    ) -> MemoryResult<Rover<'_>> {
        let (start, endex) = self.bound(start, endex);
        Rover::new(self, false, start, endex, pattern, false)
    }

    /// Iterate `(address, Option<u8>)` pairs over `[start, endex)`.
    pub fn items(&self, start: Option<u64>, endex: Option<u64>) -> MemoryResult<Items<'_>> {
        let (start, endex) = self.bound(start, endex);
        Ok(Items {
            rover: Rover::new(self, true, start, endex, None, false)?,
            address: start,
        })
    }
}

/// Iterator over `(address, bytes)` per block. See [`Memory::blocks`].
pub struct Blocks<'m> {
    memory: &'m Memory,
    index: usize,
}

impl<'m> Iterator for Blocks<'m> {
    type Item = (u64, &'m [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let rack = self.memory.rack();
        if self.index >= rack.len() {
            return None;
        }
        let block = rack.slot(self.index);
        self.index += 1;
        Some((block.address(), block.as_slice()))
    }
}

/// Iterator over `(address, view)` per block. See [`Memory::views`].
pub struct Views<'m> {
    memory: &'m Memory,
    index: usize,
}

impl Iterator for Views<'_> {
    type Item = (u64, BlockView);

    fn next(&mut self) -> Option<Self::Item> {
        let rack = self.memory.rack();
        if self.index >= rack.len() {
            return None;
        }
        let block = rack.slot(self.index);
        self.index += 1;
        Some((block.address(), block.view()))
    }
}

/// Iterator over gap ranges. See [`Memory::gaps`].
pub struct Gaps<'m> {
    memory: &'m Memory,
    index: usize,
    last: usize,
    lower: u64,
    open_left: bool,
    endex: Option<u64>,
    done: bool,
}

impl Iterator for Gaps<'_> {
    type Item = (Option<u64>, Option<u64>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let rack = self.memory.rack();
        while self.index < self.last {
            let block = rack.slot(self.index);
            self.index += 1;
            let block_start = block.address();
            let block_endex = block.endex();
            if self.lower < block_start {
                let lower = (!self.open_left).then_some(self.lower);
                self.open_left = false;
                self.lower = block_endex;
                return Some((lower, Some(block_start)));
            }
            self.lower = self.lower.max(block_endex);
            self.open_left = false;
        }
        self.done = true;
        let lower = (!self.open_left).then_some(self.lower);
        match self.endex {
            None => Some((lower, None)),
            Some(endex) if self.lower < endex => Some((lower, Some(endex))),
            Some(_) => None,
        }
    }
}

/// Iterator over populated ranges. See [`Memory::intervals`].
pub struct Intervals<'m> {
    memory: &'m Memory,
    index: usize,
    last: usize,
    start: u64,
    endex: u64,
}

impl Iterator for Intervals<'_> {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        let rack = self.memory.rack();
        while self.index < self.last {
            let block = rack.slot(self.index);
            self.index += 1;
            let start = self.start.max(block.address());
            let endex = self.endex.min(block.endex());
            if start < endex {
                return Some((start, endex));
            }
        }
        None
    }
}

/// Iterator over `(address, Option<u8>)` pairs. See [`Memory::items`].
pub struct Items<'m> {
    rover: Rover<'m>,
    address: u64,
}

impl Iterator for Items<'_> {
    type Item = (u64, Option<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.rover.next()?;
        let item = (self.address, value);
        self.address = self.address.saturating_add(1);
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_iterates_in_order() -> MemoryResult<()> {
        let memory = Memory::from_blocks([(5u64, &b"ab"[..]), (9, &b"cd"[..])])?;
        let collected: Vec<(u64, Vec<u8>)> = memory
            .blocks()
            .map(|(address, bytes)| (address, bytes.to_vec()))
            .collect();
        assert_eq!(collected, [(5, b"ab".to_vec()), (9, b"cd".to_vec())]);
        Ok(())
    }

    #[test]
    fn views_acquire_each_block() -> MemoryResult<()> {
        let memory = Memory::from_blocks([(5u64, &b"ab"[..]), (9, &b"cd"[..])])?;
        let views: Vec<_> = memory.views().collect();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].0, 5);
        assert_eq!(&*views[0].1, b"ab");
        // the views hold the blocks shared
        assert_eq!(memory.rack().slot(0).references(), 2);
        drop(views);
        assert!(memory.rack().slot(0).is_unique());
        Ok(())
    }

    #[test]
    fn gaps_with_open_ends() -> MemoryResult<()> {
        let memory = Memory::from_blocks([(1u64, &b"ABC"[..]), (6, &b"xyz"[..])])?;
        let collected: Vec<_> = memory.gaps(None, None).collect();
        assert_eq!(
            collected,
            [(None, Some(1)), (Some(4), Some(6)), (Some(9), None)]
        );
        Ok(())
    }

    #[test]
    fn gaps_with_explicit_bounds() -> MemoryResult<()> {
        let memory = Memory::from_blocks([(1u64, &b"ABC"[..]), (6, &b"xyz"[..])])?;
        let collected: Vec<_> = memory.gaps(Some(0), Some(10)).collect();
        assert_eq!(
            collected,
            [
                (Some(0), Some(1)),
                (Some(4), Some(6)),
                (Some(9), Some(10))
            ]
        );
        // a range inside a block has no gaps
        assert_eq!(memory.gaps(Some(1), Some(3)).count(), 0);
        Ok(())
    }

    #[test]
    fn gaps_of_empty_memory() {
        let memory = Memory::new();
        let collected: Vec<_> = memory.gaps(None, None).collect();
        assert_eq!(collected, [(None, None)]);
        let collected: Vec<_> = memory.gaps(Some(3), Some(7)).collect();
        assert_eq!(collected, [(Some(3), Some(7))]);
    }

    #[test]
    fn intervals_clip_to_the_range() -> MemoryResult<()> {
        let memory = Memory::from_blocks([(1u64, &b"ABC"[..]), (6, &b"xyz"[..])])?;
        let collected: Vec<_> = memory.intervals(None, None).collect();
        assert_eq!(collected, [(1, 4), (6, 9)]);
        let collected: Vec<_> = memory.intervals(Some(2), Some(7)).collect();
        assert_eq!(collected, [(2, 4), (6, 7)]);
        assert_eq!(Memory::new().intervals(None, None).count(), 0);
        Ok(())
    }

    #[test]
    fn values_with_a_pattern_fill_the_gaps() -> MemoryResult<()> {
        let memory = Memory::from_blocks([(1u64, &b"AB"[..]), (5, &b"C"[..])])?;
        let values: Vec<u8> = memory
            .values(None, None, Some(b"123"))?
            .map(Option::unwrap)
            .collect();
        // gap addresses 3 and 4 take pattern[(a - 1) % 3]
        assert_eq!(values, *b"AB31C");
        Ok(())
    }

    #[test]
    fn items_pair_addresses_with_values() -> MemoryResult<()> {
        let memory = Memory::from_blocks([(1u64, &b"ab"[..]), (4, &b"c"[..])])?;
        let collected: Vec<_> = memory.items(None, None)?.collect();
        assert_eq!(
            collected,
            [
                (1, Some(b'a')),
                (2, Some(b'b')),
                (3, None),
                (4, Some(b'c'))
            ]
        );
        Ok(())
    }
}
