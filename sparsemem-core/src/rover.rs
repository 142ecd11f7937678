// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// This Source Code Form is "Incompatible With Secondary Licenses", as
// defined by the Mozilla Public License, v. 2.0.
//
// Copyright © 2022 mumblingdrunkard

use crate::block::BlockHandle;
use crate::error::{MemoryError, MemoryResult};
use crate::memory::Memory;

struct Pattern {
    data: Vec<u8>,
    offset: usize,
}

/// Directional cursor over an address range, yielding one `Option<u8>` per
/// address.
///
/// Inside a block the cursor yields the block's byte; in a gap it yields the
/// next byte of the repeating pattern (or `None` without one). The pattern
/// stays address-aligned: the byte for address `a` is
/// `pattern[(a - start) % len]` in either direction. A non-infinite rover
/// ends at the far bound; an infinite one keeps producing pattern bytes (or
/// `None`) forever past it.
///
/// While scanning a block the rover holds an acquired handle on it, released
/// on exit from the block, at the end of the range, and on drop.
///
/// The cursor is restartable by reconstruction, not by rewind.
pub struct Rover<'m> {
    memory: &'m Memory,
    forward: bool,
    infinite: bool,
    start: u64,
    endex: u64,
    /// Next address to yield going forward; exclusive upper cursor going in
    /// reverse.
    address: u64,
    /// Forward: rack index of the candidate block. Reverse: one past it.
    index: usize,
    block: Option<(BlockHandle, u64, u64)>,
    pattern: Option<Pattern>,
}

impl<'m> Rover<'m> {
    pub fn new(
        memory: &'m Memory,
        forward: bool,
        start: u64,
        endex: u64,
        pattern: Option<&[u8]>,
        infinite: bool,
    ) -> MemoryResult<Self> {
        let endex = endex.max(start);
        let pattern = match pattern {
            Some(bytes) if bytes.is_empty() => return Err(MemoryError::EmptyPattern),
            Some(bytes) => {
                let mut data = Vec::new();
                data.try_reserve_exact(bytes.len())
                    .map_err(|_| MemoryError::AllocationFailure)?;
                data.extend_from_slice(bytes);
                let offset = if forward {
                    0
                } else {
                    ((endex - start) % bytes.len() as u64) as usize
                };
                Some(Pattern { data, offset })
            }
            None => None,
        };
        let rack = memory.rack();
        Ok(Self {
            memory,
            forward,
            infinite,
            start,
            endex,
            address: if forward { start } else { endex },
            index: if forward {
                rack.index_start(start)
            } else {
                rack.index_endex(endex)
            },
            block: None,
            pattern,
        })
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    /// Pattern byte for the current gap address, rotating forward.
    fn take_pattern(&mut self) -> Option<u8> {
        let pattern = self.pattern.as_mut()?;
        let value = pattern.data[pattern.offset];
        pattern.offset = (pattern.offset + 1) % pattern.data.len();
        Some(value)
    }

    /// Pattern byte for the current gap address, rotating backward.
    fn take_pattern_back(&mut self) -> Option<u8> {
        let pattern = self.pattern.as_mut()?;
        pattern.offset = (pattern.offset + pattern.data.len() - 1) % pattern.data.len();
        Some(pattern.data[pattern.offset])
    }

    /// Keep the pattern aligned while yielding a block byte.
    fn rotate(&mut self) {
        if let Some(pattern) = &mut self.pattern {
            pattern.offset = (pattern.offset + 1) % pattern.data.len();
        }
    }

    fn rotate_back(&mut self) {
        if let Some(pattern) = &mut self.pattern {
            pattern.offset = (pattern.offset + pattern.data.len() - 1) % pattern.data.len();
        }
    }

    fn next_forward(&mut self) -> Option<Option<u8>> {
        if self.address >= self.endex {
            self.block = None;
            if !self.infinite {
                return None;
            }
            // past the range's data: the pattern goes on forever
            return Some(self.take_pattern());
        }
        if matches!(&self.block, Some((_, _, block_endex)) if self.address >= *block_endex) {
            self.block = None;
            self.index += 1;
        }
        if self.block.is_none() {
            let rack = self.memory.rack();
            if self.index < rack.len() {
                let handle = rack.slot(self.index);
                if handle.address() <= self.address && self.address < handle.endex() {
                    self.block = Some((handle.clone(), handle.address(), handle.endex()));
                }
            }
        }
        let value = match &self.block {
            Some((handle, block_start, _)) => {
                let byte = handle.as_slice()[(self.address - block_start) as usize];
                self.rotate();
                Some(byte)
            }
            None => self.take_pattern(),
        };
        self.address = self.address.saturating_add(1);
        Some(value)
    }

    fn next_reverse(&mut self) -> Option<Option<u8>> {
        if self.address <= self.start {
            self.block = None;
            if !self.infinite {
                return None;
            }
            return Some(self.take_pattern_back());
        }
        let target = self.address - 1;
        if matches!(&self.block, Some((_, block_start, _)) if target < *block_start) {
            self.block = None;
            self.index -= 1;
        }
        if self.block.is_none() {
            let rack = self.memory.rack();
            if self.index > 0 {
                let handle = rack.slot(self.index - 1);
                if handle.address() <= target && target < handle.endex() {
                    self.block = Some((handle.clone(), handle.address(), handle.endex()));
                }
            }
        }
        let value = match &self.block {
            Some((handle, block_start, _)) => {
                let byte = handle.as_slice()[(target - block_start) as usize];
                self.rotate_back();
                Some(byte)
            }
            None => self.take_pattern_back(),
        };
        self.address = target;
        Some(value)
    }
}

impl Iterator for Rover<'_> {
    type Item = Option<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.forward {
            self.next_forward()
        } else {
            self.next_reverse()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Memory {
        Memory::from_blocks([(2u64, &b"AB"[..]), (6, &b"CD"[..])]).unwrap()
    }

    #[test]
    fn forward_without_pattern() -> MemoryResult<()> {
        let memory = sample();
        let values: Vec<Option<u8>> = Rover::new(&memory, true, 0, 9, None, false)?.collect();
        assert_eq!(
            values,
            [
                None,
                None,
                Some(b'A'),
                Some(b'B'),
                None,
                None,
                Some(b'C'),
                Some(b'D'),
                None
            ]
        );
        Ok(())
    }

    #[test]
    fn forward_pattern_stays_address_aligned() -> MemoryResult<()> {
        let memory = sample();
        let values: Vec<u8> = Rover::new(&memory, true, 0, 9, Some(b"0123"), false)?
            .map(Option::unwrap)
            .collect();
        // gaps take pattern[(a - 0) % 4], blocks keep their own bytes
        assert_eq!(values, *b"01AB01CD0");
        Ok(())
    }

    #[test]
    fn reverse_yields_the_same_values_backwards() -> MemoryResult<()> {
        let memory = sample();
        let forward: Vec<u8> = Rover::new(&memory, true, 0, 9, Some(b"0123"), false)?
            .map(Option::unwrap)
            .collect();
        let mut reverse: Vec<u8> = Rover::new(&memory, false, 0, 9, Some(b"0123"), false)?
            .map(Option::unwrap)
            .collect();
        reverse.reverse();
        assert_eq!(forward, reverse);
        Ok(())
    }

    #[test]
    fn reverse_without_pattern() -> MemoryResult<()> {
        let memory = sample();
        let values: Vec<Option<u8>> = Rover::new(&memory, false, 5, 8, None, false)?.collect();
        assert_eq!(values, [Some(b'D'), Some(b'C'), None]);
        Ok(())
    }

    #[test]
    fn infinite_rover_continues_the_pattern() -> MemoryResult<()> {
        let memory = sample();
        let values: Vec<u8> = Rover::new(&memory, true, 6, 8, Some(b"xy"), true)?
            .take(6)
            .map(Option::unwrap)
            .collect();
        // "CD" then the pattern keeps rotating past the range
        assert_eq!(values, *b"CDxyxy");
        Ok(())
    }

    #[test]
    fn infinite_reverse_continues_below_the_start() -> MemoryResult<()> {
        let memory = Memory::from_bytes(2, &b"AB"[..])?;
        let values: Vec<u8> = Rover::new(&memory, false, 2, 4, Some(b"xy"), true)?
            .take(5)
            .map(Option::unwrap)
            .collect();
        // "BA" backwards, then the pattern keeps rotating downwards
        assert_eq!(values, *b"BAyxy");
        Ok(())
    }

    #[test]
    fn infinite_without_pattern_yields_none_forever() -> MemoryResult<()> {
        let memory = Memory::new();
        let values: Vec<Option<u8>> = Rover::new(&memory, true, 0, 0, None, true)?.take(3).collect();
        assert_eq!(values, [None, None, None]);
        Ok(())
    }

    #[test]
    fn empty_pattern_is_rejected() {
        let memory = Memory::new();
        assert!(matches!(
            Rover::new(&memory, true, 0, 10, Some(b""), false),
            Err(MemoryError::EmptyPattern)
        ));
    }

    #[test]
    fn rover_holds_the_scanned_block() -> MemoryResult<()> {
        let memory = sample();
        let watched = memory.rack().slot(0).clone();
        let mut rover = Rover::new(&memory, true, 2, 9, None, false)?;
        assert_eq!(rover.next(), Some(Some(b'A')));
        // handle in the rack, our watcher, and the rover's acquisition
        assert_eq!(watched.references(), 3);
        rover.next(); // B
        rover.next(); // gap at 4: the block is released
        assert_eq!(watched.references(), 2);
        drop(rover);
        Ok(())
    }

    #[test]
    fn empty_range_ends_immediately() -> MemoryResult<()> {
        let memory = sample();
        let mut rover = Rover::new(&memory, true, 5, 5, None, false)?;
        assert_eq!(rover.next(), None);
        assert_eq!(rover.next(), None);
        Ok(())
    }
}
