// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// This Source Code Form is "Incompatible With Secondary Licenses", as
// defined by the Mozilla Public License, v. 2.0.
//
// Copyright © 2022 mumblingdrunkard

mod backup;
mod export;
mod iter;
mod scan;

pub use iter::{Blocks, Gaps, Intervals, Items, Views};

use log::{debug, trace};

use crate::block::{Block, BlockHandle};
use crate::error::{MemoryError, MemoryResult};
use crate::rack::{Rack, RackHandle};

/// Sparse byte container: an address-addressable byte space where only
/// written regions consume storage.
///
/// Addresses are 64-bit unsigned; unwritten addresses read as `None`, never
/// as zero. Content is kept as strictly ordered, non-overlapping,
/// non-touching blocks in a [`Rack`]; every edit restores those invariants
/// before returning.
///
/// Optional trim bounds confine the content: writes outside
/// `[trim_start, trim_endex)` are silently discarded, and setting a bound
/// crops what is already there.
///
/// Cloning is cheap: the rack is shared, and mutation re-acquires unique
/// ownership copy-on-write, block by block.
#[derive(Clone, Debug)]
pub struct Memory {
    rack: RackHandle,
    trim_start: Option<u64>,
    trim_endex: Option<u64>,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            rack: RackHandle::new(Rack::new()),
            trim_start: None,
            trim_endex: None,
        }
    }

    /// Build from `(address, bytes)` pairs; later writes overwrite earlier
    /// ones, and overlapping or touching runs collapse into single blocks.
    pub fn from_blocks<I, B>(blocks: I) -> MemoryResult<Self>
    where
        I: IntoIterator<Item = (u64, B)>,
        B: AsRef<[u8]>,
    {
        let mut memory = Self::new();
        for (address, data) in blocks {
            memory.write(address, data.as_ref())?;
        }
        Ok(memory)
    }

    /// Build from one byte run at `address`.
    pub fn from_bytes(address: u64, data: &[u8]) -> MemoryResult<Self> {
        let mut memory = Self::new();
        memory.write(address, data)?;
        Ok(memory)
    }

    /// Build from `(address, value)` items; later items overwrite earlier
    /// ones, `None` values clear.
    pub fn from_items<I>(items: I) -> MemoryResult<Self>
    where
        I: IntoIterator<Item = (u64, Option<u8>)>,
    {
        let mut memory = Self::new();
        for (address, value) in items {
            memory.poke(address, value)?;
        }
        Ok(memory)
    }

    /// Build from a value sequence starting at `address`, where `None`
    /// entries denote gaps.
    pub fn from_values<I>(address: u64, values: I) -> MemoryResult<Self>
    where
        I: IntoIterator<Item = Option<u8>>,
    {
        let mut memory = Self::new();
        let mut cursor = address;
        let mut run_start = address;
        let mut run: Vec<u8> = Vec::new();
        for value in values {
            match value {
                Some(byte) => {
                    if run.is_empty() {
                        run_start = cursor;
                    }
                    run.push(byte);
                }
                None => {
                    if !run.is_empty() {
                        memory.write(run_start, &run)?;
                        run.clear();
                    }
                }
            }
            cursor = cursor.saturating_add(1);
        }
        if !run.is_empty() {
            memory.write(run_start, &run)?;
        }
        Ok(memory)
    }

    /// Copy of `source` with every address shifted by `delta`.
    pub fn from_memory(source: &Memory, delta: i64) -> MemoryResult<Self> {
        let mut memory = Self::new();
        memory.write_memory(delta, source, false)?;
        Ok(memory)
    }

    /// Apply trim bounds (cropping existing content) and return the memory.
    pub fn with_bounds(mut self, start: Option<u64>, endex: Option<u64>) -> MemoryResult<Self> {
        self.set_bounds(start, endex)?;
        Ok(self)
    }

    pub(crate) fn rack(&self) -> &Rack {
        &self.rack
    }

    // ------------------------------------------------------------------
    // bounds & trimming
    // ------------------------------------------------------------------

    /// Inclusive lower bound of the logical span: the trim start when
    /// enabled, else the first content address, else zero.
    pub fn start(&self) -> u64 {
        if let Some(bound) = self.trim_start {
            return bound;
        }
        self.rack.get(0).map_or(0, |block| block.address())
    }

    /// Exclusive upper bound of the logical span: the trim end when
    /// enabled, else the last content end, else [`start`](Self::start).
    pub fn endex(&self) -> u64 {
        if let Some(bound) = self.trim_endex {
            return bound;
        }
        let length = self.rack.len();
        if length > 0 {
            self.rack.slot(length - 1).endex()
        } else {
            self.start()
        }
    }

    pub fn span(&self) -> (u64, u64) {
        (self.start(), self.endex())
    }

    /// First content address, ignoring trimming; the trim-start value (or
    /// zero) when empty.
    pub fn content_start(&self) -> u64 {
        self.rack
            .get(0)
            .map_or_else(|| self.trim_start.unwrap_or(0), |block| block.address())
    }

    /// End of the last content block, ignoring trimming; falls back to
    /// [`content_start`](Self::content_start) when empty.
    pub fn content_endex(&self) -> u64 {
        let length = self.rack.len();
        if length > 0 {
            self.rack.slot(length - 1).endex()
        } else {
            self.content_start()
        }
    }

    pub fn content_span(&self) -> (u64, u64) {
        (self.content_start(), self.content_endex())
    }

    /// Total number of stored bytes.
    pub fn content_size(&self) -> u64 {
        (0..self.rack.len())
            .map(|index| self.rack.slot(index).len() as u64)
            .sum()
    }

    /// Number of content blocks.
    pub fn content_parts(&self) -> usize {
        self.rack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rack.is_empty()
    }

    /// Resolve an optional address pair against the logical span:
    /// missing sides default to the span, explicit sides are clamped into
    /// it, and inverted pairs collapse to an empty range.
    pub fn bound(&self, start: Option<u64>, endex: Option<u64>) -> (u64, u64) {
        let lo = self.start();
        let hi = self.endex();
        let start = start.map_or(lo, |s| s.clamp(lo, hi));
        let endex = endex.map_or(hi, |e| e.clamp(lo, hi));
        (start, endex.max(start))
    }

    pub fn trim_start(&self) -> Option<u64> {
        self.trim_start
    }

    pub fn trim_endex(&self) -> Option<u64> {
        self.trim_endex
    }

    /// Set or clear the lower trim bound, cropping content below it. If the
    /// new bound passes the upper one, the upper one is clamped up to it.
    pub fn set_trim_start(&mut self, bound: Option<u64>) -> MemoryResult<()> {
        if let Some(start) = bound {
            if matches!(self.trim_endex, Some(endex) if endex < start) {
                self.trim_endex = Some(start);
            }
        }
        self.trim_start = bound;
        if let Some(start) = bound {
            let content_start = self.content_start();
            if content_start < start {
                Self::erase_in(self.rack.make_mut(), content_start, start, false)?;
            }
        }
        Ok(())
    }

    /// Set or clear the upper trim bound, cropping content beyond it. If
    /// the new bound passes the lower one, the lower one is clamped down.
    pub fn set_trim_endex(&mut self, bound: Option<u64>) -> MemoryResult<()> {
        if let Some(endex) = bound {
            if matches!(self.trim_start, Some(start) if start > endex) {
                self.trim_start = Some(endex);
            }
        }
        self.trim_endex = bound;
        if let Some(endex) = bound {
            let content_endex = self.content_endex();
            if content_endex > endex {
                Self::erase_in(self.rack.make_mut(), endex, content_endex, false)?;
            }
        }
        Ok(())
    }

    pub fn set_bounds(&mut self, start: Option<u64>, endex: Option<u64>) -> MemoryResult<()> {
        self.set_trim_start(start)?;
        self.set_trim_endex(endex)
    }

    /// Intersect an address range with the trim bounds.
    fn clip_to_trim(&self, start: u64, endex: u64) -> (u64, u64) {
        let start = match self.trim_start {
            Some(bound) => start.max(bound),
            None => start,
        };
        let endex = match self.trim_endex {
            Some(bound) => endex.min(bound),
            None => endex,
        };
        (start, endex.max(start))
    }

    /// Check ordering, overlap, touching, emptiness, and trim containment.
    pub fn validate(&self) -> MemoryResult<()> {
        if let (Some(start), Some(endex)) = (self.trim_start, self.trim_endex) {
            if endex < start {
                return Err(MemoryError::InvalidLayout {
                    reason: "trim bounds inverted",
                });
            }
        }
        let mut previous: Option<u64> = None;
        for index in 0..self.rack.len() {
            let block = self.rack.slot(index);
            if block.is_empty() {
                return Err(MemoryError::InvalidLayout {
                    reason: "empty block",
                });
            }
            if matches!(previous, Some(endex) if block.address() <= endex) {
                return Err(MemoryError::InvalidLayout {
                    reason: "blocks out of order, overlapping, or touching",
                });
            }
            previous = Some(block.endex());
        }
        if let Some(bound) = self.trim_start {
            if !self.rack.is_empty() && self.rack.slot(0).address() < bound {
                return Err(MemoryError::InvalidLayout {
                    reason: "content below trim start",
                });
            }
        }
        if let Some(bound) = self.trim_endex {
            let length = self.rack.len();
            if length > 0 && self.rack.slot(length - 1).endex() > bound {
                return Err(MemoryError::InvalidLayout {
                    reason: "content beyond trim end",
                });
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // core editing primitives
    // ------------------------------------------------------------------

    /// Insert `data` at `address`. With `shift_after`, blocks at or past the
    /// address first move right to make room (an address strictly inside a
    /// block grows that block instead); without it, the caller has already
    /// cleared the range and the bytes land in the gap. Either way, runs
    /// that end up touching are merged.
    fn place_in(rack: &mut Rack, address: u64, data: &[u8], shift_after: bool) -> MemoryResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        trace!(
            "place {} bytes at {:#x} (shift: {})",
            data.len(),
            address,
            shift_after
        );
        let index = rack.index_start(address);
        if shift_after {
            let delta = i64::try_from(data.len()).map_err(|_| MemoryError::SizeOverflow)?;
            if index < rack.len() && rack.slot(index).address() < address {
                // insertion strictly inside an existing block
                let block = rack.slot(index);
                let offset = (address - block.address()) as usize;
                block
                    .endex()
                    .checked_add(data.len() as u64)
                    .ok_or(MemoryError::AddressOverflow)?;
                rack.shift_from(index + 1, delta)?;
                let block = rack.slot_mut(index).make_mut();
                block.reserve(offset, data.len(), false)?;
                block.write(offset, data)?;
                return Ok(());
            }
            rack.shift_from(index, delta)?;
        }
        Self::place_in_gap(rack, index, address, data)
    }

    /// Place `data` into the gap before slot `index`, extending a touching
    /// neighbor (or bridging both) rather than leaving adjacent blocks.
    fn place_in_gap(rack: &mut Rack, index: usize, address: u64, data: &[u8]) -> MemoryResult<()> {
        let endex = address
            .checked_add(data.len() as u64)
            .ok_or(MemoryError::AddressOverflow)?;
        let merge_prev = index > 0 && rack.slot(index - 1).endex() == address;
        let merge_next = index < rack.len() && rack.slot(index).address() == endex;
        match (merge_prev, merge_next) {
            (true, true) => {
                let absorbed = rack.remove(index)?;
                let previous = rack.slot_mut(index - 1).make_mut();
                previous.extend(data)?;
                previous.extend(absorbed.as_slice())?;
            }
            (true, false) => {
                rack.slot_mut(index - 1).make_mut().extend(data)?;
            }
            (false, true) => {
                let next = rack.slot_mut(index).make_mut();
                next.extend_left(data)?;
                next.set_address(address)?;
            }
            (false, false) => {
                let block = BlockHandle::new(Block::new(address, data)?);
                rack.insert(index, block)?;
            }
        }
        Ok(())
    }

    /// Remove the address range `[start, endex)`. A block straddling
    /// `start` keeps its prefix; one straddling `endex` keeps its suffix
    /// (readdressed to `endex`); blocks inside go away. With `shift_after`,
    /// the surviving suffix then moves left over the hole and rejoins its
    /// neighbor if they touch.
    fn erase_in(rack: &mut Rack, start: u64, endex: u64, shift_after: bool) -> MemoryResult<()> {
        if start >= endex {
            return Ok(());
        }
        trace!("erase [{start:#x}, {endex:#x}) (shift: {shift_after})");
        let mut first = rack.index_start(start);
        let mut last = rack.index_endex(endex);
        if first < last {
            let (head_address, head_endex) = {
                let block = rack.slot(first);
                (block.address(), block.endex())
            };
            if head_address < start {
                let offset = (start - head_address) as usize;
                if head_endex > endex {
                    // one block strictly covers the range: split it
                    let suffix = {
                        let block = rack.slot(first);
                        let keep = (endex - head_address) as usize;
                        Block::new(endex, &block.as_slice()[keep..])?
                    };
                    let length = (head_endex - head_address) as usize;
                    rack.slot_mut(first)
                        .make_mut()
                        .delete(offset, length - offset)?;
                    rack.insert(first + 1, BlockHandle::new(suffix))?;
                    first += 1;
                    last = first;
                } else {
                    let length = (head_endex - head_address) as usize;
                    rack.slot_mut(first)
                        .make_mut()
                        .delete(offset, length - offset)?;
                    first += 1;
                }
            }
            if first < last {
                let (tail_address, tail_endex) = {
                    let block = rack.slot(last - 1);
                    (block.address(), block.endex())
                };
                if tail_endex > endex {
                    let head = (endex - tail_address) as usize;
                    let block = rack.slot_mut(last - 1).make_mut();
                    block.delete(0, head)?;
                    block.set_address(endex)?;
                    last -= 1;
                }
            }
            if first < last {
                rack.delete(first, last - first)?;
            }
        }
        if shift_after {
            let delta = i64::try_from(endex - start).map_err(|_| MemoryError::AddressOverflow)?;
            rack.shift_from(first, -delta)?;
            if first > 0 && first < rack.len() {
                let touching = rack.slot(first - 1).endex() == rack.slot(first).address();
                if touching {
                    let absorbed = rack.remove(first)?;
                    rack.slot_mut(first - 1)
                        .make_mut()
                        .extend(absorbed.as_slice())?;
                }
            }
        }
        Ok(())
    }

    /// Gaps inside the concrete range `[start, endex)`, materialized.
    pub(crate) fn gaps_within(&self, start: u64, endex: u64) -> Vec<(u64, u64)> {
        let mut gaps = Vec::new();
        let mut cursor = start;
        let first = self.rack.index_start(start);
        let last = self.rack.index_endex(endex);
        for index in first..last {
            let block = self.rack.slot(index);
            if cursor < block.address() {
                gaps.push((cursor, block.address().min(endex)));
            }
            cursor = cursor.max(block.endex());
        }
        if cursor < endex {
            gaps.push((cursor, endex));
        }
        gaps
    }

    /// Repeat `pattern` from `offset` into a buffer of `size` bytes.
    fn pattern_bytes(pattern: &[u8], offset: usize, size: usize) -> MemoryResult<Vec<u8>> {
        if size > crate::util::SIZE_CEIL {
            return Err(MemoryError::SizeOverflow);
        }
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(size)
            .map_err(|_| MemoryError::AllocationFailure)?;
        bytes.extend(pattern.iter().cycle().skip(offset).take(size));
        Ok(bytes)
    }

    // ------------------------------------------------------------------
    // editing surface
    // ------------------------------------------------------------------

    /// Byte at `address`, `None` in a gap.
    pub fn peek(&self, address: u64) -> Option<u8> {
        let index = self.rack.index_at(address)?;
        let block = self.rack.slot(index);
        Some(block.as_slice()[(address - block.address()) as usize])
    }

    /// Overwrite one address; `None` clears it. Outside the trim bounds the
    /// write is silently discarded.
    pub fn poke(&mut self, address: u64, value: Option<u8>) -> MemoryResult<()> {
        let endex = address.checked_add(1).ok_or(MemoryError::AddressOverflow)?;
        let Some(value) = value else {
            let (start, endex) = self.clip_to_trim(address, endex);
            return Self::erase_in(self.rack.make_mut(), start, endex, false);
        };
        let (start, clipped) = self.clip_to_trim(address, endex);
        if start >= clipped {
            return Ok(());
        }
        let rack = self.rack.make_mut();
        if let Some(index) = rack.index_at(address) {
            let block = rack.slot_mut(index).make_mut();
            let offset = (address - block.address()) as usize;
            block.set(offset, value)
        } else {
            let index = rack.index_start(address);
            Self::place_in_gap(rack, index, address, &[value])
        }
    }

    /// Overwrite a byte run starting at `address`; the trim bounds clip it.
    pub fn write(&mut self, address: u64, data: &[u8]) -> MemoryResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let endex = address
            .checked_add(data.len() as u64)
            .ok_or(MemoryError::AddressOverflow)?;
        let (start, clipped) = self.clip_to_trim(address, endex);
        if start >= clipped {
            return Ok(());
        }
        let data = &data[(start - address) as usize..(clipped - address) as usize];
        let rack = self.rack.make_mut();
        Self::erase_in(rack, start, clipped, false)?;
        Self::place_in(rack, start, data, false)
    }

    /// Write another memory's blocks, each at its own address shifted by
    /// `delta`. With `clear`, the source's whole span is cleared here first
    /// so the source's gaps erase instead of preserving.
    pub fn write_memory(&mut self, delta: i64, source: &Memory, clear: bool) -> MemoryResult<()> {
        if clear {
            let (content_start, content_endex) = source.content_span();
            if content_start < content_endex {
                let start = content_start
                    .checked_add_signed(delta)
                    .ok_or(MemoryError::AddressOverflow)?;
                let endex = content_endex
                    .checked_add_signed(delta)
                    .ok_or(MemoryError::AddressOverflow)?;
                let (start, endex) = self.clip_to_trim(start, endex);
                Self::erase_in(self.rack.make_mut(), start, endex, false)?;
            }
        }
        for index in 0..source.rack.len() {
            let block = source.rack.slot(index);
            let address = block
                .address()
                .checked_add_signed(delta)
                .ok_or(MemoryError::AddressOverflow)?;
            self.write(address, block.as_slice())?;
        }
        Ok(())
    }

    /// Open a gap of `data.len()` bytes at `address` (shifting later blocks
    /// right) and write `data` into it.
    pub fn insert(&mut self, address: u64, data: &[u8]) -> MemoryResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        let size = data.len() as u64;
        if let Some(bound) = self.trim_endex {
            if address >= bound {
                return Ok(());
            }
            // make room: content the shift would push past the bound goes away
            let cut = bound.saturating_sub(size).max(address);
            Self::erase_in(self.rack.make_mut(), cut, bound, false)?;
        }
        Self::place_in(self.rack.make_mut(), address, data, true)?;
        if let Some(bound) = self.trim_start {
            let content_start = self.content_start();
            if content_start < bound {
                Self::erase_in(self.rack.make_mut(), content_start, bound, false)?;
            }
        }
        Ok(())
    }

    /// Open an empty gap of `size` addresses at `address`, shifting later
    /// blocks right; a block spanning the address is split.
    pub fn reserve(&mut self, address: u64, size: u64) -> MemoryResult<()> {
        if size == 0 {
            return Ok(());
        }
        if let Some(bound) = self.trim_endex {
            if address >= bound {
                return Ok(());
            }
            let cut = bound.saturating_sub(size).max(address);
            Self::erase_in(self.rack.make_mut(), cut, bound, false)?;
        }
        let delta = i64::try_from(size).map_err(|_| MemoryError::AddressOverflow)?;
        let rack = self.rack.make_mut();
        let index = rack.index_start(address);
        if index < rack.len() && rack.slot(index).address() < address {
            let (offset, length, suffix) = {
                let block = rack.slot(index);
                let offset = (address - block.address()) as usize;
                let readdressed = address
                    .checked_add(size)
                    .ok_or(MemoryError::AddressOverflow)?;
                (
                    offset,
                    block.len(),
                    Block::new(readdressed, &block.as_slice()[offset..])?,
                )
            };
            rack.shift_from(index + 1, delta)?;
            rack.slot_mut(index)
                .make_mut()
                .delete(offset, length - offset)?;
            rack.insert(index + 1, BlockHandle::new(suffix))?;
        } else {
            rack.shift_from(index, delta)?;
        }
        Ok(())
    }

    /// Erase `[start, endex)` and shift everything after it left over the
    /// hole.
    pub fn delete(&mut self, start: Option<u64>, endex: Option<u64>) -> MemoryResult<()> {
        let (start, endex) = self.bound(start, endex);
        Self::erase_in(self.rack.make_mut(), start, endex, true)
    }

    /// Erase `[start, endex)` in place, leaving addresses untouched.
    pub fn clear(&mut self, start: Option<u64>, endex: Option<u64>) -> MemoryResult<()> {
        let (start, endex) = self.bound(start, endex);
        Self::erase_in(self.rack.make_mut(), start, endex, false)
    }

    /// Clear everything outside `[start, endex)`.
    pub fn crop(&mut self, start: Option<u64>, endex: Option<u64>) -> MemoryResult<()> {
        let (start, endex) = self.bound(start, endex);
        let content_start = self.content_start();
        let content_endex = self.content_endex();
        let rack = self.rack.make_mut();
        if content_start < start {
            Self::erase_in(rack, content_start, start, false)?;
        }
        if endex < content_endex {
            Self::erase_in(rack, endex, content_endex, false)?;
        }
        Ok(())
    }

    /// Overwrite `[start, endex)` with `pattern`, cyclically, anchored so
    /// the byte at any address `a` is `pattern[(a - start()) % len]`.
    pub fn fill(
        &mut self,
        start: Option<u64>,
        endex: Option<u64>,
        pattern: &[u8],
    ) -> MemoryResult<()> {
        if pattern.is_empty() {
            return Err(MemoryError::EmptyPattern);
        }
        let anchor = self.start();
        let (start, endex) = self.bound(start, endex);
        if start >= endex {
            return Ok(());
        }
        let size = usize::try_from(endex - start).map_err(|_| MemoryError::SizeOverflow)?;
        let offset = ((start - anchor) % pattern.len() as u64) as usize;
        let bytes = Self::pattern_bytes(pattern, offset, size)?;
        let rack = self.rack.make_mut();
        Self::erase_in(rack, start, endex, false)?;
        Self::place_in(rack, start, &bytes, false)
    }

    /// Fill only the gaps inside `[start, endex)` with `pattern`, same
    /// anchoring as [`fill`](Self::fill); existing bytes win.
    pub fn flood(
        &mut self,
        start: Option<u64>,
        endex: Option<u64>,
        pattern: &[u8],
    ) -> MemoryResult<()> {
        if pattern.is_empty() {
            return Err(MemoryError::EmptyPattern);
        }
        let anchor = self.start();
        let (start, endex) = self.bound(start, endex);
        if start >= endex {
            return Ok(());
        }
        let gaps = self.gaps_within(start, endex);
        let rack = self.rack.make_mut();
        for (gap_start, gap_endex) in gaps {
            let size = usize::try_from(gap_endex - gap_start).map_err(|_| MemoryError::SizeOverflow)?;
            let offset = ((gap_start - anchor) % pattern.len() as u64) as usize;
            let bytes = Self::pattern_bytes(pattern, offset, size)?;
            let index = rack.index_start(gap_start);
            Self::place_in_gap(rack, index, gap_start, &bytes)?;
        }
        Ok(())
    }

    /// Translate every block by `delta`. Content that a trim bound would
    /// clip on the vacated side is discarded first; without a bound on that
    /// side, running off the address space is an error.
    pub fn shift(&mut self, delta: i64) -> MemoryResult<()> {
        if delta == 0 || self.rack.is_empty() {
            return Ok(());
        }
        debug!("shift all blocks by {delta}");
        if delta < 0 {
            if let Some(bound) = self.trim_start {
                let cut = bound.saturating_add(delta.unsigned_abs());
                let content_start = self.content_start();
                if content_start < cut {
                    Self::erase_in(self.rack.make_mut(), content_start, cut, false)?;
                }
            }
        } else if let Some(bound) = self.trim_endex {
            let cut = bound.saturating_sub(delta as u64);
            let content_endex = self.content_endex();
            if cut < content_endex {
                Self::erase_in(self.rack.make_mut(), cut, content_endex, false)?;
            }
        }
        self.rack.make_mut().shift(delta)
    }

    /// Reverse the span: a block covering `[a, b)` moves to
    /// `[start + endex - b, start + endex - a)` with its bytes reversed.
    pub fn reverse(&mut self) -> MemoryResult<()> {
        if self.rack.is_empty() {
            return Ok(());
        }
        let (start, endex) = self.span();
        let rack = self.rack.make_mut();
        for index in 0..rack.len() {
            let block = rack.slot_mut(index).make_mut();
            let address = start + (endex - block.endex());
            block.as_mut_slice().reverse();
            block.set_address(address)?;
        }
        rack.reverse_order();
        Ok(())
    }

    /// Append one byte right after the last content byte.
    pub fn append(&mut self, value: u8) -> MemoryResult<()> {
        self.write(self.content_endex(), &[value])
    }

    /// Append a byte run `delta` addresses past the end of content.
    pub fn extend(&mut self, data: &[u8], delta: u64) -> MemoryResult<()> {
        let address = self
            .content_endex()
            .checked_add(delta)
            .ok_or(MemoryError::AddressOverflow)?;
        self.write(address, data)
    }

    /// Remove one byte (the last content byte when `address` is `None`),
    /// shifting everything after it left by one. Returns the removed value,
    /// `None` when the address was a gap.
    pub fn pop(&mut self, address: Option<u64>) -> MemoryResult<Option<u8>> {
        let address = match address {
            Some(address) => address,
            None => {
                if self.rack.is_empty() {
                    return Err(MemoryError::EmptyContainer);
                }
                self.content_endex() - 1
            }
        };
        let value = self.peek(address);
        let endex = address.checked_add(1).ok_or(MemoryError::AddressOverflow)?;
        Self::erase_in(self.rack.make_mut(), address, endex, true)?;
        Ok(value)
    }

    /// Remove and return the last content byte with its address, leaving
    /// all other addresses untouched.
    pub fn popitem(&mut self) -> MemoryResult<(u64, u8)> {
        if self.rack.is_empty() {
            return Err(MemoryError::EmptyContainer);
        }
        let rack = self.rack.make_mut();
        let index = rack.len() - 1;
        let block = rack.slot_mut(index).make_mut();
        let address = block.endex() - 1;
        let value = block.pop()?;
        if block.is_empty() {
            rack.remove(index)?;
        }
        Ok((address, value))
    }

    /// Find the first occurrence of `needle` and delete it with shift.
    pub fn remove(&mut self, needle: &[u8]) -> MemoryResult<()> {
        let address = self.find(needle, None, None).ok_or(MemoryError::NotFound)?;
        let endex = address + needle.len() as u64;
        Self::erase_in(self.rack.make_mut(), address, endex, true)
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Memory {
    /// Content equality: same blocks at the same addresses. Trim bounds are
    /// not compared.
    fn eq(&self, other: &Self) -> bool {
        *self.rack == *other.rack
    }
}
