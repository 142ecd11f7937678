// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// This Source Code Form is "Incompatible With Secondary Licenses", as
// defined by the Mozilla Public License, v. 2.0.
//
// Copyright © 2022 mumblingdrunkard

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use log::trace;

use crate::block::BlockHandle;
use crate::error::{MemoryError, MemoryResult};
use crate::util::{self, MARGIN};

/// Ordered collection of block handles, sorted by block address.
///
/// Slots use the same head/tail-margin layout and resize policy as the byte
/// buffer inside [`Block`](crate::block::Block), but over handle-sized
/// slots, so inserting or popping at either end is amortized constant time.
/// Margin slots are `None`; every live slot holds a block.
///
/// The rack itself does not enforce ordering — that is the owner's contract
/// — but its binary-search primitives assume it.
#[derive(Clone)]
pub struct Rack {
    start: usize,
    endex: usize,
    slots: Vec<Option<BlockHandle>>,
}

impl Rack {
    pub fn new() -> Self {
        Self {
            start: 0,
            endex: 0,
            slots: Vec::new(),
        }
    }

    /// A rack with room for `capacity` blocks before reallocating.
    pub fn with_capacity(capacity: usize) -> MemoryResult<Self> {
        let allocated = util::upsize(0, capacity)?;
        Ok(Self {
            start: MARGIN,
            endex: MARGIN,
            slots: util::try_vec(allocated)?,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.endex - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.endex
    }

    #[inline]
    pub fn allocated(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, index: usize) -> Option<&BlockHandle> {
        if index < self.len() {
            self.slots[self.start + index].as_ref()
        } else {
            None
        }
    }

    /// Live-slot accessor for internal paths that already checked bounds.
    pub(crate) fn slot(&self, index: usize) -> &BlockHandle {
        match self.slots[self.start + index] {
            Some(ref handle) => handle,
            None => unreachable!("live slot must hold a block"),
        }
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut BlockHandle {
        match self.slots[self.start + index] {
            Some(ref mut handle) => handle,
            None => unreachable!("live slot must hold a block"),
        }
    }

    /// Replace the block at `index`, returning the displaced handle.
    pub fn set(&mut self, index: usize, handle: BlockHandle) -> MemoryResult<BlockHandle> {
        if index >= self.len() {
            return Err(MemoryError::IndexOutOfRange {
                index,
                length: self.len(),
            });
        }
        match self.slots[self.start + index].replace(handle) {
            Some(displaced) => Ok(displaced),
            None => unreachable!("live slot must hold a block"),
        }
    }

    pub fn insert(&mut self, index: usize, handle: BlockHandle) -> MemoryResult<()> {
        self.reserve_slots(index, 1)?;
        self.slots[self.start + index] = Some(handle);
        Ok(())
    }

    pub fn append(&mut self, handle: BlockHandle) -> MemoryResult<()> {
        self.insert(self.len(), handle)
    }

    pub fn append_left(&mut self, handle: BlockHandle) -> MemoryResult<()> {
        self.insert(0, handle)
    }

    pub fn pop(&mut self) -> MemoryResult<BlockHandle> {
        if self.is_empty() {
            return Err(MemoryError::EmptyContainer);
        }
        self.remove(self.len() - 1)
    }

    pub fn pop_left(&mut self) -> MemoryResult<BlockHandle> {
        if self.is_empty() {
            return Err(MemoryError::EmptyContainer);
        }
        self.remove(0)
    }

    /// Remove and return the block at `index`.
    pub fn remove(&mut self, index: usize) -> MemoryResult<BlockHandle> {
        if index >= self.len() {
            return Err(MemoryError::IndexOutOfRange {
                index,
                length: self.len(),
            });
        }
        let handle = match self.slots[self.start + index].take() {
            Some(handle) => handle,
            None => unreachable!("live slot must hold a block"),
        };
        self.delete_slots(index, 1)?;
        Ok(handle)
    }

    /// Remove `count` blocks starting at `index`, releasing each.
    pub fn delete(&mut self, index: usize, count: usize) -> MemoryResult<()> {
        self.delete_slots(index, count)
    }

    pub fn del_slice(&mut self, start: usize, endex: usize) -> MemoryResult<()> {
        let endex = endex.min(self.len()).max(start);
        let start = start.min(endex);
        self.delete_slots(start, endex - start)
    }

    pub fn extend<I>(&mut self, handles: I) -> MemoryResult<()>
    where
        I: IntoIterator<Item = BlockHandle>,
    {
        for handle in handles {
            self.append(handle)?;
        }
        Ok(())
    }

    pub fn extend_left<I>(&mut self, handles: I) -> MemoryResult<()>
    where
        I: IntoIterator<Item = BlockHandle>,
    {
        let incoming: Vec<BlockHandle> = handles.into_iter().collect();
        self.reserve_slots(0, incoming.len())?;
        for (offset, handle) in incoming.into_iter().enumerate() {
            self.slots[self.start + offset] = Some(handle);
        }
        Ok(())
    }

    /// Acquired handles over `[start, endex)`, clamped.
    pub fn get_slice(&self, start: usize, endex: usize) -> Vec<BlockHandle> {
        let endex = endex.min(self.len());
        let start = start.min(endex);
        (start..endex).map(|i| self.slot(i).clone()).collect()
    }

    /// Replace the slots `[start, endex)` with `handles`, releasing the
    /// displaced blocks.
    pub fn set_slice(
        &mut self,
        start: usize,
        endex: usize,
        handles: Vec<BlockHandle>,
    ) -> MemoryResult<()> {
        let endex = endex.min(self.len()).max(start);
        let start = start.min(endex);
        self.delete_slots(start, endex - start)?;
        for (offset, handle) in handles.into_iter().enumerate() {
            self.insert(start + offset, handle)?;
        }
        Ok(())
    }

    /// New rack sharing (acquiring) every block.
    pub fn shallow_copy(&self) -> Self {
        self.clone()
    }

    /// New rack with a unique copy of every block payload.
    pub fn deep_copy(&self) -> Self {
        let mut rack = self.clone();
        rack.consolidate();
        rack
    }

    /// Replace every shared block with a fresh unique copy, so the rack can
    /// be edited in place afterwards.
    pub fn consolidate(&mut self) {
        let mut copied = 0usize;
        for index in 0..self.len() {
            let handle = self.slot_mut(index);
            if !handle.is_unique() {
                handle.make_mut();
                copied += 1;
            }
        }
        if copied > 0 {
            trace!("consolidated {copied} shared blocks");
        }
    }

    /// Add a signed delta to every block address. The extreme block is
    /// checked first so either every block moves or none does.
    pub fn shift(&mut self, delta: i64) -> MemoryResult<()> {
        self.shift_from(0, delta)
    }

    /// Shift only the blocks at `index` and after.
    pub fn shift_from(&mut self, index: usize, delta: i64) -> MemoryResult<()> {
        let length = self.len();
        if delta == 0 || index >= length {
            return Ok(());
        }
        let extreme = if delta > 0 {
            self.slot(length - 1).endex()
        } else {
            self.slot(index).address()
        };
        extreme
            .checked_add_signed(delta)
            .ok_or(MemoryError::AddressOverflow)?;
        for i in index..length {
            let block = self.slot_mut(i).make_mut();
            let address = block.address().wrapping_add_signed(delta);
            block.set_address(address)?;
        }
        Ok(())
    }

    /// Index of the block containing `address`, if any.
    pub fn index_at(&self, address: u64) -> Option<usize> {
        let mut lo = 0;
        let mut hi = self.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let block = self.slot(mid);
            if address < block.address() {
                hi = mid;
            } else if address < block.endex() {
                return Some(mid);
            } else {
                lo = mid + 1;
            }
        }
        None
    }

    /// Smallest index whose block ends past `address`; equivalently the
    /// insertion point for a block starting at `address`.
    pub fn index_start(&self, address: u64) -> usize {
        let mut lo = 0;
        let mut hi = self.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.slot(mid).endex() <= address {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Exclusive upper bound of the blocks affected by a range ending at
    /// `address`: the insertion point, bumped past a block that `address`
    /// splits.
    pub fn index_endex(&self, address: u64) -> usize {
        let index = self.index_start(address);
        if index < self.len() && self.slot(index).address() < address {
            index + 1
        } else {
            index
        }
    }

    fn reserve_slots(&mut self, offset: usize, size: usize) -> MemoryResult<()> {
        let length = self.len();
        if offset > length {
            return Err(MemoryError::IndexOutOfRange {
                index: offset,
                length,
            });
        }
        if size == 0 {
            return Ok(());
        }
        let new_len = length.checked_add(size).ok_or(MemoryError::SizeOverflow)?;

        let tail = length - offset;
        if offset <= tail {
            if size <= self.start {
                let start = self.start - size;
                for i in 0..offset {
                    self.slots.swap(start + i, self.start + i);
                }
                self.start = start;
            } else {
                self.regrow_slots(new_len, offset, size)?;
            }
        } else if size <= self.slots.len() - self.endex {
            for i in (offset..length).rev() {
                self.slots.swap(self.start + i, self.start + i + size);
            }
            self.endex += size;
        } else {
            self.regrow_slots(new_len, offset, size)?;
        }
        Ok(())
    }

    fn delete_slots(&mut self, offset: usize, size: usize) -> MemoryResult<()> {
        let length = self.len();
        if offset > length || size > length - offset {
            return Err(MemoryError::IndexOutOfRange {
                index: offset.saturating_add(size),
                length,
            });
        }
        if size == 0 {
            return Ok(());
        }
        for i in offset..offset + size {
            self.slots[self.start + i] = None;
        }

        let tail = length - offset - size;
        if offset <= tail {
            for i in (0..offset).rev() {
                self.slots.swap(self.start + i, self.start + i + size);
            }
            self.start += size;
        } else {
            for i in 0..tail {
                let from = self.start + offset + size + i;
                self.slots.swap(from, self.start + offset + i);
            }
            self.endex -= size;
        }

        let capacity = util::downsize(self.slots.len(), length - size);
        if capacity != self.slots.len() {
            self.realloc_slots(capacity)?;
        }
        Ok(())
    }

    fn regrow_slots(&mut self, new_len: usize, offset: usize, size: usize) -> MemoryResult<()> {
        let length = self.len();
        let capacity = util::upsize(self.slots.len(), new_len)?;
        let mut slots: Vec<Option<BlockHandle>> = util::try_vec(capacity)?;
        for i in 0..offset {
            slots[MARGIN + i] = self.slots[self.start + i].take();
        }
        for i in offset..length {
            slots[MARGIN + size + i] = self.slots[self.start + i].take();
        }
        self.slots = slots;
        self.start = MARGIN;
        self.endex = MARGIN + new_len;
        Ok(())
    }

    fn realloc_slots(&mut self, capacity: usize) -> MemoryResult<()> {
        let length = self.len();
        let mut slots: Vec<Option<BlockHandle>> = util::try_vec(capacity)?;
        for i in 0..length {
            slots[MARGIN + i] = self.slots[self.start + i].take();
        }
        self.slots = slots;
        self.start = MARGIN;
        self.endex = MARGIN + length;
        Ok(())
    }

    /// Reverse the order of the blocks. Addresses are the owner's business.
    pub(crate) fn reverse_order(&mut self) {
        self.slots[self.start..self.endex].reverse();
    }
}

impl Default for Rack {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Rack {
    /// Length plus pairwise block equality, addresses included.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && (0..self.len()).all(|i| {
                let a = self.slot(i);
                let b = other.slot(i);
                a.address() == b.address() && a.content_eq(b)
            })
    }
}

impl fmt::Debug for Rack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries((0..self.len()).map(|i| self.slot(i)))
            .finish()
    }
}

/// Shared-ownership handle over a [`Rack`], with the same unique/shared
/// discipline as [`BlockHandle`].
#[derive(Clone, Debug)]
pub struct RackHandle(Rc<Rack>);

impl RackHandle {
    pub fn new(rack: Rack) -> Self {
        Self(Rc::new(rack))
    }

    #[inline]
    pub fn references(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    #[inline]
    pub fn is_unique(&self) -> bool {
        Rc::strong_count(&self.0) == 1
    }

    pub fn try_mut(&mut self) -> MemoryResult<&mut Rack> {
        Rc::get_mut(&mut self.0).ok_or(MemoryError::Shared)
    }

    /// Copy-on-write: cloning the rack acquires every block, so the deep
    /// copies happen lazily, per block, when each one is edited.
    pub fn make_mut(&mut self) -> &mut Rack {
        Rc::make_mut(&mut self.0)
    }
}

impl Deref for RackHandle {
    type Target = Rack;

    #[inline]
    fn deref(&self) -> &Rack {
        &self.0
    }
}
