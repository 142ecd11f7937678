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

use crate::error::{MemoryError, MemoryResult};
use crate::util;

use super::Block;

/// Shared-ownership handle over a [`Block`].
///
/// Cloning a handle acquires the block; dropping one releases it. While more
/// than one handle (or view) is alive the block is frozen: [`try_mut`]
/// refuses with [`MemoryError::Shared`], and mutators that must make
/// progress regardless go through [`make_mut`], which clones the payload to
/// regain unique ownership first.
///
/// [`try_mut`]: Self::try_mut
/// [`make_mut`]: Self::make_mut
#[derive(Clone)]
pub struct BlockHandle(Rc<Block>);

impl BlockHandle {
    pub fn new(block: Block) -> Self {
        Self(Rc::new(block))
    }

    /// Number of live handles (and views) over this block.
    #[inline]
    pub fn references(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    #[inline]
    pub fn is_unique(&self) -> bool {
        Rc::strong_count(&self.0) == 1
    }

    /// Mutable access, only while this is the sole handle.
    pub fn try_mut(&mut self) -> MemoryResult<&mut Block> {
        Rc::get_mut(&mut self.0).ok_or(MemoryError::Shared)
    }

    /// Mutable access through copy-on-write: a shared payload is cloned so
    /// other holders keep seeing the old bytes.
    pub fn make_mut(&mut self) -> &mut Block {
        Rc::make_mut(&mut self.0)
    }

    /// Read-only view over the whole block.
    pub fn view(&self) -> BlockView {
        BlockView {
            handle: Some(self.clone()),
            start: 0,
            endex: self.len(),
        }
    }

    /// Read-only view over a signed sub-range, wrapped and clamped.
    pub fn view_slice(&self, start: isize, endex: isize) -> BlockView {
        let (start, endex) = util::wrap_range(start, endex, self.len());
        BlockView {
            handle: Some(self.clone()),
            start,
            endex,
        }
    }
}

impl Deref for BlockHandle {
    type Target = Block;

    #[inline]
    fn deref(&self) -> &Block {
        &self.0
    }
}

impl fmt::Debug for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockHandle({:?}, references: {})",
            self.0.deref(),
            self.references()
        )
    }
}

/// Read-only window over a block's live bytes.
///
/// The view holds an acquired handle, so the underlying block cannot be
/// structurally edited while the view is alive.
#[derive(Clone, Debug)]
pub struct BlockView {
    handle: Option<BlockHandle>,
    start: usize,
    endex: usize,
}

impl BlockView {
    /// A view over nothing; holds no block.
    pub fn empty() -> Self {
        Self {
            handle: None,
            start: 0,
            endex: 0,
        }
    }

    pub(crate) fn over(handle: BlockHandle, start: usize, endex: usize) -> Self {
        debug_assert!(start <= endex && endex <= handle.len());
        Self {
            handle: Some(handle),
            start,
            endex,
        }
    }

    /// Address of the first byte in view, `None` when empty.
    pub fn address(&self) -> Option<u64> {
        if self.is_empty() {
            None
        } else {
            self.handle
                .as_ref()
                .map(|handle| handle.address() + self.start as u64)
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.endex - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.endex
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.handle {
            Some(handle) => &handle.as_slice()[self.start..self.endex],
            None => &[],
        }
    }
}

impl Deref for BlockView {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsRef<[u8]> for BlockView {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_handles_refuse_mutation() -> MemoryResult<()> {
        let mut handle = BlockHandle::new(Block::new(0, &b"abc"[..])?);
        assert!(handle.is_unique());
        let other = handle.clone();
        assert_eq!(handle.references(), 2);
        assert_eq!(handle.try_mut().err(), Some(MemoryError::Shared));
        drop(other);
        handle.try_mut()?.append(b'd')?;
        assert_eq!(handle.as_slice(), b"abcd");
        Ok(())
    }

    #[test]
    fn make_mut_copies_on_write() -> MemoryResult<()> {
        let mut handle = BlockHandle::new(Block::new(0, &b"abc"[..])?);
        let snapshot = handle.clone();
        handle.make_mut().set(0, b'X')?;
        assert_eq!(handle.as_slice(), b"Xbc");
        assert_eq!(snapshot.as_slice(), b"abc");
        assert!(handle.is_unique());
        Ok(())
    }

    #[test]
    fn views_freeze_the_block() -> MemoryResult<()> {
        let mut handle = BlockHandle::new(Block::new(8, &b"abcdef"[..])?);
        let view = handle.view_slice(2, -1);
        assert_eq!(view.as_slice(), b"cde");
        assert_eq!(view.address(), Some(10));
        assert_eq!(handle.try_mut().err(), Some(MemoryError::Shared));
        drop(view);
        assert!(handle.try_mut().is_ok());
        Ok(())
    }

    #[test]
    fn empty_view_holds_nothing() {
        let view = BlockView::empty();
        assert!(view.is_empty());
        assert_eq!(view.address(), None);
        assert_eq!(view.as_slice(), b"");
    }
}
