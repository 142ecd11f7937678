// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// This Source Code Form is "Incompatible With Secondary Licenses", as
// defined by the Mozilla Public License, v. 2.0.
//
// Copyright © 2022 mumblingdrunkard

//! Backups for destructive operations. Each `*_backup` captures the minimal
//! state (usually an extracted sub-memory, trim bounds marking the affected
//! span) and the matching `*_restore` puts it back, enabling transactional
//! undo at the caller's discretion.

use crate::error::{MemoryError, MemoryResult};

use super::Memory;

impl Memory {
    /// Restore the span recorded in `backup`: clear it, then write the
    /// backup's blocks back. Inverse of the write/clear/fill/flood family.
    fn restore_span(&mut self, backup: &Memory) -> MemoryResult<()> {
        let (start, endex) = backup.span();
        self.clear(Some(start), Some(endex))?;
        self.write_memory(0, backup, false)
    }

    pub fn poke_backup(&self, address: u64) -> (u64, Option<u8>) {
        (address, self.peek(address))
    }

    pub fn poke_restore(&mut self, backup: (u64, Option<u8>)) -> MemoryResult<()> {
        let (address, value) = backup;
        self.poke(address, value)
    }

    /// The write path clips only against the trim bounds, so its backup
    /// records the same range even when the write extends the content.
    pub fn write_backup(&self, address: u64, size: u64) -> MemoryResult<Memory> {
        let endex = address.saturating_add(size);
        let (start, endex) = self.clip_to_trim(address, endex);
        self.extract_concrete(start, endex)
    }

    pub fn write_restore(&mut self, backup: &Memory) -> MemoryResult<()> {
        self.restore_span(backup)
    }

    pub fn clear_backup(&self, start: Option<u64>, endex: Option<u64>) -> MemoryResult<Memory> {
        let (start, endex) = self.bound(start, endex);
        self.extract(Some(start), Some(endex))
    }

    pub fn clear_restore(&mut self, backup: &Memory) -> MemoryResult<()> {
        self.restore_span(backup)
    }

    pub fn delete_backup(&self, start: Option<u64>, endex: Option<u64>) -> MemoryResult<Memory> {
        let (start, endex) = self.bound(start, endex);
        self.extract(Some(start), Some(endex))
    }

    /// Re-open the deleted span (shifting the suffix back right) and write
    /// the saved content into it.
    pub fn delete_restore(&mut self, backup: &Memory) -> MemoryResult<()> {
        let (start, endex) = backup.span();
        self.reserve(start, endex - start)?;
        self.write_memory(0, backup, false)
    }

    pub fn reserve_backup(&self, address: u64, size: u64) -> (u64, u64) {
        (address, size)
    }

    /// Delete the reserved gap, shifting the suffix back left.
    pub fn reserve_restore(&mut self, backup: (u64, u64)) -> MemoryResult<()> {
        let (address, size) = backup;
        let endex = address.saturating_add(size);
        self.delete(Some(address), Some(endex))
    }

    pub fn fill_backup(&self, start: Option<u64>, endex: Option<u64>) -> MemoryResult<Memory> {
        let (start, endex) = self.bound(start, endex);
        self.extract(Some(start), Some(endex))
    }

    pub fn fill_restore(&mut self, backup: &Memory) -> MemoryResult<()> {
        self.restore_span(backup)
    }

    /// Flood only adds bytes to gaps, so the gap list is backup enough.
    pub fn flood_backup(&self, start: Option<u64>, endex: Option<u64>) -> Vec<(u64, u64)> {
        let (start, endex) = self.bound(start, endex);
        self.gaps_within(start, endex)
    }

    pub fn flood_restore(&mut self, backup: &[(u64, u64)]) -> MemoryResult<()> {
        for &(start, endex) in backup {
            self.clear(Some(start), Some(endex))?;
        }
        Ok(())
    }

    /// The parts that `crop` would discard: content below and above the
    /// kept range.
    pub fn crop_backup(
        &self,
        start: Option<u64>,
        endex: Option<u64>,
    ) -> MemoryResult<(Option<Memory>, Option<Memory>)> {
        let (start, endex) = self.bound(start, endex);
        let content_start = self.content_start();
        let content_endex = self.content_endex();
        let below = if content_start < start {
            Some(self.extract(Some(content_start), Some(start))?)
        } else {
            None
        };
        let above = if endex < content_endex {
            Some(self.extract(Some(endex), Some(content_endex))?)
        } else {
            None
        };
        Ok((below, above))
    }

    pub fn crop_restore(&mut self, backup: &(Option<Memory>, Option<Memory>)) -> MemoryResult<()> {
        if let Some(below) = &backup.0 {
            self.write_memory(0, below, false)?;
        }
        if let Some(above) = &backup.1 {
            self.write_memory(0, above, false)?;
        }
        Ok(())
    }

    /// The delta plus whatever content the shift will clip off against a
    /// trim bound.
    pub fn shift_backup(&mut self, delta: i64) -> MemoryResult<(i64, Option<Memory>)> {
        let clipped = if delta < 0 {
            match self.trim_start() {
                Some(bound) => {
                    let cut = bound.saturating_add(delta.unsigned_abs());
                    let content_start = self.content_start();
                    if content_start < cut {
                        Some(self.extract(Some(content_start), Some(cut))?)
                    } else {
                        None
                    }
                }
                None => None,
            }
        } else {
            match self.trim_endex() {
                Some(bound) => {
                    let cut = bound.saturating_sub(delta as u64);
                    let content_endex = self.content_endex();
                    if cut < content_endex {
                        Some(self.extract(Some(cut), Some(content_endex))?)
                    } else {
                        None
                    }
                }
                None => None,
            }
        };
        Ok((delta, clipped))
    }

    /// Shift back and rewrite whatever the trim bound clipped.
    pub fn shift_restore(&mut self, backup: (i64, Option<Memory>)) -> MemoryResult<()> {
        let (delta, clipped) = backup;
        self.shift(-delta)?;
        if let Some(clipped) = &clipped {
            self.write_memory(0, clipped, false)?;
        }
        Ok(())
    }

    pub fn pop_backup(&self, address: Option<u64>) -> MemoryResult<(u64, Option<u8>)> {
        let address = match address {
            Some(address) => address,
            None => {
                if self.is_empty() {
                    return Err(MemoryError::EmptyContainer);
                }
                self.content_endex() - 1
            }
        };
        Ok((address, self.peek(address)))
    }

    /// Re-open the popped address and put the value back.
    pub fn pop_restore(&mut self, backup: (u64, Option<u8>)) -> MemoryResult<()> {
        let (address, value) = backup;
        self.reserve(address, 1)?;
        self.poke(address, value)
    }
}
