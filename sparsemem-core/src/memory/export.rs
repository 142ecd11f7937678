// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// This Source Code Form is "Incompatible With Secondary Licenses", as
// defined by the Mozilla Public License, v. 2.0.
//
// Copyright © 2022 mumblingdrunkard

//! Extraction and export: carving sub-memories out, materializing blocks or
//! contiguous bytes, and zero-copy views.

use crate::block::BlockView;
use crate::error::{MemoryError, MemoryResult};
use crate::rover::Rover;

use super::Memory;

impl Memory {
    /// New memory holding a copy of `[start, endex)`, trim bounds set to the
    /// range.
    pub fn extract(&self, start: Option<u64>, endex: Option<u64>) -> MemoryResult<Memory> {
        self.extract_step(start, endex, None, 1, true)
    }

    /// General extraction. With `step <= 1` the range's blocks are copied
    /// (clipped), and the result is flooded with `pattern` when one is
    /// given. With `step > 1` every step-th value of the patterned stream is
    /// taken, compacted to consecutive addresses from the range start, a
    /// `None` sample leaving a one-address gap. With `bound`, the result's
    /// trim span is set to the covered range.
    pub fn extract_step(
        &self,
        start: Option<u64>,
        endex: Option<u64>,
        pattern: Option<&[u8]>,
        step: u64,
        bound: bool,
    ) -> MemoryResult<Memory> {
        if matches!(pattern, Some(bytes) if bytes.is_empty()) {
            return Err(MemoryError::EmptyPattern);
        }
        let (start, endex) = self.bound(start, endex);
        if step <= 1 {
            // anchor a possible flood at the range start via the trim bounds
            let mut taken = self.extract_concrete(start, endex)?;
            if let Some(pattern) = pattern {
                taken.flood(Some(start), Some(endex), pattern)?;
            }
            if !bound {
                taken.trim_start = None;
                taken.trim_endex = None;
            }
            return Ok(taken);
        }
        let mut taken = Memory::new();

        // stepped: sample the patterned value stream
        let mut rover = Rover::new(self, true, start, endex, pattern, false)?;
        let mut cursor = start;
        let mut run_start = start;
        let mut run: Vec<u8> = Vec::new();
        loop {
            match rover.next() {
                Some(Some(value)) => {
                    if run.is_empty() {
                        run_start = cursor;
                    }
                    run.push(value);
                }
                Some(None) => {
                    if !run.is_empty() {
                        taken.write(run_start, &run)?;
                        run.clear();
                    }
                }
                None => break,
            }
            cursor = cursor.saturating_add(1);
            // skip to the next sample
            for _ in 1..step {
                if rover.next().is_none() {
                    break;
                }
            }
        }
        if !run.is_empty() {
            taken.write(run_start, &run)?;
        }
        if bound {
            taken.set_bounds(Some(start), Some(cursor))?;
        }
        Ok(taken)
    }

    /// Copy of the concrete range `[start, endex)` with trim bounds set to
    /// it, taking the range as given (the backup paths record spans that
    /// may lie outside the current logical span).
    pub(super) fn extract_concrete(&self, start: u64, endex: u64) -> MemoryResult<Memory> {
        let mut taken = Memory::new();
        let rack = self.rack();
        let first = rack.index_start(start);
        let last = rack.index_endex(endex);
        for index in first..last {
            let block = rack.slot(index);
            let clip_start = start.max(block.address());
            let clip_endex = endex.min(block.endex());
            if clip_start < clip_endex {
                let lo = (clip_start - block.address()) as usize;
                let hi = (clip_endex - block.address()) as usize;
                taken.write(clip_start, &block.as_slice()[lo..hi])?;
            }
        }
        taken.set_bounds(Some(start), Some(endex.max(start)))?;
        Ok(taken)
    }

    /// Extract `[start, endex)` and remove it from this memory (without
    /// shifting what remains).
    pub fn cut(
        &mut self,
        start: Option<u64>,
        endex: Option<u64>,
        bound: bool,
    ) -> MemoryResult<Memory> {
        let (start, endex) = self.bound(start, endex);
        let taken = self.extract_step(Some(start), Some(endex), None, 1, bound)?;
        self.clear(Some(start), Some(endex))?;
        Ok(taken)
    }

    /// Materialized `(address, bytes)` pairs over `[start, endex)`, clipped.
    pub fn to_blocks(&self, start: Option<u64>, endex: Option<u64>) -> Vec<(u64, Vec<u8>)> {
        let (start, endex) = self.bound(start, endex);
        let rack = self.rack();
        let first = rack.index_start(start);
        let last = rack.index_endex(endex);
        let mut blocks = Vec::new();
        for index in first..last {
            let block = rack.slot(index);
            let clip_start = start.max(block.address());
            let clip_endex = endex.min(block.endex());
            if clip_start < clip_endex {
                let lo = (clip_start - block.address()) as usize;
                let hi = (clip_endex - block.address()) as usize;
                blocks.push((clip_start, block.as_slice()[lo..hi].to_vec()));
            }
        }
        blocks
    }

    /// Contiguous copy of `[start, endex)`; a gap anywhere in the range is
    /// an error.
    pub fn to_bytes(&self, start: Option<u64>, endex: Option<u64>) -> MemoryResult<Vec<u8>> {
        let view = self.view(start, endex)?;
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(view.len())
            .map_err(|_| MemoryError::AllocationFailure)?;
        bytes.extend_from_slice(&view);
        Ok(bytes)
    }

    /// Zero-copy read-only view of a fully-contiguous `[start, endex)`.
    /// While the view lives, the underlying block counts as shared.
    pub fn view(&self, start: Option<u64>, endex: Option<u64>) -> MemoryResult<BlockView> {
        let (start, endex) = self.bound(start, endex);
        if start >= endex {
            return Ok(BlockView::empty());
        }
        let rack = self.rack();
        let index = rack.index_at(start).ok_or(MemoryError::NotContiguous)?;
        let block = rack.slot(index);
        if block.endex() < endex {
            return Err(MemoryError::NotContiguous);
        }
        let lo = (start - block.address()) as usize;
        let hi = (endex - block.address()) as usize;
        Ok(BlockView::over(block.clone(), lo, hi))
    }
}
