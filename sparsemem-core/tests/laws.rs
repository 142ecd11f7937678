// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// This Source Code Form is "Incompatible With Secondary Licenses", as
// defined by the Mozilla Public License, v. 2.0.
//
// Copyright © 2022 mumblingdrunkard

#[cfg(test)]
mod tests {
    use sparsemem_core::{Memory, MemoryResult};

    fn sample() -> Memory {
        Memory::from_blocks([(1u64, &b"ABCD"[..]), (6, &b"$"[..]), (8, &b"xyz"[..])]).unwrap()
    }

    #[test]
    fn crop_is_idempotent() -> MemoryResult<()> {
        let mut once = sample();
        once.crop(Some(2), Some(9))?;
        let mut twice = once.clone();
        twice.crop(Some(2), Some(9))?;
        assert!(once == twice);
        once.validate()
    }

    #[test]
    fn clear_is_idempotent() -> MemoryResult<()> {
        let mut once = sample();
        once.clear(Some(2), Some(9))?;
        let mut twice = once.clone();
        twice.clear(Some(2), Some(9))?;
        assert!(once == twice);
        once.validate()
    }

    #[test]
    fn extract_write_round_trip() -> MemoryResult<()> {
        let original = sample();
        let taken = original.extract(Some(2), Some(9))?;
        let mut rebuilt = original.clone();
        rebuilt.clear(Some(2), Some(9))?;
        rebuilt.write_memory(0, &taken, false)?;
        assert!(rebuilt == original);
        rebuilt.validate()
    }

    #[test]
    fn reverse_twice_is_identity() -> MemoryResult<()> {
        let original = sample();
        let mut memory = original.clone();
        memory.reverse()?;
        memory.reverse()?;
        assert!(memory == original);
        Ok(())
    }

    #[test]
    fn shifts_compose() -> MemoryResult<()> {
        let mut split = sample();
        split.shift(7)?;
        split.shift(5)?;
        let mut joined = sample();
        joined.shift(12)?;
        assert!(split == joined);
        split.shift(-12)?;
        assert!(split == sample());
        Ok(())
    }

    #[test]
    fn flood_preserves_populated_addresses() -> MemoryResult<()> {
        let original = sample();
        let mut flooded = original.clone();
        flooded.flood(None, None, b"123")?;
        let (start, endex) = original.span();
        for address in start..endex {
            if let Some(value) = original.peek(address) {
                assert_eq!(flooded.peek(address), Some(value));
            } else {
                assert!(flooded.peek(address).is_some());
            }
        }
        assert!(flooded.contiguous());
        flooded.validate()
    }

    #[test]
    fn fill_overwrites_with_the_rotated_pattern() -> MemoryResult<()> {
        let mut memory = sample();
        let pattern = b"123";
        let anchor = memory.start();
        memory.fill(Some(3), Some(10), pattern)?;
        for address in 3..10u64 {
            let expected = pattern[((address - anchor) % pattern.len() as u64) as usize];
            assert_eq!(memory.peek(address), Some(expected));
        }
        memory.validate()
    }

    #[test]
    fn edits_never_leave_touching_blocks() -> MemoryResult<()> {
        let mut memory = sample();
        memory.write(4, &b"##"[..])?;
        memory.validate()?;
        memory.delete(Some(2), Some(5))?;
        memory.validate()?;
        memory.insert(3, &b"&&"[..])?;
        memory.validate()?;
        memory.poke(memory.content_endex(), Some(b'+'))?;
        memory.validate()?;
        memory.flood(None, None, b"-")?;
        memory.validate()?;
        // fully flooded content is one block
        assert_eq!(memory.content_parts(), 1);
        Ok(())
    }

    #[test]
    fn find_agrees_with_a_linear_scan() -> MemoryResult<()> {
        let memory = Memory::from_blocks([(2u64, &b"abcab"[..]), (9, &b"cabc"[..])])?;
        let needle = b"ab";
        let (start, endex) = memory.span();
        // reference: smallest a with every needle byte populated and equal
        let mut expected = None;
        'outer: for address in start..endex.saturating_sub(needle.len() as u64 - 1) {
            for (offset, byte) in needle.iter().enumerate() {
                if memory.peek(address + offset as u64) != Some(*byte) {
                    continue 'outer;
                }
            }
            expected = Some(address);
            break;
        }
        assert_eq!(memory.find(needle, None, None), expected);
        assert_eq!(expected, Some(2));
        // a needle spanning the gap is never found even though a linear
        // byte scan of the concatenated content would see it
        assert_eq!(memory.find(b"bc", Some(5), None), Some(11));
        Ok(())
    }

    #[test]
    fn backups_invert_a_whole_session() -> MemoryResult<()> {
        let mut memory = sample();
        let step0 = memory.clone();

        let write_backup = memory.write_backup(3, 4)?;
        memory.write(3, &b"####"[..])?;
        let step1 = memory.clone();

        let delete_backup = memory.delete_backup(Some(2), Some(7))?;
        memory.delete(Some(2), Some(7))?;
        let step2 = memory.clone();

        let fill_backup = memory.fill_backup(None, None)?;
        memory.fill(None, None, b"zz")?;

        memory.fill_restore(&fill_backup)?;
        assert!(memory == step2);
        memory.delete_restore(&delete_backup)?;
        assert!(memory == step1);
        memory.write_restore(&write_backup)?;
        assert!(memory == step0);
        memory.validate()
    }

    #[test]
    fn trim_bounds_equal_to_content_change_nothing() -> MemoryResult<()> {
        let original = sample();
        let (start, endex) = original.content_span();
        let bounded = original.clone().with_bounds(Some(start), Some(endex))?;
        assert!(bounded == original);
        Ok(())
    }

    #[test]
    fn values_round_trip_through_from_values() -> MemoryResult<()> {
        let original = sample();
        let start = original.start();
        let collected: Vec<Option<u8>> = original.values(None, None, None)?.collect();
        let rebuilt = Memory::from_values(start, collected)?;
        assert!(rebuilt == original);
        Ok(())
    }
}
