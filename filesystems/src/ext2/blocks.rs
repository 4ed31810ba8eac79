// Block-pointer resolution: turns an inode's 15-slot pointer array into the
// ordered sequence of data block addresses it denotes, following single,
// double, and triple indirect pointer blocks.
//
// A zero pointer is the end-of-blocks sentinel everywhere, not a hole: a
// zero in a top-level slot ends the whole walk, and a zero inside a pointer
// block ends that array and hands control back to its parent. This matches
// a fully sequential file layout with no interior holes.

use byteorder::{ByteOrder, LittleEndian};
use log::trace;

use inospect_core::{BlockSource, InospectError};

use super::constants::*;
use super::structures::Ext2Inode;
use super::volume::Ext2Volume;

/// Where a pointer sits in the inode's slot array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Direct(usize),
    SingleIndirect,
    DoubleIndirect,
    TripleIndirect,
}

/// One occupied top-level pointer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerSlot {
    pub kind: SlotKind,
    pub addr: u32,
}

/// Classify the occupied pointer slots of an inode, in slot order, stopping
/// at the first zero pointer.
pub fn pointer_slots(inode: &Ext2Inode) -> Vec<PointerSlot> {
    let mut slots = Vec::new();
    for (i, &addr) in inode.i_block.iter().enumerate() {
        if addr == 0 {
            break;
        }
        let kind = match i {
            EXT2_IND_BLOCK => SlotKind::SingleIndirect,
            EXT2_DIND_BLOCK => SlotKind::DoubleIndirect,
            EXT2_TIND_BLOCK => SlotKind::TripleIndirect,
            n => SlotKind::Direct(n),
        };
        slots.push(PointerSlot { kind, addr });
    }
    slots
}

/// One pointer-block frame on the walk's stack. `depth` is the indirection
/// depth of the addresses inside `addrs`: 0 means they are data blocks.
struct Frame {
    addrs: Vec<u32>,
    next: usize,
    depth: u8,
}

/// Lazy iterator over the data block addresses of one inode.
///
/// Restartable by construction: every walk starts from the inode record and
/// performs fresh reads, so no state survives between walks. A read failure
/// ends the walk; addresses already yielded stand.
pub struct BlockWalk<'v, S> {
    volume: &'v Ext2Volume<S>,
    slots: [u32; EXT2_N_BLOCKS],
    next_slot: usize,
    stack: Vec<Frame>,
    finished: bool,
}

impl<'v, S: BlockSource> BlockWalk<'v, S> {
    pub(super) fn new(volume: &'v Ext2Volume<S>, inode: &Ext2Inode) -> Self {
        BlockWalk {
            volume,
            slots: inode.i_block,
            next_slot: 0,
            stack: Vec::new(),
            finished: false,
        }
    }

    /// Read an indirect block as its array of little-endian block addresses.
    fn read_pointer_block(&self, addr: u32) -> Result<Vec<u32>, InospectError> {
        let raw = self.volume.read_block(addr as u64)?;
        let mut addrs = vec![0u32; self.volume.superblock().addresses_per_block() as usize];
        LittleEndian::read_u32_into(&raw[..addrs.len() * 4], &mut addrs);
        Ok(addrs)
    }

    fn push_frame(&mut self, addr: u32, depth: u8) -> Result<(), InospectError> {
        debug_assert!(depth < 3, "indirection depth exceeds triple indirect");
        trace!("descending into pointer block {} (entry depth {})", addr, depth);
        let addrs = self.read_pointer_block(addr)?;
        self.stack.push(Frame {
            addrs,
            next: 0,
            depth,
        });
        Ok(())
    }
}

impl<S: BlockSource> Iterator for BlockWalk<'_, S> {
    type Item = Result<u64, InospectError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            // Drain the innermost pointer block first.
            if let Some(frame) = self.stack.last_mut() {
                if frame.next >= frame.addrs.len() {
                    self.stack.pop();
                    continue;
                }
                let addr = frame.addrs[frame.next];
                frame.next += 1;
                if addr == 0 {
                    // End of this array; the parent continues.
                    self.stack.pop();
                    continue;
                }
                if frame.depth == 0 {
                    return Some(Ok(addr as u64));
                }
                let child_depth = frame.depth - 1;
                if let Err(e) = self.push_frame(addr, child_depth) {
                    self.finished = true;
                    return Some(Err(e));
                }
                continue;
            }

            // Stack empty: advance to the next top-level slot.
            if self.next_slot >= EXT2_N_BLOCKS {
                self.finished = true;
                return None;
            }
            let slot = self.next_slot;
            self.next_slot += 1;
            let addr = self.slots[slot];
            if addr == 0 {
                // No more blocks, anywhere.
                self.finished = true;
                return None;
            }
            if slot < EXT2_NDIR_BLOCKS {
                return Some(Ok(addr as u64));
            }
            // Slot 12/13/14 holds a pointer block whose entries sit at
            // depth 0/1/2 respectively.
            let entry_depth = (slot - EXT2_IND_BLOCK) as u8;
            if let Err(e) = self.push_frame(addr, entry_depth) {
                self.finished = true;
                return Some(Err(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ImageBuilder;

    fn collect_blocks(img: ImageBuilder, ino: u32) -> Vec<u64> {
        let volume = Ext2Volume::open(img.build()).unwrap();
        let inode = volume.inode_record(ino).unwrap();
        volume
            .walk_blocks(&inode)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn zero_direct_pointer_halts_enumeration() {
        let mut img = ImageBuilder::new(64);
        img.set_inode(
            12,
            0o100644,
            4096,
            &[10, 20, 0, 30, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        );
        assert_eq!(collect_blocks(img, 12), vec![10, 20]);
    }

    #[test]
    fn single_indirect_blocks_follow_direct_blocks() {
        let mut img = ImageBuilder::new(64);
        let ind = img.alloc_block();
        img.write_pointer_block(ind, &[40, 41, 0]);
        let mut slots = [0u32; 15];
        for (i, slot) in slots.iter_mut().take(12).enumerate() {
            *slot = 20 + i as u32;
        }
        slots[12] = ind;
        img.set_inode(12, 0o100644, 14 * 1024, &slots);

        let mut expected: Vec<u64> = (20..32).collect();
        expected.extend([40, 41]);
        assert_eq!(collect_blocks(img, 12), expected);
    }

    #[test]
    fn double_indirect_zero_entry_is_not_visited() {
        // Double indirect block holds [5, 0]; block 5 holds [100, 200].
        let mut img = ImageBuilder::new(64);
        let dind = img.alloc_block();
        let ind = 5;
        img.write_pointer_block(dind, &[ind, 0]);
        img.write_pointer_block(ind, &[100, 200, 0]);

        let mut slots = [0u32; 15];
        for (i, slot) in slots.iter_mut().take(12).enumerate() {
            *slot = 60 + i as u32;
        }
        slots[12] = img.alloc_block();
        img.write_pointer_block(slots[12], &[80, 0]);
        slots[13] = dind;
        img.set_inode(12, 0o100644, 0, &slots);

        let mut expected: Vec<u64> = (60..72).collect();
        expected.push(80);
        expected.extend([100, 200]);
        assert_eq!(collect_blocks(img, 12), expected);
    }

    #[test]
    fn zero_inside_indirect_array_returns_to_parent() {
        // First single-indirect array under the double-indirect block ends
        // early; the double-indirect block still advances to its next entry.
        let mut img = ImageBuilder::new(64);
        let dind = img.alloc_block();
        let ind_a = img.alloc_block();
        let ind_b = img.alloc_block();
        img.write_pointer_block(dind, &[ind_a, ind_b, 0]);
        img.write_pointer_block(ind_a, &[100, 0]);
        img.write_pointer_block(ind_b, &[200, 201, 0]);

        let mut slots = [0u32; 15];
        for (i, slot) in slots.iter_mut().take(12).enumerate() {
            *slot = 9 + i as u32;
        }
        slots[12] = img.alloc_block();
        img.write_pointer_block(slots[12], &[50, 0]);
        slots[13] = dind;
        img.set_inode(12, 0o100644, 0, &slots);

        let mut expected: Vec<u64> = (9..21).collect();
        expected.push(50);
        expected.extend([100, 200, 201]);
        assert_eq!(collect_blocks(img, 12), expected);
    }

    #[test]
    fn triple_indirect_walks_three_levels() {
        let mut img = ImageBuilder::new(64);
        let tind = img.alloc_block();
        let dind = img.alloc_block();
        let ind = img.alloc_block();
        img.write_pointer_block(tind, &[dind, 0]);
        img.write_pointer_block(dind, &[ind, 0]);
        img.write_pointer_block(ind, &[300, 301, 0]);

        let mut slots = [0u32; 15];
        for (i, slot) in slots.iter_mut().take(12).enumerate() {
            *slot = 30 + i as u32;
        }
        slots[12] = img.alloc_block();
        img.write_pointer_block(slots[12], &[70, 0]);
        slots[13] = img.alloc_block();
        img.write_pointer_block(slots[13], &[0]);
        slots[14] = tind;
        img.set_inode(12, 0o100644, 0, &slots);

        let mut expected: Vec<u64> = (30..42).collect();
        expected.push(70);
        expected.extend([300, 301]);
        assert_eq!(collect_blocks(img, 12), expected);
    }

    #[test]
    fn walk_is_restartable() {
        let mut img = ImageBuilder::new(64);
        img.set_inode(
            12,
            0o100644,
            2048,
            &[10, 20, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        );
        let volume = Ext2Volume::open(img.build()).unwrap();
        let inode = volume.inode_record(12).unwrap();

        let first: Vec<u64> = volume
            .walk_blocks(&inode)
            .collect::<Result<_, _>>()
            .unwrap();
        let second: Vec<u64> = volume
            .walk_blocks(&inode)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn slot_classification_stops_at_first_zero() {
        let mut img = ImageBuilder::new(64);
        let mut slots = [0u32; 15];
        for (i, slot) in slots.iter_mut().take(12).enumerate() {
            *slot = 10 + i as u32;
        }
        slots[12] = 90;
        slots[13] = 91;
        img.set_inode(12, 0o100644, 0, &slots);
        let volume = Ext2Volume::open(img.build()).unwrap();
        let inode = volume.inode_record(12).unwrap();

        let classified = pointer_slots(&inode);
        assert_eq!(classified.len(), 14);
        assert_eq!(classified[0].kind, SlotKind::Direct(0));
        assert_eq!(classified[12].kind, SlotKind::SingleIndirect);
        assert_eq!(classified[12].addr, 90);
        assert_eq!(classified[13].kind, SlotKind::DoubleIndirect);

        let truncated = Ext2Inode {
            i_block: [10, 0, 11, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
            ..inode
        };
        let classified = pointer_slots(&truncated);
        assert_eq!(classified.len(), 1);
    }
}
