mod blocks;
mod memory;

use log::{debug, trace, warn};
use thiserror::Error;

pub use blocks::Handle;

use blocks::BlockMap;
use memory::PoolMemory;

/// Leftover space below this size is donated to the allocation it
/// trails instead of being kept as a free block of its own, so that
/// unusable slivers do not accumulate in the chain.
const MIN_FRAGMENT: usize = 8;

/// Ways an allocation request can fail. Every variant is a
/// recoverable failure value; the pool never panics on a bad
/// request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The request exceeds the free byte count, rejected before any
    /// scan takes place.
    #[error("Requested {requested} bytes, but only {available} are free.")]
    OutOfMemory { requested: usize, available: usize },
    /// Enough bytes are free in total, but no contiguous run of them
    /// is large enough.
    #[error("No contiguous run of {0} free bytes is available.")]
    Fragmented(usize),
    /// Zero-sized blocks are not representable and are rejected.
    #[error("Zero-sized allocations are not supported.")]
    ZeroSize,
    /// The handle does not resolve to an allocated block.
    #[error("Handle does not refer to an allocated block.")]
    InvalidHandle,
}

/// A fixed-size arena allocator: one contiguous byte range reserved
/// at construction, carved into blocks on demand and reclaimed on
/// release, with no dependency on the process heap afterwards.
///
/// Free neighbors are never merged when a block is released; they
/// are coalesced lazily, while an allocation scan walks past them.
/// Dropping the pool releases the reservation and invalidates every
/// outstanding handle.
pub struct Pool {
    /// The managed byte range.
    memory: PoolMemory,
    /// Out-of-band metadata for every block in the range.
    blocks: BlockMap,
    /// Bytes currently free, kept in step with the block table so
    /// that oversized requests can be rejected without a scan.
    free_bytes: usize,
}

impl Pool {
    /// Reserves `total_size` bytes and establishes a single free
    /// block spanning all of them. A refused reservation is fatal;
    /// there is no partially usable pool.
    pub fn new(total_size: usize) -> Self {
        let memory = PoolMemory::reserve(total_size);
        let blocks = BlockMap::new(total_size);
        debug!("Created pool of {total_size} bytes.");

        Self {
            memory,
            blocks,
            free_bytes: total_size,
        }
    }

    /// Total size of the managed range.
    pub fn capacity(&self) -> usize {
        self.memory.len()
    }

    /// Bytes not currently allocated. Fragmentation can make a
    /// request fail even when it is within this count.
    pub fn free_bytes(&self) -> usize {
        self.free_bytes
    }

    /// Allocates a block of `size` bytes at the first position where
    /// it fits, scanning by address from the start of the pool.
    pub fn allocate(&mut self, size: usize) -> Result<Handle, AllocError> {
        self.check_request(size)?;
        let offset = self.first_fit(size)?;
        Ok(self.commit(offset, size))
    }

    /// Allocates a block of `size` bytes in the smallest free run
    /// that fits it, scanning the whole pool before committing. Use
    /// when limiting fragmentation matters more than scan latency.
    pub fn allocate_best_fit(&mut self, size: usize) -> Result<Handle, AllocError> {
        self.check_request(size)?;
        let offset = self.best_fit(size)?;
        Ok(self.commit(offset, size))
    }

    /// Returns the block identified by `handle` to the pool.
    ///
    /// Releasing is idempotent: a handle that resolves to a block
    /// that is already free, or to no block boundary at all, is
    /// ignored. The check is exact for block boundaries, but a stale
    /// handle whose offset has since been reused by a newer
    /// allocation cannot be told apart from the live one; such a
    /// release frees the newer block.
    pub fn release(&mut self, handle: Handle) {
        let Some(block) = self.blocks.get(handle.0) else {
            warn!("Ignoring release of unrecognized handle at offset {}.", handle.0);
            return;
        };
        if block.free {
            return;
        }

        let size = block.size;
        self.blocks.block_mut(handle.0).free = true;
        self.free_bytes += size;
        trace!("Released {size} bytes at offset {}.", handle.0);
    }

    /// Grows or shrinks a block, in place when its neighborhood
    /// allows it and by relocation otherwise.
    ///
    /// `resize(None, size)` behaves exactly like `allocate(size)`,
    /// and resizing to zero releases the block and fails. When no
    /// placement for the new size exists, the original block is left
    /// allocated at its original size with its data untouched.
    pub fn resize(&mut self, handle: Option<Handle>, new_size: usize) -> Result<Handle, AllocError> {
        let Some(handle) = handle else {
            return self.allocate(new_size);
        };

        let old = match self.blocks.get(handle.0) {
            Some(block) if !block.free => *block,
            _ => return Err(AllocError::InvalidHandle),
        };

        if new_size == 0 {
            self.release(handle);
            return Err(AllocError::ZeroSize);
        }

        // Provisionally free the block, so that the allocation scan
        // below may coalesce it with its free neighbors and satisfy
        // the request at the same address.
        self.release(handle);

        let new_handle = match self.allocate(new_size) {
            Ok(new_handle) => new_handle,
            Err(error) => {
                self.reclaim(old.offset, old.size);
                return Err(error);
            }
        };

        if new_handle.0 != old.offset {
            // The ranges can overlap when the block shifted into an
            // adjacent hole, so the copy has to be overlap-safe.
            let copied = old.size.min(new_size);
            self.memory.move_range(old.offset, new_handle.0, copied);
            trace!("Moved {copied} bytes from offset {} to {}.", old.offset, new_handle.0);
        }

        Ok(new_handle)
    }

    /// The bytes of an allocated block. `None` when the handle does
    /// not resolve to an allocated block.
    pub fn data(&self, handle: Handle) -> Option<&[u8]> {
        let block = *self.blocks.get(handle.0)?;
        (!block.free).then(|| self.memory.slice(block.offset, block.size))
    }

    /// Mutable access to the bytes of an allocated block.
    pub fn data_mut(&mut self, handle: Handle) -> Option<&mut [u8]> {
        let block = *self.blocks.get(handle.0)?;
        (!block.free).then(|| self.memory.slice_mut(block.offset, block.size))
    }

    /// Size of an allocated block. This can exceed the requested
    /// size when a sliver was donated to the allocation.
    pub fn size_of(&self, handle: Handle) -> Option<usize> {
        let block = self.blocks.get(handle.0)?;
        (!block.free).then_some(block.size)
    }

    fn check_request(&self, size: usize) -> Result<(), AllocError> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }
        if size > self.free_bytes {
            return Err(AllocError::OutOfMemory {
                requested: size,
                available: self.free_bytes,
            });
        }

        Ok(())
    }

    /// Walks the chain by address and returns the offset of the
    /// first free run that can hold `size` bytes. Adjacent free
    /// blocks are merged as the scan crosses them, which is the only
    /// coalescing the pool ever performs; merges done by a scan that
    /// ends up failing are kept.
    fn first_fit(&mut self, size: usize) -> Result<usize, AllocError> {
        let mut cursor = self.blocks.first_offset();
        while let Some(offset) = cursor {
            let block = self.blocks.block(offset);
            if !block.free {
                cursor = block.next;
                continue;
            }

            // Extend the run one neighbor at a time, stopping as
            // soon as it is large enough.
            let mut run = block.size;
            while run < size {
                let Some(next) = self.blocks.block(offset).next else {
                    break;
                };
                if !self.blocks.block(next).free {
                    break;
                }
                run = self.blocks.merge(offset, next);
            }

            if run >= size {
                return Ok(offset);
            }
            cursor = self.blocks.block(offset).next;
        }

        Err(AllocError::Fragmented(size))
    }

    /// Scans the whole chain once, coalescing every free run it
    /// crosses, and returns the offset of the smallest run that can
    /// hold `size` bytes. The earliest run wins a tie.
    fn best_fit(&mut self, size: usize) -> Result<usize, AllocError> {
        let mut best: Option<(usize, usize)> = None;
        let mut cursor = self.blocks.first_offset();
        while let Some(offset) = cursor {
            let block = self.blocks.block(offset);
            if !block.free {
                cursor = block.next;
                continue;
            }

            let mut run = block.size;
            loop {
                let Some(next) = self.blocks.block(offset).next else {
                    break;
                };
                if !self.blocks.block(next).free {
                    break;
                }
                run = self.blocks.merge(offset, next);
            }

            if run >= size && best.map_or(true, |(_, smallest)| run < smallest) {
                best = Some((offset, run));
            }
            cursor = self.blocks.block(offset).next;
        }

        best.map(|(offset, _)| offset)
            .ok_or(AllocError::Fragmented(size))
    }

    /// Marks `size` bytes at the head of the free run at `offset` as
    /// allocated. The remainder of the run is split off as a new
    /// free block, unless it is too small to be worth tracking, in
    /// which case the whole run goes to the allocation.
    fn commit(&mut self, offset: usize, size: usize) -> Handle {
        let run = self.blocks.block(offset).size;
        if run - size >= MIN_FRAGMENT {
            self.blocks.split_front(offset, size);
        }

        let block = self.blocks.block_mut(offset);
        block.free = false;
        let taken = block.size;
        self.free_bytes -= taken;
        trace!("Allocated {taken} bytes at offset {offset}.");

        Handle(offset)
    }

    /// Re-marks `size` bytes at `offset` as allocated, undoing a
    /// provisional release after the follow-up allocation failed.
    /// The range is carved back out of whatever free run contains it
    /// now, in case the failed scan merged the block away.
    fn reclaim(&mut self, offset: usize, size: usize) {
        let start = self.blocks.find_containing(offset);
        if start < offset {
            self.blocks.split_front(start, offset - start);
        }
        if self.blocks.block(offset).size > size {
            self.blocks.split_front(offset, size);
        }

        self.blocks.block_mut(offset).free = false;
        self.free_bytes -= size;
    }
}

#[cfg(test)]
impl Pool {
    /// The block table tiles the pool and agrees with the free byte
    /// counter.
    fn tracker_consistent(&self) -> bool {
        self.blocks.is_consistent(self.memory.len()) && self.blocks.free_total() == self.free_bytes
    }
}
