//! Memory bridge for host <-> module data transfer.
//!
//! A module's linear memory can grow during any call into it, which
//! invalidates every host-side window onto the old buffer. [`LinearMemory`]
//! tracks a generation counter that advances whenever the observed size
//! changes; each [`MemoryView`] records the generation it was validated
//! against and is re-checked before every read or write.

use thiserror::Error;
use wasmtime::{Memory, Store};

/// Failure to access linear memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryAccessError {
    /// The window does not fit inside the current memory.
    #[error("Invalid memory access: offset={offset}, len={len}, memory size={size}")]
    OutOfBounds {
        /// Start of the window.
        offset: u32,
        /// Length of the window.
        len: usize,
        /// Memory size at the time of the check.
        size: usize,
    },
    /// Growing memory failed.
    #[error("Failed to grow memory by {pages} pages: {cause}")]
    Grow {
        /// Requested page delta.
        pages: u64,
        /// Engine diagnostic.
        cause: String,
    },
}

/// A fixed-offset, fixed-length window into linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryView {
    /// Offset within linear memory.
    pub offset: u32,
    /// Length of the window in bytes.
    pub len: usize,
    /// Memory generation the window was last validated against.
    pub generation: u64,
}

impl MemoryView {
    /// Get the end offset (offset + len).
    pub fn end(&self) -> usize {
        self.offset as usize + self.len
    }
}

/// A module's linear memory with resize tracking.
#[derive(Debug)]
pub struct LinearMemory {
    memory: Memory,
    observed_size: usize,
    generation: u64,
}

impl LinearMemory {
    /// Wrap a memory export, recording its current size as generation 0.
    pub fn new<T>(store: &Store<T>, memory: Memory) -> Self {
        Self {
            observed_size: memory.data_size(store),
            memory,
            generation: 0,
        }
    }

    /// Get the underlying memory handle.
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Size in bytes as of the last refresh.
    pub fn size(&self) -> usize {
        self.observed_size
    }

    /// Re-read the memory size, advancing the generation if it changed.
    pub fn refresh<T>(&mut self, store: &Store<T>) -> u64 {
        let size = self.memory.data_size(store);
        if size != self.observed_size {
            tracing::trace!(
                old_size = self.observed_size,
                new_size = size,
                generation = self.generation + 1,
                "Linear memory resized"
            );
            self.observed_size = size;
            self.generation += 1;
        }
        self.generation
    }

    /// Create a view validated against the current memory.
    pub fn view<T>(
        &mut self,
        store: &Store<T>,
        offset: u32,
        len: usize,
    ) -> Result<MemoryView, MemoryAccessError> {
        let generation = self.refresh(store);
        let view = MemoryView {
            offset,
            len,
            generation,
        };
        self.check_bounds(&view)?;
        Ok(view)
    }

    /// Re-validate `view` if memory changed since it was created.
    pub fn revalidate<T>(
        &mut self,
        store: &Store<T>,
        view: &mut MemoryView,
    ) -> Result<(), MemoryAccessError> {
        let generation = self.refresh(store);
        if view.generation != generation {
            self.check_bounds(view)?;
            view.generation = generation;
        }
        Ok(())
    }

    /// Read `N` bytes through `view`; `N` must fit inside the window.
    pub fn read<T, const N: usize>(
        &mut self,
        store: &Store<T>,
        view: &mut MemoryView,
    ) -> Result<[u8; N], MemoryAccessError> {
        self.revalidate(store, view)?;
        if N > view.len {
            return Err(MemoryAccessError::OutOfBounds {
                offset: view.offset,
                len: N,
                size: view.len,
            });
        }
        let start = view.offset as usize;
        let src = self
            .memory
            .data(store)
            .get(start..start + N)
            .ok_or_else(|| self.out_of_bounds(view))?;

        let mut out = [0u8; N];
        out.copy_from_slice(src);
        Ok(out)
    }

    /// Write `data` through `view`; `data` must fit inside the window.
    pub fn write<T>(
        &mut self,
        store: &mut Store<T>,
        view: &mut MemoryView,
        data: &[u8],
    ) -> Result<(), MemoryAccessError> {
        self.revalidate(store, view)?;
        if data.len() > view.len {
            return Err(MemoryAccessError::OutOfBounds {
                offset: view.offset,
                len: data.len(),
                size: view.len,
            });
        }
        let size = self.observed_size;
        let start = view.offset as usize;
        let dest = self
            .memory
            .data_mut(store)
            .get_mut(start..start + data.len())
            .ok_or(MemoryAccessError::OutOfBounds {
                offset: view.offset,
                len: data.len(),
                size,
            })?;
        dest.copy_from_slice(data);
        Ok(())
    }

    /// Grow memory from the host side, returning the previous size in pages.
    pub fn grow<T>(&mut self, store: &mut Store<T>, pages: u64) -> Result<u64, MemoryAccessError> {
        let previous = self
            .memory
            .grow(&mut *store, pages)
            .map_err(|e| MemoryAccessError::Grow {
                pages,
                cause: e.to_string(),
            })?;
        self.refresh(store);
        Ok(previous)
    }

    fn check_bounds(&self, view: &MemoryView) -> Result<(), MemoryAccessError> {
        if view.end() > self.observed_size {
            return Err(self.out_of_bounds(view));
        }
        Ok(())
    }

    fn out_of_bounds(&self, view: &MemoryView) -> MemoryAccessError {
        MemoryAccessError::OutOfBounds {
            offset: view.offset,
            len: view.len,
            size: self.observed_size,
        }
    }
}
