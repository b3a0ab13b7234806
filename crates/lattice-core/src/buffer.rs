use crate::StorageError;
use std::alloc::Layout;
use std::sync::Arc;

/// All buffers are aligned for the widest element type.
const BUFFER_ALIGN: usize = 16;

/// Owned raw byte storage. Freed exactly once, when dropped.
#[derive(Debug, PartialEq, Eq)]
pub struct RawBuffer {
    ptr: *mut u8,
    layout: Layout,
}

impl RawBuffer {
    fn uninitialized(n_bytes: usize) -> Result<Self, StorageError> {
        let layout = Layout::from_size_align(n_bytes, BUFFER_ALIGN)
            .map_err(|_| StorageError::Allocation(n_bytes))?;
        let ptr = if n_bytes == 0 {
            std::ptr::null_mut()
        } else {
            let ptr = unsafe { std::alloc::alloc(layout) };
            if ptr.is_null() {
                return Err(StorageError::Allocation(n_bytes));
            }
            ptr
        };
        Ok(Self { ptr, layout })
    }

    pub fn n_bytes(&self) -> usize {
        self.layout.size()
    }

    pub fn as_bytes(&self) -> &[u8] {
        if self.ptr.is_null() {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.layout.size()) }
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }
}

impl Drop for RawBuffer {
    fn drop(&mut self) {
        if !self.ptr.is_null() && self.layout.size() > 0 {
            unsafe { std::alloc::dealloc(self.ptr, self.layout) }
        }
    }
}

unsafe impl Send for RawBuffer {}
unsafe impl Sync for RawBuffer {}

/// Reference-counted handle to a [`RawBuffer`].
///
/// Cloning the handle is the ref-count increment that lets many Views alias
/// one allocation; the storage is freed when the last clone drops. Counts are
/// atomic, so aliases may be released from any worker thread.
#[derive(Debug, Clone)]
pub struct Buffer {
    inner: Arc<RawBuffer>,
}

impl Buffer {
    pub fn n_bytes(&self) -> usize {
        self.inner.n_bytes()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }

    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.inner.as_ptr()
    }

    /// True iff no other live handle shares this storage. Gates donation.
    pub fn unique_owner(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Identity of the underlying allocation, for aliasing checks.
    pub fn ptr_id(&self) -> usize {
        self.inner.as_ptr() as usize
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let buf = allocate(bytes.len())?;
        if !bytes.is_empty() {
            unsafe {
                std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf.as_ptr(), bytes.len());
            }
        }
        Ok(buf)
    }
}

/// Allocates `n_bytes` of uninitialized storage. Out-of-memory is propagated,
/// never retried. Zero-byte allocations are valid and hold no storage.
pub fn allocate(n_bytes: usize) -> Result<Buffer, StorageError> {
    let raw = RawBuffer::uninitialized(n_bytes)?;
    log::trace!("allocate {} bytes at {:p}", n_bytes, raw.as_ptr());
    Ok(Buffer {
        inner: Arc::new(raw),
    })
}
