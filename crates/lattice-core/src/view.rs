use crate::{allocate, elem_to_loc, check_contiguity, Buffer, DType, Shape, StorageError, Strides, ViewDType};
use derive_new::new;

/// Conservative contiguity claims for a layout.
///
/// `contiguous` promises that logical row-major enumeration equals
/// `buffer[offset + i]` over the addressable region; `row_contiguous` /
/// `col_contiguous` additionally pin the iteration order. A cleared flag
/// never lies; a set flag must hold.
#[derive(new, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Flags {
    pub contiguous: bool,
    pub row_contiguous: bool,
    pub col_contiguous: bool,
}

impl Flags {
    pub fn none() -> Self {
        Self::new(false, false, false)
    }
}

/// A logical multidimensional value over a [`Buffer`].
///
/// Shape and dtype are fixed at construction; storage is attached afterwards
/// by allocation, by sharing another view's buffer, or by donation. Many
/// views may alias one buffer - that aliasing is the mechanism behind every
/// zero-copy transform in the crate.
#[derive(Debug, Clone)]
pub struct View {
    dt: DType,
    shape: Shape,
    strides: Strides,
    offset: usize,
    data_size: usize,
    flags: Flags,
    buffer: Option<Buffer>,
}

impl View {
    /// A view with fixed metadata and no storage yet.
    pub fn new(shape: Shape, dt: DType) -> Self {
        let strides = Strides::from(&shape);
        let (_, row, col) = check_contiguity(&shape, &strides);
        let numel = shape.numel();
        Self {
            dt,
            data_size: numel,
            strides,
            offset: 0,
            flags: Flags::new(true, row, col),
            shape,
            buffer: None,
        }
    }

    pub fn from_data<T: ViewDType>(data: &[T], shape: Shape) -> Result<Self, StorageError> {
        assert_eq!(data.len(), shape.numel());
        let mut view = Self::new(shape, T::dt());
        view.set_data(Buffer::from_bytes(bytemuck::cast_slice(data))?);
        Ok(view)
    }

    pub fn dt(&self) -> DType {
        self.dt
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &Strides {
        &self.strides
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Elements addressable from `offset` in the underlying region. Smaller
    /// than `numel` for broadcast views, larger for strided sub-views.
    pub fn data_size(&self) -> usize {
        self.data_size
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    pub fn itemsize(&self) -> usize {
        self.dt.size_of()
    }

    pub fn nbytes(&self) -> usize {
        self.numel() * self.itemsize()
    }

    pub fn buffer(&self) -> Option<&Buffer> {
        self.buffer.as_ref()
    }

    pub fn has_storage(&self) -> bool {
        self.buffer.is_some()
    }

    /// True iff this view's buffer exists and no other handle shares it.
    /// Donation - reusing a dying input's storage for a derived result -
    /// is only legal when this holds.
    pub fn is_donatable(&self) -> bool {
        self.buffer.as_ref().map_or(false, Buffer::unique_owner)
    }

    /// Attaches a fresh dense allocation. Row-major layout, zero offset.
    pub fn set_data(&mut self, buffer: Buffer) {
        debug_assert!(buffer.n_bytes() >= self.nbytes());
        self.strides = Strides::from(&self.shape);
        let (_, row, col) = check_contiguity(&self.shape, &self.strides);
        self.offset = 0;
        self.data_size = self.numel();
        self.flags = Flags::new(true, row, col);
        self.buffer = Some(buffer);
    }

    /// Attaches a fresh allocation under an explicit layout. Used when the
    /// destination of a vector copy inherits the source's (possibly
    /// broadcast) layout.
    pub fn set_data_with(
        &mut self,
        buffer: Buffer,
        data_size: usize,
        strides: Strides,
        flags: Flags,
    ) {
        self.offset = 0;
        self.data_size = data_size;
        self.strides = strides;
        self.flags = flags;
        self.buffer = Some(buffer);
    }

    /// Makes `self` alias `src`'s buffer under `src`'s exact layout.
    pub fn attach_shared(&mut self, src: &View) {
        debug_assert_eq!(self.itemsize(), src.itemsize());
        self.strides = src.strides.clone();
        self.flags = src.flags;
        self.data_size = src.data_size;
        self.offset = src.offset;
        self.buffer = src.buffer.clone();
    }

    /// Makes `self` alias `src`'s buffer under an overridden layout.
    ///
    /// `offset` is absolute, in elements of `self`'s dtype. The caller must
    /// guarantee the override stays within buffer bounds.
    pub fn attach_shared_layout(
        &mut self,
        src: &View,
        strides: Strides,
        flags: Flags,
        data_size: usize,
        offset: usize,
    ) {
        self.strides = strides;
        self.flags = flags;
        self.data_size = data_size;
        self.offset = offset;
        self.buffer = src.buffer.clone();
    }

    /// The whole buffer reinterpreted as elements of `T`, starting at byte 0.
    /// Strided addressing (including negative strides) indexes into this
    /// with `offset + elem_to_loc(..)`.
    pub fn data<T: ViewDType>(&self) -> &[T] {
        let Some(buffer) = &self.buffer else {
            return &[];
        };
        let n = buffer.n_bytes() / std::mem::size_of::<T>();
        if n == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(buffer.as_ptr() as *const T, n) }
    }

    /// Mutable whole-buffer access.
    ///
    /// # Safety
    /// The external scheduler's single-writer/exclusive-output contract must
    /// hold: no other unit may read or write this buffer concurrently.
    pub(crate) unsafe fn data_mut<T: ViewDType>(&self) -> &mut [T] {
        let Some(buffer) = &self.buffer else {
            return &mut [];
        };
        let n = buffer.n_bytes() / std::mem::size_of::<T>();
        if n == 0 {
            return &mut [];
        }
        std::slice::from_raw_parts_mut(buffer.as_ptr() as *mut T, n)
    }

    /// Materializes the logical (row-major) element order.
    pub fn to_vec<T: ViewDType>(&self) -> Vec<T> {
        assert_eq!(T::dt().size_of(), self.itemsize());
        let data = self.data::<T>();
        let n = self.numel();
        if self.flags.row_contiguous && self.data_size == n {
            return data[self.offset..self.offset + n].to_vec();
        }
        let mut out = Vec::with_capacity(n);
        for e in 0..n {
            let loc = self.offset as i64 + elem_to_loc(e, &self.shape, &self.strides);
            out.push(data[loc as usize]);
        }
        out
    }

    /// Shares the same allocation as `other` (regardless of layout).
    pub fn same_buffer(&self, other: &View) -> bool {
        match (&self.buffer, &other.buffer) {
            (Some(a), Some(b)) => a.ptr_id() == b.ptr_id(),
            _ => false,
        }
    }

    /// Downgrades or corrects the contiguity claims. Used when an operator
    /// assembles its output from region writes the dense layout no longer
    /// describes.
    pub(crate) fn set_flags(&mut self, flags: Flags) {
        self.flags = flags;
    }

    /// Attaches a fresh dense allocation sized for this view.
    pub fn allocate_data(&mut self) -> Result<(), StorageError> {
        self.set_data(allocate(self.nbytes())?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{shape, Strides};

    #[test]
    fn fresh_view_is_dense() {
        let v = View::from_data(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], shape![2, 3]).unwrap();
        assert!(v.flags().row_contiguous);
        assert!(v.flags().contiguous);
        assert_eq!(v.data_size(), 6);
        assert_eq!(v.to_vec::<f32>(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn aliasing_shares_storage() {
        let a = View::from_data(&[1i32, 2, 3, 4], shape![4]).unwrap();
        let mut b = View::new(shape![4], DType::I32);
        b.attach_shared(&a);
        assert!(a.same_buffer(&b));
        assert!(!a.is_donatable());
        drop(b);
        assert!(a.is_donatable());
    }

    #[test]
    fn shared_layout_override_reads_through() {
        // Reverse a length-4 vector purely by layout.
        let a = View::from_data(&[10u8, 20, 30, 40], shape![4]).unwrap();
        let mut rev = View::new(shape![4], DType::U8);
        rev.attach_shared_layout(&a, Strides::from(vec![-1]), Flags::none(), 4, 3);
        assert_eq!(rev.to_vec::<u8>(), vec![40, 30, 20, 10]);
    }

    #[test]
    fn scalar_views() {
        let s = View::from_data(&[3.5f32], shape![]).unwrap();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.numel(), 1);
        assert_eq!(s.to_vec::<f32>(), vec![3.5]);
    }
}
