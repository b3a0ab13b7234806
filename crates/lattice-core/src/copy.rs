use crate::{
    allocate, dispatch_dtype, elem_to_loc, Encoder, OperationError, Shape, StorageError, Strides,
    View, ViewDType,
};

/// Addressing strategy for one copy. Derived per call from both views'
/// flags and sizes, never stored.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CopyKind {
    /// One source element broadcast-filled over the destination.
    Scalar,
    /// Both sides contiguous with equal size: a flat element-range copy.
    Vector,
    /// Arbitrary source strides, destination written in linear row-major
    /// order. The densification (and cast) path.
    General,
    /// Both sides arbitrary: source and destination offsets are computed
    /// independently per logical index. Always correct, the universal
    /// fallback.
    GeneralGeneral,
}

/// Copies `src` into `dst`, attaching `dst`'s storage first.
///
/// For vector copies of a donatable source with matching element width, the
/// source buffer is reused instead of allocating; if the dtypes also match
/// the copy degenerates to the ref-count transfer alone.
pub fn copy(
    src: &View,
    dst: &mut View,
    kind: CopyKind,
    enc: &mut Encoder,
) -> Result<(), OperationError> {
    // Settle the kind before storage exists so the allocation matches the
    // loop that will run. A fresh destination is laid out dense, so General
    // is terminal for everything the strided kinds demote to.
    let kind = match kind {
        CopyKind::Vector if !(src.flags().contiguous && src.numel() == dst.numel()) => {
            CopyKind::General
        }
        CopyKind::GeneralGeneral => CopyKind::General,
        kind => kind,
    };
    let donated = set_copy_output_data(src, dst, kind)?;
    if donated && src.dt() == dst.dt() {
        return Ok(());
    }
    copy_inplace(src, dst, kind, enc)
}

fn set_copy_output_data(src: &View, dst: &mut View, kind: CopyKind) -> Result<bool, StorageError> {
    if kind == CopyKind::Vector {
        if src.is_donatable() && src.itemsize() == dst.itemsize() {
            dst.attach_shared(src);
            return Ok(true);
        }
        let buffer = allocate(src.data_size() * dst.itemsize())?;
        dst.set_data_with(buffer, src.data_size(), src.strides().clone(), src.flags());
        Ok(false)
    } else {
        dst.set_data(allocate(dst.nbytes())?);
        Ok(false)
    }
}

/// Copies `src` into already-attached `dst` storage.
///
/// Fast-path preconditions are checked here, not assumed: a vector copy
/// whose source is not contiguous (or whose sizes disagree) runs as General,
/// and a General copy into a non-dense destination runs as GeneralGeneral.
pub fn copy_inplace(
    src: &View,
    dst: &mut View,
    kind: CopyKind,
    enc: &mut Encoder,
) -> Result<(), OperationError> {
    let kind = effective_kind(src, dst, kind);
    let data_shape = src.shape().clone();
    let i_strides = src.strides().clone();
    let o_strides = dst.strides().clone();
    copy_inplace_prepared(
        src, dst, &data_shape, &i_strides, &o_strides, 0, 0, kind, enc, None, None,
    )
}

fn effective_kind(src: &View, dst: &View, kind: CopyKind) -> CopyKind {
    match kind {
        CopyKind::Scalar => CopyKind::Scalar,
        CopyKind::Vector => {
            if src.flags().contiguous && src.numel() == dst.numel() {
                CopyKind::Vector
            } else {
                CopyKind::General
            }
        }
        CopyKind::General => {
            if dst.flags().row_contiguous && dst.data_size() == dst.numel() {
                CopyKind::General
            } else {
                CopyKind::GeneralGeneral
            }
        }
        CopyKind::GeneralGeneral => CopyKind::GeneralGeneral,
    }
}

/// The offset-carrying engine entry. `data_shape` is the shared logical
/// iteration space; `i_offset`/`o_offset` are static element offsets relative
/// to each view's own position, and the optional dynamic offsets are
/// one-element I64 views whose value is added uniformly to every computed
/// source or destination offset. Shape compatibility beyond this is the
/// caller's contract.
#[allow(clippy::too_many_arguments)]
pub fn copy_inplace_prepared(
    src: &View,
    dst: &mut View,
    data_shape: &Shape,
    i_strides: &Strides,
    o_strides: &Strides,
    i_offset: i64,
    o_offset: i64,
    kind: CopyKind,
    enc: &mut Encoder,
    dynamic_i_offset: Option<&View>,
    dynamic_o_offset: Option<&View>,
) -> Result<(), OperationError> {
    debug_assert!(dst.has_storage() || dst.numel() == 0);
    enc.register_input(src);
    enc.register_output(dst);

    let dst_ref: &View = dst;
    enc.dispatch(|| {
        let dyn_i = dynamic_i_offset.map_or(0, |v| v.to_vec::<i64>()[0]);
        let dyn_o = dynamic_o_offset.map_or(0, |v| v.to_vec::<i64>()[0]);
        dispatch_dtype!(src.dt(), |S| {
            dispatch_dtype!(dst_ref.dt(), |D| {
                copy_typed::<S, D>(
                    src,
                    dst_ref,
                    data_shape,
                    i_strides,
                    o_strides,
                    i_offset + dyn_i,
                    o_offset + dyn_o,
                    kind,
                )
            })
        });
    });
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn copy_typed<S: ViewDType, D: ViewDType>(
    src: &View,
    dst: &View,
    data_shape: &Shape,
    i_strides: &Strides,
    o_strides: &Strides,
    i_offset: i64,
    o_offset: i64,
    kind: CopyKind,
) {
    let s = src.data::<S>();
    // The single-writer contract makes this exclusive for the dispatch.
    let d = unsafe { dst.data_mut::<D>() };
    let src_base = src.offset() as i64 + i_offset;
    let dst_base = dst.offset() as i64 + o_offset;

    match kind {
        CopyKind::Scalar => {
            let n = dst.numel();
            if n == 0 {
                return;
            }
            let val = convert::<S, D>(s[src_base as usize]);
            for e in 0..n as i64 {
                d[(dst_base + e) as usize] = val;
            }
        }
        CopyKind::Vector => {
            for e in 0..src.data_size() as i64 {
                d[(dst_base + e) as usize] = convert::<S, D>(s[(src_base + e) as usize]);
            }
        }
        CopyKind::General => {
            for e in 0..data_shape.numel() {
                let loc = elem_to_loc(e, data_shape, i_strides);
                d[(dst_base + e as i64) as usize] = convert::<S, D>(s[(src_base + loc) as usize]);
            }
        }
        CopyKind::GeneralGeneral => {
            for e in 0..data_shape.numel() {
                let src_loc = elem_to_loc(e, data_shape, i_strides);
                let dst_loc = elem_to_loc(e, data_shape, o_strides);
                d[(dst_base + dst_loc) as usize] =
                    convert::<S, D>(s[(src_base + src_loc) as usize]);
            }
        }
    }
}

/// Element conversion lane. Identical types move bit-exactly; everything
/// else converts numerically (never a byte reinterpretation).
#[inline]
pub(crate) fn convert<S: ViewDType, D: ViewDType>(v: S) -> D {
    if std::any::TypeId::of::<S>() == std::any::TypeId::of::<D>() {
        bytemuck::cast(v)
    } else {
        D::from_f64(v.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{shape, DType, Flags};

    #[test]
    fn scalar_broadcast_fill() {
        let val = View::from_data(&[7i32], shape![]).unwrap();
        let mut dst = View::new(shape![2, 3], DType::I32);
        let mut enc = Encoder::new();
        copy(&val, &mut dst, CopyKind::Scalar, &mut enc).unwrap();
        assert_eq!(dst.to_vec::<i32>(), vec![7; 6]);
    }

    #[test]
    fn vector_copy_and_donation() {
        let src = View::from_data(&[1.0f32, 2.0, 3.0, 4.0], shape![4]).unwrap();
        let mut enc = Encoder::new();

        // A live alias blocks donation.
        let alias = src.clone();
        let mut dst = View::new(shape![4], DType::F32);
        copy(&src, &mut dst, CopyKind::Vector, &mut enc).unwrap();
        assert!(!dst.same_buffer(&src));
        assert_eq!(dst.to_vec::<f32>(), vec![1.0, 2.0, 3.0, 4.0]);
        drop(alias);

        // Uniquely owned source is donated: same allocation, no data moved.
        let mut donated = View::new(shape![4], DType::F32);
        copy(&src, &mut donated, CopyKind::Vector, &mut enc).unwrap();
        assert!(donated.same_buffer(&src));
        assert_eq!(donated.to_vec::<f32>(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn general_densifies_a_strided_source() {
        // Transposed [3, 2] view of a row-major [2, 3] buffer.
        let buf = View::from_data(&[1u8, 2, 3, 4, 5, 6], shape![2, 3]).unwrap();
        let mut t = View::new(shape![3, 2], DType::U8);
        t.attach_shared_layout(&buf, Strides::from(vec![1, 3]), Flags::none(), 6, 0);

        let mut dst = View::new(shape![3, 2], DType::U8);
        dst.allocate_data().unwrap();
        let mut enc = Encoder::new();
        copy_inplace(&t, &mut dst, CopyKind::General, &mut enc).unwrap();
        assert_eq!(dst.to_vec::<u8>(), vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn allocating_vector_copy_of_a_strided_source() {
        // A reversed slice is not contiguous and its spanned region clamps
        // to zero; the requested Vector kind must demote before the output
        // is sized, or the copy writes into an empty buffer.
        let a = View::from_data(&[1i32, 2, 3, 4], shape![4]).unwrap();
        let rev = crate::slice(&a, &[3], &[-1], &[-1]).unwrap();
        assert_eq!(rev.data_size(), 0);

        let mut dst = View::new(shape![4], DType::I32);
        let mut enc = Encoder::new();
        copy(&rev, &mut dst, CopyKind::Vector, &mut enc).unwrap();
        assert!(dst.flags().row_contiguous);
        assert_eq!(dst.to_vec::<i32>(), vec![4, 3, 2, 1]);
    }

    #[test]
    fn vector_precondition_is_checked_not_assumed() {
        // Non-contiguous source handed to a Vector copy must still be correct.
        let buf = View::from_data(&[1i64, 2, 3, 4, 5, 6], shape![2, 3]).unwrap();
        let mut t = View::new(shape![3, 2], DType::I64);
        t.attach_shared_layout(&buf, Strides::from(vec![1, 3]), Flags::none(), 6, 0);

        let mut dst = View::new(shape![3, 2], DType::I64);
        dst.allocate_data().unwrap();
        let mut enc = Encoder::new();
        copy_inplace(&t, &mut dst, CopyKind::Vector, &mut enc).unwrap();
        assert_eq!(dst.to_vec::<i64>(), vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn general_general_handles_both_sides_strided() {
        // Source: reversed vector. Destination: every other element of a
        // zero-filled buffer.
        let src_buf = View::from_data(&[1.0f32, 2.0, 3.0], shape![3]).unwrap();
        let mut src = View::new(shape![3], DType::F32);
        src.attach_shared_layout(&src_buf, Strides::from(vec![-1]), Flags::none(), 3, 2);

        let dst_buf = View::from_data(&[0.0f32; 6], shape![6]).unwrap();
        let mut dst = View::new(shape![3], DType::F32);
        dst.attach_shared_layout(&dst_buf, Strides::from(vec![2]), Flags::none(), 6, 0);

        let mut enc = Encoder::new();
        copy_inplace(&src, &mut dst, CopyKind::GeneralGeneral, &mut enc).unwrap();
        assert_eq!(dst_buf.to_vec::<f32>(), vec![3.0, 0.0, 2.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn dynamic_offsets_shift_the_addressing() {
        let src = View::from_data(&[10u16, 11, 12, 13, 14, 15], shape![6]).unwrap();
        let mut dst = View::new(shape![2], DType::U16);
        dst.allocate_data().unwrap();
        let dyn_i = View::from_data(&[3i64], shape![1]).unwrap();

        let mut enc = Encoder::new();
        let shape = shape![2];
        let i_strides = Strides::from(vec![1]);
        let o_strides = Strides::from(vec![1]);
        copy_inplace_prepared(
            &src,
            &mut dst,
            &shape,
            &i_strides,
            &o_strides,
            0,
            0,
            CopyKind::GeneralGeneral,
            &mut enc,
            Some(&dyn_i),
            None,
        )
        .unwrap();
        assert_eq!(dst.to_vec::<u16>(), vec![13, 14]);
    }

    #[test]
    fn casting_converts_per_element() {
        let src = View::from_data(&[1.9f32, -2.5, 0.0], shape![3]).unwrap();
        let mut dst = View::new(shape![3], DType::I32);
        let mut enc = Encoder::new();
        copy(&src, &mut dst, CopyKind::Vector, &mut enc).unwrap();
        assert_eq!(dst.to_vec::<i32>(), vec![1, -2, 0]);
    }
}
