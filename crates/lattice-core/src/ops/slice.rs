use crate::{
    check_contiguity, copy, copy_inplace_prepared, elem_to_loc, shape, CopyKind, DType, Encoder,
    InvariantError, OperationError, RVec, Shape, Strides, View,
};

/// Static offset and strides for a slice described by per-axis start and
/// step. `starts` are already normalized into `[0, dim]`.
pub(crate) fn prepare_slice(input: &View, starts: &[i64], steps: &[i64]) -> (i64, Strides) {
    let mut data_offset = 0i64;
    let mut out_strides = Strides::zeros(input.rank());
    for i in 0..input.rank() {
        data_offset += starts[i] * input.strides()[i] as i64;
        out_strides[i] = input.strides()[i] * steps[i] as isize;
    }
    (data_offset, out_strides)
}

/// Extent of one sliced axis. Steps may be negative (then `start > stop`,
/// with `stop` possibly -1 to include index 0); an empty range yields 0.
pub(crate) fn slice_dim(start: i64, stop: i64, step: i64) -> usize {
    debug_assert_ne!(step, 0);
    let span = stop - start;
    // Truncating division; the bias rounds a partial final step inwards.
    let extent = if step > 0 {
        (span + step - 1) / step
    } else {
        (span + step + 1) / step
    };
    extent.max(0) as usize
}

fn shared_buffer_slice(
    input: &View,
    out_strides: Strides,
    data_offset: i64,
    data_size: usize,
    out: &mut View,
) {
    let (no_bsx, row, col) = check_contiguity(out.shape(), &out_strides);
    let mut flags = input.flags();
    flags.contiguous = no_bsx as usize == data_size;
    flags.row_contiguous = row;
    flags.col_contiguous = col;
    let offset = (input.offset() as i64 + data_offset) as usize;
    out.attach_shared_layout(input, out_strides, flags, data_size, offset);
}

fn check_slice_args(
    input: &View,
    starts: &[i64],
    stops: &[i64],
    steps: &[i64],
) -> Result<(), InvariantError> {
    for len in [starts.len(), stops.len(), steps.len()] {
        if len != input.rank() {
            return Err(InvariantError::RankMismatch {
                expected: input.rank(),
                actual: len,
            });
        }
    }
    Ok(())
}

/// Zero-copy rectangular sub-view. Each axis takes `start`, `stop` and a
/// non-zero `step`; negative steps walk the axis backwards.
pub fn slice(
    input: &View,
    starts: &[i64],
    stops: &[i64],
    steps: &[i64],
) -> Result<View, OperationError> {
    check_slice_args(input, starts, stops, steps)?;
    let mut out_shape: RVec<usize> = crate::rvec![];
    for i in 0..input.rank() {
        out_shape.push(slice_dim(starts[i], stops[i], steps[i]));
    }
    let mut out = View::new(Shape::new(out_shape), input.dt());
    if out.numel() == 0 {
        return Ok(out);
    }

    let (data_offset, out_strides) = prepare_slice(input, starts, steps);
    // Span of the addressed region, measured from the slice origin. Stepped
    // axes over-span to the step boundary; that only makes the contiguity
    // claim stricter.
    let mut data_end = 1i64;
    for i in 0..input.rank() {
        if input.shape()[i] > 1 {
            let end_idx = starts[i] + out.shape()[i] as i64 * steps[i] - 1;
            data_end += end_idx * input.strides()[i] as i64;
        }
    }
    let data_size = (data_end - data_offset).max(0) as usize;
    shared_buffer_slice(input, out_strides, data_offset, data_size, &mut out);
    Ok(out)
}

/// How to materialize a copy of `input` before its region gets overwritten.
fn base_copy_kind(input: &View) -> CopyKind {
    if input.data_size() == 1 {
        CopyKind::Scalar
    } else if input.flags().contiguous && input.data_size() == input.numel() {
        CopyKind::Vector
    } else {
        CopyKind::General
    }
}

/// Copy of `input` with the region selected by `starts`/`stops`/`steps`
/// replaced by `update`. The input itself is never written.
pub fn slice_update(
    input: &View,
    update: &View,
    starts: &[i64],
    stops: &[i64],
    steps: &[i64],
    enc: &mut Encoder,
) -> Result<View, OperationError> {
    if input.dt() != update.dt() {
        return Err(InvariantError::DTypeMismatch {
            expected: input.dt(),
            actual: update.dt(),
        }
        .into());
    }
    check_slice_args(input, starts, stops, steps)?;
    for i in 0..input.rank() {
        let dim = slice_dim(starts[i], stops[i], steps[i]);
        if dim != update.shape()[i] {
            return Err(InvariantError::ShapeMismatch {
                axis: i,
                a: dim,
                b: update.shape()[i],
            }
            .into());
        }
    }

    let mut out = View::new(input.shape().clone(), input.dt());
    if out.numel() == 0 {
        return Ok(out);
    }
    if update.numel() == 0 {
        out.attach_shared(input);
        return Ok(out);
    }
    copy(input, &mut out, base_copy_kind(input), enc)?;

    let (data_offset, region_strides) = prepare_slice(&out, starts, steps);
    let data_shape = update.shape().clone();
    let i_strides = update.strides().clone();
    copy_inplace_prepared(
        update,
        &mut out,
        &data_shape,
        &i_strides,
        &region_strides,
        0,
        data_offset,
        CopyKind::GeneralGeneral,
        enc,
        None,
        None,
    )?;
    Ok(out)
}

/// Reduces integer `indices` (one per entry of `axes`) against `strides`
/// into a single element offset, produced as a one-element I64 view. The
/// reduction is deferred to dispatch time so the indices may themselves be
/// the output of earlier queued work.
///
/// Returns the offset view and whether the indices' storage was donated
/// into it.
pub fn compute_dynamic_offset(
    indices: &View,
    strides: &Strides,
    axes: &[usize],
    enc: &mut Encoder,
) -> Result<(View, bool), OperationError> {
    if !indices.dt().is_integer() {
        return Err(InvariantError::UnsupportedDType(indices.dt()).into());
    }
    if indices.numel() != axes.len() {
        return Err(InvariantError::InputArity {
            expected: axes.len(),
            actual: indices.numel(),
        }
        .into());
    }

    let mut offset = View::new(shape![1], DType::I64);
    let donate =
        indices.is_donatable() && indices.data_size() * indices.itemsize() >= offset.itemsize();
    if donate {
        // The write lands at byte 0 after all index reads.
        let strides = Strides::from(vec![1]);
        offset.attach_shared_layout(indices, strides, offset.flags(), 1, 0);
    } else {
        offset.allocate_data()?;
    }

    enc.register_input(indices);
    enc.register_output(&offset);
    let offset_ref = &offset;
    let strides = strides.clone();
    enc.dispatch(|| {
        let mut acc = 0i64;
        macro_rules! gather {
            ($T:ty) => {{
                let data = indices.data::<$T>();
                for (i, &ax) in axes.iter().enumerate() {
                    let loc = indices.offset() as i64
                        + elem_to_loc(i, indices.shape(), indices.strides());
                    acc += data[loc as usize] as i64 * strides[ax] as i64;
                }
            }};
        }
        match indices.dt() {
            DType::U8 => gather!(u8),
            DType::U16 => gather!(u16),
            DType::U32 => gather!(u32),
            DType::U64 => gather!(u64),
            DType::I8 => gather!(i8),
            DType::I16 => gather!(i16),
            DType::I32 => gather!(i32),
            _ => gather!(i64),
        }
        let d = unsafe { offset_ref.data_mut::<i64>() };
        d[offset_ref.offset()] = acc;
    });
    Ok((offset, donate))
}

/// Slice whose per-axis start positions live in a device-side index view.
/// `out_shape` fixes the extent; the offset is resolved at dispatch time.
pub fn dynamic_slice(
    input: &View,
    indices: &View,
    axes: &[usize],
    out_shape: Shape,
    enc: &mut Encoder,
) -> Result<View, OperationError> {
    let mut out = View::new(out_shape, input.dt());
    if out.numel() == 0 {
        return Ok(out);
    }
    out.allocate_data()?;

    let (in_offset, donated) = compute_dynamic_offset(indices, input.strides(), axes, enc)?;
    let data_shape = out.shape().clone();
    let i_strides = input.strides().clone();
    let o_strides = out.strides().clone();
    copy_inplace_prepared(
        input,
        &mut out,
        &data_shape,
        &i_strides,
        &o_strides,
        0,
        0,
        CopyKind::GeneralGeneral,
        enc,
        Some(&in_offset),
        None,
    )?;
    if !donated {
        enc.add_temporary(in_offset);
    }
    Ok(out)
}

/// [`slice_update`] with the write position resolved from a device-side
/// index view at dispatch time.
pub fn dynamic_slice_update(
    input: &View,
    update: &View,
    indices: &View,
    axes: &[usize],
    enc: &mut Encoder,
) -> Result<View, OperationError> {
    if input.dt() != update.dt() {
        return Err(InvariantError::DTypeMismatch {
            expected: input.dt(),
            actual: update.dt(),
        }
        .into());
    }
    let mut out = View::new(input.shape().clone(), input.dt());
    if out.numel() == 0 {
        return Ok(out);
    }
    copy(input, &mut out, base_copy_kind(input), enc)?;

    let out_strides = out.strides().clone();
    let (out_offset, donated) = compute_dynamic_offset(indices, &out_strides, axes, enc)?;
    let data_shape = update.shape().clone();
    let i_strides = update.strides().clone();
    copy_inplace_prepared(
        update,
        &mut out,
        &data_shape,
        &i_strides,
        &out_strides,
        0,
        0,
        CopyKind::GeneralGeneral,
        enc,
        None,
        Some(&out_offset),
    )?;
    if !donated {
        enc.add_temporary(out_offset);
    }
    Ok(out)
}
