use crate::{
    copy_inplace, rvec, CopyKind, Encoder, InvariantError, OperationError, RVec, Shape, Strides,
    View,
};

/// Merges adjacent dimensions that are contiguous with each other and drops
/// size-1 dimensions. The result addresses the same elements in the same
/// order with the fewest dimensions possible.
pub(crate) fn collapse_contiguous_dims(shape: &Shape, strides: &Strides) -> (Shape, Strides) {
    let mut out_shape: RVec<usize> = rvec![];
    let mut out_strides: RVec<isize> = rvec![];
    for i in 0..shape.rank() {
        let dim = shape[i];
        let stride = strides[i];
        if dim == 1 {
            continue;
        }
        if let (Some(last_dim), Some(last_stride)) =
            (out_shape.last_mut(), out_strides.last_mut())
        {
            if *last_stride == stride * dim as isize {
                *last_dim *= dim;
                *last_stride = stride;
                continue;
            }
        }
        out_shape.push(dim);
        out_strides.push(stride);
    }
    if out_shape.is_empty() {
        out_shape.push(1);
        out_strides.push(1);
    }
    (Shape::new(out_shape), Strides::new(out_strides))
}

/// Decides whether `input` can be reinterpreted as `out`'s shape without
/// moving data. Returns the output strides to use when it can.
pub(crate) fn prepare_reshape(input: &View, out: &View) -> (bool, Strides) {
    if input.numel() == 0 || input.shape().is_scalar() {
        return (false, Strides::zeros(out.rank()));
    }

    let (mut cshape, cstrides) = collapse_contiguous_dims(input.shape(), input.strides());
    let mut out_strides = Strides::zeros(out.rank());
    let mut j = 0;
    for i in 0..out.rank() {
        let n = out.shape()[i];
        if j < cshape.rank() && cshape[j] % n == 0 {
            cshape[j] /= n;
            out_strides[i] = cshape[j] as isize * cstrides[j];
            j += usize::from(cshape[j] == 1);
        } else if n == 1 {
            // i > 0: the scalar case above covers an all-ones input, so at
            // least one collapsed dimension was consumed before j ran out.
            out_strides[i] = out_strides[i - 1];
        } else {
            return (true, out_strides);
        }
    }
    (false, out_strides)
}

/// Reattaches `input`'s storage to `out` under reshape strides. Row
/// contiguity survives a reshape; column contiguity has to be re-derived
/// from the output shape.
pub(crate) fn shared_buffer_reshape(input: &View, out_strides: Strides, out: &mut View) {
    let mut flags = input.flags();
    if flags.row_contiguous {
        let max_dim = out.shape().iter().max().copied().unwrap_or(1);
        flags.col_contiguous = out.numel() <= 1 || out.numel() == max_dim;
    }
    out.attach_shared_layout(input, out_strides, flags, input.data_size(), input.offset());
}

/// Reinterprets `input` under a new shape with the same element count.
/// Zero-copy whenever the layout permits; otherwise the elements are
/// densified into fresh storage.
pub fn reshape(input: &View, shape: Shape, enc: &mut Encoder) -> Result<View, OperationError> {
    if shape.numel() != input.numel() {
        return Err(InvariantError::InvalidReshape {
            from: input.shape().clone(),
            to: shape,
        }
        .into());
    }
    let mut out = View::new(shape, input.dt());
    let (copy_necessary, out_strides) = prepare_reshape(input, &out);
    if copy_necessary {
        out.allocate_data()?;
        copy_inplace(input, &mut out, CopyKind::General, enc)?;
    } else {
        shared_buffer_reshape(input, out_strides, &mut out);
    }
    Ok(out)
}

/// Merges the dimensions `start..=end` (inclusive, negative axes allowed)
/// into one.
pub fn flatten(
    input: &View,
    start: isize,
    end: isize,
    enc: &mut Encoder,
) -> Result<View, OperationError> {
    let rank = input.rank();
    if rank == 0 {
        return reshape(input, crate::shape![1], enc);
    }
    let start = super::normalize_axis(start, rank)?;
    let end = super::normalize_axis(end, rank)?;
    if start > end {
        return Err(InvariantError::AxisOutOfRange {
            axis: start as isize,
            rank: end + 1,
        }
        .into());
    }
    let mut out_shape: RVec<usize> = rvec![];
    out_shape.extend(input.shape().iter().take(start).copied());
    out_shape.push(input.shape().iter().skip(start).take(end - start + 1).product());
    out_shape.extend(input.shape().iter().skip(end + 1).copied());
    reshape(input, Shape::new(out_shape), enc)
}

/// Splits dimension `axis` into `sizes`. The product of `sizes` must equal
/// the original extent.
pub fn unflatten(
    input: &View,
    axis: isize,
    sizes: &[usize],
    enc: &mut Encoder,
) -> Result<View, OperationError> {
    let axis = super::normalize_axis(axis, input.rank())?;
    if sizes.iter().product::<usize>() != input.shape()[axis] {
        return Err(InvariantError::InvalidReshape {
            from: input.shape().clone(),
            to: Shape::from(sizes.to_vec()),
        }
        .into());
    }
    let mut out_shape: RVec<usize> = rvec![];
    out_shape.extend(input.shape().iter().take(axis).copied());
    out_shape.extend(sizes.iter().copied());
    out_shape.extend(input.shape().iter().skip(axis + 1).copied());
    reshape(input, Shape::new(out_shape), enc)
}
