use crate::{
    check_contiguity, copy, rvec, Buffer, CopyKind, Encoder, Flags, InvariantError,
    OperationError, RVec, Shape, Strides, View,
};

/// Expands `input` to `shape` under right-aligned broadcast rules. Grown
/// dimensions get stride zero; no data moves.
pub fn broadcast_to(input: &View, shape: &Shape) -> Result<View, OperationError> {
    let in_rank = input.rank();
    let out_rank = shape.rank();
    if out_rank < in_rank {
        return Err(InvariantError::RankMismatch {
            expected: in_rank,
            actual: out_rank,
        }
        .into());
    }
    let diff = out_rank - in_rank;
    for i in 0..in_rank {
        let in_dim = input.shape()[i];
        let out_dim = shape[i + diff];
        if in_dim != out_dim && in_dim != 1 {
            return Err(InvariantError::ShapeMismatch {
                axis: i + diff,
                a: in_dim,
                b: out_dim,
            }
            .into());
        }
    }

    let mut out = View::new(shape.clone(), input.dt());
    if out.numel() == 0 {
        return Ok(out);
    }
    let mut strides = Strides::zeros(out_rank);
    for i in 0..in_rank {
        strides[i + diff] = if input.shape()[i] == 1 {
            0
        } else {
            input.strides()[i]
        };
    }
    let mut flags = input.flags();
    if out.numel() > input.numel() {
        flags.row_contiguous = false;
        flags.col_contiguous = false;
    }
    out.attach_shared_layout(input, strides, flags, input.data_size(), input.offset());
    Ok(out)
}

/// Broadcast where `shape` contains new dimensions at the positions named by
/// `axes`; the remaining dimensions line up with `input`'s in order.
pub fn broadcast_axes(
    input: &View,
    axes: &[isize],
    shape: &Shape,
) -> Result<View, OperationError> {
    let out_rank = shape.rank();
    if input.rank() + axes.len() != out_rank {
        return Err(InvariantError::RankMismatch {
            expected: input.rank() + axes.len(),
            actual: out_rank,
        }
        .into());
    }
    let mut inserted = vec![false; out_rank];
    for &axis in axes {
        let ax = super::normalize_axis(axis, out_rank)?;
        if inserted[ax] {
            return Err(InvariantError::DuplicateAxes.into());
        }
        inserted[ax] = true;
    }

    let mut out = View::new(shape.clone(), input.dt());
    let mut strides = Strides::zeros(out_rank);
    let mut j = 0;
    for i in 0..out_rank {
        if inserted[i] {
            continue;
        }
        let in_dim = input.shape()[j];
        if in_dim != shape[i] && in_dim != 1 {
            return Err(InvariantError::ShapeMismatch {
                axis: i,
                a: in_dim,
                b: shape[i],
            }
            .into());
        }
        strides[i] = if in_dim == 1 { 0 } else { input.strides()[j] };
        j += 1;
    }
    if out.numel() == 0 {
        return Ok(out);
    }
    let mut flags = input.flags();
    if out.numel() > input.numel() {
        flags.row_contiguous = false;
        flags.col_contiguous = false;
    }
    out.attach_shared_layout(input, strides, flags, input.data_size(), input.offset());
    Ok(out)
}

/// Permutes dimensions by `axes`. Pure metadata; contiguity is re-derived
/// when the input addressed a dense region.
pub fn transpose(input: &View, axes: &[isize]) -> Result<View, OperationError> {
    let rank = input.rank();
    if axes.len() != rank {
        return Err(InvariantError::RankMismatch {
            expected: rank,
            actual: axes.len(),
        }
        .into());
    }
    let mut seen = vec![false; rank];
    let mut out_shape: RVec<usize> = rvec![];
    let mut out_strides = Strides::zeros(rank);
    for (i, &axis) in axes.iter().enumerate() {
        let ax = super::normalize_axis(axis, rank)?;
        if seen[ax] {
            return Err(InvariantError::DuplicateAxes.into());
        }
        seen[ax] = true;
        out_shape.push(input.shape()[ax]);
        out_strides[i] = input.strides()[ax];
    }

    let mut out = View::new(Shape::new(out_shape), input.dt());
    let mut flags = input.flags();
    if flags.contiguous && input.data_size() == input.numel() {
        let (_, row, col) = check_contiguity(out.shape(), &out_strides);
        flags.row_contiguous = row;
        flags.col_contiguous = col;
    }
    out.attach_shared_layout(input, out_strides, flags, input.data_size(), input.offset());
    Ok(out)
}

/// Removes the named size-1 dimensions.
pub fn squeeze(input: &View, axes: &[isize]) -> Result<View, OperationError> {
    let rank = input.rank();
    let mut drop = vec![false; rank];
    for &axis in axes {
        let ax = super::normalize_axis(axis, rank)?;
        if drop[ax] {
            return Err(InvariantError::DuplicateAxes.into());
        }
        if input.shape()[ax] != 1 {
            return Err(InvariantError::ShapeMismatch {
                axis: ax,
                a: input.shape()[ax],
                b: 1,
            }
            .into());
        }
        drop[ax] = true;
    }
    let mut out_shape: RVec<usize> = rvec![];
    let mut out_strides: RVec<isize> = rvec![];
    for i in 0..rank {
        if !drop[i] {
            out_shape.push(input.shape()[i]);
            out_strides.push(input.strides()[i]);
        }
    }
    let mut out = View::new(Shape::new(out_shape), input.dt());
    out.attach_shared_layout(
        input,
        Strides::new(out_strides),
        input.flags(),
        input.data_size(),
        input.offset(),
    );
    Ok(out)
}

/// Inserts size-1 dimensions at the named output positions.
pub fn expand_dims(input: &View, axes: &[isize]) -> Result<View, OperationError> {
    let out_rank = input.rank() + axes.len();
    let mut inserted = vec![false; out_rank];
    for &axis in axes {
        let ax = super::normalize_axis(axis, out_rank)?;
        if inserted[ax] {
            return Err(InvariantError::DuplicateAxes.into());
        }
        inserted[ax] = true;
    }
    let mut out_shape: RVec<usize> = rvec![];
    let mut out_strides: RVec<isize> = rvec![];
    let mut j = 0;
    for i in 0..out_rank {
        if inserted[i] {
            out_shape.push(1);
            out_strides.push(0);
        } else {
            out_shape.push(input.shape()[j]);
            out_strides.push(input.strides()[j]);
            j += 1;
        }
    }
    // A size-1 stride never affects addressing; give inserted dimensions the
    // stride they would have in a dense layout for readability.
    for i in (0..out_rank).rev() {
        if inserted[i] {
            out_strides[i] = if i + 1 < out_rank {
                out_strides[i + 1] * out_shape[i + 1] as isize
            } else {
                1
            };
        }
    }
    let mut out = View::new(Shape::new(out_shape), input.dt());
    out.attach_shared_layout(
        input,
        Strides::new(out_strides),
        input.flags(),
        input.data_size(),
        input.offset(),
    );
    Ok(out)
}

/// Reinterprets a row-contiguous input under caller-chosen shape, strides and
/// element offset. The caller is responsible for staying in bounds; flags are
/// re-derived conservatively.
pub fn as_strided(
    input: &View,
    shape: Shape,
    strides: Strides,
    offset: usize,
) -> Result<View, OperationError> {
    if !input.flags().row_contiguous {
        return Err(InvariantError::NotRowContiguous.into());
    }
    if shape.rank() != strides.rank() {
        return Err(InvariantError::RankMismatch {
            expected: shape.rank(),
            actual: strides.rank(),
        }
        .into());
    }
    let mut out = View::new(shape, input.dt());
    let (no_bsx, row, col) = check_contiguity(out.shape(), &strides);
    let mut data_end = 1i64;
    for i in 0..out.rank() {
        if out.shape()[i] > 1 {
            data_end += (out.shape()[i] - 1) as i64 * strides[i] as i64;
        }
    }
    let data_size = data_end.max(0) as usize;
    let flags = Flags::new(no_bsx as usize == data_size, row, col);
    out.attach_shared_layout(input, strides, flags, data_size, input.offset() + offset);
    Ok(out)
}

/// Returns a view with dense storage, sharing the input when it is already
/// dense (with bounded slack) and copying otherwise.
pub fn contiguous(
    input: &View,
    allow_col_major: bool,
    enc: &mut Encoder,
) -> Result<View, OperationError> {
    // Tolerated overhang when sharing a larger buffer instead of copying.
    const EXTRA_BYTES: usize = 16384;
    let mut out = View::new(input.shape().clone(), input.dt());
    let buffer_bytes = input.buffer().map_or(0, Buffer::n_bytes);
    if buffer_bytes <= out.nbytes() + EXTRA_BYTES
        && (input.flags().row_contiguous || (allow_col_major && input.flags().col_contiguous))
    {
        out.attach_shared(input);
    } else {
        copy(input, &mut out, CopyKind::General, enc)?;
    }
    Ok(out)
}
