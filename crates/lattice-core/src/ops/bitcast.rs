use crate::{
    copy_inplace, CopyKind, DType, Encoder, Flags, InvariantError, OperationError, Strides, View,
};

/// Reinterprets `input`'s bytes as `dt`, rescaling the last dimension by the
/// element-width ratio. Zero-copy when the byte layout permits; otherwise the
/// input is densified into a staging buffer first and the result views that.
pub fn bitcast(input: &View, dt: DType, enc: &mut Encoder) -> Result<View, OperationError> {
    let ibytes = input.itemsize();
    let obytes = dt.size_of();

    let out_shape = if ibytes == obytes {
        input.shape().clone()
    } else {
        if input.rank() == 0 {
            return Err(invalid(input, dt));
        }
        let mut shape = input.shape().clone();
        let last = shape[input.rank() - 1];
        let total = last * ibytes;
        if total % obytes != 0 {
            return Err(invalid(input, dt));
        }
        shape[input.rank() - 1] = total / obytes;
        shape
    };
    let mut out = View::new(out_shape, dt);
    if out.numel() == 0 {
        return Ok(out);
    }

    // Reinterpreting in place works when elements keep their word boundaries:
    // equal widths, a narrowing over a unit last stride, or a fully dense
    // row-major region.
    let unit_last = input.strides().last() == Some(&1);
    let fast = ibytes == obytes
        || (obytes < ibytes && unit_last)
        || input.flags().row_contiguous;
    let offset_bytes = input.offset() * ibytes;

    if fast && offset_bytes % obytes == 0 {
        let mut strides = input.strides().clone();
        let rank = strides.rank();
        for i in 0..rank.saturating_sub(1) {
            strides[i] = strides[i] * ibytes as isize / obytes as isize;
        }
        let data_size = input.data_size() * ibytes / obytes;
        out.attach_shared_layout(input, strides, input.flags(), data_size, offset_bytes / obytes);
        return Ok(out);
    }

    // Slow path: land the input densely, then view the staging bytes.
    let staging_dt = if input.dt() == DType::Bool {
        DType::U8
    } else {
        input.dt()
    };
    let mut staging = View::new(input.shape().clone(), staging_dt);
    staging.allocate_data()?;
    if input.dt() == DType::Bool {
        // Same width; moves the bytes without the boolean conversion lane.
        let mut raw = View::new(input.shape().clone(), DType::U8);
        raw.attach_shared(input);
        copy_inplace(&raw, &mut staging, CopyKind::General, enc)?;
    } else {
        copy_inplace(input, &mut staging, CopyKind::General, enc)?;
    }

    let numel = out.numel();
    let max_dim = out.shape().iter().max().copied().unwrap_or(1);
    let flags = Flags::new(true, true, numel <= 1 || numel == max_dim);
    let strides = Strides::from(out.shape());
    out.attach_shared_layout(&staging, strides, flags, numel, 0);
    Ok(out)
}

fn invalid(input: &View, dt: DType) -> OperationError {
    InvariantError::InvalidBitcast {
        from: input.shape().clone(),
        from_dt: input.dt(),
        to_dt: dt,
    }
    .into()
}
