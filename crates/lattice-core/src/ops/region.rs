use crate::{copy, copy_inplace, CopyKind, Encoder, Flags, InvariantError, OperationError, View};

/// Pads `input` with `value` along the named axes. The whole output is
/// filled with the pad value first, then the input lands in the interior.
pub fn pad(
    input: &View,
    axes: &[isize],
    low: &[usize],
    high: &[usize],
    value: &View,
    enc: &mut Encoder,
) -> Result<View, OperationError> {
    if axes.len() != low.len() || axes.len() != high.len() {
        return Err(InvariantError::InputArity {
            expected: axes.len(),
            actual: low.len().max(high.len()),
        }
        .into());
    }
    if value.numel() != 1 {
        return Err(InvariantError::InputArity {
            expected: 1,
            actual: value.numel(),
        }
        .into());
    }
    if value.dt() != input.dt() {
        return Err(InvariantError::DTypeMismatch {
            expected: input.dt(),
            actual: value.dt(),
        }
        .into());
    }

    let mut out_shape = input.shape().clone();
    let mut resolved = Vec::with_capacity(axes.len());
    for (i, &axis) in axes.iter().enumerate() {
        let ax = super::normalize_axis(axis, input.rank())?;
        out_shape[ax] += low[i] + high[i];
        resolved.push(ax);
    }

    let mut out = View::new(out_shape, input.dt());
    copy(value, &mut out, CopyKind::Scalar, enc)?;
    if input.numel() == 0 {
        return Ok(out);
    }

    let mut data_offset = 0i64;
    for (i, &ax) in resolved.iter().enumerate() {
        data_offset += low[i] as i64 * out.strides()[ax] as i64;
    }
    // The interior as a strided window over the padded output.
    let mut interior = View::new(input.shape().clone(), input.dt());
    interior.attach_shared_layout(
        &out,
        out.strides().clone(),
        Flags::none(),
        interior.numel(),
        (out.offset() as i64 + data_offset) as usize,
    );
    copy_inplace(input, &mut interior, CopyKind::GeneralGeneral, enc)?;
    Ok(out)
}

/// Joins `inputs` along `axis` into freshly allocated storage. Every input
/// lands via a strided region write, so the output's contiguity claims are
/// cleared rather than trusted.
pub fn concatenate(
    inputs: &[View],
    axis: isize,
    enc: &mut Encoder,
) -> Result<View, OperationError> {
    let Some(first) = inputs.first() else {
        return Err(InvariantError::InputArity {
            expected: 1,
            actual: 0,
        }
        .into());
    };
    let rank = first.rank();
    let ax = super::normalize_axis(axis, rank)?;
    let dt = first.dt();

    let mut axis_total = 0;
    for input in inputs {
        if input.dt() != dt {
            return Err(InvariantError::DTypeMismatch {
                expected: dt,
                actual: input.dt(),
            }
            .into());
        }
        if input.rank() != rank {
            return Err(InvariantError::RankMismatch {
                expected: rank,
                actual: input.rank(),
            }
            .into());
        }
        for d in 0..rank {
            if d != ax && input.shape()[d] != first.shape()[d] {
                return Err(InvariantError::ShapeMismatch {
                    axis: d,
                    a: input.shape()[d],
                    b: first.shape()[d],
                }
                .into());
            }
        }
        axis_total += input.shape()[ax];
    }

    let mut out_shape = first.shape().clone();
    out_shape[ax] = axis_total;
    let mut out = View::new(out_shape, dt);
    if out.numel() == 0 {
        return Ok(out);
    }
    out.allocate_data()?;
    out.set_flags(Flags::none());

    let out_strides = out.strides().clone();
    let mut along = 0i64;
    for input in inputs {
        let mut region = View::new(input.shape().clone(), dt);
        region.attach_shared_layout(
            &out,
            out_strides.clone(),
            Flags::none(),
            region.numel(),
            (out.offset() as i64 + along * out_strides[ax] as i64) as usize,
        );
        copy_inplace(input, &mut region, CopyKind::GeneralGeneral, enc)?;
        along += input.shape()[ax] as i64;
    }
    Ok(out)
}
