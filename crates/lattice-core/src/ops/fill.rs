use crate::{
    broadcast_to, copy, dispatch_dtype, shape, CopyKind, DType, Encoder, InvariantError,
    OperationError, Shape, View, ViewDType,
};

/// Fills a new view of `shape` with `value`, broadcast as needed. The value's
/// dtype carries over.
pub fn full(value: &View, shape: Shape, enc: &mut Encoder) -> Result<View, OperationError> {
    let src = if value.shape() == &shape {
        value.clone()
    } else {
        broadcast_to(value, &shape)?
    };
    let mut out = View::new(shape, value.dt());
    let kind = if src.data_size() == 1 {
        CopyKind::Scalar
    } else if src.flags().contiguous {
        CopyKind::Vector
    } else {
        CopyKind::General
    };
    copy(&src, &mut out, kind, enc)?;
    Ok(out)
}

/// Element-wise dtype conversion. Same-dtype casts still copy (possibly by
/// donation); bools normalize through the numeric lane.
pub fn astype(input: &View, dt: DType, enc: &mut Encoder) -> Result<View, OperationError> {
    let mut out = View::new(input.shape().clone(), dt);
    let kind = if input.flags().contiguous {
        CopyKind::Vector
    } else {
        CopyKind::General
    };
    copy(input, &mut out, kind, enc)?;
    Ok(out)
}

/// `n` evenly spaced values starting at `start`. The walk accumulates in
/// f64 and converts per element; Bool has no meaningful spacing and is
/// rejected.
pub fn arange(
    dt: DType,
    start: f64,
    step: f64,
    n: usize,
    enc: &mut Encoder,
) -> Result<View, OperationError> {
    if dt == DType::Bool {
        return Err(InvariantError::UnsupportedDType(dt).into());
    }
    let mut out = View::new(shape![n], dt);
    out.allocate_data()?;
    enc.register_output(&out);
    let out_ref = &out;
    enc.dispatch(|| {
        dispatch_dtype!(dt, |T| {
            let d = unsafe { out_ref.data_mut::<T>() };
            let mut val = start;
            for e in 0..n {
                d[e] = T::from_f64(val);
                val += step;
            }
        });
    });
    Ok(out)
}
