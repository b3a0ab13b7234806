use crate::{DType, Shape};

/// Contract violations. These are invalid-argument failures: they abort the
/// current operator and are never retried.
#[derive(Debug, thiserror::Error)]
pub enum InvariantError {
    #[error("Unsupported dtype {0:?}.")]
    UnsupportedDType(DType),
    #[error("DType mismatch, expected {expected:?}, got {actual:?}.")]
    DTypeMismatch { expected: DType, actual: DType },
    #[error("Shape mismatch at axis {axis}, {a} != {b}.")]
    ShapeMismatch { axis: usize, a: usize, b: usize },
    #[error("Rank mismatch, expected {expected}, got {actual}.")]
    RankMismatch { expected: usize, actual: usize },
    #[error("Cannot reshape {from:?} into {to:?}.")]
    InvalidReshape { from: Shape, to: Shape },
    #[error("Cannot reinterpret {from:?} ({from_dt:?}) as {to_dt:?}.")]
    InvalidBitcast {
        from: Shape,
        from_dt: DType,
        to_dt: DType,
    },
    #[error("Axis {axis} out of range for rank {rank}.")]
    AxisOutOfRange { axis: isize, rank: usize },
    #[error("Duplicate axes in permutation.")]
    DuplicateAxes,
    #[error("Strided view requires a row contiguous input.")]
    NotRowContiguous,
    #[error("Wrong input arity, expected {expected}, got {actual}.")]
    InputArity { expected: usize, actual: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Allocation of {0} bytes failed.")]
    Allocation(usize),
    #[error("View has no storage attached.")]
    NoStorage,
}

#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error(transparent)]
    InvariantError(#[from] InvariantError),
    #[error(transparent)]
    StorageError(#[from] StorageError),
}
