mod bitcast;
mod fill;
mod random;
mod region;
mod reshape;
mod slice;
mod transform;

pub use bitcast::*;
pub use fill::*;
pub use random::*;
pub use region::*;
pub use reshape::*;
pub use slice::*;
pub use transform::*;

use crate::InvariantError;

/// Resolves a possibly negative axis against `rank`.
pub(crate) fn normalize_axis(axis: isize, rank: usize) -> Result<usize, InvariantError> {
    let resolved = if axis < 0 { axis + rank as isize } else { axis };
    if resolved < 0 || resolved as usize >= rank {
        return Err(InvariantError::AxisOutOfRange { axis, rank });
    }
    Ok(resolved as usize)
}
