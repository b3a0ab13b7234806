use crate::{rvec, RVec, Shape};

#[derive(Clone, PartialEq, Eq, Default, Hash)]
pub struct Strides(RVec<isize>);

impl Strides {
    pub fn new(strides: RVec<isize>) -> Self {
        Self(strides)
    }

    pub fn zeros(rank: usize) -> Self {
        Self(rvec![0; rank])
    }

    pub fn to_vec(&self) -> Vec<isize> {
        self.0.to_vec()
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &isize> {
        self.0.iter()
    }

    pub fn insert(&mut self, index: usize, stride: isize) {
        self.0.insert(index, stride);
    }

    pub fn remove(&mut self, index: usize) -> isize {
        self.0.remove(index)
    }

    pub fn last(&self) -> Option<&isize> {
        self.0.last()
    }
}

impl std::fmt::Debug for Strides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut repr = format!("[{}", self.0.first().unwrap_or(&0));
        for dim in self.0.iter().skip(1) {
            repr.push_str(&format!("x{}", dim));
        }
        write!(f, "{}]", repr)
    }
}

impl From<&Shape> for Strides {
    fn from(shape: &Shape) -> Self {
        let mut strides = rvec![];
        let mut stride = 1;
        for size in shape.inner().iter().rev() {
            strides.push(stride);
            stride *= *size as isize;
        }
        strides.reverse();
        Self(strides)
    }
}

impl From<Vec<isize>> for Strides {
    fn from(strides: Vec<isize>) -> Self {
        Self(strides.into())
    }
}

impl From<RVec<isize>> for Strides {
    fn from(strides: RVec<isize>) -> Self {
        Self(strides)
    }
}

impl std::ops::Index<usize> for Strides {
    type Output = isize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl std::ops::IndexMut<usize> for Strides {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

/// Maps a linear logical index to an element offset for the given layout.
///
/// The linear index is decomposed into per-dimension coordinates in row-major
/// order (fastest varying dimension last) and each coordinate is weighted by
/// its stride. Every piece of addressing in the crate goes through this.
#[inline]
pub fn elem_to_loc(elem: usize, shape: &Shape, strides: &Strides) -> i64 {
    let mut loc = 0i64;
    let mut rem = elem;
    for i in (0..shape.rank()).rev() {
        let dim = shape[i];
        if dim == 0 {
            return 0;
        }
        loc += (rem % dim) as i64 * strides[i] as i64;
        rem /= dim;
    }
    loc
}

/// Derives contiguity claims for a shape/strides pair.
///
/// Returns the element count ignoring broadcast (stride <= 0) dimensions,
/// and whether the layout is row and/or column contiguous. Size-1 dimensions
/// never disqualify either claim.
pub fn check_contiguity(shape: &Shape, strides: &Strides) -> (i64, bool, bool) {
    let rank = shape.rank();
    let mut no_broadcast_size = 1i64;
    let mut f_stride = 1i64;
    let mut b_stride = 1i64;
    let mut row_contiguous = true;
    let mut col_contiguous = true;

    for i in 0..rank {
        let ri = rank - 1 - i;
        col_contiguous &= strides[i] as i64 == f_stride || shape[i] == 1;
        row_contiguous &= strides[ri] as i64 == b_stride || shape[ri] == 1;
        f_stride *= shape[i] as i64;
        b_stride *= shape[ri] as i64;
        if strides[i] > 0 {
            no_broadcast_size *= shape[i] as i64;
        }
    }

    (no_broadcast_size, row_contiguous, col_contiguous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape;

    #[test]
    fn row_major_strides() {
        let shape = shape![2, 3, 4];
        let strides = Strides::from(&shape);
        assert_eq!(strides.to_vec(), vec![12, 4, 1]);
    }

    #[test]
    fn elem_to_loc_row_major() {
        let shape = shape![2, 3];
        let strides = Strides::from(&shape);
        for e in 0..6 {
            assert_eq!(elem_to_loc(e, &shape, &strides), e as i64);
        }
    }

    #[test]
    fn elem_to_loc_permuted() {
        // Transposed [3, 2] view over a row-major [2, 3] buffer.
        let shape = shape![3, 2];
        let strides = Strides::from(vec![1, 3]);
        let locs: Vec<i64> = (0..6).map(|e| elem_to_loc(e, &shape, &strides)).collect();
        assert_eq!(locs, vec![0, 3, 1, 4, 2, 5]);
    }

    #[test]
    fn elem_to_loc_negative_strides() {
        // Reversed vector of length 4: offset points at the last element.
        let shape = shape![4];
        let strides = Strides::from(vec![-1]);
        let locs: Vec<i64> = (0..4).map(|e| elem_to_loc(e, &shape, &strides)).collect();
        assert_eq!(locs, vec![0, -1, -2, -3]);
    }

    #[test]
    fn contiguity_claims() {
        let shape = shape![2, 3];
        let row = Strides::from(&shape);
        let (n, r, c) = check_contiguity(&shape, &row);
        assert_eq!(n, 6);
        assert!(r);
        assert!(!c);

        let col = Strides::from(vec![1, 2]);
        let (_, r, c) = check_contiguity(&shape, &col);
        assert!(!r);
        assert!(c);

        // Broadcast dimension is ignored by the no-broadcast size.
        let bcast = Strides::from(vec![0, 1]);
        let (n, r, _) = check_contiguity(&shape, &bcast);
        assert_eq!(n, 3);
        assert!(!r);

        // Vectors are both row and column contiguous.
        let v = shape![5];
        let (_, r, c) = check_contiguity(&v, &Strides::from(&v));
        assert!(r && c);
    }
}
