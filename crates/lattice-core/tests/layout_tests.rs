use lattice_core::{
    concatenate, contiguous, pad, reshape, shape, slice, slice_update, transpose, DType, Encoder,
    Shape, View,
};
use proptest::prelude::*;
use test_strategy::proptest;

fn iota(shape: Shape) -> View {
    let data: Vec<i32> = (0..shape.numel() as i32).collect();
    View::from_data(&data, shape).unwrap()
}

fn sliced_dim(dim: usize, start: usize, step: usize) -> usize {
    (dim - start).div_ceil(step)
}

#[proptest(cases = 64)]
fn slice_matches_an_index_walk(
    #[strategy(1usize..=6)] rows: usize,
    #[strategy(1usize..=6)] cols: usize,
    #[strategy(0usize..6)] r0: usize,
    #[strategy(0usize..6)] c0: usize,
    #[strategy(1usize..=3)] rs: usize,
    #[strategy(1usize..=3)] cs: usize,
) {
    prop_assume!(r0 < rows && c0 < cols);
    let a = iota(shape![rows, cols]);
    let s = slice(
        &a,
        &[r0 as i64, c0 as i64],
        &[rows as i64, cols as i64],
        &[rs as i64, cs as i64],
    )
    .unwrap();

    let mut expected = Vec::new();
    for i in 0..sliced_dim(rows, r0, rs) {
        for j in 0..sliced_dim(cols, c0, cs) {
            expected.push(((r0 + i * rs) * cols + (c0 + j * cs)) as i32);
        }
    }
    prop_assert_eq!(s.to_vec::<i32>(), expected);
    // Zero-copy: the slice aliases the input storage.
    prop_assert!(s.same_buffer(&a));
}

#[proptest(cases = 64)]
fn densifying_a_transposed_slice_matches_the_walk(
    #[strategy(1usize..=5)] d0: usize,
    #[strategy(1usize..=5)] d1: usize,
    #[strategy(1usize..=5)] d2: usize,
) {
    let a = iota(shape![d0, d1, d2]);
    let t = transpose(&a, &[2, 0, 1]).unwrap();
    let mut enc = Encoder::new();
    let dense = contiguous(&t, false, &mut enc).unwrap();

    let mut expected = Vec::new();
    for k in 0..d2 {
        for i in 0..d0 {
            for j in 0..d1 {
                expected.push((i * d1 * d2 + j * d2 + k) as i32);
            }
        }
    }
    prop_assert_eq!(dense.to_vec::<i32>(), expected);
    prop_assert!(dense.flags().row_contiguous);
}

#[proptest(cases = 64)]
fn reshape_never_reorders_elements(
    #[strategy(1usize..=4)] d0: usize,
    #[strategy(1usize..=4)] d1: usize,
    #[strategy(1usize..=4)] d2: usize,
) {
    let a = iota(shape![d0, d1, d2]);
    let mut enc = Encoder::new();
    let flat = reshape(&a, shape![d0 * d1 * d2], &mut enc).unwrap();
    prop_assert_eq!(flat.to_vec::<i32>(), a.to_vec::<i32>());
    prop_assert!(flat.same_buffer(&a));

    let swapped = reshape(&a, shape![d2 * d1, d0], &mut enc).unwrap();
    prop_assert_eq!(swapped.to_vec::<i32>(), a.to_vec::<i32>());
}

#[proptest(cases = 32)]
fn pad_places_the_interior_exactly(
    #[strategy(1usize..=4)] rows: usize,
    #[strategy(1usize..=4)] cols: usize,
    #[strategy(0usize..=2)] lo: usize,
    #[strategy(0usize..=2)] hi: usize,
) {
    let a = iota(shape![rows, cols]);
    let fill = View::from_data(&[-1i32], shape![]).unwrap();
    let mut enc = Encoder::new();
    let p = pad(&a, &[0, 1], &[lo, lo], &[hi, hi], &fill, &mut enc).unwrap();

    let (out_r, out_c) = (rows + lo + hi, cols + lo + hi);
    let got = p.to_vec::<i32>();
    for i in 0..out_r {
        for j in 0..out_c {
            let inside =
                i >= lo && i < lo + rows && j >= lo && j < lo + cols;
            let expected = if inside {
                ((i - lo) * cols + (j - lo)) as i32
            } else {
                -1
            };
            prop_assert_eq!(got[i * out_c + j], expected);
        }
    }
}

#[proptest(cases = 32)]
fn concat_matches_the_walk(
    #[strategy(1usize..=4)] rows_a: usize,
    #[strategy(1usize..=4)] rows_b: usize,
    #[strategy(1usize..=4)] cols: usize,
) {
    let a = iota(shape![rows_a, cols]);
    let b_data: Vec<i32> = (0..(rows_b * cols) as i32).map(|x| -x - 1).collect();
    let b = View::from_data(&b_data, shape![rows_b, cols]).unwrap();
    let mut enc = Encoder::new();
    let out = concatenate(&[a.clone(), b], 0, &mut enc).unwrap();

    let mut expected = a.to_vec::<i32>();
    expected.extend(&b_data);
    prop_assert_eq!(out.to_vec::<i32>(), expected);
}

#[proptest(cases = 32)]
fn slice_update_touches_only_the_region(
    #[strategy(2usize..=5)] rows: usize,
    #[strategy(2usize..=5)] cols: usize,
    #[strategy(0usize..5)] r0: usize,
    #[strategy(0usize..5)] c0: usize,
) {
    prop_assume!(r0 < rows && c0 < cols);
    let a = iota(shape![rows, cols]);
    let patch_shape = shape![rows - r0, cols - c0];
    let patch_data: Vec<i32> = (0..patch_shape.numel() as i32).map(|x| 100 + x).collect();
    let patch = View::from_data(&patch_data, patch_shape).unwrap();
    let mut enc = Encoder::new();
    let pin = a.clone();
    let out = slice_update(
        &a,
        &patch,
        &[r0 as i64, c0 as i64],
        &[rows as i64, cols as i64],
        &[1, 1],
        &mut enc,
    )
    .unwrap();

    let got = out.to_vec::<i32>();
    for i in 0..rows {
        for j in 0..cols {
            let expected = if i >= r0 && j >= c0 {
                100 + ((i - r0) * (cols - c0) + (j - c0)) as i32
            } else {
                (i * cols + j) as i32
            };
            prop_assert_eq!(got[i * cols + j], expected);
        }
    }
    // The original is untouched.
    prop_assert_eq!(
        pin.to_vec::<i32>(),
        (0..(rows * cols) as i32).collect::<Vec<_>>()
    );
}

#[test]
fn strided_slice_of_a_square() {
    let _ = env_logger::builder().is_test(true).try_init();
    // Rows 1..3 and every other column of a [4, 4]: shape [2, 2],
    // strides [4, 2], offset 4.
    let a = iota(shape![4, 4]);
    let s = slice(&a, &[1, 0], &[3, 4], &[1, 2]).unwrap();
    assert_eq!(s.shape(), &shape![2, 2]);
    assert_eq!(s.strides().to_vec(), vec![4, 2]);
    assert_eq!(s.offset(), 4);
    assert_eq!(s.dt(), DType::I32);
    assert!(!s.flags().contiguous);
}
