use crate::{DType, Encoder, InvariantError, OperationError, Shape, View};

/// Fills a view with counter-based random bits, one independent run per key.
///
/// `keys` holds 32-bit key pairs in its last dimension; the output is split
/// into `keys.numel() / 2` equal byte runs, each generated by walking
/// `hash(key, counter)` over an incrementing counter pair. Each hash yields
/// two 32-bit words placed at the counter positions, so a run's bytes depend
/// only on its key, never on the run's position. Tail words truncate to the
/// run length.
pub fn random_bits<H>(
    keys: &View,
    out_shape: Shape,
    dt: DType,
    hash: H,
    enc: &mut Encoder,
) -> Result<View, OperationError>
where
    H: Fn([u32; 2], [u32; 2]) -> [u32; 2],
{
    if keys.dt() != DType::U32 {
        return Err(InvariantError::DTypeMismatch {
            expected: DType::U32,
            actual: keys.dt(),
        }
        .into());
    }
    // Bool storage promises 0/1 bytes, which raw bits would violate. Any
    // other dtype only contributes its width to the run length.
    if dt == DType::Bool {
        return Err(InvariantError::UnsupportedDType(dt).into());
    }
    if keys.rank() == 0 || keys.shape()[keys.rank() - 1] != 2 {
        let last = if keys.rank() == 0 {
            1
        } else {
            keys.shape()[keys.rank() - 1]
        };
        return Err(InvariantError::ShapeMismatch {
            axis: keys.rank().saturating_sub(1),
            a: last,
            b: 2,
        }
        .into());
    }

    let num_keys = keys.numel() / 2;
    if num_keys == 0 {
        return Err(InvariantError::InputArity {
            expected: 1,
            actual: 0,
        }
        .into());
    }
    let mut out = View::new(out_shape, dt);
    if out.numel() == 0 {
        return Ok(out);
    }
    if out.numel() % num_keys != 0 {
        return Err(InvariantError::ShapeMismatch {
            axis: 0,
            a: out.numel(),
            b: num_keys,
        }
        .into());
    }
    let bytes_per_key = (out.numel() / num_keys) * out.itemsize();
    out.allocate_data()?;

    enc.register_input(keys);
    enc.register_output(&out);
    let out_ref = &out;
    enc.dispatch(|| {
        let kdata = keys.data::<u32>();
        let obytes = unsafe { out_ref.data_mut::<u8>() };
        let out_skip = (bytes_per_key + 3) / 4;
        let half = out_skip / 2;
        let even = out_skip % 2 == 0;

        for k in 0..num_keys {
            let run = &mut obytes[k * bytes_per_key..(k + 1) * bytes_per_key];
            let key = [key_word(keys, kdata, 2 * k), key_word(keys, kdata, 2 * k + 1)];

            let mut count = [0u32, (half + usize::from(!even)) as u32];
            while (count[0] as usize) + 1 < half {
                let bits = hash(key, count);
                write_word(run, count[0] as usize, bits[0]);
                write_word(run, count[1] as usize, bits[1]);
                count[0] += 1;
                count[1] += 1;
            }
            if (count[0] as usize) < half {
                let bits = hash(key, count);
                write_word(run, count[0] as usize, bits[0]);
                write_word(run, count[1] as usize, bits[1]);
                count[0] += 1;
            }
            if !even {
                count[1] = 0;
                let bits = hash(key, count);
                write_word(run, half, bits[0]);
            }
        }
    });
    Ok(out)
}

fn key_word(keys: &View, kdata: &[u32], elem: usize) -> u32 {
    let loc =
        keys.offset() as i64 + crate::elem_to_loc(elem, keys.shape(), keys.strides());
    kdata[loc as usize]
}

/// Writes word `w` of a run, truncating at the run's end.
fn write_word(run: &mut [u8], w: usize, word: u32) {
    let start = 4 * w;
    let n = (run.len() - start).min(4);
    run[start..start + n].copy_from_slice(&word.to_le_bytes()[..n]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape;

    // Cheap stand-in mix with full avalanche over both words.
    fn mix(key: [u32; 2], count: [u32; 2]) -> [u32; 2] {
        let mut x = key[0].wrapping_mul(0x9E37_79B9) ^ count[0].wrapping_mul(0x85EB_CA6B);
        let mut y = key[1].wrapping_mul(0xC2B2_AE35) ^ count[1].wrapping_mul(0x27D4_EB2F);
        x ^= x >> 15;
        y ^= y >> 13;
        x = x.wrapping_mul(0x2545_F491);
        y = y.wrapping_mul(0x8513_57BD);
        [x ^ (y >> 16), y ^ (x >> 16)]
    }

    #[test]
    fn deterministic_per_key() {
        let keys = View::from_data(&[1u32, 2], shape![2]).unwrap();
        let mut enc = Encoder::new();
        let a = random_bits(&keys, shape![16], DType::U8, mix, &mut enc).unwrap();
        let b = random_bits(&keys, shape![16], DType::U8, mix, &mut enc).unwrap();
        assert_eq!(a.to_vec::<u8>(), b.to_vec::<u8>());
    }

    #[test]
    fn distinct_keys_give_distinct_runs() {
        let keys = View::from_data(&[1u32, 2, 3, 4], shape![2, 2]).unwrap();
        let mut enc = Encoder::new();
        let out = random_bits(&keys, shape![8], DType::U32, mix, &mut enc).unwrap();
        let v = out.to_vec::<u32>();
        assert_ne!(v[..4], v[4..]);
    }

    #[test]
    fn runs_depend_only_on_their_key() {
        // The second run of a two-key draw equals a one-key draw with that key.
        let both = View::from_data(&[9u32, 8, 7, 6], shape![2, 2]).unwrap();
        let second = View::from_data(&[7u32, 6], shape![2]).unwrap();
        let mut enc = Encoder::new();
        let pair = random_bits(&both, shape![12], DType::U16, mix, &mut enc).unwrap();
        let single = random_bits(&second, shape![6], DType::U16, mix, &mut enc).unwrap();
        assert_eq!(pair.to_vec::<u16>()[6..], single.to_vec::<u16>()[..]);
    }

    #[test]
    fn odd_and_partial_word_runs() {
        let keys = View::from_data(&[5u32, 6], shape![2]).unwrap();
        let mut enc = Encoder::new();
        // 6 bytes per run: one full word, one truncated.
        let six = random_bits(&keys, shape![6], DType::U16, mix, &mut enc).unwrap();
        assert_eq!(six.to_vec::<u16>().len(), 6);
        // 2 bytes per run: a single truncated half-word.
        let two = random_bits(&keys, shape![4], DType::U8, mix, &mut enc).unwrap();
        assert_eq!(two.to_vec::<u8>().len(), 4);
        // 12 bytes per run: the odd-word tail path.
        let twelve = random_bits(&keys, shape![6], DType::U32, mix, &mut enc).unwrap();
        assert_eq!(twelve.to_vec::<u32>().len(), 6);
    }

    #[test]
    fn validations() {
        let mut enc = Encoder::new();
        let bad_dt = View::from_data(&[1i32, 2], shape![2]).unwrap();
        assert!(random_bits(&bad_dt, shape![4], DType::U8, mix, &mut enc).is_err());
        let bad_shape = View::from_data(&[1u32, 2, 3], shape![3]).unwrap();
        assert!(random_bits(&bad_shape, shape![4], DType::U8, mix, &mut enc).is_err());
        let keys = View::from_data(&[1u32, 2], shape![2]).unwrap();
        assert!(random_bits(&keys, shape![4], DType::Bool, mix, &mut enc).is_err());
        // Width is the only thing a non-bool dtype contributes.
        let f = random_bits(&keys, shape![4], DType::F32, mix, &mut enc).unwrap();
        assert_eq!(f.nbytes(), 16);
    }
}
