use crate::SemanticError;

/// In-place L2 normalization. A zero vector is left untouched.
pub(crate) fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}

/// Averages per-token vectors over the positions whose mask is non-zero.
///
/// `token_embeddings` is a row-major `[seq_len, hidden]` block. Padding rows
/// contribute nothing; a mask with no live positions yields the zero vector.
pub(crate) fn mean_pool_masked(
    token_embeddings: &[f32],
    mask: &[i64],
    hidden: usize,
) -> Result<Vec<f32>, SemanticError> {
    if hidden == 0 || token_embeddings.len() != mask.len() * hidden {
        return Err(SemanticError::Inference(format!(
            "token output of {} values does not match {} positions x {hidden}",
            token_embeddings.len(),
            mask.len()
        )));
    }

    let mut pooled = vec![0.0f32; hidden];
    let mut live = 0usize;
    for (row, &m) in token_embeddings.chunks_exact(hidden).zip(mask) {
        if m == 0 {
            continue;
        }
        live += 1;
        for (acc, &val) in pooled.iter_mut().zip(row) {
            *acc += val;
        }
    }

    if live > 0 {
        let inv = (live as f32).recip();
        for val in &mut pooled {
            *val *= inv;
        }
    }
    Ok(pooled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn l2_normalize_three_four_five() {
        let mut v = vec![3.0f32, 4.0];
        l2_normalize_in_place(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_yields_unit_length() {
        let mut v: Vec<f32> = (0..384).map(|i| (i as f32 * 0.13).sin()).collect();
        l2_normalize_in_place(&mut v);
        assert!((norm(&v) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn l2_normalize_zero_vector_stays_zero() {
        let mut v = vec![0.0f32; 4];
        l2_normalize_in_place(&mut v);
        assert_eq!(v, vec![0.0; 4]);
    }

    #[test]
    fn l2_normalize_is_idempotent() {
        let mut v = vec![-1.0f32, 2.0, -3.0, 4.0];
        l2_normalize_in_place(&mut v);
        let once = v.clone();
        l2_normalize_in_place(&mut v);
        for (a, b) in v.iter().zip(&once) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn mean_pool_ignores_padding_rows() {
        // Three positions, hidden = 2; the last one is padding with a huge value.
        let tokens = [1.0, 2.0, 3.0, 4.0, 100.0, 100.0];
        let pooled = mean_pool_masked(&tokens, &[1, 1, 0], 2).unwrap();
        assert_eq!(pooled, vec![2.0, 3.0]);
    }

    #[test]
    fn mean_pool_all_masked_is_zero() {
        let tokens = [1.0, 2.0, 3.0, 4.0];
        let pooled = mean_pool_masked(&tokens, &[0, 0], 2).unwrap();
        assert_eq!(pooled, vec![0.0, 0.0]);
    }

    #[test]
    fn mean_pool_rejects_shape_mismatch() {
        let tokens = [1.0, 2.0, 3.0];
        assert!(mean_pool_masked(&tokens, &[1, 1], 2).is_err());
        assert!(mean_pool_masked(&tokens, &[1, 1, 1], 0).is_err());
    }
}
