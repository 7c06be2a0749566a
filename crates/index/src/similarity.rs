use std::cmp::Ordering;

use crate::IndexError;

/// Chunk size for the unrolled dot/norm loops.
const SIMD_CHUNK_SIZE: usize = 32;

/// Noise floor applied when the caller does not pick one.
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.1;

/// A candidate that survived ranking, addressed by its position in the
/// sequence handed to [`rank`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked {
    pub position: usize,
    pub similarity: f32,
}

/// Cosine similarity between two equal-length vectors.
///
/// A zero-magnitude vector carries no direction, so any comparison involving
/// one scores `0.0`. Vectors of different length are rejected, never coerced.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, IndexError> {
    if a.len() != b.len() {
        return Err(IndexError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
            context: "similarity operands".into(),
        });
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    let mut a_chunks = a.chunks_exact(SIMD_CHUNK_SIZE);
    let mut b_chunks = b.chunks_exact(SIMD_CHUNK_SIZE);
    for (ca, cb) in a_chunks.by_ref().zip(b_chunks.by_ref()) {
        let (d, na, nb) = accumulate_chunk(ca, cb);
        dot += d;
        norm_a += na;
        norm_b += nb;
    }
    let (d, na, nb) = accumulate_chunk(a_chunks.remainder(), b_chunks.remainder());
    dot += d;
    norm_a += na;
    norm_b += nb;

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}

#[inline(always)]
fn accumulate_chunk(a: &[f32], b: &[f32]) -> (f32, f32, f32) {
    a.iter()
        .zip(b.iter())
        .fold((0.0, 0.0, 0.0), |(dot, na, nb), (&x, &y)| {
            (dot + x * y, na + x * x, nb + y * y)
        })
}

/// Scores every candidate against `query`, drops anything below
/// `min_similarity`, and keeps the best `top_k` in descending order.
///
/// Ties keep their input order. The scan is linear in the number of
/// candidates; collections here hold hundreds of documents, not millions.
pub fn rank<'a, I>(
    query: &[f32],
    candidates: I,
    top_k: usize,
    min_similarity: f32,
) -> Result<Vec<Ranked>, IndexError>
where
    I: IntoIterator<Item = (usize, &'a [f32])>,
{
    if top_k == 0 {
        return Ok(Vec::new());
    }

    let mut scored = Vec::new();
    for (position, embedding) in candidates {
        let similarity = cosine_similarity(query, embedding)?;
        if similarity >= min_similarity {
            scored.push(Ranked {
                position,
                similarity,
            });
        }
    }

    // `sort_by` is stable, which is what keeps ties in collection order.
    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
    });
    scored.truncate(top_k);
    Ok(scored)
}
