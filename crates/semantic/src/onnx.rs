use onnxruntime::ndarray::{Array, Array2};
use onnxruntime::session::Session;

use crate::normalize::mean_pool_masked;
use crate::tokenize::EncodedText;
use crate::SemanticError;

/// One forward pass for a single encoded text, reduced to one vector.
///
/// Token-level outputs (`[1, seq, hidden]`) are mean-pooled over the live
/// positions of the attention mask; models that already emit a pooled
/// `[1, hidden]` sentence vector are passed through.
pub(crate) fn embed_encoded(
    session: &mut Session<'static>,
    encoded: &EncodedText,
) -> Result<Vec<f32>, SemanticError> {
    let (input_ids, attn_mask) = build_input_arrays(encoded)?;
    let (shape, flat) = execute_session(session, input_ids, attn_mask)?;

    match shape.as_slice() {
        [1, seq_len, hidden] if *seq_len == encoded.mask.len() => {
            mean_pool_masked(&flat, &encoded.mask, *hidden)
        }
        [1, _hidden] => Ok(flat),
        other => Err(SemanticError::Inference(format!(
            "unexpected model output shape {other:?} for {} tokens",
            encoded.mask.len()
        ))),
    }
}

fn build_input_arrays(encoded: &EncodedText) -> Result<(Array2<i64>, Array2<i64>), SemanticError> {
    if encoded.ids.len() != encoded.mask.len() {
        return Err(SemanticError::Inference(
            "tokenizer produced mismatched id/mask lengths".into(),
        ));
    }
    let seq_len = encoded.ids.len().max(1);
    let input_ids = Array::from_shape_vec((1, seq_len), encoded.ids.clone())
        .map_err(|e| SemanticError::Inference(e.to_string()))?;
    let attn_mask = Array::from_shape_vec((1, seq_len), encoded.mask.clone())
        .map_err(|e| SemanticError::Inference(e.to_string()))?;
    Ok((input_ids, attn_mask))
}

fn execute_session(
    session: &mut Session<'static>,
    input_ids: Array2<i64>,
    attn_mask: Array2<i64>,
) -> Result<(Vec<usize>, Vec<f32>), SemanticError> {
    let (batch, seq_len) = input_ids.dim();
    let mut runtime_inputs = Vec::with_capacity(session.inputs.len());
    let mut input_ids_tensor = Some(input_ids);
    let mut attn_mask_tensor = Some(attn_mask);

    for input in &session.inputs {
        match input.name.as_str() {
            "input_ids" => {
                let tensor = input_ids_tensor.take().ok_or_else(|| {
                    SemanticError::InvalidConfig(
                        "model requested `input_ids` multiple times".into(),
                    )
                })?;
                runtime_inputs.push(tensor.into_dyn());
            }
            "attention_mask" => {
                let tensor = attn_mask_tensor.take().ok_or_else(|| {
                    SemanticError::InvalidConfig(
                        "model requested `attention_mask` multiple times".into(),
                    )
                })?;
                runtime_inputs.push(tensor.into_dyn());
            }
            "token_type_ids" => {
                runtime_inputs.push(Array::from_elem((batch, seq_len), 0_i64).into_dyn());
            }
            other => {
                return Err(SemanticError::Inference(format!(
                    "unsupported model input '{other}'"
                )))
            }
        }
    }

    if runtime_inputs.is_empty() {
        return Err(SemanticError::Inference(
            "model did not declare any inputs".into(),
        ));
    }

    let outputs = session
        .run::<i64, f32, _>(runtime_inputs)
        .map_err(|e| SemanticError::Inference(e.to_string()))?;
    let output_tensor = outputs
        .into_iter()
        .next()
        .ok_or_else(|| SemanticError::Inference("model returned no outputs".into()))?;

    let shape = output_tensor.shape().to_vec();
    let flat: Vec<f32> = output_tensor.iter().copied().collect();
    Ok((shape, flat))
}
