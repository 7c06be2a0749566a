use std::fs;
use std::path::Path;

use fxhash::FxHashMap;
use tokenizers::{Tokenizer, TruncationParams};

use crate::assets::TokenizerSource;
use crate::SemanticError;

const PAD_ID: i64 = 0;
const UNK_ID: i64 = 100;
const CLS_ID: i64 = 101;
const SEP_ID: i64 = 102;
/// BERT-base vocabulary size; hashed ids stay inside it.
const HASHED_VOCAB_SIZE: u64 = 30_522;
/// Hashed ids start past the reserved/special region.
const HASHED_ID_OFFSET: u64 = 1_000;

/// Token ids and attention mask, both exactly `max_len` long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EncodedText {
    pub(crate) ids: Vec<i64>,
    pub(crate) mask: Vec<i64>,
}

pub(crate) enum QueryTokenizer {
    HuggingFace(Box<Tokenizer>),
    WordLevel(WordTokenizer),
}

impl QueryTokenizer {
    /// `max_len` caps every encoding, boundary markers included.
    pub(crate) fn load(source: &TokenizerSource, max_len: usize) -> Result<Self, SemanticError> {
        match source {
            TokenizerSource::Json(path) => {
                let tokenizer_err =
                    |e: tokenizers::Error| SemanticError::Tokenizer(format!("{}: {e}", path.display()));
                let mut tokenizer = Tokenizer::from_file(path).map_err(tokenizer_err)?;
                // Padding is applied here with a zero mask, never by the tokenizer.
                tokenizer.with_padding(None);
                tokenizer
                    .with_truncation(Some(TruncationParams {
                        max_length: max_len,
                        ..Default::default()
                    }))
                    .map_err(tokenizer_err)?;
                Ok(QueryTokenizer::HuggingFace(Box::new(tokenizer)))
            }
            TokenizerSource::Vocab(path) => {
                WordTokenizer::from_vocab_file(path).map(QueryTokenizer::WordLevel)
            }
            TokenizerSource::Hashed => Ok(QueryTokenizer::WordLevel(WordTokenizer::hashed())),
        }
    }

    /// Encodes `text` with boundary markers, truncated and padded to `max_len`.
    pub(crate) fn encode(&self, text: &str, max_len: usize) -> Result<EncodedText, SemanticError> {
        let (mut ids, mut mask) = match self {
            QueryTokenizer::HuggingFace(tokenizer) => {
                let encoding = tokenizer
                    .encode(text, true)
                    .map_err(|e| SemanticError::Tokenizer(e.to_string()))?;
                let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
                let mask: Vec<i64> = encoding
                    .get_attention_mask()
                    .iter()
                    .map(|&m| m as i64)
                    .collect();
                (ids, mask)
            }
            QueryTokenizer::WordLevel(tokenizer) => {
                let ids = tokenizer.ids(text, max_len);
                let mask = vec![1i64; ids.len()];
                (ids, mask)
            }
        };
        ids.truncate(max_len);
        mask.truncate(max_len);
        Ok(pad(ids, mask, max_len))
    }
}

fn pad(mut ids: Vec<i64>, mut mask: Vec<i64>, max_len: usize) -> EncodedText {
    ids.resize(max_len, PAD_ID);
    mask.resize(max_len, 0);
    EncodedText { ids, mask }
}

/// Lower-casing word-level tokenizer used when the model ships without a
/// `tokenizer.json`.
pub(crate) struct WordTokenizer {
    vocab: Option<FxHashMap<String, i64>>,
    unk_id: i64,
    cls_id: i64,
    sep_id: i64,
}

impl WordTokenizer {
    pub(crate) fn from_vocab_file(path: &Path) -> Result<Self, SemanticError> {
        let content = fs::read_to_string(path)?;
        let vocab: FxHashMap<String, i64> = content
            .lines()
            .enumerate()
            .map(|(idx, token)| (token.trim_end().to_string(), idx as i64))
            .collect();
        if vocab.is_empty() {
            return Err(SemanticError::Tokenizer(format!(
                "vocabulary {} is empty",
                path.display()
            )));
        }
        let lookup = |token: &str, fallback: i64| vocab.get(token).copied().unwrap_or(fallback);
        let unk_id = lookup("[UNK]", UNK_ID);
        let cls_id = lookup("[CLS]", CLS_ID);
        let sep_id = lookup("[SEP]", SEP_ID);
        Ok(Self {
            vocab: Some(vocab),
            unk_id,
            cls_id,
            sep_id,
        })
    }

    pub(crate) fn hashed() -> Self {
        Self {
            vocab: None,
            unk_id: UNK_ID,
            cls_id: CLS_ID,
            sep_id: SEP_ID,
        }
    }

    fn token_id(&self, word: &str) -> i64 {
        match &self.vocab {
            Some(vocab) => vocab.get(word).copied().unwrap_or(self.unk_id),
            None => {
                let bucket = fxhash::hash64(word) % (HASHED_VOCAB_SIZE - HASHED_ID_OFFSET);
                (HASHED_ID_OFFSET + bucket) as i64
            }
        }
    }

    /// `[CLS] words... [SEP]`, never longer than `max_len`.
    fn ids(&self, text: &str, max_len: usize) -> Vec<i64> {
        let room = max_len.saturating_sub(2);
        let mut ids = Vec::with_capacity(room + 2);
        ids.push(self.cls_id);
        ids.extend(split_words(text).take(room).map(|w| self.token_id(&w)));
        ids.push(self.sep_id);
        ids
    }
}

/// Lower-cased words; punctuation marks become tokens of their own.
fn split_words(text: &str) -> impl Iterator<Item = String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            current.extend(ch.to_lowercase());
            continue;
        }
        if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        if !ch.is_whitespace() {
            tokens.push(ch.to_string());
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens.into_iter()
}
