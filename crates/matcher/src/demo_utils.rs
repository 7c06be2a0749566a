//! Deterministic fixtures for tests and demos: a keyword-count embedder and
//! helpers that write collection files it can search.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use index::DocumentKind;
use semantic::{Embedder, EmbeddingMethod, SemanticError};
use serde_json::json;

const CONCEPTS: [&[&str]; 4] = [
    &[
        "training", "train", "trainee", "trainees", "teach", "teaching", "method", "methods",
        "instruction", "learning", "mentor", "mentoring", "apprenticeship", "coaching",
    ],
    &["solar", "panel", "panels", "roof", "install", "installation", "inverter"],
    &["budget", "cost", "costs", "funding", "grant", "price"],
    &["safety", "harness", "fall", "ladder", "hazard"],
];

/// Width of [`keyword_vector`] output.
pub const KEYWORD_DIMENSION: usize = CONCEPTS.len();

/// One axis per concept group, counting matching words, unit length.
/// Text with no known word maps to the zero vector.
pub fn keyword_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; KEYWORD_DIMENSION];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        for (axis, group) in CONCEPTS.iter().enumerate() {
            if group.contains(&word.as_str()) {
                vector[axis] += 1.0;
            }
        }
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
    vector
}

/// Stands in for the bundled model.
#[derive(Debug, Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn method(&self) -> EmbeddingMethod {
        EmbeddingMethod::Local
    }

    fn dimension(&self) -> usize {
        KEYWORD_DIMENSION
    }

    fn model_name(&self) -> &str {
        "keyword"
    }

    fn normalized(&self) -> bool {
        true
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(keyword_vector(text))
    }
}

/// Writes `docs` (id, text) as the `kind` file for `suffix`, embedding each
/// text with [`keyword_vector`].
pub fn write_keyword_collection(
    root: &Path,
    suffix: &str,
    kind: DocumentKind,
    docs: &[(&str, &str)],
) -> io::Result<()> {
    let entries: Vec<(&str, &str, Vec<f32>)> = docs
        .iter()
        .map(|(id, text)| (*id, *text, keyword_vector(text)))
        .collect();
    write_collection(root, suffix, kind, &entries)
}

/// Writes `docs` (id, text, embedding) as the `kind` file for `suffix`.
pub fn write_collection(
    root: &Path,
    suffix: &str,
    kind: DocumentKind,
    docs: &[(&str, &str, Vec<f32>)],
) -> io::Result<()> {
    let entries: Vec<_> = docs
        .iter()
        .map(|(id, text, embedding)| {
            json!({
                "id": id,
                "text": text,
                "embedding": embedding,
                "metadata": {},
                "type": kind,
            })
        })
        .collect();
    let path = root.join(format!("{}{suffix}.json", kind.file_stem()));
    fs::write(path, serde_json::to_vec_pretty(&entries)?)
}
