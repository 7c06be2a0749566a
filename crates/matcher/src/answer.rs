use std::fmt::Write;

use index::DocumentMetadata;
use tracing::warn;

use crate::generation::TextGenerator;
use crate::types::SearchResult;

const SYSTEM_PROMPT: &str = "You answer questions about a training program using only the \
numbered sources provided. Cite sources inline as [n]. Be concise. If the sources do not \
contain the answer, say so.";

pub(crate) const NO_GENERATOR_MESSAGE: &str =
    "Answer generation needs an API key or the local server option; showing search results only.";

const NO_SOURCES_MESSAGE: &str =
    "No document was a confident match for this question, so no answer was generated.";

/// Formats one result as a numbered source block for the prompt.
pub fn format_citation(n: usize, result: &SearchResult) -> String {
    let mut out = String::new();
    match &result.metadata {
        DocumentMetadata::Insight(m) => {
            let _ = write!(out, "[{n}] Interview insight");
            if let Some(expert) = &m.expert {
                let _ = write!(out, " from {expert}");
                let affiliation: Vec<&str> = [m.role.as_deref(), m.organization.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect();
                if !affiliation.is_empty() {
                    let _ = write!(out, " ({})", affiliation.join(", "));
                }
            }
            if let Some(topic) = &m.topic {
                let _ = write!(out, " on {topic}");
            }
            let _ = write!(out, "\n{}", m.quote.as_deref().unwrap_or(&result.text));
            if let Some(source) = &m.source {
                let _ = write!(out, "\nSource: {source}");
            }
        }
        DocumentMetadata::Curriculum(m) => {
            let _ = write!(out, "[{n}] Curriculum");
            if let Some(module) = &m.module {
                let _ = write!(out, " module {module}");
            }
            if let Some(day) = m.day {
                let _ = write!(out, ", day {day}");
            }
            if let Some(theme) = &m.day_theme {
                let _ = write!(out, " ({theme})");
            }
            if let Some(activity) = &m.activity_name {
                let _ = write!(out, ": {activity}");
            }
            if let Some(duration) = &m.duration {
                let _ = write!(out, " [{duration}]");
            }
            if let Some(purpose) = &m.purpose {
                let _ = write!(out, "\nPurpose: {purpose}");
            }
            let _ = write!(out, "\n{}", result.text);
            if let Some(homework) = &m.homework {
                let _ = write!(out, "\nHomework: {homework}");
            }
        }
        DocumentMetadata::MetadataFact(m) => {
            let _ = write!(out, "[{n}] Project fact");
            if let Some(category) = &m.category {
                let _ = write!(out, " ({category})");
            }
            match (&m.label, &m.value) {
                (Some(label), Some(value)) => {
                    let _ = write!(out, "\n{label}: {value}");
                }
                _ => {
                    let _ = write!(out, "\n{}", result.text);
                }
            }
            if let Some(source) = &m.source {
                let _ = write!(out, "\nSource: {source}");
            }
        }
    }
    out
}

/// Numbered source blocks, 1-based, in rank order.
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| format_citation(i + 1, result))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Turns ranked results into a cited answer. Never fails: problems become a
/// message the caller can show next to the results.
pub struct AnswerComposer {
    generator: Option<Box<dyn TextGenerator>>,
}

impl AnswerComposer {
    pub fn new(generator: Option<Box<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    pub async fn compose(&self, question: &str, results: &[SearchResult]) -> String {
        let Some(generator) = &self.generator else {
            return NO_GENERATOR_MESSAGE.to_string();
        };
        if results.is_empty() {
            return NO_SOURCES_MESSAGE.to_string();
        }

        let prompt = format!(
            "Sources:\n\n{}\n\nQuestion: {question}",
            build_context(results)
        );
        match generator.generate(SYSTEM_PROMPT, &prompt).await {
            Ok(answer) => answer,
            Err(err) => {
                warn!(method = ?generator.method(), error = %err, "answer generation failed");
                format!(
                    "The answer could not be generated ({err}). The search results are still shown."
                )
            }
        }
    }
}
