use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::IndexError;

/// The three document families the knowledge base is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Expert interview insight.
    Insight,
    /// Curriculum activity.
    Curriculum,
    /// Project fact.
    #[serde(rename = "metadata", alias = "metadata_fact", alias = "metadata-fact")]
    MetadataFact,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Insight,
        DocumentKind::Curriculum,
        DocumentKind::MetadataFact,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Insight => "insight",
            DocumentKind::Curriculum => "curriculum",
            DocumentKind::MetadataFact => "metadata",
        }
    }

    /// File name stem of the static collection holding this kind.
    pub fn file_stem(&self) -> &'static str {
        match self {
            DocumentKind::Insight => "insights_embedded",
            DocumentKind::Curriculum => "curriculum_embedded",
            DocumentKind::MetadataFact => "metadata_embedded",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "insight" | "insights" => Ok(DocumentKind::Insight),
            "curriculum" => Ok(DocumentKind::Curriculum),
            "metadata" | "metadata_fact" | "metadata-fact" | "fact" => {
                Ok(DocumentKind::MetadataFact)
            }
            other => Err(IndexError::UnknownKind(other.to_string())),
        }
    }
}

/// Display text from any scalar. Exporters are inconsistent about quoting
/// numbers, so `24` and `"24"` both read as `"24"`.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    })
}

/// A small ordinal such as a day or session number. Anything that is not a
/// non-negative integer, quoted or not, reads as absent.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Display fields of an interview insight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightMetadata {
    #[serde(deserialize_with = "lenient_text")]
    pub expert: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub role: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub organization: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub topic: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub source: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub quote: Option<String>,
}

/// Display fields of a curriculum activity, as exported by the curriculum tooling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurriculumMetadata {
    #[serde(deserialize_with = "lenient_text")]
    pub module: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub day: Option<u32>,
    #[serde(deserialize_with = "lenient_text")]
    pub day_theme: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub session_number: Option<u32>,
    #[serde(deserialize_with = "lenient_text")]
    pub activity_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub purpose: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub duration: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub learning_block_focus: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub facilitator_script: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub transition_script: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub homework: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactMetadata {
    #[serde(deserialize_with = "lenient_text")]
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub label: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub value: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub source: Option<String>,
}

/// Metadata with a concrete field set per [`DocumentKind`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocumentMetadata {
    Insight(InsightMetadata),
    Curriculum(CurriculumMetadata),
    MetadataFact(FactMetadata),
}

impl DocumentMetadata {
    /// Interprets an open JSON record as the metadata of `kind`. Unknown keys
    /// are ignored and `null` reads as an empty record.
    pub fn from_value(kind: DocumentKind, value: Value) -> Result<Self, serde_json::Error> {
        let value = match value {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        Ok(match kind {
            DocumentKind::Insight => DocumentMetadata::Insight(serde_json::from_value(value)?),
            DocumentKind::Curriculum => {
                DocumentMetadata::Curriculum(serde_json::from_value(value)?)
            }
            DocumentKind::MetadataFact => {
                DocumentMetadata::MetadataFact(serde_json::from_value(value)?)
            }
        })
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            DocumentMetadata::Insight(_) => DocumentKind::Insight,
            DocumentMetadata::Curriculum(_) => DocumentKind::Curriculum,
            DocumentMetadata::MetadataFact(_) => DocumentKind::MetadataFact,
        }
    }
}

/// A pre-computed document. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VectorDocument {
    pub id: String,
    /// The content that was embedded.
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: DocumentMetadata,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
}

/// On-disk shape of a collection entry.
#[derive(Debug, Deserialize)]
pub(crate) struct RawDocument {
    id: String,
    #[serde(default)]
    text: String,
    embedding: Vec<f32>,
    #[serde(default)]
    metadata: Value,
    #[serde(rename = "type", default)]
    kind: Option<DocumentKind>,
}

impl RawDocument {
    /// Entries without a `type` inherit the kind of the file they came from.
    pub(crate) fn into_document(
        self,
        file_kind: DocumentKind,
    ) -> Result<VectorDocument, serde_json::Error> {
        let kind = self.kind.unwrap_or(file_kind);
        let metadata = DocumentMetadata::from_value(kind, self.metadata)?;
        Ok(VectorDocument {
            id: self.id,
            text: self.text,
            embedding: self.embedding,
            metadata,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_parses_common_spellings() {
        assert_eq!("insight".parse::<DocumentKind>().unwrap(), DocumentKind::Insight);
        assert_eq!(" Curriculum ".parse::<DocumentKind>().unwrap(), DocumentKind::Curriculum);
        assert_eq!("metadata-fact".parse::<DocumentKind>().unwrap(), DocumentKind::MetadataFact);
        assert!(matches!(
            "video".parse::<DocumentKind>(),
            Err(IndexError::UnknownKind(_))
        ));
    }

    #[test]
    fn kind_serde_names() {
        assert_eq!(serde_json::to_value(DocumentKind::MetadataFact).unwrap(), json!("metadata"));
        let kind: DocumentKind = serde_json::from_value(json!("metadata_fact")).unwrap();
        assert_eq!(kind, DocumentKind::MetadataFact);
    }

    #[test]
    fn curriculum_metadata_keeps_exported_fields() {
        let raw: RawDocument = serde_json::from_value(json!({
            "id": "curr-12",
            "text": "Module: Solar\nDay 2: Site assessment",
            "embedding": [0.1, 0.2],
            "metadata": {
                "module": "Solar",
                "day": 2,
                "day_theme": "Site assessment",
                "session_number": 3,
                "activity_name": "Roof walk",
                "content_type": "curriculum_activity"
            }
        }))
        .unwrap();

        let doc = raw.into_document(DocumentKind::Curriculum).unwrap();
        assert_eq!(doc.kind, DocumentKind::Curriculum);
        match doc.metadata {
            DocumentMetadata::Curriculum(meta) => {
                assert_eq!(meta.module.as_deref(), Some("Solar"));
                assert_eq!(meta.day, Some(2));
                assert_eq!(meta.session_number, Some(3));
                assert!(meta.purpose.is_none());
            }
            other => panic!("unexpected metadata {other:?}"),
        }
    }

    #[test]
    fn explicit_type_wins_over_file_kind() {
        let raw: RawDocument = serde_json::from_value(json!({
            "id": "fact-1",
            "text": "The pilot ran for six weeks.",
            "embedding": [1.0],
            "metadata": null,
            "type": "metadata"
        }))
        .unwrap();
        let doc = raw.into_document(DocumentKind::Insight).unwrap();
        assert_eq!(doc.kind, DocumentKind::MetadataFact);
        assert_eq!(doc.metadata, DocumentMetadata::MetadataFact(FactMetadata::default()));
    }

    #[test]
    fn scalar_metadata_fields_are_read_leniently() {
        let fact = DocumentMetadata::from_value(
            DocumentKind::MetadataFact,
            json!({ "label": "seats", "value": 24, "source": true }),
        )
        .unwrap();
        match fact {
            DocumentMetadata::MetadataFact(meta) => {
                assert_eq!(meta.label.as_deref(), Some("seats"));
                assert_eq!(meta.value.as_deref(), Some("24"));
                assert_eq!(meta.source.as_deref(), Some("true"));
            }
            other => panic!("unexpected metadata {other:?}"),
        }

        let curriculum = DocumentMetadata::from_value(
            DocumentKind::Curriculum,
            json!({ "duration": 45, "day": "2", "session_number": "second", "module": null }),
        )
        .unwrap();
        match curriculum {
            DocumentMetadata::Curriculum(meta) => {
                assert_eq!(meta.duration.as_deref(), Some("45"));
                assert_eq!(meta.day, Some(2));
                assert_eq!(meta.session_number, None);
                assert_eq!(meta.module, None);
            }
            other => panic!("unexpected metadata {other:?}"),
        }
    }
}
