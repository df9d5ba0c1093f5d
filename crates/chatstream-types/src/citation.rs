use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;

/// Reference from generated text to a source passage.
///
/// Immutable once constructed. `id` is the identity used for deduplication,
/// `source_id` points back at the record the passage was taken from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    #[serde(default, alias = "_id", alias = "citationId")]
    pub id: String,

    #[serde(default, alias = "recordId", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    #[serde(default)]
    pub content: String,

    #[serde(default, alias = "pageNum", skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Number the answer text uses to refer to this citation (`[n]`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u32>,

    #[serde(default, alias = "recordName", skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,

    #[serde(default, alias = "mimeType", skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector: Option<String>,

    #[serde(default, alias = "webUrl", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Citation {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_id: None,
            content: content.into(),
            page: None,
            chunk_index: None,
            source_name: None,
            source_type: None,
            origin: None,
            connector: None,
            url: None,
        }
    }

    pub fn with_source(mut self, source_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self.source_name = Some(name.into());
        self
    }

    pub fn with_number(mut self, number: u32) -> Self {
        self.chunk_index = Some(number);
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Citation as stored on a server message.
///
/// Persisted messages wrap the citation (`{citationId, citationData}`),
/// streamed deltas send it flat.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServerCitation {
    #[serde(rename_all = "camelCase")]
    Wrapped {
        citation_id: String,
        citation_data: Citation,
    },
    Flat(Citation),
}

impl ServerCitation {
    /// Unwrap into a [`Citation`]; `None` when no id was sent
    pub fn into_citation(self) -> Option<Citation> {
        let citation = match self {
            ServerCitation::Wrapped { citation_id, mut citation_data } => {
                if !citation_id.is_empty() {
                    citation_data.id = citation_id;
                }
                citation_data
            }
            ServerCitation::Flat(citation) => citation,
        };
        (!citation.id.is_empty()).then_some(citation)
    }
}

/// Insertion-ordered set of citations, unique by `id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CitationSet {
    items: Vec<Citation>,
    seen: HashSet<String>,
}

impl CitationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when a citation with the same id is already present
    /// or the citation has no id.
    pub fn insert(&mut self, citation: Citation) -> bool {
        if citation.id.is_empty() || !self.seen.insert(citation.id.clone()) {
            return false;
        }
        self.items.push(citation);
        true
    }

    /// Merge citations, returning how many were new
    pub fn merge<I: IntoIterator<Item = Citation>>(&mut self, citations: I) -> usize {
        citations
            .into_iter()
            .map(|c| self.insert(c))
            .filter(|inserted| *inserted)
            .count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Citation> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[Citation] {
        &self.items
    }

    pub fn to_vec(&self) -> Vec<Citation> {
        self.items.clone()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.seen.clear();
    }
}

impl FromIterator<Citation> for CitationSet {
    fn from_iter<I: IntoIterator<Item = Citation>>(iter: I) -> Self {
        let mut set = CitationSet::new();
        set.merge(iter);
        set
    }
}

impl<'a> IntoIterator for &'a CitationSet {
    type Item = &'a Citation;
    type IntoIter = std::slice::Iter<'a, Citation>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Serialize for CitationSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.items)
    }
}

impl<'de> Deserialize<'de> for CitationSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<Citation>::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}
