use chatstream_types::Citation;
use serde::Serialize;
use std::collections::HashMap;
use url::Url;

/// Citations grouped by the record they were taken from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub source_type: String,
    pub origin_label: String,
    pub citation_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Ids of the grouped citations, in first-seen order
    pub citation_ids: Vec<String>,
}

/// Group citations by `source_id` (falling back to the URL, then to the
/// citation's own id), keeping the order sources were first cited in.
pub fn group_sources(citations: &[Citation]) -> Vec<Source> {
    let mut sources: Vec<Source> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for citation in citations {
        let key = source_key(citation);
        match index.get(&key) {
            Some(&i) => {
                let source = &mut sources[i];
                if !source.citation_ids.contains(&citation.id) {
                    source.citation_ids.push(citation.id.clone());
                    source.citation_count += 1;
                }
            }
            None => {
                index.insert(key.clone(), sources.len());
                sources.push(new_source(key, citation));
            }
        }
    }

    sources
}

fn source_key(citation: &Citation) -> String {
    citation
        .source_id
        .clone()
        .filter(|id| !id.is_empty())
        .or_else(|| citation.url.clone())
        .unwrap_or_else(|| citation.id.clone())
}

fn new_source(id: String, citation: &Citation) -> Source {
    let host = citation.url.as_deref().and_then(url_host);
    let label = citation
        .source_name
        .clone()
        .filter(|name| !name.is_empty())
        .or_else(|| host.clone())
        .unwrap_or_else(|| "Untitled source".to_string());

    Source {
        id,
        label,
        source_type: source_type(citation),
        origin_label: origin_label(citation, host.as_deref()),
        citation_count: 1,
        url: citation.url.clone(),
        citation_ids: vec![citation.id.clone()],
    }
}

fn url_host(raw: &str) -> Option<String> {
    Url::parse(raw)
        .ok()
        .and_then(|url| url.host_str().map(|h| h.trim_start_matches("www.").to_string()))
}

/// Human label for where a source came from
pub fn origin_label(citation: &Citation, host: Option<&str>) -> String {
    match citation.origin.as_deref().map(str::to_ascii_uppercase).as_deref() {
        Some("UPLOAD") => "Uploaded file".to_string(),
        Some("CONNECTOR") => citation
            .connector
            .clone()
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "Connector".to_string()),
        Some("WEB") => host.unwrap_or("Web").to_string(),
        Some(other) if !other.is_empty() => other.to_string(),
        _ => "Knowledge base".to_string(),
    }
}

/// File type from the source name's extension, else from the MIME type
pub fn source_type(citation: &Citation) -> String {
    let from_name = citation
        .source_name
        .as_deref()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(stem, ext)| (stem, ext.to_ascii_lowercase()))
        .filter(|(stem, ext)| !stem.is_empty() && is_extension(ext))
        .map(|(_, ext)| ext);
    if let Some(ext) = from_name {
        return ext;
    }

    match citation.source_type.as_deref().map(str::to_ascii_lowercase) {
        Some(mime) => mime_to_type(&mime).to_string(),
        None => "document".to_string(),
    }
}

fn is_extension(ext: &str) -> bool {
    (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

fn mime_to_type(mime: &str) -> &str {
    match mime {
        "application/pdf" => "pdf",
        "text/html" => "html",
        "text/plain" => "txt",
        "text/markdown" => "md",
        "text/csv" => "csv",
        "application/json" => "json",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/vnd.ms-excel" => "xls",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "xlsx",
        "application/vnd.ms-powerpoint" => "ppt",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => "pptx",
        m if m.starts_with("image/") => "image",
        _ => "document",
    }
}
