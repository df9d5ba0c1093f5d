use chatstream_types::Citation;
use serde::Serialize;

use crate::blocks::{parse_blocks, Block};
use crate::citations::{number_citations, split_citations, CitationNumbers, RichChunk};
use crate::sources::{group_sources, Source};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    pub chunks: Vec<RichChunk>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuredBlock {
    Paragraph { chunks: Vec<RichChunk> },
    List { ordered: bool, items: Vec<StructuredItem> },
}

impl StructuredBlock {
    fn chunks(&self) -> Box<dyn Iterator<Item = &RichChunk> + '_> {
        match self {
            StructuredBlock::Paragraph { chunks } => Box::new(chunks.iter()),
            StructuredBlock::List { items, .. } => {
                Box::new(items.iter().flat_map(|item| item.chunks.iter()))
            }
        }
    }
}

/// Answer text broken into renderable blocks with citation anchors,
/// plus the sources those citations point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuredAnswer {
    pub blocks: Vec<StructuredBlock>,
    pub sources: Vec<Source>,
}

impl StructuredAnswer {
    pub fn build(content: &str, citations: &[Citation]) -> Self {
        let numbers = number_citations(citations);
        let blocks = parse_blocks(content)
            .into_iter()
            .map(|block| structure_block(block, &numbers))
            .collect();

        Self {
            blocks,
            sources: group_sources(citations),
        }
    }

    /// Citation ids referenced by the text, in order of first use
    pub fn cited_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for chunk in self.blocks.iter().flat_map(|block| block.chunks()) {
            for id in chunk.citation_ids() {
                if !ids.contains(id) {
                    ids.push(id.clone());
                }
            }
        }
        ids
    }

    /// Sources that the text actually cites
    pub fn cited_sources(&self) -> Vec<&Source> {
        let cited = self.cited_ids();
        self.sources
            .iter()
            .filter(|source| source.citation_ids.iter().any(|id| cited.contains(id)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

fn structure_block(block: Block, numbers: &CitationNumbers) -> StructuredBlock {
    match block {
        Block::Paragraph { text } => StructuredBlock::Paragraph {
            chunks: split_citations(&text, numbers),
        },
        Block::List { ordered, items } => StructuredBlock::List {
            ordered,
            items: items
                .into_iter()
                .map(|item| StructuredItem {
                    number: item.number,
                    chunks: split_citations(&item.text, numbers),
                })
                .collect(),
        },
    }
}
