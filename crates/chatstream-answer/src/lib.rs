//! Structuring of finished (or in-progress) answer text for rendering.
//!
//! - [`parse_blocks`] splits markdown-ish content into paragraphs and lists
//! - [`split_citations`] turns `[n]` markers into citation anchors
//! - [`group_sources`] aggregates citations per source record
//! - [`StructuredAnswer`] combines all three

pub mod answer;
pub mod blocks;
pub mod citations;
pub mod sources;

pub use answer::{StructuredAnswer, StructuredBlock, StructuredItem};
pub use blocks::{parse_blocks, Block, ListItem};
pub use citations::{number_citations, split_citations, to_raw, CitationNumbers, RichChunk};
pub use sources::{group_sources, origin_label, source_type, Source};
