use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

// Up to three spaces of indent still starts a top-level item
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}(?:(\d+)[.)]|[-*+])\s+(.*)$").expect("list item pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    /// Number written in front of an ordered item
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    pub text: String,
}

/// Block-level piece of an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Paragraph { text: String },
    List { ordered: bool, items: Vec<ListItem> },
}

impl Block {
    pub fn is_list(&self) -> bool {
        matches!(self, Block::List { .. })
    }
}

struct ItemLine<'a> {
    number: Option<u32>,
    ordered: bool,
    text: &'a str,
}

fn parse_item(line: &str) -> Option<ItemLine<'_>> {
    let caps = LIST_ITEM.captures(line)?;
    let number_match = caps.get(1);
    Some(ItemLine {
        number: number_match.and_then(|m| m.as_str().parse().ok()),
        ordered: number_match.is_some(),
        text: caps.get(2).map_or("", |m| m.as_str()),
    })
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    paragraph: Vec<String>,
    list: Option<(bool, Vec<ListItem>)>,
    // A blank line was seen inside the current list
    gap: bool,
}

impl BlockBuilder {
    fn flush_paragraph(&mut self) {
        if !self.paragraph.is_empty() {
            let text = std::mem::take(&mut self.paragraph).join("\n");
            self.blocks.push(Block::Paragraph { text });
        }
    }

    fn flush_list(&mut self) {
        if let Some((ordered, items)) = self.list.take() {
            self.blocks.push(Block::List { ordered, items });
        }
        self.gap = false;
    }

    fn blank(&mut self) {
        self.flush_paragraph();
        if self.list.is_some() {
            self.gap = true;
        }
    }

    fn item(&mut self, item: ItemLine<'_>) {
        self.flush_paragraph();
        if matches!(&self.list, Some((ordered, _)) if *ordered != item.ordered) {
            self.flush_list();
        }
        let (_, items) = self.list.get_or_insert_with(|| (item.ordered, Vec::new()));
        items.push(ListItem {
            number: item.number,
            text: item.text.trim_end().to_string(),
        });
        self.gap = false;
    }

    fn line(&mut self, line: &str) {
        let continues_item = !self.gap && line.starts_with(char::is_whitespace);
        if continues_item {
            if let Some((_, items)) = self.list.as_mut() {
                if let Some(last) = items.last_mut() {
                    last.text.push('\n');
                    last.text.push_str(line.trim());
                    return;
                }
            }
        }
        self.flush_list();
        self.paragraph.push(line.trim_end().to_string());
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush_paragraph();
        self.flush_list();
        self.blocks
    }
}

/// Split answer content into paragraphs and lists.
///
/// Blank lines separate blocks. Items start with `N.`, `N)`, `-`, `*` or
/// `+`; indented lines directly below an item continue it. A list survives
/// blank lines as long as the next line is another item of the same kind.
pub fn parse_blocks(content: &str) -> Vec<Block> {
    let mut builder = BlockBuilder::default();

    for line in content.lines() {
        if line.trim().is_empty() {
            builder.blank();
        } else if let Some(item) = parse_item(line) {
            builder.item(item);
        } else {
            builder.line(line);
        }
    }

    builder.finish()
}
