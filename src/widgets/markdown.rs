//! Markdown for finished answers.
//!
//! The text is first flattened into [`Block`]s of styled [`Span`]s, then each
//! block is laid out as an egui label.

use egui::text::LayoutJob;
use egui::{Align, FontSelection, Label, RichText, Ui};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanStyle {
    pub strong: bool,
    pub emphasis: bool,
    pub code: bool,
    pub strikethrough: bool,
    pub link: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, spans: Vec<Span> },
    Paragraph(Vec<Span>),
    /// A list item's text. Continuation paragraphs of an item have an empty marker.
    Item { depth: usize, marker: String, spans: Vec<Span> },
    Quote(Vec<Span>),
    Code(String),
    Rule,
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    spans: Vec<Span>,
    style: SpanStyle,
    heading: Option<u8>,
    /// Next number for each open list, `None` for bullet lists.
    lists: Vec<Option<u64>>,
    open_items: usize,
    item_marker: Option<String>,
    quotes: usize,
    code: Option<String>,
}

impl BlockBuilder {
    fn push_text(&mut self, text: &str, style: SpanStyle) {
        if let Some(code) = &mut self.code {
            code.push_str(text);
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.spans.push(Span {
                text: text.to_owned(),
                style,
            }),
        }
    }

    fn flush(&mut self) {
        let heading = self.heading.take();
        if self.spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.spans);
        let block = if let Some(level) = heading {
            Block::Heading { level, spans }
        } else if self.open_items > 0 {
            Block::Item {
                depth: self.lists.len().saturating_sub(1),
                marker: self.item_marker.take().unwrap_or_default(),
                spans,
            }
        } else if self.quotes > 0 {
            Block::Quote(spans)
        } else {
            Block::Paragraph(spans)
        };
        self.blocks.push(block);
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush();
                self.heading = Some(heading_level(level));
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                self.open_items += 1;
                let marker = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let marker = format!("{}.", next);
                        *next += 1;
                        marker
                    }
                    _ => "•".to_owned(),
                };
                self.item_marker = Some(marker);
            }
            Tag::BlockQuote => {
                self.flush();
                self.quotes += 1;
            }
            Tag::CodeBlock(_) => {
                self.flush();
                self.code = Some(String::new());
            }
            Tag::Emphasis => self.style.emphasis = true,
            Tag::Strong => self.style.strong = true,
            Tag::Strikethrough => self.style.strikethrough = true,
            Tag::Link { .. } => self.style.link = true,
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) => self.flush(),
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::Item => {
                self.flush();
                self.open_items = self.open_items.saturating_sub(1);
                self.item_marker = None;
            }
            TagEnd::BlockQuote => {
                self.flush();
                self.quotes = self.quotes.saturating_sub(1);
            }
            TagEnd::CodeBlock => {
                if let Some(code) = self.code.take() {
                    self.blocks.push(Block::Code(code.trim_end_matches('\n').to_owned()));
                }
            }
            TagEnd::Emphasis => self.style.emphasis = false,
            TagEnd::Strong => self.style.strong = false,
            TagEnd::Strikethrough => self.style.strikethrough = false,
            TagEnd::Link => self.style.link = false,
            _ => {}
        }
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

pub fn parse_markdown(text: &str) -> Vec<Block> {
    let mut builder = BlockBuilder::default();
    for event in Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Start(tag) => builder.start(tag),
            Event::End(tag) => builder.end(tag),
            Event::Text(text) => builder.push_text(&text, builder.style),
            Event::Code(code) => {
                let style = SpanStyle {
                    code: true,
                    ..builder.style
                };
                builder.push_text(&code, style);
            }
            Event::SoftBreak => builder.push_text(" ", builder.style),
            Event::HardBreak => builder.push_text("\n", builder.style),
            Event::Rule => {
                builder.flush();
                builder.blocks.push(Block::Rule);
            }
            _ => {}
        }
    }
    builder.flush();
    builder.blocks
}

fn layout(ui: &Ui, spans: &[Span], heading: Option<u8>) -> LayoutJob {
    let style = ui.style();
    let mut job = LayoutJob::default();
    for span in spans {
        let mut text = RichText::new(&span.text);
        if let Some(level) = heading {
            text = text.size(22.0 - 2.0 * level.min(4) as f32).strong();
        }
        if span.style.strong {
            text = text.strong();
        }
        if span.style.emphasis {
            text = text.italics();
        }
        if span.style.code {
            text = text.code();
        }
        if span.style.strikethrough {
            text = text.strikethrough();
        }
        if span.style.link {
            text = text.underline().color(style.visuals.hyperlink_color);
        }
        text.append_to(&mut job, style, FontSelection::Default, Align::Center);
    }
    job
}

/// Render `text` as Markdown.
pub fn show_markdown(ui: &mut Ui, text: &str) {
    for block in parse_markdown(text) {
        match &block {
            Block::Heading { level, spans } => {
                ui.add(Label::new(layout(ui, spans, Some(*level))).wrap());
            }
            Block::Paragraph(spans) => {
                ui.add(Label::new(layout(ui, spans, None)).wrap());
            }
            Block::Item { depth, marker, spans } => {
                let job = layout(ui, spans, None);
                ui.horizontal(|ui| {
                    ui.add_space(12.0 * *depth as f32);
                    ui.label(marker.as_str());
                    ui.add(Label::new(job).wrap());
                });
            }
            Block::Quote(spans) => {
                let job = layout(ui, spans, None);
                ui.horizontal(|ui| {
                    ui.label(RichText::new("▍").weak());
                    ui.add(Label::new(job).wrap());
                });
            }
            Block::Code(code) => {
                egui::Frame::none()
                    .fill(ui.visuals().extreme_bg_color)
                    .inner_margin(4.0)
                    .show(ui, |ui| ui.label(RichText::new(code).monospace()));
            }
            Block::Rule => {
                ui.separator();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(spans: &[Span]) -> String {
        spans.iter().map(|span| span.text.as_str()).collect()
    }

    #[test]
    fn headings_paragraphs_and_inline_styles() {
        let blocks = parse_markdown("# Summary\n\nThe **peak** is at `x = 3`, *roughly*.");
        assert_eq!(blocks.len(), 2);

        let Block::Heading { level, spans } = &blocks[0] else {
            panic!("{:?}", blocks[0]);
        };
        assert_eq!(*level, 1);
        assert_eq!(text_of(spans), "Summary");

        let Block::Paragraph(spans) = &blocks[1] else {
            panic!("{:?}", blocks[1]);
        };
        assert_eq!(text_of(spans), "The peak is at x = 3, roughly.");
        let styled = |text: &str| spans.iter().find(|span| span.text == text).map(|span| span.style);
        assert!(styled("peak").is_some_and(|style| style.strong));
        assert!(styled("x = 3").is_some_and(|style| style.code));
        assert!(styled("roughly").is_some_and(|style| style.emphasis && !style.strong));
    }

    #[test]
    fn nested_lists_keep_numbers_and_depth() {
        let blocks = parse_markdown("1. first\n2. second\n   - detail\n3. third\n");
        let items: Vec<_> = blocks
            .iter()
            .map(|block| match block {
                Block::Item { depth, marker, spans } => (*depth, marker.as_str(), text_of(spans)),
                other => panic!("{:?}", other),
            })
            .collect();
        assert_eq!(
            items,
            vec![
                (0, "1.", "first".to_owned()),
                (0, "2.", "second".to_owned()),
                (1, "•", "detail".to_owned()),
                (0, "3.", "third".to_owned()),
            ]
        );
    }

    #[test]
    fn code_blocks_and_rules() {
        let blocks = parse_markdown("```\nlet x = 1;\nlet y = 2;\n```\n\n---\n\n> quoted");
        assert_eq!(blocks[0], Block::Code("let x = 1;\nlet y = 2;".into()));
        assert_eq!(blocks[1], Block::Rule);
        assert!(matches!(&blocks[2], Block::Quote(spans) if text_of(spans) == "quoted"));
    }

    #[test]
    fn plain_text_is_one_paragraph() {
        assert_eq!(
            parse_markdown("just text\nover two lines"),
            vec![Block::Paragraph(vec![Span {
                text: "just text over two lines".into(),
                style: SpanStyle::default(),
            }])]
        );
    }
}
