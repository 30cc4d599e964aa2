//! Layout analysis: positioned text spans grouped into lines and blocks.
//!
//! Spans arrive in page space (top-left origin). Lines are formed from spans
//! sharing a baseline, blocks from lines stacked closely on top of each
//! other. Blocks are what caption matching and figure widening operate on.

use serde::{Deserialize, Serialize};

use crate::geometry::{merge_boxes, BoundingBox};

/// Baseline tolerance for spans on the same line, as a fraction of font size.
const BASELINE_TOLERANCE: f64 = 0.3;

/// Horizontal gap, in font sizes, that splits a row into separate lines.
const LINE_GAP_SPLIT: f64 = 2.0;

/// Largest baseline-to-baseline distance, in font sizes, within a block.
const BLOCK_LINE_SPACING: f64 = 1.6;

/// Largest font size difference within a block, in points.
const BLOCK_FONT_SIZE_DELTA: f64 = 1.0;

/// A run of text shown with one font at one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    /// The text content, NFKC-normalized
    pub text: String,
    /// Glyph box in page space
    pub bbox: BoundingBox,
    /// Baseline y in page space
    pub baseline: f64,
    /// Effective font size in points
    pub font_size: f64,
}

impl TextSpan {
    pub fn new(text: impl Into<String>, bbox: BoundingBox, baseline: f64, font_size: f64) -> Self {
        Self {
            text: text.into(),
            bbox,
            baseline,
            font_size,
        }
    }
}

/// A text line composed of spans on the same baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// The spans in this line, sorted by x
    pub spans: Vec<TextSpan>,
    pub bbox: BoundingBox,
    pub baseline: f64,
    /// Dominant font size (weighted by text length)
    pub font_size: f64,
}

impl TextLine {
    /// Create a line from spans. Returns `None` for an empty span list.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Option<Self> {
        spans.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
        let bbox = merge_boxes(spans.iter().map(|s| &s.bbox))?;

        let total_chars: usize = spans.iter().map(|s| s.text.len()).sum();
        let weighted: f64 = spans
            .iter()
            .map(|s| s.font_size * s.text.len() as f64)
            .sum();
        let font_size = if total_chars > 0 {
            weighted / total_chars as f64
        } else {
            spans[0].font_size
        };
        let baseline = spans[0].baseline;

        Some(Self {
            spans,
            bbox,
            baseline,
            font_size,
        })
    }

    /// Combined text of all spans with appropriate spacing.
    ///
    /// Inserts spaces between spans based on their x gaps. For CJK
    /// characters, no space is inserted between adjacent characters.
    pub fn text(&self) -> String {
        let mut result = String::new();

        for (i, span) in self.spans.iter().enumerate() {
            if i == 0 {
                result.push_str(&span.text);
                continue;
            }

            let prev = &self.spans[i - 1];
            let gap = span.bbox.x0 - prev.bbox.x1;

            let char_count = span.text.chars().count();
            let avg_char_width = if char_count > 0 && span.bbox.width() > 0.0 {
                span.bbox.width() / char_count as f64
            } else {
                span.font_size * 0.5
            };

            let should_insert_space = gap > avg_char_width * 0.2 && {
                let prev_cjk = prev
                    .text
                    .chars()
                    .last()
                    .map(is_spaceless_script_char)
                    .unwrap_or(false);
                let curr_cjk = span
                    .text
                    .chars()
                    .next()
                    .map(is_spaceless_script_char)
                    .unwrap_or(false);
                !(prev_cjk && curr_cjk)
            };

            let has_space = prev.text.ends_with([' ', '\u{00A0}'])
                || span.text.starts_with([' ', '\u{00A0}']);

            if should_insert_space && !has_space {
                result.push(' ');
            }
            result.push_str(&span.text);
        }

        result
    }
}

/// A text block (paragraph, caption, label).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
    pub bbox: BoundingBox,
}

impl TextBlock {
    /// Create a block holding a single line.
    pub fn new(line: TextLine) -> Self {
        let bbox = line.bbox;
        Self {
            lines: vec![line],
            bbox,
        }
    }

    fn push(&mut self, line: TextLine) {
        self.bbox = self.bbox.union(&line.bbox);
        self.lines.push(line);
    }

    /// Combined text of all lines.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|l| l.text())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Check if the block is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() || self.text().trim().is_empty()
    }
}

/// Groups positioned spans into lines and blocks.
#[derive(Debug, Clone, Default)]
pub struct LayoutAnalyzer;

impl LayoutAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Build text blocks in reading order.
    pub fn analyze(&self, spans: Vec<TextSpan>) -> Vec<TextBlock> {
        let lines = self.group_spans_into_lines(spans);
        self.group_lines_into_blocks(lines)
    }

    /// Baseline grouping, top to bottom, then a split of each row at wide
    /// horizontal gaps so columns do not fuse into one line.
    pub fn group_spans_into_lines(&self, mut spans: Vec<TextSpan>) -> Vec<TextLine> {
        spans.retain(|s| s.bbox.is_finite() && !s.text.trim().is_empty());
        spans.sort_by(|a, b| {
            a.baseline
                .total_cmp(&b.baseline)
                .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        });

        let mut rows: Vec<Vec<TextSpan>> = Vec::new();
        let mut row_baseline: Option<f64> = None;

        for span in spans {
            let tolerance = span.font_size * BASELINE_TOLERANCE;
            match (row_baseline, rows.last_mut()) {
                (Some(y), Some(row)) if (span.baseline - y).abs() <= tolerance => row.push(span),
                _ => {
                    row_baseline = Some(span.baseline);
                    rows.push(vec![span]);
                }
            }
        }

        let mut lines = Vec::new();
        for mut row in rows {
            row.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
            let mut current: Vec<TextSpan> = Vec::new();
            for span in row {
                let split = current.last().is_some_and(|prev: &TextSpan| {
                    let size = prev.font_size.max(span.font_size);
                    span.bbox.x0 - prev.bbox.x1 > size * LINE_GAP_SPLIT
                });
                if split {
                    lines.extend(TextLine::from_spans(std::mem::take(&mut current)));
                }
                current.push(span);
            }
            lines.extend(TextLine::from_spans(current));
        }

        lines
    }

    /// Attach each line to the most recent block it continues, or open a
    /// new block.
    pub fn group_lines_into_blocks(&self, lines: Vec<TextLine>) -> Vec<TextBlock> {
        let mut blocks: Vec<TextBlock> = Vec::new();

        for line in lines {
            let target = blocks.iter().rposition(|block| {
                block
                    .lines
                    .last()
                    .is_some_and(|prev| self.continues_block(prev, &line))
            });
            match target {
                Some(i) => blocks[i].push(line),
                None => blocks.push(TextBlock::new(line)),
            }
        }

        blocks
    }

    /// Whether `curr` reads as the next line of the block ending in `prev`.
    fn continues_block(&self, prev: &TextLine, curr: &TextLine) -> bool {
        let spacing = curr.baseline - prev.baseline;
        let size = prev.font_size.max(curr.font_size);
        let overlaps_horizontally = prev.bbox.x0 <= curr.bbox.x1 && curr.bbox.x0 <= prev.bbox.x1;

        spacing > 0.1
            && spacing <= size * BLOCK_LINE_SPACING
            && (prev.font_size - curr.font_size).abs() <= BLOCK_FONT_SIZE_DELTA
            && overlaps_horizontally
    }
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub(crate) fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana, Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}
