//! Caption association for extracted assets.

use regex::Regex;

use crate::geometry::BoundingBox;
use crate::model::Caption;
use crate::parser::TextBlock;

use super::options::CaptionOptions;

/// Finds the text block below an asset that reads as its caption.
///
/// Candidates start at or below the asset's bottom edge, are horizontally
/// centred within half the asset's width, and lie closer than
/// `max_distance`. A block starting with a figure label wins over any
/// unlabelled block, however close; otherwise the closest candidate is used.
#[derive(Debug, Clone)]
pub struct CaptionResolver {
    options: CaptionOptions,
    label_pattern: Regex,
    strip_pattern: Regex,
}

impl CaptionResolver {
    pub fn new(options: CaptionOptions) -> Self {
        Self {
            options,
            label_pattern: Regex::new(r"(?i)^fig(ure)?\.?\s*\d+[:\-]").unwrap(),
            strip_pattern: Regex::new(r"(?i)^(fig(?:ure)?\.?\s*\d+)\s*[.:\-]\s*").unwrap(),
        }
    }

    /// Resolve the caption of an asset occupying `bbox`.
    pub fn resolve(&self, bbox: &BoundingBox, blocks: &[TextBlock]) -> Option<Caption> {
        let center = bbox.center_x();
        let half_width = bbox.width() / 2.0;

        let mut labelled: Option<String> = None;
        let mut closest: Option<(f64, String)> = None;

        for block in blocks {
            let distance = block.bbox.y0 - bbox.y1;
            let candidate = block.bbox.y0 >= bbox.y1
                && (center - block.bbox.center_x()).abs() < half_width
                && distance < self.options.max_distance;
            if !candidate {
                continue;
            }

            let text = block.text().trim().to_string();
            if labelled.is_none() && self.label_pattern.is_match(&text) {
                labelled = Some(text.clone());
            }
            if closest.as_ref().map_or(true, |(d, _)| distance < *d) {
                closest = Some((distance, text));
            }
        }

        let long_enough = |t: &String| t.chars().count() > self.options.min_length;
        labelled
            .filter(long_enough)
            .and_then(|text| self.parse(&text))
            .or_else(|| {
                closest
                    .map(|(_, t)| t)
                    .filter(long_enough)
                    .and_then(|text| self.parse(&text))
            })
    }

    /// Split a caption into its figure label and body.
    ///
    /// Returns `None` when nothing is left after the label.
    pub fn parse(&self, text: &str) -> Option<Caption> {
        let text = text.trim();
        let caption = match self.strip_pattern.captures(text) {
            Some(caps) => {
                let label = caps.get(1).map(|m| m.as_str().trim().to_string());
                let body_start = caps.get(0).map_or(0, |m| m.end());
                Caption {
                    label,
                    text: text[body_start..].trim().to_string(),
                }
            }
            None => Caption {
                label: None,
                text: text.to_string(),
            },
        };
        (!caption.text.is_empty()).then_some(caption)
    }
}

impl Default for CaptionResolver {
    fn default() -> Self {
        Self::new(CaptionOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{TextLine, TextSpan};

    fn block(text: &str, x0: f64, y0: f64, x1: f64) -> TextBlock {
        let bbox = BoundingBox::new(x0, y0, x1, y0 + 10.0);
        let line = TextLine::from_spans(vec![TextSpan::new(text, bbox, y0 + 8.0, 10.0)]).unwrap();
        TextBlock::new(line)
    }

    fn image_box() -> BoundingBox {
        BoundingBox::new(100.0, 100.0, 400.0, 300.0)
    }

    #[test]
    fn test_label_beats_proximity() {
        let resolver = CaptionResolver::default();
        let blocks = vec![
            block("A plain paragraph right below", 150.0, 320.0, 350.0),
            block("Figure 1: Quarterly revenue", 150.0, 380.0, 350.0),
        ];
        let caption = resolver.resolve(&image_box(), &blocks).unwrap();
        assert_eq!(caption.label.as_deref(), Some("Figure 1"));
        assert_eq!(caption.text, "Quarterly revenue");
    }

    #[test]
    fn test_closest_fallback() {
        let resolver = CaptionResolver::default();
        let blocks = vec![
            block("Second paragraph further down", 150.0, 350.0, 350.0),
            block("First paragraph just under it", 150.0, 310.0, 350.0),
        ];
        let caption = resolver.resolve(&image_box(), &blocks).unwrap();
        assert_eq!(caption.label, None);
        assert_eq!(caption.text, "First paragraph just under it");
    }

    #[test]
    fn test_candidate_window() {
        let resolver = CaptionResolver::default();
        let blocks = vec![
            // above the image
            block("Figure 9: above the image", 150.0, 50.0, 350.0),
            // off-centre
            block("Figure 8: in the margin far right", 420.0, 310.0, 600.0),
            // too far below
            block("Figure 7: on the next section", 150.0, 400.0, 350.0),
        ];
        assert!(resolver.resolve(&image_box(), &blocks).is_none());
    }

    #[test]
    fn test_short_label_falls_back() {
        let resolver = CaptionResolver::default();
        let blocks = vec![
            block("Fig. 2:", 150.0, 305.0, 350.0),
            block("Detailed view of the sensor", 150.0, 302.0, 350.0),
        ];
        let caption = resolver.resolve(&image_box(), &blocks).unwrap();
        assert_eq!(caption.text, "Detailed view of the sensor");
    }

    #[test]
    fn test_empty_label_body_falls_back() {
        let resolver = CaptionResolver::default();
        let blocks = vec![
            block("Sensor readings over time", 150.0, 310.0, 350.0),
            block("Figure 100:", 150.0, 350.0, 350.0),
        ];
        let caption = resolver.resolve(&image_box(), &blocks).unwrap();
        assert_eq!(caption.label, None);
        assert_eq!(caption.text, "Sensor readings over time");
    }

    #[test]
    fn test_too_short_everywhere() {
        let resolver = CaptionResolver::default();
        let blocks = vec![block("Axis label", 150.0, 305.0, 350.0)];
        assert!(resolver.resolve(&image_box(), &blocks).is_none());
    }

    #[test]
    fn test_parse_label_variants() {
        let resolver = CaptionResolver::default();
        let c = resolver.parse("FIG. 12 - System overview").unwrap();
        assert_eq!(c.label.as_deref(), Some("FIG. 12"));
        assert_eq!(c.text, "System overview");

        let c = resolver.parse("Figure 3. Sample output").unwrap();
        assert_eq!(c.text, "Sample output");

        let c = resolver.parse("Figure 4 shows the trend").unwrap();
        assert_eq!(c.label, None);
        assert_eq!(c.text, "Figure 4 shows the trend");

        assert!(resolver.parse("Figure 5:   ").is_none());
    }
}
