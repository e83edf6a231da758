//! Comment: a sticky-note icon with an optional text label beside it

use crate::canvas::PageCanvas;
use crate::color::Rgb;
use crate::error::MarkError;
use crate::fonts::text_width;
use crate::transform::PdfGeometry;

pub const ICON_SIZE: f64 = 20.0;
pub const ICON_OPACITY: f64 = 0.8;
pub const TEXT_SIZE: f64 = 10.0;
pub const LINE_HEIGHT: f64 = 1.2;
/// Minimum gap between the label and the right page edge.
pub const RIGHT_MARGIN: f64 = 10.0;
const LABEL_PADDING: f64 = 2.0;

const ICON_FILL: Rgb = Rgb::new(1.0, 0.8, 0.0);
const ICON_BORDER: Rgb = Rgb::new(0.8, 0.6, 0.0);
const LABEL_FILL: Rgb = Rgb::new(1.0, 1.0, 0.8);
const LABEL_BORDER: Rgb = Rgb::new(0.8, 0.8, 0.6);
const TEXT_COLOR: Rgb = Rgb::new(0.0, 0.0, 0.0);

/// Where the label block lands on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelLayout {
    pub x: f64,
    /// Baseline of each line, top to bottom.
    pub baselines: Vec<f64>,
    pub width: f64,
}

/// Lay out `text` to the right of an icon anchored at `(anchor_x, top)`.
/// The block is shifted left when it would cross the right margin.
pub fn layout_label(
    text: &str,
    anchor_x: f64,
    top: f64,
    icon_size: f64,
    page_width: f64,
) -> LabelLayout {
    let lines: Vec<&str> = text.lines().collect();
    let width = lines
        .iter()
        .map(|line| text_width(line, TEXT_SIZE))
        .fold(0.0, f64::max);

    let mut x = anchor_x + icon_size;
    if x + width > page_width - RIGHT_MARGIN {
        x = page_width - width - RIGHT_MARGIN;
    }

    let baselines = (0..lines.len())
        .map(|i| top - TEXT_SIZE - i as f64 * TEXT_SIZE * LINE_HEIGHT)
        .collect();

    LabelLayout { x, baselines, width }
}

pub fn render(
    canvas: &mut PageCanvas,
    geometry: &PdfGeometry,
    content: &str,
) -> Result<(), MarkError> {
    let icon = geometry.scaled(ICON_SIZE);
    let page_width = canvas.size().width;

    canvas.draw(|pen| {
        pen.boxed_rect(
            geometry.x - icon / 2.0,
            geometry.top - icon / 2.0,
            icon,
            icon,
            ICON_FILL,
            ICON_BORDER,
            1.0,
            ICON_OPACITY,
        );

        if content.trim().is_empty() {
            return Ok(());
        }

        let layout = layout_label(content, geometry.x, geometry.top, icon, page_width);
        let (first, last) = match (layout.baselines.first(), layout.baselines.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Ok(()),
        };

        pen.boxed_rect(
            layout.x - LABEL_PADDING,
            last - LABEL_PADDING,
            layout.width + 2.0 * LABEL_PADDING,
            first + TEXT_SIZE - last + 2.0 * LABEL_PADDING,
            LABEL_FILL,
            LABEL_BORDER,
            1.0,
            1.0,
        );
        for (line, baseline) in content.lines().zip(&layout.baselines) {
            pen.text(layout.x, *baseline, TEXT_SIZE, line, TEXT_COLOR);
        }
        Ok(())
    })
}
