//! Highlight: a translucent filled box over the selection

use crate::annotation::{MarkupFields, DEFAULT_HIGHLIGHT_COLOR};
use crate::canvas::PageCanvas;
use crate::color::Rgb;
use crate::error::MarkError;
use crate::transform::PdfGeometry;

pub const OPACITY: f64 = 0.3;
pub const FALLBACK_WIDTH: f64 = 100.0;
pub const FALLBACK_HEIGHT: f64 = 20.0;

pub fn render(
    canvas: &mut PageCanvas,
    geometry: &PdfGeometry,
    fields: &MarkupFields,
) -> Result<(), MarkError> {
    let color = Rgb::resolve(fields.color.as_deref(), DEFAULT_HIGHLIGHT_COLOR);
    let width = geometry
        .width
        .unwrap_or_else(|| geometry.scaled(FALLBACK_WIDTH));
    let height = geometry
        .height
        .unwrap_or_else(|| geometry.scaled(FALLBACK_HEIGHT));

    // The box hangs down from the anchor's top edge.
    let y = geometry.top - height;

    canvas.draw(|pen| {
        pen.fill_rect(geometry.x, y, width, height, color, OPACITY);
        Ok(())
    })
}
