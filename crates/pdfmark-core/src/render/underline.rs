//! Underline: a solid line along the bottom of the selection

use crate::annotation::{MarkupFields, DEFAULT_UNDERLINE_COLOR};
use crate::canvas::PageCanvas;
use crate::color::Rgb;
use crate::error::MarkError;
use crate::transform::PdfGeometry;

pub const THICKNESS: f64 = 2.0;
pub const FALLBACK_WIDTH: f64 = 100.0;

pub fn render(
    canvas: &mut PageCanvas,
    geometry: &PdfGeometry,
    fields: &MarkupFields,
) -> Result<(), MarkError> {
    let color = Rgb::resolve(fields.color.as_deref(), DEFAULT_UNDERLINE_COLOR);
    let width = geometry
        .width
        .unwrap_or_else(|| geometry.scaled(FALLBACK_WIDTH));

    canvas.draw(|pen| {
        pen.line(
            (geometry.x, geometry.y),
            (geometry.x + width, geometry.y),
            color,
            THICKNESS,
        );
        Ok(())
    })
}
