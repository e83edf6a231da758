//! Mark renderers
//!
//! One renderer per annotation kind. Each takes PDF-space geometry from
//! [`crate::transform`] plus the kind's own fields and draws onto the
//! page's [`PageCanvas`]. Renderers never abort the bake: any failure is
//! returned as a [`MarkError`] for the orchestrator to record.

pub mod comment;
pub mod highlight;
pub mod signature;
pub mod underline;

use lopdf::Document;

use crate::annotation::{Annotation, AnnotationKind};
use crate::canvas::PageCanvas;
use crate::error::MarkError;
use crate::transform::annotation_geometry;

/// Draw a single annotation onto its page.
pub fn render_annotation(
    doc: &mut Document,
    canvas: &mut PageCanvas,
    annotation: &Annotation,
) -> Result<(), MarkError> {
    let geometry = annotation_geometry(annotation, canvas.size());

    match &annotation.kind {
        AnnotationKind::Highlight(fields) => highlight::render(canvas, &geometry, fields),
        AnnotationKind::Underline(fields) => underline::render(canvas, &geometry, fields),
        AnnotationKind::Comment { content } => {
            comment::render(canvas, &geometry, content.as_deref().unwrap_or(""))
        }
        AnnotationKind::Signature { content } => {
            let data_url = content.as_deref().ok_or(MarkError::MissingContent)?;
            signature::render(doc, canvas, &geometry, data_url)
        }
    }
}
