//! pdfmark-core: bake viewer annotations into PDF page content
//!
//! Highlights, underlines, comments and signatures placed in a browser
//! viewer (pixel space, origin top-left) are transformed into PDF space and
//! drawn permanently into the pages of the source document.
//!
//! ```no_run
//! use pdfmark_core::{bake_to_bytes, Annotation, ViewerRect};
//!
//! # fn run(pdf: &[u8]) -> Result<(), pdfmark_core::PdfMarkError> {
//! let marks = vec![Annotation::highlight(
//!     0,
//!     ViewerRect { x: 50.0, y: 100.0, width: 120.0, height: 18.0 },
//!     None,
//!     None,
//! )];
//! let baked = bake_to_bytes(pdf, &marks)?;
//! for warning in &baked.warnings {
//!     eprintln!("skipped {}: {}", warning.annotation_id, warning.error);
//! }
//! # Ok(())
//! # }
//! ```

pub mod annotation;
pub mod bake;
pub mod canvas;
pub mod color;
pub mod error;
pub mod fonts;
pub mod page_resolver;
pub mod render;
pub mod session;
pub mod transform;

#[cfg(test)]
pub(crate) mod test_support;

pub use annotation::{
    new_annotation_id, parse_annotations, Annotation, AnnotationId, AnnotationKind, MarkupFields,
    ViewerMetadata, ViewerRect,
};
pub use bake::{
    bake_document, bake_into, bake_to_bytes, export_file_name, BakeOutcome, BakeStatus,
    BakeWarning, BakedPdf,
};
pub use color::Rgb;
pub use error::{MarkError, PdfMarkError, SessionError};
pub use page_resolver::resolve_page_index;
pub use session::AnnotationSession;
pub use transform::{to_pdf_space, PageSize, PdfGeometry};

/// Number of pages in a PDF, for callers that only hold bytes.
pub fn page_count(pdf_bytes: &[u8]) -> Result<usize, PdfMarkError> {
    let document =
        lopdf::Document::load_mem(pdf_bytes).map_err(|e| PdfMarkError::Load(e.to_string()))?;
    Ok(document.get_pages().len())
}
