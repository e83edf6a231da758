use thiserror::Error;

/// Failures that abort a whole bake call.
#[derive(Error, Debug)]
pub enum PdfMarkError {
    #[error("Failed to load PDF: {0}")]
    Load(String),

    #[error("Failed to save PDF: {0}")]
    Save(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Failures scoped to a single annotation. The bake records these as
/// warnings and moves on to the next annotation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarkError {
    #[error("annotation has no content to render")]
    MissingContent,

    #[error("signature is not a data:image/(png|jpeg);base64 URL")]
    MalformedDataUrl,

    #[error("unsupported image type: {0}")]
    UnsupportedImageType(String),

    #[error("invalid base64 payload: {0}")]
    InvalidBase64(String),

    #[error("could not decode image: {0}")]
    ImageDecode(String),

    #[error("page index {index} is outside the document (page count {page_count})")]
    PageOutOfRange { index: usize, page_count: usize },

    #[error("PDF operation failed: {0}")]
    Pdf(String),
}

impl From<lopdf::Error> for MarkError {
    fn from(e: lopdf::Error) -> Self {
        MarkError::Pdf(e.to_string())
    }
}

/// Errors raised by [`crate::session::AnnotationSession`].
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("annotation id already present: {0}")]
    DuplicateId(String),

    #[error("annotation not found: {0}")]
    NotFound(String),

    #[error("{0} annotation has no content")]
    MissingContent(&'static str),

    #[error("session serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
