//! Annotation records
//!
//! An [`Annotation`] is one mark the user placed in the viewer. Coordinates
//! are in viewer pixels (origin top-left, Y down) exactly as the viewer
//! reported them; conversion to PDF space happens at bake time in
//! [`crate::transform`].
//!
//! The wire form is the flat camelCase record the browser produces:
//!
//! ```json
//! {"id":"…","type":"highlight","x":50,"y":100,"width":120,"height":18,
//!  "color":"#FFEB3B","content":"selected text","pageNumber":0,
//!  "metadata":{"originalScale":1,"pageWidth":612,"pageHeight":792}}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::PdfMarkError;

pub type AnnotationId = String;

pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#FFEB3B";
pub const DEFAULT_UNDERLINE_COLOR: &str = "#FF0000";

/// Generate a fresh annotation id.
pub fn new_annotation_id() -> AnnotationId {
    uuid::Uuid::new_v4().to_string()
}

/// Viewer state captured when the annotation was created.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewerMetadata {
    /// Zoom factor of the viewer at creation time.
    #[serde(default = "default_scale")]
    pub original_scale: f64,
    /// Rendered page width in viewer pixels.
    pub page_width: f64,
    /// Rendered page height in viewer pixels.
    pub page_height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_height: Option<f64>,
}

fn default_scale() -> f64 {
    1.0
}

/// A rectangle in viewer pixel space.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ViewerRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Fields shared by the two text-markup kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MarkupFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Selected text. Informational only, never drawn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationKind {
    Highlight(MarkupFields),
    Underline(MarkupFields),
    Comment {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
    /// `content` holds a `data:image/{png|jpeg};base64,…` URL.
    Signature {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
}

impl AnnotationKind {
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationKind::Highlight(_) => "highlight",
            AnnotationKind::Underline(_) => "underline",
            AnnotationKind::Comment { .. } => "comment",
            AnnotationKind::Signature { .. } => "signature",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// Empty when the caller leaves id assignment to the session.
    #[serde(default)]
    pub id: AnnotationId,
    #[serde(flatten)]
    pub kind: AnnotationKind,
    pub x: f64,
    pub y: f64,
    /// Zero-based page index recorded at creation. Signed so that corrupt
    /// values survive deserialization and get clamped at bake time.
    pub page_number: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ViewerMetadata>,
}

impl Annotation {
    pub fn highlight(
        page_number: i64,
        rect: ViewerRect,
        color: Option<String>,
        text: Option<String>,
    ) -> Self {
        Self::markup(
            AnnotationKind::Highlight(MarkupFields {
                width: Some(rect.width),
                height: Some(rect.height),
                color,
                content: text,
            }),
            page_number,
            rect,
        )
    }

    pub fn underline(
        page_number: i64,
        rect: ViewerRect,
        color: Option<String>,
        text: Option<String>,
    ) -> Self {
        Self::markup(
            AnnotationKind::Underline(MarkupFields {
                width: Some(rect.width),
                height: Some(rect.height),
                color,
                content: text,
            }),
            page_number,
            rect,
        )
    }

    pub fn comment(page_number: i64, x: f64, y: f64, text: impl Into<String>) -> Self {
        Self {
            id: new_annotation_id(),
            kind: AnnotationKind::Comment {
                content: Some(text.into()),
            },
            x,
            y,
            page_number,
            metadata: None,
        }
    }

    pub fn signature(page_number: i64, x: f64, y: f64, data_url: impl Into<String>) -> Self {
        Self {
            id: new_annotation_id(),
            kind: AnnotationKind::Signature {
                content: Some(data_url.into()),
            },
            x,
            y,
            page_number,
            metadata: None,
        }
    }

    fn markup(kind: AnnotationKind, page_number: i64, rect: ViewerRect) -> Self {
        Self {
            id: new_annotation_id(),
            kind,
            x: rect.x,
            y: rect.y,
            page_number,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: ViewerMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_id(mut self, id: impl Into<AnnotationId>) -> Self {
        self.id = id.into();
        self
    }

    /// Height in viewer pixels, for kinds that carry one.
    pub fn height(&self) -> Option<f64> {
        match &self.kind {
            AnnotationKind::Highlight(f) | AnnotationKind::Underline(f) => f.height,
            _ => None,
        }
    }

    pub fn width(&self) -> Option<f64> {
        match &self.kind {
            AnnotationKind::Highlight(f) | AnnotationKind::Underline(f) => f.width,
            _ => None,
        }
    }

    pub fn color(&self) -> Option<&str> {
        match &self.kind {
            AnnotationKind::Highlight(f) | AnnotationKind::Underline(f) => f.color.as_deref(),
            _ => None,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            AnnotationKind::Highlight(f) | AnnotationKind::Underline(f) => f.content.as_deref(),
            AnnotationKind::Comment { content } | AnnotationKind::Signature { content } => {
                content.as_deref()
            }
        }
    }

    /// Replace the colour. Returns false for kinds without a colour.
    pub fn set_color(&mut self, color: impl Into<String>) -> bool {
        match &mut self.kind {
            AnnotationKind::Highlight(f) | AnnotationKind::Underline(f) => {
                f.color = Some(color.into());
                true
            }
            _ => false,
        }
    }

    pub fn set_content(&mut self, text: impl Into<String>) {
        let text = Some(text.into());
        match &mut self.kind {
            AnnotationKind::Highlight(f) | AnnotationKind::Underline(f) => f.content = text,
            AnnotationKind::Comment { content } | AnnotationKind::Signature { content } => {
                *content = text
            }
        }
    }
}

/// Parse a JSON array of annotation records as the viewer stores them.
pub fn parse_annotations(json: &str) -> Result<Vec<Annotation>, PdfMarkError> {
    serde_json::from_str(json).map_err(|e| PdfMarkError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deserializes_browser_record() {
        let json = r##"{
            "id": "a1",
            "type": "highlight",
            "x": 50,
            "y": 100,
            "width": 120,
            "height": 18,
            "color": "#FFEB3B",
            "content": "selected",
            "pageNumber": 0,
            "metadata": {"originalScale": 1.5, "pageWidth": 918, "pageHeight": 1188}
        }"##;
        let annotation: Annotation = serde_json::from_str(json).unwrap();
        assert_eq!(annotation.id, "a1");
        assert_eq!(annotation.kind.name(), "highlight");
        assert_eq!(annotation.width(), Some(120.0));
        assert_eq!(annotation.height(), Some(18.0));
        assert_eq!(annotation.color(), Some("#FFEB3B"));
        assert_eq!(annotation.page_number, 0);
        let metadata = annotation.metadata.unwrap();
        assert_eq!(metadata.original_scale, 1.5);
        assert_eq!(metadata.page_width, 918.0);
        assert_eq!(metadata.pdf_width, None);
    }

    #[test]
    fn test_none_tool_is_rejected() {
        let json = r#"{"id":"x","type":"none","x":0,"y":0,"pageNumber":0}"#;
        assert!(serde_json::from_str::<Annotation>(json).is_err());
    }

    #[test]
    fn test_json_roundtrip_keeps_metadata() {
        let original = Annotation::signature(2, 10.0, 20.0, "data:image/png;base64,AAAA")
            .with_metadata(ViewerMetadata {
                original_scale: 1.25,
                page_width: 765.0,
                page_height: 990.0,
                pdf_width: Some(612.0),
                pdf_height: Some(792.0),
            });

        let json = serde_json::to_string(&original).unwrap();
        assert!(json.contains("\"pageNumber\":2"));
        assert!(json.contains("\"type\":\"signature\""));

        let restored: Annotation = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_comment_without_content_deserializes() {
        let json = r#"{"id":"c","type":"comment","x":5,"y":6,"pageNumber":1}"#;
        let annotation: Annotation = serde_json::from_str(json).unwrap();
        assert_eq!(annotation.content(), None);
        assert_eq!(annotation.width(), None);
    }

    #[test]
    fn test_set_color_only_applies_to_markup() {
        let mut comment = Annotation::comment(0, 1.0, 1.0, "note");
        assert!(!comment.set_color("#000000"));

        let mut highlight = Annotation::highlight(
            0,
            ViewerRect {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
            },
            None,
            None,
        );
        assert!(highlight.set_color("#00FF00"));
        assert_eq!(highlight.color(), Some("#00FF00"));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = Annotation::comment(0, 0.0, 0.0, "a");
        let b = Annotation::comment(0, 0.0, 0.0, "a");
        assert_ne!(a.id, b.id);
    }
}
