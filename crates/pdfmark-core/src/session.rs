//! Annotation session
//!
//! The working set of annotations for one document. Annotations are kept
//! in placement order, which is also the undo order. There is no per-item
//! delete: marks go away through [`AnnotationSession::undo_last`] or
//! [`AnnotationSession::clear`].

use serde::{Deserialize, Serialize};

use crate::annotation::{
    new_annotation_id, Annotation, AnnotationId, AnnotationKind, ViewerMetadata,
    DEFAULT_HIGHLIGHT_COLOR,
};
use crate::bake::export_file_name;
use crate::error::SessionError;

/// Viewer-pixel distance under which a comment placement edits the
/// existing comment instead of adding a new one.
pub const COMMENT_PROXIMITY: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationSession {
    pub document_name: String,
    annotations: Vec<Annotation>,
    /// Colour given to new highlights that arrive without one.
    pub selected_color: String,
}

impl AnnotationSession {
    pub fn new(document_name: impl Into<String>) -> Self {
        Self {
            document_name: document_name.into(),
            annotations: Vec::new(),
            selected_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
        }
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    /// Append an annotation, assigning an id when it has none. Comments
    /// and signatures must carry their text or image.
    pub fn add(&mut self, mut annotation: Annotation) -> Result<AnnotationId, SessionError> {
        if needs_content(&annotation.kind) && !has_text(annotation.content()) {
            return Err(SessionError::MissingContent(annotation.kind.name()));
        }

        if annotation.id.is_empty() {
            annotation.id = new_annotation_id();
        } else if self.get(&annotation.id).is_some() {
            return Err(SessionError::DuplicateId(annotation.id));
        }

        if let AnnotationKind::Highlight(fields) = &mut annotation.kind {
            if fields.color.is_none() {
                fields.color = Some(self.selected_color.clone());
            }
        }

        let id = annotation.id.clone();
        tracing::debug!(%id, kind = annotation.kind.name(), "annotation added");
        self.annotations.push(annotation);
        Ok(id)
    }

    /// Remove and return the most recently added annotation.
    pub fn undo_last(&mut self) -> Option<Annotation> {
        self.annotations.pop()
    }

    /// Remove everything. Returns how many annotations were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.annotations.len();
        self.annotations.clear();
        count
    }

    /// Place a comment at `(x, y)`. If a comment already sits within
    /// [`COMMENT_PROXIMITY`] on the same page its text is replaced;
    /// otherwise a new comment is added.
    pub fn upsert_comment(
        &mut self,
        page_number: i64,
        x: f64,
        y: f64,
        text: impl Into<String>,
        metadata: Option<ViewerMetadata>,
    ) -> Result<AnnotationId, SessionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SessionError::MissingContent("comment"));
        }
        let existing = self.annotations.iter_mut().find(|a| {
            matches!(a.kind, AnnotationKind::Comment { .. })
                && a.page_number == page_number
                && (a.x - x).abs() < COMMENT_PROXIMITY
                && (a.y - y).abs() < COMMENT_PROXIMITY
        });

        if let Some(comment) = existing {
            comment.set_content(text);
            tracing::debug!(id = %comment.id, "comment edited in place");
            return Ok(comment.id.clone());
        }

        let mut comment = Annotation::comment(page_number, x, y, text);
        comment.metadata = metadata;
        self.add(comment)
    }

    /// Recolour a highlight or underline. Returns false for kinds that
    /// have no colour.
    pub fn update_color(&mut self, id: &str, color: impl Into<String>) -> Result<bool, SessionError> {
        let annotation = self.find_mut(id)?;
        Ok(annotation.set_color(color))
    }

    pub fn update_content(&mut self, id: &str, text: impl Into<String>) -> Result<(), SessionError> {
        self.find_mut(id)?.set_content(text);
        Ok(())
    }

    pub fn export_file_name(&self) -> String {
        export_file_name(&self.document_name)
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Annotation, SessionError> {
        self.annotations
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }
}

fn needs_content(kind: &AnnotationKind) -> bool {
    matches!(
        kind,
        AnnotationKind::Comment { .. } | AnnotationKind::Signature { .. }
    )
}

fn has_text(content: Option<&str>) -> bool {
    content.is_some_and(|c| !c.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::ViewerRect;
    use pretty_assertions::assert_eq;

    fn rect() -> ViewerRect {
        ViewerRect {
            x: 10.0,
            y: 20.0,
            width: 30.0,
            height: 12.0,
        }
    }

    #[test]
    fn test_new_session_is_empty() {
        let session = AnnotationSession::new("report.pdf");
        assert!(session.is_empty());
        assert_eq!(session.selected_color, DEFAULT_HIGHLIGHT_COLOR);
        assert_eq!(session.export_file_name(), "annotated-report.pdf");
    }

    #[test]
    fn test_add_assigns_missing_id() {
        let mut session = AnnotationSession::new("a.pdf");
        let id = session
            .add(Annotation::comment(0, 1.0, 2.0, "hi").with_id(""))
            .unwrap();
        assert!(!id.is_empty());
        assert_eq!(session.get(&id).unwrap().content(), Some("hi"));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut session = AnnotationSession::new("a.pdf");
        session
            .add(Annotation::comment(0, 1.0, 2.0, "one").with_id("x"))
            .unwrap();
        let err = session
            .add(Annotation::comment(0, 5.0, 5.0, "two").with_id("x"))
            .unwrap_err();
        assert!(matches!(err, SessionError::DuplicateId(id) if id == "x"));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_comment_or_signature_without_content_is_rejected() {
        let mut session = AnnotationSession::new("a.pdf");
        let placeholder: Annotation = serde_json::from_value(serde_json::json!({
            "id": "sig", "type": "signature", "x": 10, "y": 10, "pageNumber": 0
        }))
        .unwrap();

        let err = session.add(placeholder).unwrap_err();
        assert!(matches!(err, SessionError::MissingContent("signature")));
        let err = session
            .add(Annotation::comment(0, 1.0, 1.0, "   "))
            .unwrap_err();
        assert!(matches!(err, SessionError::MissingContent("comment")));
        assert!(matches!(
            session.upsert_comment(0, 1.0, 1.0, "", None),
            Err(SessionError::MissingContent(_))
        ));
        assert!(session.is_empty());

        // Highlights may be empty of text.
        session
            .add(Annotation::highlight(0, rect(), None, None))
            .unwrap();
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn test_highlight_without_color_takes_selected_color() {
        let mut session = AnnotationSession::new("a.pdf");
        session.selected_color = "#00FF00".into();
        let id = session
            .add(Annotation::highlight(0, rect(), None, None))
            .unwrap();
        assert_eq!(session.get(&id).unwrap().color(), Some("#00FF00"));
    }

    #[test]
    fn test_undo_restores_previous_state() {
        let mut session = AnnotationSession::new("a.pdf");
        session
            .add(Annotation::highlight(0, rect(), None, None))
            .unwrap();
        let before = session.clone();

        let added = Annotation::underline(1, rect(), None, None);
        session.add(added.clone()).unwrap();
        let removed = session.undo_last().unwrap();

        assert_eq!(removed, added);
        assert_eq!(session, before);
    }

    #[test]
    fn test_undo_on_empty_session() {
        let mut session = AnnotationSession::new("a.pdf");
        assert!(session.undo_last().is_none());
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut session = AnnotationSession::new("a.pdf");
        session.add(Annotation::comment(0, 1.0, 1.0, "a")).unwrap();
        session.add(Annotation::comment(0, 50.0, 1.0, "b")).unwrap();
        assert_eq!(session.clear(), 2);
        assert!(session.is_empty());
    }

    #[test]
    fn test_nearby_comment_is_edited_in_place() {
        let mut session = AnnotationSession::new("a.pdf");
        let first = session.upsert_comment(0, 100.0, 100.0, "draft", None).unwrap();
        let second = session.upsert_comment(0, 105.0, 96.0, "final", None).unwrap();

        assert_eq!(first, second);
        assert_eq!(session.len(), 1);
        assert_eq!(session.get(&first).unwrap().content(), Some("final"));
    }

    #[test]
    fn test_distant_or_other_page_comment_is_new() {
        let mut session = AnnotationSession::new("a.pdf");
        session.upsert_comment(0, 100.0, 100.0, "a", None).unwrap();
        session.upsert_comment(0, 110.0, 100.0, "b", None).unwrap();
        session.upsert_comment(1, 100.0, 100.0, "c", None).unwrap();
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn test_update_color_and_content() {
        let mut session = AnnotationSession::new("a.pdf");
        let hl = session
            .add(Annotation::highlight(0, rect(), None, None))
            .unwrap();
        let note = session.add(Annotation::comment(0, 1.0, 1.0, "x")).unwrap();

        assert!(session.update_color(&hl, "#123456").unwrap());
        assert!(!session.update_color(&note, "#123456").unwrap());
        session.update_content(&note, "y").unwrap();

        assert_eq!(session.get(&hl).unwrap().color(), Some("#123456"));
        assert_eq!(session.get(&note).unwrap().content(), Some("y"));
        assert!(matches!(
            session.update_content("missing", "z"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_json_roundtrip_keeps_metadata() {
        let mut session = AnnotationSession::new("a.pdf");
        let metadata = ViewerMetadata {
            original_scale: 1.5,
            page_width: 918.0,
            page_height: 1188.0,
            pdf_width: Some(612.0),
            pdf_height: Some(792.0),
        };
        session
            .add(Annotation::highlight(2, rect(), None, Some("text".into())).with_metadata(metadata))
            .unwrap();

        let restored = AnnotationSession::from_json(&session.to_json().unwrap()).unwrap();
        assert_eq!(restored, session);
        assert_eq!(restored.annotations()[0].metadata, Some(metadata));
    }
}
