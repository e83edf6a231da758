//! Bake annotations into a PDF
//!
//! Loads the source document, resolves each annotation's page, transforms
//! and renders it, then serializes the result. A failure scoped to one
//! annotation becomes a [`BakeWarning`] and the bake carries on; only an
//! unloadable or unsavable document fails the whole call.

use lopdf::{Document, ObjectId};
use serde::Serialize;

use crate::annotation::{Annotation, AnnotationId};
use crate::canvas::{page_size, PageCanvas};
use crate::error::{MarkError, PdfMarkError};
use crate::page_resolver::group_by_page;
use crate::render::render_annotation;

/// One annotation that was left out of the output.
#[derive(Debug, Clone, PartialEq)]
pub struct BakeWarning {
    pub annotation_id: AnnotationId,
    /// Page the annotation resolved to, if any.
    pub page_index: Option<usize>,
    pub error: MarkError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BakeStatus {
    /// Every annotation was drawn.
    Complete,
    /// At least one annotation was skipped; the document is still valid.
    Partial,
}

/// In-memory result of a bake.
#[derive(Debug)]
pub struct BakeOutcome {
    pub document: Document,
    pub warnings: Vec<BakeWarning>,
}

impl BakeOutcome {
    pub fn status(&self) -> BakeStatus {
        status_for(&self.warnings)
    }

    pub fn to_bytes(mut self) -> Result<BakedPdf, PdfMarkError> {
        let mut bytes = Vec::new();
        self.document
            .save_to(&mut bytes)
            .map_err(|e| PdfMarkError::Save(e.to_string()))?;
        Ok(BakedPdf {
            bytes,
            warnings: self.warnings,
        })
    }
}

/// Serialized result of a bake.
#[derive(Debug, Clone)]
pub struct BakedPdf {
    pub bytes: Vec<u8>,
    pub warnings: Vec<BakeWarning>,
}

impl BakedPdf {
    pub fn status(&self) -> BakeStatus {
        status_for(&self.warnings)
    }
}

fn status_for(warnings: &[BakeWarning]) -> BakeStatus {
    if warnings.is_empty() {
        BakeStatus::Complete
    } else {
        BakeStatus::Partial
    }
}

/// Download name for a baked copy of `original`.
pub fn export_file_name(original: &str) -> String {
    let original = original.trim();
    if original.is_empty() {
        "annotated-document.pdf".to_string()
    } else {
        format!("annotated-{}", original)
    }
}

/// Bake `annotations` into `pdf_bytes` and serialize the result.
///
/// The source is always parsed. With no annotations the original bytes are
/// then returned untouched.
pub fn bake_to_bytes(pdf_bytes: &[u8], annotations: &[Annotation]) -> Result<BakedPdf, PdfMarkError> {
    let mut document = load(pdf_bytes)?;
    if annotations.is_empty() {
        return Ok(BakedPdf {
            bytes: pdf_bytes.to_vec(),
            warnings: Vec::new(),
        });
    }
    let warnings = bake_into(&mut document, annotations);
    BakeOutcome { document, warnings }.to_bytes()
}

/// Bake `annotations` into `pdf_bytes`, keeping the document in memory.
pub fn bake_document(
    pdf_bytes: &[u8],
    annotations: &[Annotation],
) -> Result<BakeOutcome, PdfMarkError> {
    let mut document = load(pdf_bytes)?;
    let warnings = bake_into(&mut document, annotations);
    Ok(BakeOutcome { document, warnings })
}

fn load(pdf_bytes: &[u8]) -> Result<Document, PdfMarkError> {
    Document::load_mem(pdf_bytes).map_err(|e| PdfMarkError::Load(e.to_string()))
}

/// Draw `annotations` onto an already loaded document.
pub fn bake_into(document: &mut Document, annotations: &[Annotation]) -> Vec<BakeWarning> {
    let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
    let groups = group_by_page(annotations, pages.len());
    let mut warnings = Vec::new();

    for annotation in &groups.unplaced {
        let error = MarkError::PageOutOfRange {
            index: annotation.page_number.max(0) as usize,
            page_count: pages.len(),
        };
        tracing::warn!(id = %annotation.id, %error, "annotation has no page to land on");
        warnings.push(BakeWarning {
            annotation_id: annotation.id.clone(),
            page_index: None,
            error,
        });
    }

    for (index, page_annotations) in &groups.groups {
        bake_page(document, &pages, *index, page_annotations, &mut warnings);
    }

    tracing::info!(
        annotations = annotations.len(),
        skipped = warnings.len(),
        "bake finished"
    );
    warnings
}

/// Draw one page's annotations and commit them.
fn bake_page(
    document: &mut Document,
    pages: &[ObjectId],
    index: usize,
    page_annotations: &[&Annotation],
    warnings: &mut Vec<BakeWarning>,
) {
    let Some(&page_id) = pages.get(index) else {
        let error = MarkError::PageOutOfRange {
            index,
            page_count: pages.len(),
        };
        tracing::warn!(page = index, %error, "page group has no page to land on");
        warnings.extend(page_annotations.iter().map(|annotation| BakeWarning {
            annotation_id: annotation.id.clone(),
            page_index: None,
            error: error.clone(),
        }));
        return;
    };
    let mut canvas = PageCanvas::new(page_id, page_size(document, page_id));

    let mut drawn = Vec::with_capacity(page_annotations.len());
    for annotation in page_annotations {
        if let Err(error) = render_annotation(document, &mut canvas, annotation) {
            tracing::warn!(
                id = %annotation.id,
                kind = annotation.kind.name(),
                page = index,
                %error,
                "skipping annotation"
            );
            warnings.push(BakeWarning {
                annotation_id: annotation.id.clone(),
                page_index: Some(index),
                error,
            });
        } else {
            drawn.push(*annotation);
        }
    }

    if let Err(error) = canvas.commit(document) {
        tracing::warn!(page = index, %error, "could not write page marks");
        for annotation in drawn {
            warnings.push(BakeWarning {
                annotation_id: annotation.id.clone(),
                page_index: Some(index),
                error: error.clone(),
            });
        }
        return;
    }
    tracing::debug!(page = index, drawn = drawn.len(), "page baked");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{ViewerMetadata, ViewerRect};
    use crate::test_support::{blank_document, blank_pdf, encode_png, png_data_url, tiny_png};
    use lopdf::content::Content;
    use lopdf::Object;
    use pretty_assertions::assert_eq;

    fn page_content(doc: &Document, index: usize) -> Content {
        let page_id = doc.get_pages().into_values().nth(index).unwrap();
        Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap()
    }

    fn real_args(op: &lopdf::content::Operation) -> Vec<f32> {
        op.operands
            .iter()
            .map(|o| match o {
                Object::Real(v) => *v,
                Object::Integer(v) => *v as f32,
                other => panic!("unexpected operand {:?}", other),
            })
            .collect()
    }

    fn highlight(page: i64) -> Annotation {
        Annotation::highlight(
            page,
            ViewerRect {
                x: 50.0,
                y: 100.0,
                width: 120.0,
                height: 18.0,
            },
            Some("#FFEB3B".into()),
            None,
        )
    }

    #[test]
    fn test_empty_annotation_list_returns_source_bytes() {
        let pdf = blank_pdf(1, 612.0, 792.0);
        let baked = bake_to_bytes(&pdf, &[]).unwrap();
        assert_eq!(baked.bytes, pdf);
        assert_eq!(baked.status(), BakeStatus::Complete);

        let garbage = bake_to_bytes(b"definitely not a pdf", &[]);
        assert!(matches!(garbage, Err(PdfMarkError::Load(_))));
    }

    #[test]
    fn test_unloadable_bytes_are_fatal() {
        let result = bake_to_bytes(b"not a pdf", &[highlight(0)]);
        assert!(matches!(result, Err(PdfMarkError::Load(_))));
    }

    #[test]
    fn test_highlight_lands_on_first_page() {
        let pdf = blank_pdf(2, 612.0, 792.0);
        let metadata = ViewerMetadata {
            original_scale: 1.0,
            page_width: 612.0,
            page_height: 792.0,
            pdf_width: None,
            pdf_height: None,
        };
        let annotation = highlight(0).with_id("h1").with_metadata(metadata);

        let outcome = bake_document(&pdf, &[annotation]).unwrap();
        assert_eq!(outcome.status(), BakeStatus::Complete);

        let content = page_content(&outcome.document, 0);
        let rect = content
            .operations
            .iter()
            .find(|op| op.operator == "re")
            .expect("highlight rectangle");
        assert_eq!(real_args(rect), vec![50.0, 674.0, 120.0, 18.0]);
        assert!(content
            .operations
            .iter()
            .any(|op| op.operator == "gs"
                && op.operands[0].as_name().ok() == Some(&b"PmGs30"[..])));

        let page_id = outcome.document.get_pages()[&1];
        let page = outcome.document.get_object(page_id).unwrap().as_dict().unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let state = resources
            .get(b"ExtGState")
            .and_then(Object::as_dict)
            .and_then(|states| states.get(b"PmGs30"))
            .and_then(Object::as_dict)
            .unwrap();
        let alpha = state.get(b"ca").and_then(Object::as_float).unwrap();
        assert!((alpha - 0.3).abs() < 1e-6);

        let second = page_content(&outcome.document, 1);
        assert!(second.operations.iter().all(|op| op.operator != "re"));
    }

    #[test]
    fn test_out_of_range_page_is_clamped() {
        let pdf = blank_pdf(3, 612.0, 792.0);
        let outcome = bake_document(&pdf, &[highlight(7)]).unwrap();
        assert!(outcome.warnings.is_empty());

        let last = page_content(&outcome.document, 2);
        assert!(last.operations.iter().any(|op| op.operator == "re"));
        let first = page_content(&outcome.document, 0);
        assert!(first.operations.iter().all(|op| op.operator != "re"));
    }

    #[test]
    fn test_one_bad_signature_does_not_sink_the_bake() {
        let pdf = blank_pdf(1, 612.0, 792.0);
        let annotations = vec![
            highlight(0).with_id("a"),
            Annotation::comment(0, 200.0, 200.0, "Looks good").with_id("b"),
            Annotation::signature(0, 100.0, 600.0, "data:image/png;base64,!!!").with_id("c"),
            Annotation::signature(0, 300.0, 600.0, png_data_url(&tiny_png())).with_id("d"),
            Annotation::underline(
                0,
                ViewerRect {
                    x: 50.0,
                    y: 300.0,
                    width: 80.0,
                    height: 12.0,
                },
                None,
                None,
            )
            .with_id("e"),
        ];

        let baked = bake_to_bytes(&pdf, &annotations).unwrap();
        assert_eq!(baked.status(), BakeStatus::Partial);
        assert_eq!(baked.warnings.len(), 1);
        assert_eq!(baked.warnings[0].annotation_id, "c");
        assert_eq!(baked.warnings[0].page_index, Some(0));
        assert!(matches!(baked.warnings[0].error, MarkError::InvalidBase64(_)));

        let doc = Document::load_mem(&baked.bytes).unwrap();
        let content = page_content(&doc, 0);
        assert_eq!(
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Do")
                .count(),
            1
        );
    }

    #[test]
    fn test_zero_page_document_warns_per_annotation() {
        let mut doc = blank_document(0, 612.0, 792.0);
        let warnings = bake_into(&mut doc, &[highlight(0), highlight(3)]);
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.page_index.is_none()));
        assert_eq!(
            warnings[1].error,
            MarkError::PageOutOfRange {
                index: 3,
                page_count: 0
            }
        );
    }

    #[test]
    fn test_group_without_a_page_is_skipped_with_warnings() {
        let mut doc = blank_document(1, 612.0, 792.0);
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        let first = highlight(4).with_id("x");
        let second = highlight(4).with_id("y");
        let mut warnings = Vec::new();

        bake_page(&mut doc, &pages, 4, &[&first, &second], &mut warnings);

        let ids: Vec<_> = warnings.iter().map(|w| w.annotation_id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y"]);
        assert!(warnings.iter().all(|w| w.page_index.is_none()
            && w.error
                == MarkError::PageOutOfRange {
                    index: 4,
                    page_count: 1
                }));
        let content = page_content(&doc, 0);
        assert!(content.operations.iter().all(|op| op.operator != "re"));
    }

    #[test]
    fn test_rebaking_keeps_earlier_signature_image() {
        let pdf = blank_pdf(1, 612.0, 792.0);
        let first = Annotation::signature(0, 100.0, 100.0, png_data_url(&tiny_png()));
        let once = bake_to_bytes(&pdf, &[first]).unwrap();
        assert!(once.warnings.is_empty());

        let wider = encode_png(3, 2, png::ColorType::Rgba, &[0; 24]);
        let second = Annotation::signature(0, 300.0, 100.0, png_data_url(&wider));
        let twice = bake_to_bytes(&once.bytes, &[second]).unwrap();
        assert!(twice.warnings.is_empty());

        let doc = Document::load_mem(&twice.bytes).unwrap();
        let names: Vec<Vec<u8>> = page_content(&doc, 0)
            .operations
            .iter()
            .filter(|op| op.operator == "Do")
            .map(|op| op.operands[0].as_name().unwrap().to_vec())
            .collect();
        assert_eq!(names.len(), 2);
        assert_ne!(names[0], names[1]);

        let page_id = doc.get_pages()[&1];
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let widths: Vec<i64> = names
            .iter()
            .map(|name| {
                let id = xobjects.get(name).unwrap().as_reference().unwrap();
                let image = doc.get_object(id).unwrap().as_stream().unwrap();
                image.dict.get(b"Width").unwrap().as_i64().unwrap()
            })
            .collect();
        assert_eq!(widths, vec![1, 3]);
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(export_file_name("contract.pdf"), "annotated-contract.pdf");
        assert_eq!(export_file_name(""), "annotated-document.pdf");
    }
}
