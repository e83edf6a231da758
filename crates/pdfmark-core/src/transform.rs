//! Coordinate transformation from viewer space to PDF space
//!
//! Viewer space: pixels, origin top-left, Y grows downward, scaled by the
//! zoom the user had when placing the mark.
//! PDF space: points, origin bottom-left, Y grows upward.

use crate::annotation::{Annotation, ViewerMetadata};

/// Vertical extent assumed for marks that carry no height.
pub const FALLBACK_HEIGHT: f64 = 10.0;

/// Size of the target page in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Size from a `[x1 y1 x2 y2]` MediaBox.
    pub fn from_media_box(media_box: [f64; 4]) -> Self {
        let [x1, y1, x2, y2] = media_box;
        Self {
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }
}

/// An annotation's placement expressed in PDF space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfGeometry {
    pub x: f64,
    /// Bottom edge of the mark: the anchor's top edge, flipped, minus the
    /// scaled height (or [`FALLBACK_HEIGHT`] when there is none).
    pub y: f64,
    /// The anchor's top edge, flipped.
    pub top: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub scale: f64,
}

impl PdfGeometry {
    /// Scale a viewer-space length into PDF points.
    pub fn scaled(&self, length: f64) -> f64 {
        length * self.scale
    }
}

/// Ratio between PDF points and viewer pixels.
///
/// Takes the smaller of the two axis ratios so a mark never overflows the
/// more constrained axis. Without usable metadata no correction is possible
/// and the ratio is 1.
pub fn scale_factor(metadata: Option<&ViewerMetadata>, page: PageSize) -> f64 {
    let Some(m) = metadata else {
        return 1.0;
    };
    let usable = |v: f64| v.is_finite() && v > 0.0;
    if !usable(m.page_width) || !usable(m.page_height) {
        return 1.0;
    }
    let x_scale = page.width / m.page_width;
    let y_scale = page.height / m.page_height;
    x_scale.min(y_scale)
}

/// Map a viewer-space box onto a page of the given size.
pub fn to_pdf_space(
    x: f64,
    y: f64,
    width: Option<f64>,
    height: Option<f64>,
    metadata: Option<&ViewerMetadata>,
    page: PageSize,
) -> PdfGeometry {
    let scale = scale_factor(metadata, page);
    let top = page.height - y * scale;
    let drop = height.map(|h| h * scale).unwrap_or(FALLBACK_HEIGHT);

    PdfGeometry {
        x: x * scale,
        y: top - drop,
        top,
        width: width.map(|w| w * scale),
        height: height.map(|h| h * scale),
        scale,
    }
}

/// Map an annotation onto a page of the given size.
pub fn annotation_geometry(annotation: &Annotation, page: PageSize) -> PdfGeometry {
    to_pdf_space(
        annotation.x,
        annotation.y,
        annotation.width(),
        annotation.height(),
        annotation.metadata.as_ref(),
        page,
    )
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        1.0f64..3000.0
    }

    proptest! {
        /// Property: the transform is a pure function of its inputs
        #[test]
        fn transform_is_deterministic(
            x in 0.0f64..2000.0,
            y in 0.0f64..2000.0,
            h in proptest::option::of(0.0f64..200.0),
            vw in dimension(),
            vh in dimension(),
            pw in dimension(),
            ph in dimension(),
        ) {
            let m = ViewerMetadata {
                original_scale: 1.0,
                page_width: vw,
                page_height: vh,
                pdf_width: None,
                pdf_height: None,
            };
            let page = PageSize::new(pw, ph);
            let a = to_pdf_space(x, y, None, h, Some(&m), page);
            let b = to_pdf_space(x, y, None, h, Some(&m), page);
            prop_assert_eq!(a, b);
        }

        /// Property: a full-page viewer box maps inside the page on the constrained axis
        #[test]
        fn full_page_box_fits(
            vw in dimension(),
            vh in dimension(),
            pw in dimension(),
            ph in dimension(),
        ) {
            let m = ViewerMetadata {
                original_scale: 1.0,
                page_width: vw,
                page_height: vh,
                pdf_width: None,
                pdf_height: None,
            };
            let page = PageSize::new(pw, ph);
            let g = to_pdf_space(0.0, 0.0, Some(vw), Some(vh), Some(&m), page);
            prop_assert!(g.width.unwrap() <= pw + 1e-6);
            prop_assert!(g.height.unwrap() <= ph + 1e-6);
            prop_assert!(g.y >= -1e-6);
            prop_assert!((g.top - ph).abs() < 1e-9);
        }
    }
}
