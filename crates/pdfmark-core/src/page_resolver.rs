//! Page resolution
//!
//! Annotations record a zero-based page index taken from the viewer. The
//! loaded document may disagree (stale session, truncated upload), so the
//! recorded index is clamped into the document's range: an out-of-range
//! mark lands on the nearest valid page instead of disappearing. No page
//! offset is applied.

use std::collections::BTreeMap;

use crate::annotation::Annotation;

/// Clamp a recorded page number into `[0, page_count - 1]`.
///
/// Returns `None` only when the document has no pages.
pub fn resolve_page_index(page_number: i64, page_count: usize) -> Option<usize> {
    if page_count == 0 {
        return None;
    }
    let last = (page_count - 1) as i64;
    Some(page_number.clamp(0, last) as usize)
}

/// Annotations partitioned by resolved page index, in original order.
#[derive(Debug, Default)]
pub struct PageGroups<'a> {
    pub groups: BTreeMap<usize, Vec<&'a Annotation>>,
    /// Annotations that could not be placed on any page.
    pub unplaced: Vec<&'a Annotation>,
}

impl<'a> PageGroups<'a> {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Group annotations by the page they will be drawn on.
pub fn group_by_page(annotations: &[Annotation], page_count: usize) -> PageGroups<'_> {
    let mut result = PageGroups::default();

    for annotation in annotations {
        match resolve_page_index(annotation.page_number, page_count) {
            Some(index) => {
                if index as i64 != annotation.page_number {
                    tracing::debug!(
                        id = %annotation.id,
                        recorded = annotation.page_number,
                        resolved = index,
                        "clamped annotation page"
                    );
                }
                result.groups.entry(index).or_default().push(annotation);
            }
            None => result.unplaced.push(annotation),
        }
    }

    result
}
