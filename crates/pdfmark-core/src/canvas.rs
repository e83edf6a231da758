//! Page drawing surface
//!
//! A [`PageCanvas`] collects content-stream operators and the resources
//! they need (fill opacities, the label font, image XObjects) for a single
//! page. Each mark is drawn through a [`Pen`] inside [`PageCanvas::draw`];
//! a mark whose drawing fails contributes nothing. [`PageCanvas::commit`]
//! then appends everything to the page in one step, wrapping the existing
//! content in `q`/`Q` so its graphics state cannot leak into the marks.

use std::collections::{BTreeMap, BTreeSet};

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::color::Rgb;
use crate::error::MarkError;
use crate::fonts::{encode_win_ansi, LABEL_FONT};
use crate::transform::PageSize;

const FONT_RESOURCE: &str = "PmHelv";
const MAX_TREE_DEPTH: usize = 32;

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

fn gs_name(percent: u32) -> String {
    format!("PmGs{}", percent)
}

fn opacity_percent(opacity: f64) -> u32 {
    (opacity.clamp(0.0, 1.0) * 100.0).round() as u32
}

/// Records the operators for one mark.
#[derive(Debug)]
pub struct Pen {
    ops: Vec<Operation>,
    opacities: BTreeSet<u32>,
    uses_font: bool,
    images: Vec<(String, ObjectId)>,
    image_base: usize,
}

impl Pen {
    fn new(image_base: usize) -> Self {
        Self {
            ops: Vec::new(),
            opacities: BTreeSet::new(),
            uses_font: false,
            images: Vec::new(),
            image_base,
        }
    }

    fn set_opacity(&mut self, opacity: f64) {
        let percent = opacity_percent(opacity);
        self.opacities.insert(percent);
        self.ops.push(Operation::new(
            "gs",
            vec![Object::Name(gs_name(percent).into_bytes())],
        ));
    }

    fn fill_color(&mut self, c: Rgb) {
        self.ops.push(Operation::new(
            "rg",
            vec![c.r.into(), c.g.into(), c.b.into()],
        ));
    }

    fn stroke_color(&mut self, c: Rgb) {
        self.ops.push(Operation::new(
            "RG",
            vec![c.r.into(), c.g.into(), c.b.into()],
        ));
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ops.push(Operation::new(
            "re",
            vec![real(x), real(y), real(width), real(height)],
        ));
    }

    /// Filled rectangle, no border.
    pub fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, fill: Rgb, opacity: f64) {
        self.ops.push(Operation::new("q", vec![]));
        self.set_opacity(opacity);
        self.fill_color(fill);
        self.rect(x, y, width, height);
        self.ops.push(Operation::new("f", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    /// Filled rectangle with a stroked border.
    #[allow(clippy::too_many_arguments)]
    pub fn boxed_rect(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Rgb,
        border: Rgb,
        border_width: f64,
        opacity: f64,
    ) {
        self.ops.push(Operation::new("q", vec![]));
        self.set_opacity(opacity);
        self.fill_color(fill);
        self.stroke_color(border);
        self.ops.push(Operation::new("w", vec![real(border_width)]));
        self.rect(x, y, width, height);
        self.ops.push(Operation::new("B", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    pub fn line(&mut self, from: (f64, f64), to: (f64, f64), color: Rgb, thickness: f64) {
        self.ops.push(Operation::new("q", vec![]));
        self.stroke_color(color);
        self.ops.push(Operation::new("w", vec![real(thickness)]));
        self.ops
            .push(Operation::new("m", vec![real(from.0), real(from.1)]));
        self.ops.push(Operation::new("l", vec![real(to.0), real(to.1)]));
        self.ops.push(Operation::new("S", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    /// Single line of Helvetica text with its baseline at `(x, y)`.
    pub fn text(&mut self, x: f64, y: f64, size: f64, text: &str, color: Rgb) {
        self.uses_font = true;
        self.ops.push(Operation::new("q", vec![]));
        self.fill_color(color);
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tf",
            vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), real(size)],
        ));
        self.ops.push(Operation::new("Td", vec![real(x), real(y)]));
        self.ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(encode_win_ansi(text))],
        ));
        self.ops.push(Operation::new("ET", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    /// Paint an image XObject into the box with lower-left corner `(x, y)`.
    pub fn image(&mut self, image_id: ObjectId, x: f64, y: f64, width: f64, height: f64) {
        let name = format!("PmIm{}", self.image_base + self.images.len());
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new(
            "cm",
            vec![
                real(width),
                real(0.0),
                real(0.0),
                real(height),
                real(x),
                real(y),
            ],
        ));
        self.ops
            .push(Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]));
        self.ops.push(Operation::new("Q", vec![]));
        self.images.push((name, image_id));
    }
}

/// Pending marks for one page.
#[derive(Debug)]
pub struct PageCanvas {
    page_id: ObjectId,
    size: PageSize,
    ops: Vec<Operation>,
    opacities: BTreeSet<u32>,
    uses_font: bool,
    images: Vec<(String, ObjectId)>,
    marks: usize,
}

impl PageCanvas {
    pub fn new(page_id: ObjectId, size: PageSize) -> Self {
        Self {
            page_id,
            size,
            ops: Vec::new(),
            opacities: BTreeSet::new(),
            uses_font: false,
            images: Vec::new(),
            marks: 0,
        }
    }

    pub fn size(&self) -> PageSize {
        self.size
    }

    pub fn page_id(&self) -> ObjectId {
        self.page_id
    }

    /// Number of marks drawn so far.
    pub fn mark_count(&self) -> usize {
        self.marks
    }

    /// Draw one mark. If `f` fails, nothing it recorded is kept.
    pub fn draw<F>(&mut self, f: F) -> Result<(), MarkError>
    where
        F: FnOnce(&mut Pen) -> Result<(), MarkError>,
    {
        let mut pen = Pen::new(self.images.len());
        f(&mut pen)?;

        self.ops.extend(pen.ops);
        self.opacities.extend(pen.opacities);
        self.uses_font |= pen.uses_font;
        self.images.extend(pen.images);
        self.marks += 1;
        Ok(())
    }

    /// Write the collected marks into the page.
    pub fn commit(self, doc: &mut Document) -> Result<(), MarkError> {
        if self.ops.is_empty() {
            return Ok(());
        }

        let mut ops = self.ops;
        let mut resources = effective_resources(doc, self.page_id)?;

        if !self.opacities.is_empty() {
            let mut states = resolved_subdict(doc, &resources, b"ExtGState");
            let mut renames = BTreeMap::new();
            for percent in &self.opacities {
                let alpha = *percent as f32 / 100.0;
                let pending = gs_name(*percent);
                let name = unused_name(&states, &pending);
                states.set(
                    name.as_str(),
                    Object::Dictionary(dictionary! {
                        "Type" => "ExtGState",
                        "ca" => alpha,
                        "CA" => alpha,
                    }),
                );
                renames.insert(pending, name);
            }
            resources.set("ExtGState", Object::Dictionary(states));
            rename_operands(&mut ops, "gs", &renames);
        }

        if self.uses_font {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => LABEL_FONT,
                "Encoding" => "WinAnsiEncoding",
            });
            let mut fonts = resolved_subdict(doc, &resources, b"Font");
            let name = unused_name(&fonts, FONT_RESOURCE);
            fonts.set(name.as_str(), Object::Reference(font_id));
            resources.set("Font", Object::Dictionary(fonts));
            let renames = BTreeMap::from([(FONT_RESOURCE.to_string(), name)]);
            rename_operands(&mut ops, "Tf", &renames);
        }

        if !self.images.is_empty() {
            let mut xobjects = resolved_subdict(doc, &resources, b"XObject");
            let mut renames = BTreeMap::new();
            for (pending, id) in self.images {
                let name = unused_name(&xobjects, &pending);
                xobjects.set(name.as_str(), Object::Reference(id));
                renames.insert(pending, name);
            }
            resources.set("XObject", Object::Dictionary(xobjects));
            rename_operands(&mut ops, "Do", &renames);
        }

        let encoded = Content { operations: ops }.encode()?;

        let mut marks = b"\nQ\n".to_vec();
        marks.extend(encoded);
        let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let marks_id = doc.add_object(Stream::new(Dictionary::new(), marks));

        let page = doc.get_object_mut(self.page_id)?.as_dict_mut()?;
        let mut contents = vec![Object::Reference(open_id)];
        match page.get(b"Contents").ok().cloned() {
            Some(Object::Array(existing)) => contents.extend(existing),
            Some(existing @ Object::Reference(_)) => contents.push(existing),
            _ => {}
        }
        contents.push(Object::Reference(marks_id));
        page.set("Contents", Object::Array(contents));
        page.set("Resources", Object::Dictionary(resources));

        tracing::debug!(page = ?self.page_id, marks = self.marks, "committed page marks");
        Ok(())
    }
}

/// `base`, or `base_N` for the first N that `dict` does not already use.
fn unused_name(dict: &Dictionary, base: &str) -> String {
    if !dict.has(base.as_bytes()) {
        return base.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}_{}", base, n);
        if !dict.has(candidate.as_bytes()) {
            return candidate;
        }
        n += 1;
    }
}

/// Point the first (name) operand of every `operator` at its final name.
fn rename_operands(ops: &mut [Operation], operator: &str, renames: &BTreeMap<String, String>) {
    for op in ops.iter_mut().filter(|op| op.operator == operator) {
        if let Some(Object::Name(name)) = op.operands.first_mut() {
            let target = std::str::from_utf8(name).ok().and_then(|n| renames.get(n));
            if let Some(target) = target {
                *name = target.clone().into_bytes();
            }
        }
    }
}

/// Look up an inheritable page attribute, walking up the page tree.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_object(page_id).and_then(Object::as_dict).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_object(parent).and_then(Object::as_dict).ok()?;
    }
    None
}

fn deref<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(v) => Some(*v as f64),
        Object::Real(v) => Some(f64::from(*v)),
        _ => None,
    }
}

/// Page size from the effective MediaBox, US Letter when none is found.
pub fn page_size(doc: &Document, page_id: ObjectId) -> PageSize {
    let media_box = inherited(doc, page_id, b"MediaBox")
        .map(|o| deref(doc, o))
        .and_then(|o| o.as_array().ok())
        .filter(|arr| arr.len() == 4)
        .and_then(|arr| {
            let values: Vec<f64> = arr.iter().filter_map(|o| number(deref(doc, o))).collect();
            (values.len() == 4).then(|| [values[0], values[1], values[2], values[3]])
        });

    match media_box {
        Some(mb) => PageSize::from_media_box(mb),
        None => PageSize::LETTER,
    }
}

/// The page's resource dictionary (own or inherited), detached as a copy.
fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary, MarkError> {
    match inherited(doc, page_id, b"Resources").map(|o| deref(doc, o)) {
        Some(Object::Dictionary(dict)) => Ok(dict.clone()),
        Some(_) => Err(MarkError::Pdf("page Resources is not a dictionary".into())),
        None => Ok(Dictionary::new()),
    }
}

fn resolved_subdict(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .map(|o| deref(doc, o))
        .and_then(|o| o.as_dict().ok())
        .cloned()
        .unwrap_or_default()
}
