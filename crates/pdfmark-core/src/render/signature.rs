//! Signature: an embedded raster image from a base64 data URL
//!
//! PNGs are decoded to raw samples and re-compressed with Flate, the alpha
//! channel (if any) going to a soft mask. JPEGs are embedded as-is with
//! `DCTDecode`; only their header is parsed. Nothing is added to the
//! document until the image has decoded successfully.

use std::io::{Cursor, Write};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::ImageDecoder;
use lazy_static::lazy_static;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use regex::Regex;

use crate::canvas::PageCanvas;
use crate::error::MarkError;
use crate::transform::PdfGeometry;

lazy_static! {
    static ref DATA_URL: Regex =
        Regex::new(r"(?s)^data:image/([A-Za-z0-9.+-]+);base64,(.+)$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

/// Payload of a validated data URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Validate a signature data URL and decode its payload.
pub fn decode_data_url(data_url: &str) -> Result<DataUrl, MarkError> {
    let captures = DATA_URL
        .captures(data_url.trim())
        .ok_or(MarkError::MalformedDataUrl)?;

    let subtype = captures[1].to_ascii_lowercase();
    let format = match subtype.as_str() {
        "png" => ImageFormat::Png,
        "jpeg" | "jpg" => ImageFormat::Jpeg,
        _ => return Err(MarkError::UnsupportedImageType(subtype)),
    };

    let payload: String = captures[2]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = BASE64
        .decode(payload.as_bytes())
        .map_err(|e| MarkError::InvalidBase64(e.to_string()))?;

    Ok(DataUrl { format, bytes })
}

/// An image XObject ready to be added to a document.
#[derive(Debug)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    dict: Dictionary,
    data: Vec<u8>,
    soft_mask: Option<(Dictionary, Vec<u8>)>,
}

impl PreparedImage {
    pub fn from_data_url(data: &DataUrl) -> Result<Self, MarkError> {
        match data.format {
            ImageFormat::Png => Self::from_png(&data.bytes),
            ImageFormat::Jpeg => Self::from_jpeg(&data.bytes),
        }
    }

    pub fn from_png(bytes: &[u8]) -> Result<Self, MarkError> {
        let decode_err = |e: png::DecodingError| MarkError::ImageDecode(e.to_string());

        let mut decoder = png::Decoder::new(Cursor::new(bytes));
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder.read_info().map_err(decode_err)?;
        let mut buffer = vec![0; reader.output_buffer_size()];
        let frame = reader.next_frame(&mut buffer).map_err(decode_err)?;
        let samples = &buffer[..frame.buffer_size()];

        let (color_channels, has_alpha, color_space) = match frame.color_type {
            png::ColorType::Grayscale => (1, false, "DeviceGray"),
            png::ColorType::GrayscaleAlpha => (1, true, "DeviceGray"),
            png::ColorType::Rgb => (3, false, "DeviceRGB"),
            png::ColorType::Rgba => (3, true, "DeviceRGB"),
            png::ColorType::Indexed => {
                return Err(MarkError::ImageDecode(
                    "indexed PNG was not expanded".into(),
                ))
            }
        };

        let (color, alpha) = if has_alpha {
            let stride = color_channels + 1;
            let mut color = Vec::with_capacity(samples.len() / stride * color_channels);
            let mut alpha = Vec::with_capacity(samples.len() / stride);
            for pixel in samples.chunks_exact(stride) {
                color.extend_from_slice(&pixel[..color_channels]);
                alpha.push(pixel[color_channels]);
            }
            (color, Some(alpha))
        } else {
            (samples.to_vec(), None)
        };

        let soft_mask = match alpha {
            Some(alpha) => Some((
                image_dict(frame.width, frame.height, "DeviceGray", "FlateDecode"),
                deflate(&alpha)?,
            )),
            None => None,
        };

        Ok(Self {
            width: frame.width,
            height: frame.height,
            dict: image_dict(frame.width, frame.height, color_space, "FlateDecode"),
            data: deflate(&color)?,
            soft_mask,
        })
    }

    pub fn from_jpeg(bytes: &[u8]) -> Result<Self, MarkError> {
        let decoder = image::codecs::jpeg::JpegDecoder::new(Cursor::new(bytes))
            .map_err(|e| MarkError::ImageDecode(e.to_string()))?;
        let (width, height) = decoder.dimensions();
        if width == 0 || height == 0 {
            return Err(MarkError::ImageDecode("JPEG has zero dimensions".into()));
        }
        let color_space = match decoder.color_type() {
            image::ColorType::L8 | image::ColorType::L16 => "DeviceGray",
            _ => "DeviceRGB",
        };

        Ok(Self {
            width,
            height,
            dict: image_dict(width, height, color_space, "DCTDecode"),
            data: bytes.to_vec(),
            soft_mask: None,
        })
    }

    /// Add the image (and its soft mask) to `doc`.
    pub fn embed(self, doc: &mut Document) -> ObjectId {
        let mut dict = self.dict;
        if let Some((mask_dict, mask_data)) = self.soft_mask {
            let mask_id = doc.add_object(Stream::new(mask_dict, mask_data));
            dict.set("SMask", Object::Reference(mask_id));
        }
        doc.add_object(Stream::new(dict, self.data))
    }
}

fn image_dict(width: u32, height: u32, color_space: &str, filter: &str) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => Object::Name(color_space.as_bytes().to_vec()),
        "BitsPerComponent" => 8,
        "Filter" => Object::Name(filter.as_bytes().to_vec()),
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, MarkError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| MarkError::ImageDecode(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| MarkError::ImageDecode(e.to_string()))
}

/// Embed the signature image and draw it with its top-left corner at the
/// anchor, sized to its intrinsic pixel dimensions times the page scale.
pub fn render(
    doc: &mut Document,
    canvas: &mut PageCanvas,
    geometry: &PdfGeometry,
    data_url: &str,
) -> Result<(), MarkError> {
    let data = decode_data_url(data_url)?;
    let prepared = PreparedImage::from_data_url(&data)?;

    let width = geometry.scaled(f64::from(prepared.width));
    let height = geometry.scaled(f64::from(prepared.height));
    let image_id = prepared.embed(doc);

    canvas.draw(|pen| {
        pen.image(image_id, geometry.x, geometry.top - height, width, height);
        Ok(())
    })
}
