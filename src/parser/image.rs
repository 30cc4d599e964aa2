//! Image XObject decoding.
//!
//! JPEG and JPEG 2000 streams are passed through untouched. Everything else
//! is unpacked to 8-bit samples and re-encoded as PNG; streams we cannot
//! interpret fall back to their filter-decoded bytes.

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

use crate::error::{Error, Result};
use crate::model::ImageData;

use super::backend::stream_bytes;

/// Colour model of decoded samples.
#[derive(Debug, Clone, PartialEq)]
enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    /// Palette lookup into a base model; `palette` holds packed base samples.
    Indexed {
        base: Box<ColorModel>,
        palette: Vec<u8>,
    },
}

impl ColorModel {
    fn components(&self) -> usize {
        match self {
            ColorModel::Gray | ColorModel::Indexed { .. } => 1,
            ColorModel::Rgb => 3,
            ColorModel::Cmyk => 4,
        }
    }
}

/// Decode an image stream into encoded bytes.
pub(crate) fn decode_image_stream(doc: &LopdfDocument, stream: &Stream) -> ImageData {
    let dict = &stream.dict;
    let width = dimension(doc, dict, b"Width");
    let height = dimension(doc, dict, b"Height");

    if let Some(filter) = last_filter(doc, dict) {
        if filter == b"DCTDecode" || filter == b"JPXDecode" {
            if filter_count(doc, dict) == 1 {
                return ImageData::new(stream.content.clone(), width, height);
            }
            // Transport filters in front of the image codec
            if let Ok(data) = stream.decompressed_content() {
                return ImageData::new(data, width, height);
            }
        }
    }

    let samples = match stream_bytes(stream) {
        Ok(data) => data,
        Err(e) => {
            log::debug!("Keeping raw image stream: {}", e);
            return ImageData::new(stream.content.clone(), width, height);
        }
    };

    match encode_png(doc, dict, &samples, width, height) {
        Ok(png) => ImageData::new(png, width, height),
        Err(e) => {
            log::debug!("Keeping decoded image samples: {}", e);
            ImageData::new(samples, width, height)
        }
    }
}

fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn integer(doc: &LopdfDocument, dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match resolve(doc, dict.get(key).ok()?) {
        Object::Integer(i) => Some(*i),
        Object::Real(r) => Some(*r as i64),
        _ => None,
    }
}

fn dimension(doc: &LopdfDocument, dict: &Dictionary, key: &[u8]) -> u32 {
    integer(doc, dict, key)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

fn filters(doc: &LopdfDocument, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").map(|f| resolve(doc, f)) {
        Ok(Object::Name(n)) => vec![n.clone()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| resolve(doc, o).as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

fn last_filter(doc: &LopdfDocument, dict: &Dictionary) -> Option<Vec<u8>> {
    filters(doc, dict).pop()
}

fn filter_count(doc: &LopdfDocument, dict: &Dictionary) -> usize {
    filters(doc, dict).len()
}

fn color_model(doc: &LopdfDocument, obj: &Object) -> Option<ColorModel> {
    match resolve(doc, obj) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Some(ColorModel::Gray),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(ColorModel::Rgb),
            b"DeviceCMYK" | b"CMYK" => Some(ColorModel::Cmyk),
            _ => None,
        },
        Object::Array(arr) => {
            let family = resolve(doc, arr.first()?).as_name().ok()?;
            match family {
                b"ICCBased" => {
                    let Object::Stream(profile) = resolve(doc, arr.get(1)?) else {
                        return None;
                    };
                    match integer(doc, &profile.dict, b"N")? {
                        1 => Some(ColorModel::Gray),
                        3 => Some(ColorModel::Rgb),
                        4 => Some(ColorModel::Cmyk),
                        _ => None,
                    }
                }
                b"CalRGB" => Some(ColorModel::Rgb),
                b"CalGray" => Some(ColorModel::Gray),
                b"Indexed" | b"I" => {
                    let base = color_model(doc, arr.get(1)?)?;
                    let palette = match resolve(doc, arr.get(3)?) {
                        Object::String(bytes, _) => bytes.clone(),
                        Object::Stream(s) => stream_bytes(s).ok()?,
                        _ => return None,
                    };
                    Some(ColorModel::Indexed {
                        base: Box::new(base),
                        palette,
                    })
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Unpack samples and encode them as PNG.
fn encode_png(
    doc: &LopdfDocument,
    dict: &Dictionary,
    samples: &[u8],
    width: u32,
    height: u32,
) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(Error::ImageExtract("image has no dimensions".to_string()));
    }

    let is_mask = matches!(
        dict.get(b"ImageMask").map(|m| resolve(doc, m)),
        Ok(Object::Boolean(true))
    );
    let bits = if is_mask {
        1
    } else {
        integer(doc, dict, b"BitsPerComponent").unwrap_or(8)
    };
    let model = if is_mask {
        ColorModel::Gray
    } else {
        dict.get(b"ColorSpace")
            .ok()
            .and_then(|cs| color_model(doc, cs))
            .ok_or_else(|| Error::ImageExtract("unsupported colour space".to_string()))?
    };

    let (pixels, color_type) = match (bits, &model) {
        (8, ColorModel::Gray) => (take_exact(samples, width, height, 1)?, ExtendedColorType::L8),
        (8, ColorModel::Rgb) => (take_exact(samples, width, height, 3)?, ExtendedColorType::Rgb8),
        (8, ColorModel::Cmyk) => (
            cmyk_to_rgb(&take_exact(samples, width, height, 4)?),
            ExtendedColorType::Rgb8,
        ),
        (8, ColorModel::Indexed { base, palette }) => {
            let indices = take_exact(samples, width, height, 1)?;
            expand_palette(&indices, base, palette)?
        }
        (1, ColorModel::Gray) => (
            unpack_bits(samples, width, height)?,
            ExtendedColorType::L8,
        ),
        (1, ColorModel::Indexed { base, palette }) => {
            let indices: Vec<u8> = unpack_bits(samples, width, height)?
                .into_iter()
                .map(|v| u8::from(v != 0))
                .collect();
            expand_palette(&indices, base, palette)?
        }
        _ => {
            return Err(Error::ImageExtract(format!(
                "unsupported layout: {} bits, {} components",
                bits,
                model.components()
            )))
        }
    };

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(&pixels, width, height, color_type)?;
    Ok(png)
}

/// The first `width * height * components` bytes, or an error when short.
fn take_exact(samples: &[u8], width: u32, height: u32, components: usize) -> Result<Vec<u8>> {
    let needed = width as usize * height as usize * components;
    if samples.len() < needed {
        return Err(Error::ImageExtract(format!(
            "expected {} sample bytes, found {}",
            needed,
            samples.len()
        )));
    }
    Ok(samples[..needed].to_vec())
}

/// Expand 1-bit rows (padded to whole bytes) into 8-bit gray.
///
/// Stencil masks paint where the sample is 0, which the same mapping renders
/// as black.
fn unpack_bits(samples: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let row_bytes = (width as usize).div_ceil(8);
    if samples.len() < row_bytes * height as usize {
        return Err(Error::ImageExtract("truncated 1-bit image".to_string()));
    }
    let mut out = Vec::with_capacity(width as usize * height as usize);
    for row in samples.chunks(row_bytes).take(height as usize) {
        for x in 0..width as usize {
            let bit = (row[x / 8] >> (7 - (x % 8))) & 1;
            out.push(if bit == 1 { 255 } else { 0 });
        }
    }
    Ok(out)
}

fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    samples
        .chunks_exact(4)
        .flat_map(|px| {
            let k = 255 - u16::from(px[3]);
            [px[0], px[1], px[2]].map(|c| ((255 - u16::from(c)) * k / 255) as u8)
        })
        .collect()
}

fn expand_palette(
    indices: &[u8],
    base: &ColorModel,
    palette: &[u8],
) -> Result<(Vec<u8>, ExtendedColorType)> {
    fn entry(palette: &[u8], i: u8, n: usize) -> Result<&[u8]> {
        let start = usize::from(i) * n;
        palette
            .get(start..start + n)
            .ok_or_else(|| Error::ImageExtract(format!("palette index {} out of range", i)))
    }
    let n = base.components();
    let lookup = |i: u8| entry(palette, i, n);

    match base {
        ColorModel::Gray => {
            let out = indices
                .iter()
                .map(|&i| lookup(i).map(|px| px[0]))
                .collect::<Result<Vec<u8>>>()?;
            Ok((out, ExtendedColorType::L8))
        }
        ColorModel::Rgb => {
            let mut out = Vec::with_capacity(indices.len() * 3);
            for &i in indices {
                out.extend_from_slice(lookup(i)?);
            }
            Ok((out, ExtendedColorType::Rgb8))
        }
        ColorModel::Cmyk => {
            let mut cmyk = Vec::with_capacity(indices.len() * 4);
            for &i in indices {
                cmyk.extend_from_slice(lookup(i)?);
            }
            Ok((cmyk_to_rgb(&cmyk), ExtendedColorType::Rgb8))
        }
        ColorModel::Indexed { .. } => Err(Error::ImageExtract(
            "nested indexed colour space".to_string(),
        )),
    }
}
