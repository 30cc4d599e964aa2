//! PDF fixtures built with lopdf.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// Content of the single-image page: a 300x200 image with a caption 10pt below.
pub const IMAGE_PAGE: &str = "q 300 0 0 200 100 400 cm /Im1 Do Q\n\
                              BT /F1 10 Tf 200 382 Td (Figure 1: Results) Tj ET";

/// Content of a page holding one filled 300x200 chart area.
pub const CHART_PAGE: &str = "0.2 0.4 0.8 rg 100 300 300 200 re f\n\
                              0 0 0 RG 2 w 100 300 m 400 300 l S";

/// Content of a page with two blocks 20pt apart.
pub const SPLIT_CHART_PAGE: &str = "0 0 0 rg 100 300 150 200 re f\n\
                                    0.5 g 270 300 150 200 re f";

/// Builds small multi-page PDFs.
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        Self {
            doc,
            pages_id,
            font_id,
            kids: Vec::new(),
        }
    }

    /// Uncompressed 8-bit RGB image filled with one colour.
    pub fn rgb_image(&mut self, width: u32, height: u32, rgb: [u8; 3]) -> ObjectId {
        let pixels: Vec<u8> = (0..width * height).flat_map(|_| rgb).collect();
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        self.doc.add_object(Stream::new(dict, pixels))
    }

    /// Add a US Letter page; `images` are bound under the given names.
    pub fn page(&mut self, content: &str, images: &[(&str, ObjectId)]) -> &mut Self {
        let mut xobjects = Dictionary::new();
        for (name, id) in images {
            xobjects.set(*name, *id);
        }
        let resources = dictionary! {
            "Font" => dictionary! { "F1" => self.font_id },
            "XObject" => xobjects,
        };
        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), content.as_bytes().to_vec()));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        self.kids.push(page_id.into());
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let pages = dictionary! {
            "Type" => "Pages",
            "Count" => self.kids.len() as i64,
            "Kids" => self.kids,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        self.doc.save_to(&mut out).unwrap();
        out
    }
}

/// One page, one 300x200 image, captioned "Figure 1: Results".
pub fn single_image_pdf() -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    let image = builder.rgb_image(300, 200, [200, 30, 30]);
    builder.page(IMAGE_PAGE, &[("Im1", image)]);
    builder.build()
}

/// Page 0: the captioned image. Page 1: a chart. Page 2: two nearby blocks.
pub fn mixed_pdf() -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    let image = builder.rgb_image(300, 200, [30, 200, 30]);
    builder
        .page(IMAGE_PAGE, &[("Im1", image)])
        .page(CHART_PAGE, &[])
        .page(SPLIT_CHART_PAGE, &[]);
    builder.build()
}

/// Write PDF bytes to `dir/name`.
pub fn write_pdf(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}
