//! Writing page images and their links into a PDF document.

use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result, bail};
use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, RgbImage};
use log::info;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use crate::model::{LinkRegion, PageSize};

const JPEG_QUALITY: u8 = 90;

fn encode_jpeg(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY)
        .encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
        .context("Failed to encode page as JPEG")?;
    Ok(buffer.into_inner())
}

/// Converts a link from top-left page pixels to a PDF rectangle (bottom-left origin)
fn link_rect(link: &LinkRegion, page_height: i64) -> Vec<Object> {
    vec![
        link.x.into(),
        (page_height - link.y - link.height).into(),
        (link.x + link.width).into(),
        (page_height - link.y).into(),
    ]
}

/// Builds a document with `count` pages, asking `load_page` for each image
/// in turn so only one decoded page is held at a time.
///
/// Every page measures one point per image pixel. `links[i]` holds the
/// clickable regions of page `i`; pages without an entry get none.
pub fn build_document<F>(count: usize, size: PageSize, links: &[Vec<LinkRegion>], mut load_page: F) -> Result<Document>
where
    F: FnMut(usize) -> Result<RgbImage>,
{
    if count == 0 {
        bail!("Cannot create a document without pages");
    }
    let (width, height) = size.pixels();
    let (width, height) = (width as i64, height as i64);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_ids: Vec<ObjectId> = (0..count).map(|_| doc.new_object_id()).collect();

    for index in 0..count {
        let image = load_page(index)?;
        let image_stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width() as i64,
                "Height" => image.height() as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
                "Filter" => "DCTDecode",
            },
            encode_jpeg(&image).with_context(|| format!("Failed to encode page {}", index + 1))?,
        );
        let image_id = doc.add_object(image_stream);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("cm", vec![width.into(), 0i64.into(), 0i64.into(), height.into(), 0i64.into(), 0i64.into()]),
                Operation::new("Do", vec![Object::Name(b"Map".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().context("Failed to encode page content")?,
        ));

        let mut annotations = Vec::new();
        for link in links.get(index).map(Vec::as_slice).unwrap_or_default() {
            let Some(&target) = page_ids.get(link.target) else {
                bail!("Page {} links to missing page {}", index + 1, link.target + 1);
            };
            let annotation_id = doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Rect" => link_rect(link, height),
                "Border" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)],
                "Dest" => vec![Object::Reference(target), Object::Name(b"Fit".to_vec())],
            });
            annotations.push(Object::Reference(annotation_id));
        }

        let page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0i64.into(), 0i64.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Map" => image_id,
                },
            },
            "Annots" => annotations,
        };
        doc.objects.insert(page_ids[index], Object::Dictionary(page));
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_ids.len() as i64,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    Ok(doc)
}

/// Writes the page image files, in order, into a PDF at `output`
pub fn write_pdf(output: &Path, page_files: &[impl AsRef<Path>], size: PageSize, links: &[Vec<LinkRegion>]) -> Result<()> {
    info!("Creating pdf with {} pages", page_files.len());
    let mut doc = build_document(page_files.len(), size, links, |index| {
        let path = page_files[index].as_ref();
        let image = image::open(path)
            .with_context(|| format!("Failed to open page image {}", path.display()))?;
        Ok(image.to_rgb8())
    })?;
    doc.save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok(())
}
