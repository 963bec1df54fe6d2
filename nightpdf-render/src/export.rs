use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use nightpdf_core::NightError;
use tracing::{info, instrument};

pub const DOWNLOAD_FILE_NAME: &str = "download.pdf";

const IMAGE_NAME: &str = "Im0";

fn export_error(err: impl std::fmt::Display) -> NightError {
    NightError::Export(err.to_string())
}

/// Encodes surfaces as an image-only PDF: one page per surface, in order, each
/// `page_width` points wide with aspect-preserving height.
#[instrument(skip(surfaces), fields(pages = surfaces.len()))]
pub fn export_pdf(surfaces: &[RgbaImage], page_width: f32) -> Result<Vec<u8>, NightError> {
    if !(page_width.is_finite() && page_width > 0.0) {
        return Err(export_error("page width must be positive"));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(surfaces.len());

    for (index, surface) in surfaces.iter().enumerate() {
        let (width, height) = surface.dimensions();
        if width == 0 || height == 0 {
            return Err(export_error(format!("page {} has an empty surface", index + 1)));
        }
        let page_height = page_width * height as f32 / width as f32;

        let image_id = doc.add_object(image_stream(surface)?);
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        page_width.into(),
                        0.into(),
                        0.into(),
                        page_height.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().map_err(export_error)?,
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), page_width.into(), page_height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    IMAGE_NAME => image_id,
                },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).map_err(export_error)?;
    info!(bytes = buffer.len(), "exported PDF");
    Ok(buffer)
}

// RGB samples, zlib-compressed. Surfaces are opaque, so alpha is dropped.
fn image_stream(surface: &RgbaImage) -> Result<Stream, NightError> {
    let (width, height) = surface.dimensions();
    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for pixel in surface.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&rgb).map_err(export_error)?;
    let compressed = encoder.finish().map_err(export_error)?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
        "Filter" => "FlateDecode",
    };
    Ok(Stream::new(dict, compressed).with_compression(false))
}
