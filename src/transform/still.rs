use std::io::Cursor;

use bytes::Bytes;
use image::{DynamicImage, codecs::jpeg::JpegEncoder, imageops::FilterType};

use crate::{error::TransformError, transform::Artifact};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StillSettings {
   pub width:   u32,
   pub height:  u32,
   pub quality: u8,
}

/// Crops `source` to the target aspect ratio around its centre, resizes it to
/// exactly the target size and encodes it as JPEG.
pub fn resize_still(source: &[u8], settings: StillSettings) -> Result<Artifact, TransformError> {
   let img = image::load_from_memory(source)?;
   if img.width() == 0 || img.height() == 0 || settings.width == 0 || settings.height == 0 {
      return Err(TransformError::EmptyImage);
   }

   let cropped = crop_to_aspect(&img, settings.width, settings.height);
   let rgb = cropped
      .resize_exact(settings.width, settings.height, FilterType::Lanczos3)
      .to_rgb8();

   let mut out = Cursor::new(Vec::new());
   let mut encoder = JpegEncoder::new_with_quality(&mut out, settings.quality);
   encoder.encode_image(&rgb)?;

   Ok(Artifact { bytes: Bytes::from(out.into_inner()), mime: "image/jpeg", extension: "jpg" })
}

fn crop_to_aspect(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
   let (w, h) = (u64::from(img.width()), u64::from(img.height()));
   let (tw, th) = (u64::from(width), u64::from(height));

   // Compare w/h against tw/th without floating point.
   if w * th > h * tw {
      let new_w = (h * tw / th).max(1);
      let left = (w - new_w) / 2;
      img.crop_imm(left as u32, 0, new_w as u32, h as u32)
   } else {
      let new_h = (w * th / tw).max(1);
      let top = (h - new_h) / 2;
      img.crop_imm(0, top as u32, w as u32, new_h as u32)
   }
}
