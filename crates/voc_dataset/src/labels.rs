//! Label image decoding and one-hot encoding.

use image::RgbImage;
use vision_core::palette::class_for_color;

/// Decode a label image into row-major class ids.
///
/// Palette colors map to their class; gray pixels `(v, v, v)` with `v < classes`
/// are read as raw ids. Everything else, including the VOC void boundary,
/// becomes background.
pub fn decode_label_map(label: &RgbImage, classes: usize) -> Vec<u8> {
    label
        .pixels()
        .map(|px| {
            if let Some(id) = class_for_color(*px, classes) {
                return id;
            }
            let [r, g, b] = px.0;
            if r == g && g == b && (r as usize) < classes {
                r
            } else {
                0
            }
        })
        .collect()
}

/// One-hot encode class ids into an HWC buffer of `labels.len() * classes` floats.
///
/// Ids outside `0..classes` leave their pixel all zero.
pub fn one_hot_hwc(labels: &[u8], classes: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; labels.len() * classes];
    for (i, &id) in labels.iter().enumerate() {
        let id = id as usize;
        if id < classes {
            out[i * classes + id] = 1.0;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use vision_core::palette::{voc_color, VOC_VOID_COLOR};

    #[test]
    fn decodes_palette_gray_and_void() {
        let mut img = RgbImage::new(4, 1);
        img.put_pixel(0, 0, voc_color(15));
        img.put_pixel(1, 0, Rgb([3, 3, 3]));
        img.put_pixel(2, 0, VOC_VOID_COLOR);
        img.put_pixel(3, 0, voc_color(7));
        assert_eq!(decode_label_map(&img, 21), vec![15, 3, 0, 7]);
    }

    #[test]
    fn gray_ids_beyond_class_count_are_background() {
        let img = RgbImage::from_pixel(1, 1, Rgb([30, 30, 30]));
        assert_eq!(decode_label_map(&img, 21), vec![0]);
    }

    #[test]
    fn one_hot_places_single_one_per_pixel() {
        let encoded = one_hot_hwc(&[0, 2, 1], 3);
        assert_eq!(
            encoded,
            vec![1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0]
        );
    }
}
