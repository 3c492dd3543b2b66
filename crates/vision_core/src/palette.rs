//! PASCAL VOC2012 class table and color palette.
//!
//! Class ids index both [`VOC_CLASSES`] and the palette returned by [`voc_color`].
//! Index 0 is background; the dataset ships 21 classes.

use image::{Rgb, RgbImage};

/// Number of PASCAL VOC2012 segmentation classes (background included).
pub const VOC_NUM_CLASSES: usize = 21;

/// Class names in id order.
pub const VOC_CLASSES: [&str; VOC_NUM_CLASSES] = [
    "background",
    "aeroplane",
    "bicycle",
    "bird",
    "boat",
    "bottle",
    "bus",
    "car",
    "cat",
    "chair",
    "cow",
    "dining table",
    "dog",
    "horse",
    "motorbike",
    "person",
    "potted plant",
    "sheep",
    "sofa",
    "train",
    "tv/monitor",
];

/// Color VOC uses for the "void" object boundary (palette index 255).
pub const VOC_VOID_COLOR: Rgb<u8> = Rgb([224, 224, 192]);

/// Palette color for a class id, using the VOC bit-interleaved colormap.
pub fn voc_color(class_id: u8) -> Rgb<u8> {
    let mut c = class_id;
    let (mut r, mut g, mut b) = (0u8, 0u8, 0u8);
    for j in 0..8 {
        r |= (c & 1) << (7 - j);
        g |= ((c >> 1) & 1) << (7 - j);
        b |= ((c >> 2) & 1) << (7 - j);
        c >>= 3;
    }
    Rgb([r, g, b])
}

/// Reverse palette lookup restricted to the first `classes` entries.
pub fn class_for_color(color: Rgb<u8>, classes: usize) -> Option<u8> {
    (0..classes.min(256))
        .map(|id| id as u8)
        .find(|id| voc_color(*id) == color)
}

/// Human-readable class name, if the id is a VOC class.
pub fn class_name(class_id: u8) -> Option<&'static str> {
    VOC_CLASSES.get(class_id as usize).copied()
}

/// Render a row-major class-id map as a palette image.
pub fn label_to_img(label_map: &[u8], width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let idx = (y * width + x) as usize;
        voc_color(label_map.get(idx).copied().unwrap_or(0))
    })
}
