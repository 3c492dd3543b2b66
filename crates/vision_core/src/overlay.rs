use image::{Rgb, RgbImage};

/// Background used behind composed panels and diagrams.
pub const CANVAS_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Convert a CHW float image in 0..1 back into 8-bit RGB.
pub fn chw_to_rgb(image_chw: &[f32], width: u32, height: u32) -> RgbImage {
    let plane = (width * height) as usize;
    RgbImage::from_fn(width, height, |x, y| {
        let base = (y * width + x) as usize;
        let to_u8 = |v: Option<&f32>| (v.copied().unwrap_or(0.0).clamp(0.0, 1.0) * 255.0) as u8;
        Rgb([
            to_u8(image_chw.get(base)),
            to_u8(image_chw.get(plane + base)),
            to_u8(image_chw.get(2 * plane + base)),
        ])
    })
}

/// Place panels left-to-right on a white canvas with `gap` pixels between and around them.
///
/// Panels of different heights are top-aligned.
pub fn compose_panels(panels: &[&RgbImage], gap: u32) -> RgbImage {
    let width = panels.iter().map(|p| p.width()).sum::<u32>() + gap * (panels.len() as u32 + 1);
    let height = panels.iter().map(|p| p.height()).max().unwrap_or(0) + gap * 2;
    let mut canvas = RgbImage::from_pixel(width.max(1), height.max(1), CANVAS_BACKGROUND);
    let mut x = gap;
    for panel in panels {
        image::imageops::replace(&mut canvas, *panel, x as i64, gap as i64);
        x += panel.width() + gap;
    }
    canvas
}

/// Draw a rectangle border with given thickness.
pub fn draw_rect(img: &mut RgbImage, bbox_px: [u32; 4], color: Rgb<u8>, thickness: u32) {
    let (w, h) = img.dimensions();
    let [x0, y0, x1, y1] = bbox_px;
    for t in 0..thickness {
        let xx0 = x0.saturating_add(t);
        let yy0 = y0.saturating_add(t);
        let xx1 = x1.saturating_sub(t);
        let yy1 = y1.saturating_sub(t);
        if xx0 >= w || yy0 >= h || xx1 >= w || yy1 >= h || xx0 > xx1 || yy0 > yy1 {
            continue;
        }
        for x in xx0..=xx1 {
            img.put_pixel(x, yy0, color);
            img.put_pixel(x, yy1, color);
        }
        for y in yy0..=yy1 {
            img.put_pixel(xx0, y, color);
            img.put_pixel(xx1, y, color);
        }
    }
}

/// Fill an inclusive pixel rectangle, clipped to the image.
pub fn fill_rect(img: &mut RgbImage, bbox_px: [u32; 4], color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let [x0, y0, x1, y1] = bbox_px;
    for y in y0.min(h - 1)..=y1.min(h - 1) {
        for x in x0.min(w - 1)..=x1.min(w - 1) {
            img.put_pixel(x, y, color);
        }
    }
}

/// Axis-aligned connector: vertical from `from`, then horizontal, then vertical into `to`.
pub fn draw_connector(img: &mut RgbImage, from: (u32, u32), to: (u32, u32), color: Rgb<u8>) {
    let mid_y = from.1 + to.1.saturating_sub(from.1) / 2;
    fill_rect(img, [from.0, from.1.min(mid_y), from.0, from.1.max(mid_y)], color);
    fill_rect(img, [from.0.min(to.0), mid_y, from.0.max(to.0), mid_y], color);
    fill_rect(img, [to.0, mid_y.min(to.1), to.0, mid_y.max(to.1)], color);
}
