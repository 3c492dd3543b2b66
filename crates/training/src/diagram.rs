//! Raster block diagrams of FCN layer graphs.

use image::{Rgb, RgbImage};
use models::{LayerGraph, LayerKind};
use vision_core::overlay::{draw_connector, draw_rect, fill_rect, CANVAS_BACKGROUND};

const MARGIN: u32 = 16;
const BOX_W: u32 = 120;
const BOX_H: u32 = 22;
const ROW_GAP: u32 = 14;
const LANE_GAP: u32 = 40;
const EDGE_COLOR: Rgb<u8> = Rgb([90, 90, 90]);
const BORDER_COLOR: Rgb<u8> = Rgb([40, 40, 40]);
/// Resolution bar inside each box.
const BAR_COLOR: Rgb<u8> = Rgb([30, 30, 30]);

pub fn kind_color(kind: LayerKind) -> Rgb<u8> {
    match kind {
        LayerKind::Input => Rgb([217, 217, 217]),
        LayerKind::ConvBlock => Rgb([158, 202, 225]),
        LayerKind::Conv => Rgb([107, 174, 214]),
        LayerKind::Score => Rgb([253, 174, 107]),
        LayerKind::Upsample => Rgb([161, 217, 155]),
        LayerKind::Add => Rgb([252, 146, 114]),
        LayerKind::Softmax => Rgb([188, 189, 220]),
    }
}

/// Top-left corner of node `index` in lane `lane`.
fn origin(index: usize, lane: usize) -> (u32, u32) {
    (
        MARGIN + lane as u32 * (BOX_W + LANE_GAP),
        MARGIN + index as u32 * (BOX_H + ROW_GAP),
    )
}

/// Draw `graph` top to bottom, main path in the left column and skip branches to its right.
///
/// Each box is filled by layer kind; the dark bar along its bottom edge shows the
/// output resolution relative to the input.
pub fn render(graph: &LayerGraph) -> RgbImage {
    let lanes = graph.nodes.iter().map(|n| n.lane).max().unwrap_or(0) as u32 + 1;
    let rows = graph.nodes.len() as u32;
    let width = 2 * MARGIN + lanes * BOX_W + (lanes - 1) * LANE_GAP;
    let height = 2 * MARGIN + rows * BOX_H + rows.saturating_sub(1) * ROW_GAP;
    let mut img = RgbImage::from_pixel(width, height.max(2 * MARGIN), CANVAS_BACKGROUND);

    let full_height = graph.nodes.first().map(|n| n.shape[1]).unwrap_or(1).max(1);

    for &(from, to) in &graph.edges {
        let (Some(src), Some(dst)) = (graph.nodes.get(from), graph.nodes.get(to)) else {
            continue;
        };
        let (sx, sy) = origin(from, src.lane);
        let (dx, dy) = origin(to, dst.lane);
        draw_connector(
            &mut img,
            (sx + BOX_W / 2, sy + BOX_H),
            (dx + BOX_W / 2, dy),
            EDGE_COLOR,
        );
    }

    for (i, node) in graph.nodes.iter().enumerate() {
        let (x, y) = origin(i, node.lane);
        let rect = [x, y, x + BOX_W - 1, y + BOX_H - 1];
        fill_rect(&mut img, rect, kind_color(node.kind));
        draw_rect(&mut img, rect, BORDER_COLOR, 1);
        let bar = ((BOX_W - 4) as usize * node.shape[1] / full_height).max(1) as u32;
        fill_rect(
            &mut img,
            [x + 2, y + BOX_H - 5, x + 1 + bar, y + BOX_H - 3],
            BAR_COLOR,
        );
    }
    img
}
