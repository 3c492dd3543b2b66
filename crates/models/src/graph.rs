//! Static layer graph of an FCN variant, for diagrams.

use crate::fcn::FcnConfig;
use crate::registry::Architecture;
use crate::vgg::CONVS_PER_BLOCK;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Input,
    ConvBlock,
    Conv,
    Score,
    Upsample,
    Add,
    Softmax,
}

impl LayerKind {
    pub fn label(self) -> &'static str {
        match self {
            LayerKind::Input => "input",
            LayerKind::ConvBlock => "conv block",
            LayerKind::Conv => "conv",
            LayerKind::Score => "score",
            LayerKind::Upsample => "upsample",
            LayerKind::Add => "add",
            LayerKind::Softmax => "softmax",
        }
    }

    /// Graphviz fill color.
    pub fn dot_color(self) -> &'static str {
        match self {
            LayerKind::Input => "#d9d9d9",
            LayerKind::ConvBlock => "#9ecae1",
            LayerKind::Conv => "#6baed6",
            LayerKind::Score => "#fdae6b",
            LayerKind::Upsample => "#a1d99b",
            LayerKind::Add => "#fc9272",
            LayerKind::Softmax => "#bcbddc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerNode {
    pub name: String,
    pub kind: LayerKind,
    /// Output shape (channels, height, width).
    pub shape: [usize; 3],
    /// 0 for the main path, 1 for skip branches.
    pub lane: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerGraph {
    pub nodes: Vec<LayerNode>,
    /// (from, to) node indices.
    pub edges: Vec<(usize, usize)>,
}

impl LayerGraph {
    fn push(
        &mut self,
        name: impl Into<String>,
        kind: LayerKind,
        shape: [usize; 3],
        lane: usize,
    ) -> usize {
        self.nodes.push(LayerNode {
            name: name.into(),
            kind,
            shape,
            lane,
        });
        self.nodes.len() - 1
    }

    fn chain(
        &mut self,
        from: usize,
        name: impl Into<String>,
        kind: LayerKind,
        shape: [usize; 3],
        lane: usize,
    ) -> usize {
        let id = self.push(name, kind, shape, lane);
        self.edges.push((from, id));
        id
    }

    pub fn node(&self, name: &str) -> Option<&LayerNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Render as a Graphviz digraph.
    pub fn to_dot(&self, title: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph \"{title}\" {{");
        let _ = writeln!(out, "  rankdir=TB;");
        let _ = writeln!(out, "  node [shape=box, style=filled, fontname=\"Helvetica\"];");
        for (i, node) in self.nodes.iter().enumerate() {
            let [c, h, w] = node.shape;
            let _ = writeln!(
                out,
                "  n{i} [label=\"{}\\n{} ({c}x{h}x{w})\", fillcolor=\"{}\"];",
                node.name,
                node.kind.label(),
                node.kind.dot_color()
            );
        }
        for (from, to) in &self.edges {
            let _ = writeln!(out, "  n{from} -> n{to};");
        }
        out.push_str("}\n");
        out
    }
}

/// Layer graph of `arch` for inputs of `cfg.input_shape`.
pub fn layer_graph(arch: Architecture, cfg: &FcnConfig) -> LayerGraph {
    let (height, width) = cfg.input_shape;
    let classes = cfg.classes;
    let at = |stride: usize, channels: usize| [channels, height / stride, width / stride];

    let mut g = LayerGraph::default();
    let mut last = g.push("input", LayerKind::Input, [3, height, width], 0);
    let mut pools = Vec::with_capacity(5);
    for (i, (channels, depth)) in cfg.backbone.widths.iter().zip(CONVS_PER_BLOCK).enumerate() {
        last = g.chain(
            last,
            format!("block{}_{}conv_pool", i + 1, depth),
            LayerKind::ConvBlock,
            at(2 << i, *channels),
            0,
        );
        pools.push(last);
    }
    let fc = cfg.backbone.fc_channels;
    last = g.chain(last, "fc6", LayerKind::Conv, at(32, fc), 0);
    last = g.chain(last, "fc7", LayerKind::Conv, at(32, fc), 0);
    last = g.chain(last, "score_fr", LayerKind::Score, at(32, classes), 0);

    let stride = arch.output_stride();
    if stride <= 16 {
        let up = g.chain(last, "upscore2", LayerKind::Upsample, at(16, classes), 0);
        let skip = g.chain(pools[3], "score_pool4", LayerKind::Score, at(16, classes), 1);
        last = g.chain(up, "fuse_pool4", LayerKind::Add, at(16, classes), 0);
        g.edges.push((skip, last));
    }
    if stride <= 8 {
        let up = g.chain(last, "upscore_pool4", LayerKind::Upsample, at(8, classes), 0);
        let skip = g.chain(pools[2], "score_pool3", LayerKind::Score, at(8, classes), 1);
        last = g.chain(up, "fuse_pool3", LayerKind::Add, at(8, classes), 0);
        g.edges.push((skip, last));
    }
    last = g.chain(
        last,
        format!("upscore{stride}"),
        LayerKind::Upsample,
        at(1, classes),
        0,
    );
    g.chain(last, "softmax", LayerKind::Softmax, at(1, classes), 0);
    g
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fcn8s_has_both_skip_branches() {
        let g = layer_graph(Architecture::VggFcn8s, &FcnConfig::default());
        assert_eq!(g.node("score_pool3").map(|n| n.shape), Some([21, 28, 28]));
        assert_eq!(g.node("score_pool4").map(|n| n.lane), Some(1));
        assert_eq!(g.node("upscore8").map(|n| n.shape), Some([21, 224, 224]));
        assert_eq!(g.nodes.len(), 17);
        assert_eq!(g.edges.len(), 18);
    }

    #[test]
    fn fcn32s_is_a_single_chain() {
        let g = layer_graph(Architecture::VggFcn32s, &FcnConfig::default());
        assert!(g.node("score_pool4").is_none());
        assert_eq!(g.edges.len(), g.nodes.len() - 1);
        assert!(g.to_dot("vgg_fcn32s").contains("fc7\\nconv (4096x7x7)"));
    }
}
