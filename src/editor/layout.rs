//! Derived block geometry.
//!
//! Only chain roots carry a stored origin. Every other block sits directly
//! below its predecessor, so its rectangle is recomputed from chain order
//! whenever it is needed.

use crate::engine::graph::{BlockGraph, BlockId};
use crate::types::Rect;

use super::config::EditorConfig;

/// Rectangle of a single block, or `None` if it does not exist.
pub fn block_rect(graph: &BlockGraph, id: BlockId, config: &EditorConfig) -> Option<Rect> {
    let root = graph.root_of(id)?;
    let depth = graph.depth(id)?;
    let origin = graph.get(root)?.origin;
    Some(Rect {
        x: origin.x,
        y: origin.y + depth as f64 * config.block_height,
        w: config.block_width,
        h: config.block_height,
    })
}

/// Rectangles of every block, chain by chain in root creation order.
pub fn block_rects(graph: &BlockGraph, config: &EditorConfig) -> Vec<(BlockId, Rect)> {
    let mut out = Vec::with_capacity(graph.len());
    for root in graph.roots() {
        let Some(origin) = graph.get(root).map(|b| b.origin) else {
            continue;
        };
        for (depth, block) in graph.chain(root).into_iter().enumerate() {
            out.push((
                block.id,
                Rect {
                    x: origin.x,
                    y: origin.y + depth as f64 * config.block_height,
                    w: config.block_width,
                    h: config.block_height,
                },
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graph::BlockKind;
    use crate::types::Point;

    #[test]
    fn linked_blocks_stack_under_root() {
        let config = EditorConfig::default();
        let mut g = BlockGraph::new();
        let a = g.add(BlockKind::Event, "when flag clicked", Point::new(300.0, 100.0));
        let b = g.add(BlockKind::Motion, "move 10 steps", Point::new(9999.0, 9999.0));
        g.insert_after(a, b).unwrap();
        let r = block_rect(&g, b, &config).unwrap();
        assert_eq!((r.x, r.y), (300.0, 136.0));
        let all = block_rects(&g, &config);
        assert_eq!(all.len(), 2);
        assert_eq!(all[1], (b, r));
    }
}
