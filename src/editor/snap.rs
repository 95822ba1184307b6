//! Snap resolver: decides where a released block ends up.
//!
//! On release the block is cut loose from its old neighbours. If it was
//! dropped outside the editing surface it is deleted. Otherwise every other
//! block, in creation order, offers two anchors: directly below it (free
//! `next`) and directly above it (free `prev`). The first anchor within snap
//! distance of the released block's top-left corner wins. With no anchor in
//! range the block stays where it was dropped.

use log::{debug, warn};

use crate::engine::graph::{BlockGraph, BlockId, BlockKind};
use crate::types::Point;

use super::config::EditorConfig;
use super::layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Attached below the anchor.
    After,
    /// Attached above the anchor.
    Before,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Attached { anchor: BlockId, side: Side },
    Floating,
    Discarded,
}

pub fn resolve_release(
    graph: &mut BlockGraph,
    node: BlockId,
    position: Point,
    config: &EditorConfig,
) -> AttachOutcome {
    let Some(kind) = graph.get(node).map(|b| b.kind) else {
        return AttachOutcome::Discarded;
    };
    graph.detach(node);

    if !config.surface.contains(position) {
        graph.remove(node);
        debug!("block {node} dropped outside the surface, discarded");
        return AttachOutcome::Discarded;
    }
    graph.set_origin(node, position);

    let Some((anchor, side)) = find_anchor(graph, node, kind, position, config) else {
        return AttachOutcome::Floating;
    };

    let result = match side {
        Side::After => graph.insert_after(anchor, node),
        Side::Before => {
            let anchor_origin = graph.get(anchor).map(|b| b.origin).unwrap_or(position);
            graph.insert_before(anchor, node).map(|()| {
                graph.set_origin(node, anchor_origin.offset(0.0, -config.block_height));
            })
        }
    };
    match result {
        Ok(()) => {
            debug!("block {node} snapped {side:?} {anchor}");
            AttachOutcome::Attached { anchor, side }
        }
        Err(e) => {
            warn!("snap of {node} onto {anchor} rejected: {e}");
            AttachOutcome::Floating
        }
    }
}

/// First free anchor within snap distance of `position`, scanning blocks in
/// creation order. Hat blocks only ever start a chain.
fn find_anchor(
    graph: &BlockGraph,
    node: BlockId,
    kind: BlockKind,
    position: Point,
    config: &EditorConfig,
) -> Option<(BlockId, Side)> {
    let rects = layout::block_rects(graph, config);
    let mut ordered: Vec<_> = rects.into_iter().filter(|(id, _)| *id != node).collect();
    ordered.sort_by_key(|(id, _)| *id);

    for (id, rect) in ordered {
        let candidate = graph.get(id)?;
        let below = rect.origin().offset(0.0, config.block_height);
        if kind != BlockKind::Event
            && candidate.next().is_none()
            && position.distance(&below) < config.snap_distance
        {
            return Some((id, Side::After));
        }
        let above = rect.origin().offset(0.0, -config.block_height);
        if candidate.prev().is_none()
            && candidate.kind != BlockKind::Event
            && position.distance(&above) < config.snap_distance
        {
            return Some((id, Side::Before));
        }
    }
    None
}
