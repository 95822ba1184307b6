//! Block graph: the arena that holds every block of one sprite.
//!
//! Blocks are addressed by stable integer ids; `next`/`prev` are stored as
//! optional ids, never as live references. Only the mutation primitives in
//! this module touch the links, so the chain invariants (acyclic, single
//! predecessor, symmetric links) hold after every call.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Point;

use super::operand;

pub type BlockId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Event,
    Motion,
    Looks,
    Sound,
    Control,
    Sensing,
    Operators,
    Variables,
    CustomBlock,
}

impl BlockKind {
    pub const ALL: [BlockKind; 9] = [
        BlockKind::Event,
        BlockKind::Motion,
        BlockKind::Looks,
        BlockKind::Sound,
        BlockKind::Control,
        BlockKind::Sensing,
        BlockKind::Operators,
        BlockKind::Variables,
        BlockKind::CustomBlock,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BlockKind::Event => "Events",
            BlockKind::Motion => "Motion",
            BlockKind::Looks => "Looks",
            BlockKind::Sound => "Sound",
            BlockKind::Control => "Control",
            BlockKind::Sensing => "Sensing",
            BlockKind::Operators => "Operators",
            BlockKind::Variables => "Variables",
            BlockKind::CustomBlock => "My Blocks",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub label: String,
    /// Top-left of the block on the editing surface. Only meaningful while the
    /// block is a chain root; positions of linked blocks are derived.
    pub origin: Point,
    next: Option<BlockId>,
    prev: Option<BlockId>,
}

impl Block {
    /// An unlinked block that is not part of any graph (palette entries).
    pub fn template(kind: BlockKind, label: &str) -> Self {
        Block {
            id: 0,
            kind,
            label: label.to_string(),
            origin: Point::default(),
            next: None,
            prev: None,
        }
    }

    pub fn next(&self) -> Option<BlockId> {
        self.next
    }

    pub fn prev(&self) -> Option<BlockId> {
        self.prev
    }

    pub fn is_root(&self) -> bool {
        self.prev.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("block {0} does not exist")]
    UnknownBlock(BlockId),
    #[error("block {0} cannot be linked to itself")]
    SelfLink(BlockId),
    #[error("block {0} is already linked on that side")]
    AlreadyLinked(BlockId),
    #[error("block {anchor} already has a {side} neighbour")]
    SlotOccupied { anchor: BlockId, side: &'static str },
    #[error("linking {node} to {anchor} would create a cycle")]
    WouldCycle { anchor: BlockId, node: BlockId },
}

/// Result of searching a graph for something to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnableStart {
    /// A chain rooted at an Event block.
    Event(BlockId),
    /// No Event-rooted chain exists; this is the first orphaned root.
    Fragment(BlockId),
}

impl RunnableStart {
    pub fn id(self) -> BlockId {
        match self {
            RunnableStart::Event(id) | RunnableStart::Fragment(id) => id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BlockGraph {
    /// Keyed by id; ids are handed out monotonically, so iteration order is
    /// creation order until the id space wraps.
    blocks: BTreeMap<BlockId, Block>,
    next_id: BlockId,
}

impl BlockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    /// All blocks in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Add a fresh unlinked block and return its id.
    pub fn add(&mut self, kind: BlockKind, label: &str, origin: Point) -> BlockId {
        let id = self.fresh_id();
        self.blocks.insert(
            id,
            Block {
                id,
                kind,
                label: label.to_string(),
                origin,
                next: None,
                prev: None,
            },
        );
        id
    }

    /// Add an unlinked block under a caller-chosen id (used when loading a
    /// saved project). Returns false if the id is taken.
    pub fn add_with_id(&mut self, id: BlockId, kind: BlockKind, label: &str, origin: Point) -> bool {
        if self.blocks.contains_key(&id) {
            return false;
        }
        self.blocks.insert(
            id,
            Block {
                id,
                kind,
                label: label.to_string(),
                origin,
                next: None,
                prev: None,
            },
        );
        self.next_id = self.next_id.max(id.saturating_add(1));
        true
    }

    /// Instantiate a template: fresh id, same kind and label, no links.
    pub fn clone_template(&mut self, template: &Block) -> BlockId {
        self.add(template.kind, &template.label, template.origin)
    }

    /// Detach and drop a block. Its former neighbours are left unlinked on
    /// the severed side.
    pub fn remove(&mut self, id: BlockId) -> Option<Block> {
        self.detach(id);
        self.blocks.remove(&id)
    }

    pub fn set_origin(&mut self, id: BlockId, origin: Point) {
        if let Some(b) = self.blocks.get_mut(&id) {
            b.origin = origin;
        }
    }

    pub fn set_label(&mut self, id: BlockId, label: &str) {
        if let Some(b) = self.blocks.get_mut(&id) {
            b.label = label.to_string();
        }
    }

    // -----------------------------------------------------------------------
    // Structural mutation
    // -----------------------------------------------------------------------

    /// Sever both links of `id`. Idempotent; unknown ids are ignored.
    pub fn detach(&mut self, id: BlockId) {
        let Some(block) = self.blocks.get_mut(&id) else {
            return;
        };
        let (prev, next) = (block.prev.take(), block.next.take());
        if let Some(p) = prev.and_then(|p| self.blocks.get_mut(&p)) {
            p.next = None;
        }
        if let Some(n) = next.and_then(|n| self.blocks.get_mut(&n)) {
            n.prev = None;
        }
        if prev.is_some() || next.is_some() {
            debug!("detached block {id} (prev {prev:?}, next {next:?})");
        }
    }

    /// Link `node` directly below `anchor`. `node` may head a chain of its
    /// own, which then hangs below `anchor` as a whole.
    pub fn insert_after(&mut self, anchor: BlockId, node: BlockId) -> Result<(), EditError> {
        let (a, n) = self.pair(anchor, node)?;
        if a.next.is_some() {
            return Err(EditError::SlotOccupied { anchor, side: "next" });
        }
        if n.prev.is_some() {
            return Err(EditError::AlreadyLinked(node));
        }
        if self.reachable(node, anchor) {
            return Err(EditError::WouldCycle { anchor, node });
        }
        self.link(anchor, node);
        Ok(())
    }

    /// Link `node` directly above `anchor`. `node` may be the tail of a chain,
    /// which then sits above `anchor` as a whole.
    pub fn insert_before(&mut self, anchor: BlockId, node: BlockId) -> Result<(), EditError> {
        let (a, n) = self.pair(anchor, node)?;
        if a.prev.is_some() {
            return Err(EditError::SlotOccupied { anchor, side: "prev" });
        }
        if n.next.is_some() {
            return Err(EditError::AlreadyLinked(node));
        }
        if self.reachable(anchor, node) {
            return Err(EditError::WouldCycle { anchor, node });
        }
        self.link(node, anchor);
        Ok(())
    }

    fn pair(&self, anchor: BlockId, node: BlockId) -> Result<(&Block, &Block), EditError> {
        if anchor == node {
            return Err(EditError::SelfLink(node));
        }
        let a = self.blocks.get(&anchor).ok_or(EditError::UnknownBlock(anchor))?;
        let n = self.blocks.get(&node).ok_or(EditError::UnknownBlock(node))?;
        Ok((a, n))
    }

    fn link(&mut self, upper: BlockId, lower: BlockId) {
        if let Some(u) = self.blocks.get_mut(&upper) {
            u.next = Some(lower);
        }
        if let Some(l) = self.blocks.get_mut(&lower) {
            l.prev = Some(upper);
        }
        debug!("linked {upper} -> {lower}");
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// True if following `next` from `from` reaches `to` (inclusive).
    pub fn reachable(&self, from: BlockId, to: BlockId) -> bool {
        self.walk(from).contains(&to)
    }

    /// Ids reachable from `start` along `next`, in order. Stops on a repeated
    /// id, so a corrupted graph cannot loop forever.
    fn walk(&self, start: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut cursor = self.blocks.get(&start).map(|b| b.id);
        while let Some(id) = cursor {
            if !seen.insert(id) {
                break;
            }
            out.push(id);
            cursor = self.blocks.get(&id).and_then(|b| b.next);
        }
        out
    }

    /// The chain starting at `start`, in execution order.
    pub fn chain(&self, start: BlockId) -> Vec<&Block> {
        self.walk(start)
            .into_iter()
            .filter_map(|id| self.blocks.get(&id))
            .collect()
    }

    /// Follow `prev` links up to the root of the chain containing `id`.
    pub fn root_of(&self, id: BlockId) -> Option<BlockId> {
        let mut current = self.blocks.get(&id)?;
        let mut steps = 0;
        while let Some(p) = current.prev {
            steps += 1;
            if steps > self.blocks.len() {
                return None;
            }
            current = self.blocks.get(&p)?;
        }
        Some(current.id)
    }

    /// Number of links between `id` and the root of its chain.
    pub fn depth(&self, id: BlockId) -> Option<usize> {
        let mut current = self.blocks.get(&id)?;
        let mut depth = 0;
        while let Some(p) = current.prev {
            depth += 1;
            if depth > self.blocks.len() {
                return None;
            }
            current = self.blocks.get(&p)?;
        }
        Some(depth)
    }

    /// Chain roots in creation order.
    pub fn roots(&self) -> Vec<BlockId> {
        self.blocks.values().filter(|b| b.is_root()).map(|b| b.id).collect()
    }

    /// First Event-rooted chain; otherwise the first root of any kind.
    pub fn find_runnable_start(&self) -> Option<RunnableStart> {
        let mut fallback = None;
        for block in self.blocks.values().filter(|b| b.is_root()) {
            if block.kind == BlockKind::Event {
                return Some(RunnableStart::Event(block.id));
            }
            if fallback.is_none() {
                fallback = Some(RunnableStart::Fragment(block.id));
            }
        }
        fallback
    }

    /// Verify the chain invariants: links are symmetric, no block has two
    /// predecessors, and every chain terminates.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut predecessors: BTreeMap<BlockId, BlockId> = BTreeMap::new();
        for block in self.blocks.values() {
            if let Some(n) = block.next {
                let Some(next) = self.blocks.get(&n) else {
                    return Err(format!("block {} points at missing block {n}", block.id));
                };
                if next.prev != Some(block.id) {
                    return Err(format!("link {} -> {n} is not mirrored", block.id));
                }
                if let Some(other) = predecessors.insert(n, block.id) {
                    return Err(format!("block {n} has two predecessors: {other} and {}", block.id));
                }
            }
            if let Some(p) = block.prev {
                let mirrored = self.blocks.get(&p).is_some_and(|b| b.next == Some(block.id));
                if !mirrored {
                    return Err(format!("back link {} -> {p} is not mirrored", block.id));
                }
            }
        }
        let mut covered = 0;
        for root in self.roots() {
            covered += self.walk(root).len();
        }
        if covered != self.blocks.len() {
            return Err("a chain contains a cycle".into());
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Editable inputs
    // -----------------------------------------------------------------------

    /// Numeric sub-fields embedded in a block's label, in token order.
    pub fn inputs(&self, id: BlockId) -> Vec<f64> {
        self.blocks
            .get(&id)
            .map(|b| operand::numeric_tokens(&b.label))
            .unwrap_or_default()
    }

    /// Rewrite the `index`-th numeric sub-field of a label. Links are not
    /// touched. Returns false if the block or the field does not exist.
    pub fn set_input(&mut self, id: BlockId, index: usize, value: f64) -> bool {
        let Some(block) = self.blocks.get_mut(&id) else {
            return false;
        };
        match operand::replace_numeric_token(&block.label, index, value) {
            Some(label) => {
                block.label = label;
                true
            }
            None => false,
        }
    }

    /// Next unused id. Past `BlockId::MAX` the search wraps to the lowest gap.
    fn fresh_id(&mut self) -> BlockId {
        let mut id = self.next_id;
        while self.blocks.contains_key(&id) {
            id = id.wrapping_add(1);
        }
        self.next_id = id.wrapping_add(1);
        id
    }
}
