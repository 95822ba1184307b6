//! Project file format: what gets saved and loaded.
//!
//! A saved chain keeps each block's id, kind, label and `next` link; `prev`
//! links are rebuilt on load. Positions are stored for every block but only
//! chain roots use theirs. Links that would break the chain invariants are
//! dropped with a warning rather than failing the load.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::types::Point;

use super::actor::{ActorState, StageBounds};
use super::graph::{BlockGraph, BlockId, BlockKind};
use super::variables::VariableStore;
use super::{Project, Sprite};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceProject {
    #[serde(default)]
    pub stage: StageBounds,
    pub sprites: Vec<SourceSprite>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSprite {
    pub name: String,
    #[serde(default)]
    pub actor: ActorState,
    #[serde(default, skip_serializing_if = "VariableStore::is_empty")]
    pub variables: VariableStore,
    #[serde(default)]
    pub blocks: Vec<SourceBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceBlock {
    pub id: BlockId,
    pub kind: BlockKind,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<BlockId>,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl SourceProject {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// The demo script a fresh project starts with.
    pub fn starter() -> Self {
        let block = |id, kind, label: &str, next| SourceBlock {
            id,
            kind,
            label: label.to_string(),
            next,
            x: 300.0,
            y: 120.0,
        };
        SourceProject {
            stage: StageBounds::default(),
            sprites: vec![SourceSprite {
                name: "Sprite1".into(),
                actor: ActorState::default(),
                variables: VariableStore::new(),
                blocks: vec![
                    block(1, BlockKind::Event, "when flag clicked", Some(2)),
                    block(2, BlockKind::Motion, "move 10 steps", Some(3)),
                    block(3, BlockKind::Looks, "say \"Hello!\" for 2 secs", None),
                ],
            }],
        }
    }
}

impl SourceSprite {
    pub fn build_graph(&self) -> BlockGraph {
        let mut graph = BlockGraph::new();
        let accepted: Vec<bool> = self
            .blocks
            .iter()
            .map(|b| {
                let added = graph.add_with_id(b.id, b.kind, &b.label, Point::new(b.x, b.y));
                if !added {
                    warn!("{}: duplicate block id {}, keeping the first", self.name, b.id);
                }
                added
            })
            .collect();
        for (b, _) in self.blocks.iter().zip(accepted).filter(|(_, kept)| *kept) {
            let Some(next) = b.next else { continue };
            if let Err(e) = graph.insert_after(b.id, next) {
                warn!("{}: dropping link {} -> {next}: {e}", self.name, b.id);
            }
        }
        graph
    }

    pub fn from_sprite(sprite: &Sprite, layout: impl Fn(BlockId) -> Point) -> Self {
        SourceSprite {
            name: sprite.name.clone(),
            actor: sprite.actor.clone(),
            variables: sprite.variables.clone(),
            blocks: sprite
                .graph
                .iter()
                .map(|b| {
                    let at = layout(b.id);
                    SourceBlock {
                        id: b.id,
                        kind: b.kind,
                        label: b.label.clone(),
                        next: b.next(),
                        x: at.x,
                        y: at.y,
                    }
                })
                .collect(),
        }
    }
}

impl Project {
    pub fn from_source(source: &SourceProject, seed: u64) -> Self {
        let stage = source.stage.sanitized();
        if !source.stage.is_valid() {
            warn!(
                "unusable stage size {}x{}, using {}x{}",
                source.stage.width, source.stage.height, stage.width, stage.height
            );
        }
        let mut project = Project::new(stage);
        for (i, s) in source.sprites.iter().enumerate() {
            let mut sprite = Sprite::new(&s.name, stage, seed.wrapping_add(i as u64));
            sprite.actor = ActorState { bounds: stage, ..s.actor.clone() };
            sprite.variables = s.variables.clone();
            sprite.graph = s.build_graph();
            project.sprites.push(sprite);
        }
        project
    }

    /// Snapshot for saving. Stored positions are the roots' origins; linked
    /// blocks keep whatever origin they last had as roots.
    pub fn to_source(&self) -> SourceProject {
        SourceProject {
            stage: self.stage,
            sprites: self
                .sprites
                .iter()
                .map(|s| SourceSprite::from_sprite(s, |id| s.graph.get(id).map(|b| b.origin).unwrap_or_default()))
                .collect(),
        }
    }
}
