//! Editing surface for a project's scripts.
//!
//! `Workspace` is what a UI drives: blocks come out of the palette, get
//! dragged and released, and chains are run or stopped. Everything here is
//! pixel-space bookkeeping on top of the engine; nothing draws.

pub mod config;
pub mod layout;
pub mod palette;
pub mod snap;

use std::path::Path;

use anyhow::Result;
use log::{debug, info};

use crate::engine::graph::{BlockId, BlockKind};
use crate::engine::source::{SourceProject, SourceSprite};
use crate::engine::{Project, Sprite};
use crate::types::{Point, Rect, VariableView};

use config::EditorConfig;
use snap::AttachOutcome;

pub struct Workspace {
    pub project: Project,
    /// Index of the sprite whose scripts are being edited.
    pub selected: usize,
    pub config: EditorConfig,
    pub file_path: String,
    pub dirty: bool,
    pub status_message: Option<String>,
}

impl Workspace {
    /// Open a project file, or start from the starter project if the file
    /// does not exist yet.
    pub fn open(path: &str) -> Result<Self> {
        let config = EditorConfig::load();
        let source = if Path::new(path).exists() {
            SourceProject::load(Path::new(path))?
        } else {
            info!("{path} not found, starting a new project");
            SourceProject::starter()
        };
        Ok(Self::new(Project::from_source(&source, config.seed), config, path))
    }

    pub fn new(project: Project, config: EditorConfig, path: &str) -> Self {
        Workspace {
            project,
            selected: 0,
            config,
            file_path: path.to_string(),
            dirty: false,
            status_message: None,
        }
    }

    pub fn save(&mut self) -> Result<()> {
        self.to_source().save(Path::new(&self.file_path))?;
        self.dirty = false;
        self.status_message = Some("Saved".into());
        Ok(())
    }

    /// Project snapshot with every block's position taken from the layout.
    pub fn to_source(&self) -> SourceProject {
        let config = &self.config;
        SourceProject {
            stage: self.project.stage,
            sprites: self
                .project
                .sprites
                .iter()
                .map(|s| {
                    SourceSprite::from_sprite(s, |id| {
                        layout::block_rect(&s.graph, id, config).map(|r| r.origin()).unwrap_or_default()
                    })
                })
                .collect(),
        }
    }

    pub fn sprite(&self) -> Option<&Sprite> {
        self.project.sprites.get(self.selected)
    }

    pub fn sprite_mut(&mut self) -> Option<&mut Sprite> {
        self.project.sprites.get_mut(self.selected)
    }

    pub fn select(&mut self, index: usize) {
        if index < self.project.sprites.len() {
            self.selected = index;
        }
    }

    /// Drag a copy of a palette template onto the surface and release it at
    /// `position`. Returns the new block's id and where it ended up.
    pub fn spawn_from_palette(
        &mut self,
        kind: BlockKind,
        index: usize,
        position: Point,
    ) -> Option<(BlockId, AttachOutcome)> {
        let template = palette::template(kind, index)?;
        let id = self.sprite_mut()?.graph.clone_template(&template);
        debug!("spawned {} block {id} \"{}\"", kind.name(), template.label);
        Some((id, self.on_release_drag(id, position)))
    }

    pub fn on_release_drag(&mut self, node: BlockId, position: Point) -> AttachOutcome {
        let config = self.config.clone();
        let Some(sprite) = self.sprite_mut() else {
            return AttachOutcome::Discarded;
        };
        let outcome = snap::resolve_release(&mut sprite.graph, node, position, &config);
        self.dirty = true;
        outcome
    }

    /// Run the chain containing `block`. Chains without an Event root are
    /// ignored.
    pub fn on_run_requested(&mut self, block: BlockId) -> bool {
        self.sprite_mut().is_some_and(|s| s.run(block))
    }

    pub fn on_stop_requested(&mut self) {
        self.project.stop_all();
    }

    pub fn on_green_flag(&mut self) -> usize {
        self.project.green_flag(false)
    }

    /// Rewrite the `index`-th number in a block's label.
    pub fn set_input(&mut self, block: BlockId, index: usize, value: f64) -> bool {
        let changed = self.sprite_mut().is_some_and(|s| s.graph.set_input(block, index, value));
        self.dirty |= changed;
        changed
    }

    pub fn tick(&mut self, now: u64) {
        self.project.tick(now);
    }

    /// On-screen rectangles of the selected sprite's blocks.
    pub fn block_rects(&self) -> Vec<(BlockId, Rect)> {
        self.sprite()
            .map(|s| layout::block_rects(&s.graph, &self.config))
            .unwrap_or_default()
    }

    pub fn variable_views(&self) -> Vec<VariableView> {
        self.sprite().map(|s| s.variables.views()).unwrap_or_default()
    }
}
