//! Engine: block graphs and the scripts that run over them.
//!
//! A `Sprite` owns one actor, the block graph of its scripts, one script
//! runner and its variables. A `Project` is an ordered set of sprites driven
//! by a single host clock.
//!
//! The engine never deals with terminals, windows or files beyond the
//! project format in [`source`].

pub mod actor;
pub mod graph;
pub mod instruction;
pub mod operand;
pub mod runner;
pub mod source;
pub mod variables;

use log::debug;

use crate::types::VariableView;
use actor::{ActorState, StageBounds};
use graph::{BlockGraph, BlockId, BlockKind, RunnableStart};
use runner::ScriptRunner;
use variables::VariableStore;

#[derive(Debug)]
pub struct Sprite {
    pub name: String,
    pub actor: ActorState,
    pub graph: BlockGraph,
    pub runner: ScriptRunner,
    pub variables: VariableStore,
}

impl Sprite {
    pub fn new(name: &str, bounds: StageBounds, seed: u64) -> Self {
        Sprite {
            name: name.to_string(),
            actor: ActorState::new(bounds.sanitized()),
            graph: BlockGraph::new(),
            runner: ScriptRunner::new(seed),
            variables: VariableStore::new(),
        }
    }

    /// Run the chain containing `block` if that chain is Event-rooted.
    /// Returns false (and does nothing) otherwise.
    pub fn run(&mut self, block: BlockId) -> bool {
        let Some(root) = self.graph.root_of(block) else {
            return false;
        };
        match self.graph.get(root) {
            Some(b) if b.kind == BlockKind::Event => {
                self.runner.start(&self.graph, root, &self.variables);
                true
            }
            _ => {
                debug!("{}: chain at {root} is not runnable", self.name);
                false
            }
        }
    }

    /// Start the first runnable script. Orphaned fragments only run when
    /// `allow_fragments` is set.
    pub fn green_flag(&mut self, allow_fragments: bool) -> bool {
        match self.graph.find_runnable_start() {
            Some(RunnableStart::Event(id)) => {
                self.runner.start(&self.graph, id, &self.variables);
                true
            }
            Some(RunnableStart::Fragment(id)) if allow_fragments => {
                self.runner.start(&self.graph, id, &self.variables);
                true
            }
            _ => false,
        }
    }

    pub fn stop(&mut self) {
        self.runner.stop();
    }

    pub fn tick(&mut self, now: u64) {
        self.runner.tick(now, &mut self.actor, &mut self.variables);
    }

    pub fn is_running(&self) -> bool {
        self.runner.is_running()
    }
}

#[derive(Debug, Default)]
pub struct Project {
    pub stage: StageBounds,
    pub sprites: Vec<Sprite>,
}

impl Project {
    pub fn new(stage: StageBounds) -> Self {
        Project { stage: stage.sanitized(), sprites: Vec::new() }
    }

    pub fn add_sprite(&mut self, name: &str, seed: u64) -> usize {
        self.sprites.push(Sprite::new(name, self.stage, seed));
        self.sprites.len() - 1
    }

    pub fn sprite(&self, name: &str) -> Option<&Sprite> {
        self.sprites.iter().find(|s| s.name == name)
    }

    /// Start every sprite's runnable script. Returns how many started.
    pub fn green_flag(&mut self, allow_fragments: bool) -> usize {
        self.sprites
            .iter_mut()
            .map(|s| s.green_flag(allow_fragments))
            .filter(|started| *started)
            .count()
    }

    pub fn stop_all(&mut self) {
        for sprite in &mut self.sprites {
            sprite.stop();
        }
    }

    /// One host frame: each sprite's runner advances once.
    pub fn tick(&mut self, now: u64) {
        for sprite in &mut self.sprites {
            sprite.tick(now);
        }
    }

    pub fn is_running(&self) -> bool {
        self.sprites.iter().any(Sprite::is_running)
    }

    /// Variable monitors of every sprite, prefixed with the sprite name.
    pub fn variable_views(&self) -> Vec<(String, VariableView)> {
        self.sprites
            .iter()
            .flat_map(|s| s.variables.views().into_iter().map(move |v| (s.name.clone(), v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    #[test]
    fn fragments_are_not_run_without_opt_in() {
        let mut sprite = Sprite::new("Cat", StageBounds::default(), 0);
        let m = sprite.graph.add(BlockKind::Motion, "move 10 steps", Point::default());
        assert!(!sprite.run(m));
        assert!(!sprite.green_flag(false));
        assert!(!sprite.is_running());
        assert!(sprite.green_flag(true));
        assert!(sprite.is_running());
    }

    #[test]
    fn run_from_any_block_of_an_event_chain() {
        let mut sprite = Sprite::new("Cat", StageBounds::default(), 0);
        let e = sprite.graph.add(BlockKind::Event, "when flag clicked", Point::default());
        let m = sprite.graph.add(BlockKind::Motion, "move 10 steps", Point::default());
        sprite.graph.insert_after(e, m).unwrap();
        assert!(sprite.run(m));
        assert_eq!(sprite.runner.current_block(), Some(e));
    }

    #[test]
    fn sprites_keep_separate_variables() {
        let mut project = Project::new(StageBounds::default());
        for name in ["A", "B"] {
            let i = project.add_sprite(name, 0);
            let g = &mut project.sprites[i].graph;
            let e = g.add(BlockKind::Event, "when flag clicked", Point::default());
            let label = if name == "A" { "set score to 1" } else { "set score to 2" };
            let v = g.add(BlockKind::Variables, label, Point::default());
            g.insert_after(e, v).unwrap();
        }
        assert_eq!(project.green_flag(false), 2);
        for t in 0..5 {
            project.tick(t);
        }
        assert!(!project.is_running());
        assert_eq!(project.sprite("A").unwrap().variables.value("score"), 1.0);
        assert_eq!(project.sprite("B").unwrap().variables.value("score"), 2.0);
        assert_eq!(project.variable_views().len(), 2);
    }
}
