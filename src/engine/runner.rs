//! Script runner: the per-actor cooperative interpreter.
//!
//! The host calls [`ScriptRunner::tick`] once per frame with a monotonic
//! millisecond clock. Each tick dispatches at most one block. Waits store a
//! deadline and short-circuit later ticks; loops push a [`LoopFrame`] and jump
//! back to their body when the end of the chain is reached.
//!
//! `start` compiles the chain into a private program snapshot, so edits to
//! the graph while a script runs only take effect on the next `start`.

use std::collections::BTreeSet;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::actor::ActorState;
use super::graph::{BlockGraph, BlockId};
use super::instruction::{Instruction, Rotation};
use super::operand::Operand;
use super::variables::VariableStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Waiting { wake_at: u64 },
}

/// Bookkeeping for an active `repeat`/`forever`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopFrame {
    /// Program index of the first block of the loop body.
    pub body: usize,
    /// Iterations left including the current one; -1 repeats forever.
    pub remaining: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub block: BlockId,
    pub instruction: Instruction,
}

/// What the runner does after a block's effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Advance,
    /// `current` was already set by the effect.
    Jump,
}

#[derive(Debug)]
pub struct ScriptRunner {
    state: RunState,
    program: Vec<Step>,
    current: Option<usize>,
    loop_stack: Vec<LoopFrame>,
    clear_text_on_wake: bool,
    working: VariableStore,
    dirty: BTreeSet<String>,
    rng: StdRng,
}

impl Default for ScriptRunner {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ScriptRunner {
    pub fn new(seed: u64) -> Self {
        ScriptRunner {
            state: RunState::Idle,
            program: Vec::new(),
            current: None,
            loop_stack: Vec::new(),
            clear_text_on_wake: false,
            working: VariableStore::new(),
            dirty: BTreeSet::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state != RunState::Idle
    }

    pub fn wake_at(&self) -> Option<u64> {
        match self.state {
            RunState::Waiting { wake_at } => Some(wake_at),
            _ => None,
        }
    }

    /// Block the runner will dispatch next.
    pub fn current_block(&self) -> Option<BlockId> {
        self.current.and_then(|i| self.program.get(i)).map(|s| s.block)
    }

    pub fn loop_stack(&self) -> &[LoopFrame] {
        &self.loop_stack
    }

    /// Start (or restart) running the chain that begins at `first`.
    ///
    /// An unknown `first` yields an empty program; the next tick then finds
    /// nothing to run and goes idle.
    pub fn start(&mut self, graph: &BlockGraph, first: BlockId, variables: &VariableStore) {
        self.program = graph
            .chain(first)
            .into_iter()
            .map(|b| Step {
                block: b.id,
                instruction: Instruction::decode(b.kind, &b.label),
            })
            .collect();
        self.current = (!self.program.is_empty()).then_some(0);
        self.loop_stack.clear();
        self.clear_text_on_wake = false;
        self.working = variables.clone();
        self.dirty.clear();
        self.state = RunState::Running;
        info!("script started at block {first} ({} steps)", self.program.len());
    }

    /// Stop immediately. Effects already applied stay applied.
    pub fn stop(&mut self) {
        if self.state != RunState::Idle {
            info!("script stopped");
        }
        self.state = RunState::Idle;
        self.current = None;
        self.loop_stack.clear();
        self.clear_text_on_wake = false;
    }

    /// Advance by at most one block.
    pub fn tick(&mut self, now: u64, actor: &mut ActorState, variables: &mut VariableStore) {
        match self.state {
            RunState::Idle => return,
            RunState::Waiting { wake_at } if now < wake_at => return,
            RunState::Waiting { .. } => {
                self.state = RunState::Running;
                if self.clear_text_on_wake {
                    actor.clear_speech();
                    self.clear_text_on_wake = false;
                }
            }
            RunState::Running => {}
        }

        let Some(index) = self.current else {
            self.state = RunState::Idle;
            info!("script finished");
            self.flush(variables);
            return;
        };
        let Some(step) = self.program.get(index) else {
            self.stop();
            self.flush(variables);
            return;
        };

        let instruction = step.instruction.clone();
        debug!("block {}: {instruction:?}", step.block);
        if self.dispatch(index, &instruction, now, actor) == Flow::Advance {
            self.advance();
        }
        self.flush(variables);
    }

    fn dispatch(&mut self, index: usize, instruction: &Instruction, now: u64, actor: &mut ActorState) -> Flow {
        match instruction {
            Instruction::Hat | Instruction::NoOp(_) => {}

            Instruction::Move(steps) => actor.move_steps(self.resolve(steps)),
            Instruction::Turn(degrees, rotation) => {
                let d = self.resolve(degrees);
                actor.turn(match rotation {
                    Rotation::Clockwise => d,
                    Rotation::CounterClockwise => -d,
                });
            }
            Instruction::PointInDirection(d) => actor.point_in_direction(self.resolve(d)),
            Instruction::GoTo { x, y } => {
                let (x, y) = (self.resolve(x), self.resolve(y));
                actor.go_to(x, y);
            }
            Instruction::ChangeX(dx) => actor.change_x(self.resolve(dx)),
            Instruction::ChangeY(dy) => actor.change_y(self.resolve(dy)),
            Instruction::SetX(x) => actor.set_x(self.resolve(x)),
            Instruction::SetY(y) => actor.set_y(self.resolve(y)),
            Instruction::Bounce => actor.bounce(),

            Instruction::Say { text, think, secs: None } => actor.say(text, *think, None),
            Instruction::Say { text, think, secs: Some(secs) } => {
                let wake_at = deadline(now, self.resolve(secs));
                actor.say(text, *think, Some(wake_at));
                self.clear_text_on_wake = true;
                self.state = RunState::Waiting { wake_at };
            }
            Instruction::Show => actor.set_visible(true),
            Instruction::Hide => actor.set_visible(false),
            Instruction::ChangeSize(by) => actor.change_scale(self.resolve(by)),
            Instruction::SetSize(to) => actor.set_scale(self.resolve(to)),
            Instruction::NextCostume => actor.next_costume(),
            Instruction::SwitchCostume(n) => actor.switch_costume(self.resolve(n).round() as i64),

            Instruction::PlaySound(name) => actor.play_sound(name),
            Instruction::StopAllSounds => actor.stop_sounds(),
            Instruction::SetVolume(v) => actor.set_volume(self.resolve(v)),
            Instruction::ChangeVolume(by) => actor.change_volume(self.resolve(by)),

            Instruction::Wait(secs) => {
                self.state = RunState::Waiting {
                    wake_at: deadline(now, self.resolve(secs)),
                };
            }
            Instruction::Repeat(times) => {
                let times = (self.resolve(times).round() as i64).max(0);
                return self.enter_loop(index, Some(times));
            }
            Instruction::Forever => return self.enter_loop(index, None),
            Instruction::Stop => {
                self.stop();
                return Flow::Jump;
            }

            Instruction::PickRandom { from, to } => {
                let (a, b) = (self.resolve(from), self.resolve(to));
                let value = self.pick_random(a, b);
                // No expression layer consumes the result.
                debug!("pick random {a} to {b} -> {value}");
            }

            Instruction::SetVariable { name, value } => {
                let v = self.resolve(value);
                self.working.set(name, v);
                self.dirty.insert(name.clone());
            }
            Instruction::ChangeVariable { name, by } => {
                let by = self.resolve(by);
                self.working.change(name, by);
                self.dirty.insert(name.clone());
            }
            Instruction::ShowVariable(name, shown) => {
                self.working.set_shown(name, *shown);
                self.dirty.insert(name.clone());
            }
        }
        Flow::Advance
    }

    /// Push a loop frame whose body is everything below `index`; `None` loops
    /// forever. A loop with no body or no iterations behaves as if its body
    /// had just completed.
    fn enter_loop(&mut self, index: usize, times: Option<i64>) -> Flow {
        let body = index + 1;
        if body >= self.program.len() || times.is_some_and(|n| n <= 0) {
            self.current = Some(index);
            self.unwind();
            return Flow::Jump;
        }
        self.loop_stack.push(LoopFrame { body, remaining: times.unwrap_or(-1) });
        self.current = Some(body);
        Flow::Jump
    }

    /// Move to the next block, or unwind loop frames at the end of the chain.
    fn advance(&mut self) {
        let Some(index) = self.current else {
            return;
        };
        if index + 1 < self.program.len() {
            self.current = Some(index + 1);
        } else {
            self.unwind();
        }
    }

    fn unwind(&mut self) {
        while let Some(frame) = self.loop_stack.last_mut() {
            if frame.remaining < 0 {
                self.current = Some(frame.body);
                return;
            }
            frame.remaining -= 1;
            if frame.remaining > 0 {
                self.current = Some(frame.body);
                return;
            }
            self.loop_stack.pop();
        }
        self.current = None;
        // A trailing wait still has to elapse; the wake tick then goes idle.
        if self.state == RunState::Running {
            self.state = RunState::Idle;
            info!("script finished");
        }
    }

    /// Numeric value of an operand against the working variables.
    fn resolve(&self, operand: &Operand) -> f64 {
        match operand {
            Operand::Number(n) => *n,
            Operand::Variable(name) => self.working.value(name),
        }
    }

    fn pick_random(&mut self, a: f64, b: f64) -> f64 {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        if lo == hi {
            lo
        } else if lo.fract() == 0.0 && hi.fract() == 0.0 {
            self.rng.gen_range(lo as i64..=hi as i64) as f64
        } else {
            self.rng.gen_range(lo..=hi)
        }
    }

    fn flush(&mut self, variables: &mut VariableStore) {
        for name in std::mem::take(&mut self.dirty) {
            variables.copy_from(&self.working, &name);
        }
    }
}

fn deadline(now: u64, secs: f64) -> u64 {
    let ms = if secs.is_finite() { (secs.max(0.0) * 1000.0).round() } else { 0.0 };
    now.saturating_add(ms as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graph::BlockKind;
    use crate::types::Point;

    fn chain(labels: &[(BlockKind, &str)]) -> (BlockGraph, BlockId) {
        let mut g = BlockGraph::new();
        let ids: Vec<_> = labels.iter().map(|(k, l)| g.add(*k, l, Point::default())).collect();
        for pair in ids.windows(2) {
            g.insert_after(pair[0], pair[1]).unwrap();
        }
        (g, ids[0])
    }

    fn run_to_end(runner: &mut ScriptRunner, actor: &mut ActorState, vars: &mut VariableStore) -> u64 {
        let mut now = 0;
        while runner.is_running() && now < 100_000 {
            runner.tick(now, actor, vars);
            now += 10;
        }
        now
    }

    #[test]
    fn one_block_per_tick() {
        let (g, first) = chain(&[
            (BlockKind::Event, "when flag clicked"),
            (BlockKind::Motion, "move 10 steps"),
            (BlockKind::Motion, "move 10 steps"),
        ]);
        let mut r = ScriptRunner::new(1);
        let (mut actor, mut vars) = (ActorState::default(), VariableStore::new());
        r.start(&g, first, &vars);
        r.tick(0, &mut actor, &mut vars);
        assert_eq!(actor.x, 0.0);
        r.tick(1, &mut actor, &mut vars);
        assert!((actor.x - 10.0).abs() < 1e-9);
        r.tick(2, &mut actor, &mut vars);
        assert!((actor.x - 20.0).abs() < 1e-9);
        assert_eq!(r.state(), RunState::Idle);
    }

    #[test]
    fn say_for_clears_text_on_wake() {
        let (g, first) = chain(&[
            (BlockKind::Looks, "say Hi for 1 secs"),
            (BlockKind::Looks, "hide"),
        ]);
        let mut r = ScriptRunner::new(1);
        let (mut actor, mut vars) = (ActorState::default(), VariableStore::new());
        r.start(&g, first, &vars);
        r.tick(500, &mut actor, &mut vars);
        assert_eq!(actor.speech.as_ref().map(|s| s.text.as_str()), Some("Hi"));
        assert_eq!(r.wake_at(), Some(1500));
        r.tick(1499, &mut actor, &mut vars);
        assert!(actor.speech.is_some());
        r.tick(1500, &mut actor, &mut vars);
        assert!(actor.speech.is_none());
        assert!(!actor.visible);
    }

    #[test]
    fn plain_wait_keeps_text() {
        let (g, first) = chain(&[
            (BlockKind::Looks, "say Hi"),
            (BlockKind::Control, "wait 0.5 secs"),
            (BlockKind::Motion, "move 1 steps"),
        ]);
        let mut r = ScriptRunner::new(1);
        let (mut actor, mut vars) = (ActorState::default(), VariableStore::new());
        r.start(&g, first, &vars);
        run_to_end(&mut r, &mut actor, &mut vars);
        assert!(actor.speech.is_some());
    }

    #[test]
    fn trailing_wait_elapses_before_idle() {
        let (g, first) = chain(&[(BlockKind::Control, "wait 1 secs")]);
        let mut r = ScriptRunner::new(1);
        let (mut actor, mut vars) = (ActorState::default(), VariableStore::new());
        r.start(&g, first, &vars);
        r.tick(0, &mut actor, &mut vars);
        assert_eq!(r.state(), RunState::Waiting { wake_at: 1000 });
        r.tick(1000, &mut actor, &mut vars);
        assert_eq!(r.state(), RunState::Idle);
    }

    #[test]
    fn nested_repeats_multiply() {
        let (g, first) = chain(&[
            (BlockKind::Control, "repeat 2"),
            (BlockKind::Variables, "change outer by 1"),
            (BlockKind::Control, "repeat 3"),
            (BlockKind::Variables, "change inner by 1"),
        ]);
        let mut r = ScriptRunner::new(1);
        let (mut actor, mut vars) = (ActorState::default(), VariableStore::new());
        r.start(&g, first, &vars);
        run_to_end(&mut r, &mut actor, &mut vars);
        assert_eq!(vars.value("outer"), 2.0);
        assert_eq!(vars.value("inner"), 6.0);
        assert!(r.loop_stack().is_empty());
    }

    #[test]
    fn repeat_zero_skips_body() {
        let (g, first) = chain(&[
            (BlockKind::Control, "repeat 0"),
            (BlockKind::Variables, "change x by 5"),
        ]);
        let mut r = ScriptRunner::new(1);
        let (mut actor, mut vars) = (ActorState::default(), VariableStore::new());
        r.start(&g, first, &vars);
        r.tick(0, &mut actor, &mut vars);
        assert_eq!(r.state(), RunState::Idle);
        assert_eq!(vars.get("x"), None);
    }

    #[test]
    fn forever_runs_until_stopped() {
        let (g, first) = chain(&[
            (BlockKind::Control, "forever"),
            (BlockKind::Variables, "change n by 1"),
        ]);
        let mut r = ScriptRunner::new(1);
        let (mut actor, mut vars) = (ActorState::default(), VariableStore::new());
        r.start(&g, first, &vars);
        for t in 0..101 {
            r.tick(t, &mut actor, &mut vars);
        }
        assert_eq!(vars.value("n"), 100.0);
        assert_eq!(r.loop_stack(), &[LoopFrame { body: 1, remaining: -1 }]);
        r.stop();
        r.tick(200, &mut actor, &mut vars);
        assert_eq!(vars.value("n"), 100.0);
        assert!(r.loop_stack().is_empty());
    }

    #[test]
    fn stop_block_halts_and_keeps_effects() {
        let (g, first) = chain(&[
            (BlockKind::Variables, "set a to 3"),
            (BlockKind::Control, "stop all"),
            (BlockKind::Variables, "set a to 9"),
        ]);
        let mut r = ScriptRunner::new(1);
        let (mut actor, mut vars) = (ActorState::default(), VariableStore::new());
        r.start(&g, first, &vars);
        run_to_end(&mut r, &mut actor, &mut vars);
        assert_eq!(vars.value("a"), 3.0);
    }

    #[test]
    fn operands_read_variables() {
        let (g, first) = chain(&[
            (BlockKind::Variables, "set speed to 7"),
            (BlockKind::Motion, "move speed steps"),
            (BlockKind::Motion, "change y by missing"),
            (BlockKind::Looks, "set size to missing %"),
        ]);
        let mut r = ScriptRunner::new(1);
        let (mut actor, mut vars) = (ActorState::default(), VariableStore::new());
        r.start(&g, first, &vars);
        run_to_end(&mut r, &mut actor, &mut vars);
        assert!((actor.x - 7.0).abs() < 1e-9);
        assert_eq!(actor.y, 0.0);
        assert_eq!(actor.scale, crate::engine::actor::MIN_SCALE);
    }

    #[test]
    fn negative_repeat_skips_body() {
        for label in ["repeat -1", "repeat -3", "repeat -1e300"] {
            let (g, first) = chain(&[
                (BlockKind::Control, label),
                (BlockKind::Variables, "change n by 1"),
            ]);
            let mut r = ScriptRunner::new(1);
            let (mut actor, mut vars) = (ActorState::default(), VariableStore::new());
            r.start(&g, first, &vars);
            r.tick(0, &mut actor, &mut vars);
            assert_eq!(r.state(), RunState::Idle, "{label}");
            assert!(r.loop_stack().is_empty());
            assert_eq!(vars.get("n"), None);
        }
    }

    #[test]
    fn extreme_operands_do_not_panic() {
        let (g, first) = chain(&[
            (BlockKind::Variables, "set big to -1e300"),
            (BlockKind::Looks, "switch costume to -1e300"),
            (BlockKind::Looks, "switch costume to big"),
            (BlockKind::Looks, "switch costume to 1e300"),
            (BlockKind::Motion, "move 1e308 steps"),
            (BlockKind::Motion, "turn right -1e300 degrees"),
            (BlockKind::Looks, "change size by -1e308"),
            (BlockKind::Sound, "change volume by 1e300"),
            (BlockKind::Control, "wait 1e300 secs"),
        ]);
        let mut r = ScriptRunner::new(1);
        let (mut actor, mut vars) = (ActorState { costume_count: 3, ..Default::default() }, VariableStore::new());
        r.start(&g, first, &vars);
        for t in 0..9 {
            r.tick(t, &mut actor, &mut vars);
        }
        assert!(actor.costume < 3);
        assert!(actor.x.abs() <= 240.0 && actor.y.abs() <= 180.0);
        assert_eq!(actor.scale, crate::engine::actor::MIN_SCALE);
        assert_eq!(actor.volume, 100.0);
        assert_eq!(r.state(), RunState::Waiting { wake_at: u64::MAX });
    }

    #[test]
    fn edits_after_start_are_not_observed() {
        let (mut g, first) = chain(&[
            (BlockKind::Event, "when flag clicked"),
            (BlockKind::Motion, "move 10 steps"),
        ]);
        let mut r = ScriptRunner::new(1);
        let (mut actor, mut vars) = (ActorState::default(), VariableStore::new());
        r.start(&g, first, &vars);
        let second = g.get(first).unwrap().next().unwrap();
        g.set_label(second, "move 99 steps");
        g.detach(second);
        run_to_end(&mut r, &mut actor, &mut vars);
        assert!((actor.x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn pick_random_is_seeded() {
        let mut a = ScriptRunner::new(42);
        let mut b = ScriptRunner::new(42);
        for _ in 0..20 {
            let x = a.pick_random(1.0, 6.0);
            assert_eq!(x, b.pick_random(6.0, 1.0));
            assert!((1.0..=6.0).contains(&x) && x.fract() == 0.0);
        }
    }
}
