use block_stage::editor::config::EditorConfig;
use block_stage::editor::snap::{AttachOutcome, resolve_release};
use block_stage::engine::Sprite;
use block_stage::engine::actor::StageBounds;
use block_stage::engine::graph::{BlockGraph, BlockId, BlockKind};
use block_stage::engine::runner::RunState;
use block_stage::types::Point;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A sprite whose only script is a flag hat followed by `labels`.
fn scripted(blocks: &[(BlockKind, &str)]) -> Sprite {
    let mut sprite = Sprite::new("Cat", StageBounds::default(), 7);
    let mut last = sprite.graph.add(BlockKind::Event, "when flag clicked", Point::new(300.0, 100.0));
    for (kind, label) in blocks {
        let id = sprite.graph.add(*kind, label, Point::default());
        sprite.graph.insert_after(last, id).unwrap();
        last = id;
    }
    assert!(sprite.green_flag(false));
    sprite
}

fn run_to_idle(sprite: &mut Sprite, max_ticks: u64) {
    for t in 0..max_ticks {
        if !sprite.is_running() {
            return;
        }
        sprite.tick(t);
    }
}

#[test]
fn move_projects_along_heading() {
    let mut sprite = scripted(&[(BlockKind::Motion, "move 10 steps")]);
    run_to_idle(&mut sprite, 10);
    assert!((sprite.actor.x - 10.0).abs() < 1e-9);
    assert!(sprite.actor.y.abs() < 1e-9);
}

#[test]
fn wait_suspends_until_deadline() {
    let mut sprite = scripted(&[(BlockKind::Control, "wait 1 secs"), (BlockKind::Motion, "move 10 steps")]);
    sprite.tick(0);
    sprite.tick(1000);
    assert_eq!(sprite.runner.state(), RunState::Waiting { wake_at: 2000 });

    let before = sprite.runner.current_block();
    sprite.tick(1500);
    assert_eq!(sprite.runner.state(), RunState::Waiting { wake_at: 2000 });
    assert_eq!(sprite.runner.current_block(), before);
    assert_eq!(sprite.actor.x, 0.0);

    sprite.tick(2000);
    assert!(!matches!(sprite.runner.state(), RunState::Waiting { .. }));
    assert!((sprite.actor.x - 10.0).abs() < 1e-9);
}

#[test]
fn repeat_runs_body_exactly_n_times() {
    let mut sprite = scripted(&[(BlockKind::Control, "repeat 3"), (BlockKind::Motion, "change x by 5")]);
    run_to_idle(&mut sprite, 100);
    assert!(!sprite.is_running());
    assert_eq!(sprite.actor.x, 15.0);
    assert!(sprite.runner.loop_stack().is_empty());
}

#[test]
fn repeat_counts_from_zero_to_five() {
    for n in 0..=5 {
        let label = format!("repeat {n}");
        let mut sprite = scripted(&[(BlockKind::Control, label.as_str()), (BlockKind::Motion, "change x by 1")]);
        run_to_idle(&mut sprite, 100);
        assert_eq!(sprite.actor.x, n as f64, "repeat {n}");
        assert!(sprite.runner.loop_stack().is_empty());
    }
}

#[test]
fn negative_repeat_counts_run_nothing() {
    for label in ["repeat -1", "repeat -3"] {
        let mut sprite = scripted(&[(BlockKind::Control, label), (BlockKind::Variables, "change n by 1")]);
        run_to_idle(&mut sprite, 200);
        assert!(!sprite.is_running(), "{label}");
        assert_eq!(sprite.variables.get("n"), None, "{label}");
        assert!(sprite.runner.loop_stack().is_empty());
    }
}

#[test]
fn huge_wait_never_wakes() {
    let mut sprite = scripted(&[(BlockKind::Control, "wait 1e300 secs"), (BlockKind::Motion, "move 10 steps")]);
    sprite.tick(0);
    sprite.tick(5);
    assert_eq!(sprite.runner.wake_at(), Some(u64::MAX));
    sprite.tick(u64::MAX - 1);
    assert_eq!(sprite.actor.x, 0.0);
    sprite.stop();
    assert_eq!(sprite.runner.state(), RunState::Idle);
}

#[test]
fn forever_only_ends_on_stop() {
    let mut sprite = scripted(&[(BlockKind::Control, "forever"), (BlockKind::Motion, "change x by 1")]);
    for t in 0..500 {
        sprite.tick(t);
    }
    assert!(sprite.is_running());
    assert_eq!(sprite.runner.loop_stack().len(), 1);
    sprite.stop();
    assert_eq!(sprite.runner.state(), RunState::Idle);
    assert!(sprite.runner.loop_stack().is_empty());
}

#[test]
fn wait_never_advances_early() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..50 {
        let secs = rng.gen_range(1..5);
        let label = format!("wait {secs} secs");
        let mut sprite = scripted(&[(BlockKind::Control, label.as_str()), (BlockKind::Motion, "move 1 steps")]);
        let start = rng.gen_range(0..10_000u64);
        sprite.tick(start);
        sprite.tick(start);
        let wake_at = sprite.runner.wake_at().unwrap();
        assert_eq!(wake_at, start + secs * 1000);

        let early = rng.gen_range(start..wake_at);
        let current = sprite.runner.current_block();
        sprite.tick(early);
        assert_eq!(sprite.runner.current_block(), current);
        assert_eq!(sprite.runner.wake_at(), Some(wake_at));

        sprite.tick(wake_at + rng.gen_range(0..100));
        assert_eq!(sprite.runner.wake_at(), None);
    }
}

#[test]
fn occupied_slot_is_not_taken() {
    let config = EditorConfig::default();
    let mut g = BlockGraph::new();
    let hat = g.add(BlockKind::Event, "when flag clicked", Point::new(300.0, 100.0));
    let occupant = g.add(BlockKind::Motion, "move 10 steps", Point::default());
    g.insert_after(hat, occupant).unwrap();
    let floating = g.add(BlockKind::Motion, "turn right 15 degrees", Point::new(600.0, 500.0));

    let near_hat_bottom = Point::new(303.0, 139.0);
    assert_eq!(resolve_release(&mut g, floating, near_hat_bottom, &config), AttachOutcome::Floating);
    assert_eq!(g.get(hat).unwrap().next(), Some(occupant));
    assert!(g.get(floating).unwrap().is_root());
    g.check_invariants().unwrap();
}

#[test]
fn snap_is_deterministic() {
    let config = EditorConfig::default();
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..100 {
        let positions: Vec<Point> = (0..6)
            .map(|_| Point::new(rng.gen_range(260.0..700.0), rng.gen_range(66.0..650.0)))
            .collect();
        let release = Point::new(rng.gen_range(250.0..810.0), rng.gen_range(60.0..730.0));
        let build = || {
            let mut g = BlockGraph::new();
            let ids: Vec<BlockId> = positions
                .iter()
                .map(|p| g.add(BlockKind::Motion, "move 10 steps", *p))
                .collect();
            (g, ids)
        };
        let (mut g1, ids1) = build();
        let (mut g2, ids2) = build();
        let a = resolve_release(&mut g1, ids1[0], release, &config);
        let b = resolve_release(&mut g2, ids2[0], release, &config);
        assert_eq!(a, b);
        g1.check_invariants().unwrap();
    }
}
