use std::path::Path;
use std::process;

use anyhow::{Context, Result, bail};
use log::info;

use block_stage::{
    editor::config::EditorConfig,
    engine::{Project, actor::SoundRequest, graph::BlockKind, source::SourceProject},
    player::Player,
    types::TerminalContract,
};

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

const RUN_USAGE: &str = "block-stage run <project.json> [--ticks N] [--step-ms MS] [--allow-fragments]";
const CHECK_USAGE: &str = "block-stage check <project.json>";
const PLAY_USAGE: &str = "block-stage play <project.json>";
const NEW_USAGE: &str = "block-stage new <project.json>";

/// Stage size in terminal cells for `play`.
const STAGE_CONTRACT: TerminalContract = TerminalContract { width: 61, height: 23 };

struct RunOptions {
    ticks: u64,
    step_ms: Option<u64>,
    allow_fragments: bool,
}

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);

    match args.next().as_deref() {
        Some("run") => {
            let path = args.next().context(RUN_USAGE)?;
            let options = parse_run_options(args)?;
            simulate(&path, &options)
        }
        Some("check") => {
            let path = args.next().context(CHECK_USAGE)?;
            check(&path)
        }
        Some("play") => {
            let path = args.next().context(PLAY_USAGE)?;
            play(&path)
        }
        Some("new") => {
            let path = args.next().context(NEW_USAGE)?;
            new_project(&path)
        }
        _ => bail!(
            "Block Stage: block scripts on a terminal stage\n\nUsage:\n  {RUN_USAGE}\n  {CHECK_USAGE}\n  {PLAY_USAGE}\n  {NEW_USAGE}"
        ),
    }
}

fn parse_run_options(mut args: impl Iterator<Item = String>) -> Result<RunOptions> {
    let mut options = RunOptions { ticks: 1000, step_ms: None, allow_fragments: false };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--ticks" => {
                let n = args.next().context("--ticks needs a value")?;
                options.ticks = n.parse().with_context(|| format!("Invalid tick count {n}"))?;
            }
            "--step-ms" => {
                let n = args.next().context("--step-ms needs a value")?;
                options.step_ms = Some(n.parse().with_context(|| format!("Invalid step {n}"))?);
            }
            "--allow-fragments" => options.allow_fragments = true,
            other => bail!("Unknown option {other}\n\nUsage:\n  {RUN_USAGE}"),
        }
    }
    Ok(options)
}

fn load(path: &str) -> Result<(Project, EditorConfig)> {
    let config = EditorConfig::load();
    let source = SourceProject::load(Path::new(path))?;
    Ok((Project::from_source(&source, config.seed), config))
}

/// Headless run: green flag, then tick a simulated clock until every script
/// is idle or the tick budget runs out.
fn simulate(path: &str, options: &RunOptions) -> Result<()> {
    let (mut project, config) = load(path)?;
    let step = options.step_ms.unwrap_or(config.tick_ms);

    let started = project.green_flag(options.allow_fragments);
    if started == 0 {
        eprintln!("No runnable script in {path}");
    }

    let mut sounds = Vec::new();
    let mut ticks = 0;
    let mut now = 0;
    while ticks < options.ticks && project.is_running() {
        now = ticks.saturating_mul(step);
        project.tick(now);
        for sprite in &mut project.sprites {
            for request in sprite.actor.drain_sounds() {
                sounds.push((sprite.name.clone(), request));
            }
        }
        ticks += 1;
    }
    info!("ran {ticks} tick(s) of {step} ms, {started} script(s) started");

    for sprite in &project.sprites {
        let a = &sprite.actor;
        println!(
            "{}: x={:.2} y={:.2} heading={:.2} size={:.0}% {} costume={} volume={:.0}",
            sprite.name,
            a.x,
            a.y,
            a.heading,
            a.scale,
            if a.visible { "shown" } else { "hidden" },
            a.costume + 1,
            a.volume,
        );
        if let Some(speech) = &a.speech {
            let verb = if speech.think { "thinks" } else { "says" };
            match a.speech_remaining(now) {
                Some(ms) => println!("  {verb} \"{}\" ({ms} ms left)", speech.text),
                None => println!("  {verb} \"{}\"", speech.text),
            }
        }
        for (name, var) in sprite.variables.iter() {
            println!("  {name} = {}", var.value);
        }
    }
    for (sprite, request) in sounds {
        match request {
            SoundRequest::Play(name) => println!("{sprite} played {name}"),
            SoundRequest::StopAll => println!("{sprite} stopped all sounds"),
        }
    }
    if project.is_running() {
        println!("(still running after {ticks} ticks)");
    }
    Ok(())
}

fn check(path: &str) -> Result<()> {
    let (project, _) = load(path)?;
    for sprite in &project.sprites {
        println!("{}:", sprite.name);
        if let Err(e) = sprite.graph.check_invariants() {
            bail!("{}: broken block graph: {e}", sprite.name);
        }
        for root in sprite.graph.roots() {
            let chain = sprite.graph.chain(root);
            let runnable = chain.first().is_some_and(|b| b.kind == BlockKind::Event);
            println!(
                "  chain at {root} ({} block(s)){}",
                chain.len(),
                if runnable { "" } else { " [not runnable]" }
            );
            for block in chain {
                println!("    {:>4} {:<11} {}", block.id, block.kind.name(), block.label);
            }
        }
    }
    Ok(())
}

fn play(path: &str) -> Result<()> {
    let (project, config) = load(path)?;
    let mut player = Player::new(project, STAGE_CONTRACT, config.tick_ms);
    player.play()
}

fn new_project(path: &str) -> Result<()> {
    if Path::new(path).exists() {
        bail!("{path} already exists");
    }
    SourceProject::starter().save(Path::new(path))?;
    eprintln!("Wrote starter project to {path}");
    Ok(())
}
