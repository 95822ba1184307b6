//! Player: the host frame loop.
//!
//! Owns a `Project` and drives it from a monotonic clock, one `tick` per
//! frame. The stage grid comes from the renderer; only changed cells are
//! written to the terminal. Below the stage sit the variable monitors and a
//! status line that also reports sounds the scripts asked for.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use crossterm::{cursor, event, execute, queue, style, terminal};
use log::info;

use crate::engine::Project;
use crate::engine::actor::SoundRequest;
use crate::engine::operand::format_number;
use crate::menubar::print_menu;
use crate::renderer::Renderer;
use crate::types::{Cell, NamedColor, Style, TerminalContract};

/// Rows reserved above the stage for the menu bar.
const CANVAS_OFFSET: u16 = 1;

const MENU: &[&str] = &["[Space] green flag", "[s] stop", "[q][Esc] quit"];

pub struct Player {
    project: Project,
    contract: TerminalContract,
    tick: Duration,
    grid: Vec<Vec<Cell>>,
    last_sound: Option<String>,
}

impl Player {
    pub fn new(project: Project, contract: TerminalContract, tick_ms: u64) -> Self {
        let w = contract.width as usize;
        let h = contract.height as usize;
        Self {
            project,
            contract,
            tick: Duration::from_millis(tick_ms.max(1)),
            grid: vec![vec![Cell::default(); w]; h],
            last_sound: None,
        }
    }

    /// Run the project in the terminal until the user quits.
    ///
    /// Sets up the terminal, enters the frame loop, and restores the terminal
    /// on exit (even on error).
    pub fn play(&mut self) -> Result<()> {
        let (term_w, term_h) = terminal::size()?;
        let need_w = self.contract.width;
        // menu bar, monitors and status line
        let need_h = self.contract.height + 3;
        if term_w < need_w || term_h < need_h {
            bail!("Terminal too small: need {}x{}, have {}x{}", need_w, need_h, term_w, term_h);
        }

        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            stdout,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All),
        )?;

        let result = self.run_loop(&mut stdout);

        // Always restore terminal state.
        let _ = execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();

        result
    }

    // -----------------------------------------------------------------------
    // Frame loop
    // -----------------------------------------------------------------------

    fn run_loop(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        let clock = Instant::now();
        print_menu(stdout, 0, MENU)?;
        self.grid = Renderer::render(&self.project, self.contract);
        self.render_full(stdout)?;

        loop {
            if event::poll(self.tick)? {
                match event::read()? {
                    event::Event::Key(key) => {
                        use event::KeyCode::*;
                        match key.code {
                            Char('q') | Esc => break,
                            Char(' ') => {
                                let started = self.project.green_flag(false);
                                info!("green flag: {started} script(s) started");
                            }
                            Char('s') => self.project.stop_all(),
                            _ => {}
                        }
                    }
                    event::Event::Resize(_, _) => {
                        queue!(stdout, terminal::Clear(terminal::ClearType::All))?;
                        print_menu(stdout, 0, MENU)?;
                        self.render_full(stdout)?;
                    }
                    _ => {}
                }
            }

            let now = clock.elapsed().as_millis() as u64;
            self.project.tick(now);
            self.collect_sounds();
            self.render_frame(stdout)?;
        }

        Ok(())
    }

    /// Drain every sprite's sound outbox. There is no audio backend; the
    /// latest request is shown in the status line.
    fn collect_sounds(&mut self) {
        for sprite in &mut self.project.sprites {
            for request in sprite.actor.drain_sounds() {
                let text = match request {
                    SoundRequest::Play(name) => format!("{}: \u{266a} {name}", sprite.name),
                    SoundRequest::StopAll => format!("{}: sounds stopped", sprite.name),
                };
                info!("{text}");
                self.last_sound = Some(text);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Terminal output
    // -----------------------------------------------------------------------

    fn render_frame(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        let next = Renderer::render(&self.project, self.contract);
        for change in Renderer::diff(&self.grid, &next) {
            let cs = to_content_style(&change.cell.style);
            queue!(
                stdout,
                cursor::MoveTo(change.x, change.y + CANVAS_OFFSET),
                style::PrintStyledContent(style::StyledContent::new(cs, change.cell.ch)),
            )?;
        }
        self.grid = next;
        self.render_monitors(stdout)?;
        self.render_status(stdout)?;
        stdout.flush()?;
        Ok(())
    }

    fn render_full(&self, stdout: &mut io::Stdout) -> Result<()> {
        for (y, row) in self.grid.iter().enumerate() {
            queue!(stdout, cursor::MoveTo(0, y as u16 + CANVAS_OFFSET))?;
            for cell in row {
                let cs = to_content_style(&cell.style);
                queue!(stdout, style::PrintStyledContent(style::StyledContent::new(cs, cell.ch)))?;
            }
        }
        self.render_monitors(stdout)?;
        self.render_status(stdout)?;
        stdout.flush()?;
        Ok(())
    }

    fn render_monitors(&self, stdout: &mut io::Stdout) -> Result<()> {
        let line = monitor_line(&self.project);
        let cs = to_content_style(&Style { fg: Some(NamedColor::Cyan), ..Style::default() });
        queue!(
            stdout,
            cursor::MoveTo(0, self.contract.height + CANVAS_OFFSET),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::PrintStyledContent(style::StyledContent::new(cs, line)),
        )?;
        Ok(())
    }

    fn render_status(&self, stdout: &mut io::Stdout) -> Result<()> {
        let state = if self.project.is_running() { "running" } else { "idle" };
        let mut status = format!(" {state} | {} sprite(s) ", self.project.sprites.len());
        if let Some(sound) = &self.last_sound {
            status.push_str(&format!("| {sound} "));
        }

        let mut cs = style::ContentStyle::default();
        cs.attributes.set(style::Attribute::Dim);

        queue!(
            stdout,
            cursor::MoveTo(0, self.contract.height + CANVAS_OFFSET + 1),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::PrintStyledContent(style::StyledContent::new(cs, status)),
        )?;
        Ok(())
    }
}

/// Variables shown on stage, as `sprite.name = value` pairs.
pub fn monitor_line(project: &Project) -> String {
    project
        .variable_views()
        .into_iter()
        .filter(|(_, v)| v.show_on_stage)
        .map(|(sprite, v)| format!(" {sprite}.{} = {}", v.name, format_number(v.value)))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Style conversion
// ---------------------------------------------------------------------------

pub fn to_content_style(s: &Style) -> style::ContentStyle {
    let mut cs = style::ContentStyle::default();
    if let Some(fg) = s.fg {
        cs.foreground_color = Some(to_ct_color(fg));
    }
    if let Some(bg) = s.bg {
        cs.background_color = Some(to_ct_color(bg));
    }
    if s.bold {
        cs.attributes.set(style::Attribute::Bold);
    }
    if s.dim {
        cs.attributes.set(style::Attribute::Dim);
    }
    cs
}

pub fn to_ct_color(c: NamedColor) -> style::Color {
    match c {
        NamedColor::Black => style::Color::Black,
        NamedColor::Red => style::Color::Red,
        NamedColor::Green => style::Color::Green,
        NamedColor::Yellow => style::Color::Yellow,
        NamedColor::Blue => style::Color::Blue,
        NamedColor::Magenta => style::Color::Magenta,
        NamedColor::Cyan => style::Color::Cyan,
        NamedColor::White => style::Color::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::actor::StageBounds;

    #[test]
    fn monitors_list_shown_variables_only() {
        let mut p = Project::new(StageBounds::default());
        p.add_sprite("Cat", 0);
        p.sprites[0].variables.set("score", 3.0);
        p.sprites[0].variables.set_shown("score", true);
        p.sprites[0].variables.set("hidden", 1.0);
        assert_eq!(monitor_line(&p), " Cat.score = 3");
    }

    #[test]
    fn style_conversion() {
        let cs = to_content_style(&Style { fg: Some(NamedColor::Red), bold: true, ..Style::default() });
        assert_eq!(cs.foreground_color, Some(style::Color::Red));
        assert!(cs.attributes.has(style::Attribute::Bold));
        assert_eq!(cs.background_color, None);
    }

    #[test]
    fn sounds_are_drained_into_status() {
        let mut p = Project::new(StageBounds::default());
        p.add_sprite("Cat", 0);
        p.sprites[0].actor.play_sound("meow");
        let mut player = Player::new(p, TerminalContract { width: 40, height: 12 }, 33);
        player.collect_sounds();
        assert_eq!(player.last_sound.as_deref(), Some("Cat: \u{266a} meow"));
        assert!(player.project.sprites[0].actor.sounds.is_empty());
    }
}
