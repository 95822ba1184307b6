//! Renderer: the deterministic stage rasterizer.
//!
//! Takes a `Project` (read-only) and produces a grid of styled cells for the
//! player. Each visible sprite is drawn as the first letter of its name,
//! with its speech bubble on the row above.
//!
//! The renderer is pure and stateless. Given the same project it always
//! produces the same grid. It knows nothing about time or scripts.

use crate::engine::Project;
use crate::engine::actor::{ActorState, StageBounds};
use crate::types::{Cell, CellChange, NamedColor, Style, TerminalContract};

/// Sprite colours, cycled by sprite index.
const SPRITE_COLORS: [NamedColor; 6] = [
    NamedColor::Yellow,
    NamedColor::Cyan,
    NamedColor::Magenta,
    NamedColor::Green,
    NamedColor::Red,
    NamedColor::Blue,
];

pub struct Renderer;

impl Renderer {
    /// Rasterize the stage, border included, onto a `contract`-sized grid.
    ///
    /// Sprites are painted in project order, so later sprites cover earlier
    /// ones.
    pub fn render(project: &Project, contract: TerminalContract) -> Vec<Vec<Cell>> {
        let w = contract.width as usize;
        let h = contract.height as usize;
        let mut grid = vec![vec![Cell::default(); w]; h];
        if w < 3 || h < 3 {
            return grid;
        }
        Self::draw_border(&mut grid);

        for (i, sprite) in project.sprites.iter().enumerate() {
            let actor = &sprite.actor;
            if !actor.visible {
                continue;
            }
            let (col, row) = Self::to_cell(actor, project.stage, w, h);
            let glyph = sprite.name.chars().next().unwrap_or('?');
            grid[row][col] = Cell {
                ch: glyph,
                style: Style {
                    fg: Some(SPRITE_COLORS[i % SPRITE_COLORS.len()]),
                    bold: true,
                    ..Style::default()
                },
            };
            if let Some(speech) = &actor.speech {
                let style = if speech.think {
                    Style { dim: true, ..Style::default() }
                } else {
                    Style { fg: Some(NamedColor::Black), bg: Some(NamedColor::White), ..Style::default() }
                };
                Self::draw_text(&mut grid, col, row.saturating_sub(1).max(1), &speech.text, &style);
            }
        }

        grid
    }

    /// Cells that differ between two grids of the same size.
    pub fn diff(prev: &[Vec<Cell>], next: &[Vec<Cell>]) -> Vec<CellChange> {
        let mut changes = Vec::new();
        for (y, (prev_row, next_row)) in prev.iter().zip(next.iter()).enumerate() {
            for (x, (prev_cell, next_cell)) in prev_row.iter().zip(next_row.iter()).enumerate() {
                if prev_cell != next_cell {
                    changes.push(CellChange {
                        x: x as u16,
                        y: y as u16,
                        cell: next_cell.clone(),
                    });
                }
            }
        }
        changes
    }

    /// Map stage coordinates (centre origin, +y up) to an interior cell.
    fn to_cell(actor: &ActorState, stage: StageBounds, w: usize, h: usize) -> (usize, usize) {
        let inner_w = (w - 2) as f64;
        let inner_h = (h - 2) as f64;
        let fx = ((actor.x + stage.half_width()) / stage.width).clamp(0.0, 1.0);
        let fy = ((stage.half_height() - actor.y) / stage.height).clamp(0.0, 1.0);
        let col = 1 + (fx * (inner_w - 1.0)).round() as usize;
        let row = 1 + (fy * (inner_h - 1.0)).round() as usize;
        (col.min(w - 2), row.min(h - 2))
    }

    fn draw_border(grid: &mut [Vec<Cell>]) {
        let h = grid.len();
        let w = grid[0].len();
        let style = Style { dim: true, ..Style::default() };
        let mut put = |x: usize, y: usize, ch: char| {
            grid[y][x] = Cell { ch, style: style.clone() };
        };
        for x in 1..w - 1 {
            put(x, 0, '─');
            put(x, h - 1, '─');
        }
        for y in 1..h - 1 {
            put(0, y, '│');
            put(w - 1, y, '│');
        }
        put(0, 0, '┌');
        put(w - 1, 0, '┐');
        put(0, h - 1, '└');
        put(w - 1, h - 1, '┘');
    }

    /// Write `text` starting at `(x, y)`, cut off at the right border.
    fn draw_text(grid: &mut [Vec<Cell>], x: usize, y: usize, text: &str, style: &Style) {
        let Some(row) = grid.get_mut(y) else {
            return;
        };
        let limit = row.len().saturating_sub(1);
        for (i, ch) in text.chars().enumerate() {
            let col = x + i;
            if col >= limit {
                break;
            }
            row[col] = Cell { ch, style: style.clone() };
        }
    }
}
