use std::io::{self, Write};

use crossterm::{cursor, queue, style, terminal};

/// Split a menu item into `(is_key, text)` spans. Text inside `[...]` is a
/// key hint; an unclosed `[` runs to the end of the item.
pub fn menu_spans(item: &str) -> Vec<(bool, &str)> {
    let mut spans = Vec::new();
    let mut rest = item;
    while !rest.is_empty() {
        let Some(open) = rest.find('[') else {
            spans.push((false, rest));
            break;
        };
        if open > 0 {
            spans.push((false, &rest[..open]));
        }
        rest = &rest[open..];
        match rest.find(']') {
            Some(close) => {
                spans.push((true, &rest[..=close]));
                rest = &rest[close + 1..];
            }
            None => {
                spans.push((true, rest));
                break;
            }
        }
    }
    spans
}

/// Print a one-line menu on row `y`: key hints bold, the rest dim.
pub fn print_menu(stdout: &mut io::Stdout, y: u16, items: &[&str]) -> anyhow::Result<()> {
    queue!(
        stdout,
        cursor::MoveTo(0, y),
        terminal::Clear(terminal::ClearType::CurrentLine),
        style::Print(" "),
    )?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            queue!(stdout, style::Print("  "))?;
        }
        for (is_key, text) in menu_spans(item) {
            let attr = if is_key { style::Attribute::Bold } else { style::Attribute::Dim };
            queue!(
                stdout,
                style::SetAttribute(attr),
                style::Print(text),
                style::SetAttribute(style::Attribute::Reset),
            )?;
        }
    }
    stdout.flush()?;
    Ok(())
}
