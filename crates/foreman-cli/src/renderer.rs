//! Markdown rendering for the terminal via termimad, with a plain-text
//! fallback.

use std::io::{self, Write};

use anyhow::Result;
use termimad::{crossterm::style::Color, MadSkin};

pub struct TerminalRenderer {
    rich_enabled: bool,
    skin: MadSkin,
}

impl TerminalRenderer {
    pub fn new(rich_enabled: bool) -> Self {
        let mut skin = MadSkin::default();
        skin.set_headers_fg(Color::Cyan);
        skin.bold.set_fg(Color::Yellow);
        skin.inline_code.set_bg(Color::AnsiValue(238));

        Self { rich_enabled, skin }
    }

    /// Prints `markdown`. Tables are rendered as a block so their columns
    /// line up; every other line is styled inline with headers kept visible.
    /// Fails when stdout cannot be written, e.g. a closed pipe.
    pub fn render(&self, markdown: &str) -> Result<()> {
        self.render_on(&mut io::stdout().lock(), markdown)
    }

    fn render_on<W: Write>(&self, out: &mut W, markdown: &str) -> Result<()> {
        if !self.rich_enabled {
            write!(out, "{markdown}")?;
            out.flush()?;
            return Ok(());
        }

        let mut table = Vec::new();
        for line in markdown.lines() {
            if line.starts_with('|') {
                table.push(line);
                continue;
            }
            self.flush_table(out, &mut table)?;

            if line.starts_with('#') {
                writeln!(out, "\x1b[36m{line}\x1b[0m")?;
            } else {
                self.skin.write_inline_on(out, line)?;
                writeln!(out)?;
            }
        }
        self.flush_table(out, &mut table)?;
        out.flush()?;
        Ok(())
    }

    fn flush_table<W: Write>(&self, out: &mut W, table: &mut Vec<&str>) -> Result<()> {
        if table.is_empty() {
            return Ok(());
        }
        self.skin.write_text_on(out, &table.join("\n"))?;
        table.clear();
        Ok(())
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_renderer_writes_markdown_verbatim() {
        let renderer = TerminalRenderer::new(false);
        let mut out = Vec::new();
        renderer.render_on(&mut out, "# Title\n| a | b |\n").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "# Title\n| a | b |\n");
    }

    #[test]
    fn test_rich_renderer_keeps_headers_and_rows() {
        let renderer = TerminalRenderer::new(true);
        let mut out = Vec::new();
        renderer
            .render_on(&mut out, "# Plan\n|kind|target|\n|-|-|\n|file-issue|alpha|\n")
            .unwrap();
        let printed = String::from_utf8_lossy(&out);
        assert!(printed.contains("# Plan"));
        assert!(printed.contains("alpha"));
    }

    #[test]
    fn test_default_is_rich() {
        assert!(TerminalRenderer::default().rich_enabled);
    }
}
