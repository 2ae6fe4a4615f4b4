//! Minimal ANSI escape handling for log output: SGR colour/attribute codes
//! become ratatui styles, every other control sequence is dropped.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use unicode_width::UnicodeWidthChar;

const STANDARD: [Color; 8] = [
    Color::Black,
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
    Color::Gray,
];

const BRIGHT: [Color; 8] = [
    Color::DarkGray,
    Color::LightRed,
    Color::LightGreen,
    Color::LightYellow,
    Color::LightBlue,
    Color::LightMagenta,
    Color::LightCyan,
    Color::White,
];

const TAB: &str = "    ";

enum Piece<'a> {
    Text(&'a str),
    Sgr(&'a str),
}

/// Splits a line into printable runs and SGR parameter strings.
fn pieces(line: &str) -> Vec<Piece<'_>> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == 0x1b {
            if start < i {
                out.push(Piece::Text(&line[start..i]));
            }
            i = skip_escape(line, i, &mut out);
            start = i;
        } else if b < 0x20 && b != b'\t' {
            if start < i {
                out.push(Piece::Text(&line[start..i]));
            }
            i += 1;
            start = i;
        } else {
            i += 1;
        }
    }
    if start < bytes.len() {
        out.push(Piece::Text(&line[start..]));
    }
    out
}

// Returns the index just past the escape sequence starting at `at`.
fn skip_escape<'a>(line: &'a str, at: usize, out: &mut Vec<Piece<'a>>) -> usize {
    let bytes = line.as_bytes();
    match bytes.get(at + 1) {
        Some(b'[') => {
            let params = at + 2;
            let mut j = params;
            while j < bytes.len() && !(0x40..=0x7e).contains(&bytes[j]) {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'm' {
                out.push(Piece::Sgr(&line[params..j]));
            }
            (j + 1).min(bytes.len())
        }
        Some(b']') => {
            // OSC runs until BEL or ST
            let mut j = at + 2;
            while j < bytes.len() {
                if bytes[j] == 0x07 {
                    return j + 1;
                }
                if bytes[j] == 0x1b && bytes.get(j + 1) == Some(&b'\\') {
                    return j + 2;
                }
                j += 1;
            }
            bytes.len()
        }
        Some(c) if c.is_ascii() => at + 2,
        _ => at + 1,
    }
}

fn apply_sgr(style: Style, params: &str) -> Style {
    let codes: Vec<u16> = if params.is_empty() {
        vec![0]
    } else {
        params
            .split(';')
            .map(|p| p.parse::<u16>().unwrap_or(0))
            .collect()
    };
    let mut style = style;
    let mut i = 0;
    while i < codes.len() {
        match codes[i] {
            0 => style = Style::default(),
            1 => style = style.add_modifier(Modifier::BOLD),
            2 => style = style.add_modifier(Modifier::DIM),
            3 => style = style.add_modifier(Modifier::ITALIC),
            4 => style = style.add_modifier(Modifier::UNDERLINED),
            7 => style = style.add_modifier(Modifier::REVERSED),
            22 => style = style.remove_modifier(Modifier::BOLD | Modifier::DIM),
            23 => style = style.remove_modifier(Modifier::ITALIC),
            24 => style = style.remove_modifier(Modifier::UNDERLINED),
            27 => style = style.remove_modifier(Modifier::REVERSED),
            c @ 30..=37 => style = style.fg(STANDARD[(c - 30) as usize]),
            39 => style.fg = None,
            c @ 40..=47 => style = style.bg(STANDARD[(c - 40) as usize]),
            49 => style.bg = None,
            c @ 90..=97 => style = style.fg(BRIGHT[(c - 90) as usize]),
            c @ 100..=107 => style = style.bg(BRIGHT[(c - 100) as usize]),
            c @ (38 | 48) => {
                let (color, used) = extended_color(&codes[i + 1..]);
                if let Some(color) = color {
                    style = if c == 38 { style.fg(color) } else { style.bg(color) };
                }
                i += used;
            }
            _ => {}
        }
        i += 1;
    }
    style
}

// `5;n` or `2;r;g;b`; returns the colour and how many codes it consumed.
fn extended_color(rest: &[u16]) -> (Option<Color>, usize) {
    match rest {
        [5, n, ..] => (Some(Color::Indexed((*n).min(255) as u8)), 2),
        [2, r, g, b, ..] => (
            Some(Color::Rgb(
                (*r).min(255) as u8,
                (*g).min(255) as u8,
                (*b).min(255) as u8,
            )),
            4,
        ),
        _ => (None, rest.len()),
    }
}

/// Styled spans for one log line.
pub fn spans(line: &str) -> Vec<Span<'static>> {
    let mut style = Style::default();
    let mut out = Vec::new();
    for piece in pieces(line) {
        match piece {
            Piece::Text(t) => out.push(Span::styled(t.replace('\t', TAB), style)),
            Piece::Sgr(p) => style = apply_sgr(style, p),
        }
    }
    out
}

/// Terminal columns the line occupies once escapes are removed.
pub fn display_width(line: &str) -> usize {
    pieces(line)
        .into_iter()
        .map(|p| match p {
            Piece::Text(t) => t.chars().map(char_width).sum(),
            Piece::Sgr(_) => 0,
        })
        .sum()
}

pub fn char_width(ch: char) -> usize {
    if ch == '\t' {
        TAB.len()
    } else {
        ch.width().unwrap_or(0)
    }
}
