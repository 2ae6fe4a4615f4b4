//! Log text rendering and table helpers.
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::style::{Color, Modifier};

use dockwatch::ansi::{display_width, spans};
use dockwatch::ui::containers::{containers_handle_key, keep_in_view};
use dockwatch::ui::logs::wrap_line;
use dockwatch::ui::util::{human, human_opt, truncate_middle};

#[test]
fn sgr_codes_become_styles() {
    let s = spans("\x1b[1;31mERR\x1b[0m done \x1b[38;5;208mx\x1b[48;2;1;2;3my");
    let text: Vec<&str> = s.iter().map(|s| s.content.as_ref()).collect();
    assert_eq!(text, vec!["ERR", " done ", "x", "y"]);

    assert_eq!(s[0].style.fg, Some(Color::Red));
    assert!(s[0].style.add_modifier.contains(Modifier::BOLD));
    assert_eq!(s[1].style.fg, None);
    assert_eq!(s[2].style.fg, Some(Color::Indexed(208)));
    assert_eq!(s[3].style.bg, Some(Color::Rgb(1, 2, 3)));
}

#[test]
fn non_sgr_escapes_and_controls_are_dropped() {
    let line = "\x1b]0;title\x07a\x1b[2Kb\x08c\x1b7d";
    let text: String = spans(line).iter().map(|s| s.content.as_ref()).collect();
    assert_eq!(text, "abcd");
    assert_eq!(display_width(line), 4);
}

#[test]
fn width_counts_tabs_and_wide_chars() {
    assert_eq!(display_width("a\tb"), 6);
    assert_eq!(display_width("日本"), 4);
    assert_eq!(display_width("\x1b[32mok\x1b[0m"), 2);
}

#[test]
fn wrap_splits_at_columns_and_keeps_style() {
    let rows = wrap_line("\x1b[33mabcdefgh\x1b[0mij", 4);
    assert_eq!(rows.len(), 3);
    let row_text = |i: usize| -> String {
        rows[i].spans.iter().map(|s| s.content.as_ref()).collect()
    };
    assert_eq!(row_text(0), "abcd");
    assert_eq!(row_text(1), "efgh");
    assert_eq!(row_text(2), "ij");
    assert_eq!(rows[1].spans[0].style.fg, Some(Color::Yellow));
    assert_eq!(rows[2].spans[0].style.fg, None);

    // an empty line still occupies one row
    assert_eq!(wrap_line("", 10).len(), 1);
}

#[test]
fn wide_chars_never_straddle_a_row() {
    let rows = wrap_line("ab日", 3);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].spans[0].content, "日");
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

#[test]
fn table_navigation_stays_in_bounds() {
    let mut sel = 0;
    assert!(containers_handle_key(&mut sel, key(KeyCode::Up), 5, 2));
    assert_eq!(sel, 0);
    containers_handle_key(&mut sel, key(KeyCode::Char('j')), 5, 2);
    assert_eq!(sel, 1);
    containers_handle_key(&mut sel, key(KeyCode::PageDown), 5, 2);
    assert_eq!(sel, 3);
    containers_handle_key(&mut sel, key(KeyCode::PageDown), 5, 2);
    assert_eq!(sel, 4);
    containers_handle_key(&mut sel, key(KeyCode::Home), 5, 2);
    assert_eq!(sel, 0);
    containers_handle_key(&mut sel, key(KeyCode::End), 0, 2);
    assert_eq!(sel, 0);
    assert!(!containers_handle_key(&mut sel, key(KeyCode::Char('q')), 5, 2));
}

#[test]
fn offset_follows_selection() {
    assert_eq!(keep_in_view(0, 0, 3, 10), 0);
    assert_eq!(keep_in_view(5, 0, 3, 10), 3);
    assert_eq!(keep_in_view(2, 4, 3, 10), 2);
    // shrinking lists pull the offset back
    assert_eq!(keep_in_view(1, 8, 3, 4), 1);
    assert_eq!(keep_in_view(0, 0, 0, 10), 0);
}

#[test]
fn sizes_and_names_format_compactly() {
    assert_eq!(human(512.0), "512B");
    assert_eq!(human(1536.0), "1.5KB");
    assert_eq!(human(3.0 * 1024.0 * 1024.0), "3.0MB");
    assert_eq!(human_opt(None), "-");
    assert_eq!(truncate_middle("short", 10), "short");
    assert_eq!(truncate_middle("compose-project-web-1", 11), "comp...eb-1");
}
