use ratatui::{prelude::*, style::Color};
use tailview_engine::TextColor;

pub const TEXT_FG_COLOR: Color = Color::Gray;

pub const SELECTED_STYLE: Style = Style::new().bg(Color::DarkGray);

pub const STATUS_STYLE: Style = Style::new().fg(Color::Black).bg(Color::Gray);

pub const SEARCH_INPUT_STYLE: Style = Style::new()
    .fg(Color::Black)
    .bg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const PAUSED_STYLE: Style = Style::new()
    .fg(Color::Black)
    .bg(Color::LightRed)
    .add_modifier(Modifier::BOLD);

/// engine color pair → ratatui style
pub fn text_color_style(color: TextColor) -> Style {
    Style::new()
        .bg(Color::Rgb(color.back.r, color.back.g, color.back.b))
        .fg(Color::Rgb(color.fore.r, color.fore.g, color.fore.b))
}

/// base style for a row, falling back to the default palette
pub fn row_style(color: Option<TextColor>) -> Style {
    match color {
        Some(c) => text_color_style(c),
        None => Style::new().fg(TEXT_FG_COLOR),
    }
}
