//! Colours and text styles shared by every screen.

use ratatui::style::{Color, Modifier, Style};

use uimscache_core::models::AttendanceStatus;

const BRAND: Color = Color::Rgb(220, 90, 60);
const GOOD: Color = Color::Rgb(90, 170, 110);
const BAD: Color = Color::Rgb(210, 70, 70);
const KEY: Color = Color::Rgb(230, 180, 70);
const DIM: Color = Color::Rgb(120, 120, 130);
const TEXT: Color = Color::Rgb(225, 225, 230);
const SELECTION_BG: Color = Color::Rgb(55, 45, 50);
const STATUS_BG: Color = Color::Rgb(28, 28, 34);

pub fn title_style() -> Style {
    Style::new().fg(BRAND).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::new().fg(TEXT).bg(SELECTION_BG).add_modifier(Modifier::BOLD)
}

pub fn list_item_style() -> Style {
    Style::new().fg(TEXT)
}

pub fn muted_style() -> Style {
    Style::new().fg(DIM)
}

pub fn highlight_style() -> Style {
    Style::new().fg(KEY)
}

pub fn success_style() -> Style {
    Style::new().fg(GOOD)
}

pub fn error_style() -> Style {
    Style::new().fg(BAD)
}

pub fn tab_style(active: bool) -> Style {
    if active {
        title_style().add_modifier(Modifier::UNDERLINED)
    } else {
        list_item_style()
    }
}

pub fn border_style(active: bool) -> Style {
    Style::new().fg(if active { BRAND } else { DIM })
}

pub fn status_bar_style() -> Style {
    Style::new().fg(TEXT).bg(STATUS_BG)
}

pub fn help_key_style() -> Style {
    highlight_style().add_modifier(Modifier::BOLD)
}

pub fn help_desc_style() -> Style {
    list_item_style()
}

/// Green at or above the eligibility threshold, red below, dim if unknown.
pub fn percentage_style(percentage: Option<f64>, threshold: f64) -> Style {
    match percentage {
        Some(p) if p >= threshold => success_style(),
        Some(_) => error_style(),
        None => muted_style(),
    }
}

pub fn attendance_status_style(status: &AttendanceStatus) -> Style {
    match status {
        AttendanceStatus::Present => success_style(),
        AttendanceStatus::Absent => error_style(),
        AttendanceStatus::Other(_) => muted_style(),
    }
}
