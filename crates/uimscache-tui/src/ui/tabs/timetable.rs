use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(format!(" Timetable ({}) ", app.timetable.len()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if app.timetable.is_empty() {
        let message = if app.fetching {
            "Loading timetable..."
        } else {
            "No timetable data"
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(message, styles::muted_style())))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec!["Day", "Time", "Course", "Room", "Teacher"])
        .style(styles::highlight_style());

    let mut previous_day = None;
    let rows: Vec<Row> = app
        .timetable
        .iter()
        .map(|entry| {
            let weekday = entry.weekday();
            // Only label the first slot of each day
            let day = if previous_day == Some(weekday) {
                String::new()
            } else {
                weekday.short_name().to_string()
            };
            previous_day = Some(weekday);

            Row::new(vec![
                day,
                entry.time.clone().unwrap_or_default(),
                entry.course.clone().unwrap_or_default(),
                entry.room.clone().unwrap_or_default(),
                entry.teacher.clone().unwrap_or_default(),
            ])
            .style(styles::list_item_style())
        })
        .collect();

    let widths = [
        Constraint::Length(5),
        Constraint::Length(13),
        Constraint::Min(20),
        Constraint::Length(10),
        Constraint::Length(20),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.timetable_selection));
    frame.render_stateful_widget(table, area, &mut state);
}
