use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use uimscache_core::models::AttendanceRecord;
use uimscache_core::utils::{format_percentage, truncate_string};

use crate::app::{App, ELIGIBILITY_THRESHOLD};
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_course_list(frame, app, chunks[0]);
    render_course_detail(frame, app, chunks[1]);
}

fn render_course_list(frame: &mut Frame, app: &App, area: Rect) {
    let title_width = (area.width as usize).saturating_sub(20).max(10);

    let items: Vec<ListItem> = app
        .attendance
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let percentage = record.percentage();
            let line = Line::from(vec![
                Span::raw(format!(
                    "{:<width$} ",
                    truncate_string(&record.display_title(), title_width),
                    width = title_width
                )),
                Span::styled(
                    format!("{:>7}", format_percentage(percentage)),
                    styles::percentage_style(percentage, ELIGIBILITY_THRESHOLD),
                ),
            ]);

            let style = if i == app.attendance_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            ListItem::new(line).style(style)
        })
        .collect();

    let block = Block::default()
        .title(format!(" Courses ({}) ", app.attendance.len()))
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if items.is_empty() {
        let message = if app.fetching {
            "Loading attendance..."
        } else {
            "No attendance data"
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(message, styles::muted_style())))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let list = List::new(items).block(block);
    let mut state = ListState::default();
    state.select(Some(app.attendance_selection));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_course_detail(frame: &mut Frame, app: &App, area: Rect) {
    let (title, lines) = match app.selected_record() {
        Some(record) => (
            format!(" {} ", record.code.as_deref().unwrap_or("Course")),
            detail_lines(record, app.selected_full_record()),
        ),
        None => (
            " No Course Selected ".to_string(),
            vec![Line::from(Span::styled(
                "Select a course from the list",
                styles::muted_style(),
            ))],
        ),
    };

    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn detail_lines<'a>(record: &'a AttendanceRecord, full: Option<&'a AttendanceRecord>) -> Vec<Line<'a>> {
    let count = |v: Option<f64>| v.map(|n| format!("{}", n as i64)).unwrap_or_else(|| "--".to_string());
    let percentage = record.percentage();

    let mut lines = vec![
        Line::from(Span::styled(
            record.title.clone().unwrap_or_default(),
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Attended:   ", styles::muted_style()),
            Span::raw(format!("{} / {}", count(record.attended), count(record.delivered))),
        ]),
        Line::from(vec![
            Span::styled("Percentage: ", styles::muted_style()),
            Span::styled(
                format_percentage(percentage),
                styles::percentage_style(percentage, ELIGIBILITY_THRESHOLD),
            ),
        ]),
    ];

    if let Some(margin) = record.margin(ELIGIBILITY_THRESHOLD) {
        let text = if margin >= 0 {
            format!("Can miss {} more lecture(s)", margin)
        } else {
            format!("Attend {} more lecture(s) to reach 75%", -margin)
        };
        let style = if margin >= 0 {
            styles::success_style()
        } else {
            styles::error_style()
        };
        lines.push(Line::from(Span::styled(text, style)));
    }

    lines.push(Line::from(""));

    match full {
        Some(full) if !full.full_report.is_empty() => {
            lines.push(Line::from(Span::styled(
                format!("Full Report ({})", full.full_report.len()),
                styles::title_style(),
            )));
            for entry in &full.full_report {
                let status = entry.status();
                let style = styles::attendance_status_style(&status);
                lines.push(Line::from(vec![
                    Span::raw(format!(
                        "  {:<14} {:<12} ",
                        entry.date.as_deref().unwrap_or("-"),
                        entry.time.as_deref().unwrap_or("")
                    )),
                    Span::styled(status.to_string(), style),
                ]));
            }
        }
        _ => lines.push(Line::from(Span::styled(
            "No full report available",
            styles::muted_style(),
        ))),
    }

    lines
}
