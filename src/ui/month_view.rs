use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Write;

use crate::calendar::{DayCell, Event, MonthGrid};

const CELL_WIDTH: usize = 5;
const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

pub fn render_month(grid: &MonthGrid) -> String {
    let width = CELL_WIDTH * WEEKDAYS.len();
    let mut lines = Vec::with_capacity(8);

    lines.push(format!("{:^width$}", grid.month.label(), width = width).trim_end().to_string());
    lines.push(
        WEEKDAYS
            .iter()
            .map(|day| format!("{:^width$}", day, width = CELL_WIDTH))
            .collect::<String>()
            .trim_end()
            .to_string(),
    );

    for week in grid.weeks() {
        let row: String = week.iter().map(render_cell).collect();
        lines.push(row.trim_end().to_string());
    }

    lines.join("\n")
}

fn render_cell(cell: &DayCell) -> String {
    let day = cell.day_of_month;
    let body = if cell.is_today {
        format!("[{:>2}]", day)
    } else if cell.belongs_to_displayed_month {
        format!(" {:>2} ", day)
    } else {
        format!("({:>2})", day)
    };
    let marker = if cell.has_events() { '*' } else { ' ' };
    format!("{}{}", body, marker)
}

pub fn render_day_agenda(date: NaiveDate, events: &[&Event], time_format: &str) -> String {
    let mut lines = Vec::new();
    lines.push(day_heading(date));
    lines.push(String::new());

    if events.is_empty() {
        lines.push("No events scheduled.".to_string());
    } else {
        for event in events {
            lines.push(format!("- {}", agenda_line(event, time_format)));
        }
    }

    lines.join("\n")
}

pub fn day_heading(date: NaiveDate) -> String {
    format!("Agenda for {}", date.format("%A, %B %d, %Y"))
}

pub fn agenda_line(event: &Event, time_format: &str) -> String {
    let time_label = if event.all_day {
        "All day".to_string()
    } else {
        format!(
            "{}-{}",
            format_time(&event.start_at, time_format),
            format_time(&event.end_at, time_format)
        )
    };

    let mut line = format!("{:<13} {}", time_label, event.title);
    if let Some(location) = &event.location
        && !location.is_empty()
    {
        line.push_str(&format!(" @ {}", location));
    }
    line
}

/// Falls back to `HH:MM` when `time_format` holds an unknown specifier.
fn format_time(value: &NaiveDateTime, time_format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", value.format(time_format)).is_err() {
        out.clear();
        let _ = write!(out, "{}", value.format("%H:%M"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{project_on, CalendarMonth};
    use pretty_assertions::assert_eq;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn create_event(id: &str, d: NaiveDate, hour: u32) -> Event {
        Event {
            id: id.to_string(),
            calendar_id: "1".to_string(),
            title: format!("Event {}", id),
            description: None,
            location: None,
            start_at: d.and_hms_opt(hour, 0, 0).unwrap(),
            end_at: d.and_hms_opt(hour + 1, 30, 0).unwrap(),
            all_day: false,
            color: None,
            recurrence: None,
        }
    }

    fn november_grid(events: &[Event]) -> MonthGrid {
        project_on(CalendarMonth { year: 2025, month: 10 }, events, date(2025, 11, 15)).unwrap()
    }

    #[test]
    fn renders_title_header_and_six_weeks() {
        let rendered = render_month(&november_grid(&[]));
        let lines: Vec<_> = rendered.lines().collect();

        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0].trim(), "November 2025");
        assert_eq!(lines[1], " Sun  Mon  Tue  Wed  Thu  Fri  Sat");
    }

    #[test]
    fn first_week_starts_with_adjacent_month_days() {
        let rendered = render_month(&november_grid(&[]));
        let first_week = rendered.lines().nth(2).unwrap();

        assert_eq!(first_week, "(26) (27) (28) (29) (30) (31)   1");
    }

    #[test]
    fn marks_today_and_days_with_events() {
        let rendered = render_month(&november_grid(&[create_event("a", date(2025, 11, 21), 10)]));
        let third_week = rendered.lines().nth(4).unwrap();

        assert_eq!(third_week, "  9   10   11   12   13   14  [15]");
        assert!(rendered.lines().nth(5).unwrap().contains(" 21 *"));
    }

    #[test]
    fn agenda_lists_timed_and_all_day_events() {
        let mut holiday = create_event("h", date(2025, 11, 20), 0);
        holiday.title = "Consciência Negra".to_string();
        holiday.all_day = true;
        let mut meeting = create_event("m", date(2025, 11, 20), 9);
        meeting.location = Some("Sala 2".to_string());

        let agenda = render_day_agenda(date(2025, 11, 20), &[&holiday, &meeting], "%H:%M");

        assert!(agenda.starts_with("Agenda for Thursday, November 20, 2025"));
        assert!(agenda.contains("- All day       Consciência Negra"));
        assert!(agenda.contains("- 09:00-10:30   Event m @ Sala 2"));
    }

    #[test]
    fn empty_agenda_says_so() {
        let agenda = render_day_agenda(date(2025, 11, 20), &[], "%H:%M");

        assert!(agenda.ends_with("No events scheduled."));
    }

    #[test]
    fn unknown_time_specifier_falls_back_to_clock_time() {
        let event = create_event("a", date(2025, 11, 20), 9);

        assert_eq!(agenda_line(&event, "%H:%Q"), "09:00-10:30   Event a");
    }
}
