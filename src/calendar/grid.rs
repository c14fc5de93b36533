//! Projection of a month and its events onto a fixed 6×7 day grid.
//!
//! The grid always starts on the Sunday on or before the 1st and always has
//! 42 cells. Events are bucketed by the calendar date of their start only, in
//! the order they were given.

use chrono::{Datelike, Local, NaiveDate};
use thiserror::Error;

use super::event::Event;
use super::month::CalendarMonth;

pub const GRID_DAYS: usize = 42;
pub const DAYS_PER_WEEK: usize = 7;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GridError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub day_of_month: u32,
    pub belongs_to_displayed_month: bool,
    pub is_today: bool,
    pub events: Vec<Event>,
}

impl DayCell {
    fn new(date: NaiveDate, month: &CalendarMonth, today: NaiveDate) -> Self {
        Self {
            date,
            day_of_month: date.day(),
            belongs_to_displayed_month: month.contains(date),
            is_today: date == today,
            events: Vec::new(),
        }
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthGrid {
    pub month: CalendarMonth,
    cells: Vec<DayCell>,
    leading_count: usize,
}

impl MonthGrid {
    pub fn cells(&self) -> &[DayCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Index of the cell holding day 1 of the displayed month.
    pub fn leading_count(&self) -> usize {
        self.leading_count
    }

    pub fn weeks(&self) -> std::slice::Chunks<'_, DayCell> {
        self.cells.chunks(DAYS_PER_WEEK)
    }

    pub fn cell(&self, date: NaiveDate) -> Option<&DayCell> {
        let first = self.cells.first()?.date;
        let offset = usize::try_from((date - first).num_days()).ok()?;
        self.cells.get(offset)
    }

    pub fn events_on(&self, date: NaiveDate) -> &[Event] {
        self.cell(date).map(|c| c.events.as_slice()).unwrap_or(&[])
    }
}

impl std::ops::Index<usize> for MonthGrid {
    type Output = DayCell;

    fn index(&self, index: usize) -> &Self::Output {
        &self.cells[index]
    }
}

/// Projects `events` onto the grid of `month`, marking the local current date.
pub fn project(month: CalendarMonth, events: &[Event]) -> Result<MonthGrid, GridError> {
    project_on(month, events, Local::now().date_naive())
}

/// Same as [`project`] with an explicit "today".
pub fn project_on(
    month: CalendarMonth,
    events: &[Event],
    today: NaiveDate,
) -> Result<MonthGrid, GridError> {
    let first_of_month = month.first_day()?;
    let leading_count = first_of_month.weekday().num_days_from_sunday() as usize;
    let days_in_month = month.days_in_month()? as usize;

    let grid_start = first_of_month
        .checked_sub_days(chrono::Days::new(leading_count as u64))
        .ok_or_else(|| out_of_range(&month))?;

    let mut cells = Vec::with_capacity(GRID_DAYS);
    let mut current = grid_start;
    for i in 0..GRID_DAYS {
        cells.push(DayCell::new(current, &month, today));
        if i + 1 < GRID_DAYS {
            current = current.succ_opt().ok_or_else(|| out_of_range(&month))?;
        }
    }

    for event in events {
        let offset = (event.start_date() - first_of_month).num_days();
        if offset < 0 || offset >= days_in_month as i64 {
            continue;
        }
        cells[leading_count + offset as usize].events.push(event.clone());
    }

    Ok(MonthGrid {
        month,
        cells,
        leading_count,
    })
}

fn out_of_range(month: &CalendarMonth) -> GridError {
    GridError::InvalidArgument(format!("grid for {} leaves the supported date range", month))
}
