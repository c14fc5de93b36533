pub mod app;
pub mod calendar;
pub mod storage;
pub mod sync;
pub mod ui;

pub use app::{AppState, FetchOutcome, FetchTicket, SyncStatus};
pub use calendar::{project, CalendarMonth, Event, GridError, MonthGrid};
