pub mod event;
pub mod calendar_type;
pub mod share;
pub mod user;
pub mod month;
pub mod grid;

pub use event::{DraftError, Event, EventDraft, Recurrence};
pub use calendar_type::{Access, Calendar, CalendarDraft, DEFAULT_COLOR, PALETTE};
pub use share::{Permission, Share, ShareRequest};
pub use user::User;
pub use month::CalendarMonth;
pub use grid::{project, project_on, DayCell, GridError, MonthGrid};
