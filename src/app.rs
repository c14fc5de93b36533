use chrono::{Local, NaiveDate};

use crate::calendar::{project_on, Calendar, CalendarMonth, Event, GridError, MonthGrid};

#[derive(Debug, Clone, PartialEq)]
pub enum SyncStatus {
    Idle,
    Syncing,
    Synced,
    Offline,
    Error(String),
}

/// Identifies one month fetch so that superseded results can be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub calendar_id: String,
    pub month: CalendarMonth,
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Discarded,
}

pub struct AppState {
    pub calendars: Vec<Calendar>,
    pub active_calendar: Option<String>,
    pub month: CalendarMonth,
    pub selected_date: NaiveDate,
    pub events: Vec<Event>,
    pub sync_status: SyncStatus,
    pub can_edit: bool,
    next_sequence: u64,
    last_applied: Option<u64>,
}

impl AppState {
    pub fn new() -> Self {
        Self::starting_on(Local::now().date_naive())
    }

    pub fn starting_on(today: NaiveDate) -> Self {
        Self {
            calendars: Vec::new(),
            active_calendar: None,
            month: CalendarMonth::containing(today),
            selected_date: today,
            events: Vec::new(),
            sync_status: SyncStatus::Idle,
            can_edit: false,
            next_sequence: 0,
            last_applied: None,
        }
    }

    pub fn set_calendars(&mut self, calendars: Vec<Calendar>) {
        let active_still_listed = self
            .active_calendar
            .as_ref()
            .is_some_and(|id| calendars.iter().any(|c| &c.id == id));
        self.calendars = calendars;

        if active_still_listed {
            self.can_edit = self.active_calendar().is_some_and(|c| c.can_edit());
        } else {
            let first = self.calendars.first().map(|c| c.id.clone());
            match first {
                Some(id) => self.select_calendar(&id),
                None => {
                    self.active_calendar = None;
                    self.clear_events();
                }
            }
        }
    }

    pub fn active_calendar(&self) -> Option<&Calendar> {
        let id = self.active_calendar.as_ref()?;
        self.calendars.iter().find(|c| &c.id == id)
    }

    pub fn select_calendar(&mut self, calendar_id: &str) {
        if self.active_calendar.as_deref() == Some(calendar_id) {
            return;
        }
        self.active_calendar = Some(calendar_id.to_string());
        self.can_edit = self.active_calendar().is_some_and(|c| c.can_edit());
        self.clear_events();
    }

    pub fn next_month(&mut self) {
        self.show_month(self.month.next());
    }

    pub fn previous_month(&mut self) {
        self.show_month(self.month.previous());
    }

    pub fn go_to_today(&mut self) {
        let today = Local::now().date_naive();
        self.show_month(CalendarMonth::containing(today));
        self.selected_date = today;
    }

    pub fn show_month(&mut self, month: CalendarMonth) {
        if month == self.month {
            return;
        }
        self.month = month;
        if !month.contains(self.selected_date)
            && let Ok(first) = month.first_day()
        {
            self.selected_date = first;
        }
        self.clear_events();
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected_date = date;
        let month = CalendarMonth::containing(date);
        if month != self.month {
            self.month = month;
            self.clear_events();
        }
    }

    fn clear_events(&mut self) {
        self.events.clear();
        self.last_applied = None;
    }

    /// Starts a fetch for the active calendar and month.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        let calendar_id = self.active_calendar.clone()?;
        self.next_sequence += 1;
        self.sync_status = SyncStatus::Syncing;
        Some(FetchTicket {
            calendar_id,
            month: self.month,
            sequence: self.next_sequence,
        })
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.active_calendar.as_deref() == Some(ticket.calendar_id.as_str())
            && ticket.month == self.month
            && self.last_applied.is_none_or(|last| ticket.sequence > last)
    }

    pub fn complete_fetch(&mut self, ticket: &FetchTicket, events: Vec<Event>) -> FetchOutcome {
        if !self.is_current(ticket) {
            tracing::debug!(
                "Discarding stale fetch #{} for {} ({})",
                ticket.sequence,
                ticket.calendar_id,
                ticket.month
            );
            return FetchOutcome::Discarded;
        }
        self.events = events;
        self.last_applied = Some(ticket.sequence);
        self.sync_status = SyncStatus::Synced;
        FetchOutcome::Applied
    }

    /// Like [`complete_fetch`](Self::complete_fetch) but for a cached copy served while offline.
    pub fn complete_offline(&mut self, ticket: &FetchTicket, events: Vec<Event>) -> FetchOutcome {
        let outcome = self.complete_fetch(ticket, events);
        if outcome == FetchOutcome::Applied {
            self.sync_status = SyncStatus::Offline;
        }
        outcome
    }

    pub fn fail_fetch(&mut self, ticket: &FetchTicket, message: String) {
        if self.is_current(ticket) {
            self.sync_status = SyncStatus::Error(message);
        }
    }

    pub fn grid(&self) -> Result<MonthGrid, GridError> {
        project_on(self.month, &self.events, Local::now().date_naive())
    }

    pub fn grid_on(&self, today: NaiveDate) -> Result<MonthGrid, GridError> {
        project_on(self.month, &self.events, today)
    }

    pub fn events_for_date(&self, date: NaiveDate) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|event| event.start_date() == date)
            .collect()
    }

    pub fn events_for_selected_date(&self) -> Vec<&Event> {
        self.events_for_date(self.selected_date)
    }

    /// Applies a created or updated event to the cache.
    pub fn upsert_event(&mut self, event: Event) {
        let visible = self.active_calendar.as_deref() == Some(event.calendar_id.as_str())
            && self.month.contains(event.start_date());

        match self.events.iter().position(|e| e.id == event.id) {
            Some(index) if visible => self.events[index] = event,
            Some(index) => {
                self.events.remove(index);
            }
            None if visible => self.events.push(event),
            None => {}
        }
    }

    pub fn remove_event(&mut self, event_id: &str) {
        self.events.retain(|e| e.id != event_id);
    }

    pub fn remove_calendar(&mut self, calendar_id: &str) {
        let remaining: Vec<Calendar> = self
            .calendars
            .iter()
            .filter(|c| c.id != calendar_id)
            .cloned()
            .collect();
        self.set_calendars(remaining);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{Access, Permission};
    use chrono::NaiveDateTime;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn at(d: NaiveDate, hour: u32) -> NaiveDateTime {
        d.and_hms_opt(hour, 0, 0).unwrap()
    }

    fn calendar(id: &str, access: Access) -> Calendar {
        Calendar {
            id: id.to_string(),
            name: format!("Calendar {}", id),
            description: None,
            color: "#3788d8".to_string(),
            owner_id: "1".to_string(),
            owner_name: None,
            access,
        }
    }

    fn create_event_at(id: &str, calendar_id: &str, d: NaiveDate, hour: u32) -> Event {
        Event {
            id: id.to_string(),
            calendar_id: calendar_id.to_string(),
            title: format!("Event {}", id),
            description: None,
            location: None,
            start_at: at(d, hour),
            end_at: at(d, hour + 1),
            all_day: false,
            color: None,
            recurrence: None,
        }
    }

    fn november_state() -> AppState {
        let mut state = AppState::starting_on(date(2025, 11, 15));
        state.set_calendars(vec![
            calendar("1", Access::Owner),
            calendar("2", Access::Shared(Permission::View)),
        ]);
        state
    }

    #[test]
    fn new_state_shows_month_of_start_date() {
        let state = AppState::starting_on(date(2025, 11, 15));

        assert_eq!(state.month, CalendarMonth { year: 2025, month: 10 });
        assert_eq!(state.sync_status, SyncStatus::Idle);
        assert!(state.events.is_empty());
    }

    #[test]
    fn set_calendars_selects_first() {
        let state = november_state();

        assert_eq!(state.active_calendar.as_deref(), Some("1"));
        assert!(state.can_edit);
    }

    #[test]
    fn selecting_view_only_calendar_disables_editing() {
        let mut state = november_state();

        state.select_calendar("2");

        assert!(!state.can_edit);
    }

    #[test]
    fn fetch_for_active_month_is_applied() {
        let mut state = november_state();
        let ticket = state.begin_fetch().unwrap();

        let outcome = state.complete_fetch(&ticket, vec![create_event_at("a", "1", date(2025, 11, 21), 10)]);

        assert_eq!(outcome, FetchOutcome::Applied);
        assert_eq!(state.events.len(), 1);
        assert_eq!(state.sync_status, SyncStatus::Synced);
    }

    #[test]
    fn fetch_superseded_by_navigation_is_discarded() {
        let mut state = november_state();
        let ticket = state.begin_fetch().unwrap();

        state.next_month();
        let outcome = state.complete_fetch(&ticket, vec![create_event_at("a", "1", date(2025, 11, 21), 10)]);

        assert_eq!(outcome, FetchOutcome::Discarded);
        assert!(state.events.is_empty());
    }

    #[test]
    fn fetch_superseded_by_calendar_switch_is_discarded() {
        let mut state = november_state();
        let ticket = state.begin_fetch().unwrap();

        state.select_calendar("2");

        assert_eq!(state.complete_fetch(&ticket, Vec::new()), FetchOutcome::Discarded);
    }

    #[test]
    fn older_fetch_resolving_late_is_discarded() {
        let mut state = november_state();
        let older = state.begin_fetch().unwrap();
        let newer = state.begin_fetch().unwrap();

        let fresh = vec![create_event_at("new", "1", date(2025, 11, 21), 10)];
        let stale = vec![create_event_at("old", "1", date(2025, 11, 21), 10)];

        assert_eq!(state.complete_fetch(&newer, fresh), FetchOutcome::Applied);
        assert_eq!(state.complete_fetch(&older, stale), FetchOutcome::Discarded);
        assert_eq!(state.events[0].id, "new");
    }

    #[test]
    fn failed_stale_fetch_does_not_touch_status() {
        let mut state = november_state();
        let ticket = state.begin_fetch().unwrap();
        state.previous_month();
        state.sync_status = SyncStatus::Synced;

        state.fail_fetch(&ticket, "timeout".to_string());

        assert_eq!(state.sync_status, SyncStatus::Synced);
    }

    #[test]
    fn december_next_month_rolls_over_year() {
        let mut state = AppState::starting_on(date(2025, 12, 10));

        state.next_month();

        assert_eq!(state.month, CalendarMonth { year: 2026, month: 0 });
        assert_eq!(state.selected_date, date(2026, 1, 1));
    }

    #[test]
    fn go_to_today_returns_to_current_month() {
        let mut state = AppState::starting_on(date(2001, 3, 3));

        state.go_to_today();

        assert_eq!(state.month, CalendarMonth::current());
    }

    #[test]
    fn grid_reflects_cached_events() {
        let mut state = november_state();
        let ticket = state.begin_fetch().unwrap();
        state.complete_fetch(
            &ticket,
            vec![
                create_event_at("a", "1", date(2025, 11, 21), 10),
                create_event_at("b", "1", date(2025, 11, 25), 14),
            ],
        );

        let grid = state.grid_on(date(2025, 11, 15)).unwrap();

        assert_eq!(grid.events_on(date(2025, 11, 21))[0].id, "a");
        assert_eq!(grid.events_on(date(2025, 11, 25))[0].id, "b");
    }

    #[test]
    fn upsert_appends_new_and_replaces_existing() {
        let mut state = november_state();
        state.upsert_event(create_event_at("a", "1", date(2025, 11, 21), 10));
        state.upsert_event(create_event_at("b", "1", date(2025, 11, 21), 8));

        let mut moved = create_event_at("a", "1", date(2025, 11, 22), 10);
        moved.title = "Moved".to_string();
        state.upsert_event(moved);

        let ids: Vec<_> = state.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(state.events[0].title, "Moved");
    }

    #[test]
    fn upsert_drops_event_moved_out_of_view() {
        let mut state = november_state();
        state.upsert_event(create_event_at("a", "1", date(2025, 11, 21), 10));

        state.upsert_event(create_event_at("a", "1", date(2025, 12, 2), 10));

        assert!(state.events.is_empty());
    }

    #[test]
    fn remove_event_from_cache() {
        let mut state = november_state();
        state.upsert_event(create_event_at("a", "1", date(2025, 11, 21), 10));

        state.remove_event("a");

        assert!(state.events.is_empty());
    }

    #[test]
    fn removing_active_calendar_selects_next() {
        let mut state = november_state();

        state.remove_calendar("1");

        assert_eq!(state.active_calendar.as_deref(), Some("2"));
        assert_eq!(state.calendars.len(), 1);
    }

    #[test]
    fn events_for_selected_date_filters_by_start() {
        let mut state = november_state();
        state.upsert_event(create_event_at("a", "1", date(2025, 11, 15), 9));
        state.upsert_event(create_event_at("b", "1", date(2025, 11, 16), 9));

        let events = state.events_for_selected_date();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "a");
    }
}
