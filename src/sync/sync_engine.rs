use thiserror::Error;

use crate::app::{AppState, FetchOutcome, FetchTicket, SyncStatus};
use crate::calendar::{Calendar, CalendarDraft, Event, EventDraft, GridError};
use crate::storage::cache::{Cache, CacheError};
use crate::sync::api::{ApiError, CollendarApi, DateRange};
use crate::sync::session::Session;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("API error: {0}")]
    ApiError(#[from] ApiError),
    #[error("Cache error: {0}")]
    CacheError(#[from] CacheError),
    #[error("Invalid month: {0}")]
    InvalidMonth(#[from] GridError),
    #[error("No calendar selected")]
    NoActiveCalendar,
}

/// Events loaded for one [`FetchTicket`].
#[derive(Debug, Clone, PartialEq)]
pub enum MonthFetch {
    Live(Vec<Event>),
    Cached(Vec<Event>),
}

/// Commits a finished fetch, discarding it if the ticket is no longer current.
pub fn apply_month(
    state: &mut AppState,
    ticket: &FetchTicket,
    fetched: Result<MonthFetch, SyncError>,
) -> Result<FetchOutcome, SyncError> {
    match fetched {
        Ok(MonthFetch::Live(events)) => Ok(state.complete_fetch(ticket, events)),
        Ok(MonthFetch::Cached(events)) => Ok(state.complete_offline(ticket, events)),
        Err(e) => {
            state.fail_fetch(ticket, e.to_string());
            Err(e)
        }
    }
}

/// Moves data between the service and [`AppState`] for one signed-in session.
pub struct SyncEngine<A: CollendarApi> {
    api: A,
    session: Session,
    cache: Option<Cache>,
}

impl<A: CollendarApi> SyncEngine<A> {
    pub fn new(api: A, session: Session) -> Self {
        Self {
            api,
            session,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn refresh_calendars(&self, state: &mut AppState) -> Result<(), SyncError> {
        let calendars = match self.api.list_calendars(&self.session).await {
            Ok(calendars) => {
                if let Some(cache) = &self.cache {
                    cache.store_calendars(&calendars)?;
                }
                calendars
            }
            Err(e) if e.is_transport() => {
                let Some(cache) = &self.cache else { return Err(e.into()) };
                tracing::warn!("Server unreachable, using cached calendars: {}", e);
                state.sync_status = SyncStatus::Offline;
                cache.load_calendars()?
            }
            Err(e) => return Err(e.into()),
        };

        state.set_calendars(calendars);
        Ok(())
    }

    /// Fetches the active month and commits it unless navigation moved on meanwhile.
    pub async fn refresh_month(&self, state: &mut AppState) -> Result<FetchOutcome, SyncError> {
        let ticket = state.begin_fetch().ok_or(SyncError::NoActiveCalendar)?;
        let fetched = self.fetch_month(&ticket).await;
        apply_month(state, &ticket, fetched)
    }

    /// Loads the events a ticket asks for without touching [`AppState`].
    ///
    /// Live results are written through to the cache. When the server cannot be
    /// reached the cached copy is returned instead.
    pub async fn fetch_month(&self, ticket: &FetchTicket) -> Result<MonthFetch, SyncError> {
        let (start, end) = ticket.month.date_range()?;

        let fetched = self
            .api
            .fetch_events(&self.session, &ticket.calendar_id, DateRange::new(start, end))
            .await;

        match fetched {
            Ok(events) => {
                if let Some(cache) = &self.cache {
                    cache.store_month(&ticket.calendar_id, ticket.month, &events)?;
                }
                Ok(MonthFetch::Live(events))
            }
            Err(e) if e.is_transport() => match &self.cache {
                Some(cache) => {
                    tracing::warn!("Server unreachable, using cached events: {}", e);
                    Ok(MonthFetch::Cached(cache.load_month(&ticket.calendar_id, ticket.month)?))
                }
                None => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    pub async fn refresh_permission(&self, state: &mut AppState) {
        let Some(calendar_id) = state.active_calendar.clone() else {
            state.can_edit = false;
            return;
        };
        state.can_edit = match self.api.can_edit(&self.session, &calendar_id).await {
            Ok(allowed) => allowed,
            Err(e) => {
                tracing::warn!("Could not check edit permission on {}: {}", calendar_id, e);
                false
            }
        };
    }

    pub async fn create_calendar(
        &self,
        state: &mut AppState,
        draft: &CalendarDraft,
    ) -> Result<Calendar, SyncError> {
        let calendar = self.api.create_calendar(&self.session, draft).await?;
        let mut calendars = state.calendars.clone();
        calendars.push(calendar.clone());
        state.set_calendars(calendars);
        Ok(calendar)
    }

    pub async fn delete_calendar(&self, state: &mut AppState, calendar_id: &str) -> Result<(), SyncError> {
        self.api.delete_calendar(&self.session, calendar_id).await?;
        if let Some(cache) = &self.cache {
            cache.delete_calendar(calendar_id)?;
        }
        state.remove_calendar(calendar_id);
        Ok(())
    }

    pub async fn create_event(&self, state: &mut AppState, draft: &EventDraft) -> Result<Event, SyncError> {
        let event = self.api.create_event(&self.session, draft).await?;
        state.upsert_event(event.clone());
        Ok(event)
    }

    pub async fn update_event(
        &self,
        state: &mut AppState,
        event_id: &str,
        draft: &EventDraft,
    ) -> Result<Event, SyncError> {
        let event = self.api.update_event(&self.session, event_id, draft).await?;
        state.upsert_event(event.clone());
        Ok(event)
    }

    pub async fn delete_event(&self, state: &mut AppState, event_id: &str) -> Result<(), SyncError> {
        self.api.delete_event(&self.session, event_id).await?;
        if let Some(cache) = &self.cache {
            cache.delete_event(event_id)?;
        }
        state.remove_event(event_id);
        Ok(())
    }
}
