use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::calendar::{
    Calendar, CalendarDraft, DraftError, Event, EventDraft, Permission, Share, ShareRequest, User,
};
use crate::sync::session::Session;
use crate::sync::wire::{
    self, CalendarDto, CalendarRequest, EventDto, EventRequest, LoginRequest, LoginResponse,
    RegisterRequest, ShareCreateRequest, ShareDto, UserDto,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Request failed with status {status}: {body}")]
    RequestError { status: u16, body: String },
    #[error("Rejected by server: {0}")]
    Rejected(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Authentication failed")]
    AuthenticationFailed,
    #[error("Unexpected response: {0}")]
    Decode(String),
    #[error("Invalid input: {0}")]
    InvalidDraft(#[from] DraftError),
}

impl ApiError {
    /// True when the server could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::HttpError(e) if e.is_connect() || e.is_timeout() || e.is_request())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Inclusive bounds as sent to the period endpoint.
    pub fn query_bounds(&self) -> Option<(String, String)> {
        let start = self.start.and_hms_opt(0, 0, 0)?;
        let end = self.end.and_hms_opt(23, 59, 59)?;
        Some((wire::local_datetime::format(&start), wire::local_datetime::format(&end)))
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CollendarApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError>;

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, ApiError>;

    async fn list_calendars(&self, session: &Session) -> Result<Vec<Calendar>, ApiError>;

    async fn create_calendar(
        &self,
        session: &Session,
        draft: &CalendarDraft,
    ) -> Result<Calendar, ApiError>;

    async fn update_calendar(
        &self,
        session: &Session,
        calendar_id: &str,
        draft: &CalendarDraft,
    ) -> Result<Calendar, ApiError>;

    async fn delete_calendar(&self, session: &Session, calendar_id: &str) -> Result<(), ApiError>;

    async fn can_edit(&self, session: &Session, calendar_id: &str) -> Result<bool, ApiError>;

    async fn list_events(&self, session: &Session, calendar_id: &str) -> Result<Vec<Event>, ApiError>;

    async fn fetch_events(
        &self,
        session: &Session,
        calendar_id: &str,
        date_range: DateRange,
    ) -> Result<Vec<Event>, ApiError>;

    async fn get_event(&self, session: &Session, event_id: &str) -> Result<Event, ApiError>;

    async fn create_event(&self, session: &Session, draft: &EventDraft) -> Result<Event, ApiError>;

    async fn update_event(
        &self,
        session: &Session,
        event_id: &str,
        draft: &EventDraft,
    ) -> Result<Event, ApiError>;

    async fn delete_event(&self, session: &Session, event_id: &str) -> Result<(), ApiError>;

    async fn list_shares(&self, session: &Session, calendar_id: &str) -> Result<Vec<Share>, ApiError>;

    async fn share_calendar(
        &self,
        session: &Session,
        request: &ShareRequest,
    ) -> Result<Share, ApiError>;

    async fn update_share_permission(
        &self,
        session: &Session,
        share_id: &str,
        permission: Permission,
    ) -> Result<Share, ApiError>;

    async fn remove_share(&self, session: &Session, share_id: &str) -> Result<(), ApiError>;

    async fn search_users(&self, session: &Session, query: &str) -> Result<Vec<User>, ApiError>;
}

pub struct CollendarClient {
    base_url: String,
    client: reqwest::Client,
}

impl CollendarClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        tracing::info!("{} response status: {}", what, status);

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status.as_u16() {
            401 | 403 => {
                tracing::error!("Authentication failed: {}", what);
                Err(ApiError::AuthenticationFailed)
            }
            404 => {
                tracing::error!("Not found: {}", what);
                Err(ApiError::NotFound(what.to_string()))
            }
            400 | 409 | 422 => {
                let message = wire::server_message(&body);
                tracing::warn!("{} rejected: {}", what, message);
                Err(ApiError::Rejected(if message.is_empty() {
                    format!("{} was rejected", what)
                } else {
                    message
                }))
            }
            code => {
                tracing::error!("{} failed. Status: {}, Body: {}", what, status, body);
                Err(ApiError::RequestError { status: code, body })
            }
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> Result<T, ApiError> {
        let body = response.text().await?;
        tracing::debug!("{} response body: {}", what, body);
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to decode {} response: {}", what, e);
            ApiError::Decode(format!("{}: {}", what, e))
        })
    }
}

fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

#[async_trait]
impl CollendarApi for CollendarClient {
    async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        tracing::info!("Logging in as {}", email);

        let response = self.client
            .post(self.url("/auth/login"))
            .json(&LoginRequest { email, senha: password })
            .send()
            .await?;
        let response = Self::check(response, "login").await?;
        let login: LoginResponse = Self::decode(response, "login").await?;

        let user = login.user();
        Ok(Session::new(login.token, user).with_roles(login.roles))
    }

    async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, ApiError> {
        tracing::info!("Registering {}", email);

        let response = self.client
            .post(self.url("/usuarios"))
            .json(&RegisterRequest { nome: name, email, senha: password })
            .send()
            .await?;
        let response = Self::check(response, "register").await?;
        let user: UserDto = Self::decode(response, "register").await?;

        Ok(user.into())
    }

    async fn list_calendars(&self, session: &Session) -> Result<Vec<Calendar>, ApiError> {
        let response = self.client
            .get(self.url("/calendarios/acessiveis"))
            .bearer_auth(&session.token)
            .send()
            .await?;
        let response = Self::check(response, "list calendars").await?;
        let calendars: Vec<CalendarDto> = Self::decode(response, "list calendars").await?;

        let calendars = calendars
            .into_iter()
            .map(|dto| dto.into_calendar(session.user_id()))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!("Fetched {} calendars", calendars.len());
        Ok(calendars)
    }

    async fn create_calendar(
        &self,
        session: &Session,
        draft: &CalendarDraft,
    ) -> Result<Calendar, ApiError> {
        draft.validate()?;
        tracing::info!("Creating calendar: {}", draft.name);

        let response = self.client
            .post(self.url("/calendarios"))
            .bearer_auth(&session.token)
            .json(&CalendarRequest::from(draft))
            .send()
            .await?;
        let response = Self::check(response, "create calendar").await?;
        let created: CalendarDto = Self::decode(response, "create calendar").await?;

        created.into_calendar(session.user_id())
    }

    async fn update_calendar(
        &self,
        session: &Session,
        calendar_id: &str,
        draft: &CalendarDraft,
    ) -> Result<Calendar, ApiError> {
        draft.validate()?;
        tracing::info!("Updating calendar {}: {}", calendar_id, draft.name);

        let response = self.client
            .put(self.url(&format!("/calendarios/{}", segment(calendar_id))))
            .bearer_auth(&session.token)
            .json(&CalendarRequest::from(draft))
            .send()
            .await?;
        let response = Self::check(response, &format!("calendar {}", calendar_id)).await?;
        let updated: CalendarDto = Self::decode(response, "update calendar").await?;

        updated.into_calendar(session.user_id())
    }

    async fn delete_calendar(&self, session: &Session, calendar_id: &str) -> Result<(), ApiError> {
        tracing::info!("Deleting calendar {}", calendar_id);

        let response = self.client
            .delete(self.url(&format!("/calendarios/{}", segment(calendar_id))))
            .bearer_auth(&session.token)
            .send()
            .await?;
        Self::check(response, &format!("calendar {}", calendar_id)).await?;
        Ok(())
    }

    async fn can_edit(&self, session: &Session, calendar_id: &str) -> Result<bool, ApiError> {
        let response = self.client
            .get(self.url(&format!("/calendarios/{}/posso-editar", segment(calendar_id))))
            .bearer_auth(&session.token)
            .send()
            .await?;
        let response = Self::check(response, &format!("calendar {}", calendar_id)).await?;
        Self::decode(response, "edit permission").await
    }

    async fn list_events(&self, session: &Session, calendar_id: &str) -> Result<Vec<Event>, ApiError> {
        let response = self.client
            .get(self.url(&format!("/eventos/calendario/{}", segment(calendar_id))))
            .bearer_auth(&session.token)
            .send()
            .await?;
        let response = Self::check(response, &format!("calendar {}", calendar_id)).await?;
        let events: Vec<EventDto> = Self::decode(response, "list events").await?;

        Ok(events.into_iter().map(|dto| dto.into_event(calendar_id)).collect())
    }

    async fn fetch_events(
        &self,
        session: &Session,
        calendar_id: &str,
        date_range: DateRange,
    ) -> Result<Vec<Event>, ApiError> {
        let (start, end) = date_range
            .query_bounds()
            .ok_or_else(|| ApiError::Decode("invalid date range".to_string()))?;

        tracing::info!("Fetching events from {} to {}", date_range.start, date_range.end);

        let response = self.client
            .get(self.url(&format!("/eventos/calendario/{}/periodo", segment(calendar_id))))
            .bearer_auth(&session.token)
            .query(&[("dataInicio", start.as_str()), ("dataFim", end.as_str())])
            .send()
            .await?;
        let response = Self::check(response, &format!("calendar {}", calendar_id)).await?;
        let events: Vec<EventDto> = Self::decode(response, "fetch events").await?;

        let events: Vec<Event> = events.into_iter().map(|dto| dto.into_event(calendar_id)).collect();
        tracing::info!("Fetched {} events successfully", events.len());
        Ok(events)
    }

    async fn get_event(&self, session: &Session, event_id: &str) -> Result<Event, ApiError> {
        let response = self.client
            .get(self.url(&format!("/eventos/{}", segment(event_id))))
            .bearer_auth(&session.token)
            .send()
            .await?;
        let response = Self::check(response, &format!("event {}", event_id)).await?;
        let event: EventDto = Self::decode(response, "get event").await?;

        Ok(event.into_event(""))
    }

    async fn create_event(&self, session: &Session, draft: &EventDraft) -> Result<Event, ApiError> {
        draft.validate()?;
        tracing::info!("Creating event: {} on {}", draft.title, draft.start_at);

        let body = EventRequest::from(draft);
        tracing::debug!("POST /eventos with payload: {:?}", body);

        let response = self.client
            .post(self.url("/eventos"))
            .bearer_auth(&session.token)
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response, "create event").await?;
        let created: EventDto = Self::decode(response, "create event").await?;

        let event = created.into_event(&draft.calendar_id);
        tracing::info!("Event created successfully with ID: {}", event.id);
        Ok(event)
    }

    async fn update_event(
        &self,
        session: &Session,
        event_id: &str,
        draft: &EventDraft,
    ) -> Result<Event, ApiError> {
        draft.validate()?;
        tracing::info!("Updating event {}: {}", event_id, draft.title);

        let body = EventRequest::from(draft);
        tracing::debug!("PUT /eventos/{} with payload: {:?}", event_id, body);

        let response = self.client
            .put(self.url(&format!("/eventos/{}", segment(event_id))))
            .bearer_auth(&session.token)
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response, &format!("event {}", event_id)).await?;
        let updated: EventDto = Self::decode(response, "update event").await?;

        tracing::info!("Event {} updated successfully", event_id);
        Ok(updated.into_event(&draft.calendar_id))
    }

    async fn delete_event(&self, session: &Session, event_id: &str) -> Result<(), ApiError> {
        tracing::info!("Deleting event {}", event_id);

        let response = self.client
            .delete(self.url(&format!("/eventos/{}", segment(event_id))))
            .bearer_auth(&session.token)
            .send()
            .await?;
        Self::check(response, &format!("event {}", event_id)).await?;
        Ok(())
    }

    async fn list_shares(&self, session: &Session, calendar_id: &str) -> Result<Vec<Share>, ApiError> {
        let response = self.client
            .get(self.url(&format!("/compartilhamentos/calendario/{}", segment(calendar_id))))
            .bearer_auth(&session.token)
            .send()
            .await?;
        let response = Self::check(response, &format!("calendar {}", calendar_id)).await?;
        let shares: Vec<ShareDto> = Self::decode(response, "list shares").await?;

        Ok(shares.into_iter().map(|dto| dto.into_share(calendar_id)).collect())
    }

    async fn share_calendar(
        &self,
        session: &Session,
        request: &ShareRequest,
    ) -> Result<Share, ApiError> {
        tracing::info!(
            "Sharing calendar {} with {} ({})",
            request.calendar_id,
            request.recipient_email,
            request.permission
        );

        let response = self.client
            .post(self.url("/compartilhamentos"))
            .bearer_auth(&session.token)
            .json(&ShareCreateRequest::from(request))
            .send()
            .await?;
        let response = Self::check(response, "share calendar").await?;
        let share: ShareDto = Self::decode(response, "share calendar").await?;

        Ok(share.into_share(&request.calendar_id))
    }

    async fn update_share_permission(
        &self,
        session: &Session,
        share_id: &str,
        permission: Permission,
    ) -> Result<Share, ApiError> {
        tracing::info!("Changing share {} to {}", share_id, permission);

        let response = self.client
            .patch(self.url(&format!("/compartilhamentos/{}/permissao", segment(share_id))))
            .bearer_auth(&session.token)
            .query(&[("permissao", permission.as_wire())])
            .send()
            .await?;
        let response = Self::check(response, &format!("share {}", share_id)).await?;
        let share: ShareDto = Self::decode(response, "update share").await?;

        Ok(share.into_share(""))
    }

    async fn remove_share(&self, session: &Session, share_id: &str) -> Result<(), ApiError> {
        tracing::info!("Removing share {}", share_id);

        let response = self.client
            .delete(self.url(&format!("/compartilhamentos/{}", segment(share_id))))
            .bearer_auth(&session.token)
            .send()
            .await?;
        Self::check(response, &format!("share {}", share_id)).await?;
        Ok(())
    }

    async fn search_users(&self, session: &Session, query: &str) -> Result<Vec<User>, ApiError> {
        let response = self.client
            .get(self.url("/usuarios"))
            .bearer_auth(&session.token)
            .send()
            .await?;
        let response = Self::check(response, "list users").await?;
        let users: Vec<UserDto> = Self::decode(response, "list users").await?;

        Ok(users
            .into_iter()
            .map(User::from)
            .filter(|user| user.matches_name(query))
            .collect())
    }
}
