//! Request and response bodies of the calendar service.
//!
//! Every endpoint decodes into its own DTO. Flags must arrive as JSON
//! booleans and permissions as `VISUALIZAR` / `EDITAR`; anything else is a
//! decode error rather than being coerced.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::calendar::{
    Access, Calendar, CalendarDraft, Event, EventDraft, Permission, Recurrence, Share,
    ShareRequest, User,
};
use crate::sync::api::ApiError;

pub mod local_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn format(value: &NaiveDateTime) -> String {
        value.format(FORMAT).to_string()
    }

    /// Accepts `2025-11-21T10:00`, `2025-11-21T10:00:00` and fractional seconds.
    pub fn parse(value: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
    }

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(|e| D::Error::custom(format!("invalid date-time '{}': {}", raw, e)))
    }

    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, de::Error};

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .map_err(|e| D::Error::custom(format!("invalid date-time '{}': {}", raw, e))),
                None => Ok(None),
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub senha: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginResponse {
    pub token: String,
    #[allow(dead_code)]
    pub tipo: Option<String>,
    pub usuario_id: String,
    pub nome: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl LoginResponse {
    pub fn user(&self) -> User {
        User {
            id: self.usuario_id.clone(),
            name: self.nome.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub nome: &'a str,
    pub email: &'a str,
    pub senha: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserDto {
    pub id: String,
    pub nome: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<UserDto> for User {
    fn from(dto: UserDto) -> Self {
        User {
            id: dto.id,
            name: dto.nome,
            email: dto.email.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CalendarDto {
    pub id: String,
    pub nome: String,
    pub descricao: Option<String>,
    pub cor: String,
    #[serde(alias = "proprietarioId")]
    pub usuario_id: String,
    #[serde(alias = "proprietarioNome")]
    pub usuario_nome: Option<String>,
    #[serde(alias = "ehProprietario")]
    pub proprietario: Option<bool>,
    pub permissao: Option<Permission>,
}

impl CalendarDto {
    /// Resolves how `viewer_id` reaches this calendar.
    pub fn into_calendar(self, viewer_id: &str) -> Result<Calendar, ApiError> {
        let access = match (self.proprietario, self.permissao) {
            (Some(true), _) => Access::Owner,
            (_, Some(permission)) => Access::Shared(permission),
            (None, None) if self.usuario_id == viewer_id => Access::Owner,
            (None, None) => {
                return Err(ApiError::Decode(format!(
                    "calendar {} is neither owned nor carries a permission",
                    self.id
                )));
            }
            (Some(false), None) => {
                return Err(ApiError::Decode(format!(
                    "shared calendar {} has no permission",
                    self.id
                )));
            }
        };

        Ok(Calendar {
            id: self.id,
            name: self.nome,
            description: self.descricao.filter(|d| !d.is_empty()),
            color: self.cor,
            owner_id: self.usuario_id,
            owner_name: self.usuario_nome,
            access,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CalendarRequest<'a> {
    pub nome: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descricao: Option<&'a str>,
    pub cor: &'a str,
}

impl<'a> From<&'a CalendarDraft> for CalendarRequest<'a> {
    fn from(draft: &'a CalendarDraft) -> Self {
        Self {
            nome: draft.name.trim(),
            descricao: draft.description.as_deref(),
            cor: &draft.color,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventDto {
    pub id: String,
    pub titulo: String,
    pub descricao: Option<String>,
    #[serde(with = "local_datetime")]
    pub data_inicio: NaiveDateTime,
    #[serde(with = "local_datetime")]
    pub data_fim: NaiveDateTime,
    pub local: Option<String>,
    pub cor: Option<String>,
    #[serde(default)]
    pub dia_inteiro: bool,
    pub recorrente: Option<bool>,
    pub tipo_recorrencia: Option<Recurrence>,
    pub calendario_id: Option<String>,
    #[allow(dead_code)]
    pub calendario_nome: Option<String>,
}

impl EventDto {
    pub fn into_event(self, fallback_calendar_id: &str) -> Event {
        let recurrence = match self.recorrente {
            Some(false) => None,
            _ => self.tipo_recorrencia,
        };

        Event {
            id: self.id,
            calendar_id: self
                .calendario_id
                .unwrap_or_else(|| fallback_calendar_id.to_string()),
            title: self.titulo,
            description: self.descricao.filter(|d| !d.is_empty()),
            location: self.local.filter(|l| !l.is_empty()),
            start_at: self.data_inicio,
            end_at: self.data_fim,
            all_day: self.dia_inteiro,
            color: self.cor.filter(|c| !c.is_empty()),
            recurrence,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EventRequest<'a> {
    pub titulo: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descricao: Option<&'a str>,
    #[serde(with = "local_datetime")]
    pub data_inicio: NaiveDateTime,
    #[serde(with = "local_datetime")]
    pub data_fim: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cor: Option<&'a str>,
    pub dia_inteiro: bool,
    pub recorrente: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_recorrencia: Option<Recurrence>,
    pub calendario_id: &'a str,
}

impl<'a> From<&'a EventDraft> for EventRequest<'a> {
    fn from(draft: &'a EventDraft) -> Self {
        Self {
            titulo: draft.title.trim(),
            descricao: draft.description.as_deref(),
            data_inicio: draft.start_at,
            data_fim: draft.end_at,
            local: draft.location.as_deref(),
            cor: draft.color.as_deref(),
            dia_inteiro: draft.all_day,
            recorrente: draft.recurrence.is_some(),
            tipo_recorrencia: draft.recurrence,
            calendario_id: &draft.calendar_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ShareDto {
    pub id: String,
    pub calendario_id: Option<String>,
    pub calendario_nome: Option<String>,
    #[serde(alias = "destinatarioId")]
    pub usuario_id: Option<String>,
    #[serde(alias = "destinatarioNome")]
    pub usuario_nome: String,
    #[serde(alias = "destinatarioEmail")]
    pub usuario_email: Option<String>,
    pub permissao: Permission,
    #[serde(default, alias = "dataCompartilhamento", with = "local_datetime::option")]
    pub created_at: Option<NaiveDateTime>,
}

impl ShareDto {
    pub fn into_share(self, fallback_calendar_id: &str) -> Share {
        Share {
            id: self.id,
            calendar_id: self
                .calendario_id
                .unwrap_or_else(|| fallback_calendar_id.to_string()),
            calendar_name: self.calendario_nome,
            user_id: self.usuario_id,
            user_name: self.usuario_nome,
            user_email: self.usuario_email,
            permission: self.permissao,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ShareCreateRequest<'a> {
    pub calendario_id: &'a str,
    pub email_destinatario: &'a str,
    pub permissao: Permission,
}

impl<'a> From<&'a ShareRequest> for ShareCreateRequest<'a> {
    fn from(request: &'a ShareRequest) -> Self {
        Self {
            calendario_id: &request.calendar_id,
            email_destinatario: &request.recipient_email,
            permissao: request.permission,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    erro: Option<String>,
}

/// Human-readable message from an error response body.
pub(crate) fn server_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body)
        && let Some(message) = parsed.message.or(parsed.erro)
    {
        return message;
    }
    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn calendar_json() -> serde_json::Value {
        json!({
            "id": "1",
            "nome": "Trabalho",
            "descricao": "Reuniões e tarefas",
            "cor": "#3788d8",
            "usuarioId": "42",
            "usuarioNome": "João Silva"
        })
    }

    #[test]
    fn parses_minute_and_second_precision() {
        assert_eq!(local_datetime::parse("2025-11-21T10:00").unwrap(), at(21, 10, 0));
        assert_eq!(local_datetime::parse("2025-11-21T10:00:00").unwrap(), at(21, 10, 0));
        assert_eq!(local_datetime::parse("2025-11-21T10:00:00.123").unwrap().date(), at(21, 0, 0).date());
        assert!(local_datetime::parse("21/11/2025").is_err());
    }

    #[test]
    fn calendar_owned_by_flag() {
        let mut value = calendar_json();
        value["proprietario"] = json!(true);
        let dto: CalendarDto = serde_json::from_value(value).unwrap();

        let calendar = dto.into_calendar("someone-else").unwrap();

        assert_eq!(calendar.access, Access::Owner);
        assert_eq!(calendar.owner_name.as_deref(), Some("João Silva"));
    }

    #[test]
    fn calendar_shared_with_permission() {
        let mut value = calendar_json();
        value["proprietario"] = json!(false);
        value["permissao"] = json!("EDITAR");
        let dto: CalendarDto = serde_json::from_value(value).unwrap();

        let calendar = dto.into_calendar("7").unwrap();

        assert_eq!(calendar.access, Access::Shared(Permission::Edit));
    }

    #[test]
    fn calendar_without_flags_is_owned_by_matching_viewer() {
        let dto: CalendarDto = serde_json::from_value(calendar_json()).unwrap();

        assert_eq!(dto.into_calendar("42").unwrap().access, Access::Owner);
    }

    #[test]
    fn calendar_without_flags_for_other_viewer_is_rejected() {
        let dto: CalendarDto = serde_json::from_value(calendar_json()).unwrap();

        assert!(matches!(dto.into_calendar("7"), Err(ApiError::Decode(_))));
    }

    #[test]
    fn calendar_accepts_owner_field_aliases() {
        let dto: CalendarDto = serde_json::from_value(json!({
            "id": "1",
            "nome": "Pessoal",
            "cor": "#10b981",
            "proprietarioId": "42",
            "proprietarioNome": "João Silva"
        }))
        .unwrap();

        let calendar = dto.into_calendar("42").unwrap();

        assert_eq!(calendar.owner_id, "42");
        assert_eq!(calendar.description, None);
    }

    #[test]
    fn string_booleans_are_rejected() {
        for flag in [json!("true"), json!("TRUE"), json!(1)] {
            let mut value = calendar_json();
            value["proprietario"] = flag;

            assert!(serde_json::from_value::<CalendarDto>(value).is_err());
        }
    }

    #[test]
    fn unknown_permission_is_rejected() {
        let mut value = calendar_json();
        value["permissao"] = json!("ADMIN");

        assert!(serde_json::from_value::<CalendarDto>(value).is_err());
    }

    #[test]
    fn event_dto_maps_to_event() {
        let dto: EventDto = serde_json::from_value(json!({
            "id": "1",
            "titulo": "Reunião de Equipe",
            "descricao": "Alinhamento semanal",
            "dataInicio": "2025-11-21T10:00",
            "dataFim": "2025-11-21T11:00",
            "local": "Sala 01",
            "cor": "#3788d8",
            "diaInteiro": false,
            "recorrente": true,
            "tipoRecorrencia": "SEMANAL",
            "calendarioId": "1"
        }))
        .unwrap();

        let event = dto.into_event("fallback");

        assert_eq!(event.calendar_id, "1");
        assert_eq!(event.start_at, at(21, 10, 0));
        assert_eq!(event.recurrence, Some(Recurrence::Weekly));
        assert_eq!(event.location.as_deref(), Some("Sala 01"));
    }

    #[test]
    fn event_dto_without_calendar_uses_fallback() {
        let dto: EventDto = serde_json::from_value(json!({
            "id": "2",
            "titulo": "Entrega do Projeto",
            "dataInicio": "2025-11-25T14:00:00",
            "dataFim": "2025-11-25T16:00:00",
            "recorrente": false,
            "tipoRecorrencia": "DIARIA",
            "local": ""
        }))
        .unwrap();

        let event = dto.into_event("cal-9");

        assert_eq!(event.calendar_id, "cal-9");
        assert_eq!(event.recurrence, None);
        assert_eq!(event.location, None);
        assert!(!event.all_day);
    }

    #[test]
    fn event_dto_rejects_string_all_day_flag() {
        let result = serde_json::from_value::<EventDto>(json!({
            "id": "3",
            "titulo": "Academia",
            "dataInicio": "2025-11-21T18:00",
            "dataFim": "2025-11-21T19:30",
            "diaInteiro": "true"
        }));

        assert!(result.is_err());
    }

    #[test]
    fn event_request_serializes_wire_names() {
        let mut draft = EventDraft::new("1", "Review", at(21, 10, 0), at(21, 11, 0));
        draft.recurrence = Some(Recurrence::Monthly);

        let value = serde_json::to_value(EventRequest::from(&draft)).unwrap();

        assert_eq!(
            value,
            json!({
                "titulo": "Review",
                "dataInicio": "2025-11-21T10:00:00",
                "dataFim": "2025-11-21T11:00:00",
                "diaInteiro": false,
                "recorrente": true,
                "tipoRecorrencia": "MENSAL",
                "calendarioId": "1"
            })
        );
    }

    #[test]
    fn share_dto_accepts_recipient_aliases() {
        let dto: ShareDto = serde_json::from_value(json!({
            "id": "s1",
            "calendarioId": "1",
            "destinatarioId": "7",
            "destinatarioNome": "Maria",
            "destinatarioEmail": "maria@email.com",
            "permissao": "VISUALIZAR",
            "dataCompartilhamento": "2025-11-01T09:30:00"
        }))
        .unwrap();

        let share = dto.into_share("ignored");

        assert_eq!(share.user_id.as_deref(), Some("7"));
        assert_eq!(share.user_email.as_deref(), Some("maria@email.com"));
        assert_eq!(share.permission, Permission::View);
        assert_eq!(share.created_at, Some(at(1, 9, 30)));
    }

    #[test]
    fn share_request_body() {
        let request = ShareRequest::new("1", "maria@email.com", Permission::Edit);

        let value = serde_json::to_value(ShareCreateRequest::from(&request)).unwrap();

        assert_eq!(
            value,
            json!({"calendarioId": "1", "emailDestinatario": "maria@email.com", "permissao": "EDITAR"})
        );
    }

    #[test]
    fn server_message_prefers_json_fields() {
        assert_eq!(server_message(r#"{"message":"Email já cadastrado"}"#), "Email já cadastrado");
        assert_eq!(server_message(r#"{"erro":"Calendário inválido"}"#), "Calendário inválido");
        assert_eq!(server_message("  plain failure \n"), "plain failure");
    }
}
