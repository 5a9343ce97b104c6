/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Service banner and health check
/// - `auth`: Registration, login, external identity login, profile
/// - `projects`: Project CRUD
/// - `tasks`: Task CRUD and filtered listing
/// - `comments`: Task comments
/// - `notifications`: Notification feed
/// - `dashboard`: Overview, stats, calendar and project report
/// - `admin`: Admin-only user listing
///
/// Request bodies are extracted as `Result<Json<T>, JsonRejection>` so a
/// malformed body produces the same JSON error shape as every other failure.
/// Identifiers arrive as strings and are parsed explicitly, which turns a
/// malformed ID into a 400 naming the kind of reference.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use taskboard_shared::services::parse_id;

pub mod admin;
pub mod auth;
pub mod comments;
pub mod dashboard;
pub mod health;
pub mod notifications;
pub mod projects;
pub mod tasks;

/// Body of delete responses
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Distinguishes an absent field from an explicit `null`
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`: a missing
/// field stays `None`, `null` becomes `Some(None)`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims a query or body value, treating blank as absent
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn parse_uuid(raw: &str, what: &str) -> ApiResult<Uuid> {
    Ok(parse_id(raw, what)?)
}

pub(crate) fn parse_optional_uuid(raw: Option<&str>, what: &str) -> ApiResult<Option<Uuid>> {
    non_blank(raw).map(|r| parse_uuid(r, what)).transpose()
}

/// Parses an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC)
pub(crate) fn parse_date(raw: &str, field: &str) -> ApiResult<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid {}", field)))
}

pub(crate) fn parse_optional_date(raw: Option<&str>, field: &str) -> ApiResult<Option<DateTime<Utc>>> {
    non_blank(raw).map(|r| parse_date(r, field)).transpose()
}

/// Resolves a nullable body field: absent, cleared (`null` or `""`), or set
pub(crate) fn parse_nullable<T>(
    raw: Option<Option<String>>,
    parse: impl FnOnce(&str) -> ApiResult<T>,
) -> ApiResult<Option<Option<T>>> {
    match raw {
        None => Ok(None),
        Some(value) => match non_blank(value.as_deref()) {
            None => Ok(Some(None)),
            Some(v) => parse(v).map(|parsed| Some(Some(parsed))),
        },
    }
}

/// Parses an enum carried as a string, reporting the parser's message
pub(crate) fn parse_enum<T>(raw: Option<&str>) -> ApiResult<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    non_blank(raw)
        .map(|r| r.parse::<T>().map_err(ApiError::BadRequest))
        .transpose()
}

/// Like [`parse_enum`], but a present value must parse even when blank
pub(crate) fn parse_present_enum<T>(raw: Option<&str>) -> ApiResult<Option<T>>
where
    T: std::str::FromStr<Err = String>,
{
    raw.map(|r| r.trim().parse::<T>().map_err(ApiError::BadRequest))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use taskboard_shared::models::task::TaskStatus;

    #[test]
    fn test_parse_date_formats() {
        let date = parse_date("2025-03-14", "dueDate").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2025, 3, 14));

        let ts = parse_date("2025-03-14T10:30:00+02:00", "dueDate").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-03-14T08:30:00+00:00");

        match parse_date("next tuesday", "dueDate") {
            Err(ApiError::BadRequest(msg)) => assert_eq!(msg, "Invalid dueDate"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_nullable() {
        let id = Uuid::new_v4();
        let parse = |r: &str| parse_uuid(r, "assignee");

        assert_eq!(parse_nullable(None, parse).unwrap(), None);
        assert_eq!(parse_nullable(Some(None), parse).unwrap(), Some(None));
        assert_eq!(parse_nullable(Some(Some(" ".into())), parse).unwrap(), Some(None));
        assert_eq!(
            parse_nullable(Some(Some(id.to_string())), parse).unwrap(),
            Some(Some(id))
        );
        assert!(parse_nullable(Some(Some("nope".into())), parse).is_err());
    }

    #[test]
    fn test_double_option_distinguishes_null() {
        #[derive(Deserialize)]
        struct Body {
            #[serde(default, deserialize_with = "double_option")]
            assignee: Option<Option<String>>,
        }

        let absent: Body = serde_json::from_str("{}").unwrap();
        let cleared: Body = serde_json::from_str(r#"{"assignee":null}"#).unwrap();
        let set: Body = serde_json::from_str(r#"{"assignee":"x"}"#).unwrap();

        assert_eq!(absent.assignee, None);
        assert_eq!(cleared.assignee, Some(None));
        assert_eq!(set.assignee, Some(Some("x".to_string())));
    }

    #[test]
    fn test_parse_enum() {
        assert_eq!(parse_enum::<TaskStatus>(Some("done")).unwrap(), Some(TaskStatus::Done));
        assert_eq!(parse_enum::<TaskStatus>(Some("")).unwrap(), None);
        assert!(parse_enum::<TaskStatus>(Some("blocked")).is_err());
    }

    #[test]
    fn test_parse_present_enum_rejects_blank() {
        assert_eq!(parse_present_enum::<TaskStatus>(None).unwrap(), None);
        assert_eq!(
            parse_present_enum::<TaskStatus>(Some("inprogress")).unwrap(),
            Some(TaskStatus::InProgress)
        );
        assert!(parse_present_enum::<TaskStatus>(Some("")).is_err());
        assert!(parse_present_enum::<TaskStatus>(Some("  ")).is_err());
    }
}
