use crate::error::AppError;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Parses an ISO-8601 value as the store hands it out: either a full
/// RFC 3339 timestamp or a bare `YYYY-MM-DD` date, read as midnight UTC.
pub fn parse_moment(raw: &str) -> Result<OffsetDateTime, AppError> {
    let trimmed = raw.trim();
    if let Ok(moment) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(moment);
    }

    Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .map(|date| date.midnight().assume_utc())
        .map_err(|_| AppError::invalid_data(format!("'{trimmed}' is not an ISO-8601 date")))
}

pub fn format_moment(moment: OffsetDateTime) -> Result<String, AppError> {
    moment
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn now_rfc3339() -> Result<String, AppError> {
    format_moment(OffsetDateTime::now_utc())
}
