//! Shared constraint rules used by the entity `garde` declarations.

use chrono::{DateTime, NaiveDate, Utc};

/// Context for rules that compare against the current date.
///
/// "today" is midnight UTC, so anything later on the same day still counts
/// as today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationContext {
    today: DateTime<Utc>,
}

impl ValidationContext {
    /// Context pinned to the current UTC date.
    pub fn now() -> Self {
        Self::on(Utc::now().date_naive())
    }

    /// Context pinned to a given date.
    pub fn on(date: NaiveDate) -> Self {
        Self {
            today: date.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }

    pub fn today(&self) -> DateTime<Utc> {
        self.today
    }
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self::now()
    }
}

/// Rejects the empty string. Whitespace-only values pass.
pub fn not_blank<C>(value: &str, _ctx: &C) -> garde::Result {
    if value.is_empty() {
        return Err(garde::Error::new("This value should not be blank."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_today_is_midnight_utc() {
        let ctx = ValidationContext::on(NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
        assert_eq!(ctx.today().to_rfc3339(), "2026-03-14T00:00:00+00:00");
    }

    #[test]
    fn test_not_blank() {
        assert!(not_blank("", &()).is_err());
        assert!(not_blank(" ", &()).is_ok());
        assert!(not_blank("0", &()).is_ok());
    }
}
