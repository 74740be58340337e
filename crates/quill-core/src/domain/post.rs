use chrono::{DateTime, Utc};
use garde::Validate;

use super::graph::{TagKey, UserKey};
use super::validation::{ValidationContext, not_blank};

/// Dates as they were when the post was loaded from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StoredDates {
    pub created_at: DateTime<Utc>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

/// Post entity - a blog post written by one user and labelled with tags.
///
/// `created_at` must not lie before today and `scheduled_at`, when set,
/// must lie after today and after `created_at`. The date-of-today rules are
/// only applied to values that differ from what was loaded from storage, so
/// old posts stay editable.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
#[garde(context(ValidationContext))]
pub struct Post {
    #[garde(skip)]
    id: Option<i32>,
    #[garde(custom(not_blank), length(chars, max = 255))]
    pub title: String,
    #[garde(custom(not_blank), length(chars, max = 5000))]
    pub text: String,
    #[garde(custom(created_rule(&self.stored)))]
    pub created_at: DateTime<Utc>,
    #[garde(custom(scheduled_rule(&self.created_at, &self.stored)))]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[garde(skip)]
    pub(crate) author: Option<UserKey>,
    #[garde(skip)]
    pub(crate) tags: Vec<TagKey>,
    #[garde(skip)]
    pub(crate) stored: Option<StoredDates>,
}

impl Post {
    /// Create an unsaved post.
    pub fn new(
        title: impl Into<String>,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            text: text.into(),
            created_at,
            scheduled_at: None,
            author: None,
            tags: Vec::new(),
            stored: None,
        }
    }

    pub fn scheduled(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    pub(crate) fn mark_stored(&mut self, id: i32) {
        self.id = Some(id);
        self.stored = Some(StoredDates {
            created_at: self.created_at,
            scheduled_at: self.scheduled_at,
        });
    }

    pub fn author(&self) -> Option<UserKey> {
        self.author
    }

    pub fn tags(&self) -> &[TagKey] {
        &self.tags
    }
}

fn created_rule(
    stored: &Option<StoredDates>,
) -> impl FnOnce(&DateTime<Utc>, &ValidationContext) -> garde::Result + '_ {
    move |value, ctx| {
        if stored.is_some_and(|s| s.created_at == *value) {
            return Ok(());
        }
        if *value < ctx.today() {
            return Err(garde::Error::new(format!(
                "This value should be greater than or equal to {}.",
                ctx.today().to_rfc3339()
            )));
        }
        Ok(())
    }
}

fn scheduled_rule<'a>(
    created_at: &'a DateTime<Utc>,
    stored: &'a Option<StoredDates>,
) -> impl FnOnce(&Option<DateTime<Utc>>, &ValidationContext) -> garde::Result + 'a {
    move |value, ctx| {
        let Some(value) = value else {
            return Ok(());
        };
        let unchanged = stored.is_some_and(|s| s.scheduled_at == Some(*value));
        if !unchanged && *value <= ctx.today() {
            return Err(garde::Error::new(format!(
                "This value should be greater than {}.",
                ctx.today().to_rfc3339()
            )));
        }
        if *value <= *created_at {
            return Err(garde::Error::new(
                "The scheduled date must be later than the creation date.",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;

    fn ctx() -> ValidationContext {
        ValidationContext::on(NaiveDate::from_ymd_opt(2026, 5, 10).unwrap())
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, day, hour, 0, 0).unwrap()
    }

    fn failing_paths(post: &Post) -> Vec<String> {
        match post.validate_with(&ctx()) {
            Ok(()) => Vec::new(),
            Err(report) => report.iter().map(|(path, _)| path.to_string()).collect(),
        }
    }

    #[test]
    fn test_valid_post() {
        let post = Post::new("My first post", "Body", at(10, 9)).scheduled(at(11, 0));
        assert!(failing_paths(&post).is_empty());
    }

    #[test]
    fn test_blank_title_and_text() {
        let post = Post::new("", "", at(10, 9));
        let paths = failing_paths(&post);
        assert!(paths.contains(&"title".to_string()));
        assert!(paths.contains(&"text".to_string()));
    }

    #[test]
    fn test_text_length_limit() {
        let ok = Post::new("t", "x".repeat(5000), at(10, 9));
        assert!(failing_paths(&ok).is_empty());

        let over = Post::new("t", "x".repeat(5001), at(10, 9));
        assert_eq!(failing_paths(&over), vec!["text".to_string()]);
    }

    #[test]
    fn test_created_at_before_today() {
        let post = Post::new("t", "x", at(9, 23));
        assert_eq!(failing_paths(&post), vec!["created_at".to_string()]);
    }

    #[test]
    fn test_created_at_today_midnight_is_valid() {
        let post = Post::new("t", "x", at(10, 0));
        assert!(failing_paths(&post).is_empty());
    }

    #[test]
    fn test_scheduled_at_must_be_after_today() {
        let post = Post::new("t", "x", at(10, 0)).scheduled(at(10, 0));
        assert_eq!(failing_paths(&post), vec!["scheduled_at".to_string()]);
    }

    #[test]
    fn test_scheduled_before_created_is_invalid() {
        let post = Post::new("t", "x", at(12, 8)).scheduled(at(11, 8));
        assert_eq!(failing_paths(&post), vec!["scheduled_at".to_string()]);
    }

    #[test]
    fn test_stored_dates_are_not_revalidated() {
        let mut post = Post::new("t", "x", at(1, 8)).scheduled(at(2, 8));
        post.mark_stored(7);
        assert!(failing_paths(&post).is_empty());

        post.scheduled_at = Some(at(3, 8));
        assert_eq!(failing_paths(&post), vec!["scheduled_at".to_string()]);
    }
}
