use garde::Validate;

use super::graph::PostKey;
use super::record::TagRecord;
use super::validation::not_blank;

/// Tag entity - a label shared by many posts.
///
/// The tag side of the post/tag association is the inverse view; the join
/// rows are written when posts are saved.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct Tag {
    #[garde(skip)]
    id: Option<i32>,
    #[garde(custom(not_blank), length(chars, max = 255))]
    pub label: String,
    #[garde(skip)]
    pub(crate) posts: Vec<PostKey>,
}

impl Tag {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: None,
            label: label.into(),
            posts: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    pub(crate) fn assign_id(&mut self, id: i32) {
        self.id = Some(id);
    }

    pub fn posts(&self) -> &[PostKey] {
        &self.posts
    }
}

impl From<TagRecord> for Tag {
    fn from(record: TagRecord) -> Self {
        Self {
            id: record.id,
            label: record.label,
            posts: Vec::new(),
        }
    }
}

impl From<&Tag> for TagRecord {
    fn from(tag: &Tag) -> Self {
        Self {
            id: tag.id,
            label: tag.label.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_constraints() {
        assert!(Tag::new("Rust").validate().is_ok());
        assert!(Tag::new("").validate().is_err());
        assert!(Tag::new("x".repeat(255)).validate().is_ok());
        assert!(Tag::new("x".repeat(256)).validate().is_err());
    }
}
