//! Writes an [`EntityGraph`] through a [`ChangeWriter`].

use std::collections::HashMap;

use garde::Validate;

use crate::domain::{EntityGraph, PostKey, TagKey, UserKey, ValidationContext};
use crate::error::DomainError;
use crate::ports::{ChangeSet, ChangeWriter, EntityRef, PostChange};

/// Validates a graph and persists the entities that changed.
///
/// Entities that were attached from storage and left untouched are not
/// written, so a flush never overwrites concurrent edits to them. All rows
/// of one flush go through a single [`ChangeWriter::apply`] call. IDs
/// assigned on insert are written back into the graph.
pub struct UnitOfWork<'a> {
    writer: &'a dyn ChangeWriter,
}

/// Graph keys in the order of the matching [`ChangeSet`] entries.
#[derive(Default)]
struct Pending {
    users: Vec<UserKey>,
    tags: Vec<TagKey>,
    posts: Vec<PostKey>,
}

impl<'a> UnitOfWork<'a> {
    pub fn new(writer: &'a dyn ChangeWriter) -> Self {
        Self { writer }
    }

    /// Check every entity without writing anything.
    pub fn validate(graph: &EntityGraph, ctx: &ValidationContext) -> Result<(), DomainError> {
        let mut violations = Vec::new();
        let mut collect = |result: Result<(), DomainError>| match result {
            Err(DomainError::Validation(mut v)) => {
                violations.append(&mut v);
                Ok(())
            }
            other => other,
        };

        for key in graph.user_keys() {
            collect(graph.user(key).validate().map_err(Into::into))?;
        }
        for key in graph.tag_keys() {
            collect(graph.tag(key).validate().map_err(Into::into))?;
        }
        for key in graph.post_keys() {
            let post = graph.post(key);
            collect(post.validate_with(ctx).map_err(Into::into))?;
            if post.author().is_none() {
                collect(Err(DomainError::invalid(
                    "author",
                    "This value should not be null.",
                )))?;
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(violations))
        }
    }

    /// Collect new and modified entities of the graph.
    pub fn changes(graph: &EntityGraph) -> Result<ChangeSet, DomainError> {
        Ok(Self::collect(graph)?.0)
    }

    fn collect(graph: &EntityGraph) -> Result<(ChangeSet, Pending), DomainError> {
        let mut changes = ChangeSet::default();
        let mut pending = Pending::default();

        let mut user_slots = HashMap::new();
        for key in graph.user_keys().filter(|&k| graph.user_changed(k)) {
            user_slots.insert(key, changes.users.len());
            changes.users.push(graph.user_record(key));
            pending.users.push(key);
        }

        let mut tag_slots = HashMap::new();
        for key in graph.tag_keys().filter(|&k| graph.tag_changed(k)) {
            tag_slots.insert(key, changes.tags.len());
            changes.tags.push(graph.tag_record(key));
            pending.tags.push(key);
        }

        for key in graph.post_keys().filter(|&k| graph.post_changed(k)) {
            let post = graph.post(key);
            let author = post
                .author()
                .ok_or_else(|| DomainError::invalid("author", "This value should not be null."))?;
            let author = reference(graph.user(author).id(), user_slots.get(&author))?;
            let tags = graph
                .tags_of(key)
                .iter()
                .map(|tag| reference(graph.tag(*tag).id(), tag_slots.get(tag)))
                .collect::<Result<Vec<_>, _>>()?;

            changes.posts.push(PostChange {
                id: post.id(),
                title: post.title.clone(),
                text: post.text.clone(),
                created_at: post.created_at,
                scheduled_at: post.scheduled_at,
                author,
                tags,
            });
            pending.posts.push(key);
        }

        Ok((changes, pending))
    }

    /// Validate, then write every new or modified entity in one go.
    pub async fn flush(
        &self,
        graph: &mut EntityGraph,
        ctx: &ValidationContext,
    ) -> Result<(), DomainError> {
        Self::validate(graph, ctx)?;

        let (changes, pending) = Self::collect(graph)?;
        if changes.is_empty() {
            tracing::debug!("Nothing to flush");
            return Ok(());
        }
        tracing::debug!(
            users = changes.users.len(),
            tags = changes.tags.len(),
            posts = changes.posts.len(),
            "Flushing changes"
        );

        let saved = self.writer.apply(changes).await?;
        if saved.users.len() != pending.users.len()
            || saved.tags.len() != pending.tags.len()
            || saved.posts.len() != pending.posts.len()
        {
            return Err(DomainError::Internal(
                "writer returned a different number of rows".to_string(),
            ));
        }

        for (key, id) in pending.users.into_iter().zip(saved.users) {
            graph.assign_user_id(key, id);
        }
        for (key, id) in pending.tags.into_iter().zip(saved.tags) {
            graph.assign_tag_id(key, id);
        }
        for (key, id) in pending.posts.into_iter().zip(saved.posts) {
            graph.assign_post_id(key, id);
        }
        graph.mark_clean();

        Ok(())
    }
}

/// Stored rows are linked by ID, unsaved ones by their slot in the set.
fn reference(id: Option<i32>, slot: Option<&usize>) -> Result<EntityRef, DomainError> {
    match (id, slot) {
        (Some(id), _) => Ok(EntityRef::Stored(id)),
        (None, Some(&slot)) => Ok(EntityRef::Pending(slot)),
        (None, None) => Err(DomainError::Internal(
            "linked entity is neither stored nor pending".to_string(),
        )),
    }
}
