//! Entity graph - owns the entities of one unit of work and their links.

use super::post::Post;
use super::record::{PostRecord, TagRecord, UserRecord};
use super::tag::Tag;
use super::user::User;
use crate::error::DomainError;

/// Handle to a user inside an [`EntityGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserKey(usize);

/// Handle to a post inside an [`EntityGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostKey(usize);

/// Handle to a tag inside an [`EntityGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagKey(usize);

/// Arena of users, posts and tags.
///
/// Keys are only meaningful for the graph that issued them. Every
/// association change goes through this type so that both ends of a link
/// are always updated together:
///
/// - post/tag is many-to-many, owned by the post;
/// - user/post is one-to-many, the post holding the author reference.
///
/// Entities brought in with `attach_*` remember the stored state they were
/// loaded with; only the ones that differ from it are written on flush.
#[derive(Debug, Default, Clone)]
pub struct EntityGraph {
    users: Vec<User>,
    posts: Vec<Post>,
    tags: Vec<Tag>,
    user_snapshots: Vec<Option<UserRecord>>,
    post_snapshots: Vec<Option<PostRecord>>,
    tag_snapshots: Vec<Option<TagRecord>>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity. Any links it carried from elsewhere are dropped.
    pub fn insert_user(&mut self, mut user: User) -> UserKey {
        user.posts.clear();
        self.users.push(user);
        self.user_snapshots.push(None);
        UserKey(self.users.len() - 1)
    }

    pub fn insert_post(&mut self, mut post: Post) -> PostKey {
        post.author = None;
        post.tags.clear();
        self.posts.push(post);
        self.post_snapshots.push(None);
        PostKey(self.posts.len() - 1)
    }

    pub fn insert_tag(&mut self, mut tag: Tag) -> TagKey {
        tag.posts.clear();
        self.tags.push(tag);
        self.tag_snapshots.push(None);
        TagKey(self.tags.len() - 1)
    }

    /// Add a stored user, or return the key of the copy already present.
    pub fn attach_user(&mut self, record: UserRecord) -> UserKey {
        match record.id.and_then(|id| self.find_user(id)) {
            Some(key) => key,
            None => {
                let key = self.insert_user(User::from(record));
                self.user_snapshots[key.0] = Some(self.user_record(key));
                key
            }
        }
    }

    pub fn attach_tag(&mut self, record: TagRecord) -> TagKey {
        match record.id.and_then(|id| self.find_tag(id)) {
            Some(key) => key,
            None => {
                let key = self.insert_tag(Tag::from(record));
                self.tag_snapshots[key.0] = Some(self.tag_record(key));
                key
            }
        }
    }

    /// Add a stored post and link it to its author and tags.
    ///
    /// The author and every tag must already be attached, otherwise the
    /// links could not be rebuilt faithfully.
    pub fn attach_post(&mut self, record: PostRecord) -> Result<PostKey, DomainError> {
        if let Some(key) = record.id.and_then(|id| self.find_post(id)) {
            return Ok(key);
        }
        let author = self.find_user(record.author_id).ok_or_else(|| {
            DomainError::Internal(format!(
                "author {} of post {:?} is not attached",
                record.author_id, record.id
            ))
        })?;
        let tags = record
            .tag_ids
            .iter()
            .map(|&id| {
                self.find_tag(id).ok_or_else(|| {
                    DomainError::Internal(format!("tag {id} of post {:?} is not attached", record.id))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut post = Post::new(record.title, record.text, record.created_at);
        post.scheduled_at = record.scheduled_at;
        if let Some(id) = record.id {
            post.mark_stored(id);
        }
        let key = self.insert_post(post);
        self.add_post(author, key);
        for tag in tags {
            self.add_tag(key, tag);
        }
        self.post_snapshots[key.0] = self.stored_post_record(key);
        Ok(key)
    }

    pub fn find_user(&self, id: i32) -> Option<UserKey> {
        self.users.iter().position(|u| u.id() == Some(id)).map(UserKey)
    }

    pub fn find_post(&self, id: i32) -> Option<PostKey> {
        self.posts.iter().position(|p| p.id() == Some(id)).map(PostKey)
    }

    pub fn find_tag(&self, id: i32) -> Option<TagKey> {
        self.tags.iter().position(|t| t.id() == Some(id)).map(TagKey)
    }

    pub fn user(&self, key: UserKey) -> &User {
        &self.users[key.0]
    }

    pub fn user_mut(&mut self, key: UserKey) -> &mut User {
        &mut self.users[key.0]
    }

    pub fn post(&self, key: PostKey) -> &Post {
        &self.posts[key.0]
    }

    pub fn post_mut(&mut self, key: PostKey) -> &mut Post {
        &mut self.posts[key.0]
    }

    pub fn tag(&self, key: TagKey) -> &Tag {
        &self.tags[key.0]
    }

    pub fn tag_mut(&mut self, key: TagKey) -> &mut Tag {
        &mut self.tags[key.0]
    }

    pub fn user_keys(&self) -> impl Iterator<Item = UserKey> + '_ {
        (0..self.users.len()).map(UserKey)
    }

    pub fn post_keys(&self) -> impl Iterator<Item = PostKey> + '_ {
        (0..self.posts.len()).map(PostKey)
    }

    pub fn tag_keys(&self) -> impl Iterator<Item = TagKey> + '_ {
        (0..self.tags.len()).map(TagKey)
    }

    /// Posts authored by `user`.
    pub fn posts_of(&self, user: UserKey) -> &[PostKey] {
        self.user(user).posts()
    }

    pub fn tags_of(&self, post: PostKey) -> &[TagKey] {
        self.post(post).tags()
    }

    pub fn posts_of_tag(&self, tag: TagKey) -> &[PostKey] {
        self.tag(tag).posts()
    }

    // --- post <-> tag (many-to-many, post owns) ---

    /// Link a post and a tag. Idempotent.
    pub fn add_tag(&mut self, post: PostKey, tag: TagKey) {
        let tags = &mut self.posts[post.0].tags;
        if !tags.contains(&tag) {
            tags.push(tag);
        }
        let posts = &mut self.tags[tag.0].posts;
        if !posts.contains(&post) {
            posts.push(post);
        }
    }

    /// Unlink a post and a tag on both sides.
    pub fn remove_tag(&mut self, post: PostKey, tag: TagKey) {
        self.posts[post.0].tags.retain(|t| *t != tag);
        self.tags[tag.0].posts.retain(|p| *p != post);
    }

    /// Inverse-side entry point; same effect as [`Self::add_tag`].
    pub fn add_post_to_tag(&mut self, tag: TagKey, post: PostKey) {
        self.add_tag(post, tag);
    }

    /// Inverse-side entry point; same effect as [`Self::remove_tag`].
    pub fn remove_post_from_tag(&mut self, tag: TagKey, post: PostKey) {
        self.remove_tag(post, tag);
    }

    /// Replace a post's tags, going through the link helpers.
    pub fn set_tags(&mut self, post: PostKey, tags: &[TagKey]) {
        let current = self.posts[post.0].tags.clone();
        for tag in current.into_iter().filter(|t| !tags.contains(t)) {
            self.remove_tag(post, tag);
        }
        for &tag in tags {
            self.add_tag(post, tag);
        }
    }

    /// Replace a tag's posts, going through the link helpers.
    pub fn set_posts_of_tag(&mut self, tag: TagKey, posts: &[PostKey]) {
        let current = self.tags[tag.0].posts.clone();
        for post in current.into_iter().filter(|p| !posts.contains(p)) {
            self.remove_post_from_tag(tag, post);
        }
        for &post in posts {
            self.add_post_to_tag(tag, post);
        }
    }

    // --- user <-> post (one-to-many, post holds the reference) ---

    /// Make `user` the author of `post`. Idempotent.
    pub fn add_post(&mut self, user: UserKey, post: PostKey) {
        self.set_author(post, Some(user));
    }

    /// Drop `post` from `user`'s posts. The post's author is only cleared
    /// while it still points at `user`.
    pub fn remove_post(&mut self, user: UserKey, post: PostKey) {
        let posts = &mut self.users[user.0].posts;
        let before = posts.len();
        posts.retain(|p| *p != post);
        if posts.len() != before && self.posts[post.0].author == Some(user) {
            self.posts[post.0].author = None;
        }
    }

    /// Set or clear the author, moving the post between the authors'
    /// collections.
    pub fn set_author(&mut self, post: PostKey, author: Option<UserKey>) {
        let previous = self.posts[post.0].author;
        if let Some(prev) = previous.filter(|prev| Some(*prev) != author) {
            self.users[prev.0].posts.retain(|p| *p != post);
        }
        self.posts[post.0].author = author;
        if let Some(user) = author {
            let posts = &mut self.users[user.0].posts;
            if !posts.contains(&post) {
                posts.push(post);
            }
        }
    }

    // --- storage snapshots ---

    pub fn user_record(&self, key: UserKey) -> UserRecord {
        UserRecord::from(self.user(key))
    }

    pub fn tag_record(&self, key: TagKey) -> TagRecord {
        TagRecord::from(self.tag(key))
    }

    /// Flatten a post into its storage shape.
    ///
    /// Fails when the post has no author, or when the author or a tag has
    /// not been saved yet.
    pub fn post_record(&self, key: PostKey) -> Result<PostRecord, DomainError> {
        let post = self.post(key);
        let author = post
            .author
            .ok_or_else(|| DomainError::invalid("author", "This value should not be null."))?;
        let author_id = self.user(author).id().ok_or_else(|| {
            DomainError::Internal("author must be saved before its posts".to_string())
        })?;
        let tag_ids = post
            .tags
            .iter()
            .map(|&t| {
                self.tag(t).id().ok_or_else(|| {
                    DomainError::Internal("tags must be saved before their posts".to_string())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PostRecord {
            id: post.id(),
            title: post.title.clone(),
            text: post.text.clone(),
            created_at: post.created_at,
            scheduled_at: post.scheduled_at,
            author_id,
            tag_ids,
        })
    }

    /// Post record with sorted tag IDs, or `None` while the post has no
    /// author or links to an unsaved user or tag.
    fn stored_post_record(&self, key: PostKey) -> Option<PostRecord> {
        let mut record = self.post_record(key).ok()?;
        record.tag_ids.sort_unstable();
        record.tag_ids.dedup();
        Some(record)
    }

    // --- change tracking ---

    /// New, or modified since it was attached or last flushed.
    pub fn user_changed(&self, key: UserKey) -> bool {
        self.user_snapshots[key.0].as_ref() != Some(&self.user_record(key))
    }

    pub fn tag_changed(&self, key: TagKey) -> bool {
        self.tag_snapshots[key.0].as_ref() != Some(&self.tag_record(key))
    }

    /// Also true when the author or one of the tags is still unsaved.
    pub fn post_changed(&self, key: PostKey) -> bool {
        match self.stored_post_record(key) {
            Some(record) => self.post_snapshots[key.0].as_ref() != Some(&record),
            None => true,
        }
    }

    /// Record the current state of every entity as stored.
    pub(crate) fn mark_clean(&mut self) {
        for key in self.user_keys().collect::<Vec<_>>() {
            self.user_snapshots[key.0] = Some(self.user_record(key));
        }
        for key in self.tag_keys().collect::<Vec<_>>() {
            self.tag_snapshots[key.0] = Some(self.tag_record(key));
        }
        for key in self.post_keys().collect::<Vec<_>>() {
            self.post_snapshots[key.0] = self.stored_post_record(key);
        }
    }

    pub(crate) fn assign_user_id(&mut self, key: UserKey, id: i32) {
        self.users[key.0].assign_id(id);
    }

    pub(crate) fn assign_tag_id(&mut self, key: TagKey, id: i32) {
        self.tags[key.0].assign_id(id);
    }

    pub(crate) fn assign_post_id(&mut self, key: PostKey, id: i32) {
        self.posts[key.0].mark_stored(id);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn graph_with_post() -> (EntityGraph, PostKey) {
        let mut graph = EntityGraph::new();
        let post = graph.insert_post(Post::new("Title", "Text", Utc::now()));
        (graph, post)
    }

    #[test]
    fn test_add_tag_links_both_sides() {
        let (mut graph, post) = graph_with_post();
        let tag = graph.insert_tag(Tag::new("Rust"));

        graph.add_tag(post, tag);

        assert_eq!(graph.tags_of(post), &[tag]);
        assert_eq!(graph.posts_of_tag(tag), &[post]);
    }

    #[test]
    fn test_add_tag_is_idempotent() {
        let (mut graph, post) = graph_with_post();
        let tag = graph.insert_tag(Tag::new("Rust"));

        graph.add_tag(post, tag);
        graph.add_tag(post, tag);
        graph.add_post_to_tag(tag, post);

        assert_eq!(graph.post(post).tags().len(), 1);
        assert_eq!(graph.tag(tag).posts().len(), 1);
    }

    #[test]
    fn test_remove_tag_unlinks_both_sides() {
        let (mut graph, post) = graph_with_post();
        let tag = graph.insert_tag(Tag::new("Rust"));
        let other = graph.insert_tag(Tag::new("Web"));
        graph.add_tag(post, tag);
        graph.add_tag(post, other);

        graph.remove_tag(post, tag);

        assert_eq!(graph.post(post).tags(), &[other]);
        assert!(graph.tag(tag).posts().is_empty());
        assert_eq!(graph.tag(other).posts(), &[post]);
    }

    #[test]
    fn test_inverse_side_helpers() {
        let (mut graph, post) = graph_with_post();
        let tag = graph.insert_tag(Tag::new("Rust"));

        graph.add_post_to_tag(tag, post);
        assert_eq!(graph.post(post).tags(), &[tag]);

        graph.remove_post_from_tag(tag, post);
        assert!(graph.post(post).tags().is_empty());
        assert!(graph.tag(tag).posts().is_empty());
    }

    #[test]
    fn test_set_tags_replaces_links() {
        let (mut graph, post) = graph_with_post();
        let a = graph.insert_tag(Tag::new("a"));
        let b = graph.insert_tag(Tag::new("b"));
        let c = graph.insert_tag(Tag::new("c"));
        graph.set_tags(post, &[a, b]);

        graph.set_tags(post, &[b, c, c]);

        assert_eq!(graph.post(post).tags(), &[b, c]);
        assert!(graph.tag(a).posts().is_empty());
        assert_eq!(graph.tag(c).posts(), &[post]);
    }

    #[test]
    fn test_add_post_sets_author() {
        let (mut graph, post) = graph_with_post();
        let user = graph.insert_user(User::new("a@mail.test", "hash"));

        graph.add_post(user, post);
        graph.add_post(user, post);

        assert_eq!(graph.post(post).author(), Some(user));
        assert_eq!(graph.posts_of(user), &[post]);
    }

    #[test]
    fn test_remove_post_clears_author() {
        let (mut graph, post) = graph_with_post();
        let user = graph.insert_user(User::new("a@mail.test", "hash"));
        graph.add_post(user, post);

        graph.remove_post(user, post);

        assert_eq!(graph.post(post).author(), None);
        assert!(graph.user(user).posts().is_empty());
    }

    #[test]
    fn test_remove_post_keeps_reassigned_author() {
        let (mut graph, post) = graph_with_post();
        let first = graph.insert_user(User::new("a@mail.test", "hash"));
        let second = graph.insert_user(User::new("b@mail.test", "hash"));
        graph.add_post(first, post);

        graph.add_post(second, post);
        graph.remove_post(first, post);

        assert_eq!(graph.post(post).author(), Some(second));
        assert!(graph.user(first).posts().is_empty());
        assert_eq!(graph.user(second).posts(), &[post]);
    }

    #[test]
    fn test_remove_post_ignores_stale_author_link() {
        let (mut graph, post) = graph_with_post();
        let first = graph.insert_user(User::new("a@mail.test", "hash"));
        let second = graph.insert_user(User::new("b@mail.test", "hash"));
        graph.add_post(first, post);
        // Point the post elsewhere without going through set_author.
        graph.post_mut(post).author = Some(second);

        graph.remove_post(first, post);

        assert_eq!(graph.post(post).author(), Some(second));
    }

    #[test]
    fn test_set_author_none_detaches() {
        let (mut graph, post) = graph_with_post();
        let user = graph.insert_user(User::new("a@mail.test", "hash"));
        graph.add_post(user, post);

        graph.set_author(post, None);

        assert!(graph.user(user).posts().is_empty());
    }

    #[test]
    fn test_insert_drops_foreign_links() {
        let (mut graph, post) = graph_with_post();
        let tag = graph.insert_tag(Tag::new("Rust"));
        graph.add_tag(post, tag);

        let mut copy = EntityGraph::new();
        let key = copy.insert_post(graph.post(post).clone());

        assert!(copy.post(key).tags().is_empty());
    }

    #[test]
    fn test_attach_deduplicates_by_id() {
        let mut graph = EntityGraph::new();
        let record = UserRecord {
            id: Some(4),
            email: "a@mail.test".to_string(),
            roles: vec![],
            password: "hash".to_string(),
        };

        let first = graph.attach_user(record.clone());
        let second = graph.attach_user(record);

        assert_eq!(first, second);
        assert_eq!(graph.user_keys().count(), 1);
    }

    #[test]
    fn test_attach_post_rebuilds_links() {
        let mut graph = EntityGraph::new();
        let user = graph.attach_user(UserRecord {
            id: Some(1),
            email: "a@mail.test".to_string(),
            roles: vec![],
            password: "hash".to_string(),
        });
        let tag = graph.attach_tag(TagRecord {
            id: Some(2),
            label: "Rust".to_string(),
        });

        let post = graph
            .attach_post(PostRecord {
                id: Some(3),
                title: "Title".to_string(),
                text: "Text".to_string(),
                created_at: Utc::now(),
                scheduled_at: None,
                author_id: 1,
                tag_ids: vec![2],
            })
            .unwrap();

        assert_eq!(graph.post(post).id(), Some(3));
        assert_eq!(graph.user(user).posts(), &[post]);
        assert_eq!(graph.tag(tag).posts(), &[post]);
        assert!(graph.post(post).stored.is_some());
    }

    #[test]
    fn test_attach_post_requires_author() {
        let mut graph = EntityGraph::new();
        let result = graph.attach_post(PostRecord {
            id: Some(3),
            title: "Title".to_string(),
            text: "Text".to_string(),
            created_at: Utc::now(),
            scheduled_at: None,
            author_id: 1,
            tag_ids: vec![],
        });
        assert!(matches!(result, Err(DomainError::Internal(_))));
    }

    #[test]
    fn test_attached_entities_start_unchanged() {
        let mut graph = EntityGraph::new();
        let user = graph.attach_user(UserRecord {
            id: Some(1),
            email: "a@mail.test".to_string(),
            roles: vec![],
            password: "hash".to_string(),
        });
        let rust = graph.attach_tag(TagRecord {
            id: Some(2),
            label: "Rust".to_string(),
        });
        let web = graph.attach_tag(TagRecord {
            id: Some(3),
            label: "Web".to_string(),
        });
        let post = graph
            .attach_post(PostRecord {
                id: Some(4),
                title: "Title".to_string(),
                text: "Text".to_string(),
                created_at: Utc::now(),
                scheduled_at: None,
                author_id: 1,
                tag_ids: vec![3, 2],
            })
            .unwrap();

        assert!(!graph.user_changed(user));
        assert!(!graph.tag_changed(rust));
        assert!(!graph.post_changed(post));

        graph.remove_tag(post, web);
        assert!(graph.post_changed(post));
        assert!(!graph.tag_changed(web));

        graph.add_tag(post, web);
        assert!(!graph.post_changed(post));

        graph.user_mut(user).password = "other".to_string();
        assert!(graph.user_changed(user));
    }

    #[test]
    fn test_inserted_entities_are_changed() {
        let (mut graph, post) = graph_with_post();
        let user = graph.insert_user(User::new("a@mail.test", "hash"));
        graph.add_post(user, post);

        assert!(graph.user_changed(user));
        assert!(graph.post_changed(post));

        graph.assign_user_id(user, 1);
        graph.assign_post_id(post, 2);
        graph.mark_clean();

        assert!(!graph.user_changed(user));
        assert!(!graph.post_changed(post));
    }

    #[test]
    fn test_post_record_requires_author() {
        let (graph, post) = graph_with_post();
        let err = graph.post_record(post).unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref v) if v[0].starts_with("author")));
    }
}
