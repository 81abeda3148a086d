//! Who may see or change what.
//!
//! A post is publicly readable when its own flag is set, its publication
//! date is not in the future, and its category (when it has one) is
//! published too. The author bypasses all of that for their own posts.
//! A viewer who fails the check is told the post does not exist, never
//! that it is hidden. Comments inherit readability from their post.

use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::post::Post;

pub fn post_is_public(post: &Post, now: OffsetDateTime) -> bool {
    post.is_published && post.pub_date <= now && post.category_is_published.unwrap_or(true)
}

pub fn can_view_post(viewer: Option<Uuid>, post: &Post, now: OffsetDateTime) -> bool {
    post_is_public(post, now) || viewer == Some(post.author_id)
}

/// Ownership is the whole story for writes: only the author may change
/// or delete a post or a comment.
pub fn can_modify(viewer: Uuid, owner: Uuid) -> bool {
    viewer == owner
}
