//! Comment tree management: posting, editing, tombstoning and thread
//! assembly.
//!
//! Comments form an immutable-parent adjacency list. The nested tree is
//! assembled read-side by grouping rows under their parent id — there are
//! no live parent references anywhere, so reference cycles cannot exist.

use std::collections::HashMap;

use cookery_core::{Identity, ServiceError, now_rfc3339};

use crate::model::{Comment, CommentNode, EditCommentRequest, PostCommentRequest};
use crate::service::RecipeEngine;

impl RecipeEngine {
    /// Post a comment, optionally as a reply.
    ///
    /// The parent, if given, must exist and belong to the same recipe;
    /// its id is fixed on the new row forever. Replying under a
    /// tombstoned parent is allowed — the node is still part of the tree.
    pub fn post_comment(
        &self,
        identity: &Identity,
        recipe_id: i64,
        req: PostCommentRequest,
    ) -> Result<Comment, ServiceError> {
        let author = identity.require_user()?.to_string();
        self.visible_recipe(identity, recipe_id)?;

        let content = req.content.trim();
        if content.is_empty() {
            return Err(ServiceError::InvalidContent(
                "comment content must not be empty".into(),
            ));
        }

        if let Some(parent_id) = req.parent_id {
            let parent = self.store().get_comment(parent_id)?;
            if parent.recipe_id != recipe_id {
                return Err(ServiceError::CrossRecipeParent(format!(
                    "parent comment {parent_id} belongs to recipe {}",
                    parent.recipe_id
                )));
            }
        }

        self.store()
            .insert_comment(recipe_id, &author, req.parent_id, content, &now_rfc3339())
    }

    /// Edit a comment's content. Author or admin only; tombstoned
    /// comments read as missing.
    pub fn edit_comment(
        &self,
        identity: &Identity,
        comment_id: i64,
        req: EditCommentRequest,
    ) -> Result<Comment, ServiceError> {
        identity.require_user()?;

        let comment = self.store().get_comment(comment_id)?;
        if comment.deleted {
            return Err(ServiceError::NotFound(format!(
                "comment {comment_id} not found"
            )));
        }
        if !identity.can_moderate(&comment.author_id) {
            return Err(ServiceError::Forbidden(format!(
                "not allowed to edit comment {comment_id}"
            )));
        }

        let content = req.content.trim();
        if content.is_empty() {
            return Err(ServiceError::InvalidContent(
                "comment content must not be empty".into(),
            ));
        }

        self.store()
            .update_comment_content(comment_id, content, &now_rfc3339())?;
        self.store().get_comment(comment_id)
    }

    /// Soft-delete a comment. The tombstone keeps the node in the tree so
    /// replies stay addressable; only the content disappears.
    pub fn delete_comment(
        &self,
        identity: &Identity,
        comment_id: i64,
    ) -> Result<(), ServiceError> {
        identity.require_user()?;

        let comment = self.store().get_comment(comment_id)?;
        if comment.deleted {
            return Err(ServiceError::NotFound(format!(
                "comment {comment_id} not found"
            )));
        }
        if !identity.can_moderate(&comment.author_id) {
            return Err(ServiceError::Forbidden(format!(
                "not allowed to delete comment {comment_id}"
            )));
        }

        self.store().tombstone_comment(comment_id, &now_rfc3339())
    }

    /// The full comment thread for a recipe: top-level comments with
    /// replies nested beneath, ordered oldest-first at every level.
    /// Each node's `reply_count` counts direct children, tombstones
    /// included, so thread depth is stable across deletions.
    pub fn list_thread(
        &self,
        identity: &Identity,
        recipe_id: i64,
    ) -> Result<Vec<CommentNode>, ServiceError> {
        self.visible_recipe(identity, recipe_id)?;
        let comments = self.store().comments_for_recipe(recipe_id)?;
        Ok(assemble_thread(comments))
    }
}

/// Group a flat, create_at-ordered comment list into a nested tree.
///
/// Rows arrive sorted ascending, and grouping preserves that order, so
/// every `replies` vector is already oldest-first.
fn assemble_thread(comments: Vec<Comment>) -> Vec<CommentNode> {
    let mut roots: Vec<Comment> = Vec::new();
    let mut children: HashMap<i64, Vec<Comment>> = HashMap::new();

    for c in comments {
        match c.parent_id {
            None => roots.push(c),
            Some(parent) => children.entry(parent).or_default().push(c),
        }
    }

    roots
        .into_iter()
        .map(|c| build_node(c, &mut children))
        .collect()
}

fn build_node(comment: Comment, children: &mut HashMap<i64, Vec<Comment>>) -> CommentNode {
    let kids = children.remove(&comment.id).unwrap_or_default();
    let reply_count = kids.len();
    let replies = kids
        .into_iter()
        .map(|c| build_node(c, children))
        .collect();

    CommentNode {
        comment,
        reply_count,
        replies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_util::{make_engine, make_recipe, publish};

    fn post(
        engine: &RecipeEngine,
        user: &str,
        recipe_id: i64,
        parent_id: Option<i64>,
        content: &str,
    ) -> Result<Comment, ServiceError> {
        engine.post_comment(
            &Identity::user(user),
            recipe_id,
            PostCommentRequest {
                parent_id,
                content: content.into(),
            },
        )
    }

    #[test]
    fn post_and_nest() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        publish(&engine, "u1", recipe.id);

        let c1 = post(&engine, "u1", recipe.id, None, "looks great").unwrap();
        let c2 = post(&engine, "u2", recipe.id, Some(c1.id), "agreed").unwrap();

        let thread = engine
            .list_thread(&Identity::Anonymous, recipe.id)
            .unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].comment.id, c1.id);
        assert_eq!(thread[0].reply_count, 1);
        assert_eq!(thread[0].replies.len(), 1);
        assert_eq!(thread[0].replies[0].comment.id, c2.id);
    }

    #[test]
    fn anonymous_cannot_post() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        publish(&engine, "u1", recipe.id);

        let err = engine
            .post_comment(
                &Identity::Anonymous,
                recipe.id,
                PostCommentRequest {
                    parent_id: None,
                    content: "hi".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated(_)));
    }

    #[test]
    fn whitespace_content_rejected() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        publish(&engine, "u1", recipe.id);

        let err = post(&engine, "u2", recipe.id, None, "  \n\t ").unwrap_err();
        assert!(matches!(err, ServiceError::InvalidContent(_)));

        let thread = engine
            .list_thread(&Identity::Anonymous, recipe.id)
            .unwrap();
        assert!(thread.is_empty());
    }

    #[test]
    fn unknown_recipe_or_parent_is_not_found() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        publish(&engine, "u1", recipe.id);

        let err = post(&engine, "u2", 9999, None, "hi").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = post(&engine, "u2", recipe.id, Some(9999), "hi").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn cross_recipe_parent_rejected_and_nothing_written() {
        let engine = make_engine();
        let r1 = make_recipe(&engine, "u1", "Ramen");
        let r2 = make_recipe(&engine, "u1", "Udon");
        publish(&engine, "u1", r1.id);
        publish(&engine, "u1", r2.id);

        let c1 = post(&engine, "u2", r1.id, None, "on r1").unwrap();
        let err = post(&engine, "u2", r2.id, Some(c1.id), "wrong thread").unwrap_err();
        assert!(matches!(err, ServiceError::CrossRecipeParent(_)));

        assert!(engine
            .list_thread(&Identity::Anonymous, r2.id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn edit_rules() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        publish(&engine, "u1", recipe.id);
        let c = post(&engine, "u2", recipe.id, None, "originl").unwrap();

        // Stranger: forbidden. Author: ok. Admin: ok.
        let err = engine
            .edit_comment(
                &Identity::user("u3"),
                c.id,
                EditCommentRequest { content: "x".into() },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let edited = engine
            .edit_comment(
                &Identity::user("u2"),
                c.id,
                EditCommentRequest {
                    content: "original".into(),
                },
            )
            .unwrap();
        assert_eq!(edited.content, "original");
        assert_eq!(edited.create_at, c.create_at);
        assert_eq!(edited.parent_id, None);

        let edited = engine
            .edit_comment(
                &Identity::admin("a"),
                c.id,
                EditCommentRequest {
                    content: "moderated".into(),
                },
            )
            .unwrap();
        assert_eq!(edited.content, "moderated");
    }

    #[test]
    fn tombstone_keeps_replies_and_reply_count() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        publish(&engine, "u1", recipe.id);

        let c1 = post(&engine, "u2", recipe.id, None, "parent").unwrap();
        let c2 = post(&engine, "u3", recipe.id, Some(c1.id), "child").unwrap();

        engine
            .delete_comment(&Identity::user("u2"), c1.id)
            .unwrap();

        let thread = engine
            .list_thread(&Identity::Anonymous, recipe.id)
            .unwrap();
        assert_eq!(thread.len(), 1);
        let node = &thread[0];
        assert!(node.comment.deleted);
        assert_eq!(node.comment.content, "");
        assert_eq!(node.reply_count, 1);
        assert_eq!(node.replies[0].comment.id, c2.id);
        assert_eq!(node.replies[0].comment.content, "child");
    }

    #[test]
    fn deleting_a_reply_keeps_parent_reply_count() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        publish(&engine, "u1", recipe.id);

        let c1 = post(&engine, "u2", recipe.id, None, "parent").unwrap();
        let c2 = post(&engine, "u3", recipe.id, Some(c1.id), "child").unwrap();
        engine
            .delete_comment(&Identity::user("u3"), c2.id)
            .unwrap();

        let thread = engine
            .list_thread(&Identity::Anonymous, recipe.id)
            .unwrap();
        assert_eq!(thread[0].reply_count, 1);
        assert!(thread[0].replies[0].comment.deleted);
    }

    #[test]
    fn edit_or_delete_tombstone_is_not_found() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        publish(&engine, "u1", recipe.id);
        let c = post(&engine, "u2", recipe.id, None, "gone soon").unwrap();
        engine.delete_comment(&Identity::user("u2"), c.id).unwrap();

        let err = engine
            .edit_comment(
                &Identity::user("u2"),
                c.id,
                EditCommentRequest { content: "x".into() },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = engine
            .delete_comment(&Identity::admin("a"), c.id)
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn reply_under_tombstoned_parent_allowed() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        publish(&engine, "u1", recipe.id);

        let c1 = post(&engine, "u2", recipe.id, None, "parent").unwrap();
        engine.delete_comment(&Identity::user("u2"), c1.id).unwrap();

        let c2 = post(&engine, "u3", recipe.id, Some(c1.id), "late reply").unwrap();
        let thread = engine
            .list_thread(&Identity::Anonymous, recipe.id)
            .unwrap();
        assert_eq!(thread[0].replies[0].comment.id, c2.id);
    }

    #[test]
    fn thread_ordered_oldest_first_at_every_level() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        publish(&engine, "u1", recipe.id);

        let a = post(&engine, "u2", recipe.id, None, "a").unwrap();
        let b = post(&engine, "u3", recipe.id, None, "b").unwrap();
        let a1 = post(&engine, "u3", recipe.id, Some(a.id), "a1").unwrap();
        let a2 = post(&engine, "u2", recipe.id, Some(a.id), "a2").unwrap();

        let thread = engine
            .list_thread(&Identity::Anonymous, recipe.id)
            .unwrap();
        let ids: Vec<i64> = thread.iter().map(|n| n.comment.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        let reply_ids: Vec<i64> = thread[0].replies.iter().map(|n| n.comment.id).collect();
        assert_eq!(reply_ids, vec![a1.id, a2.id]);
    }

    #[test]
    fn deep_nesting_assembles() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        publish(&engine, "u1", recipe.id);

        let mut parent = post(&engine, "u2", recipe.id, None, "level 0").unwrap();
        for i in 1..6 {
            parent = post(
                &engine,
                "u2",
                recipe.id,
                Some(parent.id),
                &format!("level {i}"),
            )
            .unwrap();
        }

        let thread = engine
            .list_thread(&Identity::Anonymous, recipe.id)
            .unwrap();
        let mut node = &thread[0];
        let mut depth = 0;
        while !node.replies.is_empty() {
            assert_eq!(node.reply_count, 1);
            node = &node.replies[0];
            depth += 1;
        }
        assert_eq!(depth, 5);
    }
}
