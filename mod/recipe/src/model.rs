use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RecipeStatus
// ---------------------------------------------------------------------------

/// Publication lifecycle state of a recipe.
///
/// ```text
/// DRAFT → PROCESSING → PENDING_REVIEW → PUBLISHED
///   ↑         |              |              |
///   └─────────┴──────────────┴──────────────┘
///   (checks failed)  (rejected)      (unpublished)
/// ```
///
/// The stored enum is closed at these four values. A rejection is not a
/// fifth state: it is a transition back to DRAFT carrying a reason in the
/// operation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipeStatus {
    Draft,
    Processing,
    PendingReview,
    Published,
}

impl RecipeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Processing => "PROCESSING",
            Self::PendingReview => "PENDING_REVIEW",
            Self::Published => "PUBLISHED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(Self::Draft),
            "PROCESSING" => Some(Self::Processing),
            "PENDING_REVIEW" => Some(Self::PendingReview),
            "PUBLISHED" => Some(Self::Published),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecipeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WorkflowEvent
// ---------------------------------------------------------------------------

/// A named event moving a recipe between lifecycle states.
///
/// Submit is owner-only; ChecksPassed/ChecksFailed are fired by the
/// background checks worker (the system actor); Approve/Reject are
/// admin-only; Unpublish is owner or admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEvent {
    Submit,
    ChecksPassed,
    ChecksFailed,
    Approve,
    Reject,
    Unpublish,
}

impl WorkflowEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::ChecksPassed => "checksPassed",
            Self::ChecksFailed => "checksFailed",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Unpublish => "unpublish",
        }
    }
}

impl std::fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Recipe — maps 1:1 to SQL columns
// ---------------------------------------------------------------------------

/// A recipe record. Nutritional fields are per serving.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: i64,
    pub owner_id: String,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat_g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs_g: Option<f64>,

    pub status: RecipeStatus,
    pub create_at: String,
    pub update_at: String,
}

/// Input for creating a recipe. New recipes always start in DRAFT.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecipeRequest {
    pub title: String,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub protein_g: Option<f64>,
    #[serde(default)]
    pub fat_g: Option<f64>,
    #[serde(default)]
    pub carbs_g: Option<f64>,
}

/// Patch for updating a recipe's content fields. Status is owned by the
/// workflow engine and cannot be changed through this path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecipeRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub protein_g: Option<f64>,
    #[serde(default)]
    pub fat_g: Option<f64>,
    #[serde(default)]
    pub carbs_g: Option<f64>,
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// A single comment row. `parent_id` is fixed at creation — the tree is an
/// immutable-parent adjacency list, so cycles cannot form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    pub recipe_id: i64,
    pub author_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    pub content: String,
    /// Tombstone flag: content is hidden but the node keeps its place in
    /// the tree so replies stay addressable.
    pub deleted: bool,
    pub create_at: String,
    pub update_at: String,
}

/// A comment with its replies nested beneath it, as returned by the
/// thread listing. Assembled read-side from the adjacency list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    /// Count of direct children, tombstoned replies included.
    pub reply_count: usize,
    pub replies: Vec<CommentNode>,
}

/// Body for posting a comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostCommentRequest {
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub content: String,
}

/// Body for editing a comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCommentRequest {
    pub content: String,
}

// ---------------------------------------------------------------------------
// Engagement results
// ---------------------------------------------------------------------------

/// Result of a like toggle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub liked: bool,
    pub total_likes: i64,
}

/// Result of a favorite toggle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteState {
    pub favorited: bool,
    pub total_favorites: i64,
}

/// Result of recording a view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewOutcome {
    pub counted_toward_popularity: bool,
}

/// Aggregated engagement counters for one recipe. Always computed from
/// the underlying rows, never maintained as running totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStats {
    pub likes: i64,
    pub favorites: i64,
    pub views: i64,
    pub counted_views: i64,
}

// ---------------------------------------------------------------------------
// Workflow results
// ---------------------------------------------------------------------------

/// Result of a workflow transition. `reason` is set when the transition
/// carried one (reject, failed checks); it is not persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub recipe: Recipe,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Body for the reject endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for s in [
            RecipeStatus::Draft,
            RecipeStatus::Processing,
            RecipeStatus::PendingReview,
            RecipeStatus::Published,
        ] {
            assert_eq!(RecipeStatus::from_str(s.as_str()), Some(s));
        }
        assert_eq!(RecipeStatus::from_str("REJECTED"), None);
    }

    #[test]
    fn status_serde_screaming_snake() {
        let json = serde_json::to_string(&RecipeStatus::PendingReview).unwrap();
        assert_eq!(json, "\"PENDING_REVIEW\"");
    }

    #[test]
    fn comment_node_flattens() {
        let node = CommentNode {
            comment: Comment {
                id: 1,
                recipe_id: 2,
                author_id: "u1".into(),
                parent_id: None,
                content: "hi".into(),
                deleted: false,
                create_at: "2026-01-01T00:00:00+00:00".into(),
                update_at: "2026-01-01T00:00:00+00:00".into(),
            },
            reply_count: 0,
            replies: vec![],
        };
        let v = serde_json::to_value(&node).unwrap();
        assert_eq!(v["id"], 1);
        assert_eq!(v["replyCount"], 0);
        assert!(v["replies"].as_array().unwrap().is_empty());
    }
}
