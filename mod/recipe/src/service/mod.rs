pub mod comments;
pub mod engagement;
pub mod workflow;

use std::sync::Arc;

use cookery_core::{Identity, ListParams, ListResult, ServiceError, now_rfc3339};

use crate::model::{CreateRecipeRequest, Recipe, RecipeStatus, UpdateRecipeRequest};
use crate::store::EngagementStore;

/// Tunables for the engagement subsystem.
#[derive(Debug, Clone)]
pub struct EngagementConfig {
    /// Minimum seconds between two views from the same viewer identity
    /// for both to count toward popularity.
    pub view_cooldown_secs: i64,
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            view_cooldown_secs: 3600,
        }
    }
}

/// The recipe engine — workflow state machine plus engagement subsystem.
///
/// All operations take the caller's [`Identity`] and enforce the
/// visibility rule themselves: outside the owner/admin context a recipe
/// exists only once it is PUBLISHED. Callers never bypass this by
/// reaching into the store directly.
pub struct RecipeEngine {
    store: Arc<EngagementStore>,
    config: EngagementConfig,
}

impl RecipeEngine {
    pub fn new(store: Arc<EngagementStore>) -> Self {
        Self::with_config(store, EngagementConfig::default())
    }

    pub fn with_config(store: Arc<EngagementStore>, config: EngagementConfig) -> Self {
        Self { store, config }
    }

    /// Access the underlying store.
    pub fn store(&self) -> &Arc<EngagementStore> {
        &self.store
    }

    pub(crate) fn config(&self) -> &EngagementConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Visibility
    // -----------------------------------------------------------------------

    /// The uniform read filter: PUBLISHED, or the caller moderates
    /// (owns or administrates) the recipe.
    pub fn recipe_visible(identity: &Identity, recipe: &Recipe) -> bool {
        recipe.status == RecipeStatus::Published || identity.can_moderate(&recipe.owner_id)
    }

    /// Fetch a recipe the caller is allowed to see.
    ///
    /// An existing-but-invisible recipe reads as NotFound with the same
    /// message as a missing one, so unpublished content never leaks
    /// through any read path.
    pub fn visible_recipe(&self, identity: &Identity, id: i64) -> Result<Recipe, ServiceError> {
        let recipe = self.store.get_recipe(id)?;
        if !Self::recipe_visible(identity, &recipe) {
            return Err(ServiceError::NotFound(format!("recipe {id} not found")));
        }
        Ok(recipe)
    }

    // -----------------------------------------------------------------------
    // Recipe CRUD
    // -----------------------------------------------------------------------

    /// Create a recipe owned by the caller. New recipes start in DRAFT.
    pub fn create_recipe(
        &self,
        identity: &Identity,
        req: CreateRecipeRequest,
    ) -> Result<Recipe, ServiceError> {
        let owner = identity.require_user()?;
        if req.title.trim().is_empty() {
            return Err(ServiceError::InvalidContent("title must not be empty".into()));
        }
        self.store.insert_recipe(owner, &req, &now_rfc3339())
    }

    pub fn get_recipe(&self, identity: &Identity, id: i64) -> Result<Recipe, ServiceError> {
        self.visible_recipe(identity, id)
    }

    pub fn list_recipes(
        &self,
        identity: &Identity,
        params: &ListParams,
    ) -> Result<ListResult<Recipe>, ServiceError> {
        let limit = params.limit.min(500);
        self.store
            .list_recipes(identity.user_id(), identity.is_admin(), limit, params.offset)
    }

    /// Update title/nutrition. Owner or admin only; the workflow engine
    /// owns status, so this path cannot touch it.
    pub fn update_recipe(
        &self,
        identity: &Identity,
        id: i64,
        patch: UpdateRecipeRequest,
    ) -> Result<Recipe, ServiceError> {
        let mut recipe = self.visible_recipe(identity, id)?;
        if !identity.can_moderate(&recipe.owner_id) {
            return Err(ServiceError::Forbidden(format!(
                "not allowed to edit recipe {id}"
            )));
        }

        if let Some(title) = patch.title {
            if title.trim().is_empty() {
                return Err(ServiceError::InvalidContent("title must not be empty".into()));
            }
            recipe.title = title;
        }
        if patch.calories.is_some() {
            recipe.calories = patch.calories;
        }
        if patch.protein_g.is_some() {
            recipe.protein_g = patch.protein_g;
        }
        if patch.fat_g.is_some() {
            recipe.fat_g = patch.fat_g;
        }
        if patch.carbs_g.is_some() {
            recipe.carbs_g = patch.carbs_g;
        }
        recipe.update_at = now_rfc3339();

        self.store.update_recipe(&recipe)?;
        self.store.get_recipe(id)
    }

    /// Delete a recipe and, via the schema's cascades, all of its
    /// comments, likes, favorites and views.
    pub fn delete_recipe(&self, identity: &Identity, id: i64) -> Result<(), ServiceError> {
        let recipe = self.visible_recipe(identity, id)?;
        if !identity.can_moderate(&recipe.owner_id) {
            return Err(ServiceError::Forbidden(format!(
                "not allowed to delete recipe {id}"
            )));
        }
        self.store.delete_recipe(id)
    }
}


#[cfg(test)]
mod tests {
    use super::test_util::{make_engine, make_recipe, publish};
    use super::*;

    #[test]
    fn create_requires_user() {
        let engine = make_engine();
        let err = engine
            .create_recipe(
                &Identity::Anonymous,
                CreateRecipeRequest {
                    title: "x".into(),
                    calories: None,
                    protein_g: None,
                    fat_g: None,
                    carbs_g: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated(_)));
    }

    #[test]
    fn create_rejects_blank_title() {
        let engine = make_engine();
        let err = engine
            .create_recipe(
                &Identity::user("u1"),
                CreateRecipeRequest {
                    title: "   ".into(),
                    calories: None,
                    protein_g: None,
                    fat_g: None,
                    carbs_g: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidContent(_)));
    }

    #[test]
    fn draft_invisible_to_others_visible_to_owner_and_admin() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Secret draft");

        assert!(engine.get_recipe(&Identity::user("u1"), recipe.id).is_ok());
        assert!(engine.get_recipe(&Identity::admin("a"), recipe.id).is_ok());

        let err = engine
            .get_recipe(&Identity::user("u2"), recipe.id)
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = engine
            .get_recipe(&Identity::Anonymous, recipe.id)
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn published_visible_to_everyone() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        publish(&engine, "u1", recipe.id);

        let got = engine.get_recipe(&Identity::Anonymous, recipe.id).unwrap();
        assert_eq!(got.status, RecipeStatus::Published);
    }

    #[test]
    fn anonymous_sees_recipe_only_once_published() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        let owner = Identity::user("u1");
        let anon = Identity::Anonymous;

        // DRAFT: hidden.
        assert!(engine.get_recipe(&anon, recipe.id).is_err());

        // PROCESSING: hidden.
        engine.submit(&owner, recipe.id).unwrap();
        assert!(engine.get_recipe(&anon, recipe.id).is_err());

        // PENDING_REVIEW: hidden.
        engine.process_pending_checks(10).unwrap();
        assert!(engine.get_recipe(&anon, recipe.id).is_err());

        // PUBLISHED: visible.
        engine.approve(&Identity::admin("a"), recipe.id).unwrap();
        let got = engine.get_recipe(&anon, recipe.id).unwrap();
        assert_eq!(got.status, RecipeStatus::Published);

        // Unpublished: hidden again.
        engine.unpublish(&owner, recipe.id).unwrap();
        assert!(engine.get_recipe(&anon, recipe.id).is_err());
    }

    #[test]
    fn update_forbidden_for_non_owner_on_published() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        publish(&engine, "u1", recipe.id);

        let err = engine
            .update_recipe(
                &Identity::user("u2"),
                recipe.id,
                UpdateRecipeRequest {
                    title: Some("Hijacked".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn update_patches_only_given_fields() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");

        let updated = engine
            .update_recipe(
                &Identity::user("u1"),
                recipe.id,
                UpdateRecipeRequest {
                    calories: Some(500.0),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Ramen");
        assert_eq!(updated.calories, Some(500.0));
        assert_eq!(updated.protein_g, Some(12.0));
    }

    #[test]
    fn delete_cascades_and_requires_moderation() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        publish(&engine, "u1", recipe.id);

        let err = engine
            .delete_recipe(&Identity::user("u2"), recipe.id)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        engine.delete_recipe(&Identity::admin("a"), recipe.id).unwrap();
        assert!(engine
            .get_recipe(&Identity::admin("a"), recipe.id)
            .is_err());
    }
}
