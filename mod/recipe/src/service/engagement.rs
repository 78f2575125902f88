//! Engagement counters: like/favorite toggles, view recording, stats.
//!
//! Toggles are idempotent per user — one row per (recipe, user) pair at
//! any time — and totals are recounted from the rows in the same call,
//! never kept as separate running counters.

use cookery_core::{Identity, ServiceError, now_rfc3339};

use crate::model::{FavoriteState, LikeState, RecipeStats, ViewOutcome};
use crate::service::RecipeEngine;
use crate::store::ToggleKind;

impl RecipeEngine {
    /// Toggle the caller's like on a recipe.
    pub fn toggle_like(
        &self,
        identity: &Identity,
        recipe_id: i64,
    ) -> Result<LikeState, ServiceError> {
        let user = identity.require_user()?.to_string();
        self.visible_recipe(identity, recipe_id)?;

        let liked = self
            .store()
            .toggle(ToggleKind::Like, recipe_id, &user, &now_rfc3339())?;
        let total_likes = self.store().count(ToggleKind::Like, recipe_id)?;

        Ok(LikeState { liked, total_likes })
    }

    /// Toggle the caller's favorite on a recipe. Independent of likes.
    pub fn toggle_favorite(
        &self,
        identity: &Identity,
        recipe_id: i64,
    ) -> Result<FavoriteState, ServiceError> {
        let user = identity.require_user()?.to_string();
        self.visible_recipe(identity, recipe_id)?;

        let favorited = self
            .store()
            .toggle(ToggleKind::Favorite, recipe_id, &user, &now_rfc3339())?;
        let total_favorites = self.store().count(ToggleKind::Favorite, recipe_id)?;

        Ok(FavoriteState {
            favorited,
            total_favorites,
        })
    }

    /// Record a view. Anonymous callers are allowed.
    ///
    /// Every call appends a raw view row; it counts toward popularity
    /// only if the same viewer identity (user id when authenticated, ip
    /// otherwise) has no counted view inside the cool-down window.
    pub fn record_view(
        &self,
        identity: &Identity,
        recipe_id: i64,
        ip: &str,
    ) -> Result<ViewOutcome, ServiceError> {
        self.visible_recipe(identity, recipe_id)?;

        let user_id = identity.user_id();
        let viewer_key = user_id.unwrap_or(ip);

        let now = chrono::Utc::now();
        let cutoff = (now - chrono::Duration::seconds(self.config().view_cooldown_secs))
            .to_rfc3339();

        let counted = self.store().insert_view(
            recipe_id,
            user_id,
            ip,
            viewer_key,
            &cutoff,
            &now.to_rfc3339(),
        )?;

        Ok(ViewOutcome {
            counted_toward_popularity: counted,
        })
    }

    /// Aggregated engagement counters, reflecting all committed
    /// toggles and views at call time.
    pub fn recipe_stats(
        &self,
        identity: &Identity,
        recipe_id: i64,
    ) -> Result<RecipeStats, ServiceError> {
        self.visible_recipe(identity, recipe_id)?;
        self.store().stats(recipe_id)
    }
}
