//! The recipe workflow state machine.
//!
//! Owns every write to `Recipe.status`. Transitions are validated
//! against a pure table, authorized per event, and committed with a
//! conditional UPDATE so concurrent attempts observe each other.

use cookery_core::{Identity, ServiceError, now_rfc3339};
use tracing::info;

use crate::model::{Recipe, RecipeStatus, TransitionOutcome, WorkflowEvent};
use crate::service::RecipeEngine;

/// The transition table. `None` means the event does not apply in the
/// given state.
///
/// | from           | event        | to             | who            |
/// |----------------|--------------|----------------|----------------|
/// | DRAFT          | submit       | PROCESSING     | owner          |
/// | PROCESSING     | checksPassed | PENDING_REVIEW | system         |
/// | PROCESSING     | checksFailed | DRAFT          | system         |
/// | PENDING_REVIEW | approve      | PUBLISHED      | admin          |
/// | PENDING_REVIEW | reject       | DRAFT          | admin          |
/// | PUBLISHED      | unpublish    | DRAFT          | owner or admin |
pub fn next_status(from: RecipeStatus, event: WorkflowEvent) -> Option<RecipeStatus> {
    use RecipeStatus::*;
    use WorkflowEvent::*;

    match (from, event) {
        (Draft, Submit) => Some(Processing),
        (Processing, ChecksPassed) => Some(PendingReview),
        (Processing, ChecksFailed) => Some(Draft),
        (PendingReview, Approve) => Some(Published),
        (PendingReview, Reject) => Some(Draft),
        (Published, Unpublish) => Some(Draft),
        _ => None,
    }
}

/// Who may fire an event on a recipe.
fn authorize(
    identity: &Identity,
    event: WorkflowEvent,
    recipe: &Recipe,
) -> Result<(), ServiceError> {
    match event {
        WorkflowEvent::Submit => {
            let user = identity.require_user()?;
            if user != recipe.owner_id {
                return Err(ServiceError::Forbidden(format!(
                    "only the owner may submit recipe {}",
                    recipe.id
                )));
            }
        }
        WorkflowEvent::Approve | WorkflowEvent::Reject => {
            identity.require_user()?;
            if !identity.is_admin() {
                return Err(ServiceError::Forbidden(format!(
                    "only admins may {event} recipe {}",
                    recipe.id
                )));
            }
        }
        WorkflowEvent::Unpublish => {
            identity.require_user()?;
            if !identity.can_moderate(&recipe.owner_id) {
                return Err(ServiceError::Forbidden(format!(
                    "not allowed to unpublish recipe {}",
                    recipe.id
                )));
            }
        }
        // System events never arrive through an identity-facing path.
        WorkflowEvent::ChecksPassed | WorkflowEvent::ChecksFailed => {
            return Err(ServiceError::Forbidden(format!(
                "{event} is a system event"
            )));
        }
    }
    Ok(())
}

impl RecipeEngine {
    /// Owner submits a DRAFT for review; the checks worker picks it up.
    pub fn submit(
        &self,
        identity: &Identity,
        recipe_id: i64,
    ) -> Result<TransitionOutcome, ServiceError> {
        self.fire(identity, recipe_id, WorkflowEvent::Submit, None)
    }

    /// Admin approves a PENDING_REVIEW recipe, making it public.
    pub fn approve(
        &self,
        identity: &Identity,
        recipe_id: i64,
    ) -> Result<TransitionOutcome, ServiceError> {
        self.fire(identity, recipe_id, WorkflowEvent::Approve, None)
    }

    /// Admin rejects a PENDING_REVIEW recipe back to DRAFT.
    ///
    /// The reason travels with the outcome; it is not persisted — the
    /// stored status enum stays closed at four values.
    pub fn reject(
        &self,
        identity: &Identity,
        recipe_id: i64,
        reason: Option<String>,
    ) -> Result<TransitionOutcome, ServiceError> {
        self.fire(identity, recipe_id, WorkflowEvent::Reject, reason)
    }

    /// Owner or admin withdraws a PUBLISHED recipe back to DRAFT.
    pub fn unpublish(
        &self,
        identity: &Identity,
        recipe_id: i64,
    ) -> Result<TransitionOutcome, ServiceError> {
        self.fire(identity, recipe_id, WorkflowEvent::Unpublish, None)
    }

    fn fire(
        &self,
        identity: &Identity,
        recipe_id: i64,
        event: WorkflowEvent,
        reason: Option<String>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let recipe = self.store().get_recipe(recipe_id)?;
        authorize(identity, event, &recipe)?;
        let recipe = self.apply(recipe, event)?;

        info!(
            recipe = recipe.id,
            status = %recipe.status,
            "workflow {event} by {}",
            identity.user_id().unwrap_or("?")
        );
        Ok(TransitionOutcome { recipe, reason })
    }

    /// Fire a system event (automated checks outcome) on a recipe.
    pub(crate) fn apply_system_event(
        &self,
        recipe_id: i64,
        event: WorkflowEvent,
        reason: Option<String>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let recipe = self.store().get_recipe(recipe_id)?;
        let recipe = self.apply(recipe, event)?;
        Ok(TransitionOutcome { recipe, reason })
    }

    /// Validate and commit a transition.
    ///
    /// The conditional UPDATE only succeeds while the status still equals
    /// the one the event was validated against. If a concurrent
    /// transition got there first, the event is re-evaluated once against
    /// the committed status, then fails.
    fn apply(&self, recipe: Recipe, event: WorkflowEvent) -> Result<Recipe, ServiceError> {
        let mut current = recipe;
        for _ in 0..2 {
            let Some(next) = next_status(current.status, event) else {
                return Err(ServiceError::InvalidTransition(format!(
                    "no {event} transition from {} for recipe {}",
                    current.status, current.id
                )));
            };

            if self
                .store()
                .cas_status(current.id, current.status, next, &now_rfc3339())?
            {
                return self.store().get_recipe(current.id);
            }

            current = self.store().get_recipe(current.id)?;
        }

        Err(ServiceError::InvalidTransition(format!(
            "recipe {} is changing concurrently, now {}",
            current.id, current.status
        )))
    }

    // -----------------------------------------------------------------------
    // Automated checks (the system actor)
    // -----------------------------------------------------------------------

    /// Run automated checks over PROCESSING recipes and move each to
    /// PENDING_REVIEW or back to DRAFT. Returns how many were moved.
    /// Called by the background worker; tests call it directly.
    pub fn process_pending_checks(&self, limit: usize) -> Result<u32, ServiceError> {
        let processing = self
            .store()
            .recipes_in_status(RecipeStatus::Processing, limit)?;

        let mut moved = 0u32;
        for recipe in processing {
            let outcome = match run_checks(&recipe) {
                Ok(()) => self.apply_system_event(recipe.id, WorkflowEvent::ChecksPassed, None),
                Err(reason) => {
                    info!(recipe = recipe.id, %reason, "automated checks failed");
                    self.apply_system_event(
                        recipe.id,
                        WorkflowEvent::ChecksFailed,
                        Some(reason),
                    )
                }
            };

            match outcome {
                Ok(_) => moved += 1,
                // Someone else already moved it; nothing to do.
                Err(ServiceError::InvalidTransition(_)) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(moved)
    }
}

/// Content checks a recipe must pass before human review.
fn run_checks(recipe: &Recipe) -> Result<(), String> {
    if recipe.title.trim().is_empty() {
        return Err("title is empty".into());
    }
    for (field, value) in [
        ("calories", recipe.calories),
        ("proteinG", recipe.protein_g),
        ("fatG", recipe.fat_g),
        ("carbsG", recipe.carbs_g),
    ] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(format!("{field} must be a non-negative number"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CreateRecipeRequest;
    use crate::service::test_util::{make_engine, make_recipe};

    #[test]
    fn transition_table() {
        use RecipeStatus::*;
        use WorkflowEvent::*;

        assert_eq!(next_status(Draft, Submit), Some(Processing));
        assert_eq!(next_status(Processing, ChecksPassed), Some(PendingReview));
        assert_eq!(next_status(Processing, ChecksFailed), Some(Draft));
        assert_eq!(next_status(PendingReview, Approve), Some(Published));
        assert_eq!(next_status(PendingReview, Reject), Some(Draft));
        assert_eq!(next_status(Published, Unpublish), Some(Draft));

        // A few of the holes.
        assert_eq!(next_status(Draft, Approve), None);
        assert_eq!(next_status(Published, Submit), None);
        assert_eq!(next_status(PendingReview, Submit), None);
        assert_eq!(next_status(Draft, Unpublish), None);
    }

    #[test]
    fn full_lifecycle() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        let owner = Identity::user("u1");
        let admin = Identity::admin("a1");

        let out = engine.submit(&owner, recipe.id).unwrap();
        assert_eq!(out.recipe.status, RecipeStatus::Processing);

        assert_eq!(engine.process_pending_checks(10).unwrap(), 1);
        let got = engine.get_recipe(&owner, recipe.id).unwrap();
        assert_eq!(got.status, RecipeStatus::PendingReview);

        let out = engine.approve(&admin, recipe.id).unwrap();
        assert_eq!(out.recipe.status, RecipeStatus::Published);

        let out = engine.unpublish(&owner, recipe.id).unwrap();
        assert_eq!(out.recipe.status, RecipeStatus::Draft);
    }

    #[test]
    fn submit_is_owner_only() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");

        let err = engine.submit(&Identity::user("u2"), recipe.id).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let err = engine.submit(&Identity::Anonymous, recipe.id).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated(_)));

        let got = engine
            .get_recipe(&Identity::user("u1"), recipe.id)
            .unwrap();
        assert_eq!(got.status, RecipeStatus::Draft);
    }

    #[test]
    fn approve_requires_admin_and_pending_review() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        let owner = Identity::user("u1");
        let admin = Identity::admin("a1");

        // Wrong state: 409.
        let err = engine.approve(&admin, recipe.id).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition(_)));

        engine.submit(&owner, recipe.id).unwrap();
        engine.process_pending_checks(10).unwrap();

        // Wrong actor: 403, status unchanged.
        let err = engine.approve(&owner, recipe.id).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let got = engine.get_recipe(&owner, recipe.id).unwrap();
        assert_eq!(got.status, RecipeStatus::PendingReview);

        let out = engine.approve(&admin, recipe.id).unwrap();
        assert_eq!(out.recipe.status, RecipeStatus::Published);
    }

    #[test]
    fn reject_returns_to_draft_with_reason() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        engine.submit(&Identity::user("u1"), recipe.id).unwrap();
        engine.process_pending_checks(10).unwrap();

        let out = engine
            .reject(
                &Identity::admin("a1"),
                recipe.id,
                Some("needs a photo".into()),
            )
            .unwrap();
        assert_eq!(out.recipe.status, RecipeStatus::Draft);
        assert_eq!(out.reason.as_deref(), Some("needs a photo"));
    }

    #[test]
    fn unpublish_by_owner_or_admin_only() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        let owner = Identity::user("u1");
        let admin = Identity::admin("a1");

        engine.submit(&owner, recipe.id).unwrap();
        engine.process_pending_checks(10).unwrap();
        engine.approve(&admin, recipe.id).unwrap();

        let err = engine
            .unpublish(&Identity::user("u2"), recipe.id)
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let out = engine.unpublish(&admin, recipe.id).unwrap();
        assert_eq!(out.recipe.status, RecipeStatus::Draft);
    }

    #[test]
    fn failed_checks_return_to_draft() {
        let engine = make_engine();
        let recipe = engine
            .create_recipe(
                &Identity::user("u1"),
                CreateRecipeRequest {
                    title: "Impossible".into(),
                    calories: Some(-10.0),
                    protein_g: None,
                    fat_g: None,
                    carbs_g: None,
                },
            )
            .unwrap();

        engine.submit(&Identity::user("u1"), recipe.id).unwrap();
        assert_eq!(engine.process_pending_checks(10).unwrap(), 1);

        let got = engine
            .get_recipe(&Identity::user("u1"), recipe.id)
            .unwrap();
        assert_eq!(got.status, RecipeStatus::Draft);
    }

    #[test]
    fn missing_recipe_is_not_found() {
        let engine = make_engine();
        let err = engine.submit(&Identity::user("u1"), 9999).unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn second_submit_observes_committed_status() {
        let engine = make_engine();
        let recipe = make_recipe(&engine, "u1", "Ramen");
        let owner = Identity::user("u1");

        // A racing submit already committed DRAFT -> PROCESSING.
        engine
            .store()
            .cas_status(
                recipe.id,
                RecipeStatus::Draft,
                RecipeStatus::Processing,
                &now_rfc3339(),
            )
            .unwrap();

        // The loser is evaluated against the committed PROCESSING status,
        // which has no submit transition: 409, nothing changes.
        let err = engine.submit(&owner, recipe.id).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition(_)));

        let got = engine.get_recipe(&owner, recipe.id).unwrap();
        assert_eq!(got.status, RecipeStatus::Processing);
    }
}
