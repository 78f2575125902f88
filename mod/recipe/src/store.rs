use std::sync::Arc;

use cookery_core::{ListResult, ServiceError};
use cookery_sql::{Row, SQLError, SQLStore, Value};

use crate::model::{Comment, CreateRecipeRequest, Recipe, RecipeStats, RecipeStatus};

/// SQL schema for the engagement store.
///
/// All engagement rows hang off `recipes` with ON DELETE CASCADE, so
/// removing a recipe removes its comments, likes, favorites and views in
/// one statement. Counters are never stored — they are aggregated from
/// these rows at read time.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS recipes (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id    TEXT NOT NULL,
    title       TEXT NOT NULL,
    calories    REAL,
    protein_g   REAL,
    fat_g       REAL,
    carbs_g     REAL,
    status      TEXT NOT NULL DEFAULT 'DRAFT',
    create_at   TEXT NOT NULL,
    update_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_recipes_owner ON recipes(owner_id);
CREATE INDEX IF NOT EXISTS idx_recipes_status ON recipes(status);

CREATE TABLE IF NOT EXISTS comments (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    recipe_id   INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    author_id   TEXT NOT NULL,
    parent_id   INTEGER REFERENCES comments(id) ON DELETE CASCADE,
    content     TEXT NOT NULL,
    deleted     INTEGER NOT NULL DEFAULT 0,
    create_at   TEXT NOT NULL,
    update_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_comments_recipe ON comments(recipe_id, create_at);

CREATE TABLE IF NOT EXISTS likes (
    recipe_id   INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL,
    create_at   TEXT NOT NULL,
    PRIMARY KEY (recipe_id, user_id)
);

CREATE TABLE IF NOT EXISTS favorites (
    recipe_id   INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    user_id     TEXT NOT NULL,
    create_at   TEXT NOT NULL,
    PRIMARY KEY (recipe_id, user_id)
);

CREATE TABLE IF NOT EXISTS views (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    recipe_id   INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
    user_id     TEXT,
    ip          TEXT NOT NULL,
    viewer_key  TEXT NOT NULL,
    counted     INTEGER NOT NULL,
    create_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_views_dedup ON views(recipe_id, viewer_key, counted, create_at);
";

/// Which of the two toggle tables an operation targets.
///
/// Both have the same composite-key shape; the enum keeps table names out
/// of caller-supplied strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleKind {
    Like,
    Favorite,
}

impl ToggleKind {
    fn table(&self) -> &'static str {
        match self {
            Self::Like => "likes",
            Self::Favorite => "favorites",
        }
    }
}

/// Persistent storage for recipes and their engagement rows.
pub struct EngagementStore {
    db: Arc<dyn SQLStore>,
}

/// Map storage-layer failures onto service errors: lock contention and
/// lost connections are transient (503), everything else is a bug (500).
fn storage_err(e: SQLError) -> ServiceError {
    match e {
        SQLError::Busy(m) | SQLError::Connection(m) => ServiceError::StorageUnavailable(m),
        SQLError::Query(m) | SQLError::Execution(m) => ServiceError::Internal(m),
    }
}

/// Run a storage closure, retrying once if the database was busy.
fn retry_busy<T>(mut f: impl FnMut() -> Result<T, SQLError>) -> Result<T, ServiceError> {
    match f() {
        Err(e) if e.is_busy() => f().map_err(storage_err),
        other => other.map_err(storage_err),
    }
}

impl EngagementStore {
    /// Create a new EngagementStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        db.exec(SCHEMA, &[])
            .map_err(|e| ServiceError::Internal(format!("recipe schema init: {e}")))?;
        Ok(Self { db })
    }

    // -----------------------------------------------------------------------
    // Recipes
    // -----------------------------------------------------------------------

    /// Insert a new recipe in DRAFT and return it with its fresh id.
    pub fn insert_recipe(
        &self,
        owner_id: &str,
        req: &CreateRecipeRequest,
        now: &str,
    ) -> Result<Recipe, ServiceError> {
        let id = self
            .db
            .insert(
                "INSERT INTO recipes \
                 (owner_id, title, calories, protein_g, fat_g, carbs_g, status, create_at, update_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                &[
                    Value::Text(owner_id.to_string()),
                    Value::Text(req.title.clone()),
                    opt_real(req.calories),
                    opt_real(req.protein_g),
                    opt_real(req.fat_g),
                    opt_real(req.carbs_g),
                    Value::Text(RecipeStatus::Draft.as_str().to_string()),
                    Value::Text(now.to_string()),
                ],
            )
            .map_err(storage_err)?;

        self.get_recipe(id)
    }

    /// Get a recipe by id, regardless of visibility (callers filter).
    pub fn get_recipe(&self, id: i64) -> Result<Recipe, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT * FROM recipes WHERE id = ?1",
                &[Value::Integer(id)],
            )
            .map_err(storage_err)?;

        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("recipe {id} not found")))?;

        row_to_recipe(row)
    }

    /// Update a recipe's content fields (title + nutrition). Status is
    /// written only through [`EngagementStore::cas_status`].
    pub fn update_recipe(&self, recipe: &Recipe) -> Result<(), ServiceError> {
        let affected = self
            .db
            .exec(
                "UPDATE recipes SET title = ?1, calories = ?2, protein_g = ?3, \
                 fat_g = ?4, carbs_g = ?5, update_at = ?6 WHERE id = ?7",
                &[
                    Value::Text(recipe.title.clone()),
                    opt_real(recipe.calories),
                    opt_real(recipe.protein_g),
                    opt_real(recipe.fat_g),
                    opt_real(recipe.carbs_g),
                    Value::Text(recipe.update_at.clone()),
                    Value::Integer(recipe.id),
                ],
            )
            .map_err(storage_err)?;

        if affected == 0 {
            return Err(ServiceError::NotFound(format!("recipe {} not found", recipe.id)));
        }
        Ok(())
    }

    /// Delete a recipe; comments, likes, favorites and views cascade.
    pub fn delete_recipe(&self, id: i64) -> Result<(), ServiceError> {
        let affected = self
            .db
            .exec("DELETE FROM recipes WHERE id = ?1", &[Value::Integer(id)])
            .map_err(storage_err)?;

        if affected == 0 {
            return Err(ServiceError::NotFound(format!("recipe {id} not found")));
        }
        Ok(())
    }

    /// List recipes visible to the given caller, newest first.
    ///
    /// The visibility rule is part of the query, not a post-filter: a
    /// non-admin sees PUBLISHED recipes plus their own in any status.
    pub fn list_recipes(
        &self,
        viewer: Option<&str>,
        admin: bool,
        limit: usize,
        offset: usize,
    ) -> Result<ListResult<Recipe>, ServiceError> {
        let (where_sql, mut params): (String, Vec<Value>) = if admin {
            (String::new(), vec![])
        } else if let Some(user) = viewer {
            (
                "WHERE (status = ?1 OR owner_id = ?2)".to_string(),
                vec![
                    Value::Text(RecipeStatus::Published.as_str().to_string()),
                    Value::Text(user.to_string()),
                ],
            )
        } else {
            (
                "WHERE status = ?1".to_string(),
                vec![Value::Text(RecipeStatus::Published.as_str().to_string())],
            )
        };

        let count_sql = format!("SELECT COUNT(*) as cnt FROM recipes {where_sql}");
        let count_rows = self.db.query(&count_sql, &params).map_err(storage_err)?;
        let total = count_rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0) as usize;

        let limit_idx = params.len() + 1;
        let offset_idx = params.len() + 2;
        params.push(Value::Integer(limit as i64));
        params.push(Value::Integer(offset as i64));

        let select_sql = format!(
            "SELECT * FROM recipes {where_sql} ORDER BY create_at DESC, id DESC \
             LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        );
        let rows = self.db.query(&select_sql, &params).map_err(storage_err)?;
        let items = rows.iter().map(row_to_recipe).collect::<Result<Vec<_>, _>>()?;

        Ok(ListResult { items, total })
    }

    /// Fetch recipes currently in the given status, oldest first.
    /// Used by the checks worker to drain PROCESSING recipes.
    pub fn recipes_in_status(
        &self,
        status: RecipeStatus,
        limit: usize,
    ) -> Result<Vec<Recipe>, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT * FROM recipes WHERE status = ?1 ORDER BY update_at ASC LIMIT ?2",
                &[
                    Value::Text(status.as_str().to_string()),
                    Value::Integer(limit as i64),
                ],
            )
            .map_err(storage_err)?;

        rows.iter().map(row_to_recipe).collect()
    }

    /// Atomically move a recipe from one status to another.
    ///
    /// Returns `true` if the row was updated, `false` if the recipe was
    /// missing or its status no longer matched `from`. This is the CAS
    /// that makes concurrent transition attempts observe each other: the
    /// loser's conditional UPDATE affects zero rows and the caller
    /// re-evaluates against a fresh read.
    pub fn cas_status(
        &self,
        id: i64,
        from: RecipeStatus,
        to: RecipeStatus,
        now: &str,
    ) -> Result<bool, ServiceError> {
        let affected = retry_busy(|| {
            self.db.exec(
                "UPDATE recipes SET status = ?1, update_at = ?2 WHERE id = ?3 AND status = ?4",
                &[
                    Value::Text(to.as_str().to_string()),
                    Value::Text(now.to_string()),
                    Value::Integer(id),
                    Value::Text(from.as_str().to_string()),
                ],
            )
        })?;

        Ok(affected > 0)
    }

    // -----------------------------------------------------------------------
    // Comments
    // -----------------------------------------------------------------------

    /// Insert a comment. The parent, once set here, is never updated.
    pub fn insert_comment(
        &self,
        recipe_id: i64,
        author_id: &str,
        parent_id: Option<i64>,
        content: &str,
        now: &str,
    ) -> Result<Comment, ServiceError> {
        let id = self
            .db
            .insert(
                "INSERT INTO comments \
                 (recipe_id, author_id, parent_id, content, deleted, create_at, update_at) \
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
                &[
                    Value::Integer(recipe_id),
                    Value::Text(author_id.to_string()),
                    match parent_id {
                        Some(p) => Value::Integer(p),
                        None => Value::Null,
                    },
                    Value::Text(content.to_string()),
                    Value::Text(now.to_string()),
                ],
            )
            .map_err(storage_err)?;

        self.get_comment(id)
    }

    /// Get a comment by id, tombstoned or not (callers decide).
    pub fn get_comment(&self, id: i64) -> Result<Comment, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT * FROM comments WHERE id = ?1",
                &[Value::Integer(id)],
            )
            .map_err(storage_err)?;

        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("comment {id} not found")))?;

        row_to_comment(row)
    }

    /// Replace a comment's content. `create_at` and `parent_id` never change.
    pub fn update_comment_content(
        &self,
        id: i64,
        content: &str,
        now: &str,
    ) -> Result<(), ServiceError> {
        let affected = self
            .db
            .exec(
                "UPDATE comments SET content = ?1, update_at = ?2 WHERE id = ?3 AND deleted = 0",
                &[
                    Value::Text(content.to_string()),
                    Value::Text(now.to_string()),
                    Value::Integer(id),
                ],
            )
            .map_err(storage_err)?;

        if affected == 0 {
            return Err(ServiceError::NotFound(format!("comment {id} not found")));
        }
        Ok(())
    }

    /// Soft-delete a comment: set the tombstone flag and blank the content.
    /// The row stays so reply threads keep their shape.
    pub fn tombstone_comment(&self, id: i64, now: &str) -> Result<(), ServiceError> {
        let affected = self
            .db
            .exec(
                "UPDATE comments SET deleted = 1, content = '', update_at = ?1 \
                 WHERE id = ?2 AND deleted = 0",
                &[Value::Text(now.to_string()), Value::Integer(id)],
            )
            .map_err(storage_err)?;

        if affected == 0 {
            return Err(ServiceError::NotFound(format!("comment {id} not found")));
        }
        Ok(())
    }

    /// All comments for a recipe, oldest first. Tombstones included —
    /// the tree assembly needs every node.
    pub fn comments_for_recipe(&self, recipe_id: i64) -> Result<Vec<Comment>, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT * FROM comments WHERE recipe_id = ?1 ORDER BY create_at ASC, id ASC",
                &[Value::Integer(recipe_id)],
            )
            .map_err(storage_err)?;

        rows.iter().map(row_to_comment).collect()
    }

    // -----------------------------------------------------------------------
    // Likes / favorites
    // -----------------------------------------------------------------------

    /// Toggle a like/favorite row for `(recipe_id, user_id)`.
    ///
    /// Returns `true` if the row now exists (toggled on). The DELETE and
    /// the INSERT OR IGNORE are each atomic against the composite primary
    /// key, so simultaneous toggles by different users cannot lose updates.
    pub fn toggle(
        &self,
        kind: ToggleKind,
        recipe_id: i64,
        user_id: &str,
        now: &str,
    ) -> Result<bool, ServiceError> {
        let table = kind.table();

        let removed = retry_busy(|| {
            self.db.exec(
                &format!("DELETE FROM {table} WHERE recipe_id = ?1 AND user_id = ?2"),
                &[Value::Integer(recipe_id), Value::Text(user_id.to_string())],
            )
        })?;
        if removed > 0 {
            return Ok(false);
        }

        // No row was present — insert one. OR IGNORE covers the race where
        // the same user toggles twice concurrently; either way the row
        // exists afterwards.
        retry_busy(|| {
            self.db.exec(
                &format!(
                    "INSERT OR IGNORE INTO {table} (recipe_id, user_id, create_at) \
                     VALUES (?1, ?2, ?3)"
                ),
                &[
                    Value::Integer(recipe_id),
                    Value::Text(user_id.to_string()),
                    Value::Text(now.to_string()),
                ],
            )
        })?;
        Ok(true)
    }

    /// Count distinct users currently holding a like/favorite on a recipe.
    pub fn count(&self, kind: ToggleKind, recipe_id: i64) -> Result<i64, ServiceError> {
        let rows = self
            .db
            .query(
                &format!(
                    "SELECT COUNT(*) as cnt FROM {} WHERE recipe_id = ?1",
                    kind.table()
                ),
                &[Value::Integer(recipe_id)],
            )
            .map_err(storage_err)?;

        Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0))
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// Append a view row. Every call writes a row; whether it counts
    /// toward popularity is decided inside the INSERT by checking for an
    /// earlier counted view from the same viewer after `cutoff`. Keeping
    /// the window check in the statement makes it atomic against
    /// concurrent views from the same viewer.
    pub fn insert_view(
        &self,
        recipe_id: i64,
        user_id: Option<&str>,
        ip: &str,
        viewer_key: &str,
        cutoff: &str,
        now: &str,
    ) -> Result<bool, ServiceError> {
        let id = retry_busy(|| {
            self.db.insert(
                "INSERT INTO views (recipe_id, user_id, ip, viewer_key, counted, create_at) \
                 VALUES (?1, ?2, ?3, ?4, \
                   NOT EXISTS (SELECT 1 FROM views \
                               WHERE recipe_id = ?1 AND viewer_key = ?4 \
                                 AND counted = 1 AND create_at > ?5), \
                   ?6)",
                &[
                    Value::Integer(recipe_id),
                    match user_id {
                        Some(u) => Value::Text(u.to_string()),
                        None => Value::Null,
                    },
                    Value::Text(ip.to_string()),
                    Value::Text(viewer_key.to_string()),
                    Value::Text(cutoff.to_string()),
                    Value::Text(now.to_string()),
                ],
            )
        })?;

        let rows = self
            .db
            .query(
                "SELECT counted FROM views WHERE id = ?1",
                &[Value::Integer(id)],
            )
            .map_err(storage_err)?;

        Ok(rows
            .first()
            .and_then(|r| r.get_i64("counted"))
            .unwrap_or(0)
            != 0)
    }

    /// Aggregate engagement counters for one recipe.
    pub fn stats(&self, recipe_id: i64) -> Result<RecipeStats, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT \
                   (SELECT COUNT(*) FROM likes WHERE recipe_id = ?1) as likes, \
                   (SELECT COUNT(*) FROM favorites WHERE recipe_id = ?1) as favorites, \
                   (SELECT COUNT(*) FROM views WHERE recipe_id = ?1) as views, \
                   (SELECT COUNT(*) FROM views WHERE recipe_id = ?1 AND counted = 1) as counted_views",
                &[Value::Integer(recipe_id)],
            )
            .map_err(storage_err)?;

        let row = rows
            .first()
            .ok_or_else(|| ServiceError::Internal("stats query returned no row".into()))?;

        Ok(RecipeStats {
            likes: row.get_i64("likes").unwrap_or(0),
            favorites: row.get_i64("favorites").unwrap_or(0),
            views: row.get_i64("views").unwrap_or(0),
            counted_views: row.get_i64("counted_views").unwrap_or(0),
        })
    }
}

fn opt_real(v: Option<f64>) -> Value {
    match v {
        Some(f) => Value::Real(f),
        None => Value::Null,
    }
}

fn row_to_recipe(row: &Row) -> Result<Recipe, ServiceError> {
    let status_str = row
        .get_str("status")
        .ok_or_else(|| ServiceError::Internal("missing status column".into()))?;
    let status = RecipeStatus::from_str(status_str)
        .ok_or_else(|| ServiceError::Internal(format!("bad recipe status: {status_str}")))?;

    Ok(Recipe {
        id: row
            .get_i64("id")
            .ok_or_else(|| ServiceError::Internal("missing id column".into()))?,
        owner_id: row.get_str("owner_id").unwrap_or_default().to_string(),
        title: row.get_str("title").unwrap_or_default().to_string(),
        calories: row.get_f64("calories"),
        protein_g: row.get_f64("protein_g"),
        fat_g: row.get_f64("fat_g"),
        carbs_g: row.get_f64("carbs_g"),
        status,
        create_at: row.get_str("create_at").unwrap_or_default().to_string(),
        update_at: row.get_str("update_at").unwrap_or_default().to_string(),
    })
}

fn row_to_comment(row: &Row) -> Result<Comment, ServiceError> {
    Ok(Comment {
        id: row
            .get_i64("id")
            .ok_or_else(|| ServiceError::Internal("missing id column".into()))?,
        recipe_id: row
            .get_i64("recipe_id")
            .ok_or_else(|| ServiceError::Internal("missing recipe_id column".into()))?,
        author_id: row.get_str("author_id").unwrap_or_default().to_string(),
        parent_id: row.get_i64("parent_id"),
        content: row.get_str("content").unwrap_or_default().to_string(),
        deleted: row.get_i64("deleted").unwrap_or(0) != 0,
        create_at: row.get_str("create_at").unwrap_or_default().to_string(),
        update_at: row.get_str("update_at").unwrap_or_default().to_string(),
    })
}
