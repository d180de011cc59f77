//! Category repository.
//!
//! Categories form a forest through `parent_id`. Parent changes are checked
//! for cycles inside the same transaction that applies them, and a category
//! with children or products cannot be deleted.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::instrument;

use catalog_core::{CategoryId, Slug};

use super::RepositoryError;
use super::query::{Filter, OrderBy, Query};
use super::table::{self, ChangeSet, Dependent, Reference, Table};
use super::validate;
use crate::models::{
    Category, CategoryField, CategoryNode, CreateCategoryInput, UpdateCategoryInput, build_tree,
};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for category queries.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CategoryRow {
    id: CategoryId,
    name: String,
    slug: Slug,
    parent_id: Option<CategoryId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            parent_id: row.parent_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Table for Category {
    const NAME: &'static str = "categories";
    const ENTITY: &'static str = "Category";
    const KEY: &'static [CategoryField] = &[CategoryField::Id];
    const REFERENCES: &'static [Reference] = &[Reference {
        column: "parent_id",
        table: "categories",
    }];
    const DEPENDENTS: &'static [Dependent] = &[
        Dependent {
            table: "categories",
            column: "parent_id",
        },
        Dependent {
            table: "products",
            column: "category_id",
        },
    ];

    type Field = CategoryField;
    type Key = CategoryId;
    type Row = CategoryRow;
}

/// Parent of `id`, or `None` for a root. `NotFound` if `id` does not exist.
async fn parent_of(
    conn: &mut SqliteConnection,
    id: &CategoryId,
) -> Result<Option<CategoryId>, RepositoryError> {
    sqlx::query_scalar::<_, Option<CategoryId>>(
        r#"SELECT "parent_id" FROM "categories" WHERE "id" = ?"#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| RepositoryError::not_found(Category::ENTITY, id))
}

/// Fail if `moved` appears on the ancestor chain starting at `parent`.
async fn check_acyclic(
    conn: &mut SqliteConnection,
    moved: &CategoryId,
    parent: &CategoryId,
) -> Result<(), RepositoryError> {
    let mut visited = HashSet::new();
    let mut current = Some(parent.clone());
    while let Some(id) = current {
        if id == *moved {
            return Err(RepositoryError::validation(
                Category::ENTITY,
                "parent_id",
                format!("moving {moved} under {parent} would create a cycle"),
            ));
        }
        if !visited.insert(id.clone()) {
            return Err(RepositoryError::DataCorruption(format!(
                "category {id} is part of an existing cycle"
            )));
        }
        current = parent_of(conn, &id).await?;
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    read_operations!(Category, CategoryField, CategoryId);

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::ConstraintViolation` if the slug is taken, or
    /// `RepositoryError::ForeignKeyViolation` if the parent does not exist.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create(&self, input: &CreateCategoryInput) -> Result<Category, RepositoryError> {
        validate::non_empty(Category::ENTITY, "name", &input.name)?;

        let id = input.id.clone().unwrap_or_else(CategoryId::generate);
        let mut changes = ChangeSet::new();
        changes
            .set(CategoryField::Id, id)
            .set(CategoryField::Name, input.name.as_str())
            .set(CategoryField::Slug, &input.slug)
            .set(CategoryField::ParentId, input.parent_id.clone());

        let mut tx = self.pool.begin().await?;
        let category = table::insert::<Category>(&mut tx, changes).await?;
        tx.commit().await?;

        tracing::info!(category_id = %category.id, "category created");
        Ok(category)
    }

    /// Update a category.
    ///
    /// A parent change is rejected with `RepositoryError::Validation` if the
    /// new parent is the category itself or one of its descendants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist,
    /// `RepositoryError::ConstraintViolation` if the new slug is taken, or
    /// `RepositoryError::ForeignKeyViolation` if the new parent does not exist.
    #[instrument(skip(self, input), fields(category_id = %id))]
    pub async fn update(
        &self,
        id: &CategoryId,
        input: &UpdateCategoryInput,
    ) -> Result<Category, RepositoryError> {
        validate::non_empty_opt(Category::ENTITY, "name", input.name.as_deref())?;
        if input.parent_id.as_ref().and_then(Option::as_ref) == Some(id) {
            return Err(RepositoryError::validation(
                Category::ENTITY,
                "parent_id",
                "a category cannot be its own parent",
            ));
        }

        let mut changes = ChangeSet::new();
        changes
            .set_opt(CategoryField::Name, input.name.clone())
            .set_opt(CategoryField::Slug, input.slug.clone())
            .set_opt(CategoryField::ParentId, input.parent_id.clone());

        let mut tx = self.pool.begin().await?;
        let category = table::update::<Category>(&mut tx, id, changes).await?;
        if let Some(Some(parent)) = &input.parent_id {
            check_acyclic(&mut tx, id, parent).await?;
        }
        tx.commit().await?;

        Ok(category)
    }

    /// Move a category under `parent`, or to the root when `None`.
    ///
    /// # Errors
    ///
    /// See [`CategoryRepository::update`].
    pub async fn move_to(
        &self,
        id: &CategoryId,
        parent: Option<CategoryId>,
    ) -> Result<Category, RepositoryError> {
        let input = UpdateCategoryInput {
            parent_id: Some(parent),
            ..UpdateCategoryInput::default()
        };
        self.update(id, &input).await
    }

    /// Get a category by its slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_slug(&self, slug: &Slug) -> Result<Option<Category>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        table::find_first::<Category>(&mut conn, Filter::new().eq(CategoryField::Slug, slug)).await
    }

    /// Direct children of a category, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_children(&self, id: &CategoryId) -> Result<Vec<Category>, RepositoryError> {
        self.find_many(
            &Query::new()
                .filter(Filter::new().eq(CategoryField::ParentId, id))
                .order_by(OrderBy::asc(CategoryField::Name)),
        )
        .await
    }

    /// Top-level categories, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_roots(&self) -> Result<Vec<Category>, RepositoryError> {
        self.find_many(
            &Query::new()
                .filter(Filter::new().is_null(CategoryField::ParentId))
                .order_by(OrderBy::asc(CategoryField::Name)),
        )
        .await
    }

    /// Every category below `id` at any depth, by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn list_descendants(
        &self,
        id: &CategoryId,
    ) -> Result<Vec<Category>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        parent_of(&mut conn, id).await?;

        let rows = sqlx::query_as::<_, CategoryRow>(
            r#"
            WITH RECURSIVE "subtree" ("id") AS (
                SELECT "id" FROM "categories" WHERE "parent_id" = ?
                UNION
                SELECT c."id" FROM "categories" c
                INNER JOIN "subtree" s ON c."parent_id" = s."id"
            )
            SELECT c.* FROM "categories" c
            WHERE c."id" IN (SELECT "id" FROM "subtree")
            ORDER BY c."name", c."id"
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Path from the root down to `id`, inclusive.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist, or
    /// `RepositoryError::DataCorruption` if its ancestor chain loops.
    pub async fn ancestors(&self, id: &CategoryId) -> Result<Vec<Category>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(id.clone());

        while let Some(next) = current {
            if !visited.insert(next.clone()) {
                return Err(RepositoryError::DataCorruption(format!(
                    "category {next} is part of an existing cycle"
                )));
            }
            let category = table::get_by_key::<Category>(&mut conn, &next).await?;
            current = category.parent_id.clone();
            path.push(category);
        }

        path.reverse();
        Ok(path)
    }

    /// The whole category forest, children sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tree(&self) -> Result<Vec<CategoryNode>, RepositoryError> {
        let categories = self
            .find_many(&Query::new().order_by(OrderBy::asc(CategoryField::Name)))
            .await?;
        Ok(build_tree(categories))
    }
}
