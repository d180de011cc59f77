//! Category taxonomy.
//!
//! Categories form a forest through `parent_id`. The repository rejects any
//! parent change that would close a cycle, and refuses to delete a category
//! that still has children or products.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::{CategoryId, Slug};

use crate::db::query::define_fields;

/// A node in the category tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: Slug,
    /// Parent category, `None` for roots.
    pub parent_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Whether this category has no parent.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A category with its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryNode {
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

impl CategoryNode {
    /// Number of categories in this subtree, including the root.
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Self::size).sum::<usize>()
    }

    /// Visit the subtree depth-first, passing each category and its depth.
    pub fn walk<'a>(&'a self, depth: usize, visit: &mut impl FnMut(&'a Category, usize)) {
        visit(&self.category, depth);
        for child in &self.children {
            child.walk(depth + 1, visit);
        }
    }
}

/// Assemble a forest from a flat list of categories.
///
/// Roots and siblings keep the order of `categories`. Categories whose
/// parent is not in the list are treated as roots.
#[must_use]
pub fn build_tree(categories: Vec<Category>) -> Vec<CategoryNode> {
    let present: std::collections::HashSet<CategoryId> =
        categories.iter().map(|c| c.id.clone()).collect();

    let mut roots = Vec::new();
    let mut by_parent: HashMap<CategoryId, Vec<Category>> = HashMap::new();
    for category in categories {
        match &category.parent_id {
            Some(parent) if present.contains(parent) && *parent != category.id => {
                by_parent.entry(parent.clone()).or_default().push(category);
            }
            _ => roots.push(category),
        }
    }

    roots
        .into_iter()
        .map(|root| attach(root, &mut by_parent))
        .collect()
}

fn attach(category: Category, by_parent: &mut HashMap<CategoryId, Vec<Category>>) -> CategoryNode {
    let children = by_parent
        .remove(&category.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| attach(child, by_parent))
        .collect();
    CategoryNode { category, children }
}

/// Input for creating a category.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryInput {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<CategoryId>,
    pub name: String,
    pub slug: Slug,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
}

impl CreateCategoryInput {
    #[must_use]
    pub fn new(name: impl Into<String>, slug: Slug) -> Self {
        Self {
            id: None,
            name: name.into(),
            slug,
            parent_id: None,
        }
    }

    /// Place the new category under `parent`.
    #[must_use]
    pub fn with_parent(mut self, parent: CategoryId) -> Self {
        self.parent_id = Some(parent);
        self
    }
}

/// Input for updating a category.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub slug: Option<Slug>,
    pub parent_id: Option<Option<CategoryId>>,
}

define_fields! {
    /// Filterable columns of [`Category`].
    pub enum CategoryField {
        Id => ("id", Text),
        Name => ("name", Text),
        Slug => ("slug", Text),
        ParentId => ("parent_id", Text),
        CreatedAt => ("created_at", Timestamp),
        UpdatedAt => ("updated_at", Timestamp),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn category(id: &str, parent: Option<&str>) -> Category {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Category {
            id: CategoryId::new(id),
            name: id.to_owned(),
            slug: Slug::parse(id).unwrap(),
            parent_id: parent.map(CategoryId::new),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_build_tree_nests_children() {
        let tree = build_tree(vec![
            category("furniture", None),
            category("chairs", Some("furniture")),
            category("tables", Some("furniture")),
            category("stools", Some("chairs")),
            category("lighting", None),
        ]);

        assert_eq!(tree.len(), 2);
        let furniture = &tree[0];
        assert_eq!(furniture.category.id.as_str(), "furniture");
        assert_eq!(furniture.size(), 4);
        let names: Vec<_> = furniture
            .children
            .iter()
            .map(|n| n.category.id.as_str())
            .collect();
        assert_eq!(names, ["chairs", "tables"]);
        assert_eq!(furniture.children[0].children[0].category.id.as_str(), "stools");
        assert_eq!(tree[1].size(), 1);
    }

    #[test]
    fn test_build_tree_child_listed_before_parent() {
        let tree = build_tree(vec![
            category("chairs", Some("furniture")),
            category("furniture", None),
        ]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children[0].category.id.as_str(), "chairs");
    }

    #[test]
    fn test_build_tree_orphans_become_roots() {
        let tree = build_tree(vec![category("chairs", Some("missing"))]);
        assert_eq!(tree.len(), 1);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn test_walk_reports_depth() {
        let tree = build_tree(vec![
            category("furniture", None),
            category("chairs", Some("furniture")),
        ]);
        let mut seen = Vec::new();
        tree[0].walk(0, &mut |c, depth| seen.push((c.id.as_str().to_owned(), depth)));
        assert_eq!(
            seen,
            [("furniture".to_owned(), 0), ("chairs".to_owned(), 1)]
        );
    }
}
