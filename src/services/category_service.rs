//! Two-level category resolution and maintenance.

use chrono::NaiveDate;

use crate::domain::{PaymentCategory, MISSING_LABEL};
use crate::errors::CoreError;
use crate::storage::Database;

use super::CoreResult;

/// A root category together with its subcategories, the shape used by
/// selection dropdowns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    pub parent: PaymentCategory,
    pub children: Vec<PaymentCategory>,
}

pub struct CategoryService;

impl CategoryService {
    /// Resolves the grouping category: a subcategory maps to its parent, a
    /// root category (or an unresolvable id) maps to itself.
    pub fn parent_category_id(categories: &[PaymentCategory], category_id: u64) -> u64 {
        categories
            .iter()
            .find(|cat| cat.id == Some(category_id))
            .and_then(|cat| cat.parent_id)
            .unwrap_or(category_id)
    }

    /// Full display name of a category: `"Parent > Child"` for
    /// subcategories, the plain name for roots, and a sentinel when the id
    /// is missing or unresolvable.
    pub fn display_name(categories: &[PaymentCategory], category_id: Option<u64>) -> String {
        let Some(id) = category_id else {
            return MISSING_LABEL.to_string();
        };
        let Some(category) = categories.iter().find(|cat| cat.id == Some(id)) else {
            return MISSING_LABEL.to_string();
        };
        match category.parent_id {
            Some(parent_id) => match categories.iter().find(|cat| cat.id == Some(parent_id)) {
                Some(parent) => format!("{} > {}", parent.name, category.name),
                None => category.name.clone(),
            },
            None => category.name.clone(),
        }
    }

    /// Roots with their children, in stored order.
    pub fn grouped(categories: &[PaymentCategory]) -> Vec<CategoryGroup> {
        categories
            .iter()
            .filter(|cat| cat.is_root())
            .map(|parent| CategoryGroup {
                parent: parent.clone(),
                children: categories
                    .iter()
                    .filter(|cat| cat.parent_id == parent.id)
                    .cloned()
                    .collect(),
            })
            .collect()
    }

    /// Creates a category, rejecting blank names, duplicate names at the
    /// same level, and parents that are not existing root categories.
    pub fn create(
        db: &mut Database,
        name: &str,
        parent_id: Option<u64>,
        today: NaiveDate,
    ) -> CoreResult<PaymentCategory> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("category name is empty".into()));
        }
        if let Some(parent_id) = parent_id {
            let parent = db
                .payment_categories
                .get_by_id(parent_id)
                .map_err(|_| CoreError::CategoryNotFound(parent_id))?;
            if !parent.is_root() {
                return Err(CoreError::Validation(
                    "categories nest at most two levels".into(),
                ));
            }
        }
        let duplicate = db.payment_categories.iter().any(|cat| {
            cat.parent_id == parent_id && cat.name.eq_ignore_ascii_case(name)
        });
        if duplicate {
            return Err(CoreError::Validation(format!(
                "a category named `{name}` already exists at this level"
            )));
        }
        let category = match parent_id {
            Some(parent_id) => PaymentCategory::child(name, parent_id),
            None => PaymentCategory::root(name),
        };
        let stored = db.payment_categories.add(category, today)?;
        tracing::debug!(id = stored.id, name, "category created");
        Ok(stored)
    }

    pub fn rename(db: &mut Database, id: u64, name: &str, today: NaiveDate) -> CoreResult<PaymentCategory> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation("category name is empty".into()));
        }
        db.payment_categories
            .get_by_id(id)
            .map_err(|_| CoreError::CategoryNotFound(id))?;
        Ok(db
            .payment_categories
            .update(id, today, |cat| cat.name = name.to_string())?)
    }

    /// Deletes a category. Roots with subcategories are rejected; payments
    /// referencing the deleted id fall back to the display sentinel.
    pub fn delete(db: &mut Database, id: u64) -> CoreResult<()> {
        db.payment_categories
            .get_by_id(id)
            .map_err(|_| CoreError::CategoryNotFound(id))?;
        let has_children = db
            .payment_categories
            .iter()
            .any(|cat| cat.parent_id == Some(id));
        if has_children {
            return Err(CoreError::Validation(
                "category still has subcategories".into(),
            ));
        }
        db.payment_categories.delete(id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn db_with_tree() -> (Database, u64, u64) {
        let mut db = Database::default();
        let root = CategoryService::create(&mut db, "Home", None, today()).unwrap();
        let child =
            CategoryService::create(&mut db, "Utilities", root.id, today()).unwrap();
        (db, root.id.unwrap(), child.id.unwrap())
    }

    #[test]
    fn display_name_composes_parent_and_child() {
        let (db, root, child) = db_with_tree();
        let categories = db.payment_categories.get_all();
        assert_eq!(
            CategoryService::display_name(&categories, Some(child)),
            "Home > Utilities"
        );
        assert_eq!(CategoryService::display_name(&categories, Some(root)), "Home");
        assert_eq!(CategoryService::display_name(&categories, Some(99)), "—");
        assert_eq!(CategoryService::display_name(&categories, None), "—");
    }

    #[test]
    fn roots_are_their_own_parent_for_grouping() {
        let (db, root, child) = db_with_tree();
        let categories = db.payment_categories.get_all();
        assert_eq!(CategoryService::parent_category_id(&categories, child), root);
        assert_eq!(CategoryService::parent_category_id(&categories, root), root);
        assert_eq!(CategoryService::parent_category_id(&categories, 99), 99);
    }

    #[test]
    fn duplicate_names_are_rejected_per_level() {
        let (mut db, root, _child) = db_with_tree();
        let err = CategoryService::create(&mut db, "utilities", Some(root), today());
        assert!(matches!(err, Err(CoreError::Validation(_))));
        // Same name on another level is fine.
        assert!(CategoryService::create(&mut db, "Utilities", None, today()).is_ok());
    }

    #[test]
    fn nesting_deeper_than_two_levels_is_rejected() {
        let (mut db, _root, child) = db_with_tree();
        let err = CategoryService::create(&mut db, "Power", Some(child), today());
        assert!(matches!(err, Err(CoreError::Validation(_))));
    }

    #[test]
    fn deleting_a_root_with_children_is_rejected() {
        let (mut db, root, child) = db_with_tree();
        assert!(matches!(
            CategoryService::delete(&mut db, root),
            Err(CoreError::Validation(_))
        ));
        CategoryService::delete(&mut db, child).unwrap();
        CategoryService::delete(&mut db, root).unwrap();
    }

    #[test]
    fn grouped_collects_children_under_roots() {
        let (db, root, child) = db_with_tree();
        let groups = CategoryService::grouped(&db.payment_categories.get_all());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].parent.id, Some(root));
        assert_eq!(groups[0].children.len(), 1);
        assert_eq!(groups[0].children[0].id, Some(child));
    }
}
