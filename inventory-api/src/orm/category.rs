use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::dsl::count_star;
use diesel::prelude::*;

use crate::error::InventoryError;
use crate::events::{ChangeEvent, ChangeSink};
use crate::models::{Category, CategoryInput, CategoryWithCount, NewCategory};
use crate::orm::db::{last_insert_id, transact};
use crate::schema::{categories, devices};
use crate::validation::category_errors;

fn device_counts(conn: &mut SqliteConnection) -> QueryResult<HashMap<i32, i64>> {
    let rows: Vec<(i32, i64)> = devices::table
        .group_by(devices::category_id)
        .select((devices::category_id, count_star()))
        .load(conn)?;
    Ok(rows.into_iter().collect())
}

/// All categories in id order, each with the number of devices in it.
pub fn list_categories(conn: &mut SqliteConnection) -> QueryResult<Vec<CategoryWithCount>> {
    let counts = device_counts(conn)?;
    let rows = categories::table
        .order(categories::id.asc())
        .select(Category::as_select())
        .load(conn)?;
    Ok(rows
        .into_iter()
        .map(|category| {
            let device_count = counts.get(&category.id).copied().unwrap_or(0);
            CategoryWithCount { category, device_count }
        })
        .collect())
}

pub fn get_category(
    conn: &mut SqliteConnection,
    id: i32,
) -> Result<CategoryWithCount, InventoryError> {
    let category = categories::table
        .find(id)
        .select(Category::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| InventoryError::not_found("Category"))?;
    let device_count = devices::table
        .filter(devices::category_id.eq(id))
        .count()
        .get_result(conn)?;
    Ok(CategoryWithCount { category, device_count })
}

pub fn get_category_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> QueryResult<Option<Category>> {
    categories::table
        .filter(categories::name.eq(name))
        .select(Category::as_select())
        .first(conn)
        .optional()
}

pub fn insert_category(
    conn: &mut SqliteConnection,
    input: CategoryInput,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<Category, InventoryError> {
    category_errors(&input).into_result()?;
    let category = transact(conn, |conn| {
        diesel::insert_into(categories::table)
            .values(&NewCategory {
                name: input.name.trim().to_string(),
                description: input.description,
                created_at: now,
                updated_at: now,
            })
            .execute(conn)?;
        let id = last_insert_id(conn)?;
        Ok(categories::table.find(id).select(Category::as_select()).first(conn)?)
    })?;
    sink.emit(ChangeEvent::created("Category", category.id));
    Ok(category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::orm::testing::{seed_category, seed_device, setup_test_db, test_now};

    #[test]
    fn counts_follow_devices() {
        let mut conn = setup_test_db();
        let laptops = seed_category(&mut conn, "Laptops");
        let empty = seed_category(&mut conn, "Empty");
        seed_device(&mut conn, "L-1", laptops.id);
        seed_device(&mut conn, "L-2", laptops.id);

        let all = list_categories(&mut conn).unwrap();
        let count_of = |id| all.iter().find(|c| c.category.id == id).unwrap().device_count;
        assert_eq!(count_of(laptops.id), 2);
        assert_eq!(count_of(empty.id), 0);
        assert_eq!(get_category(&mut conn, laptops.id).unwrap().device_count, 2);
    }

    #[test]
    fn duplicate_names_conflict() {
        let mut conn = setup_test_db();
        let sink = RecordingSink::new();
        let input = CategoryInput { name: "Phones".into(), description: String::new() };
        insert_category(&mut conn, input.clone(), test_now(), &sink).unwrap();
        let err = insert_category(&mut conn, input, test_now(), &sink).unwrap_err();
        assert!(matches!(err, InventoryError::Conflict { .. }));
        assert_eq!(sink.events(), vec![ChangeEvent::created("Category", 1)]);
    }

    #[test]
    fn missing_category_is_not_found() {
        let mut conn = setup_test_db();
        assert!(matches!(get_category(&mut conn, 99), Err(InventoryError::NotFound(_))));
    }
}
