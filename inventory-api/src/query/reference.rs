//! Search and ordering for categories, locations and vendors.
//!
//! These lists are small and carry a computed `device_count`, so they are
//! searched and sorted in memory after loading.

use std::cmp::Ordering;

use super::OrderKey;
use crate::models::{CategoryWithCount, LocationWithCount, VendorWithCount};

pub const ORDERING_FIELDS: &[&str] = &["name", "device_count"];
pub const DEFAULT_ORDERING: &[OrderKey] = &[OrderKey { field: "name", descending: false }];

pub trait ReferenceRow {
    fn name(&self) -> &str;
    fn device_count(&self) -> i64;
    fn search_fields(&self) -> Vec<&str>;
}

impl ReferenceRow for CategoryWithCount {
    fn name(&self) -> &str {
        &self.category.name
    }

    fn device_count(&self) -> i64 {
        self.device_count
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![&self.category.name, &self.category.description]
    }
}

impl ReferenceRow for LocationWithCount {
    fn name(&self) -> &str {
        &self.location.name
    }

    fn device_count(&self) -> i64 {
        self.device_count
    }

    fn search_fields(&self) -> Vec<&str> {
        let l = &self.location;
        vec![&l.name, &l.building, &l.room, &l.address]
    }
}

impl ReferenceRow for VendorWithCount {
    fn name(&self) -> &str {
        &self.vendor.name
    }

    fn device_count(&self) -> i64 {
        self.device_count
    }

    fn search_fields(&self) -> Vec<&str> {
        let v = &self.vendor;
        vec![&v.name, &v.contact_person, &v.email]
    }
}

/// ASCII case-insensitive substring match, the same folding SQLite's LIKE
/// applies.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_ascii_lowercase().contains(&needle.to_ascii_lowercase())
}

pub fn matches<T: ReferenceRow>(row: &T, term: &str) -> bool {
    row.search_fields().into_iter().any(|field| contains_ignore_case(field, term))
}

/// Sorts rows by `keys`. The sort is stable, so rows loaded in id order keep
/// that order among ties.
pub fn sort_rows<T: ReferenceRow>(rows: &mut [T], keys: &[OrderKey]) {
    rows.sort_by(|a, b| {
        for key in keys {
            let ord = match key.field {
                "name" => a.name().cmp(b.name()),
                "device_count" => a.device_count().cmp(&b.device_count()),
                _ => Ordering::Equal,
            };
            let ord = if key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Applies the optional search term and ordering to loaded rows.
pub fn search_and_sort<T: ReferenceRow>(
    rows: Vec<T>,
    search: Option<&str>,
    keys: &[OrderKey],
) -> Vec<T> {
    let mut rows: Vec<T> = match search {
        Some(term) => rows.into_iter().filter(|row| matches(row, term)).collect(),
        None => rows,
    };
    sort_rows(&mut rows, keys);
    rows
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::Category;
    use crate::query::parse_ordering;

    fn row(id: i32, name: &str, description: &str, count: i64) -> CategoryWithCount {
        let at = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        CategoryWithCount {
            category: Category {
                id,
                name: name.to_string(),
                description: description.to_string(),
                created_at: at,
                updated_at: at,
            },
            device_count: count,
        }
    }

    #[test]
    fn search_checks_every_field() {
        let rows = vec![row(1, "Laptops", "Portable", 3), row(2, "Monitors", "Displays", 1)];
        let found = search_and_sort(rows, Some("DISPLAY"), DEFAULT_ORDERING);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category.id, 2);
    }

    #[test]
    fn device_count_ordering_with_name_tiebreak() {
        let rows = vec![row(1, "b", "", 2), row(2, "a", "", 2), row(3, "c", "", 5)];
        let keys = parse_ordering(Some("-device_count,name"), ORDERING_FIELDS, DEFAULT_ORDERING);
        let sorted = search_and_sort(rows, None, &keys);
        let ids: Vec<i32> = sorted.iter().map(|r| r.category.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }
}
