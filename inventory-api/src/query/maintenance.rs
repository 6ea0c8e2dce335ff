//! Maintenance record filters, search and ordering.

use chrono::NaiveDateTime;
use diesel::dsl::not;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use diesel::sqlite::Sqlite;
use rocket::form::FromForm;

use super::{FormDate, OrderKey, contains_pattern};
use crate::choices::MaintenanceType;
use crate::policy::MaintenancePredicate;
use crate::schema::maintenance_records as mr;

pub const ORDERING_FIELDS: &[&str] = &["scheduled_date", "performed_date", "created_at"];
pub const DEFAULT_ORDERING: &[OrderKey] = &[
    OrderKey { field: "performed_date", descending: true },
    OrderKey { field: "scheduled_date", descending: true },
];

#[derive(FromForm, Debug, Default, Clone, PartialEq)]
pub struct MaintenanceFilter {
    pub device: Vec<i32>,
    pub maintenance_type: Option<MaintenanceType>,
    pub performed_by: Vec<i32>,
    pub vendor: Vec<i32>,
    pub scheduled_date_from: Option<FormDate>,
    pub scheduled_date_to: Option<FormDate>,
    pub performed_date_from: Option<FormDate>,
    pub performed_date_to: Option<FormDate>,
    pub cost_min: Option<f64>,
    pub cost_max: Option<f64>,
    pub pending: Option<bool>,
    pub overdue: Option<bool>,
    pub completed: Option<bool>,
}

impl MaintenanceFilter {
    pub fn only(predicate: MaintenancePredicate) -> Self {
        Self::with(predicate, true)
    }

    pub fn with(predicate: MaintenancePredicate, wanted: bool) -> Self {
        let mut filter = <MaintenanceFilter as Default>::default();
        match predicate {
            MaintenancePredicate::Pending => filter.pending = Some(wanted),
            MaintenancePredicate::Overdue => filter.overdue = Some(wanted),
            MaintenancePredicate::Completed => filter.completed = Some(wanted),
        }
        filter
    }

    fn predicates(&self) -> Vec<(MaintenancePredicate, bool)> {
        [
            (MaintenancePredicate::Pending, self.pending),
            (MaintenancePredicate::Overdue, self.overdue),
            (MaintenancePredicate::Completed, self.completed),
        ]
        .into_iter()
        .filter_map(|(predicate, wanted)| wanted.map(|w| (predicate, w)))
        .collect()
    }
}

pub type MaintenanceExpr = Box<dyn BoxableExpression<mr::table, Sqlite, SqlType = Bool>>;

pub fn predicate_sql(predicate: MaintenancePredicate, now: NaiveDateTime) -> MaintenanceExpr {
    match predicate {
        MaintenancePredicate::Pending => Box::new(mr::performed_date.is_null()),
        MaintenancePredicate::Overdue => Box::new(
            mr::performed_date
                .is_null()
                .and(mr::scheduled_date.is_not_null())
                .and(mr::scheduled_date.assume_not_null().lt(now)),
        ),
        MaintenancePredicate::Completed => Box::new(mr::performed_date.is_not_null()),
    }
}

/// Date ranges compare whole days: `_to` includes the named day.
fn day_start(date: chrono::NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

fn next_day_start(date: chrono::NaiveDate) -> NaiveDateTime {
    day_start(date) + chrono::Duration::days(1)
}

pub fn filtered(
    filter: &MaintenanceFilter,
    search: Option<&str>,
    now: NaiveDateTime,
) -> mr::BoxedQuery<'static, Sqlite> {
    let mut query = mr::table.into_boxed();

    if !filter.device.is_empty() {
        query = query.filter(mr::device_id.eq_any(filter.device.clone()));
    }
    if let Some(kind) = filter.maintenance_type {
        query = query.filter(mr::maintenance_type.eq(kind));
    }
    if !filter.performed_by.is_empty() {
        query = query.filter(mr::performed_by_id.eq_any(filter.performed_by.clone()));
    }
    if !filter.vendor.is_empty() {
        query = query.filter(mr::vendor_id.eq_any(filter.vendor.clone()));
    }
    if let Some(FormDate(from)) = filter.scheduled_date_from {
        query = query.filter(mr::scheduled_date.ge(day_start(from)));
    }
    if let Some(FormDate(to)) = filter.scheduled_date_to {
        query = query.filter(mr::scheduled_date.lt(next_day_start(to)));
    }
    if let Some(FormDate(from)) = filter.performed_date_from {
        query = query.filter(mr::performed_date.ge(day_start(from)));
    }
    if let Some(FormDate(to)) = filter.performed_date_to {
        query = query.filter(mr::performed_date.lt(next_day_start(to)));
    }
    if let Some(min) = filter.cost_min {
        query = query.filter(mr::cost.ge(min));
    }
    if let Some(max) = filter.cost_max {
        query = query.filter(mr::cost.le(max));
    }
    for (predicate, wanted) in filter.predicates() {
        let expr = predicate_sql(predicate, now);
        query = if wanted { query.filter(expr) } else { query.filter(not(expr)) };
    }
    if let Some(term) = search {
        let pattern = contains_pattern(term);
        query = query.filter(
            mr::description
                .like(pattern.clone())
                .escape('\\')
                .or(mr::parts_used.like(pattern.clone()).escape('\\'))
                .or(mr::notes.like(pattern).escape('\\')),
        );
    }
    query
}

pub fn ordered(
    mut query: mr::BoxedQuery<'static, Sqlite>,
    keys: &[OrderKey],
) -> mr::BoxedQuery<'static, Sqlite> {
    for key in keys {
        query = match (key.field, key.descending) {
            ("scheduled_date", false) => query.then_order_by(mr::scheduled_date.asc()),
            ("scheduled_date", true) => query.then_order_by(mr::scheduled_date.desc()),
            ("performed_date", false) => query.then_order_by(mr::performed_date.asc()),
            ("performed_date", true) => query.then_order_by(mr::performed_date.desc()),
            ("created_at", false) => query.then_order_by(mr::created_at.asc()),
            ("created_at", true) => query.then_order_by(mr::created_at.desc()),
            _ => query,
        };
    }
    query.then_order_by(mr::id.desc())
}
