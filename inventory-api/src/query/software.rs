//! Software filters, search and ordering.

use chrono::NaiveDateTime;
use diesel::dsl::not;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use diesel::sqlite::Sqlite;
use rocket::form::FromForm;

use super::{FormDate, OrderKey, contains_pattern};
use crate::choices::LicenseType;
use crate::policy::{LOW_SEAT_MARGIN, SoftwarePredicate, expiring_soon_horizon};
use crate::schema::software;

pub const ORDERING_FIELDS: &[&str] = &["name", "version", "purchase_date", "license_expiry"];
pub const DEFAULT_ORDERING: &[OrderKey] = &[OrderKey { field: "name", descending: false }];

#[derive(FromForm, Debug, Default, Clone, PartialEq)]
pub struct SoftwareFilter {
    pub name: Option<String>,
    pub version: Option<String>,
    pub license_type: Option<LicenseType>,
    pub vendor: Vec<i32>,
    pub license_expiry_from: Option<FormDate>,
    pub license_expiry_to: Option<FormDate>,
    pub seats_min: Option<i32>,
    pub seats_max: Option<i32>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub expiring_soon: Option<bool>,
    pub expired: Option<bool>,
    pub low_seats: Option<bool>,
}

impl SoftwareFilter {
    /// Filter selecting exactly the rows where `predicate` holds.
    pub fn only(predicate: SoftwarePredicate) -> Self {
        Self::with(predicate, true)
    }

    pub fn with(predicate: SoftwarePredicate, wanted: bool) -> Self {
        let mut filter = <SoftwareFilter as Default>::default();
        match predicate {
            SoftwarePredicate::ExpiringSoon => filter.expiring_soon = Some(wanted),
            SoftwarePredicate::Expired => filter.expired = Some(wanted),
            SoftwarePredicate::LowSeats => filter.low_seats = Some(wanted),
        }
        filter
    }

    fn predicates(&self) -> Vec<(SoftwarePredicate, bool)> {
        [
            (SoftwarePredicate::ExpiringSoon, self.expiring_soon),
            (SoftwarePredicate::Expired, self.expired),
            (SoftwarePredicate::LowSeats, self.low_seats),
        ]
        .into_iter()
        .filter_map(|(predicate, wanted)| wanted.map(|w| (predicate, w)))
        .collect()
    }
}

pub type SoftwareExpr = Box<dyn BoxableExpression<software::table, Sqlite, SqlType = Bool>>;

pub fn predicate_sql(predicate: SoftwarePredicate, now: NaiveDateTime) -> SoftwareExpr {
    let today = now.date();
    match predicate {
        SoftwarePredicate::ExpiringSoon => Box::new(
            software::license_expiry.is_not_null().and(
                software::license_expiry.assume_not_null().gt(today).and(
                    software::license_expiry
                        .assume_not_null()
                        .le(expiring_soon_horizon(today)),
                ),
            ),
        ),
        SoftwarePredicate::Expired => Box::new(
            software::license_expiry
                .is_not_null()
                .and(software::license_expiry.assume_not_null().lt(today)),
        ),
        SoftwarePredicate::LowSeats => {
            Box::new(software::used_seats.ge(software::seats - LOW_SEAT_MARGIN))
        }
    }
}

pub fn filtered(
    filter: &SoftwareFilter,
    search: Option<&str>,
    now: NaiveDateTime,
) -> software::BoxedQuery<'static, Sqlite> {
    let mut query = software::table.into_boxed();

    if let Some(name) = &filter.name {
        query = query.filter(software::name.like(contains_pattern(name)).escape('\\'));
    }
    if let Some(version) = &filter.version {
        query = query.filter(software::version.like(contains_pattern(version)).escape('\\'));
    }
    if let Some(license_type) = filter.license_type {
        query = query.filter(software::license_type.eq(license_type));
    }
    if !filter.vendor.is_empty() {
        query = query.filter(software::vendor_id.eq_any(filter.vendor.clone()));
    }
    if let Some(FormDate(from)) = filter.license_expiry_from {
        query = query.filter(software::license_expiry.ge(from));
    }
    if let Some(FormDate(to)) = filter.license_expiry_to {
        query = query.filter(software::license_expiry.le(to));
    }
    if let Some(min) = filter.seats_min {
        query = query.filter(software::seats.ge(min));
    }
    if let Some(max) = filter.seats_max {
        query = query.filter(software::seats.le(max));
    }
    if let Some(min) = filter.price_min {
        query = query.filter(software::purchase_price.ge(min));
    }
    if let Some(max) = filter.price_max {
        query = query.filter(software::purchase_price.le(max));
    }
    for (predicate, wanted) in filter.predicates() {
        let expr = predicate_sql(predicate, now);
        query = if wanted { query.filter(expr) } else { query.filter(not(expr)) };
    }
    if let Some(term) = search {
        let pattern = contains_pattern(term);
        query = query.filter(
            software::name
                .like(pattern.clone())
                .escape('\\')
                .or(software::version.like(pattern.clone()).escape('\\'))
                .or(software::license_key.like(pattern).escape('\\')),
        );
    }
    query
}

pub fn ordered(
    mut query: software::BoxedQuery<'static, Sqlite>,
    keys: &[OrderKey],
) -> software::BoxedQuery<'static, Sqlite> {
    for key in keys {
        query = match (key.field, key.descending) {
            ("name", false) => query.then_order_by(software::name.asc()),
            ("name", true) => query.then_order_by(software::name.desc()),
            ("version", false) => query.then_order_by(software::version.asc()),
            ("version", true) => query.then_order_by(software::version.desc()),
            ("purchase_date", false) => query.then_order_by(software::purchase_date.asc()),
            ("purchase_date", true) => query.then_order_by(software::purchase_date.desc()),
            ("license_expiry", false) => query.then_order_by(software::license_expiry.asc()),
            ("license_expiry", true) => query.then_order_by(software::license_expiry.desc()),
            _ => query,
        };
    }
    query.then_order_by(software::id.asc())
}
