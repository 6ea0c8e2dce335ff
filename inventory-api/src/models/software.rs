use chrono::{NaiveDate, NaiveDateTime};
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::choices::LicenseType;
use crate::models::Vendor;
use crate::policy::LicenseStatus;
use crate::schema::software;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = software)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Software {
    pub id: i32,
    pub name: String,
    pub version: String,
    pub vendor_id: Option<i32>,
    pub license_type: LicenseType,
    pub license_key: String,
    pub license_expiry: Option<NaiveDate>,
    pub seats: i32,
    pub used_seats: i32,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub notes: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Software {
    pub fn reference(&self) -> SoftwareRef {
        SoftwareRef { id: self.id, name: self.name.clone(), version: self.version.clone() }
    }
}

#[derive(Insertable)]
#[diesel(table_name = software)]
pub struct NewSoftware {
    pub name: String,
    pub version: String,
    pub vendor_id: Option<i32>,
    pub license_type: LicenseType,
    pub license_key: String,
    pub license_expiry: Option<NaiveDate>,
    pub seats: i32,
    pub used_seats: i32,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub notes: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Writable software columns. `used_seats` is owned by installations.
#[derive(AsChangeset)]
#[diesel(table_name = software)]
#[diesel(treat_none_as_null = true)]
pub struct SoftwareChanges {
    pub name: String,
    pub version: String,
    pub vendor_id: Option<i32>,
    pub license_type: LicenseType,
    pub license_key: String,
    pub license_expiry: Option<NaiveDate>,
    pub seats: i32,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub notes: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Deserialize, Serialize, TS, Debug, Clone, PartialEq)]
#[serde(default)]
#[ts(export)]
pub struct SoftwareInput {
    pub name: String,
    pub version: String,
    pub vendor_id: Option<i32>,
    pub license_type: LicenseType,
    pub license_key: String,
    #[ts(type = "string | null")]
    pub license_expiry: Option<NaiveDate>,
    pub seats: i32,
    #[ts(type = "string | null")]
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub notes: String,
}

impl Default for SoftwareInput {
    fn default() -> Self {
        SoftwareInput {
            name: String::new(),
            version: String::new(),
            vendor_id: None,
            license_type: LicenseType::default(),
            license_key: String::new(),
            license_expiry: None,
            seats: 1,
            purchase_date: None,
            purchase_price: None,
            notes: String::new(),
        }
    }
}

impl From<&Software> for SoftwareInput {
    fn from(sw: &Software) -> Self {
        SoftwareInput {
            name: sw.name.clone(),
            version: sw.version.clone(),
            vendor_id: sw.vendor_id,
            license_type: sw.license_type,
            license_key: sw.license_key.clone(),
            license_expiry: sw.license_expiry,
            seats: sw.seats,
            purchase_date: sw.purchase_date,
            purchase_price: sw.purchase_price,
            notes: sw.notes.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, TS, Debug, Clone, PartialEq)]
#[ts(export)]
pub struct SoftwareRef {
    pub id: i32,
    pub name: String,
    pub version: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SoftwareView {
    pub id: i32,
    pub name: String,
    pub version: String,
    pub vendor: Option<Vendor>,
    pub vendor_id: Option<i32>,
    pub license_type: LicenseType,
    pub license_key: String,
    pub license_expiry: Option<NaiveDate>,
    pub seats: i32,
    pub used_seats: i32,
    pub available_seats: i32,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub notes: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub license_status: LicenseStatus,
}
