//! Field checks run before every create and update.
//!
//! The checks here need only the submitted values. Checks that need the
//! store (uniqueness, referenced rows) live next to the repository code and
//! add to the same [`FieldErrors`] before [`finish`] turns them into a result.

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{FieldErrors, InventoryError};
use crate::models::{
    AuditInput, AuditItemInput, CategoryInput, DeviceWrite, LocationInput, MaintenanceInput,
    SoftwareInput, Specialization, VendorInput,
};

pub const REQUIRED: &str = "This field is required.";
pub const ASSET_TAG_REQUIRED: &str = "Asset tag is required.";
pub const ASSET_TAG_IN_USE: &str = "This asset tag is already in use.";
pub const WARRANTY_BEFORE_PURCHASE: &str = "Warranty expiry date cannot be before purchase date.";
pub const LICENSE_BEFORE_PURCHASE: &str = "License expiry date cannot be before purchase date.";
pub const PERFORMED_BEFORE_SCHEDULED: &str = "Performed date cannot be before scheduled date.";
pub const SEATS_AT_LEAST_ONE: &str = "Number of seats must be at least 1.";
pub const INVALID_MAC: &str = "Please enter a valid MAC address (e.g., 00:11:22:33:44:55)";
pub const INVALID_EMAIL: &str = "Please enter a valid email address.";
pub const INVALID_IP: &str = "Enter a valid IPv4 or IPv6 address.";
pub const SPECIFICATIONS_NOT_OBJECT: &str = "Specifications must be a JSON object.";
pub const NOT_NEGATIVE: &str = "Ensure this value is greater than or equal to 0.";

pub const ASSET_TAG_MAX: usize = 50;
pub const SHORT_TEXT_MAX: usize = 100;
pub const NAME_MAX: usize = 200;

static MAC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9A-Fa-f]{2}[:-]){5}([0-9A-Fa-f]{2})$").unwrap());
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

pub fn is_valid_mac(value: &str) -> bool {
    MAC_RE.is_match(value)
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

fn max_length_message(max: usize) -> String {
    format!("Ensure this field has no more than {} characters.", max)
}

pub fn check_required(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, REQUIRED);
    }
}

pub fn check_max_len(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(field, max_length_message(max));
    }
}

/// Blank MAC and email values are allowed; anything else must be well formed.
pub fn check_mac(errors: &mut FieldErrors, field: &str, value: &str) {
    if !value.is_empty() && !is_valid_mac(value) {
        errors.add(field, INVALID_MAC);
    }
}

pub fn check_email(errors: &mut FieldErrors, field: &str, value: &str) {
    if !value.is_empty() && !is_valid_email(value) {
        errors.add(field, INVALID_EMAIL);
    }
}

pub fn check_ip(errors: &mut FieldErrors, field: &str, value: Option<&str>) {
    if let Some(ip) = value {
        if ip.parse::<IpAddr>().is_err() {
            errors.add(field, INVALID_IP);
        }
    }
}

fn check_not_negative(errors: &mut FieldErrors, field: &str, value: Option<f64>) {
    if value.is_some_and(|v| v < 0.0) {
        errors.add(field, NOT_NEGATIVE);
    }
}

/// Money is kept to cents.
pub fn round_money(value: Option<f64>) -> Option<f64> {
    value.map(|v| (v * 100.0).round() / 100.0)
}

/// Blank strings submitted for optional text columns are stored as NULL.
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub fn device_errors(write: &DeviceWrite) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let base = &write.base;

    if base.asset_tag.trim().is_empty() {
        errors.add("asset_tag", ASSET_TAG_REQUIRED);
    } else {
        check_max_len(&mut errors, "asset_tag", &base.asset_tag, ASSET_TAG_MAX);
    }
    check_required(&mut errors, "model", &base.model);
    check_max_len(&mut errors, "model", &base.model, SHORT_TEXT_MAX);
    check_max_len(&mut errors, "serial_number", &base.serial_number, SHORT_TEXT_MAX);
    if base.category_id.is_none() {
        errors.add("category_id", REQUIRED);
    }
    if let (Some(purchase), Some(expiry)) = (base.purchase_date, base.warranty_expiry) {
        if expiry < purchase {
            errors.add("warranty_expiry", WARRANTY_BEFORE_PURCHASE);
        }
    }
    check_not_negative(&mut errors, "purchase_price", base.purchase_price);
    if !matches!(base.specifications, Value::Object(_) | Value::Null) {
        errors.add("specifications", SPECIFICATIONS_NOT_OBJECT);
    }

    match &write.specialization {
        Some(Specialization::Network(net)) => {
            check_mac(&mut errors, "mac_address", &net.mac_address);
            check_ip(&mut errors, "ip_address", net.ip_address.as_deref());
            check_ip(&mut errors, "management_ip", net.management_ip.as_deref());
            check_max_len(&mut errors, "hostname", &net.hostname, SHORT_TEXT_MAX);
            check_max_len(&mut errors, "network_segment", &net.network_segment, SHORT_TEXT_MAX);
        }
        Some(Specialization::Computer(pc)) => {
            check_mac(&mut errors, "mac_address", &pc.mac_address);
            check_ip(&mut errors, "ip_address", pc.ip_address.as_deref());
            check_max_len(&mut errors, "hostname", &pc.hostname, SHORT_TEXT_MAX);
            check_max_len(&mut errors, "operating_system", &pc.operating_system, SHORT_TEXT_MAX);
            if pc.memory_gb.is_some_and(|m| m < 0) {
                errors.add("memory_gb", NOT_NEGATIVE);
            }
            if pc.storage_gb.is_some_and(|s| s < 0) {
                errors.add("storage_gb", NOT_NEGATIVE);
            }
        }
        Some(Specialization::Peripheral(_)) | None => {}
    }
    errors
}

/// `used_seats` is the current seat usage (zero for a new record).
pub fn software_errors(input: &SoftwareInput, used_seats: i32) -> FieldErrors {
    let mut errors = FieldErrors::new();
    check_required(&mut errors, "name", &input.name);
    check_max_len(&mut errors, "name", &input.name, NAME_MAX);
    check_max_len(&mut errors, "version", &input.version, 50);
    if input.seats < 1 {
        errors.add("seats", SEATS_AT_LEAST_ONE);
    } else if input.seats < used_seats {
        errors.add(
            "seats",
            format!("Number of seats cannot be less than seats in use ({}).", used_seats),
        );
    }
    if let (Some(purchase), Some(expiry)) = (input.purchase_date, input.license_expiry) {
        if expiry < purchase {
            errors.add("license_expiry", LICENSE_BEFORE_PURCHASE);
        }
    }
    check_not_negative(&mut errors, "purchase_price", input.purchase_price);
    errors
}

pub fn maintenance_errors(input: &MaintenanceInput) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if input.device_id.is_none() {
        errors.add("device_id", REQUIRED);
    }
    check_required(&mut errors, "description", &input.description);
    if let (Some(scheduled), Some(performed)) = (input.scheduled_date, input.performed_date) {
        if performed < scheduled {
            errors.add("performed_date", PERFORMED_BEFORE_SCHEDULED);
        }
    }
    check_not_negative(&mut errors, "cost", input.cost);
    errors
}

pub fn audit_errors(input: &AuditInput) -> FieldErrors {
    let mut errors = FieldErrors::new();
    check_required(&mut errors, "title", &input.title);
    check_max_len(&mut errors, "title", &input.title, NAME_MAX);
    errors
}

pub fn audit_item_errors(input: &AuditItemInput) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if input.device_id.is_none() {
        errors.add("device_id", REQUIRED);
    }
    errors
}

pub fn category_errors(input: &CategoryInput) -> FieldErrors {
    let mut errors = FieldErrors::new();
    check_required(&mut errors, "name", &input.name);
    check_max_len(&mut errors, "name", &input.name, SHORT_TEXT_MAX);
    errors
}

pub fn location_errors(input: &LocationInput) -> FieldErrors {
    let mut errors = FieldErrors::new();
    check_required(&mut errors, "name", &input.name);
    check_max_len(&mut errors, "name", &input.name, SHORT_TEXT_MAX);
    errors
}

pub fn vendor_errors(input: &VendorInput) -> FieldErrors {
    let mut errors = FieldErrors::new();
    check_required(&mut errors, "name", &input.name);
    check_max_len(&mut errors, "name", &input.name, NAME_MAX);
    check_email(&mut errors, "email", &input.email);
    errors
}

/// A lone asset-tag clash is a conflict; anything else is a validation
/// failure carrying every message.
pub fn finish(errors: FieldErrors) -> Result<(), InventoryError> {
    if errors.is_only("asset_tag", ASSET_TAG_IN_USE) {
        return Err(InventoryError::Conflict {
            field: "asset_tag".to_string(),
            message: ASSET_TAG_IN_USE.to_string(),
        });
    }
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::models::{Computer, DeviceInput, NetworkDevice};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn laptop() -> DeviceInput {
        DeviceInput {
            asset_tag: "LAP-001".into(),
            model: "Latitude 7440".into(),
            category_id: Some(1),
            ..Default::default()
        }
    }

    #[test]
    fn mac_addresses() {
        assert!(is_valid_mac("00:11:22:33:44:55"));
        assert!(is_valid_mac("aa-bb-cc-dd-ee-ff"));
        assert!(!is_valid_mac("00:11:22:33:44"));
        assert!(!is_valid_mac("00:11:22:33:44:GG"));
    }

    #[test]
    fn emails() {
        assert!(is_valid_email("ops@example.com"));
        assert!(!is_valid_email("ops@example"));
        assert!(!is_valid_email("not an email"));
    }

    #[test]
    fn device_checks_accumulate() {
        let mut input = laptop();
        input.asset_tag = "  ".into();
        input.purchase_date = Some(date(2025, 1, 10));
        input.warranty_expiry = Some(date(2024, 1, 10));
        input.specifications = json!(["not", "an", "object"]);
        let write = DeviceWrite {
            base: input,
            specialization: Some(Specialization::Network(NetworkDevice {
                mac_address: "zz".into(),
                ip_address: Some("10.0.0.300".into()),
                ..Default::default()
            })),
        };

        let errors = device_errors(&write);
        assert_eq!(errors.get("asset_tag"), Some(&[ASSET_TAG_REQUIRED.to_string()][..]));
        let warranty = errors.get("warranty_expiry");
        assert_eq!(warranty, Some(&[WARRANTY_BEFORE_PURCHASE.to_string()][..]));
        assert!(errors.contains("specifications"));
        assert!(errors.contains("mac_address"));
        assert!(errors.contains("ip_address"));
    }

    #[test]
    fn warranty_on_purchase_day_is_fine() {
        let mut input = laptop();
        input.purchase_date = Some(date(2025, 1, 10));
        input.warranty_expiry = Some(date(2025, 1, 10));
        assert!(device_errors(&DeviceWrite::plain(input)).is_empty());
    }

    #[test]
    fn long_asset_tag_is_rejected() {
        let mut input = laptop();
        input.asset_tag = "X".repeat(51);
        let errors = device_errors(&DeviceWrite::plain(input));
        assert_eq!(
            errors.get("asset_tag"),
            Some(&["Ensure this field has no more than 50 characters.".to_string()][..])
        );
    }

    #[test]
    fn computer_sizes_cannot_be_negative() {
        let write = DeviceWrite {
            base: laptop(),
            specialization: Some(Specialization::Computer(Computer {
                memory_gb: Some(-1),
                ..Default::default()
            })),
        };
        assert!(device_errors(&write).contains("memory_gb"));
    }

    #[test]
    fn seat_rules() {
        let mut input = SoftwareInput { name: "Office".into(), seats: 0, ..Default::default() };
        let errors = software_errors(&input, 0);
        assert_eq!(errors.get("seats"), Some(&[SEATS_AT_LEAST_ONE.to_string()][..]));

        input.seats = 2;
        assert_eq!(
            software_errors(&input, 3).get("seats"),
            Some(&["Number of seats cannot be less than seats in use (3).".to_string()][..])
        );
        assert!(software_errors(&input, 2).is_empty());
    }

    #[test]
    fn maintenance_date_order() {
        let at = |d| date(2025, 2, d).and_hms_opt(9, 0, 0).unwrap();
        let input = MaintenanceInput {
            device_id: Some(1),
            description: "Fan swap".into(),
            scheduled_date: Some(at(10)),
            performed_date: Some(at(9)),
            ..Default::default()
        };
        assert_eq!(
            maintenance_errors(&input).get("performed_date"),
            Some(&[PERFORMED_BEFORE_SCHEDULED.to_string()][..])
        );
    }

    #[test]
    fn lone_asset_tag_clash_is_a_conflict() {
        let clash = FieldErrors::single("asset_tag", ASSET_TAG_IN_USE);
        assert!(matches!(finish(clash), Err(InventoryError::Conflict { .. })));

        let mut mixed = FieldErrors::single("asset_tag", ASSET_TAG_IN_USE);
        mixed.add("model", REQUIRED);
        assert!(matches!(finish(mixed), Err(InventoryError::Invalid(_))));

        assert!(finish(FieldErrors::new()).is_ok());
    }

    #[test]
    fn money_rounds_to_cents() {
        assert_eq!(round_money(Some(10.126)), Some(10.13));
        assert_eq!(round_money(Some(19.994)), Some(19.99));
        assert_eq!(round_money(None), None);
    }
}
