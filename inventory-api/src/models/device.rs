use chrono::{NaiveDate, NaiveDateTime};
use diesel::{AsChangeset, Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

use crate::choices::{DeviceCondition, DeviceKind, DeviceStatus};
use crate::models::{Category, Computer, Location, NetworkDevice, Peripheral, UserSummary, Vendor};
use crate::policy::{MaintenanceDue, WarrantyStatus};
use crate::schema::devices;

/// A row of the `devices` table. Specialization fields live in side tables
/// keyed by `device_id`; `kind` says which one (if any) applies.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = devices)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Device {
    pub id: i32,
    pub kind: DeviceKind,
    pub asset_tag: String,
    pub serial_number: String,
    pub model: String,
    pub category_id: i32,
    pub vendor_id: Option<i32>,
    pub status: DeviceStatus,
    pub condition: DeviceCondition,
    pub location_id: Option<i32>,
    pub assigned_to_id: Option<i32>,
    pub specifications: String, // JSON object text
    pub purchase_date: Option<NaiveDate>,
    pub warranty_expiry: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub notes: String,
    pub image: Option<String>,
    pub last_maintenance: Option<NaiveDateTime>,
    pub next_maintenance: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Device {
    /// Parsed specifications; anything that is not a JSON object reads as empty.
    pub fn specifications_map(&self) -> Map<String, Value> {
        match serde_json::from_str::<Value>(&self.specifications) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    pub fn reference(&self) -> DeviceRef {
        DeviceRef {
            id: self.id,
            kind: self.kind,
            asset_tag: self.asset_tag.clone(),
            model: self.model.clone(),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = devices)]
pub struct NewDevice {
    pub kind: DeviceKind,
    pub asset_tag: String,
    pub serial_number: String,
    pub model: String,
    pub category_id: i32,
    pub vendor_id: Option<i32>,
    pub status: DeviceStatus,
    pub condition: DeviceCondition,
    pub location_id: Option<i32>,
    pub assigned_to_id: Option<i32>,
    pub specifications: String,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_expiry: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub notes: String,
    pub image: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Writable columns of a device. `None` clears nullable columns.
#[derive(AsChangeset)]
#[diesel(table_name = devices)]
#[diesel(treat_none_as_null = true)]
pub struct DeviceChanges {
    pub asset_tag: String,
    pub serial_number: String,
    pub model: String,
    pub category_id: i32,
    pub vendor_id: Option<i32>,
    pub status: DeviceStatus,
    pub condition: DeviceCondition,
    pub location_id: Option<i32>,
    pub assigned_to_id: Option<i32>,
    pub specifications: String,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_expiry: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub notes: String,
    pub image: Option<String>,
    pub updated_at: NaiveDateTime,
}

/// Writable device fields as accepted by the API.
///
/// Missing keys take their defaults, so a `PUT` body only needs the required
/// fields (`asset_tag`, `model`, `category_id`).
#[derive(Deserialize, Serialize, TS, Debug, Clone, Default, PartialEq)]
#[serde(default)]
#[ts(export)]
pub struct DeviceInput {
    pub asset_tag: String,
    pub serial_number: String,
    pub model: String,
    pub category_id: Option<i32>,
    pub vendor_id: Option<i32>,
    pub status: DeviceStatus,
    pub condition: DeviceCondition,
    pub location_id: Option<i32>,
    pub assigned_to_id: Option<i32>,
    #[ts(type = "Record<string, unknown>")]
    pub specifications: Value,
    #[ts(type = "string | null")]
    pub purchase_date: Option<NaiveDate>,
    #[ts(type = "string | null")]
    pub warranty_expiry: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub notes: String,
    pub image: Option<String>,
}

impl From<&Device> for DeviceInput {
    fn from(device: &Device) -> Self {
        DeviceInput {
            asset_tag: device.asset_tag.clone(),
            serial_number: device.serial_number.clone(),
            model: device.model.clone(),
            category_id: Some(device.category_id),
            vendor_id: device.vendor_id,
            status: device.status,
            condition: device.condition,
            location_id: device.location_id,
            assigned_to_id: device.assigned_to_id,
            specifications: Value::Object(device.specifications_map()),
            purchase_date: device.purchase_date,
            warranty_expiry: device.warranty_expiry,
            purchase_price: device.purchase_price,
            notes: device.notes.clone(),
            image: device.image.clone(),
        }
    }
}

/// Side-table fields of a specialized device.
#[derive(Debug, Clone, PartialEq)]
pub enum Specialization {
    Network(NetworkDevice),
    Computer(Computer),
    Peripheral(Peripheral),
}

impl Specialization {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Specialization::Network(_) => DeviceKind::Network,
            Specialization::Computer(_) => DeviceKind::Computer,
            Specialization::Peripheral(_) => DeviceKind::Peripheral,
        }
    }

    pub fn mac_address(&self) -> Option<&str> {
        match self {
            Specialization::Network(n) => Some(n.mac_address.as_str()),
            Specialization::Computer(c) => Some(c.mac_address.as_str()),
            Specialization::Peripheral(_) => None,
        }
    }

    pub(crate) fn with_device_id(mut self, id: i32) -> Self {
        match &mut self {
            Specialization::Network(n) => n.device_id = id,
            Specialization::Computer(c) => c.device_id = id,
            Specialization::Peripheral(p) => p.device_id = id,
        }
        self
    }
}

/// A device together with its specialization row, if it has one.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    pub device: Device,
    pub specialization: Option<Specialization>,
}

/// The complete write for one device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceWrite {
    pub base: DeviceInput,
    pub specialization: Option<Specialization>,
}

impl DeviceWrite {
    pub fn plain(base: DeviceInput) -> Self {
        DeviceWrite { base, specialization: None }
    }

    pub fn kind(&self) -> DeviceKind {
        self.specialization.as_ref().map(Specialization::kind).unwrap_or(DeviceKind::Device)
    }
}

/// The four REST collections over devices.
///
/// `devices` sees every device regardless of kind; the specialized
/// collections see only their own kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCollection {
    Devices,
    NetworkDevices,
    Computers,
    Peripherals,
}

impl DeviceCollection {
    pub const ALL: [DeviceCollection; 4] = [
        DeviceCollection::Devices,
        DeviceCollection::NetworkDevices,
        DeviceCollection::Computers,
        DeviceCollection::Peripherals,
    ];

    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "devices" => Some(DeviceCollection::Devices),
            "network-devices" => Some(DeviceCollection::NetworkDevices),
            "computers" => Some(DeviceCollection::Computers),
            "peripherals" => Some(DeviceCollection::Peripherals),
            _ => None,
        }
    }

    pub fn segment(&self) -> &'static str {
        match self {
            DeviceCollection::Devices => "devices",
            DeviceCollection::NetworkDevices => "network-devices",
            DeviceCollection::Computers => "computers",
            DeviceCollection::Peripherals => "peripherals",
        }
    }

    /// `None` for the generic collection.
    pub fn kind(&self) -> Option<DeviceKind> {
        match self {
            DeviceCollection::Devices => None,
            DeviceCollection::NetworkDevices => Some(DeviceKind::Network),
            DeviceCollection::Computers => Some(DeviceKind::Computer),
            DeviceCollection::Peripherals => Some(DeviceKind::Peripheral),
        }
    }

    /// Model name used in change events.
    pub fn model_name(&self) -> &'static str {
        match self {
            DeviceCollection::Devices => "Device",
            DeviceCollection::NetworkDevices => "NetworkDevice",
            DeviceCollection::Computers => "Computer",
            DeviceCollection::Peripherals => "Peripheral",
        }
    }

    pub fn admits(&self, kind: DeviceKind) -> bool {
        self.kind().is_none_or(|k| k == kind)
    }
}

/// Compact device reference used inside other records.
#[derive(Serialize, Deserialize, TS, Debug, Clone, PartialEq)]
#[ts(export)]
pub struct DeviceRef {
    pub id: i32,
    pub kind: DeviceKind,
    pub asset_tag: String,
    pub model: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PeripheralView {
    #[serde(flatten)]
    pub peripheral: Peripheral,
    pub connected_to: Option<DeviceRef>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SpecializationView {
    Network(NetworkDevice),
    Computer(Computer),
    Peripheral(PeripheralView),
}

/// Device as returned by the API: references nested, derived state computed,
/// specialization fields flattened in.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DeviceView {
    pub id: i32,
    pub kind: DeviceKind,
    pub asset_tag: String,
    pub serial_number: String,
    pub model: String,
    pub category: Option<Category>,
    pub category_id: i32,
    pub vendor: Option<Vendor>,
    pub vendor_id: Option<i32>,
    pub status: DeviceStatus,
    pub condition: DeviceCondition,
    pub location: Option<Location>,
    pub location_id: Option<i32>,
    pub assigned_to: Option<UserSummary>,
    pub assigned_to_id: Option<i32>,
    pub specifications: Map<String, Value>,
    pub purchase_date: Option<NaiveDate>,
    pub warranty_expiry: Option<NaiveDate>,
    pub purchase_price: Option<f64>,
    pub notes: String,
    pub image: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub last_maintenance: Option<NaiveDateTime>,
    pub next_maintenance: Option<NaiveDateTime>,
    pub warranty_status: WarrantyStatus,
    pub maintenance_status: MaintenanceDue,
    #[serde(flatten)]
    pub specialization: Option<SpecializationView>,
}
