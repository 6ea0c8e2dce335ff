//! Table rows for listings.
//!
//! Each row is a pure function of an API view, so the same view and clock
//! always produce the same row. Badges and status cells carry a [`Tone`]
//! (a Bootstrap-style colour token) next to their text.

use serde::Serialize;

use crate::choices::{
    ComputerType, DeviceCondition, DeviceStatus, LicenseType, MaintenanceType, PeripheralType,
};
use crate::models::{DeviceView, MaintenanceView, SoftwareView, SpecializationView};
use crate::policy::{LOW_SEAT_MARGIN, LicenseStatus, MaintenanceDue, WarrantyStatus, WorkflowStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Primary,
    Secondary,
    Success,
    Info,
    Warning,
    Danger,
    Dark,
    Light,
    Muted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub text: String,
    pub tone: Tone,
}

impl Cell {
    fn new(text: impl Into<String>, tone: Tone) -> Self {
        Cell { text: text.into(), tone }
    }
}

pub fn status_badge(status: DeviceStatus) -> Cell {
    let tone = match status {
        DeviceStatus::Active => Tone::Success,
        DeviceStatus::Inactive => Tone::Secondary,
        DeviceStatus::Maintenance => Tone::Warning,
        DeviceStatus::Retired => Tone::Danger,
        DeviceStatus::Lost => Tone::Dark,
    };
    Cell::new(status.label(), tone)
}

pub fn condition_badge(condition: DeviceCondition) -> Cell {
    let tone = match condition {
        DeviceCondition::Excellent => Tone::Success,
        DeviceCondition::Good => Tone::Info,
        DeviceCondition::Fair => Tone::Warning,
        DeviceCondition::Poor => Tone::Danger,
        DeviceCondition::Broken => Tone::Dark,
    };
    Cell::new(condition.label(), tone)
}

pub fn license_type_badge(license_type: LicenseType) -> Cell {
    let tone = match license_type {
        LicenseType::Perpetual => Tone::Success,
        LicenseType::Subscription => Tone::Info,
        LicenseType::Trial => Tone::Warning,
        LicenseType::OpenSource => Tone::Secondary,
    };
    Cell::new(license_type.label(), tone)
}

pub fn maintenance_type_badge(maintenance_type: MaintenanceType) -> Cell {
    let tone = match maintenance_type {
        MaintenanceType::Preventive => Tone::Success,
        MaintenanceType::Corrective => Tone::Danger,
        MaintenanceType::Upgrade => Tone::Info,
        MaintenanceType::Inspection => Tone::Warning,
    };
    Cell::new(maintenance_type.label(), tone)
}

pub fn computer_type_badge(computer_type: ComputerType) -> Cell {
    let tone = match computer_type {
        ComputerType::Desktop => Tone::Primary,
        ComputerType::Laptop => Tone::Info,
        ComputerType::Server => Tone::Danger,
        ComputerType::Workstation => Tone::Warning,
        ComputerType::ThinClient => Tone::Secondary,
    };
    Cell::new(computer_type.label(), tone)
}

pub fn peripheral_type_badge(peripheral_type: PeripheralType) -> Cell {
    let tone = match peripheral_type {
        PeripheralType::Monitor => Tone::Primary,
        PeripheralType::Keyboard => Tone::Secondary,
        PeripheralType::Mouse => Tone::Info,
        PeripheralType::Printer => Tone::Warning,
        PeripheralType::Scanner => Tone::Success,
        PeripheralType::Speaker => Tone::Danger,
        PeripheralType::Headset => Tone::Dark,
        PeripheralType::Webcam => Tone::Light,
        PeripheralType::Other => Tone::Muted,
    };
    Cell::new(peripheral_type.label(), tone)
}

pub fn warranty_cell(status: WarrantyStatus) -> Cell {
    match status {
        WarrantyStatus::UnderWarranty => Cell::new("Under Warranty", Tone::Success),
        WarrantyStatus::Expired => Cell::new("Expired", Tone::Danger),
        WarrantyStatus::NoWarranty => Cell::new("No Warranty", Tone::Muted),
    }
}

pub fn maintenance_cell(due: MaintenanceDue) -> Cell {
    match due {
        MaintenanceDue::NeedsMaintenance => Cell::new("Needs Maintenance", Tone::Warning),
        MaintenanceDue::Ok => Cell::new("OK", Tone::Success),
    }
}

pub fn license_cell(status: LicenseStatus) -> Cell {
    match status {
        LicenseStatus::Expired => Cell::new("Expired", Tone::Danger),
        LicenseStatus::Active => Cell::new("Active", Tone::Success),
        LicenseStatus::NoExpiry => Cell::new("No Expiry", Tone::Muted),
    }
}

pub fn seats_cell(available: i32) -> Cell {
    if available <= 0 {
        Cell::new(format!("{} (Full)", available), Tone::Danger)
    } else if available <= LOW_SEAT_MARGIN {
        Cell::new(available.to_string(), Tone::Warning)
    } else {
        Cell::new(available.to_string(), Tone::Success)
    }
}

pub fn workflow_cell(status: WorkflowStatus) -> Cell {
    match status {
        WorkflowStatus::Completed => Cell::new("Completed", Tone::Success),
        WorkflowStatus::Overdue => Cell::new("Overdue", Tone::Danger),
        WorkflowStatus::Scheduled => Cell::new("Scheduled", Tone::Info),
        WorkflowStatus::Pending => Cell::new("Pending", Tone::Secondary),
    }
}

/// `$1,234.50`, or `-` when there is no amount.
pub fn money(amount: Option<f64>) -> String {
    let Some(amount) = amount else {
        return "-".to_string();
    };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, cents)
}

fn or_dash(value: Option<String>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or_else(|| "-".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRow {
    pub id: i32,
    pub asset_tag: String,
    pub model: String,
    pub category: String,
    pub status: Cell,
    pub condition: Cell,
    pub location: String,
    pub assigned_to: String,
    pub warranty: Cell,
    pub maintenance: Cell,
    /// Specialization columns, in display order.
    pub extra: Vec<(String, Cell)>,
}

impl DeviceRow {
    pub const HEADERS: [&'static str; 9] = [
        "Asset Tag",
        "Model",
        "Category",
        "Status",
        "Condition",
        "Location",
        "Assigned To",
        "Warranty",
        "Maintenance",
    ];

    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![
            self.asset_tag.clone(),
            self.model.clone(),
            self.category.clone(),
            self.status.text.clone(),
            self.condition.text.clone(),
            self.location.clone(),
            self.assigned_to.clone(),
            self.warranty.text.clone(),
            self.maintenance.text.clone(),
        ];
        cells.extend(self.extra.iter().map(|(_, cell)| cell.text.clone()));
        cells
    }
}

fn specialization_columns(view: &DeviceView) -> Vec<(String, Cell)> {
    let plain = |name: &str, text: String| (name.to_string(), Cell::new(text, Tone::Secondary));
    match &view.specialization {
        Some(SpecializationView::Network(n)) => vec![
            plain("IP Address", or_dash(n.ip_address.clone())),
            plain("Hostname", or_dash(Some(n.hostname.clone()))),
            (
                "Managed".to_string(),
                if n.is_managed {
                    Cell::new("Managed", Tone::Success)
                } else {
                    Cell::new("Unmanaged", Tone::Muted)
                },
            ),
        ],
        Some(SpecializationView::Computer(c)) => vec![
            ("Type".to_string(), computer_type_badge(c.computer_type)),
            plain("Operating System", or_dash(Some(c.operating_system.clone()))),
            plain("Hostname", or_dash(Some(c.hostname.clone()))),
        ],
        Some(SpecializationView::Peripheral(p)) => vec![
            ("Type".to_string(), peripheral_type_badge(p.peripheral.peripheral_type)),
            plain("Connected To", or_dash(p.connected_to.as_ref().map(|d| d.asset_tag.clone()))),
        ],
        None => Vec::new(),
    }
}

pub fn device_row(view: &DeviceView) -> DeviceRow {
    DeviceRow {
        id: view.id,
        asset_tag: view.asset_tag.clone(),
        model: view.model.clone(),
        category: or_dash(view.category.as_ref().map(|c| c.name.clone())),
        status: status_badge(view.status),
        condition: condition_badge(view.condition),
        location: or_dash(view.location.as_ref().map(|l| l.display_name())),
        assigned_to: or_dash(view.assigned_to.as_ref().map(|u| u.full_name.clone())),
        warranty: warranty_cell(view.warranty_status),
        maintenance: maintenance_cell(view.maintenance_status),
        extra: specialization_columns(view),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SoftwareRow {
    pub id: i32,
    pub name: String,
    pub version: String,
    pub vendor: String,
    pub license_type: Cell,
    pub seats: i32,
    pub used_seats: i32,
    pub available_seats: Cell,
    pub license_status: Cell,
}

impl SoftwareRow {
    pub const HEADERS: [&'static str; 8] =
        ["Name", "Version", "Vendor", "License Type", "Seats", "Used", "Available", "License"];

    pub fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.version.clone(),
            self.vendor.clone(),
            self.license_type.text.clone(),
            self.seats.to_string(),
            self.used_seats.to_string(),
            self.available_seats.text.clone(),
            self.license_status.text.clone(),
        ]
    }
}

pub fn software_row(view: &SoftwareView) -> SoftwareRow {
    SoftwareRow {
        id: view.id,
        name: view.name.clone(),
        version: or_dash(Some(view.version.clone())),
        vendor: or_dash(view.vendor.as_ref().map(|v| v.name.clone())),
        license_type: license_type_badge(view.license_type),
        seats: view.seats,
        used_seats: view.used_seats,
        available_seats: seats_cell(view.available_seats),
        license_status: license_cell(view.license_status),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaintenanceRow {
    pub id: i32,
    pub device: String,
    pub maintenance_type: Cell,
    pub performed_by: String,
    pub scheduled_date: String,
    pub performed_date: String,
    pub status: Cell,
    pub cost: String,
}

impl MaintenanceRow {
    pub const HEADERS: [&'static str; 7] =
        ["Device", "Type", "Performed By", "Scheduled", "Performed", "Status", "Cost"];

    pub fn cells(&self) -> Vec<String> {
        vec![
            self.device.clone(),
            self.maintenance_type.text.clone(),
            self.performed_by.clone(),
            self.scheduled_date.clone(),
            self.performed_date.clone(),
            self.status.text.clone(),
            self.cost.clone(),
        ]
    }
}

pub fn maintenance_row(view: &MaintenanceView) -> MaintenanceRow {
    let date = |d: Option<chrono::NaiveDateTime>| {
        or_dash(d.map(|d| d.format("%Y-%m-%d %H:%M").to_string()))
    };
    MaintenanceRow {
        id: view.id,
        device: view.device.asset_tag.clone(),
        maintenance_type: maintenance_type_badge(view.maintenance_type),
        performed_by: or_dash(view.performed_by.as_ref().map(|u| u.full_name.clone())),
        scheduled_date: date(view.scheduled_date),
        performed_date: date(view.performed_date),
        status: workflow_cell(view.workflow_status),
        cost: money(view.cost),
    }
}

/// Left-aligned plain-text table.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).chain([headers.len()]).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for (i, header) in headers.iter().enumerate() {
        widths[i] = widths[i].max(header.chars().count());
    }
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let mut out = String::new();
    out.push_str(&line(headers.to_vec()));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&line(rule.iter().map(String::as_str).collect()));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}
