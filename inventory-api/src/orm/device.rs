//! Device repository: the `devices` table plus its specialization side
//! tables.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde_json::Value;
use tracing::{debug, info};

use crate::choices::{DeviceKind, DeviceStatus};
use crate::error::{FieldErrors, InventoryError};
use crate::events::{ChangeEvent, ChangeSink};
use crate::models::{
    Category, Computer, Device, DeviceChanges, DeviceCollection, DeviceRecord, DeviceRef,
    DeviceView, DeviceWrite, Location, NetworkDevice, NewDevice, Peripheral, PeripheralView,
    Specialization, SpecializationView, User, Vendor,
};
use crate::orm::db::{last_insert_id, transact};
use crate::orm::{RefTable, check_reference};
use crate::policy::{DevicePredicate, maintenance_due, warranty_status};
use crate::query::device::{DeviceFilter, filtered, ordered, resolve_side_matches};
use crate::query::{OrderKey, Page, PageRequest};
use crate::schema::{
    categories, computers, devices, locations, network_devices, peripherals, software,
    software_installations, users, vendors,
};
use crate::validation::{
    ASSET_TAG_IN_USE, REQUIRED, SPECIFICATIONS_NOT_OBJECT, blank_to_none, device_errors, finish,
    round_money,
};

/// Change-event model name for a device of `kind`.
pub fn event_model(kind: DeviceKind) -> &'static str {
    match kind {
        DeviceKind::Device => "Device",
        DeviceKind::Network => "NetworkDevice",
        DeviceKind::Computer => "Computer",
        DeviceKind::Peripheral => "Peripheral",
    }
}

fn load_specialization(
    conn: &mut SqliteConnection,
    device: &Device,
) -> QueryResult<Option<Specialization>> {
    let id = device.id;
    Ok(match device.kind {
        DeviceKind::Device => None,
        DeviceKind::Network => network_devices::table
            .find(id)
            .select(NetworkDevice::as_select())
            .first(conn)
            .optional()?
            .map(Specialization::Network),
        DeviceKind::Computer => computers::table
            .find(id)
            .select(Computer::as_select())
            .first(conn)
            .optional()?
            .map(Specialization::Computer),
        DeviceKind::Peripheral => peripherals::table
            .find(id)
            .select(Peripheral::as_select())
            .first(conn)
            .optional()?
            .map(Specialization::Peripheral),
    })
}

/// The device with `id` as seen through `collection`. A device of another
/// kind is not found in a specialized collection.
pub fn get_device(
    conn: &mut SqliteConnection,
    collection: DeviceCollection,
    id: i32,
) -> Result<DeviceRecord, InventoryError> {
    let device = devices::table
        .find(id)
        .select(Device::as_select())
        .first(conn)
        .optional()?
        .filter(|d| collection.admits(d.kind))
        .ok_or_else(|| InventoryError::not_found(collection.model_name()))?;
    let specialization = load_specialization(conn, &device)?;
    Ok(DeviceRecord { device, specialization })
}

/// Everything a page of device views refers to, loaded in one pass.
#[derive(Default)]
struct Related {
    categories: HashMap<i32, Category>,
    vendors: HashMap<i32, Vendor>,
    locations: HashMap<i32, Location>,
    users: HashMap<i32, User>,
    networks: HashMap<i32, NetworkDevice>,
    computers: HashMap<i32, Computer>,
    peripherals: HashMap<i32, Peripheral>,
    connected: HashMap<i32, DeviceRef>,
}

fn ids_of(devices: &[Device], pick: impl Fn(&Device) -> Option<i32>) -> Vec<i32> {
    let mut ids: Vec<i32> = devices.iter().filter_map(pick).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn load_related(conn: &mut SqliteConnection, rows: &[Device]) -> QueryResult<Related> {
    let mut related = Related::default();
    if rows.is_empty() {
        return Ok(related);
    }

    let category_ids = ids_of(rows, |d| Some(d.category_id));
    for c in categories::table
        .filter(categories::id.eq_any(category_ids))
        .select(Category::as_select())
        .load(conn)?
    {
        related.categories.insert(c.id, c);
    }
    let vendor_ids = ids_of(rows, |d| d.vendor_id);
    for v in vendors::table
        .filter(vendors::id.eq_any(vendor_ids))
        .select(Vendor::as_select())
        .load(conn)?
    {
        related.vendors.insert(v.id, v);
    }
    let location_ids = ids_of(rows, |d| d.location_id);
    for l in locations::table
        .filter(locations::id.eq_any(location_ids))
        .select(Location::as_select())
        .load(conn)?
    {
        related.locations.insert(l.id, l);
    }
    let user_ids = ids_of(rows, |d| d.assigned_to_id);
    for u in users::table.filter(users::id.eq_any(user_ids)).select(User::as_select()).load(conn)? {
        related.users.insert(u.id, u);
    }

    let of_kind = |kind| ids_of(rows, |d| (d.kind == kind).then_some(d.id));
    for n in network_devices::table
        .filter(network_devices::device_id.eq_any(of_kind(DeviceKind::Network)))
        .select(NetworkDevice::as_select())
        .load(conn)?
    {
        related.networks.insert(n.device_id, n);
    }
    for c in computers::table
        .filter(computers::device_id.eq_any(of_kind(DeviceKind::Computer)))
        .select(Computer::as_select())
        .load(conn)?
    {
        related.computers.insert(c.device_id, c);
    }
    for p in peripherals::table
        .filter(peripherals::device_id.eq_any(of_kind(DeviceKind::Peripheral)))
        .select(Peripheral::as_select())
        .load(conn)?
    {
        related.peripherals.insert(p.device_id, p);
    }

    let mut connected_ids: Vec<i32> =
        related.peripherals.values().filter_map(|p| p.connected_to_id).collect();
    connected_ids.sort_unstable();
    connected_ids.dedup();
    for d in devices::table
        .filter(devices::id.eq_any(connected_ids))
        .select(Device::as_select())
        .load(conn)?
    {
        related.connected.insert(d.id, d.reference());
    }
    Ok(related)
}

fn assemble(device: Device, related: &Related, now: NaiveDateTime) -> DeviceView {
    let specialization = match device.kind {
        DeviceKind::Device => None,
        DeviceKind::Network => {
            related.networks.get(&device.id).cloned().map(SpecializationView::Network)
        }
        DeviceKind::Computer => {
            related.computers.get(&device.id).cloned().map(SpecializationView::Computer)
        }
        DeviceKind::Peripheral => related.peripherals.get(&device.id).cloned().map(|peripheral| {
            let connected_to =
                peripheral.connected_to_id.and_then(|id| related.connected.get(&id).cloned());
            SpecializationView::Peripheral(PeripheralView { peripheral, connected_to })
        }),
    };

    DeviceView {
        warranty_status: warranty_status(&device, now),
        maintenance_status: maintenance_due(&device, now),
        specifications: device.specifications_map(),
        category: related.categories.get(&device.category_id).cloned(),
        vendor: device.vendor_id.and_then(|id| related.vendors.get(&id).cloned()),
        location: device.location_id.and_then(|id| related.locations.get(&id).cloned()),
        assigned_to: device.assigned_to_id.and_then(|id| related.users.get(&id).map(User::summary)),
        id: device.id,
        kind: device.kind,
        asset_tag: device.asset_tag,
        serial_number: device.serial_number,
        model: device.model,
        category_id: device.category_id,
        vendor_id: device.vendor_id,
        status: device.status,
        condition: device.condition,
        location_id: device.location_id,
        assigned_to_id: device.assigned_to_id,
        purchase_date: device.purchase_date,
        warranty_expiry: device.warranty_expiry,
        purchase_price: device.purchase_price,
        notes: device.notes,
        image: device.image,
        created_at: device.created_at,
        updated_at: device.updated_at,
        last_maintenance: device.last_maintenance,
        next_maintenance: device.next_maintenance,
        specialization,
    }
}

/// API views for `rows`, in the same order.
pub fn device_views(
    conn: &mut SqliteConnection,
    rows: Vec<Device>,
    now: NaiveDateTime,
) -> QueryResult<Vec<DeviceView>> {
    let related = load_related(conn, &rows)?;
    Ok(rows.into_iter().map(|d| assemble(d, &related, now)).collect())
}

pub fn device_view(
    conn: &mut SqliteConnection,
    record: DeviceRecord,
    now: NaiveDateTime,
) -> Result<DeviceView, InventoryError> {
    device_views(conn, vec![record.device], now)?
        .pop()
        .ok_or_else(|| InventoryError::Internal("device view assembly produced nothing".into()))
}

/// One filtered, searched, ordered page of a device collection.
pub fn list_devices(
    conn: &mut SqliteConnection,
    collection: DeviceCollection,
    filter: &DeviceFilter,
    search: Option<&str>,
    ordering: &[OrderKey],
    page: &PageRequest,
    now: NaiveDateTime,
) -> Result<Page<DeviceView>, InventoryError> {
    let side = resolve_side_matches(conn, collection, filter, search)?;
    let total: i64 = filtered(collection, filter, search, &side, now).count().get_result(conn)?;
    page.check(total)?;

    let rows = ordered(filtered(collection, filter, search, &side, now), ordering)
        .limit(page.page_size)
        .offset(page.offset())
        .select(Device::as_select())
        .load(conn)?;
    debug!("{} page {} -> {} of {} devices", collection.segment(), page.page, rows.len(), total);
    Ok(Page::new(device_views(conn, rows, now)?, total))
}

/// Every device in `collection` where `predicate` holds, in asset tag order.
pub fn devices_where(
    conn: &mut SqliteConnection,
    collection: DeviceCollection,
    predicate: DevicePredicate,
    now: NaiveDateTime,
) -> Result<Vec<DeviceView>, InventoryError> {
    let filter = match predicate {
        DevicePredicate::NeedsMaintenance => {
            DeviceFilter { needs_maintenance: Some(true), ..Default::default() }
        }
        DevicePredicate::UnderWarranty => {
            DeviceFilter { under_warranty: Some(true), ..Default::default() }
        }
    };
    let side = resolve_side_matches(conn, collection, &filter, None)?;
    let rows = ordered(
        filtered(collection, &filter, None, &side, now),
        crate::query::device::DEFAULT_ORDERING,
    )
    .select(Device::as_select())
    .load(conn)?;
    Ok(device_views(conn, rows, now)?)
}

/// The `limit` most recently created devices.
pub fn recent_devices(
    conn: &mut SqliteConnection,
    limit: i64,
    now: NaiveDateTime,
) -> Result<Vec<DeviceView>, InventoryError> {
    let rows = devices::table
        .order((devices::created_at.desc(), devices::id.desc()))
        .limit(limit)
        .select(Device::as_select())
        .load(conn)?;
    Ok(device_views(conn, rows, now)?)
}

/// Store-dependent checks; field-only checks come from
/// [`crate::validation::device_errors`].
fn check_device_write(
    conn: &mut SqliteConnection,
    write: &DeviceWrite,
    existing: Option<i32>,
) -> Result<(), InventoryError> {
    let mut errors: FieldErrors = device_errors(write);
    let base = &write.base;

    check_reference(conn, &mut errors, "category_id", RefTable::Category, base.category_id)?;
    check_reference(conn, &mut errors, "vendor_id", RefTable::Vendor, base.vendor_id)?;
    check_reference(conn, &mut errors, "location_id", RefTable::Location, base.location_id)?;
    check_reference(conn, &mut errors, "assigned_to_id", RefTable::User, base.assigned_to_id)?;
    if let Some(Specialization::Peripheral(p)) = &write.specialization {
        let target = p.connected_to_id;
        check_reference(conn, &mut errors, "connected_to_id", RefTable::Computer, target)?;
    }

    let tag = base.asset_tag.trim();
    if !tag.is_empty() {
        let mut clash = devices::table.filter(devices::asset_tag.eq(tag)).into_boxed();
        if let Some(id) = existing {
            clash = clash.filter(devices::id.ne(id));
        }
        let taken: i64 = clash.count().get_result(conn)?;
        if taken > 0 {
            errors.add("asset_tag", ASSET_TAG_IN_USE);
        }
    }
    finish(errors)
}

fn specifications_text(value: &Value) -> Result<String, InventoryError> {
    match value {
        Value::Null => Ok("{}".to_string()),
        Value::Object(_) => Ok(serde_json::to_string(value)?),
        _ => Err(InventoryError::invalid("specifications", SPECIFICATIONS_NOT_OBJECT)),
    }
}

fn normalized(spec: Specialization) -> Specialization {
    match spec {
        Specialization::Network(mut n) => {
            n.ip_address = blank_to_none(n.ip_address);
            n.management_ip = blank_to_none(n.management_ip);
            Specialization::Network(n)
        }
        Specialization::Computer(mut c) => {
            c.ip_address = blank_to_none(c.ip_address);
            Specialization::Computer(c)
        }
        other => other,
    }
}

fn insert_specialization(conn: &mut SqliteConnection, spec: &Specialization) -> QueryResult<usize> {
    match spec {
        Specialization::Network(n) => {
            diesel::insert_into(network_devices::table).values(n).execute(conn)
        }
        Specialization::Computer(c) => {
            diesel::insert_into(computers::table).values(c).execute(conn)
        }
        Specialization::Peripheral(p) => {
            diesel::insert_into(peripherals::table).values(p).execute(conn)
        }
    }
}

fn update_specialization(conn: &mut SqliteConnection, spec: &Specialization) -> QueryResult<usize> {
    match spec {
        Specialization::Network(n) => {
            diesel::update(network_devices::table.find(n.device_id)).set(n).execute(conn)
        }
        Specialization::Computer(c) => {
            diesel::update(computers::table.find(c.device_id)).set(c).execute(conn)
        }
        Specialization::Peripheral(p) => {
            diesel::update(peripherals::table.find(p.device_id)).set(p).execute(conn)
        }
    }
}

/// Creates a device in `collection`; its kind follows the collection.
pub fn create_device(
    conn: &mut SqliteConnection,
    collection: DeviceCollection,
    write: DeviceWrite,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<DeviceRecord, InventoryError> {
    let kind = collection.kind().unwrap_or(DeviceKind::Device);
    if write.kind() != kind {
        return Err(InventoryError::Internal(format!(
            "{} write submitted to {}",
            write.kind(),
            collection.segment()
        )));
    }

    let record = transact(conn, |conn| {
        check_device_write(conn, &write, None)?;
        let base = &write.base;
        let category_id =
            base.category_id.ok_or_else(|| InventoryError::invalid("category_id", REQUIRED))?;

        diesel::insert_into(devices::table)
            .values(&NewDevice {
                kind,
                asset_tag: base.asset_tag.trim().to_string(),
                serial_number: base.serial_number.clone(),
                model: base.model.trim().to_string(),
                category_id,
                vendor_id: base.vendor_id,
                status: base.status,
                condition: base.condition,
                location_id: base.location_id,
                assigned_to_id: base.assigned_to_id,
                specifications: specifications_text(&base.specifications)?,
                purchase_date: base.purchase_date,
                warranty_expiry: base.warranty_expiry,
                purchase_price: round_money(base.purchase_price),
                notes: base.notes.clone(),
                image: blank_to_none(base.image.clone()),
                created_at: now,
                updated_at: now,
            })
            .execute(conn)?;
        let id = last_insert_id(conn)?;

        if let Some(spec) = write.specialization.clone() {
            insert_specialization(conn, &normalized(spec).with_device_id(id))?;
        }
        get_device(conn, collection, id)
    })?;

    info!(target: "inventory_api::repository", "created {} {}", kind, record.device.asset_tag);
    sink.emit(ChangeEvent::created(event_model(kind), record.device.id));
    Ok(record)
}

/// Replaces the writable fields of device `id`. Through the generic
/// collection the specialization row is left as it is.
pub fn update_device(
    conn: &mut SqliteConnection,
    collection: DeviceCollection,
    id: i32,
    write: DeviceWrite,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<DeviceRecord, InventoryError> {
    let record = transact(conn, |conn| {
        let current = get_device(conn, collection, id)?;
        if let Some(spec) = &write.specialization {
            if spec.kind() != current.device.kind {
                return Err(InventoryError::Internal(format!(
                    "{} write for a {} device",
                    spec.kind(),
                    current.device.kind
                )));
            }
        }
        check_device_write(conn, &write, Some(id))?;
        let base = &write.base;
        let category_id =
            base.category_id.ok_or_else(|| InventoryError::invalid("category_id", REQUIRED))?;

        diesel::update(devices::table.find(id))
            .set(&DeviceChanges {
                asset_tag: base.asset_tag.trim().to_string(),
                serial_number: base.serial_number.clone(),
                model: base.model.trim().to_string(),
                category_id,
                vendor_id: base.vendor_id,
                status: base.status,
                condition: base.condition,
                location_id: base.location_id,
                assigned_to_id: base.assigned_to_id,
                specifications: specifications_text(&base.specifications)?,
                purchase_date: base.purchase_date,
                warranty_expiry: base.warranty_expiry,
                purchase_price: round_money(base.purchase_price),
                notes: base.notes.clone(),
                image: blank_to_none(base.image.clone()),
                updated_at: now,
            })
            .execute(conn)?;

        if let Some(spec) = write.specialization.clone() {
            let spec = normalized(spec).with_device_id(id);
            if update_specialization(conn, &spec)? == 0 {
                insert_specialization(conn, &spec)?;
            }
        }
        get_device(conn, collection, id)
    })?;

    sink.emit(ChangeEvent::updated(event_model(record.device.kind), id));
    Ok(record)
}

/// Sets only the status. Marking a device with the status it already has
/// writes nothing and emits no event.
pub fn set_device_status(
    conn: &mut SqliteConnection,
    collection: DeviceCollection,
    id: i32,
    status: DeviceStatus,
    now: NaiveDateTime,
    sink: &dyn ChangeSink,
) -> Result<DeviceRecord, InventoryError> {
    let (record, changed) = transact(conn, |conn| {
        let current = get_device(conn, collection, id)?;
        if current.device.status == status {
            return Ok((current, false));
        }
        diesel::update(devices::table.find(id))
            .set((devices::status.eq(status), devices::updated_at.eq(now)))
            .execute(conn)?;
        Ok((get_device(conn, collection, id)?, true))
    })?;
    if changed {
        info!(
            target: "inventory_api::repository",
            "device {} marked {}",
            record.device.asset_tag,
            status
        );
        sink.emit(ChangeEvent::updated(event_model(record.device.kind), id));
    }
    Ok(record)
}

/// Deletes the device. Its installations go with it and give their seats
/// back; maintenance records and audit items cascade.
pub fn delete_device(
    conn: &mut SqliteConnection,
    collection: DeviceCollection,
    id: i32,
    sink: &dyn ChangeSink,
) -> Result<(), InventoryError> {
    let (kind, events) = transact(conn, |conn| {
        let record = get_device(conn, collection, id)?;
        let mut events = Vec::new();

        let installs: Vec<(i32, i32)> = software_installations::table
            .filter(software_installations::device_id.eq(id))
            .select((software_installations::id, software_installations::software_id))
            .load(conn)?;
        for (install_id, software_id) in installs {
            diesel::delete(software_installations::table.find(install_id)).execute(conn)?;
            diesel::update(software::table.find(software_id).filter(software::used_seats.gt(0)))
                .set(software::used_seats.eq(software::used_seats - 1))
                .execute(conn)?;
            events.push(ChangeEvent::deleted("SoftwareInstallation", install_id));
            events.push(ChangeEvent::updated("Software", software_id));
        }

        diesel::delete(devices::table.find(id)).execute(conn)?;
        Ok((record.device.kind, events))
    })?;

    sink.emit_all(events);
    sink.emit(ChangeEvent::deleted(event_model(kind), id));
    Ok(())
}
