//! Device filters, search and ordering.
//!
//! One filter struct serves all four device collections. Fields that belong
//! to another specialization are ignored; specialization fields never apply
//! to the generic `devices` collection.

use chrono::NaiveDateTime;
use diesel::dsl::not;
use diesel::prelude::*;
use diesel::sql_types::Bool;
use diesel::sqlite::Sqlite;
use rocket::form::FromForm;

use super::{FormDate, OrderKey, contains_pattern};
use crate::choices::{ComputerType, DeviceCondition, DeviceStatus, PeripheralType};
use crate::models::DeviceCollection;
use crate::policy::DevicePredicate;
use crate::schema::{computers, devices, network_devices, peripherals};

pub const ORDERING_FIELDS: &[&str] = &["asset_tag", "model", "created_at", "purchase_date"];
pub const DEFAULT_ORDERING: &[OrderKey] = &[OrderKey { field: "asset_tag", descending: false }];

/// Query-string filters for device listings.
///
/// Set membership repeats the key: `?category=1&category=2`. Named
/// predicates take `true` or `false`; `false` selects the complement.
#[derive(FromForm, Debug, Default, Clone, PartialEq)]
pub struct DeviceFilter {
    pub asset_tag: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub category: Vec<i32>,
    pub vendor: Vec<i32>,
    pub location: Vec<i32>,
    pub assigned_to: Vec<i32>,
    pub status: Option<DeviceStatus>,
    pub condition: Option<DeviceCondition>,
    pub purchase_date_from: Option<FormDate>,
    pub purchase_date_to: Option<FormDate>,
    pub warranty_expiry_from: Option<FormDate>,
    pub warranty_expiry_to: Option<FormDate>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub needs_maintenance: Option<bool>,
    pub under_warranty: Option<bool>,

    // network devices
    pub ip_address: Option<String>,
    pub hostname: Option<String>,
    pub network_segment: Option<String>,
    pub is_managed: Option<bool>,

    // computers
    pub computer_type: Option<ComputerType>,
    pub operating_system: Option<String>,
    pub domain_joined: Option<bool>,
    pub memory_min: Option<i32>,
    pub memory_max: Option<i32>,
    pub storage_min: Option<i32>,
    pub storage_max: Option<i32>,

    // peripherals
    pub peripheral_type: Option<PeripheralType>,
    pub connected_to: Option<i32>,
}

impl DeviceFilter {
    fn predicates(&self) -> Vec<(DevicePredicate, bool)> {
        let mut out = Vec::new();
        if let Some(wanted) = self.needs_maintenance {
            out.push((DevicePredicate::NeedsMaintenance, wanted));
        }
        if let Some(wanted) = self.under_warranty {
            out.push((DevicePredicate::UnderWarranty, wanted));
        }
        out
    }
}

pub type DeviceExpr = Box<dyn BoxableExpression<devices::table, Sqlite, SqlType = Bool>>;

/// SQL form of a device predicate, evaluated against a bound `now`.
///
/// NULL columns are tested explicitly so that `NOT (...)` selects exactly the
/// complement.
pub fn predicate_sql(predicate: DevicePredicate, now: NaiveDateTime) -> DeviceExpr {
    match predicate {
        DevicePredicate::NeedsMaintenance => Box::new(
            devices::next_maintenance
                .is_not_null()
                .and(devices::next_maintenance.assume_not_null().le(now)),
        ),
        DevicePredicate::UnderWarranty => Box::new(
            devices::warranty_expiry
                .is_not_null()
                .and(devices::warranty_expiry.assume_not_null().gt(now.date())),
        ),
    }
}

/// Device ids selected through specialization side tables.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SideMatches {
    /// Ids passing every side-table filter; `None` when no such filter is set.
    pub restrict: Option<Vec<i32>>,
    /// Ids whose specialization search fields match the search term.
    pub search_hits: Vec<i32>,
}

/// Runs the side-table parts of a filter ahead of the main device query.
pub fn resolve_side_matches(
    conn: &mut SqliteConnection,
    collection: DeviceCollection,
    filter: &DeviceFilter,
    search: Option<&str>,
) -> QueryResult<SideMatches> {
    let mut side = SideMatches::default();
    match collection {
        DeviceCollection::Devices => {}
        DeviceCollection::NetworkDevices => {
            let mut query = network_devices::table.select(network_devices::device_id).into_boxed();
            let mut active = false;
            if let Some(ip) = &filter.ip_address {
                query = query
                    .filter(network_devices::ip_address.like(contains_pattern(ip)).escape('\\'));
                active = true;
            }
            if let Some(host) = &filter.hostname {
                query = query
                    .filter(network_devices::hostname.like(contains_pattern(host)).escape('\\'));
                active = true;
            }
            if let Some(segment) = &filter.network_segment {
                let pattern = contains_pattern(segment);
                query = query.filter(network_devices::network_segment.like(pattern).escape('\\'));
                active = true;
            }
            if let Some(managed) = filter.is_managed {
                query = query.filter(network_devices::is_managed.eq(managed));
                active = true;
            }
            if active {
                side.restrict = Some(query.load::<i32>(conn)?);
            }
            if let Some(term) = search {
                let pattern = contains_pattern(term);
                let mut hits: Vec<i32> = network_devices::table
                    .filter(network_devices::ip_address.like(pattern.clone()).escape('\\'))
                    .select(network_devices::device_id)
                    .load(conn)?;
                hits.extend(
                    network_devices::table
                        .filter(network_devices::hostname.like(pattern).escape('\\'))
                        .select(network_devices::device_id)
                        .load::<i32>(conn)?,
                );
                side.search_hits = hits;
            }
        }
        DeviceCollection::Computers => {
            let mut query = computers::table.select(computers::device_id).into_boxed();
            let mut active = false;
            if let Some(kind) = filter.computer_type {
                query = query.filter(computers::computer_type.eq(kind));
                active = true;
            }
            if let Some(os) = &filter.operating_system {
                query = query.filter(computers::operating_system.eq(os.clone()));
                active = true;
            }
            if let Some(host) = &filter.hostname {
                query = query.filter(computers::hostname.like(contains_pattern(host)).escape('\\'));
                active = true;
            }
            if let Some(joined) = filter.domain_joined {
                query = query.filter(computers::domain_joined.eq(joined));
                active = true;
            }
            if let Some(min) = filter.memory_min {
                query = query.filter(computers::memory_gb.ge(min));
                active = true;
            }
            if let Some(max) = filter.memory_max {
                query = query.filter(computers::memory_gb.le(max));
                active = true;
            }
            if let Some(min) = filter.storage_min {
                query = query.filter(computers::storage_gb.ge(min));
                active = true;
            }
            if let Some(max) = filter.storage_max {
                query = query.filter(computers::storage_gb.le(max));
                active = true;
            }
            if active {
                side.restrict = Some(query.load::<i32>(conn)?);
            }
            if let Some(term) = search {
                let pattern = contains_pattern(term);
                side.search_hits = computers::table
                    .filter(
                        computers::hostname
                            .like(pattern.clone())
                            .escape('\\')
                            .or(computers::operating_system.like(pattern).escape('\\')),
                    )
                    .select(computers::device_id)
                    .load(conn)?;
            }
        }
        DeviceCollection::Peripherals => {
            let mut query = peripherals::table.select(peripherals::device_id).into_boxed();
            let mut active = false;
            if let Some(kind) = filter.peripheral_type {
                query = query.filter(peripherals::peripheral_type.eq(kind));
                active = true;
            }
            if let Some(computer_id) = filter.connected_to {
                query = query.filter(peripherals::connected_to_id.eq(computer_id));
                active = true;
            }
            if active {
                side.restrict = Some(query.load::<i32>(conn)?);
            }
            if let Some(term) = search {
                side.search_hits = peripherals::table
                    .filter(peripherals::peripheral_type.like(contains_pattern(term)).escape('\\'))
                    .select(peripherals::device_id)
                    .load(conn)?;
            }
        }
    }
    Ok(side)
}

/// Everything in a device listing except ordering and paging.
pub fn filtered(
    collection: DeviceCollection,
    filter: &DeviceFilter,
    search: Option<&str>,
    side: &SideMatches,
    now: NaiveDateTime,
) -> devices::BoxedQuery<'static, Sqlite> {
    let mut query = devices::table.into_boxed();

    if let Some(kind) = collection.kind() {
        query = query.filter(devices::kind.eq(kind));
    }
    if let Some(tag) = &filter.asset_tag {
        query = query.filter(devices::asset_tag.like(contains_pattern(tag)).escape('\\'));
    }
    if let Some(model) = &filter.model {
        query = query.filter(devices::model.like(contains_pattern(model)).escape('\\'));
    }
    if let Some(serial) = &filter.serial_number {
        query = query.filter(devices::serial_number.like(contains_pattern(serial)).escape('\\'));
    }
    if !filter.category.is_empty() {
        query = query.filter(devices::category_id.eq_any(filter.category.clone()));
    }
    if !filter.vendor.is_empty() {
        query = query.filter(devices::vendor_id.eq_any(filter.vendor.clone()));
    }
    if !filter.location.is_empty() {
        query = query.filter(devices::location_id.eq_any(filter.location.clone()));
    }
    if !filter.assigned_to.is_empty() {
        query = query.filter(devices::assigned_to_id.eq_any(filter.assigned_to.clone()));
    }
    if let Some(status) = filter.status {
        query = query.filter(devices::status.eq(status));
    }
    if let Some(condition) = filter.condition {
        query = query.filter(devices::condition.eq(condition));
    }
    if let Some(FormDate(from)) = filter.purchase_date_from {
        query = query.filter(devices::purchase_date.ge(from));
    }
    if let Some(FormDate(to)) = filter.purchase_date_to {
        query = query.filter(devices::purchase_date.le(to));
    }
    if let Some(FormDate(from)) = filter.warranty_expiry_from {
        query = query.filter(devices::warranty_expiry.ge(from));
    }
    if let Some(FormDate(to)) = filter.warranty_expiry_to {
        query = query.filter(devices::warranty_expiry.le(to));
    }
    if let Some(min) = filter.price_min {
        query = query.filter(devices::purchase_price.ge(min));
    }
    if let Some(max) = filter.price_max {
        query = query.filter(devices::purchase_price.le(max));
    }
    for (predicate, wanted) in filter.predicates() {
        let expr = predicate_sql(predicate, now);
        query = if wanted { query.filter(expr) } else { query.filter(not(expr)) };
    }
    if collection.kind().is_some() {
        if let Some(ids) = &side.restrict {
            query = query.filter(devices::id.eq_any(ids.clone()));
        }
    }
    if let Some(term) = search {
        let pattern = contains_pattern(term);
        query = query.filter(
            devices::asset_tag
                .like(pattern.clone())
                .escape('\\')
                .or(devices::serial_number.like(pattern.clone()).escape('\\'))
                .or(devices::model.like(pattern.clone()).escape('\\'))
                .or(devices::notes.like(pattern).escape('\\'))
                .or(devices::id.eq_any(side.search_hits.clone())),
        );
    }
    query
}

pub fn ordered(
    mut query: devices::BoxedQuery<'static, Sqlite>,
    keys: &[OrderKey],
) -> devices::BoxedQuery<'static, Sqlite> {
    for key in keys {
        query = match (key.field, key.descending) {
            ("asset_tag", false) => query.then_order_by(devices::asset_tag.asc()),
            ("asset_tag", true) => query.then_order_by(devices::asset_tag.desc()),
            ("model", false) => query.then_order_by(devices::model.asc()),
            ("model", true) => query.then_order_by(devices::model.desc()),
            ("created_at", false) => query.then_order_by(devices::created_at.asc()),
            ("created_at", true) => query.then_order_by(devices::created_at.desc()),
            ("purchase_date", false) => query.then_order_by(devices::purchase_date.asc()),
            ("purchase_date", true) => query.then_order_by(devices::purchase_date.desc()),
            _ => query,
        };
    }
    query.then_order_by(devices::id.asc())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::*;
    use crate::events::NullSink;
    use crate::models::DeviceCollection::{Computers, NetworkDevices, Peripherals};
    use crate::models::{
        Computer, Device, DeviceInput, DeviceWrite, NetworkDevice, Peripheral, Specialization,
    };
    use crate::orm::device::create_device;
    use crate::orm::testing::{seed_category, seed_device, setup_test_db};
    use crate::policy;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn ids(conn: &mut SqliteConnection, filter: &DeviceFilter) -> Vec<i32> {
        let side = resolve_side_matches(conn, DeviceCollection::Devices, filter, None).unwrap();
        let mut out: Vec<i32> = filtered(DeviceCollection::Devices, filter, None, &side, now())
            .select(devices::id)
            .load(conn)
            .unwrap();
        out.sort();
        out
    }

    fn collection_ids(
        conn: &mut SqliteConnection,
        collection: DeviceCollection,
        filter: &DeviceFilter,
        search: Option<&str>,
    ) -> Vec<i32> {
        let side = resolve_side_matches(conn, collection, filter, search).unwrap();
        let mut out: Vec<i32> = filtered(collection, filter, search, &side, now())
            .select(devices::id)
            .load(conn)
            .unwrap();
        out.sort();
        out
    }

    fn searched(conn: &mut SqliteConnection, collection: DeviceCollection, term: &str) -> Vec<i32> {
        collection_ids(conn, collection, &<DeviceFilter as Default>::default(), Some(term))
    }

    fn create(
        conn: &mut SqliteConnection,
        tag: &str,
        category_id: i32,
        specialization: Specialization,
    ) -> i32 {
        let collection = match specialization {
            Specialization::Network(_) => NetworkDevices,
            Specialization::Computer(_) => Computers,
            Specialization::Peripheral(_) => Peripherals,
        };
        let write = DeviceWrite {
            base: DeviceInput {
                asset_tag: tag.into(),
                model: "Model".into(),
                category_id: Some(category_id),
                ..Default::default()
            },
            specialization: Some(specialization),
        };
        create_device(conn, collection, write, now(), &NullSink).unwrap().device.id
    }

    fn switch(hostname: &str, is_managed: bool) -> Specialization {
        Specialization::Network(NetworkDevice {
            hostname: hostname.into(),
            is_managed,
            ..Default::default()
        })
    }

    fn workstation(
        hostname: &str,
        domain_joined: bool,
        memory_gb: i32,
        storage_gb: i32,
    ) -> Specialization {
        Specialization::Computer(Computer {
            hostname: hostname.into(),
            domain_joined,
            memory_gb: Some(memory_gb),
            storage_gb: Some(storage_gb),
            ..Default::default()
        })
    }

    fn printer(connected_to_id: Option<i32>) -> Specialization {
        Specialization::Peripheral(Peripheral {
            peripheral_type: PeripheralType::Printer,
            connected_to_id,
            ..Default::default()
        })
    }

    #[test]
    fn flag_filters_agree_with_stored_flags() {
        let mut conn = setup_test_db();
        let cat = seed_category(&mut conn, "Mixed");
        let plain = seed_device(&mut conn, "PLAIN-1", cat.id);
        for (n, managed) in [true, false, true].into_iter().enumerate() {
            create(&mut conn, &format!("SW-{n}"), cat.id, switch("sw", managed));
        }
        for (n, joined) in [false, true, true].into_iter().enumerate() {
            create(&mut conn, &format!("PC-{n}"), cat.id, workstation("pc", joined, 8, 256));
        }

        let network: Vec<NetworkDevice> =
            network_devices::table.select(NetworkDevice::as_select()).load(&mut conn).unwrap();
        let pcs: Vec<Computer> =
            computers::table.select(Computer::as_select()).load(&mut conn).unwrap();

        for wanted in [true, false] {
            let filter = DeviceFilter { is_managed: Some(wanted), ..Default::default() };
            let mut expected: Vec<i32> =
                network.iter().filter(|n| n.is_managed == wanted).map(|n| n.device_id).collect();
            expected.sort();
            let got = collection_ids(&mut conn, NetworkDevices, &filter, None);
            assert_eq!(got, expected, "is_managed={}", wanted);

            let filter = DeviceFilter { domain_joined: Some(wanted), ..Default::default() };
            let mut expected: Vec<i32> =
                pcs.iter().filter(|c| c.domain_joined == wanted).map(|c| c.device_id).collect();
            expected.sort();
            let got = collection_ids(&mut conn, Computers, &filter, None);
            assert_eq!(got, expected, "domain_joined={}", wanted);
        }

        // specialization filters never narrow the generic collection
        let filter = DeviceFilter { is_managed: Some(true), ..Default::default() };
        let all = collection_ids(&mut conn, DeviceCollection::Devices, &filter, None);
        assert_eq!(all.len(), 7);
        assert!(all.contains(&plain.id));
    }

    #[test]
    fn connected_to_matches_the_computer_id() {
        let mut conn = setup_test_db();
        let cat = seed_category(&mut conn, "Desks");
        let pc1 = create(&mut conn, "PC-1", cat.id, workstation("a", false, 8, 256));
        let pc2 = create(&mut conn, "PC-2", cat.id, workstation("b", false, 8, 256));
        let p1 = create(&mut conn, "PER-1", cat.id, printer(Some(pc1)));
        let p2 = create(&mut conn, "PER-2", cat.id, printer(Some(pc2)));
        let p3 = create(&mut conn, "PER-3", cat.id, printer(None));

        let on_pc1 = DeviceFilter { connected_to: Some(pc1), ..Default::default() };
        assert_eq!(collection_ids(&mut conn, Peripherals, &on_pc1, None), vec![p1]);

        let on_pc2 = DeviceFilter { connected_to: Some(pc2), ..Default::default() };
        assert_eq!(collection_ids(&mut conn, Peripherals, &on_pc2, None), vec![p2]);

        let nowhere = DeviceFilter { connected_to: Some(9999), ..Default::default() };
        assert!(collection_ids(&mut conn, Peripherals, &nowhere, None).is_empty());

        let any = <DeviceFilter as Default>::default();
        assert_eq!(collection_ids(&mut conn, Peripherals, &any, None), vec![p1, p2, p3]);
    }

    #[test]
    fn computer_size_ranges_are_inclusive() {
        let mut conn = setup_test_db();
        let cat = seed_category(&mut conn, "Desktops");
        let small = create(&mut conn, "PC-S", cat.id, workstation("s", false, 8, 256));
        let mid = create(&mut conn, "PC-M", cat.id, workstation("m", false, 16, 512));
        let big = create(&mut conn, "PC-L", cat.id, workstation("l", false, 32, 1024));

        let at_least_16 = DeviceFilter { memory_min: Some(16), ..Default::default() };
        assert_eq!(collection_ids(&mut conn, Computers, &at_least_16, None), vec![mid, big]);

        let at_most_16 = DeviceFilter { memory_max: Some(16), ..Default::default() };
        assert_eq!(collection_ids(&mut conn, Computers, &at_most_16, None), vec![small, mid]);

        let storage_band =
            DeviceFilter { storage_min: Some(300), storage_max: Some(1024), ..Default::default() };
        assert_eq!(collection_ids(&mut conn, Computers, &storage_band, None), vec![mid, big]);
    }

    #[test]
    fn search_reaches_specialization_fields() {
        let mut conn = setup_test_db();
        let cat = seed_category(&mut conn, "Switches");
        let core = create(&mut conn, "NET-1", cat.id, switch("core-sw-01", true));
        create(&mut conn, "NET-2", cat.id, switch("edge-sw-02", true));
        let finance = create(&mut conn, "PC-1", cat.id, workstation("ws-finance", true, 8, 256));
        let label_printer = create(&mut conn, "PER-1", cat.id, printer(None));

        assert_eq!(searched(&mut conn, NetworkDevices, "core-sw"), vec![core]);
        assert_eq!(searched(&mut conn, Computers, "FINANCE"), vec![finance]);
        assert_eq!(searched(&mut conn, Peripherals, "print"), vec![label_printer]);

        // hostnames are not part of the generic device search
        assert!(searched(&mut conn, DeviceCollection::Devices, "core-sw").is_empty());
    }

    #[test]
    fn predicate_queries_agree_with_policy() {
        let mut conn = setup_test_db();
        let category = seed_category(&mut conn, "Laptops");
        let now = now();
        let today = now.date();

        let next_values =
            [None, Some(now - Duration::days(1)), Some(now), Some(now + Duration::hours(1))];
        let warranty_values =
            [None, Some(today - Duration::days(1)), Some(today), Some(today + Duration::days(1))];

        let mut n = 0;
        for next in next_values {
            for warranty in warranty_values {
                n += 1;
                let device = seed_device(&mut conn, &format!("P7-{n:02}"), category.id);
                diesel::update(devices::table.find(device.id))
                    .set((
                        devices::next_maintenance.eq(next),
                        devices::warranty_expiry.eq(warranty),
                    ))
                    .execute(&mut conn)
                    .unwrap();
            }
        }

        let all: Vec<Device> = devices::table.select(Device::as_select()).load(&mut conn).unwrap();
        for predicate in DevicePredicate::ALL {
            for wanted in [true, false] {
                let filter = match predicate {
                    DevicePredicate::NeedsMaintenance => {
                        DeviceFilter { needs_maintenance: Some(wanted), ..Default::default() }
                    }
                    DevicePredicate::UnderWarranty => {
                        DeviceFilter { under_warranty: Some(wanted), ..Default::default() }
                    }
                };
                let mut expected: Vec<i32> = all
                    .iter()
                    .filter(|d| predicate.holds(d, now) == wanted)
                    .map(|d| d.id)
                    .collect();
                expected.sort();
                assert_eq!(ids(&mut conn, &filter), expected, "{:?}={}", predicate, wanted);
            }
        }

        // sanity: the boundary day itself is not under warranty
        let boundary = all.iter().find(|d| d.warranty_expiry == Some(today)).unwrap();
        assert!(!policy::is_under_warranty(boundary, now));
    }

    #[test]
    fn substring_and_membership_filters() {
        let mut conn = setup_test_db();
        let laptops = seed_category(&mut conn, "Laptops");
        let phones = seed_category(&mut conn, "Phones");
        let a = seed_device(&mut conn, "LAP-001", laptops.id);
        let b = seed_device(&mut conn, "lap-002", laptops.id);
        let c = seed_device(&mut conn, "PHN-100", phones.id);

        let by_tag = DeviceFilter { asset_tag: Some("lap".into()), ..Default::default() };
        assert_eq!(ids(&mut conn, &by_tag), vec![a.id, b.id]);

        let by_category =
            DeviceFilter { category: vec![phones.id, laptops.id], ..Default::default() };
        assert_eq!(ids(&mut conn, &by_category), vec![a.id, b.id, c.id]);

        let wildcard = DeviceFilter { asset_tag: Some("%".into()), ..Default::default() };
        assert!(ids(&mut conn, &wildcard).is_empty());
    }

    #[test]
    fn ordering_falls_back_to_asset_tag() {
        let mut conn = setup_test_db();
        let category = seed_category(&mut conn, "Monitors");
        let z = seed_device(&mut conn, "Z-1", category.id);
        let a = seed_device(&mut conn, "A-1", category.id);

        let filter = <DeviceFilter as Default>::default();
        let side = SideMatches::default();
        let keys =
            super::super::parse_ordering(Some("nonsense"), ORDERING_FIELDS, DEFAULT_ORDERING);
        let query = filtered(DeviceCollection::Devices, &filter, None, &side, now());
        let rows: Vec<i32> = ordered(query, &keys)
            .select(devices::id)
            .load(&mut conn)
            .unwrap();
        assert_eq!(rows, vec![a.id, z.id]);
    }
}
