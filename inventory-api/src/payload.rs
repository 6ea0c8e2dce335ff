//! Request body decoding.
//!
//! Write endpoints take a raw JSON object so that a device body can be read
//! twice (once for the common fields, once for its specialization) and so
//! that `PATCH` can be applied over the current state before validation.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::choices::DeviceKind;
use crate::error::{FieldErrors, InventoryError};
use crate::models::{
    Computer, DeviceCollection, DeviceInput, DeviceRecord, DeviceWrite, NetworkDevice, Peripheral,
    Specialization,
};

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, FieldErrors> {
    value.as_object().ok_or_else(|| {
        FieldErrors::single(
            NON_FIELD_ERRORS,
            format!("Invalid data. Expected a dictionary, but got {}.", type_name(value)),
        )
    })
}

/// Decodes a JSON object into `T`, attributing failures to the keys that
/// cause them.
///
/// Every input type defaults its missing fields, so a body holding a single
/// key decodes unless that key is bad. That lets each offending key be
/// reported on its own.
fn decode_fields<T: DeserializeOwned>(value: &Value) -> Result<T, FieldErrors> {
    let object = as_object(value)?;
    match serde_json::from_value::<T>(value.clone()) {
        Ok(decoded) => Ok(decoded),
        Err(whole) => {
            let mut errors = FieldErrors::new();
            for (key, field_value) in object {
                let mut single = Map::new();
                single.insert(key.clone(), field_value.clone());
                if let Err(e) = serde_json::from_value::<T>(Value::Object(single)) {
                    errors.add(key, e.to_string());
                }
            }
            if errors.is_empty() {
                errors.add(NON_FIELD_ERRORS, whole.to_string());
            }
            Err(errors)
        }
    }
}

/// Decodes a request body into an input struct.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, InventoryError> {
    decode_fields(&value).map_err(InventoryError::Invalid)
}

/// Reads a device body for `collection`: common fields plus the
/// collection's specialization, both taken from the same object.
pub fn device_write_from_json(
    collection: DeviceCollection,
    value: Value,
) -> Result<DeviceWrite, InventoryError> {
    let mut errors = FieldErrors::new();
    let base = match decode_fields::<DeviceInput>(&value) {
        Ok(base) => Some(base),
        Err(e) => {
            errors.merge(e);
            None
        }
    };

    let specialization = match collection.kind() {
        None | Some(DeviceKind::Device) => Ok(None),
        Some(DeviceKind::Network) => {
            decode_fields::<NetworkDevice>(&value).map(|n| Some(Specialization::Network(n)))
        }
        Some(DeviceKind::Computer) => {
            decode_fields::<Computer>(&value).map(|c| Some(Specialization::Computer(c)))
        }
        Some(DeviceKind::Peripheral) => {
            decode_fields::<Peripheral>(&value).map(|p| Some(Specialization::Peripheral(p)))
        }
    };

    // a bad body is reported once, not per half
    if errors.contains(NON_FIELD_ERRORS) {
        return Err(InventoryError::Invalid(errors));
    }
    let specialization = match specialization {
        Ok(spec) => spec,
        Err(e) => {
            errors.merge(e);
            None
        }
    };

    match base {
        Some(base) if errors.is_empty() => Ok(DeviceWrite { base, specialization }),
        _ => Err(InventoryError::Invalid(errors)),
    }
}

/// Shallow merge of `patch` over the serialized `current` state. Keys in
/// the patch replace whole values.
pub fn merge_patch<T: Serialize>(current: &T, patch: Value) -> Result<Value, InventoryError> {
    let patch = as_object(&patch).map_err(InventoryError::Invalid)?.clone();
    let mut merged = match serde_json::to_value(current)? {
        Value::Object(map) => map,
        other => {
            return Err(InventoryError::Internal(format!(
                "cannot patch a {} value",
                type_name(&other)
            )));
        }
    };
    merged.extend(patch);
    Ok(Value::Object(merged))
}

/// The writable state of a stored device, in the shape its collection
/// accepts.
pub fn device_json(record: &DeviceRecord) -> Result<Value, InventoryError> {
    let mut value = serde_json::to_value(DeviceInput::from(&record.device))?;
    let extra = match &record.specialization {
        Some(Specialization::Network(n)) => serde_json::to_value(n)?,
        Some(Specialization::Computer(c)) => serde_json::to_value(c)?,
        Some(Specialization::Peripheral(p)) => serde_json::to_value(p)?,
        None => Value::Null,
    };
    if let (Value::Object(base), Value::Object(extra)) = (&mut value, extra) {
        base.extend(extra);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::choices::{ComputerType, DeviceStatus};
    use crate::models::SoftwareInput;

    #[test]
    fn non_objects_are_rejected() {
        let err = decode::<SoftwareInput>(json!([1, 2])).unwrap_err();
        match err {
            InventoryError::Invalid(errors) => assert_eq!(
                errors.get(NON_FIELD_ERRORS),
                Some(&["Invalid data. Expected a dictionary, but got list.".to_string()][..])
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bad_values_are_reported_per_key() {
        let err = decode::<DeviceInput>(json!({
            "asset_tag": "A-1",
            "status": "bogus",
            "purchase_price": "cheap",
        }))
        .unwrap_err();
        let InventoryError::Invalid(errors) = err else { panic!("expected Invalid") };
        assert!(errors.contains("status"));
        assert!(errors.contains("purchase_price"));
        assert!(!errors.contains("asset_tag"));
    }

    #[test]
    fn computer_body_carries_both_halves() {
        let write = device_write_from_json(
            DeviceCollection::Computers,
            json!({
                "asset_tag": "PC-1",
                "model": "OptiPlex",
                "category_id": 1,
                "computer_type": "laptop",
                "memory_gb": 16,
            }),
        )
        .unwrap();
        assert_eq!(write.base.asset_tag, "PC-1");
        match write.specialization {
            Some(Specialization::Computer(c)) => {
                assert_eq!(c.computer_type, ComputerType::Laptop);
                assert_eq!(c.memory_gb, Some(16));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn generic_collection_ignores_specialized_keys() {
        let write = device_write_from_json(
            DeviceCollection::Devices,
            json!({"asset_tag": "X", "model": "M", "category_id": 1, "hostname": "core-sw"}),
        )
        .unwrap();
        assert!(write.specialization.is_none());
    }

    #[test]
    fn patch_replaces_only_named_keys() {
        let current = DeviceInput {
            asset_tag: "A-1".into(),
            model: "Old".into(),
            notes: "keep".into(),
            ..Default::default()
        };
        let merged = merge_patch(&current, json!({"model": "New", "status": "retired"})).unwrap();
        let input: DeviceInput = decode(merged).unwrap();
        assert_eq!(input.model, "New");
        assert_eq!(input.notes, "keep");
        assert_eq!(input.status, DeviceStatus::Retired);
    }
}
