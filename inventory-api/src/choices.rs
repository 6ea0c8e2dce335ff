//! Closed value sets stored as short text codes.
//!
//! Each choice has a stable storage/JSON code and a human label. The
//! `choice_enum!` macro wires the enum into Diesel (as `Text`), serde,
//! ts-rs and Rocket form parsing.

use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use diesel::{AsExpression, FromSqlRow};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("\"{value}\" is not a valid choice for {kind}.")]
pub struct UnknownChoice {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident {
            $($variant:ident => ($code:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, AsExpression, FromSqlRow, Serialize,
            Deserialize, TS,
        )]
        #[diesel(sql_type = Text)]
        #[ts(export)]
        pub enum $name {
            $(
                #[serde(rename = $code)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Storage and wire code.
            pub fn code(&self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            /// Human-readable label.
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.code())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownChoice;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($code => Ok($name::$variant),)+
                    other => {
                        Err(UnknownChoice { kind: stringify!($name), value: other.to_string() })
                    }
                }
            }
        }

        impl ToSql<Text, Sqlite> for $name {
            fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
                out.set_value(self.code());
                Ok(IsNull::No)
            }
        }

        impl FromSql<Text, Sqlite> for $name {
            fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
                let raw = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
                Ok(raw.parse::<$name>()?)
            }
        }

        impl<'v> rocket::form::FromFormField<'v> for $name {
            fn from_value(field: rocket::form::ValueField<'v>) -> rocket::form::Result<'v, Self> {
                field
                    .value
                    .parse::<$name>()
                    .map_err(|e| rocket::form::Error::validation(e.to_string()).into())
            }
        }
    };
}

choice_enum! {
    /// Lifecycle state of a device.
    DeviceStatus, default = Active {
        Active => ("active", "Active"),
        Inactive => ("inactive", "Inactive"),
        Maintenance => ("maintenance", "Under Maintenance"),
        Retired => ("retired", "Retired"),
        Lost => ("lost", "Lost/Stolen"),
    }
}

choice_enum! {
    DeviceCondition, default = Good {
        Excellent => ("excellent", "Excellent"),
        Good => ("good", "Good"),
        Fair => ("fair", "Fair"),
        Poor => ("poor", "Poor"),
        Broken => ("broken", "Broken"),
    }
}

choice_enum! {
    /// Which specialization (if any) a device row carries.
    DeviceKind, default = Device {
        Device => ("device", "Device"),
        Network => ("network", "Network Device"),
        Computer => ("computer", "Computer"),
        Peripheral => ("peripheral", "Peripheral"),
    }
}

choice_enum! {
    ComputerType, default = Desktop {
        Desktop => ("desktop", "Desktop"),
        Laptop => ("laptop", "Laptop"),
        Server => ("server", "Server"),
        Workstation => ("workstation", "Workstation"),
        ThinClient => ("thin_client", "Thin Client"),
    }
}

choice_enum! {
    PeripheralType, default = Other {
        Monitor => ("monitor", "Monitor"),
        Keyboard => ("keyboard", "Keyboard"),
        Mouse => ("mouse", "Mouse"),
        Printer => ("printer", "Printer"),
        Scanner => ("scanner", "Scanner"),
        Speaker => ("speaker", "Speaker"),
        Headset => ("headset", "Headset"),
        Webcam => ("webcam", "Webcam"),
        Other => ("other", "Other"),
    }
}

choice_enum! {
    LicenseType, default = Perpetual {
        Perpetual => ("perpetual", "Perpetual"),
        Subscription => ("subscription", "Subscription"),
        Trial => ("trial", "Trial"),
        OpenSource => ("open_source", "Open Source"),
    }
}

choice_enum! {
    MaintenanceType, default = Preventive {
        Preventive => ("preventive", "Preventive Maintenance"),
        Corrective => ("corrective", "Corrective Maintenance"),
        Upgrade => ("upgrade", "Upgrade"),
        Inspection => ("inspection", "Inspection"),
    }
}

choice_enum! {
    AuditType, default = Physical {
        Physical => ("physical", "Physical Audit"),
        System => ("system", "System Audit"),
        Compliance => ("compliance", "Compliance Audit"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_parse_back() {
        for status in DeviceStatus::ALL {
            assert_eq!(status.code().parse::<DeviceStatus>(), Ok(*status));
        }
        assert_eq!("thin_client".parse::<ComputerType>(), Ok(ComputerType::ThinClient));
    }

    #[test]
    fn unknown_code_is_rejected() {
        let err = "melted".parse::<DeviceCondition>().unwrap_err();
        assert_eq!(err.kind, "DeviceCondition");
        assert_eq!(err.to_string(), "\"melted\" is not a valid choice for DeviceCondition.");
    }

    #[test]
    fn labels_and_defaults() {
        assert_eq!(DeviceStatus::Lost.label(), "Lost/Stolen");
        assert_eq!(DeviceStatus::Maintenance.label(), "Under Maintenance");
        assert_eq!(LicenseType::OpenSource.label(), "Open Source");
        assert_eq!(DeviceStatus::default(), DeviceStatus::Active);
        assert_eq!(DeviceCondition::default(), DeviceCondition::Good);
        assert_eq!(LicenseType::default(), LicenseType::Perpetual);
    }

    #[test]
    fn serde_uses_codes() {
        let json = serde_json::to_string(&MaintenanceType::Corrective).unwrap();
        assert_eq!(json, "\"corrective\"");
        let back: PeripheralType = serde_json::from_str("\"webcam\"").unwrap();
        assert_eq!(back, PeripheralType::Webcam);
    }
}
