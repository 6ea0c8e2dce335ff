//! TypeScript bindings for the API types.
//!
//! Running the test below writes one `.ts` file per exported type into
//! `INVENTORY_TS_OUTPUT_DIR`, or `../ts-bindings` when that is unset.

#[cfg(test)]
mod tests {
    use std::{env, path::Path};

    use ts_rs::TS;

    #[test]
    fn generate_typescript_types() {
        let output_dir_str =
            env::var("INVENTORY_TS_OUTPUT_DIR").unwrap_or_else(|_| "../ts-bindings".to_string());
        let output_dir = Path::new(&output_dir_str);
        std::fs::create_dir_all(output_dir).expect("Failed to create output directory");

        // Remove stale bindings so renamed types do not linger.
        for entry in std::fs::read_dir(output_dir).expect("Failed to read output directory") {
            let path = entry.expect("Failed to read directory entry").path();
            if path.extension().and_then(|s| s.to_str()) == Some("ts") {
                std::fs::remove_file(&path)
                    .unwrap_or_else(|_| panic!("Failed to remove {:?}", path));
            }
        }

        unsafe {
            env::set_var("TS_RS_EXPORT_DIR", output_dir);
        }

        use crate::api::login::LoginRequest;
        use crate::api::status::HealthStatus;
        use crate::choices::*;
        use crate::models::*;
        use crate::orm::dashboard::DashboardStats;
        use crate::policy::{
            CompletionStatus, LicenseStatus, MaintenanceDue, WarrantyStatus, WorkflowStatus,
        };

        // Reference data
        Category::export().expect("Failed to export Category type");
        CategoryWithCount::export().expect("Failed to export CategoryWithCount type");
        Location::export().expect("Failed to export Location type");
        LocationWithCount::export().expect("Failed to export LocationWithCount type");
        Vendor::export().expect("Failed to export Vendor type");
        VendorWithCount::export().expect("Failed to export VendorWithCount type");
        UserSummary::export().expect("Failed to export UserSummary type");

        // Write bodies
        DeviceInput::export().expect("Failed to export DeviceInput type");
        NetworkDevice::export().expect("Failed to export NetworkDevice type");
        Computer::export().expect("Failed to export Computer type");
        Peripheral::export().expect("Failed to export Peripheral type");
        SoftwareInput::export().expect("Failed to export SoftwareInput type");
        InstallationInput::export().expect("Failed to export InstallationInput type");
        MaintenanceInput::export().expect("Failed to export MaintenanceInput type");
        AuditInput::export().expect("Failed to export AuditInput type");
        AuditItemInput::export().expect("Failed to export AuditItemInput type");
        LoginRequest::export().expect("Failed to export LoginRequest type");

        // Choices and derived state
        DeviceStatus::export().expect("Failed to export DeviceStatus type");
        DeviceCondition::export().expect("Failed to export DeviceCondition type");
        DeviceKind::export().expect("Failed to export DeviceKind type");
        ComputerType::export().expect("Failed to export ComputerType type");
        PeripheralType::export().expect("Failed to export PeripheralType type");
        LicenseType::export().expect("Failed to export LicenseType type");
        MaintenanceType::export().expect("Failed to export MaintenanceType type");
        AuditType::export().expect("Failed to export AuditType type");
        WarrantyStatus::export().expect("Failed to export WarrantyStatus type");
        MaintenanceDue::export().expect("Failed to export MaintenanceDue type");
        LicenseStatus::export().expect("Failed to export LicenseStatus type");
        WorkflowStatus::export().expect("Failed to export WorkflowStatus type");
        CompletionStatus::export().expect("Failed to export CompletionStatus type");

        // Responses
        DeviceRef::export().expect("Failed to export DeviceRef type");
        SoftwareRef::export().expect("Failed to export SoftwareRef type");
        DashboardStats::export().expect("Failed to export DashboardStats type");
        HealthStatus::export().expect("Failed to export HealthStatus type");

        println!("TypeScript types generated successfully in {:?}", output_dir);
    }
}
