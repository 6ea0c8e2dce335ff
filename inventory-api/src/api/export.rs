//! CSV download of the device inventory.

use rocket::http::Header;
use rocket::{Responder, Route, get, routes};

use super::log_action;
use crate::error::InventoryError;
use crate::orm::DbConn;
use crate::orm::export::{DEVICE_CSV_FILENAME, devices_csv};
use crate::session_guards::AuthenticatedUser;

/// A CSV body served as a file download.
#[derive(Responder)]
#[response(content_type = "text/csv")]
pub struct CsvDownload {
    body: String,
    disposition: Header<'static>,
}

impl CsvDownload {
    pub fn new(filename: &str, body: String) -> Self {
        CsvDownload {
            body,
            disposition: Header::new(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", filename),
            ),
        }
    }
}

/// Export Devices endpoint.
///
/// - **URL:** `/api/export/devices`
/// - **Method:** `GET`
/// - **Purpose:** Every device as CSV, one header row then one row per device
///   in asset tag order
/// - **Authentication:** Required
///
/// The response is `text/csv` with
/// `Content-Disposition: attachment; filename="devices.csv"`.
#[get("/export/devices")]
pub async fn export_devices(
    db: DbConn,
    auth: AuthenticatedUser,
) -> Result<CsvDownload, InventoryError> {
    let body = db.run(devices_csv).await?;
    log_action(&auth, "api_export_devices", "Exported devices as CSV");
    Ok(CsvDownload::new(DEVICE_CSV_FILENAME, body))
}

pub fn routes() -> Vec<Route> {
    routes![export_devices]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_names_the_file() {
        let download = CsvDownload::new("devices.csv", String::new());
        assert_eq!(download.disposition.value(), "attachment; filename=\"devices.csv\"");
    }
}
