use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use inventory_api::orm::export::write_devices_csv;

#[derive(Subcommand)]
pub enum ExportAction {
    #[command(about = "Write every device as CSV")]
    Devices {
        #[arg(short, long, help = "Output file (stdout when omitted)")]
        output: Option<PathBuf>,
    },
}

pub fn handle_export_command_with_conn(
    conn: &mut SqliteConnection,
    action: ExportAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ExportAction::Devices { output: Some(path) } => {
            let rows = write_devices_csv(conn, BufWriter::new(File::create(&path)?))?;
            eprintln!("Exported {} devices to {}", rows, path.display());
        }
        ExportAction::Devices { output: None } => {
            write_devices_csv(conn, io::stdout().lock())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use inventory_api::orm::testing::{seed_category, seed_device, setup_test_db};
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn export_to_file() {
        let mut conn = setup_test_db();
        let cat = seed_category(&mut conn, "Laptops");
        seed_device(&mut conn, "LAP-2", cat.id);
        seed_device(&mut conn, "LAP-1", cat.id);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("devices.csv");

        let action = ExportAction::Devices { output: Some(path.clone()) };
        handle_export_command_with_conn(&mut conn, action).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Asset Tag,Model"));
        assert!(lines[1].starts_with("LAP-1,"));
        assert!(lines[2].starts_with("LAP-2,"));
    }
}
