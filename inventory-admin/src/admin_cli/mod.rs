pub mod device_commands;
pub mod export_commands;
pub mod log_commands;
pub mod maintenance_commands;
pub mod reference_commands;
pub mod software_commands;
pub mod user_commands;
pub mod utils;
