pub mod audit;
pub mod category;
pub mod computer;
pub mod device;
pub mod installation;
pub mod location;
pub mod maintenance;
pub mod network_device;
pub mod peripheral;
pub mod session;
pub mod software;
pub mod user;
pub mod vendor;

// Re-export models for easier access
pub use audit::*;
pub use category::*;
pub use computer::*;
pub use device::*;
pub use installation::*;
pub use location::*;
pub use maintenance::*;
pub use network_device::*;
pub use peripheral::*;
pub use session::*;
pub use software::*;
pub use user::*;
pub use vendor::*;
