// ── Domain model ──

mod bus_address;
mod device;

pub use bus_address::{BusAddress, InvalidBusAddress};
pub use device::{AddressSource, CameraDevice};
