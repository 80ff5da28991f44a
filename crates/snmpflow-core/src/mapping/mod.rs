// ── Static mapping files ──
//
// Loaded once at startup; any failure here aborts startup.

pub mod custom;
pub mod device;
pub mod udr;

pub use custom::CustomMapper;
pub use device::{DeviceMapper, InterfaceRow};
pub use udr::{Udr, UdrMapper, UdrType};

/// Every mapping the pollers consult, bundled for sharing.
#[derive(Debug, Default)]
pub struct Mappings {
    pub devices: DeviceMapper,
    pub udrs: UdrMapper,
    pub custom: CustomMapper,
}
