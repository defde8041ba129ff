//! Vendor drivers — vendor-specific behavior abstracted from the poll engine.
//!
//! The engine delegates everything platform-shaped to a driver:
//!   - the pagination-disable command
//!   - output shaping (which collections are singletons vs. tables)
//!   - post-processing transforms (CPU field mapping, memory percentages,
//!     BGP state parsing, log assembly)
//!   - cross-collection joins (memory holdings merged into CPU processes)
//!
//! Drivers are looked up by vendor tag with a suffix-truncation fallback
//! (`cisco_ios_xe` → `cisco_ios` → base), so an unknown platform always
//! gets a usable driver.

mod arista_eos;
mod cisco_ios;
mod cisco_nxos;
mod driver;
pub mod helpers;
mod juniper_junos;
mod registry;

pub use arista_eos::AristaEosDriver;
pub use cisco_ios::CiscoIosDriver;
pub use cisco_nxos::CiscoNxosDriver;
pub use driver::{default_shape_output, BaseDriver, VendorDriver, COLLECTION_LIST_KEYS, SINGLETON_COLLECTIONS};
pub use juniper_junos::JuniperJunosDriver;
pub use registry::DriverRegistry;
