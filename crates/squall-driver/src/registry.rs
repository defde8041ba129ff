use std::collections::HashMap;
use std::sync::Arc;

use squall_domain::VendorTag;
use tracing::{debug, info};

use crate::arista_eos::AristaEosDriver;
use crate::cisco_ios::CiscoIosDriver;
use crate::cisco_nxos::CiscoNxosDriver;
use crate::driver::{BaseDriver, VendorDriver};
use crate::juniper_junos::JuniperJunosDriver;

/// Dispatches to the correct [`VendorDriver`] by vendor tag.
///
/// Lookup walks the tag's suffix-truncation chain (`cisco_ios_xe` →
/// `cisco_ios`) and lands on the base driver when nothing matches; the
/// registry never fails to produce a usable driver.
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn VendorDriver>>,
    base: Arc<dyn VendorDriver>,
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl DriverRegistry {
    pub fn empty() -> Self {
        Self {
            drivers: HashMap::new(),
            base: Arc::new(BaseDriver),
        }
    }

    /// Registry with every built-in driver registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(&["cisco_ios", "cisco_ios_xe"], Arc::new(CiscoIosDriver));
        registry.register(&["cisco_nxos"], Arc::new(CiscoNxosDriver));
        registry.register(&["arista_eos"], Arc::new(AristaEosDriver));
        registry.register(&["juniper_junos"], Arc::new(JuniperJunosDriver));
        registry
    }

    /// Register a driver under one or more vendor tags. Returns `&mut self`
    /// for chaining.
    pub fn register(&mut self, tags: &[&str], driver: Arc<dyn VendorDriver>) -> &mut Self {
        for tag in tags {
            debug!(tag = *tag, driver = driver.vendor(), "registered driver");
            self.drivers.insert((*tag).to_string(), driver.clone());
        }
        self
    }

    /// Resolve the driver for a vendor tag, falling back along the
    /// truncation chain and finally to the base driver.
    pub fn driver_for(&self, vendor: &VendorTag) -> Arc<dyn VendorDriver> {
        for tag in vendor.fallbacks() {
            if let Some(driver) = self.drivers.get(tag.as_str()) {
                return driver.clone();
            }
        }
        info!(vendor = %vendor, "no driver registered, using base driver");
        self.base.clone()
    }

    /// Whether a dedicated (non-base) driver exists for this tag.
    pub fn has_driver(&self, vendor: &VendorTag) -> bool {
        vendor
            .fallbacks()
            .iter()
            .any(|tag| self.drivers.contains_key(tag.as_str()))
    }

    /// Registered vendor tags, sorted.
    pub fn registered_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.drivers.keys().cloned().collect();
        tags.sort();
        tags
    }
}
