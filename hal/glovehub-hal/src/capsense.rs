//! Capacitive-sensing middleware interface
//!
//! Leaf nodes acquire taxel values through a vendor-supplied middleware.
//! Its internals are opaque; only the scan lifecycle and the raw value
//! accessors are visible to node firmware.

/// Vendor capacitive-sensing middleware
pub trait CapSense {
    /// Start scanning all configured widgets
    fn start_scan(&mut self);

    /// Whether a scan is still in progress
    fn is_busy(&self) -> bool;

    /// Process the results of the last completed scan
    fn process_results(&mut self);

    /// Number of taxels this node exposes
    fn taxel_count(&self) -> usize;

    /// Raw count of one taxel from the last processed scan
    fn raw(&self, taxel: usize) -> u16;
}
