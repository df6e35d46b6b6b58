pub mod navigation;
pub mod scan_handler;

pub use navigation::{NavEvent, View};
pub use scan_handler::{ScanHandler, ScanOutcome};
