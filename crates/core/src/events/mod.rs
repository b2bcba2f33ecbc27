//! Telemetry: enrichment, the durable queue and the analytics uploader.

pub mod enrichment;
pub mod ports;
pub mod queue;
pub mod uploader;

pub use enrichment::EventEnricher;
pub use queue::EventQueue;
pub use uploader::AnalyticsUploader;
