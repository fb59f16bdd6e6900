// ARR Rollforward Dashboard - Core Library
// Exposes all modules for use in the CLI, API server, and tests

pub mod error;
pub mod period;
pub mod models;
pub mod loader;
pub mod rollforward;
pub mod segments;
pub mod kpi;
pub mod revenue;
pub mod reconciliation;
pub mod data_quality;
pub mod config;
pub mod logging;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use error::{ArrError, Result};
pub use period::{Period, PeriodRange};
pub use models::{Customer, Segment, Subscription, SubscriptionStatus, Transaction};
pub use loader::{DataSnapshot, LoadWarning};
pub use rollforward::{compute_monthly_snapshots, MonthlyArrSnapshot, Movement, RollforwardEngine};
pub use segments::{compute_segment_breakdown, SegmentBreakdown, SegmentTotals};
pub use kpi::{compute_kpis, growth_rate, ArrKpis};
pub use revenue::{compute_recognized_revenue, MonthlyRevenue};
pub use reconciliation::{
    Discrepancy, DiscrepancyCategory, ReconciliationEngine, ReconciliationReport,
};
pub use data_quality::{
    DataQualityEngine, QualityIssue, QualityReport, Severity,
    ValidationResult as QualityValidationResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
