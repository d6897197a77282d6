pub mod report;
pub mod sink;

pub use report::{BucketStatus, Decommission, PeriodSummary, RegionStatus};
pub use sink::{ConsoleSink, FileSink, MemorySink, ReportError, ReportResult, ReportSink};
