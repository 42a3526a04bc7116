//! Log filters: criteria, matching and range scans.

mod criteria;
pub use criteria::{BlockRange, Clause, CriteriaError, LogCriteria};

mod matcher;

mod scan;
pub use scan::{QueryError, ScanLimits, ScanTarget, range_scan};
