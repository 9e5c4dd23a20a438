mod issue_report;
mod location;

pub use issue_report::{CreateIssueReport, IssueReport, ReportStatus};
pub use location::GeoPoint;
