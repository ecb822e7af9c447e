pub mod executor;
pub mod incident;
pub mod table;

pub use executor::{ActionError, ActionExecutor, ActionReceipt};
#[cfg(feature = "http-incidents")]
pub use incident::HttpIncidentReporter;
pub use incident::{IncidentReport, IncidentReporterOps};
pub use table::{dial_uri, ActionTable};
