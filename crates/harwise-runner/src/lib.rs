pub mod context;
pub mod engine;
pub mod error;
pub mod jsonpath;
pub mod stats;
pub mod transport;

pub use context::TestContext;
pub use engine::{RunReport, RunState, TestResult, TestRunner, TestStatus, TimingBreakdown};
pub use error::{Error, Result};
pub use stats::{RunSummary, percentile};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
