mod service;
mod session;

pub use service::DispatchService;
pub use session::{run_dispatch_session, DispatchInbox, DispatchInput, SessionClock, SessionError};
