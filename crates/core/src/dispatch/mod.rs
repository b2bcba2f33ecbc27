//! Authenticated request dispatch.

pub mod descriptor;
pub mod dispatcher;
pub mod operation;

pub use descriptor::{JsonParser, RawBody, RequestDescriptor, ResponseBody, ResponseParser};
pub use dispatcher::RequestDispatcher;
pub use operation::{AuthenticatedOperation, ExchangeOutcome, OperationState, PendingOperation};
