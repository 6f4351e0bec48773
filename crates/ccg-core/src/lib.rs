pub mod error;
pub mod request;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use request::InvocationRequest;
pub use result::{ErrorDetail, InvocationResult};
pub use types::{Adapter, SandboxMode};
