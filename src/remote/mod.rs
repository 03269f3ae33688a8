//! 远程调用层：服务抽象与实现（HTTP / Mock），以及带审计日志的调用器

pub mod http;
pub mod invoker;
pub mod mock;
pub mod traits;

pub use http::HttpRemote;
pub use invoker::Invoker;
pub use mock::MockRemote;
pub use traits::{payload_error, Endpoint, RemoteFailure, RemoteService};
