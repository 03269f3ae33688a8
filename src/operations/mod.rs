//! 操作层：输入提取、请求构造、注册表与分发器

pub mod builtin;
pub mod descriptor;
pub mod dispatcher;
pub mod input;
pub mod requests;

pub use builtin::{builtin_operations, builtin_registry, SUBJECTS};
pub use descriptor::{OperationDescriptor, OperationRegistry, RequestBuilder, ResponseRenderer};
pub use dispatcher::Dispatcher;
pub use input::{extract_all, Fallback, FieldKind, FieldSpec, FormInputs, InputSource, Inputs};
