//! 核心层：错误与恢复、会话状态、主控循环与组装

pub mod builder;
pub mod controller;
pub mod error;
pub mod recovery;
pub mod session;
pub mod state;

pub use builder::ControllerBuilder;
pub use controller::{Controller, UiEvent};
pub use error::{ControllerError, ErrorKind};
pub use recovery::{Recovery, RecoveryEngine};
pub use session::SessionStore;
pub use state::{
    Artifact, CurriculumTree, ExamType, Profile, ProfilePatch, ResultSection, SessionState,
};
