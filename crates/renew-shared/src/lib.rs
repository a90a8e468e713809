//! Shared types for renewd: platform, command plans, step reports and the
//! HTTP request/response bodies.

pub mod error;
pub mod plan;
pub mod platform;
pub mod rpc;

pub use error::RenewError;
pub use plan::{CommandOutcome, CommandSpec, PlanResult, StepReport};
pub use platform::PlatformKind;
pub use rpc::{RenewalRequest, RenewalResponse, StatusResponse};
