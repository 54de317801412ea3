//! MongoDB access for Bedrock.
//!
//! The [`Engine`] trait is the seam between the bootstrap procedure and the
//! database: [`mongo::MongoEngine`] talks to a real deployment,
//! [`memory::MemoryEngine`] keeps everything in process with the same error
//! semantics.

pub mod bootstrap;
pub mod engine;
pub mod error;
pub mod memory;
pub mod module;
pub mod mongo;
pub mod plan;

pub use bootstrap::{BootstrapMode, BootstrapReport, BootstrapStatus, StepOutcome};
pub use engine::{AdminSession, Engine};
pub use error::{BootstrapError, EngineError};
pub use module::DbModule;
pub use plan::{BootstrapPlan, RoleGrant, UserSpec};
