//! Leaf predicate and action evaluation (§4.G), one module per `NodeKind`
//! family that needs more than a line of logic in the evaluator.

pub mod capability;
pub mod delete;
pub mod exec;
pub mod filetype;
pub mod format;
pub mod name;
pub mod perm;
pub mod print;
pub mod regexp;
pub mod samefile;
pub mod tritest;

pub use capability::{CapabilityProbe, DefaultCapabilities, Tri};
pub use exec::ExecSpec;
pub use print::{PrintSpec, Sink, SinkId};
