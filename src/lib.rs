//! `rfind`: walks a file tree in the tradition of `find(1)`, evaluating a
//! Boolean expression of tests and actions against every entry reached.
//!
//! The pipeline mirrors §3-§4 of the design: a [`parser`] builds an
//! [`expr::Arena`], an [`optimize`] pass rewrites it, a [`walk::Engine`]
//! drives traversal, and [`eval`] evaluates the tree against each
//! [`walk::FileRecord`] the engine hands it.

pub mod cli;
pub mod context;
pub mod control;
pub mod error;
pub mod eval;
pub mod expr;
pub mod filesystem;
pub mod optimize;
pub mod parser;
pub mod predicate;
pub mod support;
pub mod walk;

pub use context::Context;
pub use control::Control;
pub use error::RfindError;
