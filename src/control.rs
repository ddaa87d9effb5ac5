//! The control-flow signal threaded between the evaluator and the traversal
//! engine (§3, §9: "model the evaluator's return as a `(bool, control)`
//! pair"), replacing the source's longjmp-based unwinding.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    /// Do not descend into this directory (no-op on a non-directory, and a
    /// no-op in post-order mode since descent already happened by the time
    /// the deferred visit runs; §9 Open Question).
    Prune,
    /// Unwind the whole walk; no further callbacks are delivered.
    Stop,
}
