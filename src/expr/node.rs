//! The expression tree's tagged node variants and common header (§3, §4.D).

use std::time::Duration;

use regex::bytes::Regex;

use crate::expr::field::{IntCmpSpec, ModeCmpSpec, SizeCmpSpec, StringTarget, TimeCmpSpec, TriPred, TypeMask};
use crate::predicate::exec::ExecSpec;
use crate::predicate::print::PrintSpec;

pub type NodeId = usize;

/// Per-node metadata common to every variant (§3 "Expression node / Header").
#[derive(Debug, Clone)]
pub struct Header {
    /// Byte offsets into the original argv, for diagnostics only.
    pub argv_span: (usize, usize),
    pub persistent_fds: u32,
    pub ephemeral_fds: u32,
    pub pure: bool,
    pub always_true: bool,
    pub always_false: bool,
    pub calls_stat: bool,
    pub cost: f64,
    pub probability: f64,
    pub evaluations: u64,
    pub successes: u64,
    pub elapsed: Duration,
}

impl Header {
    pub fn new(argv_span: (usize, usize)) -> Self {
        Header {
            argv_span,
            persistent_fds: 0,
            ephemeral_fds: 0,
            pure: false,
            always_true: false,
            always_false: false,
            calls_stat: false,
            cost: 0.0,
            probability: 0.5,
            evaluations: 0,
            successes: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// A glob or literal filename/path match (§4.G name/path/lname).
#[derive(Debug, Clone)]
pub struct StringMatchSpec {
    pub target: StringTarget,
    pub case_fold: bool,
    /// `Some` iff the pattern has no glob metacharacters, enabling the
    /// byte-equality fast path the spec calls out explicitly.
    pub literal: Option<Vec<u8>>,
    pub glob: globset::GlobMatcher,
    /// An unescaped trailing backslash makes the predicate unconditionally
    /// false (with a parse-time warning), per §4.G.
    pub always_false: bool,
    pub original: String,
}

#[derive(Debug, Clone)]
pub struct RegexSpec {
    pub regex: Regex,
    pub anchored: bool,
    pub target: StringTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SameFileSpec {
    pub device: u64,
    pub inode: u64,
}

/// The non-exhaustive closed set of node variants (§3).
#[derive(Debug)]
pub enum NodeKind {
    // Operators
    Not(NodeId),
    And(Vec<NodeId>),
    Or(Vec<NodeId>),
    Comma(Vec<NodeId>),

    // Predicates
    IntCmp(IntCmpSpec),
    SizeCmp(SizeCmpSpec),
    TimeCmp(TimeCmpSpec),
    ModeCmp(ModeCmpSpec),
    StringMatch(StringMatchSpec),
    Regex(RegexSpec),
    Type(TypeMask),
    XType(TypeMask),
    TriTest(TriPred),
    SameFile(SameFileSpec),

    // Actions
    Print(PrintSpec),
    Exec(ExecSpec),
    Delete,
    Prune,
    Quit,
    Exit(i32),
    True,
    False,
}

#[derive(Debug)]
pub struct Node {
    pub header: Header,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(kind: NodeKind, argv_span: (usize, usize)) -> Self {
        Node { header: Header::new(argv_span), kind }
    }

    pub fn is_parent(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Not(_) | NodeKind::And(_) | NodeKind::Or(_) | NodeKind::Comma(_)
        )
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Not(c) => std::slice::from_ref(c),
            NodeKind::And(cs) | NodeKind::Or(cs) | NodeKind::Comma(cs) => cs,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> &mut [NodeId] {
        match &mut self.kind {
            NodeKind::Not(c) => std::slice::from_mut(c),
            NodeKind::And(cs) | NodeKind::Or(cs) | NodeKind::Comma(cs) => cs,
            _ => &mut [],
        }
    }

    /// True for the nullary `Exit`/`Quit` tags that never return control to
    /// their caller in the normal sense (§3 invariant).
    pub fn is_terminal_action(&self) -> bool {
        matches!(self.kind, NodeKind::Quit | NodeKind::Exit(_))
    }
}
