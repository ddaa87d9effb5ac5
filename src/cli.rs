//! Command-line front-end (§6 "CLI surface"). Not the subject of this
//! specification (§1 Non-goals: "argument tokenization into the expression
//! tree"); this module is the thin, explicitly-acknowledged stand-in
//! SPEC_FULL.md §6 describes, built the way the teacher builds its own
//! `Opts`: a single `clap::Parser` derive translated once into runtime
//! configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::context::DebugFlags;
use crate::walk::Strategy;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Bfs,
    Dfs,
    Ids,
    Eds,
}

impl From<StrategyArg> for Strategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Bfs => Strategy::Bfs,
            StrategyArg::Dfs => Strategy::Dfs,
            StrategyArg::Ids => Strategy::Ids,
            StrategyArg::Eds => Strategy::Eds,
        }
    }
}

/// `rfind [flags] [roots...] [expression...]` (§6: roots, flags, and
/// expression atoms interleave in any order; this derive only pulls out the
/// flags clap recognizes by shape, leaving every other token — roots and
/// expression primaries alike — in `rest` for [`split_roots_and_expression`]
/// to classify).
#[derive(Parser, Debug)]
#[command(name = "rfind", about = "Walk a file tree and evaluate an expression of tests and actions against every entry.")]
pub struct Opts {
    /// Never follow symlinks (default).
    #[arg(short = 'P', help_heading = "Recursion policy")]
    pub no_follow: bool,
    /// Follow symlinks named as root arguments only.
    #[arg(short = 'H', help_heading = "Recursion policy")]
    pub follow_roots: bool,
    /// Follow every symlink encountered during the walk.
    #[arg(short = 'L', help_heading = "Recursion policy")]
    pub follow_all: bool,

    /// Accepted for compatibility with find's extended-regex selector; this
    /// core's `-regex`/`-iregex` already use `regex`'s own (a superset of
    /// POSIX ERE) syntax, so the flag changes nothing.
    #[arg(short = 'E', long = "extended-regexp")]
    pub extended_regexp: bool,

    /// Print matches NUL-separated rather than newline-separated when no
    /// explicit print-style action is given (§6 "xargs-safe-filter").
    #[arg(short = '0', long = "print0")]
    pub null_separator: bool,

    /// Visit a directory after its children rather than before.
    #[arg(long = "post-order")]
    pub post_order: bool,

    /// Sort each directory's entries by name before visiting them.
    #[arg(short = 's', long = "sort")]
    pub sort: bool,

    /// Never descend into a directory on a different device than its parent.
    #[arg(short = 'x', long = "mount", alias = "xdev")]
    pub dont_cross_mounts: bool,

    /// Read NUL-separated root paths from FILE (`-` for standard input),
    /// added to any roots given on the command line.
    #[arg(long = "files0-from", value_name = "FILE")]
    pub files0_from: Option<String>,

    /// Comma-separated debug topics: opt, rates, tree, exec (§4.F).
    #[arg(short = 'D', long = "debug", value_name = "FLAGS")]
    pub debug: Option<String>,

    /// Optimizer aggressiveness, 0-4 (§4.F).
    #[arg(short = 'O', long = "optimize-level", default_value_t = 1)]
    pub optimize_level: u8,

    /// Traversal order: bfs, dfs, ids (iterative deepening), eds
    /// (exponential deepening).
    #[arg(long = "strategy", value_enum, default_value_t = StrategyArg::Bfs)]
    pub strategy: StrategyArg,

    /// Number of worker threads for parallel directory reading.
    #[arg(short = 'j', long = "threads", default_value_t = 1)]
    pub threads: usize,

    /// Skip this glob pattern (matched against the full path), repeatable.
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Descend at most this many levels below the roots.
    #[arg(long = "maxdepth", value_name = "N")]
    pub maxdepth: Option<usize>,
    /// Don't apply tests/actions at levels shallower than this.
    #[arg(long = "mindepth", value_name = "N")]
    pub mindepth: Option<usize>,

    /// Suppress files already seen under the same identity (device+inode).
    #[arg(long = "unique")]
    pub unique: bool,

    /// Suppress "file vanished during the walk" diagnostics.
    #[arg(long = "ignore-races")]
    pub ignore_races: bool,

    /// Root paths and expression tokens, interleaved in any order (§6).
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub rest: Vec<String>,
}

impl Opts {
    pub fn follow_policy(&self) -> (bool, bool) {
        (self.follow_roots && !self.follow_all, self.follow_all)
    }

    pub fn debug_flags(&self) -> Result<DebugFlags, String> {
        let mut flags = DebugFlags::empty();
        let Some(raw) = &self.debug else {
            return Ok(flags);
        };
        for topic in raw.split(',') {
            flags.insert(match topic.trim() {
                "opt" => DebugFlags::OPT,
                "rates" => DebugFlags::RATES,
                "tree" => DebugFlags::TREE,
                "exec" => DebugFlags::EXEC,
                "" => continue,
                other => return Err(format!("unknown debug topic '{other}'")),
            });
        }
        Ok(flags)
    }
}

/// Split the interleaved trailing tokens into root paths and expression
/// tokens (§6: "three interleaved categories of tokens, in any order").
/// Leading tokens that look like plain paths (no leading `-`, not an
/// operator token) are roots; the first token that looks like an expression
/// atom or operator ends the root list, and everything from there on —
/// including any further bare tokens — belongs to the expression parser. If
/// no root-shaped token appears before the first expression-shaped one, `.`
/// is used as the sole root, matching find's own default.
pub fn split_roots_and_expression(rest: &[String]) -> (Vec<PathBuf>, Vec<String>) {
    let mut roots = Vec::new();
    let mut split_at = 0;
    for (i, tok) in rest.iter().enumerate() {
        if is_expression_token(tok) {
            split_at = i;
            return finish_split(roots, rest, split_at);
        }
        roots.push(PathBuf::from(tok));
        split_at = i + 1;
    }
    finish_split(roots, rest, split_at)
}

fn finish_split(mut roots: Vec<PathBuf>, rest: &[String], split_at: usize) -> (Vec<PathBuf>, Vec<String>) {
    if roots.is_empty() {
        roots.push(PathBuf::from("."));
    }
    (roots, rest[split_at..].to_vec())
}

fn is_expression_token(tok: &str) -> bool {
    tok.starts_with('-') || matches!(tok, "(" | ")" | "!" | ",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roots_stop_at_first_expression_token() {
        let rest = vec!["a".into(), "b".into(), "-name".into(), "*.rs".into()];
        let (roots, expr) = split_roots_and_expression(&rest);
        assert_eq!(roots, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(expr, vec!["-name".to_string(), "*.rs".to_string()]);
    }

    #[test]
    fn no_roots_defaults_to_dot() {
        let rest = vec!["-type".into(), "f".into()];
        let (roots, expr) = split_roots_and_expression(&rest);
        assert_eq!(roots, vec![PathBuf::from(".")]);
        assert_eq!(expr, vec!["-type".to_string(), "f".to_string()]);
    }

    #[test]
    fn no_expression_treats_everything_as_roots() {
        let rest = vec!["a".into(), "b".into()];
        let (roots, expr) = split_roots_and_expression(&rest);
        assert_eq!(roots, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert!(expr.is_empty());
    }

    #[test]
    fn debug_flags_parses_comma_list() {
        let opts = Opts {
            no_follow: false,
            follow_roots: false,
            follow_all: false,
            extended_regexp: false,
            null_separator: false,
            post_order: false,
            sort: false,
            dont_cross_mounts: false,
            files0_from: None,
            debug: Some("opt,exec".into()),
            optimize_level: 1,
            strategy: StrategyArg::Bfs,
            threads: 1,
            exclude: vec![],
            maxdepth: None,
            mindepth: None,
            unique: false,
            ignore_races: false,
            rest: vec![],
        };
        let flags = opts.debug_flags().unwrap();
        assert!(flags.contains(DebugFlags::OPT));
        assert!(flags.contains(DebugFlags::EXEC));
        assert!(!flags.contains(DebugFlags::RATES));
    }
}
