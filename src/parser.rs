//! The argument-tokenization front-end (§1, §6): treated as an external
//! collaborator by the core's own spec, but a runnable binary still needs
//! one. This is "a thin, explicitly-out-of-scope-adjacent stand-in" per
//! SPEC_FULL.md §6: a real recursive-descent grammar over `(`, `)`, `!`,
//! `-not`, `-a`/`-and`, `-o`/`-or`, `,`, and the primaries of §4.G, built
//! directly on top of [`crate::expr::Arena`] and the predicate constructors
//! those modules already expose.
//!
//! Grammar (loosest to tightest binding):
//!
//! ```text
//! program   := comma_expr
//! comma_expr := or_expr ( "," or_expr )*
//! or_expr   := and_expr ( ("-o" | "-or") and_expr )*
//! and_expr  := unary ( [("-a" | "-and")]? unary )*      -- implicit AND
//! unary     := ("!" | "-not") unary | primary
//! primary   := "(" comma_expr ")" | atom
//! ```

use std::path::PathBuf;
use std::time::SystemTime;

use crate::error::RfindError;
use crate::expr::field::{
    Cmp, FileKind, IntCmpSpec, IntField, ModeCmpKind, ModeCmpSpec, SizeCmpSpec, SizeUnit, TimeCmpSpec, TimeKind,
    TimeUnit, TriPred, TypeMask,
};
use crate::expr::node::StringMatchSpec;
use crate::expr::{Arena, NodeId, NodeKind};
use crate::predicate::exec::{ExecBuffer, ExecFlags, ExecMode, ExecSpec, ExecTemplate, Placeholder};
use crate::predicate::print::{PrintSpec, PrintStyle, SinkId, Terminator};
use crate::predicate::{format, name, regexp, samefile};

/// Output of a successful parse: the expression tree root plus the ordered
/// list of `-fprint`/`-fprintf`/`-fls` sink targets referenced, in first
/// appearance order (index 0 is always the implicit stdout sink).
pub struct ParsedExpr {
    pub root: NodeId,
    pub sink_targets: Vec<String>,
}

struct Parser<'a> {
    arena: &'a mut Arena,
    tokens: &'a [String],
    pos: usize,
    sink_targets: Vec<String>,
    has_action: bool,
}

pub fn parse_program(arena: &mut Arena, tokens: &[String]) -> Result<ParsedExpr, RfindError> {
    let mut parser = Parser { arena, tokens, pos: 0, sink_targets: vec!["-".to_string()], has_action: false };
    let root = if tokens.is_empty() {
        parser.arena.new_node(NodeKind::True, (0, 0))
    } else {
        let root = parser.comma_expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(unexpected(&parser, "end of expression"));
        }
        root
    };
    let root = if parser.has_action {
        root
    } else {
        let print = parser.arena.new_node(default_print(), (parser.tokens.len(), parser.tokens.len()));
        let and = parser.arena.new_node(NodeKind::And(vec![]), (0, parser.tokens.len()));
        parser.arena.extend(and, [root, print]);
        and
    };
    Ok(ParsedExpr { root, sink_targets: parser.sink_targets })
}

/// Build an `-exclude`-style expression (SPEC_FULL.md §0, fd's own
/// `--exclude`): an `Or` of glob matches against the full path, one per
/// pattern, evaluated before the main expression (§4.E).
pub fn parse_exclude(arena: &mut Arena, patterns: &[String]) -> Result<Option<NodeId>, RfindError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut children = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let spec = name::build(pattern, crate::expr::field::StringTarget::Path, false)?;
        children.push(arena.new_node(NodeKind::StringMatch(spec), (0, 0)));
    }
    let or = arena.new_node(NodeKind::Or(children), (0, 0));
    Ok(Some(or))
}

fn default_print() -> NodeKind {
    NodeKind::Print(PrintSpec { sink: SinkId::STDOUT, format: None, terminator: Terminator::Newline, style: PrintStyle::Plain })
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn bump(&mut self) -> Option<&str> {
        let tok = self.tokens.get(self.pos).map(String::as_str);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect_operand(&mut self, primary: &str) -> Result<String, RfindError> {
        self.bump()
            .map(str::to_string)
            .ok_or_else(|| RfindError::Parse { message: format!("{primary}: missing argument"), argv_span: Some((self.pos, self.pos)) })
    }

    fn comma_expr(&mut self) -> Result<NodeId, RfindError> {
        let mut children = vec![self.or_expr()?];
        while self.peek() == Some(",") {
            self.bump();
            children.push(self.or_expr()?);
        }
        Ok(if children.len() == 1 { children.pop().unwrap() } else { self.arena.new_node(NodeKind::Comma(children), (0, 0)) })
    }

    fn or_expr(&mut self) -> Result<NodeId, RfindError> {
        let mut children = vec![self.and_expr()?];
        while matches!(self.peek(), Some("-o") | Some("-or")) {
            self.bump();
            children.push(self.and_expr()?);
        }
        Ok(if children.len() == 1 { children.pop().unwrap() } else { self.arena.new_node(NodeKind::Or(children), (0, 0)) })
    }

    fn and_expr(&mut self) -> Result<NodeId, RfindError> {
        let mut children = vec![self.unary()?];
        loop {
            match self.peek() {
                Some("-a") | Some("-and") => {
                    self.bump();
                    children.push(self.unary()?);
                }
                Some(tok) if self.starts_unary(tok) => {
                    children.push(self.unary()?);
                }
                _ => break,
            }
        }
        Ok(if children.len() == 1 { children.pop().unwrap() } else { self.arena.new_node(NodeKind::And(children), (0, 0)) })
    }

    /// Whether `tok` can begin a `unary` production, i.e. is not one of the
    /// lower-precedence operators or a closing paren. Used to recognize an
    /// implicit `-a` between two adjacent primaries.
    fn starts_unary(&self, tok: &str) -> bool {
        !matches!(tok, "-o" | "-or" | "," | ")")
    }

    fn unary(&mut self) -> Result<NodeId, RfindError> {
        if matches!(self.peek(), Some("!") | Some("-not")) {
            self.bump();
            let child = self.unary()?;
            return Ok(self.arena.new_node(NodeKind::Not(child), (0, 0)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<NodeId, RfindError> {
        match self.peek() {
            Some("(") => {
                self.bump();
                let inner = self.comma_expr()?;
                match self.bump() {
                    Some(")") => Ok(inner),
                    _ => Err(unexpected(self, "')'")),
                }
            }
            Some(_) => self.atom(),
            None => Err(unexpected(self, "an expression")),
        }
    }

    fn atom(&mut self) -> Result<NodeId, RfindError> {
        let span_start = self.pos;
        let tok = self.bump().expect("checked by caller").to_string();
        let kind = self.atom_kind(&tok)?;
        Ok(self.arena.new_node(kind, (span_start, self.pos)))
    }

    fn atom_kind(&mut self, tok: &str) -> Result<NodeKind, RfindError> {
        use crate::expr::field::StringTarget as T;
        Ok(match tok {
            "-true" => NodeKind::True,
            "-false" => NodeKind::False,
            "-prune" => NodeKind::Prune,
            "-quit" => NodeKind::Quit,
            "-exit" => {
                self.has_action = true;
                let code = self.peek().and_then(|t| t.parse::<i32>().ok());
                if code.is_some() {
                    self.bump();
                }
                NodeKind::Exit(code.unwrap_or(0))
            }
            "-delete" => {
                self.has_action = true;
                NodeKind::Delete
            }

            "-name" => self.string_match(T::Name, false)?,
            "-iname" => self.string_match(T::Name, true)?,
            "-path" | "-wholename" => self.string_match(T::Path, false)?,
            "-ipath" | "-iwholename" => self.string_match(T::Path, true)?,
            "-lname" => self.string_match(T::LinkTarget, false)?,
            "-ilname" => self.string_match(T::LinkTarget, true)?,

            "-regex" => self.regex(T::Path, false)?,
            "-iregex" => self.regex(T::Path, true)?,

            "-type" => self.type_mask(false)?,
            "-xtype" => self.type_mask(true)?,

            "-size" => self.size()?,
            "-perm" => self.perm()?,

            "-mtime" => self.day_count(TimeKind::Mtime)?,
            "-atime" => self.day_count(TimeKind::Atime)?,
            "-ctime" => self.day_count(TimeKind::Ctime)?,
            "-newer" => self.newer(TimeKind::Mtime)?,
            "-anewer" => self.newer(TimeKind::Atime)?,
            "-cnewer" => self.newer(TimeKind::Ctime)?,

            "-links" => self.int_cmp(IntField::Links)?,
            "-inum" => self.int_cmp(IntField::Inode)?,
            "-uid" => self.int_cmp(IntField::Uid)?,
            "-gid" => self.int_cmp(IntField::Gid)?,
            "-depth" => self.depth()?,

            "-samefile" => {
                let operand = self.expect_operand(tok)?;
                let spec = samefile::build(&PathBuf::from(operand))?;
                NodeKind::SameFile(spec)
            }

            "-empty" => NodeKind::TriTest(TriPred::Empty),
            "-readable" => NodeKind::TriTest(TriPred::Readable),
            "-writable" => NodeKind::TriTest(TriPred::Writable),
            "-executable" => NodeKind::TriTest(TriPred::Executable),
            "-acl" => NodeKind::TriTest(TriPred::Acl),
            "-capable" => NodeKind::TriTest(TriPred::Capable),
            "-xattr" => NodeKind::TriTest(TriPred::XAttr),
            "-sparse" => NodeKind::TriTest(TriPred::Sparse),
            "-nogroup" => NodeKind::TriTest(TriPred::NoGroup),
            "-nouser" => NodeKind::TriTest(TriPred::NoUser),
            "-hidden" => NodeKind::TriTest(TriPred::Hidden),

            "-print" => {
                self.has_action = true;
                NodeKind::Print(PrintSpec { sink: SinkId::STDOUT, format: None, terminator: Terminator::Newline, style: PrintStyle::Plain })
            }
            "-print0" => {
                self.has_action = true;
                NodeKind::Print(PrintSpec { sink: SinkId::STDOUT, format: None, terminator: Terminator::Nul, style: PrintStyle::Plain })
            }
            "-ls" => {
                self.has_action = true;
                NodeKind::Print(PrintSpec { sink: SinkId::STDOUT, format: None, terminator: Terminator::Newline, style: PrintStyle::Detailed })
            }
            "-printf" => {
                self.has_action = true;
                let format_str = self.expect_operand(tok)?;
                let (program, _flush) = format::parse(&format_str).map_err(|message| RfindError::Parse { message, argv_span: None })?;
                NodeKind::Print(PrintSpec { sink: SinkId::STDOUT, format: Some(program), terminator: Terminator::Newline, style: PrintStyle::Plain })
            }
            "-fprint" => {
                self.has_action = true;
                let target = self.expect_operand(tok)?;
                let sink = self.sink_index_for(&target);
                NodeKind::Print(PrintSpec { sink, format: None, terminator: Terminator::Newline, style: PrintStyle::Plain })
            }
            "-fprint0" => {
                self.has_action = true;
                let target = self.expect_operand(tok)?;
                let sink = self.sink_index_for(&target);
                NodeKind::Print(PrintSpec { sink, format: None, terminator: Terminator::Nul, style: PrintStyle::Plain })
            }
            "-fprintf" => {
                self.has_action = true;
                let target = self.expect_operand(tok)?;
                let format_str = self.expect_operand(tok)?;
                let sink = self.sink_index_for(&target);
                let (program, _flush) = format::parse(&format_str).map_err(|message| RfindError::Parse { message, argv_span: None })?;
                NodeKind::Print(PrintSpec { sink, format: Some(program), terminator: Terminator::Newline, style: PrintStyle::Plain })
            }
            "-fls" => {
                self.has_action = true;
                let target = self.expect_operand(tok)?;
                let sink = self.sink_index_for(&target);
                NodeKind::Print(PrintSpec { sink, format: None, terminator: Terminator::Newline, style: PrintStyle::Detailed })
            }

            "-exec" | "-execdir" | "-ok" | "-okdir" => self.exec(tok)?,

            other => return Err(RfindError::Parse { message: format!("unknown predicate '{other}'"), argv_span: Some((self.pos - 1, self.pos)) }),
        })
    }

    fn string_match(&mut self, target: crate::expr::field::StringTarget, case_fold: bool) -> Result<NodeKind, RfindError> {
        let pattern = self.expect_operand("pattern")?;
        let spec: StringMatchSpec = name::build(&pattern, target, case_fold)?;
        Ok(NodeKind::StringMatch(spec))
    }

    fn regex(&mut self, target: crate::expr::field::StringTarget, case_fold: bool) -> Result<NodeKind, RfindError> {
        let pattern = self.expect_operand("regex")?;
        let spec = regexp::build(&pattern, target, case_fold, true)?;
        Ok(NodeKind::Regex(spec))
    }

    fn type_mask(&mut self, is_xtype: bool) -> Result<NodeKind, RfindError> {
        let operand = self.expect_operand("type")?;
        let mut mask = TypeMask::BOTTOM;
        for letter in operand.split(',') {
            let kind = match letter.trim() {
                "f" => FileKind::Regular,
                "d" => FileKind::Dir,
                "l" => FileKind::Symlink,
                "b" => FileKind::BlockDev,
                "c" => FileKind::CharDev,
                "p" => FileKind::Fifo,
                "s" => FileKind::Socket,
                "D" => FileKind::Door,
                "w" => FileKind::Whiteout,
                other => return Err(RfindError::Parse { message: format!("unknown file type '{other}'"), argv_span: None }),
            };
            mask = mask.union(TypeMask::single(kind));
        }
        Ok(if is_xtype { NodeKind::XType(mask) } else { NodeKind::Type(mask) })
    }

    fn size(&mut self) -> Result<NodeKind, RfindError> {
        let operand = self.expect_operand("size")?;
        let (cmp, digits, suffix) = split_signed(&operand)?;
        let unit = match suffix {
            "" | "b" => SizeUnit::Blocks512,
            "c" => SizeUnit::Bytes,
            "w" => SizeUnit::Words2,
            "k" => SizeUnit::KiB,
            "M" => SizeUnit::MiB,
            "G" => SizeUnit::GiB,
            "T" => SizeUnit::TiB,
            "P" => SizeUnit::PiB,
            other => return Err(RfindError::Parse { message: format!("unknown size unit '{other}'"), argv_span: None }),
        };
        let operand: i64 = digits.parse().map_err(|_| bad_number("size", &operand))?;
        Ok(NodeKind::SizeCmp(SizeCmpSpec { unit, cmp, operand }))
    }

    fn perm(&mut self) -> Result<NodeKind, RfindError> {
        let operand = self.expect_operand("perm")?;
        let (cmp, digits) = match operand.strip_prefix('-') {
            Some(rest) => (ModeCmpKind::All, rest),
            None => match operand.strip_prefix('/') {
                Some(rest) => (ModeCmpKind::Any, rest),
                None => (ModeCmpKind::Exact, operand.as_str()),
            },
        };
        let set_bits = u32::from_str_radix(digits, 8).map_err(|_| bad_number("perm", &operand))?;
        Ok(NodeKind::ModeCmp(ModeCmpSpec { set_bits, clear_bits: 0, cmp }))
    }

    fn int_cmp(&mut self, field: IntField) -> Result<NodeKind, RfindError> {
        let operand = self.expect_operand("int")?;
        let (cmp, n) = parse_signed(&operand)?;
        Ok(NodeKind::IntCmp(IntCmpSpec { field, cmp, operand: n }))
    }

    /// `-depth N` is this spec's own primary (§8 worked example 5), not the
    /// classic `find -depth` post-order flag — that toggle lives on
    /// `WalkConfig::post_order` and is set by the CLI front-end, not here.
    /// A bare `-depth` with no numeric-looking operand is treated as `-true`
    /// so it never breaks expressions ported from scripts that used it as a
    /// no-op marker.
    fn depth(&mut self) -> Result<NodeKind, RfindError> {
        match self.peek().and_then(|t| parse_signed(t).ok()) {
            Some((cmp, n)) => {
                self.bump();
                Ok(NodeKind::IntCmp(IntCmpSpec { field: IntField::Depth, cmp, operand: n }))
            }
            None => Ok(NodeKind::True),
        }
    }

    fn day_count(&mut self, which: TimeKind) -> Result<NodeKind, RfindError> {
        let operand = self.expect_operand("time")?;
        let (cmp, n) = parse_signed(&operand)?;
        let (cmp, operand) = negate_age(cmp, n);
        Ok(NodeKind::TimeCmp(TimeCmpSpec { which, unit: TimeUnit::Days, cmp, reference: now(), operand }))
    }

    fn newer(&mut self, which: TimeKind) -> Result<NodeKind, RfindError> {
        let path = self.expect_operand("newer")?;
        let meta = std::fs::metadata(&path).map_err(|e| RfindError::Parse { message: format!("'{path}': {e}"), argv_span: None })?;
        // Compares like against like: `-anewer`'s reference instant is the
        // reference file's own atime, not its mtime, and similarly for ctime.
        use std::os::unix::fs::MetadataExt;
        let reference = match which {
            TimeKind::Mtime => meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            TimeKind::Atime => meta.accessed().unwrap_or(SystemTime::UNIX_EPOCH),
            TimeKind::Ctime => SystemTime::UNIX_EPOCH + std::time::Duration::new(meta.ctime().max(0) as u64, meta.ctime_nsec().max(0) as u32),
        };
        Ok(NodeKind::TimeCmp(TimeCmpSpec { which, unit: TimeUnit::Seconds, cmp: Cmp::Gt, reference, operand: 0 }))
    }

    fn exec(&mut self, tok: &str) -> Result<NodeKind, RfindError> {
        self.has_action = true;
        let confirm = matches!(tok, "-ok" | "-okdir");
        let chdir = matches!(tok, "-execdir" | "-okdir");

        let mut raw = Vec::new();
        let mode = loop {
            match self.bump() {
                Some(";") => break ExecMode::Single,
                Some("+") => break ExecMode::Batch,
                Some(t) => raw.push(t.to_string()),
                None => return Err(RfindError::Parse { message: format!("{tok}: missing terminating ';' or '+'"), argv_span: None }),
            }
        };
        if raw.is_empty() {
            return Err(RfindError::Parse { message: format!("{tok}: missing command"), argv_span: None });
        }

        let placeholder_index = raw.iter().position(|t| placeholder_of(t).is_some());
        let template = match placeholder_index {
            Some(idx) => ExecTemplate {
                prefix: raw[..idx].to_vec(),
                placeholder: placeholder_of(&raw[idx]).expect("checked by position"),
                suffix: raw[idx + 1..].to_vec(),
            },
            None => ExecTemplate { prefix: raw, placeholder: Placeholder::Path, suffix: Vec::new() },
        };

        let budget = arg_byte_budget();
        let buffer = ExecBuffer::new(mode, ExecFlags { confirm, chdir }, template, budget);
        Ok(NodeKind::Exec(ExecSpec { buffer: std::cell::RefCell::new(buffer) }))
    }

    fn sink_index_for(&mut self, target: &str) -> SinkId {
        if let Some(idx) = self.sink_targets.iter().position(|t| t == target) {
            return SinkId(idx);
        }
        self.sink_targets.push(target.to_string());
        SinkId(self.sink_targets.len() - 1)
    }
}

fn placeholder_of(tok: &str) -> Option<Placeholder> {
    match tok {
        "{}" => Some(Placeholder::Path),
        "{/}" => Some(Placeholder::Basename),
        "{//}" => Some(Placeholder::Dirname),
        "{.}" => Some(Placeholder::PathNoExt),
        "{/.}" => Some(Placeholder::BasenameNoExt),
        _ => None,
    }
}

/// Split a `[+-]DIGITS[SUFFIX]` operand into its comparison sense, the
/// digit run, and whatever non-digit suffix follows (used by `-size`, where
/// the suffix is a unit letter).
fn split_signed(tok: &str) -> Result<(Cmp, &str, &str), RfindError> {
    let (cmp, rest) = match tok.strip_prefix('+') {
        Some(rest) => (Cmp::Gt, rest),
        None => match tok.strip_prefix('-') {
            Some(rest) => (Cmp::Lt, rest),
            None => (Cmp::Eq, tok),
        },
    };
    let split_at = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if split_at == 0 {
        return Err(bad_number("numeric", tok));
    }
    Ok((cmp, &rest[..split_at], &rest[split_at..]))
}

fn parse_signed(tok: &str) -> Result<(Cmp, i64), RfindError> {
    let (cmp, digits, suffix) = split_signed(tok)?;
    if !suffix.is_empty() {
        return Err(bad_number("numeric", tok));
    }
    let n: i64 = digits.parse().map_err(|_| bad_number("numeric", tok))?;
    Ok((cmp, n))
}

/// `-mtime`/`-atime`/`-ctime` express an *age* ("modified more than N days
/// ago"), while [`TimeCmpSpec`] stores `sign(stat_time - reference)`
/// directly. With `reference = now`, age and that difference have opposite
/// sign, so `+n`/`-n`/`n` (parsed as `Gt`/`Lt`/`Eq` against `n`) map to
/// `Lt`/`Gt`/`Eq` against `-n` (§4.G "time").
fn negate_age(cmp: Cmp, n: i64) -> (Cmp, i64) {
    let cmp = match cmp {
        Cmp::Gt => Cmp::Lt,
        Cmp::Lt => Cmp::Gt,
        Cmp::Eq => Cmp::Eq,
    };
    (cmp, -n)
}

fn now() -> SystemTime {
    SystemTime::now()
}

/// The safe per-spawn argv byte budget for `-exec ... +` batching (§3
/// "Execution buffer"). Sourced from the platform's real `ARG_MAX` via
/// `nix::unistd::sysconf` rather than the `argmax` crate: the execute state
/// machine here already owns the flush/budget bookkeeping end to end (§4.G),
/// and `argmax`'s own `Command` wrapper would duplicate that batching inside
/// itself rather than let this module drive it, so the dependency was
/// dropped (noted in DESIGN.md).
#[cfg(unix)]
fn arg_byte_budget() -> usize {
    const FALLBACK: usize = 128 * 1024;
    nix::unistd::sysconf(nix::unistd::SysconfVar::ARG_MAX)
        .ok()
        .flatten()
        .and_then(|v| usize::try_from(v).ok())
        .map(|v| v.saturating_sub(2048)) // leave headroom for argv[0]/environ overhead
        .unwrap_or(FALLBACK)
}

#[cfg(not(unix))]
fn arg_byte_budget() -> usize {
    128 * 1024
}

fn bad_number(context: &str, tok: &str) -> RfindError {
    RfindError::Parse { message: format!("{context}: '{tok}' is not a valid number"), argv_span: None }
}

fn unexpected(parser: &Parser, expected: &str) -> RfindError {
    let found = parser.peek().map(|t| format!("'{t}'")).unwrap_or_else(|| "end of expression".to_string());
    RfindError::Parse { message: format!("expected {expected}, found {found}"), argv_span: Some((parser.pos, parser.pos)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::NodeKind;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn empty_expression_defaults_to_print() {
        let mut arena = Arena::new();
        let parsed = parse_program(&mut arena, &[]).unwrap();
        assert!(matches!(arena.get(parsed.root).kind, NodeKind::True));
    }

    #[test]
    fn implicit_and_between_adjacent_primaries() {
        let mut arena = Arena::new();
        let parsed = parse_program(&mut arena, &toks("-type f -name *.txt")).unwrap();
        // Wrapped in an implicit `and` with the default -print appended.
        match &arena.get(parsed.root).kind {
            NodeKind::And(children) => assert_eq!(children.len(), 2),
            other => panic!("expected an implicit and, got {other:?}"),
        }
    }

    #[test]
    fn explicit_print_suppresses_default() {
        let mut arena = Arena::new();
        let parsed = parse_program(&mut arena, &toks("-name x -print")).unwrap();
        match &arena.get(parsed.root).kind {
            NodeKind::And(children) => assert_eq!(children.len(), 2),
            other => panic!("unexpected root {other:?}"),
        }
    }

    #[test]
    fn parenthesized_or_groups_correctly() {
        let mut arena = Arena::new();
        let parsed = parse_program(&mut arena, &toks("( -name *.log -o -name *.tmp ) -delete")).unwrap();
        match &arena.get(parsed.root).kind {
            NodeKind::And(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(arena.get(children[0]).kind, NodeKind::Or(_)));
                assert!(matches!(arena.get(children[1]).kind, NodeKind::Delete));
            }
            other => panic!("unexpected root {other:?}"),
        }
    }

    #[test]
    fn double_negation_parses_as_nested_not() {
        let mut arena = Arena::new();
        let parsed = parse_program(&mut arena, &toks("! ! -name x")).unwrap();
        match &arena.get(parsed.root).kind {
            NodeKind::And(children) => {
                assert!(matches!(arena.get(children[0]).kind, NodeKind::Not(_)));
            }
            other => panic!("unexpected root {other:?}"),
        }
    }

    #[test]
    fn depth_with_numeric_operand_builds_int_cmp() {
        let mut arena = Arena::new();
        let parsed = parse_program(&mut arena, &toks("-depth 2 -a -true")).unwrap();
        match &arena.get(parsed.root).kind {
            NodeKind::And(children) => assert!(matches!(arena.get(children[0]).kind, NodeKind::IntCmp(_))),
            other => panic!("unexpected root {other:?}"),
        }
    }

    #[test]
    fn size_operand_without_suffix_is_512_byte_blocks() {
        let mut arena = Arena::new();
        let parsed = parse_program(&mut arena, &toks("-size +1k")).unwrap();
        match &arena.get(parsed.root).kind {
            NodeKind::And(children) => match &arena.get(children[0]).kind {
                NodeKind::SizeCmp(spec) => {
                    assert_eq!(spec.unit, SizeUnit::KiB);
                    assert_eq!(spec.operand, 1);
                    assert_eq!(spec.cmp, Cmp::Gt);
                }
                other => panic!("unexpected node {other:?}"),
            },
            other => panic!("unexpected root {other:?}"),
        }
    }

    #[test]
    fn exec_with_implicit_trailing_placeholder() {
        let mut arena = Arena::new();
        let parsed = parse_program(&mut arena, &toks("-exec echo ;")).unwrap();
        match &arena.get(parsed.root).kind {
            NodeKind::And(children) => assert!(matches!(arena.get(children[0]).kind, NodeKind::Exec(_))),
            other => panic!("unexpected root {other:?}"),
        }
    }

    #[test]
    fn unknown_predicate_is_a_parse_error() {
        let mut arena = Arena::new();
        assert!(parse_program(&mut arena, &toks("-bogus")).is_err());
    }
}
