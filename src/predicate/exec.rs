//! The `-exec`/`-exec ... +`/`-ok` state machine (§3 "Execution buffer",
//! §4.G "Execute state machine"). Spawning itself is delegated (§1): this
//! module owns only the state transitions and argument accumulation: the
//! traversal/evaluator calls [`ExecBuffer::push`] / [`ExecBuffer::flush`] and
//! hands the assembled argv to a caller-supplied spawn callback.

use std::path::PathBuf;

use crate::support::DynArray;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    Single,
    Batch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecFlags {
    /// `-ok`/`-okdir`: prompt before spawning.
    pub confirm: bool,
    /// `-execdir`/`-okdir`: rebind the working directory to the file's
    /// parent before spawning.
    pub chdir: bool,
}

/// A parsed `-exec ... {} ...` template: the argv tokens plus which ones
/// contain a placeholder. An implicit trailing `{}` is recorded as a
/// synthetic final token when the user supplied none (§4.G).
#[derive(Debug, Clone)]
pub struct ExecTemplate {
    pub prefix: Vec<String>,
    /// `None` means "use the placeholder verbatim" (plain `{}`); `Some` holds
    /// the specific placeholder variant used in this token.
    pub placeholder: Placeholder,
    pub suffix: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    /// `{}` — the full path.
    Path,
    /// `{/}` — basename.
    Basename,
    /// `{//}` — parent directory.
    Dirname,
    /// `{.}` — path without extension.
    PathNoExt,
    /// `{/.}` — basename without extension.
    BasenameNoExt,
}

impl Placeholder {
    pub fn render(self, path: &std::path::Path) -> String {
        match self {
            Placeholder::Path => path.to_string_lossy().into_owned(),
            Placeholder::Basename => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Placeholder::Dirname => path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Placeholder::PathNoExt => strip_ext(path).to_string_lossy().into_owned(),
            Placeholder::BasenameNoExt => path
                .file_name()
                .map(|n| strip_ext(std::path::Path::new(n)).to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

fn strip_ext(path: &std::path::Path) -> PathBuf {
    match path.extension() {
        Some(ext) => {
            let full = path.as_os_str().to_string_lossy();
            let suffix_len = ext.len() + 1;
            PathBuf::from(&full[..full.len() - suffix_len])
        }
        None => path.to_path_buf(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    OpenWd,
    Accumulate,
    Flush,
}

/// Owning state for one `-exec`/`-exec +` node. Lives on the node (§3); the
/// evaluator borrows it mutably while visiting files.
#[derive(Debug)]
pub struct ExecBuffer {
    pub mode: ExecMode,
    pub flags: ExecFlags,
    pub template: ExecTemplate,
    state: State,
    accumulated: DynArray<String>,
    arg_byte_budget: usize,
    bytes_used: usize,
    workdir_parent: Option<PathBuf>,
    pub deferred_result: i32,
}

/// A fully assembled argv ready to hand to the (external) spawn callback.
#[derive(Debug, Clone)]
pub struct Spawn {
    pub argv: Vec<String>,
    pub working_directory: Option<PathBuf>,
}

impl ExecBuffer {
    pub fn new(mode: ExecMode, flags: ExecFlags, template: ExecTemplate, arg_byte_budget: usize) -> Self {
        ExecBuffer {
            mode,
            flags,
            template,
            state: State::Idle,
            accumulated: DynArray::new(),
            arg_byte_budget,
            bytes_used: 0,
            workdir_parent: None,
            deferred_result: 0,
        }
    }

    /// Consume one matched file. Returns a ready-to-spawn batch in single
    /// mode, or in batch mode whenever a flush was forced by a budget/wd
    /// change (the caller must spawn it before calling `push` again).
    pub fn push(&mut self, path: &std::path::Path) -> Option<Spawn> {
        match self.mode {
            ExecMode::Single => Some(self.build_single(path)),
            ExecMode::Batch => self.push_batch(path),
        }
    }

    /// Force a flush of whatever is accumulated (end of traversal).
    pub fn finish(&mut self) -> Option<Spawn> {
        if self.mode == ExecMode::Batch && !self.accumulated.is_empty() {
            return Some(self.flush());
        }
        None
    }

    fn build_single(&mut self, path: &std::path::Path) -> Spawn {
        self.state = State::Idle;
        let mut argv = self.template.prefix.clone();
        argv.push(self.template.placeholder.render(path));
        argv.extend(self.template.suffix.clone());
        let working_directory = if self.flags.chdir {
            self.state = State::OpenWd;
            path.parent().map(PathBuf::from)
        } else {
            None
        };
        self.state = State::Idle;
        Spawn { argv, working_directory }
    }

    fn push_batch(&mut self, path: &std::path::Path) -> Option<Spawn> {
        let rendered = self.template.placeholder.render(path);
        let same_parent = self
            .workdir_parent
            .as_deref()
            .map(|p| Some(p) == path.parent())
            .unwrap_or(true);
        let would_overflow = self.bytes_used + rendered.len() + 1 > self.arg_byte_budget;

        let mut flushed = None;
        if (self.flags.chdir && !same_parent) || (would_overflow && !self.accumulated.is_empty()) {
            self.state = State::Flush;
            flushed = Some(self.flush());
        }

        if self.flags.chdir && self.workdir_parent.is_none() {
            self.state = State::OpenWd;
            self.workdir_parent = path.parent().map(PathBuf::from);
        }
        self.state = State::Accumulate;
        self.bytes_used += rendered.len() + 1;
        self.accumulated.push(rendered);
        flushed
    }

    fn flush(&mut self) -> Spawn {
        let mut argv = self.template.prefix.clone();
        argv.extend(self.accumulated.drain_all());
        argv.extend(self.template.suffix.clone());
        self.bytes_used = 0;
        let working_directory = self.workdir_parent.take();
        self.state = State::Idle;
        Spawn { argv, working_directory }
    }

    /// `-ok`/`-okdir` confirmation: display `argv` and read one byte from
    /// `reader`; proceeds only if it starts with 'y'/'Y'.
    pub fn confirm(argv: &[String], mut reader: impl std::io::Read) -> bool {
        eprint!("< ");
        for (i, a) in argv.iter().enumerate() {
            if i > 0 {
                eprint!(" ");
            }
            eprint!("{a}");
        }
        eprint!(" ? ");
        let mut byte = [0u8; 1];
        match reader.read(&mut byte) {
            Ok(1) => byte[0] == b'y' || byte[0] == b'Y',
            _ => false,
        }
    }
}

/// A compiled `-exec`/`-exec +` node payload (§3 "Execution buffer").
/// Owns the buffer in a `RefCell` because the evaluator only ever holds a
/// shared reference to the expression tree while visiting files (§5: a
/// single consumer thread drives all callbacks, so no synchronization beyond
/// interior mutability is required).
pub struct ExecSpec {
    pub buffer: std::cell::RefCell<ExecBuffer>,
}

impl std::fmt::Debug for ExecSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecSpec").finish_non_exhaustive()
    }
}

/// Child-process spawning is delegated (§1 Non-goals): the evaluator only
/// ever calls through this trait, never `std::process::Command` directly.
pub trait ProcessSpawner {
    fn spawn(&mut self, spawn: &Spawn) -> std::io::Result<i32>;
}

/// The spawner this core ships: a plain blocking `std::process::Command`
/// invocation, waiting for the child before returning.
#[derive(Default)]
pub struct DefaultSpawner;

impl ProcessSpawner for DefaultSpawner {
    fn spawn(&mut self, spawn: &Spawn) -> std::io::Result<i32> {
        let Some((program, args)) = spawn.argv.split_first() else {
            return Ok(0);
        };
        let mut command = std::process::Command::new(program);
        command.args(args);
        if let Some(dir) = &spawn.working_directory {
            command.current_dir(dir);
        }
        let status = command.status()?;
        Ok(status.code().unwrap_or(-1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(placeholder: Placeholder) -> ExecTemplate {
        ExecTemplate { prefix: vec!["echo".into()], placeholder, suffix: vec![] }
    }

    #[test]
    fn single_mode_builds_one_argv_per_file() {
        let mut buf = ExecBuffer::new(ExecMode::Single, ExecFlags::default(), template(Placeholder::Path), 1 << 20);
        let spawn = buf.push(std::path::Path::new("/tmp/a.txt")).unwrap();
        assert_eq!(spawn.argv, vec!["echo", "/tmp/a.txt"]);
    }

    #[test]
    fn batch_mode_flushes_on_budget_overflow() {
        let mut buf = ExecBuffer::new(ExecMode::Batch, ExecFlags::default(), template(Placeholder::Path), 10);
        assert!(buf.push(std::path::Path::new("a")).is_none());
        // "a" (1) + "bbbbbbbbbb" (10) would exceed the 10-byte budget, forcing a flush first.
        let flushed = buf.push(std::path::Path::new("bbbbbbbbbb"));
        assert!(flushed.is_some());
        assert_eq!(flushed.unwrap().argv, vec!["echo", "a"]);
    }

    #[test]
    fn batch_mode_finish_flushes_remainder() {
        let mut buf = ExecBuffer::new(ExecMode::Batch, ExecFlags::default(), template(Placeholder::Path), 1 << 20);
        buf.push(std::path::Path::new("a"));
        buf.push(std::path::Path::new("b"));
        let spawn = buf.finish().unwrap();
        assert_eq!(spawn.argv, vec!["echo", "a", "b"]);
    }

    #[test]
    fn placeholder_basename_and_no_ext() {
        let p = std::path::Path::new("/a/b/file.tar.gz");
        assert_eq!(Placeholder::Basename.render(p), "file.tar.gz");
        assert_eq!(Placeholder::BasenameNoExt.render(p), "file.tar");
        assert_eq!(Placeholder::Dirname.render(p), "/a/b");
        assert_eq!(Placeholder::PathNoExt.render(p), "/a/b/file.tar");
    }
}
