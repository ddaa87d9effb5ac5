//! `-print`/`-print0`/`-printf`/`-fprint*`/`-ls`/`-fls` (§4.G).
//!
//! Output sinks are owned by the [`Context`](crate::context::Context) and
//! deduplicated by target (§5 "Output sinks are deduplicated"); nodes only
//! carry a [`SinkId`] plus whatever formatting state they need.

use std::io::Write;

use crate::predicate::format::{self, FormatProgram, NameLookup};
use crate::walk::record::FileRecord;

/// Index into the context's sink table. `STDOUT` is reserved for the default
/// `-print`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(pub usize);

impl SinkId {
    pub const STDOUT: SinkId = SinkId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Newline,
    Nul,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintStyle {
    /// `-print`/`-fprint`: just the path.
    Plain,
    /// `-ls`/`-fls`: an `ls -dils`-style detailed line.
    Detailed,
}

#[derive(Debug)]
pub struct PrintSpec {
    pub sink: SinkId,
    pub format: Option<FormatProgram>,
    pub terminator: Terminator,
    pub style: PrintStyle,
}

/// One open output destination. `error_reported` implements §7's "surfaced
/// once per sink; cleared to avoid double-reporting at shutdown."
pub struct Sink {
    pub target: String,
    writer: Box<dyn Write>,
    error_reported: bool,
}

impl Sink {
    pub fn stdout() -> Self {
        Sink { target: "-".into(), writer: Box::new(std::io::stdout()), error_reported: false }
    }

    pub fn from_writer(target: String, writer: Box<dyn Write>) -> Self {
        Sink { target, writer, error_reported: false }
    }

    pub fn file(path: &std::path::Path) -> std::io::Result<Self> {
        let f = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Sink { target: path.to_string_lossy().into_owned(), writer: Box::new(f), error_reported: false })
    }

    pub fn write_line(&mut self, text: &str, terminator: Terminator) -> Result<(), crate::error::RfindError> {
        let result = (|| -> std::io::Result<()> {
            self.writer.write_all(text.as_bytes())?;
            match terminator {
                Terminator::Newline => self.writer.write_all(b"\n")?,
                Terminator::Nul => self.writer.write_all(b"\0")?,
            }
            Ok(())
        })();
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                if self.error_reported {
                    // Already surfaced once; stay quiet for subsequent writes.
                    self.error_reported = false;
                    Ok(())
                } else {
                    self.error_reported = true;
                    Err(crate::error::RfindError::SinkIo { target: self.target.clone(), source: e })
                }
            }
        }
    }
}

pub fn evaluate(
    spec: &PrintSpec,
    sink: &mut Sink,
    record: &mut FileRecord,
    lookup: &dyn NameLookup,
) -> Result<bool, crate::error::RfindError> {
    let text = match &spec.format {
        Some(program) => format::render(program, record, lookup),
        None => match spec.style {
            PrintStyle::Plain => record.path.clone(),
            PrintStyle::Detailed => detailed_line(record),
        },
    };
    sink.write_line(&text, spec.terminator)?;
    Ok(true)
}

fn detailed_line(record: &mut FileRecord) -> String {
    let meta = record.metadata();
    match meta {
        Some(m) => format!(
            "{:>8} {:>6} {:o} {:>3} {:>6} {:>6} {:>10} {}",
            m.inode,
            m.size.div_ceil(1024),
            m.mode & 0o7777,
            m.nlink,
            m.uid,
            m.gid,
            m.size,
            record.path
        ),
        None => record.path.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::field::FileKind;
    use crate::walk::record::VisitPhase;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn plain_print_writes_path() {
        let spec = PrintSpec { sink: SinkId::STDOUT, format: None, terminator: Terminator::Newline, style: PrintStyle::Plain };
        let shared = SharedBuf::default();
        let mut sink = Sink::from_writer("-".into(), Box::new(shared.clone()));
        let mut record = FileRecord::new(
            "./a/x.txt".into(),
            "./a".into(),
            4,
            1,
            FileKind::Regular,
            VisitPhase::Pre,
            "./a".into(),
        );
        evaluate(&spec, &mut sink, &mut record, &format::NoNameLookup).unwrap();
        assert_eq!(String::from_utf8(shared.0.borrow().clone()).unwrap(), "./a/x.txt\n");
    }
}
