//! Optional worker pool for parallel directory reads (§4.C, §5): with
//! `threads > 1`, directory opening/enumeration happens off the consumer
//! thread, but every entry still reaches the evaluator through one ordered
//! channel so callbacks are never interleaved.

use std::path::PathBuf;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::walk::dirreader::{DirReader, RawEntry};

pub struct DirJob {
    pub seq: u64,
    pub path: PathBuf,
}

pub struct DirResult {
    pub seq: u64,
    pub path: PathBuf,
    pub entries: Vec<RawEntry>,
    pub error: Option<std::io::Error>,
}

/// A pool of `threads` workers, each pulling `DirJob`s and pushing
/// `DirResult`s. Dropping the pool closes the job channel, which joins the
/// workers once they drain their current job.
pub struct DirPool {
    /// `None` only after `Drop` has closed the channel to unblock workers;
    /// live for the whole pool's normal lifetime otherwise.
    jobs: Option<Sender<DirJob>>,
    results: Receiver<DirResult>,
    handles: Vec<std::thread::JoinHandle<()>>,
}

impl DirPool {
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let (job_tx, job_rx) = bounded::<DirJob>(threads * 4);
        let (result_tx, result_rx) = bounded::<DirResult>(threads * 4);
        let mut handles = Vec::with_capacity(threads);
        for _ in 0..threads {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            handles.push(std::thread::spawn(move || {
                while let Ok(job) = job_rx.recv() {
                    let mut reader = match DirReader::open(&job.path) {
                        Ok(r) => r,
                        Err(e) => {
                            let _ = result_tx.send(DirResult { seq: job.seq, path: job.path, entries: Vec::new(), error: Some(e) });
                            continue;
                        }
                    };
                    let (entries, error) = reader.read_all();
                    if result_tx.send(DirResult { seq: job.seq, path: job.path, entries, error }).is_err() {
                        break;
                    }
                }
            }));
        }
        DirPool { jobs: Some(job_tx), results: result_rx, handles }
    }

    pub fn submit(&self, job: DirJob) {
        if let Some(jobs) = &self.jobs {
            let _ = jobs.send(job);
        }
    }

    pub fn recv(&self) -> Option<DirResult> {
        self.results.recv().ok()
    }

    pub fn try_recv(&self) -> Option<DirResult> {
        self.results.try_recv().ok()
    }
}

impl Drop for DirPool {
    fn drop(&mut self) {
        // Workers block on `job_rx.recv()`; closing the only `Sender` before
        // joining is what makes that `recv()` return `Err` and the worker
        // loop exit. Field drop order alone isn't early enough for this,
        // since it runs after this function returns.
        self.jobs.take();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

/// Buffers out-of-order `DirResult`s until the next expected sequence number
/// is available, so submission order (the strategy's frontier order) is
/// preserved on the consumer side regardless of which worker finishes first.
#[derive(Default)]
pub struct ReorderBuffer {
    next: u64,
    pending: std::collections::BTreeMap<u64, DirResult>,
}

impl ReorderBuffer {
    pub fn new() -> Self {
        ReorderBuffer { next: 0, pending: std::collections::BTreeMap::new() }
    }

    pub fn offer(&mut self, result: DirResult) {
        self.pending.insert(result.seq, result);
    }

    pub fn drain_ready(&mut self) -> Vec<DirResult> {
        let mut ready = Vec::new();
        while let Some(result) = self.pending.remove(&self.next) {
            self.next += 1;
            ready.push(result);
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorder_buffer_releases_in_sequence_order() {
        let mut buf = ReorderBuffer::new();
        buf.offer(DirResult { seq: 1, path: "b".into(), entries: vec![], error: None });
        assert!(buf.drain_ready().is_empty());
        buf.offer(DirResult { seq: 0, path: "a".into(), entries: vec![], error: None });
        let ready = buf.drain_ready();
        assert_eq!(ready.len(), 2);
        assert_eq!(ready[0].path, PathBuf::from("a"));
        assert_eq!(ready[1].path, PathBuf::from("b"));
    }

    #[test]
    fn pool_reads_directory_contents() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"x").unwrap();
        let pool = DirPool::new(2);
        pool.submit(DirJob { seq: 0, path: dir.path().to_path_buf() });
        let result = pool.recv().unwrap();
        assert_eq!(result.entries.len(), 1);
    }
}
