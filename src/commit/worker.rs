//! Background save worker.
//!
//! Editors save off the UI thread. [`SaveWorker`] owns a coordinator on a
//! dedicated thread and runs submitted jobs strictly one at a time, in
//! submission order. Each job hands over ownership of its unit; the unit
//! comes back with the outcome through the sink channel.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use super::coordinator::{CommitCoordinator, SaveRequest};
use super::outcome::CommitOutcome;
use crate::Result;
use crate::codec::ArchiveCodec;
use crate::model::ArchiveUnit;
use crate::profile::{KeyPrompt, ProfileSelection};
use crate::registry::FileRegistry;

/// A save request that owns its unit.
#[derive(Debug)]
pub struct SaveJob {
    /// The unit to save.
    pub unit: ArchiveUnit,
    /// Where to save it.
    pub target: PathBuf,
    /// The cipher to save under.
    pub selection: ProfileSelection,
    /// Format version to write, if changing.
    pub version: Option<i32>,
}

impl SaveJob {
    /// Creates a job that keeps the current format version.
    pub fn new(unit: ArchiveUnit, target: impl Into<PathBuf>, selection: ProfileSelection) -> Self {
        Self {
            unit,
            target: target.into(),
            selection,
            version: None,
        }
    }

    /// Sets the format version to write.
    pub fn version(mut self, version: i32) -> Self {
        self.version = Some(version);
        self
    }
}

/// What the worker sends back for each job.
#[derive(Debug)]
pub struct SaveReport {
    /// The unit, rebound to the new file on success.
    pub unit: ArchiveUnit,
    /// The terminal outcome.
    pub outcome: CommitOutcome,
}

/// Runs saves on a background thread.
///
/// Dropping the worker closes its queue, lets queued jobs finish and joins
/// the thread.
pub struct SaveWorker {
    jobs: Option<Sender<SaveJob>>,
    handle: Option<JoinHandle<()>>,
}

impl SaveWorker {
    /// Starts a worker that reports to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the thread cannot be spawned.
    pub fn spawn<C, R, P>(
        mut coordinator: CommitCoordinator<C, R, P>,
        sink: Sender<SaveReport>,
    ) -> Result<Self>
    where
        C: ArchiveCodec + Send + 'static,
        R: FileRegistry + Send + 'static,
        P: KeyPrompt + Send + 'static,
    {
        let (jobs, queue): (Sender<SaveJob>, Receiver<SaveJob>) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("wzsave-worker".into())
            .spawn(move || {
                for mut job in queue {
                    let outcome = coordinator.save(SaveRequest {
                        unit: &mut job.unit,
                        target: job.target,
                        selection: job.selection,
                        version: job.version,
                    });
                    let report = SaveReport {
                        unit: job.unit,
                        outcome,
                    };
                    if sink.send(report).is_err() {
                        log::debug!("Save sink closed, stopping worker");
                        break;
                    }
                }
            })?;

        Ok(Self {
            jobs: Some(jobs),
            handle: Some(handle),
        })
    }

    /// Queues a job.
    ///
    /// Returns the job back if the worker has stopped.
    pub fn submit(&self, job: SaveJob) -> std::result::Result<(), SaveJob> {
        match &self.jobs {
            Some(jobs) => jobs.send(job).map_err(|e| e.0),
            None => Err(job),
        }
    }

    /// Closes the queue and waits for queued jobs to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Save worker thread panicked");
            }
        }
    }
}

impl Drop for SaveWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for SaveWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveWorker")
            .field("running", &self.handle.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PackageCodec;
    use crate::crypto::KeyTable;
    use crate::model::{DataUnit, LooseUnit};
    use crate::profile::{EncryptionProfile, NoPrompt, ProfileId};
    use crate::registry::CodecRegistry;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn loose(name: &str) -> ArchiveUnit {
        LooseUnit::new(
            DataUnit::new(name, name.as_bytes().to_vec()),
            EncryptionProfile::builtin(ProfileId::Bms),
        )
        .into()
    }

    #[test]
    fn test_jobs_run_in_order() {
        let dir = TempDir::new().unwrap();
        let coordinator =
            CommitCoordinator::new(PackageCodec, CodecRegistry::new(PackageCodec), NoPrompt)
                .with_key_table(Arc::new(KeyTable::new()));
        let (sink, reports) = mpsc::channel();
        let worker = SaveWorker::spawn(coordinator, sink).unwrap();

        for i in 0..5 {
            let target = dir.path().join(format!("{}.wz", i));
            worker
                .submit(SaveJob::new(loose(&format!("{}.img", i)), target, ProfileSelection::Ems))
                .unwrap();
        }
        worker.shutdown();

        let names: Vec<_> = reports
            .iter()
            .map(|report| {
                assert!(report.outcome.is_committed(), "{:?}", report.outcome);
                report.unit.name().to_string()
            })
            .collect();
        assert_eq!(names, ["0.img", "1.img", "2.img", "3.img", "4.img"]);
    }

    #[test]
    fn test_cancelled_job_returns_unit() {
        let dir = TempDir::new().unwrap();
        let coordinator =
            CommitCoordinator::new(PackageCodec, CodecRegistry::new(PackageCodec), NoPrompt)
                .with_key_table(Arc::new(KeyTable::new()));
        let (sink, reports) = mpsc::channel();
        let worker = SaveWorker::spawn(coordinator, sink).unwrap();

        worker
            .submit(SaveJob::new(loose("a.img"), dir.path().join("a.wz"), ProfileSelection::Custom))
            .unwrap();
        let report = reports.recv().unwrap();
        assert!(report.outcome.error().is_some_and(|e| e.is_cancelled()));
        assert_eq!(report.unit.name(), "a.img");
        drop(worker);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
