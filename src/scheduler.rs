use crate::fingerprint::{Fingerprint, Fingerprinter, CHUNK_SIZE};
use crate::remote::join_remote;
use crate::transport::{RemoteChannel, Transport};
use crate::Result;
use crossbeam_channel::{Receiver, Sender};
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::thread;
use tracing::{debug, error, info};

/// A single queued remote mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    Upload(String),
    Delete(String),
}

impl WorkItem {
    pub fn path(&self) -> &str {
        match self {
            WorkItem::Upload(p) | WorkItem::Delete(p) => p,
        }
    }
}

/// Terminal state of a work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Uploads carry the fingerprint of the bytes that were sent
    Succeeded { fingerprint: Option<Fingerprint> },
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct ItemReport {
    pub item: WorkItem,
    pub outcome: Outcome,
}

impl ItemReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }
}

pub struct Scheduler<'a> {
    transport: &'a dyn Transport,
    local_root: &'a Path,
    remote_root: &'a str,
    workers: usize,
    dry_run: bool,
    progress: Option<ProgressBar>,
}

impl<'a> Scheduler<'a> {
    pub fn new(transport: &'a dyn Transport, local_root: &'a Path, remote_root: &'a str, workers: usize) -> Self {
        Self {
            transport,
            local_root,
            remote_root,
            workers: workers.max(1),
            dry_run: false,
            progress: None,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.progress = Some(pb);
        self
    }

    /// Run every item to a terminal state. Reports arrive in completion
    /// order; every item yields exactly one report.
    pub fn run(&self, items: Vec<WorkItem>) -> Vec<ItemReport> {
        if items.is_empty() {
            return Vec::new();
        }
        if self.dry_run {
            return items.into_iter().map(|item| self.simulate(item)).collect();
        }

        let total = items.len();
        let workers = self.workers.min(total);
        info!("Processing {} item(s) with {} worker(s)...", total, workers);

        let (queue_tx, queue_rx) = crossbeam_channel::unbounded();
        for item in items {
            info!("Queued: {}", item.path());
            // The receiver is alive, send cannot fail.
            let _ = queue_tx.send(item);
        }
        drop(queue_tx);

        let (result_tx, result_rx) = crossbeam_channel::unbounded();
        let mut reports = Vec::with_capacity(total);

        thread::scope(|s| {
            for id in 0..workers {
                let queue = queue_rx.clone();
                let results = result_tx.clone();
                s.spawn(move || self.worker(id, queue, results));
            }
            drop(result_tx);

            for report in result_rx.iter() {
                self.log_report(&report);
                reports.push(report);
            }
        });

        // Left over only if no worker managed to open a channel.
        while let Ok(item) = queue_rx.try_recv() {
            let report = ItemReport {
                item,
                outcome: Outcome::Failed { error: "no transport channel available".into() },
            };
            self.log_report(&report);
            reports.push(report);
        }

        reports
    }

    fn worker(&self, id: usize, queue: Receiver<WorkItem>, results: Sender<ItemReport>) {
        let channel = match self.transport.open_channel() {
            Ok(c) => c,
            Err(e) => {
                error!("Worker {} could not open a channel: {}", id, e);
                return;
            }
        };

        while let Ok(item) = queue.try_recv() {
            debug!("Worker {} processing {:?}", id, item);
            let outcome = match &item {
                WorkItem::Upload(rel) => match self.upload(channel.as_ref(), rel) {
                    Ok(fingerprint) => Outcome::Succeeded { fingerprint: Some(fingerprint) },
                    Err(e) => Outcome::Failed { error: e.to_string() },
                },
                WorkItem::Delete(rel) => self.delete(channel.as_ref(), rel),
            };
            if results.send(ItemReport { item, outcome }).is_err() {
                break;
            }
        }
    }

    fn upload(&self, channel: &dyn RemoteChannel, rel: &str) -> Result<Fingerprint> {
        let mut local_file = File::open(self.local_root.join(rel))?;
        let remote_path = join_remote(self.remote_root, rel);
        let mut remote_file = channel.open_write(&remote_path)?;

        let mut fp = Fingerprinter::new();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = local_file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            remote_file.write_all(&buf[..n])?;
            fp.update(&buf[..n]);
        }
        remote_file.flush()?;
        Ok(fp.finish())
    }

    fn delete(&self, channel: &dyn RemoteChannel, rel: &str) -> Outcome {
        let remote_path = join_remote(self.remote_root, rel);

        let file_err = match channel.remove(&remote_path) {
            Ok(()) => return Outcome::Succeeded { fingerprint: None },
            Err(e) => e,
        };
        let dir_err = match channel.rmdir(&remote_path) {
            Ok(()) => return Outcome::Succeeded { fingerprint: None },
            Err(e) => e,
        };

        match channel.stat(&remote_path) {
            Ok(None) => Outcome::Skipped { reason: "already absent".into() },
            Ok(Some(_)) => Outcome::Failed { error: format!("{}; {}", file_err, dir_err) },
            Err(e) => Outcome::Failed { error: e.to_string() },
        }
    }

    fn simulate(&self, item: WorkItem) -> ItemReport {
        match &item {
            WorkItem::Upload(rel) => info!("Would upload: {}", rel),
            WorkItem::Delete(rel) => info!("Would remove: {}", rel),
        }
        ItemReport { item, outcome: Outcome::Skipped { reason: "dry run".into() } }
    }

    fn log_report(&self, report: &ItemReport) {
        let path = report.item.path();
        match (&report.item, &report.outcome) {
            (WorkItem::Upload(_), Outcome::Succeeded { .. }) => info!("Uploaded: {}", path),
            (WorkItem::Delete(_), Outcome::Succeeded { .. }) => info!("Removed: {}", path),
            (_, Outcome::Skipped { reason }) => info!("Skipped: {} ({})", path, reason),
            (_, Outcome::Failed { error: e }) => error!("Failed: {} - {}", path, e),
        }
        if let Some(pb) = &self.progress {
            pb.inc(1);
        }
    }
}
