use crate::config::SyncOptions;
use crate::manifest::{ManifestStore, MANIFEST_NAME};
use crate::plan::{plan_deletions, plan_transfers, required_directories};
use crate::remote::{join_remote, list_remote_tree, DirectoryMaterializer};
use crate::scanner::{path_depth, LocalScanner};
use crate::scheduler::{ItemReport, Outcome, Scheduler, WorkItem};
use crate::transport::ssh::{SshConfig, SshTransport};
use crate::transport::{RemoteChannel, Transport};
use crate::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{Read, Write};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// What a run did.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub dry_run: bool,
    pub scanned: usize,
    pub planned_uploads: usize,
    pub planned_deletions: usize,
    pub uploaded: usize,
    pub unchanged: usize,
    pub removed: usize,
    /// (path, error) for every failed item
    pub failed: Vec<(String, String)>,
    pub unreadable: Vec<String>,
    pub manifest_entries: usize,
    pub elapsed: Duration,
}

pub struct SyncEngine {
    options: SyncOptions,
}

impl SyncEngine {
    pub fn new(options: SyncOptions) -> Self {
        Self { options }
    }

    /// Connect over SSH and run.
    pub fn run(&self, ssh: &SshConfig) -> Result<RunSummary> {
        info!("Connecting to {}@{}:{}...", ssh.user, ssh.host, ssh.port);
        let transport = SshTransport::connect(ssh)?;
        info!("Connected.");
        self.run_with(&transport)
    }

    /// Run against an already established transport.
    pub fn run_with(&self, transport: &dyn Transport) -> Result<RunSummary> {
        let opts = &self.options;
        if opts.concurrency == 0 {
            return Err(crate::SftpSyncError::Config("concurrency must be at least 1".into()));
        }
        let start = Instant::now();
        let mut summary = RunSummary { dry_run: opts.dry_run, ..Default::default() };

        let control = transport.open_channel()?;
        let manifest_path = join_remote(&opts.remote_root, MANIFEST_NAME);

        // 1. Remote manifest
        let mut manifest = if opts.force_upload {
            info!("Force upload enabled, ignoring remote manifest.");
            ManifestStore::new()
        } else {
            info!("Fetching remote manifest...");
            load_manifest(control.as_ref(), &manifest_path)
        };

        // 2. Scan
        info!("Scanning local directory: {:?}", opts.local_root);
        let scanner = LocalScanner::new(&opts.excludes)?;
        let scanned = scanner.scan(&opts.local_root)?;
        summary.scanned = scanned.len();
        info!("Found {} files.", scanned.len());

        // 3. Plan
        let plan = plan_transfers(&opts.local_root, &scanned, &manifest, opts.force_upload);
        summary.planned_uploads = plan.uploads.len();
        summary.unchanged = plan.skipped.len();
        summary.unreadable = plan.unreadable.clone();
        info!("Files to upload: {} ({} unchanged)", plan.uploads.len(), plan.skipped.len());

        let deletions = if opts.remove_extra {
            info!("Checking for extra files on server...");
            match list_remote_tree(control.as_ref(), &opts.remote_root) {
                Ok(remote_entries) => plan_deletions(&scanned, &remote_entries),
                Err(e) => {
                    warn!("Failed to list remote tree, extra files will not be removed: {}", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };
        summary.planned_deletions = deletions.len();
        if opts.remove_extra {
            info!("Extra items on server: {}", deletions.len());
        }

        let mut scheduler = Scheduler::new(transport, &opts.local_root, &opts.remote_root, opts.concurrency)
            .dry_run(opts.dry_run);
        let pb = if opts.progress && !opts.dry_run {
            let pb = ProgressBar::new((plan.uploads.len() + deletions.len()) as u64);
            if let Ok(style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            {
                pb.set_style(style);
            }
            scheduler = scheduler.with_progress(pb.clone());
            Some(pb)
        } else {
            None
        };

        // 4. Dry run stops before any remote mutation
        if opts.dry_run {
            scheduler.run(plan.uploads.iter().cloned().map(WorkItem::Upload).collect());
            scheduler.run(deletions.iter().cloned().map(WorkItem::Delete).collect());
            summary.elapsed = start.elapsed();
            info!("Dry run enabled. No changes were made.");
            log_summary(&summary);
            return Ok(summary);
        }

        // 5. Remote directories, parents first, before any worker starts
        info!("Ensuring remote directories exist...");
        let mut materializer = DirectoryMaterializer::new(control.as_ref());
        materializer.ensure_all(required_directories(&opts.remote_root, &plan.uploads))?;

        // 6. Uploads
        let upload_reports = if plan.uploads.is_empty() {
            info!("Everything up to date.");
            Vec::new()
        } else {
            scheduler.run(plan.uploads.iter().cloned().map(WorkItem::Upload).collect())
        };

        // 7. Deletions, one depth level at a time, deepest first
        let mut delete_reports = Vec::new();
        for level in depth_levels(&deletions) {
            delete_reports.extend(scheduler.run(level.into_iter().map(WorkItem::Delete).collect()));
        }

        if let Some(pb) = &pb {
            pb.finish_with_message("Done");
        }

        // 8. Final manifest
        let mut entries = plan.fingerprints.clone();
        for report in &upload_reports {
            let rel = report.item.path();
            match &report.outcome {
                Outcome::Succeeded { fingerprint: Some(fp) } => {
                    entries.insert(rel.to_string(), fp.clone());
                    summary.uploaded += 1;
                }
                Outcome::Failed { .. } => {
                    // Keep whatever the remote had before; the file differs
                    // from it and will be retried next run.
                    match manifest.lookup(rel) {
                        Some(prev) => {
                            entries.insert(rel.to_string(), prev.clone());
                        }
                        None => {
                            entries.remove(rel);
                        }
                    }
                }
                _ => {}
            }
        }
        summary.removed = delete_reports
            .iter()
            .filter(|r| matches!(r.outcome, Outcome::Succeeded { .. }))
            .count();
        summary.failed = upload_reports
            .iter()
            .chain(delete_reports.iter())
            .filter_map(failure)
            .collect();

        manifest.replace_all(entries);
        summary.manifest_entries = manifest.len();

        info!("Updating remote manifest...");
        save_manifest(control.as_ref(), &manifest_path, &manifest)?;

        summary.elapsed = start.elapsed();
        log_summary(&summary);

        if !summary.failed.is_empty() {
            for (path, e) in &summary.failed {
                error!("  {}: {}", path, e);
            }
            return Err(crate::SftpSyncError::TransferFailed { failed: summary.failed.len() });
        }
        Ok(summary)
    }
}

fn failure(report: &ItemReport) -> Option<(String, String)> {
    match &report.outcome {
        Outcome::Failed { error } => Some((report.item.path().to_string(), error.clone())),
        _ => None,
    }
}

/// Split a deepest-first list into runs of equal depth.
fn depth_levels(paths: &[String]) -> Vec<Vec<String>> {
    let mut levels: Vec<Vec<String>> = Vec::new();
    let mut current_depth = None;
    for path in paths {
        let depth = path_depth(path);
        if current_depth != Some(depth) {
            levels.push(Vec::new());
            current_depth = Some(depth);
        }
        if let Some(level) = levels.last_mut() {
            level.push(path.clone());
        }
    }
    levels
}

/// Absent, unreadable or corrupt manifests all degrade to an empty one.
fn load_manifest(channel: &dyn RemoteChannel, path: &str) -> ManifestStore {
    let mut reader = match channel.open_read(path) {
        Ok(Some(r)) => r,
        Ok(None) => {
            info!("No remote manifest found. Full upload.");
            return ManifestStore::new();
        }
        Err(e) => {
            warn!("Could not open remote manifest, doing a full upload: {}", e);
            return ManifestStore::new();
        }
    };

    let mut doc = String::new();
    if let Err(e) = reader.read_to_string(&mut doc) {
        warn!("Could not read remote manifest, doing a full upload: {}", e);
        return ManifestStore::new();
    }
    let store = ManifestStore::load(&doc);
    info!("Remote manifest loaded ({} entries).", store.len());
    store
}

fn save_manifest(channel: &dyn RemoteChannel, path: &str, manifest: &ManifestStore) -> Result<()> {
    let doc = manifest.serialize()?;
    let mut writer = channel.open_write(path)?;
    writer.write_all(doc.as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn log_summary(summary: &RunSummary) {
    if summary.dry_run {
        info!(
            "Summary (dry run): {} to upload, {} unchanged, {} to remove",
            summary.planned_uploads, summary.unchanged, summary.planned_deletions
        );
    } else {
        info!(
            "Summary: {} uploaded, {} unchanged, {} removed, {} failed in {:.2}s",
            summary.uploaded,
            summary.unchanged,
            summary.removed,
            summary.failed.len(),
            summary.elapsed.as_secs_f64()
        );
    }
    if !summary.unreadable.is_empty() {
        warn!("{} file(s) could not be read and were skipped", summary.unreadable.len());
    }
}
