//! Download tracker.
//!
//! Per-download side channel: derives a default save path for the host's
//! save dialog, and on completion routes a notification through the host
//! notifier. Cancelled and interrupted downloads are dropped silently; they
//! are ordinary outcomes, not errors.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::host::{Notifier, SurfaceId, ViewBinding};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub name: String,
    pub extensions: Vec<String>,
}

/// What the host's save dialog is seeded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePlan {
    pub default_path: PathBuf,
    /// Present only when the filename carries an extension.
    pub filter: Option<FileFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadTerminalState {
    Completed,
    Cancelled,
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct FinishedDownload {
    pub filename: String,
    pub final_path: PathBuf,
    pub state: DownloadTerminalState,
    /// Surface the download originated from, when known.
    pub origin: Option<SurfaceId>,
}

#[derive(Debug, Clone)]
pub struct DownloadTracker {
    download_dir: PathBuf,
}

impl DownloadTracker {
    pub fn new(download_dir: PathBuf) -> Self {
        DownloadTracker { download_dir }
    }

    /// Seed the save dialog: configured download directory + filename, with
    /// a file-type filter only when the filename has an extension. The
    /// actual dialog decision stays with the host.
    pub fn plan_save(&self, filename: &str) -> SavePlan {
        let default_path = self.download_dir.join(filename);
        let filter = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| FileFilter {
                name: format!("{} files", ext),
                extensions: vec![ext.to_string()],
            });
        SavePlan {
            default_path,
            filter,
        }
    }

    /// Handle a terminal download state. Only `Completed` notifies; the
    /// server display name falls back to an empty string when the
    /// originating surface cannot be mapped to a known server.
    pub fn finished(
        &self,
        download: &FinishedDownload,
        binding: &dyn ViewBinding,
        notifier: &dyn Notifier,
    ) {
        match download.state {
            DownloadTerminalState::Completed => {
                let server = download
                    .origin
                    .and_then(|surface| binding.server_for_surface(surface))
                    .unwrap_or_default();
                notifier.download_complete(&download.filename, &download.final_path, &server);
            }
            state => {
                debug!(?state, filename = %download.filename, "download dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::local::{LocalNotifier, LocalViewBinding};

    fn tracker() -> DownloadTracker {
        DownloadTracker::new(PathBuf::from("/downloads"))
    }

    #[test]
    fn save_plan_joins_directory_and_filename() {
        let plan = tracker().plan_save("report.pdf");
        assert_eq!(plan.default_path, PathBuf::from("/downloads/report.pdf"));
        let filter = plan.filter.expect("filter missing");
        assert_eq!(filter.extensions, vec!["pdf".to_string()]);
    }

    #[test]
    fn no_filter_without_an_extension() {
        let plan = tracker().plan_save("README");
        assert_eq!(plan.default_path, PathBuf::from("/downloads/README"));
        assert!(plan.filter.is_none());
    }

    #[test]
    fn completion_notifies_with_server_display_name() {
        let binding = LocalViewBinding::new();
        binding.bind_surface(SurfaceId(7), "Acme");
        let notifier = LocalNotifier::new();

        tracker().finished(
            &FinishedDownload {
                filename: "report.pdf".to_string(),
                final_path: PathBuf::from("/downloads/report.pdf"),
                state: DownloadTerminalState::Completed,
                origin: Some(SurfaceId(7)),
            },
            &binding,
            &notifier,
        );

        let downloads = notifier.downloads();
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].0, "report.pdf");
        assert_eq!(downloads[0].2, "Acme");
    }

    #[test]
    fn unknown_origin_yields_empty_server_name() {
        let binding = LocalViewBinding::new();
        let notifier = LocalNotifier::new();

        tracker().finished(
            &FinishedDownload {
                filename: "notes.txt".to_string(),
                final_path: PathBuf::from("/downloads/notes.txt"),
                state: DownloadTerminalState::Completed,
                origin: None,
            },
            &binding,
            &notifier,
        );

        assert_eq!(notifier.downloads()[0].2, "");
    }

    #[test]
    fn cancelled_and_interrupted_are_silently_dropped() {
        let binding = LocalViewBinding::new();
        let notifier = LocalNotifier::new();

        for state in [
            DownloadTerminalState::Cancelled,
            DownloadTerminalState::Interrupted,
        ] {
            tracker().finished(
                &FinishedDownload {
                    filename: "partial.zip".to_string(),
                    final_path: PathBuf::from("/downloads/partial.zip"),
                    state,
                    origin: None,
                },
                &binding,
                &notifier,
            );
        }

        assert!(notifier.downloads().is_empty());
    }
}
