use crate::export::error::ExportError;
use log::{debug, info, warn};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{self, JoinHandle};

/// Default interval between status checks in [`ExportJob::wait`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Observable state of an export job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportState {
    Running,
    Completed,
    Failed(String),
}

impl ExportState {
    pub fn is_done(&self) -> bool {
        !matches!(self, ExportState::Running)
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportState::Running => write!(f, "running"),
            ExportState::Completed => write!(f, "completed"),
            ExportState::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// A submitted export running in the background.
///
/// The job starts as soon as it is submitted. Callers may poll [`status`]
/// or await the outcome with [`wait`]; dropping the job does not cancel the
/// write.
///
/// [`status`]: ExportJob::status
/// [`wait`]: ExportJob::wait
pub struct ExportJob {
    description: String,
    state: watch::Receiver<ExportState>,
    handle: JoinHandle<Result<PathBuf, ExportError>>,
}

impl ExportJob {
    /// Runs `work` on the blocking pool and tracks its outcome.
    pub(crate) fn spawn<F>(description: String, work: F) -> Self
    where
        F: FnOnce() -> Result<PathBuf, ExportError> + Send + 'static,
    {
        let (sender, state) = watch::channel(ExportState::Running);
        let task_description = description.clone();
        let handle = task::spawn_blocking(move || {
            let result = work();
            let next = match &result {
                Ok(path) => {
                    info!("Export '{}' completed: {:?}", task_description, path);
                    ExportState::Completed
                }
                Err(e) => ExportState::Failed(e.to_string()),
            };
            // No receiver left means nobody is watching; the result is still returned.
            let _ = sender.send(next);
            result
        });
        debug!("Submitted export '{}'", description);
        Self {
            description,
            state,
            handle,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Current state without blocking.
    pub fn status(&self) -> ExportState {
        let state = self.state.borrow().clone();
        if state == ExportState::Running && self.handle.is_finished() {
            // The task ended without reporting, which only happens on panic.
            return ExportState::Failed("export task aborted".to_string());
        }
        state
    }

    /// Polls every `poll_interval` until the job leaves the running state,
    /// then returns the written file or the reason it failed.
    pub async fn wait(self, poll_interval: Duration) -> Result<PathBuf, ExportError> {
        loop {
            let state = self.status();
            if state.is_done() {
                debug!("Export '{}' is {}", self.description, state);
                break;
            }
            tokio::time::sleep(poll_interval).await;
        }

        let result = self
            .handle
            .await
            .map_err(|e| ExportError::TaskJoin(self.description.clone(), e))?;
        if let Err(e) = &result {
            warn!("Export '{}' failed: {}", self.description, e);
        }
        result.map_err(|e| match e {
            ExportError::Failed { .. } => e,
            other => ExportError::Failed {
                description: self.description.clone(),
                reason: other.to_string(),
            },
        })
    }
}

impl fmt::Debug for ExportJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportJob")
            .field("description", &self.description)
            .field("state", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    const POLL: Duration = Duration::from_millis(5);

    #[tokio::test]
    async fn test_completed_job_returns_path() {
        let job = ExportJob::spawn("ok".to_string(), || Ok(PathBuf::from("out.csv")));
        assert_eq!(job.wait(POLL).await.unwrap(), PathBuf::from("out.csv"));
    }

    #[tokio::test]
    async fn test_status_moves_from_running_to_completed() {
        let (release, gate) = mpsc::channel::<()>();
        let job = ExportJob::spawn("gated".to_string(), move || {
            gate.recv().ok();
            Ok(PathBuf::from("gated.csv"))
        });
        assert_eq!(job.status(), ExportState::Running);

        release.send(()).unwrap();
        while !job.status().is_done() {
            tokio::time::sleep(POLL).await;
        }
        assert_eq!(job.status(), ExportState::Completed);
        assert!(job.wait(POLL).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_job_reports_reason() {
        let job = ExportJob::spawn("broken".to_string(), || {
            Err(ExportError::Persist(
                PathBuf::from("broken.csv"),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ))
        });
        match job.wait(POLL).await {
            Err(ExportError::Failed {
                description,
                reason,
            }) => {
                assert_eq!(description, "broken");
                assert!(reason.contains("broken.csv"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panicking_job_is_a_failure() {
        let job = ExportJob::spawn("panics".to_string(), || panic!("disk on fire"));
        assert!(matches!(
            job.wait(POLL).await,
            Err(ExportError::TaskJoin(..))
        ));
    }
}
