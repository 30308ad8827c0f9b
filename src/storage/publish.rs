//! Durable publication of the state snapshot
//!
//! A publisher owns the copy of the snapshot that later cycles will load.
//! Publishing is gated on content: if the freshly saved bytes equal the
//! durable copy, nothing is published.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{write_atomic_async, PublishError};

/// Backend holding the durable copy of the state snapshot
#[async_trait]
pub trait DurableStatePublisher: Send + Sync {
    /// Bytes of the currently durable snapshot, if any
    async fn durable_snapshot(&self) -> Result<Option<Vec<u8>>, PublishError>;

    /// Make `bytes` the durable snapshot. Publishing the same bytes twice is
    /// harmless.
    async fn publish(&self, bytes: &[u8]) -> Result<(), PublishError>;
}

/// Publish `bytes` only if they differ from the durable copy.
///
/// Publish failures are retried up to `attempts` times in total. Returns
/// whether a publish happened.
pub async fn publish_if_changed<D>(
    publisher: &D,
    bytes: &[u8],
    attempts: u32,
) -> Result<bool, PublishError>
where
    D: DurableStatePublisher + ?Sized,
{
    if publisher.durable_snapshot().await?.as_deref() == Some(bytes) {
        tracing::debug!("State unchanged, skipping publish");
        return Ok(false);
    }

    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match publisher.publish(bytes).await {
            Ok(()) => {
                tracing::info!(bytes = bytes.len(), "Published updated state");
                return Ok(true);
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(attempt, error = %e, "State publish failed, retrying");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Publishes by mirroring the snapshot to a second file
#[derive(Debug, Clone)]
pub struct FilePublisher {
    path: PathBuf,
}

impl FilePublisher {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl DurableStatePublisher for FilePublisher {
    async fn durable_snapshot(&self) -> Result<Option<Vec<u8>>, PublishError> {
        match tokio::fs::read(&self.path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn publish(&self, bytes: &[u8]) -> Result<(), PublishError> {
        write_atomic_async(&self.path, bytes.to_vec()).await?;
        Ok(())
    }
}

/// Git repository settings for [`GitPublisher`]
#[derive(Debug, Clone)]
pub struct GitTarget {
    /// Working tree containing the state file
    pub repo_dir: PathBuf,
    /// State file path, relative to `repo_dir`
    pub file: PathBuf,
    /// Remote URL to push to (may embed a token)
    pub remote: String,
    /// Branch the durable state lives on
    pub branch: String,
    pub author_name: String,
    pub author_email: String,
    /// Bound on each git invocation
    pub timeout: Duration,
}

/// Publishes by committing the state file and pushing it
#[derive(Debug, Clone)]
pub struct GitPublisher {
    target: GitTarget,
}

const COMMIT_MESSAGE: &str = "Update repo visibility state [bot]";

impl GitPublisher {
    pub fn new(target: GitTarget) -> Self {
        Self { target }
    }

    fn file_arg(&self) -> String {
        self.target.file.to_string_lossy().into_owned()
    }

    /// Run git in the working tree, bounded by the configured timeout
    async fn git(&self, args: &[&str]) -> Result<Output, PublishError> {
        let command = subcommand(args);

        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.target.repo_dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);

        tokio::time::timeout(self.target.timeout, cmd.output())
            .await
            .map_err(|_| PublishError::Timeout(command))?
            .map_err(PublishError::Io)
    }

    /// Run git and fail on a non-zero exit status
    async fn git_checked(&self, args: &[&str]) -> Result<Output, PublishError> {
        let output = self.git(args).await?;
        if !output.status.success() {
            return Err(PublishError::Git {
                command: subcommand(args),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Fetch the durable branch into `FETCH_HEAD`.
    ///
    /// Returns `false` when the remote does not have the branch yet.
    async fn fetch_branch(&self) -> Result<bool, PublishError> {
        let args = ["fetch", self.target.remote.as_str(), self.target.branch.as_str()];
        let output = self.git(&args).await?;
        if output.status.success() {
            return Ok(true);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.to_lowercase().contains("couldn't find remote ref") {
            tracing::debug!(remote_branch = %self.target.branch, "Remote branch does not exist yet");
            return Ok(false);
        }
        Err(PublishError::Git {
            command: subcommand(&args),
            stderr,
        })
    }

    fn identity_args(&self) -> [String; 4] {
        [
            "-c".to_string(),
            format!("user.name={}", self.target.author_name),
            "-c".to_string(),
            format!("user.email={}", self.target.author_email),
        ]
    }
}

/// Git subcommand name, skipping leading `-c key=value` pairs
fn subcommand(args: &[&str]) -> String {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if *arg == "-c" {
            iter.next();
            continue;
        }
        return arg.to_string();
    }
    String::new()
}

#[async_trait]
impl DurableStatePublisher for GitPublisher {
    async fn durable_snapshot(&self) -> Result<Option<Vec<u8>>, PublishError> {
        // The remote branch is the durable copy; a local commit that never
        // got pushed does not count
        if !self.fetch_branch().await? {
            return Ok(None);
        }
        let object = format!("FETCH_HEAD:./{}", self.file_arg());

        let exists = self.git(&["cat-file", "-e", object.as_str()]).await?;
        if !exists.status.success() {
            return Ok(None);
        }

        let output = self.git_checked(&["show", object.as_str()]).await?;
        Ok(Some(output.stdout))
    }

    async fn publish(&self, bytes: &[u8]) -> Result<(), PublishError> {
        let file = self.file_arg();
        let path = self.target.repo_dir.join(&self.target.file);
        tokio::fs::write(&path, bytes).await?;

        self.git_checked(&["add", "--", file.as_str()]).await?;

        // A retry after a failed push finds the change already committed
        let staged = self.git(&["diff", "--cached", "--quiet", "--", file.as_str()]).await?;
        if !staged.status.success() {
            let identity = self.identity_args();
            let mut args: Vec<&str> = identity.iter().map(String::as_str).collect();
            args.extend(["commit", "-m", COMMIT_MESSAGE, "--", file.as_str()]);
            self.git_checked(&args).await?;
        }

        let remote = self.target.remote.as_str();
        let branch = self.target.branch.as_str();

        // First publish to an empty remote creates the branch outright
        if self.fetch_branch().await? {
            let identity = self.identity_args();
            let mut args: Vec<&str> = identity.iter().map(String::as_str).collect();
            args.extend(["rebase", "FETCH_HEAD"]);
            if let Err(e) = self.git_checked(&args).await {
                let _ = self.git(&["rebase", "--abort"]).await;
                return Err(e);
            }
        }

        let refspec = format!("HEAD:{}", branch);
        self.git_checked(&["push", remote, refspec.as_str()]).await?;

        tracing::info!(remote_branch = %branch, file = %file, "Pushed state commit");
        Ok(())
    }
}
