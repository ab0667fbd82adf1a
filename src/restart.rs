//! Daemon restart with optional storage relocation
//!
//! ```text
//! Idle ──► Stopping ──(flag && origin && destination)──► Relocating ──► Relaunching ──► Terminated
//!             └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The running daemon is asked to shut down and must be gone before the repo
//! is touched. The sequencer never exits the process itself: a successful run
//! returns [`RestartOutcome::HandedOff`] and the caller performs the exit.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::REPO_PATH_ENV;
use crate::error::{Error, Result};

/// Log file the relaunched daemon writes to, inside its repo
pub const DAEMON_LOG_FILE: &str = "daemon.log";

/// Inputs for one restart
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestartIntent {
    /// `--post-path-modification`
    pub post_path_modification: bool,
    /// Current repo location
    pub origin: Option<PathBuf>,
    /// Where the repo should live after the restart
    pub destination: Option<PathBuf>,
}

impl RestartIntent {
    /// Relocation target, present only when the flag and both paths are set
    pub fn relocation(&self) -> Option<(&Path, &Path)> {
        if !self.post_path_modification {
            return None;
        }
        match (self.origin.as_deref(), self.destination.as_deref()) {
            (Some(origin), Some(destination))
                if !origin.as_os_str().is_empty() && !destination.as_os_str().is_empty() =>
            {
                Some((origin, destination))
            }
            _ => None,
        }
    }
}

/// Sequencer states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartState {
    Idle,
    Stopping,
    Relocating,
    Relaunching,
    Terminated,
}

/// Result of a successful restart; the caller must exit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    HandedOff { pid: u32, relocated: bool },
}

impl RestartOutcome {
    /// Exit code the current process should terminate with
    pub fn exit_code(&self) -> i32 {
        match self {
            RestartOutcome::HandedOff { .. } => 0,
        }
    }
}

/// Child process to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Variables added on top of the inherited environment
    pub env: Vec<(String, String)>,
    /// File receiving the child's stdout and stderr; discarded when unset
    pub log: Option<PathBuf>,
}

impl LaunchRequest {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            log: None,
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.log = Some(path.into());
        self
    }
}

/// The daemon currently serving the node API
#[async_trait]
pub trait DaemonControl: Send + Sync {
    /// Whether a daemon answers on the API
    async fn is_running(&self) -> bool;

    /// Ask the daemon to shut down; returns once the request is accepted
    async fn shutdown(&self) -> Result<()>;
}

/// Starts processes without waiting for them
pub trait ProcessLauncher: Send + Sync {
    /// Start the process and return its pid
    fn spawn(&self, request: &LaunchRequest) -> Result<u32>;
}

/// Moves the repo and records its new location
pub trait StorageRelocator: Send + Sync {
    /// Move every entry of `origin` into `destination`
    fn move_storage(&self, origin: &Path, destination: &Path) -> Result<()>;

    /// Durably record `destination` as the repo path
    fn write_properties(&self, destination: &Path) -> Result<()>;
}

/// Launcher that detaches the child from our stdio
///
/// The child is watched for `settle` after spawning; exiting within that
/// window (bad arguments, missing repo) is reported as a spawn failure.
pub struct DetachedLauncher {
    settle: Duration,
}

impl DetachedLauncher {
    pub fn new(settle: Duration) -> Self {
        Self { settle }
    }
}

impl Default for DetachedLauncher {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl ProcessLauncher for DetachedLauncher {
    fn spawn(&self, request: &LaunchRequest) -> Result<u32> {
        let fail = |e: std::io::Error| {
            Error::ProcessSpawnFailure(format!("{}: {}", request.program.display(), e))
        };

        let mut command = Command::new(&request.program);
        command.args(&request.args).stdin(Stdio::null());
        match &request.log {
            Some(path) => {
                let log = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(fail)?;
                command
                    .stdout(log.try_clone().map_err(fail)?)
                    .stderr(log);
            }
            None => {
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }
        for (key, value) in &request.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(fail)?;

        std::thread::sleep(self.settle);
        if let Some(status) = child.try_wait().map_err(fail)? {
            let hint = request
                .log
                .as_ref()
                .map(|p| format!(", see {}", p.display()))
                .unwrap_or_default();
            return Err(Error::ProcessSpawnFailure(format!(
                "{} exited immediately with {}{}",
                request.program.display(),
                status,
                hint
            )));
        }

        // Not awaited: the child outlives us
        Ok(child.id())
    }
}

/// Filesystem relocator writing a TOML properties file
pub struct FsRelocator {
    properties_file: PathBuf,
}

impl FsRelocator {
    pub fn new(properties_file: impl Into<PathBuf>) -> Self {
        Self {
            properties_file: properties_file.into(),
        }
    }
}

impl StorageRelocator for FsRelocator {
    fn move_storage(&self, origin: &Path, destination: &Path) -> Result<()> {
        if !origin.is_dir() {
            return Err(Error::RelocationFailure(format!(
                "{} is not a directory",
                origin.display()
            )));
        }
        if destination.starts_with(origin) {
            return Err(Error::RelocationFailure(format!(
                "cannot move {} into itself ({})",
                origin.display(),
                destination.display()
            )));
        }

        std::fs::create_dir_all(destination).map_err(|e| {
            Error::RelocationFailure(format!("create {}: {}", destination.display(), e))
        })?;

        let entries = std::fs::read_dir(origin)
            .map_err(|e| Error::RelocationFailure(format!("read {}: {}", origin.display(), e)))?;

        for entry in entries {
            let entry = entry.map_err(|e| Error::RelocationFailure(e.to_string()))?;
            let from = entry.path();
            let to = destination.join(entry.file_name());
            if to.exists() {
                return Err(Error::RelocationFailure(format!(
                    "{} already exists",
                    to.display()
                )));
            }
            move_entry(&from, &to)?;
            debug!("Moved {} -> {}", from.display(), to.display());
        }

        Ok(())
    }

    fn write_properties(&self, destination: &Path) -> Result<()> {
        let path = destination.to_str().ok_or_else(|| {
            Error::ConfigIo(format!("{} is not valid UTF-8", destination.display()))
        })?;

        if let Some(parent) = self.properties_file.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::ConfigIo(format!("create {}: {}", parent.display(), e)))?;
        }

        let content = toml::to_string(&Properties { path })
            .map_err(|e| Error::ConfigIo(format!("Failed to encode properties: {}", e)))?;
        std::fs::write(&self.properties_file, content).map_err(|e| {
            Error::ConfigIo(format!(
                "Failed to write {}: {}",
                self.properties_file.display(),
                e
            ))
        })?;

        info!("Recorded repo path in {}", self.properties_file.display());
        Ok(())
    }
}

/// Rename, falling back to copy + remove across filesystems
fn move_entry(from: &Path, to: &Path) -> Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }

    copy_recursive(from, to)?;
    let removed = if from.is_dir() {
        std::fs::remove_dir_all(from)
    } else {
        std::fs::remove_file(from)
    };
    removed.map_err(|e| Error::RelocationFailure(format!("remove {}: {}", from.display(), e)))
}

fn copy_recursive(from: &Path, to: &Path) -> Result<()> {
    let fail = |e: std::io::Error| {
        Error::RelocationFailure(format!("copy {} -> {}: {}", from.display(), to.display(), e))
    };

    if from.is_dir() {
        std::fs::create_dir_all(to).map_err(fail)?;
        for entry in std::fs::read_dir(from).map_err(fail)? {
            let entry = entry.map_err(fail)?;
            copy_recursive(&entry.path(), &to.join(entry.file_name()))?;
        }
    } else {
        std::fs::copy(from, to).map_err(fail)?;
    }
    Ok(())
}

/// Contents of the properties file
#[derive(Serialize)]
struct Properties<'a> {
    path: &'a str,
}

/// Runs one restart
pub struct RestartSequencer<'a> {
    control: &'a dyn DaemonControl,
    relocator: &'a dyn StorageRelocator,
    launcher: &'a dyn ProcessLauncher,
    shutdown_timeout: Duration,
    poll_interval: Duration,
    state: RestartState,
}

impl<'a> RestartSequencer<'a> {
    pub fn new(
        control: &'a dyn DaemonControl,
        relocator: &'a dyn StorageRelocator,
        launcher: &'a dyn ProcessLauncher,
    ) -> Self {
        Self {
            control,
            relocator,
            launcher,
            shutdown_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(250),
            state: RestartState::Idle,
        }
    }

    /// How long to wait for the old daemon to go away, and how often to look
    pub fn with_shutdown_timing(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn state(&self) -> RestartState {
        self.state
    }

    /// Stop the old daemon, relocate if asked, start `<executable> daemon`
    pub async fn run(&mut self, intent: &RestartIntent, executable: &Path) -> Result<RestartOutcome> {
        self.stop_running_daemon().await.map_err(|e| {
            error!("Could not stop the running daemon, nothing was changed: {}", e);
            e
        })?;

        let mut request = LaunchRequest::new(executable, ["daemon"]);
        let mut relocated = false;
        let mut repo = intent.origin.clone();

        if let Some((origin, destination)) = intent.relocation() {
            self.state = RestartState::Relocating;
            info!(
                "Relocating storage {} -> {}",
                origin.display(),
                destination.display()
            );

            // No rollback: a partial move is left for the operator
            self.relocator
                .move_storage(origin, destination)
                .map_err(|e| {
                    error!("Storage relocation failed, daemon not restarted: {}", e);
                    e
                })?;
            self.relocator.write_properties(destination)?;

            request = request.with_env(REPO_PATH_ENV, destination.to_string_lossy());
            relocated = true;
            repo = Some(destination.to_path_buf());
        } else if intent.post_path_modification {
            warn!("Path modification requested but no new path is pending, restarting in place");
        }

        if let Some(repo) = repo.filter(|r| r.is_dir()) {
            request = request.with_log(repo.join(DAEMON_LOG_FILE));
        }

        self.state = RestartState::Relaunching;
        let pid = self.launcher.spawn(&request).map_err(|e| {
            error!("Failed to start daemon: {}", e);
            e
        })?;

        info!("Daemon started (pid {}), handing off", pid);
        self.state = RestartState::Terminated;
        Ok(RestartOutcome::HandedOff { pid, relocated })
    }

    async fn stop_running_daemon(&mut self) -> Result<()> {
        if !self.control.is_running().await {
            debug!("No daemon answering, nothing to stop");
            return Ok(());
        }

        self.state = RestartState::Stopping;
        info!("Stopping running daemon");
        self.control.shutdown().await?;

        let started = Instant::now();
        while self.control.is_running().await {
            if started.elapsed() >= self.shutdown_timeout {
                return Err(Error::ShutdownFailure(format!(
                    "daemon still answering after {:?}",
                    self.shutdown_timeout
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        info!("Running daemon stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::*;
    use tempfile::tempdir;

    /// Shared event log so ordering across fakes can be asserted
    #[derive(Default)]
    struct Journal(Mutex<Vec<String>>);

    impl Journal {
        fn push(&self, event: String) {
            self.0.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct FakeDaemon<'a> {
        journal: &'a Journal,
        running: AtomicBool,
        ignores_shutdown: bool,
    }

    impl<'a> FakeDaemon<'a> {
        fn new(journal: &'a Journal, running: bool) -> Self {
            Self {
                journal,
                running: AtomicBool::new(running),
                ignores_shutdown: false,
            }
        }
    }

    #[async_trait]
    impl DaemonControl for FakeDaemon<'_> {
        async fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }

        async fn shutdown(&self) -> Result<()> {
            self.journal.push("shutdown".into());
            if !self.ignores_shutdown {
                self.running.store(false, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    struct FakeRelocator<'a> {
        journal: &'a Journal,
        fail_move: bool,
    }

    impl StorageRelocator for FakeRelocator<'_> {
        fn move_storage(&self, origin: &Path, destination: &Path) -> Result<()> {
            if self.fail_move {
                return Err(Error::RelocationFailure("disk full".into()));
            }
            self.journal.push(format!(
                "move {} {}",
                origin.display(),
                destination.display()
            ));
            Ok(())
        }

        fn write_properties(&self, destination: &Path) -> Result<()> {
            self.journal
                .push(format!("properties {}", destination.display()));
            Ok(())
        }
    }

    struct FakeLauncher<'a> {
        journal: &'a Journal,
        requests: Mutex<Vec<LaunchRequest>>,
        fail: bool,
    }

    impl<'a> FakeLauncher<'a> {
        fn new(journal: &'a Journal, fail: bool) -> Self {
            Self {
                journal,
                requests: Mutex::new(Vec::new()),
                fail,
            }
        }
    }

    impl ProcessLauncher for FakeLauncher<'_> {
        fn spawn(&self, request: &LaunchRequest) -> Result<u32> {
            if self.fail {
                return Err(Error::ProcessSpawnFailure("permission denied".into()));
            }
            self.journal.push("spawn".into());
            self.requests.lock().unwrap().push(request.clone());
            Ok(777)
        }
    }

    fn intent(flag: bool) -> RestartIntent {
        RestartIntent {
            post_path_modification: flag,
            origin: Some(PathBuf::from("/data/old")),
            destination: Some(PathBuf::from("/data/new")),
        }
    }

    #[tokio::test]
    async fn test_restart_without_flag_skips_relocation() {
        let journal = Journal::default();
        let daemon = FakeDaemon::new(&journal, true);
        let relocator = FakeRelocator {
            journal: &journal,
            fail_move: false,
        };
        let launcher = FakeLauncher::new(&journal, false);

        let mut seq = RestartSequencer::new(&daemon, &relocator, &launcher);
        let outcome = seq
            .run(&intent(false), Path::new("/bin/btfs"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RestartOutcome::HandedOff {
                pid: 777,
                relocated: false
            }
        );
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(journal.events(), vec!["shutdown", "spawn"]);
        let requests = launcher.requests.lock().unwrap();
        assert!(requests[0].env.is_empty());
        assert_eq!(requests[0].args, vec!["daemon".to_string()]);
        assert_eq!(seq.state(), RestartState::Terminated);
    }

    #[tokio::test]
    async fn test_restart_with_relocation_orders_steps() {
        let journal = Journal::default();
        let daemon = FakeDaemon::new(&journal, true);
        let relocator = FakeRelocator {
            journal: &journal,
            fail_move: false,
        };
        let launcher = FakeLauncher::new(&journal, false);

        let mut seq = RestartSequencer::new(&daemon, &relocator, &launcher);
        let outcome = seq
            .run(&intent(true), Path::new("/bin/btfs"))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            RestartOutcome::HandedOff {
                relocated: true,
                ..
            }
        ));
        assert_eq!(
            journal.events(),
            vec![
                "shutdown".to_string(),
                "move /data/old /data/new".to_string(),
                "properties /data/new".to_string(),
                "spawn".to_string(),
            ]
        );
        let requests = launcher.requests.lock().unwrap();
        assert_eq!(
            requests[0].env,
            vec![(REPO_PATH_ENV.to_string(), "/data/new".to_string())]
        );
    }

    #[tokio::test]
    async fn test_no_running_daemon_skips_shutdown() {
        let journal = Journal::default();
        let daemon = FakeDaemon::new(&journal, false);
        let relocator = FakeRelocator {
            journal: &journal,
            fail_move: false,
        };
        let launcher = FakeLauncher::new(&journal, false);

        let mut seq = RestartSequencer::new(&daemon, &relocator, &launcher);
        seq.run(&intent(false), Path::new("/bin/btfs"))
            .await
            .unwrap();
        assert_eq!(journal.events(), vec!["spawn"]);
    }

    #[tokio::test]
    async fn test_daemon_that_keeps_running_blocks_relocation() {
        let journal = Journal::default();
        let mut daemon = FakeDaemon::new(&journal, true);
        daemon.ignores_shutdown = true;
        let relocator = FakeRelocator {
            journal: &journal,
            fail_move: false,
        };
        let launcher = FakeLauncher::new(&journal, false);

        let mut seq = RestartSequencer::new(&daemon, &relocator, &launcher)
            .with_shutdown_timing(Duration::from_millis(30), Duration::from_millis(5));
        let err = seq
            .run(&intent(true), Path::new("/bin/btfs"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ShutdownFailure(_)));
        assert_eq!(journal.events(), vec!["shutdown"]);
        assert_eq!(seq.state(), RestartState::Stopping);
    }

    #[tokio::test]
    async fn test_missing_path_means_plain_restart() {
        let journal = Journal::default();
        let daemon = FakeDaemon::new(&journal, false);
        let relocator = FakeRelocator {
            journal: &journal,
            fail_move: false,
        };
        let launcher = FakeLauncher::new(&journal, false);

        let mut no_destination = intent(true);
        no_destination.destination = None;
        let mut empty_origin = intent(true);
        empty_origin.origin = Some(PathBuf::new());

        for intent in [no_destination, empty_origin] {
            let mut seq = RestartSequencer::new(&daemon, &relocator, &launcher);
            seq.run(&intent, Path::new("/bin/btfs")).await.unwrap();
        }
        assert_eq!(journal.events(), vec!["spawn", "spawn"]);
    }

    #[tokio::test]
    async fn test_relocation_failure_prevents_spawn() {
        let journal = Journal::default();
        let daemon = FakeDaemon::new(&journal, false);
        let relocator = FakeRelocator {
            journal: &journal,
            fail_move: true,
        };
        let launcher = FakeLauncher::new(&journal, false);

        let mut seq = RestartSequencer::new(&daemon, &relocator, &launcher);
        let err = seq
            .run(&intent(true), Path::new("/bin/btfs"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RelocationFailure(_)));
        assert!(err.is_restart_failure());
        assert!(journal.events().is_empty());
        assert_eq!(seq.state(), RestartState::Relocating);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported_without_handoff() {
        let journal = Journal::default();
        let daemon = FakeDaemon::new(&journal, false);
        let relocator = FakeRelocator {
            journal: &journal,
            fail_move: false,
        };
        let launcher = FakeLauncher::new(&journal, true);

        let mut seq = RestartSequencer::new(&daemon, &relocator, &launcher);
        let err = seq
            .run(&intent(false), Path::new("/bin/btfs"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ProcessSpawnFailure(_)));
        assert_eq!(seq.state(), RestartState::Relaunching);
    }

    #[tokio::test]
    async fn test_daemon_log_goes_to_target_repo() {
        let dir = tempdir().unwrap();
        let journal = Journal::default();
        let daemon = FakeDaemon::new(&journal, false);
        let relocator = FakeRelocator {
            journal: &journal,
            fail_move: false,
        };
        let launcher = FakeLauncher::new(&journal, false);

        let intent = RestartIntent {
            post_path_modification: false,
            origin: Some(dir.path().to_path_buf()),
            destination: None,
        };
        let mut seq = RestartSequencer::new(&daemon, &relocator, &launcher);
        seq.run(&intent, Path::new("/bin/btfs")).await.unwrap();

        let requests = launcher.requests.lock().unwrap();
        assert_eq!(requests[0].log, Some(dir.path().join(DAEMON_LOG_FILE)));
    }

    #[test]
    fn test_fs_relocator_moves_contents_and_records_path() {
        let dir = tempdir().unwrap();
        let origin = dir.path().join("old");
        let destination = dir.path().join("mnt").join("new");
        std::fs::create_dir_all(origin.join("blocks")).unwrap();
        std::fs::write(origin.join("config"), "{}").unwrap();
        std::fs::write(origin.join("blocks").join("CIQA"), b"data").unwrap();

        let properties = dir.path().join("btfs.properties");
        let relocator = FsRelocator::new(&properties);
        relocator.move_storage(&origin, &destination).unwrap();
        relocator.write_properties(&destination).unwrap();

        assert_eq!(std::fs::read_to_string(destination.join("config")).unwrap(), "{}");
        assert_eq!(
            std::fs::read(destination.join("blocks").join("CIQA")).unwrap(),
            b"data"
        );
        assert!(!origin.join("config").exists());

        let recorded: toml::Table =
            toml::from_str(&std::fs::read_to_string(&properties).unwrap()).unwrap();
        assert_eq!(
            recorded["path"].as_str(),
            Some(destination.to_str().unwrap())
        );
    }

    #[test]
    fn test_properties_survive_unusual_paths() {
        let dir = tempdir().unwrap();
        let properties = dir.path().join("btfs.properties");
        let relocator = FsRelocator::new(&properties);

        let odd = "/mnt/disk \"one\"\\line\nbreak\ttab\u{7}";
        relocator.write_properties(Path::new(odd)).unwrap();

        let recorded: toml::Table =
            toml::from_str(&std::fs::read_to_string(&properties).unwrap()).unwrap();
        assert_eq!(recorded["path"].as_str(), Some(odd));
    }

    #[test]
    fn test_fs_relocator_refuses_conflicts() {
        let dir = tempdir().unwrap();
        let origin = dir.path().join("old");
        let destination = dir.path().join("new");
        std::fs::create_dir_all(&origin).unwrap();
        std::fs::create_dir_all(&destination).unwrap();
        std::fs::write(origin.join("config"), "a").unwrap();
        std::fs::write(destination.join("config"), "b").unwrap();

        let relocator = FsRelocator::new(dir.path().join("props"));
        assert!(matches!(
            relocator.move_storage(&origin, &destination),
            Err(Error::RelocationFailure(_))
        ));
        assert!(matches!(
            relocator.move_storage(&origin, &origin.join("nested")),
            Err(Error::RelocationFailure(_))
        ));
        assert!(matches!(
            relocator.move_storage(&dir.path().join("missing"), &destination),
            Err(Error::RelocationFailure(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_detached_launcher_reports_early_exit() {
        let dir = tempdir().unwrap();
        let log = dir.path().join(DAEMON_LOG_FILE);
        let launcher = DetachedLauncher::new(Duration::from_millis(300));

        let request = LaunchRequest::new("/bin/sh", ["-c", "echo 'unrecognized subcommand' >&2; exit 2"])
            .with_log(&log);
        let err = launcher.spawn(&request).unwrap_err();

        assert!(matches!(err, Error::ProcessSpawnFailure(ref m) if m.contains("exited immediately")));
        assert!(std::fs::read_to_string(&log)
            .unwrap()
            .contains("unrecognized subcommand"));
    }

    #[cfg(unix)]
    #[test]
    fn test_detached_launcher_hands_off_running_child() {
        let launcher = DetachedLauncher::new(Duration::from_millis(50));
        let request = LaunchRequest::new("/bin/sh", ["-c", "sleep 1"]);
        assert!(launcher.spawn(&request).unwrap() > 0);

        let missing = LaunchRequest::new("/nonexistent/btfs", ["daemon"]);
        assert!(matches!(
            launcher.spawn(&missing),
            Err(Error::ProcessSpawnFailure(_))
        ));
    }

    #[test]
    fn test_launch_request_builder() {
        let request = LaunchRequest::new("/bin/btfs", ["daemon"])
            .with_env("BTFS_PATH", "/x")
            .with_log("/x/daemon.log");
        assert_eq!(request.program, PathBuf::from("/bin/btfs"));
        assert_eq!(
            request.env,
            vec![("BTFS_PATH".to_string(), "/x".to_string())]
        );
        assert_eq!(request.log, Some(PathBuf::from("/x/daemon.log")));
    }
}
