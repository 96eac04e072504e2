use crate::utils::errors::MonitorError;
use async_trait::async_trait;
use log::info;
use std::ffi::OsString;
use std::process::ExitStatus;
use tokio::process::{Child, Command};

/// How the workload terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildOutcome {
    pub exited_normally: bool,
    pub exit_code: i32,
    pub terminating_signal: Option<i32>,
}

impl ChildOutcome {
    pub fn exited(code: i32) -> Self {
        Self { exited_normally: true, exit_code: code, terminating_signal: None }
    }

    pub fn signaled(signal: i32) -> Self {
        Self { exited_normally: false, exit_code: 0, terminating_signal: Some(signal) }
    }

    /// Exit code the monitor reports for this outcome, using the shell's
    /// `128 + signal` convention for fatal signals.
    pub fn exit_code(&self) -> i32 {
        match (self.exited_normally, self.terminating_signal) {
            (true, _) => self.exit_code,
            (false, Some(signal)) => 128 + signal,
            (false, None) => 0,
        }
    }
}

impl From<ExitStatus> for ChildOutcome {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return Self::signaled(signal);
            }
        }
        Self { exited_normally: false, exit_code: 0, terminating_signal: None }
    }
}

/// A running workload that can be polled or reaped.
#[async_trait]
pub trait ChildProcess: Send {
    /// Returns immediately: `None` while the child is running.
    fn poll_nonblocking(&mut self) -> Result<Option<ChildOutcome>, MonitorError>;

    /// Blocks until the child terminates and reaps it.
    async fn wait_blocking(&mut self) -> Result<ChildOutcome, MonitorError>;
}

/// Handle to a spawned workload process.
#[derive(Debug)]
pub struct ProcessHandle {
    program: String,
    child: Child,
}

impl ProcessHandle {
    /// Runs `argv[0]` with the remaining elements as literal arguments. The
    /// child inherits stdio and is never killed by the monitor.
    pub fn spawn(argv: &[OsString]) -> Result<Self, MonitorError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| MonitorError::Config("empty workload command".to_string()))?;
        let name = program.to_string_lossy().into_owned();

        let child = match Command::new(program).args(args).kill_on_drop(false).spawn() {
            Ok(child) => child,
            Err(source) => return Err(MonitorError::SpawnFailed { program: name, source }),
        };

        info!("Spawned `{}` with pid {:?}", name, child.id());
        Ok(Self { program: name, child })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// OS process id, `None` once the child has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

#[async_trait]
impl ChildProcess for ProcessHandle {
    fn poll_nonblocking(&mut self) -> Result<Option<ChildOutcome>, MonitorError> {
        let status = self.child.try_wait().map_err(MonitorError::Wait)?;
        Ok(status.map(ChildOutcome::from))
    }

    async fn wait_blocking(&mut self) -> Result<ChildOutcome, MonitorError> {
        let status = self.child.wait().await.map_err(MonitorError::Wait)?;
        Ok(ChildOutcome::from(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::ffi::OsStringExt;
    use std::time::Duration;

    fn argv(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    fn sh(script: &str) -> Vec<OsString> {
        argv(&["sh", "-c", script])
    }

    #[test]
    // Test normal exits propagate their own code
    fn test_exit_code_normal() {
        assert_eq!(ChildOutcome::exited(0).exit_code(), 0);
        assert_eq!(ChildOutcome::exited(7).exit_code(), 7);
    }

    #[test]
    // Test signal terminations follow the 128 + signal convention
    fn test_exit_code_signal() {
        assert_eq!(ChildOutcome::signaled(9).exit_code(), 137);
        assert_eq!(ChildOutcome::signaled(15).exit_code(), 143);
    }

    #[test]
    // Test an undetermined outcome maps to zero
    fn test_exit_code_unknown() {
        let outcome = ChildOutcome { exited_normally: false, exit_code: 3, terminating_signal: None };
        assert_eq!(outcome.exit_code(), 0);
    }

    #[tokio::test]
    // Test blocking wait reaps a child exiting with code 7
    async fn test_wait_blocking_exit_code() {
        let mut handle = ProcessHandle::spawn(&sh("exit 7")).unwrap();
        let outcome = handle.wait_blocking().await.unwrap();
        assert_eq!(outcome, ChildOutcome::exited(7));
    }

    #[tokio::test]
    // Test a child killed by SIGKILL is reported as signaled
    async fn test_wait_blocking_signal() {
        let mut handle = ProcessHandle::spawn(&sh("kill -9 $$")).unwrap();
        let outcome = handle.wait_blocking().await.unwrap();
        assert_eq!(outcome.terminating_signal, Some(9));
        assert_eq!(outcome.exit_code(), 137);
    }

    #[tokio::test]
    // Test polling returns None while running and the outcome after exit
    async fn test_poll_nonblocking() {
        let mut handle = ProcessHandle::spawn(&sh("sleep 0.3")).unwrap();
        assert!(handle.id().is_some());
        assert_eq!(handle.poll_nonblocking().unwrap(), None);

        let mut outcome = None;
        for _ in 0..100 {
            outcome = handle.poll_nonblocking().unwrap();
            if outcome.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(outcome, Some(ChildOutcome::exited(0)));
    }

    #[tokio::test]
    // Test arguments are passed literally, without shell interpolation
    async fn test_spawn_literal_arguments() {
        let mut handle =
            ProcessHandle::spawn(&argv(&["sh", "-c", "test \"$1\" = '$HOME'", "sh", "$HOME"])).unwrap();
        assert_eq!(handle.program(), "sh");
        assert_eq!(handle.wait_blocking().await.unwrap().exit_code(), 0);
    }

    #[tokio::test]
    // Test arguments that are not valid UTF-8 reach the child byte for byte
    async fn test_spawn_non_utf8_argument() {
        let raw = OsString::from_vec(b"f\xff.bin".to_vec());
        let args = vec![OsString::from("test"), raw.clone(), OsString::from("="), raw];
        let mut handle = ProcessHandle::spawn(&args).unwrap();
        assert_eq!(handle.wait_blocking().await.unwrap().exit_code(), 0);

        let mismatch = vec![
            OsString::from("test"),
            OsString::from_vec(b"f\xff.bin".to_vec()),
            OsString::from("="),
            OsString::from("f\u{fffd}.bin"),
        ];
        let mut handle = ProcessHandle::spawn(&mismatch).unwrap();
        assert_eq!(handle.wait_blocking().await.unwrap().exit_code(), 1);
    }

    #[tokio::test]
    // Test a missing program surfaces as SpawnFailed
    async fn test_spawn_missing_program() {
        let err = ProcessHandle::spawn(&argv(&["/nonexistent/definitely-not-a-command"])).unwrap_err();
        assert!(matches!(err, MonitorError::SpawnFailed { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    // Test an empty command line is rejected before any process work
    async fn test_spawn_empty_argv() {
        let err = ProcessHandle::spawn(&[]).unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
    }
}
