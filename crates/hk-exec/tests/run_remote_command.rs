//! Remote command integration tests
//!
//! Drives the establisher and session runner through a scripted in-memory
//! transport so dial failures, exit codes and teardown can be observed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use hk_core::config::{ExecConfig, RetryPolicy};
use hk_core::traits::{DialTarget, HostKeyPolicy, RemoteShell, ShellConnection, ShellSession};
use hk_core::{
    CommandOutcome, Credential, CredentialError, ExitStatus, NodeTarget, TransportError,
};
use hk_exec::{run_remote_command, ExecError, RemoteRunner};

/// Counters shared between the test and every object the shell hands out
#[derive(Default)]
struct Counters {
    dials: AtomicUsize,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    sessions_aborted: AtomicUsize,
    connections_closed: AtomicUsize,
    connections_aborted: AtomicUsize,
    commands: Mutex<Vec<String>>,
}

/// What the scripted remote process does
#[derive(Clone)]
struct Script {
    dial_failures: usize,
    reject_auth: bool,
    fail_session: bool,
    hang: bool,
    stdout: &'static [u8],
    stderr: &'static [u8],
    exit: ExitStatus,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            dial_failures: 0,
            reject_auth: false,
            fail_session: false,
            hang: false,
            stdout: b"",
            stderr: b"",
            exit: ExitStatus::Code(0),
        }
    }
}

struct ScriptedShell {
    script: Script,
    counters: Arc<Counters>,
}

impl ScriptedShell {
    fn new(script: Script) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (
            Self {
                script,
                counters: Arc::clone(&counters),
            },
            counters,
        )
    }
}

#[async_trait]
impl RemoteShell for ScriptedShell {
    type Auth = String;
    type Connection = ScriptedConnection;

    fn prepare(&self, credential: &Credential) -> Result<String, CredentialError> {
        Ok(credential.name.clone())
    }

    async fn dial(
        &self,
        target: &DialTarget,
        _auth: &String,
        _host_keys: &HostKeyPolicy,
    ) -> Result<ScriptedConnection, TransportError> {
        let attempt = self.counters.dials.fetch_add(1, Ordering::SeqCst);
        if attempt < self.script.dial_failures {
            if self.script.reject_auth {
                return Err(TransportError::AuthRejected(target.user.clone()));
            }
            return Err(TransportError::Connect {
                address: target.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(ScriptedConnection {
            script: self.script.clone(),
            counters: Arc::clone(&self.counters),
            closed: false,
        })
    }
}

struct ScriptedConnection {
    script: Script,
    counters: Arc<Counters>,
    closed: bool,
}

#[async_trait]
impl ShellConnection for ScriptedConnection {
    type Session = ScriptedSession;

    async fn open_session(&mut self) -> Result<ScriptedSession, TransportError> {
        if self.script.fail_session {
            return Err(TransportError::Channel("administratively prohibited".to_string()));
        }
        self.counters.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedSession {
            script: self.script.clone(),
            counters: Arc::clone(&self.counters),
            closed: false,
        })
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.closed {
            self.closed = true;
            self.counters.connections_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn abort(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.connections_aborted.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct ScriptedSession {
    script: Script,
    counters: Arc<Counters>,
    closed: bool,
}

#[async_trait]
impl ShellSession for ScriptedSession {
    async fn run(
        &mut self,
        command: &str,
        stdout: &mut Vec<u8>,
        stderr: &mut Vec<u8>,
    ) -> Result<ExitStatus, TransportError> {
        self.counters.commands.lock().unwrap().push(command.to_string());
        if self.script.hang {
            std::future::pending::<()>().await;
        }
        stdout.extend_from_slice(self.script.stdout);
        stderr.extend_from_slice(self.script.stderr);
        Ok(self.script.exit.clone())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.closed {
            self.closed = true;
            self.counters.sessions_closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn abort(&mut self) {
        if !self.closed {
            self.closed = true;
            self.counters.sessions_aborted.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn keys() -> HashMap<String, Credential> {
    let mut keys = HashMap::new();
    keys.insert("ops".to_string(), Credential::from_path("ops", "/keys/ops"));
    keys
}

fn node() -> NodeTarget {
    NodeTarget::new("10.0.0.7", "ops")
}

#[tokio::test(start_paused = true)]
async fn test_succeeds_after_up_to_ten_dial_failures() {
    for failures in 0..=10 {
        let (shell, counters) = ScriptedShell::new(Script {
            dial_failures: failures,
            stdout: b"ok\n",
            ..Script::default()
        });

        let result = run_remote_command(&shell, &keys(), &ExecConfig::default(), &node(), "true")
            .await
            .unwrap_or_else(|e| panic!("{} failures should be retried: {}", failures, e));

        assert_eq!(result.outcome, CommandOutcome::Success);
        assert_eq!(counters.dials.load(Ordering::SeqCst), failures + 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_eleven_dial_failures_surface_dial_error() {
    let (shell, counters) = ScriptedShell::new(Script {
        dial_failures: usize::MAX,
        ..Script::default()
    });

    let started = tokio::time::Instant::now();
    let err = run_remote_command(&shell, &keys(), &ExecConfig::default(), &node(), "true")
        .await
        .unwrap_err();

    match err {
        ExecError::Dial { attempts, source, .. } => {
            assert_eq!(attempts, 11);
            assert!(matches!(source, TransportError::Connect { .. }));
        }
        other => panic!("expected dial error, got {:?}", other),
    }
    assert_eq!(counters.dials.load(Ordering::SeqCst), 11);
    // Ten pauses between eleven attempts, none after the last.
    assert!(started.elapsed() >= Duration::from_secs(10));
    assert!(started.elapsed() < Duration::from_secs(11));
}

#[tokio::test(start_paused = true)]
async fn test_auth_rejection_is_retried_like_connect_failure() {
    let (shell, counters) = ScriptedShell::new(Script {
        dial_failures: 3,
        reject_auth: true,
        ..Script::default()
    });

    run_remote_command(&shell, &keys(), &ExecConfig::default(), &node(), "true")
        .await
        .unwrap();
    assert_eq!(counters.dials.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_custom_retry_policy_caps_attempts() {
    let (shell, counters) = ScriptedShell::new(Script {
        dial_failures: usize::MAX,
        ..Script::default()
    });
    let config = ExecConfig {
        retry: RetryPolicy::new(Duration::from_millis(10), 3),
        ..ExecConfig::default()
    };

    let started = tokio::time::Instant::now();
    let err = run_remote_command(&shell, &keys(), &config, &node(), "true")
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Dial { attempts: 3, .. }));
    assert_eq!(counters.dials.load(Ordering::SeqCst), 3);
    assert!(started.elapsed() >= Duration::from_millis(20));
    assert!(started.elapsed() < Duration::from_millis(30));
}

#[tokio::test]
async fn test_stdout_round_trips_byte_for_byte() {
    let output: &'static [u8] = b"line one\n\x00\xff binary tail\r\n";
    let (shell, counters) = ScriptedShell::new(Script {
        stdout: output,
        stderr: b"warning: noisy\n",
        ..Script::default()
    });

    let result = run_remote_command(&shell, &keys(), &ExecConfig::default(), &node(), "cat blob")
        .await
        .unwrap();

    assert!(result.outcome.is_success());
    assert_eq!(result.stdout, Bytes::from_static(output));
    assert_eq!(result.stderr, Bytes::from_static(b"warning: noisy\n"));
    assert_eq!(counters.sessions_opened.load(Ordering::SeqCst), 1);
    assert_eq!(counters.sessions_closed.load(Ordering::SeqCst), 1);
    assert_eq!(counters.connections_closed.load(Ordering::SeqCst), 1);
    assert_eq!(counters.sessions_aborted.load(Ordering::SeqCst), 0);
    assert_eq!(counters.connections_aborted.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_nonzero_exit_returns_command_error_with_stderr() {
    let (shell, counters) = ScriptedShell::new(Script {
        stdout: b"partial\n",
        stderr: b"kubeadm: command not found\n",
        exit: ExitStatus::Code(127),
        ..Script::default()
    });

    let err = run_remote_command(&shell, &keys(), &ExecConfig::default(), &node(), "kubeadm init")
        .await
        .unwrap_err();

    match err {
        ExecError::Command { command, result } => {
            assert_eq!(command, "kubeadm init");
            assert_eq!(result.outcome, CommandOutcome::Exited(127));
            assert_eq!(
                result.stderr,
                Bytes::from_static(b"kubeadm: command not found\n")
            );
            assert_eq!(result.stdout, Bytes::from_static(b"partial\n"));
        }
        other => panic!("expected command error, got {:?}", other),
    }
    assert_eq!(counters.dials.load(Ordering::SeqCst), 1);
    assert_eq!(counters.sessions_closed.load(Ordering::SeqCst), 1);
    assert_eq!(counters.connections_closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_signal_is_a_command_error() {
    let (shell, _counters) = ScriptedShell::new(Script {
        exit: ExitStatus::Signal("KILL".to_string()),
        ..Script::default()
    });

    let err = run_remote_command(&shell, &keys(), &ExecConfig::default(), &node(), "sleep 100")
        .await
        .unwrap_err();

    assert_eq!(
        err.output().map(|r| r.outcome.clone()),
        Some(CommandOutcome::Signaled("KILL".to_string()))
    );
}

#[tokio::test]
async fn test_session_open_failure_closes_connection() {
    let (shell, counters) = ScriptedShell::new(Script {
        fail_session: true,
        ..Script::default()
    });

    let err = run_remote_command(&shell, &keys(), &ExecConfig::default(), &node(), "true")
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::Session(TransportError::Channel(_))));
    assert_eq!(counters.sessions_opened.load(Ordering::SeqCst), 0);
    assert_eq!(counters.connections_closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_command_is_passed_through() {
    let (shell, counters) = ScriptedShell::new(Script::default());
    let runner = RemoteRunner::new(shell, keys(), ExecConfig::default());

    let result = runner.run(&node(), "").await.unwrap();
    assert!(result.stdout.is_empty());
    assert_eq!(*counters.commands.lock().unwrap(), vec![String::new()]);
    assert_eq!(counters.sessions_opened.load(Ordering::SeqCst), 1);
    assert_eq!(counters.sessions_closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_command_reaches_session_unchanged() {
    let (shell, counters) = ScriptedShell::new(Script::default());
    let command = "echo 'a  b' && cat /etc/hostname";

    run_remote_command(&shell, &keys(), &ExecConfig::default(), &node(), command)
        .await
        .unwrap();
    assert_eq!(*counters.commands.lock().unwrap(), vec![command.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_run_releases_session_and_connection() {
    let (shell, counters) = ScriptedShell::new(Script {
        hang: true,
        ..Script::default()
    });

    let keys = keys();
    let config = ExecConfig::default();
    let node = node();

    let run = run_remote_command(&shell, &keys, &config, &node, "sleep 600");
    let timed_out = tokio::time::timeout(Duration::from_secs(5), run).await;

    assert!(timed_out.is_err());
    assert_eq!(counters.sessions_opened.load(Ordering::SeqCst), 1);
    assert_eq!(counters.sessions_aborted.load(Ordering::SeqCst), 1);
    assert_eq!(counters.connections_aborted.load(Ordering::SeqCst), 1);
    assert_eq!(counters.sessions_closed.load(Ordering::SeqCst), 0);
    assert_eq!(counters.connections_closed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_key_fails_before_dialing() {
    let (shell, counters) = ScriptedShell::new(Script::default());

    let err = run_remote_command(
        &shell,
        &keys(),
        &ExecConfig::default(),
        &NodeTarget::new("10.0.0.7", "missing"),
        "true",
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        ExecError::Credential(CredentialError::UnknownKey(ref name)) if name == "missing"
    ));
    assert_eq!(counters.dials.load(Ordering::SeqCst), 0);
}
