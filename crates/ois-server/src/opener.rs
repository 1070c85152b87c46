use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{error::OpenError, ServerConfig};

/// The OS primitive that opens a URL in the target browser.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, url: &str) -> Result<(), OpenError>;
}

/// Runs `<program> <args..> <url>` and waits for it, bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct SystemLauncher {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl SystemLauncher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// `/usr/bin/open -a <browser> <url>` with the configured timeout.
    pub fn for_browser(cfg: &ServerConfig) -> Self {
        Self::new(
            "/usr/bin/open",
            vec!["-a".into(), cfg.browser.clone()],
            cfg.open_timeout,
        )
    }
}

#[async_trait]
impl Launcher for SystemLauncher {
    async fn launch(&self, url: &str) -> Result<(), OpenError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %self.program.display(), url, "launching");

        // Dropping the output future on timeout kills the child.
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| OpenError::Timeout(self.timeout))??;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        if stderr.is_empty() {
            Err(OpenError::Failed("Unknown error from 'open'".into()))
        } else {
            Err(OpenError::Failed(stderr))
        }
    }
}

/// The action behind `POST /open`: scheme check, dry run, then one launch.
pub async fn open_url(
    cfg: &ServerConfig,
    launcher: &dyn Launcher,
    url: &str,
) -> Result<String, OpenError> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(OpenError::SchemeNotAllowed);
    }
    if cfg.dry_run {
        info!(url, browser = %cfg.browser, "dry run: would open");
        return Ok("DRY_RUN: OK".into());
    }
    launcher.launch(url).await?;
    Ok(format!("Opened in {}", cfg.browser))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    #[async_trait]
    impl Launcher for Recorder {
        async fn launch(&self, url: &str) -> Result<(), OpenError> {
            self.0.lock().unwrap().push(url.to_owned());
            Ok(())
        }
    }

    #[tokio::test]
    async fn opens_http_and_https() {
        let cfg = ServerConfig::default();
        let rec = Recorder::default();
        let msg = open_url(&cfg, &rec, "https://example.com").await.unwrap();
        assert_eq!(msg, "Opened in Safari");
        open_url(&cfg, &rec, "http://example.com").await.unwrap();
        assert_eq!(
            *rec.0.lock().unwrap(),
            vec!["https://example.com", "http://example.com"]
        );
    }

    #[tokio::test]
    async fn rejects_other_schemes_without_launching() {
        let cfg = ServerConfig::default();
        let rec = Recorder::default();
        for url in ["ftp://example.com", "file:///etc/passwd", "javascript:alert(1)", "HTTPS://x"] {
            let err = open_url(&cfg, &rec, url).await.unwrap_err();
            assert!(matches!(err, OpenError::SchemeNotAllowed), "{url}");
        }
        assert!(rec.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dry_run_reports_success_without_launching() {
        let cfg = ServerConfig {
            dry_run: true,
            ..Default::default()
        };
        let rec = Recorder::default();
        let msg = open_url(&cfg, &rec, "https://example.com").await.unwrap();
        assert_eq!(msg, "DRY_RUN: OK");
        assert!(rec.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dry_run_still_checks_scheme() {
        let cfg = ServerConfig {
            dry_run: true,
            ..Default::default()
        };
        let err = open_url(&cfg, &Recorder::default(), "ftp://x").await.unwrap_err();
        assert!(matches!(err, OpenError::SchemeNotAllowed));
    }

    #[test]
    fn system_launcher_targets_configured_browser() {
        let cfg = ServerConfig {
            browser: "Safari Technology Preview".into(),
            ..Default::default()
        };
        let launcher = SystemLauncher::for_browser(&cfg);
        assert_eq!(launcher.program, PathBuf::from("/usr/bin/open"));
        assert_eq!(launcher.args, vec!["-a", "Safari Technology Preview"]);
        assert_eq!(launcher.timeout, Duration::from_secs(10));
    }

    #[cfg(unix)]
    fn sh(script: &str, timeout: Duration) -> SystemLauncher {
        SystemLauncher::new("/bin/sh", vec!["-c".into(), script.into(), "sh".into()], timeout)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn zero_exit_is_success() {
        let launcher = sh(r#"test "$1" = "https://example.com""#, Duration::from_secs(5));
        launcher.launch("https://example.com").await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let launcher = sh("echo 'Unable to find application' >&2; exit 1", Duration::from_secs(5));
        match launcher.launch("https://example.com").await {
            Err(OpenError::Failed(msg)) => assert_eq!(msg, "Unable to find application"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_without_stderr_is_unknown_error() {
        let launcher = sh("exit 3", Duration::from_secs(5));
        match launcher.launch("https://example.com").await {
            Err(OpenError::Failed(msg)) => assert_eq!(msg, "Unknown error from 'open'"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_child_times_out() {
        let launcher = sh("sleep 5", Duration::from_millis(200));
        let started = std::time::Instant::now();
        let err = launcher.launch("https://example.com").await.unwrap_err();
        assert!(matches!(err, OpenError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let launcher = SystemLauncher::new(
            "/nonexistent/ois-open",
            vec![],
            Duration::from_secs(1),
        );
        let err = launcher.launch("https://example.com").await.unwrap_err();
        assert!(matches!(err, OpenError::Spawn(_)));
    }
}
