//! One-shot adapter for the browser extension: one JSON object in on stdin,
//! one JSON object out on stdout.

use std::io::{self, Read, Write};
use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(e: &anyhow::Error) -> Self {
        Self {
            success: false,
            error: Some(format!("{e:#}")),
        }
    }
}

/// Reads stdin, opens the URL (if any) and writes the reply to stdout.
pub fn run() -> Result<()> {
    let mut input = String::new();
    let reply = match io::stdin().read_to_string(&mut input) {
        Ok(_) => handle(&input, open_with_os),
        Err(e) => Reply::failed(&anyhow::Error::new(e).context("read stdin")),
    };

    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, &reply).context("write reply")?;
    stdout.flush().context("flush stdout")
}

/// A message without `url` is acknowledged without doing anything.
pub fn handle<F>(input: &str, open: F) -> Reply
where
    F: FnOnce(&str) -> Result<()>,
{
    let result = serde_json::from_str::<Message>(input)
        .context("invalid message")
        .and_then(|msg| match msg.url.as_deref() {
            Some(url) if !url.is_empty() => open(url),
            _ => Ok(()),
        });

    match result {
        Ok(()) => Reply::ok(),
        Err(e) => Reply::failed(&e),
    }
}

/// Hands the URL to the platform's default URL handler.
pub fn open_with_os(url: &str) -> Result<()> {
    let (program, args) = OS_OPENER;
    debug!(program, url, "opening");
    let status = Command::new(program)
        .args(args)
        .arg(url)
        .stdin(Stdio::null())
        .status()
        .with_context(|| format!("failed to run {program}"))?;
    if !status.success() {
        bail!("{program} exited with {status}");
    }
    Ok(())
}

/// Program and leading arguments of the platform URL handler.
#[cfg(windows)]
const OS_OPENER: (&str, &[&str]) = (
    r"C:\Windows\System32\rundll32.exe",
    &["url.dll,FileProtocolHandler"],
);
#[cfg(target_os = "macos")]
const OS_OPENER: (&str, &[&str]) = ("/usr/bin/open", &[]);
#[cfg(not(any(windows, target_os = "macos")))]
const OS_OPENER: (&str, &[&str]) = ("xdg-open", &[]);
