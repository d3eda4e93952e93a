//! External command processors.
//!
//! Runs `<program> <args...> <url> <output_dir> <subkind>` in the workspace
//! root and treats exit code 0 as success. This is how the convention-based
//! `processors/<kind>_processor.py` scripts are driven.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::{ProcessingError, ProcessingOutcome, Processor};

/// Longest stderr tail kept in an error message
const STDERR_TAIL_CHARS: usize = 2000;

/// Processor backed by a subprocess
#[derive(Debug, Clone)]
pub struct ScriptProcessor {
    name: String,
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ScriptProcessor {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            timeout: None,
        }
    }

    /// Append a fixed argument placed before `<url> <output_dir> <subkind>`
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(args);
        self
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl Processor for ScriptProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(
        &self,
        url: &str,
        output_dir: &Path,
        subkind: &str,
    ) -> Result<ProcessingOutcome, ProcessingError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(url)
            .arg(output_dir)
            .arg(subkind)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|source| ProcessingError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        let output = match self.timeout {
            Some(limit) => timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ProcessingError::Timeout {
                    processor: self.name.clone(),
                    timeout: limit,
                })??,
            None => child.wait_with_output().await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            debug!(processor = %self.name, "{}", line);
        }

        if !output.status.success() {
            return Err(ProcessingError::ExitStatus {
                processor: self.name.clone(),
                code: output.status.code().unwrap_or(-1),
                stderr: stderr_tail(&output.stderr),
            });
        }

        Ok(ProcessingOutcome::Completed)
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let count = text.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return text.to_string();
    }
    text.chars().skip(count - STDERR_TAIL_CHARS).collect()
}
