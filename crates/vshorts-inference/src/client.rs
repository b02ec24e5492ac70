//! Local model runtime client.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{InferenceError, InferenceResult};

/// A text-generation backend.
///
/// Implementations must be callable concurrently from many tasks.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Run one prompt, bounded by `timeout`.
    async fn infer(&self, prompt: &str, timeout: Duration) -> InferenceResult<String>;
}

/// Configuration for the process-backed client.
#[derive(Debug, Clone)]
pub struct ProcessClientConfig {
    /// Executable to spawn
    pub program: String,
    /// Arguments passed before the prompt is written to stdin
    pub args: Vec<String>,
}

impl Default for ProcessClientConfig {
    fn default() -> Self {
        Self::ollama("llama3")
    }
}

impl ProcessClientConfig {
    /// `ollama run <model>`.
    pub fn ollama(model: &str) -> Self {
        Self {
            program: "ollama".to_string(),
            args: vec!["run".to_string(), model.to_string()],
        }
    }

    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Create config from environment variables.
    ///
    /// `INFERENCE_ARGS` (whitespace separated) replaces the default
    /// `run <INFERENCE_MODEL>` arguments.
    pub fn from_env() -> Self {
        let program = std::env::var("INFERENCE_PROGRAM").unwrap_or_else(|_| "ollama".to_string());
        let model = std::env::var("INFERENCE_MODEL").unwrap_or_else(|_| "llama3".to_string());

        let args = std::env::var("INFERENCE_ARGS")
            .ok()
            .map(|s| s.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|args| !args.is_empty())
            .unwrap_or_else(|| vec!["run".to_string(), model]);

        Self { program, args }
    }
}

/// Runs each prompt in a fresh child process: prompt on stdin, response
/// read from stdout until EOF.
#[derive(Debug, Clone, Default)]
pub struct ProcessInferenceClient {
    config: ProcessClientConfig,
}

impl ProcessInferenceClient {
    pub fn new(config: ProcessClientConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(ProcessClientConfig::from_env())
    }

    pub fn config(&self) -> &ProcessClientConfig {
        &self.config
    }

    async fn run(&self, prompt: &str) -> InferenceResult<String> {
        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| InferenceError::spawn_failed(&self.config.program, e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| InferenceError::request_failed("child stdin not captured"))?;

        let input = prompt.as_bytes().to_vec();
        let writer = async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await
        };

        // Stdout is drained while the prompt is written so neither pipe can fill up.
        let (written, output) = tokio::join!(writer, child.wait_with_output());
        let output = output?;

        if let Err(e) = written {
            // Processes that exit without reading their input close the pipe early.
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(e.into());
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();

        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        // The caller warns once per failed prompt.
        if stdout.trim().is_empty() {
            debug!(
                program = %self.config.program,
                code = ?output.status.code(),
                stderr = %stderr,
                "Inference process failed without output"
            );
            return Err(InferenceError::NonZeroExit {
                code: output.status.code(),
                stderr,
            });
        }

        warn!(
            program = %self.config.program,
            code = ?output.status.code(),
            stderr = %stderr,
            "Inference process exited with non-zero status, using its output"
        );
        Ok(stdout)
    }
}

#[async_trait]
impl InferenceClient for ProcessInferenceClient {
    async fn infer(&self, prompt: &str, timeout: Duration) -> InferenceResult<String> {
        let started = Instant::now();

        // Dropping the future on timeout drops the child, which kills it.
        let result = match tokio::time::timeout(timeout, self.run(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(InferenceError::timeout(timeout)),
        };

        debug!(
            program = %self.config.program,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Inference call finished"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> ProcessInferenceClient {
        ProcessInferenceClient::new(ProcessClientConfig::new("sh", ["-c", script]))
    }

    #[tokio::test]
    async fn test_prompt_round_trips_through_stdin() {
        let client = ProcessInferenceClient::new(ProcessClientConfig::new("cat", Vec::<String>::new()));
        let response = client
            .infer("00:00 - 00:10 Intro", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response, "00:00 - 00:10 Intro");
    }

    #[tokio::test]
    async fn test_non_zero_exit_without_output() {
        let err = sh("echo boom >&2; exit 3")
            .infer("prompt", Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            InferenceError::NonZeroExit { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_zero_exit_keeps_stdout() {
        let response = sh("echo '00:05 - 00:20 Partial'; exit 1")
            .infer("prompt", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(response.trim(), "00:05 - 00:20 Partial");
    }

    #[tokio::test]
    async fn test_timeout() {
        let client = ProcessInferenceClient::new(ProcessClientConfig::new("sleep", ["5"]));
        let started = Instant::now();
        let err = client
            .infer("prompt", Duration::from_millis(100))
            .await
            .unwrap_err();

        assert!(matches!(err, InferenceError::Timeout { timeout_ms: 100 }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let client = ProcessInferenceClient::new(ProcessClientConfig::new(
            "definitely-not-an-inference-runtime",
            Vec::<String>::new(),
        ));
        let err = client
            .infer("prompt", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, InferenceError::ProcessSpawnFailure { .. }));
    }

    #[test]
    fn test_default_config_is_ollama() {
        let config = ProcessClientConfig::default();
        assert_eq!(config.program, "ollama");
        assert_eq!(config.args, vec!["run", "llama3"]);
    }
}
