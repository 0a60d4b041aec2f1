use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;

use model_tunnel_core::prelude::SampleError;

use super::{parse_percent, ResourceSampler, ResourceUsage};

/// Environment variable to override the path to the docker binary used to query container stats.
pub const MT_DOCKER_PATH_ENV: &str = "MT_DOCKER_PATH";

/// Get the path to the docker binary.
///
/// If the [`MT_DOCKER_PATH_ENV`] environment variable is set, its value is used as the path to
/// the docker binary. Otherwise `docker` is looked up in the user's `PATH`.
pub fn docker_path() -> anyhow::Result<PathBuf> {
    match env::var(MT_DOCKER_PATH_ENV).ok().as_deref() {
        Some("") => {
            bail!("'{MT_DOCKER_PATH_ENV}' set to empty string");
        }
        Some("docker") | None => {
            log::debug!("'{MT_DOCKER_PATH_ENV}' is not a path so looking in user's 'PATH'");
            which::which("docker").with_context(|| {
                format!(
                    "docker binary not found in PATH. Please install docker or set '{MT_DOCKER_PATH_ENV}' to the correct path."
                )
            })
        }
        Some(path) => {
            let docker_path = PathBuf::from(path);
            if !docker_path.exists() {
                bail!(
                    "Path to docker binary overwritten with '{MT_DOCKER_PATH_ENV}={path}' but that path doesn't exist",
                    path = docker_path.display()
                );
            }
            Ok(docker_path)
        }
    }
}

/// How long one `docker stats` call may take before the reading is dropped.
const DEFAULT_STATS_TIMEOUT: Duration = Duration::from_secs(10);

/// Samples containers with `docker stats <target> --no-stream --format {{json .}}`.
///
/// Each call blocks on its own single-threaded runtime, so it must not be made from async code.
#[derive(Debug, Clone)]
pub struct DockerStatsSampler {
    binary: PathBuf,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct DockerStats {
    #[serde(rename = "CPUPerc")]
    cpu_perc: String,
    #[serde(rename = "MemPerc")]
    mem_perc: String,
}

impl DockerStatsSampler {
    /// Create a sampler using the docker binary found by [docker_path].
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::with_binary(docker_path()?))
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: DEFAULT_STATS_TIMEOUT,
        }
    }

    /// Give up on a stats call after `timeout`. The docker process is killed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ResourceSampler for DockerStatsSampler {
    fn sample(&self, target: &str) -> Result<ResourceUsage, SampleError> {
        let spawn_error = |source: std::io::Error| SampleError::Spawn {
            target: target.to_string(),
            source,
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(spawn_error)?;

        let mut command = tokio::process::Command::new(&self.binary);
        command
            .args(["stats", target, "--no-stream", "--format", "{{json .}}"])
            .kill_on_drop(true);

        let output = runtime
            .block_on(tokio::time::timeout(self.timeout, command.output()))
            .map_err(|_| SampleError::TimedOut {
                target: target.to_string(),
                limit: self.timeout,
            })?
            .map_err(spawn_error)?;

        if !output.status.success() {
            return Err(SampleError::CommandFailed {
                target: target.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_stats(target, &stdout)
    }
}

fn parse_stats(target: &str, payload: &str) -> Result<ResourceUsage, SampleError> {
    let malformed = |reason: String| SampleError::Malformed {
        target: target.to_string(),
        reason,
    };

    let line = payload
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| malformed("empty output".to_string()))?;

    let stats: DockerStats = serde_json::from_str(line).map_err(|e| malformed(e.to_string()))?;

    Ok(ResourceUsage {
        cpu_percent: parse_percent(&stats.cpu_perc).map_err(malformed)?,
        mem_percent: parse_percent(&stats.mem_perc).map_err(malformed)?,
    })
}

#[cfg(test)]
mod tests {
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt as _;
    use std::path::Path;

    use parking_lot::Mutex;
    use tempfile::{NamedTempFile, TempDir};

    use super::*;

    // Tests in this module change process-wide environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn parses_docker_stats_payload() {
        let payload = r#"{"BlockIO":"0B / 0B","CPUPerc":"12.50%","Container":"mongodb","MemPerc":"3.25%","Name":"mongodb"}"#;
        let usage = parse_stats("mongodb", payload).unwrap();
        assert_eq!(12.5, usage.cpu_percent);
        assert_eq!(3.25, usage.mem_percent);
    }

    #[test]
    fn rejects_malformed_payloads() {
        for payload in [
            "",
            "not json",
            r#"{"CPUPerc":"1.0%"}"#,
            r#"{"CPUPerc":"--","MemPerc":"--"}"#,
        ] {
            let result = parse_stats("neo4j", payload);
            assert!(
                matches!(result, Err(SampleError::Malformed { .. })),
                "payload {payload:?} gave {result:?}"
            );
        }
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let sampler = DockerStatsSampler::with_binary("/non/existent/path/to/docker");
        assert!(matches!(
            sampler.sample("mongodb"),
            Err(SampleError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn samples_through_docker_binary() {
        let temp = TempDir::new().unwrap();
        let script = write_script(
            temp.path(),
            "docker",
            r#"echo '{"CPUPerc":"7.10%","MemPerc":"0.42%"}'"#,
        );

        let usage = DockerStatsSampler::with_binary(script)
            .sample("objective_dewdney")
            .unwrap();
        assert_eq!(7.1, usage.cpu_percent);
        assert_eq!(0.42, usage.mem_percent);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_command_failed() {
        let temp = TempDir::new().unwrap();
        let script = write_script(
            temp.path(),
            "docker",
            "echo 'Error: No such container: neo4j' >&2\nexit 1",
        );

        let result = DockerStatsSampler::with_binary(script).sample("neo4j");
        match result {
            Err(SampleError::CommandFailed { stderr, .. }) => {
                assert_eq!("Error: No such container: neo4j", stderr)
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn hung_docker_call_times_out() {
        let temp = TempDir::new().unwrap();
        let script = write_script(temp.path(), "docker", "exec sleep 30");

        let started = std::time::Instant::now();
        let result = DockerStatsSampler::with_binary(script)
            .with_timeout(Duration::from_millis(200))
            .sample("arangodb");

        assert!(
            matches!(result, Err(SampleError::TimedOut { .. })),
            "expected TimedOut, got {result:?}"
        );
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_should_not_get_docker_path_if_not_exist() {
        let _guard = ENV_LOCK.lock();
        env::set_var(MT_DOCKER_PATH_ENV, "/non/existent/path/to/docker");
        let result = docker_path();
        env::remove_var(MT_DOCKER_PATH_ENV);
        assert!(result.is_err());
    }

    #[test]
    fn test_should_get_docker_path_from_env() {
        let _guard = ENV_LOCK.lock();
        let temp = NamedTempFile::new().expect("failed to create temp file");
        let test_path = temp.path().to_str().expect("failed to get temp file path");
        env::set_var(MT_DOCKER_PATH_ENV, test_path);
        let result = docker_path();
        env::remove_var(MT_DOCKER_PATH_ENV);
        assert_eq!(result.expect("failed to get docker path"), PathBuf::from(test_path));
    }

    #[cfg(unix)]
    #[test]
    fn test_should_get_default_docker_path() {
        let _guard = ENV_LOCK.lock();
        let temp = TempDir::new().unwrap();
        let docker_file_path = write_script(temp.path(), "docker", "exit 0");

        let old_path = env::var_os("PATH");
        env::set_var("PATH", temp.path());
        env::remove_var(MT_DOCKER_PATH_ENV);

        let result = docker_path();
        if let Some(old_path) = old_path {
            env::set_var("PATH", old_path);
        }

        assert_eq!(result.expect("failed to get docker path"), docker_file_path);
    }

    #[test]
    fn test_should_not_get_default_docker_path() {
        let _guard = ENV_LOCK.lock();
        let temp = TempDir::new().unwrap();

        let old_path = env::var_os("PATH");
        env::set_var("PATH", temp.path());
        env::remove_var(MT_DOCKER_PATH_ENV);

        let result = docker_path();
        if let Some(old_path) = old_path {
            env::set_var("PATH", old_path);
        }

        assert!(result.is_err());
    }
}
