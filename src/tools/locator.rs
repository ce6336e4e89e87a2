use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// A binary that was found and looks runnable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Executable {
    pub path: PathBuf,
}

/// Result of a successful version probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolVersion {
    pub binary: String,
    pub path: PathBuf,
    pub version: String,
}

/// Finds external binaries on the host
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExecutableLocator: Send + Sync {
    /// Resolve a tool name or path to an executable, `None` when unusable
    fn locate(&self, name: &str) -> Option<Executable>;

    /// Run the executable with `args` and return its trimmed stdout when it
    /// exits cleanly
    async fn probe(&self, executable: &Executable, args: &[String]) -> Option<String>;
}

/// Locator backed by the system `PATH`
#[derive(Debug, Default, Clone)]
pub struct SystemLocator;

#[async_trait]
impl ExecutableLocator for SystemLocator {
    fn locate(&self, name: &str) -> Option<Executable> {
        match which::which(name) {
            Ok(path) => Some(Executable { path }),
            Err(e) => {
                debug!("{} not found: {}", name, e);
                None
            }
        }
    }

    async fn probe(&self, executable: &Executable, args: &[String]) -> Option<String> {
        let output = Command::new(&executable.path)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .ok()?;

        // Killed by a signal counts as clean, like an absent exit code
        if output.status.code().is_some_and(|code| code != 0) {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// First candidate that can be located and answers the version probe.
pub async fn first_working(
    locator: &dyn ExecutableLocator,
    candidates: &[String],
    version_args: &[String],
) -> Option<ToolVersion> {
    for candidate in candidates {
        let Some(executable) = locator.locate(candidate) else {
            continue;
        };
        if let Some(version) = locator.probe(&executable, version_args).await {
            return Some(ToolVersion {
                binary: candidate.clone(),
                path: executable.path,
                version,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::function;

    #[tokio::test]
    async fn test_first_working_skips_missing_and_broken() {
        let mut locator = MockExecutableLocator::new();
        locator
            .expect_locate()
            .with(function(|name: &str| name == "youtube-dlc"))
            .returning(|_| None);
        locator
            .expect_locate()
            .with(function(|name: &str| name == "yt-dlp"))
            .returning(|_| Some(Executable { path: PathBuf::from("/bin/yt-dlp") }));
        locator
            .expect_locate()
            .with(function(|name: &str| name == "youtube-dl"))
            .returning(|_| Some(Executable { path: PathBuf::from("/bin/youtube-dl") }));
        locator
            .expect_probe()
            .returning(|exe, _| {
                if exe.path.ends_with("yt-dlp") {
                    None
                } else {
                    Some("2021.12.17".to_string())
                }
            });

        let candidates = ["youtube-dlc", "yt-dlp", "youtube-dl"].map(String::from);
        let found = first_working(&locator, &candidates, &["--version".to_string()])
            .await
            .unwrap();
        assert_eq!(found.binary, "youtube-dl");
        assert_eq!(found.path, PathBuf::from("/bin/youtube-dl"));
        assert_eq!(found.version, "2021.12.17");
    }

    #[tokio::test]
    async fn test_first_working_none() {
        let mut locator = MockExecutableLocator::new();
        locator.expect_locate().returning(|_| None);
        let candidates = vec!["yt-dlp".to_string()];
        assert!(first_working(&locator, &candidates, &[]).await.is_none());
    }

    #[test]
    fn test_system_locator_rejects_missing_binary() {
        assert!(SystemLocator.locate("definitely-not-a-real-tool-7f3a").is_none());
    }
}
