//! Process registry and the operations built on it.
//!
//! Every invocation is tracked under an identifier (an item URL, an output
//! path, or [`UPDATE_ID`]). At most one process runs per identifier; a second
//! request while one is live is logged and ignored. A driver task feeds each
//! output line to the caller's callback, settles the [`Completion`], and
//! removes the registry entry on every exit path.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ToolsConfig;
use crate::error::{MediaFetchError, Result};
use crate::item::{DownloadOptions, DownloadableItem, ParsedItem};
use crate::parse::{parse_item, parse_line, ProgressEvent};
use crate::process::{KillSwitch, ProcessEvent, ProcessSpawner, TokioSpawner};
use crate::tools::{
    downloader, first_working, transcoder, Executable, ExecutableLocator, SystemLocator, Tool,
    ToolCommand, ToolVersion, UPDATE_ID,
};

type Registry = Arc<Mutex<HashMap<String, KillSwitch>>>;

/// Outcome of asking for a new invocation
#[must_use]
pub enum Invocation {
    Running(Completion),
    /// Another process with the same identifier is still live; nothing was
    /// spawned
    AlreadyRunning,
}

impl Invocation {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running(_))
    }

    pub fn completion(self) -> Option<Completion> {
        match self {
            Self::Running(completion) => Some(completion),
            Self::AlreadyRunning => None,
        }
    }
}

/// Settles once the process has terminated and its registry entry is gone
pub struct Completion {
    id: String,
    task: JoinHandle<Result<()>>,
}

impl Completion {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn wait(self) -> Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(MediaFetchError::ProcessAborted {
                id: self.id,
                reason: e.to_string(),
            }),
        }
    }
}

/// Removes one registry entry when dropped
struct RegistryGuard {
    registry: Registry,
    id: String,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        let mut running = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        running.remove(&self.id);
        debug!("Released {}", self.id);
    }
}

pub struct Orchestrator {
    tools: ToolsConfig,
    locator: Arc<dyn ExecutableLocator>,
    spawner: Arc<dyn ProcessSpawner>,
    registry: Registry,
}

impl Orchestrator {
    pub fn new(
        tools: ToolsConfig,
        locator: Arc<dyn ExecutableLocator>,
        spawner: Arc<dyn ProcessSpawner>,
    ) -> Self {
        Self {
            tools,
            locator,
            spawner,
            registry: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Orchestrator using the system `PATH` and real child processes
    pub fn system(tools: ToolsConfig) -> Self {
        Self::new(tools, Arc::new(SystemLocator), Arc::new(TokioSpawner))
    }

    pub fn work_dir(&self) -> &Path {
        &self.tools.work_dir
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Identifiers with a live process
    pub fn running(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Fetch metadata for `url`, reporting each full item.
    pub fn fetch_info<F>(&self, url: &str, work_dir: &Path, mut on_item: F) -> Result<Invocation>
    where
        F: FnMut(DownloadableItem) + Send + 'static,
    {
        self.call(url, downloader::info(url), work_dir, move |line| {
            if let Some(ParsedItem::Full(item)) = parse_item(&line) {
                on_item(*item);
            }
        })
    }

    /// Download one item, reporting a [`ProgressEvent`] for every output line.
    pub fn download<F>(
        &self,
        item: &DownloadableItem,
        options: &DownloadOptions,
        work_dir: &Path,
        mut on_progress: F,
    ) -> Result<Invocation>
    where
        F: FnMut(ProgressEvent) + Send + 'static,
    {
        let transcoder = if options.compatibility_mode {
            self.locate(Tool::Transcoder).ok().map(|exe| exe.path)
        } else {
            None
        };
        let command = downloader::download(item, options, transcoder.as_deref());

        self.call(item.url(), command, work_dir, move |line| {
            on_progress(parse_line(&line));
        })
    }

    /// Run the downloader's self-update, forwarding its output verbatim.
    pub fn update_tool<F>(&self, work_dir: &Path, on_message: F) -> Result<Invocation>
    where
        F: FnMut(String) + Send + 'static,
    {
        self.call(UPDATE_ID, downloader::update(), work_dir, on_message)
    }

    /// Ask the process registered under `id` to terminate. Its entry is
    /// released once it actually exits.
    pub fn pause(&self, id: &str) {
        let Some(switch) = self.lock().get(id).cloned() else {
            debug!("Nothing running under {}", id);
            return;
        };

        match switch.kill() {
            Ok(()) => info!("Requested termination of {}", id),
            Err(e) => warn!("Could not terminate {}: {}", id, e),
        }
    }

    /// First configured downloader that answers `--version`
    pub async fn probe_version(&self) -> Option<ToolVersion> {
        first_working(
            self.locator.as_ref(),
            &self.tools.downloader_candidates,
            &downloader::version().into_args(),
        )
        .await
    }

    pub async fn probe_transcoder(&self) -> Option<ToolVersion> {
        first_working(
            self.locator.as_ref(),
            std::slice::from_ref(&self.tools.transcoder),
            &transcoder::version().into_args(),
        )
        .await
    }

    /// Resolve the direct media URL of one format. `None` when the same
    /// resolution is already in flight.
    pub async fn resolve_stream_url(
        &self,
        url: &str,
        format: &str,
        work_dir: &Path,
    ) -> Result<Option<String>> {
        let id = format!("{}#{}", url, format);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let invocation = self.call(&id, downloader::stream_url(format, url), work_dir, move |line| {
            let _ = tx.send(line);
        })?;

        let Some(completion) = invocation.completion() else {
            return Ok(None);
        };
        completion.wait().await?;

        while let Some(line) = rx.recv().await {
            let line = line.trim();
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
        Err(MediaFetchError::StreamUrl(id))
    }

    /// Resolve video and audio streams concurrently, then mux them into
    /// `output` with the transcoder.
    pub async fn merge_streams(
        &self,
        url: &str,
        video_format: &str,
        audio_format: &str,
        output: &Path,
        work_dir: &Path,
    ) -> Result<Invocation> {
        let executable = self.locate(Tool::Transcoder)?;

        // Both legs would register under the same id
        let (video, audio) = if video_format == audio_format {
            let stream = self.resolve_stream_url(url, video_format, work_dir).await?;
            (stream.clone(), stream)
        } else {
            tokio::try_join!(
                self.resolve_stream_url(url, video_format, work_dir),
                self.resolve_stream_url(url, audio_format, work_dir),
            )?
        };
        let (Some(video), Some(audio)) = (video, audio) else {
            warn!("Stream resolution for {} is still running", url);
            return Ok(Invocation::AlreadyRunning);
        };

        let id = output.to_string_lossy().to_string();
        let command = transcoder::merge(&video, &audio, output);
        self.spawn_tracked(&id, &executable, command, work_dir, log_line(id.clone()))
    }

    /// Convert a downloaded video into a GIF next to it.
    pub fn convert_to_gif(&self, input: &Path, output: &Path, work_dir: &Path) -> Result<Invocation> {
        let id = output.to_string_lossy().to_string();
        let callback = log_line(id.clone());
        self.call(&id, transcoder::gif(input, output), work_dir, callback)
    }

    fn locate(&self, tool: Tool) -> Result<Executable> {
        let found = match tool {
            Tool::Downloader => self
                .tools
                .downloader_candidates
                .iter()
                .find_map(|name| self.locator.locate(name)),
            Tool::Transcoder => self.locator.locate(&self.tools.transcoder),
        };
        found.ok_or_else(|| MediaFetchError::ToolUnavailable(tool.to_string()))
    }

    fn call<F>(&self, id: &str, command: ToolCommand, work_dir: &Path, on_line: F) -> Result<Invocation>
    where
        F: FnMut(String) + Send + 'static,
    {
        let executable = self.locate(command.tool)?;
        self.spawn_tracked(id, &executable, command, work_dir, on_line)
    }

    fn spawn_tracked<F>(
        &self,
        id: &str,
        executable: &Executable,
        command: ToolCommand,
        work_dir: &Path,
        on_line: F,
    ) -> Result<Invocation>
    where
        F: FnMut(String) + Send + 'static,
    {
        // Check, spawn and insert under one lock
        let mut running = self.lock();
        if running.contains_key(id) {
            warn!("Process with id {} is still running", id);
            return Ok(Invocation::AlreadyRunning);
        }

        info!("{}: {} {:?}", command.description, executable.path.display(), command.args);
        let handle = self
            .spawner
            .spawn(&executable.path, &command.args, work_dir)
            .map_err(|e| MediaFetchError::Spawn {
                id: id.to_string(),
                reason: e.to_string(),
            })?;
        running.insert(id.to_string(), handle.kill_switch.clone());
        drop(running);

        let guard = RegistryGuard {
            registry: Arc::clone(&self.registry),
            id: id.to_string(),
        };
        let task = tokio::spawn(drive(id.to_string(), handle.events, on_line, guard));

        Ok(Invocation::Running(Completion {
            id: id.to_string(),
            task,
        }))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, KillSwitch>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_line(id: String) -> impl FnMut(String) + Send + 'static {
    move |line| debug!("{}: {}", id, line)
}

/// Deliver output in order until the process terminates. The guard is
/// dropped before the returned future completes.
async fn drive<F>(
    id: String,
    mut events: UnboundedReceiver<ProcessEvent>,
    mut on_line: F,
    guard: RegistryGuard,
) -> Result<()>
where
    F: FnMut(String),
{
    let _guard = guard;

    while let Some(event) = events.recv().await {
        match event {
            ProcessEvent::Stdout(line) => {
                debug!("{}: {}", id, line);
                on_line(line);
            }
            ProcessEvent::Stderr(line) => debug!("{} stderr: {}", id, line),
            ProcessEvent::Exit(None) | ProcessEvent::Exit(Some(0)) => {
                info!("{} finished", id);
                return Ok(());
            }
            ProcessEvent::Exit(Some(code)) => {
                warn!("{} exited with code {}", id, code);
                return Err(MediaFetchError::ProcessFailed { id, code });
            }
            ProcessEvent::Error(reason) => {
                warn!("{} failed: {}", id, reason);
                return Err(MediaFetchError::ProcessAborted { id, reason });
            }
        }
    }

    Err(MediaFetchError::ProcessAborted {
        id,
        reason: "output ended without an exit status".to_string(),
    })
}
