//! Preview playback
//!
//! Plays at most one short remote clip at a time. The rodio output stream is
//! not Send, so a dedicated thread owns it and takes commands over a
//! channel; the "is playing" signal is published through a watch channel.
//! Every failure path (empty URL, fetch error, decode error, device error)
//! collapses to "not playing" with a log line; no structured error goes up.

use anyhow::Context;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use std::io::Cursor;
use std::sync::mpsc as std_mpsc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

enum PlayerCommand {
    Play(Vec<u8>),
    Stop,
}

/// Handle to the playback thread
#[derive(Clone)]
pub struct PreviewPlayer {
    cmd_tx: std_mpsc::Sender<PlayerCommand>,
    playing_rx: watch::Receiver<bool>,
    http_client: reqwest::Client,
}

impl PreviewPlayer {
    /// Spawn the playback thread
    pub fn spawn() -> anyhow::Result<Self> {
        let (cmd_tx, cmd_rx) = std_mpsc::channel();
        let (playing_tx, playing_rx) = watch::channel(false);

        std::thread::Builder::new()
            .name("preview-player".to_string())
            .spawn(move || player_thread(cmd_rx, playing_tx))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build preview http client")?;

        Ok(Self {
            cmd_tx,
            playing_rx,
            http_client,
        })
    }

    /// Fetch and play a preview clip, stopping any current playback first
    pub async fn play(&self, url: &str) {
        // Halt the current clip before the fetch, not after it
        let _ = self.cmd_tx.send(PlayerCommand::Stop);

        if url.trim().is_empty() {
            warn!("Preview URL is empty, nothing to play");
            return;
        }

        let bytes = match self.fetch(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to fetch preview {}: {}", url, e);
                return;
            }
        };

        debug!(url = %url, bytes = bytes.len(), "Starting preview playback");
        let _ = self.cmd_tx.send(PlayerCommand::Play(bytes));
    }

    /// Stop playback; idempotent and safe when nothing is playing
    pub fn stop(&self) {
        let _ = self.cmd_tx.send(PlayerCommand::Stop);
    }

    /// Current playback signal
    pub fn is_playing(&self) -> bool {
        *self.playing_rx.borrow()
    }

    /// Subscribe to the playback signal
    pub fn observe_playing(&self) -> watch::Receiver<bool> {
        self.playing_rx.clone()
    }

    async fn fetch(&self, url: &str) -> anyhow::Result<Vec<u8>> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .context("request failed")?
            .error_for_status()
            .context("non-success status")?;
        let bytes = response.bytes().await.context("body read failed")?;
        Ok(bytes.to_vec())
    }
}

struct Output {
    stream: OutputStream,
    sink: Sink,
}

fn player_thread(cmd_rx: std_mpsc::Receiver<PlayerCommand>, playing_tx: watch::Sender<bool>) {
    let mut output: Option<Output> = None;

    loop {
        match cmd_rx.recv_timeout(Duration::from_millis(200)) {
            Ok(PlayerCommand::Play(bytes)) => {
                match start_playback(&mut output, bytes) {
                    Ok(()) => {
                        playing_tx.send_replace(true);
                    }
                    Err(e) => {
                        warn!("Preview playback failed: {:#}", e);
                        if let Some(out) = &output {
                            out.sink.stop();
                        }
                        playing_tx.send_replace(false);
                    }
                }
            }
            Ok(PlayerCommand::Stop) => {
                if let Some(out) = &output {
                    out.sink.stop();
                }
                playing_tx.send_replace(false);
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                // Auto-reset the signal when the clip runs out
                if *playing_tx.borrow() {
                    if let Some(out) = &output {
                        if out.sink.empty() {
                            playing_tx.send_replace(false);
                        }
                    }
                }
            }
            Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn start_playback(output: &mut Option<Output>, bytes: Vec<u8>) -> anyhow::Result<()> {
    if output.is_none() {
        // Device is opened lazily on the first play
        let mut stream = OutputStreamBuilder::from_default_device()
            .context("failed to open default output device")?
            .with_error_callback(|_| {})
            .open_stream_or_fallback()
            .context("failed to start output stream")?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());
        *output = Some(Output { stream, sink });
    }

    let Some(out) = output.as_mut() else {
        anyhow::bail!("output stream unavailable");
    };

    // At most one active playback: replace the sink
    out.sink.stop();
    out.sink = Sink::connect_new(out.stream.mixer());

    let source = Decoder::new(Cursor::new(bytes)).context("failed to decode preview")?;
    out.sink.append(source);

    Ok(())
}
