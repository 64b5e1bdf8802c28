//! Cloud recognizer: cpal capture + HTTP identify
//!
//! Records a capture window from the default input device on a dedicated
//! thread (cpal streams are not Send), reporting RMS volume per received
//! buffer, then WAV-encodes the window and posts it to the configured
//! identify endpoint. The raw response body is handed to the session
//! verbatim as the recognizer payload.

use super::{Recognizer, RecognizerListener, RecognizerUpdate};
use crate::config::RecognizerConfig;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat};
use std::sync::mpsc as std_mpsc;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const USER_AGENT: &str = "ritmo/0.1.0 (https://github.com/ritmo/ritmo)";

/// Identify client errors
#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),
}

/// HTTP client for the identify endpoint
#[derive(Clone)]
pub struct IdentifyClient {
    http_client: reqwest::Client,
    endpoint: String,
    access_key: String,
}

impl IdentifyClient {
    pub fn new(endpoint: String, access_key: String) -> Result<Self, IdentifyError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IdentifyError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint,
            access_key,
        })
    }

    /// Submit one WAV-encoded capture window, returning the raw response body
    pub async fn identify(&self, wav: Vec<u8>, sample_rate: u32) -> Result<String, IdentifyError> {
        let sample_rate = sample_rate.to_string();
        let audio = BASE64.encode(&wav);
        let params = [
            ("access_key", self.access_key.as_str()),
            ("sample_rate", sample_rate.as_str()),
            ("channels", "1"),
            ("format", "wav"),
            ("audio", audio.as_str()),
        ];

        debug!(bytes = wav.len(), "Submitting capture window for identification");

        let response = self
            .http_client
            .post(&self.endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| IdentifyError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(IdentifyError::ApiError(status.as_u16(), error_text));
        }

        response
            .text()
            .await
            .map_err(|e| IdentifyError::NetworkError(e.to_string()))
    }
}

/// Production recognizer: default input device + cloud identify endpoint
pub struct CloudRecognizer {
    client: IdentifyClient,
    capture_window: Duration,
    runtime: tokio::runtime::Handle,
    cancel: Mutex<Option<CancellationToken>>,
}

impl CloudRecognizer {
    /// Create a recognizer from config; must be called inside the runtime
    pub fn new(config: &RecognizerConfig) -> Result<Self, IdentifyError> {
        Ok(Self {
            client: IdentifyClient::new(config.endpoint.clone(), config.access_key.clone())?,
            capture_window: Duration::from_secs(config.capture_seconds),
            runtime: tokio::runtime::Handle::current(),
            cancel: Mutex::new(None),
        })
    }
}

impl Recognizer for CloudRecognizer {
    fn start_capture(&self, listener: RecognizerListener) -> bool {
        let host = cpal::default_host();
        let device = match host.default_input_device() {
            Some(device) => device,
            None => {
                warn!("No input device available, rejecting capture request");
                return false;
            }
        };

        let token = CancellationToken::new();
        match self.cancel.lock() {
            Ok(mut guard) => *guard = Some(token.clone()),
            Err(_) => return false,
        }

        let client = self.client.clone();
        let runtime = self.runtime.clone();
        let window = self.capture_window;

        std::thread::spawn(move || {
            let captured = match capture_window(&device, window, &token, &listener) {
                Ok(captured) => captured,
                Err(e) => {
                    warn!("Audio capture failed: {}", e);
                    let _ = listener.send(RecognizerUpdate::Result(None));
                    return;
                }
            };

            if token.is_cancelled() {
                debug!("Capture cancelled, suppressing result callback");
                return;
            }

            let wav = match encode_wav(&captured.samples, captured.sample_rate) {
                Ok(wav) => wav,
                Err(e) => {
                    warn!("WAV encoding failed: {}", e);
                    let _ = listener.send(RecognizerUpdate::Result(None));
                    return;
                }
            };

            runtime.spawn(async move {
                match client.identify(wav, captured.sample_rate).await {
                    Ok(body) => {
                        info!("Identify request completed");
                        let _ = listener.send(RecognizerUpdate::Result(Some(body)));
                    }
                    Err(e) => {
                        warn!("Identify request failed: {}", e);
                        let _ = listener.send(RecognizerUpdate::Result(None));
                    }
                }
            });
        });

        true
    }

    fn cancel(&self) {
        if let Ok(mut guard) = self.cancel.lock() {
            if let Some(token) = guard.take() {
                token.cancel();
            }
        }
    }
}

struct CapturedWindow {
    /// Mono samples, -1.0..1.0
    samples: Vec<f32>,
    sample_rate: u32,
}

/// Record one capture window, reporting RMS volume per received buffer
fn capture_window(
    device: &Device,
    window: Duration,
    token: &CancellationToken,
    listener: &RecognizerListener,
) -> anyhow::Result<CapturedWindow> {
    let supported = device.default_input_config()?;
    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;
    let sample_format = supported.sample_format();
    let config = supported.into();

    let (chunk_tx, chunk_rx) = std_mpsc::channel::<Vec<f32>>();
    let err_fn = |err| warn!("Capture stream error: {}", err);

    let stream = match sample_format {
        SampleFormat::F32 => {
            let tx = chunk_tx.clone();
            device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(data.to_vec());
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::I16 => {
            let tx = chunk_tx.clone();
            device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(data.iter().map(|s| f32::from(*s) / 32768.0).collect());
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::U16 => {
            let tx = chunk_tx.clone();
            device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    let _ = tx.send(
                        data.iter()
                            .map(|s| (f32::from(*s) - 32768.0) / 32768.0)
                            .collect(),
                    );
                },
                err_fn,
                None,
            )?
        }
        other => anyhow::bail!("Unsupported input sample format: {:?}", other),
    };
    drop(chunk_tx);

    stream.play()?;
    debug!(sample_rate, channels, "Capture started");

    let deadline = Instant::now() + window;
    let mut interleaved: Vec<f32> = Vec::new();

    while Instant::now() < deadline {
        if token.is_cancelled() {
            return Ok(CapturedWindow {
                samples: Vec::new(),
                sample_rate,
            });
        }

        match chunk_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(chunk) => {
                if !chunk.is_empty() {
                    let rms = (chunk.iter().map(|s| s * s).sum::<f32>()
                        / chunk.len() as f32)
                        .sqrt();
                    let _ = listener.send(RecognizerUpdate::Volume(f64::from(rms)));
                }
                interleaved.extend_from_slice(&chunk);
            }
            Err(std_mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    drop(stream);

    // Downmix to mono
    let samples = if channels > 1 {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    } else {
        interleaved
    };

    Ok(CapturedWindow {
        samples,
        sample_rate,
    })
}

/// Encode mono f32 samples as 16-bit PCM WAV in memory
fn encode_wav(samples: &[f32], sample_rate: u32) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
            writer.write_sample(value)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}
