//! # Spectrum Tuner - Real-time Spectrum GUI
//!
//! Main GUI application: captures live audio, shows its log-scaled spectrum,
//! and lets the user push synthetic test waves through the same pipeline.
//!
//! ## Architecture
//! - **Main Thread**: Iced GUI application with dark theme
//! - **Worker Thread**: owns the pipeline and the audio stream
//! - **Communication**: crossbeam channels for commands and status, the
//!   pipeline's spectrum handle for the published spectrum
//! - **Updates**: 100 ms timer pulls the current display series

mod ui;
mod worker;

use anyhow::Context;
use iced::{self, Element, Subscription, Theme};
use log::{error, info, warn};
use spectrum_core::{
    AppConfig, DisplayGeometry, DisplayPoint, QuantumOutcome, SpectrumHandle, Waveform,
    MIN_SAMPLES_PER_QUANTUM,
};
use std::fs;
use std::path::Path;
use std::time::Duration;
use ui::main_display::create_main_view;
use worker::{PipelineWorker, WorkerCommand, WorkerStatus};

/// Optional JSON config read from the working directory.
const CONFIG_PATH: &str = "spectrum_config.json";

/// How often the display pulls the published spectrum.
const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// Main entry point.
pub fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("[MAIN] Starting spectrum tuner...");
    let result = iced::application("Spectrum Tuner", SpectrumApp::update, SpectrumApp::view)
        .subscription(SpectrumApp::subscription)
        .theme(SpectrumApp::theme)
        .run();
    info!("[MAIN] Application finished with result: {:?}", result);
    result
}

/// Application message types.
#[derive(Debug, Clone)]
pub enum Message {
    ToggleCapture,
    // Test FFT form
    FrequencyChanged(String),
    SamplesChanged(String),
    SquareWaveToggled(bool),
    TestFft,
    // Timer tick for the display refresh
    Tick,
}

/// Everything the view needs to render one frame.
#[derive(Debug, Clone)]
pub struct AppDisplayData {
    pub worker_active: bool,
    pub capturing: bool,
    pub status: String,
    pub sample_rate: Option<f32>,
    pub window_len: usize,
    pub geometry: DisplayGeometry,
    pub series: Vec<DisplayPoint>,
    pub frequency_input: String,
    pub samples_input: String,
    pub square_wave: bool,
}

struct SpectrumApp {
    worker: Option<PipelineWorker>,
    spectrum: SpectrumHandle,
    last_sequence: u64,
    /// Largest sample count the test form accepts.
    max_test_samples: usize,
    display_data: AppDisplayData,
}

impl Default for SpectrumApp {
    fn default() -> Self {
        let config = match load_config(CONFIG_PATH) {
            Ok(config) => config,
            Err(e) => {
                warn!("[MAIN] Falling back to default config: {:#}", e);
                AppConfig::default()
            }
        };

        let (worker, spectrum) = match PipelineWorker::spawn(config.pipeline.clone()) {
            Ok((worker, handle)) => (Some(worker), handle),
            Err(e) => {
                error!("[MAIN] Could not start the pipeline worker: {:#}", e);
                (None, SpectrumHandle::new())
            }
        };

        let status = if worker.is_some() {
            "Press Start to capture, or run a test wave".to_string()
        } else {
            "Pipeline unavailable".to_string()
        };

        Self {
            display_data: AppDisplayData {
                worker_active: worker.is_some(),
                capturing: false,
                status,
                sample_rate: None,
                window_len: 0,
                geometry: config.display,
                series: Vec::new(),
                frequency_input: "440".to_string(),
                samples_input: config.pipeline.desired_samples_per_quantum.to_string(),
                square_wave: false,
            },
            worker,
            spectrum,
            last_sequence: 0,
            max_test_samples: config.pipeline.max_samples_per_quantum,
        }
    }
}

impl SpectrumApp {
    fn update(&mut self, message: Message) {
        match message {
            Message::ToggleCapture => {
                let command = if self.display_data.capturing {
                    WorkerCommand::StopCapture
                } else {
                    WorkerCommand::StartCapture
                };
                self.send(command);
            }
            Message::FrequencyChanged(value) => self.display_data.frequency_input = value,
            Message::SamplesChanged(value) => self.display_data.samples_input = value,
            Message::SquareWaveToggled(checked) => self.display_data.square_wave = checked,
            Message::TestFft => self.request_test_wave(),
            Message::Tick => {
                self.process_worker_status();
                self.refresh_series();
            }
        }
    }

    fn send(&self, command: WorkerCommand) {
        match &self.worker {
            Some(worker) => worker.send(command),
            None => warn!("[MAIN] No pipeline worker, ignoring {:?}", command),
        }
    }

    fn request_test_wave(&mut self) {
        match parse_test_wave(
            &self.display_data.frequency_input,
            &self.display_data.samples_input,
            self.max_test_samples,
        ) {
            Ok((frequency_hz, sample_count)) => {
                let waveform = if self.display_data.square_wave {
                    Waveform::Square
                } else {
                    Waveform::Sine
                };
                self.send(WorkerCommand::Synthetic {
                    waveform,
                    frequency_hz,
                    sample_count,
                });
            }
            Err(reason) => self.display_data.status = reason,
        }
    }

    fn process_worker_status(&mut self) {
        let Some(worker) = &self.worker else { return };
        for status in worker.poll_status() {
            match status {
                WorkerStatus::CaptureStarted { sample_rate } => {
                    self.display_data.capturing = true;
                    self.display_data.status = format!("Capturing at {} Hz", sample_rate);
                }
                WorkerStatus::CaptureStopped => {
                    self.display_data.capturing = false;
                    self.display_data.status = "Capture stopped".to_string();
                }
                WorkerStatus::CaptureFailed(reason) => {
                    self.display_data.capturing = false;
                    self.display_data.status = format!("Capture unavailable: {}", reason);
                }
                WorkerStatus::SyntheticDone(outcome) => {
                    self.display_data.status = match outcome {
                        QuantumOutcome::Published { bins, log2_len } => {
                            format!("Test wave: {} bins from a {}-point window", bins, 1usize << log2_len)
                        }
                        QuantumOutcome::NotReady => "Test wave dropped, display was busy".to_string(),
                        other => format!("Test wave not shown: {:?}", other),
                    };
                }
                WorkerStatus::SyntheticFailed(reason) => {
                    self.display_data.status = format!("Test wave failed: {}", reason);
                }
            }
        }
    }

    /// Pulls the published spectrum and rebuilds the series when it changed.
    fn refresh_series(&mut self) {
        let read = self.spectrum.begin_read();
        if read.sequence == self.last_sequence {
            return;
        }
        self.last_sequence = read.sequence;
        self.display_data.series = read.display_series(&self.display_data.geometry);
        self.display_data.sample_rate = Some(read.sample_rate);
        self.display_data.window_len = 1usize << read.log2_len;
    }

    fn view(&self) -> Element<'_, Message> {
        create_main_view(&self.display_data)
    }

    fn subscription(&self) -> Subscription<Message> {
        iced::time::every(REFRESH_INTERVAL).map(|_| Message::Tick)
    }

    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Reads the test form into a frequency and a sample count.
///
/// The count must give at least one bin and stay within the pipeline's
/// ceiling; the error is the status line to show.
fn parse_test_wave(frequency: &str, samples: &str, max_samples: usize) -> Result<(f32, usize), String> {
    let frequency_hz = frequency
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|hz| hz.is_finite())
        .ok_or_else(|| "Test wave needs a frequency in Hz".to_string())?;
    let sample_count = samples
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|count| (MIN_SAMPLES_PER_QUANTUM..=max_samples).contains(count))
        .ok_or_else(|| {
            format!(
                "Test wave needs between {} and {} samples",
                MIN_SAMPLES_PER_QUANTUM, max_samples
            )
        })?;
    Ok((frequency_hz, sample_count))
}

/// Loads the app config, or the defaults when the file does not exist.
fn load_config(path: &str) -> anyhow::Result<AppConfig> {
    if !Path::new(path).exists() {
        info!("[MAIN] No {} found, using defaults", path);
        return Ok(AppConfig::default());
    }

    let data = fs::read_to_string(path).with_context(|| format!("Reading {}", path))?;
    let config: AppConfig =
        serde_json::from_str(&data).with_context(|| format!("Parsing {}", path))?;
    config.pipeline.validate()?;
    info!("[MAIN] Loaded config from {}", path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wave_form_accepts_counts_within_the_ceiling() {
        assert_eq!(parse_test_wave(" 440 ", "4096", 10_000), Ok((440.0, 4096)));
        assert_eq!(parse_test_wave("440", "2", 10_000), Ok((440.0, 2)));
        assert_eq!(parse_test_wave("440", "10000", 10_000), Ok((440.0, 10_000)));
    }

    #[test]
    fn test_wave_form_rejects_bad_counts() {
        assert!(parse_test_wave("440", "0", 10_000).is_err());
        assert!(parse_test_wave("440", "1", 10_000).is_err());
        assert!(parse_test_wave("440", "10001", 10_000).is_err());
        assert!(parse_test_wave("440", "18446744073709551615", 10_000).is_err());
        assert!(parse_test_wave("440", "many", 10_000).is_err());
    }

    #[test]
    fn test_wave_form_rejects_bad_frequencies() {
        assert!(parse_test_wave("inf", "4096", 10_000).is_err());
        assert!(parse_test_wave("NaN", "4096", 10_000).is_err());
        assert!(parse_test_wave("", "4096", 10_000).is_err());
    }
}
