//! # Pipeline Worker
//!
//! Dedicated thread that owns the [`QuantumPipeline`] and, while capturing,
//! the CPAL stream. The GUI talks to it through two crossbeam channels:
//! commands in, status reports out. Spectra reach the GUI through the
//! pipeline's [`SpectrumHandle`], not through the channels.

use crossbeam_channel::{Receiver, Sender};
use cpal::traits::StreamTrait;
use log::{debug, error, info, trace, warn};
use spectrum_core::{
    audio::{self, CaptureEvent},
    PipelineConfig, QuantumOutcome, QuantumPipeline, SpectrumHandle, Waveform,
};
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

/// Sample rate used for synthetic input before any device has reported one.
const DEFAULT_SAMPLE_RATE: f32 = 48_000.0;

/// Quanta buffered between the audio callback and the worker.
const CAPTURE_QUEUE_DEPTH: usize = 8;

/// Requests from the GUI thread.
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    StartCapture,
    StopCapture,
    /// Run a generated wave through the pipeline.
    Synthetic {
        waveform: Waveform,
        frequency_hz: f32,
        sample_count: usize,
    },
    Shutdown,
}

/// Reports back to the GUI thread.
#[derive(Debug, Clone)]
pub enum WorkerStatus {
    CaptureStarted { sample_rate: u32 },
    CaptureStopped,
    /// Capture failed to start or the device went away.
    CaptureFailed(String),
    SyntheticDone(QuantumOutcome),
    /// The synthetic run unwound; the worker is still alive.
    SyntheticFailed(String),
}

/// Handle to the running worker thread.
#[derive(Debug)]
pub struct PipelineWorker {
    command_tx: Sender<WorkerCommand>,
    status_rx: Receiver<WorkerStatus>,
    thread_handle: Option<JoinHandle<()>>,
}

impl PipelineWorker {
    /// Spawns the worker with a pipeline built from `config`.
    ///
    /// Returns the worker and the handle the display side reads from.
    pub fn spawn(config: PipelineConfig) -> anyhow::Result<(Self, SpectrumHandle)> {
        let pipeline = QuantumPipeline::new(config)?;
        let handle = pipeline.handle();
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (status_tx, status_rx) = crossbeam_channel::unbounded();

        let thread_handle = thread::Builder::new()
            .name("pipeline-worker".into())
            .spawn(move || run_worker(pipeline, command_rx, status_tx))?;

        Ok((
            Self {
                command_tx,
                status_rx,
                thread_handle: Some(thread_handle),
            },
            handle,
        ))
    }

    pub fn send(&self, command: WorkerCommand) {
        if self.command_tx.send(command).is_err() {
            warn!("[MAIN] Pipeline worker is gone, command ignored");
        }
    }

    /// Drains every status report received since the last call.
    pub fn poll_status(&self) -> Vec<WorkerStatus> {
        self.status_rx.try_iter().collect()
    }
}

impl Drop for PipelineWorker {
    fn drop(&mut self) {
        let _ = self.command_tx.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                error!("[MAIN] Pipeline worker panicked during shutdown");
            }
        }
    }
}

fn run_worker(
    mut pipeline: QuantumPipeline,
    command_rx: Receiver<WorkerCommand>,
    status_tx: Sender<WorkerStatus>,
) {
    info!("[AUDIO-THREAD] Pipeline worker started");
    let (capture_tx, capture_rx) = crossbeam_channel::bounded::<CaptureEvent>(CAPTURE_QUEUE_DEPTH);
    let mut stream: Option<cpal::Stream> = None;
    let mut sample_rate = DEFAULT_SAMPLE_RATE;
    let samples_per_quantum = pipeline.config().desired_samples_per_quantum;

    loop {
        crossbeam_channel::select! {
            recv(capture_rx) -> msg => match msg {
                Ok(CaptureEvent::Quantum(quantum)) => {
                    sample_rate = quantum.sample_rate;
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        pipeline.on_quantum(&quantum.bytes, quantum.sample_rate)
                    }));
                    match outcome {
                        Ok(outcome) => trace!("[AUDIO-THREAD] Quantum outcome: {:?}", outcome),
                        Err(_) => error!("[AUDIO-THREAD] Quantum processing panicked, quantum dropped"),
                    }
                }
                Ok(CaptureEvent::DeviceLost(e)) => {
                    warn!("[AUDIO-THREAD] {}; keeping the last spectrum on screen", e);
                    stop_stream(&mut stream);
                    let _ = status_tx.send(WorkerStatus::CaptureFailed(e.to_string()));
                }
                Err(_) => {
                    error!("[AUDIO-THREAD] Capture channel closed");
                    break;
                }
            },
            recv(command_rx) -> msg => match msg {
                Ok(WorkerCommand::StartCapture) => {
                    if stream.is_some() {
                        debug!("[AUDIO-THREAD] Capture already running");
                        continue;
                    }
                    match audio::start_audio_capture(capture_tx.clone(), samples_per_quantum) {
                        Ok((new_stream, rate)) => {
                            info!("[AUDIO-THREAD] Audio capture started at {} Hz", rate);
                            stream = Some(new_stream);
                            let _ = status_tx.send(WorkerStatus::CaptureStarted { sample_rate: rate });
                        }
                        Err(e) => {
                            error!("[AUDIO-THREAD] Error starting audio: {:#}", e);
                            let _ = status_tx.send(WorkerStatus::CaptureFailed(e.to_string()));
                        }
                    }
                }
                Ok(WorkerCommand::StopCapture) => {
                    stop_stream(&mut stream);
                    let _ = status_tx.send(WorkerStatus::CaptureStopped);
                }
                Ok(WorkerCommand::Synthetic { waveform, frequency_hz, sample_count }) => {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                        pipeline.on_synthetic_waveform(waveform, frequency_hz, sample_count, sample_rate)
                    }));
                    let status = match outcome {
                        Ok(outcome) => WorkerStatus::SyntheticDone(outcome),
                        Err(_) => {
                            error!(
                                "[AUDIO-THREAD] Synthetic {:?} quantum of {} samples panicked",
                                waveform, sample_count
                            );
                            WorkerStatus::SyntheticFailed(format!("{} samples could not be processed", sample_count))
                        }
                    };
                    let _ = status_tx.send(status);
                }
                Ok(WorkerCommand::Shutdown) | Err(_) => {
                    info!("[AUDIO-THREAD] Received shutdown signal");
                    break;
                }
            },
        }
    }

    stop_stream(&mut stream);
    info!("[AUDIO-THREAD] Pipeline worker finished");
}

fn stop_stream(stream: &mut Option<cpal::Stream>) {
    if let Some(stream) = stream.take() {
        info!("[AUDIO-THREAD] Stopping stream...");
        if let Err(e) = stream.pause() {
            warn!("[AUDIO-THREAD] Error pausing stream: {}", e);
        }
    }
}
