use crate::{
    AppCommand, AppResult,
    app_command::HELP,
    config::Config,
    display::{SPARKLINE_WIDTH, meter_line, recording_line, sparkline},
};

use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use tapedeck_core::{
    AudioOutput, CpalInput, FsDurableStore, PipelineState, Recorder, RecordingStore, SoundSink,
    StopOutcome, TarGzArchive, input_device_names, output_device_names,
};
use tokio::{
    sync::mpsc,
    time::{MissedTickBehavior, interval},
};
use tracing::{error, info, instrument, warn};

/// Pipeline poll rate while monitoring or recording (~60 Hz).
const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Minimum time between printed meter lines.
const METER_PRINT_INTERVAL: Duration = Duration::from_millis(250);

enum Flow {
    Continue,
    Quit,
}

/// Main application state.
///
/// Owns the pipeline and the output stream, neither of which is `Send`, so
/// it runs on the main task.
pub struct App {
    recorder: Recorder<CpalInput, FsDurableStore>,
    output: Option<AudioOutput>,
    config: Config,
    export_dir: PathBuf,
    command_rx: mpsc::Receiver<AppCommand>,
    last_meter: Instant,
}

impl App {
    /// Build the pipeline from `config`, opening the durable store.
    pub(crate) async fn new(config: Config, command_rx: mpsc::Receiver<AppCommand>) -> Self {
        let store = open_store(&config).await;

        let recorder = Recorder::new(
            CpalInput,
            PipelineState::new(config.audio.selected_device.clone(), config.audio.gain),
            store,
            config.meter,
            config.metronome.settings(),
        );

        let export_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        Self {
            recorder,
            output: None,
            config,
            export_dir,
            command_rx,
            last_meter: Instant::now(),
        }
    }

    /// Run the main application event loop.
    #[instrument(skip(self))]
    pub(crate) async fn run(mut self) -> AppResult<()> {
        info!("Tapedeck starting");

        let restored = self.recorder.restore().await;
        println!("Restored {} recording(s)", restored);

        self.open_output(self.config.audio.output_device.clone());
        println!("Type 'help' for commands.");

        let mut ticker = interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    let Some(command) = command else {
                        info!("Command channel closed, shutting down");
                        break;
                    };

                    match self.handle(command) {
                        Ok(Flow::Continue) => {}
                        Ok(Flow::Quit) => {
                            info!("Shutdown requested");
                            break;
                        }
                        Err(e) => {
                            error!(error = ?e, "Command failed");
                            println!("Error: {}", e);
                        }
                    }
                }

                _ = ticker.tick(), if self.recorder.is_active() => {
                    self.on_tick();
                }
            }
        }

        self.recorder.shutdown();
        self.recorder.store_mut().settle().await;
        if let Some(mut output) = self.output.take() {
            output.close();
        }

        info!("Tapedeck shut down successfully");

        Ok(())
    }

    fn on_tick(&mut self) {
        let Some(reading) = self.recorder.tick() else {
            return;
        };

        if self.last_meter.elapsed() < METER_PRINT_INTERVAL {
            return;
        }
        self.last_meter = Instant::now();

        println!(
            "{}",
            meter_line(
                &reading,
                self.recorder.elapsed(),
                self.recorder.metronome().current_beat()
            )
        );
    }

    #[instrument(skip(self))]
    fn handle(&mut self, command: AppCommand) -> AppResult<Flow> {
        match command {
            AppCommand::Monitor => {
                self.recorder.arm()?;
                println!("Monitoring");
            }
            AppCommand::Record => {
                self.recorder.record()?;
                println!("Recording");
            }
            AppCommand::Stop { name } => self.stop(name)?,
            AppCommand::Cancel => {
                self.recorder.cancel()?;
                println!("Monitoring stopped");
            }
            AppCommand::Gain { percent } => {
                let gain = self.recorder.set_gain(percent / 100.0);
                self.config.audio.gain = gain;
                self.save_config();
                println!("Gain {:.0}%", gain * 100.0);
            }
            AppCommand::Device { name } => {
                if self.recorder.select_device(name.clone()) {
                    println!("Monitoring stopped, input changed");
                }
                println!("Input: {}", name.as_deref().unwrap_or("default"));
                self.config.audio.selected_device = name;
                self.save_config();
            }
            AppCommand::Output { name } => {
                self.open_output(name.clone());
                self.config.audio.output_device = name;
                self.save_config();
            }
            AppCommand::Devices => {
                println!("Inputs:");
                for name in input_device_names()? {
                    println!("  {}", name);
                }
                println!("Outputs:");
                for name in output_device_names()? {
                    println!("  {}", name);
                }
            }
            AppCommand::List => {
                self.recorder.store_mut().sync_durable();
                if self.recorder.recordings().is_empty() {
                    println!("No recordings");
                }
                for recording in self.recorder.recordings() {
                    println!("{}", recording_line(recording));
                }
            }
            AppCommand::Play { id } => {
                let playback = self.recorder.play(id)?;
                println!(
                    "{}",
                    sparkline(
                        playback.waveform.points(),
                        self.config.meter.waveform_ceiling,
                        SPARKLINE_WIDTH
                    )
                );
                match (&playback.voice, playback.waveform.is_fallback()) {
                    (None, _) => println!("#{} has no audio output, showing waveform only", id),
                    (Some(_), true) => println!("Playing #{} (stored waveform)", id),
                    (Some(_), false) => println!("Playing #{}", id),
                }
            }
            AppCommand::Delete { id } => {
                if self.recorder.delete(id) {
                    println!("Deleted #{}", id);
                } else {
                    println!("No recording #{}", id);
                }
            }
            AppCommand::Export { dir } => {
                let dir = dir.unwrap_or_else(|| self.export_dir.clone());
                let path = self.recorder.export(&TarGzArchive::default(), &dir)?;
                println!(
                    "Exported {} recording(s) to {}",
                    self.recorder.recordings().len(),
                    path.display()
                );
            }
            AppCommand::Download { id, dir } => {
                let dir = dir.unwrap_or_else(|| self.export_dir.clone());
                let path = self.recorder.download(id, &dir)?;
                println!("Saved {}", path.display());
            }
            AppCommand::Metronome { on } => {
                let metronome = self.recorder.metronome_mut();
                if on {
                    metronome.start();
                    println!("Metronome on, {}", metronome.settings());
                } else {
                    metronome.stop();
                    println!("Metronome off");
                }
            }
            AppCommand::Bpm(bpm) => {
                self.recorder.metronome_mut().set_bpm(bpm);
                self.metronome_changed();
            }
            AppCommand::Beats(beats) => {
                self.recorder.metronome_mut().set_beats_per_bar(beats);
                self.metronome_changed();
            }
            AppCommand::Note(note_unit) => {
                self.recorder.metronome_mut().set_note_unit(note_unit);
                self.metronome_changed();
            }
            AppCommand::Help => println!("{}", HELP),
            AppCommand::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    fn stop(&mut self, name: Option<String>) -> AppResult<()> {
        if !self.recorder.is_active() {
            self.recorder.stop_playback();
            println!("Playback stopped");
            return Ok(());
        }

        let mut name = name;
        match self.recorder.stop(|| name.take())? {
            StopOutcome::Saved(created) => println!(
                "Saved #{} {} ({} bytes)",
                created.recording.id,
                created.recording.name,
                created.recording.size_bytes()
            ),
            StopOutcome::NothingCaptured => println!("Nothing was captured"),
            StopOutcome::Disarmed => println!("Monitoring stopped"),
        }

        Ok(())
    }

    fn metronome_changed(&mut self) {
        let settings = self.recorder.metronome().settings();
        self.config.metronome = settings.into();
        self.save_config();
        println!("Metronome {}", settings);
    }

    /// Replace the output stream. Without one, playback and clicks are silent.
    fn open_output(&mut self, name: Option<String>) {
        self.recorder.set_output(None);
        if let Some(mut old) = self.output.take() {
            old.close();
        }

        match AudioOutput::open(name.as_deref()) {
            Ok(output) => {
                let sink: Arc<dyn SoundSink> = Arc::new(output.handle());
                self.recorder.set_output(Some(sink));
                println!("Output: {}", output.device_name());
                self.output = Some(output);
            }
            Err(e) => {
                warn!(error = ?e, "No audio output, playback and metronome are silent");
                println!("No audio output available");
            }
        }
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save() {
            warn!(error = ?e, "Failed to save config");
        }
    }
}

async fn open_store(config: &Config) -> RecordingStore<FsDurableStore> {
    if !config.storage.persistent {
        info!("Persistence disabled, recordings are kept in memory only");
        return RecordingStore::memory_only();
    }

    match config.recordings_dir() {
        Ok(dir) => RecordingStore::from_open_result(FsDurableStore::open(dir).await),
        Err(e) => {
            warn!(error = ?e, "No data directory, recordings are kept in memory only");
            RecordingStore::memory_only()
        }
    }
}
