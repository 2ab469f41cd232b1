//! Turns cues into sound.
//!
//! The timer only ever hands over a [`Cue`]; each player decides what that
//! means for its output. The tone table describes the synthesised sounds so
//! every backend agrees on pitch and length.

use std::io::Write;
use std::time::Duration;

use crate::cue::Cue;

/// One sine layer of a cue's sound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub freq_hz: f32,
    pub gain: f32,
    pub duration: Duration,
}

const fn tone(freq_hz: f32, gain: f32, millis: u64) -> Tone {
    Tone {
        freq_hz,
        gain,
        duration: Duration::from_millis(millis),
    }
}

/// Low, loud buzzer closing a round.
const BUZZER: [Tone; 4] = [
    tone(150.0, 1.0, 950),
    tone(300.0, 0.8, 950),
    tone(600.0, 0.6, 950),
    tone(900.0, 0.4, 950),
];

/// Bell-like ring closing a rest.
const REST_RING: [Tone; 3] = [
    tone(440.0, 0.8, 1500),
    tone(880.0, 0.4, 1500),
    tone(1320.0, 0.2, 1500),
];

const TICK: [Tone; 1] = [tone(1000.0, 0.1, 50)];

const REST_BEEP: [Tone; 1] = [tone(700.0, 0.2, 100)];

/// The layers played together for `cue`.
pub fn tones_for(cue: Cue) -> &'static [Tone] {
    match cue {
        Cue::RoundTick => &TICK,
        Cue::RestTick => &REST_BEEP,
        Cue::RoundEnd => &BUZZER,
        Cue::RestEnd => &REST_RING,
    }
}

/// How long the sound for `cue` lasts.
pub fn cue_length(cue: Cue) -> Duration {
    tones_for(cue)
        .iter()
        .map(|t| t.duration)
        .max()
        .unwrap_or_default()
}

/// Destination for cues.
pub trait CuePlayer {
    fn play(&mut self, cue: Cue);
}

impl<P: CuePlayer + ?Sized> CuePlayer for Box<P> {
    fn play(&mut self, cue: Cue) {
        (**self).play(cue)
    }
}

/// Discards every cue.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentPlayer;

impl CuePlayer for SilentPlayer {
    fn play(&mut self, _cue: Cue) {}
}

/// Rings the terminal bell at the end of each phase. Ticks are dropped.
#[derive(Debug)]
pub struct BellPlayer<W: Write> {
    out: W,
}

impl<W: Write> BellPlayer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> CuePlayer for BellPlayer<W> {
    fn play(&mut self, cue: Cue) {
        if !cue.is_terminal() {
            return;
        }
        if let Err(err) = self.out.write_all(b"\x07").and_then(|_| self.out.flush()) {
            tracing::warn!(error = %err, "terminal bell failed");
        }
    }
}

/// Remembers every cue it was handed. Used by tests and headless runs.
#[derive(Debug, Default, Clone)]
pub struct RecordingPlayer {
    pub played: Vec<Cue>,
}

impl CuePlayer for RecordingPlayer {
    fn play(&mut self, cue: Cue) {
        self.played.push(cue);
    }
}

#[cfg(feature = "tone")]
pub use synth::TonePlayer;

#[cfg(feature = "tone")]
mod synth {
    use rodio::source::{SineWave, Source};
    use rodio::{OutputStream, OutputStreamHandle};

    use super::{tones_for, CuePlayer};
    use crate::cue::Cue;
    use crate::error::{Result, RingsideError};

    const FADE: std::time::Duration = std::time::Duration::from_millis(5);

    enum Output {
        Unopened,
        Open {
            // Dropping the stream stops playback, so it lives as long as the
            // player.
            _stream: OutputStream,
            handle: OutputStreamHandle,
        },
        Unavailable,
    }

    /// Synthesises the tone table on the default audio device. The device is
    /// opened on the first cue and kept for the life of the player; if it
    /// cannot be opened the player goes quiet.
    pub struct TonePlayer {
        output: Output,
        volume: f32,
    }

    impl TonePlayer {
        pub fn new(volume: f32) -> Self {
            Self {
                output: Output::Unopened,
                volume: volume.clamp(0.0, 1.0),
            }
        }

        fn handle(&mut self) -> Option<&OutputStreamHandle> {
            if let Output::Unopened = self.output {
                self.output = match open() {
                    Ok((stream, handle)) => {
                        tracing::info!("audio output opened");
                        Output::Open {
                            _stream: stream,
                            handle,
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "tones disabled");
                        Output::Unavailable
                    }
                };
            }
            match &self.output {
                Output::Open { handle, .. } => Some(handle),
                _ => None,
            }
        }
    }

    fn open() -> Result<(OutputStream, OutputStreamHandle)> {
        OutputStream::try_default().map_err(|e| RingsideError::audio(e.to_string()))
    }

    impl CuePlayer for TonePlayer {
        fn play(&mut self, cue: Cue) {
            let volume = self.volume;
            let Some(handle) = self.handle() else {
                return;
            };
            for layer in tones_for(cue) {
                let source = SineWave::new(layer.freq_hz)
                    .take_duration(layer.duration)
                    .fade_in(FADE)
                    .amplify(layer.gain * volume);
                if let Err(err) = handle.play_raw(source.convert_samples()) {
                    tracing::warn!(error = %err, %cue, "tone playback failed");
                    return;
                }
            }
        }
    }

    impl std::fmt::Debug for TonePlayer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let state = match self.output {
                Output::Unopened => "unopened",
                Output::Open { .. } => "open",
                Output::Unavailable => "unavailable",
            };
            f.debug_struct("TonePlayer")
                .field("output", &state)
                .field("volume", &self.volume)
                .finish()
        }
    }
}
