//! MIDI click track standing in for the flap sound clip.
//!
//! A clip is a short burst of percussion clicks on the General MIDI drum
//! channel. Playback runs on its own thread; the handle forwards control
//! changes over a channel and mirrors the paused flag so a non-looping clip
//! that finishes reads as paused, like a media element would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use super::AudioChannel;

/// General MIDI percussion lives on channel 10 (index 9).
const DRUM_CHANNEL: u8 = 9;
/// Claves.
const CLICK_NOTE: u8 = 75;
const CLICK_VELOCITY: u8 = 90;
/// Clicks per clip.
const CLIP_CLICKS: u32 = 12;
/// Spacing between clicks at playback rate 1.0.
const BASE_CLICK_SPACING_MS: f32 = 45.0;

enum ClickCommand {
    Play,
    Pause,
    Looping(bool),
    Rate(f32),
}

pub struct MidiClickChannel {
    tx: Sender<ClickCommand>,
    paused: Arc<AtomicBool>,
    looping: bool,
    rate: f32,
}

impl MidiClickChannel {
    /// Connect to the first available MIDI output port. `None` when there is none.
    pub fn open() -> Option<Self> {
        let output = match midir::MidiOutput::new("auction-ticker") {
            Ok(o) => o,
            Err(e) => {
                warn!("MIDI output unavailable: {e}");
                return None;
            }
        };
        let port = output.ports().into_iter().next()?;
        let port_name = output.port_name(&port).unwrap_or_else(|_| "?".to_string());
        let conn = match output.connect(&port, "flap-clicks") {
            Ok(c) => c,
            Err(e) => {
                warn!("MIDI connect to {port_name} failed: {e}");
                return None;
            }
        };
        info!("Flap audio on MIDI port {port_name}");

        let (tx, rx) = mpsc::channel();
        let paused = Arc::new(AtomicBool::new(true));
        let thread_paused = Arc::clone(&paused);
        thread::spawn(move || click_loop(conn, rx, thread_paused));

        Some(Self {
            tx,
            paused,
            looping: false,
            rate: 1.0,
        })
    }

    fn send(&self, cmd: ClickCommand) {
        // Thread gone means the port died; run silent from here on.
        let _ = self.tx.send(cmd);
    }
}

impl AudioChannel for MidiClickChannel {
    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    fn play(&mut self) {
        self.paused.store(false, Ordering::Relaxed);
        self.send(ClickCommand::Play);
    }

    fn pause(&mut self) {
        self.paused.store(true, Ordering::Relaxed);
        self.send(ClickCommand::Pause);
    }

    fn is_looping(&self) -> bool {
        self.looping
    }

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
        self.send(ClickCommand::Looping(looping));
    }

    fn playback_rate(&self) -> f32 {
        self.rate
    }

    fn set_playback_rate(&mut self, rate: f32) {
        self.rate = rate;
        self.send(ClickCommand::Rate(rate));
    }
}

fn click_loop(
    mut conn: midir::MidiOutputConnection,
    rx: Receiver<ClickCommand>,
    paused: Arc<AtomicBool>,
) {
    let mut playing = false;
    let mut looping = false;
    let mut rate = 1.0f32;
    let mut position = 0u32;

    loop {
        let wait = if playing {
            Duration::from_secs_f32(BASE_CLICK_SPACING_MS / rate.max(0.1) / 1000.0)
        } else {
            Duration::from_secs(3600)
        };

        match rx.recv_timeout(wait) {
            Ok(ClickCommand::Play) => {
                playing = true;
                position = 0;
            }
            Ok(ClickCommand::Pause) => playing = false,
            Ok(ClickCommand::Looping(l)) => looping = l,
            Ok(ClickCommand::Rate(r)) => rate = r,
            Err(RecvTimeoutError::Timeout) => {
                if !playing {
                    continue;
                }
                let _ = conn.send(&[0x90 | DRUM_CHANNEL, CLICK_NOTE, CLICK_VELOCITY]);
                let _ = conn.send(&[0x80 | DRUM_CHANNEL, CLICK_NOTE, 0]);
                position += 1;
                if position >= CLIP_CLICKS {
                    position = 0;
                    if !looping {
                        playing = false;
                        paused.store(true, Ordering::Relaxed);
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
