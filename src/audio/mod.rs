//! Audible feedback for board activity.
//!
//! The [`AudioDriver`] is the only owner of the shared [`AudioChannel`]. It
//! turns the number of busy flaps into play/pause, loop and playback-rate
//! decisions, touching the channel only when something actually changes.

#[cfg(feature = "midi")]
pub mod midi;

use tracing::debug;

pub const MIN_PLAYBACK_RATE: f32 = 0.5;
pub const MAX_PLAYBACK_RATE: f32 = 4.0;

/// Controls of the single clip the board plays while flapping.
pub trait AudioChannel: Send {
    fn is_paused(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
    fn is_looping(&self) -> bool;
    fn set_looping(&mut self, looping: bool);
    fn playback_rate(&self) -> f32;
    fn set_playback_rate(&mut self, rate: f32);
}

/// `1 + floor(sqrt(busy / 2))`, clamped to `[0.5, 4.0]`.
pub fn playback_rate(busy: usize) -> f32 {
    let rate = 1.0 + (busy as f64 / 2.0).sqrt().floor();
    (rate as f32).clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE)
}

pub struct AudioDriver {
    /// `None` when no output device is available; every call is then a no-op.
    channel: Option<Box<dyn AudioChannel>>,
}

impl AudioDriver {
    pub fn new(channel: Box<dyn AudioChannel>) -> Self {
        Self {
            channel: Some(channel),
        }
    }

    pub fn silent() -> Self {
        Self { channel: None }
    }

    pub fn is_silent(&self) -> bool {
        self.channel.is_none()
    }

    /// Rate the channel is playing at, if there is a channel.
    pub fn current_rate(&self) -> Option<f32> {
        self.channel.as_ref().map(|c| c.playback_rate())
    }

    /// Bring the channel in line with `busy` flapping cells.
    pub fn apply(&mut self, busy: usize) {
        let Some(channel) = self.channel.as_mut() else {
            return;
        };
        let any_busy = busy > 0;

        let rate = playback_rate(busy);
        if channel.playback_rate() != rate {
            channel.set_playback_rate(rate);
        }

        if channel.is_paused() && any_busy {
            debug!(busy, rate, "flap audio start");
            channel.play();
        } else if !channel.is_paused() && !any_busy {
            debug!("flap audio stop");
            channel.pause();
        }

        if channel.is_looping() != any_busy {
            channel.set_looping(any_busy);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    pub(crate) struct ChannelLog {
        pub paused: bool,
        pub looping: bool,
        pub rate: f32,
        pub plays: usize,
        pub pauses: usize,
        pub loop_toggles: usize,
    }

    impl Default for ChannelLog {
        fn default() -> Self {
            Self {
                paused: true,
                looping: false,
                rate: 1.0,
                plays: 0,
                pauses: 0,
                loop_toggles: 0,
            }
        }
    }

    /// Records every control call so tests can check for redundant toggles.
    pub(crate) struct FakeChannel(pub Arc<Mutex<ChannelLog>>);

    impl AudioChannel for FakeChannel {
        fn is_paused(&self) -> bool {
            self.0.lock().unwrap().paused
        }
        fn play(&mut self) {
            let mut log = self.0.lock().unwrap();
            log.paused = false;
            log.plays += 1;
        }
        fn pause(&mut self) {
            let mut log = self.0.lock().unwrap();
            log.paused = true;
            log.pauses += 1;
        }
        fn is_looping(&self) -> bool {
            self.0.lock().unwrap().looping
        }
        fn set_looping(&mut self, looping: bool) {
            let mut log = self.0.lock().unwrap();
            log.looping = looping;
            log.loop_toggles += 1;
        }
        fn playback_rate(&self) -> f32 {
            self.0.lock().unwrap().rate
        }
        fn set_playback_rate(&mut self, rate: f32) {
            self.0.lock().unwrap().rate = rate;
        }
    }

    pub(crate) fn fake_driver() -> (AudioDriver, Arc<Mutex<ChannelLog>>) {
        let log = Arc::new(Mutex::new(ChannelLog::default()));
        (AudioDriver::new(Box::new(FakeChannel(Arc::clone(&log)))), log)
    }

    #[test]
    fn rate_curve() {
        assert_eq!(playback_rate(0), 1.0);
        assert_eq!(playback_rate(1), 1.0);
        assert_eq!(playback_rate(2), 2.0);
        assert_eq!(playback_rate(8), 3.0);
        assert_eq!(playback_rate(18), 4.0);
        assert_eq!(playback_rate(10_000), MAX_PLAYBACK_RATE);
    }

    #[test]
    fn idle_board_stays_paused() {
        let (mut driver, log) = fake_driver();
        driver.apply(0);
        let log = log.lock().unwrap();
        assert!(log.paused);
        assert!(!log.looping);
        assert_eq!(log.plays, 0);
    }

    #[test]
    fn single_busy_flap_plays_looped_at_base_rate() {
        let (mut driver, log) = fake_driver();
        driver.apply(1);
        let log = log.lock().unwrap();
        assert!(!log.paused);
        assert!(log.looping);
        assert_eq!(log.rate, 1.0);
    }

    #[test]
    fn eight_busy_flaps_play_at_triple_rate() {
        let (mut driver, log) = fake_driver();
        driver.apply(8);
        assert_eq!(log.lock().unwrap().rate, 3.0);
        assert_eq!(driver.current_rate(), Some(3.0));
    }

    #[test]
    fn repeated_counts_do_not_restart_or_retoggle() {
        let (mut driver, log) = fake_driver();
        for _ in 0..5 {
            driver.apply(4);
        }
        {
            let log = log.lock().unwrap();
            assert_eq!(log.plays, 1);
            assert_eq!(log.loop_toggles, 1);
        }

        for _ in 0..3 {
            driver.apply(0);
        }
        let log = log.lock().unwrap();
        assert_eq!(log.pauses, 1);
        assert_eq!(log.loop_toggles, 2);
        assert!(log.paused);
        assert!(!log.looping);
    }

    #[test]
    fn silent_driver_is_a_no_op() {
        let mut driver = AudioDriver::silent();
        driver.apply(12);
        driver.apply(0);
        assert!(driver.is_silent());
        assert_eq!(driver.current_rate(), None);
    }
}
