// MotionPlayer — Hardware Capability Interfaces
//
// Narrow traits over everything the controller touches, so the state machine
// runs identically against real GPIO/UART peripherals and against the fakes
// in the unit tests.  Portable implementations (clock, RNG, diagnostics)
// live here; chip-specific adapters live in `drivers/`.

use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

// ---------------------------------------------------------------------------
// Playback module types
// ---------------------------------------------------------------------------

/// Storage/output selector of the playback module (wire values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputDevice {
    UDisk = 1,
    Sd = 2,
    Aux = 3,
    Sleep = 4,
    Flash = 5,
}

/// Equalizer profiles of the playback module (wire values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Equalizer {
    Normal = 0,
    Pop = 1,
    Rock = 2,
    Jazz = 3,
    Classic = 4,
    Bass = 5,
}

/// One-time playback module configuration applied during init.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSettings {
    pub volume: u8,
    pub output: OutputDevice,
    pub equalizer: Equalizer,
    pub timeout_ms: u32,
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Binary motion input (PIR).  No debouncing here — the cooldown/busy logic
/// in the controller provides it implicitly.
pub trait MotionSensor {
    fn motion_detected(&mut self) -> bool;
}

/// MP3 playback module.  Play commands are fire-and-forget at this level;
/// implementations log and swallow transport errors.
pub trait PlaybackDevice {
    /// Handshake with the module.  Must be called before anything else.
    fn connect(&mut self) -> anyhow::Result<()>;

    /// Apply volume / output / EQ / serial timeout.
    fn configure(&mut self, settings: &PlayerSettings) -> anyhow::Result<()>;

    /// Whether a track is currently sounding.
    fn is_busy(&mut self) -> bool;

    /// Advance to the next sequential track.
    fn play_next(&mut self);

    /// Play the track at 0-based index `index`.
    fn play_index(&mut self, index: u16);

    /// Post-init readiness probe: does the module answer queries yet?
    fn is_available(&mut self) -> bool;

    /// Number of enumerable audio files, or -1 if enumeration failed.
    fn count_files(&mut self) -> i32;
}

/// Binary status output (LED).
pub trait StatusIndicator {
    fn set(&mut self, on: bool);
}

/// Advisory text output.  The controller writes unconditionally; the sink
/// decides whether anything is emitted.
pub trait DiagnosticsSink {
    fn write(&mut self, msg: &str);
}

/// Uniform random index source for random track selection.
pub trait RandomSource {
    /// Uniformly distributed value in `[0, bound)`.  `bound` must be > 0.
    fn next_below(&mut self, bound: u16) -> u16;
}

/// Monotonic time and blocking sleep, injected so tests run without real
/// time passing.
pub trait Clock {
    fn now_ms(&self) -> u64;
    fn sleep_ms(&self, ms: u64);
}

// ---------------------------------------------------------------------------
// Portable implementations
// ---------------------------------------------------------------------------

/// Monotonic milliseconds since construction, backed by `std::time::Instant`.
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn sleep_ms(&self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

/// PRNG seeded once from hardware noise (a floating ADC pin read at boot).
pub struct EntropyRng {
    rng: SmallRng,
}

impl EntropyRng {
    pub fn from_seed(seed: u64) -> Self {
        Self { rng: SmallRng::seed_from_u64(seed) }
    }
}

impl RandomSource for EntropyRng {
    fn next_below(&mut self, bound: u16) -> u16 {
        self.rng.gen_range(0..bound)
    }
}

/// Diagnostics sink gated by the debug strap pin, read once at boot.
/// Strap LOW → every write is dropped; otherwise text goes to the log.
pub struct StrapDiagnostics {
    enabled: bool,
}

impl StrapDiagnostics {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl DiagnosticsSink for StrapDiagnostics {
    fn write(&mut self, msg: &str) {
        if self.enabled {
            log::info!("{}", msg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropy_rng_stays_below_bound() {
        let mut rng = EntropyRng::from_seed(0xDEAD_BEEF);
        for _ in 0..10_000 {
            assert!(rng.next_below(7) < 7);
        }
    }

    #[test]
    fn entropy_rng_covers_full_range() {
        let mut rng = EntropyRng::from_seed(42);
        let bound: u16 = 12;
        let mut hits = [0u32; 12];
        let draws = 12_000;
        for _ in 0..draws {
            hits[rng.next_below(bound) as usize] += 1;
        }
        // Roughly uniform: every index hit, none wildly over-represented.
        let expected = draws / bound as u32;
        for (i, &count) in hits.iter().enumerate() {
            assert!(count > 0, "index {} never drawn", i);
            assert!(
                count > expected / 2 && count < expected * 2,
                "index {} drawn {} times, expected ~{}",
                i,
                count,
                expected
            );
        }
    }

    #[test]
    fn entropy_rng_is_deterministic_per_seed() {
        let mut a = EntropyRng::from_seed(7);
        let mut b = EntropyRng::from_seed(7);
        for _ in 0..100 {
            assert_eq!(a.next_below(100), b.next_below(100));
        }
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let t0 = clock.now_ms();
        clock.sleep_ms(2);
        assert!(clock.now_ms() >= t0);
    }
}
