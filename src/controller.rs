// MotionPlayer — Playback Controller
//
// The whole control surface of the device: one owned state record and a
// fixed-period polling cycle that fuses the BUSY line, the PIR input and the
// cooldown timer into a single "start a track now, or not" decision.
//
// Cycle order is significant: the busy→idle edge must be captured before the
// motion logic consumes `playing`, otherwise a track that just ended would
// immediately re-trigger.

use crate::config::*;
use crate::error::InitError;
use crate::hal::{
    Clock, DiagnosticsSink, Equalizer, MotionSensor, OutputDevice, PlaybackDevice, PlayerSettings,
    RandomSource, StatusIndicator,
};

pub struct PlaybackController<P, M, S, D, R, C> {
    player: P,
    motion: M,
    indicator: S,
    diag: D,
    rng: R,
    clock: C,

    /// Time the BUSY line last transitioned busy→idle; updated only on that
    /// transition (and once at the end of init).
    last_track_finished_ms: u64,
    /// Mirrors the last observed playback state.
    playing: bool,
    /// Fixed after init: true iff file enumeration returned a count > 0.
    random_mode: bool,
    file_count: u16,
}

impl<P, M, S, D, R, C> PlaybackController<P, M, S, D, R, C>
where
    P: PlaybackDevice,
    M: MotionSensor,
    S: StatusIndicator,
    D: DiagnosticsSink,
    R: RandomSource,
    C: Clock,
{
    pub fn new(player: P, motion: M, indicator: S, diag: D, rng: R, clock: C) -> Self {
        Self {
            player,
            motion,
            indicator,
            diag,
            rng,
            clock,
            last_track_finished_ms: 0,
            playing: false,
            random_mode: false,
            file_count: 0,
        }
    }

    /// Bring up the playback module and decide the track selection mode.
    ///
    /// Any `Err` here is terminal; the caller is expected to enter
    /// [`fail_stop`](Self::fail_stop).
    pub fn init(&mut self) -> Result<(), InitError> {
        self.diag.write("Initializing...");

        self.player.connect().map_err(InitError::Handshake)?;
        self.diag.write("player connected...");

        self.player
            .configure(&PlayerSettings {
                volume: PLAYER_VOLUME,
                output: OutputDevice::Sd,
                equalizer: Equalizer::Jazz,
                timeout_ms: PLAYER_TIMEOUT_MS,
            })
            .map_err(InitError::Configure)?;

        // Let the module settle, then probe until it answers queries.
        // Bounded: a module that handshakes but never becomes ready is a
        // distinct failure, not an infinite boot hang.
        self.clock.sleep_ms(BOOT_SETTLE_MS);
        let mut attempts = 0;
        loop {
            attempts += 1;
            if self.player.is_available() {
                break;
            }
            if attempts >= READY_MAX_ATTEMPTS {
                return Err(InitError::ReadyTimeout { attempts });
            }
            self.clock.sleep_ms(READY_POLL_INTERVAL_MS);
        }

        // count == -1 means enumeration is unsupported on this module; that
        // is a soft condition and only disables random selection.  Zero
        // files, however, means nothing can ever play.
        let count = self.player.count_files();
        self.diag.write(&format!("found {} audio files...", count));
        if count == 0 {
            return Err(InitError::NoAudioFiles);
        }
        if count > 0 {
            self.random_mode = true;
            self.file_count = count as u16;
        }

        // Start the cooldown window now so a boot straight into motion does
        // not fire before the device has fully settled.
        self.last_track_finished_ms = self.clock.now_ms();
        self.diag.write("Done.");
        Ok(())
    }

    /// One control cycle.  Called at a fixed period from [`run`](Self::run).
    pub fn step(&mut self) {
        let now = self.clock.now_ms();

        // 1. Busy/indicator update.  Capture the busy→idle edge first.
        if !self.player.is_busy() {
            self.indicator.set(false);
            if self.playing {
                self.last_track_finished_ms = now;
            }
            self.playing = false;
        } else {
            self.indicator.set(true);
        }

        // 2. Cooldown.  Inclusive bound: at elapsed == TRACK_DELAY_MS the
        // window still holds.
        let elapsed = now.saturating_sub(self.last_track_finished_ms);
        let in_cooldown = elapsed <= TRACK_DELAY_MS;

        // 3. Motion decision.
        self.diag.write("Checking for motion...");
        if self.motion.motion_detected() {
            self.diag.write("Motion detected...");
            if !self.playing && !in_cooldown {
                self.diag.write("Play track...");
                self.playing = true;
                if self.random_mode {
                    let index = self.rng.next_below(self.file_count);
                    self.player.play_index(index);
                } else {
                    self.player.play_next();
                }
                // The BUSY line lags the play command; without this settle
                // the next cycle could still read idle and re-trigger.
                self.clock.sleep_ms(PLAY_SETTLE_MS);
            } else if self.playing {
                self.diag.write("Still playing...");
            } else {
                self.diag
                    .write(&format!("Remaining delay: {}ms...", TRACK_DELAY_MS - elapsed));
            }
        } else {
            self.diag.write("No motion detected...");
        }
        self.diag.write("Loop done.");
    }

    /// Run the control cycle forever at the fixed loop period.
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
            self.clock.sleep_ms(LOOP_PERIOD_MS);
        }
    }

    /// Terminal error state: fast indicator blink, no sensor or playback
    /// logic ever runs again.
    pub fn fail_stop(&mut self) -> ! {
        loop {
            self.indicator.set(true);
            self.clock.sleep_ms(ERROR_BLINK_PERIOD_MS);
            self.indicator.set(false);
            self.clock.sleep_ms(ERROR_BLINK_PERIOD_MS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum PlayCmd {
        Next,
        Index(u16),
    }

    #[derive(Default)]
    struct PlayerState {
        busy: bool,
        connect_fails: bool,
        configure_fails: bool,
        ready_after_probes: u32,
        probes: u32,
        file_count: i32,
        plays: Vec<PlayCmd>,
    }

    #[derive(Clone)]
    struct FakePlayer(Rc<RefCell<PlayerState>>);

    impl FakePlayer {
        fn with_files(file_count: i32) -> Self {
            Self(Rc::new(RefCell::new(PlayerState {
                file_count,
                ..PlayerState::default()
            })))
        }

        fn set_busy(&self, busy: bool) {
            self.0.borrow_mut().busy = busy;
        }

        fn plays(&self) -> Vec<PlayCmd> {
            self.0.borrow().plays.clone()
        }
    }

    impl PlaybackDevice for FakePlayer {
        fn connect(&mut self) -> anyhow::Result<()> {
            if self.0.borrow().connect_fails {
                anyhow::bail!("no response from module");
            }
            Ok(())
        }

        fn configure(&mut self, _settings: &PlayerSettings) -> anyhow::Result<()> {
            if self.0.borrow().configure_fails {
                anyhow::bail!("write failed");
            }
            Ok(())
        }

        fn is_busy(&mut self) -> bool {
            self.0.borrow().busy
        }

        fn play_next(&mut self) {
            self.0.borrow_mut().plays.push(PlayCmd::Next);
        }

        fn play_index(&mut self, index: u16) {
            self.0.borrow_mut().plays.push(PlayCmd::Index(index));
        }

        fn is_available(&mut self) -> bool {
            let mut state = self.0.borrow_mut();
            state.probes += 1;
            state.probes > state.ready_after_probes
        }

        fn count_files(&mut self) -> i32 {
            self.0.borrow().file_count
        }
    }

    #[derive(Clone, Default)]
    struct FakeMotion(Rc<Cell<bool>>);

    impl MotionSensor for FakeMotion {
        fn motion_detected(&mut self) -> bool {
            self.0.get()
        }
    }

    #[derive(Clone, Default)]
    struct FakeLed(Rc<Cell<bool>>);

    impl StatusIndicator for FakeLed {
        fn set(&mut self, on: bool) {
            self.0.set(on);
        }
    }

    struct NullDiag;

    impl DiagnosticsSink for NullDiag {
        fn write(&mut self, _msg: &str) {}
    }

    /// Scripted RNG: always returns `value` and records the bound of every
    /// draw.
    #[derive(Clone)]
    struct FakeRng {
        value: u16,
        bounds: Rc<RefCell<Vec<u16>>>,
    }

    impl FakeRng {
        fn always(value: u16) -> Self {
            Self { value, bounds: Rc::new(RefCell::new(Vec::new())) }
        }
    }

    impl RandomSource for FakeRng {
        fn next_below(&mut self, bound: u16) -> u16 {
            self.bounds.borrow_mut().push(bound);
            self.value.min(bound - 1)
        }
    }

    /// Manual clock: `sleep_ms` advances it, tests can also jump it.
    #[derive(Clone, Default)]
    struct FakeClock(Rc<Cell<u64>>);

    impl FakeClock {
        fn jump_to(&self, ms: u64) {
            self.0.set(ms);
        }
    }

    impl Clock for FakeClock {
        fn now_ms(&self) -> u64 {
            self.0.get()
        }

        fn sleep_ms(&self, ms: u64) {
            self.0.set(self.0.get() + ms);
        }
    }

    struct Rig {
        ctl: PlaybackController<FakePlayer, FakeMotion, FakeLed, NullDiag, FakeRng, FakeClock>,
        player: FakePlayer,
        motion: FakeMotion,
        led: FakeLed,
        clock: FakeClock,
        rng: FakeRng,
    }

    fn build(file_count: i32, rng_value: u16) -> Rig {
        let player = FakePlayer::with_files(file_count);
        let motion = FakeMotion::default();
        let led = FakeLed::default();
        let clock = FakeClock::default();
        let rng = FakeRng::always(rng_value);
        let ctl = PlaybackController::new(
            player.clone(),
            motion.clone(),
            led.clone(),
            NullDiag,
            rng.clone(),
            clock.clone(),
        );
        Rig { ctl, player, motion, led, clock, rng }
    }

    fn initialized(file_count: i32) -> Rig {
        let mut rig = build(file_count, 0);
        rig.ctl.init().expect("init should succeed");
        rig
    }

    impl Rig {
        fn pass_cooldown(&self) {
            self.clock
                .jump_to(self.ctl.last_track_finished_ms + TRACK_DELAY_MS + 1);
        }
    }

    // ---- init policy ------------------------------------------------------

    #[test]
    fn init_enables_random_mode_when_files_enumerated() {
        let rig = initialized(24);
        assert!(rig.ctl.random_mode);
        assert_eq!(rig.ctl.file_count, 24);
    }

    #[test]
    fn init_falls_back_to_sequential_on_enumeration_failure() {
        let rig = initialized(-1);
        assert!(!rig.ctl.random_mode);
    }

    #[test]
    fn init_fails_on_zero_files() {
        let mut rig = build(0, 0);
        assert!(matches!(rig.ctl.init(), Err(InitError::NoAudioFiles)));
    }

    #[test]
    fn init_fails_on_handshake_error() {
        let rig = build(5, 0);
        rig.player.0.borrow_mut().connect_fails = true;
        let mut ctl = rig.ctl;
        assert!(matches!(ctl.init(), Err(InitError::Handshake(_))));
    }

    #[test]
    fn init_fails_on_configure_error() {
        let rig = build(5, 0);
        rig.player.0.borrow_mut().configure_fails = true;
        let mut ctl = rig.ctl;
        assert!(matches!(ctl.init(), Err(InitError::Configure(_))));
    }

    #[test]
    fn init_gives_up_after_bounded_readiness_probes() {
        let rig = build(5, 0);
        rig.player.0.borrow_mut().ready_after_probes = READY_MAX_ATTEMPTS + 5;
        let mut ctl = rig.ctl;
        match ctl.init() {
            Err(InitError::ReadyTimeout { attempts }) => {
                assert_eq!(attempts, READY_MAX_ATTEMPTS)
            }
            other => panic!("expected ReadyTimeout, got {:?}", other.err()),
        }
    }

    #[test]
    fn init_retries_readiness_probe_until_ready() {
        let rig = build(5, 0);
        rig.player.0.borrow_mut().ready_after_probes = 3;
        let mut ctl = rig.ctl;
        ctl.init().expect("becomes ready within the attempt budget");
        assert_eq!(rig.player.0.borrow().probes, 4);
    }

    #[test]
    fn init_starts_cooldown_window() {
        let mut rig = initialized(-1);
        // Motion right after boot: elapsed == 0, still inside the window.
        rig.motion.0.set(true);
        rig.ctl.step();
        assert!(rig.player.plays().is_empty());
    }

    // ---- cycle: play decision ---------------------------------------------

    #[test]
    fn plays_on_motion_when_idle_and_cooldown_elapsed() {
        let mut rig = initialized(-1);
        rig.pass_cooldown();
        rig.motion.0.set(true);
        rig.ctl.step();
        assert_eq!(rig.player.plays(), vec![PlayCmd::Next]);
        assert!(rig.ctl.playing);
    }

    #[test]
    fn no_play_without_motion() {
        let mut rig = initialized(-1);
        rig.pass_cooldown();
        rig.ctl.step();
        rig.ctl.step();
        assert!(rig.player.plays().is_empty());
    }

    #[test]
    fn no_play_while_track_is_sounding() {
        let mut rig = initialized(-1);
        rig.pass_cooldown();
        rig.motion.0.set(true);
        rig.ctl.step();
        assert_eq!(rig.player.plays().len(), 1);

        // Module asserts BUSY; continued motion must not re-trigger.
        rig.player.set_busy(true);
        rig.ctl.step();
        rig.ctl.step();
        assert_eq!(rig.player.plays().len(), 1);
    }

    #[test]
    fn cooldown_bound_is_inclusive() {
        let mut rig = initialized(-1);
        rig.motion.0.set(true);

        // elapsed == TRACK_DELAY_MS: still blocked.
        rig.clock.jump_to(rig.ctl.last_track_finished_ms + TRACK_DELAY_MS);
        rig.ctl.step();
        assert!(rig.player.plays().is_empty());

        // One millisecond later: allowed.
        rig.clock
            .jump_to(rig.ctl.last_track_finished_ms + TRACK_DELAY_MS + 1);
        rig.ctl.step();
        assert_eq!(rig.player.plays().len(), 1);
    }

    #[test]
    fn post_play_settle_delay_is_applied() {
        let mut rig = initialized(-1);
        rig.pass_cooldown();
        rig.motion.0.set(true);
        let before = rig.clock.now_ms();
        rig.ctl.step();
        assert_eq!(rig.clock.now_ms(), before + PLAY_SETTLE_MS);
    }

    // ---- cycle: busy edge & indicator -------------------------------------

    #[test]
    fn busy_to_idle_edge_records_finish_time_once() {
        let mut rig = initialized(-1);
        rig.pass_cooldown();
        rig.motion.0.set(true);
        rig.ctl.step();
        rig.motion.0.set(false);

        rig.player.set_busy(true);
        rig.ctl.step();

        // Track ends; the idle reading must stamp the finish time.
        rig.player.set_busy(false);
        let end = rig.clock.now_ms() + 1234;
        rig.clock.jump_to(end);
        rig.ctl.step();
        assert_eq!(rig.ctl.last_track_finished_ms, end);
        assert!(!rig.ctl.playing);

        // Further idle readings leave the stamp untouched.
        rig.clock.jump_to(end + 999);
        rig.ctl.step();
        assert_eq!(rig.ctl.last_track_finished_ms, end);
    }

    #[test]
    fn indicator_mirrors_busy_line() {
        let mut rig = initialized(-1);
        rig.player.set_busy(true);
        rig.ctl.step();
        assert!(rig.led.0.get());

        rig.player.set_busy(false);
        rig.ctl.step();
        assert!(!rig.led.0.get());
    }

    // ---- track selection ---------------------------------------------------

    #[test]
    fn random_mode_draws_index_below_file_count() {
        let mut rig = build(24, 7);
        rig.ctl.init().expect("init should succeed");
        rig.pass_cooldown();
        rig.motion.0.set(true);
        rig.ctl.step();
        assert_eq!(rig.player.plays(), vec![PlayCmd::Index(7)]);
        assert_eq!(*rig.rng.bounds.borrow(), vec![24]);
    }

    #[test]
    fn sequential_mode_never_draws_random_indices() {
        let mut rig = initialized(-1);
        rig.pass_cooldown();
        rig.motion.0.set(true);
        rig.ctl.step();
        assert_eq!(rig.player.plays(), vec![PlayCmd::Next]);
        assert!(rig.rng.bounds.borrow().is_empty());
    }

    // ---- full scenario -----------------------------------------------------

    #[test]
    fn motion_busy_cooldown_timeline() {
        let mut rig = initialized(-1);
        rig.pass_cooldown();
        let t0 = rig.clock.now_ms();

        // t=0: motion, device idle, cooldown elapsed -> exactly one play.
        rig.motion.0.set(true);
        rig.ctl.step();
        assert_eq!(rig.player.plays().len(), 1);
        assert!(rig.ctl.playing);

        // Track sounding until t=3000.
        rig.player.set_busy(true);
        rig.clock.jump_to(t0 + 1500);
        rig.ctl.step();
        assert_eq!(rig.player.plays().len(), 1);

        // t=3001: busy reads idle -> finish time stamped.
        rig.player.set_busy(false);
        rig.motion.0.set(false);
        rig.clock.jump_to(t0 + 3001);
        rig.ctl.step();
        assert_eq!(rig.ctl.last_track_finished_ms, t0 + 3001);

        // t=3500: motion again, elapsed 499 < 5000 -> blocked.
        rig.motion.0.set(true);
        rig.clock.jump_to(t0 + 3500);
        rig.ctl.step();
        assert_eq!(rig.player.plays().len(), 1);

        // t=8002: elapsed 5001 > 5000 -> plays again.
        rig.clock.jump_to(t0 + 8002);
        rig.ctl.step();
        assert_eq!(rig.player.plays().len(), 2);
    }
}
