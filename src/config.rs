// MotionPlayer — Hardware & System Configuration
// Target: Seeed Studio Xiao ESP32-C3 (RISC-V) + DFPlayer Mini

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (Xiao ESP32-C3 pinout)
// ---------------------------------------------------------------------------
pub const PIN_NOISE_ADC: u32 = 2;   // D0/A0 — Floating analog pin, RNG seed source
pub const PIN_PIR: i32 = 3;         // D1/A1 — PIR motion sensor (digital, active HIGH)
pub const PIN_LED: i32 = 4;         // D2/A2 — Status LED
pub const PIN_DEBUG_STRAP: i32 = 5; // D3    — Diagnostics strap (LOW = silent)
pub const PIN_BUSY: i32 = 8;        // D8    — DFPlayer BUSY line (INPUT_PULLUP, active LOW)
pub const PIN_UART_RX: i32 = 20;    // D7    — UART RX <- DFPlayer TX
pub const PIN_UART_TX: i32 = 21;    // D6    — UART TX -> DFPlayer RX

// ---------------------------------------------------------------------------
// Playback Module (DFPlayer Mini)
// ---------------------------------------------------------------------------
pub const PLAYER_BAUD_RATE: u32 = 9600;
pub const PLAYER_VOLUME: u8 = 20;        // 0..=30
pub const PLAYER_TIMEOUT_MS: u32 = 2000; // Serial reply timeout

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const TRACK_DELAY_MS: u64 = 5000;       // Cooldown after a track ends (inclusive bound)
pub const LOOP_PERIOD_MS: u64 = 800;        // Control cycle period
pub const PLAY_SETTLE_MS: u64 = 500;        // Command-to-BUSY propagation latency
pub const BOOT_SETTLE_MS: u64 = 2000;       // Module settle time after configuration
pub const READY_POLL_INTERVAL_MS: u64 = 200;
pub const READY_MAX_ATTEMPTS: u32 = 25;     // ~5 s of readiness probing before giving up
pub const ERROR_BLINK_PERIOD_MS: u64 = 200; // Fail-stop indicator blink half-period

// ---------------------------------------------------------------------------
// RNG Seeding
// ---------------------------------------------------------------------------
pub const NOISE_SEED_SAMPLES: u32 = 16; // ADC reads folded into the seed
