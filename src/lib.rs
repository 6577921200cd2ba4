// MotionPlayer — Motion-Activated Audio Playback Firmware
//
// A PIR sensor triggers MP3 playback on a DFPlayer Mini; the module's BUSY
// line drives a status LED and a cooldown timer prevents immediate
// re-triggering.  The control logic is platform-agnostic (and host-testable);
// the ESP-IDF adapters under `drivers/` only compile for the chip.

pub mod config;
pub mod controller;
pub mod error;
pub mod hal;

#[cfg(target_os = "espidf")]
pub mod drivers;
