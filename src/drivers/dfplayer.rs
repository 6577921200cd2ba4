// MotionPlayer — DFPlayer Mini Driver
//
// Frame-level serial driver over UART plus the BUSY GPIO line.
// 10-byte frames: 7E FF 06 CMD FB PH PL CKH CKL EF, checksum is the two's
// complement of the sum of bytes 1..=6.

use std::time::{Duration, Instant};

use esp_idf_hal::delay::TickType;
use esp_idf_hal::gpio::{AnyInputPin, Input, PinDriver};
use esp_idf_hal::uart::UartDriver;

use crate::hal::{PlaybackDevice, PlayerSettings};

const FRAME_LEN: usize = 10;
const FRAME_START: u8 = 0x7E;
const FRAME_VERSION: u8 = 0xFF;
const FRAME_DATA_LEN: u8 = 0x06;
const FRAME_END: u8 = 0xEF;

// Command bytes
const CMD_PLAY_NEXT: u8 = 0x01;
const CMD_PLAY_TRACK: u8 = 0x03;
const CMD_SET_VOLUME: u8 = 0x06;
const CMD_SET_EQ: u8 = 0x07;
const CMD_OUTPUT_DEVICE: u8 = 0x09;
const CMD_RESET: u8 = 0x0C;
const CMD_QUERY_STATUS: u8 = 0x42;
const CMD_QUERY_SD_FILES: u8 = 0x48;

// Event bytes reported by the module
const EVT_ONLINE: u8 = 0x3F;
const EVT_CARD_INSERTED: u8 = 0x3A;
const EVT_ERROR: u8 = 0x40;

const READ_SLICE_MS: u64 = 50; // per-read UART timeout while waiting for a frame

struct Frame {
    cmd: u8,
    param: u16,
}

pub struct DfPlayer<'d> {
    uart: UartDriver<'d>,
    busy: PinDriver<'d, AnyInputPin, Input>,
    timeout_ms: u32,
}

impl<'d> DfPlayer<'d> {
    /// `busy` must be configured as an input with pull-up; the line is
    /// active LOW while a track is sounding.
    pub fn new(uart: UartDriver<'d>, busy: PinDriver<'d, AnyInputPin, Input>) -> Self {
        Self {
            uart,
            busy,
            timeout_ms: crate::config::PLAYER_TIMEOUT_MS,
        }
    }

    fn build_frame(cmd: u8, param: u16) -> [u8; FRAME_LEN] {
        let mut frame = [
            FRAME_START,
            FRAME_VERSION,
            FRAME_DATA_LEN,
            cmd,
            0x00, // no per-command ACK; replies are read explicitly
            (param >> 8) as u8,
            param as u8,
            0x00,
            0x00,
            FRAME_END,
        ];
        let sum: u16 = frame[1..7].iter().map(|&b| b as u16).sum();
        let checksum = 0u16.wrapping_sub(sum);
        frame[7] = (checksum >> 8) as u8;
        frame[8] = checksum as u8;
        frame
    }

    fn send(&mut self, cmd: u8, param: u16) -> anyhow::Result<()> {
        let frame = Self::build_frame(cmd, param);
        self.uart.write(&frame)?;
        Ok(())
    }

    /// Read one well-formed frame, discarding noise bytes, until `deadline`.
    fn read_frame(&mut self, deadline: Instant) -> Option<Frame> {
        let mut buf = [0u8; FRAME_LEN];
        let mut filled = 0usize;
        let slice = TickType::from(Duration::from_millis(READ_SLICE_MS)).ticks();

        while Instant::now() < deadline {
            let mut byte = [0u8; 1];
            let n = match self.uart.read(&mut byte, slice) {
                Ok(n) => n,
                Err(e) => {
                    log::warn!("UART read error: {}", e);
                    return None;
                }
            };
            if n == 0 {
                continue;
            }

            if filled == 0 && byte[0] != FRAME_START {
                continue; // resync on start byte
            }
            buf[filled] = byte[0];
            filled += 1;

            if filled == FRAME_LEN {
                filled = 0;
                if buf[9] != FRAME_END {
                    continue;
                }
                let sum: u16 = buf[1..7].iter().map(|&b| b as u16).sum();
                let checksum = ((buf[7] as u16) << 8) | buf[8] as u16;
                if checksum != 0u16.wrapping_sub(sum) {
                    log::warn!("frame checksum mismatch, dropping");
                    continue;
                }
                return Some(Frame {
                    cmd: buf[3],
                    param: ((buf[5] as u16) << 8) | buf[6] as u16,
                });
            }
        }
        None
    }

    /// Send a query and wait for the matching reply frame.
    fn query(&mut self, cmd: u8) -> Option<u16> {
        if let Err(e) = self.send(cmd, 0) {
            log::warn!("query 0x{:02X} write failed: {}", cmd, e);
            return None;
        }
        let deadline = Instant::now() + Duration::from_millis(self.timeout_ms as u64);
        while let Some(frame) = self.read_frame(deadline) {
            if frame.cmd == cmd {
                return Some(frame.param);
            }
            // Unsolicited events (track-finished etc.) are interleaved with
            // replies; skip them and keep waiting.
        }
        None
    }
}

impl PlaybackDevice for DfPlayer<'_> {
    fn connect(&mut self) -> anyhow::Result<()> {
        self.send(CMD_RESET, 0)?;
        let deadline = Instant::now() + Duration::from_millis(self.timeout_ms as u64);
        while let Some(frame) = self.read_frame(deadline) {
            match frame.cmd {
                EVT_ONLINE | EVT_CARD_INSERTED => {
                    log::info!("DFPlayer online (storage mask 0x{:02X})", frame.param);
                    return Ok(());
                }
                EVT_ERROR => {
                    anyhow::bail!("module reported error 0x{:02X} during reset", frame.param)
                }
                _ => {} // boot chatter
            }
        }
        anyhow::bail!("no init response from module within {} ms", self.timeout_ms)
    }

    fn configure(&mut self, settings: &PlayerSettings) -> anyhow::Result<()> {
        self.timeout_ms = settings.timeout_ms;
        self.send(CMD_SET_VOLUME, settings.volume as u16)?;
        self.send(CMD_OUTPUT_DEVICE, settings.output as u16)?;
        self.send(CMD_SET_EQ, settings.equalizer as u16)?;
        log::info!(
            "DFPlayer configured: volume {}, output {:?}, EQ {:?}",
            settings.volume,
            settings.output,
            settings.equalizer
        );
        Ok(())
    }

    fn is_busy(&mut self) -> bool {
        // Active LOW: the module pulls the line down while a track sounds.
        self.busy.is_low()
    }

    fn play_next(&mut self) {
        if let Err(e) = self.send(CMD_PLAY_NEXT, 0) {
            log::warn!("play-next command failed: {}", e);
        }
    }

    fn play_index(&mut self, index: u16) {
        // Track numbers are 1-based on the wire.
        if let Err(e) = self.send(CMD_PLAY_TRACK, index + 1) {
            log::warn!("play-track command failed: {}", e);
        }
    }

    fn is_available(&mut self) -> bool {
        self.query(CMD_QUERY_STATUS).is_some()
    }

    fn count_files(&mut self) -> i32 {
        match self.query(CMD_QUERY_SD_FILES) {
            Some(count) => count as i32,
            None => {
                log::warn!("file count query failed, falling back to sequential mode");
                -1
            }
        }
    }
}
