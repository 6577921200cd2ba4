// MotionPlayer — GPIO Adapters
//
// Thin wrappers mapping the PIR input and the status LED onto the
// controller's capability traits.

use esp_idf_hal::gpio::{AnyInputPin, AnyOutputPin, Input, Output, PinDriver};

use crate::hal::{MotionSensor, StatusIndicator};

/// PIR motion sensor: plain digital input, active HIGH while motion is seen.
pub struct PirSensor<'d> {
    pin: PinDriver<'d, AnyInputPin, Input>,
}

impl<'d> PirSensor<'d> {
    pub fn new(pin: PinDriver<'d, AnyInputPin, Input>) -> Self {
        Self { pin }
    }
}

impl MotionSensor for PirSensor<'_> {
    fn motion_detected(&mut self) -> bool {
        self.pin.is_high()
    }
}

/// Status LED mirroring the playback-busy state.
pub struct StatusLed<'d> {
    pin: PinDriver<'d, AnyOutputPin, Output>,
}

impl<'d> StatusLed<'d> {
    pub fn new(pin: PinDriver<'d, AnyOutputPin, Output>) -> Self {
        Self { pin }
    }
}

impl StatusIndicator for StatusLed<'_> {
    fn set(&mut self, on: bool) {
        let result = if on { self.pin.set_high() } else { self.pin.set_low() };
        if let Err(e) = result {
            log::warn!("LED write failed: {}", e);
        }
    }
}
