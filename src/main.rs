// MotionPlayer — Firmware Entry Point
//
// Boot sequence:
//   1. Configure LED output, PIR input, BUSY input (pull-up), debug strap.
//   2. Read the debug strap once: LOW silences diagnostics.
//   3. Open the DFPlayer UART and seed the RNG from ADC noise.
//   4. Run controller init (handshake, configure, readiness poll, file
//      enumeration).  Any failure is terminal: fast LED blink forever.
//   5. Enter the fixed-period control loop; it never returns.

#[cfg(target_os = "espidf")]
mod firmware {
    use esp_idf_hal::gpio::{AnyIOPin, InputPin, OutputPin, PinDriver};
    use esp_idf_hal::prelude::*;
    use esp_idf_hal::uart::UartDriver;
    use esp_idf_hal::units::Hertz;

    use motionplayer::config::*;
    use motionplayer::controller::PlaybackController;
    use motionplayer::drivers::dfplayer::DfPlayer;
    use motionplayer::drivers::gpio::{PirSensor, StatusLed};
    use motionplayer::hal::{EntropyRng, StrapDiagnostics, SystemClock};

    pub fn main() -> anyhow::Result<()> {
        // Link esp-idf-sys runtime patches and initialise logging.
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();
        log::info!("MotionPlayer firmware starting…");

        // ---- Peripherals --------------------------------------------------
        let peripherals = Peripherals::take()?;

        let led = PinDriver::output(peripherals.pins.gpio4.downgrade_output())?;
        let pir = PinDriver::input(peripherals.pins.gpio3.downgrade_input())?;

        // Debug strap — one-time static read, LOW disables diagnostics.
        let strap = PinDriver::input(peripherals.pins.gpio5.downgrade_input())?;
        let debug_enabled = strap.is_high();
        log::info!(
            "diagnostics {}",
            if debug_enabled { "enabled" } else { "disabled" }
        );
        drop(strap);

        // BUSY line (active LOW) needs the internal pull-up.
        let busy = PinDriver::input(peripherals.pins.gpio8.downgrade_input())?;
        configure_pullup(PIN_BUSY);

        // ---- DFPlayer UART ------------------------------------------------
        let uart_config =
            esp_idf_hal::uart::config::Config::new().baudrate(Hertz(PLAYER_BAUD_RATE));
        let uart = UartDriver::new(
            peripherals.uart1,
            peripherals.pins.gpio21, // TX -> player RX
            peripherals.pins.gpio20, // RX <- player TX
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &uart_config,
        )?;

        // ---- RNG seed from hardware noise ---------------------------------
        let seed = read_noise_seed();

        // ---- Controller ---------------------------------------------------
        let mut controller = PlaybackController::new(
            DfPlayer::new(uart, busy),
            PirSensor::new(pir),
            StatusLed::new(led),
            StrapDiagnostics::new(debug_enabled),
            EntropyRng::from_seed(seed),
            SystemClock::new(),
        );

        if let Err(e) = controller.init() {
            log::error!("initialization failed: {e} — entering fail-stop state");
            controller.fail_stop();
        }

        log::info!("Boot complete — entering control loop");
        controller.run()
    }

    /// Enable the internal pull-up on a pin via the raw API (the PinDriver
    /// was created from a downgraded pin, so the typed pull API is not
    /// available).
    fn configure_pullup(pin: i32) {
        unsafe {
            esp_idf_sys::gpio_set_pull_mode(
                pin,
                esp_idf_sys::gpio_pull_mode_t_GPIO_PULLUP_ONLY,
            );
        }
    }

    /// Fold a handful of raw ADC reads from a floating pin into a 64-bit
    /// seed.  GPIO2 / ADC1 channel 2 with 11 dB attenuation, same oneshot
    /// setup as any other ADC user on this chip.
    fn read_noise_seed() -> u64 {
        unsafe {
            let mut handle: esp_idf_sys::adc_oneshot_unit_handle_t = core::ptr::null_mut();
            let unit_cfg = esp_idf_sys::adc_oneshot_unit_init_cfg_t {
                unit_id: esp_idf_sys::adc_unit_t_ADC_UNIT_1,
                ulp_mode: esp_idf_sys::adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..core::mem::zeroed()
            };
            let mut seed = esp_idf_sys::esp_timer_get_time() as u64;

            let ret = esp_idf_sys::adc_oneshot_new_unit(&unit_cfg, &mut handle);
            if ret != esp_idf_sys::ESP_OK {
                log::warn!("ADC unit init failed ({}) — seeding from timer only", ret);
                return seed;
            }

            let chan_cfg = esp_idf_sys::adc_oneshot_chan_cfg_t {
                atten: esp_idf_sys::adc_atten_t_ADC_ATTEN_DB_11,
                bitwidth: esp_idf_sys::adc_bitwidth_t_ADC_BITWIDTH_12,
            };
            let channel = esp_idf_sys::adc_channel_t_ADC_CHANNEL_2; // GPIO2
            let ret = esp_idf_sys::adc_oneshot_config_channel(handle, channel, &chan_cfg);
            if ret != esp_idf_sys::ESP_OK {
                log::warn!("ADC channel config failed ({})", ret);
            }

            for _ in 0..NOISE_SEED_SAMPLES {
                let mut raw: i32 = 0;
                if esp_idf_sys::adc_oneshot_read(handle, channel, &mut raw)
                    == esp_idf_sys::ESP_OK
                {
                    seed = seed.rotate_left(5) ^ raw as u64;
                }
            }
            let _ = esp_idf_sys::adc_oneshot_del_unit(handle);
            seed
        }
    }
}

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::main()
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    // The hardware entry point only exists on the chip; host builds carry
    // the library and its tests.
    eprintln!("motionplayer must be built for an ESP-IDF target");
}
