//! GPIO button input with async debouncing.
//!
//! Buttons are active-low with internal pull-up. Each button is handled by
//! an async task that waits for a GPIO edge, debounces it, and sends a
//! button event carrying the button's key id for both press and release.

use defmt::debug;
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_time::{Duration, Timer};
use hid_state::config::{BUTTON_DEBOUNCE_MS, INPUT_CHANNEL_SIZE};
use hid_state::InputEvent;

/// Run a single button polling loop.
///
/// Waits for the pin to go low (pressed), debounces, sends the press,
/// then does the same for the release.
pub async fn button_task(
    pin: AnyPin,
    key_id: u16,
    tx: &Sender<'static, CriticalSectionRawMutex, InputEvent, INPUT_CHANNEL_SIZE>,
) -> ! {
    let mut btn = Input::new(pin, Pull::Up);

    loop {
        // Wait for falling edge (button press, active-low).
        btn.wait_for_falling_edge().await;

        // Debounce: wait and re-check.
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
        if btn.is_high() {
            continue;
        }

        debug!("Button {=u16:#x} pressed", key_id);
        tx.send(InputEvent::Button {
            key_id,
            pressed: true,
        })
        .await;

        btn.wait_for_high().await;
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;

        debug!("Button {=u16:#x} released", key_id);
        tx.send(InputEvent::Button {
            key_id,
            pressed: false,
        })
        .await;
    }
}
