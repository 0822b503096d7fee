//! Power management - tracks device activity for battery operation.
//!
//! The HID state emits an activity ping for every accepted input event.
//! Without pings the device steps down to idle and then to low power.
//!
//! nRF52840 power modes:
//! - System ON: Normal operation
//! - System ON Idle: CPU sleeping, peripherals active (~1.5 mA)
//! - System OFF: Deep sleep, wake on GPIO/RTC (~0.3 µA)

use defmt::info;
use embassy_futures::select::{select4, Either4};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Ticker};
use hid_state::config::IDLE_TIMEOUT_SECS;

/// Power state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum PowerState {
    /// Normal operation.
    Active,
    /// No input for a while, host link kept.
    Idle,
    /// Bus suspended, or no input and no host for a long time.
    LowPower,
}

/// Power manager tracks activity and manages sleep modes.
pub struct PowerManager {
    state: PowerState,
    last_activity: Instant,
    subscribed: bool,
    usb_suspended: bool,
}

impl PowerManager {
    /// Create a new power manager.
    pub fn new() -> Self {
        Self {
            state: PowerState::Active,
            last_activity: Instant::now(),
            subscribed: false,
            usb_suspended: false,
        }
    }

    /// Record activity reported by the HID state.
    pub fn activity(&mut self) {
        self.last_activity = Instant::now();
        if self.state != PowerState::Active {
            info!("Power: waking from {:?}", self.state);
            self.state = PowerState::Active;
        }
    }

    /// Update host report subscription state.
    pub fn set_subscribed(&mut self, subscribed: bool) {
        self.subscribed = subscribed;
        if subscribed {
            self.activity();
        }
    }

    /// Update USB suspend state from USB bus events.
    pub fn set_usb_suspended(&mut self, suspended: bool) {
        if self.usb_suspended == suspended {
            return;
        }

        self.usb_suspended = suspended;
        info!("Power: usb_suspended={}", suspended);

        if suspended {
            self.tick();
        } else {
            self.activity();
        }
    }

    /// Periodic tick - call every ~1 second.
    pub fn tick(&mut self) {
        let elapsed = self.last_activity.elapsed().as_secs();
        let new_state = if self.usb_suspended
            || (elapsed > IDLE_TIMEOUT_SECS * 2 && !self.subscribed)
        {
            PowerState::LowPower
        } else if elapsed > IDLE_TIMEOUT_SECS {
            PowerState::Idle
        } else {
            PowerState::Active
        };

        if new_state != self.state {
            info!("Power: {:?} -> {:?}", self.state, new_state);
            self.state = new_state;
        }
    }
}

/// Drive a [`PowerManager`] from activity pings, subscription changes and
/// bus suspend events.
pub async fn power_task(
    activity: &'static Signal<CriticalSectionRawMutex, ()>,
    subscription: &'static Signal<CriticalSectionRawMutex, bool>,
    suspend: &'static Signal<CriticalSectionRawMutex, bool>,
) -> ! {
    let mut power = PowerManager::new();
    let mut ticker = Ticker::every(Duration::from_secs(1));

    loop {
        match select4(
            activity.wait(),
            subscription.wait(),
            suspend.wait(),
            ticker.next(),
        )
        .await
        {
            Either4::First(()) => power.activity(),
            Either4::Second(subscribed) => power.set_subscribed(subscribed),
            Either4::Third(suspended) => power.set_usb_suspended(suspended),
            Either4::Fourth(()) => power.tick(),
        }
    }
}
