//! hid-state firmware - nRF52840 keyboard/mouse over USB.
//!
//! Task layout:
//!
//! ```text
//!  buttons ─┐                        ┌─> reports ──> hid_writer ──┐
//!           ├─> input events ─> hid_state                         │
//!  usb bus ─┘        ^               └─> activity ──> power       │
//!                    └──────────── report sent ───────────────────┘
//! ```
//!
//! Every input event is handled to completion by the single `hid_state`
//! task before the next one is received.

#![no_std]
#![no_main]

mod input;
mod power;
mod usb;

use defmt::{info, unwrap, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_nrf::gpio::{AnyPin, Pin};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_sync::signal::Signal;
use embassy_time::Instant;
use hid_state::config::{DEFAULT_KEYMAP, INPUT_CHANNEL_SIZE, OUTPUT_CHANNEL_SIZE};
use hid_state::{EventSink, HidReport, HidState, InputEvent, Keymap, OutputEvent};
use panic_probe as _;

static INPUT_EVENTS: Channel<CriticalSectionRawMutex, InputEvent, INPUT_CHANNEL_SIZE> =
    Channel::new();
static REPORTS: Channel<CriticalSectionRawMutex, HidReport, OUTPUT_CHANNEL_SIZE> = Channel::new();
static ACTIVITY: Signal<CriticalSectionRawMutex, ()> = Signal::new();
static SUBSCRIPTION: Signal<CriticalSectionRawMutex, bool> = Signal::new();

type InputSender = Sender<'static, CriticalSectionRawMutex, InputEvent, INPUT_CHANNEL_SIZE>;

/// Hands produced events to the writer and power tasks without blocking.
struct ChannelSink;

impl EventSink for ChannelSink {
    fn submit(&mut self, event: OutputEvent) {
        match event {
            OutputEvent::Report(report) => {
                if REPORTS.try_send(report).is_err() {
                    warn!("Report channel full, {} report dropped", report.target());
                }
            }
            OutputEvent::ActivityPing => ACTIVITY.signal(()),
        }
    }
}

fn now_ms() -> u32 {
    // Wraps after ~49 days; queue ages use wrapping arithmetic.
    Instant::now().as_millis() as u32
}

#[embassy_executor::task]
async fn hid_state_task(mut hid_state: HidState) -> ! {
    let rx = INPUT_EVENTS.receiver();
    let mut sink = ChannelSink;

    hid_state.handle(InputEvent::Ready, now_ms(), &mut sink);

    loop {
        let event = rx.receive().await;
        if let InputEvent::Subscription { enabled } = event {
            SUBSCRIPTION.signal(enabled);
        }
        hid_state.handle(event, now_ms(), &mut sink);
    }
}

#[embassy_executor::task]
async fn usb_device_task(
    device: embassy_usb::UsbDevice<'static, usb::hid_device::UsbDriver>,
) -> ! {
    usb::hid_device::run_usb_device(device).await
}

#[embassy_executor::task]
async fn hid_writer_task(
    keyboard: usb::hid_device::KeyboardWriter,
    mouse: usb::hid_device::MouseWriter,
) -> ! {
    let rx: Receiver<'static, CriticalSectionRawMutex, HidReport, OUTPUT_CHANNEL_SIZE> =
        REPORTS.receiver();
    let tx: InputSender = INPUT_EVENTS.sender();
    usb::hid_device::hid_writer_task(keyboard, mouse, &rx, &tx).await
}

#[embassy_executor::task]
async fn subscription_task() -> ! {
    let tx: InputSender = INPUT_EVENTS.sender();
    usb::hid_device::subscription_task(&tx).await
}

#[embassy_executor::task(pool_size = 4)]
async fn button_task(pin: AnyPin, key_id: u16) -> ! {
    let tx: InputSender = INPUT_EVENTS.sender();
    input::buttons::button_task(pin, key_id, &tx).await
}

#[embassy_executor::task]
async fn power_task() -> ! {
    power::power_task(&ACTIVITY, &SUBSCRIPTION, usb::hid_device::suspend_signal()).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("hid-state starting");
    let p = embassy_nrf::init(Default::default());

    let keymap = match Keymap::new(DEFAULT_KEYMAP) {
        Ok(keymap) => keymap,
        Err(e) => defmt::panic!("Invalid keymap: {}", e),
    };
    info!("Keymap loaded, {} keys", keymap.len());

    let usb = usb::hid_device::init(p.USBD);

    unwrap!(spawner.spawn(hid_state_task(HidState::new(keymap))));
    unwrap!(spawner.spawn(usb_device_task(usb.device)));
    unwrap!(spawner.spawn(hid_writer_task(usb.keyboard_writer, usb.mouse_writer)));
    unwrap!(spawner.spawn(subscription_task()));
    unwrap!(spawner.spawn(power_task()));

    // nRF52840-DK buttons, key ids as listed in `config`.
    unwrap!(spawner.spawn(button_task(p.P0_11.degrade(), 0x0001)));
    unwrap!(spawner.spawn(button_task(p.P0_12.degrade(), 0x0002)));
    unwrap!(spawner.spawn(button_task(p.P0_24.degrade(), 0x0004)));
    unwrap!(spawner.spawn(button_task(p.P0_25.degrade(), 0x0005)));

    info!("All tasks spawned");
}
