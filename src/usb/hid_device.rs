//! USB HID composite device - keyboard + mouse.
//!
//! Initialises the Embassy USB stack on the nRF52840 hardware USB
//! peripheral and exposes two HID endpoints.

use defmt::{info, warn};
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_sync::signal::Signal;
use embassy_usb::class::hid::{Config as HidConfig, HidWriter, State};
use embassy_usb::{Builder, Config, UsbDevice};
use hid_state::config::{self, INPUT_CHANNEL_SIZE, OUTPUT_CHANNEL_SIZE};
use hid_state::hid::keyboard::{KEYBOARD_REPORT_DESCRIPTOR, KEYBOARD_REPORT_SIZE};
use hid_state::hid::mouse::{MOUSE_REPORT_DESCRIPTOR, MOUSE_REPORT_SIZE};
use hid_state::{Error, HidReport, InputEvent};
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

/// nRF52840 USB driver with hardware VBUS detection.
pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;

/// Keyboard endpoint writer.
pub type KeyboardWriter = HidWriter<'static, UsbDriver, KEYBOARD_REPORT_SIZE>;
/// Mouse endpoint writer.
pub type MouseWriter = HidWriter<'static, UsbDriver, 8>;

static KB_STATE: StaticCell<State> = StaticCell::new();
static MOUSE_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static USB_BUS_HANDLER: StaticCell<UsbBusHandler> = StaticCell::new();
static USB_CONFIGURED_SIGNAL: Signal<CriticalSectionRawMutex, bool> = Signal::new();
static USB_SUSPEND_SIGNAL: Signal<CriticalSectionRawMutex, bool> = Signal::new();

struct UsbBusHandler;

impl embassy_usb::Handler for UsbBusHandler {
    fn configured(&mut self, configured: bool) {
        USB_CONFIGURED_SIGNAL.signal(configured);
    }

    fn suspended(&mut self, suspended: bool) {
        USB_SUSPEND_SIGNAL.signal(suspended);
    }
}

/// USB bus suspend/resume signal.
///
/// Emits `true` when the host suspends the bus and `false` when resumed.
pub fn suspend_signal() -> &'static Signal<CriticalSectionRawMutex, bool> {
    &USB_SUSPEND_SIGNAL
}

/// Build result containing the USB device runner and the two HID writers.
pub struct UsbHidDevice {
    pub device: UsbDevice<'static, UsbDriver>,
    pub keyboard_writer: KeyboardWriter,
    pub mouse_writer: MouseWriter,
}

/// Initialise the USB stack and create the composite HID device.
///
/// Must be called exactly once.  All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD) -> UsbHidDevice {
    // Create the low-level USB driver with hardware VBUS detection.
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    // USB device-level configuration.
    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        USB_CONFIG_DESC.init([0u8; 256]),
        USB_BOS_DESC.init([0u8; 256]),
        USB_MSOS_DESC.init([0u8; 256]),
        USB_CTRL_BUF.init([0u8; 128]),
    );

    builder.handler(USB_BUS_HANDLER.init(UsbBusHandler));

    let kb_config = HidConfig {
        report_descriptor: KEYBOARD_REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: 8,
    };
    let keyboard_writer = HidWriter::new(&mut builder, KB_STATE.init(State::new()), kb_config);

    let mouse_config = HidConfig {
        report_descriptor: MOUSE_REPORT_DESCRIPTOR,
        request_handler: None,
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: 8,
    };
    let mouse_writer = HidWriter::new(&mut builder, MOUSE_STATE.init(State::new()), mouse_config);

    let device = builder.build();

    info!("USB HID composite device initialised (keyboard + mouse)");

    UsbHidDevice {
        device,
        keyboard_writer,
        mouse_writer,
    }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}

/// Forward host configuration changes to the HID state as subscription
/// events.
pub async fn subscription_task(
    input_tx: &Sender<'static, CriticalSectionRawMutex, InputEvent, INPUT_CHANNEL_SIZE>,
) -> ! {
    let mut enabled = false;

    loop {
        let configured = USB_CONFIGURED_SIGNAL.wait().await;
        if configured == enabled {
            continue;
        }
        enabled = configured;

        info!("USB: reports {}", if enabled { "subscribed" } else { "unsubscribed" });
        input_tx.send(InputEvent::Subscription { enabled }).await;
    }
}

/// Report writer task - writes each produced report to its endpoint and
/// acknowledges it back to the HID state.
///
/// A failed write is still acknowledged, otherwise the HID state would
/// wait for it forever.
pub async fn hid_writer_task(
    mut keyboard: KeyboardWriter,
    mut mouse: MouseWriter,
    report_rx: &Receiver<'static, CriticalSectionRawMutex, HidReport, OUTPUT_CHANNEL_SIZE>,
    input_tx: &Sender<'static, CriticalSectionRawMutex, InputEvent, INPUT_CHANNEL_SIZE>,
) -> ! {
    info!("HID writer task started - waiting for reports");

    let mut buf = [0u8; KEYBOARD_REPORT_SIZE];

    loop {
        let report = report_rx.receive().await;

        let result = match &report {
            HidReport::Keyboard(kb) => {
                let n = kb.serialize(&mut buf);
                keyboard.write(&buf[..n]).await.map_err(|_| Error::Usb)
            }
            HidReport::Mouse(m) => {
                let n = m.serialize(&mut buf[..MOUSE_REPORT_SIZE]);
                mouse.write(&buf[..n]).await.map_err(|_| Error::Usb)
            }
        };

        if let Err(e) = result {
            warn!("USB {} write failed: {}", report.target(), e);
        }

        input_tx.send(InputEvent::ReportSent(report.target())).await;
    }
}
