//! glovehub - Sensor Hub Firmware
//!
//! Main firmware binary for the RP2040 hub board of a capacitive sensing
//! glove. The hub polls the taxel sensor nodes listed in `roster.toml` over
//! I2C and streams one frame per reading to the host over UART.
//!
//! Two priority levels share the link buffers: the comm tick runs on an
//! interrupt executor and preempts the sweep loop on the thread executor.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::bind_interrupts;
use embassy_rp::i2c::{self, I2c};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use glovehub_core::comm::Transport;
use glovehub_core::roster::Poller;
use glovehub_hal::{EmbeddedHalBus, I2cConfig, IoLink};

mod channels;
mod config;
mod link;
mod tasks;

use link::UART_BUF_LEN;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

/// UART driver buffers
static TX_BUF: StaticCell<[u8; UART_BUF_LEN]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; UART_BUF_LEN]> = StaticCell::new();

/// Executor for the comm tick, above the thread executor
static EXECUTOR_COMM: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_COMM.on_interrupt()
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("glovehub firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // A bad roster stops the hub instead of polling the wrong addresses
    let Ok(hub) = config::load() else {
        return;
    };

    let poller = match Poller::from_config(&hub) {
        Ok(poller) => poller,
        Err(e) => {
            error!("Roster rejected: {:?}", e);
            return;
        }
    };

    // Host link: UART0 on GPIO0/GPIO1
    let tx_buf = TX_BUF.init([0u8; UART_BUF_LEN]);
    let rx_buf = RX_BUF.init([0u8; UART_BUF_LEN]);
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = link::HOST_BAUDRATE;
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let transport = Transport::new(IoLink::new(link::HostUart::new(uart), link::HOST_PACKET_SIZE));
    info!("UART initialized for host link at {} baud", link::HOST_BAUDRATE);

    // Sensor bus: I2C0 on GPIO4 (SDA) / GPIO5 (SCL)
    let bus_config = I2cConfig::FAST;
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = bus_config.frequency;
    let bus = EmbeddedHalBus::new(I2c::new_blocking(p.I2C0, p.PIN_5, p.PIN_4, i2c_config));
    info!("I2C initialized at {} Hz", bus_config.frequency);

    interrupt::SWI_IRQ_1.set_priority(Priority::P1);
    let comm_spawner = EXECUTOR_COMM.start(interrupt::SWI_IRQ_1);
    comm_spawner
        .spawn(tasks::comm_task(transport, hub.comm_interrupt_hz))
        .unwrap();
    info!("Comm tick running at {} Hz", hub.comm_interrupt_hz);

    spawner
        .spawn(tasks::sweep_task(poller, bus, hub.sweep_delay_ms))
        .unwrap();
    info!("Sweep task spawned");
}
