#![allow(clippy::identity_op)]

pub mod apu;
pub mod bus;
pub mod cart;
pub mod cpu;
pub mod emulator;
pub mod ppu;

pub use apu::{Apu, ChannelSnapshot, Sampler};
pub use bus::{Bus, Button, Interrupt, MemoryType, SaveBacking, Speed, Variant};
pub use cart::{Cartridge, CartridgeInfo, LoadError};
pub use cpu::{Cpu, CpuState, Flags, Registers};
pub use emulator::{EmulationSettings, Emulator, InitErrors};

/// base clock of the console (Hz)
pub const BASE_CLOCK: u32 = 4_194_304;

/// clock ticks per machine cycle
pub const TICKS_PER_MC: u32 = 4;

/// dots the display needs for one full frame
pub const DOTS_PER_FRAME: u32 = 70224;

/// machine cycles per frame in normal speed
pub const MC_PER_FRAME: u32 = DOTS_PER_FRAME / TICKS_PER_MC;

/// display refresh rate
pub const DISPLAY_FREQUENCY: f64 = BASE_CLOCK as f64 / DOTS_PER_FRAME as f64;
