use crate::apu::Sampler;
use crate::bus::{Bus, Button, MemoryType, SaveBacking};
use crate::cart::{Cartridge, CartridgeInfo};
use crate::cpu::{self, Cpu, CpuState, Registers};
use crate::{DISPLAY_FREQUENCY, TICKS_PER_MC};
use crossbeam_channel::{Receiver, Sender};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

bitflags::bitflags! {
    /// Subsystems that failed to come up in [`Emulator::start`].
    pub struct InitErrors: u8 {
        const READ_ROM    = 0x01;
        const INIT_HW     = 0x02;
        const INIT_THREAD = 0x04;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmulationSettings {
    /// frames run per display interval
    pub speed: u32,
    /// single-step mode
    pub debug: bool,
    pub paused: bool,
}

impl Default for EmulationSettings {
    fn default() -> Self {
        Self {
            speed: 1,
            debug: false,
            paused: false,
        }
    }
}

type InputSender = Sender<(Button, bool)>;
type InputReceiver = Receiver<(Button, bool)>;

struct Machine {
    cpu: Cpu,
    bus: Bus,
}

struct Shared {
    machine: Mutex<Machine>,

    running: AtomicBool,
    paused: AtomicBool,
    debug: AtomicBool,
    speed: AtomicU32,

    cycles: AtomicU64,
    /// f32 bits, MHz
    frequency: AtomicU32,
    /// f32 bits, frames per second
    framerate: AtomicU32,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Machine> {
        self.machine.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Accumulates cycles and frames and publishes rates once per second.
struct Telemetry {
    since: Instant,
    cycles: u64,
    frames: u64,
}

impl Telemetry {
    fn new() -> Self {
        Self {
            since: Instant::now(),
            cycles: 0,
            frames: 0,
        }
    }

    fn update(&mut self, shared: &Shared, cycles: u32, frames: u64) {
        self.cycles += cycles as u64;
        self.frames += frames;
        shared.cycles.fetch_add(cycles as u64, Ordering::Relaxed);

        let elapsed = self.since.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            let mhz = (self.cycles * TICKS_PER_MC as u64) as f32 / elapsed / 1e6;
            let fps = self.frames as f32 / elapsed;
            shared.frequency.store(mhz.to_bits(), Ordering::Relaxed);
            shared.framerate.store(fps.to_bits(), Ordering::Relaxed);
            *self = Self::new();
        }
    }
}

/// One running cartridge session on its own thread.
pub struct Emulator {
    shared: Arc<Shared>,
    input: InputSender,
    sampler: Option<Sampler>,
    info: CartridgeInfo,
    thread: Option<JoinHandle<()>>,
}

impl Emulator {
    pub fn start(
        rom: Vec<u8>,
        boot_rom: Option<Vec<u8>>,
        backing: Option<Box<dyn SaveBacking>>,
        settings: EmulationSettings,
    ) -> Result<Emulator, InitErrors> {
        let cart = Cartridge::load(rom, boot_rom).map_err(|e| {
            log::error!("failed to load cartridge: {}", e);
            InitErrors::READ_ROM
        })?;
        let info = cart.info().clone();

        let bus = Bus::new(cart, backing).map_err(|e| {
            log::error!("failed to set up memory: {}", e);
            InitErrors::INIT_HW
        })?;
        let cpu = Cpu::new(bus.ctx());
        let sampler = bus.apu().sampler();

        let shared = Arc::new(Shared {
            machine: Mutex::new(Machine { cpu, bus }),

            running: AtomicBool::new(true),
            paused: AtomicBool::new(settings.paused),
            debug: AtomicBool::new(settings.debug),
            speed: AtomicU32::new(settings.speed.max(1)),

            cycles: AtomicU64::new(0),
            frequency: AtomicU32::new(0f32.to_bits()),
            framerate: AtomicU32::new(0f32.to_bits()),
        });

        let (input, receiver) = crossbeam_channel::unbounded();
        let thread = thread::Builder::new()
            .name("gbx-emu".to_string())
            .spawn({
                let shared = shared.clone();
                move || run(shared, receiver)
            })
            .map_err(|e| {
                log::error!("failed to spawn emulation thread: {}", e);
                InitErrors::INIT_THREAD
            })?;

        log::info!("emulation started: {:?}", settings);

        Ok(Emulator {
            shared,
            input,
            sampler: Some(sampler),
            info,
            thread: Some(thread),
        })
    }

    /// Hands out the audio sampler once.
    pub fn take_sampler(&mut self) -> Option<Sampler> {
        self.sampler.take()
    }

    pub fn info(&self) -> &CartridgeInfo {
        &self.info
    }

    pub fn press(&self, button: Button) {
        self.send_input(button, true);
    }

    pub fn release(&self, button: Button) {
        self.send_input(button, false);
    }

    fn send_input(&self, button: Button, pressed: bool) {
        if self.input.send((button, pressed)).is_err() {
            log::warn!("input {:?} dropped, emulation thread is gone", button);
        }
    }

    pub fn paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    pub fn set_paused(&self, paused: bool) {
        self.shared.paused.store(paused, Ordering::Release);
    }

    /// In debug mode runs one instruction, then pauses again.
    pub fn step(&self) {
        if self.debug() {
            self.set_paused(false);
        }
    }

    pub fn debug(&self) -> bool {
        self.shared.debug.load(Ordering::Acquire)
    }

    pub fn set_debug(&self, debug: bool) {
        if debug {
            self.set_paused(true);
        }
        self.shared.debug.store(debug, Ordering::Release);
    }

    pub fn speed(&self) -> u32 {
        self.shared.speed.load(Ordering::Relaxed)
    }

    pub fn set_speed(&self, speed: u32) {
        self.shared.speed.store(speed.max(1), Ordering::Relaxed);
    }

    pub fn running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Emulated clock in MHz over the last second.
    pub fn frequency(&self) -> f32 {
        f32::from_bits(self.shared.frequency.load(Ordering::Relaxed))
    }

    pub fn framerate(&self) -> f32 {
        f32::from_bits(self.shared.framerate.load(Ordering::Relaxed))
    }

    /// M-cycles run since start.
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::Relaxed)
    }

    pub fn registers(&self) -> Registers {
        self.shared.lock().cpu.registers()
    }

    pub fn cpu_state(&self) -> CpuState {
        self.shared.lock().cpu.state()
    }

    pub fn pc_and_bank(&self) -> (u16, usize) {
        let machine = self.shared.lock();
        let pc = machine.cpu.pc();
        (pc, machine.bus.rom_bank_at(pc))
    }

    /// `count` instructions starting at PC.
    pub fn disassemble(&self, count: usize) -> Vec<(u16, String)> {
        let machine = self.shared.lock();
        let mut addr = machine.cpu.pc();
        let mut lines = Vec::with_capacity(count);
        for _ in 0..count {
            let (text, len) = cpu::disassemble(&machine.bus, addr);
            lines.push((addr, text));
            addr = addr.wrapping_add(len);
        }
        lines
    }

    pub fn memory_bank(&self, ty: MemoryType, bank: usize) -> Option<Vec<u8>> {
        self.shared.lock().bus.bank(ty, bank).map(Cow::into_owned)
    }

    pub fn bank_count(&self, ty: MemoryType) -> usize {
        self.shared.lock().bus.bank_count(ty)
    }

    /// Stops the thread and writes back save RAM. Called on drop.
    pub fn shutdown(&mut self) {
        self.shared.running.store(false, Ordering::Release);

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("emulation thread panicked");
            }
            if let Err(e) = self.shared.lock().bus.flush_save() {
                log::error!("failed to write save ram: {}", e);
            }
            log::info!("emulation stopped after {} cycles", self.cycles());
        }
    }
}

impl Drop for Emulator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn apply_inputs(bus: &mut Bus, input: &InputReceiver) {
    while let Ok((button, pressed)) = input.try_recv() {
        bus.set_button(button, pressed);
    }
}

fn run(shared: Arc<Shared>, input: InputReceiver) {
    let interval = Duration::from_secs_f64(1.0 / DISPLAY_FREQUENCY);
    let mut next = Instant::now();
    let mut telemetry = Telemetry::new();

    while shared.running.load(Ordering::Acquire) {
        if shared.paused.load(Ordering::Acquire) {
            thread::yield_now();
            next = Instant::now();
            continue;
        }

        if shared.debug.load(Ordering::Acquire) {
            let mut machine = shared.lock();
            let Machine { cpu, bus } = &mut *machine;
            apply_inputs(bus, &input);
            let cycles = cpu.run_cycle(bus);
            drop(machine);

            telemetry.update(&shared, cycles, 0);
            shared.paused.store(true, Ordering::Release);
            continue;
        }

        let now = Instant::now();
        if now < next {
            std::hint::spin_loop();
            continue;
        }
        next += interval;
        if next < now {
            next = now + interval;
        }

        let speed = shared.speed.load(Ordering::Relaxed);
        let mut machine = shared.lock();
        let Machine { cpu, bus } = &mut *machine;
        apply_inputs(bus, &input);

        let frames = bus.ppu().frames();
        let mut cycles = 0;
        for _ in 0..speed {
            cycles += cpu.run_cycles(bus);
        }
        let frames = bus.ppu().frames() - frames;
        drop(machine);

        telemetry.update(&shared, cycles, frames);
    }

    log::debug!("emulation thread exiting");
}
