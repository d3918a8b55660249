use clap::Parser;
use gbx_core::{EmulationSettings, Emulator, SaveBacking};
use std::fs;
use std::path::{Path, PathBuf};

mod audio;
mod console;
mod save_file;

/// Game Boy / Game Boy Color emulator
#[derive(Parser, Debug)]
#[command(name = "gbx")]
#[command(about = "A Game Boy and Game Boy Color emulator", long_about = None)]
struct Args {
    /// Path to the cartridge ROM
    rom: PathBuf,

    /// Boot ROM to run before the cartridge
    #[arg(long)]
    boot_rom: Option<PathBuf>,

    /// Directory for battery saves
    #[arg(long, default_value = "saves")]
    save_dir: PathBuf,

    /// Frames emulated per display interval
    #[arg(long, default_value_t = 1)]
    speed: u32,

    /// Start in single-step mode
    #[arg(long)]
    debug: bool,

    /// Start paused
    #[arg(long)]
    paused: bool,

    /// Output sample rate, device default when unset
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Run without sound
    #[arg(long)]
    mute: bool,
}

fn read(path: &Path, what: &str) -> Option<Vec<u8>> {
    match fs::read(path) {
        Ok(data) => Some(data),
        Err(e) => {
            log::error!("failed to read {} {}: {}", what, path.display(), e);
            None
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let rom = match read(&args.rom, "rom") {
        Some(rom) => rom,
        None => std::process::exit(1),
    };
    let boot_rom = match args.boot_rom.as_ref() {
        Some(path) => match read(path, "boot rom") {
            Some(data) => Some(data),
            None => std::process::exit(1),
        },
        None => None,
    };

    let save = save_file::SaveFile::new(&args.save_dir, &args.rom);
    log::debug!("save file: {}", save.path().display());
    let backing: Box<dyn SaveBacking> = Box::new(save);

    let settings = EmulationSettings {
        speed: args.speed,
        debug: args.debug,
        paused: args.paused || args.debug,
    };

    let mut emu = match Emulator::start(rom, boot_rom, Some(backing), settings) {
        Ok(emu) => emu,
        Err(errors) => {
            log::error!("failed to start emulation: {:?}", errors);
            std::process::exit(2);
        }
    };

    let _audio = match emu.take_sampler() {
        Some(sampler) if !args.mute => audio::start(sampler, args.sample_rate),
        _ => None,
    };

    println!("type help for commands");
    console::run(&emu);

    emu.shutdown();
}
