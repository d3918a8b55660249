use crossbeam_channel::{select, Receiver};
use gbx_core::{Button, Emulator, MemoryType};
use std::io::BufRead;
use std::thread;
use std::time::Duration;

const HELP: &str = "\
commands:
  pause | resume         stop or continue emulation
  debug on|off           single-step mode
  step                   run one instruction (debug mode)
  speed <n>              frames per display interval
  regs                   cpu registers
  dis [n]                disassemble n instructions at PC
  mem <region> <bank> [offset] [len]
                         dump memory (rom0 romn vram ram wram0 wramn oam io hram)
  press | release <button>
                         right left up down a b select start
  info                   cartridge and rates
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Pause,
    Resume,
    Debug(bool),
    Step,
    Speed(u32),
    Regs,
    Disassemble(usize),
    Memory {
        ty: MemoryType,
        bank: usize,
        offset: usize,
        len: usize,
    },
    Press(Button),
    Release(Button),
    Info,
    Quit,
}

fn parse_number(s: &str) -> Result<usize, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix('$')) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| format!("not a number: {}", s))
}

fn parse_button(s: &str) -> Result<Button, String> {
    Ok(match s {
        "right" => Button::Right,
        "left" => Button::Left,
        "up" => Button::Up,
        "down" => Button::Down,
        "a" => Button::A,
        "b" => Button::B,
        "select" => Button::Select,
        "start" => Button::Start,
        _ => return Err(format!("unknown button: {}", s)),
    })
}

fn parse_region(s: &str) -> Result<MemoryType, String> {
    Ok(match s {
        "rom0" => MemoryType::Rom0,
        "romn" => MemoryType::RomN,
        "vram" => MemoryType::Vram,
        "ram" => MemoryType::RamN,
        "wram0" => MemoryType::Wram0,
        "wramn" => MemoryType::WramN,
        "oam" => MemoryType::Oam,
        "io" => MemoryType::Io,
        "hram" => MemoryType::Hram,
        _ => return Err(format!("unknown region: {}", s)),
    })
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, String> {
        let words = line.split_whitespace().collect::<Vec<_>>();
        let arg = |i: usize| words.get(i).copied().ok_or_else(|| "missing argument".to_string());

        Ok(match words.first().copied().unwrap_or("") {
            "help" | "?" => Command::Help,
            "pause" => Command::Pause,
            "resume" | "run" => Command::Resume,
            "debug" => match arg(1)? {
                "on" => Command::Debug(true),
                "off" => Command::Debug(false),
                other => return Err(format!("expected on or off, got {}", other)),
            },
            "step" | "s" => Command::Step,
            "speed" => Command::Speed(parse_number(arg(1)?)? as u32),
            "regs" | "r" => Command::Regs,
            "dis" => Command::Disassemble(match words.get(1) {
                Some(n) => parse_number(n)?,
                None => 8,
            }),
            "mem" => Command::Memory {
                ty: parse_region(arg(1)?)?,
                bank: parse_number(arg(2)?)?,
                offset: words.get(3).map_or(Ok(0), |s| parse_number(s))?,
                len: words.get(4).map_or(Ok(0x100), |s| parse_number(s))?,
            },
            "press" => Command::Press(parse_button(arg(1)?)?),
            "release" => Command::Release(parse_button(arg(1)?)?),
            "info" => Command::Info,
            "quit" | "q" | "exit" => Command::Quit,
            "" => return Err(String::new()),
            other => return Err(format!("unknown command: {}", other)),
        })
    }
}

/// Forwards stdin lines until EOF.
fn spawn_reader() -> Receiver<String> {
    let (sender, receiver) = crossbeam_channel::unbounded();
    let spawned = thread::Builder::new()
        .name("gbx-console".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if sender.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        log::error!("failed to read stdin: {}", e);
                        break;
                    }
                }
            }
        });
    if let Err(e) = spawned {
        log::error!("failed to spawn console reader: {}", e);
    }
    receiver
}

fn dump(data: &[u8], base: usize) {
    for (i, row) in data.chunks(16).enumerate() {
        let bytes = row.iter().map(|b| format!("{:02X}", b)).collect::<Vec<_>>();
        println!("{:04X}: {}", base + i * 16, bytes.join(" "));
    }
}

fn execute(emu: &Emulator, command: Command) {
    match command {
        Command::Help => println!("{}", HELP),
        Command::Pause => emu.set_paused(true),
        Command::Resume => {
            emu.set_debug(false);
            emu.set_paused(false);
        }
        Command::Debug(on) => emu.set_debug(on),
        Command::Step => {
            if emu.debug() {
                emu.step();
                thread::sleep(Duration::from_millis(1));
                let (pc, bank) = emu.pc_and_bank();
                println!("{:02X}:{:04X} {}", bank, pc, emu.registers());
            } else {
                println!("step needs debug mode");
            }
        }
        Command::Speed(n) => emu.set_speed(n),
        Command::Regs => println!("{} {:?}", emu.registers(), emu.cpu_state()),
        Command::Disassemble(n) => {
            for (addr, text) in emu.disassemble(n) {
                println!("{:04X}  {}", addr, text);
            }
        }
        Command::Memory {
            ty,
            bank,
            offset,
            len,
        } => match emu.memory_bank(ty, bank) {
            Some(data) => {
                let start = offset.min(data.len());
                let end = offset.saturating_add(len).min(data.len());
                dump(&data[start..end], start);
            }
            None => println!("{:?} has {} banks", ty, emu.bank_count(ty)),
        },
        Command::Press(button) => emu.press(button),
        Command::Release(button) => emu.release(button),
        Command::Info => {
            let info = emu.info();
            println!(
                "\"{}\" {:?} {:?} | {:.3} MHz {:.2} fps | speed x{}{}{}",
                info.title,
                info.variant,
                info.mbc,
                emu.frequency(),
                emu.framerate(),
                emu.speed(),
                if emu.paused() { " paused" } else { "" },
                if emu.debug() { " debug" } else { "" },
            );
        }
        Command::Quit => {}
    }
}

/// Runs commands from stdin until `quit` or EOF.
pub fn run(emu: &Emulator) {
    let lines = spawn_reader();
    let ticker = crossbeam_channel::tick(Duration::from_secs(5));

    loop {
        select! {
            recv(lines) -> line => {
                let line = match line {
                    Ok(line) => line,
                    Err(_) => break,
                };
                match Command::parse(&line) {
                    Ok(Command::Quit) => break,
                    Ok(command) => execute(emu, command),
                    Err(e) if e.is_empty() => {}
                    Err(e) => println!("{} (try help)", e),
                }
            }
            recv(ticker) -> _ => {
                if !emu.paused() {
                    log::debug!("{:.3} MHz, {:.2} fps", emu.frequency(), emu.framerate());
                }
            }
        }
    }
}
