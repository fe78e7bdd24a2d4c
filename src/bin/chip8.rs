// Copyright 2018 Ian Johnson

// This file is part of Chip-8.

// Chip-8 is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Chip-8 is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Chip-8.  If not, see <http://www.gnu.org/licenses/>.

//! The `chip8` binary program.
//!
//! This is a headless host: it runs a program for a fixed number of steps,
//! optionally feeding it scripted key presses, and then prints the display
//! and the register state.  It is mostly useful for testing programs and for
//! watching execution with `-vvv`.

extern crate chip8_core;
extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

use std::fs::File;
use std::io::Write;
use std::process;
use std::thread;
use std::time::Duration;

use clap::{App, Arg, ArgMatches};
use failure::{Error, ResultExt};
use log::LevelFilter;

use chip8_core::input::Key;
use chip8_core::interpreter::{Interpreter, Options, Status};
use chip8_core::{Register, TimerMode};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A key press scheduled for a particular step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KeyEvent {
    /// The step at which the key goes down.
    step: u64,
    /// The key to press.
    key: Key,
    /// How many steps the key stays down.
    hold: u64,
}

impl KeyEvent {
    /// Parses a key event of the form `STEP:KEY` or `STEP:KEY:HOLD`, where
    /// `KEY` is a hex digit.
    fn parse(s: &str) -> Result<Self, Error> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(format_err!("expected STEP:KEY[:HOLD], got '{}'", s));
        }
        let step = parts[0]
            .parse::<u64>()
            .with_context(|_| format!("invalid step in key event '{}'", s))?;
        let mut chars = parts[1].chars();
        let key = match (chars.next().and_then(Key::from_digit), chars.next()) {
            (Some(key), None) => key,
            _ => return Err(format_err!("invalid key in key event '{}'", s)),
        };
        let hold = match parts.get(2) {
            Some(hold) => hold.parse::<u64>()
                .with_context(|_| format!("invalid hold time in key event '{}'", s))?,
            None => 1,
        };

        Ok(KeyEvent { step, key, hold })
    }
}

fn main() {
    let matches = App::new("chip8")
        .version(VERSION)
        .author("Ian Johnson <ianprime0509@gmail.com>")
        .about("Runs a Chip-8 program without a window")
        .help_message("show this help message and exit")
        .version_message("show version information and exit")
        .arg(
            Arg::with_name("refresh-rate")
                .short("r")
                .long("refresh-rate")
                .value_name("FREQ")
                .help("set the host step rate (in Hz)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("wall-clock")
                .short("w")
                .long("wall-clock")
                .help("drive the timers from the system clock"),
        )
        .arg(
            Arg::with_name("load-quirks")
                .short("l")
                .long("load-quirks")
                .help("enable load quirks mode"),
        )
        .arg(
            Arg::with_name("shift-quirks")
                .short("q")
                .long("shift-quirks")
                .help("enable shift quirks mode"),
        )
        .arg(
            Arg::with_name("steps")
                .short("n")
                .long("steps")
                .value_name("N")
                .help("set the number of steps to run (default 600)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("realtime")
                .long("realtime")
                .help("sleep between steps to match the refresh rate"),
        )
        .arg(
            Arg::with_name("key")
                .short("k")
                .long("key")
                .value_name("STEP:KEY[:HOLD]")
                .help("press a hex key at the given step")
                .takes_value(true)
                .multiple(true)
                .number_of_values(1),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("increase verbosity"),
        )
        .arg(
            Arg::with_name("FILE")
                .help("set the program file to run")
                .required(true)
                .index(1),
        )
        .get_matches();

    let verbosity = matches.occurrences_of("verbose");
    let filter = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter(None, filter)
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .init();

    if let Err(e) = run(&matches) {
        error!("{}", e);
        for cause in e.causes().skip(1) {
            info!("caused by: {}", cause);
        }
        trace!("backtrace: {}", e.backtrace());
        process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let opts = process_opts(matches)?;
    let steps = matches
        .value_of("steps")
        .map(|n| n.parse::<u64>())
        .unwrap_or(Ok(600))
        .context("invalid steps argument")?;
    let mut events = match matches.values_of("key") {
        Some(values) => values.map(KeyEvent::parse).collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };
    events.sort_by_key(|e| e.step);
    let frame = if matches.is_present("realtime") && opts.refresh_rate > 0 {
        Some(Duration::from_nanos(1_000_000_000 / opts.refresh_rate as u64))
    } else {
        None
    };

    let filename = matches.value_of("FILE").unwrap();
    let mut input =
        File::open(filename).with_context(|_| format!("could not open file '{}'", filename))?;
    let mut interpreter = Interpreter::with_options(opts);
    interpreter
        .load_program(&mut input)
        .with_context(|_| format!("could not load program from file '{}'", filename))?;

    let mut pending = events.iter().peekable();
    let mut held: Option<(Key, u64)> = None;
    let mut fault = None;
    for step in 0..steps {
        if let Some((key, until)) = held {
            if step >= until {
                interpreter.input_mut().release(key);
                held = None;
            }
        }
        while pending.peek().map_or(false, |e| e.step <= step) {
            let event = pending.next().unwrap();
            debug!("pressing {:?} at step {}", event.key, step);
            interpreter.input_mut().press(event.key);
            held = Some((event.key, step + event.hold));
        }

        // The fault is reported after the final state has been printed.
        if let Err(e) = interpreter.step() {
            fault = Some(e);
            break;
        }
        if let Some(frame) = frame {
            thread::sleep(frame);
        }
    }

    print!("{}", interpreter.display());
    dump_state(&interpreter);
    match fault {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Prints the register state of the interpreter.
fn dump_state(interpreter: &Interpreter) {
    let regs: Vec<String> = (0..16)
        .map(|n| {
            let reg = Register::from_nibble(n);
            format!("{}={:02X}", reg, interpreter.register(reg))
        })
        .collect();
    println!("{}", regs.join(" "));
    println!(
        "PC={} I={} SP={} DT={} ST={}",
        interpreter.pc(),
        interpreter.i(),
        interpreter.sp(),
        interpreter.dt(),
        interpreter.st()
    );
    match interpreter.status() {
        Status::AwaitingKey(reg) => println!("waiting for a key press into {}", reg),
        Status::Halted(fault) => println!("halted: {}", fault),
        _ => match interpreter.current_instruction() {
            Ok(instr) => {
                let opcode = interpreter.current_opcode();
                println!("next: {}", instr.with_operands(opcode.operands()));
            }
            Err(e) => println!("next: {}", e),
        },
    }
}

/// Builds the interpreter options from the command-line arguments.
fn process_opts(matches: &ArgMatches) -> Result<Options, Error> {
    let mut opts = Options::new();
    if let Some(freq) = matches.value_of("refresh-rate") {
        opts.refresh_rate = freq.parse::<u32>().context("invalid refresh rate argument")?;
    }
    if matches.is_present("wall-clock") {
        opts.timer_mode = TimerMode::WallClock;
    }
    if matches.is_present("load-quirks") {
        opts.load_quirks = true;
    }
    if matches.is_present("shift-quirks") {
        opts.shift_quirks = true;
    }

    Ok(opts)
}

#[cfg(test)]
mod tests {
    use super::KeyEvent;
    use chip8_core::input::Key;

    #[test]
    fn parse_key_events() {
        assert_eq!(
            KeyEvent::parse("10:a").unwrap(),
            KeyEvent {
                step: 10,
                key: Key::KA,
                hold: 1,
            }
        );
        assert_eq!(
            KeyEvent::parse("0:3:20").unwrap(),
            KeyEvent {
                step: 0,
                key: Key::K3,
                hold: 20,
            }
        );
        assert!(KeyEvent::parse("x:3").is_err());
        assert!(KeyEvent::parse("1:33").is_err());
        assert!(KeyEvent::parse("1").is_err());
    }
}
