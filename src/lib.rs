/*
 * Copyright 2018 Ian Johnson
 *
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! The core of a Chip-8 virtual machine.
//!
//! The crate models the CPU only: memory, registers, instruction decoding and
//! execution, and the delay/sound timers.  Rendering and input devices are
//! abstracted behind the `display::Surface` and `input::Keypad` traits, and
//! simple reference implementations of both are provided.

#[macro_use]
extern crate enum_primitive;
extern crate failure;
#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;
#[cfg(test)]
#[macro_use]
extern crate maplit;
extern crate num;
extern crate rand;
extern crate time;

/// The size of the Chip-8's memory, in bytes.
pub const MEM_SIZE: usize = 0x1000;
/// The address where programs should be loaded.
pub const PROG_START: usize = 0x200;
/// The maximum size of a Chip-8 program, in bytes.
pub const PROG_SIZE: usize = MEM_SIZE - PROG_START;
/// The number of return addresses the call stack can hold.
pub const STACK_DEPTH: usize = 16;

pub mod dispatch;
pub mod display;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod registers;
mod timer;

pub use instruction::{Address, Instruction, Opcode, Operands, Register};
pub use interpreter::{Fault, Interpreter, Options, Status};
pub use timer::TimerMode;
