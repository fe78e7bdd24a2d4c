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

//! The Chip-8 interpreter.
//!
//! The main focus of this module is the `Interpreter` struct, which contains
//! the state of a Chip-8 CPU and provides the main interface to be used by
//! the host.  The host loads a program, then calls `step` once per tick; each
//! call executes at most one instruction and updates the timers once.
//!
//! The display and keypad are supplied by the host through the
//! `display::Surface` and `input::Keypad` traits.  Several options can be
//! configured using the `Options` struct, such as how the timers are driven
//! and whether to use shift or load quirks mode.

use std::default::Default;
use std::io::Read;
use std::mem;
use std::num::Wrapping;
use std::u8;

use failure::{Error, ResultExt};
use rand;

use dispatch::{InvalidOpcodeError, Table};
use display::{self, Surface, HEX_HEIGHT};
use input::{self, Keypad};
use instruction::{Address, Instruction, Opcode, Operands, Register};
use memory::{Memory, HEX_START};
use registers::Registers;
use timer::{Timer, TimerMode};
use {MEM_SIZE, PROG_SIZE};

/// The maximum number of rows in a sprite.
const MAX_SPRITE_HEIGHT: usize = 15;

/// A condition that stops the interpreter until a new program is loaded.
#[derive(Debug, Fail, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The instruction at the given address is not a Chip-8 instruction.
    #[fail(display = "invalid opcode {} at {}", _0, _1)]
    InvalidOpcode(Opcode, Address),
    /// The `CALL` at the given address found the call stack full.
    #[fail(display = "call stack overflow at {}", _0)]
    StackOverflow(Address),
    /// The `RET` at the given address found the call stack empty.
    #[fail(display = "no subroutine to return from at {}", _0)]
    StackUnderflow(Address),
}

/// The execution state of the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No program is loaded.
    Empty,
    /// Instructions are being executed.
    Running,
    /// An `LD Vx, K` instruction is waiting for a key press to store in the
    /// given register.
    AwaitingKey(Register),
    /// Execution stopped because of the given fault.
    Halted(Fault),
}

/// Options for the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// The rate at which the host calls `step`, in Hz (default 60).
    pub refresh_rate: u32,
    /// How the delay and sound timers are driven (default `HostRate`).
    pub timer_mode: TimerMode,
    /// Whether to enable load quirks mode (default `false`).
    pub load_quirks: bool,
    /// Whether to enable shift quirks mode (default `false`).
    pub shift_quirks: bool,
}

impl Options {
    /// Returns the default set of options.
    pub fn new() -> Self {
        Options {
            refresh_rate: 60,
            timer_mode: TimerMode::HostRate,
            load_quirks: false,
            shift_quirks: false,
        }
    }

    /// Returns a set of options useful for testing (e.g. no timer).
    pub fn testing() -> Self {
        Options {
            timer_mode: TimerMode::Disabled,
            ..Options::new()
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Options::new()
    }
}

/// A Chip-8 interpreter.
///
/// This struct contains the entire state of a Chip-8 CPU and provides all the
/// expected methods for interacting with it, such as loading a program,
/// stepping through execution and inspecting the internal state.
pub struct Interpreter<D = display::Buffer, K = input::State> {
    /// The internal memory.
    mem: Memory,
    /// The registers, timers and call stack.
    regs: Registers,
    /// The opcode dispatch table.
    table: Table,
    /// The display surface.
    display: D,
    /// The input state.
    input: K,
    /// The source of timer ticks.
    timer: Timer,
    /// What the interpreter is doing.
    status: Status,
    /// The loaded program, kept for `reset`.
    program: Vec<u8>,
    /// The options the interpreter was created with.
    options: Options,
}

impl Interpreter {
    /// Returns a new interpreter with the default options.
    pub fn new() -> Self {
        Interpreter::with_options(Options::default())
    }

    /// Returns a new interpreter using the given options.
    pub fn with_options(options: Options) -> Self {
        Interpreter::with_parts(options, display::Buffer::new(), input::State::new())
    }
}

impl<D: Surface, K: Keypad> Interpreter<D, K> {
    /// Returns a new interpreter drawing on `display` and reading `input`.
    ///
    /// No program is loaded; `step` does nothing until one is.
    pub fn with_parts(options: Options, mut display: D, input: K) -> Self {
        display.clear();
        Interpreter {
            mem: Memory::new(),
            regs: Registers::new(),
            table: Table::new(),
            display,
            input,
            timer: Timer::new(options.timer_mode, options.refresh_rate),
            status: Status::Empty,
            program: Vec::new(),
            options,
        }
    }

    /// Loads program data from the specified source.
    ///
    /// See `load_bytes`.
    pub fn load_program<R: Read>(&mut self, input: &mut R) -> Result<(), Error> {
        self.close();
        // One byte past the limit is enough to tell that a program is too
        // large.
        let mut program = Vec::new();
        input
            .take(PROG_SIZE as u64 + 1)
            .read_to_end(&mut program)
            .context("could not read program data")?;
        self.load_bytes(&program)
    }

    /// Loads the given program, replacing any previous one.
    ///
    /// The whole machine is reset to its power-on state first, so this
    /// behaves the same whether or not a program was loaded before.  If the
    /// program is rejected, the interpreter is left with no program loaded.
    pub fn load_bytes(&mut self, program: &[u8]) -> Result<(), Error> {
        self.close();
        self.mem
            .load_program(program)
            .context("could not load program")?;
        self.program = program.to_vec();
        self.status = Status::Running;
        debug!("loaded program of {} bytes", program.len());
        Ok(())
    }

    /// Restarts the loaded program from the beginning.
    ///
    /// If no program is loaded, this only clears the machine state.
    pub fn reset(&mut self) -> Result<(), Error> {
        if self.status == Status::Empty {
            self.close();
            return Ok(());
        }
        let program = mem::replace(&mut self.program, Vec::new());
        debug!("resetting");
        self.load_bytes(&program)
    }

    /// Discards the loaded program and all machine state.
    pub fn close(&mut self) {
        self.mem = Memory::new();
        self.regs = Registers::new();
        self.table = Table::new();
        self.timer = Timer::new(self.options.timer_mode, self.options.refresh_rate);
        self.display.clear();
        self.program.clear();
        self.status = Status::Empty;
    }

    /// Returns a reference to the display.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// Returns a mutable reference to the display.
    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// Returns a reference to the input state.
    pub fn input(&self) -> &K {
        &self.input
    }

    /// Returns a mutable reference to the input state.
    pub fn input_mut(&mut self) -> &mut K {
        &mut self.input
    }

    /// Returns the options the interpreter was created with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Returns the current execution state.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns whether the interpreter has been halted by a fault.
    pub fn halted(&self) -> bool {
        match self.status {
            Status::Halted(_) => true,
            _ => false,
        }
    }

    /// Returns whether a program is loaded.
    pub fn loaded(&self) -> bool {
        self.status != Status::Empty
    }

    /// Returns whether the sound timer is running, meaning the buzzer should
    /// sound.
    pub fn sound_active(&self) -> bool {
        self.regs.st != 0
    }

    /// Returns a reference to the internal memory.
    pub fn mem(&self) -> &[u8; MEM_SIZE] {
        self.mem.bytes()
    }

    /// Returns a mutable reference to the internal memory.
    pub fn mem_mut(&mut self) -> &mut [u8; MEM_SIZE] {
        self.mem.bytes_mut()
    }

    /// Returns a reference to the register file.
    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    /// Returns the value of register `I`.
    pub fn i(&self) -> Address {
        self.regs.i
    }

    /// Sets the value of register `I`.
    pub fn set_i(&mut self, val: Address) {
        self.regs.i = val;
    }

    /// Returns the value of the delay timer.
    pub fn dt(&self) -> u8 {
        self.regs.dt
    }

    /// Sets the value of the delay timer.
    pub fn set_dt(&mut self, val: u8) {
        self.regs.dt = val;
    }

    /// Returns the value of the sound timer.
    pub fn st(&self) -> u8 {
        self.regs.st
    }

    /// Sets the value of the sound timer.
    pub fn set_st(&mut self, val: u8) {
        self.regs.st = val;
    }

    /// Returns the value in the given register.
    pub fn register(&self, reg: Register) -> u8 {
        self.regs.get(reg)
    }

    /// Sets the given register to the given value.
    pub fn set_register(&mut self, reg: Register, val: u8) {
        self.regs.set(reg, val)
    }

    /// Returns the value of the program counter.
    pub fn pc(&self) -> Address {
        self.regs.pc
    }

    /// Returns the call stack pointer.
    pub fn sp(&self) -> u8 {
        self.regs.stack.sp()
    }

    /// Returns the opcode at the program counter.
    pub fn current_opcode(&self) -> Opcode {
        let (high, low) = self.mem.fetch(self.regs.pc);
        Opcode::from_bytes(high, low)
    }

    /// Returns the instruction at the program counter.
    pub fn current_instruction(&self) -> Result<Instruction, InvalidOpcodeError> {
        self.table.resolve(self.current_opcode())
    }

    /// Performs a single execution step.
    ///
    /// If the step faults, the interpreter is halted and the fault is
    /// returned; later steps do nothing until a program is loaded again.
    pub fn step(&mut self) -> Result<(), Error> {
        match self.status {
            Status::Empty | Status::Halted(_) => return Ok(()),
            Status::AwaitingKey(reg) => if let Some(key) = self.input.take_key_down() {
                debug!("got key {:?} for {}", key, reg);
                self.regs.set(reg, key as u8);
                self.regs.pc = self.regs.pc + 2u16;
                self.status = Status::Running;
            },
            Status::Running => {
                let opcode = self.current_opcode();
                if let Err(fault) = self.execute_opcode(opcode) {
                    error!("halting: {}", fault);
                    self.status = Status::Halted(fault);
                    return Err(fault.into());
                }
            }
        }

        self.update_timers();
        Ok(())
    }

    /// Decodes and executes the given opcode as if it were at the program
    /// counter.
    pub fn execute_opcode(&mut self, opcode: Opcode) -> Result<(), Fault> {
        let pc = self.regs.pc;
        let instr = self.table
            .resolve(opcode)
            .map_err(|_| Fault::InvalidOpcode(opcode, pc))?;
        let ops = opcode.operands();
        trace!("{}: {}", pc, instr.with_operands(ops));
        self.execute(instr, ops)
    }

    /// Executes the given instruction in the current interpreter context.
    ///
    /// The interpreter will behave as if the given instruction were executed
    /// at the current program location in memory.
    pub fn execute(&mut self, instr: Instruction, ops: Operands) -> Result<(), Fault> {
        use self::Instruction::*;

        let Operands {
            x,
            y,
            n,
            addr,
            byte,
        } = ops;
        let pc = self.regs.pc;

        match instr {
            // Machine code routines don't exist here.
            Sys => {}
            Cls => self.display.clear(),
            Ret => {
                // Resume after the CALL, via the advance below.
                self.regs.pc = self.regs
                    .stack
                    .pop()
                    .map_err(|_| Fault::StackUnderflow(pc))?;
            }
            Jp => {
                self.jump(addr);
                return Ok(());
            }
            Call => {
                self.regs
                    .stack
                    .push(pc)
                    .map_err(|_| Fault::StackOverflow(pc))?;
                self.jump(addr);
                return Ok(());
            }
            SeByte => {
                let cond = self.register(x) == byte;
                self.skip_if(cond);
                return Ok(());
            }
            SneByte => {
                let cond = self.register(x) != byte;
                self.skip_if(cond);
                return Ok(());
            }
            SeReg => {
                let cond = self.register(x) == self.register(y);
                self.skip_if(cond);
                return Ok(());
            }
            LdByte => self.set_register(x, byte),
            AddByte => self.regs.v[x.index()] += Wrapping(byte),
            LdReg => {
                let r2 = self.register(y);
                self.set_register(x, r2);
            }
            Or => {
                let r1 = self.register(x);
                let r2 = self.register(y);
                self.set_register(x, r1 | r2);
            }
            And => {
                let r1 = self.register(x);
                let r2 = self.register(y);
                self.set_register(x, r1 & r2);
            }
            Xor => {
                let r1 = self.register(x);
                let r2 = self.register(y);
                self.set_register(x, r1 ^ r2);
            }
            AddReg => {
                let r2 = self.register(y);
                self.add(x, r2);
            }
            Sub => {
                let r2 = self.register(y);
                self.sub(x, r2);
            }
            Shr => {
                let src = if self.options.shift_quirks { y } else { x };
                self.shr(x, src);
            }
            Subn => {
                let r2 = self.register(y);
                self.subn(x, r2);
            }
            Shl => {
                let src = if self.options.shift_quirks { y } else { x };
                self.shl(x, src);
            }
            SneReg => {
                let cond = self.register(x) != self.register(y);
                self.skip_if(cond);
                return Ok(());
            }
            LdI => self.regs.i = addr,
            JpV0 => {
                let target = addr + self.register(Register::V0) as u16;
                self.jump(target);
                return Ok(());
            }
            Rnd => self.set_register(x, rand::random::<u8>() & byte),
            Drw => self.drw(x, y, n),
            Skp => {
                let cond = self.key_down(x);
                self.skip_if(cond);
                return Ok(());
            }
            Sknp => {
                let cond = !self.key_down(x);
                self.skip_if(cond);
                return Ok(());
            }
            LdRegDt => {
                let dt = self.dt();
                self.set_register(x, dt);
            }
            LdKey => {
                if self.status == Status::Empty {
                    return Ok(());
                }
                // Only presses made while waiting count.
                self.input.take_key_down();
                debug!("waiting for key press into {}", x);
                self.status = Status::AwaitingKey(x);
                return Ok(());
            }
            LdDtReg => {
                let r = self.register(x);
                self.set_dt(r);
            }
            LdSt => {
                let r = self.register(x);
                self.set_st(r);
            }
            AddI => self.regs.i = self.regs.i + self.register(x) as u16,
            LdF => {
                let r = self.register(x) as usize;
                self.regs.i = Address::from_usize(HEX_START + HEX_HEIGHT * r);
            }
            LdB => self.ld_b(x),
            LdDerefIReg => self.ld_deref_i_reg(x),
            LdRegDerefI => self.ld_reg_deref_i(x),
        }

        self.regs.pc = self.regs.pc + 2u16;
        Ok(())
    }

    /// Sets the program counter to the given address.
    fn jump(&mut self, addr: Address) {
        if !addr.is_aligned() {
            warn!("jump from {} to misaligned address {}", self.regs.pc, addr);
        }
        self.regs.pc = addr;
    }

    /// Advances the program counter past the next instruction if `cond`
    /// holds, or to the next instruction otherwise.
    fn skip_if(&mut self, cond: bool) {
        self.regs.pc = self.regs.pc + if cond { 4u16 } else { 2u16 };
    }

    /// Returns whether the key named by the given register is held down.
    fn key_down(&self, reg: Register) -> bool {
        let want = self.register(reg);
        self.input.is_pressed() && self.input.current_key().map(|k| k as u8) == Some(want)
    }

    /// Adds the given byte to the given register, setting `VF` to 1 on carry
    /// or 0 otherwise.
    fn add(&mut self, reg: Register, val: u8) {
        let carry = val > u8::MAX - self.register(reg);
        self.regs.v[reg.index()] += Wrapping(val);
        self.regs.set_flag(carry);
    }

    /// Subtracts the given byte from the given register, setting `VF` to 0 on
    /// borrow or 1 otherwise.
    fn sub(&mut self, reg: Register, val: u8) {
        let borrow = val > self.register(reg);
        self.regs.v[reg.index()] -= Wrapping(val);
        self.regs.set_flag(!borrow);
    }

    /// Sets `reg` to `val - reg`, setting `VF` to 0 on borrow or 1 otherwise.
    fn subn(&mut self, reg: Register, val: u8) {
        let borrow = self.register(reg) > val;
        self.regs.v[reg.index()] = Wrapping(val) - self.regs.v[reg.index()];
        self.regs.set_flag(!borrow);
    }

    /// Sets `reg1` to `reg2 << 1`, setting `VF` to the old highest bit.
    fn shl(&mut self, reg1: Register, reg2: Register) {
        let r2 = self.register(reg2);
        self.set_register(reg1, r2 << 1);
        self.regs.set_flag(r2 & 0x80 != 0);
    }

    /// Sets `reg1` to `reg2 >> 1`, setting `VF` to the old lowest bit.
    fn shr(&mut self, reg1: Register, reg2: Register) {
        let r2 = self.register(reg2);
        self.set_register(reg1, r2 >> 1);
        self.regs.set_flag(r2 & 1 != 0);
    }

    /// Implements the `DRW` operation.
    fn drw(&mut self, reg1: Register, reg2: Register, n: u8) {
        let rows = n as usize;
        let mut sprite = [0u8; MAX_SPRITE_HEIGHT];
        for (j, row) in sprite.iter_mut().take(rows).enumerate() {
            *row = self.mem.get(self.regs.i + j);
        }
        let x = self.register(reg1) as usize;
        let y = self.register(reg2) as usize;

        let collision = display::draw_sprite(&mut self.display, &sprite[..rows], x, y);
        self.regs.set_flag(collision);
    }

    /// Implements the `LD B, Vx` operation.
    fn ld_b(&mut self, reg: Register) {
        let val = self.register(reg);
        let addr = self.regs.i;

        self.mem.set(addr, val / 100);
        self.mem.set(addr + 1u16, val % 100 / 10);
        self.mem.set(addr + 2u16, val % 10);
    }

    /// Implements the `LD [I], Vx` operation.
    ///
    /// Registers `V0` through `Vx` inclusive are stored.
    fn ld_deref_i_reg(&mut self, reg: Register) {
        let count = reg.index() + 1;
        let start = self.regs.i;

        for k in 0..count {
            self.mem.set(start + k, self.regs.v[k].0);
        }
        if self.options.load_quirks {
            self.regs.i = start + count;
        }
    }

    /// Implements the `LD Vx, [I]` operation.
    ///
    /// Registers `V0` through `Vx` inclusive are loaded.
    fn ld_reg_deref_i(&mut self, reg: Register) {
        let count = reg.index() + 1;
        let start = self.regs.i;

        for k in 0..count {
            self.regs.v[k] = Wrapping(self.mem.get(start + k));
        }
        if self.options.load_quirks {
            self.regs.i = start + count;
        }
    }

    /// Updates the `DT` and `ST` registers from the timer.
    fn update_timers(&mut self) {
        let ticks = self.timer.lap();
        self.regs.tick_timers(ticks);
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}
