/*
 * Copyright 2018 Ian Johnson
 *
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! The Chip-8 register file.

use std::num::Wrapping;

use instruction::{Address, Register};
use PROG_START;
use STACK_DEPTH;

/// An error resulting from a misuse of the call stack.
#[derive(Debug, Fail, Clone, Copy, PartialEq, Eq)]
pub enum StackError {
    /// A call was made with all stack slots in use.
    #[fail(display = "call stack overflow")]
    Overflow,
    /// A return was made with no subroutine to return from.
    #[fail(display = "no subroutine to return from")]
    Underflow,
}

/// The subroutine call stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    /// The saved return addresses.
    slots: [Address; STACK_DEPTH],
    /// The number of slots in use.
    sp: u8,
}

impl Stack {
    /// Returns an empty stack.
    pub fn new() -> Self {
        Stack {
            slots: [Address::default(); STACK_DEPTH],
            sp: 0,
        }
    }

    /// Pushes a return address, failing if the stack is full.
    pub fn push(&mut self, addr: Address) -> Result<(), StackError> {
        let sp = self.sp as usize;
        if sp >= STACK_DEPTH {
            return Err(StackError::Overflow);
        }
        self.slots[sp] = addr;
        self.sp += 1;
        Ok(())
    }

    /// Pops the most recent return address, failing if the stack is empty.
    pub fn pop(&mut self) -> Result<Address, StackError> {
        if self.sp == 0 {
            return Err(StackError::Underflow);
        }
        self.sp -= 1;
        Ok(self.slots[self.sp as usize])
    }

    /// Returns the stack pointer (the number of slots in use).
    pub fn sp(&self) -> u8 {
        self.sp
    }

    /// Returns the saved return addresses, oldest first.
    pub fn frames(&self) -> &[Address] {
        &self.slots[..self.sp as usize]
    }
}

impl Default for Stack {
    fn default() -> Self {
        Stack::new()
    }
}

/// The full register state of a Chip-8 CPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    /// The general-purpose registers `V0`-`VF`.
    pub v: [Wrapping<u8>; 16],
    /// The special register `I`.
    pub i: Address,
    /// The program counter.
    pub pc: Address,
    /// The delay timer.
    pub dt: u8,
    /// The sound timer.
    pub st: u8,
    /// The call stack.
    pub stack: Stack,
}

impl Registers {
    /// Returns the register state of a freshly started program.
    pub fn new() -> Self {
        Registers {
            v: [Wrapping(0); 16],
            i: Address::default(),
            pc: Address::from_usize(PROG_START),
            dt: 0,
            st: 0,
            stack: Stack::new(),
        }
    }

    /// Returns the value in the given register.
    pub fn get(&self, reg: Register) -> u8 {
        self.v[reg.index()].0
    }

    /// Sets the given register to the given value.
    pub fn set(&mut self, reg: Register, val: u8) {
        self.v[reg.index()] = Wrapping(val);
    }

    /// Sets the flag register `VF`.
    pub fn set_flag(&mut self, flag: bool) {
        self.set(Register::VF, flag as u8);
    }

    /// Subtracts `ticks` from both timers, stopping at zero.
    pub fn tick_timers(&mut self, ticks: u32) {
        let ticks = if ticks > u8::max_value() as u32 {
            u8::max_value()
        } else {
            ticks as u8
        };
        self.dt = self.dt.saturating_sub(ticks);
        self.st = self.st.saturating_sub(ticks);
    }
}

impl Default for Registers {
    fn default() -> Self {
        Registers::new()
    }
}

#[cfg(test)]
mod tests {
    use instruction::{Address, Register};
    use registers::{Registers, Stack, StackError};
    use PROG_START;
    use STACK_DEPTH;

    #[test]
    fn initial_state() {
        let regs = Registers::new();
        assert_eq!(regs.pc.addr(), PROG_START);
        assert_eq!(regs.stack.sp(), 0);
        assert!(regs.v.iter().all(|v| v.0 == 0));
    }

    #[test]
    fn stack_limits() {
        let mut stack = Stack::new();
        assert_eq!(stack.pop(), Err(StackError::Underflow));

        for i in 0..STACK_DEPTH {
            stack.push(Address::from_usize(0x200 + 2 * i)).unwrap();
        }
        assert_eq!(stack.sp() as usize, STACK_DEPTH);
        assert_eq!(stack.push(Address::new(0x300)), Err(StackError::Overflow));
        // A failed push leaves the stack untouched.
        assert_eq!(stack.sp() as usize, STACK_DEPTH);
        assert_eq!(stack.frames()[0], Address::new(0x200));

        assert_eq!(stack.pop(), Ok(Address::from_usize(0x200 + 2 * (STACK_DEPTH - 1))));
        assert_eq!(stack.sp() as usize, STACK_DEPTH - 1);
    }

    /// Tests that timers saturate at zero for any tick count.
    #[test]
    fn timers_saturate() {
        // Test cases, in the format (dt, st, ticks, dt', st').
        let cases = [
            (10, 0, 1, 9, 0),
            (1, 5, 2, 0, 3),
            (255, 255, 300, 0, 0),
            (0, 0, 0, 0, 0),
        ];
        let mut regs = Registers::new();

        for &(dt, st, ticks, dt2, st2) in cases.iter() {
            let case = (dt, st, ticks);
            regs.dt = dt;
            regs.st = st;
            regs.tick_timers(ticks);
            assert_eq!(regs.dt, dt2, "case {:?}", case);
            assert_eq!(regs.st, st2, "case {:?}", case);
        }
    }

    #[test]
    fn flag_register() {
        let mut regs = Registers::new();
        regs.set_flag(true);
        assert_eq!(regs.get(Register::VF), 1);
        regs.set_flag(false);
        assert_eq!(regs.get(Register::VF), 0);
    }
}
