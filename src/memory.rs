/*
 * Copyright 2018 Ian Johnson
 *
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! The Chip-8 address space.

use std::fmt;

use failure::Error;

use display::{HEX_HEIGHT, HEX_SPRITES};
use instruction::Address;
use MEM_SIZE;
use PROG_SIZE;
use PROG_START;

/// The location at which to put the hex digit sprites.
pub const HEX_START: usize = 0x0;

/// An error resulting from an input program being too large.
#[derive(Debug, Fail, PartialEq, Eq)]
#[fail(display = "input program is too large ({} bytes)", _0)]
pub struct ProgramTooLargeError(pub usize);

/// An error resulting from an input program that is not made of whole
/// instructions.
#[derive(Debug, Fail, PartialEq, Eq)]
#[fail(display = "input program has odd length {}", _0)]
pub struct OddLengthProgramError(pub usize);

/// The 4K memory of the Chip-8.
///
/// The hex digit font occupies the bottom 80 bytes and programs are loaded at
/// `PROG_START`.  Nothing prevents a program from overwriting the font.
pub struct Memory {
    cells: [u8; MEM_SIZE],
}

impl Memory {
    /// Returns a zeroed memory with the font loaded.
    pub fn new() -> Self {
        let mut mem = Memory {
            cells: [0; MEM_SIZE],
        };

        // Copy sprites into memory.
        for (i, sprite) in HEX_SPRITES.iter().enumerate() {
            let start = HEX_START + i * HEX_HEIGHT;
            let end = start + sprite.len();
            mem.cells[start..end].copy_from_slice(sprite);
        }

        mem
    }

    /// Checks that `program` can be loaded at `PROG_START`.
    pub fn validate_program(program: &[u8]) -> Result<(), Error> {
        if program.len() > PROG_SIZE {
            Err(ProgramTooLargeError(program.len()))?
        } else if program.len() % 2 != 0 {
            Err(OddLengthProgramError(program.len()))?
        } else {
            Ok(())
        }
    }

    /// Copies the given program into memory at `PROG_START`.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Error> {
        Memory::validate_program(program)?;
        self.cells[PROG_START..PROG_START + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Returns the byte at the given address.
    pub fn get(&self, addr: Address) -> u8 {
        self.cells[addr.addr()]
    }

    /// Sets the byte at the given address.
    pub fn set(&mut self, addr: Address, val: u8) {
        self.cells[addr.addr()] = val;
    }

    /// Returns the two bytes of the instruction at the given address.
    pub fn fetch(&self, addr: Address) -> (u8, u8) {
        (self.get(addr), self.get(addr + 1u16))
    }

    /// Returns a reference to the raw memory contents.
    pub fn bytes(&self) -> &[u8; MEM_SIZE] {
        &self.cells
    }

    /// Returns a mutable reference to the raw memory contents.
    pub fn bytes_mut(&mut self) -> &mut [u8; MEM_SIZE] {
        &mut self.cells
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Memory {{ .. }}")
    }
}

#[cfg(test)]
mod tests {
    use display::HEX_SPRITES;
    use instruction::Address;
    use memory::{Memory, OddLengthProgramError, ProgramTooLargeError};
    use PROG_SIZE;
    use PROG_START;

    #[test]
    fn font_is_loaded() {
        let mem = Memory::new();
        assert_eq!(&mem.bytes()[0..5], &HEX_SPRITES[0]);
        assert_eq!(&mem.bytes()[0x4B..0x50], &HEX_SPRITES[0xF]);
        assert!(mem.bytes()[0x50..].iter().all(|&b| b == 0));
    }

    #[test]
    fn load_program() {
        let mut mem = Memory::new();
        mem.load_program(&[0x12, 0x34, 0x56, 0x78]).unwrap();
        assert_eq!(&mem.bytes()[PROG_START..PROG_START + 4], &[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(mem.fetch(Address::from_usize(PROG_START)), (0x12, 0x34));
    }

    #[test]
    fn load_program_rejects() {
        let mut mem = Memory::new();

        let err = mem.load_program(&[0x00, 0xE0, 0x12]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<OddLengthProgramError>(),
            Some(&OddLengthProgramError(3))
        );

        let big = vec![0u8; PROG_SIZE + 2];
        let err = mem.load_program(&big).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ProgramTooLargeError>(),
            Some(&ProgramTooLargeError(PROG_SIZE + 2))
        );

        // A program filling all of program space is fine.
        mem.load_program(&vec![0xAAu8; PROG_SIZE]).unwrap();
        assert_eq!(mem.bytes()[0xFFF], 0xAA);
    }

    #[test]
    fn fetch_wraps() {
        let mut mem = Memory::new();
        mem.set(Address::new(0xFFF), 0x12);
        assert_eq!(mem.fetch(Address::new(0xFFF)), (0x12, 0xF0));
    }
}
