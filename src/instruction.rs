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

//! Chip-8 instructions and opcodes.
//!
//! This module provides the basic types for working with raw instructions:
//! the `Opcode` wrapper around the two instruction bytes, the `Operands`
//! decoded from them, and the `Instruction` identifiers that the dispatcher
//! resolves opcodes to.  Keeping the identity of an instruction separate from
//! its operands means the dispatch table only has to store small `Copy`
//! values, and every handler receives its operands in the same shape.

use std::fmt;
use std::ops::Add;

use num::FromPrimitive;

use MEM_SIZE;

/// The mask applied to every address to keep it within memory.
const ADDR_MASK: u16 = (MEM_SIZE - 1) as u16;

enum_from_primitive! {
/// A Chip-8 register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    V0 = 0,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
    VA,
    VB,
    VC,
    VD,
    VE,
    VF,
}
}

impl Register {
    /// Returns the register named by the lowest four bits of the given byte.
    pub fn from_nibble(n: u8) -> Register {
        // Sixteen variants cover every 4-bit value.
        Register::from_u8(n & 0xF).unwrap()
    }

    /// Returns the index of the register in the register file.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", *self)
    }
}

/// An address pointing to a Chip-8 memory location.
///
/// Addresses are 12 bits wide.  Every way of producing an `Address` masks the
/// value into the addressable range, so arithmetic on addresses wraps around
/// the end of memory rather than failing.
///
/// # Examples
///
/// ```
/// use chip8_core::Address;
///
/// let addr = Address::new(0x204);
/// assert_eq!(addr.addr(), 0x204);
/// assert_eq!((Address::new(0xFFF) + 2u16).addr(), 0x001);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u16);

impl Address {
    /// Returns the address corresponding to the lowest 12 bits of `addr`.
    pub fn new(addr: u16) -> Self {
        Address(addr & ADDR_MASK)
    }

    /// Returns the address corresponding to the lowest 12 bits of `addr`.
    pub fn from_usize(addr: usize) -> Self {
        Address::new((addr & ADDR_MASK as usize) as u16)
    }

    /// Returns the value of the address as an index into memory.
    pub fn addr(&self) -> usize {
        self.0 as usize
    }

    /// Returns whether the address lies on a 2-byte boundary.
    pub fn is_aligned(&self) -> bool {
        self.0 & 1 == 0
    }
}

impl Add<u16> for Address {
    type Output = Address;

    fn add(self, rhs: u16) -> Address {
        Address::new(self.0.wrapping_add(rhs))
    }
}

impl Add<usize> for Address {
    type Output = Address;

    fn add(self, rhs: usize) -> Address {
        Address::from_usize(self.addr().wrapping_add(rhs))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{:03X}", self.0)
    }
}

/// A Chip-8 opcode.
///
/// Having this as a wrapper around an ordinary `u16` allows for some nice
/// helper methods to be implemented, which make decoding opcodes much easier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(pub u16);

impl Opcode {
    /// Returns the opcode made of the given upper and lower bytes.
    pub fn from_bytes(high: u8, low: u8) -> Self {
        Opcode((high as u16) << 8 | low as u16)
    }

    /// Returns the upper byte of the opcode.
    pub fn high(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Returns the lower byte of the opcode.
    pub fn low(&self) -> u8 {
        self.0 as u8
    }

    /// Splits the opcode into the operands every handler receives.
    pub fn operands(&self) -> Operands {
        Operands::decode(self.high(), self.low())
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{:04X}", self.0)
    }
}

/// The operand fields of an instruction.
///
/// These are decoded once per instruction, before dispatch, and handed
/// uniformly to every handler.  None of them is guaranteed to be meaningful
/// for a particular instruction; each handler uses only the ones it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operands {
    /// The low nibble of the upper byte.
    pub x: Register,
    /// The high nibble of the lower byte.
    pub y: Register,
    /// The low nibble of the lower byte.
    pub n: u8,
    /// The 12-bit immediate formed from `x` and the lower byte.
    pub addr: Address,
    /// The lower byte.
    pub byte: u8,
}

impl Operands {
    /// Decodes the operand fields from the raw instruction bytes.
    pub fn decode(high: u8, low: u8) -> Self {
        Operands {
            x: Register::from_nibble(high),
            y: Register::from_nibble(low >> 4),
            n: low & 0xF,
            addr: Address::new(((high as u16 & 0xF) << 8) | low as u16),
            byte: low,
        }
    }
}

/// The identity of a Chip-8 instruction.
///
/// This is what the dispatch table maps opcodes to; the operands travel
/// separately in an `Operands` value.  The mnemonics follow Cowgod's
/// reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// `SYS addr` (`0nnn`).
    Sys,
    /// `CLS` (`00E0`).
    Cls,
    /// `RET` (`00EE`).
    Ret,
    /// `JP addr` (`1nnn`).
    Jp,
    /// `CALL addr` (`2nnn`).
    Call,
    /// `SE Vx, byte` (`3xkk`).
    SeByte,
    /// `SNE Vx, byte` (`4xkk`).
    SneByte,
    /// `SE Vx, Vy` (`5xy0`).
    SeReg,
    /// `LD Vx, byte` (`6xkk`).
    LdByte,
    /// `ADD Vx, byte` (`7xkk`).
    AddByte,
    /// `LD Vx, Vy` (`8xy0`).
    LdReg,
    /// `OR Vx, Vy` (`8xy1`).
    Or,
    /// `AND Vx, Vy` (`8xy2`).
    And,
    /// `XOR Vx, Vy` (`8xy3`).
    Xor,
    /// `ADD Vx, Vy` (`8xy4`).
    AddReg,
    /// `SUB Vx, Vy` (`8xy5`).
    Sub,
    /// `SHR Vx {, Vy}` (`8xy6`).
    Shr,
    /// `SUBN Vx, Vy` (`8xy7`).
    Subn,
    /// `SHL Vx {, Vy}` (`8xyE`).
    Shl,
    /// `SNE Vx, Vy` (`9xy0`).
    SneReg,
    /// `LD I, addr` (`Annn`).
    LdI,
    /// `JP V0, addr` (`Bnnn`).
    JpV0,
    /// `RND Vx, byte` (`Cxkk`).
    Rnd,
    /// `DRW Vx, Vy, nibble` (`Dxyn`).
    Drw,
    /// `SKP Vx` (`Ex9E`).
    Skp,
    /// `SKNP Vx` (`ExA1`).
    Sknp,
    /// `LD Vx, DT` (`Fx07`).
    LdRegDt,
    /// `LD Vx, K` (`Fx0A`).
    LdKey,
    /// `LD DT, Vx` (`Fx15`).
    LdDtReg,
    /// `LD ST, Vx` (`Fx18`).
    LdSt,
    /// `ADD I, Vx` (`Fx1E`).
    AddI,
    /// `LD F, Vx` (`Fx29`).
    LdF,
    /// `LD B, Vx` (`Fx33`).
    LdB,
    /// `LD [I], Vx` (`Fx55`).
    LdDerefIReg,
    /// `LD Vx, [I]` (`Fx65`).
    LdRegDerefI,
}

impl Instruction {
    /// Returns a value which formats as the assembly form of this
    /// instruction applied to the given operands.
    pub fn with_operands(self, operands: Operands) -> Disassembly {
        Disassembly {
            instruction: self,
            operands,
        }
    }
}

/// An instruction together with its operands, for display purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disassembly {
    instruction: Instruction,
    operands: Operands,
}

impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Instruction::*;

        let Operands {
            x,
            y,
            n,
            addr,
            byte,
        } = self.operands;
        match self.instruction {
            Sys => write!(f, "SYS {}", addr),
            Cls => write!(f, "CLS"),
            Ret => write!(f, "RET"),
            Jp => write!(f, "JP {}", addr),
            Call => write!(f, "CALL {}", addr),
            SeByte => write!(f, "SE {}, #{:02X}", x, byte),
            SneByte => write!(f, "SNE {}, #{:02X}", x, byte),
            SeReg => write!(f, "SE {}, {}", x, y),
            LdByte => write!(f, "LD {}, #{:02X}", x, byte),
            AddByte => write!(f, "ADD {}, #{:02X}", x, byte),
            LdReg => write!(f, "LD {}, {}", x, y),
            Or => write!(f, "OR {}, {}", x, y),
            And => write!(f, "AND {}, {}", x, y),
            Xor => write!(f, "XOR {}, {}", x, y),
            AddReg => write!(f, "ADD {}, {}", x, y),
            Sub => write!(f, "SUB {}, {}", x, y),
            Shr => write!(f, "SHR {}, {}", x, y),
            Subn => write!(f, "SUBN {}, {}", x, y),
            Shl => write!(f, "SHL {}, {}", x, y),
            SneReg => write!(f, "SNE {}, {}", x, y),
            LdI => write!(f, "LD I, {}", addr),
            JpV0 => write!(f, "JP V0, {}", addr),
            Rnd => write!(f, "RND {}, #{:02X}", x, byte),
            Drw => write!(f, "DRW {}, {}, {}", x, y, n),
            Skp => write!(f, "SKP {}", x),
            Sknp => write!(f, "SKNP {}", x),
            LdRegDt => write!(f, "LD {}, DT", x),
            LdKey => write!(f, "LD {}, K", x),
            LdDtReg => write!(f, "LD DT, {}", x),
            LdSt => write!(f, "LD ST, {}", x),
            AddI => write!(f, "ADD I, {}", x),
            LdF => write!(f, "LD F, {}", x),
            LdB => write!(f, "LD B, {}", x),
            LdDerefIReg => write!(f, "LD [I], {}", x),
            LdRegDerefI => write!(f, "LD {}, [I]", x),
        }
    }
}

#[cfg(test)]
mod tests {
    use instruction::{Address, Instruction, Opcode, Operands};
    use Register::*;

    /// Tests that every operand field is taken from the right bits.
    #[test]
    fn decode_operands() {
        // Test cases, in the format (high, low, x, y, n, addr).
        let cases = [
            (0xD1, 0x25, V1, V2, 0x5, 0x125),
            (0x8A, 0xBE, VA, VB, 0xE, 0xABE),
            (0x00, 0xE0, V0, VE, 0x0, 0x0E0),
            (0xFF, 0xFF, VF, VF, 0xF, 0xFFF),
        ];

        for &(high, low, x, y, n, addr) in cases.iter() {
            let case = (high, low);
            let ops = Operands::decode(high, low);
            assert_eq!(ops.x, x, "case {:?}", case);
            assert_eq!(ops.y, y, "case {:?}", case);
            assert_eq!(ops.n, n, "case {:?}", case);
            assert_eq!(ops.addr, Address::new(addr), "case {:?}", case);
            assert_eq!(ops.byte, low, "case {:?}", case);
        }
    }

    #[test]
    fn address_wraps() {
        assert_eq!(Address::new(0x1234).addr(), 0x234);
        assert_eq!((Address::new(0xFFE) + 4u16).addr(), 0x002);
        assert_eq!((Address::new(0x200) + 0x10usize).addr(), 0x210);
        assert!(!Address::new(0x203).is_aligned());
    }

    #[test]
    fn disassembly() {
        let cases = [
            (Instruction::Call, 0x22A4, "CALL #2A4"),
            (Instruction::Drw, 0xD015, "DRW V0, V1, 5"),
            (Instruction::LdByte, 0x6C0F, "LD VC, #0F"),
            (Instruction::LdRegDerefI, 0xF365, "LD V3, [I]"),
            (Instruction::Sys, 0x0123, "SYS #123"),
        ];

        for &(instr, op, expected) in cases.iter() {
            let ops = Opcode(op).operands();
            assert_eq!(instr.with_operands(ops).to_string(), expected);
        }
    }
}
