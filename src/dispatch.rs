/*
 * Copyright 2018 Ian Johnson
 *
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! Opcode dispatch.
//!
//! Opcodes are resolved to instructions through a table indexed by a small
//! hash of the instruction bytes.  The hash keeps exactly the bits that
//! identify an instruction within its family and drops the operand bits:
//!
//! - `0`: the lower byte (`E0` or `EE`); every other lower byte maps to key
//!   `0`, the shared `SYS` entry;
//! - `8`: `0x800` or'd with the low nibble, selecting the ALU operation;
//! - `E` and `F`: the prefix shifted into the upper byte, or'd with the
//!   whole lower byte;
//! - anything else: the prefix alone.
//!
//! The table is a fixed array with a slot for every 12-bit key, so lookups
//! never allocate.

use std::fmt;

use instruction::{Instruction, Opcode};

/// The number of instructions in the table.
pub const N_INSTRUCTIONS: usize = 35;

/// The number of distinct hash keys.
const N_KEYS: usize = 0x1000;

/// An error resulting from an opcode with no table entry.
#[derive(Debug, Fail, Clone, Copy, PartialEq, Eq)]
#[fail(display = "invalid opcode: {}", _0)]
pub struct InvalidOpcodeError(pub Opcode);

/// Returns the dispatch key of the instruction with the given bytes.
pub fn hash(high: u8, low: u8) -> u16 {
    let prefix = high >> 4;
    match prefix {
        0x0 => match low {
            0xE0 | 0xEE => low as u16,
            _ => 0x000,
        },
        0x8 => 0x800 | (low & 0xF) as u16,
        0xE | 0xF => (prefix as u16) << 8 | low as u16,
        _ => prefix as u16,
    }
}

/// The lookup table from dispatch keys to instructions.
pub struct Table {
    slots: [Option<Instruction>; N_KEYS],
    len: usize,
}

impl Table {
    /// Returns the table of all Chip-8 instructions.
    ///
    /// # Panics
    ///
    /// Panics if two instructions share a key or the table does not end up
    /// with exactly `N_INSTRUCTIONS` entries, either of which means the
    /// hashing scheme is broken.
    pub fn new() -> Self {
        use self::Instruction::*;

        let mut table = Table {
            slots: [None; N_KEYS],
            len: 0,
        };
        // One representative opcode per instruction.
        let entries = [
            (0x0000, Sys),
            (0x00E0, Cls),
            (0x00EE, Ret),
            (0x1000, Jp),
            (0x2000, Call),
            (0x3000, SeByte),
            (0x4000, SneByte),
            (0x5000, SeReg),
            (0x6000, LdByte),
            (0x7000, AddByte),
            (0x8000, LdReg),
            (0x8001, Or),
            (0x8002, And),
            (0x8003, Xor),
            (0x8004, AddReg),
            (0x8005, Sub),
            (0x8006, Shr),
            (0x8007, Subn),
            (0x800E, Shl),
            (0x9000, SneReg),
            (0xA000, LdI),
            (0xB000, JpV0),
            (0xC000, Rnd),
            (0xD000, Drw),
            (0xE09E, Skp),
            (0xE0A1, Sknp),
            (0xF007, LdRegDt),
            (0xF00A, LdKey),
            (0xF015, LdDtReg),
            (0xF018, LdSt),
            (0xF01E, AddI),
            (0xF029, LdF),
            (0xF033, LdB),
            (0xF055, LdDerefIReg),
            (0xF065, LdRegDerefI),
        ];
        for &(op, instr) in entries.iter() {
            table.insert(Opcode(op), instr);
        }
        assert_eq!(
            table.len, N_INSTRUCTIONS,
            "dispatch table has the wrong number of entries"
        );

        table
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Resolves the given opcode to its instruction.
    pub fn resolve(&self, opcode: Opcode) -> Result<Instruction, InvalidOpcodeError> {
        self.slots[hash(opcode.high(), opcode.low()) as usize].ok_or(InvalidOpcodeError(opcode))
    }

    fn insert(&mut self, opcode: Opcode, instr: Instruction) {
        let key = hash(opcode.high(), opcode.low()) as usize;
        if let Some(old) = self.slots[key] {
            panic!(
                "dispatch key {:#05X} is shared by {:?} and {:?}",
                key, old, instr
            );
        }
        self.slots[key] = Some(instr);
        self.len += 1;
    }
}

impl Default for Table {
    fn default() -> Self {
        Table::new()
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map()
            .entries(
                self.slots
                    .iter()
                    .enumerate()
                    .filter_map(|(k, slot)| slot.map(|instr| (k, instr))),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dispatch::{hash, InvalidOpcodeError, Table, N_INSTRUCTIONS};
    use instruction::{Instruction, Opcode};

    #[test]
    fn table_is_complete() {
        let table = Table::new();
        assert_eq!(table.len(), N_INSTRUCTIONS);
    }

    /// Tests that documented opcodes with arbitrary operands resolve to the
    /// right instruction.
    #[test]
    fn resolve_documented() {
        use self::Instruction::*;

        let expected: HashMap<u16, Instruction> = hashmap![
            0x0123 => Sys,
            0x00E0 => Cls,
            0x00EE => Ret,
            0x1ABC => Jp,
            0x2ABC => Call,
            0x3A12 => SeByte,
            0x4A12 => SneByte,
            0x5AB0 => SeReg,
            0x6A12 => LdByte,
            0x7A12 => AddByte,
            0x8AB0 => LdReg,
            0x8AB1 => Or,
            0x8AB2 => And,
            0x8AB3 => Xor,
            0x8AB4 => AddReg,
            0x8AB5 => Sub,
            0x8AB6 => Shr,
            0x8AB7 => Subn,
            0x8ABE => Shl,
            0x9AB0 => SneReg,
            0xAABC => LdI,
            0xBABC => JpV0,
            0xCA12 => Rnd,
            0xDAB5 => Drw,
            0xEA9E => Skp,
            0xEAA1 => Sknp,
            0xFA07 => LdRegDt,
            0xFA0A => LdKey,
            0xFA15 => LdDtReg,
            0xFA18 => LdSt,
            0xFA1E => AddI,
            0xFA29 => LdF,
            0xFA33 => LdB,
            0xFA55 => LdDerefIReg,
            0xFA65 => LdRegDerefI,
        ];
        let table = Table::new();

        for (&op, &instr) in expected.iter() {
            assert_eq!(table.resolve(Opcode(op)), Ok(instr), "opcode {:#06X}", op);
        }
        let distinct: HashMap<Instruction, ()> =
            expected.values().map(|&instr| (instr, ())).collect();
        assert_eq!(distinct.len(), N_INSTRUCTIONS);
    }

    /// Prefix 0 opcodes whose lower byte is not `E0` or `EE` must fall back
    /// to `SYS`, even when the lower byte matches another family's key.
    #[test]
    fn prefix_zero_falls_back_to_sys() {
        let table = Table::new();

        for &op in [0x0000, 0x0001, 0x000D, 0x0080, 0x00E1, 0x0FFF].iter() {
            assert_eq!(
                table.resolve(Opcode(op)),
                Ok(Instruction::Sys),
                "opcode {:#06X}",
                op
            );
        }
        // `0xEE` under a nonzero x nibble is still a return.
        assert_eq!(table.resolve(Opcode(0x03EE)), Ok(Instruction::Ret));
        assert_eq!(table.resolve(Opcode(0x0FEE)), Ok(Instruction::Ret));
    }

    #[test]
    fn resolve_invalid() {
        let table = Table::new();

        for &op in [0x8AB8, 0x8ABF, 0xE19F, 0xE000, 0xF0FF, 0xF130, 0xF175].iter() {
            assert_eq!(
                table.resolve(Opcode(op)),
                Err(InvalidOpcodeError(Opcode(op))),
                "opcode {:#06X}",
                op
            );
        }
    }

    #[test]
    fn hash_keys() {
        assert_eq!(hash(0x00, 0xE0), 0x0E0);
        assert_eq!(hash(0x00, 0x42), 0x000);
        assert_eq!(hash(0x8F, 0x3E), 0x80E);
        assert_eq!(hash(0xE5, 0x9E), 0xE9E);
        assert_eq!(hash(0xF5, 0x65), 0xF65);
        assert_eq!(hash(0xD1, 0x25), 0x00D);
    }
}
