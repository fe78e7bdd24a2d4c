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

//! Input handling for the Chip-8 interpreter.
//!
//! The keypad model only tracks one key at a time: pressing a key replaces
//! whichever key was down before.

use std::default::Default;

use num::traits::FromPrimitive;

/// The number of keys on the Chip-8 controller.
pub const N_KEYS: usize = 16;

enum_from_primitive!{
/// The keys on the Chip-8 controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    K0 = 0,
    K1,
    K2,
    K3,
    K4,
    K5,
    K6,
    K7,
    K8,
    K9,
    KA,
    KB,
    KC,
    KD,
    KE,
    KF
}
}

impl Key {
    /// Returns the key corresponding to the lowest four bits of the given
    /// byte.
    pub fn from_byte(b: u8) -> Key {
        Key::from_u8(b % N_KEYS as u8).unwrap()
    }

    /// Returns the key with the given hex digit, if there is one.
    pub fn from_digit(c: char) -> Option<Key> {
        c.to_digit(16).map(|d| Key::from_byte(d as u8))
    }
}

/// The keypad, as seen by the interpreter.
pub trait Keypad {
    /// Returns the key that is currently (or was most recently) down.
    fn current_key(&self) -> Option<Key>;

    /// Returns whether `current_key` is being held.
    fn is_pressed(&self) -> bool;

    /// Returns the key from a key-down event that the interpreter has not
    /// yet seen, consuming the event.
    fn take_key_down(&mut self) -> Option<Key>;
}

/// Represents the state of the input device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    /// The key that is down, or was released last.
    key: Option<Key>,
    /// Whether `key` is being held.
    pressed: bool,
    /// The key from a key-down event that has not been consumed.
    pending: Option<Key>,
}

impl State {
    /// Returns a new input state with all keys unpressed.
    pub fn new() -> Self {
        State::default()
    }

    /// Records that the given key went down.
    pub fn press(&mut self, key: Key) {
        self.key = Some(key);
        self.pressed = true;
        self.pending = Some(key);
    }

    /// Records that the given key went up.
    ///
    /// Releasing a key other than the current one does nothing.
    pub fn release(&mut self, key: Key) {
        if self.key == Some(key) {
            self.pressed = false;
        }
    }
}

impl Keypad for State {
    fn current_key(&self) -> Option<Key> {
        self.key
    }

    fn is_pressed(&self) -> bool {
        self.pressed
    }

    fn take_key_down(&mut self) -> Option<Key> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use input::{Key, Keypad, State};

    #[test]
    fn single_key() {
        let mut state = State::new();
        assert_eq!(state.current_key(), None);
        assert!(!state.is_pressed());

        state.press(Key::K3);
        state.press(Key::KA);
        assert_eq!(state.current_key(), Some(Key::KA));
        assert!(state.is_pressed());

        // Releasing a key that is no longer current changes nothing.
        state.release(Key::K3);
        assert!(state.is_pressed());
        state.release(Key::KA);
        assert!(!state.is_pressed());
        assert_eq!(state.current_key(), Some(Key::KA));
    }

    #[test]
    fn key_down_is_one_shot() {
        let mut state = State::new();
        assert_eq!(state.take_key_down(), None);

        state.press(Key::K7);
        state.release(Key::K7);
        assert_eq!(state.take_key_down(), Some(Key::K7));
        assert_eq!(state.take_key_down(), None);
    }

    #[test]
    fn key_from_byte() {
        assert_eq!(Key::from_byte(0x0B), Key::KB);
        assert_eq!(Key::from_byte(0x13), Key::K3);
        assert_eq!(Key::from_digit('f'), Some(Key::KF));
        assert_eq!(Key::from_digit('g'), None);
    }
}
