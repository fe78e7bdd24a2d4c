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

//! Chip-8 display traits and implementations.

use std::default::Default;
use std::fmt;

use failure::Fail;

/// The width of the display.
pub const WIDTH: usize = 64;
/// The height of the display.
pub const HEIGHT: usize = 32;

/// The height of a hex digit sprite.
pub const HEX_HEIGHT: usize = 5;

/// The hex digit sprites.
pub const HEX_SPRITES: [[u8; HEX_HEIGHT]; 16] = [
    [0xF0, 0x90, 0x90, 0x90, 0xF0],
    [0x20, 0x60, 0x20, 0x20, 0x70],
    [0xF0, 0x10, 0xF0, 0x80, 0xF0],
    [0xF0, 0x10, 0xF0, 0x10, 0xF0],
    [0x90, 0x90, 0xF0, 0x10, 0x10],
    [0xF0, 0x80, 0xF0, 0x10, 0xF0],
    [0xF0, 0x80, 0xF0, 0x90, 0xF0],
    [0xF0, 0x10, 0x20, 0x40, 0x40],
    [0xF0, 0x90, 0xF0, 0x90, 0xF0],
    [0xF0, 0x90, 0xF0, 0x10, 0xF0],
    [0xF0, 0x90, 0xF0, 0x90, 0x90],
    [0xE0, 0x90, 0xE0, 0x90, 0xE0],
    [0xF0, 0x80, 0x80, 0x80, 0xF0],
    [0xE0, 0x90, 0x90, 0x90, 0xE0],
    [0xF0, 0x80, 0xF0, 0x80, 0xF0],
    [0xF0, 0x80, 0xF0, 0x80, 0x80],
];

/// A monochrome pixel surface that the interpreter draws on.
///
/// Coordinates passed to these methods are always within `WIDTH` by
/// `HEIGHT`; wrapping is done by the caller.
pub trait Surface {
    /// Returns whether the given pixel is on.
    fn get_pixel(&self, x: usize, y: usize) -> bool;

    /// Turns the given pixel on or off.
    fn set_pixel(&mut self, x: usize, y: usize, on: bool);

    /// Turns every pixel off.
    fn clear(&mut self);
}

/// XORs the given sprite onto the surface with its top-left corner at
/// `(x, y)`, wrapping around both edges.
///
/// Each byte of the sprite is one 8-pixel row, most significant bit first.
/// Returns whether any pixel was turned off.
pub fn draw_sprite<S: Surface + ?Sized>(surface: &mut S, sprite: &[u8], x: usize, y: usize) -> bool {
    let mut collision = false;

    for (j, row) in sprite.iter().enumerate() {
        let py = (y + j) % HEIGHT;
        for i in 0..8 {
            if row & (0x80 >> i) != 0 {
                let px = (x + i) % WIDTH;
                let old = surface.get_pixel(px, py);
                surface.set_pixel(px, py, !old);
                collision |= old;
            }
        }
    }

    collision
}

/// A Chip-8 display buffer.
pub struct Buffer {
    /// The underlying display buffer data, indexed by column then row.
    data: [[bool; HEIGHT]; WIDTH],
    /// Whether the display needs to be refreshed.
    needs_refresh: bool,
}

impl Buffer {
    /// Returns a new display buffer with all pixels clear.
    pub fn new() -> Self {
        Buffer {
            data: [[false; HEIGHT]; WIDTH],
            needs_refresh: true,
        }
    }

    /// Returns a reference to the underlying pixel data.
    pub fn data(&self) -> &[[bool; HEIGHT]; WIDTH] {
        &self.data
    }

    /// Forces a refresh on the next call to `refresh`, even if no draw
    /// operation has been performed.
    pub fn force_refresh(&mut self) {
        self.needs_refresh = true;
    }

    /// Returns whether anything changed since the last refresh.
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh
    }

    /// Refreshes the display using the given refresh function.
    ///
    /// If a refresh is unnecessary, nothing will be done.  The refresh
    /// function receives a "snapshot" of the display, and should draw that to
    /// whatever user-facing display buffer is currently being used.
    pub fn refresh<F, E>(&mut self, f: F) -> Result<(), E>
    where
        F: FnOnce(&Self) -> Result<(), E>,
        E: Fail,
    {
        if self.needs_refresh {
            f(self)?;
            self.needs_refresh = false;
        }
        Ok(())
    }
}

impl Surface for Buffer {
    fn get_pixel(&self, x: usize, y: usize) -> bool {
        self.data[x][y]
    }

    fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        if self.data[x][y] != on {
            self.data[x][y] = on;
            self.needs_refresh = true;
        }
    }

    fn clear(&mut self) {
        for col in self.data.iter_mut() {
            for elem in col.iter_mut() {
                *elem = false;
            }
        }
        self.needs_refresh = true;
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new()
    }
}

/// Renders the buffer as text, one line per row, with `#` for lit pixels.
impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for y in 0..HEIGHT {
            let line: String = (0..WIDTH)
                .map(|x| if self.data[x][y] { '#' } else { '.' })
                .collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
