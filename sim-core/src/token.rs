//! Tokens and their register layout.

/// Number of byte registers carried by a token.
pub const TOKEN_MEMORY_SIZE: usize = 256;

/// Register addresses shared by the cell functions.
pub mod registers {
    /// Result code written by every cell function.
    pub const OUT: usize = 5;
    /// Generic failure code written to [`OUT`].
    pub const FAILURE: u8 = 0xFF;

    pub mod prop {
        pub const IN: usize = 8;
        pub const IN_ANGLE: usize = 9;
        pub const IN_POWER: usize = 10;
    }

    pub mod sensor {
        pub const IN: usize = 20;
        pub const INOUT_ANGLE: usize = 21;
        pub const IN_MIN_MASS: usize = 22;
        pub const IN_MAX_MASS: usize = 23;
        pub const OUT_MASS: usize = 24;
        pub const OUT_DISTANCE: usize = 25;
    }
}

/// A mobile instruction carrier owned by exactly one cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub energy: f32,
    pub memory: [u8; TOKEN_MEMORY_SIZE],
}

impl Token {
    pub fn new(energy: f32) -> Self {
        Self {
            energy,
            memory: [0; TOKEN_MEMORY_SIZE],
        }
    }

    /// Builds a token from a register snapshot.
    ///
    /// Snapshots longer than [`TOKEN_MEMORY_SIZE`] are truncated; shorter
    /// ones leave the remaining registers at zero. Returns the token and
    /// whether truncation happened.
    pub fn from_snapshot(energy: f32, data: &[u8]) -> (Self, bool) {
        let mut token = Self::new(energy);
        let len = data.len().min(TOKEN_MEMORY_SIZE);
        token.memory[..len].copy_from_slice(&data[..len]);
        (token, data.len() > TOKEN_MEMORY_SIZE)
    }

    #[inline]
    pub fn get(&self, register: usize) -> u8 {
        self.memory[register % TOKEN_MEMORY_SIZE]
    }

    #[inline]
    pub fn set(&mut self, register: usize, value: u8) {
        self.memory[register % TOKEN_MEMORY_SIZE] = value;
    }

    /// Splits the token into `parts` tokens with identical registers.
    ///
    /// The energy shares add up exactly to the original energy: the first
    /// token takes whatever rounding leaves over.
    pub fn split(self, parts: usize) -> Vec<Token> {
        if parts <= 1 {
            return vec![self];
        }
        let share = self.energy / parts as f32;
        let first = self.energy - share * (parts - 1) as f32;
        let mut tokens = Vec::with_capacity(parts);
        tokens.push(Token {
            energy: first,
            memory: self.memory,
        });
        tokens.extend((1..parts).map(|_| Token {
            energy: share,
            memory: self.memory,
        }));
        tokens
    }
}

/// Byte encoding of angles: `0..=255` covers one full turn.
pub fn angle_from_data(data: u8) -> f32 {
    f32::from(data) * 360.0 / 256.0
}

/// Inverse of [`angle_from_data`], rounding to the nearest step.
pub fn angle_to_data(degrees: f32) -> u8 {
    let steps = (degrees.rem_euclid(360.0) * 256.0 / 360.0).round() as u32;
    (steps % 256) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_truncated_to_memory_size() {
        let data = vec![7u8; TOKEN_MEMORY_SIZE + 4];
        let (token, truncated) = Token::from_snapshot(5.0, &data);
        assert!(truncated);
        assert!(token.memory.iter().all(|&b| b == 7));

        let (short, truncated) = Token::from_snapshot(5.0, &[1, 2]);
        assert!(!truncated);
        assert_eq!(short.get(1), 2);
        assert_eq!(short.get(2), 0);
    }

    #[test]
    fn split_conserves_energy() {
        let mut token = Token::new(10.0);
        token.set(registers::OUT, 3);
        let parts = token.split(3);
        assert_eq!(parts.len(), 3);
        let total: f32 = parts.iter().map(|t| t.energy).sum();
        assert!((total - 10.0).abs() < 1e-6);
        assert!(parts.iter().all(|t| t.get(registers::OUT) == 3));
    }

    #[test]
    fn angle_encoding_round_trips_quarter_turns() {
        for degrees in [0.0, 90.0, 180.0, 270.0] {
            assert_eq!(angle_from_data(angle_to_data(degrees)), degrees);
        }
        assert_eq!(angle_to_data(360.0), 0);
    }
}
