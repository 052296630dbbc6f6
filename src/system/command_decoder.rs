//! Serial command decoder
//!
//! Turns the ASCII byte stream from the serial link into drive commands, one
//! byte at a time. Two protocols share the stream:
//!
//! - Single keys (`W`, `X`, `+`, ...) map straight to a command.
//! - Structured commands `C<speed><sep><steer>` carry two signed integers,
//!   e.g. `C 40 -20\r\n` or `c-30,15;`. Separators are space, tab, comma and
//!   semicolon. A command ends at the first byte that cannot continue it, at
//!   `\r`/`\n`, or at the next `C`.
//!
//! A structured command is only accepted when both numbers were actually
//! entered; anything incomplete is dropped and the decoder goes back to idle.

use crate::system::config::STEER_LIMIT;
use crate::system::drive_command::Command;

/// Decoder states of a structured command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    /// Not inside a structured command
    Idle,
    /// After `C`, waiting for the speed sign or first digit
    Speed,
    /// Inside the speed digits
    SpeedDigits,
    /// After the separator, waiting for the steer sign or first digit
    Steer,
    /// Inside the steer digits
    SteerDigits,
}

/// One signed number of a structured command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Field {
    negative: bool,
    magnitude: i32,
    /// At least one digit arrived, which tells "0" apart from nothing
    seen: bool,
}

impl Field {
    const EMPTY: Field = Field {
        negative: false,
        magnitude: 0,
        seen: false,
    };

    fn push_digit(&mut self, byte: u8) {
        let digit = i32::from(byte - b'0');
        self.magnitude = self.magnitude.saturating_mul(10).saturating_add(digit);
        self.seen = true;
    }

    fn value(&self) -> i32 {
        if self.negative {
            -self.magnitude
        } else {
            self.magnitude
        }
    }
}

/// Outcome of feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decoded {
    /// The byte belonged to a structured command (or was a line terminator)
    pub consumed: bool,
    /// Command completed by this byte, if any
    pub command: Option<Command>,
}

impl Decoded {
    const fn structured(command: Option<Command>) -> Self {
        Self {
            consumed: true,
            command,
        }
    }
}

/// Streaming decoder for the serial command protocol
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    state: State,
    speed: Field,
    steer: Field,
}

impl Default for CommandDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandDecoder {
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            speed: Field::EMPTY,
            steer: Field::EMPTY,
        }
    }

    /// A structured command is partially received
    pub fn in_progress(&self) -> bool {
        self.state != State::Idle
    }

    /// Processes one incoming byte
    pub fn push(&mut self, byte: u8) -> Decoded {
        if is_terminator(byte) {
            let command = if self.in_progress() {
                self.finish()
            } else {
                None
            };
            return Decoded::structured(command);
        }

        if is_start(byte) {
            // A new `C` closes whatever was in flight before starting over
            let command = if self.in_progress() {
                self.finish()
            } else {
                None
            };
            self.reset();
            self.state = State::Speed;
            return Decoded::structured(command);
        }

        match self.state {
            State::Idle => Decoded {
                consumed: false,
                command: Command::from_key(byte),
            },
            State::Speed => {
                if is_separator(byte) {
                    // leading separators are skipped
                } else if let Some(negative) = sign(byte) {
                    self.speed.negative = negative;
                    self.state = State::SpeedDigits;
                } else if byte.is_ascii_digit() {
                    self.speed.push_digit(byte);
                    self.state = State::SpeedDigits;
                } else {
                    debug!("structured command dropped at speed");
                    self.reset();
                }
                Decoded::structured(None)
            }
            State::SpeedDigits => {
                if byte.is_ascii_digit() {
                    self.speed.push_digit(byte);
                    Decoded::structured(None)
                } else if is_separator(byte) {
                    self.state = State::Steer;
                    Decoded::structured(None)
                } else {
                    Decoded::structured(self.finish())
                }
            }
            State::Steer => {
                if is_separator(byte) {
                    Decoded::structured(None)
                } else if let Some(negative) = sign(byte) {
                    self.steer.negative = negative;
                    self.state = State::SteerDigits;
                    Decoded::structured(None)
                } else if byte.is_ascii_digit() {
                    self.steer.push_digit(byte);
                    self.state = State::SteerDigits;
                    Decoded::structured(None)
                } else {
                    Decoded::structured(self.finish())
                }
            }
            State::SteerDigits => {
                if byte.is_ascii_digit() {
                    self.steer.push_digit(byte);
                    Decoded::structured(None)
                } else {
                    Decoded::structured(self.finish())
                }
            }
        }
    }

    /// Closes the structured command in flight and returns to idle
    fn finish(&mut self) -> Option<Command> {
        let command = if self.speed.seen && self.steer.seen {
            let speed = self.speed.value().clamp(-100, 100);
            let steer = self.steer.value().clamp(-STEER_LIMIT, STEER_LIMIT);
            debug!("structured command speed={} steer={}", speed, steer);
            Some(Command::Set { speed, steer })
        } else {
            debug!("incomplete structured command dropped in {}", self.state);
            None
        };
        self.reset();
        command
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

#[inline]
fn is_terminator(byte: u8) -> bool {
    byte == b'\r' || byte == b'\n'
}

#[inline]
fn is_start(byte: u8) -> bool {
    byte == b'C' || byte == b'c'
}

#[inline]
fn is_separator(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b',' | b';')
}

/// `Some(true)` for a minus sign, `Some(false)` for a plus sign
#[inline]
fn sign(byte: u8) -> Option<bool> {
    match byte {
        b'-' => Some(true),
        b'+' => Some(false),
        _ => None,
    }
}
