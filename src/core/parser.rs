/// Escape-sequence recognizer: a byte-driven machine over the
/// idle / ESC / CSI / OSC / DCS states.
///
/// The parser only finds sequence boundaries and accumulates the raw
/// parameter/intermediate bytes; interpreting the dispatched sequence is the
/// screen's job. Bytes that fit no state are logged and dropped, and the
/// machine falls back to idle, so no input can wedge it.

use std::mem;

use crate::core::utf8::Utf8Decoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Esc,
    Csi,
    Osc,
    Dcs,
}

/// A complete unit recognized from the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Printable code point for the character writer.
    Print(char),
    /// C0 control handled directly (CR, LF, BS, HT).
    Control(u8),
    /// Single-byte ESC command plus accumulated intermediates.
    EscDispatch { intermediates: String, byte: u8 },
    /// CSI sequence: raw parameter/intermediate bytes plus the final byte.
    CsiDispatch { params: String, byte: u8 },
    /// OSC string, terminator (BEL or ST) stripped.
    OscDispatch(String),
}

pub struct Parser {
    state: State,
    buffer: String,
    utf8: Utf8Decoder,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            buffer: String::with_capacity(64),
            utf8: Utf8Decoder::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Feed one byte; returns at most one completed action.
    pub fn advance(&mut self, byte: u8) -> Option<Action> {
        match self.state {
            State::Idle => self.idle(byte),
            State::Esc => self.esc(byte),
            State::Csi => self.csi(byte),
            State::Osc => self.osc(byte),
            State::Dcs => self.dcs(byte),
        }
    }

    fn abort(&mut self, stage: &str, byte: u8) -> Option<Action> {
        log::warn!(
            "unknown escape sequence in {}: {:?} 0x{:02x}",
            stage,
            self.buffer,
            byte
        );
        self.buffer.clear();
        self.state = State::Idle;
        None
    }

    fn idle(&mut self, byte: u8) -> Option<Action> {
        if self.utf8.is_pending() {
            return self.utf8.feed(byte).map(Action::Print);
        }
        match byte {
            0x1b => {
                self.buffer.clear();
                self.state = State::Esc;
                None
            }
            b'\r' | b'\n' | 0x08 | b'\t' => Some(Action::Control(byte)),
            0x20..=0x7f => Some(Action::Print(byte as char)),
            0xc2..=0xf4 => self.utf8.feed(byte).map(Action::Print),
            // remaining controls, stray continuations and invalid leads
            _ => None,
        }
    }

    fn esc(&mut self, byte: u8) -> Option<Action> {
        match (self.buffer.as_str(), byte) {
            ("", b'[') => {
                self.state = State::Csi;
                None
            }
            ("", b']') => {
                self.state = State::Osc;
                None
            }
            ("", b'P') => {
                self.state = State::Dcs;
                None
            }
            ("", b'7' | b'8' | b'A' | b'B' | b'C' | b'D' | b'E' | b'H' | b'M' | b'=' | b'>')
            | ("#", b'8') => {
                self.state = State::Idle;
                Some(Action::EscDispatch {
                    intermediates: mem::take(&mut self.buffer),
                    byte,
                })
            }
            (_, b'#' | b'(' | b')') => {
                self.buffer.push(byte as char);
                None
            }
            _ => self.abort("ESC", byte),
        }
    }

    fn csi(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x40..=0x7e => {
                self.state = State::Idle;
                Some(Action::CsiDispatch {
                    params: mem::take(&mut self.buffer),
                    byte,
                })
            }
            0x20..=0x3f => {
                self.buffer.push(byte as char);
                None
            }
            _ => self.abort("CSI", byte),
        }
    }

    fn osc(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x07 => {
                self.state = State::Idle;
                Some(Action::OscDispatch(mem::take(&mut self.buffer)))
            }
            b'\\' if self.buffer.ends_with('\x1b') => {
                self.buffer.pop();
                self.state = State::Idle;
                Some(Action::OscDispatch(mem::take(&mut self.buffer)))
            }
            0x20..=0x7e | 0x1b => {
                self.buffer.push(byte as char);
                None
            }
            _ => self.abort("OSC", byte),
        }
    }

    fn dcs(&mut self, byte: u8) -> Option<Action> {
        match byte {
            b'\\' if self.buffer.ends_with('\x1b') => {
                // device control strings are swallowed whole
                self.buffer.clear();
                self.state = State::Idle;
                None
            }
            0x20..=0x7e | 0x1b => {
                self.buffer.push(byte as char);
                None
            }
            _ => self.abort("DCS", byte),
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
