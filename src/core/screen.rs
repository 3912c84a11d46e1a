/// Screen state machine: grid, cursor, modes, tab stops and the dispatch
/// that turns recognized escape sequences into grid operations.
///
/// One `Screen` models one terminal. All mutation funnels through `feed`
/// (PTY bytes) or the host-facing `resize`; reply bytes and host effects are
/// queued on the side and drained by the session after each feed.

use std::mem;

use crate::core::grid::{Cell, Grid};
use crate::core::parser::{Action, Parser};
use crate::core::style::{palette256, Color, NamedColor, Style, StyleAttr, NAMED_COLORS};
use crate::core::utf8::char_width;

pub const DEFAULT_ROWS: usize = 24;
pub const DEFAULT_COLS: usize = 80;
/// Columns between default tab stops.
pub const TAB_SIZE: usize = 8;

/// Host-side effects produced while interpreting the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// OSC 52: store the (still base64-encoded) payload on the host clipboard.
    Copy(String),
    /// OSC 52 query: ask the host to supply paste data.
    RequestPaste,
    /// DECCOLM switched the display to this many columns.
    DisplayWidth(usize),
}

#[derive(Debug, Clone, Copy)]
struct SavedCursor {
    row: usize,
    col: usize,
    style: Style,
}

pub struct Screen {
    grid: Grid,
    parser: Parser,
    row: usize,
    /// May transiently equal `cols()` after a write at the right margin;
    /// the next write wraps or clamps it back.
    col: usize,
    style: Style,
    saved: SavedCursor,
    scroll_top: usize,
    scroll_bottom: usize,
    tab_stops: Vec<bool>,
    enable_wrap: bool,
    insert_mode: bool,
    origin_mode: bool,
    reverse_video: bool,
    show_cursor: bool,
    reply: Vec<u8>,
    events: Vec<HostEvent>,
}

impl Screen {
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = rows.max(2);
        let cols = cols.max(1);
        Self {
            grid: Grid::new(rows, cols),
            parser: Parser::new(),
            row: 0,
            col: 0,
            style: Style::default(),
            saved: SavedCursor {
                row: 0,
                col: 0,
                style: Style::default(),
            },
            scroll_top: 0,
            scroll_bottom: rows - 1,
            tab_stops: (0..cols).map(|k| k % TAB_SIZE == 0).collect(),
            enable_wrap: true,
            insert_mode: false,
            origin_mode: false,
            reverse_video: false,
            show_cursor: true,
            reply: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    pub fn scroll_bottom(&self) -> usize {
        self.scroll_bottom
    }

    pub fn wrap_enabled(&self) -> bool {
        self.enable_wrap
    }

    pub fn insert_mode(&self) -> bool {
        self.insert_mode
    }

    pub fn origin_mode(&self) -> bool {
        self.origin_mode
    }

    pub fn reverse_video(&self) -> bool {
        self.reverse_video
    }

    pub fn show_cursor(&self) -> bool {
        self.show_cursor
    }

    /// Bytes the emulator owes the child (DA/DSR/OSC replies).
    pub fn take_reply(&mut self) -> Vec<u8> {
        mem::take(&mut self.reply)
    }

    /// Host effects queued since the last drain.
    pub fn take_events(&mut self) -> Vec<HostEvent> {
        mem::take(&mut self.events)
    }

    /// Feed raw PTY bytes through the parser.
    pub fn feed(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if let Some(action) = self.parser.advance(byte) {
                self.apply(action);
            }
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Print(ch) => self.write_char(ch),
            Action::Control(byte) => self.control(byte),
            Action::EscDispatch {
                intermediates,
                byte,
            } => self.esc_dispatch(&intermediates, byte),
            Action::CsiDispatch { params, byte } => self.csi_dispatch(&params, byte),
            Action::OscDispatch(data) => self.osc_dispatch(&data),
        }
    }

    // ---- character writer ----

    fn put(&mut self, code: char) {
        *self.grid.cell_mut(self.row, self.col) = Cell {
            code,
            style: self.style,
        };
        self.col += 1;
    }

    fn write_char(&mut self, cp: char) {
        debug_assert!(self.row < self.grid.rows());
        debug_assert!(self.col <= self.grid.cols());

        let width = char_width(cp);
        let cols = self.grid.cols();
        if width == 0 || width > cols {
            return;
        }

        if self.col + width > cols {
            if self.enable_wrap {
                self.row += 1;
                self.col = 0;
                self.scroll_on_overflow();
            } else {
                // overwrite at the margin, stepping off a broken wide glyph
                self.col = cols - width;
                while self.col > 0 && self.grid.cell(self.row, self.col).code == Cell::WIDE_TAIL {
                    self.col -= 1;
                }
            }
        }

        if self.insert_mode {
            self.grid.insert_blanks(self.row, self.col, width);
        }

        if width == 2 {
            self.put(cp);
            if self.col == cols {
                // no room for the tail at the margin
                return;
            }
            self.put(Cell::WIDE_TAIL);
        } else {
            self.put(cp);
        }
    }

    // ---- scrolling and cursor ----

    /// Invoked whenever the cursor may sit one past the scroll bottom.
    fn scroll_on_overflow(&mut self) {
        if self.row == self.scroll_bottom + 1 {
            self.grid
                .scroll_into_history(self.scroll_top, self.scroll_bottom);
            self.row -= 1;
        } else if self.row >= self.grid.rows() {
            self.row = self.grid.rows() - 1;
        }
    }

    fn clamp_cursor(&mut self) {
        let max_col = self.grid.cols() - 1;
        if self.col > max_col {
            self.col = max_col;
        }
        if self.origin_mode {
            self.row = self.row.clamp(self.scroll_top, self.scroll_bottom);
        } else {
            let max_row = self.grid.rows() - 1;
            if self.row > max_row {
                self.row = max_row;
            }
        }
    }

    /// Absolute move; in origin mode the row is relative to the region top.
    fn set_cursor(&mut self, new_row: i64, new_col: i64) {
        let base = if self.origin_mode {
            self.scroll_top as i64
        } else {
            0
        };
        self.row = (new_row + base).max(0) as usize;
        self.col = new_col.max(0) as usize;
        self.clamp_cursor();
    }

    fn move_cursor(&mut self, row_diff: i64, col_diff: i64) {
        self.clamp_cursor();
        self.set_cursor(self.row as i64 + row_diff, self.col as i64 + col_diff);
    }

    // ---- C0 controls ----

    fn control(&mut self, byte: u8) {
        match byte {
            b'\r' => self.col = 0,
            b'\n' => {
                self.row += 1;
                self.scroll_on_overflow();
            }
            0x08 => {
                if self.col > 0 {
                    self.col -= 1;
                }
            }
            b'\t' => {
                self.col += 1;
                while self.col < self.grid.cols() && !self.tab_stops[self.col] {
                    self.col += 1;
                }
                self.clamp_cursor();
            }
            _ => {}
        }
    }

    // ---- ESC dispatch ----

    fn esc_dispatch(&mut self, intermediates: &str, byte: u8) {
        match (intermediates, byte) {
            // DECALN test pattern
            ("#", b'8') => self.grid.fill('E'),
            ("", b'7') => {
                self.saved = SavedCursor {
                    row: self.row,
                    col: self.col,
                    style: self.style,
                };
            }
            ("", b'8') => {
                self.row = self.saved.row;
                self.col = self.saved.col;
                self.style = self.saved.style;
                self.clamp_cursor();
            }
            ("", b'A') => {
                self.row = self.row.saturating_sub(1);
                self.clamp_cursor();
            }
            ("", b'B') => {
                self.row += 1;
                self.clamp_cursor();
            }
            ("", b'C') => {
                self.col += 1;
                self.clamp_cursor();
            }
            // IND
            ("", b'D') => {
                self.row += 1;
                self.scroll_on_overflow();
            }
            // NEL
            ("", b'E') => {
                self.row += 1;
                self.col = 0;
                self.clamp_cursor();
            }
            // HTS
            ("", b'H') => {
                if self.col < self.tab_stops.len() {
                    self.tab_stops[self.col] = true;
                }
            }
            // RI: scroll down at the top margin
            ("", b'M') => {
                if self.row == self.scroll_top {
                    self.grid.scroll_down(self.scroll_top, self.scroll_bottom);
                } else {
                    self.row = self.row.saturating_sub(1);
                    self.clamp_cursor();
                }
            }
            // keypad modes
            ("", b'=') | ("", b'>') => {}
            _ => log::warn!("unknown ESC dispatch: {:?} {:?}", intermediates, byte as char),
        }
    }

    // ---- CSI dispatch ----

    fn csi_dispatch(&mut self, params: &str, byte: u8) {
        match byte {
            // CUU: stop at the top margin unless already above it
            b'A' => {
                let n = int_or(params, 1);
                if self.row >= self.scroll_top {
                    let slack = (self.row - self.scroll_top) as i64;
                    self.move_cursor(-n.min(slack), 0);
                } else {
                    self.move_cursor(-n, 0);
                }
            }
            // CUD: stop at the bottom margin unless already below it
            b'B' => {
                let n = int_or(params, 1);
                if self.row <= self.scroll_bottom {
                    let slack = (self.scroll_bottom - self.row) as i64;
                    self.move_cursor(n.min(slack), 0);
                } else {
                    self.move_cursor(n, 0);
                }
            }
            // CUF / CUB
            b'C' => {
                self.col = (self.col as i64 + int_or(params, 1).max(1)).max(0) as usize;
                self.clamp_cursor();
            }
            b'D' => {
                self.col = (self.col as i64 - int_or(params, 1).max(1)).max(0) as usize;
                self.clamp_cursor();
            }
            // CNL / CPL
            b'E' => {
                self.row = (self.row as i64 + int_or(params, 1)).max(0) as usize;
                self.col = 0;
                self.clamp_cursor();
            }
            b'F' => {
                self.row = (self.row as i64 - int_or(params, 1)).max(0) as usize;
                self.col = 0;
                self.clamp_cursor();
            }
            // CHA
            b'G' => {
                self.col = (int_or(params, 1) - 1).max(0) as usize;
                self.clamp_cursor();
            }
            b'H' | b'f' => self.cup(params),
            b'J' => match int_or(params, 0) {
                0 => {
                    let cols = self.grid.cols();
                    self.grid.erase_row_span(self.row, self.col..cols);
                    let rows = self.grid.rows();
                    self.grid.erase_rows(self.row + 1..rows);
                }
                1 => {
                    self.grid.erase_rows(0..self.row);
                    self.grid.erase_row_span(self.row, 0..self.col + 1);
                }
                2 => {
                    let rows = self.grid.rows();
                    self.grid.erase_rows(0..rows);
                }
                other => log::warn!("unknown ED parameter: {other}"),
            },
            b'K' => match int_or(params, 0) {
                0 => {
                    let cols = self.grid.cols();
                    self.grid.erase_row_span(self.row, self.col..cols);
                }
                1 => self.grid.erase_row_span(self.row, 0..self.col + 1),
                2 => {
                    let cols = self.grid.cols();
                    self.grid.erase_row_span(self.row, 0..cols);
                }
                other => log::warn!("unknown EL parameter: {other}"),
            },
            // IL / DL operate only inside the scroll region
            b'L' => {
                if (self.scroll_top..=self.scroll_bottom).contains(&self.row) {
                    let n = int_or(params, 1).max(0) as usize;
                    self.grid.insert_lines(self.row, n, self.scroll_bottom);
                    self.col = 0;
                }
            }
            b'M' => {
                if (self.scroll_top..=self.scroll_bottom).contains(&self.row) {
                    let n = int_or(params, 1).max(0) as usize;
                    self.grid.delete_lines(self.row, n, self.scroll_bottom);
                    self.col = 0;
                }
            }
            // DCH
            b'P' => {
                let n = int_or(params, 1).max(0) as usize;
                self.grid.delete_chars(self.row, self.col, n);
            }
            // SU
            b'S' => {
                let n = int_or(params, 1).max(0) as usize;
                self.grid.scroll_up(self.scroll_top, self.scroll_bottom, n);
            }
            // ECH
            b'X' => {
                let n = int_or(params, 1).max(0) as usize;
                self.grid.erase_chars(self.row, self.col, n);
            }
            // ICH; reject private-prefixed forms
            b'@' => {
                if params.is_empty() || params.ends_with(|c: char| c.is_ascii_digit()) {
                    let n = int_or(params, 1).max(0) as usize;
                    self.grid.insert_blanks(self.row, self.col, n);
                } else {
                    log::warn!("unknown CSI sequence: {:?} @", params);
                }
            }
            b'c' => match params {
                // primary DA: VT100 with advanced video option
                "" | "0" => self.reply.extend_from_slice(b"\x1b[?1;2c"),
                // secondary DA
                ">" | ">0" => self.reply.extend_from_slice(b"\x1b[>0;276;0c"),
                other => log::warn!("unknown DA request: {other:?}"),
            },
            // VPA
            b'd' => {
                self.row = (int_or(params, 1) - 1).max(0) as usize;
                self.clamp_cursor();
            }
            // TBC
            b'g' => match int_or(params, 0) {
                0 => {
                    if self.col < self.tab_stops.len() {
                        self.tab_stops[self.col] = false;
                    }
                }
                3 => self.tab_stops.fill(false),
                other => log::warn!("unknown TBC parameter: {other}"),
            },
            b'h' | b'l' => {
                let set = byte == b'h';
                if let Some(list) = params.strip_prefix('?') {
                    self.dec_private_modes(list, set);
                } else {
                    self.ansi_modes(params, set);
                }
            }
            b'm' => self.sgr(params),
            b'n' => match params {
                // DSR: terminal OK
                "5" => self.reply.extend_from_slice(b"\x1b[0n"),
                // CPR, 1-based
                "6" => {
                    let report = format!("\x1b[{};{}R", self.row + 1, self.col + 1);
                    self.reply.extend_from_slice(report.as_bytes());
                }
                other => log::warn!("unknown DSR request: {other:?}"),
            },
            b'r' => self.decstbm(params),
            _ => log::warn!("unknown CSI sequence: {:?} {:?}", params, byte as char),
        }
    }

    fn cup(&mut self, params: &str) {
        let parts: Vec<&str> = params.split(';').collect();
        match parts.as_slice() {
            [""] => {
                self.row = 0;
                self.col = 0;
            }
            &[row] => {
                self.row = (int_or(row, 1) - 1).max(0) as usize;
                self.col = 0;
                self.clamp_cursor();
            }
            &[row, col] => {
                self.row = (int_or(row, 1) - 1).max(0) as usize;
                self.col = (int_or(col, 1) - 1).max(0) as usize;
                self.clamp_cursor();
            }
            _ => log::warn!("unknown CUP parameters: {params:?}"),
        }
    }

    fn decstbm(&mut self, params: &str) {
        let rows = self.grid.rows() as i64;
        let parts: Vec<&str> = params.split(';').collect();
        let (top, bottom) = match parts.as_slice() {
            [""] => (0, rows - 1),
            &[top] => (int_or(top, 1) - 1, rows - 1),
            &[top, bottom] => (int_or(top, 1) - 1, int_or(bottom, rows) - 1),
            _ => {
                log::warn!("unknown DECSTBM parameters: {params:?}");
                return;
            }
        };
        let top = top.clamp(0, rows - 1) as usize;
        let bottom = bottom.clamp(0, rows - 1) as usize;
        if bottom > top {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
            self.row = self.scroll_top;
            self.col = 0;
        }
    }

    fn ansi_modes(&mut self, list: &str, set: bool) {
        for mode in list.split(';') {
            match mode {
                // IRM
                "4" => self.insert_mode = set,
                other => log::warn!("unknown ANSI mode: {other:?}"),
            }
        }
    }

    fn dec_private_modes(&mut self, list: &str, set: bool) {
        for mode in list.split(';') {
            match mode {
                // DECCOLM: 132/80 column switch clears nothing but reshapes
                "3" => {
                    let cols = if set { 132 } else { 80 };
                    self.resize(self.grid.rows(), cols);
                    self.events.push(HostEvent::DisplayWidth(cols));
                }
                // DECSCNM
                "5" => self.reverse_video = set,
                // DECOM
                "6" => self.origin_mode = set,
                // DECAWM
                "7" => self.enable_wrap = set,
                // DECTCEM
                "25" => self.show_cursor = set,
                // recognized, no effect on core state
                "1" | "4" | "8" | "12" | "40" | "45" | "1000" | "1002" | "1006" | "2004" => {}
                other => log::warn!("unknown DEC private mode: {other:?}"),
            }
        }
    }

    fn sgr(&mut self, params: &str) {
        // XTMODKEYS shares the final byte; not a rendition change
        if params.starts_with('>') {
            return;
        }
        let parts: Vec<&str> = params.split(';').collect();
        let mut i = 0;
        while i < parts.len() {
            let param = int_or(parts[i], 0);
            match param {
                0 | 10 => self.style = Style::default(),
                1 => self.style.attr.insert(StyleAttr::BOLD),
                2 | 21 => {}
                4 => self.style.attr.insert(StyleAttr::UNDERLINE),
                5 | 6 => self.style.attr.insert(StyleAttr::BLINK),
                7 | 27 => mem::swap(&mut self.style.fore, &mut self.style.back),
                9 => self.style.attr.insert(StyleAttr::STRIKETHROUGH),
                22 => self.style.attr.remove(StyleAttr::BOLD),
                24 => self.style.attr.remove(StyleAttr::UNDERLINE),
                25 => self.style.attr.remove(StyleAttr::BLINK),
                29 => self.style.attr.remove(StyleAttr::STRIKETHROUGH),
                30..=37 => self.style.fore = NAMED_COLORS[(param - 30) as usize],
                38 | 48 => {
                    if let Some((color, consumed)) = extended_color(&parts, i + 1) {
                        if param == 38 {
                            self.style.fore = color;
                        } else {
                            self.style.back = color;
                        }
                        i += consumed;
                    }
                }
                39 => self.style.fore = NAMED_COLORS[NamedColor::Black as usize],
                40..=47 => self.style.back = NAMED_COLORS[(param - 40) as usize],
                49 => self.style.back = NAMED_COLORS[NamedColor::White as usize],
                90..=97 => self.style.fore = NAMED_COLORS[(param - 90 + 8) as usize],
                100..=107 => self.style.back = NAMED_COLORS[(param - 100 + 8) as usize],
                other => log::warn!("unknown SGR parameter: {other}"),
            }
            i += 1;
        }
    }

    // ---- OSC dispatch ----

    fn osc_dispatch(&mut self, data: &str) {
        let parts: Vec<&str> = data.split(';').collect();
        match parts.as_slice() {
            ["52", "c", "?"] => self.events.push(HostEvent::RequestPaste),
            ["52", "c", payload] => self.events.push(HostEvent::Copy((*payload).to_string())),
            // color reports; both go out with selector 10
            ["10", "?"] => self.reply.extend_from_slice(b"\x1b]10;rgb:0/0/0\x1b\\"),
            ["11", "?"] => self.reply.extend_from_slice(b"\x1b]10;rgb:f/f/f\x1b\\"),
            _ => log::warn!("unknown OSC sequence: {data:?}"),
        }
    }

    // ---- host-facing operations ----

    /// Reshape the grid, reset the scroll region and extend tab stops.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        let rows = rows.max(2);
        let cols = cols.max(1);
        let old_cols = self.grid.cols();
        self.grid.resize(rows, cols);
        self.scroll_top = 0;
        self.scroll_bottom = rows - 1;
        if self.row > rows - 1 {
            self.row = rows - 1;
        }
        if self.col > cols - 1 {
            self.col = cols - 1;
        }
        self.tab_stops.resize(cols, false);
        for k in old_cols..cols {
            if k % TAB_SIZE == 0 {
                self.tab_stops[k] = true;
            }
        }
    }

    /// Append `text` on a line of its own, leaving the cursor at the start
    /// of the next line. Used for the child-exit notice.
    pub(crate) fn write_line(&mut self, text: &str) {
        if self.col > 0 {
            self.row += 1;
            self.scroll_on_overflow();
            self.col = 0;
        }
        for ch in text.chars() {
            self.write_char(ch);
        }
        self.row += 1;
        self.scroll_on_overflow();
        self.col = 0;
    }
}

/// Leading decimal integer of a parameter field, if any.
fn leading_int(field: &str) -> Option<i64> {
    let field = field.trim_start();
    let (negative, digits) = match field.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, field),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let mut value: i64 = 0;
    for b in digits[..end].bytes() {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }
    Some(if negative { -value } else { value })
}

/// Parameter value with `default` for an absent field; a malformed field
/// reads as 0.
fn int_or(field: &str, default: i64) -> i64 {
    if field.is_empty() {
        default
    } else {
        leading_int(field).unwrap_or(0)
    }
}

/// 256-color (`5;N`) and truecolor (`2;R;G;B`) forms after SGR 38/48.
/// Returns the color and how many extra fields were consumed.
fn extended_color(parts: &[&str], start: usize) -> Option<(Color, usize)> {
    match int_or(parts.get(start).copied()?, 0) {
        5 => {
            let index = int_or(parts.get(start + 1).copied()?, 0).clamp(0, 255) as u8;
            Some((palette256(index), 2))
        }
        2 => {
            let r = int_or(parts.get(start + 1).copied()?, 0) as u8;
            let g = int_or(parts.get(start + 2).copied()?, 0) as u8;
            let b = int_or(parts.get(start + 3).copied()?, 0) as u8;
            Some((Color::rgb(r, g, b), 4))
        }
        _ => None,
    }
}
