mod grid;
mod parser;
mod screen;
mod style;
mod utf8;

pub use grid::{Cell, Grid, MAX_HISTORY_LINES};
pub use parser::{Action, Parser, State};
pub use screen::{HostEvent, Screen, DEFAULT_COLS, DEFAULT_ROWS, TAB_SIZE};
pub use style::{palette256, Color, FontWeight, NamedColor, Style, StyleAttr, NAMED_COLORS};
pub use utf8::{char_width, Utf8Decoder, Utf8State};
