/// VT compatibility test suite — automated vttest-style checks.
/// Drives full byte sequences through the screen and checks the post-state.

#[cfg(test)]
mod tests {
    use crate::core::{palette256, Cell, Screen, Style};

    fn run(input: &[u8]) -> Screen {
        let mut screen = Screen::new(24, 80);
        screen.feed(input);
        screen
    }

    fn run_sized(rows: usize, cols: usize, input: &[u8]) -> Screen {
        let mut screen = Screen::new(rows, cols);
        screen.feed(input);
        screen
    }

    fn row_text(screen: &Screen, row: usize) -> String {
        screen
            .grid()
            .row(row)
            .iter()
            .map(Cell::display_char)
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    // === Scenarios ===

    #[test]
    fn vt_hello_wrap() {
        let screen = run(b"Hello\r\nWorld");
        assert_eq!(row_text(&screen, 0), "Hello");
        assert_eq!(row_text(&screen, 1), "World");
        assert_eq!(screen.cursor(), (1, 5));
    }

    #[test]
    fn vt_autowrap() {
        let screen = run_sized(3, 5, b"ABCDEF");
        assert_eq!(row_text(&screen, 0), "ABCDE");
        assert!(row_text(&screen, 1).starts_with('F'));
        assert_eq!(screen.cursor(), (1, 1));
    }

    #[test]
    fn vt_cup_ed() {
        let screen = run(b"junk\x1b[2J\x1b[5;10HX");
        for r in 0..24 {
            for c in 0..80 {
                let cell = screen.grid().cell(r, c);
                if (r, c) == (4, 9) {
                    assert_eq!(cell.code, 'X');
                } else {
                    assert_eq!(cell.display_char(), ' ');
                }
            }
        }
    }

    #[test]
    fn vt_scroll_region_lf() {
        let mut screen = Screen::new(10, 10);
        for r in 0..10 {
            screen.feed(format!("\x1b[{};1Hrow{}", r + 1, r).as_bytes());
        }
        screen.feed(b"\x1b[3;7r\x1b[7;1H\n");
        assert_eq!(screen.cursor(), (6, 0));
        // region rows shifted up, the former region top went to history
        assert_eq!(row_text(&screen, 2), "row3");
        assert_eq!(row_text(&screen, 5), "row6");
        assert_eq!(row_text(&screen, 6), "");
        assert_eq!(row_text(&screen, 7), "row7");
        assert_eq!(screen.grid().history_len(), 1);
        let recovered: String = screen
            .grid()
            .history_row(0)
            .iter()
            .map(Cell::display_char)
            .collect();
        assert_eq!(recovered.trim_end(), "row2");
    }

    #[test]
    fn vt_sgr_256_color() {
        let screen = run(b"\x1b[38;5;196mA");
        let cell = screen.grid().cell(0, 0);
        assert_eq!(cell.code, 'A');
        assert_eq!(cell.style.fore, palette256(196));
    }

    #[test]
    fn vt_da1_reply() {
        let mut screen = run(b"\x1b[c");
        assert_eq!(screen.take_reply(), b"\x1b[?1;2c");
    }

    // === Cursor movement ===

    #[test]
    fn vt_cup_clamp() {
        let screen = run(b"\x1b[999;999H");
        assert_eq!(screen.cursor(), (23, 79));
    }

    #[test]
    fn vt_cursor_save_restore() {
        let screen = run(b"\x1b[5;10H\x1b7\x1b[1;1H\x1b8");
        assert_eq!(screen.cursor(), (4, 9));
    }

    #[test]
    fn vt_single_byte_cursor_moves() {
        let mut screen = run(b"\x1b[5;5H");
        screen.feed(b"\x1bA");
        assert_eq!(screen.cursor(), (3, 4));
        screen.feed(b"\x1bB\x1bB");
        assert_eq!(screen.cursor(), (5, 4));
        screen.feed(b"\x1bC");
        assert_eq!(screen.cursor(), (5, 5));
    }

    #[test]
    fn vt_nel() {
        let screen = run(b"ABC\x1bE");
        assert_eq!(screen.cursor(), (1, 0));
    }

    #[test]
    fn vt_ind_scrolls_at_bottom() {
        let mut screen = run_sized(3, 5, b"A\r\nB\r\nC");
        screen.feed(b"\x1bD");
        assert_eq!(row_text(&screen, 0), "B");
        assert_eq!(screen.grid().history_len(), 1);
    }

    // === Erase and edit ===

    #[test]
    fn vt_el_right() {
        let screen = run(b"ABCDEFGHIJ\x1b[1;5H\x1b[K");
        assert_eq!(row_text(&screen, 0), "ABCD");
    }

    #[test]
    fn vt_ech() {
        let screen = run(b"ABCDEFGHIJ\x1b[1;3H\x1b[4X");
        assert_eq!(screen.grid().cell(0, 1).code, 'B');
        assert_eq!(screen.grid().cell(0, 2).display_char(), ' ');
        assert_eq!(screen.grid().cell(0, 5).display_char(), ' ');
        assert_eq!(screen.grid().cell(0, 6).code, 'G');
    }

    #[test]
    fn vt_insert_delete_chars() {
        let screen = run(b"ABCDE\x1b[1;3H\x1b[2@");
        assert_eq!(screen.grid().cell(0, 4).code, 'C');
        let screen = run(b"ABCDE\x1b[1;2H\x1b[2P");
        assert_eq!(row_text(&screen, 0), "ADE");
    }

    #[test]
    fn vt_insert_delete_lines() {
        let screen = run(b"AAA\r\nBBB\r\nCCC\x1b[2;1H\x1b[1L");
        assert_eq!(row_text(&screen, 0), "AAA");
        assert_eq!(row_text(&screen, 1), "");
        assert_eq!(row_text(&screen, 2), "BBB");
        let screen = run(b"AAA\r\nBBB\r\nCCC\x1b[2;1H\x1b[1M");
        assert_eq!(row_text(&screen, 0), "AAA");
        assert_eq!(row_text(&screen, 1), "CCC");
    }

    // === Scroll region ===

    #[test]
    fn vt_decstbm_homes_cursor() {
        let screen = run(b"\x1b[10;20H\x1b[5;10r");
        assert_eq!(screen.scroll_top(), 4);
        assert_eq!(screen.scroll_bottom(), 9);
        assert_eq!(screen.cursor(), (4, 0));
    }

    #[test]
    fn vt_su_within_region() {
        let screen = run(b"AAA\r\nBBB\r\nCCC\r\nDDD\x1b[2;3r\x1b[1S");
        assert_eq!(row_text(&screen, 0), "AAA");
        assert_eq!(row_text(&screen, 1), "CCC");
        assert_eq!(row_text(&screen, 2), "");
        assert_eq!(row_text(&screen, 3), "DDD");
    }

    #[test]
    fn vt_reverse_index_at_top() {
        let screen = run(b"top\x1b[1;1H\x1bM");
        assert_eq!(row_text(&screen, 0), "");
        assert_eq!(row_text(&screen, 1), "top");
        assert_eq!(screen.cursor(), (0, 0));
    }

    // === SGR ===

    #[test]
    fn vt_sgr_truecolor() {
        let screen = run(b"\x1b[38;2;100;150;200mX");
        let style = screen.grid().cell(0, 0).style;
        assert_eq!((style.fore.r(), style.fore.g(), style.fore.b()), (100, 150, 200));
    }

    #[test]
    fn vt_sgr_bold_reset() {
        let screen = run(b"\x1b[1;31mA\x1b[0mB");
        use crate::core::{StyleAttr, NAMED_COLORS};
        let a = screen.grid().cell(0, 0);
        assert!(a.style.attr.contains(StyleAttr::BOLD));
        assert_eq!(a.style.fore, NAMED_COLORS[1]);
        let b = screen.grid().cell(0, 1);
        assert_eq!(b.style, Style::default());
    }

    #[test]
    fn vt_sgr_inverse_pairs() {
        let screen = run(b"\x1b[7m\x1b[7m");
        assert_eq!(screen.style(), Style::default());
    }

    // === Modes ===

    #[test]
    fn vt_origin_mode_home() {
        let screen = run(b"\x1b[5;20r\x1b[?6h\x1b[1;1H");
        assert_eq!(screen.cursor(), (4, 0));
    }

    #[test]
    fn vt_no_wrap() {
        let screen = run_sized(3, 5, b"\x1b[?7lABCDEFGH");
        assert_eq!(screen.cursor().0, 0);
        assert_eq!(screen.grid().cell(0, 4).code, 'H');
    }

    #[test]
    fn vt_insert_mode() {
        let screen = run(b"ABC\x1b[1;1H\x1b[4hXY");
        assert_eq!(row_text(&screen, 0), "XYABC");
    }

    #[test]
    fn vt_deccolm() {
        let mut screen = run(b"\x1b[?3h");
        assert_eq!(screen.cols(), 132);
        assert!(!screen.take_events().is_empty());
        screen.feed(b"\x1b[?3l");
        assert_eq!(screen.cols(), 80);
    }

    // === Replies ===

    #[test]
    fn vt_da2_reply() {
        let mut screen = run(b"\x1b[>0c");
        assert_eq!(screen.take_reply(), b"\x1b[>0;276;0c");
    }

    #[test]
    fn vt_dsr_replies() {
        let mut screen = run(b"\x1b[5n\x1b[12;34H\x1b[6n");
        assert_eq!(screen.take_reply(), b"\x1b[0n\x1b[12;34R");
    }

    #[test]
    fn vt_osc_color_reports() {
        let mut screen = run(b"\x1b]10;?\x1b\\");
        assert_eq!(screen.take_reply(), b"\x1b]10;rgb:0/0/0\x1b\\");
        let mut screen = run(b"\x1b]11;?\x1b\\");
        assert_eq!(screen.take_reply(), b"\x1b]10;rgb:f/f/f\x1b\\");
    }

    // === Tabs ===

    #[test]
    fn vt_default_tabs() {
        let screen = run(b"\tX");
        assert_eq!(screen.cursor(), (0, 9));
    }

    #[test]
    fn vt_tab_clear_all() {
        let screen = run(b"\x1b[1;5H\x1bH\x1b[3g\x1b[1;1H\t");
        assert_eq!(screen.cursor().1, 79);
    }

    // === DECALN ===

    #[test]
    fn vt_decaln() {
        let screen = run(b"\x1b#8");
        for c in 0..80 {
            assert_eq!(screen.grid().cell(0, c).code, 'E');
        }
        assert_eq!(screen.grid().cell(23, 79).code, 'E');
    }

    // === Wide characters ===

    #[test]
    fn vt_wide_glyph_tail() {
        let screen = run("漢字".as_bytes());
        assert_eq!(screen.grid().cell(0, 0).code, '漢');
        assert_eq!(screen.grid().cell(0, 1).code, Cell::WIDE_TAIL);
        assert_eq!(screen.grid().cell(0, 2).code, '字');
        assert_eq!(screen.grid().cell(0, 3).code, Cell::WIDE_TAIL);
    }

    #[test]
    fn vt_utf8_mixed_stream() {
        let screen = run("a中b\x1b[31mé".as_bytes());
        assert_eq!(screen.grid().cell(0, 0).code, 'a');
        assert_eq!(screen.grid().cell(0, 1).code, '中');
        assert_eq!(screen.grid().cell(0, 3).code, 'b');
        assert_eq!(screen.grid().cell(0, 4).code, 'é');
    }

    // === Keypad / charset no-ops ===

    #[test]
    fn vt_keypad_modes_accepted() {
        let screen = run(b"\x1b=A\x1b>B");
        assert_eq!(row_text(&screen, 0), "AB");
    }
}
