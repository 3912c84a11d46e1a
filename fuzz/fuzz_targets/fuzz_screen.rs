#![no_main]
use libfuzzer_sys::fuzz_target;
use termcore::core::Screen;

fuzz_target!(|data: &[u8]| {
    let mut screen = Screen::new(24, 80);
    screen.feed(data);
});
