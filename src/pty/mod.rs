mod pty_manager;

pub use pty_manager::PtyManager;
