use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::pty::{openpty, OpenptyResult, Winsize};
use nix::unistd::{close, dup2, execvp, fork, setsid, ForkResult};
use std::ffi::CString;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd, FromRawFd, OwnedFd};

use crate::config::ShellConfig;

pub struct PtyManager {
    master: OwnedFd,
    child_pid: nix::unistd::Pid,
}

impl PtyManager {
    /// Fork a shell on a fresh PTY sized `rows` x `cols`. The master side is
    /// switched to non-blocking; the reader polls before every read.
    pub fn spawn(shell: &ShellConfig, rows: u16, cols: u16) -> io::Result<Self> {
        let winsize = Winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        let OpenptyResult { master, slave } =
            openpty(Some(&winsize), None).map_err(io::Error::from)?;

        match unsafe { fork() }.map_err(io::Error::from)? {
            ForkResult::Child => {
                drop(master);
                setsid().ok();
                dup2(slave.as_raw_fd(), 0).ok();
                dup2(slave.as_raw_fd(), 1).ok();
                dup2(slave.as_raw_fd(), 2).ok();
                if slave.as_raw_fd() > 2 {
                    close(slave.as_raw_fd()).ok();
                }

                // point the child at a writable home
                let home = shell
                    .home
                    .clone()
                    .or_else(|| std::env::var("HOME").ok())
                    .unwrap_or_else(|| "/".into());
                std::env::set_var("HOME", &home);
                std::env::set_var("PWD", &home);
                let _ = std::env::set_current_dir(&home);
                for (key, value) in &shell.env {
                    std::env::set_var(key, value);
                }

                let program = CString::new(shell.program.as_str())
                    .unwrap_or_else(|_| c"/bin/sh".to_owned());
                let mut argv = vec![program.clone()];
                argv.extend(
                    shell
                        .args
                        .iter()
                        .filter_map(|a| CString::new(a.clone()).ok()),
                );
                execvp(&program, &argv).ok();
                std::process::exit(1);
            }
            ForkResult::Parent { child } => {
                drop(slave);
                unsafe {
                    let flags = nix::libc::fcntl(master.as_raw_fd(), nix::libc::F_GETFL);
                    nix::libc::fcntl(
                        master.as_raw_fd(),
                        nix::libc::F_SETFL,
                        flags | nix::libc::O_NONBLOCK,
                    );
                }
                Ok(Self {
                    master,
                    child_pid: child,
                })
            }
        }
    }

    /// Wait up to `timeout_ms` for child output.
    pub fn poll_readable(&self, timeout_ms: u16) -> io::Result<bool> {
        let mut fds = [PollFd::new(self.master.as_fd(), PollFlags::POLLIN)];
        let n = poll(&mut fds, PollTimeout::from(timeout_ms)).map_err(io::Error::from)?;
        Ok(n > 0)
    }

    pub fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut file = unsafe { std::fs::File::from_raw_fd(self.master.as_raw_fd()) };
        let n = file.read(buf);
        std::mem::forget(file); // don't close the fd
        n
    }

    fn write(&self, data: &[u8]) -> io::Result<usize> {
        let mut file = unsafe { std::fs::File::from_raw_fd(self.master.as_raw_fd()) };
        let n = file.write(data);
        std::mem::forget(file);
        n
    }

    /// Write the whole buffer, retrying short writes and waiting out EAGAIN.
    pub fn write_all(&self, data: &[u8]) -> io::Result<()> {
        let mut written = 0;
        while written < data.len() {
            match self.write(&data[written..]) {
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    let mut fds = [PollFd::new(self.master.as_fd(), PollFlags::POLLOUT)];
                    poll(&mut fds, PollTimeout::from(100u16)).map_err(io::Error::from)?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Tell the kernel about a new grid shape.
    pub fn set_winsize(&self, rows: u16, cols: u16) {
        let winsize = Winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        unsafe {
            nix::libc::ioctl(
                self.master.as_raw_fd(),
                nix::libc::TIOCSWINSZ,
                &winsize as *const Winsize,
            );
        }
    }

    pub fn master_fd(&self) -> i32 {
        self.master.as_raw_fd()
    }

    pub fn child_pid(&self) -> i32 {
        self.child_pid.as_raw()
    }
}
