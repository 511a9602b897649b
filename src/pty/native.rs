//! Native PTY implementation using portable-pty.

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty};
use std::io::{Read, Write};

use super::PtySize;
use crate::error::TtyShareError;
use crate::Result;

/// Get the default shell for the current platform.
pub fn default_shell() -> String {
    #[cfg(unix)]
    {
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
    }
    #[cfg(windows)]
    {
        "powershell.exe".to_string()
    }
}

/// Wrapper around the native PTY system.
pub struct NativePty {
    pty_system: Box<dyn portable_pty::PtySystem + Send>,
}

impl NativePty {
    /// Create a new NativePty instance.
    pub fn new() -> Self {
        Self {
            pty_system: native_pty_system(),
        }
    }

    /// Spawn `command` with `args` in a new PTY of the given size.
    ///
    /// The environment is inherited from this process.
    pub fn spawn(&self, command: &str, args: &[String], size: PtySize) -> Result<PtyHandle> {
        let pair = self
            .pty_system
            .openpty(size.into())
            .map_err(|e| TtyShareError::Pty(e.to_string()))?;

        let mut cmd = CommandBuilder::new(command);
        cmd.args(args);

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| TtyShareError::Pty(format!("failed to spawn {}: {}", command, e)))?;

        let pid = child.process_id().unwrap_or(0);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| TtyShareError::Pty(e.to_string()))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| TtyShareError::Pty(e.to_string()))?;

        Ok(PtyHandle {
            reader,
            writer,
            pid,
            master: pair.master,
            child,
        })
    }

    /// Spawn the default shell.
    pub fn spawn_default(&self, size: PtySize) -> Result<PtyHandle> {
        self.spawn(&default_shell(), &[], size)
    }
}

impl Default for NativePty {
    fn default() -> Self {
        Self::new()
    }
}

/// A spawned process and the master side of its PTY.
pub struct PtyHandle {
    /// Reader for the PTY output.
    pub reader: Box<dyn Read + Send>,
    /// Writer for the PTY input.
    pub writer: Box<dyn Write + Send>,
    /// Process ID of the spawned child.
    pub pid: u32,
    /// Master side, needed for resizing.
    pub master: Box<dyn MasterPty + Send>,
    /// The spawned process.
    pub child: Box<dyn Child + Send + Sync>,
}

impl PtyHandle {
    /// Change the window size of the PTY.
    pub fn resize(&self, size: PtySize) -> Result<()> {
        resize(self.master.as_ref(), size)
    }
}

/// Change the window size of a PTY master.
pub(crate) fn resize(master: &(dyn MasterPty + Send), size: PtySize) -> Result<()> {
    master
        .resize(size.into())
        .map_err(|e| TtyShareError::Pty(e.to_string()))
}

/// Current window size of a PTY master.
pub(crate) fn current_size(master: &(dyn MasterPty + Send)) -> Result<PtySize> {
    let size = master
        .get_size()
        .map_err(|e| TtyShareError::Pty(e.to_string()))?;
    Ok(PtySize::new(size.rows, size.cols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_pty::ChildKiller;

    #[test]
    fn test_default_shell() {
        let shell = default_shell();
        assert!(!shell.is_empty());

        #[cfg(windows)]
        {
            assert!(shell.ends_with(".exe"));
        }
    }

    #[test]
    fn test_spawn_shell() {
        let pty = NativePty::new();
        let handle = pty.spawn_default(PtySize::default());

        assert!(handle.is_ok(), "Failed to spawn shell: {:?}", handle.err());

        let mut handle = handle.unwrap();
        assert!(handle.pid > 0, "PID should be positive");
        let _ = handle.child.kill();
    }

    #[test]
    #[cfg(unix)]
    fn test_resize() {
        let pty = NativePty::new();
        let mut handle = pty.spawn("/bin/sh", &[], PtySize::new(24, 80)).unwrap();

        handle.resize(PtySize::new(40, 120)).unwrap();
        assert_eq!(
            current_size(handle.master.as_ref()).unwrap(),
            PtySize::new(40, 120)
        );
        let _ = handle.child.kill();
    }

    #[test]
    #[cfg(unix)]
    fn test_spawn_with_args() {
        let pty = NativePty::new();
        let mut handle = pty
            .spawn("/bin/sh", &["-c".to_string(), "exit 3".to_string()], PtySize::default())
            .unwrap();

        let status = handle.child.wait().unwrap();
        assert_eq!(status.exit_code(), 3);
    }

    #[test]
    fn test_spawn_missing_command() {
        let pty = NativePty::new();
        let result = pty.spawn("/definitely/not/a/command", &[], PtySize::default());
        assert!(matches!(result, Err(TtyShareError::Pty(_))));
    }
}
