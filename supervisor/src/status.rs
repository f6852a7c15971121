//! Point-in-time node status.

use std::fmt;
use std::path::Path;

/// How a shutdown was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownKind {
    /// Signed shutdown message delivered to the node.
    Graceful,
    /// Termination signal sent to the process.
    Forced,
}

/// Lifecycle state of a supervised validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Created,
    /// Artifacts written, no process started.
    Prepared,
    Running { pid: u32 },
    /// The process exited on its own; `code` is `None` when a signal ended it.
    Exited { code: Option<i32> },
    /// The process exited after a shutdown request.
    Shutdown(ShutdownKind),
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Created => f.write_str("created"),
            NodeState::Prepared => f.write_str("prepared"),
            NodeState::Running { pid } => write!(f, "pid:{pid}"),
            NodeState::Exited { code: Some(code) } => write!(f, "rc:{code}"),
            NodeState::Exited { code: None } => f.write_str("rc:signal"),
            NodeState::Shutdown(ShutdownKind::Graceful) => f.write_str("shutdown"),
            NodeState::Shutdown(ShutdownKind::Forced) => f.write_str("killed"),
        }
    }
}

/// Status report for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub id: u32,
    pub name: String,
    pub state: NodeState,
    pub stdout_bytes: u64,
    pub stderr_bytes: u64,
    pub log_bytes: u64,
    pub has_error: bool,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.id, self.state)?;
        for (label, bytes) in [
            ("OUT", self.stdout_bytes),
            ("ERR", self.stderr_bytes),
            ("LOG", self.log_bytes),
        ] {
            if bytes > 0 {
                write!(f, " {label}: {}", human_bytes(bytes))?;
            }
        }
        if self.has_error {
            f.write_str(" ERROR")?;
        }
        Ok(())
    }
}

/// Size of the file at `path`, zero when absent.
pub(crate) fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

pub fn human_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.2} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.2} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.2} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_sizes() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.00 KiB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.00 MiB");
    }

    #[test]
    fn status_line() {
        let status = NodeStatus {
            id: 2,
            name: "validator-2".into(),
            state: NodeState::Running { pid: 4242 },
            stdout_bytes: 0,
            stderr_bytes: 10,
            log_bytes: 4096,
            has_error: true,
        };
        assert_eq!(status.to_string(), "2: pid:4242 ERR: 10 B LOG: 4.00 KiB ERROR");
    }

    #[test]
    fn exited_state_shows_code() {
        assert_eq!(NodeState::Exited { code: Some(3) }.to_string(), "rc:3");
    }
}
