//! Performance measurement utilities for process memory.
//!
//! This module reads point-in-time memory statistics for an arbitrary process id. On Linux
//! the values come straight from `/proc/<pid>/status`, which costs a single small file read
//! and keeps the memory sampler well under a millisecond per request. Other platforms go
//! through [`sysinfo`].

/// Reads a `kB`-valued field (`VmRSS`, `VmSize` or `VmHWM`) from `/proc/<pid>/status`.
#[cfg(target_os = "linux")]
fn read_status_kb(pid: u32, field: &str) -> Option<u64> {
    let status_content = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;

    for line in status_content.lines() {
        if let Some(rest) = line.strip_prefix(field)
            && let Some(rest) = rest.strip_prefix(':')
        {
            let value_str = rest.split_whitespace().next()?;
            return value_str.parse().ok();
        }
    }
    None
}

/// Returns the resident set size of process `pid` in bytes.
///
/// # Returns
/// `None` if the process does not exist or its status cannot be read.
#[cfg(target_os = "linux")]
pub fn resident_bytes(pid: u32) -> Option<u64> {
    read_status_kb(pid, "VmRSS").map(|kb| kb * 1024)
}

/// Returns the resident set size of process `pid` in bytes.
#[cfg(not(target_os = "linux"))]
pub fn resident_bytes(pid: u32) -> Option<u64> {
    with_process(pid, |process| process.memory())
}

/// Returns the virtual memory size (`VmSize`) of process `pid` in bytes.
#[cfg(target_os = "linux")]
pub fn virtual_bytes(pid: u32) -> Option<u64> {
    read_status_kb(pid, "VmSize").map(|kb| kb * 1024)
}

/// Returns the virtual memory size of process `pid` in bytes.
#[cfg(not(target_os = "linux"))]
pub fn virtual_bytes(pid: u32) -> Option<u64> {
    with_process(pid, |process| process.virtual_memory())
}

#[cfg(not(target_os = "linux"))]
fn with_process<T>(pid: u32, read: impl FnOnce(&sysinfo::Process) -> T) -> Option<T> {
    use sysinfo::{Pid, ProcessesToUpdate, System};

    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid).map(read)
}

/// Returns the resident set size of the calling process in bytes.
pub fn current_resident_bytes() -> Option<u64> {
    resident_bytes(std::process::id())
}

/// Reads the peak resident set size (`VmHWM`) of the calling process, in bytes.
///
/// # Returns
/// `None` off Linux, where no peak counter is read, or if the status file is unreadable.
pub fn peak_resident_bytes() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        read_status_kb(std::process::id(), "VmHWM").map(|kb| kb * 1024)
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}
