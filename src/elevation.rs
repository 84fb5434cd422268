//! Elevation detection (the tray must not run as root)

/// Effective uid from a /proc/<pid>/status document
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn effective_uid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|l| l.strip_prefix("Uid:"))
        .and_then(|ids| ids.split_whitespace().nth(1))
        .and_then(|euid| euid.parse().ok())
}

#[cfg(target_os = "linux")]
pub fn is_elevated() -> bool {
    std::fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|s| effective_uid(&s))
        .map(|uid| uid == 0)
        .unwrap_or(false)
}

#[cfg(not(target_os = "linux"))]
pub fn is_elevated() -> bool {
    false
}

/// Whether an X11 or Wayland display is reachable
pub fn has_display() -> bool {
    ["DISPLAY", "WAYLAND_DISPLAY"]
        .iter()
        .any(|var| std::env::var_os(var).map(|v| !v.is_empty()).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_uid() {
        let status = "Name:\tcat\nUmask:\t0022\nState:\tR (running)\nUid:\t1000\t0\t0\t0\nGid:\t1000\t1000\t1000\t1000\n";
        assert_eq!(effective_uid(status), Some(0));

        let status = "Uid:\t1000\t1000\t1000\t1000\n";
        assert_eq!(effective_uid(status), Some(1000));

        assert_eq!(effective_uid("Name:\tcat\n"), None);
    }
}
