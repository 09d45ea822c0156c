// Exit code normalization for command conditions

/// Exit code reported when a command could not be launched at all
/// (not found, not executable), mirroring POSIX shells.
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = 127;

/// Map a requested exit code onto the 0..=255 range a process can report.
///
/// Negative and out-of-range requests wrap modulo 256, so `-1` matches 255.
pub fn normalize_exit_code(code: i32) -> i32 {
    code.rem_euclid(256)
}
