//! Process title.

use std::path::Path;

/// Title shown for a script loaded in-process: the file followed by its
/// arguments.
pub fn script_title(file: &str, args: &[String]) -> String {
    format!("{} {}", file, args.join(" ")).trim().to_string()
}

/// Short process name for a title: the file name of its first word.
pub fn short_name(title: &str) -> &str {
    let first = title.split_whitespace().next().unwrap_or("");
    Path::new(first)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(first)
}

/// Set the process title where the platform allows it.
///
/// Linux only exposes the 15-byte process name, so the kernel gets
/// [`short_name`] of the title rather than a path it would cut off.
/// Returns whether the name was set.
#[cfg(target_os = "linux")]
pub fn set_process_title(title: &str) -> bool {
    let Ok(name) = std::ffi::CString::new(short_name(title)) else {
        return false;
    };

    // SAFETY: PR_SET_NAME reads a NUL-terminated string that outlives the call.
    let rc = unsafe { libc::prctl(libc::PR_SET_NAME, name.as_ptr() as libc::c_ulong, 0, 0, 0) };
    tracing::debug!("Process title: {}", title);
    rc == 0
}

#[cfg(not(target_os = "linux"))]
pub fn set_process_title(_title: &str) -> bool {
    false
}
