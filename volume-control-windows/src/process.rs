//! Process id to executable name lookup.

use windows::core::PWSTR;
use windows::Win32::Foundation::{CloseHandle, MAX_PATH};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION,
};

/// Executable file name (for example `spotify.exe`) of a running process.
///
/// `None` when the process has exited or cannot be opened, which is common
/// for elevated processes seen from an unelevated host.
pub fn process_name(pid: u32) -> Option<String> {
    image_path(pid).map(|path| file_name(&path).to_string())
}

/// Full image path of a running process.
pub fn image_path(pid: u32) -> Option<String> {
    if pid == 0 {
        return None;
    }
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;
        let mut buffer = [0u16; MAX_PATH as usize];
        let mut size = buffer.len() as u32;
        let queried = QueryFullProcessImageNameW(handle, PROCESS_NAME_WIN32, PWSTR(buffer.as_mut_ptr()), &mut size);
        let _ = CloseHandle(handle);

        match queried {
            Ok(()) => Some(String::from_utf16_lossy(&buffer[..size as usize])),
            Err(e) => {
                log::debug!("Cannot query image name of pid {}: {}", pid, e);
                None
            }
        }
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit(['\\', '/']).next().unwrap_or(path)
}
