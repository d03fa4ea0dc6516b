use std::path::Path;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        /// Effective user id of this process.
        pub fn effective_uid() -> u32 {
            unsafe { libc::geteuid() as u32 }
        }

        /// Whether the physical memory device can be opened for reading.
        /// Root always qualifies; otherwise defer to the device's mode bits.
        pub fn physical_memory_accessible(dev_mem: &Path) -> bool {
            use std::ffi::CString;
            use std::os::unix::ffi::OsStrExt;

            if effective_uid() == 0 {
                return dev_mem.exists();
            }
            let Ok(path) = CString::new(dev_mem.as_os_str().as_bytes()) else {
                return false;
            };
            unsafe { libc::access(path.as_ptr(), libc::R_OK) == 0 }
        }
    } else {
        pub fn effective_uid() -> u32 {
            0
        }

        pub fn physical_memory_accessible(_dev_mem: &Path) -> bool {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_device_is_not_accessible() {
        assert!(!physical_memory_accessible(Path::new("/nonexistent/hwdmi/mem")));
    }

    #[cfg(unix)]
    #[test]
    fn readable_file_is_accessible() {
        let path = std::env::temp_dir().join(format!("hwdmi-platform-{}", std::process::id()));
        std::fs::write(&path, b"x").expect("write fixture");
        assert!(physical_memory_accessible(&path));
        std::fs::remove_file(&path).ok();
    }
}
