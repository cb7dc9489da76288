// Native backends, selected at build time.

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(windows)]
pub mod windows;

#[cfg(not(any(windows, target_os = "macos")))]
pub mod unsupported;


/// Text currently on the system clipboard.
pub trait ClipboardText {
    fn clipboard_text(&self) -> anyhow::Result<String>;
}

#[cfg(windows)]
pub type NativePlatform = windows::WindowsPlatform;

#[cfg(target_os = "macos")]
pub type NativePlatform = macos::MacosPlatform;

#[cfg(not(any(windows, target_os = "macos")))]
pub type NativePlatform = unsupported::UnsupportedPlatform;

/// Constructs the backend for this build target.
#[cfg(windows)]
pub fn native_platform() -> anyhow::Result<NativePlatform> {
    Ok(windows::WindowsPlatform::new())
}

/// Constructs the backend for this build target. Must run on the main thread,
/// which reads the keyboard layout through AppKit.
#[cfg(target_os = "macos")]
pub fn native_platform() -> anyhow::Result<NativePlatform> {
    let mtm = objc2::MainThreadMarker::new()
        .ok_or_else(|| anyhow::anyhow!("the macOS backend must be created on the main thread"))?;
    Ok(macos::MacosPlatform::new(mtm))
}

/// Constructs the backend for this build target.
#[cfg(not(any(windows, target_os = "macos")))]
pub fn native_platform() -> anyhow::Result<NativePlatform> {
    Ok(unsupported::UnsupportedPlatform::new())
}
