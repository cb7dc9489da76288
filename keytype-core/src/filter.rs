use crate::types::WindowDescriptor;

/// Title fragments of OS shell surfaces that are never useful typing targets.
pub const DEFAULT_IGNORED_TITLE_SUBSTRINGS: &[&str] = &["task switch", "program manager"];

/// Decides which windows are offered to the user and tracked as "last active".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowFilter {
    // All entries are stored lowercased.
    self_process: String,
    ignored_processes: Vec<String>,
    ignored_title_substrings: Vec<String>,
}

impl WindowFilter {
    pub fn new(self_process: &str) -> Self {
        Self {
            self_process: self_process.trim().to_lowercase(),
            ignored_processes: Vec::new(),
            ignored_title_substrings: DEFAULT_IGNORED_TITLE_SUBSTRINGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn with_ignored_process(mut self, name: &str) -> Self {
        self.ignored_processes.push(name.trim().to_lowercase());
        self
    }

    pub fn with_ignored_title(mut self, substring: &str) -> Self {
        self.ignored_title_substrings
            .push(substring.trim().to_lowercase());
        self
    }

    pub fn accepts(&self, title: &str, process_name: &str) -> bool {
        let title = title.trim().to_lowercase();
        if title.is_empty() {
            return false;
        }
        if self
            .ignored_title_substrings
            .iter()
            .any(|sub| title.contains(sub.as_str()))
        {
            return false;
        }

        let process = process_name.trim().to_lowercase();
        if process.is_empty() {
            // Unknown owner (e.g. access denied); keep it.
            return true;
        }
        process != self.self_process && !self.ignored_processes.contains(&process)
    }

    /// Drops rejected windows, trims titles and sorts case-insensitively by title.
    pub fn apply(&self, windows: Vec<WindowDescriptor>) -> Vec<WindowDescriptor> {
        let mut out: Vec<WindowDescriptor> = windows
            .into_iter()
            .filter(|w| self.accepts(&w.title, &w.process_name))
            .map(|mut w| {
                w.title = w.title.trim().to_string();
                w.process_name = w.process_name.trim().to_string();
                w
            })
            .collect();
        sort_by_title(&mut out);
        out
    }
}

pub fn sort_by_title(windows: &mut [WindowDescriptor]) {
    windows.sort_by_cached_key(|w| w.title.to_lowercase());
}

/// Executable name of the running process, lowercased, for self-filtering.
pub fn current_process_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.file_name().map(|s| s.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WindowHandle;

    fn win(h: isize, title: &str, process: &str) -> WindowDescriptor {
        WindowDescriptor::new(WindowHandle::Hwnd(h), title, process)
    }

    #[test]
    fn rejects_self_shell_and_blank_titles() {
        let filter = WindowFilter::new("KeyType.exe");
        assert!(!filter.accepts("Settings", "keytype.exe"));
        assert!(!filter.accepts("Task Switching", "explorer.exe"));
        assert!(!filter.accepts("Program Manager", "explorer.exe"));
        assert!(!filter.accepts("   ", "notepad.exe"));
        assert!(filter.accepts("Untitled - Notepad", "notepad.exe"));
        assert!(filter.accepts("iDRAC console", ""));
    }

    #[test]
    fn extra_ignores_apply() {
        let filter = WindowFilter::new("keytype")
            .with_ignored_process("Dock")
            .with_ignored_title("Notification Center");
        assert!(!filter.accepts("Dock", "dock"));
        assert!(!filter.accepts("notification center", "ControlCenter"));
    }

    #[test]
    fn apply_sorts_case_insensitively() {
        let filter = WindowFilter::new("keytype.exe");
        let out = filter.apply(vec![
            win(1, "zeta", "a.exe"),
            win(2, " Alpha ", "b.exe"),
            win(3, "beta", "keytype.exe"),
            win(4, "Beta", "c.exe"),
        ]);
        let titles: Vec<_> = out.iter().map(|w| w.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta", "zeta"]);
    }
}
