use std::collections::HashMap;

use keytype_core::filter::WindowFilter;
use keytype_core::types::WindowDescriptor;

use crate::traits::WindowSystem;

/// Enumerates selectable windows: visible, titled, not our own and not an
/// ignored shell surface, sorted case-insensitively by title.
pub fn enumerate_windows<W>(system: &W, filter: &WindowFilter) -> Vec<WindowDescriptor>
where
    W: WindowSystem + ?Sized,
{
    filter.apply(system.list_windows())
}

/// The latest enumeration snapshot plus its label lookup. Each refresh
/// replaces both wholesale.
#[derive(Debug, Default)]
pub struct WindowDirectory {
    filter: Option<WindowFilter>,
    windows: Vec<WindowDescriptor>,
    by_label: HashMap<String, usize>,
}

impl WindowDirectory {
    pub fn new(filter: WindowFilter) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    /// Re-enumerates; may block briefly on the OS call.
    pub fn refresh<W>(&mut self, system: &W) -> &[WindowDescriptor]
    where
        W: WindowSystem + ?Sized,
    {
        let windows = match &self.filter {
            Some(filter) => enumerate_windows(system, filter),
            None => system.list_windows(),
        };
        self.replace(windows);
        &self.windows
    }

    fn replace(&mut self, windows: Vec<WindowDescriptor>) {
        let mut by_label = HashMap::with_capacity(windows.len());
        for (i, w) in windows.iter().enumerate() {
            // First wins if two windows somehow produce the same label.
            by_label.entry(w.label()).or_insert(i);
        }
        self.windows = windows;
        self.by_label = by_label;
    }

    pub fn windows(&self) -> &[WindowDescriptor] {
        &self.windows
    }

    pub fn labels(&self) -> Vec<String> {
        self.windows.iter().map(WindowDescriptor::label).collect()
    }

    pub fn lookup(&self, label: &str) -> Option<&WindowDescriptor> {
        self.by_label.get(label).map(|&i| &self.windows[i])
    }

    /// Label lookup, then a case-insensitive title match.
    pub fn find(&self, query: &str) -> Option<&WindowDescriptor> {
        if let Some(w) = self.lookup(query) {
            return Some(w);
        }
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.windows
            .iter()
            .find(|w| w.title.to_lowercase() == needle)
            .or_else(|| {
                self.windows
                    .iter()
                    .find(|w| w.title.to_lowercase().contains(&needle))
            })
    }
}
