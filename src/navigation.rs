use crate::routing::split_url;
use tracing::debug;

/// Options for a client-side route change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushOptions {
    pub scroll: bool,
}

/// The browser location, as seen by the synchronizer
pub trait Navigator: Send {
    /// Change the route without a full reload
    fn push_url(&mut self, url: &str, options: PushOptions);

    fn current_path(&self) -> String;

    /// Raw query string without the leading `?`
    fn search_params(&self) -> String;

    fn current_url(&self) -> String {
        let query = self.search_params();
        if query.is_empty() {
            self.current_path()
        } else {
            format!("{}?{}", self.current_path(), query)
        }
    }
}

/// In-process history stack with back/forward
#[derive(Debug, Clone)]
pub struct MemoryNavigator {
    entries: Vec<String>,
    index: usize,
    last_scroll: bool,
}

impl MemoryNavigator {
    pub fn new(initial_url: &str) -> Self {
        Self {
            entries: vec![initial_url.to_string()],
            index: 0,
            last_scroll: false,
        }
    }

    /// Step back in history. Returns false at the first entry.
    pub fn back(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        debug!("Navigated back to {}", self.entries[self.index]);
        true
    }

    pub fn forward(&mut self) -> bool {
        if self.index + 1 >= self.entries.len() {
            return false;
        }
        self.index += 1;
        debug!("Navigated forward to {}", self.entries[self.index]);
        true
    }

    /// Entries up to and including the current one
    pub fn history(&self) -> &[String] {
        &self.entries[..=self.index]
    }

    pub fn last_scroll(&self) -> bool {
        self.last_scroll
    }

    fn current(&self) -> (String, String) {
        split_url(&self.entries[self.index])
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new("/")
    }
}

impl Navigator for MemoryNavigator {
    fn push_url(&mut self, url: &str, options: PushOptions) {
        self.entries.truncate(self.index + 1);
        self.entries.push(url.to_string());
        self.index += 1;
        self.last_scroll = options.scroll;
        debug!("Pushed {}", url);
    }

    fn current_path(&self) -> String {
        self.current().0
    }

    fn search_params(&self) -> String {
        self.current().1
    }
}
