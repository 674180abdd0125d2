//! Targets that macro playback writes to.
//!
//! Terminal sessions (local shell, SSH) implement `MacroSink`; the player
//! only needs to push raw bytes and read back what the session currently
//! shows.  RDP sessions have no text buffer and simply return `None`.

use std::sync::Mutex;

/// A session that can receive macro bytes.
///
/// Both methods are called from the playback task and must return quickly.
pub trait MacroSink: Send + Sync {
    /// Deliver raw bytes, exactly as a keyboard would.
    fn send_bytes(&self, data: &[u8]);

    /// Text currently visible in the session, if it has a text buffer.
    fn current_visible_text(&self) -> Option<String>;
}

/// An in-memory sink that records every byte it receives.
///
/// The visible text is whatever was last set with `set_screen`, plus the
/// received bytes when `echo` is enabled, which is enough to script
/// wait-for-text scenarios without a real terminal.
#[derive(Debug, Default)]
pub struct RecordingSink {
    inner: Mutex<Recorded>,
    echo: bool,
}

#[derive(Debug, Default)]
struct Recorded {
    received: Vec<u8>,
    screen: String,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose visible text also includes everything sent to it.
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    /// All bytes received so far.
    pub fn received(&self) -> Vec<u8> {
        self.lock().received.clone()
    }

    /// Replace the text the sink reports as visible.
    pub fn set_screen(&self, text: impl Into<String>) {
        self.lock().screen = text.into();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        // A poisoned lock only means another test thread panicked; the
        // recorded bytes are still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MacroSink for RecordingSink {
    fn send_bytes(&self, data: &[u8]) {
        let mut inner = self.lock();
        inner.received.extend_from_slice(data);
        if self.echo {
            let text = String::from_utf8_lossy(data).into_owned();
            inner.screen.push_str(&text);
        }
    }

    fn current_visible_text(&self) -> Option<String> {
        Some(self.lock().screen.clone())
    }
}
