//! Fire-and-forget narration side channel. Advisory only: it holds no
//! shared mutable state, its completion is never awaited, and it must never
//! gate loop progress.

use std::process::{Command, Stdio};

pub trait Narrator: Send + Sync {
    /// Queues `text` for narration and returns immediately.
    fn speak(&self, text: &str);
}

/// Shells out to the OS text-to-speech command, detached.
pub struct SpeechNarrator {
    program: &'static str,
}

impl SpeechNarrator {
    pub fn new() -> Self {
        #[cfg(target_os = "macos")]
        let program = "say";
        #[cfg(not(target_os = "macos"))]
        let program = "espeak";
        Self { program }
    }
}

impl Default for SpeechNarrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Narrator for SpeechNarrator {
    fn speak(&self, text: &str) {
        match Command::new(self.program)
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(mut child) => {
                // Reap the child off-thread; nobody waits on narration.
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => {
                tracing::debug!(program = self.program, error = %e, "narration unavailable");
            }
        }
    }
}

/// Silent narrator for tests and `narration = false` configs.
pub struct NullNarrator;

impl Narrator for NullNarrator {
    fn speak(&self, text: &str) {
        tracing::debug!(text, "narration suppressed");
    }
}
