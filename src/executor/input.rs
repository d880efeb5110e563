//! Physical pointer/keyboard injection. All coordinates arriving here are
//! logical — conversion from capture pixels happens in perception.

use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use enigo::{Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};

use crate::errors::{OmniPilotError, OmniPilotResult};

/// Input-injection capability: move, click, and type primitives. The
/// production backend wraps enigo; tests record calls instead of moving a
/// real pointer.
#[async_trait]
pub trait InputBackend: Send + Sync {
    async fn move_to(&self, x: i32, y: i32) -> OmniPilotResult<()>;
    async fn click(&self) -> OmniPilotResult<()>;
    async fn type_text(&self, text: &str) -> OmniPilotResult<()>;

    /// Move to the logical coordinate, then click there.
    async fn click_at(&self, x: i32, y: i32) -> OmniPilotResult<()> {
        self.move_to(x, y).await?;
        self.click().await
    }
}

/// Delay between injected operations; gives the window system time to
/// register each event.
const ACTION_PAUSE_MS: u64 = 100;

/// True when the pointer sits in any of the four screen corners.
fn at_screen_corner(x: i32, y: i32, width: i32, height: i32) -> bool {
    let on_x_edge = x <= 0 || x >= width - 1;
    let on_y_edge = y <= 0 || y >= height - 1;
    on_x_edge && on_y_edge
}

pub struct EnigoDriver {
    enigo: StdMutex<Enigo>,
}

impl EnigoDriver {
    pub fn new() -> OmniPilotResult<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| OmniPilotError::Executor(format!("input backend init: {e}")))?;
        Ok(Self {
            enigo: StdMutex::new(enigo),
        })
    }

    fn lock(&self) -> OmniPilotResult<std::sync::MutexGuard<'_, Enigo>> {
        self.enigo
            .lock()
            .map_err(|e| OmniPilotError::Executor(format!("input backend poisoned: {e}")))
    }

    /// Safety trip-wire: a pointer parked in a screen corner means the
    /// operator intervened (or something is running away). Checked before
    /// every injection; aborts the whole process — intentionally
    /// unrecoverable.
    fn check_trip_wire(enigo: &Enigo) {
        let Ok((x, y)) = enigo.location() else {
            return;
        };
        // Unknown display size still trips on the top-left corner.
        let (width, height) = enigo.main_display().unwrap_or((i32::MAX, i32::MAX));
        if at_screen_corner(x, y, width, height) {
            tracing::error!(x, y, "safety trip-wire: pointer parked in a screen corner, aborting");
            std::process::exit(1);
        }
    }

    async fn settle() {
        tokio::time::sleep(std::time::Duration::from_millis(ACTION_PAUSE_MS)).await;
    }
}

#[async_trait]
impl InputBackend for EnigoDriver {
    async fn move_to(&self, x: i32, y: i32) -> OmniPilotResult<()> {
        {
            let mut enigo = self.lock()?;
            Self::check_trip_wire(&enigo);
            enigo
                .move_mouse(x, y, Coordinate::Abs)
                .map_err(|e| OmniPilotError::Executor(format!("move failed: {e}")))?;
        }
        tracing::debug!(x, y, "pointer moved");
        Self::settle().await;
        Ok(())
    }

    async fn click(&self) -> OmniPilotResult<()> {
        {
            let mut enigo = self.lock()?;
            Self::check_trip_wire(&enigo);
            enigo
                .button(Button::Left, Direction::Click)
                .map_err(|e| OmniPilotError::Executor(format!("click failed: {e}")))?;
        }
        tracing::debug!("click injected");
        Self::settle().await;
        Ok(())
    }

    async fn type_text(&self, text: &str) -> OmniPilotResult<()> {
        {
            let mut enigo = self.lock()?;
            Self::check_trip_wire(&enigo);
            enigo
                .text(text)
                .map_err(|e| OmniPilotError::Executor(format!("type failed: {e}")))?;
        }
        tracing::debug!(chars = text.chars().count(), "keystrokes injected");
        Self::settle().await;
        Ok(())
    }
}
