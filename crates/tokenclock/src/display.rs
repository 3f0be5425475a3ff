// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Countdown presentation bound to a single display slot.

use std::time::Duration;

/// Identifier of the countdown slot.
pub const SLOT_ID: &str = "token-timer";

/// Host surface the countdown renders into.
pub trait DisplaySurface: Send + Sync {
    /// Create the slot next to the authorize control. Returns `false` if the
    /// control is not present.
    fn create_slot(&self, id: &str) -> bool;
    fn render(&self, id: &str, text: &str);
    fn remove_slot(&self, id: &str);
}

/// Remaining time until each deadline, clamped at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Remaining {
    pub refresh: Duration,
    pub expiry: Duration,
}

impl Remaining {
    pub fn is_zero(&self) -> bool {
        self.refresh.is_zero() && self.expiry.is_zero()
    }
}

/// Format the countdown text.
pub fn countdown_text(remaining: Remaining) -> String {
    format!(
        "Authorized! Token refreshes in {}s, would expire in {}s",
        rounded_secs(remaining.refresh),
        rounded_secs(remaining.expiry)
    )
}

/// Whole seconds, rounding half away from zero.
pub fn rounded_secs(d: Duration) -> u64 {
    ((d.as_millis() + 500) / 1000) as u64
}

/// Idempotent countdown slot. Creates the slot on first show and removes it
/// when there is nothing to show; repeated calls are no-ops.
pub struct CountdownDisplay {
    surface: Box<dyn DisplaySurface>,
    shown: Option<String>,
}

impl CountdownDisplay {
    pub fn new(surface: Box<dyn DisplaySurface>) -> Self {
        Self { surface, shown: None }
    }

    /// Whether the slot currently exists.
    pub fn is_shown(&self) -> bool {
        self.shown.is_some()
    }

    /// Currently rendered text, if any.
    pub fn text(&self) -> Option<&str> {
        self.shown.as_deref()
    }

    /// Show the countdown when authorized with time left, otherwise remove it.
    pub fn update(&mut self, remaining: Remaining, authorized: bool) {
        if authorized && !remaining.is_zero() {
            self.show(countdown_text(remaining));
        } else {
            self.remove();
        }
    }

    fn show(&mut self, text: String) {
        match self.shown.as_deref() {
            Some(current) if current == text => return,
            Some(_) => {}
            None => {
                if !self.surface.create_slot(SLOT_ID) {
                    tracing::debug!("authorize control not present, countdown not shown");
                    return;
                }
            }
        }
        self.surface.render(SLOT_ID, &text);
        self.shown = Some(text);
    }

    /// Remove the slot if present.
    pub fn remove(&mut self) {
        if self.shown.take().is_some() {
            self.surface.remove_slot(SLOT_ID);
        }
    }
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
