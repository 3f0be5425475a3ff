// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Countdown rendered on a single rewritten terminal line.

use std::io::Write;

use crate::display::DisplaySurface;

/// Erase the current line and return the cursor to column zero.
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Renders the countdown slot to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalDisplay;

/// Surface that shows nothing, for `--no-countdown`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HiddenDisplay;

impl DisplaySurface for TerminalDisplay {
    fn create_slot(&self, _id: &str) -> bool {
        true
    }

    fn render(&self, _id: &str, text: &str) {
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "{CLEAR_LINE}{text}");
        let _ = err.flush();
    }

    fn remove_slot(&self, _id: &str) {
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "{CLEAR_LINE}");
        let _ = err.flush();
    }
}

impl DisplaySurface for HiddenDisplay {
    fn create_slot(&self, _id: &str) -> bool {
        false
    }

    fn render(&self, _id: &str, _text: &str) {}

    fn remove_slot(&self, _id: &str) {}
}
