//! Terminal color palette.
//!
//! Uses standard ANSI bright colors so output stays readable on both light
//! and dark terminals.

use colored::{ColoredString, Colorize};

use crate::check::CheckStatus;

/// Semantic colors for report output.
pub trait PaletteExt {
    /// Section headers
    fn accent(&self) -> ColoredString;
    /// Field labels
    fn label(&self) -> ColoredString;
    /// Secondary detail (timings, URLs)
    fn muted(&self) -> ColoredString;
    fn good(&self) -> ColoredString;
    fn caution(&self) -> ColoredString;
    fn bad(&self) -> ColoredString;
}

impl<S: AsRef<str>> PaletteExt for S {
    fn accent(&self) -> ColoredString {
        self.as_ref().bright_purple().bold()
    }

    fn label(&self) -> ColoredString {
        self.as_ref().bright_cyan().bold()
    }

    fn muted(&self) -> ColoredString {
        self.as_ref().bright_black()
    }

    fn good(&self) -> ColoredString {
        self.as_ref().bright_green().bold()
    }

    fn caution(&self) -> ColoredString {
        self.as_ref().bright_yellow().bold()
    }

    fn bad(&self) -> ColoredString {
        self.as_ref().bright_red().bold()
    }
}

/// Color a piece of text by the verdict it describes.
pub fn paint_status(text: &str, status: CheckStatus) -> ColoredString {
    match status {
        CheckStatus::Alive => text.good(),
        // A redirect is still reachable.
        CheckStatus::Redirect => text.bright_blue().bold(),
        CheckStatus::Warning => text.caution(),
        CheckStatus::Deprecated => text.bad(),
    }
}
