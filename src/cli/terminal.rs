//! Output styling and prompt detection

use std::io::IsTerminal;

use owo_colors::{colors::css, OwoColorize};

/// Whether stdout accepts ANSI colours.
fn colors_enabled() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Whether a user is there to answer prompts.
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}

fn paint(text: &str, style: impl FnOnce(&str) -> String) -> String {
    if colors_enabled() {
        style(text)
    } else {
        text.to_string()
    }
}

/// Styles report text, falling back to plain text without colour support.
pub trait Colorize {
    /// Passed checks.
    fn success(&self) -> String;
    /// Failed checks.
    fn error(&self) -> String;
    /// Request lines and methods.
    fn info(&self) -> String;
    /// Section titles and secondary detail.
    fn dim(&self) -> String;
}

impl<T: AsRef<str> + ?Sized> Colorize for T {
    fn success(&self) -> String {
        paint(self.as_ref(), |text| text.fg::<css::Green>().to_string())
    }

    fn error(&self) -> String {
        paint(self.as_ref(), |text| text.fg::<css::IndianRed>().to_string())
    }

    fn info(&self) -> String {
        paint(self.as_ref(), |text| text.fg::<css::LightBlue>().to_string())
    }

    fn dim(&self) -> String {
        paint(self.as_ref(), |text| text.dimmed().to_string())
    }
}
