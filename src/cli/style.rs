//! Terminal styling for `tcpr` output
//!
//! Colors go through `owo-colors`, which honours `NO_COLOR` and `CLICOLOR`
//! and checks whether the target stream is a terminal. Styled values target
//! stdout; status lines written to stderr call [`Styled::for_stderr`] so the
//! check looks at the right stream.

use indicatif::ProgressStyle;
use owo_colors::{OwoColorize, Style};
use std::fmt;
use std::sync::OnceLock;

pub use owo_colors::Stream;

/// A value rendered with a style when its stream supports color
#[derive(Clone, Debug)]
pub struct Styled<T> {
    value: T,
    style: Style,
    stream: Stream,
}

impl<T> Styled<T> {
    const fn stdout(value: T, style: Style) -> Self {
        Self {
            value,
            style,
            stream: Stream::Stdout,
        }
    }

    /// Decide on color by looking at stderr
    #[must_use]
    pub const fn for_stderr(mut self) -> Self {
        self.stream = Stream::Stderr;
        self
    }
}

impl<T: fmt::Display> fmt::Display for Styled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let styled = self
            .value
            .if_supports_color(self.stream, |v| v.style(self.style));
        write!(f, "{styled}")
    }
}

/// Semantic styles for anything displayable
pub trait Stylize: fmt::Display {
    /// Branch names, paths, logins
    fn accent(&self) -> Styled<&Self> {
        Styled::stdout(self, Style::new().cyan())
    }

    /// Failure details
    fn error(&self) -> Styled<&Self> {
        Styled::stdout(self, Style::new().red())
    }

    /// Retry notices
    fn warn(&self) -> Styled<&Self> {
        Styled::stdout(self, Style::new().yellow())
    }

    /// Hints and metadata
    fn muted(&self) -> Styled<&Self> {
        Styled::stdout(self, Style::new().dimmed())
    }

    /// Headings
    fn emphasis(&self) -> Styled<&Self> {
        Styled::stdout(self, Style::new().bold())
    }
}

impl<T: fmt::Display + ?Sized> Stylize for T {}

/// Green check mark
pub const fn check() -> Styled<&'static str> {
    Styled::stdout("✓", Style::new().green())
}

/// Red cross
pub const fn cross() -> Styled<&'static str> {
    Styled::stdout("✗", Style::new().red())
}

/// `url` as an OSC 8 hyperlink when `stream` supports them, else plain text
pub fn hyperlink_url(stream: Stream, url: &str) -> String {
    let target = match stream {
        Stream::Stdout => supports_hyperlinks::Stream::Stdout,
        Stream::Stderr => supports_hyperlinks::Stream::Stderr,
    };
    if supports_hyperlinks::on(target) {
        terminal_link::Link::new(url, url).to_string()
    } else {
        url.to_string()
    }
}

/// Spinner shown while a run is in flight
pub fn spinner_style() -> ProgressStyle {
    static STYLE: OnceLock<ProgressStyle> = OnceLock::new();
    STYLE
        .get_or_init(|| {
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("hardcoded spinner template is valid")
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_selection() {
        assert!(matches!("x".accent().stream, Stream::Stdout));
        assert!(matches!(cross().for_stderr().stream, Stream::Stderr));
        assert!(matches!("x".error().for_stderr().stream, Stream::Stderr));
    }
}
