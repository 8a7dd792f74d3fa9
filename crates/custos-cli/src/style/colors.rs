//! Semantic color palette.

use custos::AttributeStatus;
use owo_colors::{OwoColorize, Style};

fn success_style() -> Style {
    Style::new().green().bold()
}

fn error_style() -> Style {
    Style::new().red().bold()
}

fn warning_style() -> Style {
    Style::new().yellow()
}

fn muted_style() -> Style {
    Style::new().dimmed()
}

/// Style for one attribute status in a report.
pub fn status_style(status: AttributeStatus) -> Style {
    match status {
        AttributeStatus::Accepted => success_style(),
        AttributeStatus::Denied => error_style(),
        AttributeStatus::Required => warning_style(),
        AttributeStatus::Ignored | AttributeStatus::Optional => muted_style(),
    }
}

/// Applies semantic styles unless colors are disabled.
pub trait SemanticStyle {
    fn success(&self) -> String;
    fn error(&self) -> String;
    fn muted(&self) -> String;
    fn styled(&self, style: Style) -> String;
}

impl<T: std::fmt::Display> SemanticStyle for T {
    fn success(&self) -> String {
        self.styled(success_style())
    }

    fn error(&self) -> String {
        self.styled(error_style())
    }

    fn muted(&self) -> String {
        self.styled(muted_style())
    }

    fn styled(&self, style: Style) -> String {
        if super::no_color() {
            self.to_string()
        } else {
            self.style(style).to_string()
        }
    }
}
