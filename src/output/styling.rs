use std::fmt::Display;

use console::{style, StyledObject};

/// Underlined section heading preceded by an icon.
pub fn section(icon: &str, title: impl Display) -> String {
    format!(
        "{} {}",
        style(icon).bright(),
        style(title.to_string()).bright().underlined()
    )
}

/// `<id> | <name>` heading of one tracked pipeline.
pub fn pipeline_label(pipeline_id: u64, name: &str) -> String {
    format!(
        "{} {} {}",
        style(pipeline_id).bright(),
        muted("|"),
        style(name).cyan()
    )
}

pub fn muted(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

/// Work that has not finished yet.
pub fn pending(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn done(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

/// Green when the pass recorded something, yellow when it recorded nothing.
pub fn added_count(count: usize) -> StyledObject<String> {
    if count == 0 {
        pending(count)
    } else {
        done(count)
    }
}

pub fn tool_name(text: impl Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}
