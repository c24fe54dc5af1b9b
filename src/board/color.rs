//! Status label to attachment color.

pub const BLOCKED: &str = "#c40022";
pub const BACKLOG: &str = "#9966ee";
pub const DONE: &str = "#00a96d";
pub const WORKING: &str = "#ff9d00";
pub const READY: &str = "#1e6ec1";
pub const BLACK: &str = "#333333";
pub const NEUTRAL: &str = "#cccccc";

/// Rules in precedence order: (keyword matched as substring, exact alias, color).
const RULES: &[(&str, &str, &str)] = &[
    ("blocked", "red", BLOCKED),
    ("backlog", "purple", BACKLOG),
    ("done", "green", DONE),
    ("working", "yellow", WORKING),
    ("ready", "blue", READY),
];

/// Resolve the color of a status label. First matching rule wins.
pub fn resolve(label: Option<&str>) -> &'static str {
    let text = match label {
        Some(l) if !l.is_empty() => l.to_lowercase(),
        _ => return NEUTRAL,
    };

    for (keyword, alias, color) in RULES {
        if text.contains(keyword) || text == *alias {
            return color;
        }
    }

    if text == "black" {
        BLACK
    } else {
        NEUTRAL
    }
}
