//! Display blocks as Telegram HTML messages.

use teloxide::utils::html;

use crate::board::color;
use crate::board::DisplayBlock;

/// Telegram rejects messages over 4096 characters; leave some headroom.
pub const MESSAGE_LIMIT: usize = 4000;

/// Square emoji standing in for an attachment color.
pub fn color_marker(hex: &str) -> &'static str {
    match hex {
        color::BLOCKED => "🟥",
        color::BACKLOG => "🟪",
        color::DONE => "🟩",
        color::WORKING => "🟧",
        color::READY => "🟦",
        color::BLACK => "⬛",
        _ => "⬜",
    }
}

pub fn render_block(block: &DisplayBlock) -> String {
    let mut out = String::new();
    if let Some(pretext) = block.pretext() {
        out.push_str(&html::escape(pretext));
        out.push('\n');
    }

    let mut title = html::escape(block.title());
    if block.color() == color::BLACK {
        title = format!("<b>{}</b>", title);
    }
    let title = match block.title_link() {
        Some(link) => format!("<a href=\"{}\">{}</a>", html::escape(link), title),
        None => title,
    };
    out.push_str(color_marker(block.color()));
    out.push(' ');
    out.push_str(&title);

    if let Some(text) = block.text() {
        out.push('\n');
        out.push_str(&format!("<i>{}</i>", html::escape(text)));
    }
    out
}

/// Render blocks into as few messages as fit under [`MESSAGE_LIMIT`].
/// Blocks are never split across messages.
pub fn render_messages(blocks: &[DisplayBlock]) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current = String::new();

    for block in blocks {
        let rendered = render_block(block);
        let needed = current.chars().count() + rendered.chars().count() + 1;
        if !current.is_empty() && needed > MESSAGE_LIMIT {
            messages.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(&rendered);
    }
    if !current.is_empty() {
        messages.push(current);
    }
    messages
}
