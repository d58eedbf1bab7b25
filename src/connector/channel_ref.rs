//! Channel reference parsing
//!
//! Users paste channels in many shapes: web client URLs, `t.me` links,
//! private `t.me/c/` links, bare usernames or numeric ids.

use std::fmt;

/// Prefix the remote source uses for private channel ids
const PRIVATE_CHANNEL_PREFIX: &str = "-100";

/// A resolved channel reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRef {
    /// Numeric channel id
    Id(i64),
    /// Public username
    Username(String),
}

/// Leading `-?digits` of a string, if any
fn leading_id(s: &str) -> Option<i64> {
    let end = s
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].parse().ok()
}

impl ChannelRef {
    /// Parse user input into a channel reference
    pub fn parse(input: &str) -> Self {
        let input = input.trim();

        if input.contains("web.telegram.org") {
            if let Some(id) = input.split_once('#').and_then(|(_, frag)| leading_id(frag)) {
                return ChannelRef::Id(id);
            }
        }

        if let Some((_, rest)) = input.split_once("t.me/c/") {
            let raw = rest.split('/').next().unwrap_or_default();
            if let Ok(id) = format!("{}{}", PRIVATE_CHANNEL_PREFIX, raw).parse::<i64>() {
                return ChannelRef::Id(id);
            }
        }

        if let Some((_, rest)) = input.split_once("t.me/") {
            let name = rest.split('/').next().unwrap_or_default();
            return ChannelRef::Username(name.trim_start_matches('@').to_string());
        }

        if let Ok(id) = input.parse::<i64>() {
            return ChannelRef::Id(id);
        }

        ChannelRef::Username(input.trim_start_matches('@').to_string())
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRef::Id(id) => write!(f, "{}", id),
            ChannelRef::Username(name) => write!(f, "{}", name),
        }
    }
}
