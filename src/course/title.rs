//! Lesson title normalization
//!
//! Turns raw file names and captions into display titles. The pipeline is
//! applied until it reaches a fixpoint, so normalizing an already
//! normalized title never changes it.

use regex::Regex;
use std::sync::OnceLock;

/// Title used when nothing displayable is left
pub const FALLBACK_TITLE: &str = "Untitled Lesson";

struct Patterns {
    extension: Regex,
    mention: Regex,
    forward_prefix: Regex,
    leading_separators: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        extension: Regex::new(r"(?i)\.(mp4|mkv|mov|avi|webm)$").expect("static regex"),
        mention: Regex::new(r"@\w+\s*[-_|]?\s*").expect("static regex"),
        forward_prefix: Regex::new(r"(?i)^(copy of|forwarded)\s*").expect("static regex"),
        leading_separators: Regex::new(r"^[-_|\s]+").expect("static regex"),
    })
}

/// Strip leading `-`, `_`, `|` and whitespace
pub(crate) fn strip_leading_separators(text: &str) -> String {
    patterns().leading_separators.replace(text, "").into_owned()
}

fn single_pass(text: &str) -> String {
    let p = patterns();
    let text = p.extension.replace(text, "");
    let text = p.mention.replace_all(&text, "");
    let text = p.forward_prefix.replace(&text, "");
    let text = p.leading_separators.replace(&text, "");
    text.trim().to_string()
}

/// Normalize a raw lesson name into a display title
pub fn normalize_title(raw: Option<&str>) -> String {
    let mut current = match raw {
        Some(raw) => raw.to_string(),
        None => return FALLBACK_TITLE.to_string(),
    };

    // Every pass only removes text, so this terminates.
    loop {
        let next = single_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }

    if current.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm", "MP4", "Mkv", "WebM"];

    const SAMPLES: &[&str] = &[
        "01 - Introduction.mp4",
        "@rustchannel - 02 Ownership.mkv",
        "Copy of Copy of 03 Borrowing.mov",
        "Forwarded @someone | Lifetimes.MP4",
        "  __--|| Traits  ",
        "video.mp4.mp4",
        "episode.mp4 ",
        "@only_a_mention",
        "Copy of",
        "",
        "   ",
        "Untitled Lesson",
        "Plain title",
        "Week 3: async/await @ home",
        "Ünïcödé @ユーザー 講座.webm",
    ];

    #[test]
    fn test_strips_extension_case_insensitive() {
        assert_eq!(normalize_title(Some("Lesson 1.MP4")), "Lesson 1");
        assert_eq!(normalize_title(Some("Lesson 1.webm")), "Lesson 1");
        assert_eq!(normalize_title(Some("Lesson 1.pdf")), "Lesson 1.pdf");
    }

    #[test]
    fn test_strips_mentions() {
        assert_eq!(
            normalize_title(Some("@rustchannel - 02 Ownership.mkv")),
            "02 Ownership"
        );
        assert_eq!(normalize_title(Some("Intro @uploader_bot")), "Intro");
    }

    #[test]
    fn test_strips_forward_prefixes() {
        assert_eq!(normalize_title(Some("Copy of Setup.mp4")), "Setup");
        assert_eq!(normalize_title(Some("forwarded - Setup")), "Setup");
        assert_eq!(normalize_title(Some("Copy of Copy of Setup")), "Setup");
    }

    #[test]
    fn test_strips_leading_separators() {
        assert_eq!(normalize_title(Some(" -_| Closures")), "Closures");
        assert_eq!(normalize_title(Some("Closures -")), "Closures -");
    }

    #[test]
    fn test_fallback() {
        assert_eq!(normalize_title(None), FALLBACK_TITLE);
        assert_eq!(normalize_title(Some("")), FALLBACK_TITLE);
        assert_eq!(normalize_title(Some("  ")), FALLBACK_TITLE);
        assert_eq!(normalize_title(Some(".mp4")), FALLBACK_TITLE);
        assert_eq!(normalize_title(Some("@someone -")), FALLBACK_TITLE);
    }

    #[test]
    fn test_idempotent() {
        for sample in SAMPLES {
            let once = normalize_title(Some(sample));
            let twice = normalize_title(Some(&once));
            assert_eq!(once, twice, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_extension_does_not_change_title() {
        for base in SAMPLES {
            for ext in EXTENSIONS {
                let with_ext = format!("{}.{}", base, ext);
                assert_eq!(
                    normalize_title(Some(&with_ext)),
                    normalize_title(Some(base)),
                    "extension {:?} changed title of {:?}",
                    ext,
                    base
                );
            }
        }
    }
}
