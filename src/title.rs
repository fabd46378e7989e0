use rand::Rng;
use rand::seq::SliceRandom;

pub const LABEL_MAX_CHARS: usize = 20;
pub const LABEL_KEEP_CHARS: usize = 17;
pub const ELLIPSIS: &str = "...";
pub const LABEL_SEPARATOR: &str = " | ";
pub const PREFIX_SEPARATOR: &str = " — ";
pub const TITLE_MAX_CHARS: usize = 100;

pub const PREFIX_TEMPLATES: &[&str] = &[
    "Top {n} Pranks Gone Wrong",
    "People Regret These {n} Moments",
    "Cringe Compilation: {n} Clips That Backfired",
    "When Pranks Fail — {n} Times",
    "You Won't Believe #1 — {n} Clips",
];

pub fn shorten_label(label: &str) -> String {
    if label.chars().count() <= LABEL_MAX_CHARS {
        return label.to_string();
    }
    let head: String = label.chars().take(LABEL_KEEP_CHARS).collect();
    format!("{head}{ELLIPSIS}")
}

pub fn label_summary<S: AsRef<str>>(labels: &[S]) -> String {
    labels
        .iter()
        .map(|l| shorten_label(l.as_ref()))
        .collect::<Vec<_>>()
        .join(LABEL_SEPARATOR)
}

pub fn prefix_phrase<R: Rng + ?Sized>(clip_count: usize, rng: &mut R) -> String {
    let template = PREFIX_TEMPLATES
        .choose(rng)
        .copied()
        .unwrap_or(PREFIX_TEMPLATES[0]);
    template.replace("{n}", &clip_count.to_string())
}

/// Builds the display title. With `rng` set a random phrase template is put
/// in front of the label summary.
pub fn assemble_title<S, R>(labels: &[S], rng: Option<&mut R>) -> String
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    let summary = label_summary(labels);
    match rng {
        Some(rng) => format!("{}{PREFIX_SEPARATOR}{summary}", prefix_phrase(labels.len(), rng)),
        None => summary,
    }
}

/// Clamps a title to the upload platform's character limit.
pub fn clamp_title(title: &str) -> String {
    if title.chars().count() <= TITLE_MAX_CHARS {
        return title.to_string();
    }
    let head: String = title.chars().take(TITLE_MAX_CHARS - ELLIPSIS.len()).collect();
    format!("{}{ELLIPSIS}", head.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn long_label_is_cut_to_seventeen_chars_plus_ellipsis() {
        let short = shorten_label("Absolutely Wild Reaction");
        assert_eq!(short, "Absolutely Wild R...");
        assert_eq!(short.chars().count(), LABEL_KEEP_CHARS + ELLIPSIS.len());
    }

    #[test]
    fn labels_up_to_twenty_chars_are_untouched() {
        assert_eq!(shorten_label("Exactly twenty chars"), "Exactly twenty chars");
        assert_eq!(shorten_label("Dog wins"), "Dog wins");
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let label = "Ünïcödé überraschung ja";
        let short = shorten_label(label);
        assert_eq!(short.chars().count(), 20);
        assert!(short.starts_with("Ünïcödé"));
    }

    #[test]
    fn summary_joins_with_separator() {
        let labels = ["Cat jump", "Absolutely Wild Reaction", "Oops"];
        assert_eq!(
            assemble_title::<_, StdRng>(&labels, None),
            "Cat jump | Absolutely Wild R... | Oops"
        );
    }

    #[test]
    fn prefix_uses_clip_count() {
        let labels = ["a", "b", "c"];
        let mut rng = StdRng::seed_from_u64(3);
        let title = assemble_title(&labels, Some(&mut rng));
        let matched = PREFIX_TEMPLATES.iter().any(|t| {
            let prefix = t.replace("{n}", "3");
            title == format!("{prefix}{PREFIX_SEPARATOR}a | b | c")
        });
        assert!(matched, "{title}");
    }

    #[test]
    fn every_template_is_reachable() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(prefix_phrase(4, &mut rng));
        }
        assert_eq!(seen.len(), PREFIX_TEMPLATES.len());
    }

    #[test]
    fn clamp_title_respects_limit() {
        let long = "x".repeat(150);
        let clamped = clamp_title(&long);
        assert_eq!(clamped.chars().count(), TITLE_MAX_CHARS);
        assert!(clamped.ends_with(ELLIPSIS));
        assert_eq!(clamp_title("short"), "short");
    }
}
