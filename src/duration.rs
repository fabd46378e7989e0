use once_cell::sync::OnceCell;
use regex::Regex;

fn duration_regex() -> Option<&'static Regex> {
    static DURATION_RE: OnceCell<Regex> = OnceCell::new();
    DURATION_RE
        .get_or_try_init(|| Regex::new(r"^PT(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$"))
        .ok()
}

/// Converts a compound duration such as `PT1H2M3S` into whole seconds.
///
/// Components are optional but must appear in H, M, S order and at least one
/// must be present. Anything that does not match returns 0, which the filter
/// treats as an unknown duration and discards.
pub fn parse_duration_secs(input: &str) -> u32 {
    let Some(re) = duration_regex() else {
        return 0;
    };
    let Some(caps) = re.captures(input.trim()) else {
        return 0;
    };
    if caps.get(1).is_none() && caps.get(2).is_none() && caps.get(3).is_none() {
        return 0;
    }

    let component = |idx: usize| -> Option<u64> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse::<u64>().ok(),
            None => Some(0),
        }
    };

    let (Some(h), Some(m), Some(s)) = (component(1), component(2), component(3)) else {
        return 0;
    };

    let total = h
        .checked_mul(3600)
        .and_then(|v| v.checked_add(m.checked_mul(60)?))
        .and_then(|v| v.checked_add(s));

    match total.and_then(|v| u32::try_from(v).ok()) {
        Some(v) => v,
        None => 0,
    }
}
