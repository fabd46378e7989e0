use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use shorts_compiler::filter::{CandidateFilter, FixedClock};
use shorts_compiler::selector::{select, valid_sets};
use shorts_compiler::title::{assemble_title, shorten_label};
use shorts_compiler::trim::TrimPolicy;
use shorts_compiler::{SearchResult, SelectionCriteria, SelectionError, SourceTag};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 15, 18, 0, 0).unwrap()
}

fn hit(id: &str, title: &str, duration: &str, age_days: i64) -> SearchResult {
    SearchResult {
        id: id.to_string(),
        title: title.to_string(),
        url: format!("https://www.youtube.com/watch?v={id}"),
        duration: duration.to_string(),
        published_at: now() - Duration::days(age_days),
        tags: vec!["shorts".to_string()],
        source: SourceTag::Youtube,
    }
}

fn search_page() -> Vec<SearchResult> {
    vec![
        hit("v01", "Prank goes sideways", "PT20S", 2),
        hit("v02", "Epic FAIL on ice", "PT5S", 4),
        hit("v03", "Cooking tutorial", "PT9S", 1),
        hit("v04", "Funny cat fail", "PT10S", 3),
        hit("v05", "Old prank", "PT7S", 45),
        hit("v06", "Cringe dance fail", "PT1M5S", 1),
        hit("v07", "Funny dog prank", "PT12S", 6),
        hit("v08", "Broken duration prank", "later", 1),
        hit("v09", "Cringe wedding moment", "PT14S", 9),
    ]
}

fn criteria() -> SelectionCriteria {
    SelectionCriteria::new(3, 5, 58, ["prank", "fail", "funny", "cringe"]).unwrap()
}

#[test]
fn filter_keeps_only_usable_results_in_arrival_order() {
    let candidates =
        CandidateFilter::default().apply(&search_page(), &criteria(), &FixedClock(now()));
    let ids: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["v01", "v02", "v04", "v07", "v09"]);
}

#[test]
fn selection_then_trim_then_title() {
    let crit = criteria();
    let candidates = CandidateFilter::default().apply(&search_page(), &crit, &FixedClock(now()));

    let sets = valid_sets(&candidates, &crit).unwrap();
    assert_eq!(sets.len(), 2);

    let mut rng = StdRng::seed_from_u64(2024);
    let selection = select(&candidates, &crit, &mut rng).unwrap();
    assert!((3..=5).contains(&selection.len()));
    assert!(selection.total_secs() <= 58);
    assert!(sets.iter().any(|s| s.as_slice() == selection.clips()));

    let plan = TrimPolicy::new(crit.max_total_secs, 15).plan(&selection);
    assert_eq!(plan.len(), selection.len());
    assert!(plan.iter().map(|p| p.allowed_secs).sum::<u32>() <= 58);
    assert!(plan.iter().all(|p| p.allowed_secs <= 15));

    let labels: Vec<String> = selection.iter().map(|c| c.title.clone()).collect();
    let title = assemble_title(labels.as_slice(), Some(&mut rng));
    assert!(title.contains(&selection.len().to_string()));
    let last = labels.last().map(|l| shorten_label(l)).unwrap_or_default();
    assert!(title.ends_with(&last), "{title}");
}

#[test]
fn reference_trim_example() {
    let crit = SelectionCriteria::new(3, 3, 58, Vec::<String>::new()).unwrap();
    let page = vec![
        hit("x", "a", "PT20S", 1),
        hit("y", "b", "PT5S", 1),
        hit("z", "c", "PT10S", 1),
    ];
    let candidates = CandidateFilter::default().apply(&page, &crit, &FixedClock(now()));
    let selection = select(&candidates, &crit, &mut StdRng::seed_from_u64(0)).unwrap();

    // selector hands clips over shortest first
    let order: Vec<&str> = selection.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(order, ["y", "z", "x"]);

    let plan = TrimPolicy::new(58, 15).plan(&candidates);
    let allowed: Vec<u32> = plan.iter().map(|p| p.allowed_secs).collect();
    assert_eq!(allowed, [15, 5, 10]);
}

#[test]
fn too_few_survivors_is_infeasible() {
    let crit = SelectionCriteria::new(6, 8, 58, ["prank"]).unwrap();
    let candidates = CandidateFilter::default().apply(&search_page(), &crit, &FixedClock(now()));
    let err = select(&candidates, &crit, &mut StdRng::seed_from_u64(1)).unwrap_err();
    assert!(matches!(err, SelectionError::Infeasible { .. }));
}
