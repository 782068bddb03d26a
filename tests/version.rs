use chart_version_monitor::config::Chart;
use chart_version_monitor::version::index::IndexDocument;
use chart_version_monitor::version::semver::ChartVersion;
use chart_version_monitor::version::tracker::VersionTracker;

const REPOSITORY: &str = "https://charts.example.com/index.yaml";

fn watched() -> Vec<Chart> {
    ["A", "C"]
        .iter()
        .map(|name| Chart {
            name: name.to_string(),
            dependees: Vec::new(),
        })
        .collect()
}

fn decode(body: &str) -> IndexDocument {
    IndexDocument::decode(REPOSITORY, body.as_bytes(), &watched()).unwrap()
}

#[test]
fn prerelease_sorts_before_release() {
    let alpha = ChartVersion::parse("1.0.0-alpha").unwrap();
    let release = ChartVersion::parse("1.0.0").unwrap();

    assert!(alpha < release);
}

#[test]
fn tracker_reports_only_increases_across_cycles() {
    let mut tracker = VersionTracker::new();

    let first = decode(
        r#"
entries:
  A:
    - version: 1.0.0
    - version: 1.2.0
  B:
    - version: 9.9.9
  C:
    - version: bogus
"#,
    );
    assert!(tracker.update(&first).is_empty());
    assert!(tracker.highest(REPOSITORY, "B").is_none());
    assert!(tracker.highest(REPOSITORY, "C").is_none());

    let second = decode(
        r#"
entries:
  A:
    - version: 1.2.0
    - version: 1.3.0
  C:
    - version: 0.1.0
"#,
    );
    let events = tracker.update(&second);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].chart, "A");
    assert_eq!(events[0].version, ChartVersion::parse("1.3.0").unwrap());

    // C was first seen in the second cycle, so it only became a baseline
    assert_eq!(
        tracker.highest(REPOSITORY, "C"),
        Some(&ChartVersion::parse("0.1.0").unwrap())
    );

    let third = decode("entries:\n  A:\n    - version: 1.1.0\n");
    assert!(tracker.update(&third).is_empty());
    assert_eq!(
        tracker.highest(REPOSITORY, "A"),
        Some(&ChartVersion::parse("1.3.0").unwrap())
    );
}
