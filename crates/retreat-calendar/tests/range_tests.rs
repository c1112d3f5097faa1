//! Tests for upcoming / past / all selection.

use chrono::{DateTime, Duration, TimeZone, Utc};
use retreat_calendar::{filter_occurrences, next_occurrence, CalendarRange, Occurrence};

fn occurrence(id: &str, start: DateTime<Utc>, hours: i64) -> Occurrence {
    Occurrence {
        id: id.to_string(),
        slug: None,
        title: id.to_string(),
        start,
        end: start + Duration::hours(hours),
        all_day: false,
        location: None,
        description: None,
        recurring: false,
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

fn sample() -> Vec<Occurrence> {
    vec![
        occurrence("ended", now() - Duration::days(2), 1),
        occurrence("in-progress", now() - Duration::hours(1), 3),
        occurrence("future", now() + Duration::days(3), 1),
        occurrence("ends-now", now() - Duration::hours(2), 2),
    ]
}

fn ids(occurrences: &[Occurrence]) -> Vec<&str> {
    occurrences.iter().map(|o| o.id.as_str()).collect()
}

#[test]
fn upcoming_keeps_in_progress_and_future() {
    let got = filter_occurrences(sample(), CalendarRange::Upcoming, now());
    assert_eq!(ids(&got), vec!["in-progress", "future", "ends-now"]);
}

#[test]
fn past_keeps_only_ended() {
    let got = filter_occurrences(sample(), CalendarRange::Past, now());
    assert_eq!(ids(&got), vec!["ended"]);
}

#[test]
fn all_keeps_everything_in_order() {
    let expected = sample();
    let got = filter_occurrences(sample(), CalendarRange::All, now());
    assert_eq!(ids(&got), ids(&expected));
}

#[test]
fn range_tokens() {
    assert_eq!("upcoming".parse::<CalendarRange>().unwrap(), CalendarRange::Upcoming);
    assert_eq!("PAST".parse::<CalendarRange>().unwrap(), CalendarRange::Past);
    assert_eq!("all".parse::<CalendarRange>().unwrap(), CalendarRange::All);
    assert!("later".parse::<CalendarRange>().is_err());
    assert_eq!(CalendarRange::default(), CalendarRange::Upcoming);
    assert_eq!(CalendarRange::Past.to_string(), "past");
}

#[test]
fn next_occurrence_is_earliest_unfinished() {
    let occurrences = sample();
    let next = next_occurrence(&occurrences, now()).expect("something is upcoming");
    assert_eq!(next.id, "ends-now");

    let later = now() + Duration::days(10);
    assert!(next_occurrence(&occurrences, later).is_none());
}
