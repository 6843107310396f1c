//! Tests for ranking and winner selection.

use std::collections::BTreeMap;

use hestia::selector::{select_winner, RankedCase};
use hestia::{Coordinate, Coordinates, ExperimentResult, Ranking, Selection};

fn result(name: &str, values: &[(&str, u64)], clocks: u64) -> ExperimentResult {
    let coordinates = Coordinates::new(
        values
            .iter()
            .map(|(prefix, value)| Coordinate {
                axis: prefix.to_string(),
                prefix: prefix.to_string(),
                value: *value,
            })
            .collect(),
    );
    ExperimentResult::new(name.parse().unwrap(), coordinates, clocks, BTreeMap::new())
}

/// Three cases with equal clocks and areas 7, 9 and 5.
fn tied_results() -> Vec<ExperimentResult> {
    vec![
        result("a_3.b_4", &[("a", 3), ("b", 4)], 100),
        result("a_4.b_5", &[("a", 4), ("b", 5)], 100),
        result("a_2.b_3", &[("a", 2), ("b", 3)], 100),
    ]
}

#[test]
fn test_ranking_sorted_by_clocks_then_name() {
    let results = vec![
        result("l_2", &[("l", 2)], 31),
        result("l_0", &[("l", 0)], 11),
        result("l_1", &[("l", 1)], 21),
        result("m_0", &[("m", 0)], 11),
    ];
    let ranking = Ranking::rank(&results);
    assert_eq!(ranking.names(), vec!["l_0", "m_0", "l_1", "l_2"]);
}

#[test]
fn test_equal_clocks_smallest_area_wins() {
    let selection = Selection::from_results(&tied_results());
    let winner = selection.winner.unwrap();

    assert_eq!(winner.name.as_str(), "a_2.b_3");
    assert_eq!(winner.clocks, 100);
    assert_eq!(winner.area, 5);
}

#[test]
fn test_winner_is_order_independent() {
    let mut results = tied_results();
    let expected = Selection::from_results(&results);

    for _ in 0..results.len() {
        results.rotate_left(1);
        assert_eq!(Selection::from_results(&results), expected);
    }
    results.reverse();
    assert_eq!(Selection::from_results(&results), expected);
}

#[test]
fn test_lowest_clocks_then_lowest_area() {
    let a = result("a_10", &[("a", 10)], 100);
    let b = result("a_8", &[("a", 8)], 100);
    let c = result("a_50", &[("a", 50)], 90);

    let winner = Selection::from_results([&a, &b, &c]).winner.unwrap();
    assert_eq!(winner.name.as_str(), "a_50");

    let winner = Selection::from_results([&a, &b]).winner.unwrap();
    assert_eq!(winner.name.as_str(), "a_8");
    assert_eq!(winner.area, 8);
}

#[test]
fn test_fewer_clocks_beat_smaller_area() {
    let results = vec![
        result("a_9", &[("a", 9)], 50),
        result("a_1", &[("a", 1)], 60),
    ];
    let winner = Selection::from_results(&results).winner.unwrap();
    assert_eq!(winner.name.as_str(), "a_9");
}

#[test]
fn test_full_tie_goes_to_smallest_name() {
    let results = vec![
        result("b_1", &[("b", 1)], 10),
        result("a_1", &[("a", 1)], 10),
    ];
    let winner = Selection::from_results(&results).winner.unwrap();
    assert_eq!(winner.name.as_str(), "a_1");
}

#[test]
fn test_top_lists_are_prefixes() {
    let results: Vec<ExperimentResult> = (0..12)
        .map(|i| result(&format!("l_{}", i), &[("l", i)], 100 - i))
        .collect();
    let selection = Selection::from_results(&results);

    assert_eq!(selection.all.len(), 12);
    assert_eq!(selection.top_5.len(), 5);
    assert_eq!(selection.top_10.len(), 10);
    assert_eq!(selection.top_5.names(), selection.all.names()[..5].to_vec());
    assert_eq!(selection.top_10.names(), selection.all.names()[..10].to_vec());
    assert_eq!(selection.top_5.first().unwrap().name.as_str(), "l_11");
}

#[test]
fn test_short_ranking_top_lists() {
    let results = vec![result("l_0", &[("l", 0)], 11)];
    let selection = Selection::from_results(&results);
    assert_eq!(selection.top_5.len(), 1);
    assert_eq!(selection.top_10.len(), 1);
}

#[test]
fn test_no_results_no_winner() {
    let selection = Selection::from_results(&Vec::<ExperimentResult>::new());
    assert!(selection.all.is_empty());
    assert!(selection.winner.is_none());
    assert!(select_winner(std::iter::empty::<&RankedCase>()).is_none());
}

#[test]
fn test_ranking_serializes_as_ordered_map() {
    let results = vec![result("l_1", &[("l", 1)], 21), result("l_0", &[("l", 0)], 11)];
    let json = serde_json::to_string(&Ranking::rank(&results)).unwrap();
    assert_eq!(json, r#"{"l_0":11,"l_1":21}"#);
}
