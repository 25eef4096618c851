//! End-to-end processing of a small event table

use kstarmumu::{
    histogram::Axis,
    input::{self, InputError},
    output,
    pipeline::EventProcessor,
    q2bins,
    resfin::FinalResults,
    scheduling,
    selection::{ProfileRegistry, GENERATOR_ONLY_PROFILE, STRICT_PROFILE},
};

/// A candidate passing the strict cuts, with some vertex confidence level
fn cand_row(run: u64, event: u64, vertex_cl: &str) -> String {
    format!(
        "cand {run} {event} 1 8 3 10 5.28 {vertex_cl} 0.3 0.01 0.9999 0.9998 0.05 \
         1.2 0.4 1.5 0.05 0.01 2 0.8 2.5 1.1 0.5 1.3 0.9 0.3 1.2 2.5 1 3 2.3 0.8 3 \
         1 10 2 0.9 0.01 0.5 1 10 2 0.9 0.01 0.5 0.89 2.5 0.02\n"
    )
}

/// The generated decay behind `cand_row`
fn gen_row(run: u64, event: u64) -> String {
    format!(
        "gen {run} {event} 1 1 8 3 10 3.2 1.2 4 1.2 0.4 1.5 2 0.8 2.5 0.1 0.2 1.5 \
         1.1 0.5 1.3 0.9 0.3 1.2 2.5 1 3 2.3 0.8 3\n"
    )
}

fn table() -> String {
    let mut table = String::from("# run event columns...\n\n");
    table += &cand_row(1, 1, "0.5");
    table += &cand_row(1, 1, "0.05");
    table += &gen_row(1, 1);
    table += &cand_row(1, 2, "0.01");
    table += &gen_row(1, 2);
    table += &cand_row(2, 1, "0.8");
    table
}

fn process(profile: &str) -> FinalResults {
    let events = input::read_events(table().as_bytes()).unwrap();
    assert_eq!(events.len(), 3);
    let processor = EventProcessor::new(
        &ProfileRegistry::with_builtin(),
        profile,
        true,
        *q2bins::find("full").unwrap(),
        Axis::new(4, -1., 1.),
        Axis::new(4, -1., 1.),
    )
    .unwrap();
    scheduling::run_selection(&events, |batch| processor.process_batch(batch))
}

#[test]
fn strict_selection_of_simulated_events() {
    let result = process(STRICT_PROFILE);
    let stats = result.stats;
    assert_eq!(stats.events, 3);
    assert_eq!(stats.selected, 2);
    assert_eq!(stats.truth_only, 0);
    assert_eq!(stats.truth_matched, 1);
    assert_eq!(stats.in_q2_bin, 2);
    assert_eq!(result.histogram.integral(), 2.);

    let ids = result
        .records
        .iter()
        .map(|record| (record.id.run, record.id.event))
        .collect::<Vec<_>>();
    assert_eq!(ids, [(1, 1), (2, 1)]);
    assert_eq!(result.records[0].selection.index, Some(0));
    assert_eq!(result.records[0].selection.passing, 1);
    assert!(result.records[1].gen.is_none());

    let mut buffer = Vec::new();
    output::write_table(&mut buffer, &result.records, true).unwrap();
    let text = String::from_utf8(buffer).unwrap();
    let lines = text.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Run Event "));
    assert!(lines[1].starts_with("1 1 "));
    assert!(lines[2].starts_with("2 1 "));
}

#[test]
fn generator_only_rows_need_truth() {
    let result = process(GENERATOR_ONLY_PROFILE);
    assert_eq!(result.stats.events, 3);
    assert_eq!(result.stats.selected, 0);
    assert_eq!(result.stats.truth_only, 2);
    assert_eq!(result.records.len(), 2);
    assert!(result.records.iter().all(|record| record.reco.is_none()));
    assert_eq!(result.histogram.integral(), 0.);
}

#[test]
fn malformed_rows_are_located() {
    let mut table = table();
    table += "cand 3 1 1 2 3\n";
    match input::read_events(table.as_bytes()) {
        Err(InputError::Syntax { line, .. }) => assert_eq!(line, 9),
        other => panic!("Expected a syntax error, got {other:?}"),
    }
}
