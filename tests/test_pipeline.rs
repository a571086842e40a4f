use chrono::NaiveDate;
use winlog_triage::classification::ClassificationTable;
use winlog_triage::filter::{FilterOptions, RecordFilter};
use winlog_triage::pipeline::{CsvSink, JsonSink, RecordReader, run_pipeline};

const HEADER: &str = "timestamp,log_type,source,event_id,event_type,message\n";

fn now() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 4, 20)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn filter_for(options: FilterOptions) -> RecordFilter {
    RecordFilter::compile(&options, now()).expect("filter should compile")
}

fn run_csv(input: &str, filter: &RecordFilter, table: &ClassificationTable) -> (String, u64, u64) {
    let reader = RecordReader::from_reader(input.as_bytes()).expect("input should open");
    let mut buffer = Vec::new();
    let summary = {
        let mut sink = CsvSink::new(&mut buffer);
        run_pipeline(reader, &mut sink, filter, table).expect("pipeline should run")
    };
    (
        String::from_utf8(buffer).expect("csv output is utf-8"),
        summary.matched,
        summary.skipped,
    )
}

#[test]
fn test_end_to_end_scenario_row() {
    let input = format!(
        "{HEADER}2025-04-20 09:15:00,Security,Microsoft-Windows-Security-Auditing,4625,WARNING,failed logon\n"
    );
    let table = ClassificationTable::builtin();

    let warning = filter_for(
        FilterOptions::new()
            .with_sources(vec!["Microsoft-Windows-Security-Auditing".to_string()])
            .with_event_types(vec!["WARNING".to_string()]),
    );
    let (output, matched, _) = run_csv(&input, &warning, table);
    assert_eq!(matched, 1);
    assert!(output.contains("failed logon"));

    let error = filter_for(
        FilterOptions::new()
            .with_sources(vec!["Microsoft-Windows-Security-Auditing".to_string()])
            .with_event_types(vec!["ERROR".to_string()]),
    );
    let (_, matched, _) = run_csv(&input, &error, table);
    assert_eq!(matched, 0);
}

#[test]
fn test_rejected_record_keeps_relative_order() {
    let input = format!(
        "{HEADER}\
         2025-04-20 09:00:00,Security,s,1,WARNING,A\n\
         2025-04-20 09:01:00,System,s,2,WARNING,B\n\
         2025-04-20 09:02:00,Security,s,3,WARNING,C\n"
    );
    let filter = filter_for(FilterOptions::new().with_log_types(vec!["Security".to_string()]));
    let (output, matched, _) = run_csv(&input, &filter, &ClassificationTable::default());

    assert_eq!(matched, 2);
    let a = output.find(",A").expect("A should be emitted");
    let c = output.find(",C").expect("C should be emitted");
    assert!(!output.contains(",B"));
    assert!(a < c, "records must keep arrival order");
}

#[test]
fn test_malformed_rows_skip_without_aborting() {
    let input = format!(
        "{HEADER}\
         2025-04-20 09:00:00,Security,s,4625,WARNING,good\n\
         garbage-timestamp,Security,s,4625,WARNING,bad\n\
         2025-04-20 09:02:00,Security,s,not-an-id,WARNING,bad\n\
         2025-04-20 09:03:00,Security,s,4625,WARNING,also good\n"
    );
    let (output, matched, skipped) = run_csv(
        &input,
        &RecordFilter::match_all(),
        &ClassificationTable::default(),
    );

    assert_eq!(matched, 2);
    assert_eq!(skipped, 2);
    assert!(output.contains("good"));
    assert!(!output.contains("bad"));
}

#[test]
fn test_filter_output_refiltered_is_identical() {
    let input = format!(
        "{HEADER}\
         2025-04-20 05:00:00,Security,s,4625,WARNING,too early\n\
         2025-04-20 09:15:00,Security,s,4625,WARNING,in window\n\
         2025-04-20 11:59:00,System,s,7036,INFORMATION,wrong type\n\
         2025-04-20 11:30:00,Security,s,4625,WARNING,also in window\n"
    );
    let filter = filter_for(
        FilterOptions::new()
            .with_event_types(vec!["WARNING".to_string()])
            .with_last_hours(Some(6)),
    );
    let table = ClassificationTable::builtin();

    let (first_pass, first_matched, _) = run_csv(&input, &filter, table);
    let (second_pass, second_matched, _) = run_csv(&first_pass, &filter, table);

    assert_eq!(first_matched, 2);
    assert_eq!(second_matched, first_matched);
    assert_eq!(first_pass, second_pass);
}

#[test]
fn test_json_output_joins_severity_and_description() {
    let input = format!(
        "{HEADER}\
         2025-04-20 09:15:00,Security,s,1102,INFORMATION,audit log cleared\n\
         2025-04-20 09:16:00,Security,s,99999,INFORMATION,unlisted\n"
    );
    let reader = RecordReader::from_reader(input.as_bytes()).expect("input should open");
    let mut buffer = Vec::new();
    {
        let mut sink = JsonSink::new(&mut buffer);
        run_pipeline(
            reader,
            &mut sink,
            &RecordFilter::match_all(),
            ClassificationTable::builtin(),
        )
        .expect("pipeline should run");
    }

    let parsed: serde_json::Value =
        serde_json::from_slice(&buffer).expect("sink output should be valid JSON");
    let objects = parsed.as_array().expect("an array of records");
    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0]["severity"], "Medium to High");
    assert_eq!(objects[0]["description"], "The audit log was cleared.");
    assert_eq!(objects[1]["severity"], "Unknown");
    assert_eq!(objects[1]["description"], "");
}

#[test]
fn test_unreadable_input_fails_before_processing() {
    let missing = std::path::Path::new("/nonexistent/events.csv");
    let err = RecordReader::from_path(missing).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/events.csv"));
}
