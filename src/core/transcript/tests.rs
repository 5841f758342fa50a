//! Assembler tests, driven through the normalizer.

use serde_json::{Value, json};

use crate::core::chart::DataRef;
use crate::core::stream::Normalizer;
use crate::core::transcript::{
    AssembleOptions, ChartEntry, ChartOrigin, ConversationTurn, DataTable, EntryType,
    TranscriptEntry, TurnOutcome, assemble, assemble_partial,
};

fn three_row_data() -> Value {
    json!({"systemMessage": {"data": {
        "generatedSql": "SELECT month, revenue FROM sales",
        "result": {
            "schema": {"fields": [{"name": "month", "type": "STRING"}, {"name": "revenue", "type": "FLOAT64"}]},
            "data": [
                {"month": "Jan", "revenue": 10},
                {"month": "Feb", "revenue": 12},
                {"month": "Mar", "revenue": 15}
            ]
        }
    }}})
}

fn bar_chart() -> Value {
    json!({"systemMessage": {"chart": {"result": {"vegaConfig": {
        "mark": "bar",
        "data": {"values": [{"month": "Jan", "revenue": 10}]},
        "encoding": {"x": {"field": "month", "type": "nominal"}, "y": {"field": "revenue", "type": "quantitative"}}
    }}}}})
}

fn normalize(messages: &[Value]) -> Vec<TranscriptEntry> {
    let mut normalizer = Normalizer::new();
    messages.iter().flat_map(|m| normalizer.push(m)).collect()
}

fn run(question: &str, messages: &[Value]) -> ConversationTurn {
    let mut normalizer = Normalizer::new();
    let entries: Vec<TranscriptEntry> = messages.iter().flat_map(|m| normalizer.push(m)).collect();
    assemble(question, normalizer.finish(entries), AssembleOptions::default())
}

fn charts(turn: &ConversationTurn) -> Vec<&ChartEntry> {
    turn.entries.iter().filter_map(TranscriptEntry::chart).collect()
}

fn tables(turn: &ConversationTurn) -> Vec<&DataTable> {
    turn.entries.iter().filter_map(TranscriptEntry::table).collect()
}

fn shown(turn: &ConversationTurn) -> Vec<EntryType> {
    turn.entries
        .iter()
        .map(TranscriptEntry::entry_type)
        .filter(|t| matches!(t, EntryType::Table | EntryType::Chart))
        .collect()
}

#[test]
fn table_then_declarative_chart_no_fallback() {
    let turn = run("Show the revenue trend", &[three_row_data(), bar_chart()]);
    assert_eq!(shown(&turn), vec![EntryType::Table, EntryType::Chart]);
    let charts = charts(&turn);
    assert_eq!(charts.len(), 1);
    assert_eq!(charts[0].origin, ChartOrigin::Declarative);
    assert_eq!(turn.outcome, TurnOutcome::Complete);
}

#[test]
fn trend_question_gets_line_fallback() {
    let turn = run("What is the revenue trend this quarter?", &[three_row_data()]);
    assert_eq!(shown(&turn), vec![EntryType::Table, EntryType::Chart]);
    let charts = charts(&turn);
    assert_eq!(charts.len(), 1);
    assert_eq!(charts[0].origin, ChartOrigin::Fallback);
    assert_eq!(charts[0].spec.mark(), Some("line"));
    assert_eq!(charts[0].spec.inline_rows().map(Vec::len), Some(3));
}

#[test]
fn fallback_takes_next_sequence() {
    let turn = run("revenue trend", &[three_row_data()]);
    let seqs: Vec<u64> = turn.entries.iter().map(|e| e.sequence).collect();
    assert_eq!(seqs, vec![0, 1, 2]);
}

#[test]
fn no_fallback_without_matching_keyword() {
    let turn = run("How much revenue did we make?", &[three_row_data()]);
    assert_eq!(charts(&turn).len(), 0);
}

#[test]
fn no_fallback_when_disabled() {
    let mut normalizer = Normalizer::new();
    let entries = normalizer.push(&three_row_data());
    let turn = assemble(
        "revenue trend",
        normalizer.finish(entries),
        AssembleOptions {
            fallback_charts: false,
        },
    );
    assert_eq!(charts(&turn).len(), 0);
}

#[test]
fn declarative_chart_discards_text_embedded_chart() {
    let text = json!({"systemMessage": {"text": {"parts": [
        "Here is the chart: {\"mark\": \"bar\", \"encoding\": {}}"
    ]}}});
    let turn = run("compare months", &[text, bar_chart()]);
    let origins: Vec<ChartOrigin> = charts(&turn).iter().map(|c| c.origin).collect();
    assert_eq!(origins, vec![ChartOrigin::Declarative]);
}

#[test]
fn text_embedded_chart_kept_without_declarative() {
    let text = json!({"systemMessage": {"text": {"parts": [
        "Results: {\"mark\": \"bar\", \"encoding\": {}}"
    ]}}});
    let turn = run("compare months", &[three_row_data(), text]);
    let origins: Vec<ChartOrigin> = charts(&turn).iter().map(|c| c.origin).collect();
    assert_eq!(origins, vec![ChartOrigin::TextEmbedded]);
}

#[test]
fn dataless_chart_is_bound_to_last_table() {
    let chart = json!({"systemMessage": {"chart": {"result": {"vegaConfig": {
        "mark": "line",
        "encoding": {"x": {"field": "month", "type": "nominal"}}
    }}}}});
    let turn = run("revenue by month", &[three_row_data(), chart]);
    let chart = charts(&turn)[0];
    match chart.spec.data_ref() {
        DataRef::Inline(rows) => {
            assert_eq!(rows.len(), 3);
            assert_eq!(rows[1], json!({"month": "Feb", "revenue": 12}));
        }
        other => panic!("expected inline data, got {:?}", other),
    }
}

#[test]
fn superseded_table_is_dropped() {
    let partial = json!({"systemMessage": {"data": {
        "generatedSql": "SELECT month, revenue FROM sales",
        "result": {"data": [{"month": "Jan", "revenue": 10}]}
    }}});
    let turn = run("revenue", &[partial, three_row_data()]);
    let tables = tables(&turn);
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].rows.len(), 3);
    assert_eq!(
        turn.entries.iter().filter(|e| e.entry_type() == EntryType::Sql).count(),
        1
    );
}

#[test]
fn error_unit_marks_turn_failed() {
    let turn = run(
        "How many orders?",
        &[three_row_data(), json!({"systemMessage": {"error": {"text": "quota exceeded"}}})],
    );
    assert_eq!(turn.outcome, TurnOutcome::Failed);
    assert_eq!(turn.entries.last().unwrap().entry_type(), EntryType::Error);
}

#[test]
fn failed_turn_with_table_still_gets_fallback() {
    let turn = run(
        "revenue trend",
        &[three_row_data(), json!({"systemMessage": {"error": {"text": "quota exceeded"}}})],
    );
    assert_eq!(turn.outcome, TurnOutcome::Failed);
    let charts = charts(&turn);
    assert_eq!(charts.len(), 1);
    assert_eq!(charts[0].origin, ChartOrigin::Fallback);
}

#[test]
fn trailing_decode_failure_keeps_turn_complete() {
    let broken_chart = json!({"systemMessage": {"chart": {"result": {"vegaConfig": "{broken"}}}});
    let turn = run("What is the revenue trend?", &[three_row_data(), broken_chart]);
    assert_eq!(turn.outcome, TurnOutcome::Complete);
    assert_eq!(turn.entries.last().unwrap().entry_type(), EntryType::Chart);
    let charts = charts(&turn);
    assert_eq!(charts.len(), 1);
    assert_eq!(charts[0].origin, ChartOrigin::Fallback);
    assert_eq!(charts[0].spec.mark(), Some("line"));
}

#[test]
fn table_of_a_different_query_is_not_superseded() {
    let data = |sql: &str, rows: Value| {
        json!({"systemMessage": {"data": {
            "generatedSql": sql,
            "result": {"schema": {"fields": [{"name": "a"}]}, "data": rows}
        }}})
    };
    let turn = run(
        "revenue",
        &[
            data("SELECT a FROM t", json!([{"a": 1}])),
            data("SELECT b FROM t", json!([])),
            data("SELECT b FROM t", json!([{"a": 2}])),
        ],
    );
    let tables = tables(&turn);
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].rows, vec![vec![json!(1)]]);
    assert_eq!(tables[1].rows, vec![vec![json!(2)]]);
}

#[test]
fn partial_turn_is_deduplicated_without_fallback() {
    let text = json!({"systemMessage": {"text": {"parts": [
        "Here is the chart: {\"mark\": \"bar\", \"encoding\": {}}"
    ]}}});
    let partial = json!({"systemMessage": {"data": {
        "generatedSql": "SELECT month, revenue FROM sales",
        "result": {"data": [{"month": "Jan", "revenue": 10}]}
    }}});
    let entries = normalize(&[partial, three_row_data(), text, bar_chart()]);
    let turn = assemble_partial("revenue trend", entries);

    assert_eq!(turn.outcome, TurnOutcome::Cancelled);
    assert_eq!(tables(&turn).len(), 1);
    assert_eq!(tables(&turn)[0].rows.len(), 3);
    let origins: Vec<ChartOrigin> = charts(&turn).iter().map(|c| c.origin).collect();
    assert_eq!(origins, vec![ChartOrigin::Declarative]);
}

#[test]
fn partial_turn_without_chart_gets_no_fallback() {
    let turn = assemble_partial("revenue trend", normalize(&[three_row_data()]));
    assert_eq!(turn.outcome, TurnOutcome::Cancelled);
    assert!(charts(&turn).is_empty());
}

#[test]
fn turn_serializes_for_the_renderer() {
    let turn = run("revenue trend", &[three_row_data()]);
    let v = serde_json::to_value(&turn).unwrap();
    assert_eq!(v["question"], json!("revenue trend"));
    assert_eq!(v["outcome"], json!("complete"));
    assert_eq!(v["entries"][2]["type"], json!("chart"));
    assert_eq!(v["entries"][2]["content"]["origin"], json!("fallback"));
}
