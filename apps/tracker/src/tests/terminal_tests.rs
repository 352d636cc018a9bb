use super::*;
use chrono::NaiveDate;
use shared::protocol::JobSummary;

fn row(id: i64, applied: bool) -> JobRow {
    let seen = NaiveDate::from_ymd_opt(2024, 4, 9).unwrap();
    JobRow::from_summary(JobSummary {
        job_id: JobId(id),
        title: "SRE".to_string(),
        company: Some("Acme".to_string()),
        location: None,
        description: None,
        link: None,
        source: "Indeed".to_string(),
        applied,
        first_seen: seen,
        last_seen: seen,
    })
}

#[test]
fn yes_answers_are_case_insensitive() {
    assert!(is_yes("Y\n"));
    assert!(is_yes(" yes "));
    assert!(!is_yes("\n"));
    assert!(!is_yes("nope"));
}

#[test]
fn applied_rows_are_marked() {
    let out = render_rows(&[row(42, true), row(7, false)]);
    let lines: Vec<_> = out.lines().collect();

    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("*    42 [x] SRE | Acme | - | Indeed | 2024-04-09"));
    assert!(lines[1].starts_with("      7 [ ] SRE"));
}

#[test]
fn empty_table_says_so() {
    assert_eq!(render_rows(&[]), "No jobs found.\n");
}

#[tokio::test]
async fn assumed_yes_skips_prompt() {
    let surface = TerminalSurface::new(true);
    assert!(surface.confirm("Delete this job?").await);
}

#[test]
fn form_state_follows_open_and_close() {
    let surface = TerminalSurface::new(false);
    assert!(!surface.modal_open());
    surface.open_form();
    assert!(surface.modal_open());
    surface.close_modal();
    assert!(!surface.modal_open());
}
