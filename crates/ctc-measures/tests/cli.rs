mod common;

use assert_cmd::Command;
use common::{dividing_frames, dividing_tracks, tracks, Sequence};
use ctc_measures::{EvaluationConfig, EvaluationReport, MeasureSpec};
use predicates::prelude::*;

fn cli() -> Command {
    Command::cargo_bin("ctc-measures").unwrap()
}

#[test]
fn tra_of_identical_sequence_is_one() {
    let seq = Sequence::identical(&dividing_frames(), &dividing_tracks());
    cli()
        .args(["tra", "--gt"])
        .arg(&seq.gt)
        .arg("--res")
        .arg(&seq.res)
        .assert()
        .success()
        .stdout(predicate::str::contains("TRA: 1.000000"));
}

#[test]
fn aogm_reports_the_weighted_missing_edge() {
    let res_tracks = tracks(&[(1, 0, 0, 2), (2, 1, 3, 4), (3, 0, 3, 4)]);
    let seq = Sequence::write(&dividing_frames(), &dividing_tracks(), &dividing_frames(), &res_tracks);
    cli()
        .args(["aogm", "--weights", "5,10,1,1,4,1", "--gt"])
        .arg(&seq.gt)
        .arg("--res")
        .arg(&seq.res)
        .assert()
        .success()
        .stdout(predicate::str::contains("AOGM: 4.000000"));
}

#[test]
fn wrong_weight_count_is_a_usage_error() {
    cli()
        .args(["aogm", "--gt", "gt", "--res", "res", "--weights", "1,2"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("six"));
}

#[test]
fn inconsistent_result_fails_with_its_violations() {
    // label 3 is still present at frame 4, after its track ended
    let res_tracks = tracks(&[(1, 0, 0, 2), (2, 1, 3, 4), (3, 1, 3, 3)]);
    let seq = Sequence::write(&dividing_frames(), &dividing_tracks(), &dividing_frames(), &res_tracks);

    cli()
        .args(["tra", "--gt"])
        .arg(&seq.gt)
        .arg("--res")
        .arg(&seq.res)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("consistency"));

    cli()
        .args(["tra", "--report-inconsistent", "--gt"])
        .arg(&seq.gt)
        .arg("--res")
        .arg(&seq.res)
        .assert()
        .success()
        .stdout(predicate::str::contains("TRA:"));

    cli()
        .arg("check")
        .arg(&seq.res)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("RES data").and(predicate::str::contains("inconsistent")));
}

#[test]
fn missing_directories_are_precondition_failures() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .args(["det", "--gt"])
        .arg(dir.path().join("gt"))
        .arg("--res")
        .arg(dir.path().join("res"))
        .assert()
        .code(4)
        .stderr(predicate::str::contains("no frames"));
}

#[test]
fn config_run_writes_a_report() {
    let seq = Sequence::identical(&dividing_frames(), &dividing_tracks());
    let out = tempfile::tempdir().unwrap();
    let report_path = out.path().join("report.json");
    let config_path = out.path().join("run.json");

    let mut config = EvaluationConfig::new(&seq.gt, &seq.res);
    config.measures = vec![MeasureSpec::Det, MeasureSpec::Seg, MeasureSpec::Ct];
    config.report_path = Some(report_path.clone());
    config.write_json(&config_path).unwrap();

    cli()
        .args(["run", "--config"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("SEG: 1.000000"));

    let report = EvaluationReport::load_json(&report_path).unwrap();
    assert_eq!(report.value("DET"), Some(1.0));
    assert_eq!(report.value("CT"), Some(1.0));
}

#[test]
fn bio_keeps_the_measures_that_could_be_computed() {
    let frames = vec![vec![(0, 1)]; 3];
    let seq = Sequence::identical(&frames, &tracks(&[(1, 0, 0, 2)]));
    cli()
        .args(["bio", "--gt"])
        .arg(&seq.gt)
        .arg("--res")
        .arg(&seq.res)
        .assert()
        .code(4)
        .stdout(predicate::str::contains("CT: 1.000000").and(predicate::str::contains("TF: 1.000000")))
        .stderr(predicate::str::contains("BC(2): not computed"));
}

#[test]
fn quiet_flag_silences_progress_lines() {
    let seq = Sequence::identical(&dividing_frames(), &dividing_tracks());
    cli()
        .args(["det", "--gt"])
        .arg(&seq.gt)
        .arg("--res")
        .arg(&seq.res)
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stderr(predicate::str::contains("classifying"));
    cli()
        .args(["-q", "det", "--gt"])
        .arg(&seq.gt)
        .arg("--res")
        .arg(&seq.res)
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stderr(predicate::str::contains("classifying").not());
}
