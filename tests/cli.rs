use std::io::Write;

use assert_cmd::Command;

const ROI_CSV: &str = "filename,xmin,ymin,xmax,ymax,label,score\n\
                       a.png,0,0,10,10,cat,\n\
                       b.png,1,1,5,5,dog,0.8\n";

fn write_roi_csv(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("boxes.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(ROI_CSV.as_bytes()).unwrap();
    path
}

#[test]
fn runs() {
    let mut cmd = Command::cargo_bin("annopipe").unwrap();
    cmd.assert().success();
}

#[test]
fn outputs_tool_name() {
    let mut cmd = Command::cargo_bin("annopipe").unwrap();
    cmd.arg("-V");
    cmd.assert().success().stdout("annopipe 0.3.0\n");
}

#[test]
fn plugins_lists_every_builtin_stage() {
    let mut cmd = Command::cargo_bin("annopipe").unwrap();
    cmd.arg("plugins");
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("from-roi-csv"))
        .stdout(predicates::str::contains("to-subdir"))
        .stdout(predicates::str::contains("od-to-ic"))
        .stdout(predicates::str::contains("passthrough"));
}

#[test]
fn domains_lists_the_four_domains() {
    let mut cmd = Command::cargo_bin("annopipe").unwrap();
    cmd.arg("domains");
    cmd.assert()
        .success()
        .stdout(predicates::str::contains("object-detection"))
        .stdout(predicates::str::contains("classification"))
        .stdout(predicates::str::contains("segmentation"))
        .stdout(predicates::str::contains("speech"));
}

// Convert subcommand tests

#[test]
fn convert_roi_csv_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_roi_csv(dir.path());
    let output = dir.path().join("out.csv");

    let mut cmd = Command::cargo_bin("annopipe").unwrap();
    cmd.args([
        "convert",
        "from-roi-csv",
        "--input",
        input.to_str().unwrap(),
        "passthrough",
        "to-roi-csv",
        "--output",
        output.to_str().unwrap(),
    ]);
    cmd.assert().success();

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("a.png,0.0,0.0,10.0,10.0,cat,"));
    assert!(written.contains("b.png,1.0,1.0,5.0,5.0,dog,0.8"));
}

#[test]
fn convert_unknown_stage_fails() {
    let mut cmd = Command::cargo_bin("annopipe").unwrap();
    cmd.args(["convert", "from-nowhere"]);
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("Unknown plugin name"))
        .stderr(predicates::str::contains("from-nowhere"));
}

#[test]
fn convert_stage_after_writer_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_roi_csv(dir.path());
    let output = dir.path().join("out.csv");

    let mut cmd = Command::cargo_bin("annopipe").unwrap();
    cmd.args([
        "convert",
        "from-roi-csv",
        "--input",
        input.to_str().unwrap(),
        "to-roi-csv",
        "--output",
        output.to_str().unwrap(),
        "passthrough",
    ]);
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("passthrough"));
}

#[test]
fn convert_incompatible_writer_names_the_domains() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_roi_csv(dir.path());

    let mut cmd = Command::cargo_bin("annopipe").unwrap();
    cmd.args([
        "convert",
        "from-roi-csv",
        "--input",
        input.to_str().unwrap(),
        "to-subdir",
        "--output",
        dir.path().join("out").to_str().unwrap(),
    ]);
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("to-subdir"))
        .stderr(predicates::str::contains("object-detection"));
}

#[test]
fn convert_without_an_input_stage_fails() {
    let mut cmd = Command::cargo_bin("annopipe").unwrap();
    cmd.args(["convert", "passthrough"]);
    cmd.assert().failure();
}

#[test]
fn convert_rejects_tokens_before_the_first_stage() {
    let mut cmd = Command::cargo_bin("annopipe").unwrap();
    cmd.args(["convert", "--mystery-flag", "passthrough"]);
    cmd.assert()
        .failure()
        .stderr(predicates::str::contains("--mystery-flag"));
}
