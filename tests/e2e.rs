use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn write_cloud(root: &Path) {
    fs::create_dir_all(root.join("nested")).unwrap();
    fs::write(
        root.join("combo.txt"),
        "https://www.netflix.com/login:user@a.com:pass123\n\n   \nNETFLIX.com:bob@b.com:qwerty\n11122233344:senha123\n",
    )
    .unwrap();
    fs::write(
        root.join("nested/more.TXT"),
        "https://www.netflix.com/login:user@a.com:pass123\nhttp://hulu.com/:z@z.com:zz\n12345678000199,empresa\n",
    )
    .unwrap();
    fs::write(root.join("nested/ignored.csv"), "skip@me.com:nope\n").unwrap();
}

fn cloudscan() -> Command {
    let mut cmd = Command::cargo_bin("cloudscan").unwrap();
    cmd.arg("--color").arg("never").arg("-q");
    cmd
}

#[test]
fn stats_operations_print_counts() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("cloud");
    write_cloud(&root);

    cloudscan()
        .arg("-d")
        .arg(&root)
        .arg("-r")
        .arg(tmp.path().join("results"))
        .arg("lines")
        .arg("domains")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total lines: 6"))
        .stdout(predicate::str::contains("Distinct domains: 5"));
}

#[test]
fn default_operations_are_stats() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("cloud");
    write_cloud(&root);

    let mut cmd = Command::cargo_bin("cloudscan").unwrap();
    cmd.arg("--color")
        .arg("never")
        .arg("-d")
        .arg(&root)
        .arg("-r")
        .arg(tmp.path().join("results"));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("TXT files found: 2"))
        .stdout(predicate::str::contains("Total lines: 6"));
}

#[test]
fn filter_writes_deduplicated_artifact() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("cloud");
    let results = tmp.path().join("results");
    write_cloud(&root);

    cloudscan()
        .arg("-d")
        .arg(&root)
        .arg("-r")
        .arg(&results)
        .arg("filter")
        .arg("--domain")
        .arg("NetFlix")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total occurrences extracted: 2"));

    let content = fs::read_to_string(results.join("netflix.txt")).unwrap();
    let mut lines: Vec<&str> = content.lines().collect();
    lines.sort();
    assert_eq!(
        lines,
        vec![
            "NETFLIX.com:bob@b.com:qwerty",
            "https://www.netflix.com/login:user@a.com:pass123",
        ]
    );
}

#[test]
fn credential_operations_write_all_artifacts() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("cloud");
    let results = tmp.path().join("results");
    write_cloud(&root);

    cloudscan()
        .arg("-d")
        .arg(&root)
        .arg("-r")
        .arg(&results)
        .arg("emails")
        .arg("cpf")
        .arg("cnpj")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total emails extracted: 3"))
        .stdout(predicate::str::contains("Total CPF extracted: 1"))
        .stdout(predicate::str::contains("Total CNPJ extracted: 1"));

    assert_eq!(
        fs::read_to_string(results.join("cpf_extracted.txt")).unwrap(),
        "11122233344:senha123\n"
    );
    assert_eq!(
        fs::read_to_string(results.join("cnpj_extracted.txt")).unwrap(),
        "12345678000199:empresa\n"
    );
    let emails = fs::read_to_string(results.join("emails_extracted.txt")).unwrap();
    assert_eq!(emails.lines().count(), 3);
    assert!(!emails.contains("skip@me.com"));
}

#[test]
fn missing_dir_causes_non_zero_exit() {
    let tmp = tempdir().unwrap();
    let results = tmp.path().join("results");
    cloudscan()
        .arg("-d")
        .arg(tmp.path().join("missing-cloud"))
        .arg("-r")
        .arg(&results)
        .arg("emails")
        .assert()
        .code(2);
    assert!(!results.exists());
}

#[test]
fn filter_without_domain_is_rejected() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("cloud");
    write_cloud(&root);
    cloudscan()
        .arg("-d")
        .arg(&root)
        .arg("filter")
        .assert()
        .code(2);
}

#[test]
fn artifact_failure_skips_operation_but_succeeds() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("cloud");
    let results = tmp.path().join("results");
    write_cloud(&root);
    // A directory where the artifact file should go makes creation fail.
    fs::create_dir_all(results.join("emails_extracted.txt")).unwrap();

    cloudscan()
        .arg("-d")
        .arg(&root)
        .arg("-r")
        .arg(&results)
        .arg("emails")
        .arg("cpf")
        .assert()
        .success()
        .stdout(predicate::str::contains("Emails: 0 results"))
        .stdout(predicate::str::contains("Total CPF extracted: 1"));
}

#[test]
fn unusable_results_dir_is_fatal() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("cloud");
    write_cloud(&root);
    let results = tmp.path().join("results");
    fs::write(&results, b"not a dir").unwrap();

    cloudscan()
        .arg("-d")
        .arg(&root)
        .arg("-r")
        .arg(&results)
        .arg("cnpj")
        .assert()
        .code(4);
}

#[test]
fn clean_removes_results_dir() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("cloud");
    let results = tmp.path().join("results");
    write_cloud(&root);

    cloudscan()
        .arg("-d")
        .arg(&root)
        .arg("-r")
        .arg(&results)
        .arg("cpf")
        .arg("clean")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed"));
    assert!(!results.exists());
}

#[test]
fn export_stats_writes_csv_and_domain_list() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("cloud");
    let results = tmp.path().join("results");
    write_cloud(&root);

    cloudscan()
        .arg("-d")
        .arg(&root)
        .arg("-r")
        .arg(&results)
        .arg("lines")
        .arg("--export-stats")
        .assert()
        .success();

    let names: Vec<String> = fs::read_dir(&results)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().any(|n| n.starts_with("stats_") && n.ends_with(".csv")));
    let domains = names
        .iter()
        .find(|n| n.starts_with("domains_"))
        .expect("domain list written");
    let content = fs::read_to_string(results.join(domains)).unwrap();
    assert!(content.lines().any(|l| l == "netflix.com"));
    assert!(content.lines().any(|l| l == "hulu.com"));
}
