use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};
use tempfile::tempdir;

fn cli(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("print_quote_cli").unwrap();
    cmd.env("PRINT_QUOTE_CLI_SCRIPT", "1")
        .env("PRINT_QUOTE_HOME", home)
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn script_mode_calculates_and_saves_quote() {
    let home = tempdir().unwrap();
    cli(home.path())
        .write_stdin("calc 100 2 0 PLA 20 --save Bracket\nquote list\nexit\n")
        .assert()
        .success()
        .stdout(contains("Final price: $4.25").and(contains("Bracket")));

    let json = std::fs::read_to_string(home.path().join("quotes.json")).unwrap();
    assert!(json.contains("\"Bracket\""));
    assert!(home.path().join("settings.json").exists());
}

#[test]
fn quotes_persist_between_sessions() {
    let home = tempdir().unwrap();
    cli(home.path())
        .write_stdin("calc 250 3 PETG 10 --save Enclosure\nexit\n")
        .assert()
        .success();

    cli(home.path())
        .write_stdin("quote list\nexit\n")
        .assert()
        .success()
        .stdout(contains("Enclosure"));
}

#[test]
fn comments_and_unknown_commands_do_not_abort_script() {
    let home = tempdir().unwrap();
    cli(home.path())
        .write_stdin("# setup\n\nmaterail list\nversion\nexit\n")
        .assert()
        .success()
        .stdout(contains("Unknown command `materail`").and(contains("Print Quote")));
}

#[test]
fn inventory_commands_round_trip_through_disk() {
    let home = tempdir().unwrap();
    let script = "material add \"PLA Premium\" PLA 25 5\n\
                  material stock \"PLA Premium\" remove 2\n\
                  exit\n";
    cli(home.path())
        .write_stdin(script)
        .assert()
        .success()
        .stdout(contains("Stock is now 3.00 kg."));

    let json = std::fs::read_to_string(home.path().join("materials.json")).unwrap();
    assert!(json.contains("PLA Premium"));
}
