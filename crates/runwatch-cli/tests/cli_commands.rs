//! End-to-end checks of the non-interactive commands against the built-in
//! simulated environment.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use runwatch_testing::TestWorld;
use runwatch_testing::assertions::assert_event_types;

#[test]
fn test_help_lists_commands() {
    let world = TestWorld::new();
    let result = world.run(&["--help"]).unwrap();

    assert!(result.success());
    for command in [
        "dash", "instance", "select", "ps", "listen", "tail", "history", "stop",
    ] {
        assert!(result.stdout.contains(command), "missing {}", command);
    }
}

#[test]
fn test_ps_shows_every_simulated_job() -> Result<()> {
    let world = TestWorld::new().with_jobs(2);
    let result = world.run(&["ps"])?;

    assert!(result.success(), "stderr: {}", result.stderr);
    assert!(result.stdout.starts_with("JOB ID"));
    assert!(result.stdout.contains("backup"));
    assert!(result.stdout.contains("etl"));
    Ok(())
}

#[test]
fn test_ps_pattern_filters_instances() -> Result<()> {
    let world = TestWorld::new().with_jobs(2);
    let result = world.run(&["ps", "etl", "--format", "json"])?;

    let lines = result.json_lines()?;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["job_id"], "etl");
    Ok(())
}

#[test]
fn test_ps_json_lines_are_instances() -> Result<()> {
    let world = TestWorld::new().with_jobs(3);
    let result = world.run(&["ps", "--format", "json"])?;

    let lines = result.json_lines()?;
    assert_eq!(lines.len(), 3);
    assert_event_types(&lines, &["instance"])?;
    for line in &lines {
        assert!(line["instance_id"].as_str().unwrap().contains('@'));
        assert!(line["phase_count"].as_u64().unwrap() >= 1);
    }
    Ok(())
}

#[test]
fn test_listen_streams_lifecycle_changes() -> Result<()> {
    let world = TestWorld::new().with_jobs(2);
    let result = world.run(&["listen", "--format", "json", "--limit", "3"])?;

    assert!(result.success(), "stderr: {}", result.stderr);
    let lines = result.json_lines()?;
    assert_event_types(&lines, &["instance", "lifecycle"])?;

    let lifecycle: Vec<_> = lines.iter().filter(|l| l["type"] == "lifecycle").collect();
    assert_eq!(lifecycle.len(), 3);
    let first_lifecycle = lines.iter().position(|l| l["type"] == "lifecycle").unwrap();
    assert!(lines[..first_lifecycle].iter().all(|l| l["type"] == "instance"));
    Ok(())
}

#[test]
fn test_listen_plain_prints_banner() -> Result<()> {
    let world = TestWorld::new().with_jobs(1);
    let result = world.run(&["listen", "--limit", "1"])?;

    assert!(result.success());
    assert!(result.stdout.contains("Listening for events... (Ctrl+C to stop)"));
    Ok(())
}

#[test]
fn test_history_lists_seeded_runs() -> Result<()> {
    let world = TestWorld::new().with_seed_history(3);
    let result = world.run(&["history", "--format", "json"])?;

    assert!(result.success(), "stderr: {}", result.stderr);
    // Runs ending while the command starts may join the seeded ones
    let lines = result.json_lines()?;
    assert!(lines.len() >= 3);
    assert_event_types(&lines, &["run"])?;
    assert!(lines.iter().all(|l| l["stage"] == "ENDED"));

    let limited = world.run(&["history", "-n", "2", "--format", "json"])?;
    assert_eq!(limited.json_lines()?.len(), 2);
    Ok(())
}

#[test]
fn test_history_without_runs() -> Result<()> {
    let world = TestWorld::new().with_seed_history(0);
    let result = world.run(&["history"])?;

    assert!(result.success());
    assert!(result.stdout.contains("No ended runs"));
    Ok(())
}

#[test]
fn test_tail_prints_a_section_per_instance() -> Result<()> {
    let world = TestWorld::new().with_jobs(2);
    let result = world.run(&["tail"])?;

    assert!(result.success(), "stderr: {}", result.stderr);
    assert!(result.stdout.contains(" backup@"));
    assert!(result.stdout.contains(" etl@"));

    let filtered = world.run(&["tail", "etl", "--format", "json"])?;
    let lines = filtered.json_lines()?;
    assert_event_types(&lines, &["output"])?;
    assert!(lines.iter().all(|l| l["instance_id"].as_str().unwrap().starts_with("etl@")));
    Ok(())
}

#[test]
fn test_stop_without_match() -> Result<()> {
    let world = TestWorld::new();
    let result = world.run(&["stop", "nomatch", "--force"])?;

    assert!(result.success());
    assert!(result.stdout.contains("No instances to stop: nomatch"));
    Ok(())
}

#[test]
fn test_stop_forced_requests_matching_instances() -> Result<()> {
    let world = TestWorld::new().with_jobs(2);
    let result = world.run(&["stop", "backup", "--force"])?;

    assert!(result.success(), "stderr: {}", result.stderr);
    assert!(result.stdout.contains("backup@"));
    assert!(result.stdout.contains("-> stop requested"));
    assert!(!result.stdout.contains("etl@"));
    Ok(())
}

#[test]
#[allow(deprecated)]
fn test_stop_declined_at_prompt() {
    let world = TestWorld::new().with_jobs(1);
    let mut cmd = Command::cargo_bin("runwatch").unwrap();
    world.configure_command(&mut cmd);

    cmd.args(["stop", "backup"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Instances to stop:"))
        .stdout(predicate::str::contains("Aborted"))
        .stdout(predicate::str::contains("stop requested").not());
}

#[test]
fn test_instance_without_match_fails() -> Result<()> {
    let world = TestWorld::new().with_seed_history(0);
    let result = world.run(&["instance", "nomatch"])?;

    assert!(!result.success());
    assert!(result.stderr.contains("No instances or runs matching 'nomatch'"));
    Ok(())
}

#[test]
fn test_interactive_commands_need_terminal() -> Result<()> {
    let world = TestWorld::new();
    for command in ["dash", "select"] {
        let result = world.run(&[command])?;
        assert!(!result.success());
        assert!(result.stderr.contains("requires an interactive terminal"));
    }
    Ok(())
}

#[test]
fn test_log_file_written_to_data_dir() -> Result<()> {
    let world = TestWorld::new().with_env("RUNWATCH_LOG", "debug");
    world.run(&["ps"])?;

    let log = std::fs::read_to_string(world.data_dir().join("runwatch.log"))?;
    assert!(log.contains("environment started"));
    Ok(())
}

#[test]
fn test_invalid_config_is_reported() -> Result<()> {
    let world = TestWorld::new();
    std::fs::write(world.data_dir().join("config.toml"), "bridge_capacity = 0\n")?;

    let result = world.run(&["ps"])?;
    assert!(!result.success());
    assert!(result.stderr.contains("bridge_capacity"));
    Ok(())
}
