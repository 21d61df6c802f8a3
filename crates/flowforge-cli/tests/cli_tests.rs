//! Exercises the compiled binary end-to-end: argument validation and the
//! prompt loop against a small FlowScript fixture.

use std::io::Write;
use std::process::{Command, Stdio};

fn flowforge_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_flowforge"))
}

#[test]
fn missing_flowscript_argument_is_rejected() {
    let output = flowforge_bin().output().expect("binary runs");
    assert!(!output.status.success());
}

#[test]
fn unreadable_flowscript_path_exits_nonzero() {
    let output = flowforge_bin()
        .arg("/nonexistent/path/does-not-exist.flow")
        .output()
        .expect("binary runs");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read"));
}

#[test]
fn malformed_flowscript_exits_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.flow");
    std::fs::write(&path, "digraph A; B; }").unwrap();

    let output = flowforge_bin().arg(&path).output().expect("binary runs");
    assert!(!output.status.success());
}

#[test]
fn single_job_script_runs_and_responds_to_prompt_commands() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("single.flow");
    std::fs::write(
        &path,
        r#"
        digraph {
          { node [shape="circle"]; cfg [data='{"command":"true"}']; }
          { node [shape="box"]; job; }
          cfg -> job;
        }
        "#,
    )
    .unwrap();

    let mut child = flowforge_bin()
        .arg(&path)
        .arg("--workers")
        .arg("1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("binary spawns");

    {
        let stdin = child.stdin.as_mut().expect("stdin piped");
        writeln!(stdin, "jobtypes").unwrap();
        writeln!(stdin, "status 0").unwrap();
        writeln!(stdin, "destroy").unwrap();
    }

    let output = child.wait_with_output().expect("binary exits");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("job 0 status"));
}
