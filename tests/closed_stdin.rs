//! Runs with the test process's fd 0 closed, so it lives in its own binary.

use std::fs;

use nix::{libc, unistd};
use osh::{Pipeline, StageStatus};
use tempfile::TempDir;

#[test]
fn stdin_lands_on_descriptor_zero_when_the_shell_has_none() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.txt");
    let redirected = dir.path().join("redirected.txt");
    let piped = dir.path().join("piped.txt");
    fs::write(&input, "kept\n").unwrap();

    let redirect: Pipeline = format!("cat < {} > {}", input.display(), redirected.display())
        .parse()
        .unwrap();
    let pipe: Pipeline = format!("cat {} | cat > {}", input.display(), piped.display())
        .parse()
        .unwrap();

    // the redirect opened in the child takes fd 0
    let _ = unistd::close(libc::STDIN_FILENO);
    let report = redirect.execute().unwrap();
    assert_eq!(report.status(0), Some(StageStatus::Exited(0)));
    assert_eq!(fs::read_to_string(&redirected).unwrap(), "kept\n");

    // the pipe's read end takes fd 0
    let _ = unistd::close(libc::STDIN_FILENO);
    let report = pipe.execute().unwrap();
    assert!(report.outcomes.iter().all(|o| o.status.success()));
    assert_eq!(fs::read_to_string(&piped).unwrap(), "kept\n");
}
