// tests/common.rs

use std::io::{BufRead, BufReader};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

// Helper function to get the binary command
#[allow(dead_code)] // This is used by many integration tests, but not all.
pub fn lifecycle_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("mirror-lifecycle"))
}

/// Spawns the binary with piped output and blocks until it has printed its
/// first stdout line, i.e. until the signal listener is installed.
#[allow(dead_code)]
pub fn spawn_running(dir: &std::path::Path, args: &[&str]) -> (Child, String) {
    let mut child = lifecycle_cmd()
        .args(args)
        .current_dir(dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn mirror-lifecycle");

    let stdout = child.stdout.take().expect("piped stdout");
    let mut reader = BufReader::new(stdout);
    let mut first_line = String::new();
    reader
        .read_line(&mut first_line)
        .expect("read first stdout line");
    // Keep draining so later writes never hit a closed pipe.
    std::thread::spawn(move || std::io::copy(&mut reader, &mut std::io::sink()));
    (child, first_line)
}

/// Waits for `child` to exit, killing it if it outlives `timeout`.
#[allow(dead_code)]
pub fn wait_with_deadline(child: &mut Child, timeout: Duration) -> ExitStatus {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait().expect("poll child") {
            return status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("mirror-lifecycle did not exit within {:?}", timeout);
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}
