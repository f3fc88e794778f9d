//! Basic usage example for sshlink
//!
//! Connects with a password, runs a command while another thread prints its
//! output, then copies a file up and back down.
//!
//! ```text
//! SSHLINK_HOST=10.0.0.5 SSHLINK_USER=deploy SSHLINK_PASSWORD=... \
//!     cargo run -p sshlink --example basic_usage
//! ```

use sshlink::{ConnectorConfig, DefaultResponseHandler, SshConnector};
use std::env;
use std::error::Error;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ConnectorConfig::new(
        env::var("SSHLINK_HOST")?,
        env::var("SSHLINK_USER")?,
        env::var("SSHLINK_PASSWORD")?,
    )
    .with_connect_timeout(Duration::from_secs(10));

    let mut conn = SshConnector::new(config);
    if !conn.connect()? {
        eprintln!("Login rejected for {}@{}", conn.username(), conn.host());
        return Ok(());
    }
    println!("Connected to {}", conn.host());

    // Stream output to another thread as it arrives
    let (mut handler, mut rx) = DefaultResponseHandler::unbounded();
    let printer = thread::spawn(move || {
        while let Some(line) = rx.blocking_recv() {
            println!("  | {}", line);
        }
    });

    let status = conn.exec_cmd_with("uname -a; uptime", &mut handler)?;
    drop(handler);
    printer.join().map_err(|_| "printer thread panicked")?;
    println!(
        "Command finished: success={} exit_code={:?} signal={:?}",
        status.success(),
        status.exit_code(),
        status.message()
    );

    // File transfer
    let remote = conn.upload_bytes(b"Hello from sshlink\n", "sshlink_demo.txt", "/tmp")?;
    println!("Uploaded {}", remote);

    let local_dir = env::temp_dir();
    let local = conn.download(&remote, &local_dir)?;
    println!("Downloaded to {}: {:?}", local.display(), std::fs::read_to_string(&local)?);

    conn.exec_cmd(&format!("rm -f {}", remote))?;
    conn.close();
    Ok(())
}
