//! Secure copy over an authenticated libssh2 session

use crate::TransportError;
use ssh2::{Channel, Session};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Permission bits given to uploaded files unless the caller says otherwise
pub const DEFAULT_FILE_MODE: i32 = 0o600;

/// Join a remote directory and a file name with `/`.
///
/// Remote hosts are assumed to use POSIX paths regardless of the local OS.
pub fn remote_join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        return name.to_string();
    }
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() {
        format!("/{}", name)
    } else {
        format!("{}/{}", trimmed, name)
    }
}

/// Last non-empty component of a remote path
pub fn remote_file_name(path: &str) -> Option<&str> {
    path.rsplit('/').find(|part| !part.is_empty())
}

/// File name of a local path as UTF-8, suitable for use on the remote side
pub fn local_file_name(path: &Path) -> Result<&str, TransportError> {
    path.file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| TransportError::scp(path.display().to_string(), "path has no UTF-8 file name"))
}

/// Fetch `remote_file` into `local_dir`, keeping its file name.
///
/// An existing local file of the same name is overwritten.
pub fn recv_file(session: &Session, remote_file: &str, local_dir: &Path) -> Result<PathBuf, TransportError> {
    let name = remote_file_name(remote_file)
        .ok_or_else(|| TransportError::scp(remote_file, "remote path has no file name"))?;
    let target = local_dir.join(name);

    debug!("SCP get {} -> {}", remote_file, target.display());

    let (mut channel, stat) = session.scp_recv(Path::new(remote_file))?;
    let expected = stat.size();

    let mut file = File::create(&target)?;
    copy_exact(Read::by_ref(&mut channel), &mut file, expected, |copied| {
        TransportError::scp(remote_file, format!("short read: {} of {} bytes", copied, expected))
    })?;

    finish(&mut channel)?;
    Ok(target)
}

/// Push `local_file` into `remote_dir`, keeping its file name
pub fn send_file(session: &Session, local_file: &Path, remote_dir: &str, mode: i32) -> Result<String, TransportError> {
    let name = local_file_name(local_file)?;
    let remote_path = remote_join(remote_dir, name);

    let file = File::open(local_file)?;
    let size = file.metadata()?.len();

    debug!("SCP put {} -> {} ({} bytes)", local_file.display(), remote_path, size);

    send_from(session, &remote_path, mode, size, file)?;
    Ok(remote_path)
}

/// Write `data` to `remote_dir/remote_name`
pub fn send_bytes(
    session: &Session,
    data: &[u8],
    remote_name: &str,
    remote_dir: &str,
    mode: i32,
) -> Result<String, TransportError> {
    let remote_path = remote_join(remote_dir, remote_name);

    debug!("SCP put {} bytes -> {}", data.len(), remote_path);

    send_from(session, &remote_path, mode, data.len() as u64, data)?;
    Ok(remote_path)
}

fn send_from<R: Read>(session: &Session, remote_path: &str, mode: i32, size: u64, reader: R) -> Result<(), TransportError> {
    let mut channel = session.scp_send(Path::new(remote_path), mode, size, None)?;
    copy_exact(reader, &mut channel, size, |copied| {
        TransportError::scp(remote_path, format!("source ended after {} of {} bytes", copied, size))
    })?;
    finish(&mut channel)
}

/// Copy at most `size` bytes; `short` builds the error when `reader` ends early
fn copy_exact<R: Read, W: Write>(
    reader: R,
    writer: &mut W,
    size: u64,
    short: impl FnOnce(u64) -> TransportError,
) -> Result<(), TransportError> {
    let copied = io::copy(&mut reader.take(size), writer)?;
    if copied != size {
        return Err(short(copied));
    }
    Ok(())
}

fn finish(channel: &mut Channel) -> Result<(), TransportError> {
    channel.send_eof()?;
    channel.wait_eof()?;
    channel.close()?;
    channel.wait_close()?;
    Ok(())
}
