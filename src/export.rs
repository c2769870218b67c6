//! Exporting snapshots to files and to a rendering host.

use crate::metrics::Summary;
use crate::snapshot::Snapshot;
use crate::ExportError;
use log::{info, warn};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;

/// Marks the end of the payload on the wire.
const END_OF_STREAM: &[u8] = b"$";

/// The largest greeting the host is expected to send.
const GREETING_LEN: usize = 4096;

/// Writes the snapshot sequence as pretty-printed JSON.
pub fn write_snapshots(path: impl AsRef<Path>, snapshots: &[Snapshot]) -> Result<(), ExportError> {
    write_json(path.as_ref(), snapshots)
}

/// Writes the run summary as pretty-printed JSON.
pub fn write_summary(path: impl AsRef<Path>, summary: &Summary) -> Result<(), ExportError> {
    write_json(path.as_ref(), summary)
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// A connection to a rendering host.
///
/// The host speaks first. Once it has greeted us we announce the data, send the
/// JSON payload and terminate it with `$`.
pub struct Transport {
    stream: TcpStream,
}

impl Transport {
    /// Connects to the host and waits for its greeting.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, ExportError> {
        let mut stream = TcpStream::connect(addr)?;
        let mut greeting = [0; GREETING_LEN];
        let len = stream.read(&mut greeting)?;
        if len == 0 {
            return Err(ExportError::Handshake);
        }
        info!(
            "host says: {}",
            String::from_utf8_lossy(&greeting[..len]).trim_end()
        );
        Ok(Self { stream })
    }

    /// Sends the snapshot sequence, preceded by `ready` and followed by the sentinel.
    pub fn send(mut self, ready: &str, snapshots: &[Snapshot]) -> Result<(), ExportError> {
        let payload = serde_json::to_vec_pretty(snapshots)?;
        self.stream.write_all(ready.as_bytes())?;
        self.stream.write_all(&payload)?;
        self.stream.write_all(END_OF_STREAM)?;
        self.stream.flush()?;
        info!("sent {} snapshots ({} bytes)", snapshots.len(), payload.len());
        Ok(())
    }
}

/// Streams the snapshots to the host, or writes them to `fallback` if delivery fails.
///
/// Only a failure to write the fallback file is returned.
pub fn deliver_or_save(
    host: impl ToSocketAddrs,
    ready: &str,
    snapshots: &[Snapshot],
    fallback: impl AsRef<Path>,
) -> Result<(), ExportError> {
    let delivered = Transport::connect(host).and_then(|t| t.send(ready, snapshots));
    if let Err(err) = delivered {
        let fallback = fallback.as_ref();
        warn!(
            "could not deliver to host ({}), saving to {}",
            err,
            fallback.display()
        );
        write_snapshots(fallback, snapshots)?;
    }
    Ok(())
}
