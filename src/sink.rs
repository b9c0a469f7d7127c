//! Output Sink (C7): the single writer for emitted records.
//!
//! Workers never touch the output file directly. Each holds a clone of
//! `SinkHandle` and pushes completed records into a bounded channel; a
//! dedicated thread owns the writer and drains it, serialising one JSON
//! object per line in whatever order records complete.

use std::io::{self, BufWriter, Write};
use std::sync::mpsc::{self, SyncSender};
use std::thread::JoinHandle;

use crate::error::Error;
use crate::model::DerivationRecord;

/// Handed to every worker. Cloning is cheap (an `mpsc::SyncSender` clone).
#[derive(Clone)]
pub struct SinkHandle {
    tx: SyncSender<DerivationRecord>,
}

impl SinkHandle {
    /// Send blocks only on the bounded channel filling up — unlike the
    /// status channel, a slow sink legitimately applies back-pressure to
    /// workers, since dropping a `DerivationRecord` would violate the
    /// uniqueness/closure invariants in §3.
    pub fn send(&self, record: DerivationRecord) {
        // The receiving thread only exits after every sender is dropped,
        // so a send error here would mean the sink thread panicked; there
        // is nothing a worker can usefully do but drop the record.
        let _ = self.tx.send(record);
    }
}

/// Owns the output writer. `run` drains the channel on a dedicated thread
/// until every `SinkHandle` has been dropped, then flushes once more.
pub struct OutputSink {
    handle: JoinHandle<io::Result<()>>,
}

impl OutputSink {
    /// `capacity` bounds how many completed-but-not-yet-written records
    /// may be in flight; pick something comfortably larger than
    /// `n_workers` so a burst of near-simultaneous completions doesn't
    /// immediately stall every worker.
    pub fn spawn<W>(writer: W, pretty: bool, capacity: usize) -> (SinkHandle, Self)
    where
        W: Write + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));

        let handle = std::thread::Builder::new()
            .name("nixtract-sink".into())
            .spawn(move || -> io::Result<()> {
                let mut out = BufWriter::new(writer);
                while let Ok(record) = rx.recv() {
                    write_record(&mut out, &record, pretty)?;
                }
                out.flush()
            })
            .expect("failed to spawn sink thread");

        (SinkHandle { tx }, OutputSink { handle })
    }

    /// Block until the channel is drained and the writer is flushed.
    /// Called after every `SinkHandle` has gone out of scope.
    pub fn join(self) -> Result<(), Error> {
        match self.handle.join() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(Error::Io {
                path: None,
                source,
            }),
            Err(_) => Err(Error::Io {
                path: None,
                source: io::Error::other("sink thread panicked"),
            }),
        }
    }
}

fn write_record<W: Write>(out: &mut W, record: &DerivationRecord, pretty: bool) -> io::Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, record)?;
    } else {
        serde_json::to_writer(&mut *out, record)?;
    }
    out.write_all(b"\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributePath, NixpkgsMetadata, ParsedName};

    fn sample(attr: &str) -> DerivationRecord {
        DerivationRecord {
            name: format!("{attr}-1.0"),
            parsed_name: ParsedName::parse(&format!("{attr}-1.0")),
            attribute_path: AttributePath::from(attr),
            derivation_path: None,
            output_path: None,
            outputs: Vec::new(),
            nixpkgs_metadata: NixpkgsMetadata::default(),
            src: None,
            build_inputs: Vec::new(),
        }
    }

    #[test]
    fn writes_one_json_line_per_record() {
        let buf: Vec<u8> = Vec::new();
        let (handle, sink) = OutputSink::spawn(buf, false, 8);
        handle.send(sample("a"));
        handle.send(sample("b"));
        drop(handle);
        sink.join().unwrap();
    }

    #[test]
    fn pretty_printing_keeps_one_record_per_line() {
        let mut out: Vec<u8> = Vec::new();
        write_record(&mut out, &sample("a"), true).unwrap();
        write_record(&mut out, &sample("b"), true).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.trim_end().split('\n').collect();
        // Each pretty record embeds internal newlines, but every *line*
        // must parse once the whole block is re-joined per record: find
        // exactly two top-level JSON objects.
        let joined = lines.join("\n");
        let mut de = serde_json::Deserializer::from_str(&joined).into_iter::<DerivationRecord>();
        assert!(de.next().unwrap().is_ok());
        assert!(de.next().unwrap().is_ok());
        assert!(de.next().is_none());
    }
}
