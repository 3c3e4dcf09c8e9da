use std::io::{self, Read};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use log::{debug, trace};

const READ_BUFFER: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Chunk(String),
    Closed,
}

/// Pumps `reader` into `tx` on its own thread until end of stream.
///
/// Prompts are not newline terminated, so raw reads are forwarded as they
/// arrive. Incomplete UTF-8 sequences are held back until the next read.
/// If the receiving side goes away the rest of the stream is drained and
/// discarded so the child never blocks on a full pipe.
pub fn spawn_reader(
    label: String,
    mut reader: Box<dyn Read + Send>,
    tx: Sender<OutputEvent>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new().name(label.clone()).spawn(move || {
        let mut buf = [0u8; READ_BUFFER];
        let mut carry = Vec::new();
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    carry.extend_from_slice(&buf[..n]);
                    let text = take_utf8(&mut carry);
                    if text.is_empty() {
                        continue;
                    }
                    trace!("{}: {:?}", label, text);
                    if tx.send(OutputEvent::Chunk(text)).is_err() {
                        let _ = io::copy(&mut reader, &mut io::sink());
                        return;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("{}: read failed: {}", label, e);
                    break;
                }
            }
        }
        if !carry.is_empty() {
            let _ = tx.send(OutputEvent::Chunk(String::from_utf8_lossy(&carry).into_owned()));
        }
        let _ = tx.send(OutputEvent::Closed);
    })
}

/// Splits off the longest decodable prefix of `carry`.
fn take_utf8(carry: &mut Vec<u8>) -> String {
    let valid = match std::str::from_utf8(&carry[..]) {
        Ok(_) => carry.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => carry.len(),
    };
    let text = String::from_utf8_lossy(&carry[..valid]).into_owned();
    carry.drain(..valid);
    text
}

/// Output received but not yet consumed by a match.
#[derive(Debug, Default)]
pub struct OutputContext {
    text: String,
    limit: usize,
}

impl OutputContext {
    pub fn new(limit: usize) -> Self {
        Self { text: String::new(), limit }
    }

    pub fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        if self.text.len() > self.limit {
            let mut cut = self.text.len() - self.limit;
            while !self.text.is_char_boundary(cut) {
                cut += 1;
            }
            self.text.drain(..cut);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Removes and returns everything up to `end`.
    pub fn consume(&mut self, end: usize) -> String {
        self.text.drain(..end.min(self.text.len())).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::mpsc;

    #[test]
    fn test_take_utf8_holds_partial_sequence() {
        let euro = "€".as_bytes();
        let mut carry = vec![b'a', euro[0], euro[1]];
        assert_eq!(take_utf8(&mut carry), "a");
        assert_eq!(carry.len(), 2);
        carry.push(euro[2]);
        assert_eq!(take_utf8(&mut carry), "€");
        assert!(carry.is_empty());
    }

    #[test]
    fn test_reader_forwards_then_closes() {
        let (tx, rx) = mpsc::channel();
        let reader: Box<dyn Read + Send> = Box::new(Cursor::new(b"12%\nEverything is Ok\n".to_vec()));
        spawn_reader("test-reader".to_string(), reader, tx).unwrap().join().unwrap();

        let events: Vec<OutputEvent> = rx.iter().collect();
        assert_eq!(events.last(), Some(&OutputEvent::Closed));
        let text: String = events
            .iter()
            .filter_map(|e| match e {
                OutputEvent::Chunk(s) => Some(s.as_str()),
                OutputEvent::Closed => None,
            })
            .collect();
        assert_eq!(text, "12%\nEverything is Ok\n");
    }

    #[test]
    fn test_context_keeps_tail_within_limit() {
        let mut context = OutputContext::new(8);
        context.push("0123456789");
        assert_eq!(context.as_str(), "23456789");
        assert_eq!(context.consume(3), "234");
        assert_eq!(context.as_str(), "56789");
    }
}
