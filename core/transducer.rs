//! Single-pass whitespace normalizer.
//!
//! Bytes are consumed one at a time and never looked ahead of. Whitespace is
//! not written when it is seen; its width is kept in a pending column count
//! and only materialized once the next content byte arrives. That is what
//! lets trailing whitespace vanish, CRLF and lone CR collapse into one LF, and
//! the indentation run be re-encoded once its full width is known.

use crate::rule::{COLUMNS_PER_TAB, ConversionRule};
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};

const TAB: u8 = b'\t';
const SPACE: u8 = b' ';
const CR: u8 = b'\r';
const LF: u8 = b'\n';
const VT: u8 = 0x0b;
const FF: u8 = 0x0c;

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransducerState {
    /// Inside the indentation run; no content byte seen on this line yet.
    LineStart,
    /// At least one content byte has been written on this line.
    InContent,
    /// A CR was consumed and the LF it stands for has not been written yet.
    PendingLf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteClass {
    Cr,
    Lf,
    Tab,
    Blank(u8),
    Content(u8),
}

impl ByteClass {
    fn of(byte: u8) -> Self {
        match byte {
            CR => ByteClass::Cr,
            LF => ByteClass::Lf,
            TAB => ByteClass::Tab,
            SPACE | VT | FF => ByteClass::Blank(byte),
            _ => ByteClass::Content(byte),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TransduceError {
    #[error("reading source failed: {0}")]
    Read(#[source] io::Error),

    #[error("writing converted bytes failed: {0}")]
    Write(#[source] io::Error),
}

#[derive(Debug, Clone)]
pub struct Transducer {
    rule: ConversionRule,
    state: TransducerState,
    pending: usize,
    changed: bool,
}

impl Transducer {
    pub fn new(rule: ConversionRule) -> Self {
        Transducer {
            rule,
            state: TransducerState::LineStart,
            pending: 0,
            changed: false,
        }
    }

    pub fn state(&self) -> TransducerState {
        self.state
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) {
        for &byte in input {
            self.step(byte, out);
        }
    }

    pub fn step(&mut self, byte: u8, out: &mut Vec<u8>) {
        use ByteClass as B;
        use TransducerState as S;

        let tab_rule = self.rule == ConversionRule::TabIndent;

        self.state = match (self.state, ByteClass::of(byte)) {
            (_, B::Cr) => {
                self.changed = true;
                S::PendingLf
            }
            (_, B::Lf) => {
                out.push(LF);
                if self.pending > 0 {
                    self.changed = true;
                    self.pending = 0;
                }
                S::LineStart
            }

            (S::LineStart, B::Tab) => {
                self.pending += COLUMNS_PER_TAB;
                self.changed |= !tab_rule;
                S::LineStart
            }
            (S::InContent, B::Tab) => {
                self.pending += COLUMNS_PER_TAB;
                self.changed = true;
                S::InContent
            }
            (S::PendingLf, B::Tab) => {
                out.push(LF);
                self.pending = COLUMNS_PER_TAB;
                S::LineStart
            }

            (S::LineStart, B::Blank(b)) => {
                self.pending += 1;
                self.changed |= b != SPACE || tab_rule;
                S::LineStart
            }
            (S::InContent, B::Blank(b)) => {
                self.pending += 1;
                self.changed |= b != SPACE;
                S::InContent
            }
            (S::PendingLf, B::Blank(_)) => {
                out.push(LF);
                self.pending = 1;
                S::LineStart
            }

            (S::LineStart, B::Content(b)) => {
                self.emit_indentation(out);
                out.push(b);
                S::InContent
            }
            (S::InContent, B::Content(b)) => {
                out.extend(std::iter::repeat_n(SPACE, self.pending));
                self.pending = 0;
                out.push(b);
                S::InContent
            }
            // Indentation that preceded the stray CR is not re-derived for
            // the new line; the byte goes straight out.
            (S::PendingLf, B::Content(b)) => {
                out.push(LF);
                self.pending = 0;
                out.push(b);
                S::InContent
            }
        };
    }

    /// Flushes end-of-stream state and reports whether any byte differed.
    pub fn finish(mut self, out: &mut Vec<u8>) -> bool {
        if self.state == TransducerState::PendingLf {
            out.push(LF);
        } else if self.pending > 0 {
            self.changed = true;
        }
        self.changed
    }

    fn emit_indentation(&mut self, out: &mut Vec<u8>) {
        let nearest = (self.pending + COLUMNS_PER_TAB / 2) / COLUMNS_PER_TAB;
        match self.rule {
            ConversionRule::AlignedSpace => {
                let width = nearest * COLUMNS_PER_TAB;
                if width != self.pending {
                    self.changed = true;
                }
                out.extend(std::iter::repeat_n(SPACE, width));
            }
            // Any input this path rewrites already set `changed` while its
            // whitespace was being counted.
            ConversionRule::TabIndent => out.extend(std::iter::repeat_n(TAB, nearest)),
        }
        self.pending = 0;
    }
}

/// Streams `reader` through a [`Transducer`] into `writer`.
///
/// Returns whether the written bytes differ from the source. The writer is
/// not flushed; closing it is the caller's business.
pub fn transduce<R: Read, W: Write>(
    reader: R,
    writer: &mut W,
    rule: ConversionRule,
) -> Result<bool, TransduceError> {
    let mut reader = BufReader::with_capacity(READ_CHUNK, reader);
    let mut transducer = Transducer::new(rule);
    let mut out = Vec::with_capacity(READ_CHUNK * 2);

    loop {
        let chunk = match reader.fill_buf() {
            Ok(chunk) => chunk,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransduceError::Read(e)),
        };
        if chunk.is_empty() {
            break;
        }
        let consumed = chunk.len();
        transducer.feed(chunk, &mut out);
        reader.consume(consumed);

        writer.write_all(&out).map_err(TransduceError::Write)?;
        out.clear();
    }

    let changed = transducer.finish(&mut out);
    writer.write_all(&out).map_err(TransduceError::Write)?;
    Ok(changed)
}

pub fn normalize(input: &[u8], rule: ConversionRule) -> (Vec<u8>, bool) {
    let mut out = Vec::with_capacity(input.len());
    let mut transducer = Transducer::new(rule);
    transducer.feed(input, &mut out);
    let changed = transducer.finish(&mut out);
    (out, changed)
}
