//! The resumable decompression engine.
//!
//! [`Inflater`] is a state machine over a [`ByteSource`]. Each call to
//! [`Inflater::fill`] runs it until the caller's buffer is full, the stream
//! ends, the source has nothing more to give for now, or the data turns out
//! to be invalid. Every suspension point records enough in [`State`] to pick
//! up again on the next call without re-reading input or re-emitting output.

use crate::bit_reader::BitReader;
use crate::block::{
    self, BlockKind, BlockTables, Code, DynamicHeader, Variant, END_OF_BLOCK, WINDOW_SIZE,
};
use crate::error::{Error, Result};
use crate::huffman::PartialCode;
use crate::options::InflateOptions;
use crate::source::ByteSource;
use crate::window::SlidingWindow;

/// Coarse decoding phase, for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the next 3-bit block header.
    AwaitingBlockHeader,
    /// Inside a stored block (LEN/NLEN or raw bytes).
    ReadingStoredBlock,
    /// Inside the header of a dynamic Huffman block.
    ReadingDynamicHeader,
    /// Decoding literal/length and distance symbols.
    DecodingSymbols,
    /// Copying a back-reference into the window.
    CopyingBackref,
    /// The final block has ended.
    Finished,
    /// Decoding failed; the error is permanent.
    Error,
}

/// What a caller should do after a `fill` that returned fewer bytes than asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Output is available or decoding can continue right away.
    Ready,
    /// The source has nothing more for now; call again once it does.
    NeedsInput,
    /// All output has been delivered.
    Finished,
    /// Decoding failed; every further call reports the error.
    Failed,
}

#[derive(Debug, Clone, Copy)]
enum StoredStep {
    /// LEN and NLEN.
    Length,
    /// Raw bytes still to copy.
    Data { remaining: u16 },
}

#[derive(Debug, Clone, Copy)]
enum SymbolStep {
    /// Literal/length symbol, possibly part-read.
    Literal(PartialCode),
    /// Length symbol known, extra bits pending.
    LengthExtra(Code),
    /// Distance symbol, possibly part-read.
    Distance { length: u32, partial: PartialCode },
    /// Distance symbol known, extra bits pending.
    DistanceExtra { length: u32, code: Code },
}

impl SymbolStep {
    fn start() -> Self {
        SymbolStep::Literal(PartialCode::default())
    }
}

/// Decoder state: the phase plus the data needed to resume inside it.
#[derive(Debug, Clone)]
enum State {
    BlockHeader,
    Stored(StoredStep),
    DynamicHeader(Box<DynamicHeader>),
    Symbols(SymbolStep),
    Copy { length: u32, distance: u32 },
    Finished,
    Failed(Error),
}

/// Tables of the block being decoded.
#[derive(Debug)]
enum Tables {
    Fixed,
    Dynamic(Box<BlockTables>),
}

impl Tables {
    fn get(&self) -> &BlockTables {
        match self {
            Tables::Fixed => block::fixed_tables(),
            Tables::Dynamic(tables) => tables,
        }
    }
}

/// Why the state machine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pause {
    Input,
    Output,
    Finished,
}

enum Next {
    Go(State),
    Pause(State, Pause),
}

/// Streaming DEFLATE64 / DEFLATE decoder over a byte source.
///
/// ```
/// use inflate64::Inflater;
///
/// // A single stored block holding "hi".
/// let data: &[u8] = &[0x01, 0x02, 0x00, 0xFD, 0xFF, b'h', b'i'];
/// let mut inflater = Inflater::new(data);
/// let mut out = [0u8; 8];
/// let n = inflater.fill(&mut out).unwrap();
/// assert_eq!(&out[..n], b"hi");
/// assert!(inflater.is_finished());
/// ```
#[derive(Debug)]
pub struct Inflater<S> {
    reader: BitReader<S>,
    window: SlidingWindow,
    tables: Tables,
    state: State,
    last_block: bool,
    variant: Variant,
    starved: bool,
    /// Pending output at which the current `fill` stops producing.
    demand: usize,
}

impl<S: ByteSource> Inflater<S> {
    /// Create a DEFLATE64 decoder with default options.
    pub fn new(source: S) -> Self {
        Self::with_options(source, InflateOptions::default())
    }

    /// Create a decoder with explicit options.
    pub fn with_options(source: S, options: InflateOptions) -> Self {
        Self {
            reader: BitReader::new(source, options.input_buffer_size),
            window: SlidingWindow::new(),
            tables: Tables::Fixed,
            state: State::BlockHeader,
            last_block: false,
            variant: options.variant,
            starved: false,
            demand: 0,
        }
    }

    /// Decode into `out`, returning the number of bytes written.
    ///
    /// A short count means the stream finished, the source is starved, or an
    /// error occurred after some bytes were produced; [`status`](Self::status)
    /// tells which. An empty `out` returns `Ok(0)` without touching the input.
    pub fn fill(&mut self, out: &mut [u8]) -> Result<usize> {
        if let State::Failed(err) = &self.state {
            return Err(err.clone());
        }
        if out.is_empty() {
            return Ok(0);
        }

        let mut written = self.window.drain(out);
        while written < out.len() && !matches!(self.state, State::Finished) {
            self.demand = (out.len() - written).min(WINDOW_SIZE);
            let result = self.run();
            written += self.window.drain(&mut out[written..]);
            match result {
                Ok(Pause::Output) => {}
                Ok(Pause::Input) | Ok(Pause::Finished) => break,
                Err(err) => {
                    self.window.discard_pending();
                    tracing::warn!(
                        error = %err,
                        total_out = self.window.total_out(),
                        "decompression failed"
                    );
                    if written > 0 {
                        return Ok(written);
                    }
                    return Err(err);
                }
            }
        }
        Ok(written)
    }

    /// Current status; disambiguates a short or zero-length `fill`.
    pub fn status(&self) -> Status {
        match self.state {
            State::Failed(_) => Status::Failed,
            _ if self.window.pending() > 0 => Status::Ready,
            State::Finished => Status::Finished,
            _ if self.starved => Status::NeedsInput,
            _ => Status::Ready,
        }
    }

    /// Current decoding phase.
    pub fn phase(&self) -> Phase {
        match self.state {
            State::BlockHeader => Phase::AwaitingBlockHeader,
            State::Stored(_) => Phase::ReadingStoredBlock,
            State::DynamicHeader(_) => Phase::ReadingDynamicHeader,
            State::Symbols(_) => Phase::DecodingSymbols,
            State::Copy { .. } => Phase::CopyingBackref,
            State::Finished => Phase::Finished,
            State::Failed(_) => Phase::Error,
        }
    }

    /// The stream has ended and all output has been delivered.
    pub fn is_finished(&self) -> bool {
        self.status() == Status::Finished
    }

    /// The last `fill` stopped because the source had nothing more yet.
    pub fn needs_input(&self) -> bool {
        self.status() == Status::NeedsInput
    }

    /// The error that stopped decoding, if any.
    pub fn error(&self) -> Option<&Error> {
        match &self.state {
            State::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Variant this decoder was built for.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Total bytes decoded so far, delivered or not.
    pub fn total_out(&self) -> u64 {
        self.window.total_out()
    }

    /// Borrow the source.
    pub fn source(&self) -> &S {
        self.reader.source()
    }

    /// Mutably borrow the source, e.g. to push more data into a
    /// [`Feed`](crate::source::Feed).
    pub fn source_mut(&mut self) -> &mut S {
        self.reader.source_mut()
    }

    /// Unwrap the source. Input buffered by the decoder is dropped.
    pub fn into_source(self) -> S {
        self.reader.into_source()
    }

    fn run(&mut self) -> Result<Pause> {
        self.starved = false;
        loop {
            let state = std::mem::replace(&mut self.state, State::BlockHeader);
            match self.step(state) {
                Ok(Next::Go(next)) => self.state = next,
                Ok(Next::Pause(next, pause)) => {
                    self.state = next;
                    if pause == Pause::Input {
                        self.starved = true;
                        tracing::trace!(
                            phase = ?self.phase(),
                            total_out = self.window.total_out(),
                            "waiting for input"
                        );
                    }
                    return Ok(pause);
                }
                Err(err) => {
                    self.state = State::Failed(err.clone());
                    return Err(err);
                }
            }
        }
    }

    fn step(&mut self, state: State) -> Result<Next> {
        let next = match state {
            State::BlockHeader => match block::read_block_header(&mut self.reader)? {
                None => Next::Pause(State::BlockHeader, Pause::Input),
                Some(header) => {
                    tracing::trace!(
                        last = header.last,
                        kind = ?header.kind,
                        total_out = self.window.total_out(),
                        "block header"
                    );
                    self.last_block = header.last;
                    match header.kind {
                        BlockKind::Stored => {
                            self.reader.align_to_byte();
                            Next::Go(State::Stored(StoredStep::Length))
                        }
                        BlockKind::Fixed => {
                            self.tables = Tables::Fixed;
                            Next::Go(State::Symbols(SymbolStep::start()))
                        }
                        BlockKind::Dynamic => Next::Go(State::DynamicHeader(Box::default())),
                    }
                }
            },
            State::Stored(StoredStep::Length) => match block::read_stored_length(&mut self.reader)? {
                None => Next::Pause(State::Stored(StoredStep::Length), Pause::Input),
                Some(0) => self.end_of_block(),
                Some(len) => Next::Go(State::Stored(StoredStep::Data { remaining: len })),
            },
            State::Stored(StoredStep::Data { remaining }) => self.copy_stored(remaining)?,
            State::DynamicHeader(mut header) => {
                match header.advance(&mut self.reader, self.variant)? {
                    None => Next::Pause(State::DynamicHeader(header), Pause::Input),
                    Some(tables) => {
                        self.tables = Tables::Dynamic(Box::new(tables));
                        Next::Go(State::Symbols(SymbolStep::start()))
                    }
                }
            }
            State::Symbols(step) => self.decode_symbols(step)?,
            State::Copy { length, distance } => self.copy_match(length, distance)?,
            State::Finished => Next::Pause(State::Finished, Pause::Finished),
            State::Failed(err) => return Err(err),
        };
        Ok(next)
    }

    /// Output the current `fill` may still produce.
    fn room(&self) -> usize {
        self.demand
            .saturating_sub(self.window.pending())
            .min(self.window.free())
    }

    fn end_of_block(&mut self) -> Next {
        self.tables = Tables::Fixed;
        if self.last_block {
            tracing::debug!(total_out = self.window.total_out(), "end of stream");
            Next::Go(State::Finished)
        } else {
            Next::Go(State::BlockHeader)
        }
    }

    fn copy_stored(&mut self, remaining: u16) -> Result<Next> {
        let room = self.room();
        if room == 0 {
            return Ok(Next::Pause(
                State::Stored(StoredStep::Data { remaining }),
                Pause::Output,
            ));
        }
        let spare = self.window.spare_mut(room.min(remaining as usize));
        let n = self.reader.read_bytes(spare)?;
        self.window.commit(n);

        let remaining = remaining - n as u16;
        Ok(if remaining == 0 {
            self.end_of_block()
        } else if n == 0 {
            Next::Pause(State::Stored(StoredStep::Data { remaining }), Pause::Input)
        } else {
            Next::Go(State::Stored(StoredStep::Data { remaining }))
        })
    }

    fn copy_match(&mut self, length: u32, distance: u32) -> Result<Next> {
        let room = self.room();
        if room == 0 {
            return Ok(Next::Pause(State::Copy { length, distance }, Pause::Output));
        }
        let n = (length as usize).min(room);
        self.window.copy_back(distance, n)?;

        let length = length - n as u32;
        Ok(if length == 0 {
            Next::Go(State::Symbols(SymbolStep::start()))
        } else {
            Next::Go(State::Copy { length, distance })
        })
    }

    fn decode_symbols(&mut self, mut step: SymbolStep) -> Result<Next> {
        let tables = self.tables.get();
        loop {
            step = match step {
                SymbolStep::Literal(mut partial) => {
                    if self.window.pending() >= self.demand {
                        let state = State::Symbols(SymbolStep::Literal(partial));
                        return Ok(Next::Pause(state, Pause::Output));
                    }
                    let Some(symbol) = tables.literal.decode(&mut self.reader, &mut partial)?
                    else {
                        let state = State::Symbols(SymbolStep::Literal(partial));
                        return Ok(Next::Pause(state, Pause::Input));
                    };
                    match symbol {
                        0..=255 => {
                            self.window.emit(symbol as u8);
                            SymbolStep::start()
                        }
                        END_OF_BLOCK => break,
                        _ => SymbolStep::LengthExtra(self.variant.length_code(symbol)?),
                    }
                }
                SymbolStep::LengthExtra(code) => {
                    let Some(extra) = self.reader.pull_bits(code.extra)? else {
                        let state = State::Symbols(SymbolStep::LengthExtra(code));
                        return Ok(Next::Pause(state, Pause::Input));
                    };
                    SymbolStep::Distance {
                        length: code.base + extra,
                        partial: PartialCode::default(),
                    }
                }
                SymbolStep::Distance {
                    length,
                    mut partial,
                } => {
                    let Some(symbol) = tables.distance.decode(&mut self.reader, &mut partial)?
                    else {
                        let state = State::Symbols(SymbolStep::Distance { length, partial });
                        return Ok(Next::Pause(state, Pause::Input));
                    };
                    SymbolStep::DistanceExtra {
                        length,
                        code: self.variant.distance_code(symbol)?,
                    }
                }
                SymbolStep::DistanceExtra { length, code } => {
                    let Some(extra) = self.reader.pull_bits(code.extra)? else {
                        let state = State::Symbols(SymbolStep::DistanceExtra { length, code });
                        return Ok(Next::Pause(state, Pause::Input));
                    };
                    let distance = code.base + extra;
                    self.window.check_distance(distance)?;
                    return Ok(Next::Go(State::Copy { length, distance }));
                }
            };
        }
        Ok(self.end_of_block())
    }
}
