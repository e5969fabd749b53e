//! inflate64 CLI - DEFLATE64 decompression tool
//!
//! Decompresses a raw DEFLATE64 (or, with `--deflate`, plain DEFLATE)
//! bitstream from a file or stdin.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::time::Instant;

use clap::builder::TypedValueParser;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use inflate64::options::DEFAULT_INPUT_BUFFER_SIZE;
use inflate64::{InflateOptions, InflateReader, Variant};

/// Decompress a raw DEFLATE64 stream.
///
/// Reads compressed data from INPUT (or stdin) and writes the decompressed
/// bytes to OUTPUT (or stdout).
#[derive(Parser, Debug)]
#[command(name = "inflate64")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Compressed input file ("-" or absent for stdin)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output file (stdout when absent)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Decode plain DEFLATE (RFC 1951) instead of DEFLATE64
    #[arg(long)]
    deflate: bool,

    /// Bytes requested from the input per read
    #[arg(
        long,
        default_value_t = DEFAULT_INPUT_BUFFER_SIZE,
        value_parser = clap::value_parser!(u32).range(1..=(1 << 24)).map(|v| v as usize)
    )]
    buffer_size: usize,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Counts bytes pulled through an inner reader.
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "inflate64=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn open_input(path: Option<&PathBuf>) -> io::Result<Box<dyn Read>> {
    match path {
        Some(path) if path.as_os_str() != "-" => Ok(Box::new(File::open(path)?)),
        _ => Ok(Box::new(io::stdin().lock())),
    }
}

fn open_output(path: Option<&PathBuf>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let variant = if args.deflate {
        Variant::Deflate
    } else {
        Variant::Deflate64
    };
    let options = InflateOptions::default()
        .with_variant(variant)
        .with_input_buffer_size(args.buffer_size);

    let input = CountingReader {
        inner: open_input(args.input.as_ref())?,
        count: 0,
    };
    let mut output = open_output(args.output.as_ref())?;
    let mut reader = InflateReader::new(input, options);

    let start = Instant::now();
    let written = io::copy(&mut reader, &mut output)?;
    output.flush()?;
    let elapsed = start.elapsed();

    if args.verbose {
        let read = reader.into_inner().into_source().into_inner().count;
        let ratio = if read > 0 {
            written as f64 / read as f64
        } else {
            0.0
        };
        eprintln!("Variant: {:?}", variant);
        eprintln!("  Compressed: {} bytes", read);
        eprintln!("  Decompressed: {} bytes ({:.2}x)", written, ratio);
        eprintln!("  Time: {:.2?}", elapsed);
        if elapsed.as_secs_f64() > 0.0 {
            eprintln!(
                "  Throughput: {:.1} MiB/s",
                written as f64 / elapsed.as_secs_f64() / (1024.0 * 1024.0)
            );
        }
    }

    Ok(())
}
