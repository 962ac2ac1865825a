use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wrapz_core::{
    peek_header, Available, CompressingCodec, CompressionEngine, DataInput, Reader, RecordHeader,
    Utf8Codec, ValueCodec, Writer,
};
use wrapz_engines::{engine_by_id, DeflateEngine, Lz4Engine, NoopEngine, ZstdEngine};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "wrapz",
    about = "Pack text into compressed record logs, inspect them, and read them back",
    version
)]
struct Cli {
    /// Log codec decisions (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack every line of a text file into one compressed record
    Pack {
        /// Source text file ("-" reads stdin)
        input: PathBuf,
        /// Destination record log
        output: PathBuf,
        /// Engine to use: lz4 | zstd | deflate | noop
        #[arg(short, long, default_value = "lz4")]
        engine: String,
        /// Zstd compression level (1–22, only used with --engine zstd)
        #[arg(long, default_value_t = 3)]
        zstd_level: i32,
        /// Store compressed lengths so records need no length prefix
        #[arg(short, long)]
        self_describing: bool,
    },
    /// Decode every record of a log back into lines
    Unpack {
        /// Source record log
        input: PathBuf,
        /// Destination text file ("-" writes to stdout)
        output: PathBuf,
    },
    /// Print header metadata and per-record framing statistics
    Inspect {
        /// Record log to inspect
        file: PathBuf,
        /// Print per-record details
        #[arg(long)]
        records: bool,
    },
    /// Round-trip synthetic records through one codec shared by many threads
    Bench {
        /// Engine to use: lz4 | zstd | deflate | noop
        #[arg(short, long, default_value = "lz4")]
        engine: String,
        /// Worker threads
        #[arg(short, long, default_value_t = 4)]
        threads: usize,
        /// Records encoded and decoded per thread
        #[arg(short, long, default_value_t = 10_000)]
        count: u64,
        /// Store compressed lengths and decode without a bound
        #[arg(short, long)]
        self_describing: bool,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn engine_from_name(name: &str, zstd_level: i32) -> anyhow::Result<Arc<dyn CompressionEngine>> {
    match name {
        "lz4" | "l" => Ok(Arc::new(Lz4Engine)),
        "zstd" | "z" => Ok(Arc::new(ZstdEngine::new(zstd_level))),
        "deflate" | "d" => Ok(Arc::new(DeflateEngine::default())),
        "noop" | "none" => Ok(Arc::new(NoopEngine)),
        other => anyhow::bail!(
            "unknown engine '{}'. Valid options: lz4, zstd, deflate, noop",
            other
        ),
    }
}

fn open_log(path: &Path) -> anyhow::Result<Reader<Utf8Codec>> {
    let header = peek_header(path).with_context(|| format!("opening record log {:?}", path))?;
    tracing::debug!(
        engine_id = header.engine_id,
        flags = header.flags,
        "opening record log"
    );
    let engine = engine_by_id(header.engine_id)?;
    Reader::open(path, Utf8Codec, engine)
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

/// Deterministic record `i`: a log-like line, with every fourth record
/// replaced by noise that should not compress.
fn synthetic_record(i: u64) -> String {
    if i % 4 == 3 {
        let mut rng = i;
        (0..48 + i % 64)
            .map(|_| {
                rng = rng
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                char::from(b'!' + ((rng >> 57) as u8 % 90))
            })
            .collect()
    } else {
        format!(
            "2025-02-{:02} 10.0.{}.{} GET /api/v1/catalog/items?page={} status=200 bytes={} ",
            i % 28 + 1,
            i % 7,
            i % 250,
            i % 200,
            i * 37 % 9999
        )
        .repeat(1 + (i % 3) as usize)
    }
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_pack(
    input: PathBuf,
    output: PathBuf,
    engine_name: &str,
    zstd_level: i32,
    self_describing: bool,
) -> anyhow::Result<()> {
    let engine = engine_from_name(engine_name, zstd_level)?;
    let engine_display = engine.name();

    let src: Box<dyn BufRead> = if input.to_str() == Some("-") {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(&input).with_context(|| format!("opening input file {:?}", input))?;
        Box::new(BufReader::new(file))
    };

    let mut writer = Writer::create(&output, Utf8Codec, engine, self_describing)
        .with_context(|| format!("creating output file {:?}", output))?;

    let t0 = Instant::now();
    let mut bytes_read = 0u64;
    for line in src.lines() {
        let line = line?;
        bytes_read += line.len() as u64 + 1;
        writer.write(&line)?;
    }
    let compressed_records = writer.compressed_records();
    let record_count = writer.finish()?;
    let elapsed = t0.elapsed();

    let packed_size = std::fs::metadata(&output)?.len();
    let ratio = bytes_read as f64 / packed_size.max(1) as f64;

    eprintln!("  engine      : {}", engine_display);
    eprintln!(
        "  framing     : {}",
        if self_describing { "self-describing" } else { "length-prefixed" }
    );
    eprintln!("  records     : {}", record_count);
    eprintln!("  compressed  : {}", compressed_records);
    eprintln!("  raw size    : {}", human_bytes(bytes_read));
    eprintln!("  packed      : {}", human_bytes(packed_size));
    eprintln!("  ratio       : {:.2}x", ratio);
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_unpack(input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let reader = open_log(&input)?;

    let is_stdout = output.to_str() == Some("-");
    let mut dst: Box<dyn Write> = if is_stdout {
        Box::new(BufWriter::new(io::stdout()))
    } else {
        Box::new(BufWriter::new(
            File::create(&output).with_context(|| format!("creating output file {:?}", output))?,
        ))
    };

    let t0 = Instant::now();
    let mut records = 0u64;
    for record in reader.records() {
        let (_, line) = record?;
        dst.write_all(line.as_bytes())?;
        dst.write_all(b"\n")?;
        records += 1;
    }
    dst.flush()?;

    eprintln!("  records     : {}", records);
    eprintln!("  elapsed     : {:.3}s", t0.elapsed().as_secs_f64());
    Ok(())
}

fn run_inspect(file: PathBuf, show_records: bool) -> anyhow::Result<()> {
    let reader = open_log(&file)?;
    let entries = reader.entries()?;

    let compressed: Vec<_> = entries.iter().filter(|e| e.header.is_compressed()).collect();
    let raw_total: u64 = entries
        .iter()
        .map(|e| match e.header {
            RecordHeader::Compressed { raw_len, .. } => raw_len as u64,
            RecordHeader::Raw => (e.len - e.header.encoded_len()) as u64,
        })
        .sum();
    let stored_total: u64 = entries.iter().map(|e| e.len as u64).sum();

    println!("=== Record log: {:?} ===", file);
    println!();
    println!("  format version : {}", reader.header.version);
    println!("  engine         : {} (id={})", reader.engine_name(), reader.header.engine_id);
    println!(
        "  framing        : {}",
        if reader.is_self_describing() { "self-describing" } else { "length-prefixed" }
    );
    println!("  records        : {}", entries.len());
    println!("  compressed     : {}", compressed.len());
    println!("  passthrough    : {}", entries.len() - compressed.len());
    println!("  value bytes    : {}", human_bytes(raw_total));
    println!("  record bytes   : {}", human_bytes(stored_total));
    println!("  file on disk   : {}", human_bytes(reader.file_size() as u64));
    println!("  ratio          : {:.2}x", raw_total as f64 / stored_total.max(1) as f64);
    println!("  flags          : 0x{:04x}", reader.header.flags);

    if show_records {
        println!();
        println!(
            "  {:>8}  {:>12}  {:>10}  {:>10}  {:>12}",
            "record", "file offset", "stored", "flag", "kind"
        );
        println!("  {}", "-".repeat(60));
        for e in &entries {
            println!(
                "  {:>8}  {:>12}  {:>10}  {:>10}  {:>12}",
                e.index,
                e.offset,
                e.len,
                e.header.flag(),
                if e.header.is_compressed() { "compressed" } else { "passthrough" }
            );
        }
    }

    Ok(())
}

fn run_bench(
    engine_name: &str,
    threads: usize,
    count: u64,
    self_describing: bool,
) -> anyhow::Result<()> {
    let engine = engine_from_name(engine_name, 3)?;
    let codec = CompressingCodec::builder(Utf8Codec, engine)
        .self_describing(self_describing)
        .unbounded_reads(self_describing)
        .build()?;

    eprintln!(
        "round-tripping {} records on each of {} threads ({})...",
        count,
        threads,
        codec.engine().name()
    );

    let t0 = Instant::now();
    let totals = std::thread::scope(|s| {
        let workers: Vec<_> = (0..threads as u64)
            .map(|t| {
                let codec = &codec;
                s.spawn(move || -> anyhow::Result<(u64, u64)> {
                    let mut raw_bytes = 0u64;
                    let mut stored_bytes = 0u64;
                    let mut record = Vec::new();
                    for i in 0..count {
                        let value = synthetic_record(t * count + i);
                        record.clear();
                        codec.encode(&value, &mut record)?;
                        let available = if self_describing {
                            Available::Unbounded
                        } else {
                            Available::Bounded(record.len())
                        };
                        let decoded = codec.decode(&mut DataInput::new(&record), available)?;
                        if decoded != value {
                            anyhow::bail!("thread {} record {} did not round-trip", t, i);
                        }
                        raw_bytes += value.len() as u64;
                        stored_bytes += record.len() as u64;
                    }
                    Ok((raw_bytes, stored_bytes))
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|w| match w.join() {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("bench worker panicked")),
            })
            .collect::<anyhow::Result<Vec<_>>>()
    })?;
    let elapsed = t0.elapsed();

    let raw: u64 = totals.iter().map(|t| t.0).sum();
    let stored: u64 = totals.iter().map(|t| t.1).sum();
    let records = count * threads as u64;

    println!();
    println!("=== Concurrent Round-Trip Benchmark ===");
    println!("  records     : {}", records);
    println!("  value bytes : {}", human_bytes(raw));
    println!("  stored      : {}", human_bytes(stored));
    println!("  ratio       : {:.2}x", raw as f64 / stored.max(1) as f64);
    println!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    println!(
        "  throughput  : {}/s ({:.0} records/s)",
        human_bytes((raw as f64 / elapsed.as_secs_f64()) as u64),
        records as f64 / elapsed.as_secs_f64()
    );
    println!("  idle buffers: {}", codec.pool().idle_count());

    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Pack {
            input,
            output,
            engine,
            zstd_level,
            self_describing,
        } => run_pack(input, output, &engine, zstd_level, self_describing),
        Commands::Unpack { input, output } => run_unpack(input, output),
        Commands::Inspect { file, records } => run_inspect(file, records),
        Commands::Bench {
            engine,
            threads,
            count,
            self_describing,
        } => run_bench(&engine, threads, count, self_describing),
    }
}
