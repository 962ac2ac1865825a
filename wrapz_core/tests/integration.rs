//! Integration tests: the compressing codec over the bundled engines, record
//! logs on disk, and concurrent use of one shared codec.
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use proptest::prelude::*;

use wrapz_core::{
    Available, CodecError, CompressingCodec, CompressionEngine, DataInput, RawBytesCodec,
    Reader, RecordHeader, Utf8Codec, ValueCodec, Writer,
};
use wrapz_engines::{engine_by_id, DeflateEngine, Lz4Engine, NoopEngine, ZstdEngine};

const REC: &str =
    "ad8989a89d89dk            qwdqwkd            dqwdqwkdkk asciasc909  dvvdf vd        ";

/// Generate `len` deterministic bytes using a simple LCG.
fn pseudo_random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = seed;
    (0..len)
        .map(|_| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (rng >> 56) as u8
        })
        .collect()
}

fn compressing_engines() -> Vec<Arc<dyn CompressionEngine>> {
    vec![
        Arc::new(Lz4Engine),
        Arc::new(ZstdEngine::default()),
        Arc::new(DeflateEngine::default()),
    ]
}

fn encode<C: ValueCodec>(codec: &C, value: &C::Value) -> Vec<u8> {
    let mut out = Vec::new();
    codec.encode(value, &mut out).unwrap();
    out
}

fn decode_bounded<C: ValueCodec>(codec: &C, record: &[u8]) -> C::Value {
    let mut input = DataInput::new(record);
    let value = codec.decode(&mut input, Available::Bounded(record.len())).unwrap();
    assert!(input.is_empty(), "decode must consume the whole record");
    value
}

fn flag_of(record: &[u8], self_describing: bool) -> u64 {
    let mut input = DataInput::new(record);
    RecordHeader::read_from(&mut input, self_describing).unwrap().flag()
}

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("wrapz_test_{}_{}.log", name, std::process::id()))
}

// ── scenarios ──────────────────────────────────────────────────────────────

#[test]
fn string_record_bounded_without_length() {
    let codec = CompressingCodec::new(Utf8Codec, Lz4Engine, false);
    let record = encode(&codec, &REC.to_string());
    assert_eq!(decode_bounded(&codec, &record), REC);
}

#[test]
fn string_record_unbounded_with_length() {
    let codec = CompressingCodec::builder(Utf8Codec, Lz4Engine)
        .self_describing(true)
        .unbounded_reads(true)
        .build()
        .unwrap();
    let record = encode(&codec, &REC.to_string());
    let mut input = DataInput::new(&record);
    assert_eq!(codec.decode(&mut input, Available::Unbounded).unwrap(), REC);
    assert!(input.is_empty());
}

#[test]
fn map_values_round_trip() {
    let codec = CompressingCodec::new(Utf8Codec, Lz4Engine, false);
    let mut store: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    for suffix in ["1", "2", "3"] {
        store.insert(format!("{REC}{suffix}"), encode(&codec, &REC.to_string()));
    }
    for suffix in ["1", "2", "3"] {
        let record = &store[&format!("{REC}{suffix}")];
        assert_eq!(decode_bounded(&codec, record), REC);
    }
}

#[test]
fn map_keys_and_values_round_trip() {
    let keys = CompressingCodec::new(Utf8Codec, ZstdEngine::default(), true);
    let values = CompressingCodec::new(Utf8Codec, ZstdEngine::default(), true);

    let mut store: HashMap<Vec<u8>, Vec<u8>> = HashMap::new();
    for suffix in ["1", "2", "3"] {
        let key = encode(&keys, &format!("{REC}{suffix}"));
        store.insert(key, encode(&values, &REC.to_string()));
    }
    assert_eq!(store.len(), 3);

    for suffix in ["1", "2", "3"] {
        let key = encode(&keys, &format!("{REC}{suffix}"));
        let mut input = DataInput::new(&store[&key]);
        assert_eq!(values.decode(&mut input, Available::Unbounded).unwrap(), REC);
    }

    // Keys decode back too, without any external bound.
    let mut decoded: Vec<String> = store
        .keys()
        .map(|k| keys.decode(&mut DataInput::new(k), Available::Unbounded).unwrap())
        .collect();
    decoded.sort();
    assert_eq!(decoded, ["1", "2", "3"].map(|s| format!("{REC}{s}")));
}

// ── compress-or-passthrough decision ───────────────────────────────────────

#[test]
fn random_bytes_always_pass_through() {
    for engine in compressing_engines() {
        for seed in 0..8 {
            let value = pseudo_random_bytes(4096, seed);
            let codec = CompressingCodec::new(RawBytesCodec, engine.clone(), false);
            let record = encode(&codec, &value);
            assert_eq!(flag_of(&record, false), 0, "engine {}", engine.name());
            assert_eq!(record.len(), value.len() + 1);
            assert_eq!(decode_bounded(&codec, &record), value);
        }
    }
}

#[test]
fn repeated_byte_always_compresses() {
    for engine in compressing_engines() {
        for self_describing in [false, true] {
            let value = vec![b'z'; 10_000];
            let codec = CompressingCodec::new(RawBytesCodec, engine.clone(), self_describing);
            let record = encode(&codec, &value);
            assert_eq!(flag_of(&record, self_describing), 10_001, "engine {}", engine.name());
            assert!(record.len() < value.len() / 10);
            assert_eq!(decode_bounded(&codec, &record), value);
        }
    }
}

#[test]
fn noop_engine_never_compresses() {
    let codec = CompressingCodec::new(RawBytesCodec, NoopEngine, true);
    let record = encode(&codec, &vec![0u8; 1000]);
    assert_eq!(flag_of(&record, true), 0);
}

#[test]
fn empty_value_is_stored_raw() {
    let codec = CompressingCodec::new(RawBytesCodec, Lz4Engine, false);
    let record = encode(&codec, &Vec::new());
    assert_eq!(record, [0]);
    assert_eq!(decode_bounded(&codec, &record), Vec::<u8>::new());
}

#[test]
fn back_to_back_records_decode_unbounded() {
    let codec = CompressingCodec::new(Utf8Codec, ZstdEngine::default(), true);
    let values = vec![
        "short".to_string(),
        "a".repeat(5000),
        String::from_utf8_lossy(&pseudo_random_bytes(300, 7)).into_owned(),
        String::new(),
    ];
    let mut log = Vec::new();
    for value in &values {
        codec.encode(value, &mut log).unwrap();
    }

    let mut input = DataInput::new(&log);
    for value in &values {
        assert_eq!(&codec.decode(&mut input, Available::Unbounded).unwrap(), value);
    }
    assert!(input.is_empty());
}

#[test]
fn truncated_compressed_payload_is_reported() {
    let codec = CompressingCodec::new(RawBytesCodec, Lz4Engine, true);
    let mut record = encode(&codec, &vec![1u8; 2048]);
    record.truncate(record.len() - 1);

    let mut input = DataInput::new(&record);
    let err = codec.decode(&mut input, Available::Unbounded).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CodecError>(),
        Some(CodecError::Truncated { .. })
    ));
}

#[test]
fn corrupt_lz4_payload_is_a_decompression_error() {
    let codec = CompressingCodec::new(RawBytesCodec, Lz4Engine, false);
    let mut record = encode(&codec, &b"abcd".repeat(256));
    // Point the first match offset far before the start of the output.
    let last = record.len() - 1;
    record[3..last].iter_mut().for_each(|b| *b = 0xff);

    let mut input = DataInput::new(&record);
    let err = codec
        .decode(&mut input, Available::Bounded(record.len()))
        .unwrap_err();
    let codec_err = err.downcast_ref::<CodecError>().unwrap();
    assert!(
        matches!(
            codec_err,
            CodecError::Decompress { engine: "lz4", .. } | CodecError::Corrupt { .. }
        ),
        "unexpected error {codec_err:?}"
    );
    assert_eq!(codec_err.offset(), Some(0));
}

// ── reconstruction ─────────────────────────────────────────────────────────

#[test]
fn codec_restored_from_json_reads_existing_records() {
    let codec = CompressingCodec::new(Utf8Codec, ZstdEngine::new(7), true);
    let record = encode(&codec, &REC.repeat(10));

    let json = serde_json::to_string(&codec).unwrap();
    assert!(json.contains("\"level\":7"));
    assert!(!json.contains("pool\""));

    let restored: CompressingCodec<Utf8Codec, ZstdEngine> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.engine().level, 7);
    let mut input = DataInput::new(&record);
    assert_eq!(restored.decode(&mut input, Available::Unbounded).unwrap(), REC.repeat(10));
}

// ── concurrency ────────────────────────────────────────────────────────────

#[test]
fn concurrent_round_trips_share_one_codec() {
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 300;

    let codec = Arc::new(
        CompressingCodec::builder(RawBytesCodec, Lz4Engine)
            .self_describing(true)
            .pool_capacity(4)
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let codec = Arc::clone(&codec);
            std::thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let seed = t * PER_THREAD + i;
                    // Alternate compressible and incompressible values of varying size.
                    let value = if i % 2 == 0 {
                        vec![(seed % 251) as u8; 64 + (seed as usize % 900)]
                    } else {
                        pseudo_random_bytes(64 + (seed as usize % 900), seed)
                    };
                    let mut record = Vec::new();
                    codec.encode(&value, &mut record).unwrap();
                    let mut input = DataInput::new(&record);
                    let decoded = codec
                        .decode(&mut input, Available::Bounded(record.len()))
                        .unwrap();
                    assert_eq!(decoded, value, "thread {t} record {i}");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(codec.pool().idle_count() <= 4);
}

// ── record log files ───────────────────────────────────────────────────────

fn write_log(
    name: &str,
    engine_id: u16,
    self_describing: bool,
    lines: &[String],
) -> std::path::PathBuf {
    let path = temp_path(name);
    let engine = engine_by_id(engine_id).unwrap();
    let mut w = Writer::create(&path, Utf8Codec, engine, self_describing).unwrap();
    for line in lines {
        w.write(line).unwrap();
    }
    assert_eq!(w.finish().unwrap(), lines.len() as u64);
    path
}

fn sample_lines() -> Vec<String> {
    vec![
        REC.to_string(),
        "GET /api/v1/items?page=1 200 ".repeat(20),
        String::from_utf8_lossy(&pseudo_random_bytes(200, 99)).into_owned(),
        String::new(),
        "x".to_string(),
    ]
}

#[test]
fn record_log_round_trips_in_both_framings() {
    let lines = sample_lines();
    for (engine_id, self_describing) in [(2, false), (2, true), (1, false), (3, true)] {
        let name = format!("roundtrip_{engine_id}_{self_describing}");
        let path = write_log(&name, engine_id, self_describing, &lines);

        let r = Reader::open(&path, Utf8Codec, engine_by_id(engine_id).unwrap()).unwrap();
        assert_eq!(r.is_self_describing(), self_describing);
        assert_eq!(r.read_all().unwrap(), lines);

        let entries = r.entries().unwrap();
        assert_eq!(entries.len(), lines.len());
        assert!(entries[1].header.is_compressed(), "repetitive line should compress");
        assert!(!entries[3].header.is_compressed(), "empty line stays raw");
        assert!(entries.windows(2).all(|w| w[0].offset + w[0].len <= w[1].offset));
    }
}

#[test]
fn record_log_engine_mismatch_is_rejected() {
    let path = write_log("mismatch", 1, true, &sample_lines());
    let result = Reader::open(&path, Utf8Codec, Arc::new(Lz4Engine));
    let err = result.err().unwrap().to_string();
    assert!(err.contains("engine mismatch"), "got: {err}");
}

#[test]
fn record_log_corruption_names_the_record() {
    let path = write_log("corrupt", 2, false, &sample_lines());
    let mut bytes = std::fs::read(&path).unwrap();
    // Cut the file in the middle of the second record.
    bytes.truncate(wrapz_core::format::LOG_HEADER_SIZE + REC.len() + 10);

    let r = Reader::from_bytes(bytes, Utf8Codec, Arc::new(Lz4Engine)).unwrap();
    let results: Vec<_> = r.records().collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    let err = format!("{:#}", results[1].as_ref().unwrap_err());
    assert!(err.starts_with("record 1 at file offset"), "got: {err}");
}

// ── properties ─────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn strings_round_trip_in_both_modes(value in ".{0,400}", self_describing in any::<bool>()) {
        let codec = CompressingCodec::new(Utf8Codec, Lz4Engine, self_describing);
        let record = encode(&codec, &value);
        prop_assert_eq!(decode_bounded(&codec, &record), value.clone());
        if self_describing {
            let mut input = DataInput::new(&record);
            prop_assert_eq!(codec.decode(&mut input, Available::Unbounded).unwrap(), value);
        }
    }

    #[test]
    fn repetitive_bytes_round_trip(
        chunk in proptest::collection::vec(any::<u8>(), 1..16),
        repeats in 1usize..200,
        self_describing in any::<bool>(),
    ) {
        let value = chunk.repeat(repeats);
        let codec = CompressingCodec::new(RawBytesCodec, ZstdEngine::default(), self_describing);
        let record = encode(&codec, &value);
        prop_assert!(record.len() <= value.len() + 1);
        prop_assert_eq!(decode_bounded(&codec, &record), value);
    }
}
