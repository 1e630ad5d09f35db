#![cfg(test)]

use std::io;
use std::sync::{Arc, Mutex};
use chrono::TimeZone;
use crate::schema::{self, Magic, SizeAllocation};
use crate::sign::fixture;
use super::*;


//------------ Helpers -------------------------------------------------------

fn decode(
    schema: &Schema, config: Config, data: &[u8]
) -> Result<DecodedFile, DecodeError> {
    Decoder::new(schema, config).decode_slice(data)
}

fn lenient(schema: &Schema, data: &[u8]) -> DecodedFile {
    decode(schema, Config::new(), data).unwrap()
}

fn strict(schema: &Schema, data: &[u8]) -> Result<DecodedFile, DecodeError> {
    decode(schema, Config::new().strict(true), data)
}

/// Appends an elementary file with the given type and content.
fn push_file(data: &mut Vec<u8>, magic: u16, kind: u8, content: &[u8]) {
    data.extend_from_slice(&magic.to_be_bytes());
    data.push(kind);
    data.extend_from_slice(&(content.len() as u16).to_be_bytes());
    data.extend_from_slice(content);
}

fn values(value: &Value) -> Vec<u64> {
    value.children().iter().filter_map(Value::to_u64).collect()
}

/// A writer collecting log output.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn lines_containing(&self, needle: &str) -> usize {
        let data = self.0.lock().unwrap();
        String::from_utf8_lossy(&data).lines().filter(|line| {
            line.contains(needle)
        }).count()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `op` and returns what it logged at warning level and above.
fn capture_warnings<F: FnOnce()>(op: F) -> Capture {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, op);
    capture
}


//------------ Regions -------------------------------------------------------

#[test]
fn padding_region() {
    let schema = Schema::new("Test", vec![
        SchemaNode::identified("Block", Magic(0x0001), vec![
            SchemaNode::padding("Reserved", 4),
        ]),
    ]);
    let file = lenient(&schema, b"\x00\x01\0\0\0\0");
    assert_eq!(file.name(), "Test");
    assert_eq!(file.regions().len(), 1);
    let block = &file.regions()[0];
    assert_eq!(block.label(), "Block");
    assert_eq!(block.children().len(), 1);
    assert!(block.scalar().is_none());
    assert_eq!(block.children()[0].attribute("Size"), Some("4"));
    assert_eq!(file.consumed(), 6);
    assert_eq!(file.consumed(), file.length());
    assert_eq!(file.unmatched_regions(), 0);
}

#[test]
fn unmatched_regions() {
    let schema = Schema::new("Test", vec![
        SchemaNode::unsigned_file("Known", Magic(0x0501), vec![
            SchemaNode::uint8("Value"),
        ]),
    ]);
    let mut data = Vec::new();
    push_file(&mut data, 0x9999, 0, b"\xAA\xBB");
    push_file(&mut data, 0x9998, 0, b"\xCC");
    push_file(&mut data, 0x0501, 0, b"\x07");

    let mut file = None;
    let capture = capture_warnings(|| {
        file = Some(lenient(&schema, &data));
    });
    let file = file.unwrap();
    assert_eq!(file.unmatched_regions(), 2);
    assert_eq!(file.regions().len(), 1);
    assert_eq!(file.regions()[0].child("Value").unwrap().to_u64(), Some(7));
    assert_eq!(file.consumed(), data.len() as u64);
    assert_eq!(capture.lines_containing("unrecognized region"), 1);
    assert_eq!(capture.lines_containing("2 unmatched regions"), 1);

    assert!(matches!(
        strict(&schema, &data),
        Err(DecodeError::UnrecognizedMagic { magic: Magic(0x9999), .. })
    ));
}

#[test]
fn truncated_unmatched_region() {
    let schema = Schema::new("Test", vec![]);
    // The length says 16 octets but only two follow.
    let file = lenient(&schema, b"\x99\x99\x00\x00\x10\xAA\xBB");
    assert_eq!(file.unmatched_regions(), 1);
    assert_eq!(file.consumed(), 7);

    let file = lenient(&schema, b"\x99\x99\x00\x00");
    assert_eq!(file.unmatched_regions(), 1);
}

#[test]
fn stray_octet() {
    let schema = Schema::new("Test", vec![
        SchemaNode::identified("Block", Magic(0x0001), vec![
            SchemaNode::uint8("Value"),
        ]),
    ]);
    let data = b"\x00\x01\x05\x42";
    let file = lenient(&schema, data);
    assert_eq!(file.regions().len(), 1);
    assert_eq!(file.consumed(), 4);
    assert!(matches!(
        strict(&schema, data),
        Err(DecodeError::UnexpectedEndOfData { .. })
    ));
}

#[test]
fn empty_file() {
    let file = lenient(&schema::driver_card(), b"");
    assert!(file.regions().is_empty());
    assert_eq!(file.length(), 0);
    assert!(file.latest_observed_time().is_none());
}


//------------ Elementary Files ----------------------------------------------

#[test]
fn leftover_content() {
    let schema = Schema::new("Test", vec![
        SchemaNode::unsigned_file("Data", Magic(0x0501), vec![
            SchemaNode::uint8("Value"),
        ]),
        SchemaNode::unsigned_file("Next", Magic(0x0502), vec![
            SchemaNode::uint8("Value"),
        ]),
    ]);
    let mut data = Vec::new();
    push_file(&mut data, 0x0501, 0, b"\x07\xAA\xBB");
    push_file(&mut data, 0x0502, 0, b"\x08");

    let file = lenient(&schema, &data);
    assert_eq!(file.regions().len(), 2);
    assert_eq!(file.regions()[1].label(), "Next");
    assert_eq!(file.regions()[1].child("Value").unwrap().to_u64(), Some(8));

    assert!(matches!(
        strict(&schema, &data),
        Err(DecodeError::MalformedField { .. })
    ));
}

#[test]
fn overlong_content() {
    let schema = Schema::new("Test", vec![
        SchemaNode::unsigned_file("Data", Magic(0x0501), vec![
            SchemaNode::uint16("Value"),
        ]),
    ]);
    let data = b"\x05\x01\x00\x00\x01\x01\x02";
    let file = lenient(&schema, data);
    assert_eq!(
        file.regions()[0].child("Value").unwrap().to_u64(), Some(0x0102)
    );
    assert!(matches!(
        strict(&schema, data),
        Err(DecodeError::MalformedField { .. })
    ));
}

#[test]
fn signature_block_suppressed() {
    let schema = Schema::new("Test", vec![
        SchemaNode::elementary_file("Data", Magic(0x0501), vec![
            SchemaNode::uint8("Value"),
        ]),
    ]);
    let mut data = Vec::new();
    push_file(&mut data, 0x0501, 0, b"\x07");
    push_file(&mut data, 0x0501, 1, &[0x55; 128]);
    let file = lenient(&schema, &data);
    assert_eq!(file.regions().len(), 2);
    assert!(!file.regions()[0].is_suppressed());
    let signature = &file.regions()[1];
    assert!(signature.is_suppressed());
    assert_eq!(signature.label(), "Data");
    assert_eq!(signature.to_bytes().unwrap().len(), 128);
}


//------------ Repetition ----------------------------------------------------

#[test]
fn repeat_with_global_count() {
    let schema = Schema::new("Test", vec![
        SchemaNode::unsigned_file("Counts", Magic(0x0501), vec![
            SchemaNode::uint16("NoOfItems").global(),
        ]),
        SchemaNode::unsigned_file("Items", Magic(0x0502), vec![
            SchemaNode::repeat("ItemRecords", "$NoOfItems", vec![
                SchemaNode::uint8("Item"),
            ]),
        ]),
    ]);
    let mut data = Vec::new();
    push_file(&mut data, 0x0501, 0, b"\x00\x07");
    push_file(&mut data, 0x0502, 0, &[1, 2, 3, 4, 5, 6, 7]);
    let file = strict(&schema, &data).unwrap();
    let items = file.regions()[1].child("ItemRecords").unwrap();
    assert_eq!(values(items), [1, 2, 3, 4, 5, 6, 7]);

    // Without the count the repeat is empty.
    let mut data = Vec::new();
    push_file(&mut data, 0x0502, 0, b"");
    let mut file = None;
    let capture = capture_warnings(|| {
        file = Some(strict(&schema, &data).unwrap());
    });
    let file = file.unwrap();
    let items = file.regions()[0].child("ItemRecords").unwrap();
    assert!(items.children().is_empty());
    assert_eq!(
        capture.lines_containing("count reference NoOfItems not found"), 1
    );
}

#[test]
fn repeat_with_non_numeric_count() {
    let schema = Schema::new("Test", vec![
        SchemaNode::unsigned_file("Counts", Magic(0x0501), vec![
            SchemaNode::simple_string("NoOfItems", 2).global(),
            SchemaNode::repeat("ItemRecords", "NoOfItems", vec![
                SchemaNode::uint8("Item"),
            ]),
        ]),
    ]);
    let mut data = Vec::new();
    push_file(&mut data, 0x0501, 0, b"ab");
    assert!(matches!(
        decode(&schema, Config::new(), &data),
        Err(DecodeError::MalformedField { .. })
    ));
}

#[test]
fn truncated_collection() {
    let schema = Schema::new("Test", vec![
        SchemaNode::identified("Block", Magic(0x0001), vec![
            SchemaNode::collection("Records", SizeAllocation::Byte, vec![
                SchemaNode::uint16("Record"),
            ]),
        ]),
    ]);
    // Three records announced, two and a half present.
    let data = b"\x00\x01\x03\x00\x01\x00\x02\x00";
    for config in [Config::new(), Config::new().strict(true)] {
        let file = decode(&schema, config, data).unwrap();
        let records = file.regions()[0].child("Records").unwrap();
        assert_eq!(values(records), [1, 2]);
        assert_eq!(file.consumed(), 8);
    }
}

#[test]
fn word_collection() {
    let schema = Schema::new("Test", vec![
        SchemaNode::identified("Block", Magic(0x0001), vec![
            SchemaNode::collection("Records", SizeAllocation::Word, vec![
                SchemaNode::uint8("Record"),
            ]),
            SchemaNode::uint8("After"),
        ]),
    ]);
    let file = strict(&schema, b"\x00\x01\x00\x02\x0A\x0B\x0C").unwrap();
    let block = &file.regions()[0];
    assert_eq!(values(block.child("Records").unwrap()), [10, 11]);
    assert_eq!(block.child("After").unwrap().to_u64(), Some(12));
}


//------------ Cyclic Buffers ------------------------------------------------

fn cyclic_schema() -> Schema {
    Schema::new("Test", vec![
        SchemaNode::unsigned_file("Activity", Magic(0x0504), vec![
            SchemaNode::cyclic_activity("Records", vec![
                SchemaNode::uint16("Record"),
            ]),
        ]),
    ])
}

fn cyclic_file(oldest: u16, newest: u16) -> Vec<u8> {
    let mut content = Vec::new();
    content.extend_from_slice(&oldest.to_be_bytes());
    content.extend_from_slice(&newest.to_be_bytes());
    content.extend_from_slice(b"\x00\x01\x00\x02\x00\x03");
    let mut data = Vec::new();
    push_file(&mut data, 0x0504, 0, &content);
    data
}

fn wrapped(records: &Value) -> Option<bool> {
    match records.child("DataBufferIsWrapped")?.scalar()? {
        Scalar::Bool(value) => Some(*value),
        _ => None
    }
}

#[test]
fn cyclic_in_order() {
    let data = cyclic_file(0, 2);
    let file = strict(&cyclic_schema(), &data).unwrap();
    let records = file.regions()[0].child("Records").unwrap();
    assert_eq!(values(records), [1, 2]);
    assert_eq!(wrapped(records), Some(false));
    assert_eq!(file.consumed(), data.len() as u64);
}

#[test]
fn cyclic_wrapping() {
    let data = cyclic_file(4, 0);
    let file = strict(&cyclic_schema(), &data).unwrap();
    let records = file.regions()[0].child("Records").unwrap();
    assert_eq!(values(records), [3, 1]);
    assert_eq!(wrapped(records), Some(true));
    assert_eq!(file.consumed(), data.len() as u64);
}

#[test]
fn cyclic_single_record() {
    let data = cyclic_file(2, 2);
    let file = strict(&cyclic_schema(), &data).unwrap();
    let records = file.regions()[0].child("Records").unwrap();
    assert_eq!(values(records), [2]);
}

#[test]
fn cyclic_empty() {
    let data = cyclic_file(0, 0);
    let file = strict(&cyclic_schema(), &data).unwrap();
    let records = file.regions()[0].child("Records").unwrap();
    assert!(records.children().is_empty());
    assert_eq!(file.consumed(), data.len() as u64);
}

#[test]
fn cyclic_pointer_out_of_bounds() {
    for data in [cyclic_file(6, 0), cyclic_file(0, 7)] {
        assert!(matches!(
            decode(&cyclic_schema(), Config::new(), &data),
            Err(DecodeError::OutOfBoundsPointer { .. })
        ));
    }
}

#[test]
fn cyclic_exceeding_data() {
    let mut data = cyclic_file(0, 2);
    // Claim two more octets than there are.
    data[4] += 2;
    let file = lenient(&cyclic_schema(), &data);
    let records = file.regions()[0].child("Records").unwrap();
    assert!(records.children().is_empty());
    assert!(matches!(
        strict(&cyclic_schema(), &data),
        Err(DecodeError::OutOfBoundsPointer { .. })
    ));
}

#[test]
fn cyclic_daily_records() {
    let schema = Schema::new("Test", vec![
        SchemaNode::unsigned_file("Activity", Magic(0x0504), vec![
            SchemaNode::cyclic_activity("Records", vec![
                SchemaNode::daily_activity("Day"),
            ]),
        ]),
    ]);
    let mut content = Vec::new();
    content.extend_from_slice(b"\x00\x02\x00\x02\x00\x00");
    // One day with two activity changes.
    content.extend_from_slice(b"\x00\x00\x00\x10");
    content.extend_from_slice(b"\x5E\x0B\xE1\x00");
    content.extend_from_slice(b"\x00\x42\x00\x64");
    content.extend_from_slice(b"\x18\x3C\x00\x00");
    let mut data = Vec::new();
    push_file(&mut data, 0x0504, 0, &content);

    let file = strict(&schema, &data).unwrap();
    let day = file.regions()[0].find("Day").unwrap();
    assert_eq!(day.attribute("DateTime"), Some("2020-01-01 00:00:00Z"));
    assert_eq!(day.attribute("DailyPresenceCounter"), Some("42"));
    assert_eq!(day.attribute("Distance"), Some("100"));
    assert_eq!(day.children().len(), 2);
    assert_eq!(day.children()[0].label(), "ActivityChangeInfo");
    assert_eq!(
        file.latest_observed_time(),
        Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
    );
}

#[test]
fn daily_record_too_short() {
    let schema = Schema::new("Test", vec![
        SchemaNode::identified("Block", Magic(0x0001), vec![
            SchemaNode::daily_activity("Day"),
        ]),
    ]);
    let data = b"\x00\x01\x00\x00\x00\x0A\x5E\x0B\xE1\x00\x00\x42\x00\x64";
    assert!(matches!(
        decode(&schema, Config::new(), data),
        Err(DecodeError::MalformedField { .. })
    ));
}


//------------ Signatures ----------------------------------------------------

const DOWNLOAD_TIME: &[u8] = b"\x5E\x0B\xE1\x00";

fn validating() -> Config {
    Config::new().validate_signatures(true).root_keys(fixture::root_keys())
}

/// Creates a driver card file with the certificates and one signed file.
fn card_file(content: &[u8], signed: &[u8], signature: bool) -> Vec<u8> {
    let mut data = Vec::new();
    push_file(&mut data, 0xC100, 0, &fixture::card_certificate(None));
    push_file(&mut data, 0xC108, 0, &fixture::ca_certificate(None));
    push_file(&mut data, 0x050E, 0, content);
    if signature {
        push_file(
            &mut data, 0x050E, 1, &fixture::signature(fixture::card(), signed)
        );
    }
    data
}

#[test]
fn signed_card_file() {
    let schema = schema::driver_card();
    let data = card_file(DOWNLOAD_TIME, DOWNLOAD_TIME, true);
    let file = decode(&schema, validating().strict(true), &data).unwrap();
    assert_eq!(file.regions().len(), 4);
    assert_eq!(file.regions()[0].label(), "CardCertificate");
    assert!(file.regions()[3].is_suppressed());
    assert_eq!(file.consumed(), data.len() as u64);
}

#[test]
fn tampered_card_file() {
    let schema = schema::driver_card();
    let data = card_file(b"\x5E\x0B\xE1\x01", DOWNLOAD_TIME, true);
    let err = decode(&schema, validating(), &data).unwrap_err();
    assert!(matches!(
        err.signature_error(), Some(SignatureError::DigestMismatch)
    ));

    // Without validation nobody cares.
    decode(&schema, Config::new(), &data).unwrap();
}

#[test]
fn missing_signature() {
    let schema = schema::driver_card();
    let data = card_file(DOWNLOAD_TIME, DOWNLOAD_TIME, false);
    let err = decode(&schema, validating(), &data).unwrap_err();
    assert!(matches!(
        err.signature_error(),
        Some(SignatureError::MissingSignature(name)) if name == "CardDownload"
    ));
    decode(&schema, Config::new(), &data).unwrap();
}

#[test]
fn signature_without_certificates() {
    let schema = schema::driver_card();
    let mut data = Vec::new();
    push_file(&mut data, 0x050E, 0, DOWNLOAD_TIME);
    push_file(
        &mut data, 0x050E, 1,
        &fixture::signature(fixture::card(), DOWNLOAD_TIME)
    );
    assert!(matches!(
        decode(&schema, validating(), &data),
        Err(DecodeError::UnvalidatedSignaturesRemaining(1))
    ));
}

#[test]
fn signature_before_certificates() {
    let schema = schema::driver_card();
    let mut data = Vec::new();
    push_file(&mut data, 0x050E, 0, DOWNLOAD_TIME);
    push_file(
        &mut data, 0x050E, 1,
        &fixture::signature(fixture::card(), DOWNLOAD_TIME)
    );
    push_file(&mut data, 0xC100, 0, &fixture::card_certificate(None));
    push_file(&mut data, 0xC108, 0, &fixture::ca_certificate(None));
    let file = decode(&schema, validating(), &data).unwrap();
    assert_eq!(file.regions().len(), 4);
}

fn overview_schema() -> Schema {
    Schema::new("Test", vec![
        SchemaNode::identified("Overview", Magic(0x7601), vec![
            SchemaNode::certificate("MemberStateCertificate"),
            SchemaNode::certificate("VuCertificate"),
            SchemaNode::time_real("CurrentDateTime"),
            SchemaNode::signature("Signature", 128),
        ]),
    ])
}

fn overview_file(content: &[u8], signed: &[u8]) -> Vec<u8> {
    let mut data = vec![0x76, 0x01];
    data.extend_from_slice(&fixture::ca_certificate(None));
    data.extend_from_slice(&fixture::card_certificate(None));
    data.extend_from_slice(content);
    data.extend_from_slice(&fixture::signature(fixture::card(), signed));
    data
}

#[test]
fn signed_identified_object() {
    let data = overview_file(DOWNLOAD_TIME, DOWNLOAD_TIME);
    let file = decode(&overview_schema(), validating(), &data).unwrap();
    let overview = &file.regions()[0];
    assert_eq!(overview.children().len(), 4);
    let signature = overview.child("Signature").unwrap();
    assert_eq!(signature.to_bytes().unwrap().len(), 128);
    assert!(signature.attribute("Value").is_some());

    let data = overview_file(b"\x5E\x0B\xE1\x01", DOWNLOAD_TIME);
    let err = decode(&overview_schema(), validating(), &data).unwrap_err();
    assert!(matches!(
        err.signature_error(), Some(SignatureError::DigestMismatch)
    ));
}

#[test]
fn fresh_state_per_file() {
    let schema = Schema::new("Test", vec![
        SchemaNode::unsigned_file("Counts", Magic(0x0501), vec![
            SchemaNode::uint8("NoOfItems").global(),
        ]),
        SchemaNode::unsigned_file("Items", Magic(0x0502), vec![
            SchemaNode::repeat("ItemRecords", "NoOfItems", vec![
                SchemaNode::uint8("Item"),
            ]),
            SchemaNode::time_real("When"),
        ]),
    ]);
    let decoder = Decoder::new(&schema, Config::new());

    let mut first = Vec::new();
    push_file(&mut first, 0x0501, 0, b"\x01");
    push_file(&mut first, 0x0502, 0, b"\x09\x5E\x0B\xE1\x00");
    let file = decoder.decode_slice(&first).unwrap();
    assert_eq!(values(file.regions()[1].child("ItemRecords").unwrap()), [9]);
    assert!(file.latest_observed_time().is_some());

    let mut second = Vec::new();
    push_file(&mut second, 0x0502, 0, b"\0\0\0\0");
    let file = decoder.decode_slice(&second).unwrap();
    assert!(file.regions()[0].child("ItemRecords").unwrap()
        .children().is_empty());
    assert_eq!(
        file.latest_observed_time(), Some(Utc.timestamp_opt(0, 0).unwrap())
    );
}

#[test]
fn decode_reader() {
    let schema = Schema::new("Test", vec![
        SchemaNode::identified("Block", Magic(0x0001), vec![
            SchemaNode::uint8("Value"),
        ]),
    ]);
    let file = Decoder::new(&schema, Config::new()).decode(
        io::Cursor::new(b"\x00\x01\x2A".to_vec())
    ).unwrap();
    let value = file.to_value();
    assert_eq!(value.label(), "Test");
    assert_eq!(value.find("Value").unwrap().to_u64(), Some(42));
}
