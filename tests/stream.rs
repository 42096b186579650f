use std::io::Write;

use osm_feature_stream::proto::fileformat::{blob::Data, Blob, BlobHeader};
use osm_feature_stream::proto::osmformat::{
    DenseInfo, DenseNodes, HeaderBlock, Info, PrimitiveBlock, PrimitiveGroup, Relation,
    StringTable, Way,
};
use osm_feature_stream::{
    Error, ErrorCategory, Feature, FeatureStream, FeatureTypes, MemberType, NodeId, SchemaError,
};
use prost::Message;

const STRINGS: &[&str] = &[
    "",
    "highway",
    "give_way",
    "name",
    "Warszawska",
    "street",
    "Natsuyasumi",
];

fn frame(out: &mut Vec<u8>, kind: &str, blob: Blob) {
    let blob = blob.encode_to_vec();
    let header = BlobHeader {
        r#type: kind.to_string(),
        indexdata: None,
        datasize: blob.len() as i32,
    }
    .encode_to_vec();
    out.extend_from_slice(&(header.len() as u32).to_be_bytes());
    out.extend_from_slice(&header);
    out.extend_from_slice(&blob);
}

fn raw(payload: Vec<u8>) -> Blob {
    Blob {
        raw_size: None,
        data: Some(Data::Raw(payload)),
    }
}

fn zlib(payload: Vec<u8>) -> Blob {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&payload).unwrap();
    Blob {
        raw_size: Some(payload.len() as i32),
        data: Some(Data::ZlibData(encoder.finish().unwrap())),
    }
}

fn header(required: &[&str]) -> Blob {
    raw(HeaderBlock {
        required_features: required.iter().map(|s| s.to_string()).collect(),
        writingprogram: Some("test".into()),
        ..Default::default()
    }
    .encode_to_vec())
}

fn block(groups: Vec<PrimitiveGroup>) -> PrimitiveBlock {
    PrimitiveBlock {
        stringtable: StringTable {
            s: STRINGS.iter().map(|s| s.as_bytes().to_vec()).collect(),
        },
        primitivegroup: groups,
        granularity: Some(100),
        date_granularity: Some(1000),
        lat_offset: None,
        lon_offset: None,
    }
}

fn nodes_group() -> PrimitiveGroup {
    PrimitiveGroup {
        dense: Some(DenseNodes {
            id: vec![108213, 2, 2],
            denseinfo: Some(DenseInfo {
                version: vec![1, 1, 2],
                timestamp: vec![1_581_685_275, 0, 0],
                changeset: vec![1, 0, 0],
                uid: vec![1_384_396, 0, 0],
                user_sid: vec![6, 0, 0],
                visible: vec![],
            }),
            lat: vec![537_800_000, 100, -50],
            lon: vec![207_900_000, 100, -50],
            keys_vals: vec![1, 2, 0, 0, 0],
        }),
        ..Default::default()
    }
}

fn ways_group() -> PrimitiveGroup {
    PrimitiveGroup {
        ways: vec![Way {
            id: Some(7),
            keys: vec![3],
            vals: vec![4],
            info: Some(Info {
                version: Some(3),
                ..Default::default()
            }),
            refs: vec![108213, 2, 2],
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn relations_group() -> PrimitiveGroup {
    PrimitiveGroup {
        relations: vec![Relation {
            id: Some(99),
            keys: vec![3],
            vals: vec![4],
            info: None,
            roles_sid: vec![5, 0],
            memids: vec![7, 108206],
            types: vec![1, 0],
        }],
        ..Default::default()
    }
}

fn file(required: &[&str], blocks: Vec<Blob>) -> Vec<u8> {
    let mut out = Vec::new();
    frame(&mut out, "OSMHeader", header(required));
    for blob in blocks {
        frame(&mut out, "OSMData", blob);
    }
    out
}

fn sample() -> Vec<u8> {
    file(
        &["OsmSchema-V0.6", "DenseNodes"],
        vec![
            zlib(block(vec![nodes_group()]).encode_to_vec()),
            raw(block(vec![ways_group(), relations_group()]).encode_to_vec()),
        ],
    )
}

#[test_log::test]
fn decodes_all_features_in_file_order() {
    let features = FeatureStream::from_bytes(sample())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let order = features
        .iter()
        .map(|f| (f.kind(), f.id()))
        .collect::<Vec<_>>();
    assert_eq!(
        order,
        vec![
            (FeatureTypes::NODE, 108213),
            (FeatureTypes::NODE, 108215),
            (FeatureTypes::NODE, 108217),
            (FeatureTypes::WAY, 7),
            (FeatureTypes::RELATION, 99),
        ]
    );

    let Feature::Node(first) = &features[0] else {
        panic!("expected a node")
    };
    assert!((first.lat() - 53.78).abs() < 1e-9);
    assert!((first.lon() - 20.79).abs() < 1e-9);
    assert_eq!(first.tags.get("highway").map(String::as_str), Some("give_way"));
    assert_eq!(first.user.as_deref(), Some("Natsuyasumi"));
    assert_eq!(first.uid, Some(1_384_396));
    assert_eq!(first.visible, None);
    assert_eq!(
        first.timestamp.map(|t| t.to_rfc3339()).as_deref(),
        Some("2020-02-14T13:01:15+00:00")
    );

    let Feature::Node(third) = &features[2] else {
        panic!("expected a node")
    };
    assert!(third.tags.is_empty());
    assert_eq!(third.nano_lat, (537_800_000 + 100 - 50) * 100);
    assert_eq!(third.version, Some(2));

    let Feature::Way(way) = &features[3] else {
        panic!("expected a way")
    };
    assert_eq!(
        way.node_refs,
        vec![NodeId(108213), NodeId(108215), NodeId(108217)]
    );
    assert_eq!(way.tags.get("name").map(String::as_str), Some("Warszawska"));
    assert_eq!(way.version, Some(3));
    assert_eq!(way.timestamp, None);

    let Feature::Relation(relation) = &features[4] else {
        panic!("expected a relation")
    };
    let members = relation
        .members
        .iter()
        .map(|m| (m.member_type, m.id, m.role.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        members,
        vec![(MemberType::Way, 7, "street"), (MemberType::Node, 108213, "")]
    );
}

#[test_log::test]
fn header_is_exposed_after_first_pull() {
    let mut stream = FeatureStream::from_bytes(sample());
    assert!(stream.header().is_none());
    stream.next().unwrap().unwrap();
    let header = stream.header().unwrap();
    assert_eq!(header.writing_program(), Some("test"));
    assert_eq!(header.required_features(), ["OsmSchema-V0.6", "DenseNodes"]);
}

#[test_log::test]
fn header_only_file_is_empty() {
    let mut stream = FeatureStream::from_bytes(file(&["OsmSchema-V0.6"], vec![]));
    assert!(stream.next().is_none());
    assert!(stream.next().is_none());
}

#[test_log::test]
fn empty_data_block_is_skipped() {
    let bytes = file(
        &[],
        vec![
            raw(block(vec![]).encode_to_vec()),
            raw(block(vec![ways_group()]).encode_to_vec()),
        ],
    );
    assert_eq!(FeatureStream::from_bytes(bytes).count(), 1);
}

#[test_log::test]
fn unknown_required_feature_stops_the_stream() {
    let mut stream = FeatureStream::from_bytes(file(
        &["OsmSchema-V0.6", "Sort.Geographic"],
        vec![raw(block(vec![ways_group()]).encode_to_vec())],
    ));
    let err = stream.next().unwrap().unwrap_err();
    assert!(matches!(&err, Error::UnsupportedFeature(f) if f == "Sort.Geographic"));
    assert_eq!(err.category(), ErrorCategory::UnsupportedCodec);
    assert!(stream.next().is_none());
}

#[test_log::test]
fn size_mismatch_is_a_decompression_error() {
    let mut blob = zlib(block(vec![ways_group()]).encode_to_vec());
    blob.raw_size = blob.raw_size.map(|s| s + 1);
    let mut stream = FeatureStream::from_bytes(file(&[], vec![blob]));
    let err = stream.next().unwrap().unwrap_err();
    assert!(matches!(err, Error::RawSizeMismatch { .. }));
    assert_eq!(err.category(), ErrorCategory::Decompression);
    assert!(stream.next().is_none());
}

#[test_log::test]
fn corrupt_block_ends_the_stream() {
    let mut broken = ways_group();
    broken.ways[0].vals.push(4);
    let bytes = file(
        &[],
        vec![
            raw(block(vec![relations_group(), broken]).encode_to_vec()),
            raw(block(vec![ways_group()]).encode_to_vec()),
        ],
    );
    let results = FeatureStream::from_bytes(bytes).collect::<Vec<_>>();
    assert_eq!(results.len(), 2);
    assert!(matches!(results[0], Ok(Feature::Relation(_))));
    match &results[1] {
        Err(err @ Error::Schema(SchemaError::LengthMismatch { .. })) => {
            assert_eq!(err.category(), ErrorCategory::Schema)
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test_log::test]
fn truncated_file_is_a_framing_error() {
    let mut bytes = sample();
    bytes.truncate(bytes.len() - 5);
    let results = FeatureStream::from_read(bytes.as_slice()).collect::<Vec<_>>();
    // the first block is intact
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 3);
    let err = results.last().unwrap().as_ref().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Framing);
}

#[test_log::test]
fn header_may_be_optional() {
    let mut bytes = Vec::new();
    frame(&mut bytes, "OSMData", raw(block(vec![ways_group()]).encode_to_vec()));

    let mut strict = FeatureStream::from_bytes(bytes.clone());
    assert!(matches!(
        strict.next(),
        Some(Err(Error::UnexpectedBlobType(_)))
    ));

    let lenient = FeatureStream::from_bytes(bytes).require_header(false);
    assert_eq!(lenient.count(), 1);
}

#[test_log::test]
fn feature_types_filter() {
    let ids = FeatureStream::from_bytes(sample())
        .types(FeatureTypes::NODE | FeatureTypes::RELATION)
        .map(|f| f.map(|f| f.id()))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(ids, vec![108213, 108215, 108217, 99]);
}
