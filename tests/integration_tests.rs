//! End-to-end conversion tests
//!
//! Tests the full flow: OSM XML → encoder → Parquet file → read back

use arrow::array::{Array, AsArray};
use arrow::datatypes::{Decimal128Type, Int64Type};
use arrow::record_batch::RecordBatch;
use osm2parquet::config::ConvertConfig;
use osm2parquet::convert::{convert_changesets_file, convert_entities_file, WRITER};
use osm2parquet::source::OsmXmlReader;
use osm2parquet::{
    convert_entities, EntityEncoder, EntitySchema, Error, MemorySink, Parallelism, ParquetSink,
};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::Cursor;
use std::path::Path;

const EXTRACT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="integration">
  <bounds minlat="47.0" minlon="-122.5" maxlat="47.5" maxlon="-122.0"/>
  <node id="1" version="1" changeset="10" timestamp="2019-03-04T05:06:07Z" uid="5" user="alice" lat="47.1234567" lon="-122.1234567">
    <tag k="amenity" v="cafe"/>
  </node>
  <way id="2" version="3" changeset="11" timestamp="2019-03-05T00:00:00Z" uid="6" user="bob">
    <nd ref="10"/>
    <nd ref="11"/>
    <nd ref="12"/>
  </way>
  <relation id="3" version="1" changeset="12">
    <member type="way" ref="2" role="outer"/>
  </relation>
</osm>
"#;

const HISTORY: &str = r#"<osm version="0.6">
  <node id="1" version="1" changeset="10" visible="true" lat="1.5" lon="2.5"/>
  <node id="1" version="2" changeset="20" visible="false"/>
</osm>
"#;

const CHANGESETS: &str = r#"<osm>
  <changeset id="10" created_at="2019-03-04T05:00:00Z" closed_at="2019-03-04T06:00:00Z" open="false" user="alice" uid="5" min_lat="47.1234567" min_lon="-122.1234567" max_lat="47.1234567" max_lon="-122.1234567" num_changes="1" comments_count="0">
    <tag k="comment" v="add cafe"/>
  </changeset>
  <changeset id="11" created_at="2019-03-05T00:00:00Z" open="true" num_changes="0" comments_count="2"/>
</osm>
"#;

fn read_parquet(path: &Path) -> (Vec<RecordBatch>, HashMap<String, String>) {
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path).unwrap()).unwrap();
    let metadata = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .map(|pairs| {
            pairs
                .iter()
                .filter_map(|kv| kv.value.clone().map(|v| (kv.key.clone(), v)))
                .collect()
        })
        .unwrap_or_default();
    let batches = builder
        .build()
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    (batches, metadata)
}

fn write_input(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

// ============================================================================
// Entity Conversion
// ============================================================================

#[test]
fn test_convert_extract_to_parquet() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "extract.osm", EXTRACT);
    let output = dir.path().join("extract.parquet");

    let summary = convert_entities_file(&input, &output, &ConvertConfig::default()).unwrap();
    assert_eq!(summary.nodes, 1);
    assert_eq!(summary.ways, 1);
    assert_eq!(summary.relations, 1);
    assert_eq!(summary.rows, 3);

    let (batches, metadata) = read_parquet(&output);
    let total: usize = batches.iter().map(RecordBatch::num_rows).sum();
    assert_eq!(total, 3);

    assert_eq!(metadata.get("osm_schema_version").map(String::as_str), Some("0.6"));
    assert_eq!(metadata.get("history").map(String::as_str), Some("false"));
    assert_eq!(metadata.get("writer").map(String::as_str), Some(WRITER));
    assert_eq!(
        metadata.get("bbox").map(String::as_str),
        Some("-122.5000000,47.0000000,-122.0000000,47.5000000")
    );

    let batch = &batches[0];
    let schema = batch.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(
        names,
        vec![
            "id", "type", "tags", "lat", "lon", "nds", "members", "changeset", "timestamp",
            "uid", "user", "version"
        ]
    );

    // decimals survive the file round trip exactly
    let lat = batch.column(3).as_primitive::<Decimal128Type>();
    let lon = batch.column(4).as_primitive::<Decimal128Type>();
    assert_eq!(lat.value_as_string(0), "47.1234567");
    assert_eq!(lon.value_as_string(0), "-122.1234567");
    assert!(lat.is_null(1));

    let nds = batch.column(5).as_list::<i32>();
    let refs = nds.value(1);
    let refs = refs.as_struct().column(0).as_primitive::<Int64Type>();
    assert_eq!(refs.values().to_vec(), vec![10, 11, 12]);

    let members = batch.column(6).as_list::<i32>();
    let member = members.value(2);
    let member = member.as_struct();
    assert_eq!(member.column(0).as_string::<i32>().value(0), "way");
    assert_eq!(member.column(2).as_string::<i32>().value(0), "outer");

    let users = batch.column(10).as_string::<i32>();
    assert_eq!(users.value(0), "alice");
    assert!(users.is_null(2));
    assert!(batch.column(9).is_null(2));
}

#[test]
fn test_history_file_has_visible_column() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "history.osm", HISTORY);
    let output = dir.path().join("history.parquet");

    let config = ConvertConfig {
        history: true,
        ..ConvertConfig::default()
    };
    convert_entities_file(&input, &output, &config).unwrap();

    let (batches, metadata) = read_parquet(&output);
    assert_eq!(metadata.get("history").map(String::as_str), Some("true"));
    assert!(!metadata.contains_key("bbox"));

    let batch = &batches[0];
    assert_eq!(batch.schema().field(12).name(), "visible");
    let visible = batch.column(12).as_boolean();
    assert!(visible.value(0));
    assert!(!visible.value(1));
    assert!(batch.column(3).is_null(1));
}

#[test]
fn test_many_batches_in_parallel() {
    let mut xml = String::from("<osm>\n");
    for id in 1..=2_000 {
        let _ = writeln!(
            xml,
            r#"<way id="{id}" version="1" changeset="{id}"><nd ref="{id}"/><nd ref="{}"/><tag k="n" v="{id}"/></way>"#,
            id + 1
        );
    }
    xml.push_str("</osm>\n");

    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "ways.osm", &xml);
    let output = dir.path().join("ways.parquet");
    let config = ConvertConfig {
        batch_size: 64,
        parallelism: Parallelism::Workers(4),
        ..ConvertConfig::default()
    };

    let summary = convert_entities_file(&input, &output, &config).unwrap();
    assert_eq!(summary.ways, 2_000);
    assert_eq!(summary.rows, 2_000);

    let (batches, _) = read_parquet(&output);
    let mut seen = 0;
    for batch in &batches {
        let ids = batch.column(0).as_primitive::<Int64Type>();
        let tags = batch.column(2).as_map();
        let nds = batch.column(5).as_list::<i32>();
        for row in 0..batch.num_rows() {
            let id = ids.value(row);
            let entry = tags.value(row);
            assert_eq!(entry.column(1).as_string::<i32>().value(0), id.to_string());

            let refs = nds.value(row);
            let refs = refs.as_struct().column(0).as_primitive::<Int64Type>();
            assert_eq!(refs.values().to_vec(), vec![id, id + 1]);
            seen += 1;
        }
    }
    assert_eq!(seen, 2_000);
}

#[test]
fn test_unsupported_member_aborts_conversion() {
    let xml = r#"<osm><node id="1" lat="0" lon="0"/><relation id="2"><member type="area" ref="1" role=""/></relation></osm>"#;
    let reader = OsmXmlReader::new(Cursor::new(xml)).unwrap();
    let err = convert_entities(reader, MemorySink::new(), &ConvertConfig::default()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedMemberType { relation_id: 2, .. }));
}

#[test]
fn test_encoder_with_parquet_sink() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("direct.parquet");
    let schema = EntitySchema::standard();
    let sink = ParquetSink::create(&output, schema.arrow_schema(), &Default::default()).unwrap();

    let encoder = EntityEncoder::new(schema, sink, 2);
    let reader = OsmXmlReader::new(Cursor::new(EXTRACT)).unwrap();
    encoder.encode_all(reader).unwrap();
    encoder.finish().unwrap();
    // a second finish appends nothing to the file
    encoder.finish().unwrap();

    let (batches, _) = read_parquet(&output);
    let total: usize = batches.iter().map(RecordBatch::num_rows).sum();
    assert_eq!(total, 3);
}

// ============================================================================
// Changeset Conversion
// ============================================================================

#[test]
fn test_convert_changesets_to_parquet() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "changesets.osm", CHANGESETS);
    let output = dir.path().join("changesets.parquet");

    let summary = convert_changesets_file(&input, &output, &ConvertConfig::default()).unwrap();
    assert_eq!(summary.changesets, 2);

    let (batches, _) = read_parquet(&output);
    let batch = &batches[0];
    assert_eq!(batch.num_rows(), 2);
    assert_eq!(batch.schema().field(0).name(), "id");
    assert_eq!(batch.schema().field(12).name(), "tags");

    let min_lat = batch.column(7).as_primitive::<Decimal128Type>();
    assert_eq!(min_lat.value_as_string(0), "47.1234567");
    assert!(min_lat.is_null(1));
    assert!(batch.column(2).is_null(1));
    assert!(batch.column(6).is_null(1));

    let tags = batch.column(12).as_map();
    assert_eq!(tags.value_length(0), 1);
    assert_eq!(tags.value_length(1), 0);
}

#[test]
fn test_wrong_root_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "not-osm.xml", "<gpx></gpx>");
    let output = dir.path().join("out.parquet");

    let err = convert_changesets_file(&input, &output, &ConvertConfig::default()).unwrap_err();
    assert!(err
        .to_string()
        .contains("This does not appear to be an OSM changeset XML file"));
    assert!(!output.exists());
}
