//! Schema descriptor tests

use super::*;
use arrow::datatypes::{DataType, TimeUnit};
use pretty_assertions::assert_eq;

#[test]
fn test_standard_layout_order() {
    let schema = EntitySchema::standard();
    let names: Vec<String> = schema
        .arrow_schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();

    assert_eq!(
        names,
        vec![
            "id",
            "type",
            "tags",
            "lat",
            "lon",
            "nds",
            "members",
            "changeset",
            "timestamp",
            "uid",
            "user",
            "version"
        ]
    );
    assert!(!schema.is_history());
    assert_eq!(schema.index_of(EntityColumn::Visible), None);
}

#[test]
fn test_history_layout_appends_visible() {
    let schema = EntitySchema::history();
    let arrow = schema.arrow_schema();

    assert_eq!(arrow.fields().len(), 13);
    let visible = arrow.field(12);
    assert_eq!(visible.name(), "visible");
    assert_eq!(visible.data_type(), &DataType::Boolean);
    assert_eq!(schema.index_of(EntityColumn::Visible), Some(12));
}

#[test]
fn test_coordinate_columns_are_decimals() {
    let arrow = EntitySchema::standard().arrow_schema();

    let lat = arrow.field_with_name("lat").unwrap();
    let lon = arrow.field_with_name("lon").unwrap();
    assert_eq!(lat.data_type(), &DataType::Decimal128(9, 7));
    assert_eq!(lon.data_type(), &DataType::Decimal128(10, 7));
    assert!(lat.is_nullable());
    assert!(lon.is_nullable());
}

#[test]
fn test_nested_types() {
    let arrow = EntitySchema::standard().arrow_schema();

    let tags = arrow.field_with_name("tags").unwrap();
    if let DataType::Map(entries, sorted) = tags.data_type() {
        assert!(!sorted);
        if let DataType::Struct(fields) = entries.data_type() {
            assert_eq!(fields[0].name(), "keys");
            assert_eq!(fields[1].name(), "values");
        } else {
            panic!("Expected Struct entries");
        }
    } else {
        panic!("Expected Map type");
    }

    let nds = arrow.field_with_name("nds").unwrap();
    if let DataType::List(item) = nds.data_type() {
        assert_eq!(item.data_type(), &DataType::Struct(node_ref_fields()));
    } else {
        panic!("Expected List type");
    }

    let members = arrow.field_with_name("members").unwrap();
    if let DataType::List(item) = members.data_type() {
        if let DataType::Struct(fields) = item.data_type() {
            let names: Vec<&str> = fields.iter().map(|f| f.name().as_str()).collect();
            assert_eq!(names, vec!["type", "ref", "role"]);
        } else {
            panic!("Expected Struct items");
        }
    } else {
        panic!("Expected List type");
    }
}

#[test]
fn test_timestamp_is_utc_millis() {
    let arrow = EntitySchema::standard().arrow_schema();
    let ts = arrow.field_with_name("timestamp").unwrap();
    assert_eq!(
        ts.data_type(),
        &DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
    );
}

#[test]
fn test_clones_share_schema() {
    let schema = EntitySchema::history();
    let clone = schema.clone();
    assert!(std::sync::Arc::ptr_eq(
        &schema.arrow_schema(),
        &clone.arrow_schema()
    ));
}

#[test]
fn test_changeset_layout() {
    let schema = ChangesetSchema::new();
    let arrow = schema.arrow_schema();

    assert_eq!(arrow.fields().len(), 13);
    assert_eq!(arrow.field(0).name(), "id");
    assert_eq!(arrow.field(3).data_type(), &DataType::Boolean);
    assert_eq!(
        arrow.field_with_name("min_lon").unwrap().data_type(),
        &DataType::Decimal128(10, 7)
    );
    assert_eq!(arrow.field(12).name(), "tags");
    assert!(arrow.field_with_name("uid").unwrap().is_nullable());
}
