use std::fs;

use curator::data::taxonomy::{read_column, NOT_FOUND_TEXT, TX_ID_FIELD};
use curator::data::{TextEncoding, Taxonomy, TaxonomySource};
use curator::CurateError;
use serde_json::json;

fn source(tags: &[&str], positional: bool) -> TaxonomySource {
    TaxonomySource {
        tags: tags.iter().map(|s| s.to_string()).collect(),
        names: vec!["nameSeq".into(), "txID".into(), "label".into()],
        pivot: "txID".into(),
        prefix: "names_".into(),
        positional,
        encoding: TextEncoding::Utf8,
    }
}

#[test]
fn per_tag_tables_are_keyed_by_index_and_pivot() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("names_mode.csv"), "1,01-car,Car\n1,02-bus,Bus\n").unwrap();
    fs::write(dir.path().join("names_calc.csv"), "2,01,Single\n").unwrap();

    let taxonomy = Taxonomy::from_tag_tables(dir.path(), &source(&["mode", "calc"], true)).unwrap();

    assert_eq!(
        taxonomy.tags().collect::<Vec<_>>(),
        vec!["1-01-car", "1-02-bus", "2-01"]
    );
    let bus = taxonomy.get("1-02-bus").unwrap();
    assert_eq!(bus.index(), Some(1));
    assert_eq!(bus.name_seq(), Some(1));
    assert_eq!(bus.text("label").as_deref(), Some("Bus"));
    // The pivot stays textual even when it looks numeric.
    assert_eq!(taxonomy.get("2-01").unwrap().get(TX_ID_FIELD), Some(&json!("01")));
    let fields: Vec<&str> = bus.fields().iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(fields, vec!["index", "nameSeq", "txID", "label"]);
}

#[test]
fn non_positional_keys_use_pivot_alone() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("names_mode.csv"), "1,01-car,Car\n").unwrap();

    let taxonomy = Taxonomy::from_tag_tables(dir.path(), &source(&["mode"], false)).unwrap();

    assert!(taxonomy.contains_key("01-car"));
    assert_eq!(taxonomy.text_for("01-car", "label").as_deref(), Some("Car"));
}

#[test]
fn short_rows_get_null_columns() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("names_mode.csv"), "1,01-car\n").unwrap();

    let taxonomy = Taxonomy::from_tag_tables(dir.path(), &source(&["mode"], true)).unwrap();

    let record = taxonomy.get("1-01-car").unwrap();
    assert_eq!(record.get("label"), Some(&serde_json::Value::Null));
    assert_eq!(record.text("label"), None);
}

#[test]
fn missing_pivot_column_fails_before_reading() {
    let mut src = source(&["does-not-exist"], true);
    src.pivot = "code".into();

    let err = Taxonomy::from_tag_tables("/nonexistent", &src).unwrap_err();

    match err {
        CurateError::MissingColumn { pivot, columns } => {
            assert_eq!(pivot, "code");
            assert_eq!(columns.len(), 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_table_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Taxonomy::from_tag_tables(dir.path(), &source(&["mode"], true)).unwrap_err();
    assert!(matches!(err, CurateError::Io { .. }));
}

#[test]
fn gap_filling_covers_every_declared_position() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("names_a.csv"), "1,0100-nr,custom nr\n").unwrap();
    fs::write(dir.path().join("names_b.csv"), "2,01-x,X\n").unwrap();
    fs::write(dir.path().join("names_c.csv"), "3,01-y,Y\n").unwrap();
    let src = source(&["a", "b", "c"], false);

    let mut taxonomy = Taxonomy::from_tag_tables(dir.path(), &src).unwrap();
    let added = taxonomy.fill_gaps(src.tags.len());

    assert_eq!(added, 5);
    for seq in 1..=3 {
        assert!(taxonomy.contains_key(&format!("{seq:02}00-nr")));
        assert!(taxonomy.contains_key(&format!("{seq:02}99-na")));
    }
    assert_eq!(taxonomy.text_for("0100-nr", "label").as_deref(), Some("custom nr"));
}

#[test]
fn headed_table_keeps_all_columns_in_cp1252() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taxonomy.csv");
    fs::write(&path, b"txID,nameSeq,label\n0101-car,1,Voiture \xE0 essence\n").unwrap();

    let taxonomy = Taxonomy::from_headed_table(&path, "txID", TextEncoding::Windows1252).unwrap();

    assert_eq!(
        taxonomy.text_for("0101-car", "label").as_deref(),
        Some("Voiture à essence")
    );
    assert_eq!(taxonomy.get("0101-car").unwrap().name_seq(), Some(1));
    assert_eq!(taxonomy.text_for("0101-car", "missing"), None);
    assert_eq!(
        taxonomy.text_for("nope", TX_ID_FIELD).unwrap_or_else(|| NOT_FOUND_TEXT.to_string()),
        NOT_FOUND_TEXT
    );
}

#[test]
fn headed_table_without_pivot_header_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taxonomy.csv");
    fs::write(&path, "id,label\n1,Car\n").unwrap();

    let err = Taxonomy::from_headed_table(&path, "txID", TextEncoding::Utf8).unwrap_err();
    assert!(matches!(err, CurateError::MissingColumn { .. }));
}

#[test]
fn declared_names_column_counts_positions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("names.csv");
    fs::write(&path, "1,mode\n2,calculation method\n3,route\n").unwrap();

    let names = read_column(&path, TextEncoding::Utf8, 1).unwrap();
    assert_eq!(names, vec!["mode", "calculation method", "route"]);
}

#[test]
fn dump_and_load_preserve_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut taxonomy = Taxonomy::default();
    taxonomy.fill_gaps(2);
    let path = dir.path().join("out/taxonomy.json");

    taxonomy.dump(&path).unwrap();
    let back = Taxonomy::load(&path).unwrap();

    assert_eq!(
        back.tags().collect::<Vec<_>>(),
        vec!["0100-nr", "0199-na", "0200-nr", "0299-na"]
    );
    assert_eq!(back.get("0299-na").unwrap().name_seq(), Some(2));
}
