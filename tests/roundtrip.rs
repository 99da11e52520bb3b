//! Round-trip tests through the public API.
//!
//! Run: `cargo test --test roundtrip`

use pretty_assertions::assert_eq;
use qail_hstore::prelude::*;

fn samples() -> Vec<Hstore> {
    vec![
        Hstore::new(),
        vec![("a", None::<&str>)].into_iter().collect(),
        vec![("a", Some("1")), ("b", None), ("c", Some(""))]
            .into_iter()
            .collect(),
        vec![("NULL", Some("NULL")), ("null", None)].into_iter().collect(),
        vec![
            ("quote\"d", Some("back\\slash")),
            ("comma, arrow=>", Some("  spaces  ")),
            ("newline", Some("line1\nline2")),
        ]
        .into_iter()
        .collect(),
        vec![
            ("0", Some("0")),
            ("1", Some("0")),
            ("00", Some("a😅b")),
            ("嘅", Some("a嘅b")),
        ]
        .into_iter()
        .collect(),
        vec![("dup", Some("1")), ("dup", Some("2"))].into_iter().collect(),
    ]
}

#[test]
fn test_binary_round_trip() {
    for h in samples() {
        let bytes = encode_binary(&h).unwrap();
        assert_eq!(decode_binary(&bytes).unwrap(), h);
    }
}

#[test]
fn test_text_round_trip() {
    for h in samples() {
        let text = encode_text(&h);
        assert_eq!(decode_text(&text).unwrap(), h, "text was {text}");
    }
}

#[test]
fn test_empty_map_text_is_empty_string() {
    assert_eq!(encode_text(&Hstore::new()), "");
    assert_eq!(decode_text("").unwrap(), Hstore::new());
}

#[test]
fn test_null_disambiguation() {
    assert_eq!(decode_text(r#""a"=>NULL"#).unwrap().get("a"), Some(None));
    assert_eq!(
        decode_text(r#""a"=>"NULL""#).unwrap().get("a"),
        Some(Some("NULL"))
    );
}

#[test]
fn test_truncated_and_trailing() {
    let one: Hstore = vec![("a", Some("1"))].into_iter().collect();
    let mut bytes = encode_binary(&one).unwrap();

    let mut truncated = bytes.clone();
    truncated[3] = 2;
    assert_eq!(
        decode_binary(&truncated).unwrap_err().kind,
        ErrorKind::TruncatedInput
    );

    bytes.extend_from_slice(b"junk");
    assert_eq!(
        decode_binary(&bytes).unwrap_err().kind,
        ErrorKind::TrailingBytes
    );
}

#[test]
fn test_cross_format() {
    // what PostgreSQL prints for SELECT '"b"=>"2","a"=>NULL'::hstore
    let from_text = decode_text(r#""a"=>NULL, "b"=>"2""#).unwrap();
    let from_binary = decode_binary(&encode_binary(&from_text).unwrap()).unwrap();
    assert_eq!(encode_text(&from_binary), r#""a"=>NULL, "b"=>"2""#);
}

#[test]
fn test_registry_decodes_both_formats() {
    let registry = TypeRegistry::new();
    registry.register("hstore", TypeId(16_500));

    let h: Hstore = vec![("k", Some("v"))].into_iter().collect();
    let bin = encode_binary(&h).unwrap();
    let text = encode_text(&h);

    assert_eq!(registry.decode(16_500, Format::Binary, &bin).unwrap(), h);
    assert_eq!(
        registry
            .decode(16_500, Format::Text, text.as_bytes())
            .unwrap(),
        h
    );
}

#[test]
fn test_json_to_binary_and_back() {
    let h: Hstore = serde_json::from_str(r#"{"b": "2", "a": null}"#).unwrap();
    let back = decode_binary(&encode_binary(&h).unwrap()).unwrap();
    assert_eq!(
        serde_json::to_value(&back).unwrap(),
        serde_json::json!({"b": "2", "a": null})
    );
}

mod properties {
    use proptest::prelude::*;
    use qail_hstore::prelude::*;

    /// Pieces that stress quoting, the NULL keyword and multi-byte text.
    const FRAGMENTS: &[&str] = &[
        "a", "b", " ", "\"", "\\", ",", "=>", " NULL", "NULL", "null", "\n", "\t", "\0",
        "\u{85}", "😅", "嘅", "{}",
    ];

    fn field_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            prop::collection::vec(prop::sample::select(FRAGMENTS), 0..12)
                .prop_map(|parts| parts.concat()),
            any::<String>(),
        ]
    }

    fn pairs_strategy() -> impl Strategy<Value = Vec<(String, Option<String>)>> {
        prop::collection::vec(
            (field_strategy(), prop::option::of(field_strategy())),
            0..16,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]

        #[test]
        fn text_round_trips(pairs in pairs_strategy()) {
            let h = Hstore::from(pairs);
            prop_assert_eq!(decode_text(&encode_text(&h)).unwrap(), h);
        }

        #[test]
        fn binary_round_trips(pairs in pairs_strategy()) {
            let h = Hstore::from(pairs);
            let bytes = encode_binary(&h).unwrap();
            prop_assert_eq!(decode_binary(&bytes).unwrap(), h);
        }

        #[test]
        fn garbage_text_fails_cleanly(input in any::<String>()) {
            if let Err(e) = decode_text(&input) {
                prop_assert!(e.offset <= input.len());
                prop_assert!(input.is_char_boundary(e.offset));
            }
        }

        #[test]
        fn garbage_binary_fails_cleanly(input in prop::collection::vec(any::<u8>(), 0..64)) {
            if let Err(e) = decode_binary(&input) {
                prop_assert!(e.offset <= input.len());
            }
        }
    }
}
