use autograde::{ComparisonType, compare};

#[test]
fn booleans_ignore_case() {
    assert!(compare("TRUE", "true", &ComparisonType::Boolean));
    assert!(compare(" false\n", "False", &ComparisonType::Boolean));
    assert!(!compare("true", "false", &ComparisonType::Boolean));
}

#[test]
fn ints_compare_numerically() {
    assert!(compare(" 42\n", "42", &ComparisonType::Int));
    assert!(compare("-7", "-7", &ComparisonType::Int));
    assert!(!compare("abc", "1", &ComparisonType::Int));
    assert!(!compare("1", "abc", &ComparisonType::Int));
    assert!(!compare("1.0", "1", &ComparisonType::Int));
}

#[test]
fn doubles_compare_within_tolerance() {
    assert!(compare("3.00001", "3.0", &ComparisonType::Double));
    assert!(!compare("3.001", "3.0", &ComparisonType::Double));
    assert!(compare("2", "2.0", &ComparisonType::Double));
    assert!(!compare("two", "2.0", &ComparisonType::Double));
}

#[test]
fn strings_compare_exactly_after_trimming() {
    assert!(compare("  hello world \n", "hello world", &ComparisonType::String));
    assert!(!compare("Hello", "hello", &ComparisonType::String));
    assert!(compare("", "  ", &ComparisonType::String));
}

#[test]
fn unset_and_unknown_types_behave_like_strings() {
    assert!(compare("x", "x", &ComparisonType::Unset));
    assert!(!compare("X", "x", &ComparisonType::Unset));
    let other = ComparisonType::Other("Fraction".into());
    assert!(compare("1/2", "1/2", &other));
    assert!(!compare("1/2", "0.5", &other));
}

#[test]
fn type_names_parse_case_insensitively_and_print_canonically() {
    for (raw, expected) in [
        ("string", ComparisonType::String),
        ("BOOLEAN", ComparisonType::Boolean),
        (" Int ", ComparisonType::Int),
        ("double", ComparisonType::Double),
        ("", ComparisonType::Unset),
    ] {
        let parsed: ComparisonType = raw.parse().unwrap_or_default();
        assert_eq!(parsed, expected, "parsing {raw:?}");
    }

    assert_eq!(ComparisonType::Double.to_string(), "Double");
    assert_eq!(ComparisonType::Unset.to_string(), "");
    assert_eq!(ComparisonType::Other("Fraction".into()).to_string(), "Fraction");
}
