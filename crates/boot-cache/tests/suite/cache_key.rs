use boot_cache::CacheKey;
use proptest::prelude::*;

proptest! {
    #[test]
    fn file_name_parses_back_to_the_same_key(
        identifier in "[A-Za-z0-9_.-]{1,24}",
        version in "[A-Za-z0-9_.]{1,16}",
    ) {
        prop_assume!(!version.ends_with(".json"));
        let key = CacheKey::new(identifier, version).unwrap();
        prop_assert_eq!(CacheKey::parse(&key.file_name()), Some(key.clone()));
        prop_assert_eq!(CacheKey::parse(&key.to_string()), Some(key));
    }
}

#[test]
fn versions_with_separators_are_rejected() {
    assert!(CacheKey::new("demo-java", "1-2").is_err());
    assert!(CacheKey::new("demo/java", "1").is_err());
    assert!(CacheKey::new("demo-java", "").is_err());
}

#[test]
fn serializes_as_a_plain_string() {
    let key = CacheKey::new("demo-java", "ABC123").unwrap();
    assert_eq!(serde_json::to_string(&key).unwrap(), "\"demo-java-ABC123\"");
    let back: CacheKey = serde_json::from_str("\"demo-java-ABC123\"").unwrap();
    assert_eq!(back, key);
}
