//! Integration tests for hash crate

#[cfg(test)]
mod tests {
    use webforge_hash::*;

    #[test]
    fn test_manifest_hash_is_content_addressed() {
        let data = br#"{"name":"demo","devDependencies":{"electron":"^30.0.0"}}"#;
        assert_eq!(Hash::from_data(data), Hash::from_data(data));
        assert_ne!(Hash::from_data(data), Hash::from_data(b"different content"));
        assert!(Hash::is_hex_name(&Hash::from_data(data).to_hex()));
    }

    #[test]
    fn test_hash_from_hex_errors() {
        // Too short
        assert!(Hash::from_hex("1234").is_err());

        // Not hex
        assert!(Hash::from_hex(&"g".repeat(64)).is_err());
    }

    #[test]
    fn test_hex_round_trip() {
        let hash = Hash::from_data(b"node_modules snapshot");
        let parsed = Hash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, parsed);
        assert_eq!(hash.to_string(), hash.to_hex());
    }
}
