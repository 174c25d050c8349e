use serde::de::DeserializeOwned;

/// Deserialize JSON with document-path context in error messages.
pub fn from_json_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at path {path} → {}", err.into_inner()))
        }
    }
}

/// Same as [`from_json_with_path`], for a single YAML document.
pub fn from_yaml_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = serde_yaml::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at path {path} → {}", err.into_inner()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Outer {
        #[allow(dead_code)]
        items: Vec<Inner>,
    }

    #[derive(Debug, Deserialize)]
    struct Inner {
        #[allow(dead_code)]
        count: u32,
    }

    #[test]
    fn json_errors_carry_the_path() {
        let err = from_json_with_path::<Outer>(r#"{"items": [{"count": 1}, {"count": "x"}]}"#)
            .unwrap_err();
        assert!(err.starts_with("at path items[1].count"), "{err}");
    }

    #[test]
    fn yaml_errors_carry_the_path() {
        let err = from_yaml_with_path::<Outer>("items:\n  - count: nope\n").unwrap_err();
        assert!(err.starts_with("at path items[0].count"), "{err}");
    }
}
