//! Request checks shared by every adapter. All of them run before the
//! backend is contacted.

use crate::error::ValidationError;

/// Longest object name S3 and GCS accept, in bytes.
pub const MAX_KEY_LEN: usize = 1024;

pub fn bucket(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyBucket);
    }
    Ok(())
}

pub fn key(key: &str) -> Result<(), ValidationError> {
    if key.is_empty() {
        return Err(ValidationError::EmptyKey);
    }
    if key.len() > MAX_KEY_LEN {
        return Err(ValidationError::KeyTooLong(key.len()));
    }
    Ok(())
}

/// Unwrap a request body, rejecting an absent one.
pub fn body<B>(body: Option<B>) -> Result<B, ValidationError> {
    body.ok_or(ValidationError::MissingBody)
}

pub fn bucket_and_key(bucket_name: &str, object_key: &str) -> Result<(), ValidationError> {
    bucket(bucket_name)?;
    key(object_key)
}

/// Turn raw bytes into a key, rejecting invalid UTF-8.
pub fn utf8_key(raw: &[u8]) -> Result<String, ValidationError> {
    let key = std::str::from_utf8(raw)
        .map_err(|_| ValidationError::InvalidUtf8(format!("{:?}", String::from_utf8_lossy(raw))))?;
    self::key(key)?;
    Ok(key.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn empty_bucket_rejected() {
        assert_eq!(bucket(""), Err(ValidationError::EmptyBucket));
        assert_eq!(bucket_and_key("", "k"), Err(ValidationError::EmptyBucket));
    }

    #[test]
    fn empty_key_rejected() {
        assert_eq!(key(""), Err(ValidationError::EmptyKey));
        assert_eq!(bucket_and_key("b", ""), Err(ValidationError::EmptyKey));
    }

    #[test]
    fn oversized_key_rejected() {
        let long = "k".repeat(MAX_KEY_LEN + 1);
        assert_eq!(key(&long), Err(ValidationError::KeyTooLong(MAX_KEY_LEN + 1)));
        assert!(key(&"k".repeat(MAX_KEY_LEN)).is_ok());
    }

    #[test]
    fn missing_body_rejected() {
        assert!(matches!(
            body(None::<Cursor<Vec<u8>>>),
            Err(ValidationError::MissingBody)
        ));
        let cursor = Cursor::new(b"data".to_vec());
        assert_eq!(body(Some(cursor)).unwrap().into_inner(), b"data");
    }

    #[test]
    fn invalid_utf8_key_rejected() {
        let err = utf8_key(&[b'a', 0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidUtf8(_)));

        let err = utf8_key(&[0xc3, 0x28]).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidUtf8(_)));
    }

    #[test]
    fn valid_utf8_key_accepted() {
        assert_eq!(utf8_key("photos/été.jpg".as_bytes()).unwrap(), "photos/été.jpg");
        assert_eq!(utf8_key(b""), Err(ValidationError::EmptyKey));
    }
}
