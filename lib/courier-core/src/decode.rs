//! Response body decoding.
//!
//! A [`Decoder`] turns body bytes into the caller's type or a [`DecodeError`]
//! whose [`DecodeErrorKind`] feeds [`ParseKind`](crate::ParseKind). [`Json`] is
//! the default decoder; any `Fn(&[u8]) -> Result<T, DecodeError>` also works.

use std::marker::PhantomData;

use derive_more::{Display, Error};
use serde::de::DeserializeOwned;
use serde_json::error::Category;

/// Category of a decoding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum DecodeErrorKind {
    /// A value had an unexpected type.
    #[display("type mismatch")]
    TypeMismatch,
    /// A value was null where one was required.
    #[display("value not found")]
    ValueNotFound,
    /// A required key was missing.
    #[display("key not found")]
    KeyNotFound,
    /// The input is not well-formed.
    #[display("data corrupted")]
    DataCorrupted,
    /// Anything else.
    #[display("other")]
    Other,
}

/// A decoding failure with the location where it happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    path: String,
    message: String,
}

impl DecodeError {
    /// Creates a decode error.
    ///
    /// `path` is the location of the failing value (e.g. `user.address.city`),
    /// empty or `.` when it is the document root.
    #[must_use]
    pub fn new(kind: DecodeErrorKind, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Failure category.
    #[must_use]
    pub const fn kind(&self) -> DecodeErrorKind {
        self.kind
    }

    /// Location of the failing value.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Underlying decoder message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Message with the failing location, when one is known.
    #[must_use]
    pub fn description(&self) -> String {
        if self.path.is_empty() || self.path == "." {
            self.message.clone()
        } else {
            format!("{} at `{}`", self.message, self.path)
        }
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.description())
    }
}

/// Decodes a response body into `T`.
pub trait Decoder<T>: Send + Sync {
    /// Decode the body bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] describing why the body does not match `T`.
    fn decode(&self, body: &[u8]) -> Result<T, DecodeError>;
}

impl<T, F> Decoder<T> for F
where
    F: Fn(&[u8]) -> Result<T, DecodeError> + Send + Sync,
{
    fn decode(&self, body: &[u8]) -> Result<T, DecodeError> {
        self(body)
    }
}

/// JSON decoder for any deserializable type.
pub struct Json<T>(PhantomData<fn() -> T>);

impl<T> Json<T> {
    /// Creates a JSON decoder.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Json<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Json<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Json<T> {}

impl<T> std::fmt::Debug for Json<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Json")
    }
}

impl<T: DeserializeOwned> Decoder<T> for Json<T> {
    fn decode(&self, body: &[u8]) -> Result<T, DecodeError> {
        from_json(body)
    }
}

/// Deserialize JSON bytes, reporting failures with their path and kind.
///
/// Uses `serde_path_to_error` so the error names the exact field that failed.
///
/// # Errors
///
/// Returns a [`DecodeError`] classified from the `serde_json` error.
///
/// # Example
///
/// ```
/// use courier_core::{DecodeErrorKind, from_json};
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct Counter { id: String }
///
/// let error = from_json::<Counter>(br#"{"title":"coffee"}"#).unwrap_err();
/// assert_eq!(error.kind(), DecodeErrorKind::KeyNotFound);
/// ```
pub fn from_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let value = serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        let path = e.path().to_string();
        let inner = e.into_inner();
        DecodeError::new(classify(&inner), path, inner.to_string())
    })?;
    deserializer.end().map_err(|e| {
        DecodeError::new(DecodeErrorKind::DataCorrupted, String::new(), e.to_string())
    })?;
    Ok(value)
}

// serde_json reports data errors through `de::Error::custom`, so the standard
// serde messages are the only signal for the finer categories.
fn classify(error: &serde_json::Error) -> DecodeErrorKind {
    match error.classify() {
        Category::Syntax | Category::Eof => DecodeErrorKind::DataCorrupted,
        Category::Io => DecodeErrorKind::Other,
        Category::Data => {
            let message = error.to_string();
            if message.starts_with("missing field") {
                DecodeErrorKind::KeyNotFound
            } else if message.starts_with("invalid type: null") {
                DecodeErrorKind::ValueNotFound
            } else if message.starts_with("invalid type")
                || message.starts_with("invalid value")
                || message.starts_with("invalid length")
            {
                DecodeErrorKind::TypeMismatch
            } else if message.starts_with("unknown variant") || message.starts_with("unknown field") {
                DecodeErrorKind::DataCorrupted
            } else {
                DecodeErrorKind::Other
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Counter {
        id: String,
        title: String,
        count: u32,
    }

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    #[allow(dead_code)]
    struct Strict {
        id: String,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    enum Color {
        Red,
    }

    #[test]
    fn decodes_valid_json() {
        let counter: Counter =
            from_json(br#"{"id":"a1","title":"coffee","count":3}"#).expect("decode");
        check!(
            counter
                == Counter {
                    id: "a1".to_string(),
                    title: "coffee".to_string(),
                    count: 3,
                }
        );
    }

    #[test]
    fn missing_field_is_key_not_found() {
        let_assert!(Err(error) = from_json::<Counter>(br#"{"id":"a1","count":3}"#));
        check!(error.kind() == DecodeErrorKind::KeyNotFound);
        check!(error.description().contains("title"));
    }

    #[test]
    fn null_value_is_value_not_found() {
        let_assert!(Err(error) = from_json::<Counter>(br#"{"id":"a1","title":null,"count":3}"#));
        check!(error.kind() == DecodeErrorKind::ValueNotFound);
        check!(error.path() == "title");
    }

    #[test]
    fn wrong_type_is_type_mismatch() {
        let_assert!(Err(error) = from_json::<Counter>(br#"{"id":"a1","title":"t","count":"3"}"#));
        check!(error.kind() == DecodeErrorKind::TypeMismatch);
        check!(error.path() == "count");
        check!(error.description().ends_with("at `count`"));
    }

    #[test]
    fn negative_into_unsigned_is_type_mismatch() {
        let_assert!(Err(error) = from_json::<Counter>(br#"{"id":"a1","title":"t","count":-1}"#));
        check!(error.kind() == DecodeErrorKind::TypeMismatch);
    }

    #[test]
    fn malformed_json_is_data_corrupted() {
        let_assert!(Err(error) = from_json::<Counter>(b"not json"));
        check!(error.kind() == DecodeErrorKind::DataCorrupted);

        let_assert!(Err(error) = from_json::<Counter>(br#"{"id":"a1""#));
        check!(error.kind() == DecodeErrorKind::DataCorrupted);
    }

    #[test]
    fn trailing_garbage_is_data_corrupted() {
        let_assert!(Err(error) = from_json::<Strict>(br#"{"id":"a1"} trailing"#));
        check!(error.kind() == DecodeErrorKind::DataCorrupted);
    }

    #[test]
    fn unknown_field_and_variant_are_data_corrupted() {
        let_assert!(Err(error) = from_json::<Strict>(br#"{"id":"a1","extra":1}"#));
        check!(error.kind() == DecodeErrorKind::DataCorrupted);

        let_assert!(Err(error) = from_json::<Color>(br#""Blue""#));
        check!(error.kind() == DecodeErrorKind::DataCorrupted);
    }

    #[test]
    fn description_without_path_is_message() {
        let error = DecodeError::new(DecodeErrorKind::Other, ".", "boom");
        check!(error.description() == "boom");
        check!(error.to_string() == "other: boom");
    }

    #[test]
    fn closures_are_decoders() {
        let decoder = |body: &[u8]| -> Result<usize, DecodeError> { Ok(body.len()) };
        check!(decoder.decode(b"abc").expect("decode") == 3);
    }

    #[test]
    fn json_decoder() {
        let decoder = Json::<Vec<u32>>::new();
        check!(decoder.decode(b"[1,2]").expect("decode") == vec![1, 2]);
    }
}
