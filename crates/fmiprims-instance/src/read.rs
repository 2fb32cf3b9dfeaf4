use std::fmt;

use fmiprims_abi::StatusCode;
use serde::Serialize;

/// A value read from a component together with the status of the read.
///
/// The value is whatever the exchange buffer held after the call. When
/// `status` is not [`StatusCode::Ok`] it carries no meaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadResult<T> {
    value: T,
    status: StatusCode,
}

impl<T> ReadResult<T> {
    pub fn new(value: T, status: StatusCode) -> Self {
        Self { value, status }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// The value, only if the read succeeded.
    pub fn ok(self) -> Option<T> {
        self.status.is_ok().then_some(self.value)
    }

    pub fn into_parts(self) -> (T, StatusCode) {
        (self.value, self.status)
    }
}

impl<T: fmt::Debug> fmt::Display for ReadResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReadResult(value={:?}, status={})", self.value, self.status)
    }
}

pub type IntegerRead = ReadResult<i32>;
pub type RealRead = ReadResult<f64>;
pub type StringRead = ReadResult<String>;
pub type BooleanRead = ReadResult<bool>;
/// Enumerations travel as integers.
pub type EnumerationRead = IntegerRead;

pub type IntegerArrayRead = ReadResult<Vec<i32>>;
pub type RealArrayRead = ReadResult<Vec<f64>>;
pub type StringArrayRead = ReadResult<Vec<String>>;
pub type BooleanArrayRead = ReadResult<Vec<bool>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_shows_value_and_status() {
        let read = RealRead::new(3.14, StatusCode::Ok);
        assert_eq!(read.to_string(), "ReadResult(value=3.14, status=OK)");

        let read = StringRead::new("hi".to_string(), StatusCode::Warning);
        assert_eq!(read.to_string(), "ReadResult(value=\"hi\", status=Warning)");
    }

    #[test]
    fn ok_discards_value_on_failure() {
        assert_eq!(IntegerRead::new(4, StatusCode::Ok).ok(), Some(4));
        assert_eq!(IntegerRead::new(4, StatusCode::Discard).ok(), None);
    }

    #[test]
    fn equality_covers_value_and_status() {
        assert_eq!(BooleanRead::new(true, StatusCode::Ok), BooleanRead::new(true, StatusCode::Ok));
        assert_ne!(BooleanRead::new(true, StatusCode::Ok), BooleanRead::new(true, StatusCode::Error));
    }

    #[test]
    fn serializes_as_value_and_status() {
        let json = serde_json::to_string(&RealArrayRead::new(vec![1.0, 2.5], StatusCode::Ok)).unwrap();
        assert_eq!(json, r#"{"value":[1.0,2.5],"status":"Ok"}"#);
    }
}
