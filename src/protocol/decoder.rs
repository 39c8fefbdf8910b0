//! Record and payload decoding
//!
//! [`decode`] turns one record into a [`Detection`]. Payload splitting lives
//! here too so any consumer can split before decoding.

use crate::error::DecodeError;
use crate::protocol::detection::Detection;
use crate::protocol::record::WireRecord;

/// Decode one record
///
/// Returns `Ok(None)` for empty or whitespace-only input.
pub fn decode(record: &str) -> Result<Option<Detection>, DecodeError> {
    if record.trim().is_empty() {
        return Ok(None);
    }

    WireRecord::parse(record).map(|r| Some(Detection::from(r)))
}

/// Split a datagram payload into record lines
///
/// A trailing `\r` on each line is dropped; nothing else is trimmed.
pub fn split_records(payload: &str) -> impl Iterator<Item = &str> {
    payload
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// Result of decoding every record in one payload
#[derive(Debug, Clone, Default)]
pub struct PayloadDecode {
    pub detections: Vec<Detection>,
    /// Line index and error for each rejected record
    pub errors: Vec<(usize, DecodeError)>,
    pub empty_records: usize,
}

impl PayloadDecode {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Decode all records of a payload, skipping empty and invalid ones
pub fn decode_payload(payload: &str) -> PayloadDecode {
    let mut out = PayloadDecode::default();

    for (index, line) in split_records(payload).enumerate() {
        match decode(line) {
            Ok(Some(detection)) => out.detections.push(detection),
            Ok(None) => out.empty_records += 1,
            Err(e) => out.errors.push((index, e)),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GROUND_OFFSET_Y;
    use crate::error::{DecodeErrorKind, Field};
    use proptest::prelude::*;

    #[test]
    fn test_empty_input_is_not_an_error() {
        assert_eq!(decode(""), Ok(None));
        assert_eq!(decode("   "), Ok(None));
        assert_eq!(decode("\t\n"), Ok(None));
    }

    #[test]
    fn test_bad_pivot_named() {
        let err = decode("1 2 3 4 5 6 a 1 0.9").unwrap_err();
        assert_eq!(err.field, Field::Pivot);
        assert_eq!(err.raw, "a");
    }

    #[test]
    fn test_nan_confidence_rejected() {
        let err = decode("1 2 3 4 5 6 0.1 1 nan").unwrap_err();
        assert_eq!(err.field, Field::Confidence);
        assert_eq!(err.kind, DecodeErrorKind::NonFinite);
    }

    #[test]
    fn test_short_record_is_decode_error() {
        let err = decode("1 2 3").unwrap_err();
        assert_eq!(err.field, Field::Width);
        assert_eq!(err.kind, DecodeErrorKind::Missing);
    }

    #[test]
    fn test_axis_remap_and_offset() {
        let detection = decode("1 2 3 4 5 6 0.5 9 0.8").unwrap().unwrap();
        let position = detection.bbox.position;
        assert_eq!(position.x, 1.0);
        assert_eq!(position.z, 2.0);
        assert_eq!(position.y, 3.5);
        assert_eq!(detection.id, 9);
        assert_eq!(detection.confidence, 0.8);
        assert_eq!(detection.bbox.rotation.yaw_rad, 0.5);
    }

    #[test]
    fn test_zero_height_still_offset() {
        let detection = decode("0 0 0 1 1 1 0 1 1").unwrap().unwrap();
        assert_eq!(detection.bbox.position.y, 0.5);
    }

    #[test]
    fn test_confidence_not_clamped() {
        let detection = decode("0 0 0 1 1 1 0 1 1.7").unwrap().unwrap();
        assert_eq!(detection.confidence, 1.7);
    }

    #[test]
    fn test_decode_payload_mixed() {
        let payload = "1 2 3 4 5 6 0.1 1 0.9 \n\
                       bad\n\
                       7 8 9 1 1 1 0.2 2 0.4 \r\n";
        let out = decode_payload(payload);

        assert_eq!(out.detections.len(), 2);
        assert_eq!(out.detections[1].id, 2);
        assert_eq!(out.errors.len(), 1);
        assert_eq!(out.errors[0].0, 1);
        assert_eq!(out.errors[0].1.field, Field::X);
        // trailing newline leaves one empty record
        assert_eq!(out.empty_records, 1);
        assert!(!out.is_clean());
    }

    proptest! {
        #[test]
        fn prop_second_token_is_z_third_is_y(
            x in -1.0e4f32..1.0e4,
            a in -1.0e4f32..1.0e4,
            b in -1.0e4f32..1.0e4,
            id in any::<i32>(),
            conf in 0.0f32..1.0,
        ) {
            let line = format!("{} {} {} 1 2 3 0.5 {} {}", x, a, b, id, conf);
            let detection = decode(&line).unwrap().unwrap();
            let position = detection.bbox.position;

            prop_assert_eq!(position.x, x);
            prop_assert_eq!(position.z, a);
            prop_assert_eq!(position.y, b + GROUND_OFFSET_Y);
            prop_assert_eq!(detection.id, id);
        }

        #[test]
        fn prop_garbage_never_panics(line in "\\PC{0,64}") {
            let _ = decode(&line);
        }
    }
}
