//! Encoded polyline codec (5-decimal precision), as used by route geometries.

use crate::models::Coordinate;

const PRECISION: f64 = 100_000.0;
const CHAR_OFFSET: i64 = 63;
const CHUNK_MASK: i64 = 0x1f;
const CONTINUATION_BIT: i64 = 0x20;
const MAX_SHIFT: u32 = 35;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolylineError {
    #[error("polyline ends in the middle of a value at byte {0}")]
    Truncated(usize),
    #[error("invalid polyline character {character:?} at byte {index}")]
    InvalidCharacter { character: char, index: usize },
    #[error("polyline value starting at byte {0} is too long")]
    Overflow(usize),
}

/// Decode an encoded polyline into its ordered coordinates.
///
/// Latitude and longitude are decoded as independent running deltas. An
/// empty string decodes to an empty path.
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, PolylineError> {
    let bytes = encoded.as_bytes();
    let mut path = Vec::new();
    let mut index = 0;
    let mut lat = 0_i64;
    let mut lng = 0_i64;

    while index < bytes.len() {
        lat += next_delta(bytes, &mut index)?;
        lng += next_delta(bytes, &mut index)?;
        path.push(Coordinate::new(lat as f64 / PRECISION, lng as f64 / PRECISION));
    }

    Ok(path)
}

fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let start = *index;
    let mut shift = 0_u32;
    let mut result = 0_i64;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(PolylineError::Truncated(*index));
        };
        if !(63..=126).contains(&byte) {
            return Err(PolylineError::InvalidCharacter {
                character: byte as char,
                index: *index,
            });
        }
        if shift > MAX_SHIFT {
            return Err(PolylineError::Overflow(start));
        }
        *index += 1;

        let chunk = i64::from(byte) - CHAR_OFFSET;
        result |= (chunk & CHUNK_MASK) << shift;
        shift += 5;

        if chunk < CONTINUATION_BIT {
            break;
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

/// Encode coordinates, rounding each axis to 5 decimals.
pub fn encode(path: &[Coordinate]) -> String {
    let mut encoded = String::new();
    let mut previous_lat = 0_i64;
    let mut previous_lng = 0_i64;

    for coord in path {
        let lat = (coord.lat * PRECISION).round() as i64;
        let lng = (coord.lng * PRECISION).round() as i64;
        push_value(&mut encoded, lat - previous_lat);
        push_value(&mut encoded, lng - previous_lng);
        previous_lat = lat;
        previous_lng = lng;
    }

    encoded
}

fn push_value(out: &mut String, value: i64) {
    let mut value = if value < 0 { !(value << 1) } else { value << 1 };
    while value >= CONTINUATION_BIT {
        let chunk = (CONTINUATION_BIT | (value & CHUNK_MASK)) + CHAR_OFFSET;
        out.push(chunk as u8 as char);
        value >>= 5;
    }
    out.push((value + CHAR_OFFSET) as u8 as char);
}
