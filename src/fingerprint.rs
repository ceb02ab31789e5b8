//! Row fingerprinting for set-membership comparison

use crate::record::{Record, Scalar};
use blake3::Hasher;
use rayon::prelude::*;

/// Digest identifying a record's values
pub type Fingerprint = [u8; 32];

/// Compute the fingerprint of a single record's values, in the record's column order.
///
/// Integral floats hash like the equal integer so `1` and `1.0` collide on purpose.
pub fn fingerprint_record(record: &Record) -> Fingerprint {
    let mut hasher = Hasher::new();
    for value in record.values() {
        hash_scalar(&mut hasher, value);
    }
    *hasher.finalize().as_bytes()
}

/// Fingerprint every record in parallel, preserving input order
pub fn fingerprint_records(records: &[Record]) -> Vec<Fingerprint> {
    records.par_iter().map(fingerprint_record).collect()
}

fn hash_scalar(hasher: &mut Hasher, value: &Scalar) {
    match value {
        Scalar::Null => {
            hasher.update(b"z");
        }
        Scalar::Text(s) => {
            hasher.update(b"s");
            hasher.update(&(s.len() as u64).to_le_bytes());
            hasher.update(s.as_bytes());
        }
        Scalar::Integer(i) => {
            hasher.update(b"i");
            hasher.update(&i.to_le_bytes());
        }
        Scalar::Float(f) => match value.as_integral() {
            // -0.0 lands here too, as 0
            Some(i) => {
                hasher.update(b"i");
                hasher.update(&i.to_le_bytes());
            }
            None => {
                hasher.update(b"f");
                hasher.update(&f.to_bits().to_le_bytes());
            }
        },
    }
}
