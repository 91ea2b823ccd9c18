use crate::value::Value;
use xxhash_rust::xxh3::Xxh3;

const VERSION: u8 = 1;

/// Stable 64-bit value hash used by hash-bucket partition functions.
///
/// Values that compare equal hash equal: integral numerics feed the same
/// bytes whether they arrive as `Int`, `Uint` or an integral `Float64`.
#[must_use]
pub fn hash_value(value: &Value) -> u64 {
    let mut h = Xxh3::with_seed(0);
    h.update(&[VERSION]);
    write_value(&mut h, value);

    h.digest()
}

fn write_value(h: &mut Xxh3, value: &Value) {
    match value {
        Value::Null => h.update(&[0x00]),
        Value::Bool(v) => h.update(&[0x01, u8::from(*v)]),
        Value::Int(_) | Value::Uint(_) | Value::Float64(_) => match value.as_i128() {
            Some(int) => {
                h.update(&[0x02]);
                h.update(&int.to_be_bytes());
            }
            None => {
                let Value::Float64(f) = value else {
                    return;
                };
                h.update(&[0x03]);
                h.update(&f.to_bits().to_be_bytes());
            }
        },
        Value::Text(s) => {
            h.update(&[0x04]);
            write_len(h, s.len());
            h.update(s.as_bytes());
        }
        Value::Blob(bytes) => {
            h.update(&[0x05]);
            write_len(h, bytes.len());
            h.update(bytes);
        }
        Value::List(items) => {
            h.update(&[0x06]);
            write_len(h, items.len());
            for item in items {
                write_value(h, item);
            }
        }
    }
}

fn write_len(h: &mut Xxh3, len: usize) {
    let len = u32::try_from(len).unwrap_or(u32::MAX);
    h.update(&len.to_be_bytes());
}
