//! Shared test utilities for the `arinc665-rs` workspace.
//!
//! The central piece is the [`test_binrw!`] macro, which generates
//! encode/decode tests against hex-encoded binary fixtures. All ARINC 665
//! structures are big-endian on the wire, so the generated tests use the
//! big-endian entry points.

pub use pastey;

/// Decodes a hex string (no separators) into a byte vector.
///
/// Panics on invalid input; this is test-only code.
pub fn decode_hex(hex: &str) -> Vec<u8> {
    assert!(hex.len() % 2 == 0, "hex fixture has odd length: {}", hex.len());
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).expect("invalid hex digit in fixture"))
        .collect()
}

/// Encodes bytes as a lowercase hex string, for assertion diagnostics.
pub fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generates a pair of tests checking that a value encodes to the given hex
/// fixture and that the fixture decodes back to the value.
///
/// ```ignore
/// test_binrw! {
///     Arinc665String: Arinc665String::from("ABC") => "0003414243 00"
/// }
/// test_binrw! {
///     Arinc665String => empty: Arinc665String::from("") => "0000"
/// }
/// ```
#[macro_export]
macro_rules! test_binrw {
    ($ty:ty: $value:expr => $hex:literal) => {
        $crate::pastey::paste! {
            $crate::test_binrw! { $ty => [<$ty:snake>]: $value => $hex }
        }
    };
    ($ty:ty => $name:ident: $value:expr => $hex:literal) => {
        $crate::pastey::paste! {
            #[test]
            fn [<test_ $name _write>]() {
                let value: $ty = $value;
                let mut cursor = ::std::io::Cursor::new(Vec::new());
                ::binrw::BinWrite::write_be(&value, &mut cursor).expect("write failed");
                assert_eq!(
                    $crate::encode_hex(cursor.get_ref()),
                    $hex.replace(' ', ""),
                    "encoded bytes differ from fixture",
                );
            }

            #[test]
            fn [<test_ $name _read>]() {
                let expected: $ty = $value;
                let data = $crate::decode_hex(&$hex.replace(' ', ""));
                let mut cursor = ::std::io::Cursor::new(&data);
                let value: $ty = ::binrw::BinRead::read_be(&mut cursor).expect("read failed");
                assert_eq!(value, expected, "decoded value differs from fixture");
            }
        }
    };
    ($($ty:ty => $name:ident: $value:expr => $hex:literal),+ $(,)?) => {
        $(
            $crate::test_binrw! { $ty => $name: $value => $hex }
        )+
    };
}

/// Generates a test checking `decode(encode(value)) == value` for types
/// without a hand-computed binary fixture.
#[macro_export]
macro_rules! test_binrw_roundtrip {
    ($ty:ty => $name:ident: $value:expr) => {
        $crate::pastey::paste! {
            #[test]
            fn [<test_ $name _roundtrip>]() {
                let value: $ty = $value;
                let mut cursor = ::std::io::Cursor::new(Vec::new());
                ::binrw::BinWrite::write_be(&value, &mut cursor).expect("write failed");
                cursor.set_position(0);
                let reread: $ty = ::binrw::BinRead::read_be(&mut cursor).expect("read failed");
                assert_eq!(reread, value);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("00ff10"), vec![0x00, 0xff, 0x10]);
        assert_eq!(decode_hex(""), Vec::<u8>::new());
    }

    #[test]
    fn test_encode_hex() {
        assert_eq!(encode_hex(&[0x00, 0xff, 0x10]), "00ff10");
    }
}
