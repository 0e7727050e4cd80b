//! Tracking number format and check-digit rules, one family per carrier.
//!
//! Every function here is total: any input, including non-ASCII or empty
//! strings, yields `true` or `false`. None of them allocate.

fn is_digits(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(u8::is_ascii_digit)
}

fn is_alpha(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(u8::is_ascii_alphabetic)
}

fn digit(b: u8) -> u32 {
    u32::from(b - b'0')
}

fn last_digit(bytes: &[u8]) -> Option<u32> {
    match bytes.last() {
        Some(b) if b.is_ascii_digit() => Some(digit(*b)),
        _ => None,
    }
}

/// UPS "1Z" numbers: 18 alphanumerics, the 15 characters after "1Z" carry a
/// mod-10 check digit in the final position.
///
/// Letters count as `(ascii - 63) mod 10`. Odd positions (1-based) are
/// doubled, even positions count once, and the check digit is
/// `(10 - total mod 10) mod 10`.
pub fn ups_1z(tracking_number: &str) -> bool {
    let bytes = tracking_number.as_bytes();
    if bytes.len() != 18 || !bytes.starts_with(b"1Z") {
        return false;
    }
    if !bytes.iter().all(u8::is_ascii_alphanumeric) {
        return false;
    }
    let Some(check) = last_digit(bytes) else {
        return false;
    };

    let total: u32 = bytes[2..17]
        .iter()
        .enumerate()
        .map(|(idx, b)| {
            let value = if b.is_ascii_digit() {
                digit(*b)
            } else {
                (u32::from(b.to_ascii_uppercase()) - 63) % 10
            };
            if idx % 2 == 0 {
                value * 2
            } else {
                value
            }
        })
        .sum();

    (10 - total % 10) % 10 == check
}

/// UPS Mail Innovations: 18 digits, format only.
pub fn ups_mail_innovations(tracking_number: &str) -> bool {
    let bytes = tracking_number.as_bytes();
    bytes.len() == 18 && is_digits(bytes)
}

/// FedEx Express: 12 digits. The 11-digit serial is weighted right to left
/// by 1, 3, 7 repeating; `total mod 11` (10 reads as 0) must equal the last
/// digit.
pub fn fedex_express(tracking_number: &str) -> bool {
    const WEIGHTS: [u32; 3] = [1, 3, 7];

    let bytes = tracking_number.as_bytes();
    if bytes.len() != 12 || !is_digits(bytes) {
        return false;
    }
    let total: u32 = bytes[..11]
        .iter()
        .rev()
        .zip(WEIGHTS.iter().cycle())
        .map(|(b, weight)| digit(*b) * weight)
        .sum();

    let check = match total % 11 {
        10 => 0,
        n => n,
    };
    Some(check) == last_digit(bytes)
}

/// GS1-style mod 10 over the `span` digits preceding the trailing check
/// digit. Walking right to left from the check digit, odd offsets weigh 3
/// and even offsets weigh 1.
fn weighted_mod10(bytes: &[u8], span: usize) -> bool {
    if bytes.len() <= span || !is_digits(bytes) {
        return false;
    }
    let total: u32 = bytes
        .iter()
        .rev()
        .enumerate()
        .skip(1)
        .take(span)
        .map(|(offset, b)| if offset % 2 == 1 { digit(*b) * 3 } else { digit(*b) })
        .sum();

    Some((10 - total % 10) % 10) == last_digit(bytes)
}

/// FedEx Ground "96" barcodes. The check digit covers the trailing 15
/// digits, so the 15-, 20- and 22-digit renderings share one rule.
pub fn fedex_ground96(tracking_number: &str) -> bool {
    weighted_mod10(tracking_number.as_bytes(), 14)
}

/// SSC-18 / SSCC serial shipping container codes.
pub fn fedex_ssc18(tracking_number: &str) -> bool {
    weighted_mod10(tracking_number.as_bytes(), 18)
}

/// FedEx, dispatched by length.
///
/// 22-digit numbers belong to FedEx when they carry the Ground "96" or
/// SSC-18 "00" prefix with a valid check digit, or the SmartPost "91"/"92"
/// prefixes (format only). "92" SmartPost numbers are also valid USPS
/// numbers, and only a live probe can tell them apart.
pub fn fedex(tracking_number: &str) -> bool {
    let bytes = tracking_number.as_bytes();
    match bytes.len() {
        12 => fedex_express(tracking_number),
        15 => fedex_ground96(tracking_number),
        20 => bytes.starts_with(b"96") && fedex_ground96(tracking_number),
        22 => {
            if bytes.starts_with(b"96") {
                fedex_ground96(tracking_number)
            } else if bytes.starts_with(b"00") {
                fedex_ssc18(tracking_number)
            } else {
                (bytes.starts_with(b"91") || bytes.starts_with(b"92")) && is_digits(bytes)
            }
        }
        _ => false,
    }
}

pub fn ups(tracking_number: &str) -> bool {
    ups_1z(tracking_number) || ups_mail_innovations(tracking_number)
}

/// USPS, dispatched by length:
/// - 13: UPU S10, two letters, nine digits, two letters
/// - 20: numeric, leading "0"
/// - 22: numeric, leading "9" except the FedEx "96"/"91" prefixes
/// - 30: numeric
pub fn usps(tracking_number: &str) -> bool {
    let bytes = tracking_number.as_bytes();
    match bytes.len() {
        13 => is_alpha(&bytes[..2]) && is_digits(&bytes[2..11]) && is_alpha(&bytes[11..]),
        20 => is_digits(bytes) && bytes[0] == b'0',
        22 => {
            is_digits(bytes)
                && bytes[0] == b'9'
                && !bytes.starts_with(b"96")
                && !bytes.starts_with(b"91")
        }
        30 => is_digits(bytes),
        _ => false,
    }
}

/// Canada Post: 11/13 characters with a two-letter prefix and "CA" suffix,
/// or 16 digits. No check digit.
pub fn canada_post(tracking_number: &str) -> bool {
    let bytes = tracking_number.as_bytes();
    match bytes.len() {
        11 | 13 => is_alpha(&bytes[..2]) && bytes.ends_with(b"CA"),
        16 => is_digits(bytes),
        _ => false,
    }
}

/// DHL Express air waybills: 10 or 11 digits.
pub fn dhl(tracking_number: &str) -> bool {
    let bytes = tracking_number.as_bytes();
    matches!(bytes.len(), 10 | 11) && is_digits(bytes)
}

/// Prestige Delivery: "P", a letter, then eight digits.
pub fn prestige(tracking_number: &str) -> bool {
    let bytes = tracking_number.as_bytes();
    bytes.len() == 10
        && bytes[0] == b'P'
        && bytes[1].is_ascii_alphabetic()
        && is_digits(&bytes[2..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flip_last(tn: &str) -> String {
        let (head, last) = tn.split_at(tn.len() - 1);
        let d = last.parse::<u32>().unwrap();
        format!("{}{}", head, (d + 1) % 10)
    }

    #[test]
    fn test_ups_known_number() {
        assert!(ups_1z("1Z12345E0205271688"));
        assert!(ups_1z("1Z12345E6605272234"));
        assert!(!ups_1z(&flip_last("1Z12345E0205271688")));
    }

    #[test]
    fn test_ups_rejects_shape_violations() {
        assert!(!ups_1z("1Z12345E020527168"));
        assert!(!ups_1z("2Z12345E0205271688"));
        assert!(!ups_1z("1Z12345E02052716-8"));
        assert!(!ups_1z("1Z12345E020527168X"));
    }

    #[test]
    fn test_ups_mail_innovations_is_format_only() {
        assert!(ups("123456789012345678"));
        assert!(!ups("12345678901234567A"));
    }

    #[test]
    fn test_fedex_express_checksum() {
        assert!(fedex_express("986578788855"));
        assert!(fedex_express("477179081230"));
        assert!(!fedex_express(&flip_last("986578788855")));
    }

    #[test]
    fn test_fedex_express_single_digit_corruption() {
        let valid = "986578788855";
        for idx in 0..11 {
            let mut bytes = valid.as_bytes().to_vec();
            bytes[idx] = b'0' + (bytes[idx] - b'0' + 1) % 10;
            let corrupted = String::from_utf8(bytes).unwrap();
            assert!(!fedex_express(&corrupted), "{} should not validate", corrupted);
        }
    }

    #[test]
    fn test_fedex_ground96_forms() {
        assert!(fedex_ground96("019343586678996"));
        assert!(fedex("019343586678996"));
        assert!(fedex("9611020019343586678996"));
        assert!(!fedex(&flip_last("9611020019343586678996")));
    }

    #[test]
    fn test_fedex_ssc18() {
        assert!(fedex("0000123456789012345675"));
        assert!(!fedex(&flip_last("0000123456789012345675")));
    }

    #[test]
    fn test_usps_shapes() {
        assert!(usps("EA123456789US"));
        assert!(!usps("E1123456789US"));
        assert!(usps("03071790000523483741"));
        assert!(!usps("13071790000523483741"));
        assert!(usps("9205590164917312751089"));
        assert!(!usps("9611020019343586678996"));
        assert!(!usps("9101123456789012345678"));
        assert!(usps("420221539101026837331000039521"));
    }

    #[test]
    fn test_22_digit_overlap() {
        let smart_post = "9205590164917312751089";
        assert!(usps(smart_post));
        assert!(fedex(smart_post));
        assert!(fedex("9101123456789012345678"));
        assert!(!usps("9101123456789012345678"));
    }

    #[test]
    fn test_canada_post_and_dhl_and_prestige() {
        assert!(canada_post("RR123456785CA"));
        assert!(canada_post("AB1234567CA"));
        assert!(canada_post("1234567890123456"));
        assert!(!canada_post("RR123456785US"));
        assert!(dhl("1234567890"));
        assert!(dhl("12345678901"));
        assert!(!dhl("123456789"));
        assert!(prestige("PA12345678"));
        assert!(!prestige("QA12345678"));
        assert!(!prestige("P112345678"));
    }

    #[test]
    fn test_identify_is_total() {
        let inputs = ["", "1", "1Z", "ü", "1Zéééééééééééééééé", "\0\0\0\0\0\0\0\0\0\0", "ABCDEFGHIJKLMNOPQRSTUV"];
        for input in inputs {
            for check in [ups, fedex, usps, canada_post, dhl, prestige] {
                let first = check(input);
                assert_eq!(first, check(input));
            }
        }
    }
}
