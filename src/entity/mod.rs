pub mod action;
pub mod blockdev;
pub mod report;
pub mod stage;

use humanize_rs::bytes;

use crate::errors::VliError;

pub fn parse_human_bytes(s: &str) -> Result<u64, VliError> {
    (s.to_lowercase())
        .parse::<bytes::Bytes>()
        .map(|b| b.size() as u64)
        .map_err(|err| VliError::BadManifest(format!("bad byte unit string {s}: {err}")))
}

#[test]
#[rustfmt::skip]
fn test_parse_human_bytes() {
    let valids = vec![
        ("2048MiB", 2048 * 1024 * 1024),
        ("2048 mib", 2048 * 1024 * 1024),
        ("40GiB", 40 * 1024 * 1024 * 1024),
        ("1Ki", 1024),
        ("0g", 0),
    ];

    for (v, expected) in valids {
        match parse_human_bytes(v) {
            Ok(size) => assert_eq!(size, expected, "unexpected size for {v}"),
            Err(err) => panic!("{v} should be valid, but was invalid: {err}"),
        }
    }

    let invalids = vec![
        "MiB", "gb", "-1 GiB", "0.5 MiB", "10.29 GiB",
        "kibibyte", "megabytes", "200000000000TiB",
    ];

    for v in invalids {
        if let Ok(size) = parse_human_bytes(v) {
            panic!("{v} should be invalid, but got {size}");
        }
    }
}
