use evid_canonical::{Canonicalizer, EventId, IdEncoding, NumberPolicy, ReferenceHash};
use serde_json::json;

fn main() {
    let canonicalizer = Canonicalizer::new(NumberPolicy::Strict);
    let event = json!({
        "type": "m.room.message",
        "room_id": "!room:example.org",
        "sender": "@alice:example.org",
        "origin_server_ts": 1700000000000u64,
        "depth": 1,
        "prev_events": [],
        "auth_events": [],
        "content": {}
    });

    match canonicalizer.canonicalize(&event) {
        Ok(form) => {
            println!("{}", form.as_str());
            let hash = ReferenceHash::of(form.as_bytes());
            for encoding in [IdEncoding::Base64Unpadded, IdEncoding::Base64UrlUnpadded] {
                println!("{:<20} {}", encoding, EventId::from_hash(&hash, encoding));
            }
        }
        Err(err) => {
            eprintln!("canonicalization failed: {}", err);
            std::process::exit(1);
        }
    }
}
