//! Envelope decode vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use wsrelay_core::Envelope;

use vector_loader::load;

#[test]
fn envelope_vectors() {
    let files = [
        "chat_full.json",
        "sender_only.json",
        "action_alias.json",
        "unknown_fields.json",
        "bad_kind.json",
        "missing_sender.json",
        "wrong_contents_type.json",
        "wrong_timestamp_type.json",
        "array_payload.json",
        "not_utf8.json",
        "empty.json",
    ];

    for f in files {
        let v = load(f);
        let raw = v.frame.decode();
        let res = Envelope::decode(&raw);

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let env = res.expect("expected ok envelope");
        let ex = v.expect.expect("missing expect block");

        assert_eq!(env.sender(), ex["sender"].as_str().unwrap(), "vector={}", v.description);
        assert_eq!(env.kind().as_str(), ex["kind"].as_str().unwrap(), "vector={}", v.description);
        assert_eq!(env.contents(), ex["contents"].as_str().unwrap(), "vector={}", v.description);
        assert_eq!(env.timestamp(), ex["timestamp"].as_i64().unwrap(), "vector={}", v.description);
    }
}
