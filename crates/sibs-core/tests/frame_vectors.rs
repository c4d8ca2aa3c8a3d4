//! Frame decode vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use sibs_core::protocol::messages::PaymentData;
use sibs_core::protocol::{decode, decode_envelope, Decoded, Message};

use vector_loader::load;

#[test]
fn frame_vectors() {
    let files = [
        "status_response.json",
        "payment_response.json",
        "pairing_notification.json",
        "tx_request_no_version.json",
        "unknown_type.json",
        "missing_type.json",
        "bad_version.json",
        "shape_mismatch.json",
        "not_json.json",
    ];

    for f in files {
        let v = load(f);
        let res = decode(&v.raw());

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let decoded = res.expect("expected ok frame");
        if v.expect_unrecognized {
            assert!(matches!(decoded, Decoded::Unrecognized(_)), "vector={}", v.description);
            continue;
        }

        let Decoded::Message(msg) = decoded else {
            panic!("vector={}: unexpectedly unrecognized", v.description);
        };
        let ex = v.expect.expect("missing expect block");
        assert_eq!(msg.message_type().as_str(), ex["type"].as_str().unwrap(), "vector={}", v.description);

        match msg {
            Message::StatusResponse(s) => {
                assert_eq!(s.has_credentials, ex["hasCredentials"].as_bool().unwrap());
            }
            Message::ProcessPaymentResponse(p) => {
                assert_eq!(p.transaction_id.as_deref(), ex["transactionId"].as_str());
                let data: PaymentData = p.payment_data.expect("payment data");
                assert_eq!(data.server_id.as_deref(), ex["serverId"].as_str());
            }
            Message::PairingNotification(n) => {
                assert_eq!(n.pairing_status.as_deref(), ex["pairingStatus"].as_str());
                assert!(n.is_success());
            }
            _ => {}
        }
    }
}

#[test]
fn envelope_only_reads_header() {
    let v = load("payment_response.json");
    let header = decode_envelope(&v.raw()).unwrap();
    assert_eq!(header.version, "V_1");
    assert_eq!(header.type_tag.as_deref(), Some("PROCESS_PAYMENT_RESPONSE"));
    assert!(!header.is_unrecognized());
}
