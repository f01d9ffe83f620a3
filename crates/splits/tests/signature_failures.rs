mod common;

use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use common::{engine_with_db, settings, sign_intent, MockGateway};
use splits::engine::{
    ApproveIntentRequest, CreateSplitRequest, LegRequest, SettleItemRequest, SettleRequest,
    SubmitSignatureRequest,
};
use splits::{ApproveSplit, SignatureStatus, SplitsError};

fn one_leg_split(wallet: &PrivateKeySigner, amount: u64) -> CreateSplitRequest {
    CreateSplitRequest {
        payer: format!("{}", Address::new([0xa0; 20])),
        token: format!("{}", Address::new([0xb0; 20])),
        legs: vec![LegRequest {
            participant: format!("{}", wallet.address()),
            amount: amount.to_string(),
        }],
        deadline: None,
        meta_hash: None,
        create_onchain: false,
    }
}

fn intent_req(wallet: &PrivateKeySigner, deadline: Option<&str>) -> ApproveIntentRequest {
    ApproveIntentRequest {
        participant: format!("{}", wallet.address()),
        deadline: deadline.map(str::to_string),
    }
}

#[tokio::test]
async fn wrong_signer_is_rejected_and_row_stays_pending() {
    let (engine, db) = engine_with_db(MockGateway::default());
    let wallet = PrivateKeySigner::random();
    let imposter = PrivateKeySigner::random();

    let resp = engine.create_split(one_leg_split(&wallet, 12_500_000)).await.unwrap();
    let payload = engine
        .approve_intent(resp.id, intent_req(&wallet, None))
        .await
        .unwrap();

    let signature = sign_intent(&payload, &imposter);
    let err = engine
        .submit_signature(
            resp.id,
            SubmitSignatureRequest {
                participant: format!("{}", wallet.address()),
                amount: "12500000".to_string(),
                salt: payload.message.salt.clone(),
                deadline: None,
                signature,
            },
        )
        .await
        .unwrap_err();

    match err {
        SplitsError::InvalidInput(msg) => assert!(msg.contains("differs from participant")),
        other => panic!("expected invalid input, got {other:?}"),
    }

    let rows = db.signatures_for_split(resp.id).unwrap();
    assert_eq!(rows[0].status, SignatureStatus::Pending);
}

#[tokio::test]
async fn expired_deadline_marks_row_expired() {
    let (engine, db) = engine_with_db(MockGateway::default());
    let wallet = PrivateKeySigner::random();

    let resp = engine.create_split(one_leg_split(&wallet, 1_000)).await.unwrap();
    // Unix second 5 is long past.
    let payload = engine
        .approve_intent(resp.id, intent_req(&wallet, Some("5")))
        .await
        .unwrap();
    assert_eq!(payload.message.deadline, "5");

    let signature = sign_intent(&payload, &wallet);
    let err = engine
        .submit_signature(
            resp.id,
            SubmitSignatureRequest {
                participant: format!("{}", wallet.address()),
                amount: "1000".to_string(),
                salt: payload.message.salt.clone(),
                deadline: None,
                signature,
            },
        )
        .await
        .unwrap_err();

    match err {
        SplitsError::InvalidInput(msg) => assert!(msg.contains("expired")),
        other => panic!("expected invalid input, got {other:?}"),
    }

    let rows = db.signatures_for_split(resp.id).unwrap();
    assert_eq!(rows[0].status, SignatureStatus::Expired);
    assert_eq!(rows[0].reason.as_deref(), Some("expired before validation"));
}

#[tokio::test]
async fn amount_mismatch_is_rejected() {
    let (engine, _db) = engine_with_db(MockGateway::default());
    let wallet = PrivateKeySigner::random();

    let resp = engine.create_split(one_leg_split(&wallet, 1_000)).await.unwrap();
    let payload = engine
        .approve_intent(resp.id, intent_req(&wallet, None))
        .await
        .unwrap();

    let signature = sign_intent(&payload, &wallet);
    let err = engine
        .submit_signature(
            resp.id,
            SubmitSignatureRequest {
                participant: format!("{}", wallet.address()),
                amount: "999".to_string(),
                salt: payload.message.salt.clone(),
                deadline: None,
                signature,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SplitsError::InvalidInput(_)));
}

#[tokio::test]
async fn unknown_salt_is_not_found() {
    let (engine, _db) = engine_with_db(MockGateway::default());
    let wallet = PrivateKeySigner::random();

    let resp = engine.create_split(one_leg_split(&wallet, 1_000)).await.unwrap();
    let err = engine
        .submit_signature(
            resp.id,
            SubmitSignatureRequest {
                participant: format!("{}", wallet.address()),
                amount: "1000".to_string(),
                salt: format!("0x{}", alloy::hex::encode([0x99; 32])),
                deadline: None,
                signature: format!("0x{}", alloy::hex::encode([0xab; 65])),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SplitsError::NotFound(_)));
}

#[tokio::test]
async fn deadline_mismatch_is_rejected() {
    let (engine, _db) = engine_with_db(MockGateway::default());
    let wallet = PrivateKeySigner::random();

    let resp = engine.create_split(one_leg_split(&wallet, 1_000)).await.unwrap();
    let far_future = "4000000000";
    let payload = engine
        .approve_intent(resp.id, intent_req(&wallet, Some(far_future)))
        .await
        .unwrap();

    let signature = sign_intent(&payload, &wallet);
    let err = engine
        .submit_signature(
            resp.id,
            SubmitSignatureRequest {
                participant: format!("{}", wallet.address()),
                amount: "1000".to_string(),
                salt: payload.message.salt.clone(),
                deadline: Some("4000000001".to_string()),
                signature,
            },
        )
        .await
        .unwrap_err();

    match err {
        SplitsError::InvalidInput(msg) => assert!(msg.contains("deadline")),
        other => panic!("expected invalid input, got {other:?}"),
    }
}

#[tokio::test]
async fn intent_deadline_must_not_exceed_split_deadline() {
    let (engine, _db) = engine_with_db(MockGateway::default());
    let wallet = PrivateKeySigner::random();

    let mut req = one_leg_split(&wallet, 1_000);
    req.deadline = Some("4000000000".to_string());
    let resp = engine.create_split(req).await.unwrap();

    let err = engine
        .approve_intent(resp.id, intent_req(&wallet, Some("4000000001")))
        .await
        .unwrap_err();
    assert!(matches!(err, SplitsError::InvalidInput(_)));

    // "0" asks for no expiry, which also outlives the split deadline.
    let err = engine
        .approve_intent(resp.id, intent_req(&wallet, Some("0")))
        .await
        .unwrap_err();
    assert!(matches!(err, SplitsError::InvalidInput(_)));

    // Earlier deadlines are fine, and the split deadline is inherited when
    // the client sends none.
    engine
        .approve_intent(resp.id, intent_req(&wallet, Some("3999999999")))
        .await
        .unwrap();
    let inherited = engine
        .approve_intent(resp.id, intent_req(&wallet, None))
        .await
        .unwrap();
    assert_eq!(inherited.message.deadline, "4000000000");
}

#[tokio::test]
async fn local_id_signature_fails_once_onchain_id_is_minted() {
    let gateway = MockGateway {
        minted_split_id: Some(U256::from(42u64)),
        ..Default::default()
    };
    let (engine, _db) = engine_with_db(gateway);
    let wallet = PrivateKeySigner::random();

    let mut req = one_leg_split(&wallet, 1_000);
    req.create_onchain = true;
    let resp = engine.create_split(req).await.unwrap();

    let payload = engine
        .approve_intent(resp.id, intent_req(&wallet, None))
        .await
        .unwrap();

    // Forge the message with the stale local id instead of the minted one.
    let stale = ApproveSplit {
        participant: wallet.address(),
        splitId: U256::from(resp.id as u64),
        token: payload.message.token.parse().unwrap(),
        payer: payload.message.payer.parse().unwrap(),
        amount: payload.message.amount.parse().unwrap(),
        deadline: payload.message.deadline.parse().unwrap(),
        salt: payload.message.salt.parse().unwrap(),
    };
    let digest = splits::eip712::signing_hash(&settings(), &stale);
    let sig = wallet.sign_hash_sync(&digest).unwrap();

    let err = engine
        .submit_signature(
            resp.id,
            SubmitSignatureRequest {
                participant: format!("{}", wallet.address()),
                amount: "1000".to_string(),
                salt: payload.message.salt.clone(),
                deadline: None,
                signature: format!("0x{}", alloy::hex::encode(sig.as_bytes())),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SplitsError::InvalidInput(_)));
}

#[tokio::test]
async fn only_one_signature_becomes_valid_per_participant() {
    let (engine, db) = engine_with_db(MockGateway::default());
    let wallet = PrivateKeySigner::random();

    let resp = engine.create_split(one_leg_split(&wallet, 1_000)).await.unwrap();
    let first = engine
        .approve_intent(resp.id, intent_req(&wallet, None))
        .await
        .unwrap();
    let second = engine
        .approve_intent(resp.id, intent_req(&wallet, None))
        .await
        .unwrap();

    let signature = sign_intent(&first, &wallet);
    engine
        .submit_signature(
            resp.id,
            SubmitSignatureRequest {
                participant: format!("{}", wallet.address()),
                amount: "1000".to_string(),
                salt: first.message.salt.clone(),
                deadline: None,
                signature,
            },
        )
        .await
        .unwrap();

    // The re-issued intent can no longer be accepted.
    let signature = sign_intent(&second, &wallet);
    let err = engine
        .submit_signature(
            resp.id,
            SubmitSignatureRequest {
                participant: format!("{}", wallet.address()),
                amount: "1000".to_string(),
                salt: second.message.salt.clone(),
                deadline: None,
                signature,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SplitsError::Conflict(_)));

    let valid: Vec<_> = db
        .signatures_for_split(resp.id)
        .unwrap()
        .into_iter()
        .filter(|s| s.status == SignatureStatus::Valid)
        .collect();
    assert_eq!(valid.len(), 1);

    // The superseded PENDING row does not block settlement.
    engine
        .settle(resp.id, SettleRequest { items: None })
        .await
        .unwrap();
}

#[tokio::test]
async fn duplicate_settle_items_for_one_participant_are_rejected() {
    let (engine, db) = engine_with_db(MockGateway::default());
    let alice = PrivateKeySigner::random();
    let bob = PrivateKeySigner::random();

    let resp = engine
        .create_split(CreateSplitRequest {
            payer: format!("{}", Address::new([0xa0; 20])),
            token: format!("{}", Address::new([0xb0; 20])),
            legs: vec![
                LegRequest {
                    participant: format!("{}", alice.address()),
                    amount: "100".to_string(),
                },
                LegRequest {
                    participant: format!("{}", bob.address()),
                    amount: "200".to_string(),
                },
            ],
            deadline: None,
            meta_hash: None,
            create_onchain: false,
        })
        .await
        .unwrap();

    let mut items = Vec::new();
    for (wallet, amount) in [(&alice, "100"), (&bob, "200")] {
        let payload = engine
            .approve_intent(resp.id, intent_req(wallet, None))
            .await
            .unwrap();
        let signature = sign_intent(&payload, wallet);
        engine
            .submit_signature(
                resp.id,
                SubmitSignatureRequest {
                    participant: format!("{}", wallet.address()),
                    amount: amount.to_string(),
                    salt: payload.message.salt.clone(),
                    deadline: None,
                    signature: signature.clone(),
                },
            )
            .await
            .unwrap();
        items.push(SettleItemRequest {
            participant: format!("{}", wallet.address()),
            amount: amount.to_string(),
            deadline: None,
            salt: payload.message.salt.clone(),
            signature,
        });
    }

    // Two copies of the first leg's item pass the length gate but must not
    // shadow the second leg.
    let err = engine
        .settle(
            resp.id,
            SettleRequest {
                items: Some(vec![items[0].clone(), items[0].clone()]),
            },
        )
        .await
        .unwrap_err();
    match err {
        SplitsError::InvalidInput(msg) => assert!(msg.contains("duplicate participant")),
        other => panic!("expected invalid input, got {other:?}"),
    }
    assert!(!db.get_split(resp.id).unwrap().unwrap().settled);

    // The correct item set still settles.
    engine
        .settle(resp.id, SettleRequest { items: Some(items) })
        .await
        .unwrap();
    assert!(db.get_split(resp.id).unwrap().unwrap().settled);
}

#[tokio::test]
async fn settle_rejects_signature_count_mismatch() {
    let (engine, _db) = engine_with_db(MockGateway::default());
    let alice = PrivateKeySigner::random();
    let bob = PrivateKeySigner::random();

    let resp = engine
        .create_split(CreateSplitRequest {
            payer: format!("{}", Address::new([0xa0; 20])),
            token: format!("{}", Address::new([0xb0; 20])),
            legs: vec![
                LegRequest {
                    participant: format!("{}", alice.address()),
                    amount: "100".to_string(),
                },
                LegRequest {
                    participant: format!("{}", bob.address()),
                    amount: "200".to_string(),
                },
            ],
            deadline: None,
            meta_hash: None,
            create_onchain: false,
        })
        .await
        .unwrap();

    let payload = engine
        .approve_intent(resp.id, intent_req(&alice, None))
        .await
        .unwrap();
    let signature = sign_intent(&payload, &alice);
    engine
        .submit_signature(
            resp.id,
            SubmitSignatureRequest {
                participant: format!("{}", alice.address()),
                amount: "100".to_string(),
                salt: payload.message.salt.clone(),
                deadline: None,
                signature,
            },
        )
        .await
        .unwrap();

    let err = engine
        .settle(resp.id, SettleRequest { items: None })
        .await
        .unwrap_err();
    match err {
        SplitsError::InvalidInput(msg) => assert!(msg.contains("signature count mismatch")),
        other => panic!("expected invalid input, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_settle_leaves_all_state_untouched() {
    let gateway = MockGateway {
        fail_settle: true,
        ..Default::default()
    };
    let (engine, db) = engine_with_db(gateway);
    let wallet = PrivateKeySigner::random();

    let resp = engine.create_split(one_leg_split(&wallet, 1_000)).await.unwrap();
    let payload = engine
        .approve_intent(resp.id, intent_req(&wallet, None))
        .await
        .unwrap();
    let signature = sign_intent(&payload, &wallet);
    engine
        .submit_signature(
            resp.id,
            SubmitSignatureRequest {
                participant: format!("{}", wallet.address()),
                amount: "1000".to_string(),
                salt: payload.message.salt.clone(),
                deadline: None,
                signature,
            },
        )
        .await
        .unwrap();

    let err = engine
        .settle(resp.id, SettleRequest { items: None })
        .await
        .unwrap_err();
    assert!(matches!(err, SplitsError::ChainFailed(_)));

    let split = db.get_split(resp.id).unwrap().unwrap();
    assert!(!split.settled);
    let participant = db
        .find_participant(resp.id, &format!("{}", wallet.address()))
        .unwrap()
        .unwrap();
    assert!(participant.used_onchain_at.is_none());
    assert_eq!(
        db.signatures_for_split(resp.id).unwrap()[0].status,
        SignatureStatus::Valid
    );
}

#[tokio::test]
async fn settled_split_rejects_further_operations() {
    let (engine, _db) = engine_with_db(MockGateway::default());
    let wallet = PrivateKeySigner::random();

    let resp = engine.create_split(one_leg_split(&wallet, 1_000)).await.unwrap();
    let payload = engine
        .approve_intent(resp.id, intent_req(&wallet, None))
        .await
        .unwrap();
    let signature = sign_intent(&payload, &wallet);
    engine
        .submit_signature(
            resp.id,
            SubmitSignatureRequest {
                participant: format!("{}", wallet.address()),
                amount: "1000".to_string(),
                salt: payload.message.salt.clone(),
                deadline: None,
                signature: signature.clone(),
            },
        )
        .await
        .unwrap();
    engine
        .settle(resp.id, SettleRequest { items: None })
        .await
        .unwrap();

    let err = engine
        .settle(resp.id, SettleRequest { items: None })
        .await
        .unwrap_err();
    assert!(matches!(err, SplitsError::Conflict(_)));

    let err = engine
        .approve_intent(resp.id, intent_req(&wallet, None))
        .await
        .unwrap_err();
    assert!(matches!(err, SplitsError::Conflict(_)));

    let err = engine
        .submit_signature(
            resp.id,
            SubmitSignatureRequest {
                participant: format!("{}", wallet.address()),
                amount: "1000".to_string(),
                salt: payload.message.salt.clone(),
                deadline: None,
                signature,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SplitsError::Conflict(_)));
}

#[tokio::test]
async fn create_split_input_validation() {
    let (engine, _db) = engine_with_db(MockGateway::default());
    let wallet = PrivateKeySigner::random();

    // Empty leg list.
    let mut req = one_leg_split(&wallet, 1_000);
    req.legs.clear();
    assert!(matches!(
        engine.create_split(req).await.unwrap_err(),
        SplitsError::InvalidInput(_)
    ));

    // Zero amount.
    let mut req = one_leg_split(&wallet, 1_000);
    req.legs[0].amount = "0".to_string();
    assert!(matches!(
        engine.create_split(req).await.unwrap_err(),
        SplitsError::InvalidInput(_)
    ));

    // Malformed payer address.
    let mut req = one_leg_split(&wallet, 1_000);
    req.payer = "not-an-address".to_string();
    assert!(matches!(
        engine.create_split(req).await.unwrap_err(),
        SplitsError::InvalidInput(_)
    ));

    // Duplicate participant.
    let mut req = one_leg_split(&wallet, 1_000);
    req.legs.push(req.legs[0].clone());
    assert!(matches!(
        engine.create_split(req).await.unwrap_err(),
        SplitsError::Conflict(_)
    ));
}

#[tokio::test]
async fn unknown_split_is_not_found() {
    let (engine, _db) = engine_with_db(MockGateway::default());

    assert!(matches!(
        engine.get_split(999).await.unwrap_err(),
        SplitsError::NotFound(_)
    ));
    assert!(matches!(
        engine
            .settle(999, SettleRequest { items: None })
            .await
            .unwrap_err(),
        SplitsError::NotFound(_)
    ));
}

#[tokio::test]
async fn malformed_signature_hex_is_rejected() {
    let (engine, _db) = engine_with_db(MockGateway::default());
    let wallet = PrivateKeySigner::random();

    let resp = engine.create_split(one_leg_split(&wallet, 1_000)).await.unwrap();
    let payload = engine
        .approve_intent(resp.id, intent_req(&wallet, None))
        .await
        .unwrap();

    // 64 bytes instead of 65.
    let err = engine
        .submit_signature(
            resp.id,
            SubmitSignatureRequest {
                participant: format!("{}", wallet.address()),
                amount: "1000".to_string(),
                salt: payload.message.salt.clone(),
                deadline: None,
                signature: format!("0x{}", alloy::hex::encode([0xab; 64])),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SplitsError::InvalidInput(_)));
}
