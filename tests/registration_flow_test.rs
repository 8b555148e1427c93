//! End-to-end registration workflow tests against a real database

mod helpers;

use assert_matches::assert_matches;
use serial_test::serial;

use evreg::models::lifecycle::ActivationState;
use evreg::models::participant::{FlagSelection, RegistrationRequest};
use evreg::services::NotificationKind;
use evreg::utils::errors::EvregError;

use helpers::{extract_token, seed_flag_offer, seed_offer, TestContext};

fn request(offer_id: i64, contact_id: i64, selections: Vec<FlagSelection>) -> RegistrationRequest {
    RegistrationRequest {
        offer_id,
        contact_id: Some(contact_id),
        selections,
        notes: None,
        manager_override: false,
    }
}

#[tokio::test]
#[serial]
async fn test_registration_and_activation_round_trip() {
    let ctx = TestContext::new().await;
    let (_, offer) = seed_offer(&ctx, "camp-2026", 2, 2, Some(1000), Some(200)).await;
    let tshirt =
        seed_flag_offer(&ctx, offer.id, "tshirt-l", 1, Some(1), 10, 10, Some(150)).await;

    let participant = ctx
        .services
        .registration_service
        .register(request(
            offer.id,
            101,
            vec![FlagSelection {
                flag_offer_id: tshirt.id,
                count: 1,
            }],
        ))
        .await
        .expect("registration");

    // Money cache: base 1000/200 plus the 150 flag delta without a deposit
    assert_eq!(participant.price_total, 1150);
    assert_eq!(participant.deposit_total, 200);
    assert_eq!(participant.paid, 0);
    assert_eq!(participant.activation_state, ActivationState::Unconfirmed);
    assert_eq!(participant.variable_symbol.len(), 10);

    // Usage counters derived from the participant count
    let stored_offer = ctx
        .services
        .db
        .offers
        .find_by_id(offer.id, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_offer.usage.base(), 1);
    let stored_flag = ctx
        .services
        .db
        .flags
        .find_flag_offer(tshirt.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_flag.flag_offer.usage.base(), 1);

    // One activation request went out; confirm with its token
    let messages = ctx.gateway.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind, NotificationKind::ActivationRequest);
    let token = extract_token(&messages[0]);

    let activated = ctx
        .services
        .registration_service
        .process_token(participant.id, &token)
        .await
        .expect("activation");
    assert_eq!(activated.activation_state, ActivationState::Activated);

    let messages = ctx.gateway.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].kind, NotificationKind::ActivationConfirmed);

    // Re-presenting the consumed token fails cleanly and fires nothing
    let replay = ctx
        .services
        .registration_service
        .process_token(participant.id, &token)
        .await;
    assert_matches!(replay, Err(EvregError::TokenInvalid(_)));
    assert_eq!(ctx.gateway.messages().len(), 2);
}

#[tokio::test]
#[serial]
async fn test_base_capacity_blocks_public_but_not_manager() {
    let ctx = TestContext::new().await;
    let (_, offer) = seed_offer(&ctx, "workshop", 1, 2, None, None).await;

    ctx.services
        .registration_service
        .register(request(offer.id, 201, vec![]))
        .await
        .expect("first registration fits the base tier");

    // Base tier is full for the public
    let refused = ctx
        .services
        .registration_service
        .register(request(offer.id, 202, vec![]))
        .await;
    assert_matches!(refused, Err(EvregError::EventCapacityExceeded { .. }));

    // A manager may consume the overflow tier
    let mut override_request = request(offer.id, 202, vec![]);
    override_request.manager_override = true;
    ctx.services
        .registration_service
        .register(override_request)
        .await
        .expect("manager registration uses the overflow tier");

    // Overflow tier is now full as well, even for managers
    let mut third = request(offer.id, 203, vec![]);
    third.manager_override = true;
    let refused = ctx.services.registration_service.register(third).await;
    assert_matches!(refused, Err(EvregError::EventCapacityExceeded { .. }));
}

#[tokio::test]
#[serial]
async fn test_mandatory_flag_selection_enforced() {
    let ctx = TestContext::new().await;
    let (_, offer) = seed_offer(&ctx, "exchange", 10, 10, Some(500), None).await;
    let tshirt = seed_flag_offer(&ctx, offer.id, "tshirt-m", 1, Some(1), 10, 10, None).await;

    // Leaving a min=1 flag out is the same as selecting zero
    let missing = ctx
        .services
        .registration_service
        .register(request(offer.id, 301, vec![]))
        .await;
    assert_matches!(missing, Err(EvregError::FlagOutOfRange { count: 0, .. }));

    let too_many = ctx
        .services
        .registration_service
        .register(request(
            offer.id,
            301,
            vec![FlagSelection {
                flag_offer_id: tshirt.id,
                count: 2,
            }],
        ))
        .await;
    assert_matches!(too_many, Err(EvregError::FlagOutOfRange { count: 2, .. }));

    ctx.services
        .registration_service
        .register(request(
            offer.id,
            301,
            vec![FlagSelection {
                flag_offer_id: tshirt.id,
                count: 1,
            }],
        ))
        .await
        .expect("exactly one unit is valid");
}

#[tokio::test]
#[serial]
async fn test_prerequisite_offer_required() {
    let ctx = TestContext::new().await;
    let (_, party) = seed_offer(&ctx, "party-pass", 10, 10, Some(300), None).await;
    let (_, full_pass) = seed_offer(&ctx, "full-pass", 10, 10, Some(2000), None).await;

    // Make the party pass require a full pass first
    sqlx::query("UPDATE registration_offers SET required_offer_id = $1 WHERE id = $2")
        .bind(full_pass.id)
        .bind(party.id)
        .execute(&ctx.db.pool)
        .await
        .unwrap();

    let refused = ctx
        .services
        .registration_service
        .register(request(party.id, 401, vec![]))
        .await;
    assert_matches!(refused, Err(EvregError::RequiredOfferNotSatisfied { .. }));

    ctx.services
        .registration_service
        .register(request(full_pass.id, 401, vec![]))
        .await
        .expect("prerequisite registration");
    ctx.services
        .registration_service
        .register(request(party.id, 401, vec![]))
        .await
        .expect("party pass once the prerequisite is held");
}

#[tokio::test]
#[serial]
async fn test_inactive_offer_rejected_for_public() {
    let ctx = TestContext::new().await;
    let (_, offer) = seed_offer(&ctx, "early-bird", 10, 10, None, None).await;

    sqlx::query("UPDATE registration_offers SET start_date_time = NOW() + INTERVAL '1 day' WHERE id = $1")
        .bind(offer.id)
        .execute(&ctx.db.pool)
        .await
        .unwrap();

    let refused = ctx
        .services
        .registration_service
        .register(request(offer.id, 501, vec![]))
        .await;
    assert_matches!(refused, Err(EvregError::OfferInactive(_)));

    let mut managed = request(offer.id, 501, vec![]);
    managed.manager_override = true;
    ctx.services
        .registration_service
        .register(managed)
        .await
        .expect("manager registration before the window opens");
}

#[tokio::test]
#[serial]
async fn test_update_flags_excludes_own_usage() {
    let ctx = TestContext::new().await;
    let (_, offer) = seed_offer(&ctx, "retreat", 5, 5, Some(1000), Some(200)).await;
    let dinner = seed_flag_offer(&ctx, offer.id, "dinner", 0, Some(5), 3, 3, Some(250)).await;

    let participant = ctx
        .services
        .registration_service
        .register(request(
            offer.id,
            801,
            vec![FlagSelection {
                flag_offer_id: dinner.id,
                count: 2,
            }],
        ))
        .await
        .expect("registration");
    assert_eq!(participant.price_total, 1500);

    // Growing to the full flag capacity works because the participant's own
    // units do not count against it
    let updated = ctx
        .services
        .registration_service
        .update_flags(
            participant.id,
            &[FlagSelection {
                flag_offer_id: dinner.id,
                count: 3,
            }],
            false,
        )
        .await
        .expect("grow to capacity");
    assert_eq!(updated.price_total, 1750);

    let stored_flag = ctx
        .services
        .db
        .flags
        .find_flag_offer(dinner.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_flag.flag_offer.usage.base(), 3);

    // Re-submitting the same selections is accepted, not a capacity failure
    let unchanged = ctx
        .services
        .registration_service
        .update_flags(
            participant.id,
            &[FlagSelection {
                flag_offer_id: dinner.id,
                count: 3,
            }],
            false,
        )
        .await
        .expect("same selections accepted");
    assert_eq!(unchanged.price_total, 1750);

    // One unit past the flag capacity is refused and nothing changes
    let refused = ctx
        .services
        .registration_service
        .update_flags(
            participant.id,
            &[FlagSelection {
                flag_offer_id: dinner.id,
                count: 4,
            }],
            false,
        )
        .await;
    assert_matches!(refused, Err(EvregError::FlagCapacityExceeded { .. }));

    let stored = ctx
        .services
        .db
        .participants
        .find_by_id(participant.id, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.price_total, 1750);
    let stored_flag = ctx
        .services
        .db
        .flags
        .find_flag_offer(dinner.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_flag.flag_offer.usage.base(), 3);

    // Dropping every selection releases usage and money
    let reduced = ctx
        .services
        .registration_service
        .update_flags(participant.id, &[], false)
        .await
        .expect("drop all selections");
    assert_eq!(reduced.price_total, 1000);
    let stored_flag = ctx
        .services
        .db
        .flags
        .find_flag_offer(dinner.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_flag.flag_offer.usage.base(), 0);
}

#[tokio::test]
#[serial]
async fn test_removal_releases_usage() {
    let ctx = TestContext::new().await;
    let (_, offer) = seed_offer(&ctx, "weekend", 2, 2, None, None).await;
    let dinner = seed_flag_offer(&ctx, offer.id, "dinner", 0, Some(2), 5, 5, Some(250)).await;

    let participant = ctx
        .services
        .registration_service
        .register(request(
            offer.id,
            601,
            vec![FlagSelection {
                flag_offer_id: dinner.id,
                count: 2,
            }],
        ))
        .await
        .expect("registration");

    let stored_flag = ctx
        .services
        .db
        .flags
        .find_flag_offer(dinner.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_flag.flag_offer.usage.base(), 2);

    ctx.services
        .registration_service
        .remove_participant(participant.id)
        .await
        .expect("removal");

    let stored_offer = ctx
        .services
        .db
        .offers
        .find_by_id(offer.id, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_offer.usage.base(), 0);

    let stored_flag = ctx
        .services
        .db
        .flags
        .find_flag_offer(dinner.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_flag.flag_offer.usage.base(), 0);

    // Recomputing again changes nothing
    ctx.services
        .offer_service
        .update_usage(offer.id)
        .await
        .expect("idempotent recompute");
    let stored_offer = ctx
        .services
        .db
        .offers
        .find_by_id(offer.id, false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored_offer.usage.base(), 0);
}
