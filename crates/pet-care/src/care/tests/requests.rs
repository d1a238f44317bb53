use super::common::*;
use crate::care::domain::{DayOfWeek, RequestId, RequestKind, ScheduledWalk, WalkId};
use crate::care::error::CareError;
use crate::care::reconciler::{CaregiverCalendar, ScheduleReconciler};
use crate::care::repository::{AvailabilityRepository, RepositoryError, RequestRepository};
use crate::care::requests::{CareRequest, Mailbox, RequestAction, RequestStatus, RequestSubmission};
use crate::care::{CareService, InMemoryCareStore};
use chrono::Utc;
use std::sync::Arc;

#[test]
fn care_request_targets_the_pet_owner() {
    let (service, _) = build_service();
    let request = pending_care_request(&service, WALKER, PET, &monday_mornings());

    assert_eq!(request.sender_id, user(WALKER));
    assert_eq!(request.receiver_id, user(OWNER));
    assert_eq!(request.pet(), &pet(PET));
    assert_eq!(request.kind, RequestKind::Care);
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(
        request.agreement,
        vec![slot(DayOfWeek::Monday, 9, 0), slot(DayOfWeek::Monday, 9, 15)]
    );
    assert!(request.id.0.starts_with("req-"));
}

#[test]
fn create_collapses_duplicate_proposals() {
    let (service, _) = build_service();
    let slots = [
        (DayOfWeek::Tuesday, "10:00"),
        (DayOfWeek::Monday, "09:00"),
        (DayOfWeek::Tuesday, "10:00"),
    ];
    let request = service
        .create_request(&user(WALKER), &pet(PET), care_submission(&slots))
        .expect("created");

    assert_eq!(
        request.agreement,
        vec![slot(DayOfWeek::Tuesday, 10, 0), slot(DayOfWeek::Monday, 9, 0)]
    );
}

#[test]
fn create_rejects_empty_care_agreements() {
    let (service, _) = build_service();
    match service.create_request(&user(WALKER), &pet(PET), care_submission(&[])) {
        Err(CareError::EmptyAgreement) => {}
        other => panic!("expected empty agreement, got {other:?}"),
    }
}

#[test]
fn create_validates_type_owner_and_sender() {
    let (service, _) = build_service();

    let unknown = RequestSubmission {
        kind: "foster".to_string(),
        ..RequestSubmission::default()
    };
    assert!(matches!(
        service.create_request(&user(WALKER), &pet(PET), unknown),
        Err(CareError::InvalidType(kind)) if kind == "foster"
    ));

    assert!(matches!(
        service.create_request(&user(WALKER), &pet(STRAY), adopt_submission()),
        Err(CareError::NoOwner(_))
    ));
    assert!(matches!(
        service.create_request(&user(OWNER), &pet(PET), adopt_submission()),
        Err(CareError::Forbidden(_))
    ));
    assert!(matches!(
        service.create_request(
            &user(SECOND_OWNER),
            &pet(PET),
            care_submission(&monday_mornings())
        ),
        Err(CareError::Forbidden(_))
    ));
}

#[test]
fn adopt_requests_ignore_proposed_slots() {
    let (service, _) = build_service();
    let mut submission = adopt_submission();
    submission.slots = inputs(&[(DayOfWeek::Monday, "09:00")]);

    let request = service
        .create_request(&user(SECOND_OWNER), &pet(PET), submission)
        .expect("adopt created");

    assert_eq!(request.kind, RequestKind::Adopt);
    assert!(request.agreement.is_empty());
    assert_eq!(request.message.as_deref(), Some("We have a big yard"));
}

#[test]
fn accepting_care_books_every_proposed_slot() {
    let (service, store) = build_service();
    let request = pending_care_request(&service, WALKER, PET, &monday_mornings());

    let acceptance = service
        .accept(&user(OWNER), &request.id)
        .expect("accept succeeds");

    assert_eq!(acceptance.request.status, RequestStatus::Accepted);
    assert_eq!(acceptance.walks.len(), 2);
    assert_eq!(store.walks_for_request(&request.id).expect("walks").len(), 2);
    assert_eq!(
        service
            .scheduled_walks(&user(WALKER))
            .expect("walks")
            .iter()
            .map(|walk| walk.slot())
            .collect::<Vec<_>>(),
        vec![slot(DayOfWeek::Monday, 9, 0), slot(DayOfWeek::Monday, 9, 15)]
    );
}

#[test]
fn accepting_adoption_books_nothing() {
    let (service, store) = build_service();
    let request = service
        .create_request(&user(SECOND_OWNER), &pet(PET), adopt_submission())
        .expect("adopt created");

    let acceptance = service
        .accept(&user(OWNER), &request.id)
        .expect("accept succeeds");

    assert_eq!(acceptance.request.status, RequestStatus::Accepted);
    assert!(acceptance.walks.is_empty());
    assert_eq!(store.walk_count().expect("count"), 0);
}

#[test]
fn unavailable_slot_leaves_request_pending() {
    let (service, store) = build_service();
    let walker = user(WALKER);
    service
        .put_availability(&walker, &walker, &inputs(&[(DayOfWeek::Monday, "09:00")]))
        .expect("availability opens");
    let request = service
        .create_request(&walker, &pet(PET), care_submission(&monday_mornings()))
        .expect("created");

    match service.accept(&user(OWNER), &request.id) {
        Err(CareError::SlotNotAvailable(missing)) => {
            assert_eq!(missing, slot(DayOfWeek::Monday, 9, 15))
        }
        other => panic!("expected slot not available, got {other:?}"),
    }

    let stored = service.request(&user(OWNER), &request.id).expect("visible");
    assert_eq!(stored.status, RequestStatus::Pending);
    assert_eq!(store.walk_count().expect("count"), 0);
}

#[test]
fn overlapping_request_from_another_owner_conflicts() {
    let (service, store) = build_service();
    let first = pending_care_request(&service, WALKER, PET, &monday_mornings());
    let second = service
        .create_request(
            &user(WALKER),
            &pet(SECOND_PET),
            care_submission(&[(DayOfWeek::Monday, "09:00")]),
        )
        .expect("second created");

    service.accept(&user(OWNER), &first.id).expect("first accepted");

    match service.accept(&user(SECOND_OWNER), &second.id) {
        Err(CareError::SlotConflict(taken)) => assert_eq!(taken, slot(DayOfWeek::Monday, 9, 0)),
        other => panic!("expected slot conflict, got {other:?}"),
    }
    assert_eq!(
        service
            .request(&user(SECOND_OWNER), &second.id)
            .expect("visible")
            .status,
        RequestStatus::Pending
    );
    assert_eq!(store.walk_count().expect("count"), 2);
}

/// Plan walks for `request` against the walker's calendar with no bookings,
/// the way a planner holding a stale snapshot would.
fn plan_on_empty_calendar(store: &InMemoryCareStore, request: &CareRequest) -> Vec<ScheduledWalk> {
    let walker = user(WALKER);
    let availability = store.availability(&walker).expect("availability");
    ScheduleReconciler::new()
        .plan(
            request,
            CaregiverCalendar {
                caregiver: &walker,
                availability: &availability,
                booked: &[],
            },
        )
        .expect("plan succeeds")
}

fn stored_status(store: &InMemoryCareStore, id: &RequestId) -> RequestStatus {
    store
        .fetch_request(id)
        .expect("fetch")
        .expect("request exists")
        .status
}

#[test]
fn storage_index_settles_plans_made_from_the_same_snapshot() {
    let (service, store) = build_service();
    let nine = [(DayOfWeek::Monday, "09:00")];
    let first = pending_care_request(&service, WALKER, PET, &nine);
    let second = pending_care_request(&service, WALKER, SECOND_PET, &nine);

    let first_walks = plan_on_empty_calendar(&store, &first);
    let second_walks = plan_on_empty_calendar(&store, &second);

    store
        .commit_acceptance(&first.id, first_walks, Utc::now())
        .expect("first commit wins");
    let error = store
        .commit_acceptance(&second.id, second_walks, Utc::now())
        .expect_err("second commit collides");

    match ScheduleReconciler::new().translate_commit_error(&second, error) {
        CareError::SlotConflict(taken) => assert_eq!(taken, slot(DayOfWeek::Monday, 9, 0)),
        other => panic!("expected slot conflict, got {other:?}"),
    }
    assert_eq!(store.walk_count().expect("count"), 1);
    assert_eq!(stored_status(&store, &first.id), RequestStatus::Accepted);
    assert_eq!(stored_status(&store, &second.id), RequestStatus::Pending);
    assert!(store
        .walks_for_request(&second.id)
        .expect("walks")
        .is_empty());
}

#[test]
fn commit_rejects_the_same_slot_twice_in_one_batch() {
    let (service, store) = build_service();
    let request = pending_care_request(&service, WALKER, PET, &[(DayOfWeek::Monday, "09:00")]);

    let mut walks = plan_on_empty_calendar(&store, &request);
    let mut twin = walks[0].clone();
    twin.id = WalkId("walk-twin".to_string());
    walks.push(twin);

    match store.commit_acceptance(&request.id, walks, Utc::now()) {
        Err(RepositoryError::UniqueViolation { slot: taken }) => {
            assert_eq!(taken, slot(DayOfWeek::Monday, 9, 0))
        }
        other => panic!("expected unique violation, got {other:?}"),
    }
    assert_eq!(store.walk_count().expect("count"), 0);
    assert_eq!(stored_status(&store, &request.id), RequestStatus::Pending);
}

#[test]
fn slot_closed_after_planning_is_not_booked() {
    let (service, store) = build_service();
    let request = pending_care_request(&service, WALKER, PET, &monday_mornings());
    let walks = plan_on_empty_calendar(&store, &request);

    service
        .delete_availability(
            &user(WALKER),
            &user(WALKER),
            &inputs(&[(DayOfWeek::Monday, "09:15")]),
        )
        .expect("slot closes");

    let error = store
        .commit_acceptance(&request.id, walks, Utc::now())
        .expect_err("closed slot blocks the commit");
    match ScheduleReconciler::new().translate_commit_error(&request, error) {
        CareError::SlotNotAvailable(missing) => {
            assert_eq!(missing, slot(DayOfWeek::Monday, 9, 15))
        }
        other => panic!("expected slot not available, got {other:?}"),
    }
    assert_eq!(store.walk_count().expect("count"), 0);
    assert_eq!(stored_status(&store, &request.id), RequestStatus::Pending);
}

#[test]
fn only_the_receiver_decides() {
    let (service, _) = build_service();
    let request = pending_care_request(&service, WALKER, PET, &monday_mornings());

    for actor in [WALKER, STRANGER] {
        assert!(matches!(
            service.accept(&user(actor), &request.id),
            Err(CareError::Forbidden(_))
        ));
        assert!(matches!(
            service.reject(&user(actor), &request.id),
            Err(CareError::Forbidden(_))
        ));
    }
}

#[test]
fn decided_requests_cannot_be_decided_again() {
    let (service, _) = build_service();
    let request = pending_care_request(&service, WALKER, PET, &monday_mornings());
    let rejected = service
        .reject(&user(OWNER), &request.id)
        .expect("reject succeeds");
    assert_eq!(rejected.status, RequestStatus::Rejected);

    match service.accept(&user(OWNER), &request.id) {
        Err(CareError::InvalidTransition { from, action }) => {
            assert_eq!(from, RequestStatus::Rejected);
            assert_eq!(action, RequestAction::Accept);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn cancel_releases_walks_and_frees_the_slot() {
    let (service, store) = build_service();
    let accepted = accepted_care_request(&service);

    let cancellation = service
        .cancel(&user(WALKER), &accepted.id)
        .expect("sender cancels");
    assert_eq!(cancellation.request.status, RequestStatus::Cancelled);
    assert_eq!(cancellation.released_walks, 2);
    assert_eq!(store.walk_count().expect("count"), 0);

    for outcome in [
        service.accept(&user(OWNER), &accepted.id).map(|_| ()),
        service.reject(&user(OWNER), &accepted.id).map(|_| ()),
        service.cancel(&user(OWNER), &accepted.id).map(|_| ()),
    ] {
        assert!(matches!(
            outcome,
            Err(CareError::InvalidTransition {
                from: RequestStatus::Cancelled,
                ..
            })
        ));
    }

    let rebooked = service
        .create_request(
            &user(WALKER),
            &pet(SECOND_PET),
            care_submission(&[(DayOfWeek::Monday, "09:00")]),
        )
        .expect("created");
    service
        .accept(&user(SECOND_OWNER), &rebooked.id)
        .expect("slot is free again");
}

#[test]
fn receiver_may_cancel_but_pending_and_adoptions_may_not() {
    let (service, _) = build_service();
    let accepted = accepted_care_request(&service);
    service
        .cancel(&user(OWNER), &accepted.id)
        .expect("receiver cancels");

    let pending = pending_care_request(
        &service,
        SECOND_WALKER,
        SECOND_PET,
        &[(DayOfWeek::Friday, "17:00")],
    );
    assert!(matches!(
        service.cancel(&user(SECOND_WALKER), &pending.id),
        Err(CareError::InvalidTransition {
            from: RequestStatus::Pending,
            ..
        })
    ));

    let adoption = service
        .create_request(&user(OWNER), &pet(SECOND_PET), adopt_submission())
        .expect("adopt created");
    service
        .accept(&user(SECOND_OWNER), &adoption.id)
        .expect("adopt accepted");
    assert!(matches!(
        service.cancel(&user(OWNER), &adoption.id),
        Err(CareError::InvalidTransition { .. })
    ));
}

#[test]
fn outsiders_cannot_read_or_cancel_requests() {
    let (service, _) = build_service();
    let accepted = accepted_care_request(&service);

    assert!(matches!(
        service.request(&user(STRANGER), &accepted.id),
        Err(CareError::Forbidden(_))
    ));
    assert!(matches!(
        service.cancel(&user(STRANGER), &accepted.id),
        Err(CareError::Forbidden(_))
    ));
}

#[test]
fn unknown_request_is_not_found() {
    let (service, _) = build_service();
    let missing = RequestId("req-missing".to_string());
    assert!(matches!(
        service.accept(&user(OWNER), &missing),
        Err(CareError::NotFound(_))
    ));
    assert!(matches!(
        service.request(&user(OWNER), &missing),
        Err(CareError::NotFound(_))
    ));
}

#[test]
fn mailboxes_split_sent_and_received() {
    let (service, _) = build_service();
    let care = pending_care_request(&service, WALKER, PET, &monday_mornings());
    let adoption = service
        .create_request(&user(SECOND_OWNER), &pet(PET), adopt_submission())
        .expect("adopt created");

    let received = service
        .requests(&user(OWNER), Mailbox::Received)
        .expect("received");
    let received_ids: Vec<_> = received.iter().map(|request| request.id.clone()).collect();
    assert_eq!(received_ids.len(), 2);
    assert!(received_ids.contains(&care.id));
    assert!(received_ids.contains(&adoption.id));
    assert!(received
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));

    let sent = service
        .requests(&user(WALKER), Mailbox::Sent)
        .expect("sent");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].id, care.id);
    assert!(service
        .requests(&user(OWNER), Mailbox::Sent)
        .expect("sent")
        .is_empty());
}

#[test]
fn repository_failures_surface_as_repository_errors() {
    let service = CareService::new(Arc::new(UnavailableStore), Arc::new(directory()));
    assert!(matches!(
        service.create_request(&user(SECOND_OWNER), &pet(PET), adopt_submission()),
        Err(CareError::Repository(_))
    ));
    assert!(matches!(
        service.scheduled_walks(&user(WALKER)),
        Err(CareError::Repository(_))
    ));
}
