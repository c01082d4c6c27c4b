//! End-to-end tests for the appointment lifecycle service, backed by
//! in-memory SurrealDB repositories with the invoicing trigger wired in.

use std::sync::{Arc, Mutex};

use bayline_core::error::{BaylineError, BaylineResult};
use bayline_core::models::{
    Appointment, AppointmentWrite, CreateAppointment, NewAppointment, UpdateAppointment,
};
use bayline_core::repository::AppointmentRepository;
use bayline_core::status::AppointmentStatus;
use bayline_core::version::Versioned;
use bayline_db::repository::{SurrealAppointmentRepository, SurrealInvoiceRepository};
use bayline_sched::hook::CompletionHook;
use bayline_sched::{AppointmentService, InvoiceService, NoopHook, SchedConfig};
use chrono::{DateTime, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    bayline_db::run_migrations(&db).await.unwrap();
    db
}

fn service(
    db: &Surreal<Db>,
) -> AppointmentService<SurrealAppointmentRepository<Db>, InvoiceService<SurrealInvoiceRepository<Db>>>
{
    AppointmentService::new(
        SurrealAppointmentRepository::new(db.clone()),
        InvoiceService::new(SurrealInvoiceRepository::new(db.clone())),
        SchedConfig::default(),
    )
}

fn invoices(db: &Surreal<Db>) -> InvoiceService<SurrealInvoiceRepository<Db>> {
    InvoiceService::new(SurrealInvoiceRepository::new(db.clone()))
}

fn at(hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 9, hour, min, 0).unwrap()
}

fn request(
    tenant_id: Uuid,
    resource_id: Option<Uuid>,
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> CreateAppointment {
    CreateAppointment {
        tenant_id,
        customer_id: Uuid::new_v4(),
        vehicle_id: None,
        resource_id,
        start_at: start,
        end_at: end,
        total_cents: None,
        notes: None,
    }
}

#[tokio::test]
async fn conflicting_booking_rejected_until_slot_frees_up() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();
    let bay = Uuid::new_v4();

    // Bay booked 10:00–11:00.
    let first = svc
        .create(request(tenant_id, Some(bay), at(10, 0), Some(at(11, 0))))
        .await
        .unwrap();

    // 10:30–11:30 overlaps.
    let second = request(tenant_id, Some(bay), at(10, 30), Some(at(11, 30)));
    let result = svc.create(second.clone()).await;
    assert!(matches!(
        result,
        Err(BaylineError::SchedulingConflict { .. })
    ));

    // Cancel the first booking, then the retry lands.
    svc.change_status(
        tenant_id,
        first.id,
        &first.version_token(),
        AppointmentStatus::Canceled,
    )
    .await
    .unwrap();

    svc.create(second).await.unwrap();
}

#[tokio::test]
async fn missing_end_gets_the_standard_duration() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();

    let created = svc
        .create(request(tenant_id, None, at(10, 0), None))
        .await
        .unwrap();
    assert_eq!(created.end_at, at(11, 0));
}

#[tokio::test]
async fn zero_length_interval_gets_the_standard_duration() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();

    let created = svc
        .create(request(tenant_id, None, at(10, 0), Some(at(10, 0))))
        .await
        .unwrap();
    assert_eq!(created.end_at, at(11, 0));
}

#[tokio::test]
async fn inverted_interval_is_rejected() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();

    let result = svc
        .create(request(tenant_id, None, at(11, 0), Some(at(10, 0))))
        .await;
    assert!(matches!(result, Err(BaylineError::Validation { .. })));
}

#[tokio::test]
async fn negative_total_is_rejected() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();

    let mut input = request(tenant_id, None, at(10, 0), Some(at(11, 0)));
    input.total_cents = Some(-500);
    let result = svc.create(input).await;
    assert!(matches!(result, Err(BaylineError::Validation { .. })));
}

#[tokio::test]
async fn update_fields_rotates_the_version_token() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();

    let created = svc
        .create(request(tenant_id, None, at(10, 0), Some(at(11, 0))))
        .await
        .unwrap();

    let updated = svc
        .update_fields(
            tenant_id,
            created.id,
            &created.version_token(),
            UpdateAppointment {
                notes: Some(Some("needs new pads".into())),
                ..UpdateAppointment::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.notes.as_deref(), Some("needs new pads"));
    assert_eq!(updated.revision, created.revision + 1);
    assert_ne!(updated.version_token(), created.version_token());
}

#[tokio::test]
async fn stale_token_is_rejected_without_mutation() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();

    let created = svc
        .create(request(tenant_id, None, at(10, 0), Some(at(11, 0))))
        .await
        .unwrap();
    let stale = created.version_token();

    // Another editor wins the race.
    svc.update_fields(
        tenant_id,
        created.id,
        &stale,
        UpdateAppointment {
            notes: Some(Some("first writer".into())),
            ..UpdateAppointment::default()
        },
    )
    .await
    .unwrap();

    let result = svc
        .update_fields(
            tenant_id,
            created.id,
            &stale,
            UpdateAppointment {
                notes: Some(Some("second writer".into())),
                ..UpdateAppointment::default()
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(BaylineError::ConcurrencyConflict { .. })
    ));
}

#[tokio::test]
async fn malformed_token_is_a_validation_error() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();

    let created = svc
        .create(request(tenant_id, None, at(10, 0), Some(at(11, 0))))
        .await
        .unwrap();

    for bad in ["", "not-a-token", "0.deadbeef"] {
        let result = svc
            .change_status(tenant_id, created.id, bad, AppointmentStatus::InProgress)
            .await;
        assert!(
            matches!(result, Err(BaylineError::Validation { .. })),
            "token {bad:?} should be rejected"
        );
    }
}

#[tokio::test]
async fn skipping_the_state_machine_is_rejected() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();

    let created = svc
        .create(request(tenant_id, None, at(10, 0), Some(at(11, 0))))
        .await
        .unwrap();

    // Scheduled cards cannot jump straight to Completed.
    let result = svc
        .change_status(
            tenant_id,
            created.id,
            &created.version_token(),
            AppointmentStatus::Completed,
        )
        .await;
    match result {
        Err(BaylineError::InvalidTransition { from, to }) => {
            assert_eq!(from, AppointmentStatus::Scheduled);
            assert_eq!(to, AppointmentStatus::Completed);
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
}

#[tokio::test]
async fn requesting_the_current_status_is_a_noop() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();

    let created = svc
        .create(request(tenant_id, None, at(10, 0), Some(at(11, 0))))
        .await
        .unwrap();

    let unchanged = svc
        .change_status(
            tenant_id,
            created.id,
            &created.version_token(),
            AppointmentStatus::Scheduled,
        )
        .await
        .unwrap();

    // Nothing was written, so the token did not rotate.
    assert_eq!(unchanged.revision, created.revision);
    assert_eq!(unchanged.version_token(), created.version_token());
}

#[tokio::test]
async fn completion_creates_exactly_one_invoice() {
    let db = setup().await;
    let svc = service(&db);
    let inv = invoices(&db);
    let tenant_id = Uuid::new_v4();

    let mut input = request(tenant_id, None, at(10, 0), Some(at(11, 0)));
    input.total_cents = Some(12_500);
    let created = svc.create(input).await.unwrap();

    let in_progress = svc
        .change_status(
            tenant_id,
            created.id,
            &created.version_token(),
            AppointmentStatus::InProgress,
        )
        .await
        .unwrap();
    assert!(
        inv.get_by_appointment(tenant_id, created.id).await.is_err(),
        "no invoice before completion"
    );

    let completed = svc
        .change_status(
            tenant_id,
            created.id,
            &in_progress.version_token(),
            AppointmentStatus::Completed,
        )
        .await
        .unwrap();

    let invoice = inv.get_by_appointment(tenant_id, created.id).await.unwrap();
    assert_eq!(invoice.amount_due_cents, 12_500);

    // Re-requesting Completed is a no-op and must not refire the hook.
    svc.change_status(
        tenant_id,
        created.id,
        &completed.version_token(),
        AppointmentStatus::Completed,
    )
    .await
    .unwrap();

    let again = inv.get_by_appointment(tenant_id, created.id).await.unwrap();
    assert_eq!(again.id, invoice.id);
    assert_eq!(again.revision, invoice.revision);
}

struct FailingHook;

impl CompletionHook for FailingHook {
    async fn on_completed(&self, _appointment: &Appointment) -> BaylineResult<Uuid> {
        Err(BaylineError::Database("invoicing offline".into()))
    }
}

#[tokio::test]
async fn hook_failure_does_not_roll_back_the_status_change() {
    let db = setup().await;
    let svc = AppointmentService::new(
        SurrealAppointmentRepository::new(db.clone()),
        FailingHook,
        SchedConfig::default(),
    );
    let tenant_id = Uuid::new_v4();

    let created = svc
        .create(request(tenant_id, None, at(10, 0), Some(at(11, 0))))
        .await
        .unwrap();
    let in_progress = svc
        .change_status(
            tenant_id,
            created.id,
            &created.version_token(),
            AppointmentStatus::InProgress,
        )
        .await
        .unwrap();

    let completed = svc
        .change_status(
            tenant_id,
            created.id,
            &in_progress.version_token(),
            AppointmentStatus::Completed,
        )
        .await
        .unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn move_to_front_shifts_siblings_and_rotates_their_tokens() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();

    let a = svc
        .create(request(tenant_id, None, at(9, 0), Some(at(10, 0))))
        .await
        .unwrap();
    let b = svc
        .create(request(tenant_id, None, at(10, 0), Some(at(11, 0))))
        .await
        .unwrap();
    let c = svc
        .create(request(tenant_id, None, at(11, 0), Some(at(12, 0))))
        .await
        .unwrap();

    let outcome = svc
        .move_card(
            tenant_id,
            c.id,
            &c.version_token(),
            AppointmentStatus::Scheduled,
            0,
        )
        .await
        .unwrap();

    assert_eq!(outcome.appointment.position, 0);
    let ids: Vec<_> = outcome.siblings.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![c.id, a.id, b.id]);

    // Shifted siblings carry fresh tokens.
    let shifted_a = outcome.siblings.iter().find(|s| s.id == a.id).unwrap();
    assert_eq!(shifted_a.position, 1);
    assert_eq!(shifted_a.revision, a.revision + 1);
}

#[tokio::test]
async fn move_can_change_column_and_fires_the_invoice_trigger() {
    let db = setup().await;
    let svc = service(&db);
    let inv = invoices(&db);
    let tenant_id = Uuid::new_v4();

    let mut input = request(tenant_id, None, at(10, 0), Some(at(11, 0)));
    input.total_cents = Some(9_900);
    let created = svc.create(input).await.unwrap();
    let in_progress = svc
        .change_status(
            tenant_id,
            created.id,
            &created.version_token(),
            AppointmentStatus::InProgress,
        )
        .await
        .unwrap();

    let outcome = svc
        .move_card(
            tenant_id,
            created.id,
            &in_progress.version_token(),
            AppointmentStatus::Completed,
            0,
        )
        .await
        .unwrap();
    assert_eq!(outcome.appointment.status, AppointmentStatus::Completed);

    let invoice = inv.get_by_appointment(tenant_id, created.id).await.unwrap();
    assert_eq!(invoice.amount_due_cents, 9_900);
}

#[tokio::test]
async fn move_position_is_clamped_to_the_column_end() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();

    let a = svc
        .create(request(tenant_id, None, at(9, 0), Some(at(10, 0))))
        .await
        .unwrap();
    let b = svc
        .create(request(tenant_id, None, at(10, 0), Some(at(11, 0))))
        .await
        .unwrap();

    let outcome = svc
        .move_card(
            tenant_id,
            a.id,
            &a.version_token(),
            AppointmentStatus::Scheduled,
            99,
        )
        .await
        .unwrap();
    // Dropping past the end lands the card behind the last sibling.
    assert_eq!(outcome.appointment.position, 2);
    // The other card stayed put.
    let other = outcome.siblings.iter().find(|s| s.id == b.id).unwrap();
    assert_eq!(other.position, 1);
    assert_eq!(other.revision, b.revision);
}

#[tokio::test]
async fn move_to_a_later_slot_lands_where_dropped() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();

    let a = svc
        .create(request(tenant_id, None, at(9, 0), Some(at(10, 0))))
        .await
        .unwrap();
    let b = svc
        .create(request(tenant_id, None, at(10, 0), Some(at(11, 0))))
        .await
        .unwrap();
    let c = svc
        .create(request(tenant_id, None, at(11, 0), Some(at(12, 0))))
        .await
        .unwrap();

    // Drag the first card to the end of its own column.
    let outcome = svc
        .move_card(
            tenant_id,
            a.id,
            &a.version_token(),
            AppointmentStatus::Scheduled,
            2,
        )
        .await
        .unwrap();

    let ids: Vec<_> = outcome.siblings.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![b.id, c.id, a.id]);

    // The cards it passed over were not touched.
    let untouched_b = outcome.siblings.iter().find(|s| s.id == b.id).unwrap();
    let untouched_c = outcome.siblings.iter().find(|s| s.id == c.id).unwrap();
    assert_eq!(untouched_b.revision, b.revision);
    assert_eq!(untouched_c.revision, c.revision);
}

#[tokio::test]
async fn negative_move_position_is_rejected() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();

    let created = svc
        .create(request(tenant_id, None, at(10, 0), Some(at(11, 0))))
        .await
        .unwrap();

    let result = svc
        .move_card(
            tenant_id,
            created.id,
            &created.version_token(),
            AppointmentStatus::Scheduled,
            -1,
        )
        .await;
    assert!(matches!(result, Err(BaylineError::Validation { .. })));
}

#[tokio::test]
async fn reschedule_and_edit_notes_in_one_patch() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();
    let bay = Uuid::new_v4();

    let created = svc
        .create(request(tenant_id, Some(bay), at(10, 0), Some(at(11, 0))))
        .await
        .unwrap();

    let updated = svc
        .update_fields(
            tenant_id,
            created.id,
            &created.version_token(),
            UpdateAppointment {
                start_at: Some(at(14, 0)),
                end_at: Some(Some(at(15, 0))),
                notes: Some(Some("customer coming after lunch".into())),
                ..UpdateAppointment::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.start_at, at(14, 0));
    assert_eq!(updated.end_at, at(15, 0));
    assert_eq!(updated.notes.as_deref(), Some("customer coming after lunch"));
}

/// Repository double that records the call order and always loses the
/// compare-and-swap.
#[derive(Clone)]
struct RacedRepo {
    card: Appointment,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl AppointmentRepository for RacedRepo {
    async fn create(&self, _input: NewAppointment) -> BaylineResult<Appointment> {
        unreachable!("not exercised")
    }

    async fn get(&self, _tenant_id: Uuid, _id: Uuid) -> BaylineResult<Appointment> {
        self.calls.lock().unwrap().push("get");
        Ok(self.card.clone())
    }

    async fn list_blocking_for_resource(
        &self,
        _tenant_id: Uuid,
        _resource_id: Uuid,
        _exclude: Option<Uuid>,
    ) -> BaylineResult<Vec<Appointment>> {
        unreachable!("not exercised")
    }

    async fn list_column(
        &self,
        _tenant_id: Uuid,
        _status: AppointmentStatus,
    ) -> BaylineResult<Vec<Appointment>> {
        self.calls.lock().unwrap().push("list_column");
        Ok(vec![self.card.clone()])
    }

    async fn next_position(
        &self,
        _tenant_id: Uuid,
        _status: AppointmentStatus,
    ) -> BaylineResult<i64> {
        self.calls.lock().unwrap().push("next_position");
        Ok(self.card.position + 1)
    }

    async fn shift_column_positions(
        &self,
        _tenant_id: Uuid,
        _status: AppointmentStatus,
        _from_position: i64,
        _exclude: Uuid,
    ) -> BaylineResult<()> {
        self.calls.lock().unwrap().push("shift_column_positions");
        Ok(())
    }

    async fn update_checked(
        &self,
        _tenant_id: Uuid,
        id: Uuid,
        _expected_revision: u64,
        _write: AppointmentWrite,
        _verify_slot: bool,
    ) -> BaylineResult<Appointment> {
        self.calls.lock().unwrap().push("update_checked");
        Err(BaylineError::ConcurrencyConflict {
            entity: "appointment".into(),
            id: id.to_string(),
        })
    }
}

#[tokio::test]
async fn a_move_that_loses_the_race_mutates_nothing() {
    let now = Utc::now();
    let card = Appointment {
        id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        customer_id: Uuid::new_v4(),
        vehicle_id: None,
        resource_id: None,
        start_at: now,
        end_at: now + chrono::Duration::hours(1),
        status: AppointmentStatus::Scheduled,
        position: 0,
        total_cents: 0,
        paid_cents: 0,
        notes: None,
        revision: 3,
        created_at: now,
        updated_at: now,
    };
    let calls = Arc::new(Mutex::new(Vec::new()));
    let repo = RacedRepo {
        card: card.clone(),
        calls: calls.clone(),
    };
    let svc = AppointmentService::new(repo, NoopHook, SchedConfig::default());

    let result = svc
        .move_card(
            card.tenant_id,
            card.id,
            &card.version_token(),
            AppointmentStatus::InProgress,
            0,
        )
        .await;
    assert!(matches!(
        result,
        Err(BaylineError::ConcurrencyConflict { .. })
    ));

    // The card's own guarded write failed, so the siblings were never
    // re-sequenced.
    let calls = calls.lock().unwrap();
    assert_eq!(*calls, vec!["get", "next_position", "update_checked"]);
}

#[tokio::test]
async fn no_overlap_survives_a_randomized_booking_storm() {
    let db = setup().await;
    let svc = service(&db);
    let repo = SurrealAppointmentRepository::new(db.clone());
    let tenant_id = Uuid::new_v4();
    let bay = Uuid::new_v4();

    let mut rng = StdRng::seed_from_u64(0xBA7_11FE);
    let mut accepted = 0usize;
    for _ in 0..40 {
        let start = at(8, 0) + chrono::Duration::minutes(rng.random_range(0..600));
        // Zero-length requests exercise normalization too.
        let duration = rng.random_range(0..120);
        let end = (duration > 0).then(|| start + chrono::Duration::minutes(duration));
        match svc.create(request(tenant_id, Some(bay), start, end)).await {
            Ok(_) => accepted += 1,
            Err(BaylineError::SchedulingConflict { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert!(accepted > 0, "seed produced no accepted bookings");

    // Whatever subset was accepted, no two persisted blocking bookings
    // on the bay may overlap.
    let booked = repo
        .list_blocking_for_resource(tenant_id, bay, None)
        .await
        .unwrap();
    assert_eq!(booked.len(), accepted);
    for (i, a) in booked.iter().enumerate() {
        for b in &booked[i + 1..] {
            assert!(
                !a.range().overlaps(&b.range()),
                "{}..{} overlaps {}..{}",
                a.start_at,
                a.end_at,
                b.start_at,
                b.end_at
            );
        }
    }
}

#[tokio::test]
async fn rescheduling_into_a_taken_slot_is_rejected() {
    let db = setup().await;
    let svc = service(&db);
    let tenant_id = Uuid::new_v4();
    let bay = Uuid::new_v4();

    svc.create(request(tenant_id, Some(bay), at(10, 0), Some(at(11, 0))))
        .await
        .unwrap();
    let second = svc
        .create(request(tenant_id, Some(bay), at(12, 0), Some(at(13, 0))))
        .await
        .unwrap();

    let result = svc
        .update_fields(
            tenant_id,
            second.id,
            &second.version_token(),
            UpdateAppointment {
                start_at: Some(at(10, 30)),
                end_at: Some(Some(at(11, 30))),
                ..UpdateAppointment::default()
            },
        )
        .await;
    assert!(matches!(
        result,
        Err(BaylineError::SchedulingConflict { .. })
    ));
}

#[tokio::test]
async fn unknown_appointment_is_not_found() {
    let db = setup().await;
    let svc = service(&db);

    let result = svc
        .change_status(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "1.whatever",
            AppointmentStatus::Canceled,
        )
        .await;
    assert!(matches!(result, Err(BaylineError::NotFound { .. })));
}
