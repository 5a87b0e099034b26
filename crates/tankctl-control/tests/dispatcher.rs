//! Scenario tests for the tank operations against an on-disk store.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use tankctl_control::{
    AttributeName, AttributeValue, ControlError, Dispatcher, Tank, TankSystemParams,
    ValveHysteresis,
};
use tankctl_db::{create_pool, run_migrations, DbRuntimeSettings};
use tankctl_store::{LogStore, SampleValue};
use tankctl_types::{AccessPolicy, CallerIdentity, Quantity, Role, StatusCode, Variant};
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    store: LogStore,
    dispatcher: Dispatcher,
}

fn harness() -> Harness {
    harness_with_policy(AccessPolicy::default())
}

fn harness_with_policy(policy: AccessPolicy) -> Harness {
    let dir = tempfile::tempdir().expect("should create temp dir");
    let path = dir.path().join("tank.sqlite3");
    let pool = create_pool(
        path.to_str().expect("temp path should be utf-8"),
        DbRuntimeSettings::default(),
    )
    .expect("pool creation should succeed");
    {
        let conn = pool.get().expect("should get connection");
        run_migrations(&conn).expect("migrations should succeed");
    }
    let store = LogStore::new(pool);
    let dispatcher = Dispatcher::new(
        store.clone(),
        Arc::new(Tank::new("tankSystem1")),
        policy,
        ValveHysteresis::default(),
    );
    Harness {
        _dir: dir,
        store,
        dispatcher,
    }
}

fn caller(name: &str, roles: &[Role]) -> CallerIdentity {
    CallerIdentity::authenticated(name, roles.iter().copied().collect::<BTreeSet<_>>())
}

fn admin() -> CallerIdentity {
    caller("user1", &[Role::AuthenticatedUser, Role::ConfigureAdmin])
}

fn operator() -> CallerIdentity {
    caller("user2", &[Role::AuthenticatedUser, Role::Operator])
}

fn seed(store: &LogStore, level: f64, position: i64, threshold: i32) {
    store.append(&SampleValue::WaterLevel(level)).expect("append level");
    store
        .append(&SampleValue::ValvePosition(position))
        .expect("append valve");
    store
        .append(&SampleValue::TriggerThreshold(threshold))
        .expect("append threshold");
}

fn install_trigger(store: &LogStore, sql: &str) {
    let conn = store.pool().get().expect("should get connection");
    conn.execute_batch(sql).expect("should install trigger");
}

// ── getTankSystemParams ──────────────────────────────────────────────

#[test]
fn empty_store_reports_data_unavailable() {
    let h = harness();
    let err = h
        .dispatcher
        .get_tank_system_params(&operator())
        .expect_err("store is empty");
    assert!(matches!(err, ControlError::DataUnavailable(Quantity::WaterLevel)));
    assert_eq!(err.status(), StatusCode::BadOutOfRange);
}

#[test]
fn seeded_store_returns_all_three_values() {
    let h = harness();
    seed(&h.store, 42.0, 1, 10);

    let params = h
        .dispatcher
        .get_tank_system_params(&operator())
        .expect("read should succeed");
    assert_eq!(
        params,
        TankSystemParams {
            valve_position: true,
            fill_percentage: 42.0,
            threshold: 10,
        }
    );
}

#[test]
fn successful_read_refreshes_cached_attributes() {
    let h = harness();
    seed(&h.store, 42.0, 0, 10);
    h.store
        .append(&SampleValue::WaterLevel(63.5))
        .expect("append level");

    h.dispatcher
        .get_tank_system_params(&admin())
        .expect("read should succeed");

    let tank = h.dispatcher.tank();
    assert_eq!(
        tank.attribute(AttributeName::FillPercentage),
        AttributeValue::Double(63.5)
    );
    assert_eq!(
        tank.attribute(AttributeName::ValvePosition),
        AttributeValue::Boolean(false)
    );
    assert_eq!(
        tank.attribute(AttributeName::Threshold),
        AttributeValue::Int32(10)
    );
}

#[test]
fn nonzero_valve_values_read_as_open() {
    let h = harness();
    seed(&h.store, 10.0, 5, 1);
    let params = h
        .dispatcher
        .get_tank_system_params(&operator())
        .expect("read should succeed");
    assert!(params.valve_position);
}

#[test]
fn any_empty_log_aborts_without_touching_the_cache() {
    let h = harness();
    // Level and valve present, threshold missing.
    h.store
        .append(&SampleValue::WaterLevel(80.0))
        .expect("append level");
    h.store.append(&SampleValue::valve(true)).expect("append valve");

    let err = h
        .dispatcher
        .get_tank_system_params(&operator())
        .expect_err("threshold log is empty");
    assert!(matches!(
        err,
        ControlError::DataUnavailable(Quantity::TriggerThreshold)
    ));

    let tank = h.dispatcher.tank();
    assert_eq!(tank.fill_percentage.get(), 0.0);
    assert!(!tank.valve_position.get());
    assert_eq!(tank.threshold.get(), 0);
}

#[test]
fn anonymous_caller_cannot_read() {
    let h = harness();
    seed(&h.store, 42.0, 1, 10);
    let err = h
        .dispatcher
        .get_tank_system_params(&CallerIdentity::anonymous())
        .expect_err("anonymous is denied");
    assert_eq!(err.status(), StatusCode::BadUserAccessDenied);
    assert_eq!(h.dispatcher.tank().fill_percentage.get(), 0.0);
}

#[test]
fn broken_log_is_internal_error() {
    let h = harness();
    seed(&h.store, 42.0, 1, 10);
    {
        let conn = h.store.pool().get().expect("should get connection");
        conn.execute_batch("DROP TABLE valveposition;")
            .expect("should drop table");
    }

    let err = h
        .dispatcher
        .get_tank_system_params(&operator())
        .expect_err("valve log is gone");
    assert!(matches!(err, ControlError::Internal { .. }));
    assert_eq!(err.status(), StatusCode::BadInternalError);
    assert_eq!(h.dispatcher.tank().fill_percentage.get(), 0.0);
}

// ── setThreshold ─────────────────────────────────────────────────────

#[test]
fn admin_sets_threshold_and_read_reflects_it() {
    let h = harness();
    seed(&h.store, 42.0, 1, 10);

    h.dispatcher
        .set_threshold(&admin(), &[Variant::Int32(7)])
        .expect("admin may set threshold");

    assert_eq!(h.dispatcher.tank().threshold.get(), 7);
    let params = h
        .dispatcher
        .get_tank_system_params(&operator())
        .expect("read should succeed");
    assert_eq!(params.threshold, 7);
}

#[test]
fn read_only_caller_cannot_set_threshold() {
    let h = harness();
    let before = h.store.count(Quantity::TriggerThreshold).expect("count");

    for who in [
        operator(),
        caller("viewer", &[Role::AuthenticatedUser, Role::Observer]),
        CallerIdentity::anonymous(),
    ] {
        let err = h
            .dispatcher
            .set_threshold(&who, &[Variant::Int32(5)])
            .expect_err("only admins may write");
        assert!(matches!(err, ControlError::Unauthorized { .. }));
    }

    assert_eq!(h.store.count(Quantity::TriggerThreshold).expect("count"), before);
    assert_eq!(h.dispatcher.tank().threshold.get(), 0);
}

#[test]
fn malformed_threshold_arguments_are_rejected_before_any_write() {
    let h = harness();
    let cases: Vec<Vec<Variant>> = vec![
        vec![Variant::String("not-a-number".to_string())],
        vec![Variant::Int32(1), Variant::Int32(2)],
        vec![],
        vec![Variant::Double(7.0)],
        vec![Variant::Int64(i64::from(i32::MAX) + 1)],
        vec![Variant::Null],
    ];

    for args in cases {
        let err = h
            .dispatcher
            .set_threshold(&admin(), &args)
            .expect_err("arguments are invalid");
        assert_eq!(err.status(), StatusCode::BadInvalidArgument, "{args:?}");
    }

    assert_eq!(h.store.count(Quantity::TriggerThreshold).expect("count"), 0);
}

#[test]
fn validation_runs_before_authorization() {
    let h = harness();
    let err = h
        .dispatcher
        .set_threshold(&CallerIdentity::anonymous(), &[Variant::Boolean(true)])
        .expect_err("bad argument");
    assert!(matches!(err, ControlError::InvalidArgument(_)));
}

#[test]
fn failed_append_leaves_threshold_attribute_unchanged() {
    let h = harness();
    h.dispatcher
        .set_threshold(&admin(), &[Variant::Int32(3)])
        .expect("first write succeeds");

    install_trigger(
        &h.store,
        "CREATE TRIGGER reject_threshold BEFORE INSERT ON triggerthreshold
         BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
    );

    let err = h
        .dispatcher
        .set_threshold(&admin(), &[Variant::Int32(9)])
        .expect_err("append is rejected");
    assert_eq!(err.status(), StatusCode::BadInternalError);
    assert_eq!(h.dispatcher.tank().threshold.get(), 3);
    assert_eq!(h.store.latest_threshold().expect("read"), Some(3));
}

#[test]
fn append_count_mismatch_fails_closed() {
    let h = harness();
    install_trigger(
        &h.store,
        "CREATE TRIGGER drop_threshold BEFORE INSERT ON triggerthreshold
         BEGIN SELECT RAISE(IGNORE); END;",
    );

    let err = h
        .dispatcher
        .set_threshold(&admin(), &[Variant::Int32(9)])
        .expect_err("no record was written");
    match err {
        ControlError::Internal { source, .. } => {
            assert!(source.is_write());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(h.dispatcher.tank().threshold.get(), 0);
}

#[test]
fn configured_policy_can_grant_threshold_writes_to_engineers() {
    let h = harness_with_policy(AccessPolicy {
        set_threshold: vec![Role::Engineer, Role::ConfigureAdmin],
        ..Default::default()
    });
    let engineer = caller("eng", &[Role::Engineer]);

    h.dispatcher
        .set_threshold(&engineer, &[Variant::Int32(12)])
        .expect("engineer is allowed by policy");
    assert_eq!(h.store.latest_threshold().expect("read"), Some(12));
}

#[test]
fn concurrent_threshold_writes_all_land() {
    let h = harness();
    let dispatcher = Arc::new(h.dispatcher);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            thread::spawn(move || {
                dispatcher
                    .set_threshold(&admin(), &[Variant::Int32(i)])
                    .expect("write should succeed");
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer should not panic");
    }

    assert_eq!(h.store.count(Quantity::TriggerThreshold).expect("count"), 8);
    let cached = dispatcher.tank().threshold.get();
    assert_eq!(Some(cached), h.store.latest_threshold().expect("read"));
}

#[test]
fn interleaved_reads_and_writes_leave_cache_on_newest_records() {
    let h = harness();
    seed(&h.store, 40.0, 0, 0);
    let dispatcher = Arc::new(h.dispatcher);

    let mut handles = Vec::new();
    for writer in 0..2 {
        let dispatcher = Arc::clone(&dispatcher);
        handles.push(thread::spawn(move || {
            for round in 0..25 {
                dispatcher
                    .set_threshold(&admin(), &[Variant::Int32(writer * 100 + round)])
                    .expect("write should succeed");
            }
        }));
    }
    for reporter in 0..2 {
        let dispatcher = Arc::clone(&dispatcher);
        handles.push(thread::spawn(move || {
            for round in 0..25 {
                let level = if (round + reporter) % 2 == 0 { 90.0 } else { 10.0 };
                dispatcher
                    .report_fill_level(&operator(), &[Variant::Double(level)])
                    .expect("report should succeed");
            }
        }));
    }
    for _ in 0..2 {
        let dispatcher = Arc::clone(&dispatcher);
        handles.push(thread::spawn(move || {
            for _ in 0..25 {
                dispatcher
                    .get_tank_system_params(&admin())
                    .expect("read should succeed");
            }
        }));
    }
    for handle in handles {
        handle.join().expect("worker should not panic");
    }

    let tank = dispatcher.tank();
    assert_eq!(
        Some(tank.threshold.get()),
        h.store.latest_threshold().expect("read")
    );
    assert_eq!(
        Some(tank.fill_percentage.get()),
        h.store.latest_level().expect("read")
    );
    assert_eq!(
        Some(tank.valve_position.get()),
        h.store
            .latest_valve_position()
            .expect("read")
            .map(|position| position != 0)
    );
}

// ── reportFillLevel ──────────────────────────────────────────────────

#[test]
fn fill_level_reports_drive_the_valve_with_hysteresis() {
    let h = harness();
    let op = operator();

    let report = h
        .dispatcher
        .report_fill_level(&op, &[Variant::Double(50.0)])
        .expect("report should succeed");
    assert!(!report.valve_position);
    assert!(!report.valve_changed);
    assert_eq!(h.store.count(Quantity::ValvePosition).expect("count"), 0);

    let report = h
        .dispatcher
        .report_fill_level(&op, &[Variant::Double(80.0)])
        .expect("report should succeed");
    assert!(report.valve_position);
    assert!(report.valve_changed);

    let report = h
        .dispatcher
        .report_fill_level(&op, &[Variant::Double(40.0)])
        .expect("report should succeed");
    assert!(report.valve_position, "valve stays open inside the band");
    assert!(!report.valve_changed);

    let report = h
        .dispatcher
        .report_fill_level(&op, &[Variant::Int32(20)])
        .expect("report should succeed");
    assert!(!report.valve_position);
    assert!(report.valve_changed);

    assert_eq!(h.store.count(Quantity::WaterLevel).expect("count"), 4);
    assert_eq!(h.store.count(Quantity::ValvePosition).expect("count"), 2);
    assert_eq!(h.store.latest_valve_position().expect("read"), Some(0));

    let tank = h.dispatcher.tank();
    assert_eq!(tank.fill_percentage.get(), 20.0);
    assert!(!tank.valve_position.get());
}

#[test]
fn fill_level_report_requires_operator_role() {
    let h = harness();
    let err = h
        .dispatcher
        .report_fill_level(&admin(), &[Variant::Double(50.0)])
        .expect_err("admin is not an operator");
    assert!(matches!(err, ControlError::Unauthorized { .. }));
    assert_eq!(h.store.count(Quantity::WaterLevel).expect("count"), 0);
}

#[test]
fn fill_level_must_be_a_single_finite_number() {
    let h = harness();
    for args in [
        vec![Variant::Double(f64::NAN)],
        vec![Variant::String("full".to_string())],
        vec![Variant::Double(1.0), Variant::Double(2.0)],
    ] {
        let err = h
            .dispatcher
            .report_fill_level(&operator(), &args)
            .expect_err("invalid level");
        assert!(matches!(err, ControlError::InvalidArgument(_)), "{args:?}");
    }
    assert_eq!(h.store.count(Quantity::WaterLevel).expect("count"), 0);
}

// ── readAttributes / readHistory / refresh ───────────────────────────

#[test]
fn read_attributes_never_touches_the_store() {
    let h = harness();
    {
        let conn = h.store.pool().get().expect("should get connection");
        conn.execute_batch("DROP TABLE waterlevel;")
            .expect("should drop table");
    }

    let snapshot = h
        .dispatcher
        .read_attributes(&operator())
        .expect("cache read works without the store");
    assert_eq!(snapshot.name, "tankSystem1");
    assert_eq!(snapshot.attributes.len(), 3);
}

#[test]
fn history_is_gated_and_newest_first() {
    let h = harness();
    for threshold in [1, 2, 3] {
        h.store
            .append(&SampleValue::TriggerThreshold(threshold))
            .expect("append");
    }

    let records = h
        .dispatcher
        .read_history(&operator(), Quantity::TriggerThreshold, Some(2))
        .expect("history should be readable");
    let values: Vec<_> = records.iter().map(|r| r.value).collect();
    assert_eq!(
        values,
        vec![
            SampleValue::TriggerThreshold(3),
            SampleValue::TriggerThreshold(2)
        ]
    );

    assert!(h
        .dispatcher
        .read_history(&CallerIdentity::anonymous(), Quantity::TriggerThreshold, None)
        .is_err());
}

#[test]
fn refresh_mirrors_store_without_a_caller() {
    let h = harness();
    assert!(matches!(
        h.dispatcher.refresh_attributes(),
        Err(ControlError::DataUnavailable(_))
    ));

    seed(&h.store, 33.0, 1, 4);
    let params = h.dispatcher.refresh_attributes().expect("refresh");
    assert_eq!(params.fill_percentage, 33.0);
    assert_eq!(h.dispatcher.tank().threshold.get(), 4);
}
