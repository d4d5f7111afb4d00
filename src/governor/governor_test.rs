// Lifecycle and dispatch tests for the explicit-set governor.

use std::sync::Arc;
use std::thread;

use crate::governor::{
    clamp_request, Bounds, Error, Governor, Relation, SetSpeed, UnitReport, Window,
};
use crate::platform::{Request, SimPlatform};

const FREQS: [u32; 6] = [800_000, 1_000_000, 1_200_000, 1_600_000, 1_800_000, 2_000_000];

fn sim() -> Arc<SimPlatform> {
    Arc::new(SimPlatform::new().with_unit(
        0,
        Bounds::new(800_000, 2_000_000, 1_200_000),
        FREQS.to_vec(),
    ))
}

fn governor(platform: &Arc<SimPlatform>) -> SetSpeed {
    SetSpeed::new(platform.clone(), platform.clone())
}

fn started(platform: &Arc<SimPlatform>) -> SetSpeed {
    let gov = governor(platform);
    gov.attach(0).unwrap();
    gov.start(0).unwrap();
    gov
}

fn report(gov: &SetSpeed, unit: u32) -> Option<UnitReport> {
    gov.units().into_iter().find(|r| r.id == unit)
}

#[test]
fn test_get_speed_after_start_is_current_frequency() {
    let platform = sim();
    let gov = started(&platform);

    assert_eq!(gov.get_speed(0), Ok(1_200_000));
    assert_eq!(
        report(&gov, 0),
        Some(UnitReport {
            id: 0,
            managed: true,
            setspeed: 1_200_000,
            window: Window {
                min: 800_000,
                max: 2_000_000,
            },
        })
    );
    // Start only tracks the running frequency.
    assert_eq!(platform.request_count(), 0);
}

#[test]
fn test_set_speed_before_start_is_not_managed() {
    let platform = sim();
    let gov = governor(&platform);

    assert_eq!(gov.set_speed(0, 1_800_000), Err(Error::NotManaged(0)));

    gov.attach(0).unwrap();
    assert_eq!(gov.set_speed(0, 1_800_000), Err(Error::NotManaged(0)));
    assert_eq!(report(&gov, 0).map(|r| r.setspeed), Some(0));
    assert_eq!(platform.request_count(), 0);
}

#[test]
fn test_explicit_set_then_limit_change() {
    let platform = sim();
    let gov = started(&platform);
    assert_eq!(gov.get_speed(0), Ok(1_200_000));

    gov.set_speed(0, 1_800_000).unwrap();
    assert_eq!(
        platform.last_request(),
        Some(Request {
            unit: 0,
            freq: 1_800_000,
            relation: Relation::AtOrBelow,
        })
    );
    assert_eq!(gov.get_speed(0), Ok(1_800_000));

    platform.set_limits(0, 800_000, 1_600_000).unwrap();
    gov.on_bounds_changed(0).unwrap();
    assert_eq!(
        platform.last_request(),
        Some(Request {
            unit: 0,
            freq: 1_600_000,
            relation: Relation::AtOrAbove,
        })
    );
    assert_eq!(gov.get_speed(0), Ok(1_600_000));
    // The operator's intent survives the clamp.
    assert_eq!(report(&gov, 0).map(|r| r.setspeed), Some(1_800_000));
}

#[test]
fn test_limits_widen_again_restore_target() {
    let platform = sim();
    let gov = started(&platform);
    gov.set_speed(0, 1_800_000).unwrap();

    platform.set_limits(0, 800_000, 1_600_000).unwrap();
    gov.on_bounds_changed(0).unwrap();
    platform.set_limits(0, 800_000, 2_000_000).unwrap();
    gov.on_bounds_changed(0).unwrap();

    assert_eq!(
        platform.last_request(),
        Some(Request {
            unit: 0,
            freq: 1_800_000,
            relation: Relation::AtOrBelow,
        })
    );
    assert_eq!(gov.get_speed(0), Ok(1_800_000));
}

#[test]
fn test_limit_event_records_window_even_when_dispatch_fails() {
    let platform = sim();
    let gov = started(&platform);
    platform.reject(0, true).unwrap();

    platform.set_limits(0, 1_000_000, 1_600_000).unwrap();
    assert!(gov.on_bounds_changed(0).is_err());

    assert_eq!(
        report(&gov, 0).map(|r| r.window),
        Some(Window {
            min: 1_000_000,
            max: 1_600_000,
        })
    );
}

#[test]
fn test_limit_change_requests_stay_inside_bounds() {
    // (target, new min, new max, expected request)
    let cases = [
        (1_800_000, 800_000, 1_600_000, (1_600_000, Relation::AtOrAbove)),
        (1_000_000, 1_200_000, 2_000_000, (1_200_000, Relation::AtOrAbove)),
        (1_600_000, 1_000_000, 1_800_000, (1_600_000, Relation::AtOrBelow)),
    ];

    for (target, min, max, expected) in cases {
        let platform = sim();
        let gov = started(&platform);
        gov.set_speed(0, target).unwrap();

        platform.set_limits(0, min, max).unwrap();
        gov.on_bounds_changed(0).unwrap();

        let req = platform.last_request().unwrap();
        assert_eq!((req.freq, req.relation), expected, "target {target} in [{min}, {max}]");
        assert!(req.freq >= min && req.freq <= max);
        let cur = gov.get_speed(0).unwrap();
        assert!(cur >= min && cur <= max, "current {cur} outside [{min}, {max}]");
    }
}

#[test]
fn test_clamp_request_branches() {
    let bounds = Bounds::new(1_000, 2_000, 1_500);
    assert_eq!(clamp_request(2_500, &bounds), (2_000, Relation::AtOrAbove));
    assert_eq!(clamp_request(500, &bounds), (1_000, Relation::AtOrAbove));
    assert_eq!(clamp_request(1_000, &bounds), (1_000, Relation::AtOrBelow));
    assert_eq!(clamp_request(2_000, &bounds), (2_000, Relation::AtOrBelow));
}

#[test]
fn test_limits_on_unmanaged_unit_do_not_dispatch() {
    let platform = sim();
    let gov = governor(&platform);

    assert_eq!(gov.on_bounds_changed(0), Ok(()));
    gov.attach(0).unwrap();
    assert_eq!(gov.on_bounds_changed(0), Ok(()));
    assert_eq!(platform.request_count(), 0);
}

#[test]
fn test_failed_dispatch_keeps_target() {
    let platform = sim();
    let gov = started(&platform);
    platform.reject(0, true).unwrap();

    let err = gov.set_speed(0, 1_600_000).unwrap_err();
    assert_eq!(
        err,
        Error::InvalidFrequency {
            unit: 0,
            freq: 1_600_000,
            relation: Relation::AtOrBelow,
        }
    );
    assert_eq!(report(&gov, 0).map(|r| r.setspeed), Some(1_600_000));
    assert_eq!(gov.get_speed(0), Ok(1_200_000));

    // A later limit event retries the stored intent.
    platform.reject(0, false).unwrap();
    gov.on_bounds_changed(0).unwrap();
    assert_eq!(gov.get_speed(0), Ok(1_600_000));
}

#[test]
fn test_start_without_current_frequency_is_refused() {
    let platform = sim();
    platform.set_current(0, 0).unwrap();
    let gov = governor(&platform);
    gov.attach(0).unwrap();

    assert_eq!(gov.start(0), Err(Error::PreconditionViolation(0)));
    assert_eq!(report(&gov, 0).map(|r| r.managed), Some(false));
    assert_eq!(gov.set_speed(0, 1_000_000), Err(Error::NotManaged(0)));
}

#[test]
fn test_start_requires_attach() {
    let platform = sim();
    let gov = governor(&platform);

    assert_eq!(gov.start(0), Err(Error::NotAttached(0)));
    assert_eq!(gov.start(7), Err(Error::UnknownUnit(7)));
}

#[test]
fn test_stop_is_idempotent() {
    let platform = sim();
    let gov = started(&platform);
    gov.set_speed(0, 1_600_000).unwrap();

    for _ in 0..2 {
        gov.stop(0);
        assert_eq!(
            report(&gov, 0),
            Some(UnitReport {
                id: 0,
                managed: false,
                setspeed: 0,
                window: Window::default(),
            })
        );
    }
    // Hardware keeps the last frequency.
    assert_eq!(gov.get_speed(0), Ok(1_600_000));
    assert_eq!(platform.request_count(), 1);
}

#[test]
fn test_operations_after_detach_fail_cleanly() {
    let platform = sim();
    let gov = started(&platform);
    gov.stop(0);
    gov.detach(0);

    assert!(gov.units().is_empty());
    assert_eq!(gov.set_speed(0, 1_000_000), Err(Error::NotManaged(0)));
    assert_eq!(gov.on_bounds_changed(0), Ok(()));
    assert_eq!(gov.get_speed(0), Ok(1_200_000));
    gov.stop(0);
    gov.detach(0);

    // The unit can be attached again from scratch.
    gov.attach(0).unwrap();
    gov.start(0).unwrap();
    assert_eq!(report(&gov, 0).map(|r| r.setspeed), Some(1_200_000));
}

#[test]
fn test_detach_while_managed_drops_oversight() {
    let platform = sim();
    let gov = started(&platform);
    gov.set_speed(0, 1_800_000).unwrap();
    gov.detach(0);

    assert!(gov.units().is_empty());
    assert_eq!(gov.set_speed(0, 1_000_000), Err(Error::NotManaged(0)));
    assert_eq!(gov.get_speed(0), Ok(1_800_000));
}

#[test]
fn test_attach_twice_is_rejected() {
    let platform = sim();
    let gov = started(&platform);

    assert_eq!(gov.attach(0), Err(Error::AlreadyAttached(0)));
    assert_eq!(report(&gov, 0).map(|r| r.managed), Some(true));
}

#[test]
fn test_concurrent_sets_and_stop_serialize() {
    let platform = Arc::new(
        SimPlatform::new()
            .with_unit(0, Bounds::new(800_000, 2_000_000, 1_200_000), FREQS.to_vec())
            .with_unit(1, Bounds::new(800_000, 2_000_000, 1_000_000), FREQS.to_vec()),
    );
    let gov = Arc::new(SetSpeed::new(platform.clone(), platform.clone()));
    for unit in [0, 1] {
        gov.attach(unit).unwrap();
        gov.start(unit).unwrap();
    }

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let gov = gov.clone();
            thread::spawn(move || {
                let unit = i % 2;
                for _ in 0..100 {
                    let freq = FREQS[i as usize % FREQS.len()];
                    match gov.set_speed(unit, freq) {
                        Ok(()) | Err(Error::NotManaged(_)) => {}
                        Err(err) => panic!("unexpected error: {err}"),
                    }
                }
            })
        })
        .collect();
    gov.stop(1);
    for handle in handles {
        handle.join().unwrap();
    }
    gov.stop(1);

    let reports = gov.units();
    assert_eq!(reports.len(), 2);
    assert!(reports[0].managed);
    assert!(FREQS.contains(&reports[0].setspeed));
    assert_eq!((reports[1].managed, reports[1].setspeed), (false, 0));
    // Every recorded request targeted a managed unit with a supported frequency.
    assert!(platform.requests().iter().all(|r| FREQS.contains(&r.freq)));
}
