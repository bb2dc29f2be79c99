use reefbook_core::capacity::generate_pairing_rules;
use reefbook_core::cert::CertLevel;
use reefbook_core::config::{
    BeginnerThreshold, CapacityConfig, PairingRule, DEFAULT_MAX_BEGINNERS_PER_STAFF,
    DEFAULT_MIN_CERT_LEVEL, DEFAULT_MIN_DIVES_LOGGED,
};
use reefbook_core::error::ShopError;
use reefbook_core::store::ShopStore;

fn seeded() -> ShopStore {
    let store = ShopStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.insert_shop("shop-1", "Blue Reef Divers", "Tulum").unwrap();
    store
}

#[test]
fn unconfigured_shop_resolves_to_fail_closed_defaults() {
    let store = seeded();
    let policy = store.shop_policy("shop-1").unwrap();
    assert_eq!(policy.threshold.min_cert_level, DEFAULT_MIN_CERT_LEVEL);
    assert_eq!(policy.threshold.min_dives_logged, DEFAULT_MIN_DIVES_LOGGED);
    assert_eq!(
        policy.capacity.max_beginners_per_staff,
        DEFAULT_MAX_BEGINNERS_PER_STAFF
    );
    // With no stored table the policy carries a generated one, dense from 0
    // up to the beginner cap.
    assert_eq!(
        policy.pairing_rules.len() as u32,
        policy.capacity.max_beginners_per_staff + 1
    );
    assert_eq!(policy.pairing_rules[0].num_beginners, 0);
}

#[test]
fn threshold_and_caps_round_trip() {
    let store = seeded();
    let threshold = BeginnerThreshold {
        min_cert_level: CertLevel::Advanced,
        min_dives_logged: 50,
    };
    store.set_beginner_threshold("shop-1", &threshold).unwrap();
    store
        .set_capacity_config(
            "shop-1",
            &CapacityConfig {
                max_experienced_per_staff: 4,
                max_beginners_per_staff: 2,
            },
        )
        .unwrap();

    let policy = store.shop_policy("shop-1").unwrap();
    assert_eq!(policy.threshold.min_cert_level, CertLevel::Advanced);
    assert_eq!(policy.threshold.min_dives_logged, 50);
    assert_eq!(policy.capacity.max_experienced_per_staff, 4);
}

#[test]
fn upsert_overwrites_the_previous_threshold() {
    let store = seeded();
    store
        .set_beginner_threshold(
            "shop-1",
            &BeginnerThreshold {
                min_cert_level: CertLevel::Rescue,
                min_dives_logged: 20,
            },
        )
        .unwrap();
    store
        .set_beginner_threshold(
            "shop-1",
            &BeginnerThreshold {
                min_cert_level: CertLevel::Divemaster,
                min_dives_logged: 100,
            },
        )
        .unwrap();
    let stored = store.beginner_threshold("shop-1").unwrap().unwrap();
    assert_eq!(stored.min_cert_level, CertLevel::Divemaster);
    assert_eq!(stored.min_dives_logged, 100);
}

#[test]
fn zero_caps_never_reach_the_database() {
    let store = seeded();
    let err = store
        .set_capacity_config(
            "shop-1",
            &CapacityConfig {
                max_experienced_per_staff: 5,
                max_beginners_per_staff: 0,
            },
        )
        .unwrap_err();
    assert!(matches!(err, ShopError::InvalidConfig { .. }));
    assert!(store.capacity_config("shop-1").unwrap().is_none());
}

#[test]
fn pairing_rules_round_trip_sorted() {
    let store = seeded();
    let rules = generate_pairing_rules(6, 3).unwrap();
    store.replace_pairing_rules("shop-1", &rules).unwrap();
    let stored = store.pairing_rules("shop-1").unwrap();
    assert_eq!(stored, rules);
    assert_eq!(
        stored.last(),
        Some(&PairingRule {
            num_beginners: 3,
            max_experienced_allowed: 0
        })
    );
}

#[test]
fn non_monotonic_table_is_rejected_and_old_table_kept() {
    let store = seeded();
    let good = generate_pairing_rules(5, 3).unwrap();
    store.replace_pairing_rules("shop-1", &good).unwrap();

    let bad = vec![
        PairingRule { num_beginners: 0, max_experienced_allowed: 2 },
        PairingRule { num_beginners: 1, max_experienced_allowed: 5 },
    ];
    let err = store.replace_pairing_rules("shop-1", &bad).unwrap_err();
    assert!(matches!(err, ShopError::InvalidConfig { .. }));
    assert_eq!(store.pairing_rules("shop-1").unwrap(), good);
}

#[test]
fn duplicate_rows_are_rejected() {
    let store = seeded();
    let bad = vec![
        PairingRule { num_beginners: 1, max_experienced_allowed: 4 },
        PairingRule { num_beginners: 1, max_experienced_allowed: 3 },
    ];
    let err = store.replace_pairing_rules("shop-1", &bad).unwrap_err();
    assert!(matches!(err, ShopError::InvalidConfig { .. }));
}
