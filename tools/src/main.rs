//! shop-runner: headless demo driver for the booking engine.
//!
//! Seeds a shop with a catalog, policy and weekly schedule, generates one
//! week of trip slots, books divers until a slot fills, and prints the
//! resulting availability table.
//!
//! Usage:
//!   shop-runner --db shop.db --week 2025-06-09 --staff 2
//!   shop-runner --json

use anyhow::Result;
use chrono::NaiveDate;
use reefbook_core::availability::list_available_trips;
use reefbook_core::booking::{BookingService, DiverDetails, NewTripBooking};
use reefbook_core::capacity::generate_pairing_rules;
use reefbook_core::cert::CertLevel;
use reefbook_core::config::{BeginnerThreshold, CapacityConfig};
use reefbook_core::error::ShopError;
use reefbook_core::schedule::{plan_week_slots, week_start, DayOfWeek, ScheduleTemplateSlot, TimeSlot, TripDuration};
use reefbook_core::store::{DiveLocation, ShopFunDive, ShopStore};
use reefbook_core::types::new_entity_id;
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let week_arg = args
        .windows(2)
        .find(|w| w[0] == "--week")
        .map(|w| w[1].as_str())
        .unwrap_or("2025-06-09");
    let staff = parse_arg(&args, "--staff", 2u32);
    let json = args.iter().any(|a| a == "--json");

    let week = week_start(week_arg.parse::<NaiveDate>()?);

    if !json {
        println!("reefbook — shop-runner");
        println!("  db:    {db}");
        println!("  week:  {week}");
        println!("  staff: {staff}");
        println!();
    }

    let db_effective: String = if db == ":memory:" {
        format!("file:shoprun_{}?mode=memory&cache=shared", unix_now())
    } else {
        db.to_string()
    };
    let store = ShopStore::open(&db_effective)?;
    store.migrate()?;

    let shop_id = seed_shop(&store, staff, week)?;
    generate_week(&store, &shop_id, week, json)?;
    book_until_full(&store, &shop_id, week, json)?;
    print_availability(&store, &shop_id, week, json)?;

    Ok(())
}

/// Seed a demo shop: one location, one fun dive, daily morning templates,
/// the 5/3 policy and the requested weekly headcount.
fn seed_shop(store: &ShopStore, staff: u32, week: NaiveDate) -> Result<String> {
    let shop_id = new_entity_id();
    store.insert_shop(&shop_id, "Blue Reef Divers", "Tulum")?;

    let location_id = new_entity_id();
    store.insert_dive_location(&DiveLocation {
        dive_location_id: location_id.clone(),
        name: "House Reef".into(),
        description: Some("Sheltered reef, 18m max".into()),
        max_depth_m: Some(18.0),
    })?;

    let fun_dive_id = new_entity_id();
    store.insert_fun_dive(&ShopFunDive {
        shop_fun_dive_id: fun_dive_id.clone(),
        shop_id: shop_id.clone(),
        dive_location_id: location_id,
        price_1_tank: 60.0,
        price_2_tank: 95.0,
        active: true,
    })?;

    store.set_beginner_threshold(
        &shop_id,
        &BeginnerThreshold {
            min_cert_level: CertLevel::Rescue,
            min_dives_logged: 20,
        },
    )?;
    store.set_capacity_config(
        &shop_id,
        &CapacityConfig {
            max_experienced_per_staff: 5,
            max_beginners_per_staff: 3,
        },
    )?;
    store.replace_pairing_rules(&shop_id, &generate_pairing_rules(5, 3)?)?;
    for (name, role) in [("Maya", "instructor"), ("Jonas", "divemaster"), ("Priya", "guide")] {
        store.insert_staff(&new_entity_id(), &shop_id, name, role)?;
    }
    log::debug!(
        "shop={shop_id} seeded with {} active staff on the books",
        store.active_staff_count(&shop_id)?
    );
    store.set_weekly_staff(&shop_id, week, staff)?;

    for dow in [
        DayOfWeek::Mon,
        DayOfWeek::Tue,
        DayOfWeek::Wed,
        DayOfWeek::Thu,
        DayOfWeek::Fri,
    ] {
        store.insert_template_slot(&ScheduleTemplateSlot {
            template_slot_id: new_entity_id(),
            shop_id: shop_id.clone(),
            day_of_week: dow,
            shop_fun_dive_id: fun_dive_id.clone(),
            trip_duration: TripDuration::HalfDay,
            time_slot: TimeSlot::Morning,
            active: true,
        })?;
    }

    Ok(shop_id)
}

fn generate_week(store: &ShopStore, shop_id: &str, week: NaiveDate, json: bool) -> Result<()> {
    let templates = store.active_template_slots(shop_id)?;
    let overrides = store.overrides_for_week(shop_id, week)?;
    let plan = plan_week_slots(&templates, &overrides, week);
    let inserted = store.regenerate_week_slots(shop_id, week, &plan)?;
    if !json {
        println!("generated {inserted} trip slots for week of {week}");
    }
    Ok(())
}

/// Book alternating beginner/experienced walk-ins into the Monday slot until
/// one of the two sides refuses.
fn book_until_full(store: &ShopStore, shop_id: &str, week: NaiveDate, json: bool) -> Result<()> {
    let service = BookingService::new(store);
    let slots = store.open_trip_slots(shop_id, week, week)?;
    let Some(slot) = slots.first() else {
        log::warn!("no Monday slot to book");
        return Ok(());
    };

    if !json {
        println!();
    }
    for i in 0.. {
        let beginner = i % 2 == 0;
        let diver = DiverDetails {
            email: format!("diver{i}@example.com"),
            first_name: format!("Diver{i}"),
            last_name: "Demo".into(),
            phone: "".into(),
            cert_level: if beginner { CertLevel::OpenWater } else { CertLevel::Rescue },
            num_dives_logged: if beginner { 5 } else { 120 },
        };
        let req = NewTripBooking {
            trip_slot_id: slot.trip_slot_id.clone(),
            diver,
            num_dives: 1,
            walk_in: true,
            booked_on: week,
        };
        match service.book_trip(&req) {
            Ok(outcome) => {
                if !json {
                    println!(
                        "  booked {} diver #{i} ({})",
                        outcome.class,
                        outcome.status.as_str()
                    );
                }
            }
            Err(ShopError::SlotFull { class, .. }) => {
                if !json {
                    let confirmed = store.booking_count(&slot.trip_slot_id, "confirmed")?;
                    println!(
                        "  slot full for {class} divers after {confirmed} confirmed admissions"
                    );
                }
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn print_availability(store: &ShopStore, shop_id: &str, week: NaiveDate, json: bool) -> Result<()> {
    let week_end = week + chrono::Days::new(6);
    let trips = list_available_trips(store, shop_id, week, week_end)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&trips)?);
        return Ok(());
    }

    println!();
    println!("=== WEEK AVAILABILITY ===");
    for trip in &trips {
        let cap = &trip.capacity;
        println!(
            "  {} {:9} | staff {} | beginners {}/{} | experienced {}/{}{}",
            trip.slot.date,
            trip.slot.time_slot.as_str(),
            cap.available_staff,
            cap.num_beginners,
            cap.max_beginners,
            cap.num_experienced,
            cap.max_experienced,
            if trip.is_full() { " | FULL" } else { "" },
        );
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn unix_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
