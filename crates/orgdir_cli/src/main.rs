//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `orgdir_core` linkage end to end: open storage, seed a sample
//!   directory when empty, print the activity tree and one nearby search.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `orgdir_cli [DB_PATH]`. Without a path an in-memory database is used.
//! Set `ORGDIR_LOG_DIR` (absolute) to also write core logs there.

use log::info;
use orgdir_core::db::{open_db, open_db_in_memory};
use orgdir_core::{
    default_log_level, init_logging, ActivityNode, ActivityService, BuildingService,
    DirectoryConfig, GeoPoint, NewBuilding, NewOrganization, OrganizationService,
    SqliteActivityRepository, SqliteBuildingRepository, SqliteOrganizationRepository,
};
use rusqlite::Connection;
use std::error::Error;
use std::process::ExitCode;

const SAMPLE_CENTER: GeoPoint = GeoPoint::new(55.7558, 37.6173);
const ENV_LOG_DIR: &str = "ORGDIR_LOG_DIR";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("orgdir_cli error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    println!("orgdir_core version={}", orgdir_core::core_version());

    if let Ok(log_dir) = std::env::var(ENV_LOG_DIR) {
        init_logging(default_log_level(), &log_dir)?;
    }
    let config = DirectoryConfig::from_env()?;
    let conn = match std::env::args().nth(1) {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };

    let activities = ActivityService::new(SqliteActivityRepository::try_new(&conn)?, &config);
    if activities.list_roots(Some(1), 0)?.is_empty() {
        let tx = conn.unchecked_transaction()?;
        seed_sample_directory(&tx, &config)?;
        tx.commit()?;
        info!("event=cli_seed module=cli status=ok");
        println!("seeded sample directory");
    }

    println!("activities:");
    for node in activities.tree(None)? {
        print_node(&node, 1);
    }

    let directory = OrganizationService::new(
        SqliteActivityRepository::try_new(&conn)?,
        SqliteBuildingRepository::try_new(&conn)?,
        SqliteOrganizationRepository::try_new(&conn)?,
        &config,
    );
    let nearby = directory.nearby(SAMPLE_CENTER, None)?;
    println!(
        "nearby lat={} lon={} radius_m={} count={}",
        SAMPLE_CENTER.latitude,
        SAMPLE_CENTER.longitude,
        config.default_search_radius_m,
        nearby.len()
    );
    for organization in nearby {
        println!("  {} phones={}", organization.name, organization.phones.join(","));
    }
    Ok(())
}

fn print_node(node: &ActivityNode, depth: usize) {
    println!(
        "{}{} (level {})",
        "  ".repeat(depth),
        node.activity.name,
        node.activity.level
    );
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

/// Writes the sample activity trees, buildings and organizations.
fn seed_sample_directory(
    conn: &Connection,
    config: &DirectoryConfig,
) -> Result<(), Box<dyn Error>> {
    let activities = ActivityService::new(SqliteActivityRepository::try_new(conn)?, config);
    let food = activities.create_activity("Food", None, None)?;
    let meat = activities.create_activity("Meat products", None, Some(food.id))?;
    let dairy = activities.create_activity("Dairy products", None, Some(food.id))?;
    let cars = activities.create_activity("Cars", None, None)?;
    let trucks = activities.create_activity("Trucks", None, Some(cars.id))?;
    let light = activities.create_activity("Light vehicles", None, Some(cars.id))?;
    let parts = activities.create_activity("Parts", None, Some(light.id))?;
    let accessories = activities.create_activity("Accessories", None, Some(light.id))?;

    let buildings = BuildingService::new(SqliteBuildingRepository::try_new(conn)?);
    let red_square =
        buildings.create_building(&NewBuilding::new("Moscow, Red Square 1", 55.7558, 37.6173))?;
    let tverskaya =
        buildings.create_building(&NewBuilding::new("Moscow, Tverskaya 7", 55.7600, 37.6100))?;
    let nevsky = buildings.create_building(&NewBuilding::new(
        "Saint Petersburg, Nevsky 28",
        59.9343,
        30.3351,
    ))?;

    let directory = OrganizationService::new(
        SqliteActivityRepository::try_new(conn)?,
        SqliteBuildingRepository::try_new(conn)?,
        SqliteOrganizationRepository::try_new(conn)?,
        config,
    );
    let samples = [
        ("Horns and Hooves", red_square.id, vec!["2-222-222", "3-333-333"], vec![meat.id]),
        ("Milky Way Dairy", red_square.id, vec!["8-923-666-13-13"], vec![dairy.id]),
        ("Truck Depot", tverskaya.id, vec!["4-444-444"], vec![trucks.id]),
        ("Auto Bits", tverskaya.id, vec!["6-666-666"], vec![parts.id, accessories.id]),
        ("Northern Motors", nevsky.id, vec!["5-555-555"], vec![cars.id]),
    ];
    for (name, building_id, phones, activity_ids) in samples {
        directory.create_organization(&NewOrganization {
            building_id: Some(building_id),
            phones: phones.into_iter().map(str::to_string).collect(),
            activity_ids,
            ..NewOrganization::new(name)
        })?;
    }
    Ok(())
}
