use orgdir_core::db::open_db_in_memory;
use orgdir_core::{
    Activity, ActivityService, BoundingBox, Building, BuildingService, DirectoryConfig, GeoPoint,
    NewBuilding, NewOrganization, Organization, OrganizationId, OrganizationPatch,
    OrganizationService, OrganizationServiceError, SqliteActivityRepository,
    OrganizationRepository, SqliteBuildingRepository, SqliteOrganizationRepository,
    ValidationError,
};
use rusqlite::{params, Connection};
use uuid::Uuid;

type Directory<'conn> = OrganizationService<
    SqliteActivityRepository<'conn>,
    SqliteBuildingRepository<'conn>,
    SqliteOrganizationRepository<'conn>,
>;

struct Fixture {
    food: Activity,
    meat: Activity,
    dairy: Activity,
    cars: Activity,
    trucks: Activity,
    red_square: Building,
    nearby_block: Building,
    nevsky: Building,
    horns: Organization,
    milk: Organization,
    truck_depot: Organization,
    grocery: Organization,
    northern: Organization,
}

fn directory(conn: &Connection) -> Directory<'_> {
    OrganizationService::new(
        SqliteActivityRepository::try_new(conn).unwrap(),
        SqliteBuildingRepository::try_new(conn).unwrap(),
        SqliteOrganizationRepository::try_new(conn).unwrap(),
        &DirectoryConfig::default(),
    )
}

fn organization(
    name: &str,
    building: &Building,
    phones: &[&str],
    activities: &[&Activity],
) -> NewOrganization {
    NewOrganization {
        building_id: Some(building.id),
        phones: phones.iter().map(|phone| phone.to_string()).collect(),
        activity_ids: activities.iter().map(|activity| activity.id).collect(),
        ..NewOrganization::new(name)
    }
}

fn seed(conn: &Connection, directory: &Directory<'_>) -> Fixture {
    let activities = ActivityService::new(
        SqliteActivityRepository::try_new(conn).unwrap(),
        &DirectoryConfig::default(),
    );
    let food = activities.create_activity("Food", None, None).unwrap();
    let meat = activities
        .create_activity("Meat products", None, Some(food.id))
        .unwrap();
    let dairy = activities
        .create_activity("Dairy products", None, Some(food.id))
        .unwrap();
    let cars = activities.create_activity("Cars", None, None).unwrap();
    let trucks = activities
        .create_activity("Trucks", None, Some(cars.id))
        .unwrap();

    let buildings = BuildingService::new(SqliteBuildingRepository::try_new(conn).unwrap());
    let red_square = buildings
        .create_building(&NewBuilding::new("Moscow, Red Square 1", 55.7558, 37.6173))
        .unwrap();
    let nearby_block = buildings
        .create_building(&NewBuilding::new("Moscow, Tverskaya 7", 55.7600, 37.6100))
        .unwrap();
    let nevsky = buildings
        .create_building(&NewBuilding::new(
            "Saint Petersburg, Nevsky 28",
            59.9343,
            30.3351,
        ))
        .unwrap();

    let create = |draft: NewOrganization| directory.create_organization(&draft).unwrap();
    let horns = create(organization(
        "Horns and Hooves",
        &red_square,
        &["2-222-222", "3-333-333"],
        &[&meat],
    ));
    let milk = create(organization(
        "Milky Way Dairy",
        &red_square,
        &["8-923-666-13-13"],
        &[&dairy],
    ));
    let truck_depot = create(organization(
        "Truck Depot",
        &nearby_block,
        &["4-444-444"],
        &[&trucks],
    ));
    let grocery = create(organization(
        "Corner Grocery",
        &nearby_block,
        &[],
        &[&meat, &dairy],
    ));
    let northern = create(organization(
        "Northern Motors",
        &nevsky,
        &["5-555-555"],
        &[&cars],
    ));

    Fixture {
        food,
        meat,
        dairy,
        cars,
        trucks,
        red_square,
        nearby_block,
        nevsky,
        horns,
        milk,
        truck_depot,
        grocery,
        northern,
    }
}

fn ids(organizations: &[Organization]) -> Vec<OrganizationId> {
    organizations.iter().map(|organization| organization.id).collect()
}

#[test]
fn create_persists_phones_and_activity_links() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);

    let loaded = directory.get_organization(fixture.horns.id).unwrap();
    assert_eq!(loaded.name, "Horns and Hooves");
    assert_eq!(loaded.building_id, Some(fixture.red_square.id));
    assert_eq!(loaded.phones, vec!["2-222-222", "3-333-333"]);
    assert_eq!(loaded.activity_ids, vec![fixture.meat.id]);
    assert!(loaded.created_at > 0);
    assert_eq!(loaded, fixture.horns);

    let grocery = directory.get_organization(fixture.grocery.id).unwrap();
    assert!(grocery.phones.is_empty());
    assert_eq!(grocery.activity_ids, vec![fixture.meat.id, fixture.dairy.id]);
}

#[test]
fn create_rejects_unknown_references_and_invalid_fields() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);

    let missing = Uuid::new_v4();
    let err = directory
        .create_organization(&NewOrganization {
            building_id: Some(missing),
            ..NewOrganization::new("Ghost Office")
        })
        .unwrap_err();
    assert!(matches!(err, OrganizationServiceError::BuildingNotFound(id) if id == missing));

    let err = directory
        .create_organization(&NewOrganization {
            activity_ids: vec![fixture.meat.id, missing],
            ..NewOrganization::new("Ghost Butcher")
        })
        .unwrap_err();
    assert!(matches!(err, OrganizationServiceError::ActivityNotFound(id) if id == missing));

    let err = directory
        .create_organization(&NewOrganization::new("  "))
        .unwrap_err();
    assert!(matches!(
        err,
        OrganizationServiceError::Validation(ValidationError::Blank { .. })
    ));

    let err = directory
        .create_organization(&NewOrganization {
            phones: vec!["1".repeat(51)],
            ..NewOrganization::new("Long Line")
        })
        .unwrap_err();
    assert!(matches!(
        err,
        OrganizationServiceError::Validation(ValidationError::TooLong { max_chars: 50, .. })
    ));

    assert_eq!(directory.list_organizations(None, 0).unwrap().len(), 5);
}

#[test]
fn duplicate_activity_ids_are_linked_once() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);

    let created = directory
        .create_organization(&NewOrganization {
            activity_ids: vec![fixture.meat.id, fixture.meat.id],
            ..NewOrganization::new("Double Butcher")
        })
        .unwrap();

    assert_eq!(created.activity_ids, vec![fixture.meat.id]);
    assert_eq!(created.building_id, None);
}

#[test]
fn update_replaces_collections_and_keeps_untouched_fields() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);

    let updated = directory
        .update_organization(
            fixture.horns.id,
            &OrganizationPatch {
                phones: Some(vec!["7-777-777".to_string()]),
                activity_ids: Some(vec![fixture.trucks.id]),
                building_id: Some(Some(fixture.nevsky.id)),
                ..OrganizationPatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.name, "Horns and Hooves");
    assert_eq!(updated.phones, vec!["7-777-777"]);
    assert_eq!(updated.activity_ids, vec![fixture.trucks.id]);
    assert_eq!(updated.building_id, Some(fixture.nevsky.id));

    let detached = directory
        .update_organization(
            fixture.horns.id,
            &OrganizationPatch {
                name: Some("Horns & Hooves".to_string()),
                building_id: Some(None),
                ..OrganizationPatch::default()
            },
        )
        .unwrap();
    assert_eq!(detached.name, "Horns & Hooves");
    assert_eq!(detached.building_id, None);
    assert_eq!(detached.phones, vec!["7-777-777"]);
}

#[test]
fn update_rejects_unknown_targets() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);
    let missing = Uuid::new_v4();

    assert!(matches!(
        directory.update_organization(missing, &OrganizationPatch::default()),
        Err(OrganizationServiceError::NotFound(id)) if id == missing
    ));
    assert!(matches!(
        directory.update_organization(
            fixture.milk.id,
            &OrganizationPatch {
                activity_ids: Some(vec![missing]),
                ..OrganizationPatch::default()
            },
        ),
        Err(OrganizationServiceError::ActivityNotFound(_))
    ));
    assert_eq!(
        directory.get_organization(fixture.milk.id).unwrap().activity_ids,
        vec![fixture.dairy.id]
    );
}

#[test]
fn delete_removes_organization() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);

    assert!(directory.delete_organization(fixture.milk.id).unwrap());
    assert!(!directory.delete_organization(fixture.milk.id).unwrap());
    assert!(matches!(
        directory.get_organization(fixture.milk.id),
        Err(OrganizationServiceError::NotFound(_))
    ));
    assert_eq!(
        ids(&directory.by_activity(fixture.dairy.id).unwrap()),
        vec![fixture.grocery.id]
    );
}

#[test]
fn by_building_lists_tenants() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);

    assert_eq!(
        ids(&directory.by_building(fixture.red_square.id).unwrap()),
        vec![fixture.horns.id, fixture.milk.id]
    );
    assert_eq!(
        ids(&directory.by_building(fixture.nevsky.id).unwrap()),
        vec![fixture.northern.id]
    );
    assert!(matches!(
        directory.by_building(Uuid::new_v4()),
        Err(OrganizationServiceError::BuildingNotFound(_))
    ));
}

#[test]
fn deleting_building_deletes_its_organizations() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);
    let buildings = BuildingService::new(SqliteBuildingRepository::try_new(&conn).unwrap());

    assert!(buildings.delete_building(fixture.red_square.id).unwrap());

    for gone in [fixture.horns.id, fixture.milk.id] {
        assert!(matches!(
            directory.get_organization(gone),
            Err(OrganizationServiceError::NotFound(id)) if id == gone
        ));
    }
    assert_eq!(
        ids(&directory.list_organizations(None, 0).unwrap()),
        vec![fixture.truck_depot.id, fixture.grocery.id, fixture.northern.id]
    );
    assert_eq!(
        ids(&directory.by_activity(fixture.food.id).unwrap()),
        vec![fixture.grocery.id]
    );

    let orphan_rows: i64 = conn
        .query_row(
            "SELECT
                (SELECT COUNT(*) FROM organization_phones WHERE organization_id IN (?1, ?2))
              + (SELECT COUNT(*) FROM organization_activities WHERE organization_id IN (?1, ?2));",
            [fixture.horns.id.to_string(), fixture.milk.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphan_rows, 0);
}

#[test]
fn by_activity_includes_descendant_activities() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);

    assert_eq!(
        ids(&directory.by_activity(fixture.food.id).unwrap()),
        vec![fixture.horns.id, fixture.milk.id, fixture.grocery.id]
    );
    assert_eq!(
        ids(&directory.by_activity(fixture.cars.id).unwrap()),
        vec![fixture.truck_depot.id, fixture.northern.id]
    );
    assert_eq!(
        ids(&directory.by_activity(fixture.trucks.id).unwrap()),
        vec![fixture.truck_depot.id]
    );
    assert!(directory.by_activity(Uuid::new_v4()).unwrap().is_empty());
}

#[test]
fn deleting_activity_subtree_drops_organization_links() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);
    let activities = ActivityService::new(
        SqliteActivityRepository::try_new(&conn).unwrap(),
        &DirectoryConfig::default(),
    );

    assert!(activities.delete_activity(fixture.food.id).unwrap());

    let grocery = directory.get_organization(fixture.grocery.id).unwrap();
    assert!(grocery.activity_ids.is_empty());
    assert!(directory.search_by_activity_name("dairy").unwrap().is_empty());
}

#[test]
fn search_by_name_ignores_case() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);

    assert_eq!(
        ids(&directory.search_by_name("  HORNS ").unwrap()),
        vec![fixture.horns.id]
    );
    assert_eq!(
        ids(&directory.search_by_name("or").unwrap()),
        vec![fixture.horns.id, fixture.grocery.id, fixture.northern.id]
    );
    assert!(directory.search_by_name("bakery").unwrap().is_empty());
}

#[test]
fn search_by_activity_name_broadens_to_descendants() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);

    assert_eq!(
        ids(&directory.search_by_activity_name("food").unwrap()),
        vec![fixture.horns.id, fixture.milk.id, fixture.grocery.id]
    );
    assert_eq!(
        ids(&directory.search_by_activity_name("PRODUCTS").unwrap()),
        vec![fixture.horns.id, fixture.milk.id, fixture.grocery.id]
    );
    assert_eq!(
        ids(&directory.search_by_activity_name("truck").unwrap()),
        vec![fixture.truck_depot.id]
    );
    assert!(directory.search_by_activity_name("bakery").unwrap().is_empty());
}

#[test]
fn nearby_uses_explicit_or_default_radius() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);
    let center = GeoPoint::new(55.7558, 37.6173);

    // Tverskaya is roughly 650 m from the center.
    assert_eq!(
        ids(&directory.nearby(center, Some(100.0)).unwrap()),
        vec![fixture.horns.id, fixture.milk.id]
    );
    assert_eq!(
        ids(&directory.nearby(center, None).unwrap()),
        vec![
            fixture.horns.id,
            fixture.milk.id,
            fixture.truck_depot.id,
            fixture.grocery.id
        ]
    );
    assert_eq!(directory.nearby(center, Some(700_000.0)).unwrap().len(), 5);
    assert!(directory
        .nearby(GeoPoint::new(0.0, 0.0), None)
        .unwrap()
        .is_empty());
}

#[test]
fn nearby_honors_configured_default_radius() {
    let conn = open_db_in_memory().unwrap();
    let seeded = directory(&conn);
    let fixture = seed(&conn, &seeded);
    let narrow = OrganizationService::new(
        SqliteActivityRepository::try_new(&conn).unwrap(),
        SqliteBuildingRepository::try_new(&conn).unwrap(),
        SqliteOrganizationRepository::try_new(&conn).unwrap(),
        &DirectoryConfig {
            default_search_radius_m: 50.0,
            ..DirectoryConfig::default()
        },
    );

    let found = narrow
        .nearby(GeoPoint::new(55.7600, 37.6100), None)
        .unwrap();
    assert_eq!(
        ids(&found),
        vec![fixture.truck_depot.id, fixture.grocery.id]
    );
    assert_eq!(fixture.nearby_block.latitude, 55.7600);
}

#[test]
fn in_area_uses_closed_rectangle() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);

    let moscow = BoundingBox::new(55.0, 56.0, 37.0, 38.0);
    assert_eq!(
        ids(&directory.in_area(&moscow).unwrap()),
        vec![
            fixture.horns.id,
            fixture.milk.id,
            fixture.truck_depot.id,
            fixture.grocery.id
        ]
    );

    let edge = BoundingBox::new(59.9343, 60.0, 30.3351, 31.0);
    assert_eq!(
        ids(&directory.in_area(&edge).unwrap()),
        vec![fixture.northern.id]
    );

    let inverted = BoundingBox::new(56.0, 55.0, 37.0, 38.0);
    assert!(directory.in_area(&inverted).unwrap().is_empty());
}

#[test]
fn list_organizations_paginates() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);

    assert_eq!(
        ids(&directory.list_organizations(Some(2), 2).unwrap()),
        vec![fixture.truck_depot.id, fixture.grocery.id]
    );
    assert_eq!(
        ids(&directory.list_organizations(None, 4).unwrap()),
        vec![fixture.northern.id]
    );
}

#[test]
fn organization_serializes_to_json() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);

    let value = serde_json::to_value(&fixture.horns).unwrap();
    assert_eq!(value["name"], "Horns and Hooves");
    assert_eq!(value["phones"][1], "3-333-333");
    assert_eq!(value["building_id"], fixture.red_square.id.to_string());

    let decoded: Organization = serde_json::from_value(value).unwrap();
    assert_eq!(decoded, fixture.horns);
}

#[test]
fn nearby_handles_more_buildings_than_sql_host_parameters() {
    const CROWDED: usize = 33_000;
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let center = GeoPoint::new(55.7558, 37.6173);

    let tx = conn.unchecked_transaction().unwrap();
    {
        let mut stmt = tx
            .prepare(
                "INSERT INTO buildings (id, address, latitude, longitude)
                 VALUES (?1, ?2, ?3, ?4);",
            )
            .unwrap();
        for index in 0..CROWDED {
            stmt.execute(params![
                Uuid::new_v4().to_string(),
                format!("Tower block {index}"),
                center.latitude,
                center.longitude
            ])
            .unwrap();
        }
    }
    tx.commit().unwrap();

    let buildings = BuildingService::new(SqliteBuildingRepository::try_new(&conn).unwrap());
    let last = buildings.list_buildings(Some(1), CROWDED as u32 - 1).unwrap();
    let tenant = directory
        .create_organization(&NewOrganization {
            building_id: Some(last[0].id),
            ..NewOrganization::new("Last Tenant")
        })
        .unwrap();

    assert_eq!(ids(&directory.nearby(center, None).unwrap()), vec![tenant.id]);
    let area = BoundingBox::new(55.0, 56.0, 37.0, 38.0);
    assert_eq!(ids(&directory.in_area(&area).unwrap()), vec![tenant.id]);
}

#[test]
fn activity_lookup_accepts_more_ids_than_sql_host_parameters() {
    let conn = open_db_in_memory().unwrap();
    let directory = directory(&conn);
    let fixture = seed(&conn, &directory);
    let repo = SqliteOrganizationRepository::try_new(&conn).unwrap();

    let mut activity_ids: Vec<_> = (0..40_000).map(|_| Uuid::new_v4()).collect();
    activity_ids.push(fixture.trucks.id);
    assert_eq!(
        ids(&repo.list_by_activities(&activity_ids).unwrap()),
        vec![fixture.truck_depot.id]
    );

    let mut building_ids: Vec<_> = (0..40_000).map(|_| Uuid::new_v4()).collect();
    building_ids.insert(0, fixture.nevsky.id);
    assert_eq!(
        ids(&repo.list_by_buildings(&building_ids).unwrap()),
        vec![fixture.northern.id]
    );
}
