use orgdir_core::db::open_db_in_memory;
use orgdir_core::{
    BoundingBox, BuildingPatch, BuildingRepository, BuildingService, BuildingServiceError,
    NewBuilding, SqliteBuildingRepository, ValidationError,
};
use rusqlite::Connection;
use uuid::Uuid;

fn service(conn: &Connection) -> BuildingService<SqliteBuildingRepository<'_>> {
    BuildingService::new(SqliteBuildingRepository::try_new(conn).unwrap())
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let mut draft = NewBuilding::new("  Moscow, Lenina 1, office 3 ", 55.7558, 37.6173);
    draft.description = Some("business center".to_string());
    let created = service.create_building(&draft).unwrap();

    let loaded = service.get_building(created.id).unwrap();
    assert_eq!(loaded, created);
    assert_eq!(loaded.address, "Moscow, Lenina 1, office 3");
    assert_eq!(loaded.latitude, 55.7558);
    assert_eq!(loaded.longitude, 37.6173);
    assert_eq!(loaded.description.as_deref(), Some("business center"));
}

#[test]
fn create_rejects_blank_address_and_out_of_range_coordinates() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service
        .create_building(&NewBuilding::new(" ", 0.0, 0.0))
        .unwrap_err();
    assert!(matches!(
        err,
        BuildingServiceError::Validation(ValidationError::Blank { .. })
    ));

    let err = service
        .create_building(&NewBuilding::new("North of north", 90.5, 0.0))
        .unwrap_err();
    assert!(matches!(
        err,
        BuildingServiceError::Validation(ValidationError::CoordinateOutOfRange {
            field: "latitude"
        })
    ));

    let err = service
        .create_building(&NewBuilding::new("Past the date line", 0.0, -180.5))
        .unwrap_err();
    assert!(matches!(
        err,
        BuildingServiceError::Validation(ValidationError::CoordinateOutOfRange {
            field: "longitude"
        })
    ));

    let err = service
        .create_building(&NewBuilding::new("Nowhere", f64::NAN, 0.0))
        .unwrap_err();
    assert!(matches!(err, BuildingServiceError::Validation(_)));

    assert!(service.list_buildings(None, 0).unwrap().is_empty());
}

#[test]
fn poles_and_date_line_are_valid_coordinates() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    service
        .create_building(&NewBuilding::new("South pole station", -90.0, 180.0))
        .unwrap();
    service
        .create_building(&NewBuilding::new("North pole camp", 90.0, -180.0))
        .unwrap();

    assert_eq!(service.list_buildings(None, 0).unwrap().len(), 2);
}

#[test]
fn update_applies_partial_patch() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let created = service
        .create_building(&NewBuilding::new("Lenina 1", 55.7558, 37.6173))
        .unwrap();

    let updated = service
        .update_building(
            created.id,
            &BuildingPatch {
                latitude: Some(55.76),
                description: Some(Some("moved".to_string())),
                ..BuildingPatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.address, "Lenina 1");
    assert_eq!(updated.latitude, 55.76);
    assert_eq!(updated.longitude, 37.6173);
    assert_eq!(service.get_building(created.id).unwrap(), updated);

    let err = service
        .update_building(
            created.id,
            &BuildingPatch {
                longitude: Some(200.0),
                ..BuildingPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, BuildingServiceError::Validation(_)));
    assert_eq!(service.get_building(created.id).unwrap().longitude, 37.6173);
}

#[test]
fn missing_building_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let missing = Uuid::new_v4();

    assert!(matches!(
        service.get_building(missing),
        Err(BuildingServiceError::NotFound(id)) if id == missing
    ));
    assert!(matches!(
        service.update_building(missing, &BuildingPatch::default()),
        Err(BuildingServiceError::NotFound(_))
    ));
    assert!(!service.delete_building(missing).unwrap());
}

#[test]
fn list_paginates_in_insertion_order() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let ids: Vec<_> = (0..4)
        .map(|index| {
            service
                .create_building(&NewBuilding::new(format!("Street {index}"), 10.0, 10.0))
                .unwrap()
                .id
        })
        .collect();

    let page: Vec<_> = service
        .list_buildings(Some(2), 1)
        .unwrap()
        .into_iter()
        .map(|building| building.id)
        .collect();
    assert_eq!(page, ids[1..3].to_vec());

    let tail: Vec<_> = service
        .list_buildings(None, 3)
        .unwrap()
        .into_iter()
        .map(|building| building.id)
        .collect();
    assert_eq!(tail, vec![ids[3]]);
}

#[test]
fn point_projections_cover_all_or_ranged_buildings() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteBuildingRepository::try_new(&conn).unwrap();
    let inside = repo
        .create_building(&NewBuilding::new("Inside", 55.5, 37.5))
        .unwrap();
    let corner = repo
        .create_building(&NewBuilding::new("Corner", 56.0, 38.0))
        .unwrap();
    let outside = repo
        .create_building(&NewBuilding::new("Outside", 59.9343, 30.3351))
        .unwrap();

    let all: Vec<_> = repo
        .list_points()
        .unwrap()
        .into_iter()
        .map(|point| point.building_id)
        .collect();
    assert_eq!(all, vec![inside.id, corner.id, outside.id]);

    let ranged = repo
        .list_points_in_range(&BoundingBox::new(55.0, 56.0, 37.0, 38.0))
        .unwrap();
    let ranged_ids: Vec<_> = ranged.iter().map(|point| point.building_id).collect();
    assert_eq!(ranged_ids, vec![inside.id, corner.id]);
    assert_eq!(ranged[1].point.latitude, 56.0);
}
