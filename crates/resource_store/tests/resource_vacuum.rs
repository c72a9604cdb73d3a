use resource_store::db::open_db_in_memory;
use resource_store::{
    vacuum_resources, CreateResource, FindResource, RepoError, Resource, ResourceStore,
    SqliteResourceStore, UserId,
};
use rusqlite::{params, Connection, TransactionBehavior};

#[test]
fn vacuum_removes_only_resources_of_missing_creators() {
    let mut conn = open_db_in_memory().unwrap();
    for id in [1, 2, 3] {
        seed_user(&conn, id);
    }
    let (kept_1, kept_2) = {
        let store = SqliteResourceStore::try_new(&conn).unwrap();
        let kept_1 = store.create_resource(&upload(1, "one.bin")).unwrap();
        let kept_2 = store.create_resource(&upload(2, "two.bin")).unwrap();
        store.create_resource(&upload(3, "three-a.bin")).unwrap();
        store.create_resource(&upload(3, "three-b.bin")).unwrap();
        (kept_1, kept_2)
    };
    delete_user(&conn, 3);

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .unwrap();
    let removed = vacuum_resources(&tx).unwrap();
    tx.commit().unwrap();

    assert_eq!(removed, 2);
    let store = SqliteResourceStore::try_new(&conn).unwrap();
    let remaining = store.list_resources(&FindResource::default()).unwrap();
    assert_eq!(remaining, vec![kept_2, kept_1]);
}

#[test]
fn vacuum_is_discarded_with_rolled_back_transaction() {
    let mut conn = open_db_in_memory().unwrap();
    seed_user(&conn, 1);
    SqliteResourceStore::try_new(&conn)
        .unwrap()
        .create_resource(&upload(1, "orphan.bin"))
        .unwrap();
    delete_user(&conn, 1);

    let tx = conn.transaction().unwrap();
    assert_eq!(vacuum_resources(&tx).unwrap(), 1);
    tx.rollback().unwrap();

    assert_eq!(count_resources(&conn), 1);
}

#[test]
fn vacuum_with_no_orphans_removes_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    seed_user(&conn, 1);
    SqliteResourceStore::try_new(&conn)
        .unwrap()
        .create_resource(&upload(1, "a.bin"))
        .unwrap();

    let tx = conn.transaction().unwrap();
    assert_eq!(vacuum_resources(&tx).unwrap(), 0);
    tx.commit().unwrap();

    assert_eq!(count_resources(&conn), 1);
}

#[test]
fn delete_of_missing_id_still_sweeps_orphans() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, 1);
    seed_user(&conn, 2);
    let store = SqliteResourceStore::try_new(&conn).unwrap();
    let kept = store.create_resource(&upload(1, "kept.bin")).unwrap();
    store.create_resource(&upload(2, "orphan.bin")).unwrap();
    delete_user(&conn, 2);

    store.delete_resource(9_999).unwrap();

    let remaining: Vec<Resource> = store.list_resources(&FindResource::default()).unwrap();
    assert_eq!(remaining, vec![kept]);
}

#[test]
fn delete_reports_vacuum_failure_after_row_is_gone() {
    let conn = open_db_in_memory().unwrap();
    seed_user(&conn, 1);
    let store = SqliteResourceStore::try_new(&conn).unwrap();
    let doomed = store.create_resource(&upload(1, "doomed.bin")).unwrap();

    // An open outer transaction keeps the sweep from starting its own.
    conn.execute_batch("BEGIN;").unwrap();
    let err = store.delete_resource(doomed.id).unwrap_err();

    assert!(matches!(
        err,
        RepoError::VacuumFailed { deleted_id, .. } if deleted_id == doomed.id
    ));
    assert_eq!(err.code(), "vacuum_failed");
    assert!(store
        .get_resource(&FindResource::by_id(doomed.id))
        .unwrap()
        .is_none());
    conn.execute_batch("ROLLBACK;").unwrap();
}

fn upload(creator_id: UserId, filename: &str) -> CreateResource {
    CreateResource {
        filename: filename.to_string(),
        blob: Some(vec![0xde, 0xad, 0xbe, 0xef]),
        kind: "application/octet-stream".to_string(),
        size: 4,
        creator_id,
        ..CreateResource::default()
    }
}

fn count_resources(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM resource;", [], |row| row.get(0))
        .unwrap()
}

fn delete_user(conn: &Connection, id: UserId) {
    conn.execute("DELETE FROM user WHERE id = ?1;", [id]).unwrap();
}

fn seed_user(conn: &Connection, id: UserId) {
    conn.execute(
        "INSERT INTO user (id, username) VALUES (?1, ?2);",
        params![id, format!("user-{id}")],
    )
    .unwrap();
}
