use resource_store::db::open_db;
use resource_store::{CreateResource, FindResource, ResourceStore, SqliteResourceStore};
use std::collections::HashSet;
use std::thread;

const WRITERS: usize = 4;
const UPLOADS_PER_WRITER: usize = 5;

#[test]
fn concurrent_creates_on_separate_connections_get_distinct_ids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("resources.db");
    let setup = open_db(&path).unwrap();
    setup
        .execute("INSERT INTO user (id, username) VALUES (1, 'alice');", [])
        .unwrap();

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let path = path.clone();
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let store = SqliteResourceStore::try_new(&conn).unwrap();
                (0..UPLOADS_PER_WRITER)
                    .map(|index| {
                        let filename = format!("writer-{writer}-{index}.txt");
                        let created = store
                            .create_resource(&CreateResource {
                                filename: filename.clone(),
                                blob: Some(filename.clone().into_bytes()),
                                kind: "text/plain".to_string(),
                                size: filename.len() as i64,
                                creator_id: 1,
                                ..CreateResource::default()
                            })
                            .unwrap();
                        assert_eq!(created.filename, filename);
                        (created.id, filename)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let created: Vec<_> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();

    let unique_ids: HashSet<_> = created.iter().map(|(id, _)| *id).collect();
    assert_eq!(unique_ids.len(), WRITERS * UPLOADS_PER_WRITER);

    let store = SqliteResourceStore::try_new(&setup).unwrap();
    for (id, filename) in &created {
        let loaded = store
            .get_resource(&FindResource {
                filename: Some(filename.clone()),
                include_blob: true,
                ..FindResource::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(loaded.id, *id);
        assert_eq!(loaded.blob.as_deref(), Some(filename.as_bytes()));
    }
}
