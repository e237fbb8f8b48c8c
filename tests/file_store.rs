use google_signin::{FileStore, REFRESH_TOKEN_KEY, RefreshTokenStore, SecretStore};

#[tokio::test]
async fn survives_a_new_instance() {
    let dir = tempfile::tempdir().unwrap();

    RefreshTokenStore::new(FileStore::new(dir.path()))
        .save("r1")
        .await
        .unwrap();

    let reopened = RefreshTokenStore::new(FileStore::new(dir.path()));
    assert_eq!(reopened.get().await.unwrap().as_deref(), Some("r1"));
}

#[tokio::test]
async fn get_on_missing_file_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("not-yet-created"));

    assert_eq!(store.get(REFRESH_TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn delete_keeps_other_keys_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    store.save("other", "value").await.unwrap();
    store.save(REFRESH_TOKEN_KEY, "r1").await.unwrap();

    store.delete(REFRESH_TOKEN_KEY).await.unwrap();
    store.delete(REFRESH_TOKEN_KEY).await.unwrap();

    assert_eq!(store.get(REFRESH_TOKEN_KEY).await.unwrap(), None);
    assert_eq!(store.get("other").await.unwrap().as_deref(), Some("value"));
}

#[tokio::test]
async fn overwrite_replaces_value() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());

    store.save(REFRESH_TOKEN_KEY, "r1").await.unwrap();
    store.save(REFRESH_TOKEN_KEY, "r2").await.unwrap();

    assert_eq!(store.get(REFRESH_TOKEN_KEY).await.unwrap().as_deref(), Some("r2"));
}

#[tokio::test]
async fn corrupt_file_is_a_storage_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    std::fs::write(store.path(), "{not json").unwrap();

    assert!(matches!(
        store.get(REFRESH_TOKEN_KEY).await,
        Err(google_signin::Error::Storage(_))
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    store.save(REFRESH_TOKEN_KEY, "r1").await.unwrap();

    let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[tokio::test]
async fn delete_discards_a_truncated_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    std::fs::write(store.path(), r#"{"refreshToken":"r1""#).unwrap();

    store.delete(REFRESH_TOKEN_KEY).await.unwrap();

    assert!(!store.path().exists());
    assert_eq!(store.get(REFRESH_TOKEN_KEY).await.unwrap(), None);
    store.save(REFRESH_TOKEN_KEY, "r2").await.unwrap();
    assert_eq!(store.get(REFRESH_TOKEN_KEY).await.unwrap().as_deref(), Some("r2"));
}

#[tokio::test]
async fn save_leaves_no_temp_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());

    store.save(REFRESH_TOKEN_KEY, "r1").await.unwrap();
    store.save(REFRESH_TOKEN_KEY, "r2").await.unwrap();

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(names, ["local_storage.json"]);
}

#[cfg(unix)]
#[tokio::test]
async fn save_tightens_permissions_of_an_existing_file() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());
    std::fs::write(store.path(), r#"{"other":"value"}"#).unwrap();
    std::fs::set_permissions(store.path(), std::fs::Permissions::from_mode(0o644)).unwrap();

    store.save(REFRESH_TOKEN_KEY, "r1").await.unwrap();

    let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert_eq!(store.get("other").await.unwrap().as_deref(), Some("value"));
}
