#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::tempdir;
    use tokio::fs;

    use crate::{
        config::{CollectionConfig, HivePaths, WriteMode},
        metadata::CollectionInfo,
        FieldSpec,
        HiveError,
        Schema,
        Store,
    };

    fn user_schema() -> Schema {
        Schema::new()
            .field("name", FieldSpec::string().required())
            .unwrap()
            .field("age", FieldSpec::number())
            .unwrap()
    }

    async fn open_store(paths: &HivePaths) -> Store { Store::open("shop", paths, CollectionConfig::default()).await.unwrap() }

    #[tokio::test]
    async fn test_open_creates_folders() {
        let temp_dir = tempdir().unwrap();
        let paths = HivePaths::new(temp_dir.path());

        let store = open_store(&paths).await;
        assert!(temp_dir.path().join("hives").join("shop").is_dir());
        assert!(paths.collections_dir.is_dir());
        assert_eq!(store.name(), "shop");
        assert_eq!(store.root_path(), paths.database_dir("shop"));
        assert!(store.list_collections().await.is_empty());
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_name() {
        let temp_dir = tempdir().unwrap();
        let paths = HivePaths::new(temp_dir.path());

        for name in ["", ".hidden", "a/b", "NUL"] {
            let result = Store::open(name, &paths, CollectionConfig::default()).await;
            assert!(
                matches!(result, Err(HiveError::InvalidName { .. })),
                "{name:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_create_collection_writes_file_and_metadata() {
        let temp_dir = tempdir().unwrap();
        let paths = HivePaths::new(temp_dir.path());
        let store = open_store(&paths).await;

        let users = store
            .create_collection("users", user_schema())
            .await
            .unwrap();
        assert!(users.is_initialized().await);
        assert_eq!(users.store_name(), "shop");

        let file = temp_dir
            .path()
            .join("hives")
            .join("shop")
            .join("users.json");
        assert_eq!(fs::read_to_string(&file).await.unwrap(), "[]");

        let raw = fs::read_to_string(paths.collections_info_path("shop"))
            .await
            .unwrap();
        let infos: Vec<CollectionInfo> = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            infos,
            vec![CollectionInfo {
                name:   "users".to_owned(),
                schema: user_schema(),
            }]
        );
    }

    #[tokio::test]
    async fn test_create_collection_twice_fails() {
        let temp_dir = tempdir().unwrap();
        let store = open_store(&HivePaths::new(temp_dir.path())).await;

        store
            .create_collection("users", user_schema())
            .await
            .unwrap();
        match store.create_collection("users", user_schema()).await {
            Err(HiveError::CollectionExists {
                name,
            }) => assert_eq!(name, "users"),
            other => panic!("expected CollectionExists, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_collection_rejects_invalid_name() {
        let temp_dir = tempdir().unwrap();
        let store = open_store(&HivePaths::new(temp_dir.path())).await;

        let result = store.create_collection("bad name", user_schema()).await;
        assert!(matches!(result, Err(HiveError::InvalidName { .. })));
        assert!(store.list_collections().await.is_empty());
    }

    #[tokio::test]
    async fn test_collection_lookup_shares_instance() {
        let temp_dir = tempdir().unwrap();
        let store = open_store(&HivePaths::new(temp_dir.path())).await;

        let created = store
            .create_collection("users", user_schema())
            .await
            .unwrap();
        let looked_up = store.collection("users").await.unwrap();
        assert!(std::sync::Arc::ptr_eq(&created, &looked_up));
        assert!(store.collection("orders").await.is_none());
    }

    #[tokio::test]
    async fn test_reopen_restores_collections_and_documents() {
        let temp_dir = tempdir().unwrap();
        let paths = HivePaths::new(temp_dir.path());
        let ada_id = {
            let store = open_store(&paths).await;
            store
                .create_collection("orders", Schema::new())
                .await
                .unwrap();
            let users = store
                .create_collection("users", user_schema())
                .await
                .unwrap();
            users
                .create(json!({"name": "Ada", "age": 30}))
                .await
                .unwrap()
                .id()
                .to_owned()
        };

        let store = open_store(&paths).await;
        assert_eq!(
            store.list_collections().await,
            vec!["orders".to_owned(), "users".to_owned()]
        );
        let users = store.collection("users").await.unwrap();
        assert!(!users.is_initialized().await);
        assert_eq!(users.schema(), &user_schema());
        let ada = users.find_by_id(&ada_id).await.unwrap().unwrap();
        assert_eq!(ada.field("name"), Some(&json!("Ada")));
    }

    #[tokio::test]
    async fn test_create_known_collection_returns_existing() {
        let temp_dir = tempdir().unwrap();
        let paths = HivePaths::new(temp_dir.path());
        {
            let store = open_store(&paths).await;
            let users = store
                .create_collection("users", user_schema())
                .await
                .unwrap();
            users.create(json!({"name": "Ada"})).await.unwrap();
        }

        let store = open_store(&paths).await;
        let known = store.collection("users").await.unwrap();
        // The stored schema wins over the argument.
        let users = store
            .create_collection("users", Schema::new())
            .await
            .unwrap();
        assert!(std::sync::Arc::ptr_eq(&known, &users));
        assert_eq!(users.schema(), &user_schema());
        assert_eq!(users.count().await.unwrap(), 1);
        assert_eq!(store.list_collections().await, vec!["users".to_owned()]);

        assert!(matches!(
            store.create_collection("users", user_schema()).await,
            Err(HiveError::CollectionExists { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_collection() {
        let temp_dir = tempdir().unwrap();
        let paths = HivePaths::new(temp_dir.path());
        let store = open_store(&paths).await;
        let users = store
            .create_collection("users", user_schema())
            .await
            .unwrap();
        users.create(json!({"name": "Ada"})).await.unwrap();

        store.delete_collection("users").await.unwrap();
        assert!(!store.collection_path("users").exists());
        assert!(store.collection("users").await.is_none());

        let raw = fs::read_to_string(paths.collections_info_path("shop"))
            .await
            .unwrap();
        assert_eq!(raw.trim(), "[]");

        // The name is free again.
        let users = store
            .create_collection("users", user_schema())
            .await
            .unwrap();
        assert_eq!(users.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stale_handle_cannot_overwrite_recreated_collection() {
        let temp_dir = tempdir().unwrap();
        let paths = HivePaths::new(temp_dir.path());
        let store = open_store(&paths).await;

        let old = store
            .create_collection("users", user_schema())
            .await
            .unwrap();
        store.delete_collection("users").await.unwrap();
        let fresh = store
            .create_collection("users", user_schema())
            .await
            .unwrap();
        fresh.create(json!({"name": "new"})).await.unwrap();

        match old.create(json!({"name": "stale"})).await {
            Err(HiveError::CollectionNotFound {
                name,
            }) => assert_eq!(name, "users"),
            other => panic!("expected CollectionNotFound, got {:?}", other),
        }
        assert!(old.delete_many(&json!({"name": "new"})).await.is_err());

        let store = open_store(&paths).await;
        let reloaded = store.collection("users").await.unwrap();
        let names: Vec<_> = reloaded
            .find_all()
            .await
            .unwrap()
            .iter()
            .map(|doc| doc.field("name").cloned())
            .collect();
        assert_eq!(names, vec![Some(json!("new"))]);
    }

    #[tokio::test]
    async fn test_deleted_store_refuses_changes() {
        let temp_dir = tempdir().unwrap();
        let store = open_store(&HivePaths::new(temp_dir.path())).await;
        let users = store
            .create_collection("users", user_schema())
            .await
            .unwrap();

        store.delete_store().await.unwrap();
        store.delete_store().await.unwrap();
        assert!(matches!(
            store.create_collection("orders", Schema::new()).await,
            Err(HiveError::DatabaseNotFound { .. })
        ));
        assert!(matches!(
            users.create(json!({"name": "Ada"})).await,
            Err(HiveError::CollectionNotFound { .. })
        ));
        assert!(!store.root_path().exists());
    }

    #[tokio::test]
    async fn test_delete_unknown_collection() {
        let temp_dir = tempdir().unwrap();
        let store = open_store(&HivePaths::new(temp_dir.path())).await;

        match store.delete_collection("ghost").await {
            Err(HiveError::CollectionNotFound {
                name,
            }) => assert_eq!(name, "ghost"),
            other => panic!("expected CollectionNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_store_removes_folder_and_metadata() {
        let temp_dir = tempdir().unwrap();
        let paths = HivePaths::new(temp_dir.path());
        let store = open_store(&paths).await;
        store
            .create_collection("users", user_schema())
            .await
            .unwrap();

        store.delete_store().await.unwrap();
        assert!(!store.root_path().exists());
        assert!(!store.info_path().exists());
        assert!(store.list_collections().await.is_empty());
    }

    #[tokio::test]
    async fn test_open_skips_bad_metadata_entries() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .try_init();

        let temp_dir = tempdir().unwrap();
        let paths = HivePaths::new(temp_dir.path());
        fs::create_dir_all(&paths.collections_dir).await.unwrap();
        fs::write(
            paths.collections_info_path("shop"),
            r#"[
                {"name": "users", "schema": {}},
                {"name": "../escape", "schema": {}},
                {"name": "users", "schema": {}}
            ]"#,
        )
        .await
        .unwrap();

        let store = open_store(&paths).await;
        assert_eq!(store.list_collections().await, vec!["users".to_owned()]);
    }

    #[tokio::test]
    async fn test_collections_inherit_store_config() {
        let temp_dir = tempdir().unwrap();
        let paths = HivePaths::new(temp_dir.path());
        let config = CollectionConfig {
            write_mode: WriteMode::Atomic,
            ..CollectionConfig::default()
        };
        let store = Store::open("shop", &paths, config).await.unwrap();
        assert_eq!(store.config(), config);

        let users = store
            .create_collection("users", user_schema())
            .await
            .unwrap();
        users.create(json!({"name": "Ada"})).await.unwrap();
        assert!(!store.root_path().join("users.json.tmp").exists());
        assert_eq!(users.count().await.unwrap(), 1);
    }
}
