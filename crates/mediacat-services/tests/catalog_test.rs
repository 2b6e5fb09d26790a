//! Catalog create/read/update/delete flows over the in-memory backend.
//!
//! Run with: `cargo test -p mediacat-services --test catalog_test`

mod helpers;

use helpers::fixtures::{mp3_upload, png_upload, text_upload};
use helpers::{memory_catalog, memory_catalog_with_cache, reference_limits};
use mediacat_services::{AppError, CreateMediaRequest, MediaPatch, StorageBackend};
use uuid::Uuid;

#[tokio::test]
async fn test_create_media_indexes_the_upload() {
    let (catalog, storage) = memory_catalog(reference_limits());

    let record = catalog
        .create_media(png_upload(64).with_name("Hero").with_platform("P1").thumbnail(true))
        .await
        .unwrap();

    assert_eq!(record.name, "Hero");
    assert_eq!(record.mime_type.as_str(), "image/png");
    assert_eq!(record.platform_id.as_deref(), Some("P1"));
    assert!(record.is_thumbnail);
    assert_eq!(record.size_bytes, 64);
    assert_eq!(record.storage_location.backend, StorageBackend::Memory);
    assert!(record.storage_location.key.starts_with("media/"));
    assert!(record.storage_location.key.ends_with(".png"));
    assert_eq!(
        record.storage_location.url,
        format!("memory://{}", record.storage_location.key)
    );

    assert_eq!(storage.object_count(), 1);
    assert_eq!(
        storage.get(&record.storage_location.key).map(|b| b.len()),
        Some(64)
    );

    let listed = catalog.list_media().await.unwrap();
    assert_eq!(listed, vec![record.clone()]);
    assert_eq!(catalog.get_media(record.id).await.unwrap(), record);
}

#[tokio::test]
async fn test_name_defaults_to_sanitised_filename() {
    let (catalog, _storage) = memory_catalog(reference_limits());

    let record = catalog
        .create_media(CreateMediaRequest::new(
            vec![0u8; 16],
            "video/mp4",
            "../holiday clips/day 1.MP4",
        ))
        .await
        .unwrap();
    assert_eq!(record.name, "day_1.MP4");
    assert!(record.storage_location.key.ends_with(".mp4"));

    let record = catalog
        .create_media(mp3_upload(16).with_name("   "))
        .await
        .unwrap();
    assert_eq!(record.name, "theme.mp3");
}

#[tokio::test]
async fn test_extension_follows_detected_type() {
    let (catalog, _storage) = memory_catalog(reference_limits());

    let record = catalog
        .create_media(CreateMediaRequest::new(
            vec![0u8; 16],
            "image/jpeg; charset=binary",
            "photo.png",
        ))
        .await
        .unwrap();

    assert_eq!(record.mime_type.as_str(), "image/jpeg");
    assert!(record.storage_location.key.ends_with(".jpg"));
}

#[tokio::test]
async fn test_unsupported_type_never_reaches_the_store() {
    let (catalog, storage) = memory_catalog(reference_limits());

    let result = catalog.create_media(text_upload()).await;

    assert!(matches!(result, Err(AppError::UnsupportedMediaType(_))));
    assert_eq!(storage.put_calls(), 0);
    assert_eq!(storage.object_count(), 0);
    assert!(catalog.list_media().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_store_outage_on_create_leaves_no_record() {
    // With cached usage the admission check succeeds and only the write fails.
    let (catalog, storage) = memory_catalog_with_cache(reference_limits(), true);
    catalog.list_media().await.unwrap();
    assert!(catalog.quota().admit(64).await.unwrap().is_admitted());

    storage.set_unavailable(true);
    let result = catalog.create_media(png_upload(64)).await;
    storage.set_unavailable(false);

    assert!(matches!(result, Err(AppError::StoreUnavailable(_))));
    assert_eq!(storage.put_calls(), 1);
    assert!(catalog.list_media().await.unwrap().is_empty());
    assert_eq!(storage.object_count(), 0);
}

#[tokio::test]
async fn test_update_media_applies_patch() {
    let (catalog, _storage) = memory_catalog(reference_limits());
    let record = catalog.create_media(png_upload(8)).await.unwrap();

    let updated = catalog
        .update_media(record.id, MediaPatch::default().name("Banner").platform(Some("P9")))
        .await
        .unwrap();
    assert_eq!(updated.name, "Banner");
    assert_eq!(updated.platform_id.as_deref(), Some("P9"));
    assert_eq!(updated.storage_location, record.storage_location);
    assert_eq!(updated.uploaded_at, record.uploaded_at);

    let updated = catalog
        .update_media(record.id, MediaPatch::default().platform(None))
        .await
        .unwrap();
    assert_eq!(updated.platform_id, None);
    assert_eq!(updated.name, "Banner");

    assert!(matches!(
        catalog.update_media(Uuid::new_v4(), MediaPatch::default()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_clearing_thumbnail_twice_is_idempotent() {
    let (catalog, _storage) = memory_catalog(reference_limits());
    let record = catalog
        .create_media(png_upload(8).with_platform("P1").thumbnail(true))
        .await
        .unwrap();

    let first = catalog
        .update_media(record.id, MediaPatch::default().thumbnail(false))
        .await
        .unwrap();
    let second = catalog
        .update_media(record.id, MediaPatch::default().thumbnail(false))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert!(!second.is_thumbnail);
}

#[tokio::test]
async fn test_patch_from_json_clears_platform() {
    let (catalog, _storage) = memory_catalog(reference_limits());
    let record = catalog
        .create_media(png_upload(8).with_platform("P1"))
        .await
        .unwrap();

    let patch: MediaPatch = serde_json::from_str(r#"{"name":"","platform_id":null}"#).unwrap();
    let updated = catalog.update_media(record.id, patch).await.unwrap();

    assert_eq!(updated.platform_id, None);
    assert_eq!(updated.name, record.name);
}

#[tokio::test]
async fn test_delete_media_removes_blob_and_record() {
    let (catalog, storage) = memory_catalog(reference_limits());
    let keep = catalog.create_media(png_upload(8)).await.unwrap();
    let gone = catalog.create_media(mp3_upload(8)).await.unwrap();

    catalog.delete_media(gone.id).await.unwrap();

    assert_eq!(storage.object_count(), 1);
    assert!(storage.get(&gone.storage_location.key).is_none());
    assert!(matches!(
        catalog.get_media(gone.id).await,
        Err(AppError::NotFound(_))
    ));

    catalog.reconcile().await.unwrap();
    let listed = catalog.list_media().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed.iter().all(|r| r.id != gone.id));
    assert_eq!(listed[0].storage_location.key, keep.storage_location.key);
}

#[tokio::test]
async fn test_delete_unknown_id_is_not_found() {
    let (catalog, storage) = memory_catalog(reference_limits());
    let record = catalog.create_media(png_upload(8)).await.unwrap();

    catalog.delete_media(record.id).await.unwrap();
    assert!(matches!(
        catalog.delete_media(record.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        catalog.delete_media(Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));
    assert_eq!(storage.object_count(), 0);
}

#[tokio::test]
async fn test_delete_purges_record_whose_blob_vanished() {
    let (catalog, storage) = memory_catalog(reference_limits());
    let record = catalog.create_media(png_upload(8)).await.unwrap();

    assert!(storage.evict(&record.storage_location.key));

    catalog.delete_media(record.id).await.unwrap();
    assert!(catalog.list_media().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_during_store_outage_keeps_record() {
    let (catalog, storage) = memory_catalog(reference_limits());
    let record = catalog.create_media(png_upload(8)).await.unwrap();

    storage.set_unavailable(true);
    assert!(matches!(
        catalog.delete_media(record.id).await,
        Err(AppError::StoreUnavailable(_))
    ));
    storage.set_unavailable(false);

    assert_eq!(catalog.get_media(record.id).await.unwrap(), record);
    assert_eq!(storage.object_count(), 1);
}

#[tokio::test]
async fn test_platform_queries() {
    let (catalog, _storage) = memory_catalog(reference_limits());
    let a = catalog
        .create_media(png_upload(8).with_platform("P1"))
        .await
        .unwrap();
    let b = catalog
        .create_media(png_upload(8).with_platform("P1").thumbnail(true))
        .await
        .unwrap();
    catalog
        .create_media(png_upload(8).with_platform("P2"))
        .await
        .unwrap();

    let ids: Vec<Uuid> = catalog
        .list_platform("P1")
        .await
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec![a.id, b.id]);
    assert_eq!(
        catalog.platform_thumbnail("P1").await.unwrap().map(|r| r.id),
        Some(b.id)
    );
    assert!(catalog.platform_thumbnail("P2").await.unwrap().is_none());
}
