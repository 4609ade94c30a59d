mod common;

use bytes::Bytes;
use catalog_service::repository::PosterStatus;
use catalog_service::repository::StockItemChanges;
use catalog_service::service::PosterDraft;
use catalog_service::{AssetSource, ServiceError};
use common::{png, Harness};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

fn draft(festival_id: Uuid, name: &str) -> PosterDraft {
    PosterDraft {
        festival_id,
        name: name.to_string(),
        description: "Limited print".to_string(),
    }
}

#[tokio::test]
async fn rejected_creates_leave_no_images() {
    let h = Harness::new().await;
    let festival_id = h.festival().await;

    assert_ok!(h.catalog.posters.create(draft(festival_id, "day-1"), png(10, 10)).await);

    let duplicate = h.catalog.posters.create(draft(festival_id, "day-1"), png(10, 10)).await;
    assert!(assert_err!(duplicate).is_already_exists());

    let unknown_festival = h
        .catalog
        .posters
        .create(draft(Uuid::now_v7(), "day-2"), png(10, 10))
        .await;
    assert!(assert_err!(unknown_festival).is_not_found());

    let garbage = h
        .catalog
        .posters
        .create(draft(festival_id, "day-3"), Bytes::from_static(b"GIF89a?"))
        .await;
    assert!(matches!(garbage, Err(ServiceError::InvalidImage(_))));

    assert_eq!(h.repo.poster_count(), 1);
    h.assert_no_orphans();
    h.assert_no_dangling_references().await;
}

#[tokio::test]
async fn concurrent_creates_with_same_name_keep_one_image() {
    let h = Harness::new().await;
    let festival_id = h.festival().await;
    // Both creates pass the name check; the insert decides the winner
    h.repo.gate_name_checks(2);

    let (a, b) = tokio::join!(
        h.catalog.posters.create(draft(festival_id, "finale"), png(10, 10)),
        h.catalog.posters.create(draft(festival_id, "finale"), png(12, 12)),
    );

    assert_eq!(h.repo.poster_inserts(), 2);
    let (winners, losers): (Vec<_>, Vec<_>) = [a, b].into_iter().partition(|r| r.is_ok());
    assert_eq!(winners.len(), 1);
    assert_eq!(losers.len(), 1);
    for loser in losers {
        assert!(loser.unwrap_err().is_already_exists());
    }

    assert_eq!(h.repo.poster_count(), 1);
    assert_eq!(h.remote.objects.len(), 1);
    h.assert_no_dangling_references().await;
}

#[tokio::test]
async fn delete_is_safe_to_repeat() {
    let h = Harness::new().await;
    let festival_id = h.festival().await;
    let poster = assert_ok!(h.catalog.posters.create(draft(festival_id, "encore"), png(8, 8)).await);

    assert_ok!(h.catalog.posters.delete(poster.id).await);
    let again = h.catalog.posters.delete(poster.id).await;
    assert!(assert_err!(again).is_not_found());

    assert!(h.remote.objects.is_empty());
    assert_eq!(h.repo.poster_count(), 0);
}

#[tokio::test]
async fn delete_retry_finishes_after_row_delete_failure() {
    let h = Harness::new().await;
    let item = assert_ok!(
        h.catalog
            .stock_items
            .create(
                StockItemChanges {
                    name: "Towel".to_string(),
                    category: "goods".to_string(),
                    description: String::new(),
                },
                png(6, 6),
            )
            .await
    );
    let image_id = item.image_id.clone().unwrap();

    h.repo.fail_row_deletes(true);
    let first = h.catalog.stock_items.delete(item.id).await;
    assert!(matches!(
        first,
        Err(ServiceError::InternalInconsistency { ref asset_id, .. }) if *asset_id == image_id
    ));
    assert!(!h.remote.contains(image_id.as_str()).await);

    h.repo.fail_row_deletes(false);
    assert_ok!(h.catalog.stock_items.delete(item.id).await);
    assert!(assert_err!(h.catalog.stock_items.get(item.id).await).is_not_found());
}

#[tokio::test]
async fn failed_image_delete_keeps_row_and_image() {
    let h = Harness::new().await;
    let festival_id = h.festival().await;
    let poster = assert_ok!(h.catalog.posters.create(draft(festival_id, "flyer"), png(8, 8)).await);

    h.remote.fail_deletes(true);
    assert_err!(h.catalog.posters.delete(poster.id).await);

    assert_ok!(h.catalog.posters.get(poster.id).await);
    h.assert_no_dangling_references().await;
}

#[tokio::test]
async fn festival_delete_removes_poster_images() {
    let h = Harness::new().await;
    let festival_id = h.festival().await;
    for name in ["a", "b", "c"] {
        assert_ok!(h.catalog.posters.create(draft(festival_id, name), png(4, 4)).await);
    }
    assert_eq!(h.remote.objects.len(), 3);

    assert_ok!(h.catalog.festivals.delete(festival_id).await);

    assert!(h.remote.objects.is_empty());
    assert_eq!(h.repo.poster_count(), 0);
    assert!(assert_err!(h.catalog.festivals.get(festival_id).await).is_not_found());
}

#[tokio::test]
async fn update_image_replaces_stored_image() {
    let h = Harness::new().await;
    let festival_id = h.festival().await;
    let poster = assert_ok!(h.catalog.posters.create(draft(festival_id, "map"), png(8, 8)).await);
    let old = poster.image_id.unwrap();

    let new = assert_ok!(h.catalog.posters.update_image(poster.id, png(16, 16)).await);
    assert_ok!(h.catalog.posters.change_status(poster.id, PosterStatus::Collected).await);

    assert!(!h.remote.contains(old.as_str()).await);
    let reloaded = assert_ok!(h.catalog.posters.get(poster.id).await);
    assert_eq!(reloaded.image_id, Some(new));
    assert_eq!(reloaded.status, PosterStatus::Collected);
    h.assert_no_orphans();
    h.assert_no_dangling_references().await;
}

#[tokio::test]
async fn png_upload_is_served_as_jpeg_from_cache_and_remote() {
    let h = Harness::new().await;
    let item = assert_ok!(
        h.catalog
            .stock_items
            .create(
                StockItemChanges {
                    name: "Poster tube".to_string(),
                    category: "goods".to_string(),
                    description: "Fits A2".to_string(),
                },
                png(10, 10),
            )
            .await
    );
    let id = item.image_id.unwrap();
    assert_eq!(
        item.image_url.as_deref(),
        Some(format!("http://catalog.test/api/v1/images/{}", id).as_str())
    );

    let cached = assert_ok!(h.assets.get(&id).await);
    assert_eq!(cached.source, AssetSource::Cache);
    assert_eq!(cached.content_type, "image/jpeg");
    let cached_bytes = assert_ok!(cached.into_bytes().await);

    // Cold cache: the remote copy is identical
    std::fs::remove_file(h.assets.cache().path_for(&id)).unwrap();
    let fetched = assert_ok!(h.assets.get(&id).await);
    assert_eq!(fetched.source, AssetSource::Remote);
    assert_eq!(assert_ok!(fetched.into_bytes().await), cached_bytes);

    let decoded = image::load_from_memory_with_format(&cached_bytes, image::ImageFormat::Jpeg)
        .unwrap();
    assert_eq!((decoded.width(), decoded.height()), (10, 10));
}

#[tokio::test]
async fn stock_items_filter_by_category() {
    let h = Harness::new().await;
    for (name, category) in [("Cap", "apparel"), ("Tee", "apparel"), ("Pin", "goods")] {
        assert_ok!(
            h.catalog
                .stock_items
                .create(
                    StockItemChanges {
                        name: name.to_string(),
                        category: category.to_string(),
                        description: String::new(),
                    },
                    png(2, 2),
                )
                .await
        );
    }

    let apparel = assert_ok!(h.catalog.stock_items.query(Some("apparel".to_string())).await);
    assert_eq!(apparel.len(), 2);
    let all = assert_ok!(h.catalog.stock_items.query(None).await);
    assert_eq!(all.len(), 3);
}
