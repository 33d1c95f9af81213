//! Database integration tests for stores, reviews, hearts and resets.
//!
//! These tests require a migrated `PostgreSQL` database in
//! `TEST_DATABASE_URL` (`delicious-cli migrate`).
//!
//! Run with: cargo test -p delicious-integration-tests -- --ignored

use delicious_core::{GeoPoint, Rating};
use delicious_integration_tests::{
    TEST_PASSWORD, create_user, new_store, remote_point, test_pool, unique,
};
use delicious_site::models::NewReview;
use delicious_site::services::{AuthError, AuthService, StoreError, StoreService};

// ============================================================================
// Slugs
// ============================================================================

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_duplicate_names_get_numbered_slugs() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let stores = StoreService::new(&pool);
    let name = format!("Taco Town {}", unique());

    let first = stores
        .create(user.id, &new_store(&name, remote_point(), &[]), None)
        .await
        .expect("create first");
    let second = stores
        .create(user.id, &new_store(&name, remote_point(), &[]), None)
        .await
        .expect("create second");
    let third = stores
        .create(user.id, &new_store(&name, remote_point(), &[]), None)
        .await
        .expect("create third");

    let base = first.slug.as_str().to_owned();
    assert_eq!(second.slug.as_str(), format!("{base}-2"));
    assert_eq!(third.slug.as_str(), format!("{base}-3"));
}

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_update_keeps_slug_unless_name_changes() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let stores = StoreService::new(&pool);
    let name = format!("Burger Barn {}", unique());

    let created = stores
        .create(user.id, &new_store(&name, remote_point(), &["Wifi"]), None)
        .await
        .expect("create");

    let mut edited = new_store(&name, remote_point(), &["Wifi", "Open Late"]);
    edited.description = "Now open late.".to_owned();
    let updated = stores
        .update(created.id, user.id, &edited, None)
        .await
        .expect("update");
    assert_eq!(updated.slug, created.slug);
    assert_eq!(updated.tags, vec!["Wifi".to_owned(), "Open Late".to_owned()]);

    let renamed_to = format!("Burger Palace {}", unique());
    let renamed = stores
        .update(created.id, user.id, &new_store(&renamed_to, remote_point(), &[]), None)
        .await
        .expect("rename");
    assert_ne!(renamed.slug, created.slug);
    assert!(renamed.slug.as_str().starts_with("burger-palace-"));
}

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_only_owner_can_update() {
    let pool = test_pool().await;
    let owner = create_user(&pool).await;
    let stranger = create_user(&pool).await;
    let stores = StoreService::new(&pool);
    let store = new_store(&format!("Owned {}", unique()), remote_point(), &[]);

    let created = stores.create(owner.id, &store, None).await.expect("create");
    let result = stores.update(created.id, stranger.id, &store, None).await;

    assert!(matches!(result, Err(StoreError::NotOwner)));
}

// ============================================================================
// Tags
// ============================================================================

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_tag_counts_and_filter() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let stores = StoreService::new(&pool);
    let tag = format!("Tag{}", unique());

    for i in 0..2 {
        stores
            .create(
                user.id,
                &new_store(&format!("Tagged {i} {}", unique()), remote_point(), &[&tag]),
                None,
            )
            .await
            .expect("create tagged");
    }

    let listing = stores.tags(Some(&tag)).await.expect("tags");
    let count = listing
        .tags
        .iter()
        .find(|t| t.tag == tag)
        .expect("tag is counted");
    assert_eq!(count.count, 2);
    assert_eq!(listing.stores.len(), 2);
    assert!(listing.stores.iter().all(|s| s.tags.contains(&tag)));

    // Counts are most used first
    assert!(listing.tags.windows(2).all(|w| w[0].count >= w[1].count));
}

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_store_with_several_tags_counts_in_each_group() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let stores = StoreService::new(&pool);
    let suffix = unique();
    let (a, b) = (format!("A{suffix}"), format!("B{suffix}"));

    for tags in [vec![a.as_str(), b.as_str()], vec![a.as_str()]] {
        stores
            .create(
                user.id,
                &new_store(&format!("Multi {}", unique()), remote_point(), &tags),
                None,
            )
            .await
            .expect("create tagged");
    }

    let listing = stores.tags(None).await.expect("tags");
    let count_of = |tag: &str| {
        listing
            .tags
            .iter()
            .find(|t| t.tag == tag)
            .map(|t| t.count)
    };
    assert_eq!(count_of(&a), Some(2));
    assert_eq!(count_of(&b), Some(1));

    let a_at = listing.tags.iter().position(|t| t.tag == a).expect("a listed");
    let b_at = listing.tags.iter().position(|t| t.tag == b).expect("b listed");
    assert!(a_at < b_at);
}

// ============================================================================
// Reviews and top-rated
// ============================================================================

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_top_rated_requires_two_reviews() {
    let pool = test_pool().await;
    let owner = create_user(&pool).await;
    let reviewer = create_user(&pool).await;
    let stores = StoreService::new(&pool);

    let loved = stores
        .create(owner.id, &new_store(&format!("Loved {}", unique()), remote_point(), &[]), None)
        .await
        .expect("create loved");
    let lonely = stores
        .create(owner.id, &new_store(&format!("Lonely {}", unique()), remote_point(), &[]), None)
        .await
        .expect("create lonely");

    for (store_id, text) in [(loved.id, "Great"), (loved.id, "Still great"), (lonely.id, "Fine")] {
        stores
            .add_review(&NewReview {
                store_id,
                author_id: reviewer.id,
                text: text.to_owned(),
                rating: Rating::new(5).expect("valid rating"),
            })
            .await
            .expect("add review");
    }

    let top = stores.top().await.expect("top");
    assert!(top.iter().all(|t| t.review_count >= 2));
    assert!(top.iter().all(|t| t.store.id != lonely.id));
    assert!(
        top.windows(2)
            .all(|w| w[0].average_rating >= w[1].average_rating)
    );
    // Either listed, or the list is already full of perfect scores
    assert!(
        top.iter().any(|t| t.store.id == loved.id)
            || top.iter().all(|t| t.average_rating >= 5.0)
    );

    let detail = stores.detail(loved.slug.as_str()).await.expect("detail");
    assert_eq!(detail.reviews.len(), 2);
    assert!(detail.reviews.iter().all(|r| r.author_name == "Test User"));
}

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_top_rated_average_is_the_mean_rating() {
    let pool = test_pool().await;
    let owner = create_user(&pool).await;
    let reviewer = create_user(&pool).await;
    let stores = StoreService::new(&pool);

    let store = stores
        .create(owner.id, &new_store(&format!("Mixed {}", unique()), remote_point(), &[]), None)
        .await
        .expect("create");
    for stars in [3, 5] {
        stores
            .add_review(&NewReview {
                store_id: store.id,
                author_id: reviewer.id,
                text: format!("{stars} stars"),
                rating: Rating::new(stars).expect("valid rating"),
            })
            .await
            .expect("add review");
    }

    let top = stores.top().await.expect("top");
    match top.iter().find(|t| t.store.id == store.id) {
        Some(row) => {
            assert!((row.average_rating - 4.0).abs() < f64::EPSILON);
            assert_eq!(row.review_count, 2);
        }
        // Left out only because ten better-rated stores fill the list
        None => {
            assert_eq!(top.len(), 10);
            assert!(top.iter().all(|t| t.average_rating >= 4.0));
        }
    }
}

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_review_for_missing_store_is_not_found() {
    let pool = test_pool().await;
    let reviewer = create_user(&pool).await;

    let result = StoreService::new(&pool)
        .add_review(&NewReview {
            store_id: delicious_core::StoreId::new(i32::MAX),
            author_id: reviewer.id,
            text: "Where am I?".to_owned(),
            rating: Rating::new(3).expect("valid rating"),
        })
        .await;

    assert!(matches!(result, Err(StoreError::NotFound)));
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_near_returns_stores_within_radius_nearest_first() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let stores = StoreService::new(&pool);
    let (lng, lat) = remote_point();

    let close = stores
        .create(user.id, &new_store(&format!("Close {}", unique()), (lng, lat + 0.01), &[]), None)
        .await
        .expect("create close");
    let closer = stores
        .create(user.id, &new_store(&format!("Closer {}", unique()), (lng, lat), &[]), None)
        .await
        .expect("create closer");
    let far = stores
        .create(user.id, &new_store(&format!("Far {}", unique()), (lng, lat + 0.2), &[]), None)
        .await
        .expect("create far");

    let point = GeoPoint::new(lng, lat).expect("valid point");
    let nearby = stores.near(point).await.expect("near");
    let ids: Vec<_> = nearby.iter().map(|s| s.id).collect();

    let closer_at = ids.iter().position(|id| *id == closer.id).expect("closer found");
    let close_at = ids.iter().position(|id| *id == close.id).expect("close found");
    assert!(closer_at < close_at);
    assert!(!ids.contains(&far.id));
    assert!(nearby.iter().all(|s| s.distance <= 10_000.0));
}

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_near_returns_at_most_ten_stores() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let stores = StoreService::new(&pool);
    let (lng, lat) = remote_point();

    for i in 0..12 {
        let offset = f64::from(i) * 0.001;
        stores
            .create(
                user.id,
                &new_store(&format!("Crowded {i} {}", unique()), (lng, lat + offset), &[]),
                None,
            )
            .await
            .expect("create crowded");
    }

    let point = GeoPoint::new(lng, lat).expect("valid point");
    let nearby = stores.near(point).await.expect("near");
    assert_eq!(nearby.len(), 10);
    assert!(nearby.windows(2).all(|w| w[0].distance <= w[1].distance));
}

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_search_matches_name_and_description() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let stores = StoreService::new(&pool);
    let word = format!("zq{}", unique());

    let mut store = new_store(&format!("Search {word}"), remote_point(), &[]);
    store.description = "Plain coffee.".to_owned();
    let created = stores.create(user.id, &store, None).await.expect("create");

    let results = stores.search(&word).await.expect("search");
    assert!(results.iter().any(|r| r.id == created.id));

    assert!(stores.search("   ").await.expect("blank search").is_empty());
}

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_search_finds_word_only_in_description() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let stores = StoreService::new(&pool);
    let word = format!("zq{}", unique());

    let mut store = new_store(&format!("Hidden {}", unique()), remote_point(), &[]);
    store.description = format!("Ask for the {word} on the secret menu.");
    let created = stores.create(user.id, &store, None).await.expect("create");

    let results = stores.search(&word).await.expect("search");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, created.id);
}

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_search_without_matches_is_empty() {
    let pool = test_pool().await;
    let stores = StoreService::new(&pool);

    let results = stores
        .search(&format!("zq{}", unique()))
        .await
        .expect("search");
    assert!(results.is_empty());
}

// ============================================================================
// Hearts
// ============================================================================

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_heart_toggles_on_and_off() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let stores = StoreService::new(&pool);
    let store = stores
        .create(user.id, &new_store(&format!("Hearty {}", unique()), remote_point(), &[]), None)
        .await
        .expect("create");

    let hearts = stores.toggle_heart(user.id, store.id).await.expect("heart");
    assert_eq!(hearts, vec![store.id]);
    let hearted = stores.hearted(user.id).await.expect("hearted");
    assert_eq!(hearted.len(), 1);

    let hearts = stores.toggle_heart(user.id, store.id).await.expect("unheart");
    assert!(hearts.is_empty());
    assert!(stores.heart_ids(user.id).await.expect("ids").is_empty());
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_register_rejects_duplicate_email() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let registration = delicious_site::services::auth::validate_registration(
        "Copycat",
        user.email.as_str(),
        TEST_PASSWORD,
        TEST_PASSWORD,
    )
    .expect("valid registration");

    let result = AuthService::new(&pool).register(&registration).await;
    assert!(matches!(result, Err(AuthError::UserAlreadyExists)));
}

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_reset_token_is_single_use() {
    let pool = test_pool().await;
    let user = create_user(&pool).await;
    let auth = AuthService::new(&pool);

    let issued = auth
        .issue_reset_token(user.email.as_str())
        .await
        .expect("issue")
        .expect("account exists");
    auth.verify_reset_token(&issued.token).await.expect("valid token");

    let new_password = "a-much-longer-password";
    auth.reset_password(&issued.token, new_password, new_password)
        .await
        .expect("reset");

    let reused = auth
        .reset_password(&issued.token, new_password, new_password)
        .await;
    assert!(matches!(reused, Err(AuthError::InvalidResetToken)));

    auth.login(user.email.as_str(), new_password)
        .await
        .expect("login with new password");
    assert!(matches!(
        auth.login(user.email.as_str(), TEST_PASSWORD).await,
        Err(AuthError::InvalidCredentials)
    ));
}

#[tokio::test]
#[ignore = "Requires a migrated test database"]
async fn test_reset_for_unknown_email_issues_nothing() {
    let pool = test_pool().await;
    let issued = AuthService::new(&pool)
        .issue_reset_token(&format!("nobody-{}@example.com", unique()))
        .await
        .expect("issue");
    assert!(issued.is_none());
}
