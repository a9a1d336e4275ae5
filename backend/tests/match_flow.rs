//! End-to-end lifecycle tests against a live Postgres instance.
//!
//! These run only when `CATS_SOCIAL_TEST_DATABASE_URL` points at a disposable
//! database; without it every test skips. Each test creates its own users and
//! cats, so the suite can run repeatedly against the same database.

use cats_social::db::cats::CatFilter;
use cats_social::db::matches::MatchInsert;
use cats_social::models::{CatPayload, MatchStatus, User};
use cats_social::{ApiError, PgPool, Uuid, db};
use sqlx::postgres::PgPoolOptions;
use std::str::FromStr;

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("CATS_SOCIAL_TEST_DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("failed to connect to test database");
    db::migrations::run_migrations(&pool)
        .await
        .expect("failed to run migrations");
    Some(pool)
}

macro_rules! require_pool {
    () => {
        match test_pool().await {
            Some(pool) => pool,
            None => {
                eprintln!("CATS_SOCIAL_TEST_DATABASE_URL not set, skipping");
                return;
            }
        }
    };
}

async fn new_user(pool: &PgPool) -> User {
    let mut conn = pool.acquire().await.unwrap();
    let email = format!("{}@example.com", Uuid::new_v4());
    db::users::create_user(&mut conn, &email, "Test Owner", "unused-hash")
        .await
        .unwrap()
}

fn cat_payload(sex: &str) -> CatPayload {
    CatPayload {
        name: "Whiskers".to_string(),
        race: "Bengal".to_string(),
        sex: sex.to_string(),
        age_in_month: 12,
        description: "spotted".to_string(),
        image_urls: vec!["https://example.com/w.jpg".to_string()],
    }
}

async fn new_cat(pool: &PgPool, owner: Uuid, sex: &str) -> Uuid {
    let mut conn = pool.acquire().await.unwrap();
    let (id, _) = db::cats::insert_cat(&mut conn, owner, &cat_payload(sex))
        .await
        .unwrap();
    id
}

/// Propose as the handler does: preconditions, dedup probe, insert, all in
/// one transaction.
async fn propose(
    pool: &PgPool,
    issuer: &User,
    user_cat_id: Uuid,
    match_cat_id: Uuid,
) -> Result<Uuid, ApiError> {
    let mut tx = pool.begin().await?;

    let issuer_cat = db::cats::get_cat_by_id(&mut tx, user_cat_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("cat id not found".to_string()))?;
    if issuer_cat.user_id != issuer.id {
        return Err(ApiError::NotFound("cat id not found".to_string()));
    }
    let target_cat = db::cats::get_cat_by_id(&mut tx, match_cat_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("cat id not found".to_string()))?;

    if issuer_cat.sex == target_cat.sex {
        return Err(ApiError::BadRequest(
            "cannot match cat with the same gender".to_string(),
        ));
    }
    if issuer_cat.user_id == target_cat.user_id {
        return Err(ApiError::BadRequest(
            "cannot match cat with the same owner".to_string(),
        ));
    }
    if db::matches::active_match_exists(&mut tx, user_cat_id, match_cat_id).await? {
        return Err(ApiError::BadRequest(
            "cat already requested to match".to_string(),
        ));
    }

    let (id, _) = db::matches::insert_match(
        &mut tx,
        &MatchInsert {
            issued_user_id: issuer.id,
            match_user_id: target_cat.user_id,
            user_cat_id,
            match_cat_id,
            message: "shall we?".to_string(),
        },
    )
    .await?;

    tx.commit().await?;
    Ok(id)
}

/// Approve as the handler does: status flip, sibling cascade and cat flags in
/// one transaction.
async fn approve(pool: &PgPool, match_id: Uuid) -> Result<(), ApiError> {
    let mut tx = pool.begin().await?;
    let m = db::matches::get_match_by_id(&mut tx, match_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("match id not found".to_string()))?;

    db::matches::set_match_status(&mut tx, match_id, MatchStatus::Approved).await?;
    db::matches::reject_sibling_matches(&mut tx, match_id, m.user_cat_id, m.match_cat_id).await?;
    db::matches::mark_cats_matched(&mut tx, m.user_cat_id, m.match_cat_id).await?;
    tx.commit().await?;
    Ok(())
}

async fn match_status(pool: &PgPool, match_id: Uuid) -> String {
    let mut conn = pool.acquire().await.unwrap();
    db::matches::get_match_by_id(&mut conn, match_id)
        .await
        .unwrap()
        .unwrap()
        .status
}

#[tokio::test]
async fn scenario_a_propose_then_approve() {
    let pool = require_pool!();

    let u1 = new_user(&pool).await;
    let u2 = new_user(&pool).await;
    let c1 = new_cat(&pool, u1.id, "male").await;
    let c2 = new_cat(&pool, u2.id, "female").await;

    let match_id = propose(&pool, &u1, c1, c2).await.unwrap();
    assert_eq!(match_status(&pool, match_id).await, "pending");

    approve(&pool, match_id).await.unwrap();
    assert_eq!(match_status(&pool, match_id).await, "approved");

    let mut conn = pool.acquire().await.unwrap();
    for cat_id in [c1, c2] {
        let cat = db::cats::get_cat_by_id(&mut conn, cat_id)
            .await
            .unwrap()
            .unwrap();
        assert!(cat.has_matched, "cat {} should be flagged", cat_id);
    }
}

#[tokio::test]
async fn scenario_b_new_pair_is_independent_of_earlier_approval() {
    let pool = require_pool!();

    let u1 = new_user(&pool).await;
    let u2 = new_user(&pool).await;
    let u3 = new_user(&pool).await;
    let c1 = new_cat(&pool, u1.id, "male").await;
    let c2 = new_cat(&pool, u2.id, "female").await;
    let c4 = new_cat(&pool, u3.id, "male").await;

    let first = propose(&pool, &u1, c1, c2).await.unwrap();
    approve(&pool, first).await.unwrap();

    // A different pair involving C2 may still be proposed.
    let second = propose(&pool, &u3, c4, c2).await.unwrap();
    assert_eq!(match_status(&pool, second).await, "pending");
}

#[tokio::test]
async fn scenario_c_same_owner_is_rejected_without_a_row() {
    let pool = require_pool!();

    let u1 = new_user(&pool).await;
    let c1 = new_cat(&pool, u1.id, "male").await;
    let c2 = new_cat(&pool, u1.id, "female").await;

    let err = propose(&pool, &u1, c1, c2).await.unwrap_err();
    assert_eq!(err.to_string(), "cannot match cat with the same owner");

    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(
        db::matches::count_cat_in_match(&mut conn, c1).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn scenario_d_approved_match_cannot_be_withdrawn() {
    let pool = require_pool!();

    let u1 = new_user(&pool).await;
    let u2 = new_user(&pool).await;
    let c1 = new_cat(&pool, u1.id, "male").await;
    let c2 = new_cat(&pool, u2.id, "female").await;

    let match_id = propose(&pool, &u1, c1, c2).await.unwrap();
    approve(&pool, match_id).await.unwrap();

    // Withdrawal is only valid while pending; the row must survive.
    let mut conn = pool.acquire().await.unwrap();
    let m = db::matches::get_match_by_id(&mut conn, match_id)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(MatchStatus::from_str(&m.status), Ok(MatchStatus::Pending));
    assert_eq!(match_status(&pool, match_id).await, "approved");
}

#[tokio::test]
async fn p1_dedup_is_symmetric_over_the_pair() {
    let pool = require_pool!();

    let u1 = new_user(&pool).await;
    let u2 = new_user(&pool).await;
    let c1 = new_cat(&pool, u1.id, "male").await;
    let c2 = new_cat(&pool, u2.id, "female").await;

    propose(&pool, &u1, c1, c2).await.unwrap();

    // Reversed orientation, other user as issuer: still the same pair.
    let err = propose(&pool, &u2, c2, c1).await.unwrap_err();
    assert_eq!(err.to_string(), "cat already requested to match");

    // And the same orientation again.
    let err = propose(&pool, &u1, c1, c2).await.unwrap_err();
    assert_eq!(err.to_string(), "cat already requested to match");
}

#[tokio::test]
async fn p1_rejected_pairing_does_not_block_a_new_proposal() {
    let pool = require_pool!();

    let u1 = new_user(&pool).await;
    let u2 = new_user(&pool).await;
    let c1 = new_cat(&pool, u1.id, "male").await;
    let c2 = new_cat(&pool, u2.id, "female").await;

    let first = propose(&pool, &u1, c1, c2).await.unwrap();
    {
        let mut conn = pool.acquire().await.unwrap();
        db::matches::set_match_status(&mut conn, first, MatchStatus::Reject)
            .await
            .unwrap();
    }

    propose(&pool, &u1, c1, c2).await.unwrap();
}

#[tokio::test]
async fn p2_approval_cascade_rejects_every_sibling() {
    let pool = require_pool!();

    let u1 = new_user(&pool).await;
    let u2 = new_user(&pool).await;
    let u3 = new_user(&pool).await;
    let c1 = new_cat(&pool, u1.id, "male").await;
    let c2 = new_cat(&pool, u2.id, "female").await;
    let c3 = new_cat(&pool, u3.id, "male").await;
    let c4 = new_cat(&pool, u3.id, "female").await;

    // Three pending matches all touching C1 or C2.
    let m1 = propose(&pool, &u1, c1, c2).await.unwrap();
    let m2 = propose(&pool, &u3, c3, c2).await.unwrap();
    let m3 = propose(&pool, &u1, c1, c4).await.unwrap();

    approve(&pool, m1).await.unwrap();

    assert_eq!(match_status(&pool, m1).await, "approved");
    assert_eq!(match_status(&pool, m2).await, "reject");
    assert_eq!(match_status(&pool, m3).await, "reject");
}

#[tokio::test]
async fn p3_any_match_row_locks_the_sex_even_after_reject() {
    let pool = require_pool!();

    let u1 = new_user(&pool).await;
    let u2 = new_user(&pool).await;
    let c1 = new_cat(&pool, u1.id, "male").await;
    let c2 = new_cat(&pool, u2.id, "female").await;

    let match_id = propose(&pool, &u1, c1, c2).await.unwrap();

    let mut conn = pool.acquire().await.unwrap();
    assert!(db::matches::count_cat_in_match(&mut conn, c1).await.unwrap() > 0);

    // Rejected rows still count: the lock considers all statuses.
    db::matches::set_match_status(&mut conn, match_id, MatchStatus::Reject)
        .await
        .unwrap();
    assert!(db::matches::count_cat_in_match(&mut conn, c1).await.unwrap() > 0);

    // Non-sex updates still apply to a referenced cat.
    let mut payload = cat_payload("male");
    payload.name = "Sir Whiskers".to_string();
    db::cats::update_cat(&mut conn, c1, &payload).await.unwrap();
    let cat = db::cats::get_cat_by_id(&mut conn, c1).await.unwrap().unwrap();
    assert_eq!(cat.name, "Sir Whiskers");
}

#[tokio::test]
async fn listing_defaults_and_age_filter() {
    let pool = require_pool!();

    let owner = new_user(&pool).await;
    for age in [3, 6, 9, 12, 15, 18, 21] {
        let mut payload = cat_payload("female");
        payload.age_in_month = age;
        let mut conn = pool.acquire().await.unwrap();
        db::cats::insert_cat(&mut conn, owner.id, &payload)
            .await
            .unwrap();
    }

    let mut conn = pool.acquire().await.unwrap();

    // P4: no params means at most 5 rows, newest first.
    let cats = db::cats::list_cats(&mut conn, &CatFilter::default(), owner.id)
        .await
        .unwrap();
    assert!(cats.len() <= 5);
    for pair in cats.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }

    // P5: age filter applies, malformed age filter is a no-op.
    let filter = CatFilter {
        owned: Some("true".to_string()),
        age_in_month: Some(">9".to_string()),
        limit: Some("100".to_string()),
        ..Default::default()
    };
    let cats = db::cats::list_cats(&mut conn, &filter, owner.id).await.unwrap();
    assert_eq!(cats.len(), 4);
    assert!(cats.iter().all(|cat| cat.age_in_month > 9));

    let filter = CatFilter {
        owned: Some("true".to_string()),
        age_in_month: Some("bogus".to_string()),
        limit: Some("100".to_string()),
        ..Default::default()
    };
    let cats = db::cats::list_cats(&mut conn, &filter, owner.id).await.unwrap();
    assert_eq!(cats.len(), 7);
}

#[tokio::test]
async fn soft_deleted_cats_disappear_from_listings_and_lookups() {
    let pool = require_pool!();

    let owner = new_user(&pool).await;
    let cat_id = new_cat(&pool, owner.id, "female").await;

    let mut conn = pool.acquire().await.unwrap();
    db::cats::soft_delete_cat(&mut conn, cat_id).await.unwrap();

    assert!(db::cats::get_cat_by_id(&mut conn, cat_id).await.unwrap().is_none());

    let filter = CatFilter {
        owned: Some("true".to_string()),
        limit: Some("100".to_string()),
        ..Default::default()
    };
    let cats = db::cats::list_cats(&mut conn, &filter, owner.id).await.unwrap();
    assert!(cats.iter().all(|cat| cat.id != cat_id));
}
