//! Concurrency tests against a file database shared by several connections.

use std::collections::HashSet;
use std::time::Duration;

use tempfile::TempDir;

use catalog_integration_tests::{create_brand, create_category, file_store, product_input};
use catalog_store::{BrandRepository, ProductRepository, RepositoryError, with_timeout};

const WRITERS: usize = 8;
const PER_WRITER: usize = 5;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_code_allocation_is_unique() {
    let dir = TempDir::new().unwrap();
    let pool = file_store(&dir).await;
    let chairs = create_category(&pool, "Chairs", "chairs", None).await;
    let acme = create_brand(&pool, "ACME").await;

    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let pool = pool.clone();
        let category = chairs.id.clone();
        let brand = acme.id.clone();
        handles.push(tokio::spawn(async move {
            let products = ProductRepository::new(&pool);
            let mut codes = Vec::new();
            for n in 0..PER_WRITER {
                let input = product_input(&category, &format!("chair-{writer}-{n}"), 9_900)
                    .with_brand(brand.clone());
                let product = products.create(&input).await.unwrap();
                codes.push(product.product_code);
            }
            codes
        }));
    }

    let mut codes = Vec::new();
    for handle in handles {
        codes.extend(handle.await.unwrap());
    }

    let total = WRITERS * PER_WRITER;
    let unique: HashSet<_> = codes.iter().collect();
    assert_eq!(unique.len(), total);

    let mut sequences: Vec<i64> = codes
        .iter()
        .map(|code| code.brand_sequence().unwrap().1)
        .collect();
    sequences.sort_unstable();
    let expected: Vec<i64> = (1..=i64::try_from(total).unwrap()).collect();
    assert_eq!(sequences, expected);

    let brand = BrandRepository::new(&pool).get(&acme.id).await.unwrap();
    assert_eq!(brand.next_product_num, i64::try_from(total).unwrap() + 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_stock_decrements_never_oversell() {
    let dir = TempDir::new().unwrap();
    let pool = file_store(&dir).await;
    let chairs = create_category(&pool, "Chairs", "chairs", None).await;
    let acme = create_brand(&pool, "ACME").await;
    let mut input = product_input(&chairs.id, "oak-chair", 12_900).with_brand(acme.id.clone());
    input.stock_quantity = 5;
    let product = ProductRepository::new(&pool).create(&input).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let pool = pool.clone();
        let id = product.id.clone();
        handles.push(tokio::spawn(async move {
            ProductRepository::new(&pool).adjust_stock(&id, -1).await
        }));
    }

    let mut sold = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(RepositoryError::Validation { .. }) => refused += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(sold, 5);
    assert_eq!(refused, 5);

    let reloaded = ProductRepository::new(&pool).get(&product.id).await.unwrap();
    assert_eq!(reloaded.stock_quantity, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_write_timed_out_before_commit_rolls_back() {
    let dir = TempDir::new().unwrap();
    let pool = file_store(&dir).await;
    let chairs = create_category(&pool, "Chairs", "chairs", None).await;
    let acme = create_brand(&pool, "ACME").await;

    // Hold the write lock from another connection.
    let mut blocker = pool.begin().await.unwrap();
    sqlx::query(r#"UPDATE "product_brands" SET "name" = "name" WHERE "id" = ?"#)
        .bind(acme.id.as_str())
        .execute(&mut *blocker)
        .await
        .unwrap();

    let products = ProductRepository::new(&pool);
    let input = product_input(&chairs.id, "oak-chair", 12_900).with_brand(acme.id.clone());
    let err = with_timeout(Duration::from_millis(200), products.create(&input))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Timeout(d) if d == Duration::from_millis(200)));
    assert!(!err.is_retryable());
    assert!(err.is_retryable_read());

    blocker.rollback().await.unwrap();

    assert!(
        products
            .find_by_slug(&catalog_integration_tests::slug("oak-chair"))
            .await
            .unwrap()
            .is_none()
    );
    let brand = BrandRepository::new(&pool).get(&acme.id).await.unwrap();
    assert_eq!(brand.next_product_num, 1);

    // Once the lock is gone the same write goes through.
    let product = with_timeout(Duration::from_secs(30), products.create(&input))
        .await
        .unwrap();
    assert_eq!(product.product_code.as_str(), "ACME-00001");
}
