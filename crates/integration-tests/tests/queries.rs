//! Integration tests for filtering, ordering, pagination and aggregates.

use std::collections::HashSet;

use futures::TryStreamExt;
use rust_decimal::Decimal;
use sqlx::SqlitePool;

use catalog_core::{CategoryId, ProductCode, ProductId, StockStatus};
use catalog_integration_tests::{cents, create_category, product_input, store};
use catalog_store::models::{CategoryField, Product, ProductField};
use catalog_store::{
    CategoryRepository, Filter, OrderBy, Page, ProductRepository, Query, RepositoryError,
};

/// Five products: two share the lowest price, one name is lowercase.
async fn seed(pool: &SqlitePool) -> Vec<Product> {
    let chairs = create_category(pool, "Chairs", "chairs", None).await;
    let products = ProductRepository::new(pool);

    let rows = [
        ("Oak Chair", "oak-chair", 10_000, 5, StockStatus::InStock),
        ("Pine Chair", "pine-chair", 5_000, 0, StockStatus::OutOfStock),
        ("Oak Table", "oak-table", 30_000, 2, StockStatus::LowStock),
        ("oak stool", "oak-stool", 7_500, 10, StockStatus::InStock),
        ("Birch Chair", "birch-chair", 5_000, 0, StockStatus::PreOrder),
    ];

    let mut created = Vec::new();
    for (i, (name, slug, price, stock, status)) in rows.into_iter().enumerate() {
        let mut input = product_input(&chairs.id, slug, price)
            .with_code(ProductCode::parse(&format!("P-{i}")).unwrap());
        input.name = name.to_owned();
        input.stock_quantity = stock;
        input.stock_status = status;
        created.push(products.create(&input).await.unwrap());
    }
    created
}

fn names(products: &[Product]) -> Vec<&str> {
    products.iter().map(|p| p.name.as_str()).collect()
}

// =============================================================================
// Filters
// =============================================================================

#[tokio::test]
async fn test_contains_is_case_sensitive() {
    let pool = store().await;
    seed(&pool).await;
    let products = ProductRepository::new(&pool);

    let found = products
        .find_many(
            &Query::new()
                .filter(Filter::new().contains(ProductField::Name, "Oak"))
                .order_by(OrderBy::asc(ProductField::Name)),
        )
        .await
        .unwrap();
    assert_eq!(names(&found), vec!["Oak Chair", "Oak Table"]);

    let found = products
        .find_many(&Filter::new().starts_with(ProductField::Name, "oak").into())
        .await
        .unwrap();
    assert_eq!(names(&found), vec!["oak stool"]);

    let found = products
        .find_many(
            &Query::new()
                .filter(Filter::new().ends_with(ProductField::Name, "Chair"))
                .order_by(OrderBy::desc(ProductField::Name)),
        )
        .await
        .unwrap();
    assert_eq!(names(&found), vec!["Pine Chair", "Oak Chair", "Birch Chair"]);
}

#[tokio::test]
async fn test_decimal_range_filter() {
    let pool = store().await;
    seed(&pool).await;

    let found = ProductRepository::new(&pool)
        .find_many(
            &Query::new()
                .filter(
                    Filter::new()
                        .gte(ProductField::Price, cents(7_500))
                        .lt(ProductField::Price, cents(30_000)),
                )
                .order_by(OrderBy::asc(ProductField::Price)),
        )
        .await
        .unwrap();
    assert_eq!(names(&found), vec!["oak stool", "Oak Chair"]);
}

#[tokio::test]
async fn test_membership_and_composite_filters() {
    let pool = store().await;
    seed(&pool).await;
    let products = ProductRepository::new(&pool);

    let none = Filter::new().is_in(ProductField::StockStatus, Vec::<StockStatus>::new());
    assert_eq!(products.count(&none).await.unwrap(), 0);
    let all = Filter::new().not_in(ProductField::StockStatus, Vec::<StockStatus>::new());
    assert_eq!(products.count(&all).await.unwrap(), 5);

    let unavailable = Filter::new().is_in(
        ProductField::StockStatus,
        [StockStatus::OutOfStock, StockStatus::PreOrder],
    );
    assert_eq!(products.count(&unavailable).await.unwrap(), 2);

    let either = Filter::new().any_of([
        Filter::new().eq(ProductField::StockQuantity, 10),
        Filter::new().eq(ProductField::StockStatus, StockStatus::LowStock),
    ]);
    let found = products
        .find_many(&Query::new().filter(either).order_by(OrderBy::asc(ProductField::Name)))
        .await
        .unwrap();
    assert_eq!(names(&found), vec!["Oak Table", "oak stool"]);

    let not_chairs = Filter::new().not(Filter::new().ends_with(ProductField::Name, "Chair"));
    assert_eq!(products.count(&not_chairs).await.unwrap(), 2);

    assert_eq!(
        products
            .count(&Filter::new().is_null(ProductField::SalePrice))
            .await
            .unwrap(),
        5
    );
}

#[tokio::test]
async fn test_ill_typed_filters_are_rejected() {
    let pool = store().await;
    seed(&pool).await;
    let products = ProductRepository::new(&pool);

    let err = products
        .count(&Filter::new().eq(ProductField::Price, "cheap"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Validation { ref field, .. } if field == "price"));

    let err = products
        .find_many(&Filter::new().contains(ProductField::Price, "1").into())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Validation { .. }));

    let err = products
        .find_many(&Filter::new().gt(ProductField::IsActive, true).into())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Validation { .. }));
}

// =============================================================================
// Pagination
// =============================================================================

#[tokio::test]
async fn test_offset_pagination_covers_every_row_once() {
    let pool = store().await;
    seed(&pool).await;
    let products = ProductRepository::new(&pool);
    let by_price = Query::new().order_by(OrderBy::asc(ProductField::Price));

    let mut seen = Vec::new();
    for skip in [0, 2, 4, 6] {
        let page = products
            .find_many(&by_price.clone().page(Page::offset(skip, 2)))
            .await
            .unwrap();
        seen.extend(page.into_iter().map(|p| p.id));
    }

    let full: Vec<ProductId> = products
        .find_many(&by_price)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(seen, full);
    assert_eq!(seen.len(), 5);

    let err = products
        .find_many(&by_price.page(Page::offset(-1, 2)))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Validation { .. }));
}

#[tokio::test]
async fn test_cursor_pagination_is_exclusive_and_stable_on_ties() {
    let pool = store().await;
    seed(&pool).await;
    let products = ProductRepository::new(&pool);
    let by_price = Query::new().order_by(OrderBy::asc(ProductField::Price));

    let mut seen: Vec<ProductId> = Vec::new();
    let mut page = Page::offset(0, 2);
    loop {
        let batch = products
            .find_many(&by_price.clone().page(page))
            .await
            .unwrap();
        let Some(last) = batch.last() else {
            break;
        };
        page = Page::after(last.id.clone(), 2);
        seen.extend(batch.into_iter().map(|p| p.id));
    }

    let unique: HashSet<&ProductId> = seen.iter().collect();
    assert_eq!(unique.len(), seen.len());

    let full: Vec<ProductId> = products
        .find_many(&by_price)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(seen, full);
}

#[tokio::test]
async fn test_missing_cursor_is_not_found() {
    let pool = store().await;
    seed(&pool).await;

    let err = ProductRepository::new(&pool)
        .find_many(&Query::new().page(Page::after(ProductId::new("missing"), 2)))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_stream_restarts_and_matches_find_many() {
    let pool = store().await;
    seed(&pool).await;
    let products = ProductRepository::new(&pool);
    let query = Query::new()
        .filter(Filter::new().eq(ProductField::IsActive, true))
        .order_by(OrderBy::desc(ProductField::Price));

    let first: Vec<Product> = products.stream(query.clone()).try_collect().await.unwrap();
    let second: Vec<Product> = products.stream(query.clone()).try_collect().await.unwrap();
    let buffered = products.find_many(&query).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first, buffered);
    assert_eq!(first.len(), 5);
    assert_eq!(first[0].name, "Oak Table");
}

/// One root with enough children to span several stream batches.
async fn seed_wide_tree(pool: &SqlitePool, children: usize) -> CategoryId {
    let root = create_category(pool, "Furniture", "furniture", None).await;
    for i in 0..children {
        create_category(
            pool,
            &format!("Item {i:03}"),
            &format!("item-{i:03}"),
            Some(&root.id),
        )
        .await;
    }
    root.id
}

#[tokio::test]
async fn test_repository_calls_while_consuming_a_stream() {
    let pool = store().await;
    let root = seed_wide_tree(&pool, 3).await;
    let categories = CategoryRepository::new(&pool);

    let mut stream = categories.stream(Query::new().order_by(OrderBy::asc(CategoryField::Name)));
    let mut child_counts = Vec::new();
    while let Some(category) = stream.try_next().await.unwrap() {
        let children = categories.list_children(&category.id).await.unwrap();
        child_counts.push((category.id == root, children.len()));
    }

    assert_eq!(
        child_counts,
        vec![(true, 3), (false, 0), (false, 0), (false, 0)]
    );
}

#[tokio::test]
async fn test_stream_spans_batches_and_honours_pages() {
    let pool = store().await;
    let root = seed_wide_tree(&pool, 299).await;
    let categories = CategoryRepository::new(&pool);
    let ordered = Query::new().order_by(OrderBy::desc(CategoryField::Name));

    let mut streamed = Vec::new();
    let mut stream = categories.stream(ordered.clone());
    while let Some(category) = stream.try_next().await.unwrap() {
        // Interleave a read on the same pool.
        categories.get(&category.id).await.unwrap();
        streamed.push(category);
    }
    let buffered = categories.find_many(&ordered).await.unwrap();
    assert_eq!(streamed.len(), 300);
    assert_eq!(streamed, buffered);
    assert_eq!(streamed[299].id, root);

    let window = ordered.clone().page(Page::offset(10, 270));
    let streamed: Vec<_> = categories.stream(window.clone()).try_collect().await.unwrap();
    assert_eq!(streamed.len(), 270);
    assert_eq!(streamed, categories.find_many(&window).await.unwrap());

    let after = ordered.page(Page::after(buffered[19].id.clone(), 265));
    let streamed: Vec<_> = categories.stream(after.clone()).try_collect().await.unwrap();
    assert_eq!(streamed.len(), 265);
    assert_eq!(streamed[0].id, buffered[20].id);
    assert_eq!(streamed, categories.find_many(&after).await.unwrap());
}

#[tokio::test]
async fn test_reads_do_not_change_state() {
    let pool = store().await;
    seed(&pool).await;
    let products = ProductRepository::new(&pool);
    let query = Query::new().order_by(OrderBy::asc(ProductField::Name));

    let before = products.find_many(&query).await.unwrap();
    products.count(&Filter::new()).await.unwrap();
    products
        .aggregate(&Filter::new(), &[ProductField::Price])
        .await
        .unwrap();
    let after = products.find_many(&query).await.unwrap();
    assert_eq!(before, after);
}

// =============================================================================
// Aggregates
// =============================================================================

#[tokio::test]
async fn test_aggregate_numeric_fields() {
    let pool = store().await;
    seed(&pool).await;
    let products = ProductRepository::new(&pool);

    let stats = products
        .aggregate(
            &Filter::new(),
            &[ProductField::Price, ProductField::StockQuantity],
        )
        .await
        .unwrap();
    assert_eq!(stats.count, 5);

    let price = stats.field(ProductField::Price).unwrap();
    assert_eq!(price.count, 5);
    assert_eq!(price.min, Some(cents(5_000)));
    assert_eq!(price.max, Some(cents(30_000)));
    assert_eq!(price.sum, Some(cents(57_500)));
    assert_eq!(price.avg, Some(Decimal::from(115)));

    let stock = stats.field(ProductField::StockQuantity).unwrap();
    assert_eq!(stock.sum, Some(Decimal::from(17)));
    assert_eq!(stock.avg, Some(Decimal::new(34, 1)));

    // Nullable column with no values.
    let sale = products
        .aggregate(&Filter::new(), &[ProductField::SalePrice])
        .await
        .unwrap();
    let sale = sale.field(ProductField::SalePrice).unwrap();
    assert_eq!(sale.count, 0);
    assert!(sale.min.is_none());
    assert!(sale.avg.is_none());
}

#[tokio::test]
async fn test_aggregate_over_empty_set() {
    let pool = store().await;
    seed(&pool).await;

    let stats = ProductRepository::new(&pool)
        .aggregate(
            &Filter::new().gt(ProductField::Price, cents(1_000_000)),
            &[ProductField::Price],
        )
        .await
        .unwrap();
    assert_eq!(stats.count, 0);
    assert!(stats.fields[0].sum.is_none());
}

#[tokio::test]
async fn test_aggregate_rejects_non_numeric_field() {
    let pool = store().await;

    let err = ProductRepository::new(&pool)
        .aggregate(&Filter::new(), &[ProductField::Name])
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Validation { ref field, .. } if field == "name"));
}
