//! Category inspection commands.

use catalog_store::{CategoryRepository, StoreConfig, connect};

/// Print the category forest, one indented line per category.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or read.
pub async fn tree(config: &StoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pool = connect(config).await?;
    let forest = CategoryRepository::new(&pool).tree().await?;

    let mut lines = Vec::new();
    for root in &forest {
        root.walk(0, &mut |category, depth| {
            lines.push(format!(
                "{:indent$}{} ({})",
                "",
                category.name,
                category.slug,
                indent = depth * 2
            ));
        });
    }

    #[allow(clippy::print_stdout)]
    {
        if lines.is_empty() {
            println!("No categories");
        }
        for line in lines {
            println!("{line}");
        }
    }

    tracing::debug!(roots = forest.len(), "Printed category tree");
    Ok(())
}
