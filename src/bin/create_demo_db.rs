use std::error::Error;
use std::path::Path;
use std::process::exit;
use std::sync::Arc;

use clap::Parser;
use time::{Duration, OffsetDateTime};

use pocketbook::{
    Repository, UserId,
    budget::NewBudget,
    category::{CategoryName, Color, NewCategory},
    config::StoreConfig,
    expense::{Amount, NewExpense},
    store::SqliteDocumentStore,
    window::DateWindow,
};

/// A utility for creating a demo database for pocketbook.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The user to create the demo data for.
    #[arg(long, default_value = "default")]
    user: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let store = SqliteDocumentStore::open(output_path)?;
    let repository = Repository::new(
        Arc::new(store),
        UserId::new(args.user),
        StoreConfig::default(),
    );

    println!("Creating categories...");
    let categories = [
        ("Groceries", "#4CAF50"),
        ("Transport", "#2196F3"),
        ("Eating out", "#FF9800"),
        ("Entertainment", "#9C27B0"),
    ];
    let mut category_ids = Vec::with_capacity(categories.len());
    for (name, color) in categories {
        let id = repository.create_category(NewCategory {
            name: CategoryName::new(name)?,
            color: color.parse::<Color>()?,
        })?;
        category_ids.push(id);
    }

    println!("Creating expenses...");
    let now = OffsetDateTime::now_utc();
    let expenses = [
        (0, 84.20, "Weekly shop", 1),
        (0, 61.75, "Top up shop", 5),
        (1, 45.00, "Bus pass", 2),
        (2, 23.50, "Lunch with friends", 3),
        (2, 12.00, "Coffee", 8),
        (3, 18.99, "Streaming subscription", 12),
    ];
    for (category, amount, description, days_ago) in expenses {
        repository.create_expense(NewExpense {
            amount: Amount::new(amount)?,
            description: description.to_owned(),
            occurred_at: now - Duration::days(days_ago),
            category_id: category_ids[category].clone(),
            photo_ref: None,
        })?;
    }

    println!("Creating budgets...");
    let this_month = DateWindow::month_containing(now, time::UtcOffset::UTC);
    for (category, minimum, maximum) in [(0, 300.0, 500.0), (2, 0.0, 100.0)] {
        repository.create_budget(NewBudget::new(
            minimum,
            maximum,
            category_ids[category].clone(),
            this_month.start(),
            this_month.end(),
        )?)?;
    }

    println!("Success!");

    Ok(())
}
