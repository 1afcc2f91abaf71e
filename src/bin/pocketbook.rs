use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::{Parser, Subcommand};
use time::{Date, OffsetDateTime, Time, UtcOffset, macros::format_description};

use pocketbook::{
    Error, Repository, UserId,
    budget::{BudgetId, BudgetStatus, NewBudget},
    category::{CategoryId, CategoryName, Color, NewCategory},
    config::{DashboardConfig, StoreConfig, get_local_offset},
    dashboard::{Dashboard, DashboardView},
    expense::{Amount, ExpenseId, NewExpense},
    format::{format_currency, format_percent},
    logging::setup_logging,
    pocket::PocketMoneySettings,
    store::SqliteDocumentStore,
    window::DateWindow,
};

/// Track spending against categories and budgets.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the SQLite database.
    #[arg(long, default_value = "pocketbook.db")]
    db_path: PathBuf,

    /// The user whose data to read and write.
    #[arg(long, default_value = "default")]
    user: String,

    /// Canonical timezone name used to work out the current month, e.g. "Pacific/Auckland".
    #[arg(long, default_value = "Etc/UTC")]
    timezone: String,

    /// Monthly income. Pocket money is only shown when this is set.
    #[arg(long)]
    income: Option<f64>,

    /// How much of the monthly income to set aside.
    #[arg(long, default_value_t = 0.0)]
    savings_goal: f64,

    /// Also write debug logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a category.
    AddCategory {
        name: String,

        /// Colour as `#RRGGBB` or `#AARRGGBB`.
        #[arg(long, default_value = "#4CAF50")]
        color: Color,
    },
    /// Record an expense.
    AddExpense {
        amount: f64,

        /// Key of the category to file the expense under.
        #[arg(long)]
        category: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Date of the expense as YYYY-MM-DD. Defaults to now.
        #[arg(long, value_parser = parse_date)]
        date: Option<Date>,

        /// Reference to a receipt photo.
        #[arg(long)]
        photo: Option<String>,
    },
    /// Set a budget for a category.
    AddBudget {
        /// Key of the category the budget applies to.
        #[arg(long)]
        category: String,

        #[arg(long, default_value_t = 0.0)]
        minimum: f64,

        #[arg(long)]
        maximum: f64,

        /// First day of the budget as YYYY-MM-DD. Defaults to the start of this month.
        #[arg(long, value_parser = parse_date)]
        start: Option<Date>,

        /// Last day of the budget as YYYY-MM-DD. Defaults to the end of this month.
        #[arg(long, value_parser = parse_date)]
        end: Option<Date>,
    },
    /// Delete a category. Its expenses and budgets are kept but no longer shown.
    DeleteCategory { id: String },
    /// Delete an expense.
    DeleteExpense { id: String },
    /// Delete a budget.
    DeleteBudget { id: String },
    /// Print the dashboard once.
    Summary,
    /// Print the dashboard every time the data changes, until Ctrl+C.
    Watch,
}

fn parse_date(text: &str) -> Result<Date, String> {
    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .map_err(|error| format!("expected a date like 2024-01-31: {error}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(error) = setup_logging(args.log_file.as_deref()) {
        eprintln!("Could not set up logging: {error}");
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!("{error}");
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Error> {
    let offset = get_local_offset(&args.timezone)?;
    let pocket_money = args
        .income
        .map(|income| PocketMoneySettings::new(income, args.savings_goal))
        .transpose()?;
    let dashboard_config = DashboardConfig {
        offset,
        pocket_money,
    };
    let store_config = StoreConfig::default();

    let store = SqliteDocumentStore::open(&args.db_path)?;
    let repository = Repository::new(
        Arc::new(store.clone()),
        UserId::new(args.user),
        store_config,
    );

    match args.command {
        Command::AddCategory { name, color } => {
            let id = repository.create_category(NewCategory {
                name: CategoryName::new(&name)?,
                color,
            })?;
            println!("Created category {id}");
        }
        Command::AddExpense {
            amount,
            category,
            description,
            date,
            photo,
        } => {
            let occurred_at = match date {
                Some(date) => date.with_time(Time::MIDNIGHT).assume_offset(offset),
                None => OffsetDateTime::now_utc(),
            };
            let id = repository.create_expense(NewExpense {
                amount: Amount::new(amount)?,
                description,
                occurred_at,
                category_id: CategoryId::new(category),
                photo_ref: photo,
            })?;
            println!("Recorded expense {id}");
        }
        Command::AddBudget {
            category,
            minimum,
            maximum,
            start,
            end,
        } => {
            let this_month = DateWindow::month_containing(OffsetDateTime::now_utc(), offset);
            let start_at = start.map_or(this_month.start(), |date| start_of_day(date, offset));
            let end_at = end.map_or(this_month.end(), |date| end_of_day(date, offset));

            let id = repository.create_budget(NewBudget::new(
                minimum,
                maximum,
                CategoryId::new(category),
                start_at,
                end_at,
            )?)?;
            println!("Created budget {id}");
        }
        Command::DeleteCategory { id } => {
            repository.delete_category(&CategoryId::new(id))?;
        }
        Command::DeleteExpense { id } => {
            repository.delete_expense(&ExpenseId::new(id))?;
        }
        Command::DeleteBudget { id } => {
            repository.delete_budget(&BudgetId::new(id))?;
        }
        Command::Summary => {
            let mut dashboard = Dashboard::watch(&repository, dashboard_config);
            if let Some(view) = dashboard.next().await {
                print_view(&view);
            }
        }
        Command::Watch => {
            let poller = store.spawn_change_poller(store_config.poll_interval);
            let mut dashboard = Dashboard::watch(&repository, dashboard_config);

            let shutdown = tokio::signal::ctrl_c();
            tokio::pin!(shutdown);

            loop {
                tokio::select! {
                    view = dashboard.latest() => match view {
                        Some(view) => print_view(&view),
                        None => break,
                    },
                    _ = &mut shutdown => {
                        tracing::info!("received Ctrl+C, stopping");
                        break;
                    }
                }
            }

            dashboard.unsubscribe();
            poller.abort();
        }
    }

    Ok(())
}

fn start_of_day(date: Date, offset: UtcOffset) -> OffsetDateTime {
    date.midnight().assume_offset(offset)
}

fn end_of_day(date: Date, offset: UtcOffset) -> OffsetDateTime {
    date.with_time(Time::MAX).assume_offset(offset)
}

fn print_view(view: &DashboardView) {
    println!();
    println!(
        "Spending from {} to {}",
        view.period.start().date(),
        view.period.end().date()
    );

    if view.breakdown.is_empty() {
        println!("  Nothing spent yet.");
    }

    for total in &view.breakdown {
        println!(
            "  {:<20} {:>12} {:>7}  ({} expense{})",
            total.category.name.as_ref(),
            format_currency(total.total),
            format_percent(total.share),
            total.expense_count,
            if total.expense_count == 1 { "" } else { "s" }
        );
    }
    println!("  {:<20} {:>12}", "Total", format_currency(view.total_spent));

    if !view.budgets.is_empty() {
        println!("Budgets");
    }

    for report in &view.budgets {
        let remaining = match report.status {
            BudgetStatus::Over => format!("{} over", format_currency(-report.remaining)),
            _ => format!("{} left", format_currency(report.remaining)),
        };

        println!(
            "  {:<20} {:>12} of {:>12} {:>7}  {}, {}",
            report.category.name.as_ref(),
            format_currency(report.spent),
            format_currency(report.budget.limits.maximum()),
            format_percent(report.percent_used),
            report.status,
            remaining
        );
    }

    if let Some(pocket_money) = &view.pocket_money {
        println!(
            "Pocket money: {} ({})",
            format_currency(pocket_money.pocket),
            pocket_money.tier
        );

        if pocket_money.is_deficit() {
            println!(
                "  Commitments exceed income by {}",
                format_currency(-pocket_money.after_budgets)
            );
        } else if pocket_money.is_break_even() {
            println!("  Commitments use up the whole income.");
        }
    }

    if view.orphaned_expenses > 0 {
        println!(
            "{} expense(s) reference deleted categories and are not shown.",
            view.orphaned_expenses
        );
    }
}
