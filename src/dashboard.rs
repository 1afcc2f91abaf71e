//! The overview screen: spending by category, budget progress and pocket
//! money, kept up to date as the underlying data changes.

use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::{
    Repository,
    budget::{Budget, BudgetReport, active_allocation, budget_reports},
    category::Category,
    config::DashboardConfig,
    expense::Expense,
    join::{join_by_category, orphans},
    live::{Snapshot, Subscription, combine_latest},
    pocket::PocketMoney,
    spending::{CategoryTotal, category_breakdown, total_expenses},
    window::DateWindow,
};

/// Everything the overview shows, computed from one set of snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    /// The calendar month the breakdown and pocket money cover.
    pub period: DateWindow,
    /// This month's spending per category, largest first.
    pub breakdown: Vec<CategoryTotal>,
    /// This month's spending in known categories, the sum of `breakdown`.
    pub total_spent: f64,
    /// Progress of every budget whose category exists.
    pub budgets: Vec<BudgetReport>,
    /// `None` when no income has been configured.
    pub pocket_money: Option<PocketMoney>,
    /// Expenses left out because their category no longer exists.
    pub orphaned_expenses: usize,
    pub computed_at: OffsetDateTime,
}

/// Builds [DashboardView]s.
pub struct Dashboard;

impl Dashboard {
    /// Compute the view for `now` from complete snapshots of the user's data.
    pub fn compute(
        categories: &[Category],
        expenses: &[Expense],
        budgets: &[Budget],
        config: &DashboardConfig,
        now: OffsetDateTime,
    ) -> DashboardView {
        let period = DateWindow::month_containing(now, config.offset);

        let joined_expenses = join_by_category(categories, expenses);
        let breakdown = category_breakdown(&joined_expenses, Some(&period));
        let total_spent = total_expenses(&joined_expenses, Some(&period));

        let joined_budgets = join_by_category(categories, budgets);
        let budget_allocation =
            active_allocation(joined_budgets.iter().map(|joined| &joined.item), now);

        let pocket_money = config
            .pocket_money
            .map(|settings| PocketMoney::calculate(&settings, total_spent, budget_allocation));

        DashboardView {
            period,
            breakdown,
            total_spent,
            budgets: budget_reports(&joined_budgets, expenses),
            pocket_money,
            orphaned_expenses: orphans(categories, expenses).len(),
            computed_at: now,
        }
    }

    /// Follow the user's data and recompute the view whenever categories,
    /// expenses or budgets change.
    ///
    /// The first view arrives once all three collections have been read. The
    /// view is also recomputed when the clock passes the end of the current
    /// month or the start or end of a budget, even if no data changed.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn watch(repository: &Repository, config: DashboardConfig) -> DashboardSubscription {
        let mut inputs = combine_latest(
            combine_latest(
                repository.subscribe_categories(),
                repository.subscribe_expenses(),
            ),
            repository.subscribe_budgets(),
        );

        let views: Subscription<DashboardView> = Subscription::spawn(move |publisher| async move {
            let mut latest: Option<((Snapshot<Category>, Snapshot<Expense>), Snapshot<Budget>)> =
                None;
            let mut refresh_at: Option<OffsetDateTime> = None;

            loop {
                tokio::select! {
                    snapshots = inputs.next() => match snapshots {
                        Some(snapshots) => latest = Some(snapshots),
                        None => break,
                    },
                    () = wait_until(refresh_at) => {
                        tracing::debug!("dashboard period or budget boundary passed");
                    }
                }

                let Some(((categories, expenses), budgets)) = &latest else {
                    continue;
                };

                let now = OffsetDateTime::now_utc();
                let view = Dashboard::compute(categories, expenses, budgets, &config, now);
                refresh_at = Some(next_refresh(&view.period, budgets, now));
                tracing::debug!(
                    "recomputed dashboard from {} categories, {} expenses and {} budgets",
                    categories.len(),
                    expenses.len(),
                    budgets.len()
                );

                if !publisher.publish(view) {
                    break;
                }
            }
        });

        DashboardSubscription { views }
    }
}

/// The first instant after `now` at which a view computed at `now` goes stale
/// on its own: the start of the next period, or a budget becoming active or
/// inactive.
fn next_refresh(period: &DateWindow, budgets: &[Budget], now: OffsetDateTime) -> OffsetDateTime {
    let period_over = period.end() + Duration::NANOSECOND;

    budgets
        .iter()
        .flat_map(|budget| {
            [
                budget.window.start(),
                budget.window.end() + Duration::NANOSECOND,
            ]
        })
        .filter(|boundary| *boundary > now)
        .fold(period_over, OffsetDateTime::min)
}

/// Sleep until the wall clock reaches `instant`, or forever for `None`.
async fn wait_until(instant: Option<OffsetDateTime>) {
    let Some(instant) = instant else {
        return std::future::pending().await;
    };

    let wait = std::time::Duration::try_from(instant - OffsetDateTime::now_utc())
        .unwrap_or_default();
    tokio::time::sleep(wait).await;
}

/// A live feed of [DashboardView]s.
///
/// Dropping the subscription stops the pipeline and releases the store
/// subscriptions feeding it.
#[derive(Debug)]
pub struct DashboardSubscription {
    views: Subscription<DashboardView>,
}

impl DashboardSubscription {
    /// Wait for the next view. Returns `None` once unsubscribed.
    pub async fn next(&mut self) -> Option<DashboardView> {
        self.views.next().await
    }

    /// Wait for a view, skipping any that were superseded while nobody was
    /// reading.
    pub async fn latest(&mut self) -> Option<DashboardView> {
        self.views.latest().await
    }

    /// Stop the pipeline. Calling this more than once has no further effect.
    pub fn unsubscribe(&mut self) {
        self.views.unsubscribe();
    }

    pub fn is_active(&self) -> bool {
        self.views.is_active()
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use time::{OffsetDateTime, UtcOffset, macros::datetime};

    use super::{Dashboard, next_refresh};
    use crate::{
        UserId,
        budget::{Budget, BudgetStatus, NewBudget},
        category::{Category, CategoryName, Color, NewCategory},
        config::{DashboardConfig, StoreConfig},
        expense::{Amount, Expense, NewExpense},
        pocket::{PocketMoneySettings, PocketTier},
        store::{MemoryDocumentStore, Repository},
        window::DateWindow,
    };

    fn category(id: &str, name: &str) -> Category {
        Category {
            id: id.into(),
            name: CategoryName::new_unchecked(name),
            color: Color::from_argb(0xFFFF0000),
            owner: UserId::new("u1"),
        }
    }

    fn expense(id: &str, category_id: &str, amount: f64, occurred_at: OffsetDateTime) -> Expense {
        Expense {
            id: id.into(),
            amount: Amount::new(amount).unwrap(),
            description: String::new(),
            occurred_at,
            category_id: category_id.into(),
            photo_ref: None,
            owner: UserId::new("u1"),
        }
    }

    fn budget(category_id: &str, maximum: f64, start: OffsetDateTime, end: OffsetDateTime) -> Budget {
        NewBudget::new(0.0, maximum, category_id.into(), start, end)
            .unwrap()
            .with_id("b1".into(), UserId::new("u1"))
    }

    fn config_with_income(income: f64, savings_goal: f64) -> DashboardConfig {
        DashboardConfig {
            offset: UtcOffset::UTC,
            pocket_money: Some(PocketMoneySettings::new(income, savings_goal).unwrap()),
        }
    }

    #[test]
    fn computes_pocket_money_from_current_month() {
        let now = datetime!(2024-03-15 12:00 UTC);
        let categories = vec![category("a", "Food")];
        let expenses = vec![
            expense("1", "a", 300.0, datetime!(2024-03-02 09:00 UTC)),
            // Last month, so not part of this month's spending.
            expense("2", "a", 5000.0, datetime!(2024-02-28 09:00 UTC)),
        ];
        let budgets = vec![budget(
            "a",
            400.0,
            datetime!(2024-03-01 00:00 UTC),
            datetime!(2024-03-31 23:59 UTC),
        )];

        let view = Dashboard::compute(
            &categories,
            &expenses,
            &budgets,
            &config_with_income(2000.0, 200.0),
            now,
        );

        assert_eq!(view.total_spent, 300.0);
        let pocket_money = view.pocket_money.unwrap();
        assert_eq!(pocket_money.after_expenses, 1700.0);
        assert_eq!(pocket_money.after_savings, 1500.0);
        assert_eq!(pocket_money.after_budgets, 1100.0);
        assert_eq!(pocket_money.pocket, 1100.0);
        assert_eq!(pocket_money.tier, PocketTier::Comfortable);
    }

    #[test]
    fn orphans_are_counted_but_not_aggregated() {
        let now = datetime!(2024-01-20 00:00 UTC);
        let categories = vec![category("A", "Red")];
        let expenses = vec![
            expense("1", "A", 100.0, datetime!(2024-01-02 00:00 UTC)),
            expense("2", "A", 50.0, datetime!(2024-01-03 00:00 UTC)),
            expense("3", "missing-cat", 999.0, datetime!(2024-01-04 00:00 UTC)),
        ];

        let view = Dashboard::compute(&categories, &expenses, &[], &DashboardConfig::default(), now);

        assert_eq!(view.breakdown.len(), 1);
        assert_eq!(view.breakdown[0].total, 150.0);
        assert_eq!(view.breakdown[0].share, 100.0);
        assert_eq!(view.orphaned_expenses, 1);
        assert_eq!(view.total_spent, 150.0);
        assert_eq!(view.pocket_money, None);
    }

    #[test]
    fn refresh_is_due_when_the_month_ends() {
        let now = datetime!(2024-01-31 23:00 UTC);
        let view = Dashboard::compute(&[], &[], &[], &DashboardConfig::default(), now);

        let refresh = next_refresh(&view.period, &[], now);

        assert_eq!(refresh, datetime!(2024-02-01 00:00 UTC));
        let next = Dashboard::compute(&[], &[], &[], &DashboardConfig::default(), refresh);
        assert_eq!(next.period.start(), refresh);
    }

    #[test]
    fn refresh_is_due_when_a_budget_starts_or_ends() {
        let now = datetime!(2024-03-10 00:00 UTC);
        let period = DateWindow::month_containing(now, UtcOffset::UTC);
        let starts_later = budget(
            "a",
            100.0,
            datetime!(2024-03-20 00:00 UTC),
            datetime!(2024-03-25 00:00 UTC),
        );
        let ends_sooner = budget(
            "a",
            100.0,
            datetime!(2024-03-01 00:00 UTC),
            datetime!(2024-03-12 00:00 UTC),
        );
        let already_over = budget(
            "a",
            100.0,
            datetime!(2024-02-01 00:00 UTC),
            datetime!(2024-02-28 00:00 UTC),
        );

        assert_eq!(
            next_refresh(&period, &[starts_later.clone(), already_over.clone()], now),
            datetime!(2024-03-20 00:00 UTC)
        );
        let refresh = next_refresh(&period, &[starts_later, ends_sooner.clone(), already_over], now);
        assert!(refresh > datetime!(2024-03-12 00:00 UTC));
        assert!(!ends_sooner.is_active(refresh));
        assert!(refresh < datetime!(2024-03-12 00:00:01 UTC));
    }

    #[tokio::test]
    async fn unsubscribe_discards_a_queued_view() {
        let store = Arc::new(MemoryDocumentStore::new());
        let repository = Repository::new(store, UserId::new("u1"), StoreConfig::default());

        let mut dashboard = Dashboard::watch(&repository, DashboardConfig::default());
        // Let the first view be computed and queued without reading it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        dashboard.unsubscribe();

        assert_eq!(dashboard.next().await, None);
    }

    #[test]
    fn inactive_budgets_are_not_allocated() {
        let now = datetime!(2024-05-10 00:00 UTC);
        let categories = vec![category("a", "Food")];
        let budgets = vec![budget(
            "a",
            400.0,
            datetime!(2024-04-01 00:00 UTC),
            datetime!(2024-04-30 23:59 UTC),
        )];

        let view = Dashboard::compute(
            &categories,
            &[],
            &budgets,
            &config_with_income(1000.0, 0.0),
            now,
        );

        assert_eq!(view.pocket_money.unwrap().pocket, 1000.0);
        assert_eq!(view.budgets.len(), 1);
        assert_eq!(view.budgets[0].status, BudgetStatus::UnderMinimum);
    }

    #[tokio::test]
    async fn watch_recomputes_on_every_change() {
        let store = Arc::new(MemoryDocumentStore::new());
        let config = StoreConfig {
            retry_interval: Duration::from_millis(20),
            poll_interval: Duration::from_millis(20),
        };
        let repository = Repository::new(store, UserId::new("u1"), config);
        let category_id = repository
            .create_category(NewCategory {
                name: CategoryName::new_unchecked("Food"),
                color: Color::from_argb(0xFF00FF00),
            })
            .unwrap();

        let mut dashboard = Dashboard::watch(&repository, DashboardConfig::default());
        let view = dashboard.latest().await.unwrap();
        assert!(view.breakdown.is_empty());

        repository
            .create_expense(NewExpense {
                amount: Amount::new(42.0).unwrap(),
                description: "lunch".to_owned(),
                occurred_at: OffsetDateTime::now_utc(),
                category_id: category_id.clone(),
                photo_ref: None,
            })
            .unwrap();

        let view = dashboard.next().await.unwrap();
        assert_eq!(view.breakdown.len(), 1);
        assert_eq!(view.breakdown[0].total, 42.0);

        // Deleting the category orphans the expense.
        repository.delete_category(&category_id).unwrap();
        let view = dashboard.next().await.unwrap();
        assert!(view.breakdown.is_empty());
        assert_eq!(view.orphaned_expenses, 1);

        dashboard.unsubscribe();
        dashboard.unsubscribe();
        assert!(!dashboard.is_active());
        assert_eq!(dashboard.next().await, None);
    }
}
