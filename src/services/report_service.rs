use crate::entities::{
    PaymentStatus, SubscriptionStatus, TransactionType, agent_entity as agents,
    credit_entity as credits, payment_entity as payments, product_entity as products,
    subscription_entity as subscriptions, transaction_entity as transactions,
    user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminDashboard, AgentDashboard, AgentSales, DailyFinance, DailySales, FinancialReport,
    MonthlySales, PaymentStatusSummary, ProductSales, SalesReport, SubscriptionResponse,
};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use sea_orm::sea_query::Query;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::collections::{BTreeMap, HashMap};

const RECENT_ITEMS: u64 = 5;
const DASHBOARD_MONTHS: u32 = 6;
const EXPIRING_WITHIN_DAYS: i64 = 7;
const DEFAULT_RANGE_DAYS: i64 = 30;

/// Subscriptions that count as sold.
const SOLD: [SubscriptionStatus; 3] = [
    SubscriptionStatus::Active,
    SubscriptionStatus::Suspended,
    SubscriptionStatus::Expired,
];

/// Read-only aggregates over the ledger, payments and subscriptions.
#[derive(Clone)]
pub struct ReportService {
    pool: DatabaseConnection,
}

impl ReportService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn admin_dashboard(&self) -> AppResult<AdminDashboard> {
        let now = Utc::now();

        let total_agents = agents::Entity::find().count(&self.pool).await?;
        let active_users = Query::select()
            .column(users::Column::Id)
            .from(users::Entity)
            .and_where(users::Column::IsActive.eq(true))
            .to_owned();
        let active_agents = agents::Entity::find()
            .filter(agents::Column::UserId.in_subquery(active_users))
            .count(&self.pool)
            .await?;

        let total_products = products::Entity::find().count(&self.pool).await?;
        let active_products = products::Entity::find()
            .filter(products::Column::IsActive.eq(true))
            .count(&self.pool)
            .await?;

        let total_subscriptions = subscriptions::Entity::find().count(&self.pool).await?;
        let active = subscriptions::Entity::find()
            .filter(subscriptions::Column::Status.eq(SubscriptionStatus::Active))
            .all(&self.pool)
            .await?;

        let pending_payments = payments::Entity::find()
            .filter(payments::Column::Status.eq(PaymentStatus::Pending))
            .count(&self.pool)
            .await?;

        let monthly_sales = self.monthly_sales(None, now).await?;

        let recent_subscriptions = subscriptions::Entity::find()
            .order_by_desc(subscriptions::Column::CreatedAt)
            .order_by_desc(subscriptions::Column::Id)
            .limit(RECENT_ITEMS)
            .all(&self.pool)
            .await?;
        let recent_payments = payments::Entity::find()
            .order_by_desc(payments::Column::CreatedAt)
            .order_by_desc(payments::Column::Id)
            .limit(RECENT_ITEMS)
            .all(&self.pool)
            .await?;

        Ok(AdminDashboard {
            total_agents,
            active_agents,
            total_products,
            active_products,
            total_subscriptions,
            active_subscriptions: active.len() as u64,
            pending_payments,
            total_sales: active.iter().map(|s| s.price).sum(),
            monthly_sales,
            recent_subscriptions: responses(recent_subscriptions, now),
            recent_payments: recent_payments.into_iter().map(Into::into).collect(),
        })
    }

    pub async fn agent_dashboard(&self, agent_id: i64) -> AppResult<AgentDashboard> {
        agents::Entity::find_by_id(agent_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Agent {agent_id} not found")))?;
        let now = Utc::now();

        let credit = credits::Entity::find()
            .filter(credits::Column::AgentId.eq(agent_id))
            .one(&self.pool)
            .await?;

        let owned = subscriptions::Entity::find().filter(subscriptions::Column::AgentId.eq(agent_id));
        let total_subscriptions = owned.clone().count(&self.pool).await?;
        let active = owned
            .clone()
            .filter(subscriptions::Column::Status.eq(SubscriptionStatus::Active))
            .order_by_asc(subscriptions::Column::EndDate)
            .all(&self.pool)
            .await?;

        let horizon = now + Duration::days(EXPIRING_WITHIN_DAYS);
        let total_sales = active.iter().map(|s| s.price).sum();
        let active_subscriptions = active.len() as u64;
        let expiring_soon: Vec<_> = active
            .into_iter()
            .filter(|s| s.end_date.is_some_and(|end| end > now && end <= horizon))
            .collect();

        let recent_subscriptions = owned
            .order_by_desc(subscriptions::Column::CreatedAt)
            .order_by_desc(subscriptions::Column::Id)
            .limit(RECENT_ITEMS)
            .all(&self.pool)
            .await?;

        let recent_transactions = match &credit {
            Some(credit) => transactions::Entity::find()
                .filter(transactions::Column::CreditId.eq(credit.id))
                .order_by_desc(transactions::Column::CreatedAt)
                .order_by_desc(transactions::Column::Id)
                .limit(RECENT_ITEMS)
                .all(&self.pool)
                .await?
                .into_iter()
                .map(Into::into)
                .collect(),
            None => Vec::new(),
        };

        Ok(AgentDashboard {
            agent_id,
            balance: credit.map(|c| c.balance).unwrap_or(0),
            total_subscriptions,
            active_subscriptions,
            expiring_soon: responses(expiring_soon, now),
            total_sales,
            monthly_sales: self.monthly_sales(Some(agent_id), now).await?,
            recent_subscriptions: responses(recent_subscriptions, now),
            recent_transactions,
        })
    }

    /// Sold subscriptions created in `[start, end]`.
    pub async fn sales_report(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        agent_id: Option<i64>,
        product_id: Option<i64>,
    ) -> AppResult<SalesReport> {
        let (start, end) = resolve_range(start, end, Utc::now().date_naive())?;
        let (from, until) = day_bounds(start, end);

        let mut query = subscriptions::Entity::find()
            .filter(subscriptions::Column::Status.is_in(SOLD))
            .filter(subscriptions::Column::CreatedAt.gte(from))
            .filter(subscriptions::Column::CreatedAt.lt(until));
        if let Some(agent_id) = agent_id {
            query = query.filter(subscriptions::Column::AgentId.eq(agent_id));
        }
        if let Some(product_id) = product_id {
            query = query.filter(subscriptions::Column::ProductId.eq(product_id));
        }
        let sold = query.all(&self.pool).await?;

        let product_ids: Vec<i64> = sold.iter().map(|s| s.product_id).collect();
        let product_names: HashMap<i64, String> = products::Entity::find()
            .filter(products::Column::Id.is_in(product_ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        let agent_names = self
            .agent_names(sold.iter().map(|s| s.agent_id).collect())
            .await?;

        Ok(build_sales_report(
            start,
            end,
            &sold,
            &product_names,
            &agent_names,
        ))
    }

    pub async fn financial_report(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        agent_id: Option<i64>,
    ) -> AppResult<FinancialReport> {
        let (start, end) = resolve_range(start, end, Utc::now().date_naive())?;
        let (from, until) = day_bounds(start, end);

        let mut tx_query = transactions::Entity::find()
            .filter(transactions::Column::CreatedAt.gte(from))
            .filter(transactions::Column::CreatedAt.lt(until));
        let mut payment_query = payments::Entity::find()
            .filter(payments::Column::CreatedAt.gte(from))
            .filter(payments::Column::CreatedAt.lt(until));

        if let Some(agent_id) = agent_id {
            let agent = agents::Entity::find_by_id(agent_id)
                .one(&self.pool)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Agent {agent_id} not found")))?;
            let credit_ids = Query::select()
                .column(credits::Column::Id)
                .from(credits::Entity)
                .and_where(credits::Column::AgentId.eq(agent_id))
                .to_owned();
            tx_query = tx_query.filter(transactions::Column::CreditId.in_subquery(credit_ids));
            payment_query = payment_query.filter(payments::Column::UserId.eq(agent.user_id));
        }

        let txs = tx_query.all(&self.pool).await?;
        let payments = payment_query.all(&self.pool).await?;

        Ok(build_financial_report(start, end, &txs, &payments))
    }

    async fn monthly_sales(
        &self,
        agent_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<MonthlySales>> {
        let months = last_months(now.date_naive(), DASHBOARD_MONTHS);
        let Some(first) = months.first() else {
            return Ok(Vec::new());
        };

        let mut query = subscriptions::Entity::find()
            .filter(subscriptions::Column::Status.is_in(SOLD))
            .filter(subscriptions::Column::CreatedAt.gte(start_of_day(*first)));
        if let Some(agent_id) = agent_id {
            query = query.filter(subscriptions::Column::AgentId.eq(agent_id));
        }
        let sold = query.all(&self.pool).await?;
        Ok(bucket_by_month(&months, &sold))
    }

    async fn agent_names(&self, agent_ids: Vec<i64>) -> AppResult<HashMap<i64, String>> {
        let agent_rows = agents::Entity::find()
            .filter(agents::Column::Id.is_in(agent_ids))
            .all(&self.pool)
            .await?;
        let user_ids: Vec<i64> = agent_rows.iter().map(|a| a.user_id).collect();
        let users_by_id: HashMap<i64, users::Model> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(agent_rows
            .into_iter()
            .map(|a| {
                let name = users_by_id
                    .get(&a.user_id)
                    .map(display_name)
                    .unwrap_or_else(|| format!("Agent #{}", a.id));
                (a.id, name)
            })
            .collect())
    }
}

fn responses(items: Vec<subscriptions::Model>, now: DateTime<Utc>) -> Vec<SubscriptionResponse> {
    items
        .into_iter()
        .map(|m| SubscriptionResponse::from_model(m, now))
        .collect()
}

fn display_name(user: &users::Model) -> String {
    if let Some(business) = user.business_name.as_deref().filter(|b| !b.is_empty()) {
        return business.to_string();
    }
    let full = user.full_name();
    if full.is_empty() {
        user.username.clone()
    } else {
        full
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Half-open UTC bounds covering the inclusive date range.
fn day_bounds(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    (start_of_day(start), start_of_day(end) + Duration::days(1))
}

fn resolve_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> AppResult<(NaiveDate, NaiveDate)> {
    let end = end.unwrap_or(today);
    let start = start.unwrap_or(end - Duration::days(DEFAULT_RANGE_DAYS));
    if start > end {
        return Err(AppError::ValidationError(
            "start_date must not be after end_date".to_string(),
        ));
    }
    Ok((start, end))
}

/// First days of the last `count` calendar months, oldest first, ending with
/// the month containing `today`.
fn last_months(today: NaiveDate, count: u32) -> Vec<NaiveDate> {
    let Some(current) = today.with_day(1) else {
        return Vec::new();
    };
    (0..count)
        .rev()
        .filter_map(|back| current.checked_sub_months(Months::new(back)))
        .collect()
}

fn bucket_by_month(months: &[NaiveDate], sold: &[subscriptions::Model]) -> Vec<MonthlySales> {
    let mut buckets: BTreeMap<(i32, u32), (i64, i64)> = months
        .iter()
        .map(|m| ((m.year(), m.month()), (0, 0)))
        .collect();
    for s in sold {
        let key = (s.created_at.year(), s.created_at.month());
        if let Some((count, amount)) = buckets.get_mut(&key) {
            *count += 1;
            *amount += s.price;
        }
    }
    buckets
        .into_iter()
        .map(|((year, month), (count, amount))| MonthlySales {
            month: format!("{year:04}-{month:02}"),
            count,
            amount,
        })
        .collect()
}

fn build_sales_report(
    start: NaiveDate,
    end: NaiveDate,
    sold: &[subscriptions::Model],
    product_names: &HashMap<i64, String>,
    agent_names: &HashMap<i64, String>,
) -> SalesReport {
    let mut by_product: BTreeMap<i64, (i64, i64)> = BTreeMap::new();
    let mut by_agent: BTreeMap<i64, (i64, i64)> = BTreeMap::new();
    let mut by_day: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();

    for s in sold {
        for (bucket, key) in [(&mut by_product, s.product_id), (&mut by_agent, s.agent_id)] {
            let entry = bucket.entry(key).or_default();
            entry.0 += 1;
            entry.1 += s.price;
        }
        let day = by_day.entry(s.created_at.date_naive()).or_default();
        day.0 += 1;
        day.1 += s.price;
    }

    SalesReport {
        start_date: start,
        end_date: end,
        total_count: sold.len() as i64,
        total_amount: sold.iter().map(|s| s.price).sum(),
        by_product: by_product
            .into_iter()
            .map(|(product_id, (count, amount))| ProductSales {
                product_id,
                product_name: product_names
                    .get(&product_id)
                    .cloned()
                    .unwrap_or_else(|| format!("Product #{product_id}")),
                count,
                amount,
            })
            .collect(),
        by_agent: by_agent
            .into_iter()
            .map(|(agent_id, (count, amount))| AgentSales {
                agent_id,
                agent_name: agent_names
                    .get(&agent_id)
                    .cloned()
                    .unwrap_or_else(|| format!("Agent #{agent_id}")),
                count,
                amount,
            })
            .collect(),
        by_day: by_day
            .into_iter()
            .map(|(date, (count, amount))| DailySales {
                date,
                count,
                amount,
            })
            .collect(),
    }
}

fn build_financial_report(
    start: NaiveDate,
    end: NaiveDate,
    txs: &[transactions::Model],
    payments: &[payments::Model],
) -> FinancialReport {
    let mut total_deposits = 0;
    let mut total_withdrawals = 0;
    let mut by_day: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();

    for tx in txs {
        let day = by_day.entry(tx.created_at.date_naive()).or_default();
        match tx.transaction_type {
            TransactionType::Deposit => {
                total_deposits += tx.amount;
                day.0 += tx.amount;
            }
            TransactionType::Withdrawal => {
                total_withdrawals += tx.amount.abs();
                day.1 += tx.amount.abs();
            }
        }
    }

    let payments_by_status = [
        PaymentStatus::Pending,
        PaymentStatus::Completed,
        PaymentStatus::Rejected,
    ]
    .into_iter()
    .map(|status| {
        let matching = payments.iter().filter(|p| p.status == status);
        PaymentStatusSummary {
            status,
            count: matching.clone().count() as i64,
            amount: matching.map(|p| p.amount).sum(),
        }
    })
    .collect();

    FinancialReport {
        start_date: start,
        end_date: end,
        total_deposits,
        total_withdrawals,
        net: total_deposits - total_withdrawals,
        payments_by_status,
        by_day: by_day
            .into_iter()
            .map(|(date, (deposits, withdrawals))| DailyFinance {
                date,
                deposits,
                withdrawals,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{DurationType, PaymentMethod};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sub(id: i64, agent_id: i64, product_id: i64, price: i64, day: NaiveDate) -> subscriptions::Model {
        let at = start_of_day(day) + Duration::hours(10);
        subscriptions::Model {
            id,
            product_id,
            agent_id,
            customer_id: 1,
            customer_name: "c".to_string(),
            customer_note: None,
            status: SubscriptionStatus::Active,
            price,
            is_test: false,
            duration_type: DurationType::Months,
            duration_value: 1,
            test_duration: 0,
            start_date: Some(at),
            end_date: Some(at + Duration::days(30)),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_resolve_range() {
        let today = date(2025, 3, 31);
        assert_eq!(
            resolve_range(None, None, today).unwrap(),
            (date(2025, 3, 1), today)
        );
        assert!(matches!(
            resolve_range(Some(date(2025, 4, 1)), Some(date(2025, 3, 1)), today),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_last_months_crosses_year() {
        let months = last_months(date(2025, 2, 14), 6);
        assert_eq!(months.len(), 6);
        assert_eq!(months[0], date(2024, 9, 1));
        assert_eq!(months[5], date(2025, 2, 1));
    }

    #[test]
    fn test_bucket_by_month_fills_gaps() {
        let months = last_months(date(2025, 3, 10), 3);
        let sold = vec![
            sub(1, 1, 1, 100, date(2025, 1, 5)),
            sub(2, 1, 1, 50, date(2025, 3, 2)),
            sub(3, 1, 1, 70, date(2024, 12, 31)),
        ];
        let buckets = bucket_by_month(&months, &sold);
        assert_eq!(
            buckets,
            vec![
                MonthlySales { month: "2025-01".to_string(), count: 1, amount: 100 },
                MonthlySales { month: "2025-02".to_string(), count: 0, amount: 0 },
                MonthlySales { month: "2025-03".to_string(), count: 1, amount: 50 },
            ]
        );
    }

    #[test]
    fn test_build_sales_report_breakdowns() {
        let sold = vec![
            sub(1, 10, 1, 100, date(2025, 3, 1)),
            sub(2, 10, 2, 40, date(2025, 3, 1)),
            sub(3, 20, 1, 100, date(2025, 3, 2)),
        ];
        let products = HashMap::from([(1, "VPN".to_string())]);
        let agents = HashMap::from([(10, "Shop".to_string()), (20, "Kiosk".to_string())]);

        let report = build_sales_report(date(2025, 3, 1), date(2025, 3, 2), &sold, &products, &agents);
        assert_eq!(report.total_count, 3);
        assert_eq!(report.total_amount, 240);
        assert_eq!(report.by_product[0].amount, 200);
        assert_eq!(report.by_product[1].product_name, "Product #2");
        assert_eq!(report.by_agent[0].agent_name, "Shop");
        assert_eq!(report.by_agent[0].count, 2);
        assert_eq!(report.by_day.len(), 2);
        assert_eq!(report.by_day[1].amount, 100);
    }

    #[test]
    fn test_build_financial_report() {
        let at = start_of_day(date(2025, 3, 1));
        let tx = |id, kind, amount| transactions::Model {
            id,
            credit_id: 1,
            transaction_type: kind,
            amount,
            balance_after: 0,
            description: None,
            payment_id: None,
            subscription_id: None,
            created_by: None,
            created_at: at,
        };
        let payment = |id, status, amount| payments::Model {
            id,
            user_id: 1,
            method: PaymentMethod::CardToCard,
            amount,
            status,
            description: None,
            receipt_image: None,
            admin_note: None,
            approved_by: None,
            approved_at: None,
            created_at: at,
            updated_at: at,
        };

        let report = build_financial_report(
            date(2025, 3, 1),
            date(2025, 3, 1),
            &[
                tx(1, TransactionType::Deposit, 500),
                tx(2, TransactionType::Withdrawal, -120),
            ],
            &[
                payment(1, PaymentStatus::Completed, 500),
                payment(2, PaymentStatus::Pending, 80),
            ],
        );

        assert_eq!(report.total_deposits, 500);
        assert_eq!(report.total_withdrawals, 120);
        assert_eq!(report.net, 380);
        assert_eq!(report.by_day, vec![DailyFinance { date: date(2025, 3, 1), deposits: 500, withdrawals: 120 }]);
        let completed = &report.payments_by_status[1];
        assert_eq!(completed.status, PaymentStatus::Completed);
        assert_eq!((completed.count, completed.amount), (1, 500));
        assert_eq!(report.payments_by_status[2].count, 0);
    }
}
