use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result, bail};
use db::{DBService, models::customer::CustomerType};
use fake::{
    Fake,
    faker::{internet::en::SafeEmail, name::en::Name},
};
use rand::{Rng, seq::SliceRandom};
use services::services::{
    config::AppConfig,
    customers::{CreateCustomer, CustomerDto, PromoteCustomerToVip, SqliteScopeFactory},
    mediator::{Dispatcher, Outcome},
    notification::LogNotifier,
    pipeline::build_dispatcher,
};

const DEFAULT_SEED_PATH: &str = "dev_assets_seed/customers.db";
const CUSTOMER_COUNT: usize = 25;
const VIP_COUNT: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    let db_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SEED_PATH));
    reset_database_file(&db_path)?;

    let db = DBService::new(&format!("sqlite://{}", db_path.display()))
        .await
        .context("Failed to open seed database")?;
    let config = AppConfig::default();
    let dispatcher = build_dispatcher(
        &config,
        Arc::new(SqliteScopeFactory::new(db.clone())),
        Arc::new(LogNotifier),
    )?;

    let customers = create_customers(&dispatcher, CUSTOMER_COUNT).await?;
    let vips = promote_some(&dispatcher, &customers, VIP_COUNT).await?;

    println!("Seed database created at {}", db_path.display());
    println!("Customers: {}", customers.len());
    println!("VIP: {}", vips);

    Ok(())
}

fn reset_database_file(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    if db_path.exists() {
        fs::remove_file(db_path)
            .with_context(|| format!("Failed to remove {}", db_path.display()))?;
    }

    Ok(())
}

/// Random E.164-style number that passes the phone rule.
fn fake_phone(rng: &mut impl Rng) -> String {
    format!("+1{}", rng.gen_range(2_000_000_000u64..10_000_000_000))
}

async fn create_customers(dispatcher: &Dispatcher, count: usize) -> Result<Vec<CustomerDto>> {
    let mut rng = rand::thread_rng();
    let mut customers = Vec::with_capacity(count);

    for index in 0..count {
        let email: String = SafeEmail().fake();
        // Suffix keeps generated addresses unique.
        let email = match email.split_once('@') {
            Some((local, domain)) => format!("{local}{index}@{domain}"),
            None => format!("customer{index}@example.com"),
        };
        let phone = rng.gen_bool(0.7).then(|| fake_phone(&mut rng));

        let request = CreateCustomer {
            name: Name().fake(),
            email,
            phone,
        };
        match dispatcher.dispatch(request).await? {
            Outcome::Success(customer) => customers.push(customer),
            Outcome::Failure(failure) => bail!("Seed customer rejected: {}", failure),
        }
    }

    Ok(customers)
}

async fn promote_some(
    dispatcher: &Dispatcher,
    customers: &[CustomerDto],
    count: usize,
) -> Result<usize> {
    let mut rng = rand::thread_rng();
    let mut promoted = 0;
    for customer in customers.choose_multiple(&mut rng, count) {
        if customer.customer_type == CustomerType::Vip {
            continue;
        }
        match dispatcher
            .dispatch(PromoteCustomerToVip { id: customer.id })
            .await?
        {
            Outcome::Success(_) => promoted += 1,
            Outcome::Failure(failure) => bail!("Promotion rejected: {}", failure),
        }
    }
    Ok(promoted)
}
