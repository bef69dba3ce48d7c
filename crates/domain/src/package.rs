use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::package::PackageRepository;
use crate::util::now_ms;

/// Service tier offered on the pricing page. `name` is unique.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub features: Vec<String>,
    pub work_days: i32,
    pub revisions: i32,
    pub is_active: bool,
    pub display_order: i32,
    pub badge: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at_ms: i64,
    #[serde(rename = "updatedAt")]
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct PackageUpdate {
    pub name: String,
    pub price: i64,
    pub features: Vec<String>,
    pub work_days: i32,
    pub revisions: i32,
    pub badge: Option<String>,
}

#[derive(Clone)]
pub struct PackageService {
    repository: Arc<dyn PackageRepository>,
}

impl PackageService {
    pub fn new(repository: Arc<dyn PackageRepository>) -> Self {
        Self { repository }
    }

    /// Packages in display order.
    pub async fn list(&self) -> DomainResult<Vec<Package>> {
        self.repository.list().await
    }

    pub async fn update(&self, package_id: &str, update: PackageUpdate) -> DomainResult<Package> {
        let update = validate_package_update(update)?;
        let mut package = self
            .repository
            .get(package_id)
            .await?
            .ok_or(DomainError::NotFound)?;
        package.name = update.name;
        package.price = update.price;
        package.features = update.features;
        package.work_days = update.work_days;
        package.revisions = update.revisions;
        package.badge = update.badge;
        package.updated_at_ms = now_ms();
        self.repository.update(&package).await
    }
}

fn validate_package_update(mut update: PackageUpdate) -> DomainResult<PackageUpdate> {
    update.name = update.name.trim().to_string();
    if update.name.is_empty() {
        return Err(DomainError::Validation("name is required".into()));
    }
    if update.price < 0 {
        return Err(DomainError::Validation("price must be non-negative".into()));
    }
    if update.work_days < 0 || update.revisions < 0 {
        return Err(DomainError::Validation(
            "workDays and revisions must be non-negative".into(),
        ));
    }
    update.badge = update
        .badge
        .map(|badge| badge.trim().to_string())
        .filter(|badge| !badge.is_empty());
    Ok(update)
}
