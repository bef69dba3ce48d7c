use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::member::MemberRepository;
use crate::util::now_ms;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberGrade {
    Standard,
    Deluxe,
    Premium,
}

impl MemberGrade {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "STANDARD" => Some(MemberGrade::Standard),
            "DELUXE" => Some(MemberGrade::Deluxe),
            "PREMIUM" => Some(MemberGrade::Premium),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberGrade::Standard => "STANDARD",
            MemberGrade::Deluxe => "DELUXE",
            MemberGrade::Premium => "PREMIUM",
        }
    }
}

/// Customer record. Soft-deactivated via `is_active`, never hard-deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub grade: MemberGrade,
    pub messenger_id: Option<String>,
    pub memo: Option<String>,
    pub is_active: bool,
    #[serde(rename = "createdAt")]
    pub created_at_ms: i64,
    #[serde(rename = "updatedAt")]
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct MemberUpdate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub grade: MemberGrade,
    pub messenger_id: Option<String>,
    pub memo: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct MemberListQuery {
    /// Case-insensitive substring match on name or email.
    pub search: Option<String>,
    pub grade: Option<MemberGrade>,
    pub page: usize,
    pub limit: usize,
}

#[derive(Clone, Debug)]
pub struct MemberPage {
    pub members: Vec<Member>,
    pub total: u64,
}

#[derive(Clone)]
pub struct MemberService {
    repository: Arc<dyn MemberRepository>,
}

impl MemberService {
    pub fn new(repository: Arc<dyn MemberRepository>) -> Self {
        Self { repository }
    }

    pub async fn list(&self, mut query: MemberListQuery) -> DomainResult<MemberPage> {
        query.page = query.page.max(1);
        query.limit = if query.limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            query.limit.min(MAX_PAGE_SIZE)
        };
        query.search = query
            .search
            .map(|term| term.trim().to_string())
            .filter(|term| !term.is_empty());
        self.repository.list(&query).await
    }

    pub async fn get(&self, member_id: &str) -> DomainResult<Member> {
        self.repository
            .get(member_id)
            .await?
            .ok_or(DomainError::NotFound)
    }

    pub async fn update(&self, member_id: &str, update: MemberUpdate) -> DomainResult<Member> {
        let update = validate_member_update(update)?;
        let mut member = self.get(member_id).await?;
        member.name = update.name;
        member.email = update.email;
        member.phone = update.phone;
        member.grade = update.grade;
        member.messenger_id = update.messenger_id;
        member.memo = update.memo;
        member.updated_at_ms = now_ms();
        self.repository.update(&member).await
    }
}

fn validate_member_update(mut update: MemberUpdate) -> DomainResult<MemberUpdate> {
    update.name = update.name.trim().to_string();
    update.email = update.email.trim().to_string();
    if update.name.is_empty() {
        return Err(DomainError::Validation("name is required".into()));
    }
    if update.email.is_empty() || !update.email.contains('@') {
        return Err(DomainError::Validation("email is invalid".into()));
    }
    Ok(update)
}
