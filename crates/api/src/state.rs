use std::sync::Arc;

use backoffice_domain::chat::ChatService;
use backoffice_domain::cost::CostService;
use backoffice_domain::dashboard::DashboardService;
use backoffice_domain::member::MemberService;
use backoffice_domain::package::PackageService;
use backoffice_domain::payment::PaymentService;
use backoffice_domain::ports::admin::AdminRepository;
use backoffice_domain::ports::chat::ChatRepository;
use backoffice_domain::ports::cost::CostRepository;
use backoffice_domain::ports::member::MemberRepository;
use backoffice_domain::ports::package::PackageRepository;
use backoffice_domain::ports::payment::PaymentRepository;
use backoffice_domain::ports::review::ReviewRepository;
use backoffice_domain::review::ReviewService;
use backoffice_infra::auth::AuthService;
use backoffice_infra::config::AppConfig;
use backoffice_infra::db::{self, DbConfig};
use backoffice_infra::repositories::memory::{
    InMemoryAdminRepository, InMemoryChatRepository, InMemoryCostRepository,
    InMemoryMemberRepository, InMemoryPackageRepository, InMemoryPaymentRepository,
    InMemoryReviewRepository,
};
use backoffice_infra::repositories::surreal::{
    SurrealAdminRepository, SurrealChatRepository, SurrealCostRepository,
    SurrealMemberRepository, SurrealPackageRepository, SurrealPaymentRepository,
    SurrealReviewRepository,
};

use crate::realtime::ChatRealtime;

/// Repository handles shared by the services; one set per process.
#[derive(Clone)]
pub struct Repositories {
    pub admin: Arc<dyn AdminRepository>,
    pub member: Arc<dyn MemberRepository>,
    pub payment: Arc<dyn PaymentRepository>,
    pub review: Arc<dyn ReviewRepository>,
    pub cost: Arc<dyn CostRepository>,
    pub package: Arc<dyn PackageRepository>,
    pub chat: Arc<dyn ChatRepository>,
}

/// Concrete in-memory backend, kept around so tests can seed rows directly.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    pub admins: Arc<InMemoryAdminRepository>,
    pub members: Arc<InMemoryMemberRepository>,
    pub payments: Arc<InMemoryPaymentRepository>,
    pub reviews: Arc<InMemoryReviewRepository>,
    pub costs: Arc<InMemoryCostRepository>,
    pub packages: Arc<InMemoryPackageRepository>,
    pub chat: Arc<InMemoryChatRepository>,
}

impl MemoryBackend {
    pub fn repositories(&self) -> Repositories {
        Repositories {
            admin: self.admins.clone(),
            member: self.members.clone(),
            payment: self.payments.clone(),
            review: self.reviews.clone(),
            cost: self.costs.clone(),
            package: self.packages.clone(),
            chat: self.chat.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub repos: Repositories,
    pub auth: AuthService,
    pub members: MemberService,
    pub payments: PaymentService,
    pub reviews: ReviewService,
    pub costs: CostService,
    pub packages: PackageService,
    pub chat: ChatService,
    pub dashboard: DashboardService,
    pub realtime: ChatRealtime,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let repos = match config.data_backend.as_str() {
            "surrealdb" => {
                let db_config = DbConfig::from_app_config(&config);
                let client = db::connect(&db_config).await?;
                Repositories {
                    admin: Arc::new(SurrealAdminRepository::with_client(client.clone())),
                    member: Arc::new(SurrealMemberRepository::with_client(client.clone())),
                    payment: Arc::new(SurrealPaymentRepository::with_client(client.clone())),
                    review: Arc::new(SurrealReviewRepository::with_client(client.clone())),
                    cost: Arc::new(SurrealCostRepository::with_client(client.clone())),
                    package: Arc::new(SurrealPackageRepository::with_client(client.clone())),
                    chat: Arc::new(SurrealChatRepository::with_client(client)),
                }
            }
            _ => MemoryBackend::default().repositories(),
        };
        Ok(Self::from_repositories(config, repos))
    }

    pub fn with_memory_backend(config: AppConfig, backend: &MemoryBackend) -> Self {
        Self::from_repositories(config, backend.repositories())
    }

    fn from_repositories(config: AppConfig, repos: Repositories) -> Self {
        let auth = AuthService::new(
            repos.admin.clone(),
            config.jwt_secret.clone(),
            config.token_ttl_days,
        );
        let dashboard = DashboardService::new(
            repos.member.clone(),
            repos.payment.clone(),
            repos.review.clone(),
            repos.chat.clone(),
        );
        Self {
            auth,
            members: MemberService::new(repos.member.clone()),
            payments: PaymentService::new(repos.payment.clone()),
            reviews: ReviewService::new(repos.review.clone()),
            costs: CostService::new(repos.cost.clone()),
            packages: PackageService::new(repos.package.clone()),
            chat: ChatService::new(repos.chat.clone()),
            dashboard,
            realtime: ChatRealtime::new(),
            repos,
            config,
        }
    }
}
