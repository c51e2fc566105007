use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{
    DurationType, NotificationType, PaymentMethod, PaymentStatus, ProductType,
    SubscriptionStatus, TransactionType, UserRole,
};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login,
        handlers::auth::request_otp,
        handlers::auth::verify_otp,
        handlers::auth::refresh,
        handlers::user::get_me,
        handlers::user::list_users,
        handlers::user::create_user,
        handlers::user::get_user,
        handlers::agent::list_agents,
        handlers::agent::create_agent,
        handlers::agent::get_agent,
        handlers::agent::update_agent,
        handlers::agent::activate_agent,
        handlers::agent::deactivate_agent,
        handlers::agent::list_agent_groups,
        handlers::agent::create_agent_group,
        handlers::agent::get_agent_group,
        handlers::agent::update_agent_group,
        handlers::agent::add_group_member,
        handlers::agent::remove_group_member,
        handlers::credit::list_credits,
        handlers::credit::get_credit,
        handlers::credit::audit_credit,
        handlers::credit::list_transactions,
        handlers::credit::add_transaction,
        handlers::payment::list_payments,
        handlers::payment::create_payment,
        handlers::payment::get_payment,
        handlers::payment::approve_payment,
        handlers::payment::reject_payment,
        handlers::product::list_products,
        handlers::product::create_product,
        handlers::product::get_product,
        handlers::product::update_product,
        handlers::product::activate_product,
        handlers::product::deactivate_product,
        handlers::product::list_product_groups,
        handlers::product::create_product_group,
        handlers::product::get_product_group,
        handlers::product::update_product_group,
        handlers::subscription::list_subscriptions,
        handlers::subscription::create_subscription,
        handlers::subscription::get_subscription,
        handlers::subscription::update_subscription,
        handlers::subscription::activate_subscription,
        handlers::subscription::suspend_subscription,
        handlers::notification::list_notifications,
        handlers::notification::mark_as_read,
        handlers::notification::mark_all_as_read,
        handlers::report::dashboard,
        handlers::report::sales_report,
        handlers::report::financial_report,
        handlers::setting::list_settings,
        handlers::setting::create_setting,
        handlers::setting::get_setting,
        handlers::setting::update_setting,
        handlers::setting::get_settings_by_category,
        handlers::setting::bulk_update_settings,
    ),
    components(
        schemas(
            UserRole,
            TransactionType,
            PaymentMethod,
            PaymentStatus,
            ProductType,
            DurationType,
            SubscriptionStatus,
            NotificationType,
            PaginationInfo,
            LoginRequest,
            OtpRequest,
            OtpRequestResponse,
            OtpVerifyRequest,
            RefreshTokenRequest,
            AuthResponse,
            AccessTokenResponse,
            CreateUserRequest,
            UserQuery,
            UserResponse,
            CreateAgentRequest,
            UpdateAgentRequest,
            AgentQuery,
            AgentResponse,
            AgentGroupRequest,
            AgentGroupMemberRequest,
            AgentGroupResponse,
            CreditResponse,
            TransactionResponse,
            AddTransactionRequest,
            BalanceAudit,
            TransactionQuery,
            CreatePaymentForm,
            ReviewPaymentRequest,
            PaymentQuery,
            PaymentResponse,
            ProductGroupRequest,
            ProductGroupResponse,
            CreateProductRequest,
            UpdateProductRequest,
            ProductQuery,
            ProductResponse,
            CreateSubscriptionRequest,
            UpdateSubscriptionRequest,
            SubscriptionQuery,
            SubscriptionResponse,
            NotificationQuery,
            NotificationResponse,
            MarkAllReadResponse,
            ReportQuery,
            MonthlySales,
            AdminDashboard,
            AgentDashboard,
            Dashboard,
            ProductSales,
            AgentSales,
            DailySales,
            SalesReport,
            PaymentStatusSummary,
            DailyFinance,
            FinancialReport,
            CreateSettingRequest,
            UpdateSettingRequest,
            BulkUpdateSettingsRequest,
            BulkUpdateResponse,
            SettingResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Password and OTP login"),
        (name = "user", description = "User accounts"),
        (name = "agent", description = "Agents and agent groups"),
        (name = "credit", description = "Agent balances and ledger"),
        (name = "payment", description = "Top-up payments and review"),
        (name = "product", description = "Products and product groups"),
        (name = "subscription", description = "Subscription sales and lifecycle"),
        (name = "notification", description = "In-app notifications"),
        (name = "report", description = "Dashboards and reports"),
        (name = "setting", description = "Panel settings"),
    ),
    info(
        title = "Vesta Backend API",
        version = "0.1.0",
        description = "Reseller credit ledger and subscription sales API"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
