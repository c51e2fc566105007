use crate::entities::{
    UserRole, agent_entity as agents, agent_group_entity as agent_groups,
    agent_group_member_entity as members, credit_entity as credits, enum_expr,
    user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AgentGroupRequest, AgentGroupResponse, AgentResponse, AgentScope, CurrentUser,
    PaginatedResponse, PaginationParams,
};
use crate::services::credit_service::ensure_credit;
use chrono::Utc;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;

#[derive(Clone)]
pub struct AgentService {
    pool: DatabaseConnection,
}

impl AgentService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Admins see every agent; agents only themselves.
    pub async fn resolve_scope(&self, current: &CurrentUser) -> AppResult<AgentScope> {
        if current.is_admin() {
            return Ok(AgentScope::All);
        }
        let agent = agents::Entity::find()
            .filter(agents::Column::UserId.eq(current.user_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("User {} has no agent record", current.user_id))
            })?;
        Ok(AgentScope::Agent(agent.id))
    }

    /// Creates the agent with its credit and memberships, promoting the user to AGENT.
    pub async fn create(&self, user_id: i64, group_ids: Vec<i64>) -> AppResult<AgentResponse> {
        let txn = self.pool.begin().await?;

        let user = users::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

        let agent = create_agent_record(&txn, user_id).await?;
        replace_memberships(&txn, agent.id, &group_ids).await?;

        if user.role != UserRole::Agent {
            users::Entity::update_many()
                .col_expr(users::Column::Role, enum_expr(UserRole::Agent))
                .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(users::Column::Id.eq(user_id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        log::info!("Agent {} created for user {user_id}", agent.id);
        self.get(agent.id).await
    }

    /// Replaces the agent's group memberships.
    pub async fn update(&self, agent_id: i64, group_ids: Vec<i64>) -> AppResult<AgentResponse> {
        let txn = self.pool.begin().await?;
        find_agent(&txn, agent_id).await?;
        replace_memberships(&txn, agent_id, &group_ids).await?;
        txn.commit().await?;
        self.get(agent_id).await
    }

    pub async fn get(&self, agent_id: i64) -> AppResult<AgentResponse> {
        let agent = find_agent(&self.pool, agent_id).await?;
        self.hydrate(vec![agent])
            .await?
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("Agent {agent_id} not found")))
    }

    pub async fn get_by_user(&self, user_id: i64) -> AppResult<AgentResponse> {
        let agent = agents::Entity::find()
            .filter(agents::Column::UserId.eq(user_id))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} has no agent record")))?;
        self.get(agent.id).await
    }

    pub async fn list(
        &self,
        search: Option<&str>,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<AgentResponse>> {
        let mut query = agents::Entity::find();
        if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
            let matching_users = Query::select()
                .column(users::Column::Id)
                .from(users::Entity)
                .cond_where(
                    Condition::any()
                        .add(users::Column::FirstName.contains(term))
                        .add(users::Column::LastName.contains(term))
                        .add(users::Column::Mobile.contains(term))
                        .add(users::Column::Email.contains(term))
                        .add(users::Column::BusinessName.contains(term)),
                )
                .to_owned();
            query = query.filter(agents::Column::UserId.in_subquery(matching_users));
        }

        let total = query.clone().count(&self.pool).await?;
        let items = query
            .order_by_desc(agents::Column::CreatedAt)
            .order_by_desc(agents::Column::Id)
            .offset(params.get_offset())
            .limit(params.get_limit())
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::new(self.hydrate(items).await?, params, total))
    }

    pub async fn activate(&self, agent_id: i64) -> AppResult<AgentResponse> {
        self.set_user_active(agent_id, true).await
    }

    pub async fn deactivate(&self, agent_id: i64) -> AppResult<AgentResponse> {
        self.set_user_active(agent_id, false).await
    }

    async fn set_user_active(&self, agent_id: i64, is_active: bool) -> AppResult<AgentResponse> {
        let agent = find_agent(&self.pool, agent_id).await?;
        users::Entity::update_many()
            .col_expr(users::Column::IsActive, Expr::value(is_active))
            .col_expr(users::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(users::Column::Id.eq(agent.user_id))
            .exec(&self.pool)
            .await?;
        self.get(agent_id).await
    }

    /// Loads users, balances and groups for a page of agents in batch.
    async fn hydrate(&self, items: Vec<agents::Model>) -> AppResult<Vec<AgentResponse>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let agent_ids: Vec<i64> = items.iter().map(|a| a.id).collect();
        let user_ids: Vec<i64> = items.iter().map(|a| a.user_id).collect();

        let mut users_by_id: HashMap<i64, users::Model> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let balances: HashMap<i64, i64> = credits::Entity::find()
            .filter(credits::Column::AgentId.is_in(agent_ids.clone()))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|c| (c.agent_id, c.balance))
            .collect();

        let memberships = members::Entity::find()
            .filter(members::Column::AgentId.is_in(agent_ids))
            .all(&self.pool)
            .await?;
        let group_ids: Vec<i64> = memberships.iter().map(|m| m.group_id).collect();
        let groups: HashMap<i64, agent_groups::Model> = agent_groups::Entity::find()
            .filter(agent_groups::Column::Id.is_in(group_ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|g| (g.id, g))
            .collect();

        let mut groups_by_agent: HashMap<i64, Vec<AgentGroupResponse>> = HashMap::new();
        for m in memberships {
            if let Some(g) = groups.get(&m.group_id) {
                groups_by_agent
                    .entry(m.agent_id)
                    .or_default()
                    .push(g.clone().into());
            }
        }

        let mut result = Vec::with_capacity(items.len());
        for agent in items {
            let user = users_by_id.remove(&agent.user_id).ok_or_else(|| {
                AppError::InternalError(format!("Agent {} references a missing user", agent.id))
            })?;
            let mut groups = groups_by_agent.remove(&agent.id).unwrap_or_default();
            groups.sort_by_key(|g| g.id);
            result.push(AgentResponse {
                id: agent.id,
                user: user.into(),
                balance: balances.get(&agent.id).copied().unwrap_or(0),
                groups,
                created_at: agent.created_at,
            });
        }
        Ok(result)
    }

    // ---- agent groups ----

    pub async fn create_group(&self, request: AgentGroupRequest) -> AppResult<AgentGroupResponse> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::ValidationError("Name is required".to_string()));
        }
        let now = Utc::now();
        let group = agent_groups::ActiveModel {
            name: Set(name),
            description: Set(request.description),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;
        Ok(group.into())
    }

    pub async fn update_group(
        &self,
        id: i64,
        request: AgentGroupRequest,
    ) -> AppResult<AgentGroupResponse> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::ValidationError("Name is required".to_string()));
        }
        let mut am = find_group(&self.pool, id).await?.into_active_model();
        am.name = Set(name);
        am.description = Set(request.description);
        am.updated_at = Set(Utc::now());
        Ok(am.update(&self.pool).await?.into())
    }

    pub async fn get_group(&self, id: i64) -> AppResult<AgentGroupResponse> {
        Ok(find_group(&self.pool, id).await?.into())
    }

    pub async fn list_groups(&self) -> AppResult<Vec<AgentGroupResponse>> {
        let groups = agent_groups::Entity::find()
            .order_by_asc(agent_groups::Column::Name)
            .all(&self.pool)
            .await?;
        Ok(groups.into_iter().map(Into::into).collect())
    }

    pub async fn add_member(&self, group_id: i64, agent_id: i64) -> AppResult<()> {
        find_group(&self.pool, group_id).await?;
        find_agent(&self.pool, agent_id).await?;

        let existing = members::Entity::find_by_id((agent_id, group_id))
            .one(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::AlreadyExists(format!(
                "Agent {agent_id} is already in group {group_id}"
            )));
        }

        members::ActiveModel {
            agent_id: Set(agent_id),
            group_id: Set(group_id),
        }
        .insert(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_member(&self, group_id: i64, agent_id: i64) -> AppResult<()> {
        let res = members::Entity::delete_many()
            .filter(members::Column::AgentId.eq(agent_id))
            .filter(members::Column::GroupId.eq(group_id))
            .exec(&self.pool)
            .await?;
        if res.rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "Agent {agent_id} is not in group {group_id}"
            )));
        }
        Ok(())
    }
}

/// Inserts the agent row and its empty credit. Fails with `AlreadyExists`
/// when the user already has an agent.
pub(crate) async fn create_agent_record<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
) -> AppResult<agents::Model> {
    let existing = agents::Entity::find()
        .filter(agents::Column::UserId.eq(user_id))
        .one(conn)
        .await?;
    if existing.is_some() {
        return Err(AppError::AlreadyExists(format!(
            "User {user_id} already has an agent record"
        )));
    }

    let now = Utc::now();
    let agent = agents::ActiveModel {
        user_id: Set(user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    ensure_credit(conn, agent.id).await?;
    Ok(agent)
}

async fn replace_memberships<C: ConnectionTrait>(
    conn: &C,
    agent_id: i64,
    group_ids: &[i64],
) -> AppResult<()> {
    let mut wanted = group_ids.to_vec();
    wanted.sort_unstable();
    wanted.dedup();

    for group_id in &wanted {
        find_group(conn, *group_id).await?;
    }

    members::Entity::delete_many()
        .filter(members::Column::AgentId.eq(agent_id))
        .exec(conn)
        .await?;

    if wanted.is_empty() {
        return Ok(());
    }
    members::Entity::insert_many(wanted.into_iter().map(|group_id| members::ActiveModel {
        agent_id: Set(agent_id),
        group_id: Set(group_id),
    }))
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

async fn find_agent<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<agents::Model> {
    agents::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Agent {id} not found")))
}

async fn find_group<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<agent_groups::Model> {
    agent_groups::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Agent group {id} not found")))
}
