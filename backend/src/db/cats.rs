use crate::constants::DEFAULT_LIST_LIMIT;
use crate::error::ApiError;
use crate::models::{Cat, CatPayload, CatRace, Sex};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgConnection;
use std::str::FromStr;
use uuid::Uuid;

const CAT_COLUMNS: &str = "id, user_id, name, race, sex, age_in_month, description, image_urls, \
                           has_matched, created_at, deleted_at";

/// Loosely-typed listing parameters, straight off the query string. A value
/// that fails to parse drops its filter instead of failing the request.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatFilter {
    pub id: Option<String>,
    pub owned: Option<String>,
    pub race: Option<String>,
    pub sex: Option<String>,
    pub has_matched: Option<String>,
    pub age_in_month: Option<String>,
    pub search: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// A value bound positionally into a listing query.
#[derive(Debug, Clone, PartialEq)]
pub enum Bind {
    Uuid(Uuid),
    Text(String),
    Bool(bool),
    Int(i64),
}

/// Assembled listing query. Each pushed clause supplies its own `$?`
/// placeholder, numbered at append time, so the bind list can never fall out
/// of step with the SQL text.
#[derive(Debug)]
pub struct ListQuery {
    sql: String,
    binds: Vec<Bind>,
}

impl ListQuery {
    fn new(base: &str) -> Self {
        Self {
            sql: base.to_string(),
            binds: Vec::new(),
        }
    }

    fn push(&mut self, clause: &str, bind: Bind) {
        let placeholder = format!("${}", self.binds.len() + 1);
        self.sql.push_str(&clause.replace("$?", &placeholder));
        self.binds.push(bind);
    }

    fn push_raw(&mut self, fragment: &str) {
        self.sql.push_str(fragment);
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &[Bind] {
        &self.binds
    }
}

fn parse_boolish(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgeOp {
    Gt,
    Lt,
    Eq,
}

impl AgeOp {
    fn as_str(&self) -> &'static str {
        match self {
            AgeOp::Gt => ">",
            AgeOp::Lt => "<",
            AgeOp::Eq => "=",
        }
    }
}

/// `>N`, `<N` or `=N` where N is a positive integer. Anything else means no
/// age filter.
fn parse_age_filter(value: &str) -> Option<(AgeOp, i64)> {
    let op = match value.chars().next()? {
        '>' => AgeOp::Gt,
        '<' => AgeOp::Lt,
        '=' => AgeOp::Eq,
        _ => return None,
    };
    let age = value[1..].parse::<i64>().ok().filter(|age| *age > 0)?;
    Some((op, age))
}

/// Clause order is fixed: owned, id, race, sex, hasMatched, age, search.
/// Binds are appended in the same order; `LIMIT`/`OFFSET` bind last.
pub fn build_list_query(filter: &CatFilter, caller_id: Uuid) -> ListQuery {
    let mut query = ListQuery::new(&format!(
        "SELECT {CAT_COLUMNS} FROM cats WHERE deleted_at IS NULL"
    ));

    if let Some(owned) = filter.owned.as_deref().and_then(parse_boolish) {
        if owned {
            query.push(" AND user_id = $?", Bind::Uuid(caller_id));
        } else {
            query.push(" AND user_id != $?", Bind::Uuid(caller_id));
        }
    }

    if let Some(id) = filter
        .id
        .as_deref()
        .and_then(|raw| Uuid::parse_str(raw).ok())
    {
        query.push(" AND id = $?", Bind::Uuid(id));
    }

    if let Some(race) = filter
        .race
        .as_deref()
        .and_then(|raw| CatRace::from_str(raw).ok())
    {
        query.push(" AND race = $?", Bind::Text(race.as_str().to_string()));
    }

    if let Some(sex) = filter
        .sex
        .as_deref()
        .and_then(|raw| Sex::from_str(raw).ok())
    {
        query.push(" AND sex = $?", Bind::Text(sex.as_str().to_string()));
    }

    if let Some(has_matched) = filter.has_matched.as_deref().and_then(parse_boolish) {
        query.push(" AND has_matched = $?", Bind::Bool(has_matched));
    }

    if let Some((op, age)) = filter.age_in_month.as_deref().and_then(parse_age_filter) {
        query.push(
            &format!(" AND age_in_month {} $?", op.as_str()),
            Bind::Int(age),
        );
    }

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        query.push(" AND name ILIKE $?", Bind::Text(format!("%{}%", search)));
    }

    query.push_raw(" ORDER BY created_at DESC");

    let limit = filter
        .limit
        .as_deref()
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|limit| *limit >= 0)
        .unwrap_or(DEFAULT_LIST_LIMIT);
    let offset = filter
        .offset
        .as_deref()
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|offset| *offset >= 0)
        .unwrap_or(0);

    query.push(" LIMIT $?", Bind::Int(limit));
    query.push(" OFFSET $?", Bind::Int(offset));

    query
}

pub async fn list_cats(
    conn: &mut PgConnection,
    filter: &CatFilter,
    caller_id: Uuid,
) -> Result<Vec<Cat>, ApiError> {
    let query = build_list_query(filter, caller_id);

    let mut q = sqlx::query_as::<_, Cat>(query.sql());
    for bind in query.binds() {
        q = match bind {
            Bind::Uuid(v) => q.bind(*v),
            Bind::Text(v) => q.bind(v.clone()),
            Bind::Bool(v) => q.bind(*v),
            Bind::Int(v) => q.bind(*v),
        };
    }

    let cats = q.fetch_all(conn).await?;
    Ok(cats)
}

pub async fn insert_cat(
    conn: &mut PgConnection,
    user_id: Uuid,
    cat: &CatPayload,
) -> Result<(Uuid, DateTime<Utc>), ApiError> {
    let row = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
        "INSERT INTO cats (user_id, name, race, sex, age_in_month, description, image_urls) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING id, created_at",
    )
    .bind(user_id)
    .bind(&cat.name)
    .bind(&cat.race)
    .bind(&cat.sex)
    .bind(cat.age_in_month)
    .bind(&cat.description)
    .bind(&cat.image_urls)
    .fetch_one(conn)
    .await?;

    Ok(row)
}

/// Soft-deleted cats are invisible to every lookup.
pub async fn get_cat_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Cat>, ApiError> {
    let cat = sqlx::query_as::<_, Cat>(&format!(
        "SELECT {CAT_COLUMNS} FROM cats WHERE id = $1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(cat)
}

pub async fn update_cat(
    conn: &mut PgConnection,
    id: Uuid,
    cat: &CatPayload,
) -> Result<(), ApiError> {
    sqlx::query(
        "UPDATE cats \
         SET name = $2, race = $3, sex = $4, age_in_month = $5, description = $6, image_urls = $7 \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(&cat.name)
    .bind(&cat.race)
    .bind(&cat.sex)
    .bind(cat.age_in_month)
    .bind(&cat.description)
    .bind(&cat.image_urls)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn soft_delete_cat(conn: &mut PgConnection, id: Uuid) -> Result<(), ApiError> {
    sqlx::query("UPDATE cats SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
        .bind(id)
        .execute(conn)
        .await?;

    Ok(())
}
