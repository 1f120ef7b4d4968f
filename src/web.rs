use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::RosterError;
use crate::parser::parse_members;
use crate::schedule::calendar::validate_year;
use crate::schedule::{
    DutyFunction, Member, RngSource, RosterGenerator, ScaleDefinition, ScaleEntry, UnfilledShift,
    DEFAULT_DEFINITION_ID,
};
use crate::store::{ManualAssignment, RosterStore};

// In-memory state; the store is rebuilt on restart
pub struct AppState {
    pub store: Mutex<RosterStore>,
    pub members: Mutex<Option<Vec<Member>>>,
    pub admin_password: String,
    pub seed: Option<u64>,
}

impl AppState {
    pub fn new(admin_password: String, members: Option<Vec<Member>>, seed: Option<u64>) -> Self {
        Self {
            store: Mutex::new(RosterStore::new()),
            members: Mutex::new(members),
            admin_password,
            seed,
        }
    }
}

/// A poisoned lock still holds usable data, the handlers never leave it half-written
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Deserialize)]
pub struct LoginRequest {
    password: String,
}

#[derive(Deserialize)]
pub struct ActiveRequest {
    active: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntryRequest {
    member_id: String,
    #[serde(flatten)]
    assignment: ManualAssignment,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterResponse {
    year: i32,
    entries: Vec<ScaleEntry>,
    unfilled: Vec<UnfilledShift>,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MemberStats {
    member_name: String,
    shifts: u32,
    confirmed: u32,
    functions: HashMap<String, u32>,
}

fn is_admin(req: &HttpRequest, state: &AppState) -> bool {
    let password = req
        .headers()
        .get("X-Admin-Password")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    password == state.admin_password
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({"success": false, "error": "Unauthorized"}))
}

// Admin login endpoint
async fn admin_login(req: web::Json<LoginRequest>, state: web::Data<AppState>) -> Result<HttpResponse> {
    if req.password == state.admin_password {
        Ok(HttpResponse::Ok().json(serde_json::json!({"success": true})))
    } else {
        Ok(HttpResponse::Unauthorized().json(serde_json::json!({"success": false, "error": "Invalid password"})))
    }
}

// Member directory upload, CSV body
async fn upload_members(req: HttpRequest, body: web::Bytes, state: web::Data<AppState>) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }

    let members = parse_members(&body[..])?;
    let count = members.len();
    let admins = members.iter().filter(|m| m.is_admin).count();
    *lock(&state.members) = Some(members);
    info!(members = count, admins, "Member directory replaced");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "members": count,
        "admins": admins,
    })))
}

// Generates and stores the roster for a year
async fn generate_roster(req: HttpRequest, year: web::Path<i32>, state: web::Data<AppState>) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }
    let year = validate_year(year.into_inner())?;

    let members = lock(&state.members).clone().unwrap_or_default();
    if members.is_empty() {
        return Err(RosterError::EmptyDirectory.into());
    }

    let mut store = lock(&state.store);
    if store.has_year(year) {
        info!(year, "Replacing the stored roster");
    }
    let definition = store.definition(DEFAULT_DEFINITION_ID)?.clone();
    let carry_over = year
        .checked_sub(1)
        .map(|previous| store.last_weekend_members(previous, 12))
        .unwrap_or_default();
    let generator = RosterGenerator::new(&members, &definition).with_carry_over(carry_over);
    let report = match state.seed {
        Some(seed) => generator.generate(year, &mut RngSource::seeded(seed)),
        None => generator.generate(year, &mut RngSource::from_entropy()),
    };

    let entries = report.entries.len();
    let unfilled_slots = report.unfilled_slots();
    if unfilled_slots > 0 {
        warn!(year, unfilled_slots, "Roster generated with open slots");
    }
    store.save_report(report);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "year": year,
        "entries": entries,
        "unfilledSlots": unfilled_slots,
    })))
}

async fn get_year(year: web::Path<i32>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let year = year.into_inner();
    let store = lock(&state.store);
    Ok(HttpResponse::Ok().json(RosterResponse {
        year,
        entries: store.year_entries(year)?,
        unfilled: store.unfilled(year)?.to_vec(),
    }))
}

async fn get_month(path: web::Path<(i32, u32)>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let (year, month) = path.into_inner();
    let store = lock(&state.store);
    let entries = store.month_entries(year, month)?;
    let unfilled = store
        .unfilled(year)?
        .iter()
        .filter(|u| chrono::Datelike::month(&u.date) == month)
        .cloned()
        .collect();
    Ok(HttpResponse::Ok().json(RosterResponse { year, entries, unfilled }))
}

// Per-member shift counts for a year
async fn get_stats(year: web::Path<i32>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let entries = lock(&state.store).year_entries(year.into_inner())?;

    let mut stats: HashMap<String, MemberStats> = HashMap::new();
    for entry in &entries {
        let member = stats.entry(entry.member_id.clone()).or_insert_with(|| MemberStats {
            member_name: entry.member_name.clone(),
            ..MemberStats::default()
        });
        member.shifts += 1;
        if entry.confirmed {
            member.confirmed += 1;
        }
        *member.functions.entry(entry.function.to_string()).or_insert(0) += 1;
    }

    Ok(HttpResponse::Ok().json(stats))
}

async fn confirm_entry(req: HttpRequest, path: web::Path<(i32, u64)>, state: web::Data<AppState>) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }
    let (year, id) = path.into_inner();
    let entry = lock(&state.store).confirm_entry(year, id)?;
    Ok(HttpResponse::Ok().json(entry))
}

// Manual assignment on top of the generated roster
async fn add_manual_entry(
    req: HttpRequest,
    body: web::Json<ManualEntryRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }
    let ManualEntryRequest { member_id, assignment } = body.into_inner();
    let member = find_member(&state, member_id)?;
    let entry = lock(&state.store).add_manual_entry(&member, assignment)?;
    Ok(HttpResponse::Created().json(entry))
}

async fn update_entry(
    req: HttpRequest,
    path: web::Path<(i32, u64)>,
    body: web::Json<ManualEntryRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }
    let (year, id) = path.into_inner();
    let ManualEntryRequest { member_id, assignment } = body.into_inner();
    let member = find_member(&state, member_id)?;
    let entry = lock(&state.store).update_entry(year, id, &member, assignment)?;
    Ok(HttpResponse::Ok().json(entry))
}

async fn remove_entry(req: HttpRequest, path: web::Path<(i32, u64)>, state: web::Data<AppState>) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }
    let (year, id) = path.into_inner();
    let removed = lock(&state.store).remove_entry(year, id)?;
    Ok(HttpResponse::Ok().json(removed))
}

/// Looks a member up in the uploaded directory
fn find_member(state: &AppState, member_id: String) -> std::result::Result<Member, RosterError> {
    lock(&state.members)
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|m| m.id == member_id)
        .cloned()
        .ok_or(RosterError::MemberNotFound(member_id))
}

async fn list_definitions(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(lock(&state.store).definitions()))
}

async fn add_definition(
    req: HttpRequest,
    definition: web::Json<ScaleDefinition>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }
    let definition = lock(&state.store).add_definition(definition.into_inner())?;
    Ok(HttpResponse::Created().json(definition))
}

async fn update_definition(
    req: HttpRequest,
    id: web::Path<String>,
    definition: web::Json<ScaleDefinition>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }
    let definition = lock(&state.store).update_definition(&id, definition.into_inner())?;
    Ok(HttpResponse::Ok().json(definition))
}

async fn set_definition_active(
    req: HttpRequest,
    id: web::Path<String>,
    body: web::Json<ActiveRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }
    let touched = lock(&state.store).set_definition_active(&id, body.active)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "active": body.active,
        "entries": touched,
    })))
}

async fn remove_definition(req: HttpRequest, id: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse> {
    if !is_admin(&req, &state) {
        return Ok(unauthorized());
    }
    let removed = lock(&state.store).remove_definition(&id)?;
    Ok(HttpResponse::Ok().json(removed))
}

async fn list_functions() -> Result<HttpResponse> {
    let functions: Vec<String> = DutyFunction::ROTATION.iter().map(|f| f.to_string()).collect();
    Ok(HttpResponse::Ok().json(functions))
}

/// Registers every API route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/login", web::post().to(admin_login))
        .route("/api/members", web::post().to(upload_members))
        .route("/api/functions", web::get().to(list_functions))
        .route("/api/definitions", web::get().to(list_definitions))
        .route("/api/definitions", web::post().to(add_definition))
        .route("/api/definitions/{id}", web::put().to(update_definition))
        .route("/api/definitions/{id}", web::delete().to(remove_definition))
        .route("/api/definitions/{id}/active", web::post().to(set_definition_active))
        .route("/api/roster/entries", web::post().to(add_manual_entry))
        .route("/api/roster/{year}", web::get().to(get_year))
        .route("/api/roster/{year}/generate", web::post().to(generate_roster))
        .route("/api/roster/{year}/stats", web::get().to(get_stats))
        .route("/api/roster/{year}/entries/{id}", web::put().to(update_entry))
        .route("/api/roster/{year}/entries/{id}", web::delete().to(remove_entry))
        .route("/api/roster/{year}/entries/{id}/confirm", web::post().to(confirm_entry))
        .route("/api/roster/{year}/{month}", web::get().to(get_month));
}

pub async fn start_server(port: u16, state: AppState) -> std::io::Result<()> {
    let app_state = web::Data::new(state);

    info!(port, "Starting web server");
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
