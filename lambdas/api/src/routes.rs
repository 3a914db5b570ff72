use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use domain::{
    accounts::{Account, ProfileInput, SignInInput, SignUpInput},
    i18n::{Direction, Locale, MessageKey, Messages},
    identity::Session,
    requests::{
        inputs::{AdvanceStatusInput, CreateRequestInput},
        DeliveryStep, Milestone, PendingJob, Request,
    },
    settings::{ClientSettings, ConsentPrompt, ConsentStep, SettingsStore},
    storage::Bucket,
    tracking::TrackingPoll,
    Capability,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    cookies::CookieSettings,
    error::{AppError, Localize},
    extract::{BearerToken, CurrentAccount, FormData, JsonBody, Lang},
    state::AppState,
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/:locale/messages", get(messages))
        .route(
            "/:locale/auth/sign-up",
            post(sign_up).layer(DefaultBodyLimit::disable()),
        )
        .route("/:locale/auth/sign-in", post(sign_in))
        .route("/:locale/auth/sign-out", post(sign_out))
        .route("/:locale/me", get(me))
        .route("/:locale/profile", put(update_profile))
        .route("/:locale/courier/online", put(set_online))
        .route("/:locale/pharmacies", get(pharmacies))
        .route(
            "/:locale/uploads/prescription",
            post(upload_prescription).layer(DefaultBodyLimit::disable()),
        )
        .route(
            "/:locale/uploads/id-document",
            post(upload_id_document).layer(DefaultBodyLimit::disable()),
        )
        .route("/:locale/requests", post(create_request).get(list_requests))
        .route("/:locale/requests/:id", get(get_request))
        .route("/:locale/jobs", get(jobs))
        .route("/:locale/jobs/:id/accept", post(accept_job))
        .route("/:locale/jobs/:id/status", post(advance_job))
        .route("/:locale/settings", get(settings))
        .route("/:locale/settings/senior-mode", post(toggle_senior_mode))
        .route("/:locale/settings/consent", post(answer_consent))
        .with_state(state)
}

#[derive(Serialize)]
struct Redirect {
    redirect: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<String>,
}

#[derive(Serialize)]
struct Notice<T> {
    #[serde(flatten)]
    data: T,
    notice: String,
}

impl<T> Notice<T> {
    fn new(data: T, locale: Locale, key: MessageKey) -> Self {
        Self {
            data,
            notice: Messages::get(locale, key),
        }
    }
}

/// Request with its localized status and the step a courier can set next.
#[derive(Serialize)]
struct RequestCard {
    #[serde(flatten)]
    request: Request,
    status_label: String,
    next_step: Option<DeliveryStep>,
}

impl RequestCard {
    fn new(request: Request, locale: Locale) -> Self {
        Self {
            status_label: Messages::get(locale, request.status.label()),
            next_step: request.status.next_step(),
            request,
        }
    }
}

// Messages

#[derive(Serialize)]
struct MessagesResponse {
    locale: Locale,
    direction: Direction,
    messages: &'static Value,
}

async fn messages(Lang(locale): Lang) -> impl IntoResponse {
    Json(MessagesResponse {
        locale,
        direction: locale.direction(),
        messages: Messages::bundle(locale),
    })
}

// Auth

async fn sign_up(
    Lang(locale): Lang,
    State(state): State<AppState>,
    mut form: FormData,
) -> Result<impl IntoResponse, AppError> {
    let id_document = form.take_file("idDocument");

    let input = SignUpInput {
        email: form.text("email"),
        password: form.text("password"),
        name: form.text("name"),
        phone: form.text("phone"),
        role: form.text("role"),
        plz: form.optional("plz"),
        street: form.optional("street"),
        house_number: form.optional("houseNumber"),
        date_of_birth: form.optional("dateOfBirth"),
        vehicle_type: form.optional("vehicleType"),
    };

    state
        .accounts
        .sign_up(input, id_document)
        .await
        .localize(locale)?;

    Ok((
        StatusCode::CREATED,
        Json(Redirect {
            redirect: format!("/{}/login?registered=1", locale.as_str()),
            notice: Some(Messages::get(locale, MessageKey::Registered)),
        }),
    ))
}

#[derive(Serialize)]
struct SignInResponse {
    session: Session,
    redirect: String,
}

async fn sign_in(
    Lang(locale): Lang,
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SignInInput>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.accounts.sign_in(input).await.localize(locale)?;

    Ok(Json(SignInResponse {
        session,
        redirect: format!("/{}/dashboard", locale.as_str()),
    }))
}

async fn sign_out(
    Lang(locale): Lang,
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = token {
        state.accounts.sign_out(&token).await.localize(locale)?;
    }

    Ok(Json(Redirect {
        redirect: format!("/{}", locale.as_str()),
        notice: None,
    }))
}

// Account

#[derive(Serialize)]
struct Me {
    account: Account,
    capabilities: Vec<Capability>,
}

impl From<Account> for Me {
    fn from(account: Account) -> Self {
        Self {
            capabilities: account.capabilities(),
            account,
        }
    }
}

async fn me(CurrentAccount(account): CurrentAccount) -> impl IntoResponse {
    Json(Me::from(account))
}

async fn update_profile(
    Lang(locale): Lang,
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    JsonBody(input): JsonBody<ProfileInput>,
) -> Result<impl IntoResponse, AppError> {
    let account = state
        .accounts
        .update_profile(&account, input)
        .await
        .localize(locale)?;

    Ok(Json(Notice::new(Me::from(account), locale, MessageKey::ProfileSaved)))
}

#[derive(Deserialize)]
struct OnlineInput {
    online: bool,
}

async fn set_online(
    Lang(locale): Lang,
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    JsonBody(input): JsonBody<OnlineInput>,
) -> Result<impl IntoResponse, AppError> {
    let account = state
        .accounts
        .set_online(&account, input.online)
        .await
        .localize(locale)?;

    let notice = if account.is_online {
        MessageKey::CourierOnline
    } else {
        MessageKey::CourierOffline
    };
    Ok(Json(Notice::new(Me::from(account), locale, notice)))
}

// Pharmacies

#[derive(Deserialize)]
struct MapQuery {
    city: Option<String>,
}

async fn pharmacies(
    Lang(locale): Lang,
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Query(query): Query<MapQuery>,
) -> Result<impl IntoResponse, AppError> {
    let pins = state
        .pharmacies
        .map(&account.actor(), locale, query.city.as_deref())
        .await
        .localize(locale)?;

    Ok(Json(pins))
}

// Uploads

#[derive(Serialize)]
struct Uploaded {
    url: String,
}

async fn upload(
    locale: Locale,
    state: &AppState,
    account: &Account,
    bucket: Bucket,
    mut form: FormData,
) -> Result<Json<Uploaded>, AppError> {
    let file = form.take_file("file").unwrap_or_default();

    let url = state
        .accounts
        .upload(account, bucket, &file)
        .await
        .localize(locale)?;

    Ok(Json(Uploaded { url }))
}

async fn upload_prescription(
    Lang(locale): Lang,
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    form: FormData,
) -> Result<impl IntoResponse, AppError> {
    upload(locale, &state, &account, Bucket::Prescriptions, form).await
}

async fn upload_id_document(
    Lang(locale): Lang,
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    form: FormData,
) -> Result<impl IntoResponse, AppError> {
    upload(locale, &state, &account, Bucket::IdDocuments, form).await
}

// Requests

async fn create_request(
    Lang(locale): Lang,
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    JsonBody(input): JsonBody<CreateRequestInput>,
) -> Result<impl IntoResponse, AppError> {
    let request = state
        .requests
        .create(&account.actor(), input)
        .await
        .localize(locale)?;

    Ok((
        StatusCode::CREATED,
        Json(Notice::new(
            RequestCard::new(request, locale),
            locale,
            MessageKey::RequestCreated,
        )),
    ))
}

async fn list_requests(
    Lang(locale): Lang,
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
) -> Result<impl IntoResponse, AppError> {
    let requests = state
        .requests
        .history(&account.actor())
        .await
        .localize(locale)?;

    let cards: Vec<_> = requests
        .into_iter()
        .map(|request| RequestCard::new(request, locale))
        .collect();
    Ok(Json(cards))
}

#[derive(Serialize)]
struct RequestDetail {
    #[serde(flatten)]
    card: RequestCard,
    tracking: TrackingPoll,
    timeline: Vec<Milestone>,
}

async fn get_request(
    Lang(locale): Lang,
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path((_, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let view = state
        .requests
        .view(&account.actor(), &id)
        .await
        .localize(locale)?;

    Ok(Json(RequestDetail {
        tracking: TrackingPoll::for_status(view.request.status),
        card: RequestCard::new(view.request, locale),
        timeline: view.timeline,
    }))
}

// Jobs

#[derive(Serialize)]
struct JobsResponse {
    pending: Vec<PendingJob>,
    mine: Vec<RequestCard>,
}

async fn jobs(
    Lang(locale): Lang,
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
) -> Result<impl IntoResponse, AppError> {
    let board = state.requests.jobs(&account.actor()).await.localize(locale)?;

    Ok(Json(JobsResponse {
        pending: board.pending,
        mine: board
            .mine
            .into_iter()
            .map(|request| RequestCard::new(request, locale))
            .collect(),
    }))
}

async fn accept_job(
    Lang(locale): Lang,
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path((_, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let request = state
        .requests
        .accept(&account.actor(), &id)
        .await
        .localize(locale)?;

    Ok(Json(Notice::new(
        RequestCard::new(request, locale),
        locale,
        MessageKey::RequestAccepted,
    )))
}

async fn advance_job(
    Lang(locale): Lang,
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path((_, id)): Path<(String, String)>,
    JsonBody(input): JsonBody<AdvanceStatusInput>,
) -> Result<impl IntoResponse, AppError> {
    let request = state
        .requests
        .advance(&account.actor(), &id, input.status)
        .await
        .localize(locale)?;

    Ok(Json(Notice::new(
        RequestCard::new(request, locale),
        locale,
        MessageKey::StatusUpdated,
    )))
}

// Settings

async fn settings(headers: HeaderMap) -> impl IntoResponse {
    let store = SettingsStore::new(CookieSettings::from_headers(&headers));
    Json(store.snapshot())
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct SeniorModeInput {
    /// Explicit value; toggles when absent
    enabled: Option<bool>,
}

async fn toggle_senior_mode(
    headers: HeaderMap,
    input: Option<Json<SeniorModeInput>>,
) -> impl IntoResponse {
    let mut store = SettingsStore::new(CookieSettings::from_headers(&headers));

    match input.and_then(|Json(input)| input.enabled) {
        Some(enabled) => store.set_senior_mode(enabled),
        None => {
            store.toggle_senior_mode();
        }
    }

    let snapshot: ClientSettings = store.snapshot();
    (store.into_inner().set_cookie_headers(), Json(snapshot))
}

#[derive(Deserialize)]
struct ConsentInput {
    step: ConsentStep,
    accept: bool,
}

async fn answer_consent(
    headers: HeaderMap,
    JsonBody(input): JsonBody<ConsentInput>,
) -> impl IntoResponse {
    let mut store = SettingsStore::new(CookieSettings::from_headers(&headers));

    let prompt: ConsentPrompt = store.answer_consent(input.step, input.accept);
    (store.into_inner().set_cookie_headers(), Json(prompt))
}
