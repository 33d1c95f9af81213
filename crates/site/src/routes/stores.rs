//! Store route handlers: listing, detail, add/edit, tags, top, hearts and map.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tower_sessions::Session;
use tracing::instrument;

use delicious_core::{Rating, StoreId, TAG_CHOICES};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{PageContext, RequireAuth, push_flash};
use crate::models::pagination::Pagination;
use crate::models::store::StoreForm;
use crate::models::{CurrentUser, FlashKind, Store};
use crate::routes::views::{ReviewView, StoreCard, TagLink, TopStoreRow};
use crate::services::uploads::{PhotoUpload, UploadError, remove_photo, save_photo};
use crate::services::StoreService;
use crate::state::AppState;

// =============================================================================
// Templates
// =============================================================================

/// Card grid of stores (home listing and hearts page).
#[derive(Template, WebTemplate)]
#[template(path = "stores.html")]
pub struct StoresTemplate {
    pub page: PageContext,
    pub title: String,
    pub stores: Vec<StoreCard>,
    pub pagination: Option<Pagination>,
}

/// A checkbox on the store form.
#[derive(Debug, Clone)]
pub struct TagChoice {
    pub name: &'static str,
    pub checked: bool,
}

/// Add/edit store form.
#[derive(Template, WebTemplate)]
#[template(path = "edit_store.html")]
pub struct EditStoreTemplate {
    pub page: PageContext,
    pub title: String,
    pub action: String,
    pub form: StoreForm,
    pub tag_choices: Vec<TagChoice>,
}

/// Store detail page.
#[derive(Template, WebTemplate)]
#[template(path = "store.html")]
pub struct StoreTemplate {
    pub page: PageContext,
    pub store: Store,
    pub editable: bool,
    pub hearted: bool,
    pub static_map: Option<String>,
    pub reviews: Vec<ReviewView>,
    /// Ratings offered by the review form, highest first.
    pub ratings: Vec<u8>,
}

/// Tags page.
#[derive(Template, WebTemplate)]
#[template(path = "tags.html")]
pub struct TagsTemplate {
    pub page: PageContext,
    pub title: String,
    pub tags: Vec<TagLink>,
    pub stores: Vec<StoreCard>,
}

/// Top-rated stores page.
#[derive(Template, WebTemplate)]
#[template(path = "top.html")]
pub struct TopTemplate {
    pub page: PageContext,
    pub rows: Vec<TopStoreRow>,
}

/// Map page.
#[derive(Template, WebTemplate)]
#[template(path = "map.html")]
pub struct MapTemplate {
    pub page: PageContext,
}

// =============================================================================
// Listing
// =============================================================================

/// `GET /` and `GET /stores`: first page of stores.
pub async fn index(State(state): State<AppState>, session: Session) -> Result<Response> {
    list_page(&state, &session, 1).await
}

/// `GET /stores/page/{page}`.
pub async fn page(
    State(state): State<AppState>,
    session: Session,
    Path(page): Path<u32>,
) -> Result<Response> {
    list_page(&state, &session, page).await
}

#[instrument(skip(state, session))]
async fn list_page(state: &AppState, session: &Session, page: u32) -> Result<Response> {
    let service = StoreService::new(state.pool());
    let listing = service.page(page).await?;

    if listing.pagination.is_past_end() {
        let last = listing.pagination.pages;
        push_flash(
            session,
            FlashKind::Info,
            format!(
                "Hey! You asked for page {page}. But that doesn't exist. So I put you on page {last}"
            ),
        )
        .await?;
        return Ok(Redirect::to(&format!("/stores/page/{last}")).into_response());
    }

    let path = if page <= 1 {
        "/stores".to_owned()
    } else {
        format!("/stores/page/{page}")
    };
    let ctx = PageContext::load(Some(session), state, &path).await;
    let hearts = user_hearts(&service, ctx.user.as_ref()).await?;

    Ok(StoresTemplate {
        stores: StoreCard::list(&listing.stores, ctx.user.as_ref(), &hearts),
        page: ctx,
        title: "Stores".to_owned(),
        pagination: Some(listing.pagination),
    }
    .into_response())
}

/// `GET /hearts`: stores the signed-in user has hearted.
pub async fn hearts(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let service = StoreService::new(state.pool());
    let stores = service.hearted(user.id).await?;
    let hearts: Vec<StoreId> = stores.iter().map(|s| s.id).collect();

    Ok(StoresTemplate {
        stores: StoreCard::list(&stores, Some(&user), &hearts),
        page,
        title: "Hearted Stores".to_owned(),
        pagination: None,
    })
}

// =============================================================================
// Detail
// =============================================================================

/// `GET /store/{slug}`.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let service = StoreService::new(state.pool());
    let detail = service.detail(&slug).await?;
    let hearts = user_hearts(&service, page.user.as_ref()).await?;

    let now = Utc::now();
    let reviews = detail
        .reviews
        .iter()
        .map(|r| ReviewView::new(r, now))
        .collect();
    let static_map = page
        .map_key
        .as_deref()
        .map(|key| static_map_url(&detail.store, key));

    Ok(StoreTemplate {
        editable: page.owns(detail.store.author_id),
        hearted: hearts.contains(&detail.store.id),
        static_map,
        reviews,
        ratings: (Rating::MIN..=Rating::MAX).rev().collect(),
        store: detail.store,
        page,
    })
}

/// Static map image centred on the store.
fn static_map_url(store: &Store, key: &str) -> String {
    let lat = store.location.coordinates.lat();
    let lng = store.location.coordinates.lng();
    format!(
        "https://maps.googleapis.com/maps/api/staticmap?center={lat},{lng}&zoom=14&size=800x150&scale=2&markers={lat},{lng}&key={key}"
    )
}

// =============================================================================
// Add / edit
// =============================================================================

/// `GET /add`: empty store form.
pub async fn add_page(RequireAuth(_user): RequireAuth, page: PageContext) -> impl IntoResponse {
    edit_template(page, "Add Store", "/add".to_owned(), StoreForm::default())
}

/// `POST /add`: create a store.
#[instrument(skip(user, state, session, multipart), fields(user_id = %user.id))]
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    multipart: Multipart,
) -> Result<Response> {
    let (form, photo) = read_store_form(multipart).await?;

    let store = match form.validate() {
        Ok(store) => store,
        Err(errors) => return render_invalid(&state, &session, "Add Store", "/add", form, errors).await,
    };
    let photo = match store_photo(&state, photo).await {
        Ok(photo) => photo,
        Err(e) if e.is_client_error() => {
            return render_invalid(&state, &session, "Add Store", "/add", form, vec![e.to_string()])
                .await;
        }
        Err(e) => return Err(e.into()),
    };

    let created = match StoreService::new(state.pool())
        .create(user.id, &store, photo.as_deref())
        .await
    {
        Ok(created) => created,
        Err(e) => {
            discard_photo(&state, photo.as_deref()).await;
            return Err(e.into());
        }
    };

    add_breadcrumb("store", "Created store", Some(&[("slug", created.slug.as_str())]));
    push_flash(
        &session,
        FlashKind::Success,
        format!("Successfully created {}. Care to leave a review?", created.name),
    )
    .await?;

    Ok(Redirect::to(&format!("/store/{}", created.slug.as_str())).into_response())
}

/// `GET /stores/{id}/edit`: prefilled form for the owner.
pub async fn edit_page(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse> {
    let store = StoreService::new(state.pool())
        .get_owned(StoreId::new(id), user.id)
        .await?;

    Ok(edit_template(
        page,
        &format!("Edit {}", store.name),
        format!("/add/{id}"),
        StoreForm::from_store(&store),
    ))
}

/// `POST /add/{id}`: update a store owned by the signed-in user.
#[instrument(skip(user, state, session, multipart), fields(user_id = %user.id))]
pub async fn update(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Response> {
    let id = StoreId::new(id);
    let service = StoreService::new(state.pool());
    let current = service.get_owned(id, user.id).await?;

    let (form, photo) = read_store_form(multipart).await?;
    let title = format!("Edit {}", current.name);
    let action = format!("/add/{id}");

    let store = match form.validate() {
        Ok(store) => store,
        Err(errors) => return render_invalid(&state, &session, &title, &action, form, errors).await,
    };
    let photo = match store_photo(&state, photo).await {
        Ok(photo) => photo,
        Err(e) if e.is_client_error() => {
            return render_invalid(&state, &session, &title, &action, form, vec![e.to_string()])
                .await;
        }
        Err(e) => return Err(e.into()),
    };

    let updated = match service.update(id, user.id, &store, photo.as_deref()).await {
        Ok(updated) => updated,
        Err(e) => {
            discard_photo(&state, photo.as_deref()).await;
            return Err(e.into());
        }
    };

    push_flash(
        &session,
        FlashKind::Success,
        format!("Successfully updated {}.", updated.name),
    )
    .await?;

    Ok(Redirect::to(&format!("/store/{}", updated.slug.as_str())).into_response())
}

fn edit_template(page: PageContext, title: &str, action: String, form: StoreForm) -> EditStoreTemplate {
    let tag_choices = TAG_CHOICES
        .iter()
        .map(|&name| TagChoice {
            name,
            checked: form.has_tag(name),
        })
        .collect();

    EditStoreTemplate {
        page,
        title: title.to_owned(),
        action,
        form,
        tag_choices,
    }
}

/// Re-render the store form with the submitted values and messages.
async fn render_invalid(
    state: &AppState,
    session: &Session,
    title: &str,
    action: &str,
    form: StoreForm,
    errors: Vec<String>,
) -> Result<Response> {
    let page = PageContext::load(Some(session), state, action)
        .await
        .with_errors(errors);
    Ok((
        StatusCode::UNPROCESSABLE_ENTITY,
        edit_template(page, title, action.to_owned(), form),
    )
        .into_response())
}

/// Collect the multipart store form.
///
/// A `photo` part without a file name or with an empty body means no photo
/// was chosen.
async fn read_store_form(mut multipart: Multipart) -> Result<(StoreForm, Option<PhotoUpload>)> {
    let mut form = StoreForm::default();
    let mut photo = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_owned();
        if name == "photo" {
            let content_type = field.content_type().unwrap_or_default().to_owned();
            let has_file = field.file_name().is_some_and(|f| !f.is_empty());
            let bytes = field.bytes().await.map_err(bad_multipart)?;
            if has_file && !bytes.is_empty() {
                photo = Some(PhotoUpload {
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field.text().await.map_err(bad_multipart)?;
        match name.as_str() {
            "name" => form.name = value,
            "description" => form.description = value,
            "tags" => form.tags.push(value),
            "address" => form.address = value,
            "lng" => form.lng = value,
            "lat" => form.lat = value,
            _ => {}
        }
    }

    Ok((form, photo))
}

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::BadRequest(e.body_text())
}

async fn store_photo(
    state: &AppState,
    photo: Option<PhotoUpload>,
) -> std::result::Result<Option<String>, UploadError> {
    match photo {
        Some(upload) => Ok(Some(save_photo(&state.config().uploads_dir, upload).await?)),
        None => Ok(None),
    }
}

/// Remove a photo saved for a store write that then failed.
async fn discard_photo(state: &AppState, photo: Option<&str>) {
    if let Some(file_name) = photo {
        remove_photo(&state.config().uploads_dir, file_name).await;
    }
}

// =============================================================================
// Tags / top / map
// =============================================================================

/// `GET /tags`: every tag with its count, plus all tagged stores.
pub async fn tags(
    State(state): State<AppState>,
    page: PageContext,
) -> Result<impl IntoResponse> {
    tags_page(&state, page, None).await
}

/// `GET /tags/{tag}`: stores carrying `tag`.
pub async fn tag(
    State(state): State<AppState>,
    page: PageContext,
    Path(tag): Path<String>,
) -> Result<impl IntoResponse> {
    tags_page(&state, page, Some(tag)).await
}

async fn tags_page(
    state: &AppState,
    page: PageContext,
    selected: Option<String>,
) -> Result<TagsTemplate> {
    let service = StoreService::new(state.pool());
    let listing = service.tags(selected.as_deref()).await?;
    let hearts = user_hearts(&service, page.user.as_ref()).await?;

    Ok(TagsTemplate {
        title: selected.clone().unwrap_or_else(|| "Tags".to_owned()),
        tags: TagLink::list(&listing.tags, selected.as_deref()),
        stores: StoreCard::list(&listing.stores, page.user.as_ref(), &hearts),
        page,
    })
}

/// `GET /top`: top-rated stores.
pub async fn top(State(state): State<AppState>, page: PageContext) -> Result<impl IntoResponse> {
    let top = StoreService::new(state.pool()).top().await?;
    Ok(TopTemplate {
        page,
        rows: TopStoreRow::list(&top),
    })
}

/// `GET /map`.
pub async fn map(page: PageContext) -> impl IntoResponse {
    MapTemplate { page }
}

/// Heart ids for the signed-in user, empty for visitors.
async fn user_hearts(
    service: &StoreService<'_>,
    user: Option<&CurrentUser>,
) -> Result<Vec<StoreId>> {
    match user {
        Some(user) => Ok(service.heart_ids(user.id).await?),
        None => Ok(Vec::new()),
    }
}
