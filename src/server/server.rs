use anyhow::Result;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::debug;

use crate::blobs::{BlobStore, Bucket};
use crate::catalog::{CatalogError, Song, SongStore};
use crate::query::{self, SortKey};
use crate::service::{CatalogService, FileUpload, SongFields};
use crate::video_link;
use tower_http::services::ServeDir;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{log_requests, state::*, RequestsLoggingLevel, ServerConfig};

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub songs: usize,
    pub genres: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize, Debug)]
struct ListQuery {
    search: Option<String>,
    genre: Option<String>,
    sort: Option<SortKey>,
}

#[derive(Serialize)]
struct SongDetails {
    song: Song,
    recommended: Vec<Song>,
    embed_video_url: Option<String>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

fn error_response(err: CatalogError) -> Response {
    let status = match &err {
        CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
        CatalogError::NotFound => StatusCode::NOT_FOUND,
        CatalogError::Upload(_) | CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

async fn home(State(state): State<ServerState>) -> Response {
    let songs = match state.service.list_songs() {
        Ok(songs) => songs,
        Err(err) => return error_response(err),
    };
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        genres: query::distinct_genres(&songs).len(),
        songs: songs.len(),
    };
    Json(stats).into_response()
}

async fn get_songs(
    State(service): State<GuardedCatalogService>,
    Query(params): Query<ListQuery>,
) -> Response {
    match service.list_songs() {
        Ok(songs) => Json(query::filter_and_sort(
            &songs,
            params.search.as_deref(),
            params.genre.as_deref(),
            params.sort.unwrap_or_default(),
        ))
        .into_response(),
        Err(err) => error_response(err),
    }
}

async fn get_song_details(
    State(service): State<GuardedCatalogService>,
    Path(id): Path<String>,
) -> Response {
    match service.get_song_with_recommendations(&id) {
        Ok((song, recommended)) => {
            let embed_video_url = song.video_url.as_deref().and_then(video_link::embed_url);
            Json(SongDetails {
                song,
                recommended,
                embed_video_url,
            })
            .into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn get_genres(State(service): State<GuardedCatalogService>) -> Response {
    match service.distinct_genres() {
        Ok(genres) => Json(genres).into_response(),
        Err(err) => error_response(err),
    }
}

async fn get_blob(
    State(blob_store): State<GuardedBlobStore>,
    Path((bucket, name)): Path<(String, String)>,
) -> Response {
    let bucket = match Bucket::from_name(&bucket) {
        Some(bucket) => bucket,
        None => return StatusCode::NOT_FOUND.into_response(),
    };
    let buffer = match blob_store.read(bucket, &name) {
        Ok(buffer) => buffer,
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };

    let content_type = infer::get(&buffer)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .body(buffer.into())
        .unwrap()
}

/// Drains the multipart form of the admin create and update pages. Text
/// fields map onto the metadata, "image" and "pdf" are file fields. A file
/// field submitted with no content is treated as absent, that is how
/// browsers send an untouched file input.
async fn read_song_form(
    mut multipart: Multipart,
) -> Result<(SongFields, Option<FileUpload>, Option<FileUpload>), CatalogError> {
    let malformed = |err| CatalogError::Validation(format!("malformed multipart request: {}", err));

    let mut fields = SongFields::default();
    let mut image = None;
    let mut pdf = None;

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "image" | "pdf" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await.map_err(malformed)?.to_vec();
                if data.is_empty() {
                    continue;
                }
                let upload = FileUpload { filename, data };
                if field_name == "image" {
                    image = Some(upload);
                } else {
                    pdf = Some(upload);
                }
            }
            "title" => fields.title = field.text().await.map_err(malformed)?,
            "artist" => fields.artist = field.text().await.map_err(malformed)?,
            "album" => fields.album = Some(field.text().await.map_err(malformed)?),
            "genre" => fields.genre = Some(field.text().await.map_err(malformed)?),
            "description" => fields.description = Some(field.text().await.map_err(malformed)?),
            "video_url" => fields.video_url = Some(field.text().await.map_err(malformed)?),
            other => debug!("Ignoring unknown form field {:?}", other),
        }
    }

    Ok((fields, image, pdf))
}

async fn create_song(
    State(service): State<GuardedCatalogService>,
    multipart: Multipart,
) -> Response {
    let (fields, image, pdf) = match read_song_form(multipart).await {
        Ok(parsed) => parsed,
        Err(err) => return error_response(err),
    };
    match service.create_song(fields, image, pdf) {
        Ok(song) => Json(song).into_response(),
        Err(err) => error_response(err),
    }
}

async fn update_song(
    State(service): State<GuardedCatalogService>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let (fields, image, pdf) = match read_song_form(multipart).await {
        Ok(parsed) => parsed,
        Err(err) => return error_response(err),
    };
    match service.update_song(&id, fields, image, pdf) {
        Ok(song) => Json(song).into_response(),
        Err(err) => error_response(err),
    }
}

async fn delete_song(
    State(service): State<GuardedCatalogService>,
    Path(id): Path<String>,
) -> Response {
    match service.delete_song(&id) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => error_response(err),
    }
}

async fn post_view(
    State(service): State<GuardedCatalogService>,
    Path(id): Path<String>,
) -> StatusCode {
    service.increment_view(&id);
    StatusCode::OK
}

async fn post_download(
    State(service): State<GuardedCatalogService>,
    Path(id): Path<String>,
) -> StatusCode {
    service.increment_download(&id);
    StatusCode::OK
}

fn make_app(
    config: ServerConfig,
    songs: Arc<dyn SongStore>,
    blobs: Arc<dyn BlobStore>,
) -> Result<Router> {
    let service = Arc::new(CatalogService::new(blobs.clone(), songs));
    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        service,
        blob_store: blobs,
    };

    let browse_routes: Router = Router::new()
        .route("/songs", get(get_songs))
        .route("/songs/{id}", get(get_song_details))
        .route("/songs/{id}/view", post(post_view))
        .route("/songs/{id}/download", post(post_download))
        .route("/genres", get(get_genres))
        .route("/blobs/{bucket}/{name}", get(get_blob))
        .with_state(state.clone());

    let admin_routes: Router = Router::new()
        .route("/songs", post(create_song))
        .route("/songs/{id}", put(update_song))
        .route("/songs/{id}", delete(delete_song))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let mut app: Router = home_router.nest("/v1", browse_routes.merge(admin_routes));
    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    songs: Arc<dyn SongStore>,
    blobs: Arc<dyn BlobStore>,
    requests_logging_level: RequestsLoggingLevel,
    port: u16,
    frontend_dir_path: Option<String>,
) -> Result<()> {
    let config = ServerConfig {
        port,
        requests_logging_level,
        frontend_dir_path,
    };
    let app = make_app(config, songs, blobs)?;

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}
