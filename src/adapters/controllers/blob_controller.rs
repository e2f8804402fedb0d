use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, Redirect, Response},
    Form, Json,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tracing::warn;

use crate::{
    adapters::{
        dto::blob_dto::{BlobResponse, EditDescriptionRequest, ListQuery, RenameRequest},
        state::AppState,
    },
    application::error::ApplicationError,
    domain::models::blob::UploadData,
};

pub struct BlobController;

impl BlobController {
    /// GET / — container listing, optionally filtered by `?search=`.
    pub async fn list_files(
        State(app_state): State<AppState>,
        Query(query): Query<ListQuery>,
    ) -> Result<Json<Vec<BlobResponse>>, ApplicationError> {
        let entries = match query.search.as_deref() {
            Some(term) if !term.trim().is_empty() => {
                app_state.blob_service.search_files(term).await?
            }
            _ => app_state.blob_service.list_files().await?,
        };

        Ok(Json(entries.into_iter().map(BlobResponse::from).collect()))
    }

    /// POST /upload — multipart form with `file` and `description` fields.
    /// Always redirects back to the listing with a status message.
    pub async fn upload_file(
        State(app_state): State<AppState>,
        mut multipart: Multipart,
    ) -> Redirect {
        let mut file_bytes: Option<Vec<u8>> = None;
        let mut file_name: Option<String> = None;
        let mut content_type: Option<String> = None;
        let mut description: Option<String> = None;

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(err) => {
                    warn!("Invalid multipart data: {}", err);
                    return redirect_with_message("Invalid upload request.");
                }
            };

            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "file" => {
                    file_name = field.file_name().map(|value| value.to_string());
                    content_type = field.content_type().map(|value| value.to_string());
                    match field.bytes().await {
                        Ok(bytes) => file_bytes = Some(bytes.to_vec()),
                        Err(err) => {
                            warn!("Cannot read file bytes: {}", err);
                            return redirect_with_message("Invalid upload request.");
                        }
                    }
                }
                "description" => match field.text().await {
                    Ok(text) => description = Some(text),
                    Err(err) => {
                        warn!("Invalid description field: {}", err);
                        return redirect_with_message("Invalid upload request.");
                    }
                },
                _ => {}
            }
        }

        let file_name = file_name.unwrap_or_default();
        let upload = UploadData::new(
            file_name.clone(),
            file_bytes.unwrap_or_default(),
            content_type.unwrap_or_else(|| "application/octet-stream".to_string()),
            description.unwrap_or_default(),
        );

        match app_state.blob_service.upload_file(upload).await {
            Ok(()) => redirect_with_message(&format!("File '{}' uploaded.", file_name)),
            Err(reason) => redirect_with_message(&reason.to_string()),
        }
    }

    /// GET /download/{file_name}
    pub async fn download_file(
        State(app_state): State<AppState>,
        Path(file_name): Path<String>,
    ) -> Result<Response, ApplicationError> {
        let blob = app_state
            .blob_service
            .download_file(&file_name)
            .await?
            .ok_or(ApplicationError::NotFound)?;

        let response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, blob.content_type)
            .header(header::CONTENT_LENGTH, blob.content.len())
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            )
            .body(Body::from(blob.content))
            .unwrap();

        Ok(response)
    }

    /// POST /delete/{file_name}
    pub async fn delete_file(
        State(app_state): State<AppState>,
        Path(file_name): Path<String>,
    ) -> Redirect {
        if app_state.blob_service.delete_file(&file_name).await {
            redirect_with_message(&format!("File '{}' deleted.", file_name))
        } else {
            redirect_with_message(&format!("File '{}' not found.", file_name))
        }
    }

    /// GET /generate-thumbnail/{file_name} — 302 to a signed read URL.
    pub async fn generate_thumbnail(
        State(app_state): State<AppState>,
        Path(file_name): Path<String>,
    ) -> Result<Response, ApplicationError> {
        match app_state.blob_service.signed_image_url(&file_name).await {
            Some(url) => Ok(Response::builder()
                .status(StatusCode::FOUND)
                .header(header::LOCATION, url)
                .body(Body::empty())
                .unwrap()),
            None => Err(ApplicationError::NotFound),
        }
    }

    /// GET /show/{file_name} — HTML page embedding the signed image URL.
    pub async fn show_image(
        State(app_state): State<AppState>,
        Path(file_name): Path<String>,
    ) -> Result<Html<String>, ApplicationError> {
        match app_state.blob_service.signed_image_url(&file_name).await {
            Some(url) => Ok(Html(format!(
                "<html><body><img src=\"{}\" style=\"max-width:100%\"/></body></html>",
                url
            ))),
            None => Err(ApplicationError::NotFound),
        }
    }

    /// POST /edit — rename a blob.
    pub async fn rename_file(
        State(app_state): State<AppState>,
        Form(body): Form<RenameRequest>,
    ) -> Redirect {
        let result = app_state
            .blob_service
            .rename_file(&body.file_name, &body.new_file_name)
            .await;
        redirect_with_message(&result.message)
    }

    /// POST /edit-description
    pub async fn edit_description(
        State(app_state): State<AppState>,
        Form(body): Form<EditDescriptionRequest>,
    ) -> Redirect {
        let updated = app_state
            .blob_service
            .edit_description(&body.file_name, &body.description)
            .await;

        if updated {
            redirect_with_message(&format!("Description of '{}' updated.", body.file_name))
        } else {
            redirect_with_message(&format!(
                "Could not update the description of '{}'.",
                body.file_name
            ))
        }
    }

    /// POST /toggle-display-mode — flips the listing between list and grid
    /// via a cookie; the server keeps no per-client state.
    pub async fn toggle_display_mode(headers: HeaderMap) -> Response {
        let current = headers
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(display_mode_cookie)
            .unwrap_or("list");
        let next = if current == "grid" { "list" } else { "grid" };

        Response::builder()
            .status(StatusCode::SEE_OTHER)
            .header(header::LOCATION, "/")
            .header(header::SET_COOKIE, format!("display_mode={}; Path=/", next))
            .body(Body::empty())
            .unwrap()
    }
}

fn redirect_with_message(message: &str) -> Redirect {
    let encoded = utf8_percent_encode(message, NON_ALPHANUMERIC).to_string();
    Redirect::to(&format!("/?msg={}", encoded))
}

fn display_mode_cookie(cookies: &str) -> Option<&str> {
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("display_mode="))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mode_cookie_is_found_among_others() {
        assert_eq!(
            display_mode_cookie("a=1; display_mode=grid; b=2"),
            Some("grid")
        );
        assert_eq!(display_mode_cookie("a=1; b=2"), None);
        assert_eq!(display_mode_cookie(""), None);
    }
}
