//! Profile page and profile picture upload.
//!
//! Uploaded pictures are center-cropped to a square, shrunk to at most
//! [`AVATAR_SIZE`] pixels per side and stored as PNG in the user's directory.

use crate::app::SharedState;
use crate::login::current_user;
use crate::templates::{Notice, render};
use axum::{
    extract::{Multipart, Path as AxumPath, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use image::imageops::FilterType;
use image::{GenericImageView, ImageFormat};
use log::{info, warn};
use serde_json::json;
use std::path::Path;

pub const AVATAR_SIZE: u32 = 300;
pub const AVATAR_FILE: &str = "avatar.png";

/// Largest accepted upload, in bytes
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("No picture was uploaded")]
    Empty,

    #[error("Picture is larger than 5 MB")]
    TooLarge,

    #[error("File is not a supported image")]
    NotAnImage(#[source] image::ImageError),

    #[error("failed to store picture: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode picture: {0}")]
    Encode(#[source] image::ImageError),
}

/// Decodes, crops, resizes and writes a picture to
/// `<user_dir>/avatar.png`. Returns the stored file name.
pub fn save_profile_picture(user_dir: &Path, bytes: &[u8]) -> Result<String, ProfileError> {
    if bytes.is_empty() {
        return Err(ProfileError::Empty);
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ProfileError::TooLarge);
    }

    let img = image::load_from_memory(bytes).map_err(ProfileError::NotAnImage)?;

    let (width, height) = img.dimensions();
    let side = width.min(height);
    let mut square = img.crop_imm((width - side) / 2, (height - side) / 2, side, side);
    if side > AVATAR_SIZE {
        square = square.resize_exact(AVATAR_SIZE, AVATAR_SIZE, FilterType::Lanczos3);
    }

    std::fs::create_dir_all(user_dir)?;
    square
        .save_with_format(user_dir.join(AVATAR_FILE), ImageFormat::Png)
        .map_err(ProfileError::Encode)?;

    Ok(AVATAR_FILE.to_string())
}

pub async fn serve_profile(
    State(state): State<SharedState>,
    jar: CookieJar,
    Query(notice): Query<Notice>,
) -> Response {
    let Some(user) = current_user(&jar) else {
        return Redirect::to("/login").into_response();
    };

    let account = match state.users.get_user(user.username()) {
        Ok(Some(account)) => account,
        Ok(None) => return Redirect::to("/logout").into_response(),
        Err(e) => {
            warn!("failed to load profile for {}: {}", user.username(), e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load profile").into_response();
        }
    };

    let calculation_count = state
        .history
        .list(user.username())
        .map(|records| records.len())
        .unwrap_or(0);

    let avatar_url = account
        .profile_picture
        .as_ref()
        .map(|_| format!("/media/{}/{}", account.username, AVATAR_FILE));

    render(
        &state.templates,
        "profile",
        &json!({
            "user": account.username,
            "email": account.email,
            "avatar_url": avatar_url,
            "calculation_count": calculation_count,
            "notice": notice,
        }),
    )
}

/// Accepts a multipart upload with a `picture` field.
pub async fn handle_profile_upload(
    State(state): State<SharedState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let Some(user) = current_user(&jar) else {
        return Redirect::to("/login").into_response();
    };

    let mut picture = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some("picture") {
                    match field.bytes().await {
                        Ok(bytes) => picture = bytes.to_vec(),
                        Err(_) => {
                            return Redirect::to("/profile?error=Upload+failed").into_response();
                        }
                    }
                }
            }
            Ok(None) => break,
            Err(_) => return Redirect::to("/profile?error=Upload+failed").into_response(),
        }
    }

    let user_dir = state.users.user_dir(user.username());
    let stored =
        tokio::task::spawn_blocking(move || save_profile_picture(&user_dir, &picture)).await;

    let file_name = match stored {
        Ok(Ok(file_name)) => file_name,
        Ok(Err(
            e @ (ProfileError::Empty | ProfileError::TooLarge | ProfileError::NotAnImage(_)),
        )) => {
            return Redirect::to(&format!(
                "/profile?error={}",
                urlencoding::encode(&e.to_string())
            ))
            .into_response();
        }
        Ok(Err(e)) => {
            warn!("failed to store picture for {}: {}", user.username(), e);
            return Redirect::to("/profile?error=Failed+to+store+picture").into_response();
        }
        Err(e) => {
            warn!("picture task failed for {}: {}", user.username(), e);
            return Redirect::to("/profile?error=Failed+to+store+picture").into_response();
        }
    };

    if let Err(e) = state.users.set_profile_picture(user.username(), &file_name) {
        warn!("failed to record picture for {}: {}", user.username(), e);
        return Redirect::to("/profile?error=Failed+to+store+picture").into_response();
    }

    info!("user {} uploaded a profile picture", user.username());
    Redirect::to("/profile?success=Profile+picture+updated").into_response()
}

/// Serves a user's picture to that user only.
pub async fn serve_avatar(
    State(state): State<SharedState>,
    jar: CookieJar,
    AxumPath(username): AxumPath<String>,
) -> Response {
    match current_user(&jar) {
        Some(user) if user.username() == username => {}
        _ => return StatusCode::NOT_FOUND.into_response(),
    }

    let path = state.users.user_dir(&username).join(AVATAR_FILE);
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}
