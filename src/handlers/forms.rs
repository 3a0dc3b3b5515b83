//! Request body decoding shared by the JSON-or-multipart endpoints.

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpRequest};
use futures::{StreamExt, TryStreamExt};

use crate::domain::media::{Upload, MAX_UPLOAD_BYTES};
use crate::errors::AppError;

/// Largest accepted JSON body or text field.
const MAX_TEXT_BYTES: usize = 1024 * 1024;

/// Decoded `multipart/form-data` body.
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: Vec<(String, String)>,
    pub files: Vec<(String, Upload)>,
}

impl FormData {
    /// Text fields as a JSON object of strings; repeated names keep the last value.
    pub fn fields_as_json(&self) -> serde_json::Value {
        let map = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::Value::Object(map)
    }

    pub fn take_files(&mut self, names: &[&str]) -> Vec<Upload> {
        let (wanted, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(name, _)| names.contains(&name.as_str()));
        self.files = rest;
        wanted.into_iter().map(|(_, upload)| upload).collect()
    }
}

pub enum RequestBody {
    Json(web::Bytes),
    Form(FormData),
}

pub fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

pub async fn read_body(
    req: &HttpRequest,
    mut payload: web::Payload,
) -> Result<RequestBody, AppError> {
    if is_multipart(req) {
        let form = read_form(Multipart::new(req.headers(), payload)).await?;
        return Ok(RequestBody::Form(form));
    }

    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(e.to_string()))?;
        if body.len() + chunk.len() > MAX_TEXT_BYTES {
            return Err(AppError::BadRequest("Request body too large".to_string()));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(RequestBody::Json(body.freeze()))
}

pub async fn read_form(mut multipart: Multipart) -> Result<FormData, AppError> {
    let mut form = FormData::default();

    while let Some(mut field) = multipart
        .try_next()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form data: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let content_type = field.content_type().map(|m| m.essence_str().to_string());
        let limit = if file_name.is_some() {
            MAX_UPLOAD_BYTES
        } else {
            MAX_TEXT_BYTES
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid form data: {e}")))?
        {
            if bytes.len() + chunk.len() > limit {
                return Err(AppError::BadRequest("File too large (max 5MB)".to_string()));
            }
            bytes.extend_from_slice(&chunk);
        }

        match file_name {
            // Browsers send an empty part for an untouched file input.
            Some(file_name) if file_name.is_empty() && bytes.is_empty() => {}
            Some(file_name) => form.files.push((
                name,
                Upload {
                    file_name,
                    content_type: content_type.unwrap_or_default(),
                    bytes,
                },
            )),
            None => {
                let value = String::from_utf8(bytes).map_err(|_| {
                    AppError::BadRequest(format!("Field '{name}' is not valid UTF-8"))
                })?;
                form.fields.push((name, value));
            }
        }
    }
    Ok(form)
}
