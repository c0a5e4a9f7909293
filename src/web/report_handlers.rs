// src/web/report_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        non_blank, parse_optional_date,
        report::{allowed_extension, parse_vital_tags, NewReport, Report, ReportFilter, ReportQuery},
        user::CurrentUser,
    },
    services::{
        report_service,
        storage::{self, StoredFile},
    },
    state::AppState,
    web::parse_id,
};
use axum::{
    extract::{multipart::MultipartRejection, Extension, Json, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

/// Fields collected from the upload form as they stream in.
#[derive(Default)]
struct UploadForm {
    file: Option<(StoredFile, String)>, // stored file + original name
    report_type: Option<String>,
    report_date: Option<String>,
    vital_types: Vec<String>,
}

impl UploadForm {
    async fn discard_file(&mut self) {
        if let Some((stored, _)) = self.file.take() {
            storage::remove_file(&stored.path).await;
        }
    }
}

// POST /api/reports/upload (multipart: file, report_type, report_date, vital_types?)
pub async fn upload_report(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<impl IntoResponse> {
    let mut multipart = multipart?;
    let mut form = UploadForm::default();

    // Whatever goes wrong after the file hit the disk, the file goes too
    let saved = store_upload(&state, user.id, &mut multipart, &mut form).await;

    match saved {
        Ok(report) => {
            if let Some((stored, _)) = &form.file {
                tracing::info!("User {} uploaded report {} ({} bytes)", user.id, report.id, stored.size);
            }
            Ok((
                StatusCode::CREATED,
                Json(json!({ "message": "Report uploaded successfully", "report": report })),
            ))
        }
        Err(e) => {
            tracing::warn!("Upload by user {} rejected: {}", user.id, e);
            form.discard_file().await;
            Err(e)
        }
    }
}

async fn store_upload(
    state: &AppState,
    user_id: i64,
    multipart: &mut Multipart,
    form: &mut UploadForm,
) -> AppResult<Report> {
    read_upload_form(state, user_id, multipart, form).await?;
    let new_report = validate_upload(form)?;
    report_service::create_report(&state.db_pool, user_id, &new_report).await
}

async fn read_upload_form(
    state: &AppState,
    user_id: i64,
    multipart: &mut Multipart,
    form: &mut UploadForm,
) -> AppResult<()> {
    let storage_config = &state.config.storage;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "file" => {
                if form.file.is_some() {
                    return Err(AppError::validation("Only one file can be uploaded per report"));
                }
                let original_name = field
                    .file_name()
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| AppError::validation("No file uploaded"))?;
                let extension = allowed_extension(&original_name).ok_or_else(|| {
                    AppError::validation("Only PDF and image files (jpg, jpeg, png, gif) are allowed")
                })?;

                let stored = storage::save_field(
                    field,
                    &storage_config.upload_dir,
                    user_id,
                    &extension,
                    storage_config.max_upload_bytes,
                )
                .await?;
                form.file = Some((stored, original_name));
            }
            "report_type" => form.report_type = Some(field.text().await?),
            "report_date" => form.report_date = Some(field.text().await?),
            "vital_types" | "vital_types[]" => form.vital_types.push(field.text().await?),
            other => tracing::debug!("Ignoring unknown upload field '{}'", other),
        }
    }
    Ok(())
}

fn validate_upload(form: &mut UploadForm) -> AppResult<NewReport> {
    let Some((stored, original_name)) = &form.file else {
        return Err(AppError::validation("No file uploaded"));
    };
    if stored.size == 0 {
        return Err(AppError::validation("Uploaded file is empty"));
    }

    let (Some(report_type), Some(report_date)) = (non_blank(form.report_type.take()), non_blank(form.report_date.take())) else {
        return Err(AppError::validation("Report type and date are required"));
    };
    let report_date = parse_optional_date(Some(&report_date), "report_date")?
        .ok_or_else(|| AppError::validation("Report type and date are required"))?;
    let vital_types = parse_vital_tags(form.vital_types.iter().map(String::as_str))?;

    Ok(NewReport {
        file_path: stored.path.to_string_lossy().into_owned(),
        file_name: original_name.clone(),
        report_type,
        report_date,
        vital_types,
    })
}

// GET /api/reports?start_date&end_date&report_type&vital_type&limit
pub async fn list_reports(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ReportQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = ReportFilter::try_from(query)?;
    let reports = report_service::list_reports(&state.db_pool, user.id, &filter).await?;
    Ok(Json(json!({ "reports": reports })))
}

// GET /api/reports/shared
pub async fn list_shared_reports(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> AppResult<impl IntoResponse> {
    let reports = report_service::list_shared_reports(&state.db_pool, &user.email).await?;
    Ok(Json(json!({ "reports": reports })))
}

// GET /api/reports/{id}
pub async fn get_report(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let report_id = parse_id(&raw_id, "Report")?;
    let report = report_service::find_visible_report(&state.db_pool, report_id, user.id, &user.email)
        .await?
        .ok_or(AppError::NotFound("Report"))?;
    Ok(Json(json!({ "report": report })))
}

// DELETE /api/reports/{id}
pub async fn delete_report(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let report_id = parse_id(&raw_id, "Report")?;
    report_service::delete_report(&state.db_pool, report_id, user.id).await?;
    Ok(Json(json!({ "message": "Report deleted successfully" })))
}
