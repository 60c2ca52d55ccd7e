use chrono::{DateTime, Utc};
use poem_openapi::{ApiResponse, Object, payload::Json};

#[derive(Debug, Clone, Object)]
pub struct ErrorDto {
    /// Human-readable error message
    pub message: String,
}

impl ErrorDto {
    pub fn json(message: impl Into<String>) -> Json<ErrorDto> {
        Json(ErrorDto {
            message: message.into(),
        })
    }
}

#[derive(Debug, Clone, Object)]
pub struct MessageDto {
    pub message: String,
}

// ===== sync =====

#[derive(Debug, Clone, Default, Object)]
pub struct SyncRequestDto {
    /// Any page of the listing to crawl
    pub listing_url: Option<String>,
    /// Markup of the current page, searched for a link to the listing
    pub page_html: Option<String>,
}

#[derive(Debug, Clone, Object)]
pub struct SyncStatusDto {
    pub kind: String,
    /// idle, running, completed or failed
    pub phase: String,
    pub running: bool,
    pub page: u32,
    pub total_pages: u32,
    pub ids_added: u64,
    pub ids_total: u64,
    pub skipped_pages: Vec<u32>,
    pub message: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(ApiResponse)]
pub enum SyncTriggerResponse {
    /// Sync started in the background
    #[oai(status = 202)]
    Accepted(Json<MessageDto>),

    /// Unknown listing kind or malformed listing URL
    #[oai(status = 400)]
    BadRequest(Json<ErrorDto>),

    /// A sync of this kind is already running
    #[oai(status = 409)]
    Conflict(Json<ErrorDto>),

    /// The listing URL could not be determined
    #[oai(status = 422)]
    Unprocessable(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum SyncStatusResponse {
    #[oai(status = 200)]
    Ok(Json<SyncStatusDto>),

    #[oai(status = 400)]
    BadRequest(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

// ===== visit =====

#[derive(Debug, Clone, Object)]
pub struct VisitRequestDto {
    pub url: String,
    pub html: String,
}

#[derive(Debug, Clone, Object)]
pub struct VisitResponseDto {
    /// listing, user_works, work or other
    pub page: String,
    pub listing_kind: Option<String>,
    pub marked_read: Option<String>,
    pub ids_added: Option<u64>,
    pub ids_total: Option<u64>,
    /// not_needed, started, already_running or failed
    pub sync: String,
    pub sync_message: Option<String>,
}

#[derive(ApiResponse)]
pub enum VisitResponse {
    #[oai(status = 200)]
    Ok(Json<VisitResponseDto>),

    #[oai(status = 400)]
    BadRequest(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

// ===== listing annotation =====

#[derive(Debug, Clone, Object)]
pub struct AnnotateRequestDto {
    pub html: String,
    /// Include kudos/hits ratios; defaults to the autoCount preference
    pub count: Option<bool>,
    /// ratio or rating; defaults to ratio when autoSort is on, else document order
    pub sort: Option<String>,
    pub ascending: Option<bool>,
}

#[derive(Debug, Clone, Object)]
pub struct AnnotationDto {
    pub work_id: String,
    /// Kudos per hit in percent, one decimal
    pub ratio: Option<f64>,
    pub ratio_text: Option<String>,
    /// low, mid or high
    pub ratio_band: Option<String>,
    pub hide_hits: bool,
    pub read: bool,
    pub bookmarked: bool,
    pub highlight: bool,
    pub rating: Option<u8>,
    pub rating_color: Option<String>,
    pub last_read: Option<String>,
    pub chapters_left: Option<u32>,
    pub complete: bool,
    pub update: Option<String>,
}

#[derive(Debug, Clone, Object)]
pub struct AnnotateResponseDto {
    pub sorted_by: Option<String>,
    pub entries: Vec<AnnotationDto>,
}

#[derive(ApiResponse)]
pub enum AnnotateResponse {
    #[oai(status = 200)]
    Ok(Json<AnnotateResponseDto>),

    #[oai(status = 400)]
    BadRequest(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

// ===== preferences =====

#[derive(Debug, Clone, Object)]
#[oai(rename_all = "camelCase")]
pub struct PreferencesDto {
    pub auto_count: bool,
    pub auto_sort: bool,
    pub hide_hitcount: bool,
    pub highlight_read: bool,
}

#[derive(Debug, Clone, Object)]
pub struct PreferenceDto {
    pub flag: String,
    pub value: bool,
}

#[derive(ApiResponse)]
pub enum PreferencesResponse {
    #[oai(status = 200)]
    Ok(Json<PreferencesDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum PreferenceToggleResponse {
    #[oai(status = 200)]
    Ok(Json<PreferenceDto>),

    /// Unknown flag
    #[oai(status = 404)]
    NotFound(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

// ===== works =====

#[derive(Debug, Clone, Object)]
pub struct WorkDto {
    pub work_id: String,
    pub read: bool,
    pub bookmarked: bool,
    pub rating: Option<u8>,
    pub rating_color: Option<String>,
    pub last_read_date: Option<DateTime<Utc>>,
    pub last_read_chapters: Option<u32>,
}

#[derive(Debug, Clone, Object)]
pub struct RatingRequestDto {
    /// Whole number 0-9, as typed by the user
    pub rating: String,
}

#[derive(Debug, Clone, Default, Object)]
pub struct MarkReadRequestDto {
    pub chapters: Option<u32>,
}

#[derive(ApiResponse)]
pub enum WorkResponse {
    #[oai(status = 200)]
    Ok(Json<WorkDto>),

    /// Malformed work id or rating
    #[oai(status = 400)]
    BadRequest(Json<ErrorDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}

#[derive(ApiResponse)]
pub enum ClearDataResponse {
    #[oai(status = 200)]
    Ok(Json<MessageDto>),

    #[oai(status = 500)]
    InternalError(Json<ErrorDto>),
}
