use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::dtos::{CategoriesResponse, CreateFaqRequest, FaqQuery, FaqResponse};
use crate::startup::AppState;
use crate::utils::{QueryParams, ValidatedJson};

pub async fn list_faqs(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<FaqQuery>,
) -> Json<Vec<FaqResponse>> {
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    Json(
        state
            .support
            .list_faqs(category)
            .into_iter()
            .map(FaqResponse::from)
            .collect(),
    )
}

pub async fn create_faq(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateFaqRequest>,
) -> Result<Json<FaqResponse>, AppError> {
    let faq = state.support.create_faq(req.into()).await?;
    Ok(Json(FaqResponse::from(faq)))
}

pub async fn list_categories(State(state): State<AppState>) -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        categories: state.support.faq_categories(),
    })
}
