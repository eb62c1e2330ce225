use actix_web::{HttpRequest, HttpResponse, web};
use tracing::info;

use crate::application::donation_service::{DonationService, Donor};
use crate::domain::donation::NewDonation;
use crate::domain::error::DomainError;
use crate::presentation::dto::{CreateDonationRequest, DonationResponse, DonationsResponse};
use crate::presentation::utils::{AuthenticatedUser, request_id};

pub async fn create_donation(
    req: HttpRequest,
    user: AuthenticatedUser,
    donations: web::Data<DonationService>,
    payload: web::Json<CreateDonationRequest>,
) -> Result<HttpResponse, DomainError> {
    let CreateDonationRequest {
        food_name,
        serving_count,
        latitude,
        longitude,
        image,
    } = payload.into_inner();

    let donor = Donor {
        user_id: user.id,
        username: user.username,
    };
    let donation = NewDonation {
        food_name,
        serving_count,
        latitude,
        longitude,
    };

    let submitted = donations
        .submit(&donor, donation, image.map(Into::into))
        .await?;

    info!(
        request_id = %request_id(&req),
        donation_id = %submitted.donation.id,
        "donation created"
    );

    Ok(HttpResponse::Created().json(DonationResponse {
        donation: submitted.donation,
        post: submitted.post,
    }))
}

pub async fn list_donations(
    donations: web::Data<DonationService>,
) -> Result<HttpResponse, DomainError> {
    let donations = donations.list_donations().await?;
    Ok(HttpResponse::Ok().json(DonationsResponse {
        total: donations.len(),
        donations,
    }))
}
