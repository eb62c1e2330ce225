use tracing::{info, instrument};

use crate::application::feed_service::FeedService;
use crate::application::media_service::{ImageUpload, MediaService};
use crate::data::donation_repository::DonationRepository;
use crate::domain::donation::{Donation, NewDonation};
use crate::domain::error::DomainError;
use crate::domain::post::FeedPost;
use crate::domain::timestamp_now;

/// Identity of whoever drops the pin; becomes the author of the feed post.
#[derive(Debug, Clone)]
pub struct Donor {
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Clone)]
pub struct SubmittedDonation {
    pub donation: Donation,
    pub post: Option<FeedPost>,
}

#[derive(Clone)]
pub struct DonationService {
    donations: DonationRepository,
    feed: FeedService,
    media: MediaService,
}

impl DonationService {
    pub fn new(donations: DonationRepository, feed: FeedService, media: MediaService) -> Self {
        Self {
            donations,
            feed,
            media,
        }
    }

    /// Stores the donation and, when it comes with a picture, announces it on the feed.
    #[instrument(skip(self, donation, image), fields(donor = %donor.user_id))]
    pub async fn submit(
        &self,
        donor: &Donor,
        donation: NewDonation,
        image: Option<ImageUpload>,
    ) -> Result<SubmittedDonation, DomainError> {
        donation.validate()?;
        // decode before any write so a bad image leaves nothing behind
        let image = image.map(|upload| self.media.decode(upload)).transpose()?;

        let image_id = match image {
            Some(file) => Some(self.media.store(file).await?),
            None => None,
        };

        let stored = self
            .donations
            .create(&donation, image_id.as_deref(), &timestamp_now())
            .await?;

        let post = match image_id.as_deref() {
            Some(image_id) => {
                let post = self
                    .feed
                    .create_post(&donor.user_id, &donor.username, &stored.food_name, image_id)
                    .await?;
                Some(post.view_for(Some(&donor.user_id)))
            }
            None => None,
        };

        info!(
            donation_id = %stored.id,
            posted = post.is_some(),
            "donation submitted"
        );
        Ok(SubmittedDonation {
            donation: stored,
            post,
        })
    }

    pub async fn list_donations(&self) -> Result<Vec<Donation>, DomainError> {
        self.donations.list_newest_first().await
    }
}
