use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{error, info};

use crate::data::document_store::{Document, DocumentData, DocumentQuery, DocumentStore};
use crate::domain::donation::{Donation, NewDonation};
use crate::domain::error::DomainError;

const FOOD_NAME: &str = "food_name";
const SERVING_COUNT: &str = "serving_count";
const IMAGE_ID: &str = "image_id";
const LATITUDE: &str = "latitude";
const LONGITUDE: &str = "longitude";
const CREATED_AT: &str = "created_at";

#[derive(Clone)]
pub struct DonationRepository {
    store: Arc<dyn DocumentStore>,
    collection: String,
}

impl DonationRepository {
    pub fn new(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    pub async fn create(
        &self,
        donation: &NewDonation,
        image_id: Option<&str>,
        created_at: &str,
    ) -> Result<Donation, DomainError> {
        let mut data = DocumentData::new();
        data.insert(FOOD_NAME.into(), json!(donation.food_name.trim()));
        data.insert(SERVING_COUNT.into(), json!(donation.serving_count));
        data.insert(
            IMAGE_ID.into(),
            image_id.map_or(Value::Null, |id| json!(id)),
        );
        data.insert(LATITUDE.into(), json!(donation.latitude));
        data.insert(LONGITUDE.into(), json!(donation.longitude));
        data.insert(CREATED_AT.into(), json!(created_at));

        let doc = self
            .store
            .create(&self.collection, data)
            .await
            .map_err(|e| {
                error!("failed to create donation: {}", e);
                DomainError::from(e)
            })?;

        info!(donation_id = %doc.id, servings = donation.serving_count, "donation stored");
        Ok(to_donation(&doc))
    }

    pub async fn list_newest_first(&self) -> Result<Vec<Donation>, DomainError> {
        let docs = self
            .store
            .list(&self.collection, &DocumentQuery::new().order_desc(CREATED_AT))
            .await
            .map_err(|e| {
                error!("error while fetching donations: {}", e);
                DomainError::from(e)
            })?;
        Ok(docs.iter().map(to_donation).collect())
    }
}

fn to_donation(doc: &Document) -> Donation {
    Donation {
        id: doc.id.clone(),
        food_name: doc.str_field(FOOD_NAME),
        serving_count: u32::try_from(doc.u64_field(SERVING_COUNT)).unwrap_or(u32::MAX),
        image_id: doc.opt_str_field(IMAGE_ID),
        latitude: doc.f64_field(LATITUDE),
        longitude: doc.f64_field(LONGITUDE),
        created_at: doc.str_field(CREATED_AT),
    }
}
