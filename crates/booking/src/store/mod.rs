// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Persistence for the booking service.
//!
//! [`BookingStore`] is the per-entity surface the gRPC service calls. It is
//! implemented once, on top of any [`DocumentBackend`], which only knows how
//! to put, fetch, patch and scan documents of a [`Record`] type.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use carwash_api::pb::booking::v1::{
    BookingRecord, CreateBookingRequest, CreatePaymentRequest, CreateProviderRequest,
    CreateReviewRequest, CreateServiceRequest, ListRequest, Payment, Provider, Review,
    SearchProvidersRequest, SearchServicesRequest, UpdateBookingRequest, UpdatePaymentRequest,
    UpdateProviderRequest, UpdateReviewRequest, UpdateServiceRequest, WashService,
};
use mongodb::bson::{Document, oid::ObjectId};

pub use self::{memory::MemoryStore, mongo::MongoStore};
use crate::{
    error::{BookingError, Result},
    model::{
        BookingDoc, PaymentDoc, ProviderDoc, Record, ReviewDoc, ServiceDoc, booking_changes,
        payment_changes, provider_changes, provider_filter, review_changes, service_changes,
        service_filter,
    },
};

/// Skip/limit window over a collection in insertion order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    /// Zero means no limit.
    pub limit:  i64,
    pub offset: i64,
}

impl Page {
    pub const ALL: Self = Self {
        limit:  0,
        offset: 0,
    };

    pub fn skip(&self) -> u64 { self.offset.max(0).unsigned_abs() }

    pub const fn take(&self) -> Option<u64> {
        if self.limit > 0 {
            Some(self.limit.unsigned_abs())
        } else {
            None
        }
    }
}

impl From<ListRequest> for Page {
    fn from(req: ListRequest) -> Self {
        Self {
            limit:  req.limit,
            offset: req.offset,
        }
    }
}

/// Parses a 24-char hex document id.
pub fn parse_id(id: &str) -> Result<ObjectId> {
    ObjectId::parse_str(id).map_err(|_| BookingError::InvalidId { id: id.to_string() })
}

fn not_found<R: Record>(id: &str) -> BookingError {
    BookingError::NotFound {
        kind: R::KIND,
        id:   id.to_string(),
    }
}

/// Raw document operations. Filters are equality matches on (possibly
/// dotted) field paths; changes are `$set` bodies.
#[async_trait]
pub trait DocumentBackend: Send + Sync + 'static {
    async fn insert<R: Record>(&self, record: &R) -> Result<()>;

    async fn find_one<R: Record>(&self, id: ObjectId) -> Result<Option<R>>;

    /// Applies `changes` and returns the updated document.
    async fn update<R: Record>(&self, id: ObjectId, changes: Document) -> Result<Option<R>>;

    /// Returns whether a document was removed.
    async fn delete<R: Record>(&self, id: ObjectId) -> Result<bool>;

    async fn find_many<R: Record>(&self, filter: Document, page: Page) -> Result<Vec<R>>;
}

async fn create<B: DocumentBackend, R: Record>(backend: &B, record: R) -> Result<R> {
    backend.insert(&record).await?;
    Ok(record)
}

async fn get<B: DocumentBackend, R: Record>(backend: &B, id: &str) -> Result<R> {
    backend
        .find_one(parse_id(id)?)
        .await?
        .ok_or_else(|| not_found::<R>(id))
}

async fn patch<B: DocumentBackend, R: Record>(
    backend: &B,
    id: &str,
    changes: Document,
) -> Result<R> {
    backend
        .update(parse_id(id)?, changes)
        .await?
        .ok_or_else(|| not_found::<R>(id))
}

async fn remove<B: DocumentBackend, R: Record>(backend: &B, id: &str) -> Result<()> {
    if backend.delete::<R>(parse_id(id)?).await? {
        Ok(())
    } else {
        Err(not_found::<R>(id))
    }
}

async fn list<B: DocumentBackend, R: Record, T: From<R>>(
    backend: &B,
    filter: Document,
    page: Page,
) -> Result<Vec<T>> {
    let records = backend.find_many::<R>(filter, page).await?;
    Ok(records.into_iter().map(T::from).collect())
}

/// Every persistence operation of the booking service.
#[async_trait]
pub trait BookingStore: Send + Sync + 'static {
    async fn create_booking(&self, req: CreateBookingRequest) -> Result<BookingRecord>;
    async fn get_booking(&self, id: &str) -> Result<BookingRecord>;
    async fn update_booking(&self, req: UpdateBookingRequest) -> Result<BookingRecord>;
    /// Removes the booking.
    async fn cancel_booking(&self, id: &str) -> Result<()>;
    async fn list_bookings(&self, page: Page) -> Result<Vec<BookingRecord>>;

    async fn create_service(&self, req: CreateServiceRequest) -> Result<WashService>;
    async fn update_service(&self, req: UpdateServiceRequest) -> Result<WashService>;
    async fn delete_service(&self, id: &str) -> Result<()>;
    async fn list_services(&self, page: Page) -> Result<Vec<WashService>>;
    async fn search_services(&self, req: SearchServicesRequest) -> Result<Vec<WashService>>;

    async fn create_payment(&self, req: CreatePaymentRequest) -> Result<Payment>;
    async fn get_payment(&self, id: &str) -> Result<Payment>;
    async fn update_payment(&self, req: UpdatePaymentRequest) -> Result<Payment>;
    async fn delete_payment(&self, id: &str) -> Result<()>;
    async fn list_payments(&self, page: Page) -> Result<Vec<Payment>>;

    async fn create_provider(&self, req: CreateProviderRequest) -> Result<Provider>;
    async fn get_provider(&self, id: &str) -> Result<Provider>;
    async fn update_provider(&self, req: UpdateProviderRequest) -> Result<Provider>;
    async fn delete_provider(&self, id: &str) -> Result<()>;
    async fn list_providers(&self, page: Page) -> Result<Vec<Provider>>;
    async fn search_providers(&self, req: SearchProvidersRequest) -> Result<Vec<Provider>>;

    async fn create_review(&self, req: CreateReviewRequest) -> Result<Review>;
    async fn update_review(&self, req: UpdateReviewRequest) -> Result<Review>;
    async fn delete_review(&self, id: &str) -> Result<()>;
    async fn list_reviews(&self, page: Page) -> Result<Vec<Review>>;
}

#[async_trait]
impl<B: DocumentBackend> BookingStore for B {
    async fn create_booking(&self, req: CreateBookingRequest) -> Result<BookingRecord> {
        Ok(create(self, BookingDoc::from(req)).await?.into())
    }

    async fn get_booking(&self, id: &str) -> Result<BookingRecord> {
        Ok(get::<_, BookingDoc>(self, id).await?.into())
    }

    async fn update_booking(&self, req: UpdateBookingRequest) -> Result<BookingRecord> {
        Ok(patch::<_, BookingDoc>(self, &req.id, booking_changes(&req))
            .await?
            .into())
    }

    async fn cancel_booking(&self, id: &str) -> Result<()> {
        remove::<_, BookingDoc>(self, id).await
    }

    async fn list_bookings(&self, page: Page) -> Result<Vec<BookingRecord>> {
        list::<_, BookingDoc, _>(self, Document::new(), page).await
    }

    async fn create_service(&self, req: CreateServiceRequest) -> Result<WashService> {
        Ok(create(self, ServiceDoc::from(req)).await?.into())
    }

    async fn update_service(&self, req: UpdateServiceRequest) -> Result<WashService> {
        Ok(patch::<_, ServiceDoc>(self, &req.id, service_changes(&req))
            .await?
            .into())
    }

    async fn delete_service(&self, id: &str) -> Result<()> {
        remove::<_, ServiceDoc>(self, id).await
    }

    async fn list_services(&self, page: Page) -> Result<Vec<WashService>> {
        list::<_, ServiceDoc, _>(self, Document::new(), page).await
    }

    async fn search_services(&self, req: SearchServicesRequest) -> Result<Vec<WashService>> {
        let id = if req.id.is_empty() {
            None
        } else {
            Some(parse_id(&req.id)?)
        };
        list::<_, ServiceDoc, _>(self, service_filter(&req, id), Page::ALL).await
    }

    async fn create_payment(&self, req: CreatePaymentRequest) -> Result<Payment> {
        Ok(create(self, PaymentDoc::from(req)).await?.into())
    }

    async fn get_payment(&self, id: &str) -> Result<Payment> {
        Ok(get::<_, PaymentDoc>(self, id).await?.into())
    }

    async fn update_payment(&self, req: UpdatePaymentRequest) -> Result<Payment> {
        Ok(patch::<_, PaymentDoc>(self, &req.id, payment_changes(&req))
            .await?
            .into())
    }

    async fn delete_payment(&self, id: &str) -> Result<()> {
        remove::<_, PaymentDoc>(self, id).await
    }

    async fn list_payments(&self, page: Page) -> Result<Vec<Payment>> {
        list::<_, PaymentDoc, _>(self, Document::new(), page).await
    }

    async fn create_provider(&self, req: CreateProviderRequest) -> Result<Provider> {
        Ok(create(self, ProviderDoc::from(req)).await?.into())
    }

    async fn get_provider(&self, id: &str) -> Result<Provider> {
        Ok(get::<_, ProviderDoc>(self, id).await?.into())
    }

    async fn update_provider(&self, req: UpdateProviderRequest) -> Result<Provider> {
        Ok(patch::<_, ProviderDoc>(self, &req.id, provider_changes(&req))
            .await?
            .into())
    }

    async fn delete_provider(&self, id: &str) -> Result<()> {
        remove::<_, ProviderDoc>(self, id).await
    }

    async fn list_providers(&self, page: Page) -> Result<Vec<Provider>> {
        list::<_, ProviderDoc, _>(self, Document::new(), page).await
    }

    async fn search_providers(&self, req: SearchProvidersRequest) -> Result<Vec<Provider>> {
        list::<_, ProviderDoc, _>(self, provider_filter(&req), Page::ALL).await
    }

    async fn create_review(&self, req: CreateReviewRequest) -> Result<Review> {
        Ok(create(self, ReviewDoc::from(req)).await?.into())
    }

    async fn update_review(&self, req: UpdateReviewRequest) -> Result<Review> {
        Ok(patch::<_, ReviewDoc>(self, &req.id, review_changes(&req))
            .await?
            .into())
    }

    async fn delete_review(&self, id: &str) -> Result<()> {
        remove::<_, ReviewDoc>(self, id).await
    }

    async fn list_reviews(&self, page: Page) -> Result<Vec<Review>> {
        list::<_, ReviewDoc, _>(self, Document::new(), page).await
    }
}

#[cfg(test)]
mod tests {
    use carwash_api::pb::booking::v1::{Location, TimeRange};
    use carwash_error::{ErrorExt, StatusCode};

    use super::*;

    fn booking(user: &str) -> CreateBookingRequest {
        CreateBookingRequest {
            user_id:        user.into(),
            provider_id:    "p1".into(),
            service_id:     "s1".into(),
            status:         "pending".into(),
            scheduled_time: Some(TimeRange {
                start_time: "2025-01-01T09:00:00Z".into(),
                end_time:   "2025-01-01T10:00:00Z".into(),
            }),
            total_price:    25.0,
            location:       Some(Location {
                city:    "Tashkent".into(),
                country: "UZ".into(),
            }),
        }
    }

    #[test]
    fn test_page_bounds() {
        let page = Page::from(ListRequest {
            limit:  0,
            offset: -3,
        });
        assert_eq!(page.take(), None);
        assert_eq!(page.skip(), 0);
        assert_eq!(
            Page {
                limit:  2,
                offset: 4,
            }
            .take(),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_created_ids_resolve() {
        let store = MemoryStore::new();
        let created = store.create_booking(booking("u1")).await.unwrap();
        let fetched = store.get_booking(&created.id).await.unwrap();
        assert_eq!(fetched, created);

        let payment = store
            .create_payment(CreatePaymentRequest {
                booking_id: created.id.clone(),
                amount: 25.0,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(store.get_payment(&payment.id).await.unwrap(), payment);

        let provider = store
            .create_provider(CreateProviderRequest {
                user_id: "u1".into(),
                service_ids: vec!["s1".into()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(store.get_provider(&provider.id).await.unwrap(), provider);
    }

    #[tokio::test]
    async fn test_pagination_in_insertion_order() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(
                store
                    .create_booking(booking(&format!("u{i}")))
                    .await
                    .unwrap()
                    .id,
            );
        }

        let first: Vec<_> = store
            .list_bookings(Page {
                limit:  2,
                offset: 0,
            })
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(first, ids[..2]);

        let last = store
            .list_bookings(Page {
                limit:  2,
                offset: 4,
            })
            .await
            .unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].id, ids[4]);
        assert_eq!(store.list_bookings(Page::ALL).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_bad_and_missing_ids() {
        let store = MemoryStore::new();
        let err = store.get_booking("not-an-id").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidArgument);

        let missing = ObjectId::new().to_hex();
        let err = store.get_booking(&missing).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NotFound);
        let err = store.cancel_booking(&missing).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NotFound);
        let err = store
            .update_review(UpdateReviewRequest {
                id: missing,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn test_update_sets_mutable_fields_only() {
        let store = MemoryStore::new();
        let created = store.create_booking(booking("u1")).await.unwrap();
        let updated = store
            .update_booking(UpdateBookingRequest {
                id:          created.id.clone(),
                user_id:     "u1".into(),
                provider_id: "p2".into(),
                service_id:  "s1".into(),
                status:      "confirmed".into(),
                total_price: 30.0,
            })
            .await
            .unwrap();
        assert_eq!(updated.status, "confirmed");
        assert_eq!(updated.provider_id, "p2");
        assert_eq!(updated.location, created.location);
        assert_eq!(updated.scheduled_time, created.scheduled_time);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn test_cancel_removes_booking() {
        let store = MemoryStore::new();
        let created = store.create_booking(booking("u1")).await.unwrap();
        store.cancel_booking(&created.id).await.unwrap();
        assert!(store.get_booking(&created.id).await.is_err());
        assert!(store.cancel_booking(&created.id).await.is_err());
    }

    #[tokio::test]
    async fn test_search() {
        let store = MemoryStore::new();
        let wash = store
            .create_service(CreateServiceRequest {
                user_id:     "u1".into(),
                description: "exterior".into(),
                duration:    30,
                price:       15.0,
            })
            .await
            .unwrap();
        store
            .create_service(CreateServiceRequest {
                user_id:     "u2".into(),
                description: "interior".into(),
                duration:    45,
                price:       15.0,
            })
            .await
            .unwrap();

        let by_price = store
            .search_services(SearchServicesRequest {
                price: 15.0,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_price.len(), 2);

        let by_id = store
            .search_services(SearchServicesRequest {
                id: wash.id.clone(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_id, vec![wash]);

        let err = store
            .search_services(SearchServicesRequest {
                id: "zzz".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::InvalidArgument);

        store
            .create_provider(CreateProviderRequest {
                user_id: "u1".into(),
                company_name: "Shiny".into(),
                location: Some(Location {
                    city:    "Tashkent".into(),
                    country: "UZ".into(),
                }),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .create_provider(CreateProviderRequest {
                user_id: "u2".into(),
                company_name: "Sparkle".into(),
                location: Some(Location {
                    city:    "Samarkand".into(),
                    country: "UZ".into(),
                }),
                ..Default::default()
            })
            .await
            .unwrap();

        let in_uz = store
            .search_providers(SearchProvidersRequest {
                location: Some(Location {
                    city:    String::new(),
                    country: "UZ".into(),
                }),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(in_uz.len(), 2);

        let shiny = store
            .search_providers(SearchProvidersRequest {
                company_name: "Shiny".into(),
                location: Some(Location {
                    city:    "Tashkent".into(),
                    country: String::new(),
                }),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(shiny.len(), 1);
        assert_eq!(shiny[0].user_id, "u1");
    }

    #[tokio::test]
    async fn test_update_provider_keeps_services() {
        let store = MemoryStore::new();
        let provider = store
            .create_provider(CreateProviderRequest {
                user_id: "u1".into(),
                service_ids: vec!["s1".into(), "s2".into()],
                ..Default::default()
            })
            .await
            .unwrap();
        let updated = store
            .update_provider(UpdateProviderRequest {
                id:           provider.id.clone(),
                user_id:      "u1".into(),
                company_name: "Renamed".into(),
                location:     Some(Location {
                    city:    "Bukhara".into(),
                    country: "UZ".into(),
                }),
            })
            .await
            .unwrap();
        assert_eq!(updated.company_name, "Renamed");
        assert_eq!(updated.service_ids, provider.service_ids);
        assert_eq!(updated.location.unwrap().city, "Bukhara");
    }
}
