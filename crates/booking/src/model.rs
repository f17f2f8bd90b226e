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

//! Stored document shapes and their conversions to and from the wire types.
//!
//! Every collection stores one fixed schema. Ids are generated client-side
//! so a record is complete before it is written.

use carwash_api::pb::booking::v1::{
    BookingRecord, CreateBookingRequest, CreatePaymentRequest, CreateProviderRequest,
    CreateReviewRequest, CreateServiceRequest, Location, Payment, Provider, Review,
    SearchProvidersRequest, SearchServicesRequest, TimeRange, UpdateBookingRequest,
    UpdatePaymentRequest, UpdateProviderRequest, UpdateReviewRequest, UpdateServiceRequest,
    WashService,
};
use chrono::{SecondsFormat, Utc};
use mongodb::bson::{Document, doc, oid::ObjectId};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub fn now() -> String { Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true) }

/// A document type with its own collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + Unpin + 'static {
    const COLLECTION: &'static str;
    /// Entity name used in not-found errors.
    const KIND: &'static str;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationDoc {
    pub city:    String,
    pub country: String,
}

impl From<Option<Location>> for LocationDoc {
    fn from(location: Option<Location>) -> Self {
        let location = location.unwrap_or_default();
        Self {
            city:    location.city,
            country: location.country,
        }
    }
}

impl From<LocationDoc> for Location {
    fn from(doc: LocationDoc) -> Self {
        Self {
            city:    doc.city,
            country: doc.country,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeRangeDoc {
    pub start_time: String,
    pub end_time:   String,
}

impl From<TimeRange> for TimeRangeDoc {
    fn from(range: TimeRange) -> Self {
        Self {
            start_time: range.start_time,
            end_time:   range.end_time,
        }
    }
}

impl From<TimeRangeDoc> for TimeRange {
    fn from(doc: TimeRangeDoc) -> Self {
        Self {
            start_time: doc.start_time,
            end_time:   doc.end_time,
        }
    }
}

// ---------------------------------------------------------------- bookings

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDoc {
    #[serde(rename = "_id")]
    pub id:             ObjectId,
    pub user_id:        String,
    pub provider_id:    String,
    pub service_id:     String,
    pub status:         String,
    pub scheduled_time: TimeRangeDoc,
    pub total_price:    f64,
    pub location:       LocationDoc,
    pub created_at:     String,
    pub updated_at:     String,
}

impl Record for BookingDoc {
    const COLLECTION: &'static str = "booking";
    const KIND: &'static str = "booking";
}

impl From<CreateBookingRequest> for BookingDoc {
    fn from(req: CreateBookingRequest) -> Self {
        let ts = now();
        Self {
            id:             ObjectId::new(),
            user_id:        req.user_id,
            provider_id:    req.provider_id,
            service_id:     req.service_id,
            status:         req.status,
            scheduled_time: req.scheduled_time.map(Into::into).unwrap_or_default(),
            total_price:    req.total_price,
            location:       req.location.into(),
            created_at:     ts.clone(),
            updated_at:     ts,
        }
    }
}

impl From<BookingDoc> for BookingRecord {
    fn from(doc: BookingDoc) -> Self {
        Self {
            id:             doc.id.to_hex(),
            user_id:        doc.user_id,
            provider_id:    doc.provider_id,
            service_id:     doc.service_id,
            status:         doc.status,
            scheduled_time: Some(doc.scheduled_time.into()),
            total_price:    doc.total_price,
            location:       Some(doc.location.into()),
            created_at:     doc.created_at,
            updated_at:     doc.updated_at,
        }
    }
}

pub fn booking_changes(req: &UpdateBookingRequest) -> Document {
    doc! {
        "user_id": req.user_id.as_str(),
        "provider_id": req.provider_id.as_str(),
        "service_id": req.service_id.as_str(),
        "status": req.status.as_str(),
        "total_price": req.total_price,
        "updated_at": now(),
    }
}

// ---------------------------------------------------------------- services

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDoc {
    #[serde(rename = "_id")]
    pub id:          ObjectId,
    pub user_id:     String,
    pub description: String,
    pub duration:    i32,
    pub price:       f64,
    pub created_at:  String,
    pub updated_at:  String,
}

impl Record for ServiceDoc {
    const COLLECTION: &'static str = "services";
    const KIND: &'static str = "service";
}

impl From<CreateServiceRequest> for ServiceDoc {
    fn from(req: CreateServiceRequest) -> Self {
        let ts = now();
        Self {
            id:          ObjectId::new(),
            user_id:     req.user_id,
            description: req.description,
            duration:    req.duration,
            price:       req.price,
            created_at:  ts.clone(),
            updated_at:  ts,
        }
    }
}

impl From<ServiceDoc> for WashService {
    fn from(doc: ServiceDoc) -> Self {
        Self {
            id:          doc.id.to_hex(),
            user_id:     doc.user_id,
            description: doc.description,
            duration:    doc.duration,
            price:       doc.price,
            created_at:  doc.created_at,
            updated_at:  doc.updated_at,
        }
    }
}

pub fn service_changes(req: &UpdateServiceRequest) -> Document {
    doc! {
        "user_id": req.user_id.as_str(),
        "price": req.price,
        "duration": req.duration,
        "description": req.description.as_str(),
        "updated_at": now(),
    }
}

/// Equality filter over the non-empty search fields. `id` must already be
/// validated by the caller.
pub fn service_filter(req: &SearchServicesRequest, id: Option<ObjectId>) -> Document {
    let mut filter = Document::new();
    if let Some(id) = id {
        filter.insert("_id", id);
    }
    if !req.user_id.is_empty() {
        filter.insert("user_id", req.user_id.as_str());
    }
    if req.price != 0.0 {
        filter.insert("price", req.price);
    }
    if req.duration != 0 {
        filter.insert("duration", req.duration);
    }
    if !req.description.is_empty() {
        filter.insert("description", req.description.as_str());
    }
    filter
}

// ---------------------------------------------------------------- payments

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDoc {
    #[serde(rename = "_id")]
    pub id:             ObjectId,
    pub booking_id:     String,
    pub amount:         f64,
    pub status:         String,
    pub payment_method: String,
    pub transaction_id: String,
    pub created_at:     String,
    pub updated_at:     String,
}

impl Record for PaymentDoc {
    const COLLECTION: &'static str = "payments";
    const KIND: &'static str = "payment";
}

impl From<CreatePaymentRequest> for PaymentDoc {
    fn from(req: CreatePaymentRequest) -> Self {
        let ts = now();
        Self {
            id:             ObjectId::new(),
            booking_id:     req.booking_id,
            amount:         req.amount,
            status:         req.status,
            payment_method: req.payment_method,
            transaction_id: req.transaction_id,
            created_at:     ts.clone(),
            updated_at:     ts,
        }
    }
}

impl From<PaymentDoc> for Payment {
    fn from(doc: PaymentDoc) -> Self {
        Self {
            id:             doc.id.to_hex(),
            booking_id:     doc.booking_id,
            amount:         doc.amount,
            status:         doc.status,
            payment_method: doc.payment_method,
            transaction_id: doc.transaction_id,
            created_at:     doc.created_at,
            updated_at:     doc.updated_at,
        }
    }
}

pub fn payment_changes(req: &UpdatePaymentRequest) -> Document {
    doc! {
        "booking_id": req.booking_id.as_str(),
        "amount": req.amount,
        "status": req.status.as_str(),
        "payment_method": req.payment_method.as_str(),
        "transaction_id": req.transaction_id.as_str(),
        "updated_at": now(),
    }
}

// --------------------------------------------------------------- providers

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDoc {
    #[serde(rename = "_id")]
    pub id:           ObjectId,
    pub user_id:      String,
    pub company_name: String,
    pub service_ids:  Vec<String>,
    pub location:     LocationDoc,
    pub availability: Vec<TimeRangeDoc>,
    pub created_at:   String,
    pub updated_at:   String,
}

impl Record for ProviderDoc {
    const COLLECTION: &'static str = "provider";
    const KIND: &'static str = "provider";
}

impl From<CreateProviderRequest> for ProviderDoc {
    fn from(req: CreateProviderRequest) -> Self {
        let ts = now();
        Self {
            id:           ObjectId::new(),
            user_id:      req.user_id,
            company_name: req.company_name,
            service_ids:  req.service_ids,
            location:     req.location.into(),
            availability: req.availability.into_iter().map(Into::into).collect(),
            created_at:   ts.clone(),
            updated_at:   ts,
        }
    }
}

impl From<ProviderDoc> for Provider {
    fn from(doc: ProviderDoc) -> Self {
        Self {
            id:           doc.id.to_hex(),
            user_id:      doc.user_id,
            company_name: doc.company_name,
            service_ids:  doc.service_ids,
            location:     Some(doc.location.into()),
            availability: doc.availability.into_iter().map(Into::into).collect(),
            created_at:   doc.created_at,
            updated_at:   doc.updated_at,
        }
    }
}

pub fn provider_changes(req: &UpdateProviderRequest) -> Document {
    let location = LocationDoc::from(req.location.clone());
    doc! {
        "user_id": req.user_id.as_str(),
        "company_name": req.company_name.as_str(),
        "location": { "city": location.city, "country": location.country },
        "updated_at": now(),
    }
}

pub fn provider_filter(req: &SearchProvidersRequest) -> Document {
    let mut filter = Document::new();
    if !req.user_id.is_empty() {
        filter.insert("user_id", req.user_id.as_str());
    }
    if !req.company_name.is_empty() {
        filter.insert("company_name", req.company_name.as_str());
    }
    if let Some(location) = &req.location {
        if !location.city.is_empty() {
            filter.insert("location.city", location.city.as_str());
        }
        if !location.country.is_empty() {
            filter.insert("location.country", location.country.as_str());
        }
    }
    filter
}

// ----------------------------------------------------------------- reviews

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDoc {
    #[serde(rename = "_id")]
    pub id:         ObjectId,
    pub user_id:    String,
    pub booking_id: String,
    pub rating:     i32,
    pub comment:    String,
    pub created_at: String,
    pub updated_at: String,
}

impl Record for ReviewDoc {
    const COLLECTION: &'static str = "reviews";
    const KIND: &'static str = "review";
}

impl From<CreateReviewRequest> for ReviewDoc {
    fn from(req: CreateReviewRequest) -> Self {
        let ts = now();
        Self {
            id:         ObjectId::new(),
            user_id:    req.user_id,
            booking_id: req.booking_id,
            rating:     req.rating,
            comment:    req.comment,
            created_at: ts.clone(),
            updated_at: ts,
        }
    }
}

impl From<ReviewDoc> for Review {
    fn from(doc: ReviewDoc) -> Self {
        Self {
            id:         doc.id.to_hex(),
            user_id:    doc.user_id,
            booking_id: doc.booking_id,
            rating:     doc.rating,
            comment:    doc.comment,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

pub fn review_changes(req: &UpdateReviewRequest) -> Document {
    doc! {
        "user_id": req.user_id.as_str(),
        "booking_id": req.booking_id.as_str(),
        "rating": req.rating,
        "comment": req.comment.as_str(),
        "updated_at": now(),
    }
}
