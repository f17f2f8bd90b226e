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

use std::sync::Arc;

use async_trait::async_trait;
use carwash_api::pb::booking::v1::{
    BookingRecord, CancelBookingRequest, CreateBookingRequest, CreatePaymentRequest,
    CreateProviderRequest, CreateReviewRequest, CreateServiceRequest, DeleteByIdRequest,
    GetByIdRequest, ListBookingsResponse, ListPaymentsResponse, ListProvidersResponse,
    ListRequest, ListReviewsResponse, ListServicesResponse, MessageResponse, Payment, Provider,
    Review, SearchProvidersRequest, SearchServicesRequest, UpdateBookingRequest,
    UpdatePaymentRequest, UpdateProviderRequest, UpdateReviewRequest, UpdateServiceRequest,
    WashService,
    booking_server::{Booking, BookingServer},
};
use carwash_server::grpc::{GrpcServerConfig, GrpcServiceHandler};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status, service::RoutesBuilder};
use tonic_health::server::HealthReporter;

use crate::store::{BookingStore, Page};

type RpcResult<T> = std::result::Result<Response<T>, Status>;

fn message(text: &str) -> Response<MessageResponse> {
    Response::new(MessageResponse {
        message: text.to_string(),
    })
}

/// The gRPC face of the booking domain. Each RPC is a single store call.
#[derive(Clone)]
pub struct BookingService {
    store: Arc<dyn BookingStore>,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>) -> Self { Self { store } }
}

#[async_trait]
impl Booking for BookingService {
    async fn create_booking(
        &self,
        request: Request<CreateBookingRequest>,
    ) -> RpcResult<BookingRecord> {
        Ok(Response::new(self.store.create_booking(request.into_inner()).await?))
    }

    async fn get_booking(&self, request: Request<GetByIdRequest>) -> RpcResult<BookingRecord> {
        Ok(Response::new(self.store.get_booking(&request.into_inner().id).await?))
    }

    async fn update_booking(
        &self,
        request: Request<UpdateBookingRequest>,
    ) -> RpcResult<BookingRecord> {
        Ok(Response::new(self.store.update_booking(request.into_inner()).await?))
    }

    async fn cancel_booking(
        &self,
        request: Request<CancelBookingRequest>,
    ) -> RpcResult<MessageResponse> {
        self.store.cancel_booking(&request.into_inner().id).await?;
        Ok(message("booking cancelled"))
    }

    async fn list_bookings(
        &self,
        request: Request<ListRequest>,
    ) -> RpcResult<ListBookingsResponse> {
        let bookings = self.store.list_bookings(Page::from(request.into_inner())).await?;
        Ok(Response::new(ListBookingsResponse { bookings }))
    }

    async fn create_service(
        &self,
        request: Request<CreateServiceRequest>,
    ) -> RpcResult<WashService> {
        Ok(Response::new(self.store.create_service(request.into_inner()).await?))
    }

    async fn update_service(
        &self,
        request: Request<UpdateServiceRequest>,
    ) -> RpcResult<WashService> {
        Ok(Response::new(self.store.update_service(request.into_inner()).await?))
    }

    async fn delete_service(
        &self,
        request: Request<DeleteByIdRequest>,
    ) -> RpcResult<MessageResponse> {
        self.store.delete_service(&request.into_inner().id).await?;
        Ok(message("service deleted"))
    }

    async fn list_services(
        &self,
        request: Request<ListRequest>,
    ) -> RpcResult<ListServicesResponse> {
        let services = self.store.list_services(Page::from(request.into_inner())).await?;
        Ok(Response::new(ListServicesResponse { services }))
    }

    async fn search_services(
        &self,
        request: Request<SearchServicesRequest>,
    ) -> RpcResult<ListServicesResponse> {
        let services = self.store.search_services(request.into_inner()).await?;
        Ok(Response::new(ListServicesResponse { services }))
    }

    async fn create_payment(&self, request: Request<CreatePaymentRequest>) -> RpcResult<Payment> {
        Ok(Response::new(self.store.create_payment(request.into_inner()).await?))
    }

    async fn get_payment(&self, request: Request<GetByIdRequest>) -> RpcResult<Payment> {
        Ok(Response::new(self.store.get_payment(&request.into_inner().id).await?))
    }

    async fn update_payment(&self, request: Request<UpdatePaymentRequest>) -> RpcResult<Payment> {
        Ok(Response::new(self.store.update_payment(request.into_inner()).await?))
    }

    async fn delete_payment(
        &self,
        request: Request<DeleteByIdRequest>,
    ) -> RpcResult<MessageResponse> {
        self.store.delete_payment(&request.into_inner().id).await?;
        Ok(message("payment deleted"))
    }

    async fn list_payments(
        &self,
        request: Request<ListRequest>,
    ) -> RpcResult<ListPaymentsResponse> {
        let payments = self.store.list_payments(Page::from(request.into_inner())).await?;
        Ok(Response::new(ListPaymentsResponse { payments }))
    }

    async fn create_provider(
        &self,
        request: Request<CreateProviderRequest>,
    ) -> RpcResult<Provider> {
        Ok(Response::new(self.store.create_provider(request.into_inner()).await?))
    }

    async fn get_provider(&self, request: Request<GetByIdRequest>) -> RpcResult<Provider> {
        Ok(Response::new(self.store.get_provider(&request.into_inner().id).await?))
    }

    async fn update_provider(
        &self,
        request: Request<UpdateProviderRequest>,
    ) -> RpcResult<Provider> {
        Ok(Response::new(self.store.update_provider(request.into_inner()).await?))
    }

    async fn delete_provider(
        &self,
        request: Request<DeleteByIdRequest>,
    ) -> RpcResult<MessageResponse> {
        self.store.delete_provider(&request.into_inner().id).await?;
        Ok(message("provider deleted"))
    }

    async fn list_providers(
        &self,
        request: Request<ListRequest>,
    ) -> RpcResult<ListProvidersResponse> {
        let providers = self.store.list_providers(Page::from(request.into_inner())).await?;
        Ok(Response::new(ListProvidersResponse { providers }))
    }

    async fn search_providers(
        &self,
        request: Request<SearchProvidersRequest>,
    ) -> RpcResult<ListProvidersResponse> {
        let providers = self.store.search_providers(request.into_inner()).await?;
        Ok(Response::new(ListProvidersResponse { providers }))
    }

    async fn create_review(&self, request: Request<CreateReviewRequest>) -> RpcResult<Review> {
        Ok(Response::new(self.store.create_review(request.into_inner()).await?))
    }

    async fn update_review(&self, request: Request<UpdateReviewRequest>) -> RpcResult<Review> {
        Ok(Response::new(self.store.update_review(request.into_inner()).await?))
    }

    async fn delete_review(
        &self,
        request: Request<DeleteByIdRequest>,
    ) -> RpcResult<MessageResponse> {
        self.store.delete_review(&request.into_inner().id).await?;
        Ok(message("review deleted"))
    }

    async fn list_reviews(&self, request: Request<ListRequest>) -> RpcResult<ListReviewsResponse> {
        let reviews = self.store.list_reviews(Page::from(request.into_inner())).await?;
        Ok(Response::new(ListReviewsResponse { reviews }))
    }
}

#[async_trait]
impl GrpcServiceHandler for BookingService {
    fn service_name(&self) -> &'static str { "Booking" }

    fn file_descriptor_set(&self) -> &'static [u8] { carwash_api::pb::GRPC_DESC }

    fn register_service(self: &Arc<Self>, builder: &mut RoutesBuilder, config: &GrpcServerConfig) {
        builder.add_service(
            BookingServer::from_arc(self.clone())
                .max_decoding_message_size(config.max_recv_message_size)
                .max_encoding_message_size(config.max_send_message_size),
        );
    }

    async fn readiness_reporting(
        self: &Arc<Self>,
        _cancellation_token: CancellationToken,
        reporter: HealthReporter,
    ) {
        reporter.set_serving::<BookingServer<Self>>().await;
    }
}
